//! Tone-analysis result model.
//!
//! The wire shape matches the analysis backend's JSON contract
//! (`sentiment, emotions, urgency, formality, topTopics, summaryText`) and
//! is also the serialized form stored in the `tone_analysis` column.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Overall sentiment of a message, ordered from most to least negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sentiment {
    VeryNegative,
    Negative,
    Neutral,
    Positive,
    VeryPositive,
}

impl Sentiment {
    /// Integer rank for ordered comparisons (never compare by string).
    pub fn rank(self) -> u8 {
        match self {
            Self::VeryNegative => 0,
            Self::Negative => 1,
            Self::Neutral => 2,
            Self::Positive => 3,
            Self::VeryPositive => 4,
        }
    }
}

/// Emotion categories detected in a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Emotion {
    Anger,
    Fear,
    Happiness,
    Sadness,
    Surprise,
    Disgust,
    Neutral,
}

/// Message urgency, ordered low to critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Low,
    Normal,
    High,
    Critical,
}

impl Urgency {
    pub fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Normal => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }
}

/// Formality level, ordered informal to formal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Formality {
    VeryInformal,
    Informal,
    Neutral,
    Formal,
    VeryFormal,
}

impl Formality {
    pub fn rank(self) -> u8 {
        match self {
            Self::VeryInformal => 0,
            Self::Informal => 1,
            Self::Neutral => 2,
            Self::Formal => 3,
            Self::VeryFormal => 4,
        }
    }
}

/// Structured tone assessment of a message body.
///
/// Always fully populated — the analyzer substitutes [`ToneAnalysis::fallback`]
/// on any failure rather than returning a partial result. Emotion intensities
/// are in [0, 1] and need not sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneAnalysis {
    pub sentiment: Sentiment,
    #[serde(default)]
    pub emotions: HashMap<Emotion, f32>,
    pub urgency: Urgency,
    pub formality: Formality,
    #[serde(rename = "topTopics", default)]
    pub top_topics: Vec<String>,
    #[serde(rename = "summaryText", default)]
    pub summary_text: String,
}

impl ToneAnalysis {
    /// Fixed default analysis used whenever the backend cannot be consulted
    /// or its response cannot be decoded.
    pub fn fallback() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            emotions: HashMap::from([(Emotion::Neutral, 1.0)]),
            urgency: Urgency::Normal,
            formality: Formality::Neutral,
            top_topics: Vec::new(),
            summary_text: "Unable to analyze the message content.".to_string(),
        }
    }
}
