//! Emotion classification for user input.
//!
//! The label set follows the six-way emotion corpus most text classifiers are
//! trained on (sadness, joy, love, anger, fear, surprise) plus `neutral` for
//! input that carries no signal.

use anyhow::Result;
use async_trait::async_trait;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::llm_client::{LlmClient, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Sadness,
    Joy,
    Love,
    Anger,
    Fear,
    Surprise,
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Sadness,
        Emotion::Joy,
        Emotion::Love,
        Emotion::Anger,
        Emotion::Fear,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Sadness => "sadness",
            Emotion::Joy => "joy",
            Emotion::Love => "love",
            Emotion::Anger => "anger",
            Emotion::Fear => "fear",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }

    /// Lenient parse; anything unrecognised is neutral.
    pub fn from_label(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sadness" | "sad" => Emotion::Sadness,
            "joy" | "happy" | "happiness" => Emotion::Joy,
            "love" => Emotion::Love,
            "anger" | "angry" => Emotion::Anger,
            "fear" | "afraid" | "anxiety" => Emotion::Fear,
            "surprise" | "surprised" => Emotion::Surprise,
            _ => Emotion::Neutral,
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionReading {
    pub emotion: Emotion,
    /// Classifier confidence in [0, 1]
    pub confidence: f64,
}

impl EmotionReading {
    pub fn new(emotion: Emotion, confidence: f64) -> Self {
        Self {
            emotion,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn neutral() -> Self {
        Self::new(Emotion::Neutral, 0.5)
    }
}

#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<EmotionReading>;
}

const SADNESS_WORDS: &[&str] = &[
    "sad", "lost", "lose", "losing", "cry", "crying", "cried", "lonely", "alone", "miss",
    "missing", "depressed", "depressing", "grief", "hurt", "heartbroken", "unhappy", "died",
    "passed", "fired", "broke", "miserable", "tired", "hopeless", "sorry",
];
const JOY_WORDS: &[&str] = &[
    "happy", "great", "awesome", "excited", "glad", "wonderful", "amazing", "fun", "yay",
    "promoted", "won", "celebrate", "celebrating", "fantastic", "good", "enjoy", "enjoyed",
    "lol", "haha",
];
const LOVE_WORDS: &[&str] = &[
    "love", "loved", "loving", "adore", "darling", "sweetheart", "crush", "cherish", "caring",
];
const ANGER_WORDS: &[&str] = &[
    "angry", "mad", "furious", "hate", "annoyed", "annoying", "irritated", "unfair", "rage",
    "pissed", "stupid", "sick",
];
const FEAR_WORDS: &[&str] = &[
    "scared", "afraid", "fear", "worried", "worry", "anxious", "nervous", "terrified", "panic",
    "frightened", "stress", "stressed",
];
const SURPRISE_WORDS: &[&str] = &[
    "wow", "surprised", "surprising", "unexpected", "shocked", "suddenly", "whoa", "unbelievable",
    "omg",
];

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[a-z']+").expect("static word pattern"))
}

/// Offline keyword scorer. Counts lexicon hits per emotion and reports the
/// winner with a confidence proportional to its share of all hits.
#[derive(Debug, Default, Clone)]
pub struct LexiconEmotionClassifier;

impl LexiconEmotionClassifier {
    pub fn new() -> Self {
        Self
    }

    fn lexicon() -> [(Emotion, &'static [&'static str]); 6] {
        [
            (Emotion::Sadness, SADNESS_WORDS),
            (Emotion::Fear, FEAR_WORDS),
            (Emotion::Anger, ANGER_WORDS),
            (Emotion::Joy, JOY_WORDS),
            (Emotion::Love, LOVE_WORDS),
            (Emotion::Surprise, SURPRISE_WORDS),
        ]
    }

    pub fn score(&self, text: &str) -> EmotionReading {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = word_pattern()
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .collect();

        let mut best: Option<(Emotion, usize)> = None;
        let mut total = 0usize;
        for (emotion, lexicon) in Self::lexicon() {
            let hits = words.iter().filter(|w| lexicon.contains(*w)).count();
            total += hits;
            // Strictly greater: earlier lexicon entries win ties
            if hits > 0 && best.map_or(true, |(_, top)| hits > top) {
                best = Some((emotion, hits));
            }
        }

        match best {
            Some((emotion, hits)) => {
                let share = hits as f64 / total as f64;
                EmotionReading::new(emotion, (0.5 + 0.45 * share).min(0.95))
            }
            None => EmotionReading::neutral(),
        }
    }
}

#[async_trait]
impl EmotionClassifier for LexiconEmotionClassifier {
    async fn classify(&self, text: &str) -> Result<EmotionReading> {
        Ok(self.score(text))
    }
}

#[derive(Debug, Deserialize)]
struct LlmVerdict {
    label: String,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Asks a language model for a JSON verdict. Any transport or parse failure
/// falls back to the keyword lexicon so a turn never fails on classification.
pub struct LlmEmotionClassifier {
    client: LlmClient,
    fallback: LexiconEmotionClassifier,
}

impl LlmEmotionClassifier {
    pub fn new(client: LlmClient) -> Self {
        Self {
            client,
            fallback: LexiconEmotionClassifier::new(),
        }
    }

    fn prompt(text: &str) -> Vec<Message> {
        vec![
            Message::system(
                "You classify the emotion of a single user message. \
                 Answer with JSON only: {\"label\": one of \"sadness\", \"joy\", \"love\", \
                 \"anger\", \"fear\", \"surprise\", \"neutral\", \"confidence\": number between 0 and 1}",
            ),
            Message::user(text),
        ]
    }
}

#[async_trait]
impl EmotionClassifier for LlmEmotionClassifier {
    async fn classify(&self, text: &str) -> Result<EmotionReading> {
        match self.client.generate_json::<LlmVerdict>(Self::prompt(text)).await {
            Ok(verdict) => Ok(EmotionReading::new(
                Emotion::from_label(&verdict.label),
                verdict.confidence.unwrap_or(0.5),
            )),
            Err(e) => {
                tracing::warn!("Emotion model failed, using lexicon: {:#}", e);
                Ok(self.fallback.score(text))
            }
        }
    }
}
