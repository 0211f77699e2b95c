use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use super::store::PersonalityStore;
use super::{TRAIT_MAX, TRAIT_MIN};

pub const TOPIC_VOCABULARY: &[&str] = &[
    "family",
    "work",
    "health",
    "relationships",
    "education",
    "technology",
    "entertainment",
    "food",
    "travel",
    "fitness",
    "music",
    "movies",
    "books",
    "sports",
    "news",
    "politics",
    "science",
    "art",
];

pub const NEW_TOPIC_INTEREST: f64 = 5.0;
pub const INTEREST_GROWTH_RATE: f64 = 0.1;
pub const INTEREST_DECAY_FACTOR: f64 = 0.99;
pub const STALE_TOPIC_DAYS: i64 = 7;
pub const FAVORITE_TOPIC_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicInterest {
    pub topic: String,
    pub interest_level: f64,
    pub mention_count: i64,
    pub last_mentioned: DateTime<Utc>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MentionReport {
    pub new_topics: Vec<String>,
    pub reinforced: Vec<String>,
    /// Number of topics decayed, or `None` when the decay pass did not run
    pub decayed: Option<usize>,
}

/// Vocabulary topics appearing in `text`, by plain substring match.
pub fn extract_topics(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOPIC_VOCABULARY
        .iter()
        .filter(|topic| lowered.contains(*topic))
        .map(|topic| topic.to_string())
        .collect()
}

/// Grow interest toward the ceiling with diminishing returns.
pub fn reinforce(level: f64) -> f64 {
    (level + (TRAIT_MAX - level) * INTEREST_GROWTH_RATE).min(TRAIT_MAX)
}

pub fn decay(level: f64) -> f64 {
    (level * INTEREST_DECAY_FACTOR).max(TRAIT_MIN)
}

/// Tracks how interested the user is in each vocabulary topic.
pub struct TopicTracker<'a> {
    store: &'a PersonalityStore,
    decay_probability: f64,
}

impl<'a> TopicTracker<'a> {
    pub fn new(store: &'a PersonalityStore, decay_probability: f64) -> Self {
        Self {
            store,
            decay_probability: if decay_probability.is_nan() {
                0.0
            } else {
                decay_probability.clamp(0.0, 1.0)
            },
        }
    }

    /// Upsert every mentioned topic, then maybe decay stale ones.
    pub fn record_mentions<R: RngCore + ?Sized>(
        &self,
        topics: &[String],
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<MentionReport> {
        let mut report = MentionReport::default();

        for topic in topics {
            let updated = match self.store.get_topic(topic)? {
                Some(existing) => {
                    report.reinforced.push(topic.clone());
                    TopicInterest {
                        topic: topic.clone(),
                        interest_level: reinforce(existing.interest_level),
                        mention_count: existing.mention_count + 1,
                        last_mentioned: now,
                    }
                }
                None => {
                    report.new_topics.push(topic.clone());
                    TopicInterest {
                        topic: topic.clone(),
                        interest_level: NEW_TOPIC_INTEREST,
                        mention_count: 1,
                        last_mentioned: now,
                    }
                }
            };
            self.store.upsert_topic(&updated)?;
        }

        if rng.gen_bool(self.decay_probability) {
            report.decayed = Some(self.decay_stale(topics, now)?);
        }

        Ok(report)
    }

    /// Decay topics not in `mentioned` and untouched for more than a week.
    pub fn decay_stale(&self, mentioned: &[String], now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - ChronoDuration::days(STALE_TOPIC_DAYS);
        let mut decayed = 0;
        for interest in self.store.all_topics()? {
            if mentioned.contains(&interest.topic) || interest.last_mentioned >= cutoff {
                continue;
            }
            self.store.upsert_topic(&TopicInterest {
                interest_level: decay(interest.interest_level),
                ..interest
            })?;
            decayed += 1;
        }
        if decayed > 0 {
            tracing::debug!("Decayed interest in {} stale topics", decayed);
        }
        Ok(decayed)
    }

    pub fn favorite_topics(&self, limit: usize) -> Result<Vec<String>> {
        self.store.favorite_topics(limit)
    }
}
