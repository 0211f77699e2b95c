//! Adaptive personality profile.
//!
//! Eight named traits, each a score in [1, 10], move in response to three
//! transitions: a confidence-scaled nudge from the user's detected emotion, a
//! small random drift applied alongside it, and a correction from explicit
//! 1-5 feedback on the previous reply. Every transition ends with a clamp.

pub mod features;
pub mod store;
pub mod topics;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;

use crate::emotion::Emotion;
use features::{FeatureDetector, LexicalFeatureDetector, ResponseFeature};
use store::PersonalityStore;
use topics::{extract_topics, TopicInterest, TopicTracker, FAVORITE_TOPIC_LIMIT};

pub const TRAIT_MIN: f64 = 1.0;
pub const TRAIT_MAX: f64 = 10.0;

pub const EMOTION_ADJUSTMENT_SCALE: f64 = 0.1;
pub const FEEDBACK_ADJUSTMENT_SCALE: f64 = 0.3;
pub const FEEDBACK_DEAD_BAND: f64 = 0.2;
pub const INTERACTION_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalityTrait {
    Formality,
    Verbosity,
    Empathy,
    Humor,
    Assertiveness,
    Positivity,
    Curiosity,
    Supportiveness,
}

impl PersonalityTrait {
    pub const ALL: [PersonalityTrait; 8] = [
        PersonalityTrait::Formality,
        PersonalityTrait::Verbosity,
        PersonalityTrait::Empathy,
        PersonalityTrait::Humor,
        PersonalityTrait::Assertiveness,
        PersonalityTrait::Positivity,
        PersonalityTrait::Curiosity,
        PersonalityTrait::Supportiveness,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PersonalityTrait::Formality => "formality",
            PersonalityTrait::Verbosity => "verbosity",
            PersonalityTrait::Empathy => "empathy",
            PersonalityTrait::Humor => "humor",
            PersonalityTrait::Assertiveness => "assertiveness",
            PersonalityTrait::Positivity => "positivity",
            PersonalityTrait::Curiosity => "curiosity",
            PersonalityTrait::Supportiveness => "supportiveness",
        }
    }

    pub fn from_name(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(raw.trim()))
    }

    pub fn default_score(self) -> f64 {
        match self {
            PersonalityTrait::Empathy | PersonalityTrait::Positivity => 6.0,
            PersonalityTrait::Curiosity | PersonalityTrait::Supportiveness => 7.0,
            _ => 5.0,
        }
    }
}

impl fmt::Display for PersonalityTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Score per trait. Always holds all eight traits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitScores(BTreeMap<PersonalityTrait, f64>);

impl Default for TraitScores {
    fn default() -> Self {
        Self(
            PersonalityTrait::ALL
                .into_iter()
                .map(|t| (t, t.default_score()))
                .collect(),
        )
    }
}

impl TraitScores {
    pub fn get(&self, personality_trait: PersonalityTrait) -> f64 {
        self.0
            .get(&personality_trait)
            .copied()
            .unwrap_or_else(|| personality_trait.default_score())
    }

    /// Set a score, clamped into [1, 10].
    pub fn set(&mut self, personality_trait: PersonalityTrait, value: f64) {
        self.0.insert(personality_trait, clamp_score(value));
    }

    pub fn iter(&self) -> impl Iterator<Item = (PersonalityTrait, f64)> + '_ {
        self.0.iter().map(|(t, v)| (*t, *v))
    }

    fn clamp_all(&mut self) {
        for value in self.0.values_mut() {
            *value = clamp_score(*value);
        }
    }
}

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return TRAIT_MIN;
    }
    value.clamp(TRAIT_MIN, TRAIT_MAX)
}

/// One row of the emotion table: move `target` by `confidence * 0.1 * scale`,
/// then bound the result by `limit` (a floor for decreases, a cap for
/// increases). A score already beyond the limit lands on it.
#[derive(Debug, Clone, Copy)]
pub struct TraitNudge {
    pub target: PersonalityTrait,
    pub scale: f64,
    pub limit: f64,
}

const fn nudge(target: PersonalityTrait, scale: f64, limit: f64) -> TraitNudge {
    TraitNudge {
        target,
        scale,
        limit,
    }
}

const DISTRESS_NUDGES: &[TraitNudge] = &[
    nudge(PersonalityTrait::Empathy, 1.0, TRAIT_MAX),
    nudge(PersonalityTrait::Supportiveness, 1.0, TRAIT_MAX),
    nudge(PersonalityTrait::Positivity, 0.5, TRAIT_MAX),
    nudge(PersonalityTrait::Verbosity, -0.3, 3.0),
];
const ANGER_NUDGES: &[TraitNudge] = &[
    nudge(PersonalityTrait::Empathy, 1.0, TRAIT_MAX),
    nudge(PersonalityTrait::Assertiveness, 0.5, 8.0),
    nudge(PersonalityTrait::Humor, -1.0, 2.0),
];
const JOY_NUDGES: &[TraitNudge] = &[
    nudge(PersonalityTrait::Humor, 1.0, TRAIT_MAX),
    nudge(PersonalityTrait::Formality, -1.0, 2.0),
    nudge(PersonalityTrait::Positivity, 0.5, TRAIT_MAX),
];
const SURPRISE_NUDGES: &[TraitNudge] = &[nudge(PersonalityTrait::Curiosity, 1.0, TRAIT_MAX)];

/// The fixed emotion to trait-delta table.
pub fn emotion_nudges(emotion: Emotion) -> &'static [TraitNudge] {
    match emotion {
        Emotion::Sadness | Emotion::Fear => DISTRESS_NUDGES,
        Emotion::Anger => ANGER_NUDGES,
        Emotion::Joy => JOY_NUDGES,
        Emotion::Surprise => SURPRISE_NUDGES,
        Emotion::Love | Emotion::Neutral => &[],
    }
}

/// Trait state plus the pure transition functions. No I/O.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalityProfile {
    pub traits: TraitScores,
}

impl PersonalityProfile {
    pub fn new(traits: TraitScores) -> Self {
        Self { traits }
    }

    pub fn get(&self, personality_trait: PersonalityTrait) -> f64 {
        self.traits.get(personality_trait)
    }

    /// Emotion-driven adjustment, scaled by classifier confidence.
    pub fn apply_emotion(&mut self, emotion: Emotion, confidence: f64) {
        let factor = confidence.clamp(0.0, 1.0) * EMOTION_ADJUSTMENT_SCALE;
        for rule in emotion_nudges(emotion) {
            let moved = self.traits.get(rule.target) + factor * rule.scale;
            let next = if rule.scale >= 0.0 {
                moved.min(rule.limit)
            } else {
                moved.max(rule.limit)
            };
            self.traits.set(rule.target, next);
        }
        self.traits.clamp_all();
    }

    /// Independent uniform perturbation in [-magnitude, magnitude] on every trait.
    pub fn apply_drift<R: RngCore + ?Sized>(&mut self, rng: &mut R, magnitude: f64) {
        if !magnitude.is_finite() || magnitude <= 0.0 {
            return;
        }
        for personality_trait in PersonalityTrait::ALL {
            let jitter = rng.gen_range(-magnitude..=magnitude);
            self.traits
                .set(personality_trait, self.traits.get(personality_trait) + jitter);
        }
    }

    /// Feedback-driven adjustment. Returns false when the score falls in the
    /// neutral dead-band and nothing changed.
    pub fn apply_feedback(&mut self, score: u8, features: &HashSet<ResponseFeature>) -> bool {
        let normalized = (f64::from(score) - 3.0) / 2.0;
        if normalized > -FEEDBACK_DEAD_BAND && normalized < FEEDBACK_DEAD_BAND {
            return false;
        }

        let delta = normalized * FEEDBACK_ADJUSTMENT_SCALE;
        for feature in features {
            let target = feature.personality_trait();
            self.traits.set(target, self.traits.get(target) + delta);
        }
        self.traits.clamp_all();
        true
    }

    /// Natural-language style instructions derived from trait thresholds.
    pub fn instructions(&self, favorite_topics: &[String]) -> String {
        let formality = self.get(PersonalityTrait::Formality);
        let verbosity = self.get(PersonalityTrait::Verbosity);
        let humor = self.get(PersonalityTrait::Humor);

        let mut instructions = Vec::new();

        if formality > 7.0 {
            instructions.push("Use formal language and avoid contractions.".to_string());
        } else if formality < 4.0 {
            instructions.push("Use casual, conversational language.".to_string());
        }

        if verbosity > 7.0 {
            instructions.push("Be thorough and detailed in your responses.".to_string());
        } else if verbosity < 4.0 {
            instructions.push("Keep responses brief and to the point.".to_string());
        }

        if self.get(PersonalityTrait::Empathy) > 7.0 {
            instructions
                .push("Show strong empathy and understanding for the user's emotions.".to_string());
        }

        if humor > 7.0 {
            instructions.push("Incorporate light humor where appropriate.".to_string());
        } else if humor < 3.0 {
            instructions.push("Maintain a serious tone.".to_string());
        }

        if self.get(PersonalityTrait::Positivity) > 7.0 {
            instructions.push("Maintain an optimistic and encouraging tone.".to_string());
        }

        if self.get(PersonalityTrait::Curiosity) > 7.0 {
            instructions.push("Show interest in learning more about the user.".to_string());
        }

        if !favorite_topics.is_empty() {
            instructions.push(format!(
                "The user enjoys discussing these topics: {}. Reference them when relevant.",
                favorite_topics.join(", ")
            ));
        }

        instructions.join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonalitySettings {
    pub drift_magnitude: f64,
    pub topic_decay_probability: f64,
}

impl Default for PersonalitySettings {
    fn default() -> Self {
        Self {
            drift_magnitude: 0.05,
            topic_decay_probability: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub user_message: String,
    pub bot_response: String,
    pub emotion: Emotion,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

/// The live profile plus everything needed to evolve and persist it.
/// Owned by the orchestrator; loaded once per session.
pub struct PersonalityEngine {
    profile: PersonalityProfile,
    store: PersonalityStore,
    detector: Box<dyn FeatureDetector>,
    rng: Box<dyn RngCore + Send>,
    settings: PersonalitySettings,
    recent_interactions: VecDeque<InteractionRecord>,
}

impl PersonalityEngine {
    /// Restore persisted traits, storing the defaults on first run.
    pub fn load(store: PersonalityStore, settings: PersonalitySettings) -> Result<Self> {
        let traits = match store.load_traits()? {
            Some(traits) => {
                tracing::info!("Loaded personality profile");
                traits
            }
            None => {
                let defaults = TraitScores::default();
                store.save_traits(&defaults)?;
                store.save_snapshot("defaults", &defaults)?;
                tracing::info!("Initialised default personality profile");
                defaults
            }
        };

        Ok(Self {
            profile: PersonalityProfile::new(traits),
            store,
            detector: Box::new(LexicalFeatureDetector::new()),
            rng: Box::new(StdRng::from_entropy()),
            settings,
            recent_interactions: VecDeque::with_capacity(INTERACTION_HISTORY_LIMIT),
        })
    }

    pub fn with_detector(mut self, detector: Box<dyn FeatureDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.rng = rng;
        self
    }

    pub fn profile(&self) -> &PersonalityProfile {
        &self.profile
    }

    pub fn store(&self) -> &PersonalityStore {
        &self.store
    }

    pub fn recent_interactions(&self) -> impl Iterator<Item = &InteractionRecord> {
        self.recent_interactions.iter()
    }

    /// Full per-turn update: topics, emotion nudge with drift, optional
    /// feedback correction, then flush traits and a snapshot.
    pub fn update_from_interaction(
        &mut self,
        user_message: &str,
        bot_response: &str,
        emotion: Emotion,
        confidence: f64,
        feedback: Option<u8>,
    ) -> Result<()> {
        let now = Utc::now();
        self.remember(InteractionRecord {
            user_message: user_message.to_string(),
            bot_response: bot_response.to_string(),
            emotion,
            confidence,
            timestamp: now,
        });

        let topics = extract_topics(user_message);
        let tracker = TopicTracker::new(&self.store, self.settings.topic_decay_probability);
        let report = tracker.record_mentions(&topics, now, &mut *self.rng)?;
        if !topics.is_empty() {
            tracing::debug!(
                "Topics mentioned: {:?} (new: {:?})",
                topics,
                report.new_topics
            );
        }

        self.profile.apply_emotion(emotion, confidence);
        self.profile
            .apply_drift(&mut *self.rng, self.settings.drift_magnitude);

        let mut trigger = "interaction";
        if let Some(score) = feedback {
            let features = self.detector.detect(bot_response);
            if self.profile.apply_feedback(score, &features) {
                tracing::info!("Feedback {} adjusted traits for {:?}", score, features);
                trigger = "feedback";
            }
        }

        self.flush(trigger)
    }

    /// Persist the current traits and append a history snapshot.
    pub fn flush(&self, trigger: &str) -> Result<()> {
        self.store.save_traits(&self.profile.traits)?;
        self.store.save_snapshot(trigger, &self.profile.traits)?;
        Ok(())
    }

    pub fn favorite_topics(&self) -> Result<Vec<String>> {
        self.store.favorite_topics(FAVORITE_TOPIC_LIMIT)
    }

    pub fn topic_interests(&self) -> Result<Vec<TopicInterest>> {
        self.store.all_topics()
    }

    pub fn instructions(&self) -> Result<String> {
        Ok(self.profile.instructions(&self.favorite_topics()?))
    }

    fn remember(&mut self, record: InteractionRecord) {
        if self.recent_interactions.len() == INTERACTION_HISTORY_LIMIT {
            self.recent_interactions.pop_front();
        }
        self.recent_interactions.push_back(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_settings() -> PersonalitySettings {
        PersonalitySettings {
            drift_magnitude: 0.0,
            topic_decay_probability: 0.0,
        }
    }

    fn features(list: &[ResponseFeature]) -> HashSet<ResponseFeature> {
        list.iter().copied().collect()
    }

    #[test]
    fn defaults_match_the_baseline_personality() {
        let scores = TraitScores::default();
        assert_eq!(scores.iter().count(), 8);
        assert_eq!(scores.get(PersonalityTrait::Formality), 5.0);
        assert_eq!(scores.get(PersonalityTrait::Empathy), 6.0);
        assert_eq!(scores.get(PersonalityTrait::Curiosity), 7.0);
        assert_eq!(scores.get(PersonalityTrait::Supportiveness), 7.0);
    }

    #[test]
    fn sadness_raises_care_and_shortens_replies() {
        let mut profile = PersonalityProfile::default();
        let before = profile.clone();
        profile.apply_emotion(Emotion::Sadness, 1.0);

        assert!(profile.get(PersonalityTrait::Empathy) > before.get(PersonalityTrait::Empathy));
        assert!(
            profile.get(PersonalityTrait::Supportiveness)
                > before.get(PersonalityTrait::Supportiveness)
        );
        assert!(profile.get(PersonalityTrait::Verbosity) < before.get(PersonalityTrait::Verbosity));
        assert!((profile.get(PersonalityTrait::Empathy) - 6.1).abs() < 1e-9);
        assert!((profile.get(PersonalityTrait::Verbosity) - 4.97).abs() < 1e-9);
    }

    #[test]
    fn anger_and_joy_follow_the_table() {
        let mut angry = PersonalityProfile::default();
        angry.apply_emotion(Emotion::Anger, 0.5);
        assert!((angry.get(PersonalityTrait::Assertiveness) - 5.025).abs() < 1e-9);
        assert!((angry.get(PersonalityTrait::Humor) - 4.95).abs() < 1e-9);

        let mut joyful = PersonalityProfile::default();
        joyful.apply_emotion(Emotion::Joy, 1.0);
        assert!((joyful.get(PersonalityTrait::Humor) - 5.1).abs() < 1e-9);
        assert!((joyful.get(PersonalityTrait::Formality) - 4.9).abs() < 1e-9);

        let mut neutral = PersonalityProfile::default();
        neutral.apply_emotion(Emotion::Neutral, 1.0);
        assert_eq!(neutral, PersonalityProfile::default());
    }

    #[test]
    fn rule_limits_pull_values_onto_the_bound() {
        let mut traits = TraitScores::default();
        traits.set(PersonalityTrait::Verbosity, 2.0);
        traits.set(PersonalityTrait::Assertiveness, 9.0);
        traits.set(PersonalityTrait::Humor, 1.5);
        traits.set(PersonalityTrait::Formality, 1.2);
        let mut profile = PersonalityProfile::new(traits);

        profile.apply_emotion(Emotion::Sadness, 1.0);
        assert_eq!(profile.get(PersonalityTrait::Verbosity), 3.0);

        profile.apply_emotion(Emotion::Anger, 1.0);
        assert_eq!(profile.get(PersonalityTrait::Assertiveness), 8.0);
        assert_eq!(profile.get(PersonalityTrait::Humor), 2.0);

        profile.apply_emotion(Emotion::Joy, 1.0);
        assert_eq!(profile.get(PersonalityTrait::Formality), 2.0);

        let mut near_floor = TraitScores::default();
        near_floor.set(PersonalityTrait::Verbosity, 3.01);
        let mut profile = PersonalityProfile::new(near_floor);
        profile.apply_emotion(Emotion::Fear, 1.0);
        assert_eq!(profile.get(PersonalityTrait::Verbosity), 3.0);
    }

    #[test]
    fn non_finite_drift_is_ignored() {
        let mut profile = PersonalityProfile::default();
        let mut rng = StdRng::seed_from_u64(1);
        profile.apply_drift(&mut rng, f64::NAN);
        profile.apply_drift(&mut rng, f64::INFINITY);
        assert_eq!(profile, PersonalityProfile::default());
    }

    #[test]
    fn every_transition_respects_bounds() {
        let mut traits = TraitScores::default();
        for t in PersonalityTrait::ALL {
            traits.set(t, 9.99);
        }
        traits.set(PersonalityTrait::Humor, 1.01);
        let mut profile = PersonalityProfile::new(traits);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            profile.apply_emotion(Emotion::Sadness, 1.0);
            profile.apply_emotion(Emotion::Anger, 1.0);
            profile.apply_drift(&mut rng, 5.0);
            profile.apply_feedback(
                5,
                &features(&[ResponseFeature::Empathetic, ResponseFeature::Formal]),
            );
            profile.apply_feedback(1, &features(&[ResponseFeature::Humorous]));
            for (_, value) in profile.traits.iter() {
                assert!((TRAIT_MIN..=TRAIT_MAX).contains(&value));
            }
        }

        let mut scores = TraitScores::default();
        scores.set(PersonalityTrait::Humor, 1e9);
        assert_eq!(scores.get(PersonalityTrait::Humor), TRAIT_MAX);
        scores.set(PersonalityTrait::Humor, f64::NAN);
        assert_eq!(scores.get(PersonalityTrait::Humor), TRAIT_MIN);
    }

    #[test]
    fn drift_stays_within_magnitude() {
        let mut profile = PersonalityProfile::default();
        let mut rng = StdRng::seed_from_u64(9);
        profile.apply_drift(&mut rng, 0.05);
        for t in PersonalityTrait::ALL {
            let moved = (profile.get(t) - t.default_score()).abs();
            assert!(moved <= 0.05 + 1e-12);
        }
    }

    #[test]
    fn neutral_feedback_is_ignored() {
        let mut profile = PersonalityProfile::default();
        let all = features(&[
            ResponseFeature::Formal,
            ResponseFeature::Verbose,
            ResponseFeature::Empathetic,
            ResponseFeature::Humorous,
        ]);
        assert!(!profile.apply_feedback(3, &all));
        assert_eq!(profile, PersonalityProfile::default());
    }

    #[test]
    fn positive_feedback_only_moves_detected_traits() {
        let detector = LexicalFeatureDetector::new();
        let reply = "I understand how hard this is. Take your time.";
        let mut profile = PersonalityProfile::default();
        assert!(profile.apply_feedback(5, &detector.detect(reply)));

        assert!((profile.get(PersonalityTrait::Empathy) - 6.3).abs() < 1e-9);
        assert_eq!(profile.get(PersonalityTrait::Humor), 5.0);
        assert_eq!(profile.get(PersonalityTrait::Formality), 5.0);

        let mut scolded = PersonalityProfile::default();
        assert!(scolded.apply_feedback(2, &features(&[ResponseFeature::Humorous])));
        assert!((scolded.get(PersonalityTrait::Humor) - 4.85).abs() < 1e-9);
    }

    #[test]
    fn instructions_follow_thresholds() {
        let mut traits = TraitScores::default();
        traits.set(PersonalityTrait::Formality, 8.0);
        traits.set(PersonalityTrait::Verbosity, 3.5);
        traits.set(PersonalityTrait::Empathy, 7.5);
        traits.set(PersonalityTrait::Humor, 2.0);
        traits.set(PersonalityTrait::Curiosity, 5.0);
        let profile = PersonalityProfile::new(traits);

        let text = profile.instructions(&["music".to_string(), "travel".to_string()]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Use formal language and avoid contractions.",
                "Keep responses brief and to the point.",
                "Show strong empathy and understanding for the user's emotions.",
                "Maintain a serious tone.",
                "The user enjoys discussing these topics: music, travel. Reference them when relevant.",
            ]
        );

        assert_eq!(
            PersonalityProfile::default().instructions(&[]),
            ""
        );
    }

    #[test]
    fn profile_survives_reload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("personality.db");

        let saved = {
            let store = PersonalityStore::new(&path).unwrap();
            let mut engine = PersonalityEngine::load(store, PersonalitySettings::default())
                .unwrap()
                .with_rng(Box::new(StdRng::seed_from_u64(5)));
            engine
                .update_from_interaction("I love music", "Haha, me too!", Emotion::Joy, 0.8, None)
                .unwrap();
            engine
                .update_from_interaction("", "Haha, me too!", Emotion::Joy, 0.8, Some(5))
                .unwrap();
            engine.profile().clone()
        };

        let reopened = PersonalityStore::new(&path).unwrap();
        let engine = PersonalityEngine::load(reopened, PersonalitySettings::default()).unwrap();
        for t in PersonalityTrait::ALL {
            assert!((engine.profile().get(t) - saved.get(t)).abs() < 1e-9);
        }
        assert_eq!(engine.favorite_topics().unwrap(), vec!["music"]);
        let history = engine.store().get_persona_history(10).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].trigger, "feedback");
    }

    #[test]
    fn engine_keeps_a_bounded_interaction_history() {
        let store = PersonalityStore::open_in_memory().unwrap();
        let mut engine = PersonalityEngine::load(store, quiet_settings()).unwrap();
        for i in 0..(INTERACTION_HISTORY_LIMIT + 5) {
            engine
                .update_from_interaction(&format!("message {i}"), "ok", Emotion::Neutral, 0.5, None)
                .unwrap();
        }
        let history: Vec<_> = engine.recent_interactions().collect();
        assert_eq!(history.len(), INTERACTION_HISTORY_LIMIT);
        assert_eq!(history[0].user_message, "message 5");
        // Neutral emotion with drift disabled leaves traits untouched.
        assert_eq!(engine.profile(), &PersonalityProfile::default());
    }
}
