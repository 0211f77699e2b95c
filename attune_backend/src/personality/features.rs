use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::PersonalityTrait;

/// Stylistic feature observed in a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFeature {
    Formal,
    Verbose,
    Empathetic,
    Humorous,
}

impl ResponseFeature {
    /// The trait that feedback on this feature adjusts.
    pub fn personality_trait(self) -> PersonalityTrait {
        match self {
            ResponseFeature::Formal => PersonalityTrait::Formality,
            ResponseFeature::Verbose => PersonalityTrait::Verbosity,
            ResponseFeature::Empathetic => PersonalityTrait::Empathy,
            ResponseFeature::Humorous => PersonalityTrait::Humor,
        }
    }
}

/// Text in, detected features out. Feedback only moves the traits whose
/// feature the detector reports, so a stronger classifier can replace the
/// lexical one without touching the trait math.
pub trait FeatureDetector: Send + Sync {
    fn detect(&self, text: &str) -> HashSet<ResponseFeature>;
}

const FORMAL_WORDS: &[&str] = &[
    "furthermore",
    "however",
    "nevertheless",
    "regarding",
    "additionally",
    "consequently",
    "therefore",
];
const INFORMAL_WORDS: &[&str] = &["gonna", "wanna", "yeah", "nah", "lol", "haha"];
const EMPATHY_PHRASES: &[&str] = &[
    "i understand",
    "that must be",
    "i can imagine",
    "that sounds",
    "you feel",
    "you're feeling",
];
const HUMOR_TOKENS: &[&str] = &[
    "\u{1F604}", // 😄
    "\u{1F602}", // 😂
    "\u{1F923}", // 🤣
    "\u{1F609}", // 😉
    "haha",
    "lol",
    "funny",
    "joke",
];
pub const VERBOSE_WORD_THRESHOLD: usize = 60;

/// Substring keyword heuristics over the lowercased reply.
#[derive(Debug, Default, Clone)]
pub struct LexicalFeatureDetector;

impl LexicalFeatureDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn is_formal(text: &str) -> bool {
        let lowered = text.to_lowercase();
        let formal = FORMAL_WORDS.iter().filter(|w| lowered.contains(*w)).count();
        let informal = INFORMAL_WORDS.iter().filter(|w| lowered.contains(*w)).count();
        formal > informal
    }

    pub fn is_verbose(text: &str) -> bool {
        text.split_whitespace().count() > VERBOSE_WORD_THRESHOLD
    }

    pub fn is_empathetic(text: &str) -> bool {
        let lowered = text.to_lowercase();
        EMPATHY_PHRASES.iter().any(|p| lowered.contains(p))
    }

    pub fn is_humorous(text: &str) -> bool {
        let lowered = text.to_lowercase();
        HUMOR_TOKENS.iter().any(|t| lowered.contains(t))
    }
}

impl FeatureDetector for LexicalFeatureDetector {
    fn detect(&self, text: &str) -> HashSet<ResponseFeature> {
        let checks = [
            (ResponseFeature::Formal, Self::is_formal(text)),
            (ResponseFeature::Verbose, Self::is_verbose(text)),
            (ResponseFeature::Empathetic, Self::is_empathetic(text)),
            (ResponseFeature::Humorous, Self::is_humorous(text)),
        ];
        checks
            .into_iter()
            .filter_map(|(feature, present)| present.then_some(feature))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formal_needs_more_formal_than_informal_markers() {
        assert!(LexicalFeatureDetector::is_formal(
            "However, regarding your question, the answer is yes."
        ));
        assert!(!LexicalFeatureDetector::is_formal("However, yeah, lol, that's it."));
        assert!(!LexicalFeatureDetector::is_formal("Sure thing."));
    }

    #[test]
    fn verbosity_is_a_word_count_threshold() {
        let sixty = vec!["word"; 60].join(" ");
        let sixty_one = vec!["word"; 61].join(" ");
        assert!(!LexicalFeatureDetector::is_verbose(&sixty));
        assert!(LexicalFeatureDetector::is_verbose(&sixty_one));
    }

    #[test]
    fn detects_empathy_and_humor() {
        let detector = LexicalFeatureDetector::new();
        let features = detector.detect("That sounds really tough. I Understand 😉");
        assert!(features.contains(&ResponseFeature::Empathetic));
        assert!(features.contains(&ResponseFeature::Humorous));
        assert!(!features.contains(&ResponseFeature::Verbose));

        let plain = detector.detect("Okay.");
        assert!(plain.is_empty());
    }
}
