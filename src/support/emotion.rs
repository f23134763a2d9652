//! Context-aware keyword emotion classifier.
//!
//! Scores the current message together with the user's last few turns against
//! per-emotion keyword tables. Crisis phrases short-circuit everything else.

use std::fmt;

use regex::Regex;
use tracing::debug;

use crate::protocol::Sender;
use crate::support::store::ConversationTurn;

/// Number of previous turns folded into the classification context.
const CONTEXT_TURNS: usize = 3;

/// Confidence reported for a crisis match.
const CRISIS_CONFIDENCE: f64 = 0.95;
/// Confidence reported when nothing matched.
const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Words in the current message that push severity to high.
const INTENSIFIERS: &[&str] = &["very", "extremely", "terribly"];

/// Emotion labels produced by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emotion {
    /// Low mood.
    Sad,
    /// Worry or stress.
    Anxious,
    /// Anger or frustration.
    Angry,
    /// Positive mood.
    Happy,
    /// Uncertainty.
    Confused,
    /// Self-harm or suicide indicators.
    Crisis,
    /// No signal.
    Neutral,
}

impl Emotion {
    /// Wire and storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sad => "sad",
            Self::Anxious => "anxious",
            Self::Angry => "angry",
            Self::Happy => "happy",
            Self::Confused => "confused",
            Self::Crisis => "crisis",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency category attached to a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeverityLevel {
    /// Mild signal.
    Low,
    /// Clear signal.
    Moderate,
    /// Strong signal, help resources offered.
    High,
    /// Crisis.
    Critical,
}

impl SeverityLevel {
    /// Wire and storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Whether replies at this level carry help resources.
    #[must_use]
    pub const fn needs_help(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one message.
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionReading {
    /// Dominant emotion.
    pub emotion: Emotion,
    /// Urgency.
    pub severity: SeverityLevel,
    /// Heuristic confidence in `[0, 1]`.
    pub confidence: f64,
    /// Whether help resources should accompany the reply.
    pub needs_help: bool,
}

impl EmotionReading {
    /// Reading used when no keyword matched.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            emotion: Emotion::Neutral,
            severity: SeverityLevel::Low,
            confidence: NEUTRAL_CONFIDENCE,
            needs_help: false,
        }
    }

    const fn crisis() -> Self {
        Self {
            emotion: Emotion::Crisis,
            severity: SeverityLevel::Critical,
            confidence: CRISIS_CONFIDENCE,
            needs_help: true,
        }
    }
}

/// Keyword set for one emotion.
struct KeywordRule {
    emotion: Emotion,
    patterns: Vec<Regex>,
}

impl KeywordRule {
    /// Keywords matched as whole words.
    fn new(emotion: Emotion, keywords: &[&str]) -> Result<Self, regex::Error> {
        Self::build(emotion, keywords, |keyword| format!(r"(?i)\b{}\b", regex::escape(keyword)))
    }

    /// Phrases matched anywhere, so inflections like "self-harming" still hit.
    fn substring(emotion: Emotion, phrases: &[&str]) -> Result<Self, regex::Error> {
        Self::build(emotion, phrases, |phrase| format!("(?i){}", regex::escape(phrase)))
    }

    fn build(
        emotion: Emotion,
        keywords: &[&str],
        pattern: fn(&str) -> String,
    ) -> Result<Self, regex::Error> {
        let patterns = keywords
            .iter()
            .map(|keyword| Regex::new(&pattern(keyword)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { emotion, patterns })
    }

    /// Number of distinct keywords present in `text`.
    fn score(&self, text: &str) -> usize {
        self.patterns.iter().filter(|p| p.is_match(text)).count()
    }
}

/// Keyword classifier with crisis detection.
pub struct EmotionClassifier {
    crisis: KeywordRule,
    rules: Vec<KeywordRule>,
    intensifiers: KeywordRule,
}

impl EmotionClassifier {
    /// Build the classifier with the built-in keyword tables.
    ///
    /// # Errors
    /// Returns an error if any keyword pattern is invalid.
    pub fn new() -> Result<Self, regex::Error> {
        let crisis = KeywordRule::substring(
            Emotion::Crisis,
            &[
                "suicide",
                "kill myself",
                "end it all",
                "end my life",
                "want to die",
                "no reason to live",
                "better off dead",
                "hurt myself",
                "harm myself",
                "self-harm",
                "cut myself",
                "overdose",
                "can't take it anymore",
            ],
        )?;

        // Table order breaks score ties.
        let rules = vec![
            KeywordRule::new(
                Emotion::Sad,
                &["sad", "depressed", "unhappy", "miserable", "hopeless", "lonely", "empty", "worthless"],
            )?,
            KeywordRule::new(
                Emotion::Anxious,
                &["anxious", "worried", "nervous", "stressed", "panic", "fear", "scared", "overwhelmed"],
            )?,
            KeywordRule::new(
                Emotion::Angry,
                &["angry", "furious", "mad", "irritated", "frustrated", "rage", "hate", "bitter"],
            )?,
            KeywordRule::new(
                Emotion::Happy,
                &["happy", "joyful", "excited", "elated", "content", "pleased", "grateful", "blessed"],
            )?,
            KeywordRule::new(
                Emotion::Confused,
                &["confused", "lost", "uncertain", "unsure", "doubtful", "questioning", "perplexed"],
            )?,
        ];

        let intensifiers = KeywordRule::new(Emotion::Neutral, INTENSIFIERS)?;

        Ok(Self {
            crisis,
            rules,
            intensifiers,
        })
    }

    /// Classify `message` in the context of the session's earlier turns.
    ///
    /// Only user turns feed the context; assistant replies echo emotion words
    /// back and would skew the scores.
    #[must_use]
    pub fn classify(&self, message: &str, history: &[ConversationTurn]) -> EmotionReading {
        let context = build_context(message, history);

        if self.crisis.score(&context) > 0 {
            debug!("crisis indicator detected");
            return EmotionReading::crisis();
        }

        let best = self
            .rules
            .iter()
            .map(|rule| (rule.emotion, rule.score(&context)))
            .filter(|(_, score)| *score > 0)
            .fold(None, |best: Option<(Emotion, usize)>, candidate| match best {
                Some((_, best_score)) if best_score >= candidate.1 => best,
                _ => Some(candidate),
            });

        let Some((emotion, score)) = best else {
            return EmotionReading::neutral();
        };

        let severity = if score >= 3 || self.intensifiers.score(&normalize(message)) > 0 {
            SeverityLevel::High
        } else if score == 1 && history.len() < 2 {
            SeverityLevel::Low
        } else {
            SeverityLevel::Moderate
        };

        #[allow(clippy::cast_precision_loss)]
        let confidence = 0.2f64.mul_add(score as f64, 0.3).min(0.9);

        EmotionReading {
            emotion,
            severity,
            confidence,
            needs_help: severity.needs_help(),
        }
    }
}

fn build_context(message: &str, history: &[ConversationTurn]) -> String {
    let start = history.len().saturating_sub(CONTEXT_TURNS);
    let mut parts: Vec<&str> = history[start..]
        .iter()
        .filter(|turn| turn.sender == Sender::User)
        .map(|turn| turn.message.as_str())
        .collect();
    parts.push(message);
    normalize(&parts.join(" "))
}

/// Lower-case and fold typographic apostrophes to ASCII.
fn normalize(text: &str) -> String {
    text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(sender: Sender, message: &str) -> ConversationTurn {
        ConversationTurn {
            sender,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_crisis_short_circuits() {
        let classifier = EmotionClassifier::new().unwrap();
        let reading = classifier.classify("I'm so happy but I want to die", &[]);
        assert_eq!(reading.emotion, Emotion::Crisis);
        assert_eq!(reading.severity, SeverityLevel::Critical);
        assert!(reading.needs_help);
        assert!((reading.confidence - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn test_crisis_phrases_match_inflections() {
        let classifier = EmotionClassifier::new().unwrap();
        for message in [
            "I have been self-harming again",
            "I overdosed last night",
            "i can\u{2019}t take it anymore",
            "I CAN'T TAKE IT ANYMORE",
        ] {
            let reading = classifier.classify(message, &[]);
            assert_eq!(reading.emotion, Emotion::Crisis, "{message}");
            assert!(reading.needs_help, "{message}");
        }
    }

    #[test]
    fn test_crisis_in_recent_history() {
        let classifier = EmotionClassifier::new().unwrap();
        let history = vec![
            turn(Sender::User, "sometimes I think about suicide"),
            turn(Sender::Ai, "I'm very concerned"),
        ];
        let reading = classifier.classify("anyway", &history);
        assert_eq!(reading.emotion, Emotion::Crisis);
    }

    #[test]
    fn test_neutral_when_nothing_matches() {
        let classifier = EmotionClassifier::new().unwrap();
        let reading = classifier.classify("I had pasta for lunch", &[]);
        assert_eq!(reading, EmotionReading::neutral());
    }

    #[test]
    fn test_single_keyword_first_turn_is_low() {
        let classifier = EmotionClassifier::new().unwrap();
        let reading = classifier.classify("I feel sad today", &[]);
        assert_eq!(reading.emotion, Emotion::Sad);
        assert_eq!(reading.severity, SeverityLevel::Low);
        assert!(!reading.needs_help);
        assert!((reading.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_intensifier_raises_severity() {
        let classifier = EmotionClassifier::new().unwrap();
        let reading = classifier.classify("I am very worried", &[]);
        assert_eq!(reading.emotion, Emotion::Anxious);
        assert_eq!(reading.severity, SeverityLevel::High);
        assert!(reading.needs_help);
    }

    #[test]
    fn test_three_keywords_is_high() {
        let classifier = EmotionClassifier::new().unwrap();
        let reading = classifier.classify("lonely, empty and hopeless", &[]);
        assert_eq!(reading.emotion, Emotion::Sad);
        assert_eq!(reading.severity, SeverityLevel::High);
        assert!((reading.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_single_keyword_with_history_is_moderate() {
        let classifier = EmotionClassifier::new().unwrap();
        let history = vec![
            turn(Sender::User, "hi"),
            turn(Sender::Ai, "hello, how are you?"),
        ];
        let reading = classifier.classify("kind of frustrated", &history);
        assert_eq!(reading.emotion, Emotion::Angry);
        assert_eq!(reading.severity, SeverityLevel::Moderate);
    }

    #[test]
    fn test_assistant_turns_do_not_feed_context() {
        let classifier = EmotionClassifier::new().unwrap();
        let history = vec![turn(Sender::Ai, "I notice you seem a bit anxious")];
        let reading = classifier.classify("ok", &history);
        assert_eq!(reading.emotion, Emotion::Neutral);
    }

    #[test]
    fn test_whole_word_matching() {
        let classifier = EmotionClassifier::new().unwrap();
        // "made" must not count as "mad".
        let reading = classifier.classify("I made dinner", &[]);
        assert_eq!(reading.emotion, Emotion::Neutral);
    }

    #[test]
    fn test_tie_prefers_table_order() {
        let classifier = EmotionClassifier::new().unwrap();
        let reading = classifier.classify("sad and happy", &[]);
        assert_eq!(reading.emotion, Emotion::Sad);
    }
}
