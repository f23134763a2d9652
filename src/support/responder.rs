//! Templated supportive replies and help resources.

use rand::seq::SliceRandom;

use crate::protocol::{Resource, Sender};
use crate::support::emotion::{Emotion, EmotionReading, SeverityLevel};
use crate::support::store::ConversationTurn;

/// Reply used when no template covers the reading.
pub const DEFAULT_REPLY: &str = "I'm here to listen. Would you like to tell me more?";

/// Prefix added when the user answers a question the assistant asked.
pub const FOLLOW_UP_PREFIX: &str = "Thank you for opening up about that. ";

/// Fixed reply for crisis readings.
pub const CRISIS_REPLY: &str = "I'm very concerned about what you're saying. You're not alone, and there are people who want to help you. Please call the National Suicide Prevention Lifeline at 988 or text HOME to 741741 to reach the Crisis Text Line. These services are free, confidential, and available 24/7.";

/// Words marking an assistant turn as a question to the user.
const QUESTION_MARKERS: &[&str] = &["tell me", "share", "what", "how", "why"];

/// Chooses reply text and resources for a classified message.
#[derive(Debug, Default)]
pub struct ResponseGenerator {
    /// Always pick the first template variant.
    deterministic: bool,
}

impl ResponseGenerator {
    /// Generator picking a random variant when several templates fit.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            deterministic: false,
        }
    }

    /// Generator that always picks the first variant.
    #[must_use]
    pub const fn deterministic() -> Self {
        Self {
            deterministic: true,
        }
    }

    /// Reply text for `reading`, given the turns before the current message.
    #[must_use]
    pub fn reply(&self, reading: &EmotionReading, history: &[ConversationTurn]) -> String {
        if reading.emotion == Emotion::Crisis {
            return CRISIS_REPLY.to_string();
        }

        let base = self.pick(templates(reading.emotion, reading.severity));

        if follows_assistant_question(history) {
            format!("{FOLLOW_UP_PREFIX}{base}")
        } else {
            base.to_string()
        }
    }

    fn pick(&self, variants: &'static [&'static str]) -> &'static str {
        let choice = if self.deterministic {
            variants.first()
        } else {
            variants.choose(&mut rand::thread_rng())
        };
        choice.copied().unwrap_or(DEFAULT_REPLY)
    }

    /// Help links for `reading`; empty unless help is needed.
    #[must_use]
    pub fn resources(&self, reading: &EmotionReading) -> Vec<Resource> {
        if !reading.needs_help {
            return Vec::new();
        }

        let mut resources = vec![
            Resource::new(
                "Crisis Text Line",
                "https://www.crisistextline.org/",
                "24/7 crisis support via text",
            ),
            Resource::new(
                "988 Suicide & Crisis Lifeline",
                "https://988lifeline.org/",
                "24/7 suicide prevention support",
            ),
        ];

        match reading.emotion {
            Emotion::Sad | Emotion::Anxious => resources.push(Resource::new(
                "BetterHelp",
                "https://www.betterhelp.com/",
                "Online therapy and counseling",
            )),
            Emotion::Angry => resources.push(Resource::new(
                "Anger Management Resources",
                "https://www.apa.org/topics/anger",
                "Professional anger management guidance",
            )),
            _ => {}
        }

        resources.push(Resource::new(
            "Find a Therapist",
            "https://www.psychologytoday.com/us/therapists",
            "Professional mental health support",
        ));

        resources
    }
}

fn follows_assistant_question(history: &[ConversationTurn]) -> bool {
    history.last().is_some_and(|turn| {
        turn.sender == Sender::Ai && {
            let text = turn.message.to_lowercase();
            QUESTION_MARKERS.iter().any(|marker| text.contains(marker))
        }
    })
}

#[allow(clippy::match_same_arms)]
const fn templates(emotion: Emotion, severity: SeverityLevel) -> &'static [&'static str] {
    match (emotion, severity) {
        (Emotion::Sad, SeverityLevel::Low) => &[
            "I hear that you're feeling down. Would you like to talk more about what's on your mind?",
        ],
        (Emotion::Sad, SeverityLevel::Moderate) => &[
            "It sounds like you're going through a difficult time. I'm here to listen. Can you tell me more about what's making you feel this way?",
            "I'm sorry you're feeling sad. It's okay to feel this way, and I'm here to listen. Would you like to talk more about what's on your mind?",
        ],
        (Emotion::Sad, _) => &[
            "I can sense that you're really struggling right now. Your feelings are valid, and it's okay to not be okay. Would you like to share more about what's happening?",
        ],
        (Emotion::Anxious, SeverityLevel::Low) => &[
            "I notice you seem a bit anxious. Is there something specific that's worrying you?",
        ],
        (Emotion::Anxious, SeverityLevel::Moderate) => &[
            "Anxiety can be really overwhelming. Let's take a moment to breathe together. What's causing you to feel this way?",
            "It sounds like you're experiencing some fear or anxiety. I'm here to listen and support you through this.",
        ],
        (Emotion::Anxious, _) => &[
            "I can see that anxiety is really affecting you right now. Remember, you're safe here. Can you tell me what's making you feel so anxious?",
        ],
        (Emotion::Angry, SeverityLevel::Low) => &[
            "I can sense some frustration. What's been bothering you lately?",
        ],
        (Emotion::Angry, SeverityLevel::Moderate) => &[
            "It sounds like you're dealing with some anger. That's a natural emotion. Would you like to talk about what happened?",
            "Your anger is valid, and I'm here to listen. Sometimes we need to vent to process our feelings. What's been frustrating you?",
        ],
        (Emotion::Angry, _) => &[
            "I can feel the intensity of your emotions. It's okay to be angry. Can you help me understand what led to this?",
        ],
        (Emotion::Happy, _) => &[
            "I'm so happy to hear that! Your positive energy is contagious. What made you feel this way?",
            "That's wonderful! I can feel your joy through your words. Tell me more about what's bringing you happiness!",
        ],
        (Emotion::Confused, _) => &[
            "It's okay to feel unsure. Let's untangle it together. What's the part that feels most confusing right now?",
        ],
        (Emotion::Neutral, _) => &[
            "I'm here to listen and support you. How are you really feeling today?",
            "I'm listening. What would you like to share or talk about today?",
        ],
        (Emotion::Crisis, _) => &[CRISIS_REPLY],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(emotion: Emotion, severity: SeverityLevel) -> EmotionReading {
        EmotionReading {
            emotion,
            severity,
            confidence: 0.7,
            needs_help: severity.needs_help(),
        }
    }

    #[test]
    fn test_crisis_reply_is_fixed() {
        let generator = ResponseGenerator::new();
        let history = vec![ConversationTurn {
            sender: Sender::Ai,
            message: "What happened?".into(),
        }];
        let text = generator.reply(&reading(Emotion::Crisis, SeverityLevel::Critical), &history);
        assert_eq!(text, CRISIS_REPLY);
    }

    #[test]
    fn test_follow_up_prefix() {
        let generator = ResponseGenerator::deterministic();
        let history = vec![ConversationTurn {
            sender: Sender::Ai,
            message: "Can you tell me more?".into(),
        }];
        let text = generator.reply(&reading(Emotion::Sad, SeverityLevel::Low), &history);
        assert!(text.starts_with(FOLLOW_UP_PREFIX));
        assert!(text.ends_with("what's on your mind?"));
    }

    #[test]
    fn test_no_prefix_after_user_turn() {
        let generator = ResponseGenerator::deterministic();
        let history = vec![ConversationTurn {
            sender: Sender::User,
            message: "what now".into(),
        }];
        let text = generator.reply(&reading(Emotion::Neutral, SeverityLevel::Low), &history);
        assert!(!text.starts_with(FOLLOW_UP_PREFIX));
    }

    #[test]
    fn test_random_variant_is_a_template() {
        let generator = ResponseGenerator::new();
        let text = generator.reply(&reading(Emotion::Happy, SeverityLevel::Low), &[]);
        assert!(templates(Emotion::Happy, SeverityLevel::Low).contains(&text.as_str()));
    }

    #[test]
    fn test_resources_only_when_help_needed() {
        let generator = ResponseGenerator::new();
        assert!(generator.resources(&reading(Emotion::Sad, SeverityLevel::Moderate)).is_empty());

        let resources = generator.resources(&reading(Emotion::Sad, SeverityLevel::High));
        let names: Vec<_> = resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Crisis Text Line", "988 Suicide & Crisis Lifeline", "BetterHelp", "Find a Therapist"]
        );
    }

    #[test]
    fn test_anger_resources() {
        let generator = ResponseGenerator::new();
        let resources = generator.resources(&reading(Emotion::Angry, SeverityLevel::High));
        assert!(resources.iter().any(|r| r.name == "Anger Management Resources"));
    }
}
