//! Text rendering of the front-end pages for a terminal.
//!
//! Every function returns a `String`; writing is left to the caller.

use std::fmt::Write as _;

use crate::client::{ChatMessage, GateView, Route, SessionGate, Theme};
use crate::client::routes::{HIGHLIGHTS, PRODUCT_NAME, TAGLINE, landing_links};
use crate::protocol::{ChatHistoryResponse, Sender, SessionStatus};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// ANSI colours for one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// User bubble text.
    pub user: &'static str,
    /// Assistant bubble text.
    pub ai: &'static str,
    /// Resource block.
    pub resource: &'static str,
    /// Fallback entry and form errors.
    pub error: &'static str,
    /// Whether escape codes are emitted at all.
    pub enabled: bool,
}

impl Palette {
    /// Palette for `theme`.
    #[must_use]
    pub const fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                user: "\x1b[34m",
                ai: "\x1b[30m",
                resource: "\x1b[33m",
                error: "\x1b[31m",
                enabled: true,
            },
            Theme::Dark => Self {
                user: "\x1b[96m",
                ai: "\x1b[97m",
                resource: "\x1b[93m",
                error: "\x1b[91m",
                enabled: true,
            },
        }
    }

    /// Palette without escape codes.
    #[must_use]
    pub const fn plain() -> Self {
        Self {
            user: "",
            ai: "",
            resource: "",
            error: "",
            enabled: false,
        }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.enabled {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

/// Badge colour for an emotion tag, grey for unknown tags.
#[must_use]
pub fn emotion_color(emotion: &str) -> &'static str {
    match emotion {
        "joy" | "happy" => "\x1b[32m",
        "sadness" | "sad" => "\x1b[34m",
        "anger" | "angry" => "\x1b[31m",
        "fear" | "anxious" => "\x1b[35m",
        "surprise" | "confused" => "\x1b[33m",
        "disgust" => "\x1b[92m",
        "crisis" => "\x1b[1;31m",
        _ => "\x1b[90m",
    }
}

/// Boxed title banner.
#[must_use]
pub fn banner(title: &str) -> String {
    let width = title.chars().count() + 10;
    let rule = "═".repeat(width);
    format!("  ╔{rule}╗\n  ║     {title}     ║\n  ╚{rule}╝\n")
}

/// Landing page.
#[must_use]
pub fn landing(palette: &Palette) -> String {
    let mut out = banner(PRODUCT_NAME);
    let _ = writeln!(out, "\n  {TAGLINE}\n");
    for (label, route) in landing_links() {
        let _ = writeln!(out, "  {} {label}", palette.paint(BOLD, route.path()));
    }
    let _ = writeln!(out, "\n  {}", palette.paint(DIM, &HIGHLIGHTS.join(" • ")));
    out
}

/// Greeting shown while the chat log is empty.
#[must_use]
pub fn empty_chat() -> String {
    "  Hi! I'm here to listen and support you.\n  Share how you're feeling today...\n".to_string()
}

/// One log entry: text, metadata badge, help resources and time.
#[must_use]
pub fn message(entry: &ChatMessage, palette: &Palette) -> String {
    let mut out = String::new();
    let (label, color) = match (entry.from, entry.error) {
        (Sender::User, _) => ("You", palette.user),
        (Sender::Ai, true) => (PRODUCT_NAME, palette.error),
        (Sender::Ai, false) => (PRODUCT_NAME, palette.ai),
    };
    let _ = writeln!(out, "{} {}", palette.paint(BOLD, &format!("{label}:")), palette.paint(color, &entry.text));

    if entry.from == Sender::Ai
        && let Some(emotion) = entry.emotion.as_deref()
    {
        let badge = palette.paint(emotion_color(emotion), &format!("[{}]", emotion.to_uppercase()));
        let mut line = format!("  {badge}");
        if let Some(severity) = &entry.severity {
            let _ = write!(line, " Severity: {severity}");
        }
        if let Some(confidence) = entry.confidence {
            let _ = write!(line, " (confidence {confidence:.2})");
        }
        let _ = writeln!(out, "{line}");
    }

    let resources = entry.visible_resources();
    if entry.from == Sender::Ai && !resources.is_empty() {
        let _ = writeln!(out, "  {}", palette.paint(palette.resource, "Resources that might help:"));
        for resource in resources {
            let mut line = format!("   - {}", resource.name);
            if let Some(description) = &resource.description {
                let _ = write!(line, " - {description}");
            }
            if let Some(url) = &resource.url {
                let _ = write!(line, " <{url}>");
            }
            let _ = writeln!(out, "{}", palette.paint(palette.resource, &line));
        }
    }

    let _ = writeln!(out, "  {}", palette.paint(DIM, &entry.display_time()));
    out
}

/// What the chat route shows for the gate state.
#[must_use]
pub fn gate(session_gate: &SessionGate) -> String {
    match session_gate.view() {
        GateView::Loading => "Loading...\n".to_string(),
        GateView::Redirect(navigation) => {
            let mut out = format!("Not signed in, redirecting to {}\n", navigation.route());
            if let Some(error) = session_gate.error() {
                let _ = writeln!(out, "({error})");
            }
            out
        }
        GateView::Chat(session) => format!(
            "Signed in as {}\n",
            session.user.name.as_deref().unwrap_or(&session.user.email)
        ),
    }
}

/// Form error line.
#[must_use]
pub fn form_error(palette: &Palette, message: &str) -> String {
    format!("{}\n", palette.paint(palette.error, message))
}

/// Stored turns of a session, one line each.
#[must_use]
pub fn history(history: &ChatHistoryResponse) -> String {
    if history.messages.is_empty() {
        return "  No stored messages.\n".to_string();
    }
    let mut out = String::new();
    for entry in &history.messages {
        let _ = writeln!(
            out,
            "  [{}] {}: {}",
            entry.timestamp.format("%H:%M:%S"),
            entry.sender,
            entry.message
        );
    }
    out
}

/// Timeout status of a session.
#[must_use]
pub fn session_status(status: &SessionStatus) -> String {
    if status.active {
        return format!(
            "Session active, {} minute(s) until timeout.\n",
            status.minutes_until_timeout.unwrap_or_default()
        );
    }
    status.message.as_ref().map_or_else(
        || "Session inactive.\n".to_string(),
        |message| format!("Session inactive ({message}).\n"),
    )
}

/// Header for a route.
#[must_use]
pub fn route_header(route: Route) -> String {
    match route {
        Route::Landing => banner(PRODUCT_NAME),
        Route::SignIn => banner("Sign in"),
        Route::SignUp => banner("Create account"),
        Route::Chat => banner(&format!("{PRODUCT_NAME} Chat")),
    }
}

/// Help text for the chat prompt.
#[must_use]
pub fn chat_help() -> String {
    [
        "  Type a message and press Enter to send.",
        "  /theme    toggle light/dark",
        "  /history  show the session history stored by the service",
        "  /status   show the session timeout status",
        "  /signout  sign out and return to the sign-in page",
        "  /quit     leave",
    ]
    .join("\n")
        + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::message::FALLBACK_TEXT;
    use crate::protocol::{Resource, SendMessageResponse, Severity};

    fn reply(needs_help: bool) -> ChatMessage {
        ChatMessage::reply(
            1,
            SendMessageResponse {
                response: "I'm here for you.".into(),
                session_id: "s".into(),
                emotion: Some("sad".into()),
                severity: Some(Severity::Level(5.0)),
                confidence: Some(0.7),
                needs_help,
                resources: vec![Resource::new(
                    "Crisis Text Line",
                    "https://www.crisistextline.org/",
                    "24/7 crisis support via text",
                )],
            },
        )
    }

    #[test]
    fn test_reply_shows_badge_and_severity() {
        let text = message(&reply(false), &Palette::plain());
        assert!(text.starts_with("FeelMate: I'm here for you."));
        assert!(text.contains("[SAD] Severity: Medium (confidence 0.70)"));
        assert!(!text.contains("Resources that might help"));
    }

    #[test]
    fn test_resources_only_with_help_flag() {
        let text = message(&reply(true), &Palette::plain());
        assert!(text.contains("Resources that might help:"));
        assert!(text.contains(
            "   - Crisis Text Line - 24/7 crisis support via text <https://www.crisistextline.org/>"
        ));
    }

    #[test]
    fn test_confidence_without_severity() {
        let mut entry = reply(false);
        entry.severity = None;
        let text = message(&entry, &Palette::plain());
        assert!(text.contains("[SAD] (confidence 0.70)"));
    }

    #[test]
    fn test_fallback_has_no_badge() {
        let text = message(&ChatMessage::fallback(2), &Palette::plain());
        assert!(text.contains(FALLBACK_TEXT));
        assert!(!text.contains("Severity"));
    }

    #[test]
    fn test_user_entry() {
        let text = message(&ChatMessage::user(1, "hello"), &Palette::plain());
        assert!(text.starts_with("You: hello"));
    }

    #[test]
    fn test_landing_lists_routes() {
        let text = landing(&Palette::plain());
        assert!(text.contains(TAGLINE));
        assert!(text.contains("/sign-up Create an account"));
    }

    #[test]
    fn test_colored_output_resets() {
        let text = message(&ChatMessage::user(1, "hi"), &Palette::for_theme(Theme::Dark));
        assert!(text.contains(RESET));
    }

    #[test]
    fn test_history_lines() {
        use crate::protocol::HistoryEntry;
        use chrono::{TimeZone, Utc};

        let response = ChatHistoryResponse {
            session_id: "s".into(),
            messages: vec![HistoryEntry {
                message: "hello".into(),
                sender: Sender::User,
                emotion: None,
                severity: None,
                confidence: None,
                timestamp: Utc.with_ymd_and_hms(2026, 1, 2, 9, 5, 7).unwrap(),
            }],
        };
        assert_eq!(history(&response), "  [09:05:07] user: hello\n");
    }

    #[test]
    fn test_unknown_session_status() {
        let text = session_status(&SessionStatus::not_found());
        assert_eq!(text, "Session inactive (Session not found).\n");
    }

    #[test]
    fn test_plain_form_error() {
        assert_eq!(form_error(&Palette::plain(), "Email is required."), "Email is required.\n");
    }
}
