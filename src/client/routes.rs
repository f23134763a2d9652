//! Front-end routes and the landing page content.

use std::fmt;

/// Product name shown in headers.
pub const PRODUCT_NAME: &str = "FeelMate";

/// Landing page tagline.
pub const TAGLINE: &str = "A calm, welcoming space to share how you feel. FeelMate listens without judgment and responds with empathy and gentle guidance. You are not alone here.";

/// Highlights listed under the landing call to action.
pub const HIGHLIGHTS: [&str; 3] = ["Private by default", "Non-judgmental support", "Available 24/7"];

/// Pages of the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Landing page.
    Landing,
    /// Email sign-in form.
    SignIn,
    /// Email sign-up form.
    SignUp,
    /// Chat widget behind the session gate.
    Chat,
}

impl Route {
    /// URL path of the route.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Landing => "/",
            Self::SignIn => "/sign-in",
            Self::SignUp => "/sign-up",
            Self::Chat => "/chat",
        }
    }

    /// Route for a path, ignoring a trailing slash.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" | "/landing" => Some(Self::Landing),
            "/sign-in" => Some(Self::SignIn),
            "/sign-up" => Some(Self::SignUp),
            "/chat" => Some(Self::Chat),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Where the front end should go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Replace the current page with `Route`.
    To(Route),
}

impl Navigation {
    /// Target route.
    #[must_use]
    pub const fn route(self) -> Route {
        match self {
            Self::To(route) => route,
        }
    }
}

/// Links offered by the landing page, in display order.
#[must_use]
pub const fn landing_links() -> [(&'static str, Route); 3] {
    [
        ("Start chatting", Route::Chat),
        ("Sign in", Route::SignIn),
        ("Create an account", Route::SignUp),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_round_trip() {
        for route in [Route::Landing, Route::SignIn, Route::SignUp, Route::Chat] {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
    }

    #[test]
    fn test_path_aliases() {
        assert_eq!(Route::from_path("/chat/"), Some(Route::Chat));
        assert_eq!(Route::from_path("/landing"), Some(Route::Landing));
        assert_eq!(Route::from_path("/admin"), None);
    }
}
