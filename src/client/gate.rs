//! Session gate in front of the chat route.

use tracing::warn;

use crate::client::auth::{AuthClient, AuthSession};
use crate::client::routes::{Navigation, Route};

/// Resolution state of the auth session query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// The query has not resolved yet.
    Pending,
    /// The query resolved; `None` means signed out.
    Resolved(Option<AuthSession>),
    /// The query failed with this message.
    Failed(String),
}

/// What the chat route should show for the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateView<'a> {
    /// Loading indicator.
    Loading,
    /// Leave the chat route.
    Redirect(Navigation),
    /// Render the chat widget for this session.
    Chat(&'a AuthSession),
}

/// Explicit, passed-down auth session holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGate {
    state: SessionState,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGate {
    /// Gate in the pending state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SessionState::Pending,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Query the provider once and record the outcome.
    pub async fn resolve<A: AuthClient + ?Sized>(&mut self, auth: &A) -> &SessionState {
        self.state = match auth.get_session().await {
            Ok(session) => SessionState::Resolved(session),
            Err(err) => {
                warn!(error = %err, "Session query failed");
                SessionState::Failed(err.to_string())
            }
        };
        &self.state
    }

    /// Forget the session, e.g. after sign-out.
    pub fn clear(&mut self) {
        self.state = SessionState::Resolved(None);
    }

    /// View for the chat route. Failures route like a signed-out user.
    #[must_use]
    pub const fn view(&self) -> GateView<'_> {
        match &self.state {
            SessionState::Pending => GateView::Loading,
            SessionState::Resolved(Some(session)) => GateView::Chat(session),
            SessionState::Resolved(None) | SessionState::Failed(_) => {
                GateView::Redirect(Navigation::To(Route::SignIn))
            }
        }
    }

    /// Failure message kept for display.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            SessionState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::auth::{
        AuthFuture, AuthResponse, AuthUser, SessionInfo, SignInRequest, SignUpRequest,
    };
    use crate::client::errors::{ClientError, ClientResult};
    use chrono::{TimeZone, Utc};

    enum Provider {
        SignedIn,
        SignedOut,
        Down,
    }

    fn session() -> AuthSession {
        AuthSession {
            session: SessionInfo {
                id: "sess-1".into(),
                user_id: "user-1".into(),
                expires_at: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
            },
            user: AuthUser {
                id: "user-1".into(),
                email: "a@b.co".into(),
                name: Some("anonymous".into()),
            },
        }
    }

    impl AuthClient for Provider {
        fn sign_in_email(&self, _: SignInRequest) -> AuthFuture<'_, ClientResult<AuthResponse>> {
            Box::pin(async { Err(ClientError::Status(501)) })
        }

        fn sign_up_email(&self, _: SignUpRequest) -> AuthFuture<'_, ClientResult<AuthResponse>> {
            Box::pin(async { Err(ClientError::Status(501)) })
        }

        fn get_session(&self) -> AuthFuture<'_, ClientResult<Option<AuthSession>>> {
            let result = match self {
                Self::SignedIn => Ok(Some(session())),
                Self::SignedOut => Ok(None),
                Self::Down => Err(ClientError::Status(503)),
            };
            Box::pin(async move { result })
        }

        fn sign_out(&self) -> AuthFuture<'_, ClientResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[test]
    fn test_pending_shows_loading() {
        let gate = SessionGate::new();
        assert_eq!(gate.view(), GateView::Loading);
    }

    #[tokio::test]
    async fn test_signed_in_renders_chat() {
        let mut gate = SessionGate::new();
        gate.resolve(&Provider::SignedIn).await;
        assert!(matches!(gate.view(), GateView::Chat(s) if s.user.id == "user-1"));
    }

    #[tokio::test]
    async fn test_signed_out_redirects() {
        let mut gate = SessionGate::new();
        gate.resolve(&Provider::SignedOut).await;
        assert_eq!(gate.view(), GateView::Redirect(Navigation::To(Route::SignIn)));
        assert!(gate.error().is_none());
    }

    #[tokio::test]
    async fn test_failure_redirects_and_keeps_message() {
        let mut gate = SessionGate::new();
        gate.resolve(&Provider::Down).await;
        assert_eq!(gate.view(), GateView::Redirect(Navigation::To(Route::SignIn)));
        assert_eq!(gate.error(), Some("unexpected status: 503"));
    }

    #[tokio::test]
    async fn test_clear_after_sign_out() {
        let mut gate = SessionGate::new();
        gate.resolve(&Provider::SignedIn).await;
        gate.clear();
        assert_eq!(gate.state(), &SessionState::Resolved(None));
    }
}
