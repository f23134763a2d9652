//! Email sign-in and sign-up forms.

use tracing::warn;

use crate::client::auth::{AuthClient, SignInRequest, SignUpRequest};
use crate::client::errors::ClientError;
use crate::client::routes::{Navigation, Route};

/// Shown when sign-in fails without a provider message.
pub const SIGN_IN_FALLBACK: &str = "Sign in failed. Please check your email and password.";
/// Shown when sign-up fails without a provider message.
pub const SIGN_UP_FALLBACK: &str = "Sign up failed. Please try again.";
/// Display name sent with every sign-up.
pub const DEFAULT_SIGN_UP_NAME: &str = "anonymous";
/// Route both forms land on after success.
pub const CALLBACK_ROUTE: Route = Route::Chat;

/// Field check equivalent to `required` plus `type=email`.
fn check_fields(email: &str, password: &str) -> Result<(), String> {
    if email.trim().is_empty() {
        return Err("Email is required.".to_string());
    }
    if password.is_empty() {
        return Err("Password is required.".to_string());
    }
    if !looks_like_email(email.trim()) {
        return Err("Please enter a valid email address.".to_string());
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.split('.').all(|label| !label.is_empty())
}

fn failure_text(err: &ClientError, fallback: &str) -> String {
    match err {
        ClientError::Auth(message) => message.clone(),
        _ => fallback.to_string(),
    }
}

/// State of the sign-in page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignInForm {
    /// Email field.
    pub email: String,
    /// Password field.
    pub password: String,
    error: Option<String>,
    is_loading: bool,
}

impl SignInForm {
    /// Empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Message from the last failed submit.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a submit is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Submit the form. Returns where to go on success.
    ///
    /// On failure the error text is kept for display and the form stays usable.
    pub async fn submit<A: AuthClient + ?Sized>(&mut self, auth: &A) -> Option<Navigation> {
        self.error = None;
        if let Err(message) = check_fields(&self.email, &self.password) {
            self.error = Some(message);
            return None;
        }

        self.is_loading = true;
        let result = auth
            .sign_in_email(SignInRequest {
                email: self.email.trim().to_string(),
                password: self.password.clone(),
                callback_url: Some(CALLBACK_ROUTE.path().to_string()),
            })
            .await;
        self.is_loading = false;

        match result {
            Ok(_) => Some(Navigation::To(CALLBACK_ROUTE)),
            Err(err) => {
                warn!(error = %err, "Sign in error");
                self.error = Some(failure_text(&err, SIGN_IN_FALLBACK));
                None
            }
        }
    }
}

/// State of the sign-up page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpForm {
    /// Email field.
    pub email: String,
    /// Password field.
    pub password: String,
    /// Display name sent to the provider.
    pub name: String,
    error: Option<String>,
    is_loading: bool,
}

impl Default for SignUpForm {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            name: DEFAULT_SIGN_UP_NAME.to_string(),
            error: None,
            is_loading: false,
        }
    }
}

impl SignUpForm {
    /// Empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Message from the last failed submit.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a submit is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Submit the form. Returns where to go on success.
    pub async fn submit<A: AuthClient + ?Sized>(&mut self, auth: &A) -> Option<Navigation> {
        self.error = None;
        if let Err(message) = check_fields(&self.email, &self.password) {
            self.error = Some(message);
            return None;
        }

        self.is_loading = true;
        let result = auth
            .sign_up_email(SignUpRequest {
                email: self.email.trim().to_string(),
                password: self.password.clone(),
                name: self.name.clone(),
                callback_url: Some(CALLBACK_ROUTE.path().to_string()),
            })
            .await;
        self.is_loading = false;

        match result {
            Ok(_) => Some(Navigation::To(CALLBACK_ROUTE)),
            Err(err) => {
                warn!(error = %err, "Sign up error");
                self.error = Some(failure_text(&err, SIGN_UP_FALLBACK));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::auth::{AuthFuture, AuthResponse, AuthSession, AuthUser};
    use crate::client::errors::ClientResult;
    use std::sync::Mutex;

    /// Accepts one password, rejects everything else with `reject`.
    struct FakeAuth {
        password: &'static str,
        reject: fn() -> ClientError,
        sign_ups: Mutex<Vec<SignUpRequest>>,
        calls: Mutex<usize>,
    }

    impl FakeAuth {
        fn new(reject: fn() -> ClientError) -> Self {
            Self {
                password: "secret",
                reject,
                sign_ups: Mutex::default(),
                calls: Mutex::new(0),
            }
        }

        fn outcome(&self, password: &str) -> ClientResult<AuthResponse> {
            *self.calls.lock().unwrap() += 1;
            if password == self.password {
                Ok(AuthResponse {
                    token: Some("t".into()),
                    url: None,
                    user: AuthUser {
                        id: "u1".into(),
                        email: "a@b.co".into(),
                        name: None,
                    },
                })
            } else {
                Err((self.reject)())
            }
        }
    }

    impl AuthClient for FakeAuth {
        fn sign_in_email(&self, request: SignInRequest) -> AuthFuture<'_, ClientResult<AuthResponse>> {
            let outcome = self.outcome(&request.password);
            Box::pin(async move { outcome })
        }

        fn sign_up_email(&self, request: SignUpRequest) -> AuthFuture<'_, ClientResult<AuthResponse>> {
            let outcome = self.outcome(&request.password);
            self.sign_ups.lock().unwrap().push(request);
            Box::pin(async move { outcome })
        }

        fn get_session(&self) -> AuthFuture<'_, ClientResult<Option<AuthSession>>> {
            Box::pin(async { Ok(None) })
        }

        fn sign_out(&self) -> AuthFuture<'_, ClientResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn provider_message() -> ClientError {
        ClientError::Auth("Invalid email or password".into())
    }

    fn server_down() -> ClientError {
        ClientError::Status(502)
    }

    #[tokio::test]
    async fn test_sign_in_success_navigates_to_chat() {
        let auth = FakeAuth::new(provider_message);
        let mut form = SignInForm::new();
        form.email = "a@b.co".into();
        form.password = "secret".into();

        assert_eq!(form.submit(&auth).await, Some(Navigation::To(Route::Chat)));
        assert!(form.error().is_none());
        assert!(!form.is_loading());
    }

    #[tokio::test]
    async fn test_sign_in_shows_provider_message() {
        let auth = FakeAuth::new(provider_message);
        let mut form = SignInForm::new();
        form.email = "a@b.co".into();
        form.password = "nope".into();

        assert_eq!(form.submit(&auth).await, None);
        assert_eq!(form.error(), Some("Invalid email or password"));

        // The form stays usable for a retry.
        form.password = "secret".into();
        assert!(form.submit(&auth).await.is_some());
        assert!(form.error().is_none());
    }

    #[tokio::test]
    async fn test_sign_in_generic_fallback() {
        let auth = FakeAuth::new(server_down);
        let mut form = SignInForm::new();
        form.email = "a@b.co".into();
        form.password = "nope".into();
        form.submit(&auth).await;
        assert_eq!(form.error(), Some(SIGN_IN_FALLBACK));
    }

    #[tokio::test]
    async fn test_invalid_fields_skip_provider() {
        let auth = FakeAuth::new(provider_message);
        let mut form = SignInForm::new();
        form.email = "not-an-email".into();
        form.password = "secret".into();
        assert_eq!(form.submit(&auth).await, None);
        assert_eq!(form.error(), Some("Please enter a valid email address."));

        form.email = String::new();
        form.submit(&auth).await;
        assert_eq!(form.error(), Some("Email is required."));
        assert_eq!(*auth.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sign_up_sends_anonymous_name() {
        let auth = FakeAuth::new(server_down);
        let mut form = SignUpForm::new();
        form.email = "a@b.co".into();
        form.password = "secret".into();

        assert_eq!(form.submit(&auth).await, Some(Navigation::To(Route::Chat)));
        let sent = auth.sign_ups.lock().unwrap();
        assert_eq!(sent[0].name, "anonymous");
        assert_eq!(sent[0].callback_url.as_deref(), Some("/chat"));
    }

    #[tokio::test]
    async fn test_sign_up_failure_text() {
        let auth = FakeAuth::new(server_down);
        let mut form = SignUpForm::new();
        form.email = "a@b.co".into();
        form.password = "short".into();
        form.submit(&auth).await;
        assert_eq!(form.error(), Some(SIGN_UP_FALLBACK));
    }

    #[test]
    fn test_email_shape() {
        assert!(looks_like_email("a@b"));
        assert!(looks_like_email("first.last@example.org"));
        assert!(!looks_like_email("a@"));
        assert!(!looks_like_email("@b.co"));
        assert!(!looks_like_email("a b@c.d"));
        assert!(!looks_like_email("a@b..c"));
    }
}
