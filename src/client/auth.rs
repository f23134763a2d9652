//! Client for the Better Auth HTTP API.
//!
//! Only the email/password flow is used. The session cookie set by sign-in is
//! kept in the client's cookie jar and replayed on later calls.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, USER_AGENT};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::errors::{ClientError, ClientResult};
use crate::config::ClientConfig;

const SIGN_IN_PATH: &str = "/api/auth/sign-in/email";
const SIGN_UP_PATH: &str = "/api/auth/sign-up/email";
const GET_SESSION_PATH: &str = "/api/auth/get-session";
const SIGN_OUT_PATH: &str = "/api/auth/sign-out";

/// Boxed future type for auth operations.
pub type AuthFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Body of an email sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
    /// Route to land on after success.
    #[serde(rename = "callbackURL", skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// Body of an email sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
    /// Display name.
    pub name: String,
    /// Route to land on after success.
    #[serde(rename = "callbackURL", skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// Authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Provider user id.
    pub id: String,
    /// Email address.
    pub email: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Result of a successful sign-in or sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Session token, also set as a cookie.
    #[serde(default)]
    pub token: Option<String>,
    /// Redirect target chosen by the provider.
    #[serde(default)]
    pub url: Option<String>,
    /// The signed-in user.
    pub user: AuthUser,
}

/// Provider-side session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Session id.
    pub id: String,
    /// Owner.
    pub user_id: String,
    /// Expiry.
    pub expires_at: DateTime<Utc>,
}

/// Current session as returned by `get-session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Session record.
    pub session: SessionInfo,
    /// Owner of the session.
    pub user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: Option<String>,
}

/// Operations the front end delegates to the auth provider.
pub trait AuthClient: Send + Sync {
    /// Sign in with email and password.
    ///
    /// # Errors
    /// Returns `ClientError::Auth` with the provider's message on rejection.
    fn sign_in_email(&self, request: SignInRequest) -> AuthFuture<'_, ClientResult<AuthResponse>>;

    /// Create an account with email and password.
    ///
    /// # Errors
    /// Returns `ClientError::Auth` with the provider's message on rejection.
    fn sign_up_email(&self, request: SignUpRequest) -> AuthFuture<'_, ClientResult<AuthResponse>>;

    /// Current session, `None` when signed out.
    ///
    /// # Errors
    /// Returns an error if the provider cannot be queried.
    fn get_session(&self) -> AuthFuture<'_, ClientResult<Option<AuthSession>>>;

    /// End the current session.
    ///
    /// # Errors
    /// Returns an error if the provider cannot be reached.
    fn sign_out(&self) -> AuthFuture<'_, ClientResult<()>>;
}

/// Better Auth over HTTP with a cookie jar.
#[derive(Debug, Clone)]
pub struct HttpAuthClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpAuthClient {
    /// Build a client for `config.auth_base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL does not parse or the client cannot be built.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let base_url = Url::parse(&config.auth_base_url)?;

        let mut headers = HeaderMap::new();
        if let Ok(ua) = HeaderValue::from_str(&config.user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        // The provider rejects state-changing calls without a trusted origin.
        if let Ok(origin) = HeaderValue::from_str(&base_url.origin().ascii_serialization()) {
            headers.insert(ORIGIN, origin);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .cookie_store(true)
            .build()?;

        Ok(Self { client, base_url })
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + Sync,
        T: serde::de::DeserializeOwned,
    {
        let url = self.base_url.join(path)?;
        let response = self.client.post(url).json(body).send().await?;
        read_body(response).await
    }
}

async fn read_body<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let message = response
        .json::<ProviderError>()
        .await
        .ok()
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty());

    Err(message.map_or_else(|| ClientError::Status(status.as_u16()), ClientError::Auth))
}

impl AuthClient for HttpAuthClient {
    fn sign_in_email(&self, request: SignInRequest) -> AuthFuture<'_, ClientResult<AuthResponse>> {
        Box::pin(async move { self.post(SIGN_IN_PATH, &request).await })
    }

    fn sign_up_email(&self, request: SignUpRequest) -> AuthFuture<'_, ClientResult<AuthResponse>> {
        Box::pin(async move { self.post(SIGN_UP_PATH, &request).await })
    }

    fn get_session(&self) -> AuthFuture<'_, ClientResult<Option<AuthSession>>> {
        Box::pin(async move {
            let url = self.base_url.join(GET_SESSION_PATH)?;
            let response = self.client.get(url).send().await?;
            read_body(response).await
        })
    }

    fn sign_out(&self) -> AuthFuture<'_, ClientResult<()>> {
        Box::pin(async move {
            let _: serde_json::Value = self.post(SIGN_OUT_PATH, &serde_json::json!({})).await?;
            Ok(())
        })
    }
}
