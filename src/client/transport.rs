//! Transport to the emotion-support service.

use std::future::Future;
use std::pin::Pin;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use url::Url;

use crate::client::errors::{ClientError, ClientResult};
use crate::config::ClientConfig;
use crate::protocol::{
    ChatHistoryResponse, HISTORY_PATH, SEND_MESSAGE_PATH, SESSION_STATUS_PATH,
    SendMessageRequest, SendMessageResponse, SessionStatus,
};

/// Boxed future type for transport operations.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Sends one user utterance and returns the service reply.
pub trait ChatTransport: Send + Sync {
    /// Issue a single send-message request. No retry.
    ///
    /// # Errors
    /// Returns an error on network failure, non-success status or an
    /// unparseable body.
    fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> TransportFuture<'_, ClientResult<SendMessageResponse>>;
}

/// `reqwest` implementation talking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpChatTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpChatTransport {
    /// Build a transport for `config.api_base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL does not parse or the client cannot be built.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let base_url = Url::parse(&config.api_base_url)?;
        let client = Self::build_client(config)?;
        Ok(Self { client, base_url })
    }

    fn build_client(config: &ClientConfig) -> ClientResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        if let Ok(ua) = HeaderValue::from_str(&config.user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;
        Ok(client)
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> ClientResult<T> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status().as_u16()));
        }
        Ok(response.json().await?)
    }

    /// Stored turns of a session.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn history(&self, session_id: &str) -> ClientResult<ChatHistoryResponse> {
        let url = self.session_url(HISTORY_PATH, session_id)?;
        self.get_json(url).await
    }

    /// Timeout bookkeeping of a session.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn session_status(&self, session_id: &str) -> ClientResult<SessionStatus> {
        let url = self.session_url(SESSION_STATUS_PATH, session_id)?;
        self.get_json(url).await
    }

    fn session_url(&self, prefix: &str, session_id: &str) -> ClientResult<Url> {
        let mut url = self.endpoint(prefix)?;
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .push(session_id);
        Ok(url)
    }
}

impl ChatTransport for HttpChatTransport {
    fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> TransportFuture<'_, ClientResult<SendMessageResponse>> {
        Box::pin(async move {
            let url = self.endpoint(SEND_MESSAGE_PATH)?;
            let response = self.client.post(url).json(&request).send().await?;

            let status = response.status();
            if !status.is_success() {
                tracing::warn!(status = status.as_u16(), "Chat service returned an error status");
                return Err(ClientError::Status(status.as_u16()));
            }

            Ok(response.json::<SendMessageResponse>().await?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::client::chat::ChatBox;
    use crate::client::message::FALLBACK_TEXT;
    use crate::protocol::Sender;
    use crate::server::{self, AppState};
    use axum::Router;
    use axum::routing::post;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    async fn spawn_service() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = AppState::in_memory(ServerConfig::default()).await.unwrap();
        tokio::spawn(server::serve(listener, state, std::future::pending()));
        format!("http://{addr}")
    }

    /// Service answering every send with 200 and a body that is not JSON.
    async fn spawn_garbled_service() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route(SEND_MESSAGE_PATH, post(|| async { "<html>oops</html>" }));
        tokio::spawn(async move { axum::serve(listener, app).await });
        format!("http://{addr}")
    }

    fn transport(base: &str) -> HttpChatTransport {
        HttpChatTransport::new(&ClientConfig::default().with_api_base_url(base)).unwrap()
    }

    #[tokio::test]
    async fn test_send_against_live_service() {
        let base = spawn_service().await;
        let transport = transport(&base);

        let reply = transport
            .send_message(SendMessageRequest {
                message: "I feel lonely".into(),
                user_id: "u1".into(),
                session_id: None,
            })
            .await
            .unwrap();
        assert_eq!(reply.emotion.as_deref(), Some("sad"));

        let history = transport.history(&reply.session_id).await.unwrap();
        assert_eq!(history.messages.len(), 2);

        let status = transport.session_status(&reply.session_id).await.unwrap();
        assert!(status.active);
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let base = spawn_service().await;
        let err = transport(&base)
            .send_message(SendMessageRequest {
                message: " ".into(),
                user_id: "u1".into(),
                session_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Status(400)));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = transport(&format!("http://{addr}"))
            .send_message(SendMessageRequest {
                message: "hello".into(),
                user_id: "u1".into(),
                session_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_an_error() {
        let base = spawn_garbled_service().await;
        let result = transport(&base)
            .send_message(SendMessageRequest {
                message: "hello".into(),
                user_id: "u1".into(),
                session_id: None,
            })
            .await;
        assert!(matches!(result, Err(ClientError::Http(_))));
    }

    #[tokio::test]
    async fn test_malformed_success_body_appends_one_fallback() {
        let base = spawn_garbled_service().await;
        let mut chat = ChatBox::new(Arc::new(transport(&base)), "u1");

        assert!(chat.send("hello").await);

        let messages = chat.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].from, Sender::User);
        assert_eq!(messages.iter().filter(|m| m.error).count(), 1);
        assert_eq!(messages[1].text, FALLBACK_TEXT);
        assert!(messages[1].emotion.is_none());
        assert!(chat.session_id().is_none());
    }
}
