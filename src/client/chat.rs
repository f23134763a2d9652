//! The chat widget state: message log, session id and in-flight sends.
//!
//! Every send gets a monotonic sequence number. The assistant entry for a send
//! is inserted right after the user entry with the same number, so the log
//! keeps request order even when overlapping replies resolve out of order.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::errors::ClientResult;
use crate::client::message::ChatMessage;
use crate::client::transport::ChatTransport;
use crate::protocol::{SendMessageRequest, SendMessageResponse};

/// A send whose user entry is already in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    /// Sequence number tying the reply to its user entry.
    pub seq: u64,
    /// Request to issue.
    pub request: SendMessageRequest,
}

/// Chat widget over a transport.
pub struct ChatBox<T: ?Sized> {
    transport: Arc<T>,
    user_id: String,
    session_id: Option<String>,
    messages: Vec<ChatMessage>,
    next_seq: u64,
    in_flight: BTreeSet<u64>,
}

impl<T: ChatTransport + ?Sized + 'static> ChatBox<T> {
    /// Create an empty widget for `user_id`.
    #[must_use]
    pub fn new(transport: Arc<T>, user_id: impl Into<String>) -> Self {
        Self {
            transport,
            user_id: user_id.into(),
            session_id: None,
            messages: Vec::new(),
            next_seq: 1,
            in_flight: BTreeSet::new(),
        }
    }

    /// Displayed log, in request order.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Session id learned from the first successful reply.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Whether any send is still waiting for its reply.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Append the user entry for `input` and return the request to issue.
    ///
    /// Returns `None` without touching the log when the trimmed input is empty.
    pub fn begin_send(&mut self, input: &str) -> Option<PendingSend> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.messages.push(ChatMessage::user(seq, text));
        self.in_flight.insert(seq);

        Some(PendingSend {
            seq,
            request: SendMessageRequest {
                message: text.to_string(),
                user_id: self.user_id.clone(),
                session_id: self.session_id.clone(),
            },
        })
    }

    /// Future issuing `pending` on the transport, detached from the widget.
    pub fn dispatch(
        &self,
        pending: PendingSend,
    ) -> impl Future<Output = (u64, ClientResult<SendMessageResponse>)> + Send + use<T> {
        let transport = Arc::clone(&self.transport);
        async move {
            let result = transport.send_message(pending.request).await;
            (pending.seq, result)
        }
    }

    /// Record the outcome of send `seq`.
    ///
    /// Success appends the reply with its metadata and adopts the session id
    /// if none is held yet. Any failure appends the fallback entry.
    pub fn complete(&mut self, seq: u64, result: ClientResult<SendMessageResponse>) {
        self.in_flight.remove(&seq);

        let entry = match result {
            Ok(body) => {
                if self.session_id.is_none() {
                    debug!(session_id = %body.session_id, "Session established");
                    self.session_id = Some(body.session_id.clone());
                }
                ChatMessage::reply(seq, body)
            }
            Err(err) => {
                warn!(seq, error = %err, "Error sending message");
                ChatMessage::fallback(seq)
            }
        };

        let position = self
            .messages
            .iter()
            .rposition(|m| m.seq == seq)
            .map_or(self.messages.len(), |idx| idx + 1);
        self.messages.insert(position, entry);
    }

    /// Send `input` and wait for the reply. Returns `false` if nothing was sent.
    pub async fn send(&mut self, input: &str) -> bool {
        let Some(pending) = self.begin_send(input) else {
            return false;
        };
        let (seq, result) = self.dispatch(pending).await;
        self.complete(seq, result);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::errors::ClientError;
    use crate::client::message::FALLBACK_TEXT;
    use crate::client::transport::TransportFuture;
    use crate::protocol::{Resource, Sender, Severity};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<VecDeque<ClientResult<SendMessageResponse>>>,
        requests: Mutex<Vec<SendMessageRequest>>,
    }

    impl ScriptedTransport {
        fn with(replies: Vec<ClientResult<SendMessageResponse>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::default(),
            })
        }

        fn requests(&self) -> Vec<SendMessageRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl ChatTransport for ScriptedTransport {
        fn send_message(
            &self,
            request: SendMessageRequest,
        ) -> TransportFuture<'_, ClientResult<SendMessageResponse>> {
            self.requests.lock().unwrap().push(request);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ClientError::Status(500)));
            Box::pin(async move { reply })
        }
    }

    fn reply(text: &str, session_id: &str) -> SendMessageResponse {
        SendMessageResponse {
            response: text.into(),
            session_id: session_id.into(),
            emotion: Some("anxious".into()),
            severity: Some(Severity::Label("high".into())),
            confidence: Some(0.7),
            needs_help: true,
            resources: vec![Resource::new("Crisis Text Line", "https://www.crisistextline.org/", "24/7")],
        }
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let transport = ScriptedTransport::with(vec![]);
        let mut chat = ChatBox::new(Arc::clone(&transport), "u1");
        assert!(!chat.send("   \n").await);
        assert!(chat.messages().is_empty());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_user_entry_precedes_resolution() {
        let transport = ScriptedTransport::with(vec![Ok(reply("ok", "s1"))]);
        let mut chat = ChatBox::new(transport, "u1");
        let pending = chat.begin_send("  hello  ").unwrap();
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].text, "hello");
        assert_eq!(pending.request.message, "hello");
        assert!(chat.is_loading());

        let (seq, result) = chat.dispatch(pending).await;
        chat.complete(seq, result);
        assert!(!chat.is_loading());
        assert_eq!(chat.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_reply_metadata_carried_through() {
        let body = reply("Breathe with me.", "s1");
        let transport = ScriptedTransport::with(vec![Ok(body.clone())]);
        let mut chat = ChatBox::new(transport, "u1");
        chat.send("I'm very worried").await;

        let ai = &chat.messages()[1];
        assert_eq!(ai.from, Sender::Ai);
        assert_eq!(ai.text, body.response);
        assert_eq!(ai.emotion, body.emotion);
        assert_eq!(ai.severity, body.severity);
        assert_eq!(ai.confidence, body.confidence);
        assert_eq!(ai.needs_help, body.needs_help);
        assert_eq!(ai.resources, body.resources);
    }

    #[tokio::test]
    async fn test_failure_appends_single_fallback() {
        let transport = ScriptedTransport::with(vec![Err(ClientError::Status(503))]);
        let mut chat = ChatBox::new(transport, "u1");
        chat.send("hello").await;

        assert_eq!(chat.messages().len(), 2);
        let ai = &chat.messages()[1];
        assert_eq!(ai.text, FALLBACK_TEXT);
        assert!(ai.error);
        assert!(ai.emotion.is_none());
        assert!(chat.session_id().is_none());
    }

    #[tokio::test]
    async fn test_session_id_is_echoed() {
        let transport = ScriptedTransport::with(vec![
            Ok(reply("one", "s-first")),
            Ok(reply("two", "s-other")),
            Ok(reply("three", "s-other")),
        ]);
        let mut chat = ChatBox::new(Arc::clone(&transport), "u1");
        chat.send("a").await;
        chat.send("b").await;
        chat.send("c").await;

        let sent: Vec<_> = transport
            .requests()
            .into_iter()
            .map(|r| r.session_id)
            .collect();
        assert_eq!(
            sent,
            vec![None, Some("s-first".to_string()), Some("s-first".to_string())]
        );
        assert_eq!(chat.session_id(), Some("s-first"));
    }

    #[tokio::test]
    async fn test_out_of_order_completion_keeps_request_order() {
        let transport = ScriptedTransport::with(vec![]);
        let mut chat = ChatBox::new(transport, "u1");
        let first = chat.begin_send("first").unwrap();
        let second = chat.begin_send("second").unwrap();

        chat.complete(second.seq, Ok(reply("reply to second", "s1")));
        assert!(chat.is_loading());
        chat.complete(first.seq, Ok(reply("reply to first", "s1")));

        let texts: Vec<_> = chat.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["first", "reply to first", "second", "reply to second"]
        );
        assert!(!chat.is_loading());
    }
}
