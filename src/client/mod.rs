//! Framework-agnostic state layer of the `FeelMate` front end.
//!
//! - `chat`: the chat widget (log, session id, in-flight sends)
//! - `transport`: HTTP transport to the support service
//! - `auth`: Better Auth client
//! - `forms`: sign-in / sign-up forms
//! - `gate`: session gate on the chat route
//! - `theme`: light/dark preference
//! - `routes`: pages and navigation

pub mod auth;
pub mod chat;
pub mod errors;
pub mod forms;
pub mod gate;
pub mod message;
pub mod routes;
pub mod theme;
pub mod transport;

pub use auth::{AuthClient, AuthSession, AuthUser, HttpAuthClient};
pub use chat::{ChatBox, PendingSend};
pub use errors::{ClientError, ClientResult};
pub use forms::{SignInForm, SignUpForm};
pub use gate::{GateView, SessionGate, SessionState};
pub use message::{ChatMessage, FALLBACK_TEXT};
pub use routes::{Navigation, Route};
pub use theme::{FileThemeStore, MemoryThemeStore, Theme, ThemeStore, ThemeToggle};
pub use transport::{ChatTransport, HttpChatTransport};
