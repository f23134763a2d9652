//! Terminal front end: landing page, auth forms, gated chat and theme toggle.

pub mod render;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};

use crate::client::theme::os_prefers_dark;
use crate::client::{
    AuthClient, ChatBox, FileThemeStore, GateView, HttpAuthClient, HttpChatTransport, Route,
    SessionGate, SignInForm, SignUpForm, ThemeToggle,
};
use crate::config::ClientConfig;
use crate::protocol::Sender;
use render::Palette;

/// Interactive terminal client.
pub struct TerminalApp {
    auth: Arc<HttpAuthClient>,
    transport: Arc<HttpChatTransport>,
    theme: ThemeToggle<FileThemeStore>,
    gate: SessionGate,
    input: Lines<BufReader<Stdin>>,
    output: Stdout,
}

impl TerminalApp {
    /// Build the client from `config`.
    ///
    /// # Errors
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let auth = HttpAuthClient::new(config).context("building auth client")?;
        let transport = HttpChatTransport::new(config).context("building chat transport")?;
        let theme = ThemeToggle::init(FileThemeStore::new(&config.theme_file), os_prefers_dark());

        Ok(Self {
            auth: Arc::new(auth),
            transport: Arc::new(transport),
            theme,
            gate: SessionGate::new(),
            input: BufReader::new(tokio::io::stdin()).lines(),
            output: tokio::io::stdout(),
        })
    }

    fn palette(&self) -> Palette {
        Palette::for_theme(self.theme.theme())
    }

    async fn write(&mut self, text: &str) -> anyhow::Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await?;
        Ok(())
    }

    async fn prompt(&mut self, label: &str) -> anyhow::Result<Option<String>> {
        self.write(label).await?;
        let line = self.input.next_line().await.context("reading stdin")?;
        Ok(line)
    }

    /// Run until the user quits or stdin closes.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be read or written.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut route = Route::Landing;
        loop {
            let header = render::route_header(route);
            self.write(&header).await?;

            let next = match route {
                Route::Landing => self.landing_page().await?,
                Route::SignIn => self.sign_in_page().await?,
                Route::SignUp => self.sign_up_page().await?,
                Route::Chat => self.chat_page().await?,
            };

            match next {
                Some(next) => route = next,
                None => break,
            }
        }
        self.write("Take care.\n").await
    }

    async fn landing_page(&mut self) -> anyhow::Result<Option<Route>> {
        let page = render::landing(&self.palette());
        self.write(&page).await?;

        let Some(line) = self.prompt("\nGo to (Enter for /chat): ").await? else {
            return Ok(None);
        };
        let line = line.trim();
        if line.is_empty() {
            return Ok(Some(Route::Chat));
        }
        Ok(Some(Route::from_path(line).unwrap_or(Route::Landing)))
    }

    async fn sign_in_page(&mut self) -> anyhow::Result<Option<Route>> {
        let mut form = SignInForm::new();
        loop {
            self.write("Type /sign-up to create an account.\n").await?;
            let Some(email) = self.prompt("Email: ").await? else {
                return Ok(None);
            };
            if email.trim() == Route::SignUp.path() {
                return Ok(Some(Route::SignUp));
            }
            let Some(password) = self.prompt("Password: ").await? else {
                return Ok(None);
            };
            form.email = email;
            form.password = password;

            self.write("Signing in...\n").await?;
            let auth = Arc::clone(&self.auth);
            if let Some(navigation) = form.submit(auth.as_ref()).await {
                return Ok(Some(navigation.route()));
            }
            let error = form.error().unwrap_or_default().to_string();
            let line = render::form_error(&self.palette(), &error);
            self.write(&line).await?;
        }
    }

    async fn sign_up_page(&mut self) -> anyhow::Result<Option<Route>> {
        let mut form = SignUpForm::new();
        loop {
            self.write("Type /sign-in if you already have an account.\n").await?;
            let Some(email) = self.prompt("Email: ").await? else {
                return Ok(None);
            };
            if email.trim() == Route::SignIn.path() {
                return Ok(Some(Route::SignIn));
            }
            let Some(password) = self.prompt("Password: ").await? else {
                return Ok(None);
            };
            let Some(name) = self.prompt("Name (optional): ").await? else {
                return Ok(None);
            };
            form.email = email;
            form.password = password;
            if !name.trim().is_empty() {
                form.name = name.trim().to_string();
            }

            self.write("Creating account...\n").await?;
            let auth = Arc::clone(&self.auth);
            if let Some(navigation) = form.submit(auth.as_ref()).await {
                return Ok(Some(navigation.route()));
            }
            let error = form.error().unwrap_or_default().to_string();
            let line = render::form_error(&self.palette(), &error);
            self.write(&line).await?;
        }
    }

    async fn chat_page(&mut self) -> anyhow::Result<Option<Route>> {
        let loading = render::gate(&self.gate);
        self.write(&loading).await?;

        let auth = Arc::clone(&self.auth);
        self.gate.resolve(auth.as_ref()).await;
        let status = render::gate(&self.gate);
        self.write(&status).await?;

        let user_id = match self.gate.view() {
            GateView::Chat(session) => session.user.id.clone(),
            GateView::Redirect(navigation) => return Ok(Some(navigation.route())),
            GateView::Loading => return Ok(Some(Route::Landing)),
        };

        let mut chat = ChatBox::new(Arc::clone(&self.transport), user_id);
        self.write(&render::empty_chat()).await?;
        self.write(&render::chat_help()).await?;

        loop {
            let Some(line) = self.prompt("> ").await? else {
                return Ok(None);
            };

            match line.trim() {
                "/quit" => return Ok(None),
                "/theme" => {
                    let theme = match self.theme.toggle() {
                        Ok(theme) => theme,
                        Err(err) => {
                            tracing::warn!(error = %err, "Could not persist theme");
                            self.theme.theme()
                        }
                    };
                    self.write(&format!("Theme: {theme}\n")).await?;
                }
                "/history" => self.show_history(chat.session_id()).await?,
                "/status" => self.show_status(chat.session_id()).await?,
                "/signout" => {
                    if let Err(err) = auth.sign_out().await {
                        tracing::warn!(error = %err, "Sign out failed");
                    }
                    self.gate.clear();
                    return Ok(Some(Route::SignIn));
                }
                _ => {
                    let Some(pending) = chat.begin_send(&line) else {
                        continue;
                    };
                    self.write("  ...\n").await?;
                    let (seq, result) = chat.dispatch(pending).await;
                    chat.complete(seq, result);

                    let palette = self.palette();
                    let rendered: String = chat
                        .messages()
                        .iter()
                        .filter(|m| m.seq == seq && m.from == Sender::Ai)
                        .map(|m| render::message(m, &palette))
                        .collect();
                    self.write(&rendered).await?;
                }
            }
        }
    }

    async fn show_history(&mut self, session_id: Option<&str>) -> anyhow::Result<()> {
        let Some(session_id) = session_id else {
            return self.write("No session yet.\n").await;
        };
        let text = match self.transport.history(session_id).await {
            Ok(history) => render::history(&history),
            Err(err) => format!("Could not load history: {err}\n"),
        };
        self.write(&text).await
    }

    async fn show_status(&mut self, session_id: Option<&str>) -> anyhow::Result<()> {
        let Some(session_id) = session_id else {
            return self.write("No session yet.\n").await;
        };
        let text = match self.transport.session_status(session_id).await {
            Ok(status) => render::session_status(&status),
            Err(err) => format!("Could not load status: {err}\n"),
        };
        self.write(&text).await
    }
}
