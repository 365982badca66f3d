//! Browser-mediated pairing session.
//!
//! Hosts a single-use local HTTP listener that yields exactly one
//! authorization token and then shuts itself down. Two delivery paths race:
//! the login page redirects back to `/callback?token=...`, and the user can
//! always paste the token into the form on `/` which posts to
//! `/submit-token`. Whichever path fires first wins; completion is a
//! write-once latch, so the session resolves exactly once and the losing
//! path observes a closed listener.
//!
//! The session is an explicit object owned by the caller for the duration
//! of one registration run; there is no ambient server handle, so
//! concurrent runs cannot clobber each other.

use std::net::SocketAddr;
use std::process::Child;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use url::Url;

use crate::browser;
use crate::error::{Error, Result};

/// Shared per-session state handed to the route handlers.
#[derive(Clone)]
struct SessionState {
    /// Write-once completion latch; the first taker wins.
    latch: Arc<Mutex<Option<oneshot::Sender<String>>>>,
    /// Signals the listener to shut down once the latch fires.
    shutdown: Arc<Notify>,
    /// Login page URL carrying the local callback as `returnUrl`.
    pair_url: String,
    /// The local callback URL shown on the instructions page.
    callback_url: String,
}

impl SessionState {
    /// Resolve the session with `token`. Returns `false` if another path
    /// already completed it.
    fn complete(&self, token: String) -> bool {
        let winner = self.latch.lock().expect("latch lock poisoned").take();
        match winner {
            Some(tx) => {
                let _ = tx.send(token);
                self.shutdown.notify_one();
                true
            }
            None => false,
        }
    }
}

/// A bound, single-use pairing listener.
///
/// Created with [`PairingSession::bind`], resolved with
/// [`PairingSession::wait`]. The OS-assigned port is exclusively owned by
/// the session and released before `wait` returns.
#[derive(Debug)]
pub struct PairingSession {
    local_addr: SocketAddr,
    base_url: String,
    pair_url: String,
    token_rx: oneshot::Receiver<String>,
    shutdown: Arc<Notify>,
    server: Option<JoinHandle<()>>,
    browser: Option<Child>,
}

impl PairingSession {
    /// Bind a listener on an OS-assigned port of `host` and start serving.
    ///
    /// `login_url` is the companion login page; the session appends its own
    /// callback URL as the `returnUrl` query parameter.
    pub async fn bind(host: &str, login_url: &str) -> Result<Self> {
        let listener = TcpListener::bind(format!("{host}:0"))
            .await
            .map_err(|e| Error::Network(format!("failed to bind pairing listener on {host}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| Error::Network(format!("pairing listener has no local address: {e}")))?;

        let base_url = format!("http://{host}:{}", local_addr.port());
        let callback_url = format!("{base_url}/callback");

        let mut pair_url = Url::parse(login_url)
            .map_err(|e| Error::Config(format!("invalid pairing login URL {login_url}: {e}")))?;
        pair_url
            .query_pairs_mut()
            .append_pair("returnUrl", &callback_url);
        let pair_url = pair_url.to_string();

        let (token_tx, token_rx) = oneshot::channel();
        let shutdown = Arc::new(Notify::new());
        let state = SessionState {
            latch: Arc::new(Mutex::new(Some(token_tx))),
            shutdown: Arc::clone(&shutdown),
            pair_url: pair_url.clone(),
            callback_url,
        };

        let router = Router::new()
            .route("/", get(landing))
            .route("/submit-token", post(submit_token))
            .route("/callback", get(callback))
            .with_state(state);

        let server_shutdown = Arc::clone(&shutdown);
        let server = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { server_shutdown.notified().await })
                .await;
            if let Err(e) = result {
                log::error!("[Pairing] listener error: {e}");
            }
        });

        log::info!("[Pairing] listening on {base_url}");

        Ok(Self {
            local_addr,
            base_url,
            pair_url,
            token_rx,
            shutdown,
            server: Some(server),
            browser: None,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Root URL of the instructions page.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Login page URL carrying this session's callback.
    pub fn pair_url(&self) -> &str {
        &self.pair_url
    }

    /// Best-effort browser launch toward the instructions page.
    ///
    /// Failure is logged and never fatal; the printed URL always works as
    /// a fallback. Suppressed entirely when `no_launch` is set.
    pub fn launch_browser(&mut self, no_launch: bool) {
        if no_launch {
            return;
        }
        match browser::open(&self.base_url) {
            Ok(child) => {
                log::info!("[Pairing] opened browser at {}", self.base_url);
                self.browser = Some(child);
            }
            Err(e) => {
                log::warn!(
                    "[Pairing] could not open a browser: {e}; browse to {} manually",
                    self.base_url
                );
            }
        }
    }

    /// Wait for the single completing request and return its token.
    ///
    /// Blocks until a token arrives via either route or the process
    /// receives Ctrl-C, then tears the listener down (releasing the port)
    /// before returning. There is deliberately no timeout: the flow is
    /// human-in-the-loop.
    pub async fn wait(mut self) -> Result<String> {
        let interrupted = async {
            if tokio::signal::ctrl_c().await.is_err() {
                // No signal handling on this platform; rely on the token path.
                std::future::pending::<()>().await;
            }
        };

        let result = tokio::select! {
            token = &mut self.token_rx => token.map_err(|_| Error::Aborted),
            _ = interrupted => {
                log::warn!("[Pairing] interrupted while waiting for a token");
                Err(Error::Aborted)
            }
        };

        self.close().await;
        result
    }

    /// Shut the listener down and reap the browser helper, if any.
    async fn close(&mut self) {
        if let Some(mut child) = self.browser.take() {
            let _ = child.kill();
        }
        self.shutdown.notify_one();
        if let Some(server) = self.server.take() {
            let _ = server.await;
        }
    }
}

impl Drop for PairingSession {
    fn drop(&mut self) {
        if let Some(mut child) = self.browser.take() {
            let _ = child.kill();
        }
        // A dropped session must not leave the listener running.
        self.shutdown.notify_one();
    }
}

/// Form body accepted by `POST /submit-token`.
#[derive(Debug, Deserialize)]
struct SubmitTokenForm {
    token: Option<String>,
}

/// Query accepted by `GET /callback`.
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    token: Option<String>,
}

/// `GET /` - instructions with the callback URL, a login link, and the
/// manual token form.
async fn landing(State(state): State<SessionState>) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Rust+ pairing</title></head>
<body>
  <h1>Rust+ pairing</h1>
  <p>Callback URL: <code>{callback}</code></p>
  <p><a href="{pair_url}" target="_blank">Open the Rust+ login page</a>
     and sign in. You will be sent back here automatically.</p>
  <p>If the redirect does not reach this machine, paste the token below:</p>
  <form method="post" action="/submit-token">
    <input type="text" name="token" size="80" placeholder="Paste token here">
    <button type="submit">Submit token</button>
  </form>
</body>
</html>"#,
        callback = state.callback_url,
        pair_url = state.pair_url,
    ))
}

/// `POST /submit-token` - manual paste path.
async fn submit_token(
    State(state): State<SessionState>,
    Form(form): Form<SubmitTokenForm>,
) -> Response {
    match form.token {
        Some(token) if !token.is_empty() => finish(&state, token),
        _ => (
            StatusCode::BAD_REQUEST,
            "missing token field; go back and paste the token",
        )
            .into_response(),
    }
}

/// `GET /callback` - automatic redirect path.
async fn callback(
    State(state): State<SessionState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    match query.token {
        Some(token) if !token.is_empty() => finish(&state, token),
        _ => Html(
            r#"<!DOCTYPE html>
<html>
<body>
  <p>No token arrived with the callback.
     Return to <a href="/">the pairing instructions</a> and try again.</p>
</body>
</html>"#,
        )
        .into_response(),
    }
}

/// Funnel both completion paths through the latch.
fn finish(state: &SessionState, token: String) -> Response {
    if state.complete(token) {
        Html(
            r#"<!DOCTYPE html>
<html>
<body>
  <h1>Pairing complete</h1>
  <p>Token received. You can close this window and return to the terminal.</p>
</body>
</html>"#,
        )
        .into_response()
    } else {
        (StatusCode::CONFLICT, "pairing already completed").into_response()
    }
}
