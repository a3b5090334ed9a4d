//! Loopback callback listener for the browser-based login flow
//!
//! A transient HTTP endpoint that receives the identity provider's redirect,
//! hands the authorization code (or error) to the waiting flow, and keeps a
//! status channel open so the browser tab can show live progress while the
//! CLI performs the remaining token exchanges.
//!
//! Delivery is single-slot: the first terminal outcome resolves the waiting
//! flow, and anything after that (a reloaded browser tab re-sending the same
//! redirect) is dropped without blocking the HTTP handler.

use crate::error::{AuthError, AuthResult};
use crate::status::StatusReporter;
use axum::{
    Router,
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse, Json},
    routing::get,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Grace period for in-flight requests when the listener shuts down.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The authorization code and echoed state captured from the redirect.
#[derive(Debug, Clone)]
pub struct AuthCode {
    /// The authorization code to exchange for tokens.
    pub code: String,
    /// The state parameter echoed back by the identity provider.
    pub state: String,
}

/// Terminal outcome of one login attempt.
#[derive(Debug)]
enum CallbackOutcome {
    Code { code: String, state: String },
    Error { error: String, description: String },
}

#[derive(Default)]
struct ValidationStatus {
    status: String,
    message: String,
}

/// State shared with the request handlers.
struct ListenerShared {
    /// Many concurrent readers from the browser's status poll, one writer
    /// from the main flow.
    status: RwLock<ValidationStatus>,
    /// Single-slot delivery. The first terminal outcome takes the sender;
    /// later callbacks find the slot empty and are dropped.
    outcome_tx: Mutex<Option<oneshot::Sender<CallbackOutcome>>>,
}

impl ListenerShared {
    fn deliver(&self, outcome: CallbackOutcome) {
        if let Ok(mut slot) = self.outcome_tx.lock() {
            match slot.take() {
                Some(tx) => {
                    let _ = tx.send(outcome);
                }
                None => debug!("duplicate callback delivery dropped"),
            }
        }
    }

    fn status_snapshot(&self) -> (String, String) {
        match self.status.read() {
            Ok(s) => (s.status.clone(), s.message.clone()),
            Err(_) => (String::new(), String::new()),
        }
    }
}

/// Query parameters the identity provider may send to the redirect target.
#[derive(Debug, Deserialize)]
struct RedirectParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Transient local HTTP listener for one login attempt.
///
/// Lifecycle: `new` → [`start`](Self::start) → [`wait_for_code`](Self::wait_for_code)
/// → [`close`](Self::close). `close` is idempotent and safe to call even if
/// `start` never succeeded.
pub struct CallbackListener {
    requested_port: u16,
    shared: Arc<ListenerShared>,
    outcome_rx: Option<oneshot::Receiver<CallbackOutcome>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: Option<tokio::task::JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl CallbackListener {
    /// Create a listener that will bind the given local port. Port 0 asks
    /// the OS for an ephemeral port (useful in tests); the bound address is
    /// available from [`local_addr`](Self::local_addr) after `start`.
    pub fn new(port: u16) -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            requested_port: port,
            shared: Arc::new(ListenerShared {
                status: RwLock::new(ValidationStatus::default()),
                outcome_tx: Mutex::new(Some(tx)),
            }),
            outcome_rx: Some(rx),
            shutdown_tx: None,
            server: None,
            local_addr: None,
        }
    }

    /// Bind the port and start serving the redirect, status, and close
    /// routes. Binding failure (port already in use) is fatal; there is no
    /// retry or port-hunting.
    pub async fn start(&mut self) -> AuthResult<()> {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", self.requested_port))
            .await
            .map_err(|source| AuthError::Bind {
                port: self.requested_port,
                source,
            })?;
        let addr = listener.local_addr().map_err(|source| AuthError::Bind {
            port: self.requested_port,
            source,
        })?;
        self.local_addr = Some(addr);

        let app = Router::new()
            .route("/oidc/auth", get(handle_redirect))
            .route("/status", get(handle_status))
            .route("/close", get(handle_close))
            .with_state(self.shared.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        debug!("callback listener bound on {addr}");

        let server = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                warn!("callback listener error: {e}");
            }
        });
        self.server = Some(server);
        Ok(())
    }

    /// The address actually bound, once `start` has succeeded.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Port the listener is (or will be) serving on.
    pub fn port(&self) -> u16 {
        self.local_addr
            .map(|a| a.port())
            .unwrap_or(self.requested_port)
    }

    /// The redirect URI to register in the authorization request.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/oidc/auth", self.port())
    }

    /// Block until the redirect delivers a code, the provider reports an
    /// error, or the timeout elapses. This is the flow's single suspension
    /// point; it consumes the result slot and can only be called once.
    pub async fn wait_for_code(&mut self, timeout: Duration) -> AuthResult<AuthCode> {
        let rx = self
            .outcome_rx
            .take()
            .ok_or_else(|| AuthError::Input("callback result already consumed".to_string()))?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(CallbackOutcome::Code { code, state })) => Ok(AuthCode { code, state }),
            Ok(Ok(CallbackOutcome::Error { error, description })) => {
                Err(AuthError::Oauth { error, description })
            }
            // Sender dropped without firing: the listener is gone.
            Ok(Err(_)) => Err(AuthError::CallbackTimeout),
            Err(_) => Err(AuthError::CallbackTimeout),
        }
    }

    /// Update the status the browser's polling endpoint reports.
    pub fn set_validation_status(&self, status: &str, message: &str) {
        if let Ok(mut guard) = self.shared.status.write() {
            guard.status = status.to_string();
            guard.message = message.to_string();
        }
    }

    /// Gracefully shut the listener down, giving in-flight requests a
    /// bounded grace period to flush. Idempotent.
    pub async fn close(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(mut server) = self.server.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
                server.abort();
            }
        }
    }
}

impl StatusReporter for CallbackListener {
    fn report(&self, status: &str, message: &str) {
        self.set_validation_status(status, message);
    }
}

async fn handle_redirect(
    State(shared): State<Arc<ListenerShared>>,
    Query(params): Query<RedirectParams>,
) -> Html<String> {
    if let Some(error) = params.error.filter(|e| !e.is_empty()) {
        let description = params.error_description.unwrap_or_default();
        let page = error_page(&error, &description);
        shared.deliver(CallbackOutcome::Error { error, description });
        return Html(page);
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        let page = error_page("missing_code", "No authorization code received");
        shared.deliver(CallbackOutcome::Error {
            error: "missing_code".to_string(),
            description: "No authorization code received".to_string(),
        });
        return Html(page);
    };

    let state = params.state.unwrap_or_default();
    shared.deliver(CallbackOutcome::Code { code, state });
    Html(success_page())
}

async fn handle_status(State(shared): State<Arc<ListenerShared>>) -> impl IntoResponse {
    let (status, message) = shared.status_snapshot();
    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        Json(serde_json::json!({ "status": status, "message": message })),
    )
}

async fn handle_close() -> Html<&'static str> {
    Html(CLOSE_PAGE)
}

/// Success page: tells the user to return to the terminal and keeps polling
/// `/status` so later validation steps show up in the still-open tab.
fn success_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Authentication</title><style>{STYLE}</style></head>
<body>
  <div class="box">
    <h1>Signed in</h1>
    <p>Validating your organization access&hellip;</p>
    <p id="msg" class="dim">You can return to the terminal.</p>
  </div>
  <script>
    const poll = setInterval(async () => {{
      try {{
        const r = await fetch('/status');
        const s = await r.json();
        if (s.message) document.getElementById('msg').textContent = s.message;
        if (s.status === 'success' || s.status === 'failed') clearInterval(poll);
      }} catch (e) {{ clearInterval(poll); }}
    }}, 1000);
  </script>
</body>
</html>"#
    )
}

fn error_page(error: &str, description: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Authentication failed</title><style>{STYLE}</style></head>
<body>
  <div class="box">
    <h1 class="err">Authentication failed</h1>
    <p><code>{error}</code></p>
    <p class="dim">{description}</p>
    <p>Close this tab and check the terminal.</p>
  </div>
</body>
</html>"#
    )
}

const STYLE: &str = "body{font-family:sans-serif;display:flex;align-items:center;\
justify-content:center;min-height:100vh;margin:0;background:#f4f4f7}\
.box{background:#fff;padding:40px 50px;border-radius:12px;text-align:center;\
box-shadow:0 8px 30px rgba(0,0,0,.12)}h1{color:#2e7d32}h1.err{color:#c62828}\
.dim{color:#666}";

const CLOSE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Complete</title></head>
<body style="font-family:sans-serif;text-align:center;padding-top:20vh">
  <h1>Authentication complete</h1>
  <p>Your credentials are ready. Return to the terminal to continue.</p>
  <p style="color:#666">You may close this window.</p>
  <script>window.close()</script>
</body>
</html>"#;
