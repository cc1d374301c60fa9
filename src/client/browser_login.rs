use std::io::ErrorKind;
use std::ops::Range;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::client::core::{OxApiClient, LOGIN_PATH};
use crate::client::token::parse_verifier;
use crate::error::OxApiError;

/// Ports the callback listener starts probing from.
pub const PORT_RANGE: Range<u16> = 1024..65000;

/// How many consecutive ports are tried when the chosen one is taken.
pub const MAX_BIND_ATTEMPTS: u16 = 32;

const MAX_REQUEST_HEAD: usize = 16 * 1024;

/// Browsers may open idle speculative connections; don't let one stall the loop.
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(5);

const CLOSE_TAB_PAGE: &str =
    "<body>Cool, you can close this tab<script>window.close();</script></body>";

/// Opens a URL in the user's browser.
pub trait BrowserOpener: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// The platform default browser.
pub struct SystemBrowser;

impl BrowserOpener for SystemBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        webbrowser::open(url)
    }
}

impl<F> BrowserOpener for F
where
    F: Fn(&str) -> std::io::Result<()> + Send + Sync,
{
    fn open(&self, url: &str) -> std::io::Result<()> {
        self(url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPhase {
    AwaitingRedirect,
    AwaitingCallback,
    Complete,
}

/// What the listener should do with one incoming request.
#[derive(Debug, PartialEq, Eq)]
pub enum Route {
    Redirect(String),
    Callback(String),
    Ignore,
}

/// Tracks one browser login: where to send the browser and whether the
/// callback has been handled.
#[derive(Debug)]
pub struct CallbackState {
    authorization_url: String,
    phase: LoginPhase,
}

impl CallbackState {
    pub fn new(authorization_url: impl Into<String>) -> Self {
        Self {
            authorization_url: authorization_url.into(),
            phase: LoginPhase::AwaitingRedirect,
        }
    }

    pub fn phase(&self) -> LoginPhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase == LoginPhase::Complete
    }

    pub fn route(&mut self, path: &str) -> Route {
        if path == "/redir" {
            if self.phase == LoginPhase::AwaitingRedirect {
                self.phase = LoginPhase::AwaitingCallback;
            }
            Route::Redirect(self.authorization_url.clone())
        } else if path.starts_with("/cb") {
            Route::Callback(path.to_string())
        } else {
            Route::Ignore
        }
    }

    pub fn complete(&mut self) {
        self.phase = LoginPhase::Complete;
    }
}

/// Completes the OAuth handshake through the user's browser and a short-lived
/// local HTTP listener.
pub struct BrowserLogin {
    opener: Box<dyn BrowserOpener>,
    timeout: Option<Duration>,
    start_port: Option<u16>,
}

impl Default for BrowserLogin {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserLogin {
    pub fn new() -> Self {
        Self {
            opener: Box::new(SystemBrowser),
            timeout: None,
            start_port: None,
        }
    }

    pub fn with_opener(mut self, opener: impl BrowserOpener + 'static) -> Self {
        self.opener = Box::new(opener);
        self
    }

    /// Give up waiting for the callback after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Try binding from `port` instead of a random port.
    pub fn with_start_port(mut self, port: u16) -> Self {
        self.start_port = Some(port);
        self
    }

    pub async fn interactive_login(&self, client: &mut OxApiClient) -> Result<(), OxApiError> {
        let start = self
            .start_port
            .unwrap_or_else(|| rand::random_range(PORT_RANGE));
        let listener = bind_listener(start).await?;
        let port = listener
            .local_addr()
            .map_err(OxApiError::ListenerFailure)?
            .port();
        tracing::debug!("Listening for browser connection on port {port}");

        client
            .obtain_request_token(&format!("http://localhost:{port}/cb"))
            .await?;
        let mut state = CallbackState::new(client.authorization_url(LOGIN_PATH)?);

        let redirect = format!("http://localhost:{port}/redir");
        if let Err(e) = self.opener.open(&redirect) {
            tracing::warn!("Could not open browser automatically ({e}). Please visit:\n{redirect}");
        }

        let serve = serve_until_complete(&listener, &mut state, client);
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, serve).await.map_err(|_| {
                OxApiError::AuthFailure(format!(
                    "Timed out waiting for browser login after {}s",
                    timeout.as_secs()
                ))
            })?,
            None => serve.await,
        }
    }
}

/// Bind `0.0.0.0:start`, moving to the next port while the address is taken.
pub async fn bind_listener(start: u16) -> Result<TcpListener, OxApiError> {
    let mut port = start;
    for _ in 0..MAX_BIND_ATTEMPTS {
        match TcpListener::bind(("0.0.0.0", port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                tracing::debug!("Port {port} in use, trying the next one");
                port = port.checked_add(1).unwrap_or(PORT_RANGE.start);
            }
            Err(e) => return Err(OxApiError::ListenerFailure(e)),
        }
    }
    Err(OxApiError::ListenerFailure(std::io::Error::new(
        ErrorKind::AddrInUse,
        format!("no free port in {MAX_BIND_ATTEMPTS} attempts starting at {start}"),
    )))
}

async fn serve_until_complete(
    listener: &TcpListener,
    state: &mut CallbackState,
    client: &mut OxApiClient,
) -> Result<(), OxApiError> {
    while !state.is_complete() {
        let (mut stream, peer) = listener.accept().await.map_err(OxApiError::ListenerFailure)?;
        let read = tokio::time::timeout(REQUEST_READ_TIMEOUT, read_request_path(&mut stream));
        let Some(path) = read.await.ok().flatten() else {
            tracing::debug!("Dropping unreadable request from {peer}");
            continue;
        };
        tracing::debug!("{peer} requested {path}");

        match state.route(&path) {
            Route::Redirect(location) => {
                tracing::debug!("Redirecting browser to {location}");
                let head = format!("HTTP/1.1 303 See Other\r\nLocation: {location}\r\n");
                write_response(&mut stream, &head, "").await;
            }
            Route::Callback(path) => {
                let exchanged = match parse_verifier(&path) {
                    Ok(verifier) => client.exchange_verifier(&verifier).await.map(|_| ()),
                    Err(e) => Err(e),
                };
                if let Err(e) = exchanged {
                    let page = format!("<body>Login failed: {e}</body>");
                    write_response(
                        &mut stream,
                        "HTTP/1.1 500 Internal Server Error\r\nContent-Type: text/html\r\n",
                        &page,
                    )
                    .await;
                    return Err(e);
                }
                write_response(
                    &mut stream,
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n",
                    CLOSE_TAB_PAGE,
                )
                .await;
                state.complete();
            }
            Route::Ignore => {
                write_response(&mut stream, "HTTP/1.1 200 OK\r\n", "").await;
            }
        }
    }
    Ok(())
}

/// Read a request head and return the target of a GET request line.
async fn read_request_path(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.len() >= MAX_REQUEST_HEAD {
            break;
        }
    }
    parse_request_path(&String::from_utf8_lossy(&buf))
}

fn parse_request_path(request: &str) -> Option<String> {
    let mut parts = request.lines().next()?.split_whitespace();
    let method = parts.next()?;
    let path = parts.next()?;
    (method == "GET").then(|| path.to_string())
}

// The browser is a best-effort peer; a failed write only loses that response.
async fn write_response(stream: &mut TcpStream, head: &str, body: &str) {
    let response = format!(
        "{head}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        tracing::debug!("Failed to write callback response: {e}");
        return;
    }
    let _ = stream.shutdown().await;
}
