//! HTTP client for the vBulletin mobile API
//!
//! One [`ForumClient`] owns one API session. The session is negotiated by the
//! unsigned `api_init` handshake; every other method is signed with
//! `api_sig` and waits until the handshake has resolved before it is sent.

use crate::config::{ClientConfig, ConnectionConfig};
use crate::envelope::{codes, parse_error_message, Envelope};
use crate::error::{ForumError, Result};
use crate::session::{HandshakeState, InitFailure, SessionState, SessionStatus, UserSession};
use crate::signature;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{self, HeaderValue};
use reqwest::{multipart, Client, StatusCode, Url};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

/// The bootstrap method. The only method sent without a signature.
pub const HANDSHAKE_METHOD: &str = "api_init";

/// A remote method invocation
///
/// ```rust
/// use vbulletin_client::MethodCall;
///
/// let call = MethodCall::new("showthread")
///     .param("threadid", 41257)
///     .param("perpage", 20);
/// assert!(call.is_signed());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodCall {
    /// Remote method name, sent as `api_m`
    pub method: String,
    /// Method parameters. Override the session fields on key collision.
    pub params: BTreeMap<String, String>,
    /// Cookies, for actions authenticated by cookie (inline moderation)
    pub cookies: BTreeMap<String, String>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Default::default()
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    /// Add a parameter only when a value is given
    pub fn param_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.cookies.insert(name.into(), value.to_string());
        self
    }

    /// Every method except the handshake is signed
    pub fn is_signed(&self) -> bool {
        self.method != HANDSHAKE_METHOD
    }
}

/// Client for one forum API session
///
/// Cloning is cheap; clones share the session.
///
/// # Example
///
/// ```rust,no_run
/// use vbulletin_client::{ClientConfig, ForumClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ForumClient::open(ClientConfig::new(
///     "https://forum.example.com/forum/api.php",
///     "api-key",
///     "my-bot",
///     "1.0",
/// ))
/// .await?;
///
/// client.login("alice", "password").await?;
/// let forums = client.get_forums().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ForumClient {
    inner: Arc<Inner>,
}

struct Inner {
    connection: ConnectionConfig,
    http: Client,
    /// Single writer: the handshake. Every signed call subscribes.
    state: watch::Sender<HandshakeState>,
    user: RwLock<UserSession>,
}

impl ForumClient {
    /// Build a client without touching the network.
    ///
    /// Missing settings do not fail here: the client is created in the failed
    /// state and every call returns [`ForumError::Configuration`]. The only
    /// error is failing to construct the HTTP client itself.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let connection = ConnectionConfig::from_config(&config);

        let mut builder = Client::builder().user_agent(connection.client_name());
        if let Some(timeout) = connection.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        let initial = match connection.validate() {
            Ok(()) => HandshakeState::Unstarted,
            Err(ForumError::Configuration(reason)) => {
                warn!(%reason, "Forum client configuration is incomplete");
                HandshakeState::Failed(InitFailure::Configuration(reason))
            }
            Err(other) => HandshakeState::Failed(InitFailure::Configuration(other.to_string())),
        };
        let (state, _) = watch::channel(initial);

        Ok(Self {
            inner: Arc::new(Inner {
                connection,
                http,
                state,
                user: RwLock::new(UserSession::default()),
            }),
        })
    }

    /// Build a client and wait for its session.
    pub async fn open(config: ClientConfig) -> Result<Self> {
        let client = Self::new(config)?;
        client.connect().await?;
        Ok(client)
    }

    /// Start the handshake, or join the one already running, and wait for it
    /// up to the configured init timeout.
    ///
    /// The handshake runs on its own task: dropping this future or timing
    /// out only stops the wait.
    pub async fn connect(&self) -> Result<Arc<SessionState>> {
        self.start();
        self.wait_for_initialization(self.inner.connection.init_timeout())
            .await
    }

    /// Start the handshake in the background if nothing has started it yet.
    pub fn start(&self) {
        if self.claim_handshake() {
            let client = self.clone();
            tokio::spawn(async move { client.run_handshake().await });
        }
    }

    /// Wait until the session is ready, failing after `timeout`.
    ///
    /// Returns at once if the handshake has already resolved. Each waiter has
    /// its own deadline; a failed handshake releases all of them with the
    /// handshake's error. Starts the handshake if it has not been started.
    pub async fn wait_for_initialization(&self, timeout: Duration) -> Result<Arc<SessionState>> {
        let current = resolution(&self.inner.state.borrow());
        if let Some(outcome) = current {
            return outcome;
        }

        self.start();
        let mut rx = self.inner.state.subscribe();
        // Bound first so the borrowed state is released before `rx`
        let waited = tokio::time::timeout(timeout, rx.wait_for(HandshakeState::is_resolved)).await;
        let outcome = match waited {
            Ok(Ok(state)) => resolution(&state).unwrap_or(Err(ForumError::NotInitialized)),
            Ok(Err(_)) => Err(ForumError::NotInitialized),
            Err(_) => {
                warn!(waited_ms = timeout.as_millis() as u64, "Timed out waiting for api_init");
                Err(ForumError::Timeout {
                    waited: timeout,
                    reason: "handshake did not complete".to_string(),
                })
            }
        };
        outcome
    }

    /// Connection settings
    pub fn connection(&self) -> &ConnectionConfig {
        &self.inner.connection
    }

    /// Current handshake status
    pub fn status(&self) -> SessionStatus {
        self.inner.state.borrow().status()
    }

    /// Negotiated session, once ready
    pub fn session(&self) -> Option<Arc<SessionState>> {
        self.inner.state.borrow().session()
    }

    /// Snapshot of the logged-in user's session
    pub async fn user_session(&self) -> UserSession {
        self.inner.user.read().await.clone()
    }

    // ==================== Dispatch ====================

    /// Call a remote method and return the decoded JSON.
    ///
    /// Signed methods wait for the handshake first. A non-200 status or a
    /// transport failure is [`ForumError::NoResponse`]. Error codes inside a
    /// 200 response are left for the caller; see [`Envelope`].
    pub async fn call_method(&self, call: MethodCall) -> Result<Value> {
        if call.method.is_empty() {
            return Err(ForumError::MethodMissing);
        }

        let signed = call.is_signed();
        let session = if signed {
            Some(
                self.wait_for_initialization(self.inner.connection.init_timeout())
                    .await?,
            )
        } else {
            let failure = self.inner.state.borrow().failure().cloned();
            if let Some(failure) = failure {
                return Err(failure.to_error());
            }
            self.session()
        };

        let mut fields = BTreeMap::new();
        fields.insert("api_m".to_string(), call.method.clone());
        fields.insert(
            "api_c".to_string(),
            session.as_ref().map(|s| s.client_id.clone()).unwrap_or_default(),
        );
        fields.insert(
            "api_s".to_string(),
            session.as_ref().map(|s| s.access_token.clone()).unwrap_or_default(),
        );
        fields.insert(
            "api_v".to_string(),
            session.as_ref().map(|s| s.api_version.clone()).unwrap_or_default(),
        );
        fields.extend(call.params);

        if signed {
            let session = session
                .filter(|s| s.is_complete())
                .ok_or(ForumError::NotInitialized)?;
            fields.insert(
                "api_sig".to_string(),
                session.sign(self.inner.connection.api_key()),
            );
        }

        debug!(method = %call.method, signed, cookies = call.cookies.len(), "Calling forum API");
        self.post(fields, &call.cookies).await
    }

    /// [`ForumClient::call_method`], wrapped in an [`Envelope`]
    pub async fn call(&self, call: MethodCall) -> Result<Envelope> {
        Ok(Envelope::new(self.call_method(call).await?))
    }

    // ==================== Session API ====================

    /// Log in with a cleartext password. The password is md5-hashed locally.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserSession> {
        self.login_md5(username, &signature::hash_password(password))
            .await
    }

    /// Log in with an md5-hashed password.
    ///
    /// Fails with [`ForumError::Domain`] carrying `badlogin` or
    /// `badlogin_strikes` when the credentials are rejected.
    pub async fn login_md5(&self, username: &str, md5_password: &str) -> Result<UserSession> {
        let envelope = self
            .call(
                MethodCall::new("login_login")
                    .param("vb_login_username", username)
                    .param("vb_login_md5password", md5_password),
            )
            .await?;

        let mut user = self.inner.user.write().await;
        if let Some(session) = envelope.session() {
            user.merge(session);
        }

        if let Err(err) = envelope.expect_code(codes::LOGIN_SUCCESS) {
            warn!(username, code = ?err.code(), "Login rejected");
            return Err(err);
        }

        user.username = username.to_string();
        user.logged_in = true;
        info!(username, user_id = user.user_id, "Logged in");
        Ok(user.clone())
    }

    /// Log the current user out.
    pub async fn logout(&self) -> Result<()> {
        let envelope = self.call(MethodCall::new("login_logout")).await?;
        let code = envelope.error_message();

        let mut user = self.inner.user.write().await;
        if let Some(session) = envelope.session() {
            user.merge(session);
        }

        if !code.is_empty() && code != codes::LOGOUT_SUCCESS {
            warn!(%code, "Logout rejected");
            return Err(ForumError::Domain { code });
        }

        user.username.clear();
        user.logged_in = false;
        info!("Logged out");
        Ok(())
    }

    // ==================== Helper Methods ====================

    /// Move `Unstarted -> Negotiating`. True for exactly one caller.
    fn claim_handshake(&self) -> bool {
        self.inner.state.send_if_modified(|state| {
            if matches!(state, HandshakeState::Unstarted) {
                *state = HandshakeState::Negotiating;
                true
            } else {
                false
            }
        })
    }

    /// Runs on the task spawned by [`ForumClient::start`].
    async fn run_handshake(&self) {
        let guard = CancelGuard(&self.inner.state);
        let conn = &self.inner.connection;
        info!(api_url = conn.api_url(), "Starting api_init handshake");

        let call = MethodCall::new(HANDSHAKE_METHOD)
            .param("clientname", conn.client_name())
            .param("clientversion", conn.client_version())
            .param("platformname", conn.platform_name())
            .param("platformversion", conn.platform_version())
            .param("uniqueid", conn.unique_id());

        let next = match self.call_method(call).await {
            Ok(response) => match SessionState::from_handshake(&response) {
                Some(session) => {
                    info!(
                        api_version = %session.api_version,
                        client_id = %session.client_id,
                        "API session established"
                    );
                    HandshakeState::Ready(Arc::new(session))
                }
                None => {
                    let code = parse_error_message(&response);
                    let reason = if code.is_empty() {
                        "api connection did not return a session".to_string()
                    } else {
                        code
                    };
                    warn!(%reason, "Handshake returned no session");
                    HandshakeState::Failed(InitFailure::Handshake(reason))
                }
            },
            Err(err) => {
                warn!(error = %err, "Handshake request failed");
                HandshakeState::Failed(InitFailure::Handshake(err.to_string()))
            }
        };

        self.inner.state.send_replace(next);
        drop(guard);
    }

    async fn post(
        &self,
        fields: BTreeMap<String, String>,
        cookies: &BTreeMap<String, String>,
    ) -> Result<Value> {
        let form = fields
            .into_iter()
            .fold(multipart::Form::new(), |form, (key, value)| form.text(key, value));

        let conn = &self.inner.connection;
        let mut request = self.inner.http.post(conn.api_url()).multipart(form);
        if let Some(cookie) = cookie_header(cookies, conn.base_url(), conn.api_url()) {
            request = request.header(header::COOKIE, cookie);
        }

        let response = request.send().await.map_err(|err| {
            debug!(error = %err, "Forum API transport failure");
            ForumError::NoResponse(err.to_string())
        })?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            debug!(%status, "Forum API returned non-200");
            return Err(ForumError::NoResponse(format!("HTTP {}", status.as_u16())));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| ForumError::NoResponse(err.to_string()))?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Outcome of a resolved handshake, `None` while unresolved
fn resolution(state: &HandshakeState) -> Option<Result<Arc<SessionState>>> {
    match state {
        HandshakeState::Ready(session) => Some(Ok(Arc::clone(session))),
        HandshakeState::Failed(failure) => Some(Err(failure.to_error())),
        HandshakeState::Unstarted | HandshakeState::Negotiating => None,
    }
}

/// Cookies set on `base_url`, as sent to `api_url`.
///
/// `None` when there are none, or when `api_url` is outside the base URL's scope.
fn cookie_header(
    cookies: &BTreeMap<String, String>,
    base_url: &str,
    api_url: &str,
) -> Option<HeaderValue> {
    if cookies.is_empty() {
        return None;
    }
    let base = Url::parse(base_url).ok()?;
    let target = Url::parse(api_url).ok()?;

    let jar = Jar::default();
    for (name, value) in cookies {
        jar.add_cookie_str(&format!("{name}={value}"), &base);
    }
    jar.cookies(&target)
}

/// Fails the handshake if its task is dropped while still negotiating
/// (runtime shutdown), so waiters are released instead of timing out.
struct CancelGuard<'a>(&'a watch::Sender<HandshakeState>);

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        self.0.send_if_modified(|state| {
            if matches!(state, HandshakeState::Negotiating) {
                *state = HandshakeState::Failed(InitFailure::Handshake(
                    "handshake was cancelled".to_string(),
                ));
                true
            } else {
                false
            }
        });
    }
}
