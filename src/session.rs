//! Session state negotiated by the `api_init` handshake, and the logged-in
//! user's session variables.

use crate::error::ForumError;
use crate::lenient;
use crate::signature;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Identity negotiated with the server. Immutable once the handshake succeeds.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Protocol version (`apiversion`), sent as `api_v`
    pub api_version: String,
    /// Access token (`apiaccesstoken`), sent as `api_s`
    pub access_token: String,
    /// Server session hash (`sessionhash`)
    pub session_hash: String,
    /// Client id (`apiclientid`), sent as `api_c`
    pub client_id: String,
    /// Signing secret (`secret`), never sent
    pub secret: String,
}

impl SessionState {
    /// Read the five handshake fields. `None` if any is missing or empty.
    pub fn from_handshake(response: &Value) -> Option<Self> {
        let field = |name: &str| {
            response
                .get(name)
                .and_then(lenient::as_string)
                .filter(|v| !v.is_empty())
        };

        Some(Self {
            api_version: field("apiversion")?,
            access_token: field("apiaccesstoken")?,
            session_hash: field("sessionhash")?,
            client_id: field("apiclientid")?,
            secret: field("secret")?,
        })
    }

    /// All fields needed for signing are present
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.client_id.is_empty() && !self.secret.is_empty()
    }

    /// `api_sig` for this session
    pub fn sign(&self, api_key: &str) -> String {
        signature::sign(&self.access_token, &self.client_id, &self.secret, api_key)
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("api_version", &self.api_version)
            .field("access_token", &self.access_token)
            .field("session_hash", &self.session_hash)
            .field("client_id", &self.client_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Why a client can never become ready
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitFailure {
    /// Required settings missing at construction
    Configuration(String),
    /// Handshake rejected or transport failed
    Handshake(String),
}

impl InitFailure {
    pub fn message(&self) -> &str {
        match self {
            InitFailure::Configuration(m) | InitFailure::Handshake(m) => m,
        }
    }

    pub fn to_error(&self) -> ForumError {
        match self {
            InitFailure::Configuration(m) => ForumError::Configuration(m.clone()),
            InitFailure::Handshake(m) => ForumError::Handshake(m.clone()),
        }
    }
}

/// Handshake lifecycle. Moves forward only:
/// `Unstarted -> Negotiating -> Ready | Failed`.
#[derive(Debug, Clone, Default)]
pub enum HandshakeState {
    #[default]
    Unstarted,
    Negotiating,
    Ready(Arc<SessionState>),
    Failed(InitFailure),
}

impl HandshakeState {
    /// Ready or failed
    pub fn is_resolved(&self) -> bool {
        matches!(self, HandshakeState::Ready(_) | HandshakeState::Failed(_))
    }

    pub fn session(&self) -> Option<Arc<SessionState>> {
        match self {
            HandshakeState::Ready(session) => Some(Arc::clone(session)),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&InitFailure> {
        match self {
            HandshakeState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match self {
            HandshakeState::Unstarted => SessionStatus::Unstarted,
            HandshakeState::Negotiating => SessionStatus::Negotiating,
            HandshakeState::Ready(_) => SessionStatus::Ready,
            HandshakeState::Failed(_) => SessionStatus::Failed,
        }
    }
}

/// Public view of [`HandshakeState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unstarted,
    Negotiating,
    Ready,
    Failed,
}

/// Logged-in user's session variables, written by login and logout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSession {
    /// `dbsessionhash` from the server
    pub session_hash_id: String,
    pub username: String,
    pub user_id: u64,
    pub logged_in: bool,
}

impl UserSession {
    /// Merge a `session` object from a login/logout response.
    pub fn merge(&mut self, session: &Value) {
        if let Some(hash) = session.get("dbsessionhash").and_then(lenient::as_string) {
            self.session_hash_id = hash;
        }
        if let Some(user_id) = session.get("userid").and_then(lenient::as_u64) {
            self.user_id = user_id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn handshake() -> Value {
        json!({
            "apiversion": "6",
            "apiaccesstoken": "token",
            "sessionhash": "hash",
            "apiclientid": 42,
            "secret": "s3cret"
        })
    }

    #[test]
    fn test_from_handshake() {
        let session = SessionState::from_handshake(&handshake()).unwrap();
        assert_eq!(session.api_version, "6");
        assert_eq!(session.client_id, "42");
        assert!(session.is_complete());
        assert_eq!(session.sign("key"), signature::sign("token", "42", "s3cret", "key"));
    }

    #[test]
    fn test_from_handshake_requires_every_field() {
        for field in ["apiversion", "apiaccesstoken", "sessionhash", "apiclientid", "secret"] {
            let mut response = handshake();
            response.as_object_mut().unwrap().remove(field);
            assert!(SessionState::from_handshake(&response).is_none(), "{field}");

            let mut response = handshake();
            response[field] = json!("");
            assert!(SessionState::from_handshake(&response).is_none(), "{field}");
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let session = SessionState::from_handshake(&handshake()).unwrap();
        let printed = format!("{session:?}");
        assert!(!printed.contains("s3cret"));
    }

    #[test]
    fn test_state_resolution() {
        assert!(!HandshakeState::Unstarted.is_resolved());
        assert!(!HandshakeState::Negotiating.is_resolved());

        let failed = HandshakeState::Failed(InitFailure::Handshake("boom".into()));
        assert!(failed.is_resolved());
        assert_eq!(failed.status(), SessionStatus::Failed);
        assert!(matches!(
            failed.failure().map(InitFailure::to_error),
            Some(ForumError::Handshake(m)) if m == "boom"
        ));
    }

    #[test]
    fn test_user_session_merge_keeps_identity() {
        let mut user = UserSession {
            username: "alice".into(),
            logged_in: true,
            ..Default::default()
        };
        user.merge(&json!({ "dbsessionhash": "abc", "userid": "17" }));
        assert_eq!(user.session_hash_id, "abc");
        assert_eq!(user.user_id, 17);
        assert_eq!(user.username, "alice");
        assert!(user.logged_in);
    }
}
