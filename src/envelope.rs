//! Response envelope and error-code classification
//!
//! Every call returns a JSON object. Forum data lives under `response`, and
//! the outcome of an action is reported as `response.errormessage`, which is
//! set for successes too (`redirect_login`, `redirect_postthanks`, ...).
//! Each action names its own success code through [`Envelope::expect_code`].

use crate::error::{ForumError, Result};
use serde_json::Value;

/// Outcome codes returned in `response.errormessage`
pub mod codes {
    /// Login succeeded
    pub const LOGIN_SUCCESS: &str = "redirect_login";
    /// Logout succeeded
    pub const LOGOUT_SUCCESS: &str = "cookieclear";
    /// Thread or reply created
    pub const POST_CREATED: &str = "redirect_postthanks";
    /// Post edited
    pub const POST_EDITED: &str = "redirect_editthanks";
    /// Post deleted
    pub const POST_DELETED: &str = "redirect_deletepost";
    /// Private message sent
    pub const MESSAGE_SENT: &str = "pm_messagesent";
    /// Private message folder emptied
    pub const MESSAGES_DELETED: &str = "pm_messagesdeleted";

    /// Wrong username or password
    pub const BAD_LOGIN: &str = "badlogin";
    /// Wrong credentials, with a strike count toward a lockout
    pub const BAD_LOGIN_STRIKES: &str = "badlogin_strikes";
    /// Reply attempted on a closed thread
    pub const THREAD_CLOSED: &str = "threadclosed";
}

/// Extract the error code from a decoded response.
///
/// Reads `response.errormessage`, taking the first element when it is a list.
/// Returns an empty string when there is no code. No codes are whitelisted here.
pub fn parse_error_message(response: &Value) -> String {
    let Some(message) = response
        .get("response")
        .and_then(|payload| payload.get("errormessage"))
    else {
        return String::new();
    };

    let first = match message {
        Value::Array(items) => items.first().unwrap_or(&Value::Null),
        other => other,
    };

    match first {
        Value::String(code) => code.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A decoded API response
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope(Value);

impl Envelope {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// `response.errormessage`, or empty
    pub fn error_message(&self) -> String {
        parse_error_message(&self.0)
    }

    /// Data nested under `response`
    pub fn payload(&self) -> Option<&Value> {
        self.0.get("response")
    }

    /// `show` block, carrying ids of created content
    pub fn show(&self) -> Option<&Value> {
        self.0.get("show")
    }

    /// `session` block, returned by login and logout
    pub fn session(&self) -> Option<&Value> {
        self.0.get("session").filter(|s| s.is_object())
    }

    /// Succeed only if the response carries `expected`.
    ///
    /// Any other code is a [`ForumError::Domain`]. A response without a code
    /// is reported as `Domain` with an empty code.
    pub fn expect_code(&self, expected: &str) -> Result<&Self> {
        let code = self.error_message();
        if code == expected {
            Ok(self)
        } else {
            Err(ForumError::Domain { code })
        }
    }

    /// Payload under `response` for a read.
    ///
    /// A response that carries an error code is [`ForumError::Domain`]; one
    /// without a payload is `NotFound(what)`.
    pub fn require_payload(&self, what: &str) -> Result<&Value> {
        let code = self.error_message();
        if !code.is_empty() {
            return Err(ForumError::Domain { code });
        }
        self.payload()
            .filter(|p| !p.is_null())
            .ok_or_else(|| ForumError::NotFound(what.to_string()))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Envelope {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_message_in_list() {
        let response = json!({ "response": { "errormessage": ["badlogin"] } });
        assert_eq!(parse_error_message(&response), "badlogin");
    }

    #[test]
    fn test_error_message_as_string() {
        let response = json!({ "response": { "errormessage": "cookieclear" } });
        assert_eq!(parse_error_message(&response), "cookieclear");
    }

    #[test]
    fn test_no_error_message() {
        assert_eq!(parse_error_message(&json!({})), "");
        assert_eq!(parse_error_message(&json!({ "response": { "forumid": "1" } })), "");
        assert_eq!(parse_error_message(&json!({ "response": "text" })), "");
        assert_eq!(parse_error_message(&json!([1, 2])), "");
        assert_eq!(parse_error_message(&json!({ "response": { "errormessage": [] } })), "");
    }

    #[test]
    fn test_expect_code() {
        let envelope = Envelope::new(json!({
            "response": { "errormessage": ["redirect_postthanks"] },
            "show": { "threadid": "5", "postid": "9" }
        }));
        assert!(envelope.expect_code(codes::POST_CREATED).is_ok());

        let err = envelope.expect_code(codes::POST_EDITED).unwrap_err();
        assert_eq!(err.code(), Some("redirect_postthanks"));
    }

    #[test]
    fn test_require_payload() {
        let envelope = Envelope::new(json!({ "session": { "userid": "1" } }));
        assert!(matches!(
            envelope.require_payload("thread"),
            Err(ForumError::NotFound(_))
        ));
        assert!(envelope.session().is_some());
        assert!(envelope.show().is_none());

        let envelope = Envelope::new(json!({ "response": { "errormessage": "invalidid" } }));
        assert_eq!(
            envelope.require_payload("thread").unwrap_err().code(),
            Some("invalidid")
        );

        let envelope = Envelope::new(json!({ "response": { "thread": {} } }));
        assert!(envelope.require_payload("thread").unwrap().get("thread").is_some());
    }
}
