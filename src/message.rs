//! Private messages

use crate::client::{ForumClient, MethodCall};
use crate::envelope::codes;
use crate::error::{ForumError, Result};
use crate::lenient;
use crate::member::Member;
use crate::post::{require_id, require_text, signature_flag};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// Separator the API uses between recipient usernames
const RECIPIENT_SEPARATOR: &str = ";";

/// `statusicon` of a message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    New,
    Old,
    Replied,
    #[default]
    Unknown,
}

impl From<&str> for MessageStatus {
    fn from(icon: &str) -> Self {
        match icon {
            "new" => MessageStatus::New,
            "old" => MessageStatus::Old,
            "replied" => MessageStatus::Replied,
            _ => MessageStatus::Unknown,
        }
    }
}

/// A private message.
///
/// Inbox listings only carry the header fields (`fetched == false`);
/// [`ForumClient::get_message`] returns the body and sender as well.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Message {
    pub id: u64,
    pub folder_id: u64,
    pub recipients: Vec<String>,
    pub title: String,
    pub message: String,
    pub message_plain: String,
    pub message_bbcode: String,
    pub status: MessageStatus,
    pub time: Option<DateTime<Utc>>,
    pub unread: bool,
    pub user_id: u64,
    pub username: String,
    pub sender: Option<Member>,
    pub fetched: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RawPm {
    #[serde(default, deserialize_with = "lenient::int")]
    pmid: u64,
    #[serde(default, deserialize_with = "lenient::int")]
    folderid: u64,
    #[serde(default, deserialize_with = "lenient::text")]
    recipients: String,
    #[serde(default, deserialize_with = "lenient::text")]
    title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    fromusername: String,
    // Listing-only
    #[serde(default, deserialize_with = "lenient::timestamp")]
    sendtime: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::text")]
    statusicon: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawPmPost {
    #[serde(default, deserialize_with = "lenient::text")]
    title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    message: String,
    #[serde(default, deserialize_with = "lenient::text")]
    message_plain: String,
    #[serde(default, deserialize_with = "lenient::text")]
    message_bbcode: String,
    #[serde(default, deserialize_with = "lenient::text")]
    statusicon: String,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    posttime: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::int")]
    userid: u64,
}

#[derive(Debug, Default, Deserialize)]
struct RawUserInfo {
    #[serde(default, deserialize_with = "lenient::int")]
    userid: u64,
    #[serde(default, deserialize_with = "lenient::text")]
    username: String,
}

fn split_recipients(recipients: &str) -> Vec<String> {
    recipients
        .split(RECIPIENT_SEPARATOR)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn decode<T: serde::de::DeserializeOwned + Default>(value: Option<&Value>) -> T {
    value
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

impl Message {
    /// Parse the `HTML` block of a `private_showpm` response.
    ///
    /// `None` unless both `pm` and `postbit.post` are present.
    pub fn from_showpm(html: &Value) -> Option<Self> {
        let pm_value = html.get("pm").filter(|v| v.is_object())?;
        let post_value = html.pointer("/postbit/post").filter(|v| v.is_object())?;
        let pm: RawPm = decode(Some(pm_value));
        let post: RawPmPost = decode(Some(post_value));
        let status = MessageStatus::from(post.statusicon.as_str());

        Some(Self {
            id: pm.pmid,
            folder_id: pm.folderid,
            recipients: split_recipients(&pm.recipients),
            title: if post.title.is_empty() {
                pm.title
            } else {
                post.title
            },
            message: post.message,
            message_plain: post.message_plain,
            message_bbcode: post.message_bbcode,
            status,
            time: post.posttime,
            unread: status == MessageStatus::New,
            user_id: post.userid,
            username: pm.fromusername,
            sender: Some(Member::from_value(post_value)),
            fetched: true,
        })
    }

    /// Parse one `messagelistbits` entry of an inbox listing.
    pub fn from_list_bit(bit: &Value, folder_id: u64) -> Option<Self> {
        let pm: RawPm = decode(Some(bit.get("pm").filter(|v| v.is_object())?));
        let user: RawUserInfo = decode(bit.pointer("/userbit/userinfo"));

        Some(Self {
            id: pm.pmid,
            folder_id,
            title: pm.title,
            status: MessageStatus::from(pm.statusicon.as_str()),
            time: pm.sendtime,
            unread: bit
                .pointer("/show/unread")
                .is_some_and(lenient::as_flag),
            user_id: user.userid,
            username: user.username,
            ..Default::default()
        })
    }
}

/// Private message to send
#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    /// Usernames
    pub recipients: Vec<String>,
    pub title: String,
    pub message: String,
    pub signature: bool,
}

impl NewMessage {
    pub fn new(
        recipient: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipients: vec![recipient.into()],
            title: title.into(),
            message: message.into(),
            signature: false,
        }
    }
}

impl ForumClient {
    /// Fetch a private message of the logged-in user.
    pub async fn get_message(&self, pm_id: u64) -> Result<Message> {
        require_id("pm_id", pm_id)?;

        let envelope = self
            .call(MethodCall::new("private_showpm").param("pmid", pm_id))
            .await?;
        let payload = envelope.require_payload("message")?;
        payload
            .get("HTML")
            .and_then(Message::from_showpm)
            .ok_or_else(|| ForumError::NotFound(format!("message {pm_id}")))
    }

    /// Send a private message.
    pub async fn send_message(&self, message: NewMessage) -> Result<()> {
        let recipients = message
            .recipients
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>();
        if recipients.is_empty() {
            return Err(ForumError::InvalidParams("recipients are required".to_string()));
        }
        require_text("title", &message.title)?;
        require_text("message", &message.message)?;

        let envelope = self
            .call(
                MethodCall::new("private_insertpm")
                    .param("recipients", recipients.join(RECIPIENT_SEPARATOR))
                    .param("title", &message.title)
                    .param("message", &message.message)
                    .param("signature", signature_flag(message.signature)),
            )
            .await?;
        envelope.expect_code(codes::MESSAGE_SENT)?;
        info!(recipients = recipients.len(), "Private message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_from_showpm() {
        let message = Message::from_showpm(&json!({
            "pm": {
                "pmid": "88",
                "folderid": "0",
                "recipients": "alice; bob;",
                "title": "pm title",
                "fromusername": "carol"
            },
            "postbit": {
                "post": {
                    "statusicon": "new",
                    "posttime": "1500000000",
                    "userid": "5",
                    "username": "carol",
                    "usertitle": "Moderator",
                    "joindate": "1262304000",
                    "onlinestatus": { "onlinestatus": 1 },
                    "title": "",
                    "message": "<i>hey</i>",
                    "message_plain": "hey",
                    "message_bbcode": "[i]hey[/i]"
                }
            }
        }))
        .unwrap();

        assert!(message.fetched);
        assert_eq!(message.id, 88);
        assert_eq!(message.recipients, vec!["alice", "bob"]);
        assert_eq!(message.title, "pm title");
        assert_eq!(message.status, MessageStatus::New);
        assert!(message.unread);
        assert_eq!(message.user_id, 5);
        assert_eq!(message.username, "carol");

        let sender = message.sender.unwrap();
        assert!(!sender.fetched);
        assert_eq!(sender.title, "Moderator");
        assert!(sender.online);
        assert_eq!(sender.join_date.map(|t| t.timestamp()), Some(1_262_304_000));
    }

    #[test]
    fn test_showpm_requires_pm_and_post() {
        assert!(Message::from_showpm(&json!({ "pm": { "pmid": "1" } })).is_none());
        assert!(Message::from_showpm(&json!({ "postbit": { "post": {} } })).is_none());
    }

    #[test]
    fn test_message_from_list_bit() {
        let message = Message::from_list_bit(
            &json!({
                "pm": { "pmid": "7", "sendtime": "1500000000", "statusicon": "replied", "title": "Re: hi" },
                "userbit": { "userinfo": { "userid": "3", "username": "bob" } },
                "show": { "unread": "0" }
            }),
            2,
        )
        .unwrap();

        assert!(!message.fetched);
        assert_eq!(message.id, 7);
        assert_eq!(message.folder_id, 2);
        assert_eq!(message.status, MessageStatus::Replied);
        assert!(!message.unread);
        assert_eq!(message.username, "bob");
        assert!(message.sender.is_none());
    }

    #[test]
    fn test_status_icons() {
        assert_eq!(MessageStatus::from("old"), MessageStatus::Old);
        assert_eq!(MessageStatus::from("forwarded"), MessageStatus::Unknown);
    }
}
