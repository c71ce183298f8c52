//! Private message folders

use crate::client::{ForumClient, MethodCall};
use crate::envelope::codes;
use crate::error::Result;
use crate::lenient;
use crate::message::Message;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

/// One page of a message folder
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Inbox {
    pub folder_id: u64,
    /// Messages in the folder (`pmtotal`)
    pub total_messages: u64,
    /// Per-user limit (`pmquota`)
    pub message_quota: u64,
    pub messages: Vec<Message>,
}

impl Inbox {
    /// Parse the `HTML` block of a `private_messagelist` response.
    ///
    /// Messages are grouped by period (`messagelist_periodgroups`); both the
    /// groups and the bits inside them may be a single object.
    pub fn from_html(html: &Value) -> Self {
        let folder_id = html.get("folderid").and_then(lenient::as_u64).unwrap_or_default();

        let messages = html
            .get("messagelist_periodgroups")
            .map(lenient::as_list::<Value>)
            .unwrap_or_default()
            .iter()
            .filter_map(|group| group.get("messagelistbits"))
            .flat_map(lenient::as_list::<Value>)
            .filter_map(|bit| Message::from_list_bit(&bit, folder_id))
            .collect();

        Self {
            folder_id,
            total_messages: html.get("pmtotal").and_then(lenient::as_u64).unwrap_or_default(),
            message_quota: html.get("pmquota").and_then(lenient::as_u64).unwrap_or_default(),
            messages,
        }
    }
}

/// Folder page to list
#[derive(Debug, Clone, Default)]
pub struct InboxQuery {
    /// 0 is the inbox
    pub folder_id: u64,
    pub page_number: Option<u32>,
    pub per_page: Option<u32>,
}

/// Delete every message in a folder sent before `before`
#[derive(Debug, Clone)]
pub struct EmptyFolder {
    pub before: DateTime<Utc>,
    pub folder_id: u64,
}

impl EmptyFolder {
    /// Empty the inbox up to `before`
    pub fn inbox(before: DateTime<Utc>) -> Self {
        Self {
            before,
            folder_id: 0,
        }
    }
}

impl ForumClient {
    /// List a page of private messages.
    pub async fn get_inbox(&self, query: InboxQuery) -> Result<Inbox> {
        let envelope = self
            .call(
                MethodCall::new("private_messagelist")
                    .param("folderid", query.folder_id)
                    .param_opt("pagenumber", query.page_number)
                    .param_opt("perpage", query.per_page),
            )
            .await?;

        let payload = envelope.require_payload("inbox")?;
        let inbox = payload
            .get("HTML")
            .map(Inbox::from_html)
            .unwrap_or_else(|| Inbox {
                folder_id: query.folder_id,
                ..Default::default()
            });
        debug!(
            folder_id = inbox.folder_id,
            messages = inbox.messages.len(),
            total = inbox.total_messages,
            "Fetched message folder"
        );
        Ok(inbox)
    }

    /// Delete messages older than a date from a folder.
    pub async fn empty_folder(&self, request: EmptyFolder) -> Result<()> {
        let envelope = self
            .call(
                MethodCall::new("private_confirmemptyfolder")
                    .param("dateline", request.before.timestamp())
                    .param("folderid", request.folder_id),
            )
            .await?;
        envelope.expect_code(codes::MESSAGES_DELETED)?;
        info!(folder_id = request.folder_id, before = %request.before, "Message folder emptied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bit(id: u64) -> Value {
        json!({
            "pm": { "pmid": id.to_string(), "statusicon": "old", "title": "t" },
            "userbit": { "userinfo": { "userid": "1", "username": "a" } },
            "show": { "unread": 1 }
        })
    }

    #[test]
    fn test_single_group_single_bit() {
        let inbox = Inbox::from_html(&json!({
            "folderid": 0,
            "pmtotal": "2",
            "pmquota": "2000",
            "messagelist_periodgroups": {
                "group_id": "0_yesterday",
                "messagelistbits": bit(1)
            }
        }));

        assert_eq!(inbox.total_messages, 2);
        assert_eq!(inbox.message_quota, 2000);
        assert_eq!(inbox.messages.len(), 1);
        assert!(inbox.messages[0].unread);
    }

    #[test]
    fn test_many_groups_many_bits() {
        let inbox = Inbox::from_html(&json!({
            "folderid": "3",
            "messagelist_periodgroups": [
                { "messagelistbits": [bit(1), bit(2)] },
                { "messagelistbits": bit(3) },
                { "group_id": "empty" }
            ]
        }));

        assert_eq!(inbox.folder_id, 3);
        assert_eq!(
            inbox.messages.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(inbox.messages.iter().all(|m| m.folder_id == 3));
    }

    #[test]
    fn test_empty_folder() {
        let inbox = Inbox::from_html(&json!({ "pmtotal": "0", "messagelist_periodgroups": "" }));
        assert!(inbox.messages.is_empty());
    }
}
