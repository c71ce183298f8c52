//! Forums and their sub-forums

use crate::client::{ForumClient, MethodCall};
use crate::error::{ForumError, Result};
use crate::lenient;
use crate::post::require_id;
use crate::thread::Thread;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A forum. `threads` is only filled by [`ForumClient::get_forum`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Forum {
    pub id: u64,
    pub title: String,
    pub description: String,
    /// `None` for a top-level forum (the API sends `-1`)
    pub parent_id: Option<u64>,
    pub threads: Vec<Thread>,
    pub sub_forums: Vec<Forum>,
}

#[derive(Debug, Default, Deserialize)]
struct RawForum {
    #[serde(default, deserialize_with = "lenient::int")]
    forumid: u64,
    #[serde(default, deserialize_with = "lenient::text")]
    title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    description: String,
    #[serde(default, deserialize_with = "lenient::opt_int")]
    parentid: Option<u64>,
    #[serde(default)]
    foruminfo: Option<RawForumInfo>,
    #[serde(default)]
    threadbits: Value,
    #[serde(default)]
    forumbits: Option<Value>,
    #[serde(default)]
    subforums: Option<Value>,
}

/// `forumdisplay` puts the forum's own fields here
#[derive(Debug, Default, Deserialize)]
struct RawForumInfo {
    #[serde(default, deserialize_with = "lenient::int")]
    forumid: u64,
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    description: Option<Value>,
}

impl Forum {
    pub fn from_value(value: &Value) -> Self {
        let raw: RawForum = serde_json::from_value(value.clone()).unwrap_or_default();

        let mut forum = Self {
            id: raw.forumid,
            title: raw.title,
            description: raw.description,
            parent_id: raw.parentid,
            threads: lenient::as_list::<Value>(&raw.threadbits)
                .iter()
                .map(Thread::from_value)
                .collect(),
            sub_forums: Vec::new(),
        };

        if let Some(info) = raw.foruminfo {
            if info.forumid != 0 {
                forum.id = info.forumid;
            }
            if let Some(title) = info.title.as_ref().and_then(lenient::as_string) {
                forum.title = title;
            }
            if let Some(description) = info.description.as_ref().and_then(lenient::as_string) {
                forum.description = description;
            }
        }

        if let Some(bits) = raw.forumbits.or(raw.subforums) {
            forum.sub_forums = lenient::as_list::<Value>(&bits)
                .iter()
                .map(Forum::from_value)
                .collect();
        }

        forum
    }
}

/// Forum to display
#[derive(Debug, Clone, Default)]
pub struct ForumQuery {
    pub forum_id: u64,
}

impl ForumQuery {
    pub fn new(forum_id: u64) -> Self {
        Self { forum_id }
    }
}

impl ForumClient {
    /// List the top-level forums.
    pub async fn get_forums(&self) -> Result<Vec<Forum>> {
        let envelope = self.call(MethodCall::new("api_forumlist")).await?;
        let code = envelope.error_message();
        if !code.is_empty() {
            return Err(ForumError::Domain { code });
        }

        let forums: Vec<Forum> = match envelope.as_value() {
            Value::Object(map) => map
                .values()
                .filter(|v| v.is_object())
                .map(Forum::from_value)
                .collect(),
            Value::Array(items) => items
                .iter()
                .filter(|v| v.is_object())
                .map(Forum::from_value)
                .collect(),
            _ => Vec::new(),
        };
        debug!(count = forums.len(), "Fetched forum list");
        Ok(forums)
    }

    /// Fetch one forum with its first page of threads.
    pub async fn get_forum(&self, query: ForumQuery) -> Result<Forum> {
        require_id("forum_id", query.forum_id)?;

        let envelope = self
            .call(MethodCall::new("forumdisplay").param("forumid", query.forum_id))
            .await?;
        Ok(Forum::from_value(envelope.require_payload("forum")?))
    }
}
