//! Posts: the `post` records inside thread listings, and reply/edit/delete actions

use crate::client::{ForumClient, MethodCall};
use crate::envelope::codes;
use crate::error::{ForumError, Result};
use crate::lenient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// A single post
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Post {
    pub id: u64,
    pub thread_id: u64,
    pub post_time: Option<DateTime<Utc>>,
    pub title: String,
    /// Rendered HTML
    pub message: String,
    pub message_plain: String,
    pub message_bbcode: String,
    pub signature: String,
    pub user_id: u64,
    pub username: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawPostBit {
    #[serde(default)]
    post: Option<RawPost>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPost {
    #[serde(default, deserialize_with = "lenient::int")]
    postid: u64,
    #[serde(default, deserialize_with = "lenient::int")]
    threadid: u64,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    posttime: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::text")]
    title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    message: String,
    #[serde(default, deserialize_with = "lenient::text")]
    message_plain: String,
    #[serde(default, deserialize_with = "lenient::text")]
    message_bbcode: String,
    #[serde(default, deserialize_with = "lenient::text")]
    signature: String,
    #[serde(default, deserialize_with = "lenient::int")]
    userid: u64,
    #[serde(default, deserialize_with = "lenient::text")]
    username: String,
}

impl Post {
    /// Parse a postbit (`{ "post": { ... } }`).
    pub fn from_value(value: &Value) -> Self {
        let bit: RawPostBit = serde_json::from_value(value.clone()).unwrap_or_default();
        bit.post.map(Post::from).unwrap_or_default()
    }

    /// Parse a `postbits` list, which may be a single postbit
    pub fn list_from_value(value: &Value) -> Vec<Self> {
        lenient::as_list::<RawPostBit>(value)
            .into_iter()
            .filter_map(|bit| bit.post)
            .map(Post::from)
            .collect()
    }
}

impl From<RawPost> for Post {
    fn from(raw: RawPost) -> Self {
        Self {
            id: raw.postid,
            thread_id: raw.threadid,
            post_time: raw.posttime,
            title: raw.title,
            message: raw.message,
            message_plain: raw.message_plain,
            message_bbcode: raw.message_bbcode,
            signature: raw.signature,
            user_id: raw.userid,
            username: raw.username,
        }
    }
}

/// Ids reported back after creating a thread or reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PostReceipt {
    pub thread_id: u64,
    pub post_id: u64,
}

impl PostReceipt {
    /// Read `show.threadid` / `show.postid`
    pub(crate) fn from_show(show: &Value) -> Self {
        Self {
            thread_id: show.get("threadid").and_then(lenient::as_u64).unwrap_or_default(),
            post_id: show.get("postid").and_then(lenient::as_u64).unwrap_or_default(),
        }
    }
}

/// Reply to a thread
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub thread_id: u64,
    pub message: String,
    /// Append the user's signature (default: false)
    pub signature: bool,
}

impl NewPost {
    pub fn new(thread_id: u64, message: impl Into<String>) -> Self {
        Self {
            thread_id,
            message: message.into(),
            signature: false,
        }
    }
}

/// Replace the text of an existing post
#[derive(Debug, Clone, Default)]
pub struct EditPost {
    pub post_id: u64,
    pub message: String,
    /// Edit reason shown to readers
    pub reason: Option<String>,
    pub signature: bool,
}

impl EditPost {
    pub fn new(post_id: u64, message: impl Into<String>) -> Self {
        Self {
            post_id,
            message: message.into(),
            ..Default::default()
        }
    }
}

/// Delete a post
#[derive(Debug, Clone, Default)]
pub struct DeletePost {
    pub post_id: u64,
    pub thread_id: u64,
    pub reason: Option<String>,
}

/// The API only understands `1` and `0`
pub(crate) fn signature_flag(signature: bool) -> &'static str {
    if signature {
        "1"
    } else {
        "0"
    }
}

pub(crate) fn require_id(name: &str, id: u64) -> Result<()> {
    if id == 0 {
        return Err(ForumError::InvalidParams(format!("{name} is required")));
    }
    Ok(())
}

pub(crate) fn require_text(name: &str, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(ForumError::InvalidParams(format!("{name} is required")));
    }
    Ok(())
}

impl ForumClient {
    /// Reply to a thread.
    ///
    /// Fails with `Domain { code: "threadclosed" }` on a closed thread.
    pub async fn create_post(&self, post: NewPost) -> Result<PostReceipt> {
        require_id("thread_id", post.thread_id)?;
        require_text("message", &post.message)?;

        let envelope = self
            .call(
                MethodCall::new("newreply_postreply")
                    .param("threadid", post.thread_id)
                    .param("message", &post.message)
                    .param("signature", signature_flag(post.signature)),
            )
            .await?;
        envelope.expect_code(codes::POST_CREATED)?;

        let receipt = envelope
            .show()
            .map(PostReceipt::from_show)
            .ok_or_else(|| ForumError::NotFound("post receipt".to_string()))?;
        info!(thread_id = receipt.thread_id, post_id = receipt.post_id, "Reply posted");
        Ok(receipt)
    }

    /// Edit a post. Returns the post id.
    pub async fn edit_post(&self, edit: EditPost) -> Result<u64> {
        require_id("post_id", edit.post_id)?;
        require_text("message", &edit.message)?;

        let envelope = self
            .call(
                MethodCall::new("editpost_updatepost")
                    .param("postid", edit.post_id)
                    .param("message", &edit.message)
                    .param("signature", signature_flag(edit.signature))
                    .param_opt("reason", edit.reason.as_deref()),
            )
            .await?;
        envelope.expect_code(codes::POST_EDITED)?;
        Ok(edit.post_id)
    }

    /// Delete a post.
    pub async fn delete_post(&self, delete: DeletePost) -> Result<()> {
        require_id("post_id", delete.post_id)?;

        let envelope = self
            .call(
                MethodCall::new("editpost_deletepost")
                    .param("postid", delete.post_id)
                    .param_opt("threadid", Some(delete.thread_id).filter(|id| *id != 0))
                    .param_opt("reason", delete.reason.as_deref()),
            )
            .await?;
        envelope.expect_code(codes::POST_DELETED)?;
        info!(post_id = delete.post_id, "Post deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_from_postbit() {
        let post = Post::from_value(&json!({
            "post": {
                "postid": "901",
                "threadid": "41257",
                "posttime": "1500000000",
                "title": "Re: hello",
                "message": "<b>hi</b>",
                "message_plain": "hi",
                "message_bbcode": "[b]hi[/b]",
                "signature": "-- a",
                "userid": "3",
                "username": "alice"
            }
        }));

        assert_eq!(post.id, 901);
        assert_eq!(post.thread_id, 41257);
        assert_eq!(post.post_time.map(|t| t.timestamp()), Some(1_500_000_000));
        assert_eq!(post.message_bbcode, "[b]hi[/b]");
        assert_eq!(post.user_id, 3);
        assert_eq!(post.username, "alice");
    }

    #[test]
    fn test_postbits_single_or_list() {
        let single = Post::list_from_value(&json!({ "post": { "postid": "1" } }));
        assert_eq!(single.len(), 1);

        let list = Post::list_from_value(&json!([
            { "post": { "postid": "1" } },
            { "post": { "postid": "2" } },
            { "notapost": true }
        ]));
        assert_eq!(list.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_receipt_from_show() {
        let receipt = PostReceipt::from_show(&json!({ "threadid": "10", "postid": 20 }));
        assert_eq!(receipt, PostReceipt { thread_id: 10, post_id: 20 });
    }

    #[test]
    fn test_param_checks() {
        assert_eq!(signature_flag(true), "1");
        assert_eq!(signature_flag(false), "0");
        assert!(require_id("thread_id", 0).is_err());
        assert!(require_text("message", "  ").is_err());
        assert!(require_text("message", "ok").is_ok());
    }
}
