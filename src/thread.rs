//! Threads: reading, posting new threads, and inline moderation

use crate::client::{ForumClient, MethodCall};
use crate::envelope::{codes, Envelope};
use crate::error::{ForumError, Result};
use crate::lenient;
use crate::post::{require_id, require_text, signature_flag, Post, PostReceipt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// Cookie that carries the thread ids selected for inline moderation
pub const INLINE_THREAD_COOKIE: &str = "vbulletin_inlinethread";

/// A thread and the posts on the requested page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Thread {
    pub id: u64,
    pub title: String,
    pub forum_id: u64,
    pub forum_title: String,
    pub posts: Vec<Post>,
}

#[derive(Debug, Default, Deserialize)]
struct RawThread {
    #[serde(default)]
    thread: Option<RawThreadInfo>,
    #[serde(default)]
    postbits: Value,
}

#[derive(Debug, Default, Deserialize)]
struct RawThreadInfo {
    #[serde(default, deserialize_with = "lenient::int")]
    threadid: u64,
    #[serde(default, deserialize_with = "lenient::text")]
    title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    threadtitle: String,
    #[serde(default, deserialize_with = "lenient::int")]
    forumid: u64,
    #[serde(default, deserialize_with = "lenient::text")]
    forumtitle: String,
}

impl Thread {
    /// Parse `{ "thread": { ... }, "postbits": ... }`, as returned by
    /// `showthread` and found in a forum's `threadbits`.
    pub fn from_value(value: &Value) -> Self {
        let raw: RawThread = serde_json::from_value(value.clone()).unwrap_or_default();
        let info = raw.thread.unwrap_or_default();

        Self {
            id: info.threadid,
            title: if info.title.is_empty() {
                info.threadtitle
            } else {
                info.title
            },
            forum_id: info.forumid,
            forum_title: info.forumtitle,
            posts: Post::list_from_value(&raw.postbits),
        }
    }
}

/// Page of a thread to fetch
#[derive(Debug, Clone, Default)]
pub struct ThreadQuery {
    pub thread_id: u64,
    /// 1-based; server default when `None`
    pub page_number: Option<u32>,
    pub per_page: Option<u32>,
}

impl ThreadQuery {
    pub fn new(thread_id: u64) -> Self {
        Self {
            thread_id,
            ..Default::default()
        }
    }

    pub fn page(mut self, page_number: u32, per_page: u32) -> Self {
        self.page_number = Some(page_number);
        self.per_page = Some(per_page);
        self
    }
}

/// New thread; its body becomes the first post
#[derive(Debug, Clone, Default)]
pub struct NewThread {
    pub forum_id: u64,
    pub subject: String,
    pub message: String,
    pub signature: bool,
}

impl NewThread {
    pub fn new(forum_id: u64, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            forum_id,
            subject: subject.into(),
            message: message.into(),
            signature: false,
        }
    }
}

/// `123-345-456`
fn inline_thread_ids(ids: &[u64]) -> Result<String> {
    if ids.is_empty() {
        return Err(ForumError::InvalidParams(
            "at least one thread id is required".to_string(),
        ));
    }
    Ok(ids
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join("-"))
}

impl ForumClient {
    /// Fetch a thread with one page of posts.
    pub async fn get_thread(&self, query: ThreadQuery) -> Result<Thread> {
        require_id("thread_id", query.thread_id)?;

        let envelope = self
            .call(
                MethodCall::new("showthread")
                    .param("threadid", query.thread_id)
                    .param_opt("pagenumber", query.page_number)
                    .param_opt("perpage", query.per_page),
            )
            .await?;
        let thread = Thread::from_value(envelope.require_payload("thread")?);
        debug!(thread_id = thread.id, posts = thread.posts.len(), "Fetched thread");
        Ok(thread)
    }

    /// Start a new thread in a forum.
    pub async fn create_thread(&self, thread: NewThread) -> Result<PostReceipt> {
        require_id("forum_id", thread.forum_id)?;
        require_text("subject", &thread.subject)?;
        require_text("message", &thread.message)?;

        let envelope = self
            .call(
                MethodCall::new("newthread_postthread")
                    .param("forumid", thread.forum_id)
                    .param("subject", &thread.subject)
                    .param("message", &thread.message)
                    .param("signature", signature_flag(thread.signature)),
            )
            .await?;
        envelope.expect_code(codes::POST_CREATED)?;

        let receipt = envelope
            .show()
            .map(PostReceipt::from_show)
            .ok_or_else(|| ForumError::NotFound("thread receipt".to_string()))?;
        info!(
            forum_id = thread.forum_id,
            thread_id = receipt.thread_id,
            "Thread created"
        );
        Ok(receipt)
    }

    /// Close threads. Requires inline moderation permission.
    ///
    /// The server's success code for moderation is not documented, so the
    /// raw response is returned for the caller to inspect.
    pub async fn close_threads(&self, thread_ids: &[u64]) -> Result<Envelope> {
        self.inline_mod("inlinemod_close", thread_ids).await
    }

    /// Reopen closed threads.
    pub async fn open_threads(&self, thread_ids: &[u64]) -> Result<Envelope> {
        self.inline_mod("inlinemod_open", thread_ids).await
    }

    /// Delete threads.
    pub async fn delete_threads(&self, thread_ids: &[u64]) -> Result<Envelope> {
        self.inline_mod("inlinemod_dodeletethreads", thread_ids).await
    }

    async fn inline_mod(&self, method: &str, thread_ids: &[u64]) -> Result<Envelope> {
        let ids = inline_thread_ids(thread_ids)?;
        info!(method, threads = %ids, "Inline moderation");
        self.call(MethodCall::new(method).cookie(INLINE_THREAD_COOKIE, ids))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_thread_from_value() {
        let thread = Thread::from_value(&json!({
            "thread": {
                "threadid": "41257",
                "title": "Welcome",
                "forumid": "7",
                "forumtitle": "General"
            },
            "postbits": [
                { "post": { "postid": "1", "username": "alice" } },
                { "post": { "postid": "2", "username": "bob" } }
            ]
        }));

        assert_eq!(thread.id, 41257);
        assert_eq!(thread.title, "Welcome");
        assert_eq!(thread.forum_id, 7);
        assert_eq!(thread.forum_title, "General");
        assert_eq!(thread.posts.len(), 2);
        assert_eq!(thread.posts[1].username, "bob");
    }

    #[test]
    fn test_title_falls_back_to_threadtitle() {
        let thread = Thread::from_value(&json!({
            "thread": { "threadid": 3, "threadtitle": "From a listing" }
        }));
        assert_eq!(thread.title, "From a listing");
        assert!(thread.posts.is_empty());
    }

    #[test]
    fn test_thread_from_garbage() {
        assert_eq!(Thread::from_value(&json!("nope")), Thread::default());
    }

    #[test]
    fn test_inline_thread_ids() {
        assert_eq!(inline_thread_ids(&[123, 345, 456]).unwrap(), "123-345-456");
        assert_eq!(inline_thread_ids(&[9]).unwrap(), "9");
        assert!(matches!(
            inline_thread_ids(&[]),
            Err(ForumError::InvalidParams(_))
        ));
    }
}
