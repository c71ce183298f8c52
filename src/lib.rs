//! Rust client for the vBulletin mobile API
//!
//! The API is a signed, session-based RPC over HTTP POST. A client first
//! negotiates a session with the unsigned `api_init` handshake, then signs
//! every other call with `md5(access_token + client_id + secret + api_key)`.
//! Calls made before the handshake resolves wait for it.
//!
//! # Example
//!
//! ```rust,no_run
//! use vbulletin_client::{ClientConfig, ForumClient, NewPost, ThreadQuery};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ForumClient::new(ClientConfig {
//!     api_url: "https://forum.example.com/forum/api.php".into(),
//!     api_key: "api-key".into(),
//!     platform_name: "my-bot".into(),
//!     platform_version: "1.0".into(),
//!     ..Default::default()
//! })?;
//!
//! // Signed calls wait for the handshake, starting it if needed
//! client.login("alice", "password").await?;
//!
//! let thread = client.get_thread(ThreadQuery::new(41257).page(1, 20)).await?;
//! client.create_post(NewPost::new(thread.id, "Thanks!")).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod forum;
pub mod inbox;
pub mod lenient;
pub mod member;
pub mod message;
pub mod post;
pub mod session;
pub mod signature;
pub mod thread;

// Re-export main types
pub use client::{ForumClient, MethodCall, HANDSHAKE_METHOD};
pub use config::{ClientConfig, ConnectionConfig};
pub use envelope::{codes, parse_error_message, Envelope};
pub use error::{ForumError, Result};
pub use forum::{Forum, ForumQuery};
pub use inbox::{EmptyFolder, Inbox, InboxQuery};
pub use member::Member;
pub use message::{Message, MessageStatus, NewMessage};
pub use post::{DeletePost, EditPost, NewPost, Post, PostReceipt};
pub use session::{SessionState, SessionStatus, UserSession};
pub use signature::sign;
pub use thread::{NewThread, Thread, ThreadQuery, INLINE_THREAD_COOKIE};
