//! vbforum - command line client for a vBulletin mobile API endpoint
//!
//! Settings come from flags, environment variables, or a `.env` file.
//! Results are printed as JSON.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vbulletin_client::{
    ClientConfig, ForumClient, ForumQuery, InboxQuery, NewMessage, NewPost, ThreadQuery,
};

#[derive(Debug, Parser)]
#[command(name = "vbforum", version, about = "vBulletin mobile API client")]
struct Args {
    /// Full URL of api.php
    #[arg(long, env = "VB_API_URL")]
    api_url: String,

    /// API key from the forum's mobile API settings
    #[arg(long, env = "VB_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Platform name reported in the handshake
    #[arg(long, env = "VB_PLATFORM_NAME", default_value = "vbforum")]
    platform_name: String,

    /// Platform version reported in the handshake
    #[arg(long, env = "VB_PLATFORM_VERSION", default_value = env!("CARGO_PKG_VERSION"))]
    platform_version: String,

    /// Log in as this user before running the command
    #[arg(long, env = "VB_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "VB_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Seconds to wait for the api_init handshake
    #[arg(long, env = "VB_INIT_TIMEOUT", default_value = "5")]
    init_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List top-level forums
    Forums,

    /// Show a forum and its threads
    Forum {
        forum_id: u64,
    },

    /// Show a page of a thread
    Thread {
        thread_id: u64,
        #[arg(short, long)]
        page: Option<u32>,
        #[arg(long, default_value = "20")]
        per_page: u32,
    },

    /// Reply to a thread
    Reply {
        thread_id: u64,
        message: String,
        /// Append your signature
        #[arg(long)]
        signature: bool,
    },

    /// Show a member's profile
    Member {
        username: String,
    },

    /// List private messages in a folder
    Inbox {
        #[arg(short, long, default_value = "0")]
        folder: u64,
    },

    /// Show a private message
    Message {
        pm_id: u64,
    },

    /// Send a private message
    Send {
        recipient: String,
        title: String,
        message: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("vbulletin_client={},vbforum={}", log_level, log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let client = ForumClient::new(ClientConfig {
        api_url: args.api_url.clone(),
        api_key: args.api_key.clone(),
        platform_name: args.platform_name.clone(),
        platform_version: args.platform_version.clone(),
        init_timeout_secs: args.init_timeout,
        ..Default::default()
    })?;

    let session = client.connect().await.context("api_init handshake failed")?;
    info!(api_version = %session.api_version, "Connected to {}", client.connection().api_url());

    let logged_in = match (&args.username, &args.password) {
        (Some(username), Some(password)) => {
            client
                .login(username, password)
                .await
                .with_context(|| format!("login as {username} failed"))?;
            true
        }
        _ => false,
    };

    let result = run(&client, args.command).await;

    if logged_in {
        if let Err(e) = client.logout().await {
            error!("Logout failed: {}", e);
        }
    }

    result
}

async fn run(client: &ForumClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Forums => print_json(&client.get_forums().await?),
        Command::Forum { forum_id } => {
            print_json(&client.get_forum(ForumQuery::new(forum_id)).await?)
        }
        Command::Thread {
            thread_id,
            page,
            per_page,
        } => {
            let query = ThreadQuery::new(thread_id).page(page.unwrap_or(1), per_page);
            print_json(&client.get_thread(query).await?)
        }
        Command::Reply {
            thread_id,
            message,
            signature,
        } => {
            let post = NewPost {
                signature,
                ..NewPost::new(thread_id, message)
            };
            print_json(&client.create_post(post).await?)
        }
        Command::Member { username } => print_json(&client.get_member(&username).await?),
        Command::Inbox { folder } => {
            let query = InboxQuery {
                folder_id: folder,
                ..Default::default()
            };
            print_json(&client.get_inbox(query).await?)
        }
        Command::Message { pm_id } => print_json(&client.get_message(pm_id).await?),
        Command::Send {
            recipient,
            title,
            message,
        } => {
            client
                .send_message(NewMessage::new(recipient, title, message))
                .await?;
            info!("Message sent");
            Ok(())
        }
    }
}
