/// Configuration management
use crate::error::{ChatError, Result};
use crate::message::ConversationKey;

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// WebSocket endpoint, e.g. ws://127.0.0.1:8080/ws
    pub server_url: String,

    /// REST base URL (derived from the server URL unless given)
    pub api_url: String,

    /// Local user identifier
    pub user_id: String,

    /// Opaque session token supplied by the auth flow
    pub token: String,

    /// Conversation to open on start
    pub target: Option<ConversationKey>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8080/ws".to_string(),
            api_url: "http://127.0.0.1:8080".to_string(),
            user_id: String::new(),
            token: String::new(),
            target: None,
        }
    }
}

impl Config {
    /// Create config from command line arguments
    pub fn from_args(args: &[String]) -> Result<Self> {
        if args.len() < 2 {
            return Err(ChatError::Config(format!(
                "Usage: {} <server_url> --token <token> --user <id> [--to <friendId> | --group <groupId>] [--api <url>]",
                args.first().map(String::as_str).unwrap_or("chatlink")
            )));
        }

        let server_url = args[1].clone();
        if !server_url.starts_with("ws://") && !server_url.starts_with("wss://") {
            return Err(ChatError::Config(
                "server URL must start with ws:// or wss://".to_string(),
            ));
        }

        let mut token: Option<String> = None;
        let mut user_id: Option<String> = None;
        let mut api_url: Option<String> = None;
        let mut target: Option<ConversationKey> = None;

        let mut i = 2;
        while i < args.len() {
            match args[i].as_str() {
                "--token" => {
                    token = Some(flag_value(args, i, "--token")?);
                    i += 2;
                }
                "--user" => {
                    user_id = Some(flag_value(args, i, "--user")?);
                    i += 2;
                }
                "--api" => {
                    api_url = Some(flag_value(args, i, "--api")?);
                    i += 2;
                }
                "--to" => {
                    target = Some(ConversationKey::Friend(flag_value(args, i, "--to")?));
                    i += 2;
                }
                "--group" => {
                    target = Some(ConversationKey::Group(flag_value(args, i, "--group")?));
                    i += 2;
                }
                other => {
                    return Err(ChatError::Config(format!("Unknown argument: {}", other)));
                }
            }
        }

        // Env overrides (nice for scripts)
        if let Ok(t) = std::env::var("CHATLINK_TOKEN") {
            token = Some(t);
        }
        if let Ok(u) = std::env::var("CHATLINK_USER") {
            user_id = Some(u);
        }

        let token =
            token.ok_or_else(|| ChatError::Config("--token (or CHATLINK_TOKEN) is required".to_string()))?;
        let user_id =
            user_id.ok_or_else(|| ChatError::Config("--user (or CHATLINK_USER) is required".to_string()))?;

        let api_url = api_url.unwrap_or_else(|| derive_api_url(&server_url));

        Ok(Self {
            server_url,
            api_url,
            user_id,
            token,
            target,
        })
    }
}

fn flag_value(args: &[String], i: usize, flag: &str) -> Result<String> {
    args.get(i + 1)
        .cloned()
        .ok_or_else(|| ChatError::Config(format!("{} requires a value", flag)))
}

/// ws://host/ws -> http://host, wss://host/ws -> https://host
fn derive_api_url(server_url: &str) -> String {
    let http = if let Some(rest) = server_url.strip_prefix("wss://") {
        format!("https://{}", rest)
    } else if let Some(rest) = server_url.strip_prefix("ws://") {
        format!("http://{}", rest)
    } else {
        server_url.to_string()
    };
    http.trim_end_matches("/ws").to_string()
}
