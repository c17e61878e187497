/// REST collaborators: history, friend list, media upload
///
/// Plain request/response calls, outside the connection state machine. An
/// unauthorized response here is the out-of-band signal that the session
/// token is dead; callers tear the session down on `ChatError::Auth`.
use crate::error::{ChatError, Result};
use crate::message::ConversationKey;
use crate::ws::protocol::MessagePayload;
use serde::Deserialize;

/// Client-side upload cap, matching the original UI check
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FriendList {
    items: Vec<Friend>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFile {
    pub url: String,
}

pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl RestClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Message history for one conversation
    pub async fn fetch_history(
        &self,
        conversation: &ConversationKey,
    ) -> Result<Vec<MessagePayload>> {
        let url = match conversation {
            ConversationKey::Friend(id) => {
                format!("{}/api/messages?friendId={}", self.base_url, id)
            }
            ConversationKey::Group(id) => {
                format!("{}/api/messages?groupId={}", self.base_url, id)
            }
        };
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(guard(response)?.json().await?)
    }

    pub async fn fetch_friends(&self) -> Result<Vec<Friend>> {
        let url = format!("{}/api/friends", self.base_url);
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let list: FriendList = guard(response)?.json().await?;
        Ok(list.items)
    }

    /// Upload a file; the returned URL becomes the content of a media send
    pub async fn upload_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Result<UploadedFile> {
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(ChatError::UploadTooLarge {
                len: bytes.len(),
                max: MAX_UPLOAD_BYTES,
            });
        }
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .http
            .post(format!("{}/api/files", self.base_url))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;
        Ok(guard(response)?.json().await?)
    }
}

/// Map 401/403 to the fatal auth condition; other failures stay transport
fn guard(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(ChatError::Auth(format!("HTTP {}", status)));
    }
    if !status.is_success() {
        return Err(ChatError::Transport(format!("HTTP {}", status)));
    }
    Ok(response)
}
