/// Message entity shared by the optimistic-send and inbound paths
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload class of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Image,
    File,
}

impl ContentType {
    /// Derive the content type for a media send from its MIME class
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            ContentType::Image
        } else {
            ContentType::File
        }
    }
}

/// Target of a conversation: a friend (1:1) or a group, never both
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKey {
    Friend(String),
    Group(String),
}

impl ConversationKey {
    pub fn friend_id(&self) -> Option<&str> {
        match self {
            ConversationKey::Friend(id) => Some(id),
            ConversationKey::Group(_) => None,
        }
    }

    pub fn group_id(&self) -> Option<&str> {
        match self {
            ConversationKey::Friend(_) => None,
            ConversationKey::Group(id) => Some(id),
        }
    }
}

/// Where a rendered message stands relative to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    /// Locally rendered, awaiting acknowledgement
    Pending,
    /// Server identifier attached
    Confirmed,
    /// Arrived via live broadcast, never locally originated
    Received,
}

/// A rendered chat message
///
/// `logical_id` is the server-assigned identifier, present once acknowledged.
/// `correlation_id` is the client-generated token created at send time and
/// cleared at reconciliation. A message holds at least one of the two.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub conversation: ConversationKey,
    pub sender_id: String,
    pub content: String,
    pub content_type: ContentType,
    /// Authoritative once server-confirmed, provisional client clock otherwise
    pub created_at: DateTime<Utc>,
    pub delivery_state: DeliveryState,
}

impl Message {
    pub fn is_pending(&self) -> bool {
        self.delivery_state == DeliveryState::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_from_mime() {
        assert_eq!(ContentType::from_mime("image/png"), ContentType::Image);
        assert_eq!(ContentType::from_mime("image/jpeg"), ContentType::Image);
        assert_eq!(ContentType::from_mime("application/pdf"), ContentType::File);
        assert_eq!(ContentType::from_mime("text/plain"), ContentType::File);
    }

    #[test]
    fn test_conversation_key_exclusive() {
        let friend = ConversationKey::Friend("42".to_string());
        assert_eq!(friend.friend_id(), Some("42"));
        assert_eq!(friend.group_id(), None);

        let group = ConversationKey::Group("7".to_string());
        assert_eq!(group.friend_id(), None);
        assert_eq!(group.group_id(), Some("7"));
    }
}
