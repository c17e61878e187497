/// Outbound dispatch: user intents become wire envelopes
use crate::error::{ChatError, Result};
use crate::message::{ContentType, ConversationKey, DeliveryState, Message};
use crate::session::SessionContext;
use crate::typing::TypingThrottle;
use crate::ws::protocol::{ClientEnvelope, SendPayload, TypingPayload};
use chrono::{DateTime, Utc};
use std::time::Instant;
use uuid::Uuid;

/// Maximum message length, matching the server-side limit
pub const MAX_CONTENT_CHARS: usize = 1000;

/// Builds optimistic messages and protocol envelopes from user intents.
/// Validation happens here, before anything is rendered or transmitted.
#[derive(Debug, Default)]
pub struct OutboundDispatcher {
    typing_throttle: TypingThrottle,
}

impl OutboundDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compose a text send: validate, mint a correlation id, and return the
    /// optimistic message (delivery state pending, provisional timestamp)
    /// together with the envelope to transmit.
    pub fn compose_text(
        &self,
        session: &SessionContext,
        conversation: &ConversationKey,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<(Message, ClientEnvelope)> {
        self.compose(session, conversation, content, ContentType::Text, now)
    }

    /// Compose a media send: the content is a URL from a prior upload and the
    /// content type is derived from the MIME class.
    pub fn compose_media(
        &self,
        session: &SessionContext,
        conversation: &ConversationKey,
        url: &str,
        mime: &str,
        now: DateTime<Utc>,
    ) -> Result<(Message, ClientEnvelope)> {
        self.compose(session, conversation, url, ContentType::from_mime(mime), now)
    }

    fn compose(
        &self,
        session: &SessionContext,
        conversation: &ConversationKey,
        content: &str,
        content_type: ContentType,
        now: DateTime<Utc>,
    ) -> Result<(Message, ClientEnvelope)> {
        if content.trim().is_empty() {
            return Err(ChatError::EmptyContent);
        }
        let len = content.chars().count();
        if len > MAX_CONTENT_CHARS {
            return Err(ChatError::ContentTooLong {
                len,
                max: MAX_CONTENT_CHARS,
            });
        }

        let correlation_id = Uuid::new_v4().to_string();
        let message = Message {
            logical_id: None,
            correlation_id: Some(correlation_id.clone()),
            conversation: conversation.clone(),
            sender_id: session.user_id.clone(),
            content: content.to_string(),
            content_type,
            created_at: now,
            delivery_state: DeliveryState::Pending,
        };
        let envelope = ClientEnvelope::Send(SendPayload {
            content: content.to_string(),
            content_type,
            temp_id: correlation_id,
            receiver_id: conversation.friend_id().map(str::to_string),
            group_id: conversation.group_id().map(str::to_string),
        });
        Ok((message, envelope))
    }

    /// Typing notification for the selected 1:1 conversation, rate-limited.
    /// Returns None when throttled or when a group is selected; nothing is
    /// ever rendered locally for typing.
    pub fn compose_typing(
        &mut self,
        conversation: &ConversationKey,
        now: Instant,
    ) -> Option<ClientEnvelope> {
        let friend_id = conversation.friend_id()?;
        if !self.typing_throttle.try_fire(now) {
            return None;
        }
        Some(ClientEnvelope::Typing(TypingPayload {
            to_user_id: friend_id.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn session() -> SessionContext {
        SessionContext::new("tok", "1")
    }

    fn friend() -> ConversationKey {
        ConversationKey::Friend("42".to_string())
    }

    #[test]
    fn test_compose_text_builds_pending_message() {
        let dispatcher = OutboundDispatcher::new();
        let now = Utc::now();
        let (message, envelope) = dispatcher
            .compose_text(&session(), &friend(), "hello", now)
            .unwrap();

        assert!(message.is_pending());
        assert!(message.logical_id.is_none());
        assert_eq!(message.sender_id, "1");
        assert_eq!(message.created_at, now);

        match envelope {
            ClientEnvelope::Send(payload) => {
                assert_eq!(payload.temp_id, message.correlation_id.unwrap());
                assert_eq!(payload.receiver_id.as_deref(), Some("42"));
                assert!(payload.group_id.is_none());
            }
            other => panic!("expected send envelope, got {:?}", other),
        }
    }

    #[test]
    fn test_compose_group_target() {
        let dispatcher = OutboundDispatcher::new();
        let group = ConversationKey::Group("7".to_string());
        let (_, envelope) = dispatcher
            .compose_text(&session(), &group, "hello", Utc::now())
            .unwrap();
        match envelope {
            ClientEnvelope::Send(payload) => {
                assert_eq!(payload.group_id.as_deref(), Some("7"));
                assert!(payload.receiver_id.is_none());
            }
            other => panic!("expected send envelope, got {:?}", other),
        }
    }

    #[test]
    fn test_correlation_ids_are_unique() {
        let dispatcher = OutboundDispatcher::new();
        let (a, _) = dispatcher
            .compose_text(&session(), &friend(), "one", Utc::now())
            .unwrap();
        let (b, _) = dispatcher
            .compose_text(&session(), &friend(), "two", Utc::now())
            .unwrap();
        assert_ne!(a.correlation_id, b.correlation_id);
    }

    #[test]
    fn test_oversized_content_rejected() {
        let dispatcher = OutboundDispatcher::new();
        let content = "x".repeat(1001);
        let result = dispatcher.compose_text(&session(), &friend(), &content, Utc::now());
        assert!(matches!(
            result,
            Err(ChatError::ContentTooLong { len: 1001, max: 1000 })
        ));

        // Exactly at the limit is fine
        let content = "x".repeat(1000);
        assert!(dispatcher
            .compose_text(&session(), &friend(), &content, Utc::now())
            .is_ok());
    }

    #[test]
    fn test_empty_content_rejected() {
        let dispatcher = OutboundDispatcher::new();
        assert!(matches!(
            dispatcher.compose_text(&session(), &friend(), "   ", Utc::now()),
            Err(ChatError::EmptyContent)
        ));
    }

    #[test]
    fn test_media_content_type_from_mime() {
        let dispatcher = OutboundDispatcher::new();
        let (message, _) = dispatcher
            .compose_media(&session(), &friend(), "https://cdn/x.png", "image/png", Utc::now())
            .unwrap();
        assert_eq!(message.content_type, ContentType::Image);

        let (message, _) = dispatcher
            .compose_media(&session(), &friend(), "https://cdn/x.pdf", "application/pdf", Utc::now())
            .unwrap();
        assert_eq!(message.content_type, ContentType::File);
    }

    #[test]
    fn test_typing_throttled_to_one_per_window() {
        let mut dispatcher = OutboundDispatcher::new();
        let start = Instant::now();

        assert!(dispatcher.compose_typing(&friend(), start).is_some());
        assert!(dispatcher
            .compose_typing(&friend(), start + Duration::from_millis(500))
            .is_none());
        assert!(dispatcher
            .compose_typing(&friend(), start + Duration::from_millis(2000))
            .is_some());
    }

    #[test]
    fn test_no_typing_for_groups() {
        let mut dispatcher = OutboundDispatcher::new();
        let group = ConversationKey::Group("7".to_string());
        assert!(dispatcher.compose_typing(&group, Instant::now()).is_none());
    }
}
