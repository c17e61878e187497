/// Rendered-message ledger: optimistic echo, reconciliation, deduplication
///
/// Single owner of the rendered index. Dispatchers request inserts and
/// lookups through it; nothing else mutates it. At most one rendered entry
/// exists per correlation id and per logical id combined, and a message
/// transitions pending -> confirmed exactly once.
use crate::message::{ConversationKey, DeliveryState, Message};
use crate::ws::protocol::MessagePayload;
use chrono::Utc;
use std::collections::HashMap;
use tracing::debug;

/// Outcome of reconciling an acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A pending entry was confirmed in place
    Confirmed(usize),
    /// The logical id is already materialized; repeat ack, no-op
    AlreadyRendered(usize),
    /// No pending entry for this correlation id (e.g. state lost across a
    /// reconnect); caller falls through to dedup-and-render
    NotPending,
}

/// Outcome of admitting a live broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    Rendered { slot: usize, from_self: bool },
    /// A rendered entry already exists for this logical id
    Duplicate,
    /// Not addressed to the currently visible conversation
    NotVisible,
}

#[derive(Debug, Default)]
pub struct MessageLedger {
    entries: Vec<Message>,
    by_correlation: HashMap<String, usize>,
    by_logical: HashMap<String, usize>,
}

impl MessageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an optimistically rendered message, keyed by its correlation id.
    /// Correlation ids are fresh UUIDs; a collision would violate the
    /// at-most-once render invariant.
    pub fn render_pending(&mut self, message: Message) -> usize {
        let slot = self.entries.len();
        if let Some(correlation_id) = &message.correlation_id {
            debug_assert!(
                !self.by_correlation.contains_key(correlation_id),
                "correlation id collision"
            );
            self.by_correlation.insert(correlation_id.clone(), slot);
        }
        self.entries.push(message);
        slot
    }

    /// Reconcile an acknowledgement against the pending entry it confirms.
    ///
    /// The provisional client timestamp is discarded in favor of the server
    /// `createdAt`. Idempotent: a repeated ack finds the entry by logical id
    /// and does nothing.
    pub fn reconcile(&mut self, payload: &MessagePayload) -> ReconcileOutcome {
        if let Some(temp_id) = &payload.temp_id {
            if let Some(&slot) = self.by_correlation.get(temp_id) {
                let entry = &mut self.entries[slot];
                entry.delivery_state = DeliveryState::Confirmed;
                entry.logical_id = payload.id.clone();
                entry.correlation_id = None;
                if let Some(created_at) = payload.created_at {
                    entry.created_at = created_at;
                }
                self.by_correlation.remove(temp_id);
                if let Some(id) = &payload.id {
                    self.by_logical.insert(id.clone(), slot);
                }
                debug!("reconciled {} into slot {}", temp_id, slot);
                return ReconcileOutcome::Confirmed(slot);
            }
        }
        if let Some(id) = &payload.id {
            if let Some(&slot) = self.by_logical.get(id) {
                return ReconcileOutcome::AlreadyRendered(slot);
            }
        }
        ReconcileOutcome::NotPending
    }

    /// Admit a message from the live broadcast path: dedup by logical id,
    /// then render only when it belongs to the visible conversation.
    pub fn admit(
        &mut self,
        payload: &MessagePayload,
        selection: Option<&ConversationKey>,
        local_user_id: &str,
        state: DeliveryState,
    ) -> AdmitOutcome {
        if let Some(id) = &payload.id {
            if self.by_logical.contains_key(id) {
                return AdmitOutcome::Duplicate;
            }
        }

        let Some(conversation) = visible_conversation(payload, selection, local_user_id) else {
            return AdmitOutcome::NotVisible;
        };

        let from_self = payload.sender_id == local_user_id;
        let message = Message {
            logical_id: payload.id.clone(),
            correlation_id: None,
            conversation,
            sender_id: payload.sender_id.clone(),
            content: payload.content.clone(),
            content_type: payload.content_type,
            // Broadcasts may omit createdAt; fall back to the local clock
            created_at: payload.created_at.unwrap_or_else(Utc::now),
            delivery_state: state,
        };

        let slot = self.entries.len();
        if let Some(id) = &message.logical_id {
            self.by_logical.insert(id.clone(), slot);
        }
        self.entries.push(message);
        AdmitOutcome::Rendered { slot, from_self }
    }

    pub fn get(&self, slot: usize) -> Option<&Message> {
        self.entries.get(slot)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }
}

/// Which conversation a broadcast renders into, if any. Mirrors the pane
/// rules: group broadcasts need the matching group selected; 1:1 broadcasts
/// need the sender to be the selected friend, or to be the local user with
/// no group context (same-user multi-device echo).
fn visible_conversation(
    payload: &MessagePayload,
    selection: Option<&ConversationKey>,
    local_user_id: &str,
) -> Option<ConversationKey> {
    match selection? {
        ConversationKey::Group(group_id) => {
            if payload.group_id.as_deref() == Some(group_id.as_str()) {
                Some(ConversationKey::Group(group_id.clone()))
            } else {
                None
            }
        }
        ConversationKey::Friend(friend_id) => {
            if payload.group_id.is_some() {
                return None;
            }
            if payload.sender_id == *friend_id || payload.sender_id == local_user_id {
                Some(ConversationKey::Friend(friend_id.clone()))
            } else {
                None
            }
        }
    }
}
