/// Inbound dispatch: decoded envelopes routed by kind
use crate::events::RenderEvent;
use crate::ledger::{AdmitOutcome, MessageLedger, ReconcileOutcome};
use crate::message::DeliveryState;
use crate::presence::PresenceCounter;
use crate::session::SessionContext;
use crate::sound;
use crate::typing::TypingIndicator;
use crate::ws::protocol::{MessagePayload, ServerEnvelope};
use std::time::Instant;
use tracing::debug;

/// Routes server envelopes to the reconciler, the deduplicator, the typing
/// indicator, or the presence counter. Runs on the single dispatch loop;
/// the ledger is borrowed mutably for exactly one envelope at a time.
#[derive(Debug, Default)]
pub struct InboundDispatcher {
    typing: TypingIndicator,
    presence: PresenceCounter,
}

impl InboundDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(
        &mut self,
        ledger: &mut MessageLedger,
        session: &SessionContext,
        envelope: ServerEnvelope,
        now: Instant,
    ) -> Option<RenderEvent> {
        match envelope {
            ServerEnvelope::Ack(payload) => {
                Self::render_payload(ledger, session, payload, DeliveryState::Confirmed)
            }
            ServerEnvelope::Message(payload) => {
                Self::render_payload(ledger, session, payload, DeliveryState::Received)
            }
            ServerEnvelope::Typing(event) => {
                // Only the selected friend's signal raises the flag
                if session.selected_friend() != Some(event.sender_id.as_str()) {
                    return None;
                }
                self.typing.signal(now);
                Some(RenderEvent::TypingStarted {
                    user_id: event.sender_id,
                })
            }
            ServerEnvelope::OnlineCount(payload) => {
                self.presence.update(payload.count);
                Some(RenderEvent::OnlineCount {
                    count: payload.count,
                })
            }
            ServerEnvelope::Unknown => {
                debug!("ignoring envelope kind this core does not consume");
                None
            }
        }
    }

    /// Ack and message payloads share one path: reconcile against a pending
    /// entry first, otherwise dedup-and-render.
    fn render_payload(
        ledger: &mut MessageLedger,
        session: &SessionContext,
        payload: MessagePayload,
        state: DeliveryState,
    ) -> Option<RenderEvent> {
        match ledger.reconcile(&payload) {
            ReconcileOutcome::Confirmed(slot) => {
                let message = ledger.get(slot)?.clone();
                return Some(RenderEvent::MessageConfirmed { message });
            }
            ReconcileOutcome::AlreadyRendered(_) => return None,
            ReconcileOutcome::NotPending => {}
        }

        match ledger.admit(&payload, session.selection.as_ref(), &session.user_id, state) {
            AdmitOutcome::Rendered { slot, from_self } => {
                let message = ledger.get(slot)?.clone();
                if state == DeliveryState::Confirmed {
                    // Ack whose pending entry was lost: rendered fresh,
                    // already confirmed, never a cue
                    return Some(RenderEvent::MessageConfirmed { message });
                }
                // Cue policy is evaluated at arrival time, never cached
                let play_cue = !from_self && sound::should_play_cue_now(&session.settings);
                Some(RenderEvent::MessageReceived {
                    message,
                    play_cue,
                    autoscroll: true,
                })
            }
            AdmitOutcome::Duplicate => None,
            AdmitOutcome::NotVisible => None,
        }
    }

    /// Deadline at which the typing flag should clear, if it is up
    pub fn typing_deadline(&self) -> Option<Instant> {
        self.typing.deadline()
    }

    /// Clear an elapsed typing flag; emits the stop event on the edge
    pub fn expire_typing(&mut self, now: Instant) -> Option<RenderEvent> {
        self.typing.expire(now).then_some(RenderEvent::TypingStopped)
    }

    /// Drop transient indicator state (conversation switch or disconnect);
    /// emits the stop event when the flag was up
    pub fn reset_typing(&mut self) -> Option<RenderEvent> {
        self.typing.reset().then_some(RenderEvent::TypingStopped)
    }

    pub fn online_count(&self) -> Option<u32> {
        self.presence.current()
    }
}
