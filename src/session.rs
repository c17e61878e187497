/// Session context: explicit client state that the original kept in globals
use crate::message::ConversationKey;

/// Audio-cue preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundSettings {
    /// Master switch for audio cues
    pub enabled: bool,
    /// Honor the nightly do-not-disturb window
    pub dnd_enabled: bool,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dnd_enabled: true,
        }
    }
}

/// Per-session state: token, local identity, current conversation, settings
///
/// The token is immutable for the session's lifetime; a token change requires
/// tearing the session down and creating a new one.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub token: String,
    pub user_id: String,
    /// Currently visible conversation, if any (ephemeral UI-level state)
    pub selection: Option<ConversationKey>,
    pub settings: SoundSettings,
}

impl SessionContext {
    pub fn new(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user_id: user_id.into(),
            selection: None,
            settings: SoundSettings::default(),
        }
    }

    pub fn select_friend(&mut self, friend_id: impl Into<String>) {
        self.selection = Some(ConversationKey::Friend(friend_id.into()));
    }

    pub fn select_group(&mut self, group_id: impl Into<String>) {
        self.selection = Some(ConversationKey::Group(group_id.into()));
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// The friend currently on screen, when a 1:1 conversation is selected
    pub fn selected_friend(&self) -> Option<&str> {
        self.selection.as_ref().and_then(|c| c.friend_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_is_exclusive() {
        let mut session = SessionContext::new("tok", "1");
        assert!(session.selection.is_none());

        session.select_friend("42");
        assert_eq!(session.selected_friend(), Some("42"));

        session.select_group("7");
        assert_eq!(session.selected_friend(), None);
        assert_eq!(
            session.selection,
            Some(ConversationKey::Group("7".to_string()))
        );

        session.clear_selection();
        assert!(session.selection.is_none());
    }
}
