use crate::core::message::Message;

/// Ordered chat log for the active persona.
///
/// Only user and assistant messages are ever stored; the system prompt is
/// attached per request by the session manager.
#[derive(Debug, Default, Clone)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
    }

    pub fn append_assistant(&mut self, text: impl Into<String>) {
        self.messages.push(Message::assistant(text));
    }

    /// Copy of the log as it stands now. Later appends do not show up in it.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Drop a trailing user message that never got a reply.
    pub fn discard_unanswered(&mut self) -> bool {
        if self.messages.last().is_some_and(|m| m.role().is_user()) {
            self.messages.pop();
            return true;
        }
        false
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Role;

    #[test]
    fn discard_unanswered_only_removes_a_trailing_user_message() {
        let mut state = ConversationState::new();
        state.append_user("q1");
        state.append_assistant("a1");
        assert!(!state.discard_unanswered());
        assert_eq!(state.len(), 2);

        state.append_user("q2");
        assert!(state.discard_unanswered());
        assert_eq!(state.len(), 2);
        assert_eq!(state.messages()[1].content(), "a1");
    }

    #[test]
    fn appends_keep_call_order_without_dedup() {
        let mut state = ConversationState::new();
        state.append_user("hi");
        state.append_assistant("hello");
        state.append_user("hi");

        let roles: Vec<Role> = state.messages().iter().map(Message::role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(state.messages()[2].content(), "hi");
        assert_eq!(state.len(), 3);
    }

    #[test]
    fn snapshot_is_detached_from_later_appends() {
        let mut state = ConversationState::new();
        state.append_user("first");
        let snapshot = state.snapshot();
        state.append_assistant("second");

        assert_eq!(snapshot.len(), 1);
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn clear_empties_the_log() {
        let mut state = ConversationState::new();
        state.append_user("a");
        state.append_assistant("b");
        state.clear();
        assert!(state.is_empty());
        assert!(state.snapshot().is_empty());
    }
}
