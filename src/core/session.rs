//! Turn orchestration for a single chat session.
//!
//! [`SessionManager`] owns the active persona and the conversation log. A
//! turn moves `Idle -> AwaitingReply -> Idle`: [`SessionManager::submit`]
//! records the user message and starts the backend stream, and
//! [`SessionManager::await_reply`] relays the stream to a consumer and records
//! the assistant reply. Only one turn may be in flight at a time.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::core::backend::{BackendError, ChatBackend, ChatOutcome, ReplyStream, StreamMessage};
use crate::core::conversation::ConversationState;
use crate::core::persona::PersonaRegistry;

/// Input that clears the conversation instead of being sent.
pub const CLEAR_COMMAND: &str = "/clear";

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingReply,
}

/// What the consumer of a turn sees, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyEvent {
    Fragment(String),
    /// Always the last event of a turn, delivered exactly once.
    Done(ChatOutcome),
}

impl ReplyEvent {
    /// Text to display for this event. A failed turn shows its error
    /// message; a successful end carries no text.
    pub fn text(&self) -> String {
        match self {
            ReplyEvent::Fragment(text) => text.clone(),
            ReplyEvent::Done(Ok(_)) => String::new(),
            ReplyEvent::Done(Err(err)) => err.user_message(),
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, ReplyEvent::Done(_))
    }
}

/// A started turn. Hand it back to [`SessionManager::await_reply`]; the
/// session stays busy until then. Dropping it (or the `await_reply` future)
/// abandons the turn and frees the session.
pub struct PendingReply {
    session: u64,
    turn: u64,
    stream: ReplyStream,
    ticket: Arc<()>,
}

impl PendingReply {
    pub fn turn(&self) -> u64 {
        self.turn
    }
}

pub enum SubmitOutcome {
    /// Blank input; nothing happened.
    Ignored,
    /// The clear command was handled locally.
    Cleared,
    Started(PendingReply),
}

impl fmt::Debug for SubmitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitOutcome::Ignored => f.write_str("Ignored"),
            SubmitOutcome::Cleared => f.write_str("Cleared"),
            SubmitOutcome::Started(pending) => write!(f, "Started(turn {})", pending.turn),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The persona id is not in the registry.
    InvalidPersona(String),
    /// A reply is still streaming.
    Busy,
    /// The pending reply does not belong to this session's current turn.
    StaleReply,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidPersona(id) => write!(f, "Unknown persona '{id}'"),
            SessionError::Busy => write!(f, "A reply is still in progress"),
            SessionError::StaleReply => write!(f, "Reply does not belong to the current turn"),
        }
    }
}

impl std::error::Error for SessionError {}

pub struct SessionManager<B> {
    id: u64,
    backend: B,
    registry: Arc<PersonaRegistry>,
    active_persona: String,
    conversation: ConversationState,
    state: TurnState,
    turn: u64,
    /// Live while the current turn's [`PendingReply`] exists.
    in_flight: Weak<()>,
}

impl<B: ChatBackend> SessionManager<B> {
    /// Start a session on the registry's default persona.
    pub fn new(backend: B, registry: Arc<PersonaRegistry>) -> Self {
        let active_persona = registry.default_id().to_string();
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            backend,
            registry,
            active_persona,
            conversation: ConversationState::new(),
            state: TurnState::Idle,
            turn: 0,
            in_flight: Weak::new(),
        }
    }

    pub fn with_persona(
        backend: B,
        registry: Arc<PersonaRegistry>,
        persona_id: &str,
    ) -> Result<Self, SessionError> {
        let mut session = Self::new(backend, registry);
        session.switch_persona(persona_id)?;
        Ok(session)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn registry(&self) -> &PersonaRegistry {
        &self.registry
    }

    pub fn active_persona(&self) -> &str {
        &self.active_persona
    }

    pub fn active_display_name(&self, locale: &str) -> String {
        self.registry.display_name(&self.active_persona, locale)
    }

    /// An abandoned turn already reads as `Idle`; its unanswered user
    /// message is dropped by the next call that changes the session.
    pub fn state(&self) -> TurnState {
        if self.turn_abandoned() {
            TurnState::Idle
        } else {
            self.state
        }
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    /// Probe the backend. Not cached; call again whenever the status matters.
    pub async fn check_availability(&self) -> bool {
        self.backend.check_availability().await
    }

    /// Record `text` and start streaming the reply.
    pub fn submit(&mut self, text: &str) -> Result<SubmitOutcome, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(SubmitOutcome::Ignored);
        }
        self.recover_abandoned_turn();
        if self.state == TurnState::AwaitingReply {
            return Err(SessionError::Busy);
        }
        if text == CLEAR_COMMAND {
            self.conversation.clear();
            debug!(persona = %self.active_persona, "Conversation cleared by command");
            return Ok(SubmitOutcome::Cleared);
        }

        self.conversation.append_user(text);
        self.state = TurnState::AwaitingReply;
        self.turn += 1;

        let system_prompt = self.registry.system_prompt(&self.active_persona);
        debug!(
            persona = %self.active_persona,
            turn = self.turn,
            messages = self.conversation.len(),
            "Submitting turn"
        );
        let stream = self
            .backend
            .stream_chat(self.conversation.messages(), system_prompt);
        let ticket = Arc::new(());
        self.in_flight = Arc::downgrade(&ticket);

        Ok(SubmitOutcome::Started(PendingReply {
            session: self.id,
            turn: self.turn,
            stream,
            ticket,
        }))
    }

    /// Relay a started turn to `consumer`, then record the reply.
    ///
    /// Fragments are delivered in arrival order and followed by exactly one
    /// [`ReplyEvent::Done`]. A failed turn records the error text as the
    /// assistant message so the log stays alternating.
    pub async fn await_reply<F>(
        &mut self,
        pending: PendingReply,
        mut consumer: F,
    ) -> Result<ChatOutcome, SessionError>
    where
        F: FnMut(ReplyEvent),
    {
        if self.state != TurnState::AwaitingReply
            || pending.session != self.id
            || pending.turn != self.turn
        {
            return Err(SessionError::StaleReply);
        }

        let PendingReply {
            stream: mut stream,
            ticket: _ticket,
            ..
        } = pending;
        let mut outcome = None;
        while let Some(message) = stream.next().await {
            match message {
                StreamMessage::Chunk(text) => consumer(ReplyEvent::Fragment(text)),
                StreamMessage::End(result) => {
                    outcome = Some(result);
                    break;
                }
            }
        }
        let outcome = outcome.unwrap_or_else(|| {
            Err(BackendError::other("reply stream closed before completion"))
        });

        match &outcome {
            Ok(reply) => self.conversation.append_assistant(reply.as_str()),
            Err(err) => self.conversation.append_assistant(err.user_message()),
        }
        self.state = TurnState::Idle;
        debug!(turn = self.turn, ok = outcome.is_ok(), "Turn finished");

        consumer(ReplyEvent::Done(outcome.clone()));
        Ok(outcome)
    }

    /// [`submit`](Self::submit) followed by [`await_reply`](Self::await_reply).
    /// Returns `None` when no backend call was made.
    pub async fn send<F>(&mut self, text: &str, consumer: F) -> Result<Option<ChatOutcome>, SessionError>
    where
        F: FnMut(ReplyEvent),
    {
        match self.submit(text)? {
            SubmitOutcome::Ignored | SubmitOutcome::Cleared => Ok(None),
            SubmitOutcome::Started(pending) => self.await_reply(pending, consumer).await.map(Some),
        }
    }

    pub fn clear_history(&mut self) -> Result<(), SessionError> {
        self.recover_abandoned_turn();
        if self.state == TurnState::AwaitingReply {
            return Err(SessionError::Busy);
        }
        self.conversation.clear();
        Ok(())
    }

    /// Make `persona_id` active. Always discards the conversation, since the
    /// previous turns were answered under a different system prompt.
    pub fn switch_persona(&mut self, persona_id: &str) -> Result<(), SessionError> {
        if !self.registry.contains(persona_id) {
            return Err(SessionError::InvalidPersona(persona_id.to_string()));
        }
        self.recover_abandoned_turn();
        if self.state == TurnState::AwaitingReply {
            return Err(SessionError::Busy);
        }
        debug!(from = %self.active_persona, to = %persona_id, "Switching persona");
        self.active_persona = persona_id.to_string();
        self.conversation.clear();
        Ok(())
    }

    fn turn_abandoned(&self) -> bool {
        self.state == TurnState::AwaitingReply && self.in_flight.strong_count() == 0
    }

    fn recover_abandoned_turn(&mut self) {
        if self.turn_abandoned() {
            warn!(turn = self.turn, "Reply was abandoned; discarding unanswered message");
            self.conversation.discard_unanswered();
            self.state = TurnState::Idle;
        }
    }
}
