use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Who produced a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Speaker {
    User,
    Agent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Short-term conversation memory for the hosted agent.
pub trait SessionService: Send + Sync {
    fn append(&self, session: SessionId, speaker: Speaker, text: &str);
    fn history(&self, session: SessionId) -> Vec<Turn>;
}

/// Single-process session store: context survives across turns within a
/// session and is gone on restart, which is all the concierge needs.
#[derive(Default)]
pub struct InMemorySessionService {
    sessions: Mutex<HashMap<SessionId, Vec<Turn>>>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self) -> SessionId {
        let session = SessionId::new();
        self.sessions.lock().expect("session lock poisoned").insert(session, Vec::new());
        session
    }
}

impl SessionService for InMemorySessionService {
    fn append(&self, session: SessionId, speaker: Speaker, text: &str) {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        sessions.entry(session).or_default().push(Turn {
            speaker,
            text: text.to_string(),
            at: Utc::now(),
        });
    }

    fn history(&self, session: SessionId) -> Vec<Turn> {
        self.sessions
            .lock()
            .expect("session lock poisoned")
            .get(&session)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemorySessionService, SessionId, SessionService, Speaker};

    #[test]
    fn history_preserves_turn_order_within_a_session() {
        let service = InMemorySessionService::new();
        let session = service.create();

        service.append(session, Speaker::User, "do you carry finch seed?");
        service.append(session, Speaker::Agent, "Yes - Finch Seed is $12.99.");
        service.append(session, Speaker::User, "great, what are your hours?");

        let history = service.history(session);
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].speaker, Speaker::User);
        assert_eq!(history[1].text, "Yes - Finch Seed is $12.99.");
        assert_eq!(history[2].text, "great, what are your hours?");
    }

    #[test]
    fn sessions_are_isolated_from_each_other() {
        let service = InMemorySessionService::new();
        let first = service.create();
        let second = service.create();

        service.append(first, Speaker::User, "hello");

        assert_eq!(service.history(first).len(), 1);
        assert!(service.history(second).is_empty());
    }

    #[test]
    fn unknown_session_has_empty_history() {
        let service = InMemorySessionService::new();
        assert!(service.history(SessionId::new()).is_empty());
    }
}
