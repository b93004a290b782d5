//! Chat sessions with bounded history.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

/// Turns kept per session before the oldest are dropped.
pub const DEFAULT_MAX_TURNS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One conversation. Holds at most `max_turns` turns, oldest evicted first.
#[derive(Debug, Clone)]
pub struct ChatSession {
    turns: VecDeque<ChatTurn>,
    max_turns: usize,
}

impl ChatSession {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns: max_turns.max(2),
        }
    }

    /// Record a question and its answer together.
    ///
    /// Eviction drops whole exchanges, so the history never starts with an
    /// assistant turn.
    pub fn record_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push_back(ChatTurn::user(question));
        self.turns.push_back(ChatTurn::assistant(answer));
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
            if self.turns.front().is_some_and(|t| t.role == Role::Assistant) {
                self.turns.pop_front();
            }
        }
    }

    pub fn turns(&self) -> impl Iterator<Item = &ChatTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Sessions keyed by an identifier chosen by the caller (a user id, a
/// connection id, a terminal).
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<String, ChatSession>,
    max_turns: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}

impl SessionStore {
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            max_turns,
        }
    }

    /// The session for `id`, created empty on first use.
    pub fn session_mut(&mut self, id: &str) -> &mut ChatSession {
        let max_turns = self.max_turns;
        self.sessions
            .entry(id.to_string())
            .or_insert_with(|| ChatSession::new(max_turns))
    }

    pub fn get(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.get(id)
    }

    /// Forget a session entirely. Returns whether it existed.
    pub fn end(&mut self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
