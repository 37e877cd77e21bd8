//! Bounded conversation memory

use crate::models::ChatTurn;
use std::collections::VecDeque;

/// Chat turns of one session, evicted oldest pair first
#[derive(Debug, Clone)]
pub struct ChatHistory {
    turns: VecDeque<ChatTurn>,
    max_turns: usize,
}

impl ChatHistory {
    /// `max_turns` is rounded up to an even number of at least 2
    pub fn new(max_turns: usize) -> Self {
        let max_turns = max_turns.max(2);
        Self {
            turns: VecDeque::with_capacity(max_turns + 2),
            max_turns: max_turns + max_turns % 2,
        }
    }

    /// Record a completed question/answer exchange
    pub fn push_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push_back(ChatTurn::user(question));
        self.turns.push_back(ChatTurn::assistant(answer));
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
            self.turns.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Turns in chronological order
    pub fn turns(&self) -> Vec<ChatTurn> {
        self.turns.iter().cloned().collect()
    }
}
