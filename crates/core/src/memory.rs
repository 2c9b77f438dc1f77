use crate::Turn;
use std::collections::VecDeque;

/// Chronological log of the session's question/answer turns.
///
/// Unbounded by default. With `max_turns` set, the oldest turns are dropped
/// once the cap is exceeded.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    turns: VecDeque<Turn>,
    max_turns: Option<usize>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_turns(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns: Some(max_turns.max(1)),
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        if let Some(max) = self.max_turns {
            while self.turns.len() > max {
                self.turns.pop_front();
            }
        }
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// History as alternating `Human:` / `AI:` lines.
    pub fn render_history(&self) -> String {
        self.turns
            .iter()
            .flat_map(|turn| {
                [
                    format!("Human: {}", turn.question),
                    format!("AI: {}", turn.answer),
                ]
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
