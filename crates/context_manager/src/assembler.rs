//! Context assembly.
//!
//! Builds the ordered turn sequence for one outbound request: newest
//! eligible history first under a hard token budget, then reversed back to
//! chronological order, with the system prompt always leading when present.

use chat_core::{Message, Role};

use crate::token_counter::TokenCounter;

/// One role-tagged text unit ready for transmission.
///
/// Produced fresh per request; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Turn {
            role,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler {
    counter: TokenCounter,
}

impl ContextAssembler {
    pub fn new() -> Self {
        ContextAssembler {
            counter: TokenCounter::new(),
        }
    }

    /// Assemble the bounded context for a request.
    ///
    /// `receiving_index` marks the in-flight placeholder; it and everything
    /// after it are ineligible. The system prompt, when present, is always
    /// included and seeds the running token total. History is walked newest
    /// to oldest and a message is accepted only while the running total
    /// stays strictly below `token_budget`; the walk stops at the first
    /// message that would overflow rather than skipping past it. At most
    /// `max_history` messages are accepted regardless of budget.
    pub fn assemble(
        &self,
        history: &[Message],
        receiving_index: Option<usize>,
        system_prompt: Option<&str>,
        max_history: usize,
        token_budget: usize,
    ) -> Vec<Turn> {
        let eligible = match receiving_index {
            Some(index) => &history[..index.min(history.len())],
            None => history,
        };

        let mut running = 0;
        let system_turn = system_prompt.map(|prompt| {
            running += self.counter.estimate_turn_text(prompt);
            Turn::new(Role::System, prompt)
        });

        let mut accepted: Vec<Turn> = Vec::new();
        for message in eligible.iter().rev() {
            if accepted.len() >= max_history {
                break;
            }
            if message.receiving {
                continue;
            }
            let text = message.outgoing_text();
            if text.is_empty() {
                continue;
            }

            let cost = self.counter.estimate_turn_text(text);
            if running + cost >= token_budget {
                tracing::debug!(
                    message_id = %message.id,
                    cost = cost,
                    running = running,
                    budget = token_budget,
                    "context assembly stopped at budget"
                );
                break;
            }
            running += cost;
            accepted.push(Turn::new(message.role, text));
        }

        accepted.reverse();

        let mut turns = Vec::with_capacity(accepted.len() + 1);
        if let Some(system_turn) = system_turn {
            turns.push(system_turn);
        }
        turns.extend(accepted);
        turns
    }

    /// Total estimated cost of an assembled turn sequence.
    pub fn estimated_cost(&self, turns: &[Turn]) -> usize {
        turns
            .iter()
            .map(|turn| self.counter.estimate_turn_text(&turn.text))
            .sum()
    }
}
