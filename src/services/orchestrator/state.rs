//! Conversation state for one in-flight turn, with merge semantics made
//! explicit per field: an append-only log for messages, set-once cells for
//! branch-owned results, and write-once-at-entry scalars for topic and mode.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{Mode, Topic, TurnMessage};
use crate::services::structured_output::TimelineEvent;

/// Append-only sequence. Entries are never reordered or removed; concurrent
/// writers contribute batches that concatenate in completion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppendLog<T> {
    entries: Vec<T>,
}

impl<T> AppendLog<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn append(&mut self, entry: T) {
        self.entries.push(entry);
    }

    pub fn append_batch(&mut self, batch: impl IntoIterator<Item = T>) {
        self.entries.extend(batch);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<T> {
        self.entries
    }
}

impl<T> From<Vec<T>> for AppendLog<T> {
    fn from(entries: Vec<T>) -> Self {
        Self { entries }
    }
}

/// A cell written at most once. Later writes are rejected, which keeps the
/// "exactly one branch owns this field" rule honest at runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetOnce<T> {
    value: Option<T>,
}

impl<T> SetOnce<T> {
    pub fn new() -> Self {
        Self { value: None }
    }

    /// Stores `value` if the cell is empty. Returns false (leaving the cell
    /// untouched) when it was already set.
    #[must_use]
    pub fn try_set(&mut self, value: T) -> bool {
        if self.value.is_some() {
            return false;
        }
        self.value = Some(value);
        true
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

/// The mutable record threaded through the graph for one turn. Exclusively
/// owned by that turn; branches see clones and contribute [`StateUpdate`]s
/// that the runner merges in completion order.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub messages: AppendLog<TurnMessage>,
    topic: Topic,
    mode: Mode,
    pub followup_questions: SetOnce<Vec<String>>,
    pub events: SetOnce<Vec<TimelineEvent>>,
    pub response_started: SetOnce<()>,
}

impl ConversationState {
    pub fn new(
        history: Vec<TurnMessage>,
        user_message: &str,
        topic: Topic,
        mode: Mode,
    ) -> Self {
        let mut messages = AppendLog::from(history);
        messages.append(TurnMessage::user(user_message));
        Self {
            messages,
            topic,
            mode,
            followup_questions: SetOnce::new(),
            events: SetOnce::new(),
            response_started: SetOnce::new(),
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The most recent user-authored message of the conversation.
    /// Tool calls awaiting dispatch: those attached to the most recent
    /// message, when that message is an assistant turn.
    pub fn pending_tool_calls(&self) -> &[crate::models::ToolCallRecord] {
        match self.messages.last() {
            Some(TurnMessage::Assistant { tool_calls, .. }) => tool_calls,
            _ => &[],
        }
    }

    pub fn latest_user_message(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match m {
            TurnMessage::User { content } => Some(content.as_str()),
            _ => None,
        })
    }

    /// Merges one completed node's contribution. Messages concatenate;
    /// set-once fields reject (and log) a second writer.
    pub fn apply(&mut self, update: StateUpdate) {
        self.messages.append_batch(update.messages);

        if let Some(questions) = update.followup_questions {
            if !self.followup_questions.try_set(questions) {
                warn!("followup_questions was already set; ignoring second writer");
            }
        }

        if let Some(events) = update.events {
            if !self.events.try_set(events) {
                warn!("timeline events were already set; ignoring second writer");
            }
        }

        if update.response_started {
            let _ = self.response_started.try_set(());
        }
    }
}

/// One node's contribution to the conversation state, merged by the runner
/// under the per-field policies above.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub messages: Vec<TurnMessage>,
    pub followup_questions: Option<Vec<String>>,
    pub events: Option<Vec<TimelineEvent>>,
    pub response_started: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_state(mode: Mode) -> ConversationState {
        ConversationState::new(Vec::new(), "hello", Topic::General, mode)
    }

    #[test]
    fn new_state_ends_with_the_user_message() {
        let state = empty_state(Mode::Informative);
        assert_eq!(state.latest_user_message(), Some("hello"));
        assert_eq!(state.messages.len(), 1);
    }

    #[test]
    fn set_once_rejects_second_writer() {
        let mut cell = SetOnce::new();
        assert!(cell.try_set(vec!["q1".to_string()]));
        assert!(!cell.try_set(vec!["q2".to_string()]));
        assert_eq!(cell.get().unwrap()[0], "q1");
    }

    #[test]
    fn apply_concatenates_message_batches_in_order() {
        let mut state = empty_state(Mode::Informative);
        state.apply(StateUpdate {
            messages: vec![TurnMessage::assistant("first", Vec::new())],
            ..Default::default()
        });
        state.apply(StateUpdate {
            messages: vec![TurnMessage::assistant("second", Vec::new())],
            ..Default::default()
        });
        let contents: Vec<_> = state
            .messages
            .iter()
            .filter_map(|m| match m {
                TurnMessage::Assistant { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[test]
    fn second_followup_writer_is_ignored() {
        let mut state = empty_state(Mode::Informative);
        state.apply(StateUpdate {
            followup_questions: Some(vec!["a".into()]),
            ..Default::default()
        });
        state.apply(StateUpdate {
            followup_questions: Some(vec!["b".into()]),
            ..Default::default()
        });
        assert_eq!(state.followup_questions.get().unwrap(), &vec!["a".to_string()]);
    }

    #[test]
    fn topic_and_mode_are_fixed_at_entry() {
        let state = ConversationState::new(Vec::new(), "x", Topic::Finance, Mode::Timeline);
        assert_eq!(state.topic(), Topic::Finance);
        assert_eq!(state.mode(), Mode::Timeline);
    }
}
