//! Chronicle storage for the running session.
//!
//! Holds the transcript forwarded to the model, the `(input, reply)` pairs
//! shown on the page, and the check the model is waiting on, if any.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use faramita_domain::{ChronicleEntry, ChronicleRole, DiceCheck};

/// One round as the player saw it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exchange {
    /// Turn the exchange belongs to
    pub turn: u32,
    pub input: String,
    pub reply: String,
}

#[derive(Debug, Default)]
struct ChronicleState {
    entries: Vec<ChronicleEntry>,
    transcript: Vec<Exchange>,
    /// Pending check and the index of its announcement entry
    pending: Option<(DiceCheck, usize)>,
    turn: u32,
}

#[derive(Default)]
pub struct ChronicleStore {
    inner: RwLock<ChronicleState>,
}

impl ChronicleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new player turn and return its number.
    pub async fn next_turn(&self) -> u32 {
        let mut state = self.inner.write().await;
        state.turn += 1;
        state.turn
    }

    pub async fn append(&self, turn: u32, role: ChronicleRole, content: impl Into<String>, at: DateTime<Utc>) {
        let entry = ChronicleEntry::new(turn, role, content, at);
        self.inner.write().await.entries.push(entry);
    }

    /// Everything recorded so far, oldest first.
    pub async fn entries(&self) -> Vec<ChronicleEntry> {
        self.inner.read().await.entries.clone()
    }

    /// The last `window` entries, oldest first.
    pub async fn recent(&self, window: usize) -> Vec<ChronicleEntry> {
        let state = self.inner.read().await;
        let start = state.entries.len().saturating_sub(window);
        state.entries[start..].to_vec()
    }

    /// Record a page exchange under the current turn.
    pub async fn record_exchange(&self, input: impl Into<String>, reply: impl Into<String>) {
        let mut state = self.inner.write().await;
        let turn = state.turn;
        state.transcript.push(Exchange {
            turn,
            input: input.into(),
            reply: reply.into(),
        });
    }

    pub async fn transcript(&self) -> Vec<Exchange> {
        self.inner.read().await.transcript.clone()
    }

    /// Record the check's announcement and remember it as pending.
    pub async fn set_pending_check(&self, turn: u32, check: DiceCheck, at: DateTime<Utc>) {
        let mut state = self.inner.write().await;
        let entry = ChronicleEntry::new(turn, ChronicleRole::System, check.announcement(), at);
        state.entries.push(entry);
        let index = state.entries.len() - 1;
        state.pending = Some((check, index));
    }

    pub async fn pending_check(&self) -> Option<DiceCheck> {
        self.inner
            .read()
            .await
            .pending
            .as_ref()
            .map(|(check, _)| check.clone())
    }

    /// Append `resolution` to the pending check's announcement and clear it.
    ///
    /// Returns the check that was resolved, or `None` when nothing was pending.
    pub async fn resolve_pending_check(&self, resolution: &str) -> Option<DiceCheck> {
        let mut state = self.inner.write().await;
        let (check, index) = state.pending.take()?;
        if let Some(entry) = state.entries.get_mut(index) {
            entry.content.push(' ');
            entry.content.push_str(resolution);
        }
        Some(check)
    }

    /// Forget turn `turn` and everything after it.
    ///
    /// Entries and exchanges with `turn >= turn` are removed, the pending
    /// check is dropped and numbering resumes at `turn`. Returns how many
    /// chronicle entries were removed.
    pub async fn rollback(&self, turn: u32) -> usize {
        let mut state = self.inner.write().await;
        let before = state.entries.len();
        state.entries.retain(|entry| entry.turn < turn);
        state.transcript.retain(|exchange| exchange.turn < turn);
        state.pending = None;
        state.turn = state.turn.min(turn.saturating_sub(1));
        before - state.entries.len()
    }

    /// Drop history, transcript and pending check.
    pub async fn clear(&self) {
        *self.inner.write().await = ChronicleState::default();
    }
}
