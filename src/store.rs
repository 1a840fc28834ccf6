//! Game log persistence
//!
//! Logs are append-only and returned oldest first. The in-memory store is the
//! reference implementation; hosts may provide their own backend.

use crate::types::{GameLog, GameType, NewGameLog};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Storage seam for game logs
pub trait GameLogStore {
    /// Persist a log and return it with its assigned id
    fn record_log(&mut self, log: NewGameLog) -> GameLog;

    /// All logs for a child, ordered by timestamp ascending
    fn logs_for_child(&self, child_id: &str) -> Vec<GameLog>;

    /// Logs for a child filtered by game type, ordered by timestamp ascending
    fn logs_for_child_by_type(&self, child_id: &str, game_type: GameType) -> Vec<GameLog> {
        self.logs_for_child(child_id)
            .into_iter()
            .filter(|log| log.game_type == game_type)
            .collect()
    }
}

/// Vec-backed store with JSON persistence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryGameLogStore {
    logs: Vec<GameLog>,
}

impl InMemoryGameLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    /// Load store state from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize store state to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl GameLogStore for InMemoryGameLogStore {
    fn record_log(&mut self, log: NewGameLog) -> GameLog {
        let stored = GameLog::from_new(format!("log_{}", Uuid::new_v4()), log);
        self.logs.push(stored.clone());
        stored
    }

    fn logs_for_child(&self, child_id: &str) -> Vec<GameLog> {
        let mut logs: Vec<GameLog> = self
            .logs
            .iter()
            .filter(|log| log.child_id == child_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps
        logs.sort_by_key(|log| log.timestamp);
        logs
    }
}
