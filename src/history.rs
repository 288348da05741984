//! Message history tracking for debugging and diagnostics.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::catalog::MessageType;
use crate::message::Message;

/// Which way a recorded message travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Traffic {
    Send,
    Receive,
}

/// A recorded message in the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub traffic: Traffic,
    pub kind: MessageType,
    /// Header fields and peer address.
    pub message: Value,
    /// Seconds since history creation
    pub timestamp: f64,
}

/// Tracks message history for debugging.
///
/// Keeps the last message of each type per direction, plus a bounded log of
/// every message in order.
#[derive(Debug, Clone)]
pub struct MessageHistory {
    latest: HashMap<Traffic, HashMap<MessageType, Value>>,
    last_error: Option<String>,
    start_time: Instant,
    entries: Vec<HistoryEntry>,
    max_entries: usize,
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageHistory {
    pub const DEFAULT_MAX_ENTRIES: usize = 100;

    pub fn new() -> Self {
        Self {
            latest: HashMap::from([(Traffic::Send, HashMap::new()), (Traffic::Receive, HashMap::new())]),
            last_error: None,
            start_time: Instant::now(),
            entries: Vec::new(),
            max_entries: Self::DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            max_entries,
            ..Self::new()
        }
    }

    /// Record `msg`, sent to or received from `peer` (`None` for broadcast).
    pub fn record(&mut self, traffic: Traffic, msg: &Message, peer: Option<SocketAddr>) {
        let kind = msg.kind();
        let summary = json!({
            "type": kind.to_string(),
            "source": msg.header.source,
            "target": format!("{:016x}", msg.header.target),
            "tagged": msg.header.tagged,
            "sequence": msg.header.sequence,
            "peer": peer.map(|p| p.to_string()),
        });

        if let Some(type_map) = self.latest.get_mut(&traffic) {
            type_map.insert(kind, summary.clone());
        }

        self.entries.push(HistoryEntry {
            traffic,
            kind,
            message: summary,
            timestamp: self.start_time.elapsed().as_secs_f64(),
        });

        if self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
    }

    pub fn record_error(&mut self, error: &str) {
        self.last_error = Some(error.to_string());
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The most recent message of `kind` seen in direction `traffic`.
    pub fn latest(&self, traffic: Traffic, kind: MessageType) -> Option<&Value> {
        self.latest.get(&traffic).and_then(|m| m.get(&kind))
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.latest.values_mut().for_each(|m| m.clear());
        self.entries.clear();
        self.last_error = None;
    }

    pub fn summary(&self) -> HistorySummary {
        let count = |t: Traffic| self.entries.iter().filter(|e| e.traffic == t).count();
        HistorySummary {
            send_count: count(Traffic::Send),
            receive_count: count(Traffic::Receive),
            total_entries: self.entries.len(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Summary of message history for diagnostics.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySummary {
    pub send_count: usize,
    pub receive_count: usize,
    pub total_entries: usize,
    pub last_error: Option<String>,
}
