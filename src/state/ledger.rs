use crate::types::ToolKey;
use std::collections::{HashSet, VecDeque};

/// Per-turn record of which tool invocations were already surfaced.
///
/// Every key is admitted once. Keys admitted with [`ToolLedger::admit`] stay
/// "open" in admission order until a completion settles them, and each key
/// settles at most once. Keys admitted with [`ToolLedger::admit_settled`] are
/// only deduplicated and never take a completion.
#[derive(Debug, Default)]
pub struct ToolLedger {
    seen: HashSet<ToolKey>,
    open: VecDeque<ToolKey>,
}

impl ToolLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time `key` is seen, false afterwards.
    pub fn admit(&mut self, key: &ToolKey) -> bool {
        if !self.seen.insert(key.clone()) {
            return false;
        }
        self.open.push_back(key.clone());
        true
    }

    /// Like [`ToolLedger::admit`], but the key never enters the open queue.
    pub fn admit_settled(&mut self, key: &ToolKey) -> bool {
        self.seen.insert(key.clone())
    }

    /// Settles one open invocation.
    ///
    /// An explicit id that matches an open key settles that key. Otherwise the
    /// oldest open key is settled, which is only an approximation when the
    /// transport omits ids on completion.
    pub fn settle(&mut self, id: Option<&str>) -> Option<ToolKey> {
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            if let Some(position) = self.open.iter().position(|key| key.as_str() == id) {
                return self.open.remove(position);
            }
        }
        self.open.pop_front()
    }

    pub fn contains(&self, key: &ToolKey) -> bool {
        self.seen.contains(key)
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}
