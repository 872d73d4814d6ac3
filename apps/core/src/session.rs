use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

/// Session ids at or above this value belong to sub-queries the host issues
/// on behalf of another provider.
pub const SUBQUERY_QID_BASE: u32 = 100_000_000;

pub fn is_subquery(qid: u32) -> bool {
    qid >= SUBQUERY_QID_BASE
}

/// Query text seen per session, keyed by invocation id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<u32, BTreeMap<u32, String>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the text of invocation `iid`. An invocation keeps the first
    /// text recorded for it.
    pub fn record(&self, qid: u32, iid: u32, query: &str) {
        self.sessions
            .lock()
            .entry(qid)
            .or_default()
            .entry(iid)
            .or_insert_with(|| query.to_string());
    }

    /// Text of the highest invocation id seen for the session.
    pub fn last_query(&self, qid: u32) -> Option<String> {
        self.sessions
            .lock()
            .get(&qid)
            .and_then(|queries| queries.last_key_value())
            .map(|(_, query)| query.clone())
    }

    pub fn cleanup(&self, qid: u32) -> bool {
        self.sessions.lock().remove(&qid).is_some()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn invocation_count(&self, qid: u32) -> usize {
        self.sessions
            .lock()
            .get(&qid)
            .map_or(0, BTreeMap::len)
    }
}
