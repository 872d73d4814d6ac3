pub mod desktop;
pub mod files;
pub mod websearch;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::action_executor::LaunchError;
use crate::config::{ConfigError, ProviderConfig};
use crate::history::{HistoryError, UsageHistory};
use crate::indexer::IndexerError;
use crate::model::{PinList, RankedItem};
use crate::ranking::RankContext;
use crate::session::{is_subquery, SessionRegistry};

/// Activation action that forgets the usage history of an identifier.
pub const ACTION_ERASE_HISTORY: &str = "erase_history";

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("history error: {0}")]
    History(#[from] HistoryError),
    #[error("indexer error: {0}")]
    Indexer(#[from] IndexerError),
    #[error("launch error: {0}")]
    Launch(#[from] LaunchError),
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),
}

/// Contract every provider answers host requests through.
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;
    fn icon(&self) -> &str;
    fn query(&self, qid: u32, iid: u32, query: &str, single: bool, exact: bool) -> Vec<RankedItem>;
    fn activate(
        &self,
        qid: u32,
        identifier: &str,
        action: &str,
        arguments: &str,
    ) -> Result<(), ProviderError>;
    fn cleanup(&self, qid: u32);
}

/// Session, history, pin and alias state shared by the provider
/// implementations.
pub struct ProviderCore {
    name: &'static str,
    policy: ProviderConfig,
    pins: PinList,
    aliases: HashMap<String, String>,
    desktop: Option<String>,
    history: Option<Arc<dyn UsageHistory>>,
    sessions: SessionRegistry,
}

impl ProviderCore {
    pub fn new(name: &'static str, policy: ProviderConfig) -> Self {
        Self {
            name,
            policy,
            pins: PinList::default(),
            aliases: HashMap::new(),
            desktop: None,
            history: None,
            sessions: SessionRegistry::new(),
        }
    }

    pub fn with_pins(mut self, pins: PinList) -> Self {
        self.pins = pins;
        self
    }

    pub fn with_aliases(mut self, aliases: HashMap<String, String>) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_desktop(mut self, desktop: Option<String>) -> Self {
        self.desktop = desktop;
        self
    }

    pub fn with_history(mut self, history: Arc<dyn UsageHistory>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn policy(&self) -> &ProviderConfig {
        &self.policy
    }

    pub fn pins(&self) -> &PinList {
        &self.pins
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn history(&self) -> Option<&dyn UsageHistory> {
        self.history.as_deref()
    }

    pub fn context(&self) -> RankContext<'_> {
        RankContext {
            policy: &self.policy,
            pins: &self.pins,
            aliases: &self.aliases,
            desktop: self.desktop.as_deref(),
            history: self.history.as_deref(),
        }
    }

    /// Records the query text for later history attribution. Returns the
    /// moment the query started so the caller can log its duration.
    pub fn begin_query(&self, qid: u32, iid: u32, query: &str) -> Instant {
        if !is_subquery(qid) {
            self.sessions.record(qid, iid, query);
        }
        Instant::now()
    }

    pub fn finish_query(&self, qid: u32, started: Instant, results: usize) {
        if !is_subquery(qid) {
            info!(
                provider = self.name,
                qid,
                results,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "query finished"
            );
        }
    }

    /// Handles the erase-history action. Returns true when `action` was it.
    pub fn erase_history(&self, identifier: &str, action: &str) -> Result<bool, ProviderError> {
        if action != ACTION_ERASE_HISTORY {
            return Ok(false);
        }
        if let Some(history) = &self.history {
            history.remove(identifier)?;
        }
        Ok(true)
    }

    /// Saves a use of `identifier` under the last query text of the session.
    pub fn record_activation(&self, qid: u32, identifier: &str) {
        if !self.policy.history {
            return;
        }
        let Some(history) = &self.history else {
            return;
        };

        let query = self.sessions.last_query(qid).unwrap_or_default();
        if let Err(error) = history.save(&query, identifier) {
            warn!(provider = self.name, identifier, %error, "failed to save usage");
        }
    }

    pub fn cleanup(&self, qid: u32) {
        info!(provider = self.name, qid, "cleanup");
        self.sessions.cleanup(qid);
    }
}
