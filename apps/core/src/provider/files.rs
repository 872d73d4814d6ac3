use std::sync::Arc;
use std::time::{Duration, SystemTime};

use super::{Provider, ProviderCore, ProviderError};
use crate::action_executor::{LaunchTarget, Launcher};
use crate::config::Config;
use crate::history::UsageHistory;
use crate::indexer::{FileIndexEntry, FileIndexer, IndexerOptions};
use crate::model::{CandidateEntry, RankedItem, SearchText};
use crate::ranking::rank;

pub const NAME: &str = "files";

/// Files changed more recently than this are listed for an empty query.
pub const RECENT_WINDOW: Duration = Duration::from_secs(3600);

pub struct Files {
    indexer: FileIndexer,
    core: ProviderCore,
    launcher: Arc<dyn Launcher>,
}

impl Files {
    pub fn new(indexer: FileIndexer, core: ProviderCore, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            indexer,
            core,
            launcher,
        }
    }

    /// Builds the index for the configured root. Failing to enumerate or to
    /// start watching is fatal for this provider.
    pub fn from_config(
        cfg: &Config,
        history: Option<Arc<dyn UsageHistory>>,
        launcher: Arc<dyn Launcher>,
    ) -> Result<Self, ProviderError> {
        let indexer = FileIndexer::start(IndexerOptions::new(&cfg.files.root))?;

        let mut core = ProviderCore::new(NAME, cfg.files.provider())
            .with_pins(cfg.pins.clone())
            .with_aliases(cfg.aliases.clone());
        if let Some(history) = history {
            core = core.with_history(history);
        }

        Ok(Self::new(indexer, core, launcher))
    }

    pub fn indexer(&self) -> &FileIndexer {
        &self.indexer
    }

    pub fn core(&self) -> &ProviderCore {
        &self.core
    }

    fn candidates(&self, query: &str) -> Vec<CandidateEntry> {
        let mut entries = self.indexer.index().snapshot();

        if query.is_empty() {
            let now = SystemTime::now();
            entries.retain(|entry| is_recent(entry, now) || self.is_pinned(&entry.identifier));
            entries.sort_by(|a, b| b.changed.cmp(&a.changed).then_with(|| a.path.cmp(&b.path)));
        } else {
            entries.sort_by(|a, b| a.path.cmp(&b.path));
        }

        let icon = &self.core.policy().icon;
        entries.iter().map(|entry| candidate(entry, icon)).collect()
    }

    fn is_pinned(&self, identifier: &str) -> bool {
        self.core.pins().position(identifier).is_some()
    }
}

impl Provider for Files {
    fn name(&self) -> &'static str {
        NAME
    }

    fn icon(&self) -> &str {
        &self.core.policy().icon
    }

    fn query(&self, qid: u32, iid: u32, query: &str, _single: bool, exact: bool) -> Vec<RankedItem> {
        let started = self.core.begin_query(qid, iid, query);
        // Snapshot first so the index lock is not held while ranking.
        let candidates = self.candidates(query);
        let items = rank(query, &candidates, exact, &self.core.context());
        self.core.finish_query(qid, started, items.len());
        items
    }

    fn activate(
        &self,
        qid: u32,
        identifier: &str,
        action: &str,
        _arguments: &str,
    ) -> Result<(), ProviderError> {
        if self.core.erase_history(identifier, action)? {
            return Ok(());
        }

        let entry = self
            .indexer
            .index()
            .get(identifier)
            .ok_or_else(|| ProviderError::UnknownIdentifier(identifier.to_string()))?;

        self.launcher.launch(&LaunchTarget::Path(&entry.path))?;
        self.core.record_activation(qid, identifier);
        Ok(())
    }

    fn cleanup(&self, qid: u32) {
        self.core.cleanup(qid);
    }
}

fn is_recent(entry: &FileIndexEntry, now: SystemTime) -> bool {
    entry.changed.is_some_and(|changed| match now.duration_since(changed) {
        Ok(age) => age <= RECENT_WINDOW,
        Err(_) => true,
    })
}

fn candidate(entry: &FileIndexEntry, icon: &str) -> CandidateEntry {
    CandidateEntry {
        identifier: entry.identifier.clone(),
        text: SearchText {
            name: entry.file_name().to_string(),
            parent: entry.parent().to_string(),
            ..Default::default()
        },
        subtext: entry.path.clone(),
        icon: icon.to_string(),
        visibility: Default::default(),
        actions: Vec::new(),
    }
}
