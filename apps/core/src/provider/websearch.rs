use std::sync::Arc;

use tracing::warn;

use super::{Provider, ProviderCore, ProviderError};
use crate::action_executor::{LaunchTarget, Launcher};
use crate::config::{Config, WebsearchEntry};
use crate::fuzzy;
use crate::history::UsageHistory;
use crate::model::{FuzzyInfo, ItemState, MatchField, RankedItem};

pub const NAME: &str = "websearch";

const TERM_PLACEHOLDER: &str = "%TERM%";
const BASE_SCORE: i32 = 100;

pub struct Websearch {
    entries: Vec<WebsearchEntry>,
    max_global_items_to_display: usize,
    core: ProviderCore,
    launcher: Arc<dyn Launcher>,
}

impl Websearch {
    pub fn new(entries: Vec<WebsearchEntry>, core: ProviderCore, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            entries,
            max_global_items_to_display: 1,
            core,
            launcher,
        }
    }

    pub fn from_config(
        cfg: &Config,
        history: Option<Arc<dyn UsageHistory>>,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        let mut core = ProviderCore::new(NAME, cfg.websearch.provider());
        if let Some(history) = history {
            core = core.with_history(history);
        }

        let mut provider = Self::new(cfg.websearch.entries.clone(), core, launcher);
        provider.max_global_items_to_display = cfg.websearch.max_global_items_to_display;
        provider
    }

    /// The host shows the global entry only when at most this many results
    /// came back from other providers.
    pub fn max_global_items_to_display(&self) -> usize {
        self.max_global_items_to_display
    }

    pub fn core(&self) -> &ProviderCore {
        &self.core
    }

    /// Prefix of the first entry whose prefix `query` starts with.
    pub fn matching_prefix(&self, query: &str) -> Option<&str> {
        self.entries
            .iter()
            .map(|entry| entry.prefix.as_str())
            .find(|prefix| !prefix.is_empty() && query.starts_with(prefix))
    }

    fn icon_for(&self, entry: &WebsearchEntry) -> String {
        if entry.icon.is_empty() {
            self.core.policy().icon.clone()
        } else {
            entry.icon.clone()
        }
    }

    fn base_item(&self, index: usize, entry: &WebsearchEntry) -> RankedItem {
        RankedItem {
            identifier: index.to_string(),
            text: entry.name.clone(),
            subtext: String::new(),
            icon: self.icon_for(entry),
            score: BASE_SCORE - index as i32,
            state: Vec::new(),
            fuzzy: None,
        }
    }

    fn score_single(&self, query: &str, exact: bool) -> Vec<RankedItem> {
        let policy = self.core.policy();
        let mut items = Vec::new();

        for (index, entry) in self.entries.iter().enumerate() {
            let mut item = self.base_item(index, entry);

            if !query.is_empty() {
                let Some(hit) = fuzzy::score(query, &entry.name, exact) else {
                    continue;
                };
                item.score = hit.score;
                item.fuzzy = Some(FuzzyInfo {
                    field: MatchField::Text,
                    start: hit.start,
                    positions: hit.positions,
                });
            }

            let wants_history =
                item.score > policy.min_score || (query.is_empty() && policy.history_when_empty);
            if policy.history && wants_history {
                if let Some(history) = self.core.history() {
                    let usage = match history.calc_usage_score(query, &item.identifier) {
                        Ok(value) => value,
                        Err(error) => {
                            warn!(
                                identifier = %item.identifier,
                                %error,
                                "usage score lookup failed"
                            );
                            0
                        }
                    };
                    if usage != 0 {
                        item.state.push(ItemState::History);
                    }
                    item.score += usage;
                }
            }

            if item.score > policy.min_score || query.is_empty() {
                items.push(item);
            }
        }

        items
    }

    // Without a matching prefix the prefix-less entries come back alongside
    // the defaults.
    fn score_global(&self, query: &str) -> Vec<RankedItem> {
        let prefix = self.matching_prefix(query).unwrap_or_default();

        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.default || entry.prefix == prefix)
            .map(|(index, entry)| self.base_item(index, entry))
            .collect()
    }
}

impl Provider for Websearch {
    fn name(&self) -> &'static str {
        NAME
    }

    fn icon(&self) -> &str {
        &self.core.policy().icon
    }

    fn query(&self, qid: u32, iid: u32, query: &str, single: bool, exact: bool) -> Vec<RankedItem> {
        let started = self.core.begin_query(qid, iid, query);
        let mut items = if single {
            self.score_single(query, exact)
        } else {
            self.score_global(query)
        };
        items.sort_by(|a, b| b.score.cmp(&a.score));
        self.core.finish_query(qid, started, items.len());
        items
    }

    fn activate(
        &self,
        qid: u32,
        identifier: &str,
        action: &str,
        arguments: &str,
    ) -> Result<(), ProviderError> {
        if self.core.erase_history(identifier, action)? {
            return Ok(());
        }

        let entry = identifier
            .parse::<usize>()
            .ok()
            .and_then(|index| self.entries.get(index))
            .ok_or_else(|| ProviderError::UnknownIdentifier(identifier.to_string()))?;

        let term = match self.matching_prefix(arguments) {
            Some(prefix) => &arguments[prefix.len()..],
            None => arguments,
        };
        let url = search_url(&entry.url, term);

        self.launcher.launch(&LaunchTarget::Url(&url))?;
        self.core.record_activation(qid, identifier);
        Ok(())
    }

    fn cleanup(&self, qid: u32) {
        self.core.cleanup(qid);
    }
}

pub fn search_url(template: &str, term: &str) -> String {
    template.replace(TERM_PLACEHOLDER, &url_encode_component(term.trim()))
}

fn url_encode_component(input: &str) -> String {
    let mut out = String::new();
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(byte as char);
        } else if byte == b' ' {
            out.push('+');
        } else {
            out.push('%');
            out.push_str(&format!("{byte:02X}"));
        }
    }
    out
}
