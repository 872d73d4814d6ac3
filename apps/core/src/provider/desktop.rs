use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use super::{Provider, ProviderCore, ProviderError};
use crate::action_executor::{LaunchTarget, Launcher};
use crate::config::Config;
use crate::history::UsageHistory;
use crate::model::{Action, CandidateEntry, RankedItem, SearchText, Visibility};
use crate::ranking::rank;

pub const NAME: &str = "desktopapplications";

const MAIN_GROUP: &str = "Desktop Entry";
const ACTION_GROUP_PREFIX: &str = "Desktop Action ";

pub struct DesktopApplications {
    entries: Vec<CandidateEntry>,
    core: ProviderCore,
    launcher: Arc<dyn Launcher>,
}

impl DesktopApplications {
    pub fn new(entries: Vec<CandidateEntry>, core: ProviderCore, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            entries,
            core,
            launcher,
        }
    }

    pub fn from_config(
        cfg: &Config,
        history: Option<Arc<dyn UsageHistory>>,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        let entries = load_entries(&cfg.desktop_applications.application_dirs);
        info!(provider = NAME, entries = entries.len(), "desktop entries loaded");

        let mut core = ProviderCore::new(NAME, cfg.desktop_applications.provider())
            .with_pins(cfg.pins.clone())
            .with_aliases(cfg.aliases.clone())
            .with_desktop(cfg.current_desktop());
        if let Some(history) = history {
            core = core.with_history(history);
        }

        Self::new(entries, core, launcher)
    }

    pub fn entries(&self) -> &[CandidateEntry] {
        &self.entries
    }

    pub fn core(&self) -> &ProviderCore {
        &self.core
    }

    fn find(&self, identifier: &str) -> Option<&CandidateEntry> {
        self.entries.iter().find(|entry| entry.identifier == identifier)
    }
}

impl Provider for DesktopApplications {
    fn name(&self) -> &'static str {
        NAME
    }

    fn icon(&self) -> &str {
        &self.core.policy().icon
    }

    fn query(&self, qid: u32, iid: u32, query: &str, _single: bool, exact: bool) -> Vec<RankedItem> {
        let started = self.core.begin_query(qid, iid, query);
        let items = rank(query, &self.entries, exact, &self.core.context());
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

        let (entry, sub_action) = match self.find(identifier) {
            Some(entry) => (entry, None),
            None => {
                let (base, sub_action) = identifier
                    .split_once(':')
                    .ok_or_else(|| ProviderError::UnknownIdentifier(identifier.to_string()))?;
                let entry = self
                    .find(base)
                    .filter(|entry| entry.actions.iter().any(|a| a.action == sub_action))
                    .ok_or_else(|| ProviderError::UnknownIdentifier(identifier.to_string()))?;
                (entry, Some(sub_action))
            }
        };

        self.launcher.launch(&LaunchTarget::DesktopEntry {
            identifier: &entry.identifier,
            action: sub_action,
        })?;
        self.core.record_activation(qid, identifier);
        Ok(())
    }

    fn cleanup(&self, qid: u32) {
        self.core.cleanup(qid);
    }
}

/// Reads `*.desktop` files from `dirs`. The first directory providing an
/// identifier wins; results are ordered by identifier.
pub fn load_entries(dirs: &[impl AsRef<Path>]) -> Vec<CandidateEntry> {
    let mut found: BTreeMap<String, CandidateEntry> = BTreeMap::new();

    for dir in dirs {
        let Ok(read) = std::fs::read_dir(dir.as_ref()) else {
            continue;
        };
        for entry in read.flatten() {
            let path = entry.path();
            let is_desktop = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "desktop");
            if !is_desktop {
                continue;
            }
            let Some(identifier) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if found.contains_key(identifier) {
                continue;
            }
            let Ok(contents) = std::fs::read_to_string(&path) else {
                debug!(path = %path.display(), "unreadable desktop entry");
                continue;
            };
            if let Some(parsed) = parse_desktop_entry(identifier, &contents) {
                found.insert(identifier.to_string(), parsed);
            }
        }
    }

    found.into_values().collect()
}

/// Parses the key-file format of a desktop entry. Localized keys are
/// ignored. Returns `None` for entries without a name or of a type other than
/// `Application`.
pub fn parse_desktop_entry(identifier: &str, contents: &str) -> Option<CandidateEntry> {
    let mut groups: Vec<(String, BTreeMap<String, String>)> = Vec::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(group) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            groups.push((group.to_string(), BTreeMap::new()));
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.contains('[') {
            continue;
        }
        if let Some((_, values)) = groups.last_mut() {
            values.insert(key.to_string(), value.trim().to_string());
        }
    }

    let main = groups
        .iter()
        .find(|(name, _)| name == MAIN_GROUP)
        .map(|(_, values)| values)?;

    if main.get("Type").is_some_and(|t| t != "Application") {
        return None;
    }
    let name = main.get("Name").filter(|n| !n.is_empty())?;
    let get = |key: &str| main.get(key).cloned().unwrap_or_default();
    let flag = |key: &str| main.get(key).is_some_and(|v| v.eq_ignore_ascii_case("true"));

    let text = SearchText {
        name: name.clone(),
        parent: String::new(),
        generic_name: get("GenericName"),
        keywords: split_list(&get("Keywords")),
        comment: get("Comment"),
    };

    let actions = split_list(&get("Actions"))
        .into_iter()
        .filter_map(|action| {
            let group = format!("{ACTION_GROUP_PREFIX}{action}");
            let values = groups
                .iter()
                .find(|(name, _)| *name == group)
                .map(|(_, values)| values)?;
            let action_name = values.get("Name").filter(|n| !n.is_empty())?;
            let icon = values.get("Icon").cloned().unwrap_or_else(|| get("Icon"));
            Some(Action::new(&action, action_name, &icon))
        })
        .collect();

    Some(CandidateEntry {
        identifier: identifier.to_string(),
        subtext: text.generic_name.clone(),
        text,
        icon: get("Icon"),
        visibility: Visibility {
            hidden: flag("Hidden"),
            no_display: flag("NoDisplay"),
            only_show_in: split_list(&get("OnlyShowIn")),
            not_show_in: split_list(&get("NotShowIn")),
        },
        actions,
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
