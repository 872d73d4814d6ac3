use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::fuzzy::MAX_SCORE;
use crate::model::PinList;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid toml config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid json5 config: {0}")]
    Json5(#[from] json5::Error),
    #[error("failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("{0}")]
    Invalid(String),
}

/// Ranking and visibility policy of one provider, after defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub icon: String,
    pub min_score: i32,
    pub score_floor: i32,
    pub only_search_title: bool,
    pub history: bool,
    pub history_when_empty: bool,
    pub show_actions: bool,
    pub show_generic: bool,
    pub show_actions_without_query: bool,
    pub action_min_score: i32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            icon: String::new(),
            min_score: 30,
            score_floor: 10,
            only_search_title: false,
            history: true,
            history_when_empty: false,
            show_actions: false,
            show_generic: true,
            show_actions_without_query: false,
            action_min_score: 0,
        }
    }
}

/// Per-section overrides as written in the config file. Unset keys fall back
/// to the section's own defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_floor: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_search_title: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_when_empty: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_actions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_generic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_actions_without_query: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_min_score: Option<i32>,
}

impl ProviderSettings {
    pub fn resolve(&self, base: ProviderConfig) -> ProviderConfig {
        ProviderConfig {
            icon: self.icon.clone().unwrap_or(base.icon),
            min_score: self.min_score.unwrap_or(base.min_score),
            score_floor: self.score_floor.unwrap_or(base.score_floor),
            only_search_title: self.only_search_title.unwrap_or(base.only_search_title),
            history: self.history.unwrap_or(base.history),
            history_when_empty: self.history_when_empty.unwrap_or(base.history_when_empty),
            show_actions: self.show_actions.unwrap_or(base.show_actions),
            show_generic: self.show_generic.unwrap_or(base.show_generic),
            show_actions_without_query: self
                .show_actions_without_query
                .unwrap_or(base.show_actions_without_query),
            action_min_score: self.action_min_score.unwrap_or(base.action_min_score),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopApplicationsConfig {
    #[serde(flatten)]
    pub settings: ProviderSettings,
    pub application_dirs: Vec<PathBuf>,
}

impl Default for DesktopApplicationsConfig {
    fn default() -> Self {
        Self {
            settings: ProviderSettings::default(),
            application_dirs: default_application_dirs(),
        }
    }
}

impl DesktopApplicationsConfig {
    pub fn provider(&self) -> ProviderConfig {
        self.settings.resolve(ProviderConfig {
            icon: "applications-other".to_string(),
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    #[serde(flatten)]
    pub settings: ProviderSettings,
    pub root: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            settings: ProviderSettings::default(),
            root: dirs::home_dir().unwrap_or_else(|| PathBuf::from("/")),
        }
    }
}

impl FilesConfig {
    pub fn provider(&self) -> ProviderConfig {
        self.settings.resolve(ProviderConfig {
            icon: "folder".to_string(),
            min_score: 50,
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebsearchEntry {
    pub name: String,
    pub url: String,
    pub prefix: String,
    pub default: bool,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebsearchConfig {
    #[serde(flatten)]
    pub settings: ProviderSettings,
    pub entries: Vec<WebsearchEntry>,
    pub max_global_items_to_display: usize,
}

impl Default for WebsearchConfig {
    fn default() -> Self {
        Self {
            settings: ProviderSettings::default(),
            entries: Vec::new(),
            max_global_items_to_display: 1,
        }
    }
}

impl WebsearchConfig {
    pub fn provider(&self) -> ProviderConfig {
        self.settings.resolve(ProviderConfig {
            icon: "applications-internet".to_string(),
            min_score: 20,
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desktop: Option<String>,
    pub pins: PinList,
    pub aliases: HashMap<String, String>,
    pub desktop_applications: DesktopApplicationsConfig,
    pub files: FilesConfig,
    pub websearch: WebsearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: stable_app_data_dir(),
            desktop: None,
            pins: PinList::default(),
            aliases: HashMap::new(),
            desktop_applications: DesktopApplicationsConfig::default(),
            files: FilesConfig::default(),
            websearch: WebsearchConfig::default(),
        }
    }
}

impl Config {
    /// Configured desktop environment, falling back to `XDG_CURRENT_DESKTOP`.
    pub fn current_desktop(&self) -> Option<String> {
        self.desktop
            .clone()
            .or_else(|| std::env::var("XDG_CURRENT_DESKTOP").ok())
    }
}

pub fn stable_app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("quarry")
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("quarry")
        .join("config.toml")
}

fn default_application_dirs() -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(data) = dirs::data_dir() {
        out.push(data.join("applications"));
    }
    out.push(PathBuf::from("/usr/local/share/applications"));
    out.push(PathBuf::from("/usr/share/applications"));
    out
}

pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Config::default());
        }
        Err(source) => return Err(ConfigError::Io { path, source }),
    };

    parse(&path, &raw)
}

pub fn parse(path: &Path, raw: &str) -> Result<Config, ConfigError> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json") || ext.eq_ignore_ascii_case("json5"));

    let cfg: Config = if is_json {
        json5::from_str(raw)?
    } else {
        toml::from_str(raw)?
    };
    validate(&cfg)?;
    Ok(cfg)
}

pub fn save(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    let encoded = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, encoded).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    validate_provider("desktop_applications", &cfg.desktop_applications.provider())?;
    validate_provider("files", &cfg.files.provider())?;
    validate_provider("websearch", &cfg.websearch.provider())?;

    let mut prefixes = HashSet::new();
    for (index, entry) in cfg.websearch.entries.iter().enumerate() {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "websearch entry {index} is missing a name"
            )));
        }
        if !entry.url.contains("%TERM%") {
            return Err(ConfigError::Invalid(format!(
                "websearch entry '{}' url must contain %TERM%",
                entry.name
            )));
        }
        if !entry.prefix.is_empty() && !prefixes.insert(entry.prefix.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "websearch prefix '{}' is used more than once",
                entry.prefix
            )));
        }
    }

    Ok(())
}

fn validate_provider(name: &str, provider: &ProviderConfig) -> Result<(), ConfigError> {
    if provider.min_score < 0 {
        return Err(ConfigError::Invalid(format!("{name}.min_score must not be negative")));
    }
    if !(0..=MAX_SCORE).contains(&provider.score_floor) {
        return Err(ConfigError::Invalid(format!(
            "{name}.score_floor must be between 0 and {MAX_SCORE}"
        )));
    }
    if provider.action_min_score < 0 {
        return Err(ConfigError::Invalid(format!(
            "{name}.action_min_score must not be negative"
        )));
    }
    Ok(())
}
