use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing::info;

use crate::action_executor::{Launcher, ValidatingLauncher};
use crate::config::{self, Config, ConfigError};
use crate::contract::QueryItem;
use crate::history::{HistoryError, SqliteHistory, UsageHistory};
use crate::logging::{self, LoggingError};
use crate::provider::desktop::DesktopApplications;
use crate::provider::files::Files;
use crate::provider::websearch::Websearch;
use crate::provider::{Provider, ProviderError};

const QID: u32 = 1;
const IID: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    #[value(name = "desktopapplications")]
    DesktopApplications,
    Files,
    Websearch,
}

impl ProviderKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::DesktopApplications => crate::provider::desktop::NAME,
            Self::Files => crate::provider::files::NAME,
            Self::Websearch => crate::provider::websearch::NAME,
        }
    }
}

/// Runs one query against a provider and prints the results as JSON lines.
#[derive(Debug, Parser)]
#[command(name = "quarry-core", version)]
pub struct Cli {
    /// Config file (.toml, .json or .json5).
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ProviderKind::DesktopApplications)]
    pub provider: ProviderKind,

    /// Require a contiguous match.
    #[arg(long)]
    pub exact: bool,

    /// Query as the only active provider.
    #[arg(long)]
    pub single: bool,

    /// Activate this identifier after the query, with the query as arguments.
    #[arg(long)]
    pub activate: Option<String>,

    #[arg(long, requires = "activate")]
    pub action: Option<String>,

    #[arg(default_value = "")]
    pub query: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),
    #[error("history error: {0}")]
    History(#[from] HistoryError),
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

pub fn build_provider(
    kind: ProviderKind,
    cfg: &Config,
    history: Option<Arc<dyn UsageHistory>>,
    launcher: Arc<dyn Launcher>,
) -> Result<Box<dyn Provider>, ProviderError> {
    Ok(match kind {
        ProviderKind::DesktopApplications => {
            Box::new(DesktopApplications::from_config(cfg, history, launcher))
        }
        ProviderKind::Files => Box::new(Files::from_config(cfg, history, launcher)?),
        ProviderKind::Websearch => Box::new(Websearch::from_config(cfg, history, launcher)),
    })
}

pub fn run(cli: Cli) -> Result<usize, RuntimeError> {
    let cfg = config::load(cli.config.as_deref())?;
    config::validate(&cfg)?;
    let log_path = logging::init(&cfg.data_dir)?;
    info!(
        provider = cli.provider.name(),
        log_path = %log_path.display(),
        data_dir = %cfg.data_dir.display(),
        "startup"
    );

    let history: Arc<dyn UsageHistory> =
        Arc::new(SqliteHistory::open_for_provider(&cfg.data_dir, cli.provider.name())?);
    let launcher: Arc<dyn Launcher> = Arc::new(ValidatingLauncher);
    let provider = build_provider(cli.provider, &cfg, Some(history), launcher)?;

    let items = provider.query(QID, IID, &cli.query, cli.single, cli.exact);
    let count = items.len();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for item in items {
        let line = serde_json::to_string(&QueryItem::from_ranked(provider.name(), item))?;
        writeln!(out, "{line}")?;
    }
    out.flush()?;

    if let Some(identifier) = &cli.activate {
        let action = cli.action.as_deref().unwrap_or_default();
        provider.activate(QID, identifier, action, &cli.query)?;
    }
    provider.cleanup(QID);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, ProviderKind};

    #[test]
    fn parses_provider_and_flags() {
        let cli = Cli::try_parse_from(["quarry-core", "--provider", "files", "--exact", "report"])
            .unwrap();
        assert_eq!(cli.provider, ProviderKind::Files);
        assert!(cli.exact);
        assert!(!cli.single);
        assert_eq!(cli.query, "report");
    }

    #[test]
    fn defaults_to_desktop_applications_and_empty_query() {
        let cli = Cli::try_parse_from(["quarry-core"]).unwrap();
        assert_eq!(cli.provider, ProviderKind::DesktopApplications);
        assert_eq!(cli.query, "");
        assert_eq!(cli.provider.name(), "desktopapplications");
    }

    #[test]
    fn action_requires_activate() {
        assert!(Cli::try_parse_from(["quarry-core", "--action", "erase_history"]).is_err());
    }
}
