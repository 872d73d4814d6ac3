use std::path::{Path, PathBuf};

use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LaunchError {
    #[error("empty launch target")]
    EmptyTarget,
    #[error("path does not exist: {}", .0.display())]
    MissingPath(PathBuf),
    #[error("unsupported url: {0}")]
    UnsupportedUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchTarget<'a> {
    DesktopEntry {
        identifier: &'a str,
        action: Option<&'a str>,
    },
    Path(&'a str),
    Url(&'a str),
}

/// Hands an activated result to whatever actually starts processes.
pub trait Launcher: Send + Sync {
    fn launch(&self, target: &LaunchTarget<'_>) -> Result<(), LaunchError>;
}

/// Checks that a target is launchable and logs it. Spawning is left to the
/// host.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatingLauncher;

impl Launcher for ValidatingLauncher {
    fn launch(&self, target: &LaunchTarget<'_>) -> Result<(), LaunchError> {
        match target {
            LaunchTarget::DesktopEntry { identifier, action } => {
                if identifier.trim().is_empty() {
                    return Err(LaunchError::EmptyTarget);
                }
                info!(identifier, action = action.unwrap_or_default(), "launch desktop entry");
                Ok(())
            }
            LaunchTarget::Path(path) => {
                launch_path(path)?;
                info!(path, "launch path");
                Ok(())
            }
            LaunchTarget::Url(url) => {
                let trimmed = url.trim();
                if trimmed.is_empty() {
                    return Err(LaunchError::EmptyTarget);
                }
                if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
                    return Err(LaunchError::UnsupportedUrl(trimmed.to_string()));
                }
                info!(url = trimmed, "launch url");
                Ok(())
            }
        }
    }
}

pub fn launch_path(path: &str) -> Result<(), LaunchError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(LaunchError::EmptyTarget);
    }

    let candidate = Path::new(trimmed);
    if !candidate.exists() {
        return Err(LaunchError::MissingPath(candidate.to_path_buf()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{LaunchError, LaunchTarget, Launcher, ValidatingLauncher};

    #[test]
    fn rejects_missing_path() {
        let launcher = ValidatingLauncher;
        let result = launcher.launch(&LaunchTarget::Path("/definitely/not/here.txt"));
        assert!(matches!(result, Err(LaunchError::MissingPath(_))));
    }

    #[test]
    fn accepts_http_urls_only() {
        let launcher = ValidatingLauncher;
        assert!(launcher
            .launch(&LaunchTarget::Url("https://duckduckgo.com/?q=rust"))
            .is_ok());
        assert!(matches!(
            launcher.launch(&LaunchTarget::Url("file:///etc/passwd")),
            Err(LaunchError::UnsupportedUrl(_))
        ));
    }

    #[test]
    fn empty_path_is_rejected() {
        assert_eq!(super::launch_path("  "), Err(LaunchError::EmptyTarget));
    }
}
