//! External link launching for activation overrides (install pages).

#[cfg(test)]
use std::sync::{Mutex, PoisonError};

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: &'static str,
        source: std::io::Error,
    },
}

/// Opens a URL outside the application.
pub trait LinkOpener: Send + Sync {
    /// Open `url` in the browsing context named `target`. Must not block.
    fn open(&self, url: &str, target: &str) -> Result<(), LaunchError>;
}

/// Hands the URL to the desktop's default opener.
///
/// The opener process is spawned and left to run; its exit status is not
/// awaited.
#[derive(Debug, Default)]
pub struct SystemLinkOpener;

impl SystemLinkOpener {
    #[cfg(target_os = "macos")]
    const PROGRAM: &'static str = "open";
    #[cfg(not(target_os = "macos"))]
    const PROGRAM: &'static str = "xdg-open";
}

impl LinkOpener for SystemLinkOpener {
    fn open(&self, url: &str, target: &str) -> Result<(), LaunchError> {
        tokio::process::Command::new(Self::PROGRAM)
            .arg(url)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: Self::PROGRAM,
                source,
            })?;
        tracing::debug!(url, target, program = Self::PROGRAM, "opened external link");
        Ok(())
    }
}

/// Prints the link to stderr instead of opening it (`--no-open`).
#[derive(Debug, Default)]
pub struct PrintLinkOpener;

impl LinkOpener for PrintLinkOpener {
    fn open(&self, url: &str, _target: &str) -> Result<(), LaunchError> {
        eprintln!("Open {url} to install a browser wallet");
        Ok(())
    }
}

/// Remembers opened links.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingLinkOpener {
    opened: Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl RecordingLinkOpener {
    pub fn opened(&self) -> Vec<(String, String)> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
impl LinkOpener for RecordingLinkOpener {
    fn open(&self, url: &str, target: &str) -> Result<(), LaunchError> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((url.to_string(), target.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_opener_keeps_order() {
        let opener = RecordingLinkOpener::default();
        opener.open("https://a.example/", "a").unwrap();
        opener.open("https://b.example/", "b").unwrap();
        assert_eq!(
            opener.opened(),
            vec![
                ("https://a.example/".to_string(), "a".to_string()),
                ("https://b.example/".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn print_opener_never_fails() {
        assert!(PrintLinkOpener.open("https://metamask.io/", "inst_metamask").is_ok());
    }
}
