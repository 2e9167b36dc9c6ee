//! Harness configuration shared by the library entry points and the CLI.

use std::path::PathBuf;

use crate::discovery::DEFAULT_SUFFIXES;
use crate::runner::RunOptions;

/// Where to look for description files and how to present results.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub root: PathBuf,
    pub suffixes: Vec<String>,
    /// Case-name substring filter.
    pub filter: Option<String>,
    pub use_colors: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("tests"),
            suffixes: DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            filter: None,
            use_colors: atty::is(atty::Stream::Stderr),
        }
    }
}

impl HarnessConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            filter: self.filter.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_root_keeps_defaults_and_forwards_filter() {
        let mut config = HarnessConfig::with_root("specs");
        assert_eq!(config.root, PathBuf::from("specs"));
        assert_eq!(config.suffixes, DEFAULT_SUFFIXES);

        config.filter = Some("add".into());
        assert_eq!(config.run_options().filter.as_deref(), Some("add"));
    }
}
