//! Launch configuration for agent drivers

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Options handed to [`AgentDriver::launch`](crate::AgentDriver::launch).
///
/// Fields are optional so a stored configuration can be overridden
/// field-wise by a pre-setup hook; drivers fall back to their own defaults
/// for anything left unset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LaunchOptions {
    pub headless: Option<bool>,
    pub executable: Option<PathBuf>,
    pub user_data_dir: Option<PathBuf>,
    pub args: Option<Vec<String>>,
}

impl LaunchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = Some(headless);
        self
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = Some(executable.into());
        self
    }

    pub fn with_user_data_dir(mut self, user_data_dir: impl Into<PathBuf>) -> Self {
        self.user_data_dir = Some(user_data_dir.into());
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = Some(args);
        self
    }

    /// Field-wise merge: a field set in `overrides` wins, anything unset
    /// keeps the stored value.
    pub fn merged(mut self, overrides: LaunchOptions) -> Self {
        if overrides.headless.is_some() {
            self.headless = overrides.headless;
        }
        if overrides.executable.is_some() {
            self.executable = overrides.executable;
        }
        if overrides.user_data_dir.is_some() {
            self.user_data_dir = overrides.user_data_dir;
        }
        if overrides.args.is_some() {
            self.args = overrides.args;
        }
        self
    }
}

/// Screenshot encoding format.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageFormat::Jpeg => write!(f, "jpeg"),
            ImageFormat::Png => write!(f, "png"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overrides_win_field_wise() {
        let stored = LaunchOptions::new()
            .with_headless(true)
            .with_executable("/usr/bin/chromium");

        let merged = stored.merged(LaunchOptions::new().with_headless(false));

        assert_eq!(merged.headless, Some(false));
        assert_eq!(
            merged.executable,
            Some(PathBuf::from("/usr/bin/chromium"))
        );
        assert_eq!(merged.user_data_dir, None);
    }

    #[test]
    fn merge_with_empty_overrides_is_identity() {
        let stored = LaunchOptions::new()
            .with_headless(true)
            .with_args(vec!["--no-sandbox".into()]);

        let merged = stored.clone().merged(LaunchOptions::new());

        assert_eq!(merged, stored);
    }
}
