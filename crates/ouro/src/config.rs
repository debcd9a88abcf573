//! Layered configuration: built-in defaults, then the user-level config
//! file, then the project `ouro.toml`, then CLI flags (applied by the
//! binary).

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use etcetera::BaseStrategy;
use log::debug;
use serde::{Deserialize, Serialize};

/// Name of the per-project configuration file.
pub const PROJECT_CONFIG_FILE: &str = "ouro.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories searched for absolute imports, after the entry file's
    /// directory and `PYTHONPATH`.
    pub src: Vec<PathBuf>,
    /// Leave unresolved local-looking imports in place (with a warning)
    /// instead of aborting.
    pub allow_unresolved: bool,
    /// Remove docstrings from the bundled output.
    pub strip_docstrings: bool,
    /// Require package initializers to actually bind a re-exported symbol;
    /// a bare `__all__` listing is not accepted.
    pub strict_reexports: bool,
    /// Suppress inline markers and consolidate external imports into a
    /// header block.
    pub release: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src: vec![PathBuf::from(".")],
            allow_unresolved: false,
            strip_docstrings: false,
            strict_reexports: false,
            release: false,
        }
    }
}

/// Partial configuration as read from a single TOML file. Absent keys leave
/// the lower layer untouched.
#[derive(Debug, Default, Deserialize)]
struct ConfigOverlay {
    src: Option<Vec<PathBuf>>,
    allow_unresolved: Option<bool>,
    strip_docstrings: Option<bool>,
    strict_reexports: Option<bool>,
    release: Option<bool>,
}

impl Config {
    /// Load configuration with the standard layering. `project_file` is the
    /// explicit `--config` path; when `None`, `ouro.toml` in the current
    /// directory is used if present.
    pub fn load(project_file: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_file) = user_config_path()
            && user_file.is_file()
        {
            debug!("Loading user config from {}", user_file.display());
            config.apply_file(&user_file)?;
        }

        match project_file {
            Some(path) => config.apply_file(path)?,
            None => {
                let default_path = Path::new(PROJECT_CONFIG_FILE);
                if default_path.is_file() {
                    config.apply_file(default_path)?;
                }
            }
        }

        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<()> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let overlay: ConfigOverlay = toml::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        self.apply(overlay);
        Ok(())
    }

    fn apply(&mut self, overlay: ConfigOverlay) {
        if let Some(src) = overlay.src {
            self.src = src;
        }
        if let Some(allow_unresolved) = overlay.allow_unresolved {
            self.allow_unresolved = allow_unresolved;
        }
        if let Some(strip_docstrings) = overlay.strip_docstrings {
            self.strip_docstrings = strip_docstrings;
        }
        if let Some(strict_reexports) = overlay.strict_reexports {
            self.strict_reexports = strict_reexports;
        }
        if let Some(release) = overlay.release {
            self.release = release;
        }
    }
}

/// `<user config dir>/ouro/ouro.toml`, if a home directory can be found.
fn user_config_path() -> Option<PathBuf> {
    let strategy = etcetera::choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("ouro").join(PROJECT_CONFIG_FILE))
}
