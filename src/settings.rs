use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "availability.toml";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; DataAvailabilityBot/1.0)";
const DEFAULT_TIMEOUT_SECS: i64 = 20;
const DEFAULT_CONCURRENCY: i64 = 4;

/// Run settings. Layered: built-in defaults, then `availability.toml` (or the
/// file given with `--config`), then `AVAIL_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub concurrency: usize,
    pub taxonomy_dir: PathBuf,
    pub debug_dir: PathBuf,
    /// Extra vendor content-type labels, on top of the built-in mapping.
    #[serde(default)]
    pub type_map: HashMap<String, String>,
}

impl Settings {
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let (path, required) = match file {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let settings: Settings = Config::builder()
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .set_default("timeout_secs", DEFAULT_TIMEOUT_SECS)?
            .set_default("concurrency", DEFAULT_CONCURRENCY)?
            .set_default("taxonomy_dir", "taxonomies")?
            .set_default("debug_dir", "debug")?
            .add_source(File::from(path.clone()).required(required))
            .add_source(Environment::with_prefix("AVAIL").try_parsing(true))
            .build()
            .with_context(|| format!("Failed to read settings from {}", path.display()))?
            .try_deserialize()
            .context("Invalid settings")?;

        Ok(settings)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(Settings::load(Some(&missing)).is_err());
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "timeout_secs = 5\nconcurrency = 1\ndebug_dir = \"pages\"\n\n[type_map]\nshort_communication = \"letter\""
        )
        .unwrap();
        let s = Settings::load(Some(file.path())).unwrap();
        assert_eq!(s.timeout(), Duration::from_secs(5));
        assert_eq!(s.concurrency, 1);
        assert_eq!(s.debug_dir, PathBuf::from("pages"));
        assert_eq!(s.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(s.taxonomy_dir, PathBuf::from("taxonomies"));
        assert_eq!(s.type_map.get("short_communication").map(String::as_str), Some("letter"));
    }
}
