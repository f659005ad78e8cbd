//! Configuration loaded from `pobieracz.toml`.
//!
//! Every key is optional; the defaults reproduce the reference behaviour
//! (`img/` output, 1024-byte chunks, ten 100 ms progress steps, "Unknown"
//! placeholders). `POBIERACZ_OUTPUT_DIR` overrides the file's output dir.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::extractor::Extractor;
use crate::transfer::DEFAULT_CHUNK_SIZE;
use crate::workflow::{AUTHOR_FIELD, IMAGE_URL_FIELD, TITLE_FIELD, WorkflowSettings};

pub const DEFAULT_CONFIG_PATH: &str = "pobieracz.toml";
const OUTPUT_DIR_ENV: &str = "POBIERACZ_OUTPUT_DIR";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PobieraczConfig {
    /// Directory downloaded images are written into.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Bytes written per chunk; cancellation is checked between chunks.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Percent added per simulated progress step (1..=100).
    #[serde(default = "default_progress_step_percent")]
    pub progress_step_percent: u32,

    /// Pause before each progress step, in milliseconds.
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,

    /// Connect timeout only. Body reads are never timed out.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Shown in place of a title or author the input does not carry.
    #[serde(default = "default_unknown_placeholder")]
    pub unknown_placeholder: String,

    /// `[fields]` table: which JSON keys to search.
    #[serde(default)]
    pub fields: FieldKeys,
}

/// JSON keys searched for each extracted field.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldKeys {
    // Key holding the title.
    #[serde(default = "default_title_key")]
    pub title: String,
    // Key holding the author.
    #[serde(default = "default_author_key")]
    pub author: String,
    // Key holding the image URL to download.
    #[serde(default = "default_image_url_key")]
    pub image_url: String,
}

// Relative to the working directory.
fn default_output_dir() -> PathBuf {
    PathBuf::from("img")
}

// 1 KiB.
fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

// Eleven events: 0%, 10%, ..., 100%.
fn default_progress_step_percent() -> u32 {
    10
}

// About a second of simulated work in total.
fn default_step_delay_ms() -> u64 {
    100
}

// Connect phase only; see `Transfer::build_client`.
fn default_connect_timeout_secs() -> u64 {
    10
}

// Also written into the run report.
fn default_unknown_placeholder() -> String {
    "Unknown".to_string()
}

// Same name as the field.
fn default_title_key() -> String {
    "title".to_string()
}

// The author travels under the image's copyright line.
fn default_author_key() -> String {
    "copyright".to_string()
}

// The image the snippet points at.
fn default_image_url_key() -> String {
    "url".to_string()
}

impl Default for FieldKeys {
    fn default() -> Self {
        Self {
            title: default_title_key(),
            author: default_author_key(),
            image_url: default_image_url_key(),
        }
    }
}

impl Default for PobieraczConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            chunk_size: default_chunk_size(),
            progress_step_percent: default_progress_step_percent(),
            step_delay_ms: default_step_delay_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            unknown_placeholder: default_unknown_placeholder(),
            fields: FieldKeys::default(),
        }
    }
}

impl PobieraczConfig {
    /// Loads `path` if it exists, otherwise defaults, then applies the
    /// environment override and validates.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<PobieraczConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_output_dir(std::env::var(OUTPUT_DIR_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies a `POBIERACZ_OUTPUT_DIR` value. Unset or empty leaves the
    /// configured directory alone.
    pub fn apply_env_output_dir(&mut self, value: Option<String>) {
        if let Some(dir) = value
            && !dir.is_empty()
        {
            self.output_dir = PathBuf::from(dir);
        }
    }

    /// Applies `--output-dir`, which beats both the file and the environment.
    pub fn apply_cli_output_dir(&mut self, dir: Option<PathBuf>) {
        if let Some(dir) = dir {
            self.output_dir = dir;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk_size must be greater than zero");
        }
        if !(1..=100).contains(&self.progress_step_percent) {
            bail!(
                "progress_step_percent must be between 1 and 100, got {}",
                self.progress_step_percent
            );
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            output_dir: self.output_dir.clone(),
            progress_step_percent: self.progress_step_percent,
            step_delay: Duration::from_millis(self.step_delay_ms),
            unknown_placeholder: self.unknown_placeholder.clone(),
        }
    }

    /// Extractor for the configured keys, under the workflow's field names.
    pub fn extractor(&self) -> Result<Extractor> {
        Extractor::for_keys([
            (TITLE_FIELD, self.fields.title.as_str()),
            (AUTHOR_FIELD, self.fields.author.as_str()),
            (IMAGE_URL_FIELD, self.fields.image_url.as_str()),
        ])
        .context("invalid field key in configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = PobieraczConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("img"));
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.progress_step_percent, 10);
        assert_eq!(config.step_delay_ms, 100);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.unknown_placeholder, "Unknown");
        assert_eq!(config.fields.title, "title");
        assert_eq!(config.fields.author, "copyright");
        assert_eq!(config.fields.image_url, "url");
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            chunk_size = 4096
            step_delay_ms = 0

            [fields]
            author = "photographer"
        "#;
        let config: PobieraczConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.step_delay_ms, 0);
        assert_eq!(config.fields.author, "photographer");
        assert_eq!(config.fields.title, "title");
        assert_eq!(config.output_dir, PathBuf::from("img"));
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = PobieraczConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.chunk_size, 1024);
    }

    #[test]
    fn load_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pobieracz.toml");
        std::fs::write(&path, "progress_step_percent = 25\nunknown_placeholder = \"?\"\n").unwrap();

        let config = PobieraczConfig::load(&path).unwrap();
        assert_eq!(config.progress_step_percent, 25);
        assert_eq!(config.unknown_placeholder, "?");
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pobieracz.toml");
        std::fs::write(&path, "chunk_size = \"big\"").unwrap();

        let err = PobieraczConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn env_output_dir_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pobieracz.toml");
        std::fs::write(&path, "output_dir = \"from-file\"\n").unwrap();

        let mut config = PobieraczConfig::load(&path).unwrap();
        config.apply_env_output_dir(Some("from-env".into()));
        assert_eq!(config.output_dir, PathBuf::from("from-env"));
    }

    #[test]
    fn empty_or_unset_env_output_dir_is_ignored() {
        let mut config = PobieraczConfig {
            output_dir: PathBuf::from("from-file"),
            ..Default::default()
        };
        config.apply_env_output_dir(Some(String::new()));
        assert_eq!(config.output_dir, PathBuf::from("from-file"));
        config.apply_env_output_dir(None);
        assert_eq!(config.output_dir, PathBuf::from("from-file"));
    }

    #[test]
    fn cli_output_dir_beats_env() {
        let mut config = PobieraczConfig::default();
        config.apply_env_output_dir(Some("from-env".into()));
        config.apply_cli_output_dir(Some(PathBuf::from("from-cli")));
        assert_eq!(config.output_dir, PathBuf::from("from-cli"));

        config.apply_cli_output_dir(None);
        assert_eq!(config.output_dir, PathBuf::from("from-cli"));
    }

    #[test]
    fn load_applies_output_dir_env() {
        // The only test touching this variable, so no other test races it.
        let dir = TempDir::new().unwrap();
        unsafe { std::env::set_var(OUTPUT_DIR_ENV, "env-pictures") };
        let loaded = PobieraczConfig::load(&dir.path().join("absent.toml"));
        unsafe { std::env::remove_var(OUTPUT_DIR_ENV) };
        assert_eq!(loaded.unwrap().output_dir, PathBuf::from("env-pictures"));
    }

    #[test]
    fn validate_rejects_zero_chunk_size() {
        let config = PobieraczConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_step() {
        for step in [0, 101] {
            let config = PobieraczConfig {
                progress_step_percent: step,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "step {step}");
        }
    }

    #[test]
    fn workflow_settings_mirror_config() {
        let config = PobieraczConfig {
            step_delay_ms: 250,
            ..Default::default()
        };
        let settings = config.workflow_settings();
        assert_eq!(settings.step_delay, Duration::from_millis(250));
        assert_eq!(settings.output_dir, PathBuf::from("img"));
        assert_eq!(settings.unknown_placeholder, "Unknown");
    }

    #[test]
    fn extractor_uses_configured_keys() {
        let config = PobieraczConfig {
            fields: FieldKeys {
                author: "photographer".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let result = config
            .extractor()
            .unwrap()
            .extract(r#"{"copyright":"no","photographer":"yes"}"#);
        assert_eq!(result.get(AUTHOR_FIELD), "yes");
    }
}
