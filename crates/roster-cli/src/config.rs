use anyhow::{bail, Context, Result};
use roster_core::{is_valid_tolerance, parse_tolerance, MatchPolicy, DEFAULT_TOLERANCE};
use roster_engine::DEFAULT_LOCATION;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// CLI configuration: TOML file, then `ROSTER_*` environment overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// SQLite database holding both identities and check-ins.
    pub db_path: PathBuf,
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Frames discarded after opening the camera (auto-exposure settling).
    pub warmup_frames: usize,
    /// Maximum embedding distance accepted as a match.
    pub tolerance: f64,
    /// Registry-wide match policy used by `identify`.
    pub match_policy: MatchPolicy,
    /// Embedding dimension produced by the extractor.
    pub embedding_dim: usize,
    /// Location recorded when `checkin` is given none.
    pub default_location: String,
    /// Face embedding program; receives an image path as its last argument.
    pub extractor_cmd: Option<String>,
    /// Handwriting/text recognition program, for `--name-from`.
    pub ocr_cmd: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: data_dir().join("roster.db"),
            camera_device: "/dev/video0".to_string(),
            warmup_frames: 2,
            tolerance: DEFAULT_TOLERANCE,
            match_policy: MatchPolicy::First,
            embedding_dim: 128,
            default_location: DEFAULT_LOCATION.to_string(),
            extractor_cmd: None,
            ocr_cmd: None,
        }
    }
}

impl Config {
    /// Load from `ROSTER_CONFIG` (or the XDG default path, if present), then
    /// apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os("ROSTER_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => {
                let path = config_dir().join("config.toml");
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Reject values no attempt can run with.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_tolerance(self.tolerance) {
            bail!(
                "tolerance must be a finite number >= 0, got {}",
                self.tolerance
            );
        }
        if self.embedding_dim == 0 {
            bail!("embedding_dim must be at least 1");
        }
        Ok(())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Override fields from `ROSTER_*` variables. Unparseable values are
    /// ignored with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("ROSTER_DB_PATH") {
            self.db_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("ROSTER_CAMERA_DEVICE") {
            self.camera_device = v;
        }
        parse_into(&lookup, "ROSTER_WARMUP_FRAMES", &mut self.warmup_frames);
        if let Some(raw) = lookup("ROSTER_TOLERANCE") {
            match parse_tolerance(&raw) {
                Ok(v) => self.tolerance = v,
                Err(e) => {
                    tracing::warn!(key = "ROSTER_TOLERANCE", error = %e, "ignoring invalid environment override")
                }
            }
        }
        parse_into(&lookup, "ROSTER_MATCH_POLICY", &mut self.match_policy);
        parse_into(&lookup, "ROSTER_EMBEDDING_DIM", &mut self.embedding_dim);
        if let Some(v) = lookup("ROSTER_DEFAULT_LOCATION") {
            self.default_location = v;
        }
        if let Some(v) = lookup("ROSTER_EXTRACTOR_CMD") {
            self.extractor_cmd = Some(v);
        }
        if let Some(v) = lookup("ROSTER_OCR_CMD") {
            self.ocr_cmd = Some(v);
        }
    }
}

fn parse_into<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T)
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(v) => *slot = v,
        Err(e) => tracing::warn!(key, value = %raw, error = %e, "ignoring invalid environment override"),
    }
}

fn home() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string()))
}

fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home().join(".local/share"))
        .join("roster")
}

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home().join(".config"))
        .join("roster")
}
