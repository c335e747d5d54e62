use anyhow::{Context, Result, bail};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::edit::EmptyReviewPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncoreConfig {
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub engagement: EngagementConfig,
    #[serde(default)]
    pub edit: EditConfig,
    #[serde(default)]
    pub images: ImageConfig,
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Offset used for calendar arithmetic (month/year windows, date bounds).
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
    #[serde(default = "default_recent_days")]
    pub recent_days: u32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
            recent_days: default_recent_days(),
        }
    }
}

impl ArchiveConfig {
    /// Parse `utc_offset` (`+HH:MM`, `-HH:MM`, `Z` or `UTC`).
    ///
    /// # Errors
    ///
    /// Returns an error when the offset is malformed or out of range.
    pub fn offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.utc_offset)
            .with_context(|| format!("invalid archive.utc_offset '{}'", self.utc_offset))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngagementConfig {
    /// Queue like toggles per ticket instead of letting them race.
    #[serde(default)]
    pub serialize_toggles: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditConfig {
    #[serde(default)]
    pub empty_review: EmptyReviewPolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Base URL joined to relative image paths returned by the backend.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Load a config file; a missing file yields defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<EncoreConfig> {
    if !path.exists() {
        return Ok(EncoreConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<EncoreConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Path of the per-user config file, if the platform has a config dir.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("encore/config.toml"))
}

/// Load `<config dir>/encore/config.toml`, or defaults when absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<EncoreConfig> {
    let Some(path) = user_config_path() else {
        return Ok(EncoreConfig::default());
    };
    load_config(&path)
}

/// Explicit path wins; otherwise the user config.
///
/// # Errors
///
/// Propagates read/parse failures from the chosen file.
pub fn resolve_config(explicit: Option<&Path>) -> Result<EncoreConfig> {
    match explicit {
        Some(path) => load_config(path),
        None => load_user_config(),
    }
}

fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).context("zero offset");
    }

    let (sign, rest) = match trimmed.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => bail!("offset must start with '+' or '-'"),
    };
    let Some((hours, minutes)) = rest.split_once(':') else {
        bail!("offset must look like +HH:MM");
    };
    let hours: i32 = hours.parse().context("offset hours")?;
    let minutes: i32 = minutes.parse().context("offset minutes")?;
    if !(0..60).contains(&minutes) {
        bail!("offset minutes out of range");
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).context("offset out of range")
}

fn default_utc_offset() -> String {
    "+09:00".to_string()
}

const fn default_recent_days() -> u32 {
    7
}
