//! Run configuration.
//!
//! Values come from an optional TOML file and are then overridden by command
//! line flags. Every field has a default, so an empty file (or no file) runs
//! March to June 2025 from the current directory.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::Period;

/// File name patterns for the five per-period sources. `{period}` is
/// replaced by the `MM-YYYY` suffix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcePatterns {
    pub bookings: String,
    pub tours: String,
    pub guides: String,
    pub availability: String,
    pub skills: String,
}

impl Default for SourcePatterns {
    fn default() -> Self {
        Self {
            bookings: "bookings_{period}.csv".to_string(),
            tours: "tours_{period}.csv".to_string(),
            guides: "guides_{period}.csv".to_string(),
            availability: "guide_avail_{period}.csv".to_string(),
            skills: "guide_skills_{period}.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub year: i32,
    /// Month codes, e.g. `["03", "04"]`.
    pub periods: Vec<String>,
    /// Optional display labels keyed by month code.
    pub labels: BTreeMap<String, String>,
    pub top_n: usize,
    pub preview_rows: usize,
    pub sources: SourcePatterns,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            output_dir: PathBuf::from("reports"),
            year: 2025,
            periods: vec!["03".into(), "04".into(), "05".into(), "06".into()],
            labels: BTreeMap::new(),
            top_n: 10,
            preview_rows: 5,
            sources: SourcePatterns::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<string>"),
            message: e.to_string(),
        })
    }

    /// Resolve the configured month codes into periods, in order.
    pub fn resolve_periods(&self) -> Result<Vec<Period>, ConfigError> {
        if self.periods.is_empty() {
            return Err(ConfigError::Invalid("no periods configured".into()));
        }
        let mut out = Vec::with_capacity(self.periods.len());
        for code in &self.periods {
            let month: u32 = code
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("bad month code '{}'", code)))?;
            let period = Period::new(month, self.year)
                .ok_or_else(|| ConfigError::Invalid(format!("month out of range '{}'", code)))?;
            let period = match self.labels.get(&period.code()) {
                Some(label) => period.with_label(label.clone()),
                None => period,
            };
            if out.contains(&period) {
                return Err(ConfigError::Invalid(format!("duplicate period '{}'", code)));
            }
            out.push(period);
        }
        Ok(out)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be at least 1".into()));
        }
        self.resolve_periods().map(|_| ())
    }

    pub fn source_path(&self, pattern: &str, period: &Period) -> PathBuf {
        self.data_dir
            .join(pattern.replace("{period}", &period.suffix()))
    }
}
