//! Graph analysis configuration
//!
//! Every tunable threshold of the graph builder, pattern analyzer and
//! recommendation engine lives here.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override (explicit path, else ~/.local/share/tally/config/graph.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Keys missing from an override keep their default value.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/graph.toml");

/// Policy for day buckets larger than `day_bucket_cap`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketOverflow {
    /// Enumerate pairs among `cap` evenly spaced transactions of the bucket
    Sample,
    /// Emit no same-day edges for the bucket
    Skip,
}

impl std::str::FromStr for BucketOverflow {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sample" => Ok(Self::Sample),
            "skip" => Ok(Self::Skip),
            _ => Err(format!("Unknown bucket overflow policy: {}", s)),
        }
    }
}

/// Graph builder settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuilderConfig {
    pub lookback_months: u32,
    pub adjacency_window_hours: f64,
    pub followed_by_floor: f64,
    pub day_offset_minutes: i32,
    pub day_bucket_cap: usize,
    pub bucket_overflow: BucketOverflow,
    pub batch_size: usize,
    pub batch_retries: u32,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            lookback_months: 6,
            adjacency_window_hours: 24.0,
            followed_by_floor: 0.3,
            day_offset_minutes: 0,
            day_bucket_cap: 200,
            bucket_overflow: BucketOverflow::Sample,
            batch_size: 100,
            batch_retries: 0,
        }
    }
}

impl BuilderConfig {
    /// Adjacency window in seconds
    pub fn window_secs(&self) -> f64 {
        self.adjacency_window_hours * 3600.0
    }

    /// Reference timezone used for day buckets
    pub fn day_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.day_offset_minutes * 60).ok_or_else(|| {
            Error::Config(format!(
                "day_offset_minutes out of range: {}",
                self.day_offset_minutes
            ))
        })
    }
}

/// Pattern analyzer settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisConfig {
    /// Relation types seen fewer times than this are not reported
    pub min_occurrences: usize,
    /// Minimum followed_by strength for a sequential pattern
    pub high_confidence: f64,
    pub sequential_burst_min: usize,
    pub same_day_min: usize,
    pub category_routine_min: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_occurrences: 2,
            high_confidence: 0.7,
            sequential_burst_min: 3,
            same_day_min: 5,
            category_routine_min: 3,
        }
    }
}

/// Recommendation engine settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationConfig {
    /// same_day count above which list-based shopping is suggested
    pub same_day_volume: usize,
    /// High-confidence sequences needed for the spending pause suggestion
    pub impulse_sequence_min: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            same_day_volume: 20,
            impulse_sequence_min: 10,
        }
    }
}

/// Full graph configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphConfig {
    pub builder: BuilderConfig,
    pub analysis: AnalysisConfig,
    pub recommendations: RecommendationConfig,
}

impl GraphConfig {
    /// Load configuration (explicit path, else data-dir override, else embedded default)
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        // An explicit path must exist; the data-dir override is optional
        let path = match override_path {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        let content = match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading graph config override");
                fs::read_to_string(&path)
                    .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?
            }
            None => DEFAULT_CONFIG.to_string(),
        };

        Self::parse(&content)
    }

    /// Parse config from TOML content, filling gaps with defaults
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

        let mut config = GraphConfig::default();

        if let Some(b) = raw.builder {
            let c = &mut config.builder;
            if let Some(v) = b.lookback_months {
                c.lookback_months = v;
            }
            if let Some(v) = b.adjacency_window_hours {
                c.adjacency_window_hours = v;
            }
            if let Some(v) = b.followed_by_floor {
                c.followed_by_floor = v;
            }
            if let Some(v) = b.day_offset_minutes {
                c.day_offset_minutes = v;
            }
            if let Some(v) = b.day_bucket_cap {
                c.day_bucket_cap = v;
            }
            if let Some(v) = b.bucket_overflow {
                c.bucket_overflow = v.parse().map_err(Error::Config)?;
            }
            if let Some(v) = b.batch_size {
                c.batch_size = v;
            }
            if let Some(v) = b.batch_retries {
                c.batch_retries = v;
            }
        }

        if let Some(a) = raw.analysis {
            let c = &mut config.analysis;
            if let Some(v) = a.min_occurrences {
                c.min_occurrences = v;
            }
            if let Some(v) = a.high_confidence {
                c.high_confidence = v;
            }
            if let Some(v) = a.sequential_burst_min {
                c.sequential_burst_min = v;
            }
            if let Some(v) = a.same_day_min {
                c.same_day_min = v;
            }
            if let Some(v) = a.category_routine_min {
                c.category_routine_min = v;
            }
        }

        if let Some(r) = raw.recommendations {
            let c = &mut config.recommendations;
            if let Some(v) = r.same_day_volume {
                c.same_day_volume = v;
            }
            if let Some(v) = r.impulse_sequence_min {
                c.impulse_sequence_min = v;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the builder and analyzer cannot work with
    pub fn validate(&self) -> Result<()> {
        let b = &self.builder;
        if !(b.adjacency_window_hours > 0.0) {
            return Err(Error::Config(
                "adjacency_window_hours must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&b.followed_by_floor) {
            return Err(Error::Config(
                "followed_by_floor must be within [0, 1]".to_string(),
            ));
        }
        if b.day_bucket_cap < 2 {
            return Err(Error::Config("day_bucket_cap must be at least 2".to_string()));
        }
        if b.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".to_string()));
        }
        b.day_offset()?;

        if !(0.0..=1.0).contains(&self.analysis.high_confidence) {
            return Err(Error::Config(
                "high_confidence must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }

    /// Render as TOML (for `tally config`)
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("config").join("graph.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    builder: Option<RawBuilder>,
    analysis: Option<RawAnalysis>,
    recommendations: Option<RawRecommendations>,
}

#[derive(Debug, Deserialize)]
struct RawBuilder {
    lookback_months: Option<u32>,
    adjacency_window_hours: Option<f64>,
    followed_by_floor: Option<f64>,
    day_offset_minutes: Option<i32>,
    day_bucket_cap: Option<usize>,
    bucket_overflow: Option<String>,
    batch_size: Option<usize>,
    batch_retries: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    min_occurrences: Option<usize>,
    high_confidence: Option<f64>,
    sequential_burst_min: Option<usize>,
    same_day_min: Option<usize>,
    category_routine_min: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawRecommendations {
    same_day_volume: Option<usize>,
    impulse_sequence_min: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_default_config() {
        let config = GraphConfig::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, GraphConfig::default());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = GraphConfig::parse(
            r#"
            [builder]
            adjacency_window_hours = 12.0
            bucket_overflow = "skip"

            [recommendations]
            same_day_volume = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.builder.adjacency_window_hours, 12.0);
        assert_eq!(config.builder.bucket_overflow, BucketOverflow::Skip);
        assert_eq!(config.builder.batch_size, 100);
        assert_eq!(config.analysis.high_confidence, 0.7);
        assert_eq!(config.recommendations.same_day_volume, 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(GraphConfig::parse("[builder]\nbatch_size = 0").is_err());
        assert!(GraphConfig::parse("[builder]\nfollowed_by_floor = 1.5").is_err());
        assert!(GraphConfig::parse("[builder]\nadjacency_window_hours = 0.0").is_err());
        assert!(GraphConfig::parse("[builder]\nday_bucket_cap = 1").is_err());
        assert!(GraphConfig::parse("[builder]\nbucket_overflow = \"drop\"").is_err());
        assert!(GraphConfig::parse("[analysis]\nhigh_confidence = -0.1").is_err());
        assert!(GraphConfig::parse("not toml [").is_err());
    }

    #[test]
    fn test_load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analysis]\nsame_day_min = 9").unwrap();

        let config = GraphConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.analysis.same_day_min, 9);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GraphConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = GraphConfig::default();
        let rendered = config.to_toml().unwrap();
        assert_eq!(GraphConfig::parse(&rendered).unwrap(), config);
    }
}
