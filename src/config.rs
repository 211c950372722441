//! Dispatch configuration.
//!
//! YAML configuration with precedence: ENV > file > defaults.
//!
//! ```yaml
//! version: 1
//! device: parallel
//! limits:
//!   max_groups: 8192
//!   max_lanes_per_group: 512
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::accel::launch::{LaunchLimits, DEFAULT_UNROLL};
use crate::error::{Error, Result};

/// Environment override for [`LaunchLimits::max_groups`].
pub const ENV_MAX_GROUPS: &str = "TRUENO_TILING_MAX_GROUPS";

/// Environment override for [`LaunchLimits::max_lanes_per_group`].
pub const ENV_MAX_LANES: &str = "TRUENO_TILING_MAX_LANES";

/// Execution backend selected by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Same-thread host device.
    #[default]
    Host,
    /// Multi-threaded device (requires the `parallel` feature).
    Parallel,
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Configuration version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Backend to run launches on.
    #[serde(default)]
    pub device: DeviceKind,

    /// Launch limits used for partitioning.
    #[serde(default)]
    pub limits: LaunchLimits,
}

fn default_version() -> u32 {
    1
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            device: DeviceKind::default(),
            limits: LaunchLimits::default(),
        }
    }
}

impl DispatchConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|_| Error::ConfigNotFound(path.display().to_string()))?;

        Self::parse(&content)
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error with line number if parsing fails.
    pub fn parse(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| {
            let line = e.location().map(|l| l.line()).unwrap_or(0);
            Error::ConfigParse {
                line,
                message: e.to_string(),
            }
        })
    }

    /// Loads configuration with fallback to defaults.
    #[must_use]
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Applies `TRUENO_TILING_MAX_GROUPS` and `TRUENO_TILING_MAX_LANES`.
    ///
    /// Values that are not positive integers are ignored.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up through `lookup`.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(groups) = positive_override(ENV_MAX_GROUPS, &lookup) {
            self.limits.max_groups = groups;
        }
        if let Some(lanes) = positive_override(ENV_MAX_LANES, &lookup) {
            self.limits.max_lanes_per_group = lanes;
        }
        self
    }

    /// Checks the configuration for unusable values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigInvalid`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(Error::ConfigInvalid {
                key: "version".to_string(),
                message: format!("unsupported version {}", self.version),
            });
        }
        if self.limits.max_groups == 0 {
            return Err(Error::ConfigInvalid {
                key: "limits.max_groups".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.limits.max_lanes_per_group == 0 {
            return Err(Error::ConfigInvalid {
                key: "limits.max_lanes_per_group".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.limits.checked_elements_per_launch(DEFAULT_UNROLL).is_none() {
            return Err(Error::ConfigInvalid {
                key: "limits".to_string(),
                message: format!(
                    "max_groups * max_lanes_per_group * {DEFAULT_UNROLL} overflows usize"
                ),
            });
        }
        Ok(())
    }

    /// Launch limits for the scheduler.
    #[must_use]
    pub fn limits(&self) -> LaunchLimits {
        self.limits
    }
}

fn positive_override(key: &str, lookup: &impl Fn(&str) -> Option<String>) -> Option<usize> {
    let raw = lookup(key)?;
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            log::warn!("ignoring {key}={raw:?}: expected a positive integer");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = DispatchConfig::new();

        assert_eq!(config.version, 1);
        assert_eq!(config.device, DeviceKind::Host);
        assert_eq!(config.limits.max_groups, 8192);
        assert_eq!(config.limits.max_lanes_per_group, 512);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_parse_minimal() {
        let config = DispatchConfig::parse("version: 1").unwrap();
        assert_eq!(config, DispatchConfig::default());
    }

    #[test]
    fn test_config_parse_full() {
        let yaml = r#"
version: 1
device: parallel
limits:
  max_groups: 64
  max_lanes_per_group: 128
"#;

        let config = DispatchConfig::parse(yaml).unwrap();

        assert_eq!(config.device, DeviceKind::Parallel);
        assert_eq!(config.limits().max_groups, 64);
        assert_eq!(config.limits().max_lanes_per_group, 128);
    }

    #[test]
    fn test_config_partial_limits_keep_defaults() {
        let yaml = "limits:\n  max_groups: 3\n";
        let config = DispatchConfig::parse(yaml).unwrap();
        assert_eq!(config.limits.max_groups, 3);
        assert_eq!(config.limits.max_lanes_per_group, 512);
    }

    #[test]
    fn test_config_parse_error_includes_line() {
        let yaml = r#"
version: 1
limits:
  max_groups: lots
"#;

        let err = DispatchConfig::parse(yaml).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
        assert!(err.to_string().contains('4'), "Error should include line number: {err}");
    }

    #[test]
    fn test_config_unknown_device_rejected() {
        assert!(DispatchConfig::parse("device: fpga").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = DispatchConfig::new();
        config.limits.max_lanes_per_group = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_lanes_per_group"));
    }

    #[test]
    fn test_validate_rejects_overflowing_limits() {
        let huge = (usize::MAX / 2).to_string();
        let config = DispatchConfig::new().with_overrides(|key| match key {
            ENV_MAX_LANES => Some(huge.clone()),
            _ => None,
        });
        assert_eq!(config.limits.max_lanes_per_group, usize::MAX / 2);

        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { ref key, .. } if key == "limits"));
        assert!(crate::accel::scheduler_from_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_version() {
        let config = DispatchConfig::parse("version: 2").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_apply_positive_values() {
        let config = DispatchConfig::new().with_overrides(|key| match key {
            ENV_MAX_GROUPS => Some("16".to_string()),
            ENV_MAX_LANES => Some(" 32 ".to_string()),
            _ => None,
        });
        assert_eq!(config.limits.max_groups, 16);
        assert_eq!(config.limits.max_lanes_per_group, 32);
    }

    #[test]
    fn test_overrides_ignore_invalid_values() {
        let config = DispatchConfig::new().with_overrides(|key| match key {
            ENV_MAX_GROUPS => Some("0".to_string()),
            ENV_MAX_LANES => Some("wide".to_string()),
            _ => None,
        });
        assert_eq!(config.limits, LaunchLimits::default());
    }

    #[test]
    fn test_config_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "limits:\n  max_lanes_per_group: 256").unwrap();

        let config = DispatchConfig::load(file.path()).unwrap();
        assert_eq!(config.limits.max_lanes_per_group, 256);
    }

    #[test]
    fn test_config_load_missing_file() {
        let err = DispatchConfig::load("/nonexistent/tiling.yaml").unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }

    #[test]
    fn test_config_load_or_default() {
        let config = DispatchConfig::load_or_default("/nonexistent/path");
        assert_eq!(config.version, 1);
    }
}
