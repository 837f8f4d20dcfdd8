//! Reloadable rule settings.
//!
//! The rule list itself is fixed; what deployments tune are the windows,
//! thresholds and enable flags below. Settings live in a YAML file and are
//! reloaded explicitly (startup or operator command), never by file
//! watching.

use std::path::Path;

use chrono::Duration;
use fault_model::Severity;
use serde::{Deserialize, Serialize};

use crate::error::RuleResult;

/// Garbage collection of cleared alarms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcSettings {
    /// Whether cleared alarms are garbage collected at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Retention for cleared, unacknowledged alarms (seconds)
    #[serde(default = "default_cleared_after_secs")]
    pub cleared_after_secs: u64,
    /// Retention for cleared, acknowledged alarms (seconds)
    #[serde(default = "default_cleared_acked_after_secs")]
    pub cleared_acked_after_secs: u64,
}

impl GcSettings {
    pub fn cleared_after(&self) -> Duration {
        Duration::seconds(self.cleared_after_secs as i64)
    }

    pub fn cleared_acked_after(&self) -> Duration {
        Duration::seconds(self.cleared_acked_after_secs as i64)
    }
}

impl Default for GcSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            cleared_after_secs: default_cleared_after_secs(),
            cleared_acked_after_secs: default_cleared_acked_after_secs(),
        }
    }
}

/// Trouble-ticket escalation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketSettings {
    /// Whether ticket rules run at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Minimum severity that escalates to a ticket
    #[serde(default = "default_severity_threshold")]
    pub severity_threshold: Severity,
    /// Escalation window before a ticket is created (seconds)
    #[serde(default = "default_create_after_secs")]
    pub create_after_secs: u64,
    /// Shorter escalation window for Critical alarms (seconds)
    #[serde(default = "default_create_after_critical_secs")]
    pub create_after_critical_secs: u64,
}

impl TicketSettings {
    pub fn create_after(&self) -> Duration {
        Duration::seconds(self.create_after_secs as i64)
    }

    pub fn create_after_critical(&self) -> Duration {
        Duration::seconds(self.create_after_critical_secs as i64)
    }
}

impl Default for TicketSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            severity_threshold: default_severity_threshold(),
            create_after_secs: default_create_after_secs(),
            create_after_critical_secs: default_create_after_critical_secs(),
        }
    }
}

/// Complete rule parameterization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSettings {
    #[serde(default)]
    pub garbage_collection: GcSettings,
    #[serde(default)]
    pub ticketing: TicketSettings,
}

impl RuleSettings {
    /// Load settings from a YAML file
    pub fn from_yaml_file(path: &Path) -> RuleResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}

fn default_true() -> bool {
    true
}

fn default_cleared_after_secs() -> u64 {
    2 * 60 * 60
}

fn default_cleared_acked_after_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_severity_threshold() -> Severity {
    Severity::Warning
}

fn default_create_after_secs() -> u64 {
    15 * 60
}

fn default_create_after_critical_secs() -> u64 {
    5 * 60
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = RuleSettings::default();
        assert!(settings.garbage_collection.enabled);
        assert_eq!(
            settings.garbage_collection.cleared_after(),
            Duration::hours(2)
        );
        assert_eq!(
            settings.garbage_collection.cleared_acked_after(),
            Duration::days(7)
        );
        assert_eq!(settings.ticketing.severity_threshold, Severity::Warning);
        assert_eq!(settings.ticketing.create_after(), Duration::minutes(15));
        assert_eq!(
            settings.ticketing.create_after_critical(),
            Duration::minutes(5)
        );
    }

    #[test]
    fn test_partial_yaml_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "garbage_collection:\n  cleared_after_secs: 600\nticketing:\n  enabled: false"
        )
        .unwrap();

        let settings = RuleSettings::from_yaml_file(file.path()).unwrap();
        assert_eq!(
            settings.garbage_collection.cleared_after(),
            Duration::minutes(10)
        );
        assert_eq!(
            settings.garbage_collection.cleared_acked_after(),
            Duration::days(7)
        );
        assert!(!settings.ticketing.enabled);
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "garbage_collection: [not, a, map]").unwrap();

        assert!(RuleSettings::from_yaml_file(file.path()).is_err());
    }
}
