//! Config validation: unknown-key detection with Levenshtein suggestions
//! and operational range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization.

use std::collections::HashSet;

use super::MonitorConfig;
use crate::types::{OperatingMode, Quantity};

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

const PROFILE_FIELDS: [&str; 5] = ["direction", "normal_min", "normal_max", "warning", "critical"];

/// Returns the complete set of valid dotted key paths for `MonitorConfig`.
///
/// Threshold keys are generated from the mode and quantity enums; the rest
/// must match the section structs in `monitor_config.rs`.
pub fn known_config_keys() -> HashSet<String> {
    let fixed: &[&str] = &[
        "monitor",
        "monitor.initial_mode",
        "server",
        "server.addr",
        "backend",
        "backend.base_url",
        "backend.api_token",
        "backend.timeout_secs",
        "polling",
        "polling.interval_ms",
        "alerts",
        "alerts.max_alerts",
        "alerts.realert_after_secs",
        "upload",
        "upload.max_file_bytes",
        "upload.allowed_extensions",
        "thresholds",
    ];
    let mut keys: HashSet<String> = fixed.iter().map(ToString::to_string).collect();

    for mode in OperatingMode::ALL {
        let mode_key = format!("thresholds.{mode}");
        for quantity in Quantity::ALL {
            let q_key = format!("{mode_key}.{quantity}");
            for field in PROFILE_FIELDS {
                keys.insert(format!("{q_key}.{field}"));
            }
            keys.insert(q_key);
        }
        keys.insert(mode_key);
    }
    keys
}

/// Recursively walk a TOML value tree and return all dotted key paths.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<String>) -> Option<String> {
    known
        .iter()
        .map(|k| (k, levenshtein(unknown, k)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.clone())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys; serde decides what is fatal.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key))
        .map(|key| {
            let suggestion = suggest_correction(&key, &known);
            ValidationWarning {
                message: format!("Unknown config key '{key}'"),
                field: key,
                suggestion,
            }
        })
        .collect()
}

// ============================================================================
// Operational Range Validation
// ============================================================================

/// Flag values that are legal but probably not what the operator meant.
pub fn validate_ranges(config: &MonitorConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut warn = |field: &str, message: String| {
        warnings.push(ValidationWarning {
            field: field.to_string(),
            message,
            suggestion: None,
        });
    };

    let interval = config.polling.interval_ms;
    if interval > 0 && interval < 500 {
        warn(
            "polling.interval_ms",
            format!("polling.interval_ms = {interval} polls the backend more than twice a second"),
        );
    }
    if interval > 300_000 {
        warn(
            "polling.interval_ms",
            format!("polling.interval_ms = {interval} leaves the dashboard stale for over 5 minutes"),
        );
    }

    if config.alerts.max_alerts > 100 {
        warn(
            "alerts.max_alerts",
            format!("alerts.max_alerts = {} is large for a live alert list", config.alerts.max_alerts),
        );
    }

    let realert_ms = config.alerts.realert_after_secs.saturating_mul(1000);
    if realert_ms > 0 && realert_ms < interval {
        warn(
            "alerts.realert_after_secs",
            format!(
                "alerts.realert_after_secs = {} is shorter than the polling interval; \
                 every poll of a sustained condition will re-alert",
                config.alerts.realert_after_secs
            ),
        );
    }

    if config.upload.max_file_bytes > 100 * 1024 * 1024 {
        warn(
            "upload.max_file_bytes",
            format!("upload.max_file_bytes = {} exceeds 100 MiB", config.upload.max_file_bytes),
        );
    }

    for mode in OperatingMode::ALL {
        let risk = config.thresholds.for_mode(mode).hydrate_risk;
        if risk.critical > 100.0 || risk.warning < 0.0 {
            warn(
                &format!("thresholds.{mode}.hydrate_risk"),
                format!("thresholds.{mode}.hydrate_risk limits fall outside the 0-100% risk scale"),
            );
        }
    }

    warnings
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("interval_sm", "interval_ms"), 2);
        assert_eq!(levenshtein("max_alert", "max_alerts"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [thresholds.offshore.pressure]
            warning = 280.0
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"thresholds".to_string()));
        assert!(keys.contains(&"thresholds.offshore".to_string()));
        assert!(keys.contains(&"thresholds.offshore.pressure.warning".to_string()));
    }

    #[test]
    fn test_known_keys_cover_threshold_tables() {
        let known = known_config_keys();
        assert!(known.contains("thresholds.onshore.flow_rate.critical"));
        assert!(known.contains("thresholds.offshore.temperature.direction"));
        assert!(!known.contains("thresholds.subsea"));
    }

    #[test]
    fn test_typo_gets_suggestion() {
        let warnings = validate_unknown_keys(
            r#"
            [alerts]
            max_alert = 3
            "#,
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "alerts.max_alert");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("alerts.max_alerts"));
    }

    #[test]
    fn test_valid_config_has_no_warnings() {
        let warnings = validate_unknown_keys(
            r#"
            [polling]
            interval_ms = 2000
            [upload]
            allowed_extensions = ["csv"]
            "#,
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_range_warning_for_fast_polling() {
        let mut config = MonitorConfig::default();
        config.polling.interval_ms = 100;
        let warnings = validate_ranges(&config);
        assert!(warnings.iter().any(|w| w.field == "polling.interval_ms"));
    }

    #[test]
    fn test_defaults_have_no_range_warnings() {
        assert!(validate_ranges(&MonitorConfig::default()).is_empty());
    }
}
