//! Scheduling configuration.

use serde::{Deserialize, Serialize};

/// Holds raw config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawSimulationConfig {
    pub migration_overhead_fraction: Option<f64>,
    pub min_time_between_events: Option<f64>,
}

/// Represents scheduling configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Fraction of a migrating VM's requested rate consumed as migration
    /// overhead.
    pub migration_overhead_fraction: f64,
    /// Lower bound on the distance between the current time and any finish
    /// estimate returned to the event engine.
    pub min_time_between_events: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            migration_overhead_fraction: 0.1,
            min_time_between_events: 0.1,
        }
    }
}

impl SimulationConfig {
    /// Creates config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Self {
        Self::from_yaml(
            &std::fs::read_to_string(file_name).unwrap_or_else(|_| panic!("Can't read file {}", file_name)),
        )
    }

    /// Creates config from a YAML string.
    pub fn from_yaml(content: &str) -> Self {
        let raw: RawSimulationConfig =
            serde_yaml::from_str(content).unwrap_or_else(|_| panic!("Can't parse YAML config"));
        let default = Self::default();
        Self {
            migration_overhead_fraction: raw
                .migration_overhead_fraction
                .unwrap_or(default.migration_overhead_fraction),
            min_time_between_events: raw.min_time_between_events.unwrap_or(default.min_time_between_events),
        }
    }
}
