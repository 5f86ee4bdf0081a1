//! JSON lines written by the headless runner.
//!
//! Every line on stdout is one JSON object tagged by `type`:
//!
//! ```text
//! {"type":"ready","version":"1.0","scenario":"Clearing","seed":0}
//! {"type":"tick","tick":12,"events":[{"event":"damage_dealt",...}]}
//! {"type":"summary","scenario":"Clearing","seed":0,...}
//! ```
//!
//! Ticks that produce no events are not written.

use serde::{Deserialize, Serialize};
use survival_core::events::GameEvent;

use crate::metrics::RunMetrics;

/// Protocol version written in the `ready` line.
pub const PROTOCOL_VERSION: &str = "1.0";

/// One line of runner output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Output {
    /// Written once before the first tick.
    Ready {
        /// Protocol version.
        version: String,
        /// Scenario name.
        scenario: String,
        /// World seed.
        seed: u64,
    },
    /// Events published during one tick.
    Tick {
        /// Tick number, starting at 1.
        tick: u64,
        /// Events in publication order.
        events: Vec<GameEvent>,
    },
    /// Night began or ended.
    Night {
        /// Tick number.
        tick: u64,
        /// Whether night started.
        started: bool,
        /// Enemies spawned or despawned.
        enemies: usize,
    },
    /// Written once after the last tick.
    Summary(RunMetrics),
    /// Something went wrong before the run could start.
    Error {
        /// Error message.
        message: String,
    },
}

impl Output {
    /// Create a ready line.
    #[must_use]
    pub fn ready(scenario: &str, seed: u64) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            scenario: scenario.to_string(),
            seed,
        }
    }

    /// Create an error line.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serialize to JSON line (with newline).
    #[must_use]
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn test_ready_line() {
        let json = Output::ready("Clearing", 7).to_json_line();
        assert!(json.starts_with(r#"{"type":"ready""#));
        assert!(json.contains(r#""seed":7"#));
        assert!(json.ends_with('\n'));
    }

    #[test]
    fn test_tick_line_carries_tagged_events() {
        let line = Output::Tick {
            tick: 3,
            events: vec![GameEvent::DamageDealt {
                target: 4,
                damage: 10.0,
                position: DVec3::new(1.0, 0.0, 0.0),
                killed: false,
                target_name: "Wolf".to_string(),
            }],
        };
        let json = line.to_json_line();
        assert!(json.contains(r#""type":"tick""#));
        assert!(json.contains(r#""event":"damage_dealt""#));

        let parsed: Output = serde_json::from_str(json.trim()).unwrap();
        assert_eq!(parsed, line);
    }

    #[test]
    fn test_error_line() {
        let json = Output::error("boom").to_json_line();
        assert_eq!(json, "{\"type\":\"error\",\"message\":\"boom\"}\n");
    }
}
