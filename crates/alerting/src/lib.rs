//! Alerting System
//!
//! Fire-and-forget audible alarm for sustained poor posture.

mod manager;

pub use manager::{from_config, Alarm, AlarmConfig, AlarmState, CommandAlarm, LogAlarm};

use thiserror::Error;

/// Alarm errors
#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("Failed to start alarm player {player}: {source}")]
    Spawn {
        player: String,
        #[source]
        source: std::io::Error,
    },
}
