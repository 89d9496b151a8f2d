//! Alarm Implementation

use serde::{Deserialize, Serialize};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::AlarmError;

/// Alarm configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    /// Play a sound (false = log only)
    pub enabled: bool,
    /// Player executable (default: afplay on macOS, aplay elsewhere)
    pub player: Option<String>,
    /// Sound file handed to the player
    pub sound_path: String,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            player: None,
            sound_path: "sounds/alert.wav".to_string(),
        }
    }
}

impl AlarmConfig {
    /// Player executable for this platform
    pub fn player(&self) -> String {
        self.player.clone().unwrap_or_else(|| {
            if cfg!(target_os = "macos") {
                "afplay".to_string()
            } else {
                "aplay".to_string()
            }
        })
    }
}

/// Fire-and-forget alarm. Implementations must not block the caller.
pub trait Alarm: Send {
    fn trigger(&mut self);

    /// Number of times the alarm has been triggered
    fn fire_count(&self) -> usize;
}

/// State of the alarm
#[derive(Debug, Clone, Default)]
pub struct AlarmState {
    /// Last time the alarm was fired
    pub last_fired: Option<Instant>,
    /// Number of times fired
    pub fire_count: usize,
}

impl AlarmState {
    fn record_fire(&mut self) {
        self.last_fired = Some(Instant::now());
        self.fire_count += 1;
    }
}

/// Plays the alarm sound through an external player process
pub struct CommandAlarm {
    player: String,
    sound_path: String,
    state: AlarmState,
    /// Players still running, reaped on the next trigger
    running: Vec<Child>,
}

impl CommandAlarm {
    pub fn new(config: &AlarmConfig) -> Self {
        let player = config.player();
        info!("Creating alarm: {} {}", player, config.sound_path);
        if !std::path::Path::new(&config.sound_path).exists() {
            warn!("Alarm sound {} not found", config.sound_path);
        }

        Self {
            player,
            sound_path: config.sound_path.clone(),
            state: AlarmState::default(),
            running: Vec::new(),
        }
    }

    pub fn state(&self) -> &AlarmState {
        &self.state
    }

    fn spawn(&self) -> Result<Child, AlarmError> {
        Command::new(&self.player)
            .arg(&self.sound_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| AlarmError::Spawn {
                player: self.player.clone(),
                source,
            })
    }

    fn reap(&mut self) {
        self.running
            .retain_mut(|child| !matches!(child.try_wait(), Ok(Some(_)) | Err(_)));
    }
}

impl Alarm for CommandAlarm {
    fn trigger(&mut self) {
        self.reap();
        self.state.record_fire();

        match self.spawn() {
            Ok(child) => {
                debug!("Alarm player started (pid {})", child.id());
                self.running.push(child);
            }
            Err(e) => warn!("Alarm not played: {}", e),
        }

        info!("Alarm fired (count: {})", self.state.fire_count);
    }

    fn fire_count(&self) -> usize {
        self.state.fire_count
    }
}

/// Silent alarm: logs and counts. The counter handle can be shared with
/// observers on other threads.
#[derive(Debug, Clone, Default)]
pub struct LogAlarm {
    fired: Arc<AtomicUsize>,
}

impl LogAlarm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared counter of triggers
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fired)
    }
}

impl Alarm for LogAlarm {
    fn trigger(&mut self) {
        let count = self.fired.fetch_add(1, Ordering::SeqCst) + 1;
        warn!("Posture alarm (count: {})", count);
    }

    fn fire_count(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }
}

/// Build the alarm a configuration asks for
pub fn from_config(config: &AlarmConfig) -> Box<dyn Alarm> {
    if config.enabled {
        Box::new(CommandAlarm::new(config))
    } else {
        Box::new(LogAlarm::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_alarm_counts_across_clones() {
        let mut alarm = LogAlarm::new();
        let counter = alarm.counter();
        alarm.trigger();
        alarm.trigger();
        assert_eq!(alarm.fire_count(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_missing_player_is_not_fatal() {
        let config = AlarmConfig {
            player: Some("/no/such/player".to_string()),
            ..Default::default()
        };
        let mut alarm = CommandAlarm::new(&config);
        alarm.trigger();
        assert_eq!(alarm.fire_count(), 1);
        assert!(alarm.state().last_fired.is_some());
        assert!(alarm.running.is_empty());
    }

    #[test]
    fn test_default_player_per_platform() {
        let player = AlarmConfig::default().player();
        if cfg!(target_os = "macos") {
            assert_eq!(player, "afplay");
        } else {
            assert_eq!(player, "aplay");
        }
    }

    #[test]
    fn test_disabled_config_is_silent() {
        let config = AlarmConfig {
            enabled: false,
            ..Default::default()
        };
        let mut alarm = from_config(&config);
        alarm.trigger();
        assert_eq!(alarm.fire_count(), 1);
    }
}
