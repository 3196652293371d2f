//! Finish alarm: gesture-unlocked audio plus a vibration fallback
//!
//! Audio output may only start after a user gesture. The first gesture
//! creates the audio context and primes it with an inaudible tone; after
//! that the subsystem stops listening for gestures. Every failure here is
//! swallowed: the alarm is advisory and the visual notice always shows.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlertError {
    #[error("audio output is not supported")]
    Unsupported,
    #[error("audio context is suspended")]
    Suspended,
    #[error("audio backend failed: {0}")]
    Backend(String),
}

/// A single synthesized tone
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tone {
    pub frequency_hz: f32,
    /// Offset from the start of the sequence
    pub delay: Duration,
    pub duration: Duration,
    pub gain: f32,
}

/// Tone used to warm up a freshly created context
pub const PRIMING_TONE: Tone = Tone {
    frequency_hz: 440.0,
    delay: Duration::ZERO,
    duration: Duration::from_millis(10),
    gain: 0.0001,
};

/// Two short tones, then a longer one
pub const FINISH_SEQUENCE: [Tone; 3] = [
    Tone {
        frequency_hz: 880.0,
        delay: Duration::ZERO,
        duration: Duration::from_millis(160),
        gain: 0.25,
    },
    Tone {
        frequency_hz: 880.0,
        delay: Duration::from_millis(240),
        duration: Duration::from_millis(160),
        gain: 0.25,
    },
    Tone {
        frequency_hz: 1320.0,
        delay: Duration::from_millis(480),
        duration: Duration::from_millis(600),
        gain: 0.3,
    },
];

/// Vibrate/pause durations in milliseconds
pub const VIBRATION_PATTERN: [u32; 5] = [200, 100, 200, 100, 400];

/// Audio output device
pub trait AudioBackend: Send {
    /// Create the audio context; only called from a user gesture
    fn create_context(&mut self) -> Result<(), AlertError>;
    /// Resume a context the platform may have suspended
    fn resume(&mut self) -> Result<(), AlertError>;
    fn play(&mut self, tone: &Tone) -> Result<(), AlertError>;
}

pub trait Haptics: Send {
    fn vibrate(&mut self, pattern: &[u32]) -> Result<(), AlertError>;
}

/// Audio backend for headless hosts: logs what would be played
#[derive(Debug, Default)]
pub struct TracingAudio {
    ready: bool,
}

impl AudioBackend for TracingAudio {
    fn create_context(&mut self) -> Result<(), AlertError> {
        self.ready = true;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), AlertError> {
        if self.ready {
            Ok(())
        } else {
            Err(AlertError::Suspended)
        }
    }

    fn play(&mut self, tone: &Tone) -> Result<(), AlertError> {
        debug!(
            "tone {}Hz for {}ms at +{}ms",
            tone.frequency_hz,
            tone.duration.as_millis(),
            tone.delay.as_millis()
        );
        Ok(())
    }
}

/// Haptics for hosts without a vibration motor
#[derive(Debug, Default)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn vibrate(&mut self, _pattern: &[u32]) -> Result<(), AlertError> {
        Err(AlertError::Unsupported)
    }
}

/// Whether audio may be played yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioUnlock {
    Locked,
    Unlocked,
}

/// What actually happened when the alarm fired
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmOutcome {
    pub audio_played: bool,
    pub vibrated: bool,
}

pub struct AlertSystem {
    audio: Box<dyn AudioBackend>,
    haptics: Box<dyn Haptics>,
    unlock: AudioUnlock,
    listening: bool,
}

impl AlertSystem {
    pub fn new(audio: Box<dyn AudioBackend>, haptics: Box<dyn Haptics>) -> Self {
        Self {
            audio,
            haptics,
            unlock: AudioUnlock::Locked,
            listening: true,
        }
    }

    /// Headless default used by the server
    pub fn headless() -> Self {
        Self::new(Box::new(TracingAudio::default()), Box::new(NoHaptics))
    }

    pub fn unlock_state(&self) -> AudioUnlock {
        self.unlock
    }

    /// Whether gestures are still being watched for
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Record a user gesture; unlocks audio on first success
    pub fn on_user_gesture(&mut self) -> AudioUnlock {
        if !self.listening || self.unlock == AudioUnlock::Unlocked {
            return self.unlock;
        }
        let unlocked = self
            .audio
            .create_context()
            .and_then(|()| self.audio.resume())
            .and_then(|()| self.audio.play(&PRIMING_TONE));
        match unlocked {
            Ok(()) => {
                info!("Audio unlocked by user gesture");
                self.unlock = AudioUnlock::Unlocked;
                self.listening = false;
            }
            Err(e) => debug!("Audio unlock failed, will retry on next gesture: {}", e),
        }
        self.unlock
    }

    /// Play the finish sequence and vibrate
    pub fn play_finish_alarm(&mut self) -> AlarmOutcome {
        let audio_played = self.unlock == AudioUnlock::Unlocked && self.play_sequence();
        let vibrated = match self.haptics.vibrate(&VIBRATION_PATTERN) {
            Ok(()) => true,
            Err(e) => {
                debug!("Vibration skipped: {}", e);
                false
            }
        };
        AlarmOutcome {
            audio_played,
            vibrated,
        }
    }

    fn play_sequence(&mut self) -> bool {
        if let Err(e) = self.audio.resume() {
            debug!("Alarm audio skipped: {}", e);
            return false;
        }
        for tone in &FINISH_SEQUENCE {
            if let Err(e) = self.audio.play(tone) {
                debug!("Alarm tone failed: {}", e);
                return false;
            }
        }
        true
    }
}
