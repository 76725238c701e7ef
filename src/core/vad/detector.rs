//! Energy VAD detector implementation

use tracing::trace;

use super::config::VADConfig;

/// Outcome of evaluating a single PCM frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VADDecision {
    /// Whether the frame should be forwarded upstream
    pub forward: bool,
    /// Mean absolute sample amplitude of the frame
    pub energy: f32,
}

/// Trait for Voice Activity Detection implementations
pub trait VoiceActivityDetector: Send + Sync {
    /// Evaluate one frame of 16-bit little-endian mono PCM
    fn process_frame(&mut self, pcm: &[u8]) -> VADDecision;

    /// Reset internal state (call when starting a new audio stream)
    fn reset(&mut self);

    /// Check if currently in speech state
    fn is_speaking(&self) -> bool;

    /// Get the configuration
    fn config(&self) -> &VADConfig;
}

/// Amplitude-threshold detector with a hangover window.
///
/// Once a frame reaches the threshold, up to `hangover_frames` following
/// quiet frames are still forwarded. Quiet frames that were never preceded
/// by speech are dropped.
#[derive(Debug, Clone)]
pub struct EnergyVAD {
    config: VADConfig,
    in_speech: bool,
    silence_frames: u32,
}

impl EnergyVAD {
    pub fn new(config: VADConfig) -> Self {
        Self {
            config,
            in_speech: false,
            silence_frames: 0,
        }
    }

    /// Evaluate a frame and advance the hangover state
    pub fn process_frame(&mut self, pcm: &[u8]) -> VADDecision {
        if pcm.len() < 2 {
            // A disabled gate forwards everything, even a partial sample
            return VADDecision {
                forward: !self.config.is_enabled(),
                energy: 0.0,
            };
        }

        let energy = mean_abs_amplitude(pcm);

        let forward = if energy >= self.config.threshold {
            self.in_speech = true;
            self.silence_frames = 0;
            true
        } else if self.in_speech && self.silence_frames < self.config.hangover_frames {
            self.silence_frames += 1;
            true
        } else {
            self.in_speech = false;
            self.silence_frames = (self.silence_frames + 1).min(self.config.hangover_frames);
            false
        };

        trace!(
            energy,
            forward,
            silence_frames = self.silence_frames,
            "VAD frame evaluated"
        );

        VADDecision { forward, energy }
    }

    pub fn reset(&mut self) {
        self.in_speech = false;
        self.silence_frames = 0;
    }

    pub fn is_speaking(&self) -> bool {
        self.in_speech
    }

    pub fn config(&self) -> &VADConfig {
        &self.config
    }
}

impl VoiceActivityDetector for EnergyVAD {
    fn process_frame(&mut self, pcm: &[u8]) -> VADDecision {
        EnergyVAD::process_frame(self, pcm)
    }

    fn reset(&mut self) {
        EnergyVAD::reset(self)
    }

    fn is_speaking(&self) -> bool {
        EnergyVAD::is_speaking(self)
    }

    fn config(&self) -> &VADConfig {
        EnergyVAD::config(self)
    }
}

/// Mean absolute amplitude of 16-bit LE samples. A trailing odd byte is ignored.
pub fn mean_abs_amplitude(pcm: &[u8]) -> f32 {
    let samples = pcm.len() / 2;
    if samples == 0 {
        return 0.0;
    }

    let total: u64 = pcm
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]).unsigned_abs() as u64)
        .sum();

    total as f32 / samples as f32
}
