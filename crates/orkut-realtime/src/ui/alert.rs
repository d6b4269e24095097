//! Ring tone and vibration for incoming calls.

use std::f32::consts::PI;
use std::time::Duration;

use async_trait::async_trait;

use orkut_core::result::AppResult;

/// Vibration pattern in milliseconds, on/off alternating.
pub const RING_PATTERN: [u64; 5] = [300, 200, 300, 200, 300];

/// Gap between ring bursts and between vibration pulses.
pub const RING_INTERVAL: Duration = Duration::from_secs(2);

/// One synthesized ring: a sine burst with a short attack and a linear fade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingBurst {
    pub frequency_hz: f32,
    pub peak_gain: f32,
    pub attack: Duration,
    pub duration: Duration,
}

impl Default for RingBurst {
    fn default() -> Self {
        Self {
            frequency_hz: 440.0,
            peak_gain: 0.1,
            attack: Duration::from_millis(100),
            duration: Duration::from_millis(500),
        }
    }
}

impl RingBurst {
    /// Envelope value at `t` from the start of the burst.
    pub fn gain_at(&self, t: Duration) -> f32 {
        if t >= self.duration {
            return 0.0;
        }
        let t = t.as_secs_f32();
        let attack = self.attack.as_secs_f32();
        if t < attack {
            return self.peak_gain * t / attack;
        }
        let release = self.duration.as_secs_f32() - attack;
        self.peak_gain * (1.0 - (t - attack) / release)
    }

    /// Mono PCM samples at `sample_rate` Hz.
    pub fn samples(&self, sample_rate: u32) -> Vec<f32> {
        let count = (self.duration.as_secs_f64() * f64::from(sample_rate)) as usize;
        (0..count)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                self.gain_at(Duration::from_secs_f32(t)) * (2.0 * PI * self.frequency_hz * t).sin()
            })
            .collect()
    }
}

/// Audio output for ring bursts.
#[async_trait]
pub trait RingtonePlayer: Send + Sync {
    async fn play(&self, burst: &RingBurst) -> AppResult<()>;
}

/// Device vibration. Devices without a motor just ignore it.
pub trait Vibrator: Send + Sync {
    fn vibrate(&self, pattern: &[u64]);

    fn stop(&self) {
        self.vibrate(&[0]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope() {
        let burst = RingBurst::default();
        assert_eq!(burst.gain_at(Duration::ZERO), 0.0);
        assert!((burst.gain_at(Duration::from_millis(100)) - 0.1).abs() < 1e-6);
        assert!((burst.gain_at(Duration::from_millis(300)) - 0.05).abs() < 1e-6);
        assert_eq!(burst.gain_at(Duration::from_millis(500)), 0.0);
        assert_eq!(burst.gain_at(Duration::from_secs(1)), 0.0);
    }

    #[test]
    fn test_samples_stay_under_peak() {
        let burst = RingBurst::default();
        let samples = burst.samples(8000);
        assert_eq!(samples.len(), 4000);
        assert!(samples.iter().all(|s| s.abs() <= 0.1 + 1e-6));
    }
}
