//! Synthetic heart-rate generator with spike injection.
//!
//! Pure and deterministic given the caller's clock and RNG: every method
//! that depends on time takes `now_ms` (epoch milliseconds), and jitter is
//! drawn from a caller-supplied [`rand::Rng`].
//!
//! - **Baseline**: `base ± variation`, uniformly jittered.
//! - **Spike**: for `spike_duration_ms` after [`SignalSimulator::simulate_spike`],
//!   the value eases from `base` toward `spike_target` along a symmetric
//!   ease-in-out quadratic, then drops back to baseline.

use std::collections::VecDeque;

use rand::Rng;

use crate::config::SignalConfig;
use crate::types::BpmSample;

/// An active spike excursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpikeWindow {
    /// Epoch millisecond at which the spike ends.
    pub end_ms: u64,
}

/// Symmetric ease-in-out quadratic on `[0, 1]`.
///
/// Input outside the unit interval is clamped.
#[must_use]
pub fn ease_in_out_quad(p: f64) -> f64 {
    let p = p.clamp(0.0, 1.0);
    if p < 0.5 {
        2.0 * p * p
    } else {
        1.0 - (-2.0 * p + 2.0).powi(2) / 2.0
    }
}

/// Heart-rate simulator. Owns the history buffer and the spike window.
#[derive(Debug, Clone)]
pub struct SignalSimulator {
    config: SignalConfig,
    history: VecDeque<BpmSample>,
    spike: Option<SpikeWindow>,
    current_bpm: u32,
}

impl SignalSimulator {
    /// Create a simulator at rest: empty history, published BPM = `base_bpm`.
    #[must_use]
    pub fn new(config: SignalConfig) -> Self {
        let current_bpm = BpmSample::new(0, config.base_bpm).rounded();
        Self {
            config,
            history: VecDeque::new(),
            spike: None,
            current_bpm,
        }
    }

    /// Latest published (rounded) BPM.
    #[must_use]
    pub fn current_bpm(&self) -> u32 {
        self.current_bpm
    }

    /// Retained samples, oldest first.
    #[must_use]
    pub fn history(&self) -> &VecDeque<BpmSample> {
        &self.history
    }

    /// The active spike window, if any.
    #[must_use]
    pub fn spike(&self) -> Option<SpikeWindow> {
        self.spike
    }

    /// Start a spike ending `spike_duration_ms` from `now_ms`.
    ///
    /// A request while a spike is already running replaces its deadline,
    /// restarting the ramp from the base rate.
    pub fn simulate_spike(&mut self, now_ms: u64) -> SpikeWindow {
        let window = SpikeWindow {
            end_ms: now_ms.saturating_add(self.config.spike_duration_ms),
        };
        self.spike = Some(window);
        window
    }

    /// Generate one sample at `now_ms`, append it and prune expired history.
    pub fn tick<R: Rng + ?Sized>(&mut self, now_ms: u64, rng: &mut R) -> BpmSample {
        let value = self.generate(now_ms, rng);
        let sample = BpmSample::new(now_ms, value);

        self.current_bpm = sample.rounded();
        self.history.push_back(sample);
        self.prune(now_ms);

        sample
    }

    /// Compute the raw value for `now_ms`, clearing an elapsed spike window.
    fn generate<R: Rng + ?Sized>(&mut self, now_ms: u64, rng: &mut R) -> f64 {
        if let Some(window) = self.spike {
            if now_ms < window.end_ms {
                return self.spike_value(window, now_ms);
            }
            self.spike = None;
        }
        self.baseline_value(rng)
    }

    fn baseline_value<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let u: f64 = rng.r#gen();
        self.config.base_bpm + (u - 0.5) * self.config.variation * 2.0
    }

    fn spike_value(&self, window: SpikeWindow, now_ms: u64) -> f64 {
        #[expect(clippy::cast_precision_loss)]
        let remaining = window.end_ms.saturating_sub(now_ms) as f64;
        #[expect(clippy::cast_precision_loss)]
        let duration = self.config.spike_duration_ms as f64;
        let progress = 1.0 - remaining / duration;
        let eased = ease_in_out_quad(progress);
        self.config.base_bpm + (self.config.spike_target_bpm - self.config.base_bpm) * eased
    }

    /// Drop samples with `now - timestamp >= history_window_ms`.
    fn prune(&mut self, now_ms: u64) {
        let window = self.config.history_window_ms;
        while let Some(front) = self.history.front() {
            if now_ms.saturating_sub(front.timestamp_ms) >= window {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sim() -> SignalSimulator {
        SignalSimulator::new(SignalConfig::default())
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    // ── 1. Baseline ─────────────────────────────────────────────────

    #[test]
    fn starts_at_base_rate_with_empty_history() {
        let s = sim();
        assert_eq!(s.current_bpm(), 75);
        assert!(s.history().is_empty());
        assert!(s.spike().is_none());
    }

    #[test]
    fn baseline_values_stay_within_variation() {
        let mut s = sim();
        let mut r = rng();
        for i in 1..=2_000u64 {
            let sample = s.tick(i * 500, &mut r);
            assert!(
                (70.0..=80.0).contains(&sample.value),
                "tick {i}: {} outside [70, 80]",
                sample.value
            );
            assert!((70..=80).contains(&s.current_bpm()));
        }
    }

    #[test]
    fn first_tick_produces_one_sample() {
        let mut s = sim();
        let sample = s.tick(500, &mut rng());
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.history()[0], sample);
        assert_eq!(s.current_bpm(), sample.rounded());
    }

    #[test]
    fn history_keeps_unrounded_values() {
        let mut s = sim();
        let sample = s.tick(500, &mut rng());
        assert_eq!(s.history()[0].value, sample.value);
        assert_eq!(f64::from(s.current_bpm()), sample.value.round());
    }

    // ── 2. History window ───────────────────────────────────────────

    #[test]
    fn prunes_samples_at_or_beyond_window() {
        let mut s = sim();
        let mut r = rng();
        for t in (500..=31_000u64).step_by(500) {
            s.tick(t, &mut r);
        }
        // At t=31000 the sample from t=1000 is exactly 30000 ms old: gone.
        let oldest = s.history().front().unwrap().timestamp_ms;
        assert_eq!(oldest, 1_500);
        assert!(s.history().iter().all(|x| 31_000 - x.timestamp_ms < 30_000));
        assert_eq!(s.history().len(), 60);
    }

    #[test]
    fn history_is_time_ordered() {
        let mut s = sim();
        let mut r = rng();
        for t in (500..=10_000u64).step_by(500) {
            s.tick(t, &mut r);
        }
        let ts: Vec<u64> = s.history().iter().map(|x| x.timestamp_ms).collect();
        let mut sorted = ts.clone();
        sorted.sort_unstable();
        assert_eq!(ts, sorted);
    }

    #[test]
    fn long_gap_prunes_everything_but_the_new_sample() {
        let mut s = sim();
        let mut r = rng();
        s.tick(500, &mut r);
        s.tick(1_000, &mut r);
        s.tick(100_000, &mut r);
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.history()[0].timestamp_ms, 100_000);
    }

    // ── 3. Spike ────────────────────────────────────────────────────

    #[test]
    fn spike_rises_monotonically_toward_target() {
        let mut s = sim();
        let mut r = rng();
        s.simulate_spike(0);

        let values: Vec<f64> = (1..6u64).map(|i| s.tick(i * 500, &mut r).value).collect();
        for pair in values.windows(2) {
            assert!(pair[1] > pair[0], "not monotonic: {values:?}");
        }
        assert!(values[0] > 75.0 && values[0] < 80.0);
        assert!(*values.last().unwrap() < 120.0);
    }

    #[test]
    fn spike_follows_ease_curve() {
        let mut s = sim();
        let mut r = rng();
        s.simulate_spike(0);

        // p = 0.5 -> eased 0.5 -> 97.5
        assert!((s.tick(1_500, &mut r).value - 97.5).abs() < 1e-9);
        assert_eq!(s.current_bpm(), 98);

        // p = 2/3 -> 1 - (2/3)^2 / 2 = 7/9
        let expected = 75.0 + 45.0 * (7.0 / 9.0);
        assert!((s.tick(2_000, &mut r).value - expected).abs() < 1e-9);
        assert_eq!(s.current_bpm(), 110);
    }

    #[test]
    fn spike_clears_at_deadline_and_returns_to_baseline() {
        let mut s = sim();
        let mut r = rng();
        s.simulate_spike(0);
        s.tick(2_500, &mut r);
        assert!(s.spike().is_some());

        let sample = s.tick(3_000, &mut r);
        assert!(s.spike().is_none());
        assert!((70.0..=80.0).contains(&sample.value));
    }

    #[test]
    fn second_spike_overwrites_deadline() {
        let mut s = sim();
        let first = s.simulate_spike(0);
        let second = s.simulate_spike(2_000);
        assert_eq!(first.end_ms, 3_000);
        assert_eq!(second.end_ms, 5_000);
        assert_eq!(s.spike(), Some(second));

        // Ramp restarted: at t=2500 progress is only 1/6.
        let v = s.tick(2_500, &mut rng()).value;
        assert!(v < 80.0, "restarted ramp should be near base, got {v}");
    }

    // ── 4. Easing ───────────────────────────────────────────────────

    #[test]
    fn ease_endpoints_and_midpoint() {
        assert_eq!(ease_in_out_quad(0.0), 0.0);
        assert_eq!(ease_in_out_quad(0.5), 0.5);
        assert_eq!(ease_in_out_quad(1.0), 1.0);
        assert_eq!(ease_in_out_quad(0.25), 0.125);
        assert_eq!(ease_in_out_quad(-3.0), 0.0);
        assert_eq!(ease_in_out_quad(7.0), 1.0);
    }
}
