//! Replays JSON scenarios from `fixtures/scenarios` through the signal
//! simulator and lockout controller, wired the way the session wires them:
//! every signal tick feeds its published BPM into the threshold check.

use cooldown_core::config::CooldownConfig;
use cooldown_core::lockout::LockoutController;
use cooldown_core::signal::SignalSimulator;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct Scenario {
    name: String,
    #[allow(dead_code)]
    description: String,
    seed: u64,
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
struct Step {
    at_ms: u64,
    action: Action,
    #[serde(default)]
    expect: Expect,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Action {
    Tick,
    /// Tick at `from_ms, from_ms + every_ms, ..` up to and including the step time.
    TickEvery { from_ms: u64, every_ms: u64 },
    Spike,
    Observe { bpm: u32 },
    Refresh,
}

#[derive(Debug, Default, Deserialize)]
struct Expect {
    locked: Option<bool>,
    remaining_seconds: Option<u32>,
    /// `Some(None)` asserts the deadline is cleared.
    #[serde(default, deserialize_with = "double_option")]
    end_ms: Option<Option<u64>>,
    bpm_min: Option<u32>,
    bpm_max: Option<u32>,
    history_len: Option<usize>,
    oldest_ms: Option<u64>,
}

fn double_option<'de, D>(de: D) -> Result<Option<Option<u64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<u64>::deserialize(de).map(Some)
}

fn scenarios_dir() -> PathBuf {
    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest.join("../../fixtures/scenarios")
}

fn load_scenarios() -> Vec<Scenario> {
    let dir = scenarios_dir();
    let mut scenarios = Vec::new();
    for entry in fs::read_dir(&dir).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            let content = fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("failed to read scenario {path:?}: {e}"));
            let scenario: Scenario = serde_json::from_str(&content)
                .unwrap_or_else(|e| panic!("failed to parse scenario {path:?}: {e}"));
            scenarios.push(scenario);
        }
    }
    scenarios.sort_by(|a, b| a.name.cmp(&b.name));
    scenarios
}

struct Harness {
    signal: SignalSimulator,
    lockout: LockoutController,
    rng: StdRng,
}

impl Harness {
    fn new(seed: u64) -> Self {
        let config = CooldownConfig::default();
        Self {
            signal: SignalSimulator::new(config.signal),
            lockout: LockoutController::new(config.lockout),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn tick(&mut self, now_ms: u64) {
        self.signal.tick(now_ms, &mut self.rng);
        self.lockout.observe_bpm(self.signal.current_bpm(), now_ms);
    }

    fn apply(&mut self, step: &Step) {
        match step.action {
            Action::Tick => self.tick(step.at_ms),
            Action::TickEvery { from_ms, every_ms } => {
                let mut t = from_ms;
                while t <= step.at_ms {
                    self.tick(t);
                    t += every_ms;
                }
            }
            Action::Spike => {
                self.signal.simulate_spike(step.at_ms);
            }
            Action::Observe { bpm } => {
                self.lockout.observe_bpm(bpm, step.at_ms);
            }
            Action::Refresh => {
                self.lockout.refresh(step.at_ms);
            }
        }
    }

    fn check(&self, scenario: &str, index: usize, expect: &Expect) {
        let ctx = format!("scenario {scenario}, step {index}");
        if let Some(locked) = expect.locked {
            assert_eq!(self.lockout.is_locked(), locked, "{ctx}: locked");
        }
        if let Some(remaining) = expect.remaining_seconds {
            assert_eq!(self.lockout.remaining_seconds(), remaining, "{ctx}: remaining");
        }
        if let Some(end_ms) = expect.end_ms {
            assert_eq!(self.lockout.end_ms(), end_ms, "{ctx}: end_ms");
        }
        let bpm = self.signal.current_bpm();
        if let Some(min) = expect.bpm_min {
            assert!(bpm >= min, "{ctx}: bpm {bpm} < {min}");
        }
        if let Some(max) = expect.bpm_max {
            assert!(bpm <= max, "{ctx}: bpm {bpm} > {max}");
        }
        if let Some(len) = expect.history_len {
            assert_eq!(self.signal.history().len(), len, "{ctx}: history_len");
        }
        if let Some(oldest) = expect.oldest_ms {
            let front = self.signal.history().front().map(|s| s.timestamp_ms);
            assert_eq!(front, Some(oldest), "{ctx}: oldest sample");
        }
    }
}

#[test]
fn test_all_scenarios() {
    let scenarios = load_scenarios();
    assert!(
        !scenarios.is_empty(),
        "no scenarios found in {:?}",
        scenarios_dir()
    );

    let mut total_steps = 0;
    for scenario in &scenarios {
        let mut harness = Harness::new(scenario.seed);
        for (i, step) in scenario.steps.iter().enumerate() {
            harness.apply(step);
            harness.check(&scenario.name, i, &step.expect);
            total_steps += 1;
        }
    }
    assert!(total_steps > 0);
}

#[test]
fn scenario_names_are_unique() {
    let scenarios = load_scenarios();
    let mut names: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
    names.dedup();
    assert_eq!(names.len(), scenarios.len());
}
