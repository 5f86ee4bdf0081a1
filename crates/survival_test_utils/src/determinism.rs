//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays, recorded bug reports and the headless batch runner all assume a
//! seeded world behaves the same every time. Sources of non-determinism
//! include:
//!
//! - **Randomness**: patrol points, idle timers and night waves come from the
//!   world's seeded `ChaCha8Rng`, never from thread-local or OS entropy.
//!
//! - **Map iteration order**: entities live in a `HashMap`, so every system
//!   walks them through `EntityStorage::sorted_ids` in ascending id order.
//!
//! - **Float accumulation**: the state hash feeds raw `f64` bits, so any
//!   reordering of arithmetic shows up immediately.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual resolvers are pure functions of their inputs
//! 2. **Property tests**: random input scripts must replay identically
//! 3. **Integration tests**: full worlds reach the same state hash
//! 4. **Parallel tests**: N worlds built on N threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use survival_core::events::GameEvent;
use survival_core::inventory::Backpack;
use survival_core::simulation::{FrameInput, Simulation};

use crate::fixtures::TEST_DT;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each simulation.
    pub hashes: Vec<u64>,
    /// Number of ticks each simulation ran.
    pub ticks: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all simulations matched.
    ///
    /// # Panics
    ///
    /// Panics if simulations produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```ignore
/// use survival_test_utils::determinism::verify_determinism;
/// use survival_test_utils::fixtures::{training_ground, TEST_DT};
///
/// let result = verify_determinism(
///     5,   // Run 5 times
///     100, // 100 ticks each
///     training_ground,
///     |sim| { sim.tick(TEST_DT, &FrameInput::default()); },
///     |sim| sim.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !is_deterministic {
        tracing::warn!(runs, ticks, hashes = ?hashes, "Runs produced different state hashes");
    }

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a world twice with idle input and compare the final state hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation<Backpack>,
{
    let idle = FrameInput::default();
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick(TEST_DT, &idle);
        },
        Simulation::state_hash,
    );
    result.is_deterministic
}

/// Run N worlds on N scoped threads and collect final hashes.
///
/// Each world is built on its own thread because interaction handlers are
/// not `Send`; only the setup function crosses thread boundaries.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations_scoped<F>(
    setup_fn: F,
    num_sims: usize,
    num_ticks: u64,
) -> ParallelSimResult
where
    F: Fn() -> Simulation<Backpack> + Sync,
{
    let setup_ref = &setup_fn;
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(move || {
                    let idle = FrameInput::default();
                    let mut sim = setup_ref();
                    for _ in 0..num_ticks {
                        sim.tick(TEST_DT, &idle);
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if the runs match, `Some(tick)` for the first tick whose state
/// hash differs (0 means the freshly built worlds already differ).
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation<Backpack>,
{
    let idle = FrameInput::default();
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        tracing::warn!(tick = 0, "Worlds differ before the first tick");
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick(TEST_DT, &idle);
        sim2.tick(TEST_DT, &idle);

        let (first, second) = (sim1.state_hash(), sim2.state_hash());
        if first != second {
            tracing::warn!(tick, first, second, "State hashes diverged");
            return Some(tick);
        }
    }

    None
}

/// Play `script` into a fresh world and record the events of every tick.
pub fn record_events<F>(setup_fn: F, script: &[FrameInput]) -> Vec<Vec<GameEvent>>
where
    F: FnOnce() -> Simulation<Backpack>,
{
    let mut sim = setup_fn();
    script
        .iter()
        .map(|input| sim.tick(TEST_DT, input))
        .collect()
}

/// Play `script` into two fresh worlds and return the index of the first
/// tick whose event stream differs.
pub fn find_first_event_divergence<F>(setup_fn: F, script: &[FrameInput]) -> Option<usize>
where
    F: Fn() -> Simulation<Backpack>,
{
    let first = record_events(&setup_fn, script);
    let second = record_events(&setup_fn, script);
    let index = first.iter().zip(&second).position(|(a, b)| a != b)?;
    tracing::warn!(
        tick = index,
        first = ?first[index],
        second = ?second[index],
        "Event streams diverged"
    );
    Some(index)
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism and resolver testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing.
pub mod strategies {
    use glam::DVec3;
    use proptest::prelude::*;
    use survival_core::data::AttackProfile;
    use survival_core::simulation::FrameInput;

    /// World coordinate inside the buildable area.
    pub fn arb_coordinate() -> impl Strategy<Value = f64> {
        -90.0f64..90.0f64
    }

    /// Ground-level position inside the buildable area.
    pub fn arb_position() -> impl Strategy<Value = DVec3> {
        (arb_coordinate(), arb_coordinate()).prop_map(|(x, z)| DVec3::new(x, 0.0, z))
    }

    /// Non-degenerate horizontal view direction, normalized.
    pub fn arb_forward() -> impl Strategy<Value = DVec3> {
        (0.0f64..std::f64::consts::TAU).prop_map(|angle| DVec3::new(angle.cos(), 0.0, angle.sin()))
    }

    /// Raw damage before defense and flooring.
    pub fn arb_damage() -> impl Strategy<Value = f64> {
        0.0f64..200.0f64
    }

    /// Flat defense.
    pub fn arb_defense() -> impl Strategy<Value = f64> {
        0.0f64..20.0f64
    }

    /// Max HP of a damageable.
    pub fn arb_max_hp() -> impl Strategy<Value = f64> {
        1.0f64..500.0f64
    }

    /// Penetration decay fraction.
    pub fn arb_decay() -> impl Strategy<Value = f64> {
        0.0f64..=1.0f64
    }

    /// Cooldown duration in seconds.
    pub fn arb_cooldown() -> impl Strategy<Value = f64> {
        0.05f64..3.0f64
    }

    /// Any of the three attack shapes with plausible parameters.
    pub fn arb_attack_profile() -> impl Strategy<Value = AttackProfile> {
        prop_oneof![
            (1.0f64..4.0, 10.0f64..180.0, arb_cooldown(), 0u32..4).prop_map(
                |(range, angle, cooldown, max_targets)| {
                    AttackProfile::sector(range, angle, cooldown, max_targets)
                }
            ),
            (1.0f64..6.0, arb_cooldown(), 0u32..5, arb_decay()).prop_map(
                |(range, cooldown, penetration, decay)| {
                    AttackProfile::ray(range, cooldown, penetration, decay)
                }
            ),
            (1.0f64..4.0, arb_cooldown(), 0u32..4).prop_map(|(range, cooldown, max_targets)| {
                AttackProfile::circle(range, cooldown, max_targets)
            }),
        ]
    }

    /// One frame of player input without build commands.
    pub fn arb_frame_input() -> impl Strategy<Value = FrameInput> {
        (
            proptest::option::of((-6.0f64..6.0, -6.0f64..6.0)),
            proptest::option::of(arb_forward()),
            any::<bool>(),
            any::<bool>(),
            proptest::bool::weighted(0.1),
        )
            .prop_map(|(position, forward, primary, interact, ui_blocked)| FrameInput {
                position: position.map(|(x, z)| DVec3::new(x, 0.0, z)),
                forward,
                primary,
                interact,
                ui_blocked,
                ..FrameInput::default()
            })
    }

    /// A script of up to `max_len` frames.
    pub fn arb_input_script(max_len: usize) -> impl Strategy<Value = Vec<FrameInput>> {
        prop::collection::vec(arb_frame_input(), 1..=max_len)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{empty_world, forest_world, stocked_backpack, swing, training_ground};
    use glam::DVec3;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    // =========================================================================
    // Basic determinism tests
    // =========================================================================

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_empty_world_determinism() {
        assert!(verify_simulation_determinism(
            || empty_world(7, stocked_backpack()),
            100
        ));
    }

    #[test]
    fn test_find_divergence_on_deterministic_world() {
        let divergence = find_first_divergence(|| forest_world(11), 200);
        assert!(divergence.is_none(), "Expected no divergence");
    }

    #[test]
    fn test_different_seeds_are_detected() {
        let seed = AtomicU64::new(1);
        let result = verify_determinism(
            2,
            200,
            || forest_world(seed.fetch_add(1, Ordering::Relaxed)),
            |sim| {
                sim.tick(TEST_DT, &FrameInput::default());
            },
            Simulation::state_hash,
        );

        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 2);
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_divergence_is_found_and_logged() {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let seed = AtomicU64::new(1);
        let divergence = tracing::subscriber::with_default(subscriber, || {
            find_first_divergence(|| forest_world(seed.fetch_add(1, Ordering::Relaxed)), 200)
        });

        assert!(divergence.is_some());
        let logged = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("WARN"), "log was: {logged}");
        assert!(logged.contains("diverged") || logged.contains("differ"));
    }

    #[test]
    fn test_compute_hash_is_stable() {
        assert_eq!(compute_hash(&(1u64, "wood")), compute_hash(&(1u64, "wood")));
        assert_ne!(compute_hash(&1u64), compute_hash(&2u64));
    }

    // =========================================================================
    // Integration tests: combat and harvest
    // =========================================================================

    fn chop_and_fight_script() -> Vec<FrameInput> {
        let mut script = Vec::new();
        for _ in 0..40 {
            script.push(swing(DVec3::ZERO, DVec3::X));
        }
        for _ in 0..40 {
            script.push(swing(DVec3::ZERO, DVec3::Z));
        }
        script
    }

    #[test]
    fn test_combat_and_harvest_events_replay_exactly() {
        let script = chop_and_fight_script();
        assert_eq!(find_first_event_divergence(training_ground, &script), None);

        let events = record_events(training_ground, &script);
        let total: usize = events.iter().map(Vec::len).sum();
        assert!(total > 0, "script should produce events");
    }

    #[test]
    fn test_forest_world_determinism() {
        let result = verify_determinism(
            4,
            300,
            || forest_world(42),
            |sim| {
                sim.tick(TEST_DT, &FrameInput::default());
            },
            Simulation::state_hash,
        );
        result.assert_deterministic();
    }

    // =========================================================================
    // Parallel tests
    // =========================================================================

    #[test]
    fn test_parallel_worlds_match() {
        let result = run_parallel_simulations_scoped(|| forest_world(5), 4, 200);
        assert_eq!(result.num_sims, 4);
        result.assert_deterministic();
    }

    // =========================================================================
    // Property-based tests
    // =========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_random_scripts_replay_identically(
            script in strategies::arb_input_script(30),
        ) {
            prop_assert_eq!(find_first_event_divergence(training_ground, &script), None);
        }

        #[test]
        fn prop_seeded_worlds_are_deterministic(seed in any::<u64>()) {
            let result = verify_determinism(
                2,
                100,
                || forest_world(seed),
                |sim| { sim.tick(TEST_DT, &FrameInput::default()); },
                Simulation::state_hash,
            );
            prop_assert!(result.is_deterministic);
        }
    }

    // =========================================================================
    // Stress tests (only run explicitly with --ignored)
    // =========================================================================

    #[test]
    #[ignore = "Long-running stress test"]
    fn stress_test_night_waves() {
        let setup = || {
            let mut sim = forest_world(99);
            for _ in 0..10 {
                sim.spawn_night_wave();
            }
            sim
        };

        let result = verify_determinism(
            3,
            2000,
            setup,
            |s| {
                s.tick(TEST_DT, &FrameInput::default());
            },
            Simulation::state_hash,
        );
        result.assert_deterministic();
    }

    #[test]
    #[ignore = "Long-running stress test"]
    fn stress_test_parallel_many_worlds() {
        let result = run_parallel_simulations_scoped(|| forest_world(8), 16, 1000);
        result.assert_deterministic();
    }
}
