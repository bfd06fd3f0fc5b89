//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a battle produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Battles must replay exactly from a seed and a save. Sources of
//! non-determinism include:
//!
//! - **Floating-point math**: We use fixed-point arithmetic via
//!   [`squad_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Units are always processed in sorted id order.
//!
//! - **System randomness**: Ability chance rolls and random selectors use
//!   the battle's seeded RNG.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual system determinism (targeting, combat, etc.)
//! 2. **Property tests**: Random setups must still replay exactly
//! 3. **Integration tests**: Full battles are reproducible
//! 4. **Parallel tests**: Running N battles on threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use squad_core::engine::BattleEngine;
use squad_core::math::Fixed;
use tracing::debug;

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
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the battle was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
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

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance state by one tick
/// * `hash` - Function to compute state hash
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

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a battle twice with identical setup and compare final state hashes.
///
/// # Example
///
/// ```
/// use squad_test_utils::determinism::verify_battle_determinism;
/// use squad_test_utils::fixtures::{duel_engine, STEP};
///
/// assert!(verify_battle_determinism(|| duel_engine(7), 50, STEP));
/// ```
pub fn verify_battle_determinism<F>(setup_fn: F, num_ticks: u64, delta: Fixed) -> bool
where
    F: Fn() -> BattleEngine,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |engine| {
            engine.tick(delta);
        },
        BattleEngine::state_hash,
    )
    .is_deterministic
}

/// Result of parallel battle runs.
#[derive(Debug, Clone)]
pub struct ParallelBattleResult {
    /// Final state hash from each battle.
    pub hashes: Vec<u64>,
    /// Number of ticks each battle ran.
    pub ticks: u64,
    /// Number of battles run.
    pub num_battles: usize,
}

impl ParallelBattleResult {
    /// Check if all battles produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all battles matched.
    ///
    /// # Panics
    ///
    /// Panics if battles produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel battles diverged!\n\
                 Battles: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_battles,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run N battles on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under different memory
/// layouts, such as per-instance hasher seeds.
///
/// # Panics
///
/// Panics if a battle thread panics.
pub fn run_parallel_battles_scoped<F>(
    setup_fn: F,
    num_battles: usize,
    num_ticks: u64,
    delta: Fixed,
) -> ParallelBattleResult
where
    F: Fn() -> BattleEngine + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| {
                s.spawn(|| {
                    let mut engine = setup_fn();
                    for _ in 0..num_ticks {
                        engine.tick(delta);
                    }
                    engine.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelBattleResult {
        hashes,
        ticks: num_ticks,
        num_battles,
    }
}

/// Compare two battles tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the battles match throughout, `Some(tick)` for the first tick
/// after which their hashes differ (0 means the setups already differ).
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64, delta: Fixed) -> Option<u64>
where
    F: Fn() -> BattleEngine,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        first.tick(delta);
        second.tick(delta);

        if first.state_hash() != second.state_hash() {
            debug!(tick, "Battles diverged");
            return Some(tick);
        }
    }

    None
}

/// Verify that a saved battle restores exactly and continues identically.
///
/// Runs `num_ticks`, saves, restores into a fresh engine from the same
/// setup, then runs both for another `num_ticks` and compares hashes.
pub fn verify_save_restore<F>(setup_fn: F, num_ticks: u64, delta: Fixed) -> bool
where
    F: Fn() -> BattleEngine,
{
    let mut original = setup_fn();
    for _ in 0..num_ticks {
        original.tick(delta);
    }

    let Ok(bytes) = original.save_state() else {
        return false;
    };

    let mut restored = setup_fn();
    if restored.restore_state(&bytes).is_err() {
        return false;
    }
    if restored.state_hash() != original.state_hash() {
        return false;
    }

    if original.is_running() {
        restored.start();
    }
    for _ in 0..num_ticks {
        original.tick(delta);
        restored.tick(delta);
    }

    original.state_hash() == restored.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, duel_engine, sample_game_data, skirmish_engine, test_config, STEP};
    use crate::strategies::arb_spawn_list;
    use proptest::prelude::*;
    use squad_core::components::Team;

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
    fn test_unique_hashes_dedups() {
        let result = DeterminismResult {
            is_deterministic: false,
            hashes: vec![3, 1, 3],
            ticks: 1,
        };
        assert_eq!(result.unique_hashes(), vec![1, 3]);
    }

    #[test]
    fn test_empty_battle_determinism() {
        assert!(verify_battle_determinism(
            || squad_core::engine::BattleEngine::new(sample_game_data(), test_config(1)),
            50,
            STEP,
        ));
    }

    #[test]
    fn test_duel_determinism() {
        assert!(verify_battle_determinism(|| duel_engine(11), 200, STEP));
    }

    #[test]
    fn test_skirmish_has_no_divergence() {
        assert_eq!(find_first_divergence(|| skirmish_engine(3), 300, STEP), None);
    }

    #[test]
    fn test_different_setups_diverge_at_zero() {
        use std::cell::Cell;

        let calls = Cell::new(0);
        let divergence = find_first_divergence(
            || {
                calls.set(calls.get() + 1);
                let mut engine = duel_engine(5);
                if calls.get() == 2 {
                    engine
                        .spawn_unit("archer", Team::Enemy, at(1000, 100))
                        .unwrap();
                }
                engine
            },
            10,
            STEP,
        );
        assert_eq!(divergence, Some(0));
    }

    // =========================================================================
    // Save / restore
    // =========================================================================

    #[test]
    fn test_save_restore_mid_skirmish() {
        assert!(verify_save_restore(|| skirmish_engine(9), 120, STEP));
    }

    // =========================================================================
    // Parallel runs
    // =========================================================================

    #[test]
    fn test_parallel_skirmishes_match() {
        run_parallel_battles_scoped(|| skirmish_engine(21), 4, 200, STEP).assert_deterministic();
    }

    // =========================================================================
    // Property tests
    // =========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_random_armies_are_deterministic(spawns in arb_spawn_list(8), seed in 0u64..1000) {
            let setup = || {
                let mut engine =
                    squad_core::engine::BattleEngine::new(sample_game_data(), test_config(seed));
                for spawn in &spawns {
                    engine.spawn_unit(spawn.unit_type, spawn.team, spawn.position).unwrap();
                }
                engine.start();
                engine
            };
            prop_assert!(verify_battle_determinism(setup, 60, STEP));
        }
    }
}
