//! Battle scenarios and headless simulation.
//!
//! A scenario lists the starting armies; [`simulate`] runs it to a decision
//! (or a tick limit) and summarizes the result as a serializable report.

use std::path::Path;

use serde::{Deserialize, Serialize};

use squad_core::components::Team;
use squad_core::config::BattleConfig;
use squad_core::data::GameData;
use squad_core::engine::{BattleEngine, BattleOutcome};
use squad_core::math::{decimal_serde, Fixed, Vec2Fixed};
use squad_core::progress::PlayerProgress;

use crate::data_loader::{load_ron_file, DataLoadResult};

/// One unit placed at battle start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Unit definition id.
    pub unit_type: String,
    /// X position.
    #[serde(with = "decimal_serde")]
    pub x: Fixed,
    /// Y position.
    #[serde(with = "decimal_serde")]
    pub y: Fixed,
}

impl Placement {
    /// Place a unit at integer coordinates.
    pub fn new(unit_type: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            unit_type: unit_type.into(),
            x: Fixed::from_num(x),
            y: Fixed::from_num(y),
        }
    }
}

/// A complete battle setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Wave number recorded on victory.
    #[serde(default = "default_wave")]
    pub wave: u32,
    /// Player army.
    pub player: Vec<Placement>,
    /// Enemy army.
    pub enemy: Vec<Placement>,
}

const fn default_wave() -> u32 {
    1
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Border Skirmish".to_string(),
            wave: 1,
            player: vec![
                Placement::new("soldier", 500, 250),
                Placement::new("soldier", 500, 350),
                Placement::new("knight", 460, 300),
                Placement::new("archer", 380, 300),
            ],
            enemy: vec![
                Placement::new("soldier", 1100, 260),
                Placement::new("soldier", 1100, 340),
                Placement::new("ogre", 1160, 300),
                Placement::new("tower", 1400, 300),
            ],
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> DataLoadResult<Self> {
        load_ron_file(path)
    }

    /// Build a started engine with every placement spawned.
    ///
    /// # Errors
    ///
    /// Returns an error if a placement names an unknown unit type.
    pub fn build_engine(
        &self,
        data: GameData,
        config: BattleConfig,
        progress: PlayerProgress,
    ) -> squad_core::error::Result<BattleEngine> {
        let mut engine = BattleEngine::new(data, config).with_progress(progress);
        engine.set_wave(self.wave);
        let armies = [(Team::Player, &self.player), (Team::Enemy, &self.enemy)];
        for (team, placements) in armies {
            for placement in placements {
                engine.spawn_unit(&placement.unit_type, team, Vec2Fixed::new(placement.x, placement.y))?;
            }
        }
        engine.start();
        Ok(engine)
    }
}

/// Summary of a simulated battle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    /// Scenario name.
    pub scenario: String,
    /// RNG seed used.
    pub seed: u64,
    /// Ticks simulated.
    pub ticks: u64,
    /// Battle time in seconds.
    pub elapsed_seconds: f64,
    /// Result, if decided within the tick limit.
    pub outcome: Option<BattleOutcome>,
    /// Player units alive at the end.
    pub player_survivors: usize,
    /// Enemy units alive at the end.
    pub enemy_survivors: usize,
    /// Units that died.
    pub deaths: usize,
    /// Total damage dealt by attacks and effects.
    pub damage_dealt: f64,
    /// Abilities fired.
    pub abilities_fired: usize,
    /// Final state hash.
    pub state_hash: u64,
    /// Currency banked after the battle.
    pub currency: u64,
}

/// Tick `engine` by `delta` until decided or `max_ticks` pass.
pub fn simulate(scenario_name: &str, engine: &mut BattleEngine, max_ticks: u64, delta: Fixed) -> SimulationReport {
    let mut deaths = 0;
    let mut damage = Fixed::ZERO;
    let mut abilities_fired = 0;

    for _ in 0..max_ticks {
        let events = engine.tick(delta);
        deaths += events.deaths.len();
        abilities_fired += events.abilities.len();
        damage = events
            .damage_events
            .iter()
            .fold(damage, |acc, e| acc.saturating_add(e.amount));
        if engine.outcome().is_some() {
            break;
        }
    }

    let report = SimulationReport {
        scenario: scenario_name.to_string(),
        seed: engine.config().seed,
        ticks: engine.tick_count(),
        elapsed_seconds: engine.elapsed().to_num(),
        outcome: engine.outcome(),
        player_survivors: engine.living_count(Team::Player),
        enemy_survivors: engine.living_count(Team::Enemy),
        deaths,
        damage_dealt: damage.to_num(),
        abilities_fired,
        state_hash: engine.state_hash(),
        currency: engine.progress().currency,
    };

    tracing::info!(
        "Scenario '{}' finished after {} ticks: {:?}",
        report.scenario,
        report.ticks,
        report.outcome
    );

    report
}
