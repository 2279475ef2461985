pub mod agent;
pub mod behavior;
pub mod brain;
pub mod config;
pub mod driver;
pub mod hex;
pub mod record;
pub mod sensor;
pub mod simulation;
pub mod world;

pub use agent::{Agent, AgentId, AgentSlots};
pub use behavior::{Actions, BehaviorKind, Decision};
pub use brain::{Activation, Brain, BrainKind, Topology};
pub use config::{ConfigError, SettingsError, SettingsSource, SimConfig, ThresholdMode};
pub use driver::{FrameOutcome, Simulation};
pub use hex::{Axial, Cubic, Direction};
pub use record::{select_by_score, Record, RecordHistory};
pub use sensor::Sensor;
pub use simulation::SimulationState;
pub use world::{World, WorldCell};

use shared::SimulationStats;

/// Run a headless simulation for `ticks` ticks and report the final statistics.
pub fn run_simulation(config: SimConfig, ticks: u64) -> Result<SimulationStats, ConfigError> {
    let mut state = SimulationState::new(config)?;
    for _ in 0..ticks {
        state.tick();
    }
    let stats = state.stats();
    tracing::debug!(
        tick = stats.tick,
        living = stats.living,
        births = stats.births,
        deaths = stats.deaths,
        "headless run finished"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_runs() {
        let config = SimConfig {
            rng_seed: Some(42),
            ..Default::default()
        };
        let stats = run_simulation(config, 500).unwrap();

        assert_eq!(stats.tick, 500);
        assert!(stats.living > 0);
        assert!(stats.living <= stats.population_limit);
        assert_eq!(stats.records, 5);
    }

    #[test]
    fn test_simulation_produces_food_and_scores() {
        let config = SimConfig {
            width: 30,
            height: 30,
            max_agents: 200,
            initial_agents: 60,
            food_spawn_rate: 1.0,
            rng_seed: Some(7),
            ..Default::default()
        };
        let stats = run_simulation(config, 2000).unwrap();

        assert!(stats.food_cells > 0 || stats.total_score > 0);
        assert!(stats.average_score() >= 0.0);
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let config = SimConfig {
            height: -1,
            ..Default::default()
        };
        assert!(run_simulation(config, 10).is_err());
    }
}
