use crate::behavior::BehaviorKind;
use crate::brain::{Activation, BrainKind, Topology};
use crate::sensor::Sensor;
use serde::{Deserialize, Serialize};
use shared::{BlockKind, GenomeError, GenomeLayout};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors raised when a configuration cannot produce a working simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),

    #[error("sensor reads memory slot {slot} but memory_size is {memory_size}")]
    MemorySlotOutOfRange { slot: usize, memory_size: usize },

    #[error("behaviors must be listed once each in canonical order (eat, move, kill, rotate, spawn)")]
    BehaviorOrder,

    #[error("genome layout: {0}")]
    Genome(#[from] GenomeError),
}

/// Errors raised while applying a live setting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("unknown setting `{0}`")]
    Unknown(String),

    #[error("setting `{name}` must be finite and in range, got {value}")]
    OutOfRange { name: String, value: f64 },
}

/// Where behavior trigger thresholds come from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// One evolved threshold gene per behavior.
    Genome,
    /// The same constant for every behavior and every agent.
    Fixed(f32),
}

/// Static configuration for a simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Grid extent along q.
    pub width: i32,
    /// Grid extent along r.
    pub height: i32,
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
    /// Capacity of the agent slot array.
    pub max_agents: usize,
    /// Population limit at start-up; agents are seeded into slots `0..initial_agents`.
    pub initial_agents: usize,
    /// Slots `0..reserved_agents` are re-seeded with random genomes whenever empty.
    /// Children are never placed in them.
    pub reserved_agents: usize,
    pub max_health: f32,
    /// Health gained per food eaten (capped at `max_health`).
    pub food_value: f32,
    /// Health lost every tick.
    pub health_decay: f32,
    /// Probability per tick that one random cell gains food.
    pub food_spawn_rate: f32,
    /// Length of the environmental cycle in ticks.
    pub day_length: u64,
    /// Amplitude of the decay modulation over the cycle; 0 disables it.
    pub day_amplitude: f32,
    pub move_cost: f32,
    pub rotate_cost: f32,
    pub kill_cost: f32,
    pub spawn_cost: f32,
    /// Spawning requires health above this fraction of `max_health`.
    pub spawn_health_fraction: f32,
    /// Per-gene probability of mutation on reproduction.
    pub mutation_rate: f32,
    /// Standard deviation of the mutation noise.
    pub mutation_scale: f32,
    /// Half-width of the no-turn band around 0.5 for the rotation output.
    pub rotation_dead_zone: f32,
    pub thresholds: ThresholdMode,
    /// Network inputs, in order.
    pub sensors: Vec<Sensor>,
    /// Enabled behaviors, in canonical order.
    pub behaviors: Vec<BehaviorKind>,
    /// Number of short-term memory cells per agent.
    pub memory_size: usize,
    pub brain: BrainKind,
    pub activation: Activation,
    /// Ticks between history samples.
    pub record_sample_rate: u64,
    /// Number of history samples retained.
    pub record_capacity: usize,
    /// Hex radius in pixels, for pixel projections handed to renderers.
    pub hex_size: f32,
    /// Base for the speed tiers (simulation ticks per rendered frame).
    pub turbo_rate: u64,
    /// Wall-clock interval between live settings reloads.
    pub settings_poll_millis: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            rng_seed: None,
            max_agents: 1000,
            initial_agents: 50,
            reserved_agents: 20,
            max_health: 100.0,
            food_value: 100.0,
            health_decay: 0.1,
            food_spawn_rate: 0.304482,
            day_length: 2000,
            day_amplitude: 0.0,
            move_cost: 0.0,
            rotate_cost: 0.0,
            kill_cost: 0.0,
            spawn_cost: 0.0,
            spawn_health_fraction: 0.5,
            mutation_rate: 0.1,
            mutation_scale: 0.25,
            rotation_dead_zone: 0.0,
            thresholds: ThresholdMode::Genome,
            sensors: vec![
                Sensor::Food {
                    relative_direction: 0,
                    distance: 0,
                },
                Sensor::Food {
                    relative_direction: 0,
                    distance: 1,
                },
                Sensor::Food {
                    relative_direction: -1,
                    distance: 1,
                },
                Sensor::Food {
                    relative_direction: 1,
                    distance: 1,
                },
                Sensor::Agent {
                    relative_direction: 0,
                    distance: 1,
                },
                Sensor::SelfHealth,
                Sensor::Memory { slot: 0 },
            ],
            behaviors: vec![
                BehaviorKind::Eat,
                BehaviorKind::Move,
                BehaviorKind::Rotate,
                BehaviorKind::Spawn,
            ],
            memory_size: 1,
            brain: BrainKind::Perceptron,
            activation: Activation::Tanh,
            record_sample_rate: 100,
            record_capacity: 1280,
            hex_size: 15.0,
            turbo_rate: 307,
            settings_poll_millis: 1000,
        }
    }
}

impl SimConfig {
    /// Check every structural constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width <= 0 || self.height <= 0 {
            return Err(ConfigError::Invalid("world dimensions must be positive"));
        }
        if self.max_agents == 0 {
            return Err(ConfigError::Invalid("max_agents must be non-zero"));
        }
        if self.max_agents > (self.width as usize) * (self.height as usize) {
            return Err(ConfigError::Invalid("max_agents exceeds the number of cells"));
        }
        if self.initial_agents > self.max_agents {
            return Err(ConfigError::Invalid("initial_agents exceeds max_agents"));
        }
        if self.reserved_agents > self.initial_agents {
            return Err(ConfigError::Invalid("reserved_agents exceeds initial_agents"));
        }
        if !(self.max_health.is_finite() && self.max_health > 0.0) {
            return Err(ConfigError::Invalid("max_health must be positive"));
        }
        if !(0.0..=1.0).contains(&self.food_spawn_rate) {
            return Err(ConfigError::Invalid("food_spawn_rate must be a probability"));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(ConfigError::Invalid("mutation_rate must be a probability"));
        }
        if self.day_length == 0 {
            return Err(ConfigError::Invalid("day_length must be non-zero"));
        }
        if !(0.0..=1.0).contains(&self.day_amplitude) {
            return Err(ConfigError::Invalid("day_amplitude must lie in [0, 1]"));
        }
        if self.record_sample_rate == 0 || self.record_capacity == 0 {
            return Err(ConfigError::Invalid("record sampling must be enabled"));
        }
        if self.turbo_rate == 0 {
            return Err(ConfigError::Invalid("turbo_rate must be non-zero"));
        }
        if self.sensors.is_empty() {
            return Err(ConfigError::Invalid("at least one sensor is required"));
        }
        for sensor in &self.sensors {
            if let Sensor::Memory { slot } = sensor {
                if *slot >= self.memory_size {
                    return Err(ConfigError::MemorySlotOutOfRange {
                        slot: *slot,
                        memory_size: self.memory_size,
                    });
                }
            }
        }
        if self.behaviors.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::BehaviorOrder);
        }
        if let BrainKind::FeedForward { hidden } = &self.brain {
            if hidden.is_empty() || hidden.len() > 2 {
                return Err(ConfigError::Invalid("feed-forward brains have one or two hidden layers"));
            }
            if hidden.contains(&0) {
                return Err(ConfigError::Invalid("hidden layers must be non-empty"));
            }
        }
        Ok(())
    }

    /// Network shape implied by the sensors, behaviors and memory.
    pub fn topology(&self) -> Topology {
        Topology::new(
            &self.brain,
            self.sensors.len(),
            self.behaviors.len() + self.memory_size,
        )
    }

    /// Gene layout every agent genome in this simulation follows.
    pub fn genome_layout(&self) -> Result<GenomeLayout, ConfigError> {
        let mut layout = GenomeLayout::new();
        for (layer, (fan_in, fan_out)) in self.topology().layers().into_iter().enumerate() {
            layout = layout.with_block(BlockKind::Weights(layer), fan_in * fan_out)?;
        }
        let thresholds = match self.thresholds {
            ThresholdMode::Genome => self.behaviors.len(),
            ThresholdMode::Fixed(_) => 0,
        };
        Ok(layout
            .with_block(BlockKind::Thresholds, thresholds)?
            .with_block(BlockKind::MemoryScale, self.memory_size)?
            .with_block(BlockKind::MemorySeed, self.memory_size)?)
    }

    /// Apply one live setting.
    pub fn apply_setting(&mut self, name: &str, value: f64) -> Result<(), SettingsError> {
        let out_of_range = || SettingsError::OutOfRange {
            name: name.to_string(),
            value,
        };
        if !value.is_finite() {
            return Err(out_of_range());
        }
        let v = value as f32;
        let probability = |v: f32| if (0.0..=1.0).contains(&v) { Ok(v) } else { Err(out_of_range()) };
        let non_negative = |v: f32| if v >= 0.0 { Ok(v) } else { Err(out_of_range()) };

        match name {
            "food_spawn_rate" => self.food_spawn_rate = probability(v)?,
            "health_decay" => self.health_decay = non_negative(v)?,
            "food_value" => self.food_value = non_negative(v)?,
            "move_cost" => self.move_cost = non_negative(v)?,
            "rotate_cost" => self.rotate_cost = non_negative(v)?,
            "kill_cost" => self.kill_cost = non_negative(v)?,
            "spawn_cost" => self.spawn_cost = non_negative(v)?,
            "mutation_rate" => self.mutation_rate = probability(v)?,
            "mutation_scale" => self.mutation_scale = non_negative(v)?,
            "spawn_health_fraction" => self.spawn_health_fraction = probability(v)?,
            "day_amplitude" => self.day_amplitude = probability(v)?,
            _ => return Err(SettingsError::Unknown(name.to_string())),
        }
        Ok(())
    }

    /// Apply every setting in `settings`, keeping the valid ones.
    ///
    /// Keys are applied in sorted order so the outcome does not depend on
    /// map iteration order.
    pub fn apply_settings(&mut self, settings: &HashMap<String, f64>) -> Vec<SettingsError> {
        let mut names: Vec<&String> = settings.keys().collect();
        names.sort();
        names
            .into_iter()
            .filter_map(|name| self.apply_setting(name, settings[name]).err())
            .collect()
    }
}

/// A live key/value settings store polled by the driver.
pub trait SettingsSource {
    /// Current settings, or `None` when nothing is available.
    fn read(&mut self) -> Option<HashMap<String, f64>>;
}

impl SettingsSource for HashMap<String, f64> {
    fn read(&mut self) -> Option<HashMap<String, f64>> {
        Some(self.clone())
    }
}

/// Tracks when the next settings reload is due.
#[derive(Debug, Clone)]
pub struct SettingsPoll {
    interval: Duration,
    last: Option<Instant>,
}

impl SettingsPoll {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Whether a reload is due at `now`; marks it as done when it is.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
