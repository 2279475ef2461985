use crate::agent::{Agent, AgentId, AgentSlots};
use crate::behavior::Decision;
use crate::brain::Brain;
use crate::config::{ConfigError, SettingsError, SimConfig};
use crate::hex::{Axial, Direction};
use crate::record::{select_by_score, Record, RecordHistory};
use crate::sensor::SenseContext;
use crate::world::World;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{AgentView, BlockKind, GenomeLayout, RecordView, SimulationStats};
use std::collections::HashMap;
use uuid::Uuid;

/// The whole simulation: grid, agents, history and the RNG that drives them.
///
/// Every random draw goes through the one seeded RNG, so two states built
/// from the same config with the same `rng_seed` evolve identically.
pub struct SimulationState {
    pub(crate) config: SimConfig,
    pub(crate) layout: GenomeLayout,
    pub(crate) brain: Brain,
    pub(crate) world: World,
    pub(crate) agents: AgentSlots,
    pub(crate) records: RecordHistory,
    pub(crate) rng: StdRng,
    pub(crate) tick: u64,
    pub(crate) population_limit: usize,
    pub(crate) births: u64,
    pub(crate) deaths: u64,
    run_id: Uuid,
}

impl SimulationState {
    /// Validate `config`, build the world and seed the initial population.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let layout = config.genome_layout()?;
        let brain = Brain::new(&config.topology(), &layout, config.activation);
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut state = Self {
            world: World::new(config.width, config.height),
            agents: AgentSlots::new(config.max_agents, &layout),
            records: RecordHistory::new(config.record_capacity),
            population_limit: config.initial_agents,
            config,
            layout,
            brain,
            rng,
            tick: 0,
            births: 0,
            deaths: 0,
            run_id: Uuid::new_v4(),
        };
        for index in 0..state.population_limit {
            state.seed_slot(index);
        }

        tracing::info!(
            run_id = %state.run_id,
            agents = state.agents.living_count(),
            genes = state.layout.len(),
            "simulation initialised"
        );
        Ok(state)
    }

    /// Advance one tick.
    ///
    /// 1. Empty reserved slots are re-seeded with random genomes.
    /// 2. Food may appear on one random cell.
    /// 3. Each living agent, in slot order, decays, senses, decides and acts.
    /// 4. Every `record_sample_rate` ticks a history sample is taken.
    pub fn tick(&mut self) {
        self.respawn_reserved();
        self.world
            .spawn_food(&mut self.rng, self.config.food_spawn_rate);

        let decay = self.config.health_decay * self.cycle_modifier();
        for index in 0..self.population_limit {
            if self.agents.slot(index).alive {
                self.run_agent(index, decay);
            }
        }

        if self.tick % self.config.record_sample_rate == 0 {
            self.sample_record();
        }
        self.tick += 1;
    }

    fn respawn_reserved(&mut self) {
        let reserved = self.config.reserved_agents.min(self.population_limit);
        for index in 0..reserved {
            if !self.agents.slot(index).alive {
                self.seed_slot(index);
            }
        }
    }

    /// One agent's turn. An agent whose health reaches zero, from decay or
    /// from its own behavior costs, leaves the world.
    fn run_agent(&mut self, index: usize, decay: f32) {
        let id = self.agents.id_of(index);
        let agent = self.agents.slot_mut(index);
        agent.pay(decay);
        agent.age += 1;
        if agent.is_starved() {
            self.remove_agent(id);
            return;
        }

        if let Some(decision) = self.decide(id) {
            self.apply(id, &decision);
        }
        if self.agents.get(id).is_some_and(Agent::is_starved) {
            self.remove_agent(id);
        }
    }

    /// Evaluate every configured sensor for `id`. Does not touch any state.
    pub fn sense(&self, id: AgentId) -> Option<Vec<f32>> {
        let agent = self.agents.get(id)?;
        let ctx = SenseContext {
            world: &self.world,
            agents: &self.agents,
            max_health: self.config.max_health,
            day_phase: self.day_phase(),
        };
        Some(
            self.config
                .sensors
                .iter()
                .map(|sensor| sensor.sense(&ctx, agent))
                .collect(),
        )
    }

    /// Sense and run the brain for `id`, without acting on the result.
    pub fn decide(&self, id: AgentId) -> Option<Decision> {
        let inputs = self.sense(id)?;
        let agent = self.agents.get(id)?;
        let outputs = self.brain.evaluate(&agent.genome, &inputs);
        Some(Decision::from_outputs(
            &self.config,
            agent.genome.block(self.layout.range(BlockKind::Thresholds)),
            agent.genome.block(self.layout.range(BlockKind::MemoryScale)),
            &outputs,
        ))
    }

    /// Take a living agent out of the world: free its cell, clear its
    /// children's parent links and retire its id.
    pub fn remove_agent(&mut self, id: AgentId) -> bool {
        let Some(agent) = self.agents.get_mut(id) else {
            return false;
        };
        let position = agent.position;
        agent.deactivate();
        self.world.vacate(position, id);
        self.agents.orphan_children(id);
        self.deaths += 1;
        tracing::debug!(slot = id.index(), tick = self.tick, "agent died");
        true
    }

    /// Bring an inactive slot to life with a random genome on a random free cell.
    fn seed_slot(&mut self, index: usize) -> Option<AgentId> {
        debug_assert!(!self.agents.slot(index).alive);
        let position = self.world.random_free_cell(&mut self.rng)?;
        let orientation = Direction::new(self.rng.gen_range(0..Direction::COUNT as i32));
        let agent = self.agents.slot_mut(index);
        agent.randomize(&self.layout, &mut self.rng);
        agent.reset(&self.layout, position, orientation, self.config.max_health);
        let id = self.agents.id_of(index);
        self.world.occupy(position, id);
        Some(id)
    }

    /// Put a fresh random agent into a specific slot and cell.
    ///
    /// Fails if the slot is taken or out of range, or the cell is not free.
    /// The population limit grows to include the slot.
    pub fn place_agent(
        &mut self,
        index: usize,
        position: Axial,
        orientation: Direction,
    ) -> Option<AgentId> {
        if index >= self.agents.capacity()
            || self.agents.slot(index).alive
            || !self.world.is_free(position)
        {
            return None;
        }
        let agent = self.agents.slot_mut(index);
        agent.randomize(&self.layout, &mut self.rng);
        agent.reset(&self.layout, position, orientation, self.config.max_health);
        let id = self.agents.id_of(index);
        self.world.occupy(position, id);
        self.population_limit = self.population_limit.max(index + 1);
        Some(id)
    }

    fn sample_record(&mut self) {
        let Some(selected) = select_by_score(&self.agents, &mut self.rng) else {
            return;
        };
        if let Some(record) = Record::capture(self.tick, &self.agents, selected) {
            tracing::debug!(
                tick = self.tick,
                selected = selected.index(),
                living = self.agents.living_count(),
                "history sample"
            );
            self.records.push(record);
        }
    }

    /// Position in the environmental cycle, `[0, 1)`.
    pub fn day_phase(&self) -> f32 {
        (self.tick % self.config.day_length) as f32 / self.config.day_length as f32
    }

    /// Multiplier on health decay for the current tick.
    pub fn cycle_modifier(&self) -> f32 {
        1.0 + self.config.day_amplitude * (std::f32::consts::TAU * self.day_phase()).sin()
    }

    /// Raise the population limit by one and seed the new slot.
    pub fn grow_population(&mut self) -> bool {
        if self.population_limit >= self.agents.capacity() {
            return false;
        }
        let index = self.population_limit;
        self.population_limit += 1;
        if !self.agents.slot(index).alive && self.seed_slot(index).is_none() {
            tracing::trace!(slot = index, "no free cell for new slot");
        }
        true
    }

    /// Remove the agent in the last slot and lower the population limit.
    pub fn shrink_population(&mut self) -> bool {
        if self.population_limit == 0 {
            return false;
        }
        self.population_limit -= 1;
        let id = self.agents.id_of(self.population_limit);
        self.remove_agent(id);
        true
    }

    /// Set the population limit directly, without seeding new slots.
    /// Agents in slots at or above the new limit are removed.
    pub fn set_population_limit(&mut self, limit: usize) {
        let limit = limit.min(self.agents.capacity());
        for index in limit..self.population_limit {
            let id = self.agents.id_of(index);
            self.remove_agent(id);
        }
        self.population_limit = limit;
    }

    /// Kill the highest-scoring living agent.
    pub fn remove_leader(&mut self) -> Option<AgentId> {
        let id = self.agents.id_of(self.agents.leader()?);
        self.remove_agent(id).then_some(id)
    }

    /// Apply live settings, logging and returning the ones that were rejected.
    pub fn apply_settings(&mut self, settings: &HashMap<String, f64>) -> Vec<SettingsError> {
        let errors = self.config.apply_settings(settings);
        for error in &errors {
            tracing::warn!(%error, "ignoring setting");
        }
        errors
    }

    pub fn set_food_spawn_rate(&mut self, rate: f32) {
        self.config.food_spawn_rate = rate.clamp(0.0, 1.0);
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn layout(&self) -> &GenomeLayout {
        &self.layout
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn agents(&self) -> &AgentSlots {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(id)
    }

    pub fn records(&self) -> &RecordHistory {
        &self.records
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn population_limit(&self) -> usize {
        self.population_limit
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn births(&self) -> u64 {
        self.births
    }

    pub fn deaths(&self) -> u64 {
        self.deaths
    }

    pub fn agent_views(&self) -> Vec<AgentView> {
        self.agents
            .iter_alive()
            .map(|(id, agent)| AgentView {
                slot: id.index(),
                generation: id.generation(),
                q: agent.position.q,
                r: agent.position.r,
                orientation: agent.orientation.index(),
                health: agent.health,
                score: agent.score,
                hue: agent.hue,
                age: agent.age,
                parent: agent
                    .parent
                    .filter(|&p| self.agents.get(p).is_some())
                    .map(AgentId::index),
                eating: agent.last_actions.eat,
                pixel: agent.position.to_pixel(self.config.hex_size),
            })
            .collect()
    }

    pub fn food_cells(&self) -> Vec<(i32, i32)> {
        self.world
            .cells()
            .filter(|(_, cell)| cell.food)
            .map(|(pos, _)| (pos.q, pos.r))
            .collect()
    }

    pub fn record_views(&self) -> Vec<RecordView> {
        self.records.iter().map(Record::to_view).collect()
    }

    pub fn stats(&self) -> SimulationStats {
        let living: Vec<&Agent> = self.agents.iter_alive().map(|(_, a)| a).collect();
        SimulationStats {
            run_id: self.run_id,
            tick: self.tick,
            living: living.len(),
            population_limit: self.population_limit,
            total_score: living.iter().map(|a| a.score as u64).sum(),
            best_score: living.iter().map(|a| a.score).max().unwrap_or(0),
            food_cells: self.world.food_count(),
            births: self.births,
            deaths: self.deaths,
            records: self.records.len(),
            food_spawn_rate: self.config.food_spawn_rate,
        }
    }
}
