//! Behaviors: turning network outputs into actions on the world.

use crate::agent::AgentId;
use crate::config::{SimConfig, ThresholdMode};
use crate::hex::{Axial, Direction};
use crate::simulation::SimulationState;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Behavior primitives, ordered the way they are applied within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    Eat,
    Move,
    Kill,
    Rotate,
    Spawn,
}

/// Which behaviors fired on an agent's last turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actions {
    pub eat: bool,
    pub moved: bool,
    pub kill: bool,
    /// -1, 0 or +1 orientation steps.
    pub turn: i8,
    pub spawn: bool,
}

/// Everything an agent decided to do this tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decision {
    pub actions: Actions,
    /// Values to store in memory, already scaled.
    pub memory: Vec<f32>,
}

impl Decision {
    /// Map raw network outputs onto actions.
    ///
    /// `outputs` holds one value per enabled behavior (in `config.behaviors`
    /// order) followed by one value per memory cell. `thresholds` is the
    /// genome's threshold block and is empty in fixed-threshold mode.
    pub fn from_outputs(
        config: &SimConfig,
        thresholds: &[f32],
        memory_scale: &[f32],
        outputs: &[f32],
    ) -> Self {
        let mut actions = Actions::default();
        for (k, kind) in config.behaviors.iter().enumerate() {
            let output = outputs[k];
            let threshold = match config.thresholds {
                ThresholdMode::Genome => thresholds[k],
                ThresholdMode::Fixed(t) => t,
            };
            match kind {
                BehaviorKind::Eat => actions.eat = output > threshold,
                BehaviorKind::Move => actions.moved = output > threshold,
                BehaviorKind::Kill => actions.kill = output > threshold,
                BehaviorKind::Spawn => actions.spawn = output > threshold,
                BehaviorKind::Rotate => {
                    let gain = match config.thresholds {
                        ThresholdMode::Genome => threshold,
                        ThresholdMode::Fixed(_) => 1.0,
                    };
                    actions.turn = rotation_steps(output * gain, config.rotation_dead_zone);
                }
            }
        }
        let memory = outputs[config.behaviors.len()..]
            .iter()
            .zip(memory_scale)
            .map(|(out, scale)| out * scale)
            .collect();
        Self { actions, memory }
    }
}

/// Turn direction for a scaled rotation output.
pub fn rotation_steps(value: f32, dead_zone: f32) -> i8 {
    if value < 0.5 - dead_zone {
        -1
    } else if value > 0.5 + dead_zone {
        1
    } else {
        0
    }
}

impl SimulationState {
    /// Eat the food on the agent's own cell, if any.
    pub fn eat(&mut self, id: AgentId) -> bool {
        let Some(agent) = self.agents.get_mut(id) else {
            return false;
        };
        if !self.world.take_food(agent.position) {
            return false;
        }
        agent.feed(self.config.food_value, self.config.max_health);
        agent.score += 1;
        true
    }

    /// Step one cell forward. Blocked by other agents and the world edge;
    /// the move cost is paid either way.
    pub fn advance(&mut self, id: AgentId) -> bool {
        let Some(agent) = self.agents.get_mut(id) else {
            return false;
        };
        agent.pay(self.config.move_cost);
        let destination = agent.position.step(agent.orientation);
        if !self.world.relocate(agent.position, destination, id) {
            tracing::trace!(slot = id.index(), "move blocked");
            return false;
        }
        agent.position = destination;
        true
    }

    /// Kill whatever agent stands directly ahead. Returns the victim.
    pub fn kill_ahead(&mut self, id: AgentId) -> Option<AgentId> {
        let agent = self.agents.get_mut(id)?;
        agent.pay(self.config.kill_cost);
        let target = agent.position.step(agent.orientation);
        let victim = self.world.occupant(target).filter(|&v| v != id)?;
        self.remove_agent(victim);
        Some(victim)
    }

    /// Rotate by `steps` orientation steps.
    pub fn turn(&mut self, id: AgentId, steps: i32) {
        if steps == 0 {
            return;
        }
        if let Some(agent) = self.agents.get_mut(id) {
            agent.orientation = agent.orientation.rotate(steps);
            agent.pay(self.config.rotate_cost * steps.unsigned_abs() as f32);
        }
    }

    /// Reproduce into the first free slot at or above the reserved range,
    /// placing the child on a random empty neighbouring cell.
    ///
    /// Requires health above `spawn_health_fraction * max_health`. The cost
    /// is paid even when no slot or cell is free. On success the parent's
    /// health is halved and the child starts with the same amount.
    pub fn spawn_child(&mut self, parent_id: AgentId) -> Option<AgentId> {
        let threshold = self.config.spawn_health_fraction * self.config.max_health;
        let parent = self.agents.get_mut(parent_id)?;
        if parent.health <= threshold {
            return None;
        }
        parent.pay(self.config.spawn_cost);
        let position = parent.position;
        let hue = parent.hue;
        let mut genome = parent.genome.clone();

        let Some(slot) = self
            .agents
            .first_free(self.config.reserved_agents, self.population_limit)
        else {
            tracing::trace!(parent = parent_id.index(), "no free slot for child");
            return None;
        };
        let free: Vec<Axial> = position
            .neighbors()
            .into_iter()
            .filter(|&p| self.world.is_free(p))
            .collect();
        let Some(&target) = free.choose(&mut self.rng) else {
            tracing::trace!(parent = parent_id.index(), "no room around parent");
            return None;
        };

        genome.mutate(self.config.mutation_rate, self.config.mutation_scale, &mut self.rng);
        let orientation = Direction::new(self.rng.gen_range(0..Direction::COUNT as i32));

        let parent = self.agents.get_mut(parent_id)?;
        parent.health /= 2.0;
        let health = parent.health;

        let child = self.agents.slot_mut(slot);
        child.genome = genome;
        child.hue = hue;
        child.reset(&self.layout, target, orientation, self.config.max_health);
        child.health = health;
        child.parent = Some(parent_id);

        let child_id = self.agents.id_of(slot);
        self.world.occupy(target, child_id);
        self.births += 1;
        tracing::debug!(parent = parent_id.index(), child = slot, "spawned");
        Some(child_id)
    }

    /// Overwrite the agent's memory.
    pub fn remember(&mut self, id: AgentId, values: &[f32]) {
        if let Some(agent) = self.agents.get_mut(id) {
            for (cell, value) in agent.memory.iter_mut().zip(values) {
                *cell = *value;
            }
        }
    }

    /// Apply a decision in canonical order: eat, move, kill, rotate, spawn,
    /// then the memory write.
    pub fn apply(&mut self, id: AgentId, decision: &Decision) {
        let actions = decision.actions;
        if let Some(agent) = self.agents.get_mut(id) {
            agent.last_actions = actions;
        }
        if actions.eat {
            self.eat(id);
        }
        if actions.moved {
            self.advance(id);
        }
        if actions.kill {
            self.kill_ahead(id);
        }
        self.turn(id, actions.turn as i32);
        if actions.spawn {
            self.spawn_child(id);
        }
        self.remember(id, &decision.memory);
    }
}
