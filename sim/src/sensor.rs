use crate::agent::{Agent, AgentSlots};
use crate::world::World;
use serde::{Deserialize, Serialize};

/// A perception primitive producing one network input.
///
/// Directions are relative to the agent's orientation; `distance` counts
/// steps along that direction, so distance 0 is the agent's own cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Sensor {
    /// 1.0 if the target cell has food, else 0.0.
    Food { relative_direction: i32, distance: u32 },
    /// Occupant's hue if the target cell holds a living agent, else 0.0.
    Agent { relative_direction: i32, distance: u32 },
    /// Own health divided by max health.
    SelfHealth,
    /// One of the agent's memory cells.
    Memory { slot: usize },
    /// Scans `limit` cells straight ahead starting at the agent's own cell;
    /// `(limit - j) / limit` for the first food at step `j`, else 0.0.
    FoodAhead { limit: u32 },
    /// Position in the environmental cycle, in `[0, 1)`.
    DayPhase,
}

/// Read-only view of everything a sensor may look at.
pub struct SenseContext<'a> {
    pub world: &'a World,
    pub agents: &'a AgentSlots,
    pub max_health: f32,
    pub day_phase: f32,
}

impl Sensor {
    pub fn sense(&self, ctx: &SenseContext<'_>, agent: &Agent) -> f32 {
        match *self {
            Sensor::Food {
                relative_direction,
                distance,
            } => {
                let target = agent
                    .position
                    .project(agent.orientation.rotate(relative_direction), distance);
                if ctx.world.has_food(target) {
                    1.0
                } else {
                    0.0
                }
            }
            Sensor::Agent {
                relative_direction,
                distance,
            } => {
                let target = agent
                    .position
                    .project(agent.orientation.rotate(relative_direction), distance);
                ctx.world
                    .occupant(target)
                    .and_then(|id| ctx.agents.get(id))
                    .map_or(0.0, |other| other.hue)
            }
            Sensor::SelfHealth => agent.health / ctx.max_health,
            Sensor::Memory { slot } => agent.memory.get(slot).copied().unwrap_or(0.0),
            Sensor::FoodAhead { limit } => (0..limit)
                .find(|&j| {
                    ctx.world
                        .has_food(agent.position.project(agent.orientation, j))
                })
                .map_or(0.0, |j| (limit - j) as f32 / limit as f32),
            Sensor::DayPhase => ctx.day_phase,
        }
    }
}
