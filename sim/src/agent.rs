use crate::behavior::Actions;
use crate::hex::{Axial, Direction};
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared::{BlockKind, Genome, GenomeLayout};

/// Weak handle to an agent: slot index plus the slot's generation.
///
/// A slot's generation is bumped whenever its agent leaves the world, so an
/// id held across a death never resolves to the slot's next occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId {
    index: usize,
    generation: u32,
}

impl AgentId {
    pub const fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }

    pub const fn index(self) -> usize {
        self.index
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub alive: bool,
    pub position: Axial,
    pub orientation: Direction,
    pub health: f32,
    pub score: u32,
    /// Identity colour, inherited unchanged by children.
    pub hue: f32,
    pub genome: Genome,
    /// Lineage link for display; cleared when the parent dies.
    pub parent: Option<AgentId>,
    /// Values written by the memory behavior on the previous tick.
    pub memory: Vec<f32>,
    /// Ticks survived since the last reset.
    pub age: u64,
    pub last_actions: Actions,
    generation: u32,
}

impl Agent {
    /// Create an inert agent holding a placeholder genome.
    pub fn inert(layout: &GenomeLayout) -> Self {
        Self {
            alive: false,
            position: Axial::default(),
            orientation: Direction::new(0),
            health: 0.0,
            score: 0,
            hue: 0.0,
            genome: Genome::zeros(layout),
            parent: None,
            memory: vec![0.0; layout.range(BlockKind::MemorySeed).len()],
            age: 0,
            last_actions: Actions::default(),
            generation: 0,
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Give the agent a fresh random genome and identity colour.
    pub fn randomize<R: Rng + ?Sized>(&mut self, layout: &GenomeLayout, rng: &mut R) {
        self.genome = Genome::random(layout, rng);
        self.hue = rng.gen::<f32>();
    }

    /// Bring the agent to life at `position` with full health and zero score.
    ///
    /// The genome must already be populated; memory starts from its seed block.
    pub fn reset(
        &mut self,
        layout: &GenomeLayout,
        position: Axial,
        orientation: Direction,
        max_health: f32,
    ) {
        self.alive = true;
        self.position = position;
        self.orientation = orientation;
        self.health = max_health;
        self.score = 0;
        self.parent = None;
        self.age = 0;
        self.last_actions = Actions::default();
        self.memory = self
            .genome
            .block(layout.range(BlockKind::MemorySeed))
            .to_vec();
    }

    /// Take the agent out of the world. The slot's generation moves on.
    pub(crate) fn deactivate(&mut self) {
        self.alive = false;
        self.score = 0;
        self.health = 0.0;
        self.parent = None;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Add health from food, capped at `max_health`.
    pub fn feed(&mut self, amount: f32, max_health: f32) {
        self.health = (self.health + amount).min(max_health);
    }

    /// Deduct a behavior cost.
    pub fn pay(&mut self, cost: f32) {
        self.health -= cost;
    }

    pub fn is_starved(&self) -> bool {
        self.health <= 0.0
    }
}

/// Fixed-capacity, index-addressed agent storage.
///
/// Inactive slots are reused by scanning for the first free index, so reuse
/// order is deterministic.
#[derive(Debug, Clone)]
pub struct AgentSlots {
    agents: Vec<Agent>,
}

impl AgentSlots {
    pub fn new(capacity: usize, layout: &GenomeLayout) -> Self {
        Self {
            agents: (0..capacity).map(|_| Agent::inert(layout)).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.agents.len()
    }

    /// Current id of a slot, whether or not it is alive.
    pub fn id_of(&self, index: usize) -> AgentId {
        AgentId::new(index, self.agents[index].generation)
    }

    /// Resolve a weak id. `None` if the agent died or the slot was reused.
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents
            .get(id.index)
            .filter(|a| a.alive && a.generation == id.generation)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents
            .get_mut(id.index)
            .filter(|a| a.alive && a.generation == id.generation)
    }

    pub fn slot(&self, index: usize) -> &Agent {
        &self.agents[index]
    }

    pub fn slot_mut(&mut self, index: usize) -> &mut Agent {
        &mut self.agents[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.agents.iter()
    }

    /// Living agents in slot order.
    pub fn iter_alive(&self) -> impl Iterator<Item = (AgentId, &Agent)> + '_ {
        self.agents
            .iter()
            .enumerate()
            .filter(|(_, a)| a.alive)
            .map(|(i, a)| (AgentId::new(i, a.generation), a))
    }

    pub fn living_count(&self) -> usize {
        self.agents.iter().filter(|a| a.alive).count()
    }

    /// First inactive slot in `start..end`.
    pub fn first_free(&self, start: usize, end: usize) -> Option<usize> {
        let end = end.min(self.agents.len());
        (start..end).find(|&i| !self.agents[i].alive)
    }

    /// Clear every parent link pointing at `parent`.
    pub fn orphan_children(&mut self, parent: AgentId) {
        for agent in &mut self.agents {
            if agent.parent == Some(parent) {
                agent.parent = None;
            }
        }
    }

    /// Slot of the living agent with the highest score (lowest index wins ties).
    pub fn leader(&self) -> Option<usize> {
        self.iter_alive()
            .fold(None, |best: Option<(usize, u32)>, (id, a)| match best {
                Some((_, score)) if score >= a.score => best,
                _ => Some((id.index, a.score)),
            })
            .map(|(index, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn layout() -> GenomeLayout {
        GenomeLayout::new()
            .with_block(BlockKind::Weights(0), 4)
            .and_then(|l| l.with_block(BlockKind::MemorySeed, 2))
            .unwrap()
    }

    #[test]
    fn test_agent_starts_inert() {
        let agent = Agent::inert(&layout());
        assert!(!agent.alive);
        assert_eq!(agent.genome.len(), 6);
        assert_eq!(agent.memory.len(), 2);
    }

    #[test]
    fn test_reset_restores_health_and_memory_seed() {
        let layout = layout();
        let mut rng = StdRng::seed_from_u64(5);
        let mut agent = Agent::inert(&layout);
        agent.randomize(&layout, &mut rng);
        agent.score = 9;
        agent.reset(&layout, Axial::new(2, 3), Direction::new(4), 100.0);

        assert!(agent.alive);
        assert_eq!(agent.health, 100.0);
        assert_eq!(agent.score, 0);
        assert_eq!(agent.memory, agent.genome.genes()[4..6].to_vec());
        assert!((0.0..1.0).contains(&agent.hue));
    }

    #[test]
    fn test_feed_is_capped() {
        let mut agent = Agent::inert(&layout());
        agent.health = 40.0;
        agent.feed(100.0, 100.0);
        assert_eq!(agent.health, 100.0);
    }

    #[test]
    fn test_stale_id_does_not_resolve() {
        let layout = layout();
        let mut slots = AgentSlots::new(4, &layout);
        slots
            .slot_mut(1)
            .reset(&layout, Axial::new(0, 0), Direction::new(0), 100.0);
        let id = slots.id_of(1);
        assert!(slots.get(id).is_some());

        slots.slot_mut(1).deactivate();
        assert!(slots.get(id).is_none());

        slots
            .slot_mut(1)
            .reset(&layout, Axial::new(0, 0), Direction::new(0), 100.0);
        assert!(slots.get(id).is_none());
        assert!(slots.get(slots.id_of(1)).is_some());
    }

    #[test]
    fn test_first_free_scans_in_order() {
        let layout = layout();
        let mut slots = AgentSlots::new(6, &layout);
        for i in [0, 1, 3] {
            slots
                .slot_mut(i)
                .reset(&layout, Axial::new(i as i32, 0), Direction::new(0), 1.0);
        }
        assert_eq!(slots.first_free(0, 6), Some(2));
        assert_eq!(slots.first_free(3, 6), Some(4));
        assert_eq!(slots.first_free(3, 4), None);
        assert_eq!(slots.first_free(0, 100), Some(2));
    }

    #[test]
    fn test_leader_prefers_lowest_index_on_tie() {
        let layout = layout();
        let mut slots = AgentSlots::new(4, &layout);
        assert_eq!(slots.leader(), None);
        for i in 0..3 {
            let agent = slots.slot_mut(i);
            agent.reset(&layout, Axial::new(i as i32, 0), Direction::new(0), 1.0);
        }
        slots.slot_mut(1).score = 4;
        slots.slot_mut(2).score = 4;
        assert_eq!(slots.leader(), Some(1));
    }

    #[test]
    fn test_orphan_children() {
        let layout = layout();
        let mut slots = AgentSlots::new(3, &layout);
        let parent = slots.id_of(0);
        slots.slot_mut(1).parent = Some(parent);
        slots.slot_mut(2).parent = Some(AgentId::new(0, 7));

        slots.orphan_children(parent);
        assert_eq!(slots.slot(1).parent, None);
        assert_eq!(slots.slot(2).parent, Some(AgentId::new(0, 7)));
    }
}
