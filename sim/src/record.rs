use crate::agent::{AgentId, AgentSlots};
use rand::Rng;
use shared::{Genome, RecordView};
use std::collections::VecDeque;

/// A periodic sample of the population.
#[derive(Debug, Clone)]
pub struct Record {
    pub tick: u64,
    pub selected: AgentId,
    pub selected_hue: f32,
    pub genome: Genome,
    /// Per-slot scores over the whole slot array.
    pub scores: Vec<u32>,
    pub hues: Vec<f32>,
    pub alive: Vec<bool>,
}

impl Record {
    /// Capture the population around `selected`. `None` if `selected` is stale.
    pub fn capture(tick: u64, agents: &AgentSlots, selected: AgentId) -> Option<Self> {
        let agent = agents.get(selected)?;
        Some(Self {
            tick,
            selected,
            selected_hue: agent.hue,
            genome: agent.genome.clone(),
            scores: agents.iter().map(|a| a.score).collect(),
            hues: agents.iter().map(|a| a.hue).collect(),
            alive: agents.iter().map(|a| a.alive).collect(),
        })
    }

    pub fn to_view(&self) -> RecordView {
        RecordView {
            tick: self.tick,
            selected_slot: self.selected.index(),
            selected_hue: self.selected_hue,
            genome: self.genome.clone(),
            scores: self.scores.clone(),
            hues: self.hues.clone(),
            alive: self.alive.clone(),
        }
    }
}

/// Bounded history of samples, oldest first.
#[derive(Debug, Clone)]
pub struct RecordHistory {
    capacity: usize,
    records: VecDeque<Record>,
}

impl RecordHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a record, evicting the oldest one when full.
    pub fn push(&mut self, record: Record) {
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Record> + '_ {
        self.records.iter()
    }

    pub fn latest(&self) -> Option<&Record> {
        self.records.back()
    }
}

/// Pick a living agent with probability proportional to its score.
///
/// When every score is zero, the living agent in the highest slot is
/// returned and the RNG is not touched. `None` when nobody is alive.
pub fn select_by_score<R: Rng + ?Sized>(agents: &AgentSlots, rng: &mut R) -> Option<AgentId> {
    let total: u64 = agents.iter_alive().map(|(_, a)| a.score as u64).sum();
    if total == 0 {
        return agents.iter_alive().last().map(|(id, _)| id);
    }
    let mut pick = rng.gen_range(0..total);
    for (id, agent) in agents.iter_alive() {
        let score = agent.score as u64;
        if pick < score {
            return Some(id);
        }
        pick -= score;
    }
    None
}
