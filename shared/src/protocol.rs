use crate::Genome;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Logical input actions delivered to the simulation at a frame boundary.
///
/// Front-ends translate their own key/mouse events into these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlEvent {
    /// Stop the outer loop.
    Quit,
    /// Pause; when already paused, advance exactly one tick.
    PauseOrStep,
    /// Select a speed tier (1..=6) and resume.
    Speed { tier: u8 },
    /// Rotate through the world / genome / score / population overlays.
    CycleOverlay,
    /// Toggle health bars and other per-agent annotations.
    ToggleExtraInfo,
    /// Kill the highest-scoring living agent.
    DeleteSelected,
    FollowNext,
    FollowPrevious,
    Unfollow,
    /// Move the camera by a screen-space delta.
    Pan { dx: f32, dy: f32 },
    /// Adjust camera zoom by a relative amount.
    Zoom { delta: f32 },
    /// Raise the population limit by one and seed the new slot.
    AddAgent,
    /// Remove the agent in the last slot and lower the population limit.
    RemoveAgent,
    FoodRateUp,
    FoodRateDown,
    /// Remove every piece of food from the world.
    ClearFood,
}

/// Which chart the renderer should draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Overlay {
    #[default]
    World,
    Genome,
    Scores,
    Population,
}

impl Overlay {
    pub fn next(self) -> Self {
        match self {
            Overlay::World => Overlay::Genome,
            Overlay::Genome => Overlay::Scores,
            Overlay::Scores => Overlay::Population,
            Overlay::Population => Overlay::World,
        }
    }
}

/// Camera state owned by the driver and consumed by renderers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraView {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
    /// Slot index of the agent being followed, if any.
    pub following: Option<usize>,
}

/// Read-only projection of one living agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub slot: usize,
    pub generation: u32,
    pub q: i32,
    pub r: i32,
    pub orientation: u8,
    pub health: f32,
    pub score: u32,
    pub hue: f32,
    pub age: u64,
    /// Slot of the parent, while the parent is alive.
    pub parent: Option<usize>,
    /// Whether the agent tried to eat on its last tick.
    pub eating: bool,
    /// Pixel-space centre for the configured hex size.
    pub pixel: (f32, f32),
}

/// Everything a renderer needs to draw the world view of one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub run_id: Uuid,
    pub tick: u64,
    pub width: i32,
    pub height: i32,
    pub hex_size: f32,
    /// Axial coordinates of every cell holding food.
    pub food: Vec<(i32, i32)>,
    pub agents: Vec<AgentView>,
    pub camera: CameraView,
    pub overlay: Overlay,
    pub extra_info: bool,
    pub paused: bool,
    /// Slot of the current high scorer.
    pub leader: Option<usize>,
}

/// Serialisable form of one history sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordView {
    pub tick: u64,
    pub selected_slot: usize,
    pub selected_hue: f32,
    pub genome: Genome,
    pub scores: Vec<u32>,
    pub hues: Vec<f32>,
    pub alive: Vec<bool>,
}

/// Population-level statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    pub run_id: Uuid,
    pub tick: u64,
    /// Agents currently alive
    pub living: usize,
    /// Current population limit (slots in use)
    pub population_limit: usize,
    pub total_score: u64,
    pub best_score: u32,
    pub food_cells: usize,
    pub births: u64,
    pub deaths: u64,
    pub records: usize,
    pub food_spawn_rate: f32,
}

impl SimulationStats {
    /// Mean score of the living population.
    pub fn average_score(&self) -> f64 {
        if self.living == 0 {
            return 0.0;
        }
        self.total_score as f64 / self.living as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_event_serialization() {
        let json = serde_json::to_string(&ControlEvent::Speed { tier: 3 }).unwrap();
        assert_eq!(json, r#"{"action":"speed","tier":3}"#);

        let decoded: ControlEvent = serde_json::from_str(r#"{"action":"clear_food"}"#).unwrap();
        assert_eq!(decoded, ControlEvent::ClearFood);

        let decoded: ControlEvent =
            serde_json::from_str(r#"{"action":"pan","dx":4.0,"dy":-2.0}"#).unwrap();
        assert_eq!(decoded, ControlEvent::Pan { dx: 4.0, dy: -2.0 });
    }

    #[test]
    fn test_overlay_cycles_back() {
        let mut overlay = Overlay::default();
        for _ in 0..4 {
            overlay = overlay.next();
        }
        assert_eq!(overlay, Overlay::World);
    }

    #[test]
    fn test_average_score() {
        let stats = SimulationStats {
            run_id: Uuid::new_v4(),
            tick: 10,
            living: 4,
            population_limit: 50,
            total_score: 10,
            best_score: 6,
            food_cells: 3,
            births: 0,
            deaths: 0,
            records: 1,
            food_spawn_rate: 0.3,
        };
        assert_eq!(stats.average_score(), 2.5);

        let empty = SimulationStats { living: 0, ..stats };
        assert_eq!(empty.average_score(), 0.0);
    }
}
