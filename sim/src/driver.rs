use crate::config::{ConfigError, SettingsError, SettingsPoll, SettingsSource, SimConfig};
use crate::simulation::SimulationState;
use shared::{CameraView, ControlEvent, Overlay, WorldSnapshot};
use std::time::{Duration, Instant};

const MIN_ZOOM: f32 = 0.05;
const FOOD_RATE_STEP: f32 = 1.1;
const MIN_FOOD_RATE: f32 = 1e-8;

/// What the host should do after a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    /// The world advanced one tick.
    pub ticked: bool,
    /// The host should redraw.
    pub render: bool,
    /// A quit event was received.
    pub quit: bool,
}

/// Interactive state layered on top of the world.
#[derive(Debug, Clone)]
pub struct Controls {
    pub paused: bool,
    nudge: bool,
    /// Render every `frame_rate` ticks.
    pub frame_rate: u64,
    pub overlay: Overlay,
    pub extra_info: bool,
    pub camera: CameraView,
}

impl Controls {
    fn new(config: &SimConfig) -> Self {
        Self {
            paused: false,
            nudge: false,
            frame_rate: 1,
            overlay: Overlay::World,
            extra_info: false,
            camera: CameraView {
                x: config.hex_size * config.height as f32,
                y: config.hex_size * config.width as f32,
                zoom: 0.5,
                following: None,
            },
        }
    }
}

/// Ticks between renders for speed tier `1..=6`.
pub fn speed_tier_rate(tier: u8, turbo_rate: u64) -> u64 {
    let turbo = turbo_rate as f64;
    let rate = match tier {
        0 | 1 => 1.0,
        2 => 0.04 * turbo,
        3 => 0.2 * turbo,
        4 => turbo,
        5 => 5.0 * turbo,
        _ => 25.0 * turbo,
    };
    (rate as u64).max(1)
}

/// Frame driver: applies control events, ticks the world and decides when
/// the host should render.
pub struct Simulation {
    state: SimulationState,
    controls: Controls,
    settings_poll: SettingsPoll,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        let controls = Controls::new(&config);
        let settings_poll = SettingsPoll::new(Duration::from_millis(config.settings_poll_millis));
        Ok(Self {
            state: SimulationState::new(config)?,
            controls,
            settings_poll,
        })
    }

    /// Run one frame.
    pub fn step<I>(&mut self, events: I) -> FrameOutcome
    where
        I: IntoIterator<Item = ControlEvent>,
    {
        let mut outcome = FrameOutcome::default();
        let mut redraw = false;
        for event in events {
            if event == ControlEvent::Quit {
                outcome.quit = true;
            }
            redraw |= self.handle_event(event);
        }

        if self.controls.paused && !self.controls.nudge {
            self.follow();
            outcome.render = redraw;
            return outcome;
        }
        self.controls.nudge = false;

        let frame = self.state.tick_count();
        self.state.tick();
        redraw |= self.follow();

        outcome.ticked = true;
        outcome.render = frame % self.controls.frame_rate == 0 || redraw;
        outcome
    }

    /// Apply one event. Returns whether the view changed in a way that
    /// warrants a redraw on its own.
    pub fn handle_event(&mut self, event: ControlEvent) -> bool {
        let controls = &mut self.controls;
        match event {
            ControlEvent::Quit => false,
            ControlEvent::PauseOrStep => {
                controls.frame_rate = 1;
                if controls.paused {
                    controls.nudge = true;
                } else {
                    controls.paused = true;
                }
                false
            }
            ControlEvent::Speed { tier } => {
                controls.frame_rate = speed_tier_rate(tier, self.state.config().turbo_rate);
                controls.paused = false;
                false
            }
            ControlEvent::CycleOverlay => {
                controls.overlay = controls.overlay.next();
                true
            }
            ControlEvent::ToggleExtraInfo => {
                controls.extra_info = !controls.extra_info;
                true
            }
            ControlEvent::DeleteSelected => {
                if let Some(id) = self.state.remove_leader() {
                    tracing::info!(slot = id.index(), "removed high scorer");
                }
                true
            }
            ControlEvent::FollowNext => {
                let limit = self.state.population_limit();
                controls.camera.following = match controls.camera.following {
                    _ if limit == 0 => None,
                    None => Some(0),
                    Some(i) => Some((i + 1) % limit),
                };
                true
            }
            ControlEvent::FollowPrevious => {
                let limit = self.state.population_limit();
                controls.camera.following = match controls.camera.following {
                    _ if limit == 0 => None,
                    None | Some(0) => Some(limit - 1),
                    Some(i) => Some((i - 1).min(limit - 1)),
                };
                true
            }
            ControlEvent::Unfollow => {
                controls.camera.following = None;
                true
            }
            ControlEvent::Pan { dx, dy } => {
                controls.camera.x -= dx / controls.camera.zoom;
                controls.camera.y -= dy / controls.camera.zoom;
                controls.camera.following = None;
                true
            }
            ControlEvent::Zoom { delta } => {
                controls.camera.zoom = (controls.camera.zoom + delta).max(MIN_ZOOM);
                true
            }
            ControlEvent::AddAgent => self.state.grow_population(),
            ControlEvent::RemoveAgent => self.state.shrink_population(),
            ControlEvent::FoodRateUp => {
                let rate = self.state.config().food_spawn_rate;
                if rate < 1.0 {
                    self.state.set_food_spawn_rate(rate * FOOD_RATE_STEP);
                }
                false
            }
            ControlEvent::FoodRateDown => {
                let rate = self.state.config().food_spawn_rate;
                if rate > MIN_FOOD_RATE {
                    self.state.set_food_spawn_rate(rate / FOOD_RATE_STEP);
                }
                false
            }
            ControlEvent::ClearFood => {
                self.state.world_mut().clear_food();
                true
            }
        }
    }

    /// Snap the camera to the followed agent. Returns whether it moved.
    fn follow(&mut self) -> bool {
        let Some(slot) = self.controls.camera.following else {
            return false;
        };
        let agent = self.state.agents().slot(slot);
        if !agent.alive {
            return false;
        }
        let (x, y) = agent.position.to_pixel(self.state.config().hex_size);
        let camera = &mut self.controls.camera;
        let moved = camera.x != x || camera.y != y;
        camera.x = x;
        camera.y = y;
        moved
    }

    /// Re-read live settings if the poll interval has elapsed.
    ///
    /// Returns the rejected settings; an empty vec also when nothing was due.
    pub fn poll_settings(
        &mut self,
        source: &mut dyn SettingsSource,
        now: Instant,
    ) -> Vec<SettingsError> {
        if !self.settings_poll.due(now) {
            return Vec::new();
        }
        match source.read() {
            Some(settings) => self.state.apply_settings(&settings),
            None => Vec::new(),
        }
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let config = self.state.config();
        WorldSnapshot {
            run_id: self.state.run_id(),
            tick: self.state.tick_count(),
            width: config.width,
            height: config.height,
            hex_size: config.hex_size,
            food: self.state.food_cells(),
            agents: self.state.agent_views(),
            camera: self.controls.camera,
            overlay: self.controls.overlay,
            extra_info: self.controls.extra_info,
            paused: self.controls.paused,
            leader: self.state.agents().leader(),
        }
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SimulationState {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const IDLE: [ControlEvent; 0] = [];

    fn simulation() -> Simulation {
        let config = SimConfig {
            width: 20,
            height: 20,
            max_agents: 30,
            initial_agents: 10,
            reserved_agents: 5,
            rng_seed: Some(8),
            ..Default::default()
        };
        Simulation::new(config).unwrap()
    }

    #[test]
    fn test_speed_tiers() {
        assert_eq!(speed_tier_rate(1, 307), 1);
        assert_eq!(speed_tier_rate(2, 307), 12);
        assert_eq!(speed_tier_rate(3, 307), 61);
        assert_eq!(speed_tier_rate(4, 307), 307);
        assert_eq!(speed_tier_rate(5, 307), 1535);
        assert_eq!(speed_tier_rate(6, 307), 7675);
    }

    #[test]
    fn test_unpaused_frame_ticks_and_renders() {
        let mut sim = simulation();
        let outcome = sim.step(IDLE);
        assert!(outcome.ticked);
        assert!(outcome.render);
        assert_eq!(sim.state().tick_count(), 1);
    }

    #[test]
    fn test_pause_then_single_step() {
        let mut sim = simulation();
        let outcome = sim.step([ControlEvent::PauseOrStep]);
        assert!(!outcome.ticked);
        assert!(sim.controls().paused);

        assert!(!sim.step(IDLE).ticked);
        assert_eq!(sim.state().tick_count(), 0);

        assert!(sim.step([ControlEvent::PauseOrStep]).ticked);
        assert!(!sim.step(IDLE).ticked);
        assert_eq!(sim.state().tick_count(), 1);

        sim.step([ControlEvent::Speed { tier: 1 }]);
        assert!(!sim.controls().paused);
        assert_eq!(sim.state().tick_count(), 2);
    }

    #[test]
    fn test_render_follows_frame_rate() {
        let mut sim = simulation();
        sim.step([ControlEvent::Speed { tier: 2 }]);
        let renders = (0..48).filter(|_| sim.step(IDLE).render).count();
        // frames 1..=48 at one render per 12 ticks
        assert_eq!(renders, 4);
    }

    #[test]
    fn test_paused_camera_moves_render() {
        let mut sim = simulation();
        sim.step([ControlEvent::PauseOrStep]);
        let outcome = sim.step([ControlEvent::Pan { dx: 10.0, dy: 0.0 }]);
        assert!(!outcome.ticked);
        assert!(outcome.render);
        assert!(!sim.step(IDLE).render);
    }

    #[test]
    fn test_follow_cycles_and_tracks() {
        let mut sim = simulation();
        sim.step([ControlEvent::PauseOrStep]);
        sim.handle_event(ControlEvent::FollowPrevious);
        assert_eq!(sim.controls().camera.following, Some(9));
        sim.handle_event(ControlEvent::FollowNext);
        assert_eq!(sim.controls().camera.following, Some(0));

        sim.step([ControlEvent::PauseOrStep]);
        let agent = sim.state().agents().slot(0);
        let pixel = agent.position.to_pixel(15.0);
        assert_eq!((sim.controls().camera.x, sim.controls().camera.y), pixel);

        sim.handle_event(ControlEvent::Pan { dx: 1.0, dy: 1.0 });
        assert_eq!(sim.controls().camera.following, None);
    }

    #[test]
    fn test_zoom_has_floor() {
        let mut sim = simulation();
        sim.handle_event(ControlEvent::Zoom { delta: -10.0 });
        assert_eq!(sim.controls().camera.zoom, MIN_ZOOM);
    }

    #[test]
    fn test_food_rate_keys() {
        let mut sim = simulation();
        let before = sim.state().config().food_spawn_rate;
        sim.handle_event(ControlEvent::FoodRateUp);
        assert!((sim.state().config().food_spawn_rate - before * 1.1).abs() < 1e-6);
        sim.handle_event(ControlEvent::FoodRateDown);
        assert!((sim.state().config().food_spawn_rate - before).abs() < 1e-6);

        for _ in 0..100 {
            sim.handle_event(ControlEvent::FoodRateUp);
        }
        assert!(sim.state().config().food_spawn_rate <= 1.0);
    }

    #[test]
    fn test_population_keys() {
        let mut sim = simulation();
        sim.handle_event(ControlEvent::AddAgent);
        assert_eq!(sim.state().population_limit(), 11);
        sim.handle_event(ControlEvent::RemoveAgent);
        sim.handle_event(ControlEvent::RemoveAgent);
        assert_eq!(sim.state().population_limit(), 9);
    }

    #[test]
    fn test_toggles_and_quit() {
        let mut sim = simulation();
        let outcome = sim.step([
            ControlEvent::CycleOverlay,
            ControlEvent::ToggleExtraInfo,
            ControlEvent::ClearFood,
            ControlEvent::Quit,
        ]);
        assert!(outcome.quit);
        assert_eq!(sim.controls().overlay, Overlay::Genome);
        assert!(sim.controls().extra_info);

        let snapshot = sim.snapshot();
        assert_eq!(snapshot.overlay, Overlay::Genome);
        assert_eq!(snapshot.agents.len(), sim.state().agents().living_count());
    }

    #[test]
    fn test_settings_poll() {
        let mut sim = simulation();
        let mut source = HashMap::from([("food_value".to_string(), 10.0)]);
        let now = Instant::now();
        assert!(sim.poll_settings(&mut source, now).is_empty());
        assert_eq!(sim.state().config().food_value, 10.0);

        source.insert("food_value".to_string(), 20.0);
        sim.poll_settings(&mut source, now + Duration::from_millis(10));
        assert_eq!(sim.state().config().food_value, 10.0);

        source.insert("unknown".to_string(), 1.0);
        let errors = sim.poll_settings(&mut source, now + Duration::from_secs(2));
        assert_eq!(errors.len(), 1);
        assert_eq!(sim.state().config().food_value, 20.0);
    }
}
