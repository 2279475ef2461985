use shared::{ControlEvent, SimulationStats};
use sim::{ConfigError, FrameOutcome, SettingsSource, SimConfig, Simulation};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;

/// Settings posted over HTTP, handed to the simulation once and then dropped.
#[derive(Debug, Default)]
struct PendingSettings(HashMap<String, f64>);

impl SettingsSource for PendingSettings {
    fn read(&mut self) -> Option<HashMap<String, f64>> {
        if self.0.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.0))
        }
    }
}

/// Outcome of a settings update request.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SettingsReply {
    /// Names queued for the next settings poll.
    pub accepted: Vec<String>,
    /// Rejection messages, one per refused setting.
    pub rejected: Vec<String>,
}

/// A running simulation shared between the frame task and HTTP handlers.
#[derive(Clone)]
pub struct Session {
    inner: Arc<RwLock<SessionInner>>,
}

struct SessionInner {
    simulation: Simulation,
    /// Control events queued since the last frame
    pending: Vec<ControlEvent>,
    settings: PendingSettings,
    stopped: bool,
    frames: u64,
    renders: u64,
    started: Instant,
}

impl Session {
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        let simulation = Simulation::new(config)?;
        tracing::info!(run_id = %simulation.state().run_id(), "session created");
        Ok(Self {
            inner: Arc::new(RwLock::new(SessionInner {
                simulation,
                pending: Vec::new(),
                settings: PendingSettings::default(),
                stopped: false,
                frames: 0,
                renders: 0,
                started: Instant::now(),
            })),
        })
    }

    /// Queue a control event for the next frame. Returns false once the
    /// session has stopped.
    pub async fn push_event(&self, event: ControlEvent) -> bool {
        let mut inner = self.inner.write().await;
        if inner.stopped {
            return false;
        }
        inner.pending.push(event);
        true
    }

    /// Validate settings against the current config and queue the valid ones.
    pub async fn update_settings(&self, settings: HashMap<String, f64>) -> SettingsReply {
        let mut inner = self.inner.write().await;
        let mut probe = inner.simulation.state().config().clone();
        let mut reply = SettingsReply::default();

        let mut names: Vec<String> = settings.keys().cloned().collect();
        names.sort();
        for name in names {
            let value = settings[&name];
            match probe.apply_setting(&name, value) {
                Ok(()) => {
                    inner.settings.0.insert(name.clone(), value);
                    reply.accepted.push(name);
                }
                Err(err) => {
                    tracing::warn!(%err, "rejected setting");
                    reply.rejected.push(err.to_string());
                }
            }
        }
        reply
    }

    /// Run one frame: drain queued events, poll settings, step the simulation.
    pub async fn frame(&self) -> FrameOutcome {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        if inner.stopped {
            return FrameOutcome {
                quit: true,
                ..Default::default()
            };
        }

        inner
            .simulation
            .poll_settings(&mut inner.settings, Instant::now());
        let events = std::mem::take(&mut inner.pending);
        let outcome = inner.simulation.step(events);

        inner.frames += 1;
        if outcome.render {
            inner.renders += 1;
        }
        if outcome.quit {
            inner.stopped = true;
            tracing::info!(
                frames = inner.frames,
                uptime_secs = inner.started.elapsed().as_secs(),
                "quit requested"
            );
        }
        outcome
    }

    /// Run a closure against the simulation under a read lock.
    pub async fn read<T>(&self, f: impl FnOnce(&Simulation) -> T) -> T {
        let inner = self.inner.read().await;
        f(&inner.simulation)
    }

    pub async fn stats(&self) -> SimulationStats {
        self.read(|sim| sim.state().stats()).await
    }

    pub async fn is_stopped(&self) -> bool {
        self.inner.read().await.stopped
    }

    /// Frames run and frames that asked for a redraw.
    pub async fn frame_counts(&self) -> (u64, u64) {
        let inner = self.inner.read().await;
        (inner.frames, inner.renders)
    }
}

/// Drive `session` at a fixed cadence until a quit event arrives.
pub async fn run_frames(session: Session, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        if session.frame().await.quit {
            break;
        }
    }
    tracing::info!("frame loop finished");
}
