use crate::config::ViewerConfig;
use crate::session::{run_frames, Session, SettingsReply};
use crate::web;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use shared::{AgentView, ControlEvent, RecordView, SimulationStats, WorldSnapshot};
use std::collections::HashMap;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub session: Session,
}

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("simulation has stopped")]
    Stopped,
}

impl IntoResponse for ViewerError {
    fn into_response(self) -> Response {
        let status = match self {
            ViewerError::Stopped => StatusCode::CONFLICT,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/world", get(handle_world))
        .route("/api/agents", get(handle_agents))
        .route("/api/records", get(handle_records))
        .route("/api/stats", get(handle_stats))
        .route("/api/control", post(handle_control))
        .route("/api/settings", post(handle_settings))
        .route("/health", get(web::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(config: ViewerConfig) -> anyhow::Result<()> {
    let session = Session::new(config.sim)?;
    tokio::spawn(run_frames(session.clone(), config.frame_period));

    let app = router(AppState { session });

    tracing::info!("Viewer listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Full world snapshot for the renderer
async fn handle_world(State(state): State<AppState>) -> Json<WorldSnapshot> {
    Json(state.session.read(|sim| sim.snapshot()).await)
}

async fn handle_agents(State(state): State<AppState>) -> Json<Vec<AgentView>> {
    Json(state.session.read(|sim| sim.state().agent_views()).await)
}

/// History samples, oldest first
async fn handle_records(State(state): State<AppState>) -> Json<Vec<RecordView>> {
    Json(state.session.read(|sim| sim.state().record_views()).await)
}

async fn handle_stats(State(state): State<AppState>) -> Json<SimulationStats> {
    Json(state.session.stats().await)
}

/// Queue a control event for the next frame
#[axum::debug_handler]
async fn handle_control(
    State(state): State<AppState>,
    Json(event): Json<ControlEvent>,
) -> Result<StatusCode, ViewerError> {
    if !state.session.push_event(event).await {
        return Err(ViewerError::Stopped);
    }
    tracing::debug!(?event, "control event queued");
    Ok(StatusCode::ACCEPTED)
}

#[axum::debug_handler]
async fn handle_settings(
    State(state): State<AppState>,
    Json(settings): Json<HashMap<String, f64>>,
) -> Json<SettingsReply> {
    Json(state.session.update_settings(settings).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use sim::SimConfig;
    use tower::ServiceExt;

    fn app() -> (Router, Session) {
        let config = SimConfig {
            width: 16,
            height: 16,
            max_agents: 32,
            initial_agents: 8,
            reserved_agents: 2,
            rng_seed: Some(2),
            ..Default::default()
        };
        let session = Session::new(config).unwrap();
        (
            router(AppState {
                session: session.clone(),
            }),
            session,
        )
    }

    async fn get_json(app: Router, uri: &str) -> serde_json::Value {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let body = get_json(app, "/health").await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["view_format_version"], shared::VIEW_FORMAT_VERSION);
    }

    #[tokio::test]
    async fn test_stats_and_world() {
        let (app, session) = app();
        session.frame().await;

        let stats: SimulationStats =
            serde_json::from_value(get_json(app.clone(), "/api/stats").await).unwrap();
        assert_eq!(stats.tick, 1);
        assert_eq!(stats.population_limit, 8);

        let world: WorldSnapshot =
            serde_json::from_value(get_json(app.clone(), "/api/world").await).unwrap();
        assert_eq!(world.width, 16);
        assert_eq!(world.agents.len(), stats.living);

        let agents: Vec<AgentView> =
            serde_json::from_value(get_json(app.clone(), "/api/agents").await).unwrap();
        assert_eq!(agents.len(), stats.living);

        let records: Vec<RecordView> =
            serde_json::from_value(get_json(app, "/api/records").await).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_control_is_queued() {
        let (app, session) = app();
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/control",
                serde_json::json!({ "action": "toggle_extra_info" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        session.frame().await;
        assert!(session.read(|sim| sim.controls().extra_info).await);
    }

    #[tokio::test]
    async fn test_control_after_quit_conflicts() {
        let (app, session) = app();
        session.push_event(ControlEvent::Quit).await;
        session.frame().await;

        let response = app
            .oneshot(post_json(
                "/api/control",
                serde_json::json!({ "action": "speed", "tier": 3 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_malformed_control_rejected() {
        let (app, _) = app();
        let response = app
            .oneshot(post_json(
                "/api/control",
                serde_json::json!({ "action": "teleport" }),
            ))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_settings_reply() {
        let (app, session) = app();
        let response = app
            .oneshot(post_json(
                "/api/settings",
                serde_json::json!({ "kill_cost": 3.5, "health_decay": -1.0 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let reply: SettingsReply = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply.accepted, vec!["kill_cost".to_string()]);
        assert_eq!(reply.rejected.len(), 1);

        session.frame().await;
        assert_eq!(
            session.read(|sim| sim.state().config().kill_cost).await,
            3.5
        );
    }
}
