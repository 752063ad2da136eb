//! ==============================================================================
//! server.rs - JSON snapshot API
//! ==============================================================================
//!
//! purpose:
//!     exposes the derived dashboard state to an external renderer (cards,
//!     stats rows, charts, alert list). read-only: handlers only take the read
//!     lock and serialize a snapshot.
//!
//! routes:
//!     GET /api                 full snapshot
//!     GET /api/alerts          alert feed
//!     GET /api/sensors/:name   one sensor (status, stats, chart points)
//!
//! ==============================================================================

use crate::alerts::AlertEntry;
use crate::domain::SensorKey;
use crate::error::Result;
use crate::state::{DashboardSnapshot, SensorView, SharedState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api", get(snapshot_handler))
        .route("/api/alerts", get(alerts_handler))
        .route("/api/sensors/:name", get(sensor_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// serves until `shutdown` fires
pub async fn serve(state: SharedState, bind: &str, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "snapshot api listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

async fn snapshot_handler(State(state): State<SharedState>) -> Json<DashboardSnapshot> {
    Json(state.read().await.snapshot())
}

async fn alerts_handler(State(state): State<SharedState>) -> Json<Vec<AlertEntry>> {
    Json(state.read().await.alerts())
}

async fn sensor_handler(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> std::result::Result<Json<SensorView>, (StatusCode, Json<serde_json::Value>)> {
    let Some(key) = SensorKey::from_api_name(&name) else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"status": "error", "message": format!("unknown sensor: {name}")})),
        ));
    };
    Ok(Json(state.read().await.sensor_view(key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawPoint;
    use crate::live::ChannelEvent;
    use crate::normalize::normalize;
    use crate::state::{DashboardEvent, DashboardState};

    fn populated() -> SharedState {
        let mut state = DashboardState::default();
        state.dispatch(DashboardEvent::Channel(ChannelEvent::Opened));
        state.dispatch(DashboardEvent::History {
            key: SensorKey::Gas,
            points: vec![normalize(&RawPoint::new(Some(7), 320.0, "2024-01-01 10:00:00"))],
        });
        state.shared()
    }

    #[tokio::test]
    async fn snapshot_reports_connectivity_and_alerts() {
        let Json(snap) = snapshot_handler(State(populated())).await;
        assert!(snap.online);
        assert_eq!(snap.connectivity, "En línea");
        assert_eq!(snap.alerts.len(), 1);
        assert_eq!(snap.alerts[0].id, "gas-7");
    }

    #[tokio::test]
    async fn sensor_lookup_by_api_name() {
        let Ok(Json(view)) = sensor_handler(State(populated()), Path("gas".into())).await else {
            panic!("gas should resolve");
        };
        assert_eq!(view.points.len(), 1);
        assert_eq!(view.status.message, "Gas muy alta");

        let Err((status, _)) = sensor_handler(State(populated()), Path("co2".into())).await else {
            panic!("co2 is not a sensor");
        };
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn snapshot_serializes_to_json() {
        let Json(snap) = snapshot_handler(State(populated())).await;
        let value = serde_json::to_value(&snap).unwrap();
        assert_eq!(value["sensors"]["gas"]["status"]["severity"], "danger");
        assert_eq!(value["sensors"]["presion"]["status"]["display_value"], "-- hPa");
    }
}
