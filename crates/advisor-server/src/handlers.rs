//! HTTP Handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use wallet_advisor::svckit::validate_address;
use wallet_advisor::{
    AdvisorError, InvestmentPreferences, PortfolioView, PreferencesUpdate, RefreshOutcome,
};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub mock_sources: bool,
    pub watched_addresses: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct WatchRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct WatchResponse {
    pub address: String,
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct PreferencesResponse {
    pub preferences: InvestmentPreferences,
    pub is_configured: bool,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

fn advisor_error(err: &AdvisorError) -> ApiError {
    let (status, code) = match err {
        AdvisorError::InvalidAddress(_) => (StatusCode::BAD_REQUEST, "INVALID_ADDRESS"),
        AdvisorError::InvalidPreferences(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_PREFERENCES")
        }
        AdvisorError::SourceUnavailable(_) | AdvisorError::Network(_) => {
            (StatusCode::BAD_GATEWAY, "SOURCE_UNAVAILABLE")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
    };
    api_error(status, code, err.user_message())
}

fn not_watched(address: &str) -> ApiError {
    api_error(
        StatusCode::NOT_FOUND,
        "NOT_WATCHED",
        format!("Address '{address}' is not being watched"),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        mock_sources: state.mock_sources,
        watched_addresses: state.watches.read().await.len(),
    })
}

/// Start watching an address. An existing watch is restarted on its slot.
pub async fn watch_address(
    State(state): State<AppState>,
    Json(payload): Json<WatchRequest>,
) -> Result<(StatusCode, Json<WatchResponse>), ApiError> {
    let address = validate_address(&payload.address)
        .map_err(|e| advisor_error(&e))?
        .to_string();

    {
        let mut watches = state.watches.write().await;
        let handle = match watches.remove(&address) {
            Some(previous) => state.monitor.rewatch(previous),
            None => state.monitor.watch(&address).map_err(|e| advisor_error(&e))?,
        };
        watches.insert(address.clone(), handle);
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(WatchResponse {
            address,
            refresh_interval_secs: state.monitor.refresh_interval().as_secs(),
        }),
    ))
}

/// Stop watching an address
pub async fn unwatch_address(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<StatusCode, ApiError> {
    let handle = state.watches.write().await.remove(&address);
    match handle {
        Some(handle) => {
            handle.cancel();
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(not_watched(&address)),
    }
}

/// Latest snapshot, metrics and recommendations for a watched address
pub async fn get_portfolio(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Arc<PortfolioView>>, ApiError> {
    let watches = state.watches.read().await;
    watches
        .get(&address)
        .map(|handle| Json(handle.latest()))
        .ok_or_else(|| not_watched(&address))
}

/// Run a refresh cycle now
pub async fn refresh_portfolio(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<RefreshOutcome>, ApiError> {
    // Release the map lock before the cycle runs
    let slot = {
        let watches = state.watches.read().await;
        watches
            .get(&address)
            .map(|handle| Arc::clone(handle.slot()))
            .ok_or_else(|| not_watched(&address))?
    };

    Ok(Json(state.monitor.refresh(&slot).await))
}

pub async fn get_preferences(State(state): State<AppState>) -> Json<PreferencesResponse> {
    Json(PreferencesResponse {
        preferences: state.preferences.get().await,
        is_configured: state.preferences.is_configured().await,
    })
}

pub async fn update_preferences(
    State(state): State<AppState>,
    Json(update): Json<PreferencesUpdate>,
) -> Result<Json<PreferencesResponse>, ApiError> {
    let preferences = state
        .preferences
        .update(update)
        .await
        .map_err(|e| advisor_error(&e))?;

    Ok(Json(PreferencesResponse {
        preferences,
        is_configured: true,
    }))
}

pub async fn reset_preferences(State(state): State<AppState>) -> Json<PreferencesResponse> {
    Json(PreferencesResponse {
        preferences: state.preferences.reset().await,
        is_configured: false,
    })
}
