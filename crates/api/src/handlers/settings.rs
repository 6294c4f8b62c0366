//! Auto-search settings handlers

use crate::error::ApiResult;
use crate::ApiState;
use axum::extract::State;
use axum::Json;
use fetcharr_core::AutoSearchConfig;
use tracing::{info, instrument};

/// GET /api/v1/settings/autosearch
#[instrument(skip(state))]
pub async fn get_settings(State(state): State<ApiState>) -> ApiResult<Json<AutoSearchConfig>> {
    let config = state.settings.load_autosearch().await?.unwrap_or_default();
    Ok(Json(config))
}

/// PUT /api/v1/settings/autosearch
///
/// Validates and persists the settings. The scheduler picks the new
/// values up on its next cycle.
#[instrument(skip(state, config))]
pub async fn put_settings(
    State(state): State<ApiState>,
    Json(config): Json<AutoSearchConfig>,
) -> ApiResult<Json<AutoSearchConfig>> {
    config.validate()?;
    state.settings.save_autosearch(&config).await?;
    info!(
        enabled = config.enabled,
        interval_hours = config.interval_hours,
        backoff_threshold = config.backoff_threshold,
        "Auto-search settings updated"
    );
    Ok(Json(config))
}
