//! Auto-search command handlers
//!
//! Run triggers spawn the runner on a detached cancellation scope: a
//! client dropping the HTTP request must never cancel the run it
//! started. Retry verbs clear an item's backoff and move it back to a
//! searchable status.

use crate::error::ApiResult;
use crate::models::{CommandResponse, RetryResponse};
use crate::ApiState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use fetcharr_core::{BackoffKind, RunOutcome, RunScope};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

#[instrument(skip(state))]
pub async fn run_all(
    State(state): State<ApiState>,
) -> ApiResult<(StatusCode, Json<CommandResponse>)> {
    trigger(state, RunScope::All).await
}

#[instrument(skip(state))]
pub async fn run_missing_movies(
    State(state): State<ApiState>,
) -> ApiResult<(StatusCode, Json<CommandResponse>)> {
    trigger(state, RunScope::MissingMovies).await
}

#[instrument(skip(state))]
pub async fn run_missing_episodes(
    State(state): State<ApiState>,
) -> ApiResult<(StatusCode, Json<CommandResponse>)> {
    trigger(state, RunScope::MissingEpisodes).await
}

#[instrument(skip(state))]
pub async fn run_upgrade_movies(
    State(state): State<ApiState>,
) -> ApiResult<(StatusCode, Json<CommandResponse>)> {
    trigger(state, RunScope::UpgradeMovies).await
}

#[instrument(skip(state))]
pub async fn run_upgrade_episodes(
    State(state): State<ApiState>,
) -> ApiResult<(StatusCode, Json<CommandResponse>)> {
    trigger(state, RunScope::UpgradeEpisodes).await
}

async fn trigger(
    state: ApiState,
    scope: RunScope,
) -> ApiResult<(StatusCode, Json<CommandResponse>)> {
    if state.runner.is_running() {
        return Ok((
            StatusCode::ACCEPTED,
            Json(CommandResponse {
                started: false,
                message: "auto-search already running".to_string(),
            }),
        ));
    }

    let runner = state.runner.clone();
    tokio::spawn(async move {
        // fresh token: the run is owned by the process, not the request
        match runner.run(scope, CancellationToken::new()).await {
            Ok(RunOutcome::AlreadyRunning) => {
                info!(%scope, "Triggered run was skipped, another run won the race")
            }
            Ok(RunOutcome::Finished(batch)) => info!(
                %scope,
                total_searched = batch.total_searched,
                downloaded = batch.downloaded,
                "Triggered run finished"
            ),
            Err(err) => error!(%scope, error = %err, "Triggered run failed"),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(CommandResponse {
            started: true,
            message: format!("auto-search {} started", scope),
        }),
    ))
}

/// POST /api/v1/movies/{id}/retry - clear backoff and mark searchable
#[instrument(skip(state))]
pub async fn retry_movie(
    State(state): State<ApiState>,
    Path(movie_id): Path<i64>,
) -> ApiResult<Json<RetryResponse>> {
    state
        .backoff
        .clear_for_retry(BackoffKind::Movie, movie_id, None)
        .await?;
    let status = state.library.mark_movie_wanted(movie_id).await?;
    state
        .history
        .log_status_changed(BackoffKind::Movie, movie_id, status)
        .await;
    info!(movie_id, %status, "Movie reset for retry");
    Ok(Json(RetryResponse {
        id: movie_id,
        status,
    }))
}

/// POST /api/v1/series/{series_id}/episodes/{episode_id}/retry
///
/// Clears the episode's backoff and the series-level backoff, so a
/// future season-pack search is unblocked as well.
#[instrument(skip(state))]
pub async fn retry_episode(
    State(state): State<ApiState>,
    Path((series_id, episode_id)): Path<(i64, i64)>,
) -> ApiResult<Json<RetryResponse>> {
    state
        .backoff
        .clear_for_retry(BackoffKind::Episode, episode_id, Some(series_id))
        .await?;
    let status = state.library.mark_episode_wanted(episode_id).await?;
    state
        .history
        .log_status_changed(BackoffKind::Episode, episode_id, status)
        .await;
    info!(episode_id, series_id, %status, "Episode reset for retry");
    Ok(Json(RetryResponse {
        id: episode_id,
        status,
    }))
}
