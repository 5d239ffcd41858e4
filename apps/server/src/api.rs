//! `/canvas-sync` handlers and their error mapping

use crate::AppState;
use axum::{
	async_trait,
	extract::{FromRequestParts, Query, State},
	http::{header, request::Parts, StatusCode},
	response::{IntoResponse, Response},
	Json,
};
use cs_core::{
	ops::canvas_sync::{ScopeFilter, StatusView, SyncOutcome},
	CoreError,
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum ApiError {
	#[error("Missing or unknown bearer token")]
	Unauthorized,

	#[error(transparent)]
	Core(#[from] CoreError),
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let message = self.to_string();

		if let Self::Core(e) = &self {
			if e.is_client_error() {
				debug!(error = %e, "Canvas sync request rejected");
			} else {
				error!(error = %e, "Canvas sync request failed");
			}
		}

		match self {
			Self::Unauthorized => error_response(StatusCode::UNAUTHORIZED, "unauthorized", message),
			Self::Core(CoreError::LockConflict {
				started_by,
				started_at,
				..
			}) => (
				StatusCode::CONFLICT,
				Json(json!({
					"message": message,
					"sync_started_by": started_by,
					"sync_started_at": started_at,
				})),
			)
				.into_response(),
			Self::Core(CoreError::EmptyScope { .. }) => {
				error_response(StatusCode::BAD_REQUEST, "empty_scope", message)
			}
			Self::Core(CoreError::InvalidScale(_)) => {
				error_response(StatusCode::BAD_REQUEST, "invalid_scale", message)
			}
			Self::Core(_) => error_response(
				StatusCode::INTERNAL_SERVER_ERROR,
				"canvas_sync_failed",
				message,
			),
		}
	}
}

fn error_response(status: StatusCode, error: &str, message: String) -> Response {
	(status, Json(json!({ "error": error, "message": message }))).into_response()
}

/// Caller resolved from `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct Actor(pub String);

#[async_trait]
impl FromRequestParts<AppState> for Actor {
	type Rejection = ApiError;

	async fn from_request_parts(
		parts: &mut Parts,
		state: &AppState,
	) -> Result<Self, Self::Rejection> {
		let token = parts
			.headers
			.get(header::AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.and_then(|value| value.strip_prefix("Bearer "))
			.map(str::trim)
			.filter(|token| !token.is_empty())
			.ok_or(ApiError::Unauthorized)?;

		state
			.actor_for(token)
			.map(|actor| Actor(actor.to_string()))
			.ok_or(ApiError::Unauthorized)
	}
}

#[derive(Debug, Deserialize)]
pub struct ScopeParams {
	pub project: i32,
	#[serde(default)]
	pub flag: Option<i32>,
}

impl ScopeParams {
	fn filter(&self) -> ScopeFilter {
		let filter = ScopeFilter::project(self.project);
		match self.flag {
			Some(flag) => filter.with_flag(flag),
			None => filter,
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
	pub project: i32,
	#[serde(default)]
	pub flag: Option<i32>,
	#[serde(default)]
	pub scale: Option<f64>,
}

pub async fn get_status(
	_actor: Actor,
	State(state): State<AppState>,
	Query(params): Query<ScopeParams>,
) -> Result<Json<StatusView>, ApiError> {
	Ok(Json(state.sync.status(&params.filter()).await?))
}

pub async fn run_sync(
	Actor(actor): Actor,
	State(state): State<AppState>,
	Json(request): Json<SyncRequest>,
) -> Result<Json<SyncOutcome>, ApiError> {
	let filter = ScopeParams {
		project: request.project,
		flag: request.flag,
	}
	.filter();

	let outcome = state.sync.synchronize(&filter, &actor, request.scale).await?;
	info!(
		scope_key = %outcome.scope_key,
		updated = outcome.updated_count,
		%actor,
		"Canvas sync completed"
	);

	Ok(Json(outcome))
}
