//! HTTP surface of the canvas sync coordinator

use axum::{routing::get, Router};
use cs_core::CanvasSync;
use secstr::SecUtf8;
use std::{collections::HashMap, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod api;
pub mod utils;

/// Shared by every request handler
#[derive(Clone)]
pub struct AppState {
	pub sync: CanvasSync,
	tokens: Arc<Vec<(SecUtf8, String)>>,
}

impl AppState {
	/// `api_tokens` maps bearer tokens to the actor recorded as `started_by`
	pub fn new(sync: CanvasSync, api_tokens: &HashMap<String, String>) -> Self {
		let tokens = api_tokens
			.iter()
			.map(|(token, actor)| (SecUtf8::from(token.clone()), actor.clone()))
			.collect();

		Self {
			sync,
			tokens: Arc::new(tokens),
		}
	}

	pub fn actor_for(&self, token: &str) -> Option<&str> {
		let presented = SecUtf8::from(token.to_owned());
		self.tokens
			.iter()
			.find(|(known, _)| *known == presented)
			.map(|(_, actor)| actor.as_str())
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(|| async { "OK" }))
		.route(
			"/canvas-sync",
			get(api::get_status).post(api::run_sync),
		)
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
		.with_state(state)
}
