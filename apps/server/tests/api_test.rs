//! HTTP contract of the canvas sync endpoints

use axum::{
	body::{to_bytes, Body},
	http::{header, Method, Request, StatusCode},
	Router,
};
use chrono::Utc;
use cs_core::{
	infra::{db::entities::network_node, logging::init_test_tracing},
	AppConfig, Core,
};
use cs_server::{router, AppState};
use pretty_assertions::assert_eq;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const ALICE: &str = "alice-token";
const BOB: &str = "bob-token";

struct TestServer {
	core: Core,
	app: Router,
	_dir: TempDir,
}

impl TestServer {
	async fn new() -> Self {
		init_test_tracing();

		let dir = TempDir::new().unwrap();
		let mut config = AppConfig::default_with_dir(dir.path().to_path_buf());
		config
			.server
			.api_tokens
			.insert(ALICE.to_string(), "alice".to_string());
		config
			.server
			.api_tokens
			.insert(BOB.to_string(), "bob".to_string());

		let core = Core::with_config(config).await.unwrap();
		let app = router(AppState::new(
			core.canvas_sync().clone(),
			&core.config.server.api_tokens,
		));

		Self {
			core,
			app,
			_dir: dir,
		}
	}

	async fn seed(&self, project_id: i32, positions: &[(f64, f64)]) {
		for (i, (x, y)) in positions.iter().enumerate() {
			network_node::ActiveModel {
				project_id: Set(project_id),
				flag_id: Set(None),
				name: Set(format!("node-{i}")),
				geo_x: Set(Some(*x)),
				geo_y: Set(Some(*y)),
				canvas_x: Set(None),
				canvas_y: Set(None),
				updated_at: Set(Utc::now()),
				..Default::default()
			}
			.insert(self.core.db().conn())
			.await
			.unwrap();
		}
	}

	async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
		let response = self.app.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		let body = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap_or(Value::Null)
		};
		(status, body)
	}

	async fn get_status(&self, token: Option<&str>, query: &str) -> (StatusCode, Value) {
		let mut request = Request::builder().uri(format!("/canvas-sync?{query}"));
		if let Some(token) = token {
			request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
		}
		self.send(request.body(Body::empty()).unwrap()).await
	}

	async fn post_sync(&self, token: Option<&str>, body: Value) -> (StatusCode, Value) {
		let mut request = Request::builder()
			.method(Method::POST)
			.uri("/canvas-sync")
			.header(header::CONTENT_TYPE, "application/json");
		if let Some(token) = token {
			request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
		}
		self.send(request.body(Body::from(body.to_string())).unwrap())
			.await
	}
}

#[tokio::test]
async fn test_health() {
	let server = TestServer::new().await;
	let response = server
		.app
		.clone()
		.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_requests_without_valid_token_are_rejected() {
	let server = TestServer::new().await;

	let (status, body) = server.get_status(None, "project=1").await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(body["error"], "unauthorized");

	let (status, _) = server.get_status(Some("not-a-token"), "project=1").await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);

	let (status, _) = server.post_sync(None, json!({ "project": 1 })).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_status_reports_missing_canvas() {
	let server = TestServer::new().await;
	server.seed(1, &[(0.0, 0.0), (4.0, 2.0)]).await;

	let (status, body) = server.get_status(Some(ALICE), "project=1").await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["scope_key"], "project_1");
	assert_eq!(body["total"], 2);
	assert_eq!(body["missing_canvas"], 2);
	assert_eq!(body["sync_needed"], true);
	assert_eq!(body["sync_status"], "idle");

	let (status, body) = server.get_status(Some(ALICE), "project=1&flag=5").await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["scope_key"], "project_1_flag_5");
	assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_sync_returns_projection() {
	let server = TestServer::new().await;
	server
		.seed(
			1,
			&[
				(1000.0, 2000.0),
				(1500.0, 2500.0),
				(2000.0, 3000.0),
				(2500.0, 3500.0),
			],
		)
		.await;

	let (status, body) = server
		.post_sync(Some(ALICE), json!({ "project": 1, "scale": 1.0 }))
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["updated_count"], 4);
	assert_eq!(body["scale"], 1.0);
	assert_eq!(body["center"], json!({ "x": 1750.0, "y": 2750.0 }));
	assert_eq!(
		body["bounds"],
		json!({ "min_x": 1000.0, "max_x": 2500.0, "min_y": 2000.0, "max_y": 3500.0 })
	);

	let (_, body) = server.get_status(Some(BOB), "project=1").await;
	assert_eq!(body["missing_canvas"], 0);
	assert_eq!(body["sync_status"], "completed");
	assert_eq!(body["sync_started_by"], "alice");
}

#[tokio::test]
async fn test_sync_conflict_names_current_owner() {
	let server = TestServer::new().await;
	server.seed(1, &[(0.0, 0.0)]).await;

	let held = server
		.core
		.canvas_sync()
		.acquire(&cs_core::ops::canvas_sync::ScopeFilter::project(1), "alice", None)
		.await
		.unwrap();
	assert!(held.is_granted());

	let (status, body) = server.post_sync(Some(BOB), json!({ "project": 1 })).await;
	assert_eq!(status, StatusCode::CONFLICT);
	assert_eq!(body["sync_started_by"], "alice");
	assert!(body["sync_started_at"].is_string());
	assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_empty_scope_and_bad_scale_are_client_errors() {
	let server = TestServer::new().await;

	let (status, body) = server.post_sync(Some(ALICE), json!({ "project": 42 })).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error"], "empty_scope");

	server.seed(2, &[(0.0, 0.0)]).await;
	let (status, body) = server
		.post_sync(Some(ALICE), json!({ "project": 2, "scale": -1.0 }))
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error"], "invalid_scale");
}

#[tokio::test]
async fn test_failed_run_is_reported_and_recorded() {
	let server = TestServer::new().await;
	server.seed(3, &[(0.0, 0.0), (10.0, 10.0)]).await;

	// Snapshot succeeds, every canvas write afterwards is refused
	server
		.core
		.db()
		.conn()
		.execute_unprepared(
			"CREATE TRIGGER reject_canvas_writes BEFORE UPDATE ON network_node
			BEGIN
				SELECT RAISE(ABORT, 'canvas write rejected');
			END;",
		)
		.await
		.unwrap();

	let (status, body) = server.post_sync(Some(ALICE), json!({ "project": 3 })).await;
	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(body["error"], "canvas_sync_failed");
	assert!(body["message"]
		.as_str()
		.is_some_and(|message| message.contains("canvas write rejected")));

	let (status, body) = server.get_status(Some(ALICE), "project=3").await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["sync_status"], "failed");
	assert_eq!(body["sync_in_progress"], false);
	assert!(body["error_message"]
		.as_str()
		.is_some_and(|message| message.contains("canvas write rejected")));
	assert_eq!(body["with_canvas"], 0);
}
