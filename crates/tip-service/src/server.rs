//! HTTP server for the relay.
//!
//! Serves the webhook intake, a liveness probe and the tip lookup API.

use crate::apis::{tips, webhook};
use axum::{
	body::Bytes,
	extract::{DefaultBodyLimit, Path, State},
	http::HeaderMap,
	response::Json,
	routing::{get, post},
	Router,
};
use std::future::Future;
use std::sync::Arc;
use tip_config::ApiConfig;
use tip_core::TipEngine;
use tip_types::{APIError, GetTipResponse, HealthResponse, SecretString, WebhookResponse};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<TipEngine>,
	/// Shared secret the webhook sender signs deliveries with.
	pub webhook_secret: SecretString,
}

/// Builds the router with all routes and middleware.
pub fn router(state: AppState, max_request_size: usize) -> Router {
	Router::new()
		.route("/webhook", post(handle_webhook))
		.route("/health", get(handle_health))
		.nest(
			"/api",
			Router::new().route("/tips/{hash}", get(handle_get_tip)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive())
				.layer(DefaultBodyLimit::max(max_request_size)),
		)
		.with_state(state)
}

/// Starts the HTTP server and runs it until `shutdown` resolves.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<TipEngine>,
	shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error>> {
	let webhook_secret = api_config
		.webhook_secret
		.clone()
		.ok_or("API webhook_secret is not configured")?;

	let app = router(
		AppState {
			engine,
			webhook_secret,
		},
		api_config.max_request_size,
	);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("MonTip API server starting on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown)
		.await?;

	Ok(())
}

/// Handles POST /webhook deliveries.
async fn handle_webhook(
	State(state): State<AppState>,
	headers: HeaderMap,
	body: Bytes,
) -> Result<Json<WebhookResponse>, APIError> {
	let signature = headers
		.get(webhook::SIGNATURE_HEADER)
		.and_then(|v| v.to_str().ok());

	webhook::process_webhook(&state.engine, &state.webhook_secret, signature, &body)
		.await
		.map(Json)
		.map_err(APIError::from)
}

/// Handles GET /health requests.
async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok".to_string(),
		bot: state.engine.context().config.bot.id.clone(),
		in_flight: state.engine.in_flight(),
	})
}

/// Handles GET /api/tips/{hash} requests.
async fn handle_get_tip(
	Path(hash): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<GetTipResponse>, APIError> {
	tips::get_tip(&state.engine, &hash)
		.await
		.map(Json)
		.map_err(APIError::from)
}
