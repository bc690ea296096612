//! Webhook intake.
//!
//! Verifies the delivery signature over the raw body, then decides whether a
//! `cast.created` event carries a tip command. Tip runs are dispatched to the
//! engine and the delivery is answered before the run finishes.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use thiserror::Error;
use tip_core::{EngineError, TipEngine};
use tip_types::{
	truncate_id, APIError, SecretString, WebhookCast, WebhookEvent, WebhookResponse,
	WebhookStatus, CAST_CREATED,
};
use tracing::{debug, info, instrument, warn};

/// Header carrying the hex HMAC-SHA512 of the raw body.
pub const SIGNATURE_HEADER: &str = "X-Neynar-Signature";

/// Seconds a sender should wait before redelivering a rejected event.
const RETRY_AFTER_SECONDS: u64 = 5;

type HmacSha512 = Hmac<Sha512>;

/// Errors that can occur while handling a webhook delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
	#[error("Missing signature")]
	MissingSignature,
	#[error("Invalid signature")]
	InvalidSignature,
	#[error("Malformed payload: {0}")]
	Malformed(String),
	#[error(transparent)]
	Engine(#[from] EngineError),
}

impl From<WebhookError> for APIError {
	fn from(e: WebhookError) -> Self {
		let message = e.to_string();
		match e {
			WebhookError::MissingSignature => APIError::BadRequest {
				error_type: "MISSING_SIGNATURE".into(),
				message,
			},
			WebhookError::InvalidSignature => APIError::Unauthorized {
				error_type: "INVALID_SIGNATURE".into(),
				message,
			},
			WebhookError::Malformed(_) => APIError::BadRequest {
				error_type: "MALFORMED_PAYLOAD".into(),
				message,
			},
			WebhookError::Engine(EngineError::AtCapacity(_)) => APIError::ServiceUnavailable {
				error_type: "AT_CAPACITY".into(),
				message,
				retry_after: Some(RETRY_AFTER_SECONDS),
			},
			WebhookError::Engine(_) => APIError::InternalServerError {
				error_type: "INTERNAL_ERROR".into(),
				message,
			},
		}
	}
}

/// Checks `signature` against the HMAC-SHA512 of `body` in constant time.
pub fn verify_signature(
	secret: &SecretString,
	body: &[u8],
	signature: Option<&str>,
) -> Result<(), WebhookError> {
	let signature = signature
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.ok_or(WebhookError::MissingSignature)?;
	let expected = hex::decode(signature).map_err(|_| WebhookError::InvalidSignature)?;

	let mut mac = secret
		.with_exposed(|key| HmacSha512::new_from_slice(key.as_bytes()))
		.map_err(|_| WebhookError::InvalidSignature)?;
	mac.update(body);
	mac.verify_slice(&expected)
		.map_err(|_| WebhookError::InvalidSignature)
}

/// Verifies and processes one delivery.
pub async fn process_webhook(
	engine: &TipEngine,
	secret: &SecretString,
	signature: Option<&str>,
	body: &[u8],
) -> Result<WebhookResponse, WebhookError> {
	if let Err(e) = verify_signature(secret, body, signature) {
		warn!("Rejected webhook: {}", e);
		return Err(e);
	}

	let event: WebhookEvent =
		serde_json::from_slice(body).map_err(|e| WebhookError::Malformed(e.to_string()))?;
	if event.event_type != CAST_CREATED {
		debug!(event_type = %event.event_type, "Ignoring webhook event");
		return Ok(WebhookResponse {
			status: WebhookStatus::Ok,
		});
	}

	let cast: WebhookCast =
		serde_json::from_value(event.data).map_err(|e| WebhookError::Malformed(e.to_string()))?;
	handle_cast(engine, cast).map(|status| WebhookResponse { status })
}

#[instrument(skip_all, fields(cast = %truncate_id(&cast.hash), fid = cast.author.fid))]
fn handle_cast(engine: &TipEngine, cast: WebhookCast) -> Result<WebhookStatus, WebhookError> {
	let Some(inbound) = cast.into_inbound().filter(|c| engine.has_trigger(&c.text)) else {
		debug!("Cast ignored: not a reply with a tip trigger");
		return Ok(WebhookStatus::Ignored);
	};

	let Some(command) = engine.parse(&inbound.text) else {
		info!("Invalid tip command");
		return Ok(WebhookStatus::InvalidCommand);
	};

	engine.dispatch(&inbound, command)?;
	debug!("Tip accepted");
	Ok(WebhookStatus::Processing)
}
