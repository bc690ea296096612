//! HTTP API types for the relay service.
//!
//! Webhook payloads as delivered by the social network, the small JSON bodies
//! the service answers with, and a structured error type that maps onto HTTP
//! status codes.

use crate::{InboundCast, TipRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event type carrying a newly published post.
pub const CAST_CREATED: &str = "cast.created";

/// Top-level webhook delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
	#[serde(rename = "type")]
	pub event_type: String,
	/// Event body; only decoded for `cast.created`.
	#[serde(default)]
	pub data: serde_json::Value,
}

/// Post body of a `cast.created` event.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookCast {
	pub hash: String,
	#[serde(default)]
	pub text: String,
	#[serde(default)]
	pub parent_hash: Option<String>,
	#[serde(default)]
	pub timestamp: String,
	pub author: WebhookAuthor,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookAuthor {
	pub fid: u64,
	#[serde(default)]
	pub username: Option<String>,
}

impl WebhookCast {
	/// Converts a reply into an inbound cast; top-level posts yield `None`.
	pub fn into_inbound(self) -> Option<InboundCast> {
		let parent_post_hash = self.parent_hash.filter(|h| !h.is_empty())?;
		Some(InboundCast {
			author_social_id: self.author.fid,
			author_display_name: self.author.username,
			text: self.text,
			parent_post_hash,
			post_hash: self.hash,
			post_timestamp: self.timestamp,
		})
	}
}

/// What the service did with a webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookStatus {
	/// Not a reply, or no trigger word.
	Ignored,
	/// Trigger present but no valid command.
	InvalidCommand,
	/// A tip run was started.
	Processing,
	/// Event type the relay does not act on.
	Ok,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
	pub status: WebhookStatus,
}

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	pub bot: String,
	pub in_flight: usize,
}

/// Stored tip as returned by the lookup endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTipResponse {
	pub tip: TipRecord,
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Suggested retry delay in seconds
	#[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
	pub retry_after: Option<u64>,
}

/// Structured API error type with HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// 400
	BadRequest { error_type: String, message: String },
	/// 401
	Unauthorized { error_type: String, message: String },
	/// 404
	NotFound { error_type: String, message: String },
	/// 503, the sender should redeliver after `retry_after` seconds.
	ServiceUnavailable {
		error_type: String,
		message: String,
		retry_after: Option<u64>,
	},
	/// 500
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Unauthorized { .. } => 401,
			APIError::NotFound { .. } => 404,
			APIError::ServiceUnavailable { .. } => 503,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		match self {
			APIError::BadRequest {
				error_type,
				message,
			}
			| APIError::Unauthorized {
				error_type,
				message,
			}
			| APIError::NotFound {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				retry_after: None,
			},
			APIError::ServiceUnavailable {
				error_type,
				message,
				retry_after,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				retry_after: *retry_after,
			},
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::Unauthorized { message, .. } => write!(f, "Unauthorized: {}", message),
			APIError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			APIError::ServiceUnavailable { message, .. } => {
				write!(f, "Service Unavailable: {}", message)
			},
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
