//! Neynar HTTP API client for Farcaster.
//!
//! Parent posts are looked up with `GET /v2/farcaster/cast` and replies are
//! published with `POST /v2/farcaster/cast` on behalf of a managed signer.

use crate::{SocialError, SocialFactory, SocialInterface, SocialRegistry};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tip_types::{
	truncate_id, ConfigSchema, Field, FieldType, ImplementationRegistry, ParentPost, Schema,
	SecretString, ValidationError,
};

const DEFAULT_API_URL: &str = "https://api.neynar.com";
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Deserialize)]
struct CastEnvelope {
	cast: Cast,
}

#[derive(Debug, Deserialize)]
struct Cast {
	#[serde(default)]
	hash: Option<String>,
	#[serde(default)]
	author: Option<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
	fid: u64,
	#[serde(default)]
	username: Option<String>,
	#[serde(default)]
	verified_addresses: Option<VerifiedAddresses>,
}

#[derive(Debug, Deserialize)]
struct VerifiedAddresses {
	#[serde(default)]
	primary: Option<PrimaryAddresses>,
}

#[derive(Debug, Deserialize)]
struct PrimaryAddresses {
	#[serde(default)]
	eth_address: Option<String>,
}

#[derive(Debug, Serialize)]
struct PublishCastRequest<'a> {
	signer_uuid: &'a str,
	text: &'a str,
	parent: &'a str,
}

/// Farcaster client backed by the Neynar v2 API.
pub struct NeynarClient {
	client: reqwest::Client,
	api_url: String,
	api_key: SecretString,
	/// Managed signer used to publish replies; lookups work without it.
	signer_uuid: Option<SecretString>,
}

impl NeynarClient {
	pub fn new(
		api_url: &str,
		api_key: SecretString,
		signer_uuid: Option<SecretString>,
		timeout: Duration,
	) -> Result<Self, SocialError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| SocialError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;

		Ok(Self {
			client,
			api_url: api_url.trim_end_matches('/').to_string(),
			api_key,
			signer_uuid,
		})
	}

	fn cast_endpoint(&self) -> String {
		format!("{}/v2/farcaster/cast", self.api_url)
	}
}

/// Configuration schema for the Neynar client.
pub struct NeynarSchema;

impl NeynarSchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for NeynarSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let non_blank = |value: &toml::Value| match value.as_str() {
			Some(s) if s.trim().is_empty() => Err("must not be empty".to_string()),
			_ => Ok(()),
		};

		let schema = Schema::new(
			vec![Field::new("api_key", FieldType::String).with_validator(non_blank)],
			vec![
				Field::new("api_url", FieldType::Url),
				Field::new("signer_uuid", FieldType::String).with_validator(non_blank),
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(120),
					},
				),
			],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl SocialInterface for NeynarClient {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(NeynarSchema)
	}

	async fn fetch_post(&self, hash: &str) -> Result<ParentPost, SocialError> {
		let response = self
			.api_key
			.with_exposed(|key| {
				self.client
					.get(self.cast_endpoint())
					.query(&[("identifier", hash), ("type", "hash")])
					.header("x-api-key", key)
					.send()
			})
			.await
			.map_err(|e| SocialError::Upstream(format!("Cast lookup failed: {}", e)))?;

		let status = response.status();
		if status == StatusCode::NOT_FOUND {
			return Err(SocialError::NotFound(hash.to_string()));
		}
		if !status.is_success() {
			return Err(SocialError::Upstream(format!(
				"Cast lookup returned {}",
				status
			)));
		}

		let envelope: CastEnvelope = response
			.json()
			.await
			.map_err(|e| SocialError::Upstream(format!("Malformed cast response: {}", e)))?;

		let author = envelope.cast.author.ok_or_else(|| {
			SocialError::Upstream(format!("Cast {} has no author", truncate_id(hash)))
		})?;

		let verified_primary_address = author
			.verified_addresses
			.and_then(|v| v.primary)
			.and_then(|p| p.eth_address)
			.filter(|a| !a.is_empty());

		tracing::debug!(
			cast = %truncate_id(hash),
			fid = author.fid,
			has_primary = verified_primary_address.is_some(),
			"Fetched parent cast"
		);

		Ok(ParentPost {
			author_social_id: author.fid,
			author_display_name: author.username,
			verified_primary_address,
		})
	}

	async fn publish_reply(&self, parent_hash: &str, text: &str) -> Result<String, SocialError> {
		let signer = self.signer_uuid.as_ref().ok_or_else(|| {
			SocialError::InvalidConfig("signer_uuid is required to publish replies".to_string())
		})?;

		let response = signer
			.with_exposed(|signer_uuid| {
				let body = PublishCastRequest {
					signer_uuid,
					text,
					parent: parent_hash,
				};
				self.api_key.with_exposed(|key| {
					self.client
						.post(self.cast_endpoint())
						.header("x-api-key", key)
						.json(&body)
						.send()
				})
			})
			.await
			.map_err(|e| SocialError::Upstream(format!("Reply publish failed: {}", e)))?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(SocialError::Upstream(format!(
				"Reply publish returned {}: {}",
				status, body
			)));
		}

		let envelope: CastEnvelope = response
			.json()
			.await
			.map_err(|e| SocialError::Upstream(format!("Malformed publish response: {}", e)))?;

		envelope
			.cast
			.hash
			.ok_or_else(|| SocialError::Upstream("Publish response has no cast hash".to_string()))
	}
}

/// Factory function to create the Neynar client from configuration.
///
/// Configuration parameters:
/// - `api_key` (required): Neynar API key
/// - `api_url` (optional): defaults to https://api.neynar.com
/// - `signer_uuid` (optional): managed signer, needed for replies
/// - `timeout_seconds` (optional): per-request timeout, defaults to 10
pub fn create_social(config: &toml::Value) -> Result<Box<dyn SocialInterface>, SocialError> {
	NeynarSchema::validate_config(config).map_err(|e| SocialError::InvalidConfig(e.to_string()))?;

	let api_key = config
		.get("api_key")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| SocialError::InvalidConfig("api_key is required".to_string()))?;

	let api_url = config
		.get("api_url")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_API_URL);

	let signer_uuid = config
		.get("signer_uuid")
		.and_then(|v| v.as_str())
		.map(SecretString::from);

	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	let client = NeynarClient::new(api_url, api_key, signer_uuid, Duration::from_secs(timeout))?;
	Ok(Box::new(client))
}

/// Registry for the Neynar implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "neynar";
	type Factory = SocialFactory;

	fn factory() -> Self::Factory {
		create_social
	}
}

impl SocialRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{
		extract::Query,
		http::{HeaderMap, StatusCode as HttpStatus},
		routing::get,
		Json, Router,
	};
	use serde_json::{json, Value};
	use std::collections::HashMap;

	const API_KEY: &str = "test-key";

	fn authorized(headers: &HeaderMap) -> bool {
		headers
			.get("x-api-key")
			.and_then(|v| v.to_str().ok())
			.is_some_and(|v| v == API_KEY)
	}

	async fn lookup(
		headers: HeaderMap,
		Query(params): Query<HashMap<String, String>>,
	) -> (HttpStatus, Json<Value>) {
		if !authorized(&headers) {
			return (HttpStatus::UNAUTHORIZED, Json(json!({})));
		}
		match params.get("identifier").map(String::as_str) {
			Some("0xparent") => (
				HttpStatus::OK,
				Json(json!({
					"cast": {
						"hash": "0xparent",
						"author": {
							"fid": 3,
							"username": "alice",
							"verified_addresses": {
								"eth_addresses": ["0x00000000000000000000000000000000000000aa"],
								"primary": { "eth_address": "0x00000000000000000000000000000000000000aa" }
							}
						}
					}
				})),
			),
			Some("0xbare") => (
				HttpStatus::OK,
				Json(json!({ "cast": { "hash": "0xbare", "author": { "fid": 7 } } })),
			),
			_ => (HttpStatus::NOT_FOUND, Json(json!({ "message": "not found" }))),
		}
	}

	async fn publish(headers: HeaderMap, Json(body): Json<Value>) -> (HttpStatus, Json<Value>) {
		if !authorized(&headers) || body["signer_uuid"] != "signer-1" {
			return (HttpStatus::FORBIDDEN, Json(json!({ "message": "bad signer" })));
		}
		assert_eq!(body["parent"], "0xorigin");
		(
			HttpStatus::OK,
			Json(json!({ "success": true, "cast": { "hash": "0xreply" } })),
		)
	}

	async fn spawn_mock() -> String {
		let app = Router::new().route("/v2/farcaster/cast", get(lookup).post(publish));
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		format!("http://{}", addr)
	}

	fn client_for(url: &str, key: &str, signer: Option<&str>) -> Box<dyn SocialInterface> {
		let mut table = toml::map::Map::new();
		table.insert("api_url".into(), toml::Value::String(url.to_string()));
		table.insert("api_key".into(), toml::Value::String(key.to_string()));
		if let Some(signer) = signer {
			table.insert("signer_uuid".into(), toml::Value::String(signer.to_string()));
		}
		create_social(&toml::Value::Table(table)).unwrap()
	}

	#[tokio::test]
	async fn test_fetch_post_reads_author_and_primary_address() {
		let url = spawn_mock().await;
		let client = client_for(&url, API_KEY, None);

		let post = client.fetch_post("0xparent").await.unwrap();
		assert_eq!(post.author_social_id, 3);
		assert_eq!(post.author_display_name.as_deref(), Some("alice"));
		assert_eq!(
			post.verified_primary_address.as_deref(),
			Some("0x00000000000000000000000000000000000000aa")
		);
	}

	#[tokio::test]
	async fn test_fetch_post_without_verified_address() {
		let url = spawn_mock().await;
		let client = client_for(&url, API_KEY, None);

		let post = client.fetch_post("0xbare").await.unwrap();
		assert_eq!(post.author_social_id, 7);
		assert!(post.author_display_name.is_none());
		assert!(post.verified_primary_address.is_none());
	}

	#[tokio::test]
	async fn test_fetch_post_not_found() {
		let url = spawn_mock().await;
		let client = client_for(&url, API_KEY, None);
		assert!(matches!(
			client.fetch_post("0xmissing").await,
			Err(SocialError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn test_wrong_key_is_upstream_error() {
		let url = spawn_mock().await;
		let client = client_for(&url, "wrong", None);
		assert!(matches!(
			client.fetch_post("0xparent").await,
			Err(SocialError::Upstream(_))
		));
	}

	#[tokio::test]
	async fn test_publish_reply_returns_new_hash() {
		let url = spawn_mock().await;
		let client = client_for(&url, API_KEY, Some("signer-1"));
		let hash = client.publish_reply("0xorigin", "tipped!").await.unwrap();
		assert_eq!(hash, "0xreply");
	}

	#[tokio::test]
	async fn test_publish_reply_requires_signer() {
		let client = client_for("http://127.0.0.1:1", API_KEY, None);
		assert!(matches!(
			client.publish_reply("0xorigin", "tipped!").await,
			Err(SocialError::InvalidConfig(_))
		));
	}

	#[test]
	fn test_schema_rejects_blank_key() {
		let config: toml::Value = toml::from_str("api_key = \"  \"").unwrap();
		assert!(NeynarSchema::validate_config(&config).is_err());

		let config: toml::Value =
			toml::from_str("api_key = \"k\"\napi_url = \"ftp://example\"").unwrap();
		assert!(NeynarSchema::validate_config(&config).is_err());
	}
}
