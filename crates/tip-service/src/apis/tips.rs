//! Tip lookup API.
//!
//! Returns the record stored for a tip, addressed either by the hash of the
//! post that carried the command or by the transaction hash.

use thiserror::Error;
use tip_core::{EngineError, TipEngine};
use tip_types::{truncate_id, APIError, GetTipResponse};
use tracing::{info, instrument, warn};

/// Errors that can occur during tip lookup.
#[derive(Debug, Error)]
pub enum TipLookupError {
	#[error("Tip not found: {0}")]
	NotFound(String),
	#[error("Internal error: {0}")]
	Internal(String),
}

impl From<TipLookupError> for APIError {
	fn from(e: TipLookupError) -> Self {
		match e {
			TipLookupError::NotFound(_) => APIError::NotFound {
				error_type: "TIP_NOT_FOUND".into(),
				message: e.to_string(),
			},
			TipLookupError::Internal(_) => APIError::InternalServerError {
				error_type: "INTERNAL_ERROR".into(),
				message: e.to_string(),
			},
		}
	}
}

impl From<EngineError> for TipLookupError {
	fn from(e: EngineError) -> Self {
		TipLookupError::Internal(e.to_string())
	}
}

/// Looks up a tip by cast hash, falling back to the transaction hash index.
#[instrument(skip_all, fields(hash = %truncate_id(hash)))]
pub async fn get_tip(engine: &TipEngine, hash: &str) -> Result<GetTipResponse, TipLookupError> {
	info!("Retrieving tip");

	if let Some(tip) = engine.find_tip(hash).await? {
		return Ok(GetTipResponse { tip });
	}
	match engine.find_tip_by_tx(hash).await? {
		Some(tip) => Ok(GetTipResponse { tip }),
		None => {
			warn!("Tip not found");
			Err(TipLookupError::NotFound(hash.to_string()))
		},
	}
}
