//! Social network types consumed by the tip pipeline.
//!
//! Inbound events arrive from the webhook intake already authenticated and
//! filtered to replies. Parent posts are fetched on demand to resolve the tip
//! recipient.

use serde::{Deserialize, Serialize};

/// A validated inbound post that may contain a tip command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundCast {
	/// Social identifier (fid) of the post author, i.e. the tipper.
	pub author_social_id: u64,
	/// Username of the post author, when the event carried one.
	pub author_display_name: Option<String>,
	/// Raw post text.
	pub text: String,
	/// Hash of the post being replied to.
	pub parent_post_hash: String,
	/// Hash of the post itself.
	pub post_hash: String,
	/// Post creation timestamp as reported by the network.
	pub post_timestamp: String,
}

/// The author details of a parent post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentPost {
	/// Social identifier of the parent post author, i.e. the recipient.
	pub author_social_id: u64,
	/// Username of the parent post author.
	pub author_display_name: Option<String>,
	/// The author's verified primary EVM address, if they have one.
	pub verified_primary_address: Option<String>,
}
