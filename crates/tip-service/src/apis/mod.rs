//! HTTP endpoint implementations.

pub mod tips;
pub mod webhook;
