//! Core tip engine for the MonTip relay.
//!
//! This crate turns parsed tip commands into on-chain transfers. It holds the
//! token registry and command parser, the tip pipeline that walks a request
//! through wallet resolution, checks, submission and confirmation, the sinks
//! that record each outcome, and the engine and builder that tie the
//! configured services together.

pub mod builder;
pub mod engine;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod sinks;

pub use builder::{BuilderError, TipEngineBuilder, TipFactories};
pub use engine::{context::TipContext, EngineError, TipEngine, TipHandle};
pub use parser::CommandParser;
pub use pipeline::TipPipeline;
pub use registry::{RegistryError, TokenRegistry};
pub use sinks::{OutcomeRecorder, OutcomeSink, ReplySink, SinkError, StorageSink};
