//! Sieve triage engine.
//!
//! Takes a normalized message and returns a verdict, a score, an evidence
//! breakdown and an explanation. The work is split into:
//!
//! - [`SignalProducer`]s, each owning one evidence slot, held in a
//!   [`ProducerRegistry`] built at startup
//! - the [`Engine`], which runs the quick pass, routes, fans producers out
//!   under per-producer timeouts and a [`CancellationToken`], then scores
//!   and optionally consults an advisor
//! - [`DecisionTrace`], a replayable record of each decision; [`replay`]
//!   recomputes the response without invoking producers or the advisor
//!
//! ```no_run
//! use std::sync::Arc;
//! use sieve_engine::{static_registry, Engine, NormalizedInput};
//! use sieve_policy::{ConfigHandle, EngineConfig};
//! use sieve_engine::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(ConfigHandle::new(EngineConfig::default())?);
//! let engine = Engine::new(static_registry(vec![])?, config);
//! let assessment = engine
//!     .assess(NormalizedInput::default(), CancellationToken::new())
//!     .await;
//! println!("{}", assessment.response.verdict);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod explanation;
pub mod mocks;
pub mod orchestrator;
pub mod producer;
pub mod response;
pub mod trace;

pub use error::{EngineError, EngineResult, ProducerError, RegistryError};
pub use explanation::Explanation;
pub use orchestrator::{Assessment, Engine};
pub use producer::{
    default_producer_for, static_registry, AttachmentMeta, NormalizedInput, ProducerRegistry,
    ProducerRegistryBuilder, SignalProducer, StaticProducer,
};
pub use response::AssessmentResponse;
pub use trace::{hash_json, replay, AdvisoryRecord, DecisionTrace, StepLog, TraceStep};

pub use tokio_util::sync::CancellationToken;
