//! Neuroevolution pipeline for chess evaluation networks.
//!
//! A population of [`Network`](chessnet_network::Network)s is improved in an endless
//! three-phase cycle driven by [`pipeline::Pipeline`]:
//!
//! 1. **Analysis** ([`analysis`]) - every network plays one game against a reference
//!    evaluator; the positions it evaluates become a curated, trainer-labeled dataset
//! 2. **Training** ([`training`]) - every network back-propagates on its own dataset
//! 3. **Duel** ([`duel`]) - networks play each other in rotating pairings, are ranked
//!    by fitness and the weakest bands are evolved or replaced ([`replacement`])
//!
//! Networks are persisted by [`store::PopulationStore`] after every stage, and every
//! change to the population is reported as an [`events::LifecycleEvent`].
//!
//! # Concurrency
//!
//! Each stage spawns scoped worker threads (one per network, or one per board in the
//! duel stage) and waits for them with a [`barrier::CompletionBarrier`]. Stages never
//! overlap. A shared [`CancellationToken`](chessnet_engine::CancellationToken) stops
//! workers between samples and between moves.
//!
//! # Example
//!
//! ```no_run
//! use chessnet_engine::{CancellationToken, MaterialEvaluator};
//! use chessnet_training::{config::PipelineConfig, events::LogSink, pipeline::Pipeline};
//!
//! let config = PipelineConfig::default();
//! let sink = LogSink::new(config.language);
//! let mut pipeline =
//!     Pipeline::new(config, MaterialEvaluator, Box::new(sink), CancellationToken::new())?;
//! pipeline.run(Some(1))?;
//! # Ok::<(), chessnet_training::PipelineError>(())
//! ```

use chessnet_network::NetworkError;

use crate::{config::ConfigError, store::StoreError};

pub mod analysis;
pub mod barrier;
pub mod config;
pub mod duel;
pub mod events;
pub mod pipeline;
pub mod replacement;
pub mod store;
pub mod training;

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum PipelineError {
    #[display("invalid configuration")]
    Config(ConfigError),
    #[display("population storage failed")]
    Store(StoreError),
    #[display("network operation failed")]
    Network(NetworkError),
}
