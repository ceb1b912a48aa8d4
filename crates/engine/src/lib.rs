//! Recommendation engine.
//!
//! Wires the pipeline together for one request:
//! - builds the behavior profile and extracts intent concurrently
//! - fetches the active catalog and co-occurrence counts
//! - scores, blends and ranks the catalog
//! - hands the ranking to the background recorder
//!
//! Also owns configuration loading and the error taxonomy reported to
//! callers.

mod config;
mod error;
mod profile;
mod recorder;
mod service;

pub use config::{ConfigError, EngineConfig, LoggingConfig, RankingConfig, StoreConfig};
pub use error::{ErrorCategory, RecommendError};
pub use profile::ProfileBuilder;
pub use recorder::Recorder;
pub use service::{new_session_id, Recommendation, RecommendationRequest, Recommender};
