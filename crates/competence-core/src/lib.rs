//! competence-core: Competence data model, scoring, and update service.
//!
//! This crate defines the per-learner competence records, the pure scoring
//! functions derived from response history, the store trait persistence
//! backends implement, and the service that folds new responses into stored
//! history under concurrent access.

pub mod engine;
pub mod error;
pub mod locks;
pub mod model;
pub mod scoring;
pub mod traits;

pub use engine::{CompetenceService, CompetenceServiceConfig};
pub use error::{CompetenceError, InvalidEvent, StoreError};
pub use model::{
    ComplexityLevel, ConfidenceLevel, Difficulty, ResponseEvent, StudentCompetenceRecord,
    TopicCompetence, VersionedRecord,
};
pub use traits::CompetenceStore;
