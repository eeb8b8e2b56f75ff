pub mod normalizer;
pub mod pipeline;
pub mod summary;

pub use normalizer::normalize;
pub use pipeline::{
    label, prepare, BatchScores, ScoringError, ScoringPipeline, DECISION_THRESHOLD, LABEL_COLUMNS,
};
pub use summary::summarize;
