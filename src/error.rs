//! Error types for mailpipe.

use thiserror::Error;

/// Errors produced while defining or running a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A pipeline definition line could not be parsed.
    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Pipeline is empty")]
    EmptyPipeline,

    /// The first stage of a definition does not produce records.
    #[error("{0} cannot be the first stage (try READ)")]
    NotASource(&'static str),

    /// A second READ appeared after the head of the pipeline.
    #[error("READ can only be the first stage")]
    DuplicateSource,

    /// Stages were declared after a terminal stage.
    #[error("{0} must be the last stage")]
    SinkNotLast(&'static str),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
