//! # mailpipe
//!
//! A chain-of-responsibility pipeline for mail-like records.
//!
//! Every record is a sender/recipient/body triple. A pipeline reads records
//! from a line-oriented source, passes each one through a linked chain of
//! stages, and writes the survivors to a sink.
//!
//! ## Overview
//!
//! - **Records**: three string fields, never mutated once built
//! - **Record-at-a-time**: each record travels the whole chain before the
//!   next one is read
//! - **Stages**: READ (source), FILTER/LOCATE, COPY, SEND (sink)
//! - **Builder**: appends stages in order and links them into a [`Pipeline`]
//!
//! ## Example
//!
//! ```
//! use mailpipe::{PipelineBuilder, Record};
//! use std::io::Cursor;
//!
//! let input = "erich@example.com\nrichard@example.com\nHello there\n\
//!              ralph@example.com\nerich@example.com\nNo\n";
//! let mut output = Vec::new();
//!
//! let mut builder = PipelineBuilder::new(Cursor::new(input));
//! builder
//!     .filter_by(|r: &Record| r.sender() == "erich@example.com")
//!     .send(&mut output);
//! let summary = builder.build().run().unwrap();
//!
//! assert_eq!(summary.records_read, 2);
//! assert_eq!(
//!     String::from_utf8(output).unwrap(),
//!     "erich@example.com\nrichard@example.com\nHello there\n"
//! );
//! ```

pub mod dsl;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod source;
pub mod stage;

pub use dsl::{Command, compile, execute_pipeline, parse_commands};
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use record::{Field, Record};
pub use source::{RunSummary, Source};
pub use stage::{BoxedStage, Copier, Filter, Link, Predicate, Sink, Stage};
