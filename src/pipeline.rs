//! Pipeline builder and the runnable chain it produces.
//!
//! ```
//! use mailpipe::{PipelineBuilder, Record};
//! use std::io::Cursor;
//!
//! let input = "erich@example.com\nralph@example.com\nAre you sure?\n";
//! let mut output = Vec::new();
//!
//! let mut builder = PipelineBuilder::new(Cursor::new(input));
//! builder
//!     .filter_by(|r: &Record| r.sender() == "erich@example.com")
//!     .copy_to("richard@example.com")
//!     .send(&mut output);
//! let mut pipeline = builder.build();
//! pipeline.run().unwrap();
//! drop(pipeline);
//!
//! assert_eq!(
//!     String::from_utf8(output).unwrap(),
//!     "erich@example.com\nralph@example.com\nAre you sure?\n\
//!      erich@example.com\nrichard@example.com\nAre you sure?\n"
//! );
//! ```

use std::io::{BufRead, Write};

use tracing::debug;

use crate::error::Result;
use crate::record::Record;
use crate::source::{RunSummary, Source};
use crate::stage::{BoxedStage, Copier, Filter, Sink, Stage};

/// Accumulates stages behind a source and links them into a [`Pipeline`].
///
/// Stages run in the order they are added. `build` consumes the builder, so
/// a builder cannot be finalized twice or extended after finalization.
pub struct PipelineBuilder<'a, R> {
    source: Source<'a, R>,
    stages: Vec<BoxedStage<'a>>,
}

impl<'a, R: BufRead + 'a> PipelineBuilder<'a, R> {
    /// Start a pipeline that reads records from `input`.
    pub fn new(input: R) -> Self {
        Self {
            source: Source::new(input),
            stages: Vec::new(),
        }
    }

    /// Append a stage that keeps only records matching `predicate`.
    pub fn filter_by<F>(&mut self, predicate: F) -> &mut Self
    where
        F: Fn(&Record) -> bool + 'a,
    {
        self.add_stage(Box::new(Filter::new(predicate)))
    }

    /// Append a stage that also delivers each record to `recipient`.
    pub fn copy_to(&mut self, recipient: impl Into<String>) -> &mut Self {
        self.add_stage(Box::new(Copier::new(recipient)))
    }

    /// Append a stage that writes records to `out`.
    pub fn send<W: Write + 'a>(&mut self, out: W) -> &mut Self {
        self.add_stage(Box::new(Sink::new(out)))
    }

    /// Append an already constructed stage.
    pub fn add_stage(&mut self, stage: BoxedStage<'a>) -> &mut Self {
        self.stages.push(stage);
        self
    }

    /// Link every stage to the one added after it and return the head.
    pub fn build(self) -> Pipeline<'a, R> {
        let Self { mut source, stages } = self;

        let mut tail: Option<BoxedStage<'a>> = None;
        for mut stage in stages.into_iter().rev() {
            if let Some(next) = tail.take() {
                stage.set_next(next);
            }
            tail = Some(stage);
        }
        if let Some(next) = tail {
            source.set_next(next);
        }

        let pipeline = Pipeline { source };
        debug!(stages = ?pipeline.stage_names(), "pipeline built");
        pipeline
    }
}

/// A fully linked chain. Only the head of a chain can be run.
pub struct Pipeline<'a, R> {
    source: Source<'a, R>,
}

impl<'a, R: BufRead + 'a> Pipeline<'a, R> {
    /// Read the input to the end, pushing each record through the chain.
    pub fn run(&mut self) -> Result<RunSummary> {
        self.source.run()
    }

    /// Stage names from head to tail.
    pub fn stage_names(&self) -> Vec<&'static str> {
        let mut names = vec![self.source.name()];
        let mut link = self.source.link();
        while let Some(stage) = link.get() {
            names.push(stage.name());
            link = stage.link();
        }
        names
    }
}
