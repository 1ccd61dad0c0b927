//! Chain-of-responsibility stage trait and the intermediate/terminal stages.
//!
//! Each `Stage` owns its successor through a [`Link`] and receives records
//! by value. A stage forwards a record by handing it to its link; a record
//! that is not forwarded is dropped. Forwarding past the end of the chain is
//! a no-op.

use std::fmt;
use std::io::Write;

use tracing::{debug, trace};

use crate::error::Result;
use crate::record::{Field, Record};

/// A stage boxed for storage in a chain.
pub type BoxedStage<'a> = Box<dyn Stage<'a> + 'a>;

/// Predicate used by [`Filter`].
pub type Predicate<'a> = Box<dyn Fn(&Record) -> bool + 'a>;

/// Exclusive, optional link to the next stage in a chain.
#[derive(Default)]
pub struct Link<'a> {
    next: Option<BoxedStage<'a>>,
}

impl<'a> Link<'a> {
    pub fn new() -> Self {
        Self { next: None }
    }

    /// Install the successor, replacing any previous one.
    pub fn set(&mut self, stage: BoxedStage<'a>) {
        self.next = Some(stage);
    }

    pub fn get(&self) -> Option<&(dyn Stage<'a> + 'a)> {
        self.next.as_deref()
    }

    /// Hand `record` to the successor, or drop it if there is none.
    pub fn forward(&mut self, record: Record) -> Result<()> {
        match self.next.as_mut() {
            Some(next) => next.process(record),
            None => Ok(()),
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        match self.next.as_mut() {
            Some(next) => next.flush(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Link<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(next) => write!(f, "Link({})", next.name()),
            None => f.write_str("Link(None)"),
        }
    }
}

/// A pipeline stage that processes records one at a time.
///
/// Implementors only have to expose their [`Link`]; the default `process`
/// forwards every record unchanged and the default `flush` passes the flush
/// down the chain.
pub trait Stage<'a> {
    /// The display name of this stage.
    fn name(&self) -> &'static str;

    fn link(&self) -> &Link<'a>;

    fn link_mut(&mut self) -> &mut Link<'a>;

    /// Install the successor. Last write wins.
    fn set_next(&mut self, next: BoxedStage<'a>) {
        self.link_mut().set(next);
    }

    /// Take ownership of one record and forward zero or more records.
    fn process(&mut self, record: Record) -> Result<()> {
        self.link_mut().forward(record)
    }

    /// Called once after the last record has been processed.
    fn flush(&mut self) -> Result<()> {
        self.link_mut().flush()
    }
}

// ---------------------------------------------------------------------------
// Stage implementations
// ---------------------------------------------------------------------------

/// FILTER / LOCATE - forwards records that satisfy a predicate.
pub struct Filter<'a> {
    name: &'static str,
    predicate: Predicate<'a>,
    next: Link<'a>,
}

impl<'a> Filter<'a> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + 'a,
    {
        Self {
            name: "FILTER",
            predicate: Box::new(predicate),
            next: Link::new(),
        }
    }

    /// Keep records whose field equals `value`.
    pub fn field_eq(field: Field, value: impl Into<String>) -> Self {
        let value = value.into();
        Self::new(move |r: &Record| r.field(field) == value)
    }

    /// Keep records whose field does not equal `value`.
    pub fn field_ne(field: Field, value: impl Into<String>) -> Self {
        let value = value.into();
        Self::new(move |r: &Record| r.field(field) != value)
    }

    /// Keep records whose field contains `pattern`.
    pub fn field_contains(field: Field, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let mut filter = Self::new(move |r: &Record| r.field(field).contains(pattern.as_str()));
        filter.name = "LOCATE";
        filter
    }
}

impl<'a> Stage<'a> for Filter<'a> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn link(&self) -> &Link<'a> {
        &self.next
    }

    fn link_mut(&mut self) -> &mut Link<'a> {
        &mut self.next
    }

    fn process(&mut self, record: Record) -> Result<()> {
        if (self.predicate)(&record) {
            self.next.forward(record)
        } else {
            debug!(stage = self.name, sender = record.sender(), "record dropped");
            Ok(())
        }
    }
}

/// COPY - forwards each record, then a copy readdressed to a fixed recipient.
///
/// No copy is made when the record is already addressed to that recipient.
pub struct Copier<'a> {
    recipient: String,
    next: Link<'a>,
}

impl<'a> Copier<'a> {
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            next: Link::new(),
        }
    }
}

impl<'a> Stage<'a> for Copier<'a> {
    fn name(&self) -> &'static str {
        "COPY"
    }

    fn link(&self) -> &Link<'a> {
        &self.next
    }

    fn link_mut(&mut self) -> &mut Link<'a> {
        &mut self.next
    }

    fn process(&mut self, record: Record) -> Result<()> {
        let copy = (record.recipient() != self.recipient)
            .then(|| record.readdressed(self.recipient.as_str()));

        self.next.forward(record)?;

        if let Some(copy) = copy {
            debug!(recipient = %self.recipient, "copy emitted");
            self.next.forward(copy)?;
        }
        Ok(())
    }
}

/// SEND - writes records to a destination. Terminal: nothing is forwarded.
pub struct Sink<'a, W> {
    out: W,
    next: Link<'a>,
}

impl<'a, W: Write> Sink<'a, W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            next: Link::new(),
        }
    }
}

impl<'a, W: Write + 'a> Stage<'a> for Sink<'a, W> {
    fn name(&self) -> &'static str {
        "SEND"
    }

    fn link(&self) -> &Link<'a> {
        &self.next
    }

    fn link_mut(&mut self) -> &mut Link<'a> {
        &mut self.next
    }

    fn process(&mut self, record: Record) -> Result<()> {
        trace!(sender = record.sender(), recipient = record.recipient(), "write");
        write!(self.out, "{record}")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
