//! Message record type.
//!
//! A `Record` is a sender/recipient/body triple. Records are never mutated
//! once built; stages that need a variant build a new one.

use std::fmt;

/// Selects one of the three record fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Sender,
    Recipient,
    Body,
}

impl Field {
    /// Parse a DSL field keyword (case-insensitive).
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_uppercase().as_str() {
            "FROM" | "SENDER" => Some(Field::Sender),
            "TO" | "RECIPIENT" => Some(Field::Recipient),
            "BODY" => Some(Field::Body),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Sender => "FROM",
            Field::Recipient => "TO",
            Field::Body => "BODY",
        };
        f.write_str(name)
    }
}

/// A single message flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    sender: String,
    recipient: String,
    body: String,
}

impl Record {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            body: body.into(),
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Get a field by selector.
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Sender => &self.sender,
            Field::Recipient => &self.recipient,
            Field::Body => &self.body,
        }
    }

    /// Build a new record with the same sender and body, addressed to `recipient`.
    pub fn readdressed(&self, recipient: impl Into<String>) -> Self {
        Self {
            sender: self.sender.clone(),
            recipient: recipient.into(),
            body: self.body.clone(),
        }
    }
}

/// Three-line wire form: sender, recipient, body, each newline-terminated.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.sender)?;
        writeln!(f, "{}", self.recipient)?;
        writeln!(f, "{}", self.body)
    }
}
