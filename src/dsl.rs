//! DSL parser and compiler for mail pipeline definitions.
//!
//! Pipeline format (CMS Pipelines style):
//! ```text
//! PIPE READ
//! | FILTER FROM = "erich@example.com"
//! | COPY "richard@example.com"
//! | SEND
//! ?
//! ```
//!
//! - `PIPE READ` starts the pipeline, reading records from input
//! - `| <stage>` continues to next stage
//! - `| SEND` writes records to output
//! - `?` on its own line marks end of pipeline
//!
//! Stage position rules:
//! - First stage must be READ, and READ may not appear anywhere else
//! - SEND is terminal, so it must be last if present
//! - Without SEND, records are discarded at the end of the chain
//!
//! Supported stages:
//! - `READ` - Read sender/recipient/body triples from input
//! - `FILTER field = "value"` - Keep records where field equals value
//! - `FILTER field != "value"` - Omit records where field equals value
//! - `LOCATE "pattern"` - Keep records whose body contains pattern
//! - `LOCATE field "pattern"` - Keep records where field contains pattern
//! - `COPY "recipient"` (or `COPYTO`) - Also deliver each record to recipient
//! - `SEND` - Write records to output
//! - Lines starting with `#` are comments
//!
//! Fields are `FROM` (or `SENDER`), `TO` (or `RECIPIENT`) and `BODY`.
//! Strings use the first non-blank character as delimiter; a value starting
//! with a letter or digit is taken as a bare word instead.

use std::io::{BufRead, Write};

use crate::error::{PipelineError, Result};
use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::record::Field;
use crate::source::RunSummary;
use crate::stage::{Copier, Filter};

/// A parsed pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// READ - read records from input
    Read,
    /// FILTER field = "value"
    FilterEq { field: Field, value: String },
    /// FILTER field != "value"
    FilterNe { field: Field, value: String },
    /// LOCATE field "pattern" - keep records whose field contains pattern
    Locate { field: Field, pattern: String },
    /// COPY "recipient"
    Copy { recipient: String },
    /// SEND - write to output
    Send,
}

impl Command {
    /// Can this stage be the first stage in a pipeline (source)?
    pub fn can_be_first(&self) -> bool {
        matches!(self, Command::Read)
    }

    /// Get the stage name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Read => "READ",
            Command::FilterEq { .. } | Command::FilterNe { .. } => "FILTER",
            Command::Locate { .. } => "LOCATE",
            Command::Copy { .. } => "COPY",
            Command::Send => "SEND",
        }
    }
}

/// Parse DSL text into commands.
pub fn parse_commands(text: &str) -> Result<Vec<Command>> {
    let mut commands = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // "PIPE COMMAND" - the command follows PIPE
        let line = if line
            .get(..5)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("PIPE "))
        {
            line[5..].trim()
        } else if line.eq_ignore_ascii_case("PIPE") {
            continue;
        } else {
            line
        };

        // Continuation lines: "| COMMAND ..."
        let line = match line.strip_prefix('|') {
            Some(stripped) => stripped.trim(),
            None => line,
        };

        // Trailing "|" (legacy) or "?" (end of pipeline), when standing alone
        let line = strip_end_marker(line, '|');
        let line = strip_end_marker(line, '?');

        if line.is_empty() {
            continue;
        }

        let cmd = parse_command(line).map_err(|message| PipelineError::Parse {
            line: line_num + 1,
            message,
        })?;
        commands.push(cmd);
    }

    Ok(commands)
}

/// Remove a trailing `marker` that is separated from the command by
/// whitespace. A marker glued to a word belongs to that word.
fn strip_end_marker(line: &str, marker: char) -> &str {
    match line.strip_suffix(marker) {
        Some(before) if before.is_empty() || before.ends_with(char::is_whitespace) => {
            before.trim_end()
        }
        _ => line,
    }
}

/// Parse a single command line.
fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let (keyword, rest) = split_word(line);

    match keyword.to_uppercase().as_str() {
        "READ" => Ok(Command::Read),
        "FILTER" => parse_filter(rest),
        "LOCATE" => parse_locate(rest),
        "COPY" | "COPYTO" => parse_copy(rest),
        "SEND" => Ok(Command::Send),
        _ => Err(format!("Unknown command: {keyword}")),
    }
}

/// Split off the first whitespace-delimited word.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(end) => (&s[..end], s[end..].trim_start()),
        None => (s, ""),
    }
}

fn parse_field(word: &str) -> std::result::Result<Field, String> {
    Field::from_keyword(word)
        .ok_or_else(|| format!("Unknown field '{word}' (expected FROM, TO or BODY)"))
}

/// Parse FILTER command.
/// Format: FILTER field = "value" or FILTER field != "value"
fn parse_filter(rest: &str) -> std::result::Result<Command, String> {
    if rest.is_empty() {
        return Err("FILTER requires a field, operator and value".to_string());
    }

    let (field_word, rest) = split_word(rest);
    let field = parse_field(field_word)?;

    let (negate, value_part) = if let Some(v) = rest.strip_prefix("!=") {
        (true, v)
    } else if let Some(v) = rest.strip_prefix('=') {
        (false, v)
    } else {
        return Err("FILTER requires = or != operator".to_string());
    };

    let value = parse_final_value(value_part)?;
    if negate {
        Ok(Command::FilterNe { field, value })
    } else {
        Ok(Command::FilterEq { field, value })
    }
}

/// Parse LOCATE command.
/// Formats:
///   LOCATE "pattern"        - search the body
///   LOCATE field "pattern"  - search a specific field
fn parse_locate(rest: &str) -> std::result::Result<Command, String> {
    if rest.is_empty() {
        return Err("LOCATE requires a pattern".to_string());
    }

    let (word, after_word) = split_word(rest);
    match Field::from_keyword(word) {
        Some(field) if !after_word.is_empty() => {
            let pattern = parse_final_value(after_word)?;
            Ok(Command::Locate { field, pattern })
        }
        _ => {
            let pattern = parse_final_value(rest)?;
            Ok(Command::Locate {
                field: Field::Body,
                pattern,
            })
        }
    }
}

/// Parse COPY command.
/// Format: COPY "recipient" or COPY recipient
fn parse_copy(rest: &str) -> std::result::Result<Command, String> {
    let recipient = parse_final_value(rest)?;
    if recipient.is_empty() {
        return Err("COPY requires a recipient".to_string());
    }
    Ok(Command::Copy { recipient })
}

/// Parse a string value. A leading letter or digit starts a bare word;
/// anything else is a delimiter and the value runs to its next occurrence.
/// Returns (value, rest_of_input).
fn parse_value(s: &str) -> std::result::Result<(String, &str), String> {
    let s = s.trim_start();
    let Some(first) = s.chars().next() else {
        return Err("Expected a value".to_string());
    };

    if first.is_alphanumeric() {
        let (word, rest) = split_word(s);
        return Ok((word.to_string(), rest));
    }

    let after_delim = &s[first.len_utf8()..];
    match after_delim.find(first) {
        Some(end) => {
            let rest = &after_delim[end + first.len_utf8()..];
            Ok((after_delim[..end].to_string(), rest))
        }
        None => Err(format!("Unclosed delimiter '{first}'")),
    }
}

/// Parse a value that must end the line.
fn parse_final_value(s: &str) -> std::result::Result<String, String> {
    let (value, rest) = parse_value(s)?;
    let rest = rest.trim();
    if !rest.is_empty() {
        return Err(format!("Unexpected text after value: {rest}"));
    }
    Ok(value)
}

/// Link parsed commands into a runnable pipeline over `input` and `output`.
///
/// `output` is only used when the definition ends in SEND.
pub fn compile<'a, R, W>(commands: &[Command], input: R, output: W) -> Result<Pipeline<'a, R>>
where
    R: BufRead + 'a,
    W: Write + 'a,
{
    let (first, rest) = commands
        .split_first()
        .ok_or(PipelineError::EmptyPipeline)?;
    if !first.can_be_first() {
        return Err(PipelineError::NotASource(first.name()));
    }

    let mut builder = PipelineBuilder::new(input);
    let mut output = Some(output);

    for (i, cmd) in rest.iter().enumerate() {
        match cmd {
            Command::Read => return Err(PipelineError::DuplicateSource),
            Command::FilterEq { field, value } => {
                builder.add_stage(Box::new(Filter::field_eq(*field, value.as_str())));
            }
            Command::FilterNe { field, value } => {
                builder.add_stage(Box::new(Filter::field_ne(*field, value.as_str())));
            }
            Command::Locate { field, pattern } => {
                builder.add_stage(Box::new(Filter::field_contains(*field, pattern.as_str())));
            }
            Command::Copy { recipient } => {
                builder.add_stage(Box::new(Copier::new(recipient.as_str())));
            }
            Command::Send => {
                if i + 1 != rest.len() {
                    return Err(PipelineError::SinkNotLast(cmd.name()));
                }
                if let Some(out) = output.take() {
                    builder.send(out);
                }
            }
        }
    }

    Ok(builder.build())
}

/// Execute a pipeline defined by DSL text on in-memory input.
///
/// Returns the text written by SEND and the run summary.
pub fn execute_pipeline(input_text: &str, pipeline_text: &str) -> Result<(String, RunSummary)> {
    let commands = parse_commands(pipeline_text)?;

    let mut out = Vec::new();
    let summary = compile(&commands, input_text.as_bytes(), &mut out)?.run()?;

    Ok((String::from_utf8_lossy(&out).into_owned(), summary))
}
