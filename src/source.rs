//! Source stage: turns line-oriented input into records.
//!
//! Each record takes exactly three lines: sender, recipient, body. A run
//! ends when no sender line can be read. A trailing group of one or two
//! lines is dropped and reported in the [`RunSummary`].

use std::io::BufRead;

use tracing::{trace, warn};

use crate::error::Result;
use crate::record::Record;
use crate::stage::{Link, Stage};

/// Counts reported by a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Complete records read from the input.
    pub records_read: usize,
    /// Lines of an incomplete final record that were discarded (0, 1 or 2).
    pub trailing_lines_dropped: usize,
}

/// READ - reads records from a buffered reader and pushes them down the chain.
pub struct Source<'a, R> {
    input: R,
    line: usize,
    next: Link<'a>,
}

impl<'a, R: BufRead> Source<'a, R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            line: 0,
            next: Link::new(),
        }
    }

    /// Read every record from the input and push it through the chain.
    ///
    /// Each record travels the whole chain before the next one is read.
    /// Once the input is exhausted the chain is flushed.
    pub fn run(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        while let Some(sender) = self.read_line()? {
            let Some(recipient) = self.read_line()? else {
                summary.trailing_lines_dropped = 1;
                break;
            };
            let Some(body) = self.read_line()? else {
                summary.trailing_lines_dropped = 2;
                break;
            };

            summary.records_read += 1;
            trace!(line = self.line - 2, sender = %sender, "read");
            self.next.forward(Record::new(sender, recipient, body))?;
        }

        if summary.trailing_lines_dropped > 0 {
            warn!(
                lines = summary.trailing_lines_dropped,
                "incomplete record at end of input dropped"
            );
        }

        self.next.flush()?;
        Ok(summary)
    }

    /// Read one line without its terminator, or `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        self.line += 1;
        if line.ends_with('\n') {
            line.pop();
        }
        if line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }
}

impl<'a, R: BufRead + 'a> Stage<'a> for Source<'a, R> {
    fn name(&self) -> &'static str {
        "READ"
    }

    fn link(&self) -> &Link<'a> {
        &self.next
    }

    fn link_mut(&mut self) -> &mut Link<'a> {
        &mut self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::tests::Capture;
    use std::cell::RefCell;
    use std::io::Cursor;

    fn read_all(input: &str) -> (Vec<Record>, RunSummary) {
        let seen = RefCell::new(Vec::new());
        let summary = {
            let mut source = Source::new(Cursor::new(input.to_string()));
            source.set_next(Box::new(Capture::new(&seen)));
            source.run().unwrap()
        };
        (seen.into_inner(), summary)
    }

    #[test]
    fn test_reads_triples() {
        let (records, summary) = read_all("a\nb\nhello\nc\nd\nbye\n");
        assert_eq!(
            records,
            vec![Record::new("a", "b", "hello"), Record::new("c", "d", "bye")]
        );
        assert_eq!(summary.records_read, 2);
        assert_eq!(summary.trailing_lines_dropped, 0);
    }

    #[test]
    fn test_empty_input() {
        let (records, summary) = read_all("");
        assert!(records.is_empty());
        assert_eq!(summary, RunSummary::default());
    }

    #[test]
    fn test_last_body_without_newline() {
        let (records, _) = read_all("a\nb\nno newline");
        assert_eq!(records, vec![Record::new("a", "b", "no newline")]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let (records, _) = read_all("a\r\nb\r\nhello\r\n");
        assert_eq!(records, vec![Record::new("a", "b", "hello")]);

        let (records, _) = read_all("a\r\nb\r\nhello\r");
        assert_eq!(records, vec![Record::new("a", "b", "hello")]);
    }

    #[test]
    fn test_empty_fields_are_kept() {
        let (records, _) = read_all("a\n\n\n");
        assert_eq!(records, vec![Record::new("a", "", "")]);
    }

    #[test]
    fn test_partial_trailing_group_dropped() {
        let (records, summary) = read_all("a\nb\nhello\nc\nd\n");
        assert_eq!(records, vec![Record::new("a", "b", "hello")]);
        assert_eq!(summary.records_read, 1);
        assert_eq!(summary.trailing_lines_dropped, 2);

        let (records, summary) = read_all("a\nb\nhello\nc\n");
        assert_eq!(records.len(), 1);
        assert_eq!(summary.trailing_lines_dropped, 1);
    }

    #[test]
    fn test_run_without_next() {
        let mut source = Source::new(Cursor::new("a\nb\nc\n"));
        let summary = source.run().unwrap();
        assert_eq!(summary.records_read, 1);
    }

    #[test]
    fn test_second_run_reads_nothing() {
        let mut source = Source::new(Cursor::new("a\nb\nc\n"));
        assert_eq!(source.run().unwrap().records_read, 1);
        assert_eq!(source.run().unwrap().records_read, 0);
    }

    #[test]
    fn test_process_forwards_mid_chain() {
        let seen = RefCell::new(Vec::new());
        {
            let mut source = Source::new(Cursor::new(""));
            source.set_next(Box::new(Capture::new(&seen)));
            source.process(Record::new("a", "b", "c")).unwrap();
        }
        assert_eq!(*seen.borrow(), vec![Record::new("a", "b", "c")]);
    }

    #[test]
    fn test_read_error_propagates() {
        struct Failing;
        impl std::io::Read for Failing {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("device gone"))
            }
        }

        let mut source = Source::new(std::io::BufReader::new(Failing));
        let err = source.run().unwrap_err();
        assert!(err.to_string().contains("device gone"));
    }
}
