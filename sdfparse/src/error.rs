//! Error types for SDF parsing and model queries.

use std::path::PathBuf;

/// A syntax error in SDF source text, with the position where
/// the grammar gave up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("SDF parsing failed at {line}:{column} - {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl<R: pest::RuleType> From<pest::error::Error<R>> for ParseError {
    fn from(e: pest::error::Error<R>) -> Self {
        use pest::error::LineColLocation;
        let (line, column) = match e.line_col {
            LineColLocation::Pos(pos) => pos,
            LineColLocation::Span(start, _) => start,
        };
        ParseError {
            line,
            column,
            message: e.variant.message().into_owned(),
        }
    }
}

/// Errors raised by the SDF model and its helpers.
#[derive(Debug, thiserror::Error)]
pub enum SdfError {
    /// The source text is not valid SDF.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A delay field, metric or header field name outside the fixed set.
    #[error("invalid {kind} name '{name}'")]
    InvalidName { kind: &'static str, name: String },

    /// An entry kind that the requested factory cannot build.
    #[error("unknown entry kind '{0}'")]
    UnknownEntryKind(String),

    /// An operation needs a header field the file does not carry.
    #[error("missing required header field: {0}")]
    MissingHeaderField(&'static str),

    /// A timescale that is not `1`, `10` or `100` of a known unit.
    #[error("invalid SDF timescale {0}")]
    InvalidTimescale(String),

    /// The source file could not be read.
    #[error("error reading SDF file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
