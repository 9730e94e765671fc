//! Parse configuration
//!
//! Every knob is an explicit input to the parser; nothing is read from
//! ambient global state.

use serde::{Deserialize, Serialize};

use crate::coerce::{IlwdPolicy, Quoting};

/// Delimiter and escaping rules of a table's data stream.
///
/// LIGO_LW writers emit rows as `a,b,c,` followed by a newline; the
/// `trailing_delimiter` flag accepts that one extra empty field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamFormat {
    /// Used when a `Stream` element has no `Delimiter` attribute
    pub delimiter: char,
    pub row_terminator: char,
    pub quote: char,
    pub escape: char,
    pub trailing_delimiter: bool,
}

impl Default for StreamFormat {
    fn default() -> Self {
        Self {
            delimiter: ',',
            row_terminator: '\n',
            quote: '"',
            escape: '\\',
            trailing_delimiter: true,
        }
    }
}

impl StreamFormat {
    /// Same format with a different delimiter.
    pub fn with_delimiter(&self, delimiter: char) -> Self {
        Self {
            delimiter,
            ..self.clone()
        }
    }

    pub fn quoting(&self) -> Quoting {
        Quoting {
            quote: self.quote,
            escape: self.escape,
        }
    }

    /// The four special characters must be distinct and the delimiter may
    /// not be whitespace, since unquoted fields are trimmed.
    pub fn validate(&self) -> Result<(), String> {
        let specials = [
            ("delimiter", self.delimiter),
            ("row_terminator", self.row_terminator),
            ("quote", self.quote),
            ("escape", self.escape),
        ];

        for (i, (a_name, a)) in specials.iter().enumerate() {
            for (b_name, b) in &specials[i + 1..] {
                if a == b {
                    return Err(format!("{} and {} are both {:?}", a_name, b_name, a));
                }
            }
        }

        if self.delimiter.is_whitespace() {
            return Err(format!("delimiter {:?} must not be whitespace", self.delimiter));
        }

        Ok(())
    }
}

/// What to do with a row that fails arity, type or null checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowErrorMode {
    /// Abort the document on the first bad row
    #[default]
    FailFast,
    /// Skip bad rows and report them on the document
    Permissive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub format: StreamFormat,
    pub row_errors: RowErrorMode,
    pub ilwd_policy: IlwdPolicy,
    /// Report `ilwd:char` columns and params as `int_8s`
    pub strip_ilwdchar: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            format: StreamFormat::default(),
            row_errors: RowErrorMode::FailFast,
            ilwd_policy: IlwdPolicy::Strict,
            strip_ilwdchar: true,
        }
    }
}

impl ParseOptions {
    pub fn permissive() -> Self {
        Self {
            row_errors: RowErrorMode::Permissive,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.format.validate()
    }
}
