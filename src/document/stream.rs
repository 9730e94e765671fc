//! Data stream tokenizer
//!
//! Splits a `Stream` element's text into rows and raw fields. Quotes and
//! escapes are honoured for splitting only; the raw field text (quotes
//! included) is handed to the coercion layer unchanged.
//!
//! A quote opens a quoted field only as the first non-blank character of
//! the field. Elsewhere it is ordinary text, which the coercion layer then
//! rejects.

use super::options::StreamFormat;

/// Raw fields of one stream row, borrowed from the stream text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow<'a> {
    pub fields: Vec<&'a str>,
    /// Last non-blank row of the stream
    pub final_row: bool,
}

impl<'a> RawRow<'a> {
    /// Drops the trailing row delimiter of the LIGO_LW `a,b,c,` layout.
    ///
    /// Every row but the last is closed by a delimiter, so exactly one blank
    /// trailing field is dropped. The last row may omit the delimiter; its
    /// blank trailing field is dropped only when the row has one field too
    /// many.
    pub fn normalize(mut self, columns: usize, format: &StreamFormat) -> Self {
        if !format.trailing_delimiter {
            return self;
        }

        let blank_last =
            self.fields.len() > 1 && self.fields.last().is_some_and(|f| f.trim().is_empty());
        let closed = if self.final_row {
            blank_last && self.fields.len() == columns + 1
        } else {
            blank_last
        };
        if closed {
            self.fields.pop();
        }
        self
    }
}

/// Splits `text` into non-blank rows.
pub fn split_rows<'a>(text: &'a str, format: &StreamFormat) -> Vec<RawRow<'a>> {
    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut field_start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    // a non-blank character has been seen in the current field
    let mut started = false;

    for (pos, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == format.escape {
            escaped = true;
            started = true;
        } else if in_quotes {
            if c == format.quote {
                in_quotes = false;
            }
        } else if c == format.quote && !started {
            in_quotes = true;
            started = true;
        } else if c == format.delimiter {
            fields.push(&text[field_start..pos]);
            field_start = pos + c.len_utf8();
            started = false;
        } else if c == format.row_terminator {
            fields.push(&text[field_start..pos]);
            field_start = pos + c.len_utf8();
            started = false;
            finish_row(&mut fields, &mut rows);
        } else if !c.is_whitespace() {
            started = true;
        }
    }

    fields.push(&text[field_start..]);
    finish_row(&mut fields, &mut rows);

    if let Some(last) = rows.last_mut() {
        last.final_row = true;
    }
    rows
}

/// Closes the current row; a row holding a single blank field is a blank line.
fn finish_row<'a>(fields: &mut Vec<&'a str>, rows: &mut Vec<RawRow<'a>>) {
    let taken = std::mem::take(fields);
    let blank = taken.len() == 1 && taken[0].trim().is_empty();
    if !blank {
        rows.push(RawRow {
            fields: taken,
            final_row: false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(rows: &[RawRow<'_>]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.fields.iter().map(|f| f.trim().to_string()).collect())
            .collect()
    }

    #[test]
    fn test_ligolw_layout() {
        let text = "\n\t\t\t1,\"H1\",2.5,\n\t\t\t2,\"L1\",3.5\n\t\t";
        let rows = split_rows(text, &StreamFormat::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(
            fields(&rows),
            vec![
                vec!["1", "\"H1\"", "2.5", ""],
                vec!["2", "\"L1\"", "3.5"],
            ]
        );

        let first = rows[0].clone().normalize(3, &StreamFormat::default());
        assert_eq!(first.fields.len(), 3);
    }

    #[test]
    fn test_quoted_delimiter_and_terminator() {
        let text = "1,\"a,b\"\n2,\"c\nd\"";
        let rows = split_rows(text, &StreamFormat::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields, vec!["1", "\"a,b\""]);
        assert_eq!(rows[1].fields, vec!["2", "\"c\nd\""]);
    }

    #[test]
    fn test_escaped_delimiter() {
        let rows = split_rows(r"1,a\,b,c", &StreamFormat::default());
        assert_eq!(rows[0].fields, vec!["1", r"a\,b", "c"]);
    }

    #[test]
    fn test_custom_delimiter_and_terminator() {
        let format = StreamFormat {
            delimiter: '|',
            row_terminator: ';',
            ..StreamFormat::default()
        };
        let rows = split_rows("1|x;2|y;", &format);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].fields, vec!["2", "y"]);
    }

    #[test]
    fn test_blank_rows_skipped_but_empty_fields_kept() {
        let rows = split_rows("\n   \n,\n", &StreamFormat::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields, vec!["", ""]);
    }

    #[test]
    fn test_only_last_row_is_final() {
        let rows = split_rows("1,2,\n3,4\n\n", &StreamFormat::default());
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].final_row);
        assert!(rows[1].final_row);
    }

    #[test]
    fn test_quote_opens_only_at_field_start() {
        let rows = split_rows("ab\"c,1\nd,2\ne\"f,3", &StreamFormat::default());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].fields, vec!["ab\"c", "1"]);
        assert_eq!(rows[2].fields, vec!["e\"f", "3"]);

        let rows = split_rows("  \"a,b\",1", &StreamFormat::default());
        assert_eq!(rows[0].fields, vec!["  \"a,b\"", "1"]);
    }

    #[test]
    fn test_interior_row_always_drops_its_delimiter() {
        let format = StreamFormat::default();
        let interior = RawRow {
            fields: vec!["4", "5", ""],
            final_row: false,
        };
        assert_eq!(interior.clone().normalize(3, &format).fields, vec!["4", "5"]);
        assert_eq!(interior.clone().normalize(2, &format).fields, vec!["4", "5"]);

        let last = RawRow {
            final_row: true,
            ..interior.clone()
        };
        assert_eq!(last.clone().normalize(3, &format).fields.len(), 3);
        assert_eq!(last.normalize(2, &format).fields.len(), 2);

        let strict = StreamFormat {
            trailing_delimiter: false,
            ..StreamFormat::default()
        };
        assert_eq!(interior.normalize(2, &strict).fields.len(), 3);
    }

    #[test]
    fn test_single_column_null_row_kept() {
        let format = StreamFormat::default();
        let rows = split_rows(",\n7,", &format);
        let first = rows[0].clone().normalize(1, &format);
        assert_eq!(first.fields, vec![""]);
        let last = rows[1].clone().normalize(1, &format);
        assert_eq!(last.fields, vec!["7"]);
    }
}
