//! Minimal comma-separated table codec for the suggestions and votes
//! artifacts. Fields are quoted only when they contain a comma, a quote, or a
//! line break, so the files stay hand-editable.

use thiserror::Error;

/// Error produced when a table line cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// A quoted field ran to the end of the line without a closing quote.
    #[error("unterminated quoted field")]
    UnterminatedQuote,
    /// A closing quote was followed by something other than a separator.
    #[error("unexpected character after closing quote")]
    TrailingAfterQuote,
}

/// Encode one row, quoting fields that would break the line structure.
pub fn encode_row<S: AsRef<str>>(fields: &[S]) -> String {
    let mut out = String::new();
    for (index, field) in fields.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        let field = field.as_ref();
        if field.contains([',', '"', '\n', '\r']) {
            out.push('"');
            for c in field.chars() {
                if c == '"' {
                    out.push('"');
                }
                out.push(c);
            }
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out
}

/// Decode one row previously produced by [`encode_row`].
pub fn decode_row(line: &str) -> Result<Vec<String>, TableError> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();

    loop {
        match chars.next() {
            None => {
                fields.push(current);
                return Ok(fields);
            }
            Some(',') => {
                fields.push(std::mem::take(&mut current));
            }
            Some('"') if current.is_empty() => {
                // Quoted field: consume until the closing quote, honouring
                // doubled quotes as escapes.
                loop {
                    match chars.next() {
                        None => return Err(TableError::UnterminatedQuote),
                        Some('"') => match chars.peek() {
                            Some('"') => {
                                chars.next();
                                current.push('"');
                            }
                            Some(',') | None => break,
                            Some(_) => return Err(TableError::TrailingAfterQuote),
                        },
                        Some(c) => current.push(c),
                    }
                }
            }
            Some(c) => current.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_rows_pass_through() {
        let row = encode_row(&["Celeste", "42", "1700000000"]);
        assert_eq!(row, "Celeste,42,1700000000");
        assert_eq!(
            decode_row(&row).unwrap(),
            vec!["Celeste", "42", "1700000000"]
        );
    }

    #[test]
    fn fields_with_commas_and_quotes_round_trip() {
        let fields = ["Worms, Armageddon", "say \"hi\"", ""];
        let row = encode_row(&fields);
        assert_eq!(decode_row(&row).unwrap(), fields.to_vec());
    }

    #[test]
    fn empty_line_is_one_empty_field() {
        assert_eq!(decode_row("").unwrap(), vec![""]);
    }

    #[test]
    fn unterminated_quote_is_rejected() {
        assert_eq!(
            decode_row("\"oops"),
            Err(TableError::UnterminatedQuote)
        );
    }

    #[test]
    fn garbage_after_closing_quote_is_rejected() {
        assert_eq!(
            decode_row("\"a\"b,c"),
            Err(TableError::TrailingAfterQuote)
        );
    }
}
