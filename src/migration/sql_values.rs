// src/migration/sql_values.rs
//
// Reader for the literal syntax found in legacy `INSERT ... VALUES` dumps:
//
//   statement := "INSERT INTO" ident [ "(" ident { "," ident } ")" ] "VALUES" tuple { "," tuple } [ ";" ]
//   tuple     := "(" value { "," value } ")"
//   value     := string | "NULL" | number | bareword
//   string    := "'" { char | "''" | "\" char } "'"

use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("unterminated string literal starting at value {0}")]
    UnterminatedString(usize),
    #[error("expected ',' between values, found {0:?}")]
    MissingSeparator(char),
    #[error("unbalanced parentheses in VALUES list")]
    Unbalanced,
    #[error("not an INSERT statement: {0}")]
    NotInsert(String),
}

fn skip_ws(chars: &mut Peekable<Chars>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

fn quoted(chars: &mut Peekable<Chars>, index: usize) -> Result<String, TokenizeError> {
    let mut out = String::new();
    loop {
        match chars.next() {
            None => return Err(TokenizeError::UnterminatedString(index)),
            Some('\'') => {
                // '' is an escaped quote
                if chars.next_if_eq(&'\'').is_some() {
                    out.push('\'');
                } else {
                    return Ok(out);
                }
            }
            Some('\\') => match chars.next() {
                None => return Err(TokenizeError::UnterminatedString(index)),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some(other) => out.push(other),
            },
            Some(c) => out.push(c),
        }
    }
}

fn bare(chars: &mut Peekable<Chars>) -> String {
    let mut out = String::new();
    while let Some(c) = chars.next_if(|c| *c != ',' && *c != ')') {
        out.push(c);
    }
    out.trim_end().to_string()
}

/// Splits the inside of one VALUES tuple into its literals. `NULL` (any case)
/// becomes `None`; strings are unescaped; numbers and other bare words are
/// returned as written. JSON inside strings is left as text.
pub fn tokenize_values(input: &str) -> Result<Vec<Option<String>>, TokenizeError> {
    let mut chars = input.chars().peekable();
    let mut values = Vec::new();

    skip_ws(&mut chars);
    if chars.peek().is_none() {
        return Ok(values);
    }

    loop {
        skip_ws(&mut chars);
        let value = match chars.peek() {
            Some('\'') => {
                chars.next();
                Some(quoted(&mut chars, values.len())?)
            }
            Some(',') | None => Some(String::new()),
            Some(_) => {
                let word = bare(&mut chars);
                if word.eq_ignore_ascii_case("null") {
                    None
                } else {
                    Some(word)
                }
            }
        };
        values.push(value);

        skip_ws(&mut chars);
        match chars.next() {
            None => return Ok(values),
            Some(',') => continue,
            Some(c) => return Err(TokenizeError::MissingSeparator(c)),
        }
    }
}

/// Returns the inside of every top-level `( ... )` group, ignoring parentheses
/// that appear inside string literals.
pub fn split_tuples(values_clause: &str) -> Result<Vec<&str>, TokenizeError> {
    let mut tuples = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let bytes = values_clause.as_bytes();

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'\'' {
                if bytes.get(i + 1) == Some(&b'\'') {
                    i += 1;
                } else {
                    in_string = false;
                }
            }
        } else {
            match b {
                b'\'' => in_string = true,
                b'(' => {
                    if depth == 0 {
                        start = i + 1;
                    }
                    depth += 1;
                }
                b')' => {
                    depth = depth.checked_sub(1).ok_or(TokenizeError::Unbalanced)?;
                    if depth == 0 {
                        tuples.push(&values_clause[start..i]);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }

    if in_string {
        return Err(TokenizeError::UnterminatedString(tuples.len()));
    }
    if depth != 0 {
        return Err(TokenizeError::Unbalanced);
    }
    Ok(tuples)
}

/// One parsed `INSERT INTO table (cols) VALUES ...` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl InsertStatement {
    /// Value of `column` in `row`, treating NULL and missing alike.
    pub fn get<'a>(&self, row: &'a [Option<String>], column: &str) -> Option<&'a str> {
        let idx = self.columns.iter().position(|c| c.eq_ignore_ascii_case(column))?;
        row.get(idx)?.as_deref()
    }
}

fn strip_ident(s: &str) -> String {
    s.trim().trim_matches(|c| c == '`' || c == '"').to_string()
}

pub fn parse_insert(statement: &str) -> Result<InsertStatement, TokenizeError> {
    let trimmed = statement.trim().trim_end_matches(';');
    let upper = trimmed.to_ascii_uppercase();
    let not_insert = || TokenizeError::NotInsert(trimmed.chars().take(40).collect());

    if !upper.starts_with("INSERT INTO") {
        return Err(not_insert());
    }
    let values_at = upper.find("VALUES").ok_or_else(not_insert)?;
    let head = trimmed["INSERT INTO".len()..values_at].trim();

    let (table, columns) = match head.find('(') {
        Some(open) => {
            let close = head.rfind(')').ok_or(TokenizeError::Unbalanced)?;
            let cols = head[open + 1..close].split(',').map(strip_ident).collect();
            (strip_ident(&head[..open]), cols)
        }
        None => (strip_ident(head), Vec::new()),
    };

    let rows = split_tuples(&trimmed[values_at + "VALUES".len()..])?
        .into_iter()
        .map(tokenize_values)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(InsertStatement { table, columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_quotes_null_and_embedded_json() {
        let got = tokenize_values(r#"'a', 'it''s', NULL, '{"x":1}'"#).unwrap();
        assert_eq!(
            got,
            vec![
                Some("a".to_string()),
                Some("it's".to_string()),
                None,
                Some(r#"{"x":1}"#.to_string()),
            ]
        );
    }

    #[test]
    fn backslash_escapes_and_numbers() {
        let got = tokenize_values(r"'O\'Brien', 42 , -3.5, 'line\nbreak', null").unwrap();
        assert_eq!(
            got,
            vec![
                Some("O'Brien".to_string()),
                Some("42".to_string()),
                Some("-3.5".to_string()),
                Some("line\nbreak".to_string()),
                None,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert_eq!(
            tokenize_values("'ok', 'broken"),
            Err(TokenizeError::UnterminatedString(1))
        );
    }

    #[test]
    fn empty_input_has_no_values() {
        assert!(tokenize_values("   ").unwrap().is_empty());
    }

    #[test]
    fn split_tuples_ignores_parens_in_strings() {
        let tuples = split_tuples("('a (x)', 1), ('b)', NULL);").unwrap();
        assert_eq!(tuples, vec!["'a (x)', 1", "'b)', NULL"]);
    }

    #[test]
    fn parse_insert_reads_table_columns_and_rows() {
        let stmt = parse_insert(
            "INSERT INTO `students` (`id`, `email`, `data`) VALUES ('s1', 'a@x.org', '{\"country\":\"Japan\"}'), ('s2', NULL, '');",
        )
        .unwrap();
        assert_eq!(stmt.table, "students");
        assert_eq!(stmt.columns, vec!["id", "email", "data"]);
        assert_eq!(stmt.rows.len(), 2);
        assert_eq!(stmt.get(&stmt.rows[1], "email"), None);
        assert_eq!(stmt.get(&stmt.rows[0], "ID"), Some("s1"));
    }

    #[test]
    fn parse_insert_rejects_other_statements() {
        assert!(matches!(
            parse_insert("DELETE FROM students"),
            Err(TokenizeError::NotInsert(_))
        ));
    }
}
