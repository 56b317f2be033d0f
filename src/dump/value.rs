// ABOUTME: Scalar value model and its textual literal form for dump files
// ABOUTME: Serializes values deterministically and parses them back for verification

use std::fmt;

/// A single scalar read from the database.
///
/// Values are converted to text by matching on the variant, so a new kind of
/// value has to be handled explicitly here instead of falling through a
/// runtime type lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Null,
    /// Anything without a dedicated literal form (decimals, dates, binary).
    /// Written verbatim, unquoted.
    Other(String),
}

impl SqlValue {
    pub fn text(value: impl Into<String>) -> Self {
        SqlValue::Text(value.into())
    }

    /// The plain string content, used when a catalog query returns names.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) | SqlValue::Other(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serialize(self))
    }
}

/// Double every single quote
pub fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

/// Convert a value into its literal text form
///
/// - Text → `'...'` with embedded quotes doubled
/// - Integer → decimal digits
/// - Float → shortest round-trippable decimal, always with a `.` or exponent
/// - Null → `null`
/// - Other → the stored text as is
///
/// # Examples
///
/// ```
/// # use mysql_dump::dump::value::{serialize, SqlValue};
/// assert_eq!(serialize(&SqlValue::text("O'Brien")), "'O''Brien'");
/// assert_eq!(serialize(&SqlValue::Integer(-7)), "-7");
/// assert_eq!(serialize(&SqlValue::Float(1.0)), "1.0");
/// assert_eq!(serialize(&SqlValue::Null), "null");
/// ```
pub fn serialize(value: &SqlValue) -> String {
    match value {
        SqlValue::Text(s) => format!("'{}'", escape(s)),
        SqlValue::Integer(i) => i.to_string(),
        // Debug keeps the fractional part for whole numbers ("1.0"),
        // Display would print "1" and it would read back as an integer
        SqlValue::Float(f) => format!("{:?}", f),
        SqlValue::Null => "null".to_string(),
        SqlValue::Other(s) => s.clone(),
    }
}

/// Serialize a full row as comma separated literals, without the newline
pub fn serialize_row(values: &[SqlValue]) -> String {
    values
        .iter()
        .map(serialize)
        .collect::<Vec<_>>()
        .join(",")
}

/// Split one data line into its literal tokens
///
/// Separators are never quoted in dump files, but a text literal may itself
/// contain commas, so the line is scanned with quote awareness: inside a
/// quoted literal a doubled `''` is an escaped quote and a `,` is data.
pub fn split_row(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let bytes = line.as_bytes();
    let mut start = 0;
    let mut in_quotes = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' if in_quotes => {
                if bytes.get(i + 1) == Some(&b'\'') {
                    i += 1;
                } else {
                    in_quotes = false;
                }
            }
            b'\'' => in_quotes = true,
            b',' if !in_quotes => {
                tokens.push(&line[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    tokens.push(&line[start..]);
    tokens
}

/// Parse a literal produced by [`serialize`] back into a value
///
/// Tokens that are neither quoted text, `null`, an integer nor a float are
/// returned as [`SqlValue::Other`].
pub fn parse_literal(token: &str) -> SqlValue {
    if token == "null" {
        return SqlValue::Null;
    }
    if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
        return SqlValue::Text(token[1..token.len() - 1].replace("''", "'"));
    }
    if let Ok(i) = token.parse::<i64>() {
        return SqlValue::Integer(i);
    }
    let looks_numeric = token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+');
    if looks_numeric && token.contains(['.', 'e', 'E']) {
        if let Ok(f) = token.parse::<f64>() {
            return SqlValue::Float(f);
        }
    }
    SqlValue::Other(token.to_string())
}
