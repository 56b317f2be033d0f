// ABOUTME: Conversion from MySQL wire values into exporter scalar values
// ABOUTME: Uses column metadata to tell decimals and binary data apart from text

use crate::dump::value::SqlValue;
use mysql_async::consts::ColumnType;
use mysql_async::{Column, Value};
use std::fmt::Write;

/// MySQL's `binary` character set id
const BINARY_CHARSET: u16 = 63;

/// Convert one value read through the binary protocol
pub fn from_mysql(value: Value, column: Option<&Column>) -> SqlValue {
    match value {
        Value::NULL => SqlValue::Null,
        Value::Int(i) => SqlValue::Integer(i),
        Value::UInt(u) => match i64::try_from(u) {
            Ok(i) => SqlValue::Integer(i),
            Err(_) => SqlValue::Other(u.to_string()),
        },
        // Reparse the f32's shortest form, widening directly adds noise digits
        Value::Float(f) => SqlValue::Float(format!("{:?}", f).parse().unwrap_or(f64::from(f))),
        Value::Double(d) => SqlValue::Float(d),
        Value::Bytes(bytes) => from_bytes(bytes, column),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let mut out = format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            );
            if micros > 0 {
                let _ = write!(out, ".{:06}", micros);
            }
            SqlValue::Other(out)
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let total_hours = days * 24 + u32::from(hours);
            let mut out = format!(
                "{}{:02}:{:02}:{:02}",
                if negative { "-" } else { "" },
                total_hours,
                minutes,
                seconds
            );
            if micros > 0 {
                let _ = write!(out, ".{:06}", micros);
            }
            SqlValue::Other(out)
        }
    }
}

fn from_bytes(bytes: Vec<u8>, column: Option<&Column>) -> SqlValue {
    if let Some(column) = column {
        match column.column_type() {
            ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
                return SqlValue::Other(String::from_utf8_lossy(&bytes).into_owned());
            }
            ColumnType::MYSQL_TYPE_BIT => return SqlValue::Other(hex_literal(&bytes)),
            _ => {}
        }
        if column.character_set() == BINARY_CHARSET {
            return SqlValue::Other(hex_literal(&bytes));
        }
    }
    match String::from_utf8(bytes) {
        Ok(text) => SqlValue::Text(text),
        Err(e) => SqlValue::Other(hex_literal(e.as_bytes())),
    }
}

/// `X'...'` literal, which MySQL reads back as the same bytes
pub fn hex_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2 + 3);
    out.push_str("X'");
    for byte in bytes {
        let _ = write!(out, "{:02X}", byte);
    }
    out.push('\'');
    out
}
