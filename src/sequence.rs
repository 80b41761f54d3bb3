//! Normalization of an extracted JSON value into rows of typed cells
//!
//! A scalar becomes a one-element sequence and an array is used as-is. The
//! sequence is then laid out as a table: one row per scalar element, or one
//! row per inner array when every element is itself an array of scalars.
//! All cells of a table share one kind after promotion
//! (`bool < int < float`, strings win over numbers, `null` and objects
//! disable it). Objects are kept as opaque cells carrying their `repr` text,
//! so only text conversions can render them.

use crate::document::kind_name;
use crate::error::{ConvertError, Result};
use serde_json::Value;

/// One element of the output, typed for formatting
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
    /// A nested JSON object, held as its rendered text
    Object(String),
}

impl Cell {
    fn from_element(value: Value) -> Option<Cell> {
        match value {
            Value::Null => Some(Cell::Null),
            Value::Bool(b) => Some(Cell::Bool(b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Cell::Int(i as i128))
                } else if let Some(u) = n.as_u64() {
                    Some(Cell::Int(u as i128))
                } else {
                    n.as_f64().map(Cell::Float)
                }
            }
            Value::String(s) => Some(Cell::Str(s)),
            object @ Value::Object(_) => Some(Cell::Object(repr(&object))),
            Value::Array(_) => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Cell::Null => "null",
            Cell::Bool(_) => "bool",
            Cell::Int(_) => "int",
            Cell::Float(_) => "float",
            Cell::Str(_) => "str",
            Cell::Object(_) => "dict",
        }
    }

    /// The text `%s` renders for this cell
    pub fn plain_text(&self) -> String {
        match self {
            Cell::Null => "None".to_string(),
            Cell::Bool(true) => "True".to_string(),
            Cell::Bool(false) => "False".to_string(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => float_repr(*f),
            Cell::Str(s) | Cell::Object(s) => s.clone(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Cell::Bool(_) => 0,
            Cell::Int(_) => 1,
            Cell::Float(_) => 2,
            Cell::Str(_) => 3,
            Cell::Null | Cell::Object(_) => 4,
        }
    }

    fn promote(self, rank: u8) -> Cell {
        match (rank, self) {
            (1, Cell::Bool(b)) => Cell::Int(b as i128),
            (2, Cell::Bool(b)) => Cell::Float(if b { 1.0 } else { 0.0 }),
            (2, Cell::Int(i)) => Cell::Float(i as f64),
            (3, cell @ (Cell::Bool(_) | Cell::Int(_) | Cell::Float(_))) => {
                Cell::Str(cell.plain_text())
            }
            (_, cell) => cell,
        }
    }
}

/// Shortest round-trip text for a float, in the `repr` style:
/// positional for exponents in `-4..16`, scientific with a signed
/// two-digit exponent otherwise, and always a fractional part.
pub fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let sci = format!("{:e}", value);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    let sign = if mantissa.starts_with('-') { "-" } else { "" };
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();

    if (-4..16).contains(&exp) {
        let (int_part, frac_part) = if exp >= 0 {
            let split = exp as usize + 1;
            if digits.len() <= split {
                (format!("{}{}", digits, "0".repeat(split - digits.len())), "0".to_string())
            } else {
                (digits[..split].to_string(), digits[split..].to_string())
            }
        } else {
            let zeros = "0".repeat((-exp - 1) as usize);
            ("0".to_string(), format!("{}{}", zeros, digits))
        };
        format!("{}{}.{}", sign, int_part, frac_part)
    } else {
        let mantissa = if digits.len() == 1 {
            digits
        } else {
            format!("{}.{}", &digits[..1], &digits[1..])
        };
        let exp_sign = if exp < 0 { '-' } else { '+' };
        format!("{}{}e{}{:02}", sign, mantissa, exp_sign, exp.abs())
    }
}

/// `repr` text of a JSON value: single-quoted strings, `True`/`False`/`None`,
/// `{'k': v}` objects in document order and `[a, b]` lists.
pub fn repr(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => match Cell::from_element(Value::Number(n.clone())) {
            Some(cell) => cell.plain_text(),
            None => n.to_string(),
        },
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(repr).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", quote(k), repr(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}

/// Quote a string the way `repr` does: single quotes unless the text holds
/// a single quote and no double quote
pub fn quote(text: &str) -> String {
    let delimiter = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(text.len() + 2);
    out.push(delimiter);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}

/// Wrap a non-array value into a one-element sequence; arrays keep their order
pub fn normalize(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// Rows of promoted cells, ready to be formatted line by line
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn from_value(value: Value) -> Result<Self> {
        Self::from_sequence(normalize(value))
    }

    pub fn from_sequence(items: Vec<Value>) -> Result<Self> {
        let array_count = items.iter().filter(|v| v.is_array()).count();

        let rows = if array_count == 0 {
            items
                .into_iter()
                .enumerate()
                .map(|(index, item)| scalar_cell(item, index).map(|cell| vec![cell]))
                .collect::<Result<Vec<_>>>()?
        } else if array_count == items.len() {
            tabulate(items)?
        } else {
            return Err(ConvertError::format(
                "sequence mixes scalar and array elements",
            ));
        };

        Ok(Table { rows: promote(rows) })
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of cells per row (1 for a flat sequence, 0 when empty)
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }
}

fn scalar_cell(item: Value, index: usize) -> Result<Cell> {
    let kind = kind_name(&item);
    Cell::from_element(item).ok_or_else(|| {
        ConvertError::format(format!("cannot format {} element at index {}", kind, index))
    })
}

fn tabulate(items: Vec<Value>) -> Result<Vec<Vec<Cell>>> {
    let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(items.len());

    for (row_index, item) in items.into_iter().enumerate() {
        let inner = normalize(item);
        if let Some(first) = rows.first() {
            if first.len() != inner.len() {
                return Err(ConvertError::format(format!(
                    "ragged rows: row 0 has {} cells, row {} has {}",
                    first.len(),
                    row_index,
                    inner.len()
                )));
            }
        }

        let row = inner
            .into_iter()
            .enumerate()
            .map(|(col, value)| match value {
                Value::Array(_) => Err(ConvertError::format(format!(
                    "array nested deeper than two levels at row {}, column {}",
                    row_index, col
                ))),
                other => scalar_cell(other, col),
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }

    Ok(rows)
}

fn promote(rows: Vec<Vec<Cell>>) -> Vec<Vec<Cell>> {
    let rank = rows.iter().flatten().map(Cell::rank).max().unwrap_or(0);
    if rank == 4 {
        return rows;
    }
    rows.into_iter()
        .map(|row| row.into_iter().map(|cell| cell.promote(rank)).collect())
        .collect()
}
