//! printf-style format specs
//!
//! A spec is literal text mixed with `%[flags][width][.precision]conv`
//! conversions. One conversion renders one cell; a spec with a single
//! conversion is repeated across the cells of a row.

use crate::error::{ConvertError, Result};
use crate::sequence::{quote, Cell};
use once_cell::sync::Lazy;
use regex::Regex;

static CONVERSION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"%(?P<flags>[-+ 0#]*)(?P<width>\d+)?(?:\.(?P<precision>\d*))?[hlL]?(?P<conv>.?)")
        .unwrap()
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Flags {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alternate: bool,
}

impl Flags {
    fn parse(text: &str) -> Self {
        let mut flags = Flags::default();
        for c in text.chars() {
            match c {
                '-' => flags.left = true,
                '+' => flags.plus = true,
                ' ' => flags.space = true,
                '0' => flags.zero = true,
                '#' => flags.alternate = true,
                _ => {}
            }
        }
        flags
    }
}

/// A single `%...` conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    flags: Flags,
    width: Option<usize>,
    precision: Option<usize>,
    conv: char,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Convert(Conversion),
}

/// A parsed format spec such as `%.8f` or `%s ms`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    source: String,
    pieces: Vec<Piece>,
}

impl FormatSpec {
    pub fn parse(source: &str) -> Result<Self> {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut last = 0;

        for caps in CONVERSION_REGEX.captures_iter(source) {
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            literal.push_str(&source[last..whole.start]);
            last = whole.end;

            let conv = caps.name("conv").map_or("", |m| m.as_str());
            let conv = match conv.chars().next() {
                Some(c) => c,
                None => {
                    return Err(ConvertError::format(format!(
                        "incomplete conversion at end of '{}'",
                        source
                    )))
                }
            };

            if conv == '%' {
                literal.push('%');
                continue;
            }
            if !"diufFeEgGsrxXoc".contains(conv) {
                return Err(ConvertError::format(format!(
                    "unsupported conversion '%{}' in '{}'",
                    conv, source
                )));
            }

            if !literal.is_empty() {
                pieces.push(Piece::Literal(std::mem::take(&mut literal)));
            }
            pieces.push(Piece::Convert(Conversion {
                flags: Flags::parse(caps.name("flags").map_or("", |m| m.as_str())),
                width: parse_number(caps.name("width").map(|m| m.as_str()), source)?,
                precision: caps
                    .name("precision")
                    .map(|m| parse_number(Some(m.as_str()), source).map(|p| p.unwrap_or(0)))
                    .transpose()?,
                conv,
            }));
        }

        literal.push_str(&source[last..]);
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }

        let spec = FormatSpec {
            source: source.to_string(),
            pieces,
        };
        if spec.conversions() == 0 {
            return Err(ConvertError::format(format!(
                "'{}' contains no conversion",
                source
            )));
        }
        Ok(spec)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Number of `%` conversions, not counting `%%`
    pub fn conversions(&self) -> usize {
        self.pieces
            .iter()
            .filter(|p| matches!(p, Piece::Convert(_)))
            .count()
    }

    /// Render one output line.
    ///
    /// With a single conversion the whole spec is applied to each cell and
    /// the results are joined by `delimiter`. Otherwise the spec must have
    /// exactly one conversion per cell.
    pub fn render_row(&self, row: &[Cell], delimiter: &str) -> Result<String> {
        let count = self.conversions();
        if count == 1 {
            let parts = row
                .iter()
                .map(|cell| self.render(std::slice::from_ref(cell)))
                .collect::<Result<Vec<_>>>()?;
            return Ok(parts.join(delimiter));
        }

        if count != row.len() {
            return Err(ConvertError::format(format!(
                "'{}' has {} conversions but the row has {} cells",
                self.source,
                count,
                row.len()
            )));
        }
        self.render(row)
    }

    fn render(&self, cells: &[Cell]) -> Result<String> {
        let mut out = String::new();
        let mut cells = cells.iter();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Convert(conversion) => {
                    // render_row guarantees one cell per conversion
                    if let Some(cell) = cells.next() {
                        out.push_str(&conversion.apply(cell)?);
                    }
                }
            }
        }
        Ok(out)
    }
}

fn parse_number(text: Option<&str>, source: &str) -> Result<Option<usize>> {
    match text {
        None | Some("") => Ok(None),
        Some(digits) => digits.parse().map(Some).map_err(|_| {
            ConvertError::format(format!("field width out of range in '{}'", source))
        }),
    }
}

impl Conversion {
    pub fn apply(&self, cell: &Cell) -> Result<String> {
        match self.conv {
            'd' | 'i' | 'u' => {
                let (negative, digits) = self.decimal_digits(cell)?;
                Ok(self.pad_numeric(negative, "", &self.min_digits(digits)))
            }
            'x' | 'X' | 'o' => {
                let value = self.integer(cell)?;
                let (digits, prefix) = match self.conv {
                    'x' => (format!("{:x}", value.unsigned_abs()), "0x"),
                    'X' => (format!("{:X}", value.unsigned_abs()), "0X"),
                    _ => (format!("{:o}", value.unsigned_abs()), "0o"),
                };
                let prefix = if self.flags.alternate { prefix } else { "" };
                Ok(self.pad_numeric(value < 0, prefix, &self.min_digits(digits)))
            }
            'f' | 'F' | 'e' | 'E' | 'g' | 'G' => {
                let value = self.real(cell)?;
                let negative = value.is_sign_negative() && !value.is_nan();
                let body = self.float_body(value.abs());
                if value.is_finite() {
                    Ok(self.pad_numeric(negative, "", &body))
                } else {
                    let sign = self.sign(negative);
                    Ok(self.pad_text(&format!("{}{}", sign, body)))
                }
            }
            's' | 'r' => {
                let text = match (self.conv, cell) {
                    ('r', Cell::Str(s)) => quote(s),
                    _ => cell.plain_text(),
                };
                let text = match self.precision {
                    Some(p) => text.chars().take(p).collect(),
                    None => text,
                };
                Ok(self.pad_text(&text))
            }
            'c' => {
                let c = match cell {
                    Cell::Int(i) => u32::try_from(*i).ok().and_then(char::from_u32),
                    Cell::Str(s) if s.chars().count() == 1 => s.chars().next(),
                    _ => None,
                };
                match c {
                    Some(c) => Ok(self.pad_text(&c.to_string())),
                    None => Err(self.mismatch("an integer code point or a single character", cell)),
                }
            }
            other => Err(ConvertError::format(format!("unsupported conversion '%{}'", other))),
        }
    }

    fn integer(&self, cell: &Cell) -> Result<i128> {
        match cell {
            Cell::Int(i) => Ok(*i),
            Cell::Bool(b) => Ok(*b as i128),
            _ => Err(self.mismatch("an integer", cell)),
        }
    }

    /// Sign and decimal digits of a cell truncated toward zero.
    /// Floats of any magnitude keep their exact integer digits.
    fn decimal_digits(&self, cell: &Cell) -> Result<(bool, String)> {
        match cell {
            Cell::Float(f) if f.is_finite() => {
                let whole = f.trunc();
                Ok((whole < 0.0, format!("{:.0}", whole.abs())))
            }
            Cell::Float(f) => Err(ConvertError::format(format!(
                "cannot convert float {} to integer",
                float_name(*f)
            ))),
            other => {
                let value = self.integer(other)?;
                Ok((value < 0, value.unsigned_abs().to_string()))
            }
        }
    }

    fn real(&self, cell: &Cell) -> Result<f64> {
        match cell {
            Cell::Float(f) => Ok(*f),
            Cell::Int(i) => Ok(*i as f64),
            Cell::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            _ => Err(self.mismatch("a real number", cell)),
        }
    }

    fn mismatch(&self, expected: &str, cell: &Cell) -> ConvertError {
        ConvertError::format(format!(
            "%{} requires {}, not {} '{}'",
            self.conv,
            expected,
            cell.type_name(),
            cell.plain_text()
        ))
    }

    fn min_digits(&self, digits: String) -> String {
        match self.precision {
            Some(p) if p > digits.len() => format!("{}{}", "0".repeat(p - digits.len()), digits),
            _ => digits,
        }
    }

    fn sign(&self, negative: bool) -> &'static str {
        if negative {
            "-"
        } else if self.flags.plus {
            "+"
        } else if self.flags.space {
            " "
        } else {
            ""
        }
    }

    /// Text of a non-negative float, without sign or padding
    fn float_body(&self, value: f64) -> String {
        let upper = self.conv.is_ascii_uppercase();
        if !value.is_finite() {
            let text = if value.is_nan() { "nan" } else { "inf" };
            return if upper { text.to_uppercase() } else { text.to_string() };
        }

        let precision = self.precision.unwrap_or(6);
        let alternate = self.flags.alternate;
        let body = match self.conv {
            'f' | 'F' => {
                let mut text = format!("{:.*}", precision, value);
                if alternate && precision == 0 {
                    text.push('.');
                }
                text
            }
            'e' | 'E' => exponential(value, precision, alternate),
            _ => general(value, precision, alternate),
        };
        if upper {
            body.to_uppercase()
        } else {
            body
        }
    }

    fn pad_numeric(&self, negative: bool, prefix: &str, digits: &str) -> String {
        let sign = self.sign(negative);
        let len = sign.len() + prefix.len() + digits.len();
        let fill = self.width.map_or(0, |w| w.saturating_sub(len));

        if self.flags.left {
            format!("{}{}{}{}", sign, prefix, digits, " ".repeat(fill))
        } else if self.flags.zero {
            format!("{}{}{}{}", sign, prefix, "0".repeat(fill), digits)
        } else {
            format!("{}{}{}{}", " ".repeat(fill), sign, prefix, digits)
        }
    }

    fn pad_text(&self, text: &str) -> String {
        let fill = self
            .width
            .map_or(0, |w| w.saturating_sub(text.chars().count()));
        if self.flags.left {
            format!("{}{}", text, " ".repeat(fill))
        } else {
            format!("{}{}", " ".repeat(fill), text)
        }
    }
}

/// `d.ddde+XX` with at least two exponent digits
fn exponential(value: f64, precision: usize, alternate: bool) -> String {
    let text = format!("{:.*e}", precision, value);
    let (mantissa, exp) = split_exponent(&text);
    let mantissa = if alternate && precision == 0 {
        format!("{}.", mantissa)
    } else {
        mantissa.to_string()
    };
    join_exponent(&mantissa, exp)
}

/// `%g`: positional or exponential depending on the decimal exponent,
/// trailing zeros removed unless `#` is given
fn general(value: f64, precision: usize, alternate: bool) -> String {
    let precision = precision.max(1);
    let exp = if value == 0.0 {
        0
    } else {
        split_exponent(&format!("{:.*e}", precision - 1, value)).1
    };

    if exp >= -4 && exp < precision as i32 {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        let text = format!("{:.*}", decimals, value);
        if alternate {
            if decimals == 0 {
                format!("{}.", text)
            } else {
                text
            }
        } else {
            strip_fraction(&text).to_string()
        }
    } else {
        let text = format!("{:.*e}", precision - 1, value);
        let (mantissa, exp) = split_exponent(&text);
        let mantissa = if alternate {
            if precision == 1 {
                format!("{}.", mantissa)
            } else {
                mantissa.to_string()
            }
        } else {
            strip_fraction(mantissa).to_string()
        };
        join_exponent(&mantissa, exp)
    }
}

fn split_exponent(text: &str) -> (&str, i32) {
    match text.split_once('e') {
        Some((mantissa, exp)) => (mantissa, exp.parse().unwrap_or(0)),
        None => (text, 0),
    }
}

fn join_exponent(mantissa: &str, exp: i32) -> String {
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{}e{}{:02}", mantissa, sign, exp.abs())
}

fn strip_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

fn float_name(value: f64) -> &'static str {
    if value.is_nan() {
        "NaN"
    } else if value < 0.0 {
        "-infinity"
    } else {
        "infinity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(spec: &str, cell: Cell) -> String {
        FormatSpec::parse(spec)
            .unwrap()
            .render_row(&[cell], " ")
            .unwrap()
    }

    #[test]
    fn test_fixed_point() {
        assert_eq!(fmt("%.8f", Cell::Float(0.05)), "0.05000000");
        assert_eq!(fmt("%.2f", Cell::Float(2.5)), "2.50");
        assert_eq!(fmt("%f", Cell::Int(3)), "3.000000");
        assert_eq!(fmt("%.2f", Cell::Bool(true)), "1.00");
        assert_eq!(fmt("%.0f", Cell::Float(2.4)), "2");
        assert_eq!(fmt("%#.0f", Cell::Float(2.4)), "2.");
        assert_eq!(fmt("%.2f", Cell::Float(-0.001)), "-0.00");
    }

    #[test]
    fn test_width_and_flags() {
        assert_eq!(fmt("%8.3f", Cell::Float(3.14159)), "   3.142");
        assert_eq!(fmt("%-8.3f|", Cell::Float(3.14159)), "3.142   |");
        assert_eq!(fmt("%08.3f", Cell::Float(-3.14159)), "-003.142");
        assert_eq!(fmt("%+.1f", Cell::Float(2.0)), "+2.0");
        assert_eq!(fmt("% d", Cell::Int(7)), " 7");
        assert_eq!(fmt("%05d", Cell::Int(-42)), "-0042");
        assert_eq!(fmt("%.3d", Cell::Int(5)), "005");
    }

    #[test]
    fn test_exponential() {
        assert_eq!(fmt("%e", Cell::Float(1.5)), "1.500000e+00");
        assert_eq!(fmt("%.3E", Cell::Float(0.000123)), "1.230E-04");
        assert_eq!(fmt("%.2e", Cell::Float(12345.0)), "1.23e+04");
        assert_eq!(fmt("%e", Cell::Float(0.0)), "0.000000e+00");
    }

    #[test]
    fn test_general() {
        assert_eq!(fmt("%g", Cell::Float(2.5)), "2.5");
        assert_eq!(fmt("%g", Cell::Float(100000.0)), "100000");
        assert_eq!(fmt("%g", Cell::Float(1000000.0)), "1e+06");
        assert_eq!(fmt("%g", Cell::Float(0.0001)), "0.0001");
        assert_eq!(fmt("%g", Cell::Float(0.00001)), "1e-05");
        assert_eq!(fmt("%.3g", Cell::Float(3.14159)), "3.14");
        assert_eq!(fmt("%#g", Cell::Float(2.5)), "2.50000");
        assert_eq!(fmt("%G", Cell::Float(1.5e-10)), "1.5E-10");
        assert_eq!(fmt("%g", Cell::Float(0.0)), "0");
    }

    #[test]
    fn test_integers() {
        assert_eq!(fmt("%d", Cell::Float(2.9)), "2");
        assert_eq!(fmt("%d", Cell::Float(-2.9)), "-2");
        assert_eq!(fmt("%i", Cell::Bool(true)), "1");
        assert_eq!(fmt("%x", Cell::Int(255)), "ff");
        assert_eq!(fmt("%#X", Cell::Int(255)), "0XFF");
        assert_eq!(fmt("%#o", Cell::Int(8)), "0o10");
        assert_eq!(fmt("%c", Cell::Int(65)), "A");
        assert_eq!(fmt("%d", Cell::Float(-0.5)), "0");
    }

    #[test]
    fn test_huge_floats_keep_exact_digits() {
        let text = fmt("%d", Cell::Float(1e300));
        assert_eq!(text.len(), 301);
        assert!(text.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(text.parse::<f64>().unwrap(), 1e300);
        assert_ne!(text, i128::MAX.to_string());

        let text = fmt("%d", Cell::Float(-1e300));
        assert!(text.starts_with('-'));
        assert_eq!(text.len(), 302);

        assert_eq!(fmt("%d", Cell::Float(2f64.powi(127))), "170141183460469231731687303715884105728");
        assert_eq!(fmt("%d", Cell::Float(f64::MAX)).len(), 309);
    }

    #[test]
    fn test_objects_render_as_text_only() {
        let object = Cell::Object("{'a': 1}".to_string());
        assert_eq!(fmt("%s", object.clone()), "{'a': 1}");
        assert_eq!(fmt("%r", object.clone()), "{'a': 1}");

        let spec = FormatSpec::parse("%.2f").unwrap();
        let err = spec.render_row(&[object], " ").unwrap_err();
        assert!(err.to_string().contains("not dict"));
    }

    #[test]
    fn test_strings() {
        assert_eq!(fmt("%s", Cell::Str("ms".into())), "ms");
        assert_eq!(fmt("%s", Cell::Float(0.05)), "0.05");
        assert_eq!(fmt("%s", Cell::Bool(false)), "False");
        assert_eq!(fmt("%s", Cell::Null), "None");
        assert_eq!(fmt("%5s|", Cell::Str("ab".into())), "   ab|");
        assert_eq!(fmt("%.2s", Cell::Str("abcdef".into())), "ab");
        assert_eq!(fmt("%r", Cell::Str("it's".into())), "\"it's\"");
        assert_eq!(fmt("%r", Cell::Str("ab".into())), "'ab'");
    }

    #[test]
    fn test_literal_text() {
        assert_eq!(fmt("t=%.1f s", Cell::Float(2.5)), "t=2.5 s");
        assert_eq!(fmt("%d%%", Cell::Int(50)), "50%");
    }

    #[test]
    fn test_type_mismatch() {
        let spec = FormatSpec::parse("%.8f").unwrap();
        let err = spec
            .render_row(&[Cell::Str("abc".into())], " ")
            .unwrap_err();
        assert!(matches!(err, ConvertError::Format(_)));
        assert!(err.to_string().contains("not str 'abc'"));

        let spec = FormatSpec::parse("%d").unwrap();
        assert!(spec.render_row(&[Cell::Null], " ").is_err());
        let spec = FormatSpec::parse("%x").unwrap();
        assert!(spec.render_row(&[Cell::Float(1.5)], " ").is_err());
    }

    #[test]
    fn test_invalid_specs() {
        assert!(FormatSpec::parse("plain").is_err());
        assert!(FormatSpec::parse("%%").is_err());
        assert!(FormatSpec::parse("%.2q").is_err());
        assert!(FormatSpec::parse("%.2").is_err());
    }

    #[test]
    fn test_rows() {
        let row = [Cell::Float(1.0), Cell::Float(2.5)];

        let single = FormatSpec::parse("%.1f").unwrap();
        assert_eq!(single.render_row(&row, " ").unwrap(), "1.0 2.5");
        assert_eq!(single.render_row(&row, ",").unwrap(), "1.0,2.5");

        let paired = FormatSpec::parse("%.0f -> %.2f").unwrap();
        assert_eq!(paired.conversions(), 2);
        assert_eq!(paired.render_row(&row, " ").unwrap(), "1 -> 2.50");

        let triple = FormatSpec::parse("%f %f %f").unwrap();
        assert!(triple.render_row(&row, " ").is_err());
    }
}
