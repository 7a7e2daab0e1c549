//! Date, decimal and printf-style formatting mergers
//!
//! Date patterns may be written in the familiar `yyyy-MM-dd HH:mm` letter style or
//! directly as chrono `%` specifiers. Decimal patterns follow the `#,##0.00` style
//! and round half-even on the exact binary value; `%f` in format strings rounds
//! half-up.

use super::{required_param, MultiPropertyValueMerger, SinglePropertyValueMerger};
use crate::value::Value;
use crate::{Error, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt::Write;

// ============================================================================
// Dates
// ============================================================================

/// Formats dates as text, and parses them back
#[derive(Debug, Default)]
pub struct DateFormatMerger;

impl DateFormatMerger {
    fn pattern(params: &[String]) -> Result<(&str, String)> {
        let pattern = required_param(params, "date pattern")?;
        let converted = chrono_pattern(pattern)?;
        if StrftimeItems::new(&converted).any(|item| matches!(item, Item::Error)) {
            return Err(Error::configuration(format!(
                "invalid date pattern '{}'",
                pattern
            )));
        }
        Ok((pattern, converted))
    }
}

impl SinglePropertyValueMerger for DateFormatMerger {
    fn merge(&self, value: &Value, params: &[String]) -> Result<Value> {
        let (pattern, converted) = Self::pattern(params)?;
        let mut out = String::new();
        let written = match value {
            Value::Null => return Ok(Value::Null),
            Value::Date(date) => write!(out, "{}", date.format(&converted)),
            Value::Calendar(calendar) => write!(out, "{}", calendar.format(&converted)),
            other => return Err(Error::type_mismatch("date", other.type_label())),
        };
        written.map_err(|_| {
            Error::configuration(format!("date pattern '{}' cannot format {}", pattern, value))
        })?;
        Ok(Value::Text(out))
    }

    fn is_restore_supported(&self, params: &[String]) -> bool {
        Self::pattern(params).is_ok()
    }

    fn restore(&self, merged: &Value, params: &[String]) -> Result<Value> {
        let (pattern, converted) = Self::pattern(params)?;
        match merged {
            Value::Null => Ok(Value::Null),
            Value::Text(text) => parse_date(text, &converted)
                .map(Value::Date)
                .ok_or_else(|| {
                    Error::type_mismatch(format!("date matching '{}'", pattern), text.clone())
                }),
            other => Err(Error::type_mismatch("text", other.type_label())),
        }
    }
}

fn parse_date(text: &str, pattern: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(date) = DateTime::parse_from_str(text, pattern) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(text, pattern) {
        return Some(date.and_utc());
    }
    NaiveDate::parse_from_str(text, pattern)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
}

/// Translate a letter-style date pattern into chrono specifiers
fn chrono_pattern(pattern: &str) -> Result<String> {
    if pattern.contains('%') {
        return Ok(pattern.to_string());
    }
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            let mut j = i + 1;
            while j < chars.len() && chars[j] != '\'' {
                push_literal(&mut out, chars[j]);
                j += 1;
            }
            i = j + 1;
            continue;
        }
        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }
        let mut run = 1;
        while chars.get(i + run) == Some(&c) {
            run += 1;
        }
        let spec = match (c, run) {
            ('y' | 'u', 2) => "%y",
            ('y' | 'u' | 'Y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('D', _) => "%j",
            ('H' | 'k', 1) => "%-H",
            ('H' | 'k', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('S', _) => "%3f",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('a', _) => "%p",
            ('z', _) => "%Z",
            ('Z', _) => "%z",
            ('X', 1 | 2) => "%z",
            ('X', _) => "%:z",
            _ => {
                return Err(Error::configuration(format!(
                    "unsupported letter '{}' in date pattern '{}'",
                    c, pattern
                )))
            }
        };
        out.push_str(spec);
        i += run;
    }
    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

// ============================================================================
// Decimals
// ============================================================================

/// Formats numbers with a decimal pattern, and parses them back
#[derive(Debug, Default)]
pub struct DecimalFormatMerger;

impl SinglePropertyValueMerger for DecimalFormatMerger {
    fn merge(&self, value: &Value, params: &[String]) -> Result<Value> {
        let pattern = DecimalPattern::parse(required_param(params, "decimal pattern")?)?;
        let formatted = match value {
            Value::Null => return Ok(Value::Null),
            Value::Int(i) => pattern.format_int(*i),
            Value::Float(f) => pattern.format(*f),
            other => return Err(Error::type_mismatch("number", other.type_label())),
        };
        Ok(Value::Text(formatted))
    }

    fn is_restore_supported(&self, params: &[String]) -> bool {
        required_param(params, "decimal pattern")
            .and_then(DecimalPattern::parse)
            .is_ok()
    }

    fn restore(&self, merged: &Value, params: &[String]) -> Result<Value> {
        let pattern = DecimalPattern::parse(required_param(params, "decimal pattern")?)?;
        let text = match merged {
            Value::Null => return Ok(Value::Null),
            Value::Text(text) => text,
            other => return Err(Error::type_mismatch("text", other.type_label())),
        };
        if let Some(integer) = pattern.parse_integer(text) {
            return Ok(Value::Int(integer));
        }
        let number = pattern
            .parse_number(text)
            .ok_or_else(|| Error::type_mismatch("formatted number", text.clone()))?;
        if number.fract() == 0.0 && number.abs() < 9.0e15 {
            Ok(Value::Int(number as i64))
        } else {
            Ok(Value::Float(number))
        }
    }
}

/// Parsed positive subpattern of a decimal format
#[derive(Debug, Clone, PartialEq)]
struct DecimalPattern {
    prefix: String,
    suffix: String,
    min_int: usize,
    min_frac: usize,
    max_frac: usize,
    grouping: Option<usize>,
    multiplier: f64,
}

impl DecimalPattern {
    fn parse(pattern: &str) -> Result<Self> {
        let invalid = |why: &str| {
            Error::configuration(format!("invalid decimal pattern '{}': {}", pattern, why))
        };
        let positive = pattern.split(';').next().unwrap_or_default();

        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut number = String::new();
        let mut multiplier = 1.0;
        let mut phase = 0;
        let mut quoted = false;
        for c in positive.chars() {
            if c == '\'' {
                quoted = !quoted;
                continue;
            }
            if !quoted && phase < 2 && matches!(c, '#' | '0' | ',' | '.') {
                phase = 1;
                number.push(c);
                continue;
            }
            if !quoted {
                match c {
                    '%' => multiplier = 100.0,
                    '\u{2030}' => multiplier = 1000.0,
                    _ => {}
                }
            }
            if phase == 0 {
                prefix.push(c);
            } else {
                phase = 2;
                suffix.push(c);
            }
        }

        if !number.contains(['#', '0']) {
            return Err(invalid("no digit placeholders"));
        }
        let (int_part, frac_part) = number.split_once('.').unwrap_or((number.as_str(), ""));
        if frac_part.contains(['.', ',']) {
            return Err(invalid("misplaced separator"));
        }
        let grouping = int_part
            .rfind(',')
            .map(|pos| int_part.len() - pos - 1)
            .filter(|size| *size > 0);

        Ok(Self {
            prefix,
            suffix,
            min_int: int_part.matches('0').count(),
            min_frac: frac_part.matches('0').count(),
            max_frac: frac_part.len(),
            grouping,
            multiplier,
        })
    }

    fn format(&self, number: f64) -> String {
        let scaled = number * self.multiplier;
        if !scaled.is_finite() {
            return format!("{}{}{}", self.prefix, scaled, self.suffix);
        }
        let (int_digits, frac_digits) =
            round_decimal(scaled.abs(), self.max_frac, Rounding::HalfEven);
        self.render(scaled < 0.0, int_digits, frac_digits)
    }

    /// Integers are formatted from their own digits, so no precision is lost
    fn format_int(&self, number: i64) -> String {
        let scaled = i128::from(number) * self.multiplier as i128;
        self.render(scaled < 0, scaled.unsigned_abs().to_string(), "0".repeat(self.min_frac))
    }

    fn render(&self, negative: bool, int_digits: String, mut frac_digits: String) -> String {
        while frac_digits.len() > self.min_frac && frac_digits.ends_with('0') {
            frac_digits.pop();
        }
        let mut int_digits = int_digits.trim_start_matches('0').to_string();
        while int_digits.len() < self.min_int {
            int_digits.insert(0, '0');
        }
        let nonzero = int_digits.contains(|c: char| c != '0') || frac_digits.contains(|c: char| c != '0');
        if let Some(size) = self.grouping {
            int_digits = group_digits(&int_digits, size);
        }

        let mut out = String::new();
        if negative && nonzero {
            out.push('-');
        }
        out.push_str(&self.prefix);
        if int_digits.is_empty() && frac_digits.is_empty() {
            out.push('0');
        }
        out.push_str(&int_digits);
        if !frac_digits.is_empty() {
            out.push('.');
            out.push_str(&frac_digits);
        }
        out.push_str(&self.suffix);
        out
    }

    /// Exact parse of integral text when no percent or permille scaling applies
    fn parse_integer(&self, text: &str) -> Option<i64> {
        if self.multiplier != 1.0 {
            return None;
        }
        let text = text.trim();
        let (negative, text) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let text = text.strip_prefix(self.prefix.as_str()).unwrap_or(text);
        let text = text.strip_suffix(self.suffix.as_str()).unwrap_or(text);
        let digits: String = text.chars().filter(|c| *c != ',').collect();
        let digits = digits
            .split_once('.')
            .filter(|(_, frac)| frac.chars().all(|c| c == '0'))
            .map_or(digits.as_str(), |(int, _)| int);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let magnitude: i64 = digits.parse().ok()?;
        Some(if negative { -magnitude } else { magnitude })
    }

    fn parse_number(&self, text: &str) -> Option<f64> {
        let text = text.trim();
        let (negative, text) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let text = text.strip_prefix(self.prefix.as_str()).unwrap_or(text);
        let text = text.strip_suffix(self.suffix.as_str()).unwrap_or(text);
        let digits: String = text.chars().filter(|c| *c != ',').collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return None;
        }
        let number: f64 = digits.parse().ok()?;
        let number = number / self.multiplier;
        Some(if negative { -number } else { number })
    }
}

#[derive(Debug, Clone, Copy)]
enum Rounding {
    HalfEven,
    HalfUp,
}

/// Integer and fraction digits of a finite, non-negative `x` rounded to `scale` places.
///
/// Rounding looks at the exact binary expansion, so `2.675` (stored just below)
/// rounds down at two places in either mode.
fn round_decimal(x: f64, scale: usize, mode: Rounding) -> (String, String) {
    let scale = scale.min(1000);
    let exact = format!("{:.1100}", x);
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let frac = frac_part.as_bytes();

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac.iter().copied().take(scale))
        .collect();
    let next = frac.get(scale).copied().unwrap_or(b'0');
    let rest_nonzero = frac
        .get(scale + 1..)
        .is_some_and(|rest| rest.iter().any(|d| *d != b'0'));
    let last_odd = digits.last().is_some_and(|d| (d - b'0') % 2 == 1);
    let round_up = match mode {
        Rounding::HalfUp => next >= b'5',
        Rounding::HalfEven => next > b'5' || (next == b'5' && (rest_nonzero || last_odd)),
    };

    if round_up {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, b'1');
                break;
            }
            i -= 1;
            if digits[i] == b'9' {
                digits[i] = b'0';
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let split = digits.len() - scale;
    let int_digits = String::from_utf8_lossy(&digits[..split]).into_owned();
    let frac_digits = String::from_utf8_lossy(&digits[split..]).into_owned();
    (int_digits, frac_digits)
}

fn group_digits(digits: &str, size: usize) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / size.max(1));
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && size > 0 && (len - i) % size == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ============================================================================
// Format strings
// ============================================================================

/// printf-style formatting of one value, or of all of a field's source values
#[derive(Debug, Default)]
pub struct StringFormatMerger;

impl SinglePropertyValueMerger for StringFormatMerger {
    fn merge(&self, value: &Value, params: &[String]) -> Result<Value> {
        let format = required_param(params, "format string")?;
        sprintf(format, std::slice::from_ref(value)).map(Value::Text)
    }
}

impl MultiPropertyValueMerger for StringFormatMerger {
    fn merge(&self, values: &[Value], params: &[String]) -> Result<Value> {
        let format = required_param(params, "format string")?;
        sprintf(format, values).map(Value::Text)
    }
}

#[derive(Debug, Default)]
struct Spec {
    index: Option<usize>,
    left: bool,
    zero: bool,
    group: bool,
    plus: bool,
    space: bool,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: char,
}

/// Render `format` with `args`
pub(crate) fn sprintf(format: &str, args: &[Value]) -> Result<String> {
    let mut out = String::new();
    let mut chars = format.chars();
    let mut ordinary = 0;
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut body = String::new();
        let conversion = loop {
            match chars.next() {
                Some(c) if c.is_ascii_alphabetic() || c == '%' => break c,
                Some(c) => body.push(c),
                None => {
                    return Err(Error::configuration(format!(
                        "format '{}' ends inside a conversion",
                        format
                    )))
                }
            }
        };
        let spec = parse_spec(&body, conversion, format)?;
        match conversion {
            '%' => {
                pad(&mut out, "%", &spec);
                continue;
            }
            'n' => {
                out.push('\n');
                continue;
            }
            _ => {}
        }
        let index = match spec.index {
            Some(index) => index,
            None => {
                ordinary += 1;
                ordinary - 1
            }
        };
        let arg = args.get(index).ok_or_else(|| {
            Error::configuration(format!("format '{}' has no argument #{}", format, index + 1))
        })?;
        let text = convert(&spec, arg)?;
        pad(&mut out, &text, &spec);
    }
    Ok(out)
}

fn parse_spec(body: &str, conversion: char, format: &str) -> Result<Spec> {
    let invalid = || Error::configuration(format!("invalid conversion '%{}{}' in '{}'", body, conversion, format));
    let mut spec = Spec {
        conversion,
        ..Spec::default()
    };
    let mut rest = body;
    if let Some((index, tail)) = body.split_once('$') {
        let index: usize = index.parse().map_err(|_| invalid())?;
        if index == 0 {
            return Err(invalid());
        }
        spec.index = Some(index - 1);
        rest = tail;
    }
    let mut chars = rest.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            '-' => spec.left = true,
            '0' => spec.zero = true,
            ',' => spec.group = true,
            '+' => spec.plus = true,
            ' ' => spec.space = true,
            '#' => {}
            _ => break,
        }
        chars.next();
    }
    let rest: String = chars.collect();
    let (width, precision) = match rest.split_once('.') {
        Some((width, precision)) => (width, Some(precision)),
        None => (rest.as_str(), None),
    };
    if !width.is_empty() {
        spec.width = Some(width.parse().map_err(|_| invalid())?);
    }
    if let Some(precision) = precision {
        spec.precision = Some(precision.parse().map_err(|_| invalid())?);
    }
    Ok(spec)
}

fn convert(spec: &Spec, arg: &Value) -> Result<String> {
    let mismatch = || {
        Error::type_mismatch(
            format!("argument for %{}", spec.conversion),
            arg.type_label(),
        )
    };
    let upper = spec.conversion.is_ascii_uppercase();
    let text = match spec.conversion.to_ascii_lowercase() {
        's' => {
            let text = arg.to_string();
            match spec.precision {
                Some(limit) => text.chars().take(limit).collect(),
                None => text,
            }
        }
        'b' => match arg {
            Value::Null => "false".to_string(),
            Value::Bool(b) => b.to_string(),
            _ => "true".to_string(),
        },
        'c' => match arg {
            Value::Null => "null".to_string(),
            Value::Char(c) => c.to_string(),
            Value::Int(code) => u32::try_from(*code)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(mismatch)?
                .to_string(),
            Value::Text(s) if s.chars().count() == 1 => s.clone(),
            _ => return Err(mismatch()),
        },
        'd' => match arg {
            Value::Null => "null".to_string(),
            Value::Int(i) => {
                let digits = i.unsigned_abs().to_string();
                let digits = if spec.group { group_digits(&digits, 3) } else { digits };
                signed(spec, digits, *i < 0)
            }
            _ => return Err(mismatch()),
        },
        'x' => match arg {
            Value::Null => "null".to_string(),
            Value::Int(i) => zero_fill(spec, format!("{:x}", i)),
            _ => return Err(mismatch()),
        },
        'o' => match arg {
            Value::Null => "null".to_string(),
            Value::Int(i) => zero_fill(spec, format!("{:o}", i)),
            _ => return Err(mismatch()),
        },
        'f' => {
            let number = match arg {
                Value::Null => return Ok("null".to_string()),
                Value::Int(i) => *i as f64,
                Value::Float(f) => *f,
                _ => return Err(mismatch()),
            };
            if number.is_nan() {
                "NaN".to_string()
            } else if number.is_infinite() {
                let sign = if number < 0.0 { "-" } else { "" };
                format!("{}Infinity", sign)
            } else {
                let (int_digits, frac_digits) =
                    round_decimal(number.abs(), spec.precision.unwrap_or(6), Rounding::HalfUp);
                let int_digits = if spec.group {
                    group_digits(&int_digits, 3)
                } else {
                    int_digits
                };
                let body = if frac_digits.is_empty() {
                    int_digits
                } else {
                    format!("{}.{}", int_digits, frac_digits)
                };
                signed(spec, body, number < 0.0)
            }
        }
        other => {
            return Err(Error::configuration(format!(
                "unsupported conversion '%{}'",
                other
            )))
        }
    };
    Ok(if upper { text.to_uppercase() } else { text })
}

/// Sign and zero padding of a numeric body
fn signed(spec: &Spec, body: String, negative: bool) -> String {
    let sign = if negative {
        "-"
    } else if spec.plus {
        "+"
    } else if spec.space {
        " "
    } else {
        ""
    };
    let mut body = body;
    if spec.zero && !spec.left {
        let target = spec.width.unwrap_or(0).saturating_sub(sign.len());
        while body.chars().count() < target {
            body.insert(0, '0');
        }
    }
    format!("{}{}", sign, body)
}

fn zero_fill(spec: &Spec, body: String) -> String {
    let unsigned = Spec {
        zero: spec.zero,
        left: spec.left,
        width: spec.width,
        ..Spec::default()
    };
    signed(&unsigned, body, false)
}

fn pad(out: &mut String, text: &str, spec: &Spec) {
    let len = text.chars().count();
    let fill = spec.width.unwrap_or(0).saturating_sub(len);
    if spec.left {
        out.push_str(text);
        out.extend(std::iter::repeat(' ').take(fill));
    } else {
        out.extend(std::iter::repeat(' ').take(fill));
        out.push_str(text);
    }
}
