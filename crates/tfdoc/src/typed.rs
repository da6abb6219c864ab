//! typed configuration values
//!
//! [TypedValue] is what the loader hands to the converter for every attribute: the result of evaluating an
//! expression, which may still be unknown (references to things that only exist after apply) or opaque (something the
//! evaluator produced but the output model has no representation for).
//!
//! Numbers are kept as arbitrary precision decimals ([Number]) so the integral check done by the converter never
//! loses digits.
use indexmap::IndexMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    /// Not known at conversion time
    Unknown,
    String(String),
    Number(Number),
    Bool(bool),
    /// lists, sets and tuples
    List(Vec<TypedValue>),
    /// objects and maps
    Object(IndexMap<String, TypedValue>),
    /// A value the output model cannot represent, carries a short description
    Opaque(String),
}

impl TypedValue {
    /// Number of elements when used as a collection (`for_each`, `count`, ...)
    ///
    /// Anything that is not a list or object counts as empty.
    pub fn collection_len(&self) -> usize {
        match self {
            TypedValue::List(items) => items.len(),
            TypedValue::Object(members) => members.len(),
            _ => 0,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, TypedValue::Unknown)
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        TypedValue::String(value.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        TypedValue::String(value)
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        TypedValue::Bool(value)
    }
}

impl From<Number> for TypedValue {
    fn from(value: Number) -> Self {
        TypedValue::Number(value)
    }
}

impl<T: Into<TypedValue>> From<Vec<T>> for TypedValue {
    fn from(value: Vec<T>) -> Self {
        TypedValue::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<hcl::Value> for TypedValue {
    fn from(value: hcl::Value) -> Self {
        match value {
            hcl::Value::Null => TypedValue::Null,
            hcl::Value::Bool(b) => b.into(),
            hcl::Value::Number(n) => Number::from(n).into(),
            hcl::Value::String(s) => s.into(),
            hcl::Value::Array(a) => a.into(),
            hcl::Value::Object(o) => {
                TypedValue::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

/// Arbitrary precision decimal number
///
/// Stored as `digits * 10^exponent`. Digits have no leading or trailing zeros, zero is the empty digit string.
#[derive(Debug, Clone)]
pub struct Number {
    negative: bool,
    digits: String,
    exponent: i64,
    repr: String,
}

impl Number {
    /// Parse a decimal literal such as `5`, `-5.50` or `1.5e3`
    pub fn parse(text: &str) -> Option<Number> {
        let repr = text.trim();
        let (negative, rest) = match repr.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, repr.strip_prefix('+').unwrap_or(repr)),
        };

        let (mantissa, exponent) = match rest.find(['e', 'E']) {
            Some(pos) => (&rest[..pos], rest[pos + 1..].parse::<i64>().ok()?),
            None => (rest, 0),
        };

        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }

        let frac_len = i64::try_from(frac_part.len()).ok()?;
        Some(Self::normalized(
            negative,
            format!("{int_part}{frac_part}"),
            exponent.checked_sub(frac_len)?,
            repr.to_string(),
        ))
    }

    fn normalized(negative: bool, digits: String, exponent: i64, repr: String) -> Number {
        let trimmed = digits.trim_start_matches('0');
        let without_trailing = trimmed.trim_end_matches('0');
        let shift = (trimmed.len() - without_trailing.len()) as i64;
        let digits = without_trailing.to_string();

        if digits.is_empty() {
            return Number {
                negative: false,
                digits,
                exponent: 0,
                repr,
            };
        }

        Number {
            negative,
            digits,
            exponent: exponent.saturating_add(shift),
            repr,
        }
    }

    /// True if the value has no fractional part
    pub fn is_integral(&self) -> bool {
        self.exponent >= 0
    }

    /// The value as `i64`, if it is integral and in range
    pub fn as_i64(&self) -> Option<i64> {
        i64::try_from(self.as_i128()?).ok()
    }

    /// The value as `i128`, if it is integral and in range
    pub fn as_i128(&self) -> Option<i128> {
        if !self.is_integral() {
            return None;
        }
        if self.digits.is_empty() {
            return Some(0);
        }

        // i128::MAX has 39 digits
        let width = i64::try_from(self.digits.len())
            .ok()?
            .checked_add(self.exponent)?;
        if width > 39 {
            return None;
        }

        let zeros = "0".repeat(usize::try_from(self.exponent).ok()?);
        let magnitude: u128 = format!("{}{zeros}", self.digits).parse().ok()?;
        if self.negative {
            0i128.checked_sub_unsigned(magnitude)
        } else {
            i128::try_from(magnitude).ok()
        }
    }

    /// Nearest `f64`
    pub fn as_f64(&self) -> f64 {
        if self.digits.is_empty() {
            return 0.0;
        }

        let sign = if self.negative { "-" } else { "" };
        format!("{sign}{}e{}", self.digits, self.exponent)
            .parse()
            .unwrap_or(f64::NAN)
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.negative == other.negative
            && self.digits == other.digits
            && self.exponent == other.exponent
    }
}

impl Default for Number {
    fn default() -> Self {
        Number::from(0i64)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::normalized(
            value < 0,
            value.unsigned_abs().to_string(),
            0,
            value.to_string(),
        )
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        Number::normalized(false, value.to_string(), 0, value.to_string())
    }
}

impl From<hcl::Number> for Number {
    fn from(value: hcl::Number) -> Self {
        if let Some(int) = value.as_i64() {
            return int.into();
        }
        if let Some(int) = value.as_u64() {
            return int.into();
        }

        // floats always print as plain decimals
        Number::parse(&value.to_string()).unwrap_or_default()
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}
