//! Exact constant values.
//!
//! Integers are arbitrary precision, floats are exact rationals and strings
//! are byte strings, so no constant is ever rounded unless its type demands
//! it.

use std::fmt;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::types::{Class, Type, Untyped};

/// An exact constant value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    String(Vec<u8>),
    Int(BigInt),
    Float(BigRational),
    Complex(BigRational, BigRational),
}

impl Value {
    pub fn class(&self) -> Class {
        match self {
            Value::Bool(_) => Class::Bool,
            Value::String(_) => Class::String,
            Value::Int(_) => Class::Int,
            Value::Float(_) => Class::Float,
            Value::Complex(..) => Class::Complex,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.class().is_numeric()
    }

    /// The value as an integer, if it is numeric and integral.
    pub fn to_int(&self) -> Option<BigInt> {
        match self {
            Value::Int(i) => Some(i.clone()),
            Value::Float(r) if r.is_integer() => Some(r.to_integer()),
            Value::Complex(re, im) if im.is_zero() && re.is_integer() => Some(re.to_integer()),
            _ => None,
        }
    }

    /// The value as a rational, if it is numeric with no imaginary part.
    pub fn to_rat(&self) -> Option<BigRational> {
        match self {
            Value::Int(i) => Some(BigRational::from_integer(i.clone())),
            Value::Float(r) => Some(r.clone()),
            Value::Complex(re, im) if im.is_zero() => Some(re.clone()),
            _ => None,
        }
    }

    pub fn to_complex(&self) -> Option<(BigRational, BigRational)> {
        match self {
            Value::Complex(re, im) => Some((re.clone(), im.clone())),
            other => other.to_rat().map(|re| (re, BigRational::zero())),
        }
    }

    /// Re-expresses a numeric value in the given class without rounding.
    ///
    /// Returns `None` when the value does not fit the class exactly.
    pub fn to_class(&self, class: Class) -> Option<Value> {
        match class {
            Class::Bool => matches!(self, Value::Bool(_)).then(|| self.clone()),
            Class::String => matches!(self, Value::String(_)).then(|| self.clone()),
            Class::Int => self.to_int().map(Value::Int),
            Class::Float => self.to_rat().map(Value::Float),
            Class::Complex => self.to_complex().map(|(re, im)| Value::Complex(re, im)),
        }
    }

    /// Exact textual form of the value.
    pub fn exact_string(&self) -> String {
        match self {
            Value::Bool(b) => b.to_string(),
            Value::String(bytes) => quote(bytes),
            Value::Int(i) => i.to_string(),
            Value::Float(r) => format_rational(r),
            Value::Complex(re, im) => {
                format!("({} + {}i)", format_rational(re), format_rational(im))
            }
        }
    }
}

/// A constant value together with its type.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub value: Value,
    pub ty: Type,
}

impl Constant {
    pub fn new(value: Value, ty: Type) -> Self {
        Self { value, ty }
    }

    pub fn untyped(value: Value, kind: Untyped) -> Self {
        Self {
            value,
            ty: Type::Untyped(kind),
        }
    }

    pub fn exact_string(&self) -> String {
        self.value.exact_string()
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value.exact_string())
    }
}

/// Formats a rational exactly.
///
/// Integral values print as integers, values with a terminating decimal
/// expansion print as decimals and everything else prints as `num/den`.
pub fn format_rational(r: &BigRational) -> String {
    if r.is_integer() {
        return r.numer().to_string();
    }

    let two = BigInt::from(2);
    let five = BigInt::from(5);
    let mut rest = r.denom().abs();
    let mut twos = 0usize;
    while (&rest % &two).is_zero() {
        rest /= &two;
        twos += 1;
    }
    let mut fives = 0usize;
    while (&rest % &five).is_zero() {
        rest /= &five;
        fives += 1;
    }
    if !rest.is_one() {
        return format!("{}/{}", r.numer(), r.denom());
    }

    let places = twos.max(fives);
    let scaled = r.numer() * num_traits::pow(BigInt::from(10), places) / r.denom();
    let digits = scaled.abs().to_string();
    let (whole, frac) = if digits.len() > places {
        let split = digits.len() - places;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{}{}", "0".repeat(places - digits.len()), digits))
    };
    let sign = if scaled.is_negative() { "-" } else { "" };
    format!("{}{}.{}", sign, whole, frac)
}

/// Quotes a byte string the way Go's `strconv.Quote` does.
pub fn quote(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    let mut rest = bytes;
    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(text) => {
                push_escaped(&mut out, text);
                break;
            }
            Err(err) => {
                let valid = err.valid_up_to();
                if let Ok(text) = std::str::from_utf8(&rest[..valid]) {
                    push_escaped(&mut out, text);
                }
                let bad = err.error_len().unwrap_or(rest.len() - valid);
                for byte in &rest[valid..valid + bad] {
                    out.push_str(&format!("\\x{:02x}", byte));
                }
                rest = &rest[valid + bad..];
            }
        }
    }
    out.push('"');
    out
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if is_print(c) => out.push(c),
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{b}' => out.push_str("\\v"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", c as u32))
            }
            c if (c as u32) < 0x10000 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push_str(&format!("\\U{:08x}", c as u32)),
        }
    }
}

/// Printable runes: graphic characters plus the ASCII space.
fn is_print(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    !matches!(c as u32,
        0x00AD
        | 0x200B..=0x200F
        | 0x2028..=0x202E
        | 0x2060..=0x2064
        | 0xE000..=0xF8FF
        | 0xFEFF
        | 0xFFF9..=0xFFFB)
}
