//! Constant arithmetic following Go's rules for untyped and typed constants.
//!
//! Every function takes fully evaluated operands and returns either the
//! resulting constant or a diagnostic message without position.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::constant::{Constant, Value};
use crate::source::{BinaryOp, UnaryOp};
use crate::types::{Basic, Class, Sizes, Type, Untyped};

/// Largest shift count accepted on constants.
const MAX_SHIFT: usize = 1074;

/// Widest untyped integer constant, in bits.
const MAX_UNTYPED_INT_BITS: u64 = 512;

/// Mantissa bits, including the implicit bit, and normal exponent range.
struct FloatFormat {
    mantissa: u64,
    min_exp: i64,
    max_exp: i64,
}

const FLOAT32: FloatFormat = FloatFormat {
    mantissa: 24,
    min_exp: -126,
    max_exp: 127,
};

const FLOAT64: FloatFormat = FloatFormat {
    mantissa: 53,
    min_exp: -1022,
    max_exp: 1023,
};

/// Why a value does not fit a basic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unrepresentable {
    /// Wrong class, e.g. a string where an integer is expected
    Mismatch,
    /// A fractional or complex value where an integer or real is expected
    Truncated,
    /// Outside the type's range
    Overflow,
}

/// `300 (untyped int constant)` or `300 (constant of type uint8)`.
pub fn describe(c: &Constant) -> String {
    if c.ty.is_untyped() {
        format!("{} ({} constant)", c.value.exact_string(), c.ty)
    } else {
        format!("{} (constant of type {})", c.value.exact_string(), c.ty)
    }
}

/// Re-expresses `value` as a value of `basic`, rounding floats to IEEE precision.
pub fn representable(value: &Value, basic: Basic, sizes: Sizes) -> Result<Value, Unrepresentable> {
    match basic.class() {
        Class::Bool => match value {
            Value::Bool(_) => Ok(value.clone()),
            _ => Err(Unrepresentable::Mismatch),
        },
        Class::String => match value {
            Value::String(_) => Ok(value.clone()),
            _ => Err(Unrepresentable::Mismatch),
        },
        Class::Int => {
            if !value.is_numeric() {
                return Err(Unrepresentable::Mismatch);
            }
            let int = value.to_int().ok_or(Unrepresentable::Truncated)?;
            if fits_int(&int, basic, sizes) {
                Ok(Value::Int(int))
            } else {
                Err(Unrepresentable::Overflow)
            }
        }
        Class::Float => {
            if !value.is_numeric() {
                return Err(Unrepresentable::Mismatch);
            }
            let rat = value.to_rat().ok_or(Unrepresentable::Truncated)?;
            round_float(&rat, basic).map(Value::Float)
        }
        Class::Complex => {
            let (re, im) = value.to_complex().ok_or(Unrepresentable::Mismatch)?;
            let part = if basic == Basic::Complex64 {
                Basic::Float32
            } else {
                Basic::Float64
            };
            Ok(Value::Complex(round_float(&re, part)?, round_float(&im, part)?))
        }
    }
}

fn fits_int(int: &BigInt, basic: Basic, sizes: Sizes) -> bool {
    let bits = basic.bits(sizes);
    if basic.is_unsigned() {
        !int.is_negative() && int.bits() <= u64::from(bits)
    } else {
        let limit = BigInt::one() << (bits as usize - 1);
        let min = -limit.clone();
        *int >= min && *int < limit
    }
}

fn round_float(rat: &BigRational, basic: Basic) -> Result<BigRational, Unrepresentable> {
    let format = if basic == Basic::Float32 { &FLOAT32 } else { &FLOAT64 };
    round_to_format(rat, format)
}

/// Rounds `rat` to the nearest value of `format`, ties to even.
fn round_to_format(rat: &BigRational, format: &FloatFormat) -> Result<BigRational, Unrepresentable> {
    if rat.is_zero() {
        return Ok(BigRational::zero());
    }
    let negative = rat.is_negative();
    let num = rat.numer().abs();
    let den = rat.denom().abs();
    let p = format.mantissa as i64;

    // rat lies in (2^(e-1), 2^(e+1))
    let e = num.bits() as i64 - den.bits() as i64;
    if e - 1 > format.max_exp {
        return Err(Unrepresentable::Overflow);
    }

    let scaled = |s: i64| -> (BigInt, BigInt, BigInt) {
        let (n, d) = if s >= 0 {
            (&num << s as usize, den.clone())
        } else {
            (num.clone(), &den << (-s) as usize)
        };
        let q = &n / &d;
        let r = &n % &d;
        (q, r, d)
    };

    // Subnormals keep the smallest exponent and lose mantissa bits.
    let mut s = (p - e).min(p - 1 - format.min_exp);
    let (mut q, mut r, mut d) = scaled(s);
    if q.bits() as i64 > p {
        s -= 1;
        (q, r, d) = scaled(s);
    }

    let twice = &r << 1usize;
    if twice > d || (twice == d && q.bit(0)) {
        q += 1u32;
    }
    if !q.is_zero() && q.bits() as i64 - 1 - s > format.max_exp {
        return Err(Unrepresentable::Overflow);
    }

    let magnitude = if s >= 0 {
        BigRational::new(q, BigInt::one() << s as usize)
    } else {
        BigRational::from_integer(q << (-s) as usize)
    };
    Ok(if negative { -magnitude } else { magnitude })
}

/// Gives an arithmetic result its operand type, checking overflow for typed
/// results and the precision limit for untyped integers.
fn typed_result(value: Value, ty: Type, sizes: Sizes, op: &str) -> Result<Constant, String> {
    let Some(basic) = ty.basic() else {
        if let (Type::Untyped(_), Value::Int(int)) = (&ty, &value) {
            if int.bits() > MAX_UNTYPED_INT_BITS {
                return Err(if op.is_empty() {
                    "constant overflow".to_string()
                } else {
                    format!("constant {} overflow", op)
                });
            }
        }
        return Ok(Constant::new(value, ty));
    };
    match representable(&value, basic, sizes) {
        Ok(v) => Ok(Constant::new(v, ty)),
        Err(Unrepresentable::Overflow) => {
            Err(format!("constant {} overflows {}", value.exact_string(), ty))
        }
        Err(Unrepresentable::Truncated) => {
            Err(format!("constant {} truncated to {}", value.exact_string(), ty))
        }
        Err(Unrepresentable::Mismatch) => Err(format!("invalid constant type {}", ty)),
    }
}

/// Gives an untyped constant the declared type of its constant declaration.
pub fn assign(c: Constant, target: &Type, sizes: Sizes) -> Result<Constant, String> {
    let Some(basic) = target.basic() else {
        return Err(format!("invalid constant type {}", target));
    };
    if !c.ty.is_untyped() {
        if c.ty == *target {
            return Ok(c);
        }
        return Err(format!(
            "cannot use {} as {} value in constant declaration",
            describe(&c),
            target
        ));
    }
    match representable(&c.value, basic, sizes) {
        Ok(value) => Ok(Constant::new(value, target.clone())),
        Err(reason) => Err(format!(
            "cannot use {} as {} value in constant declaration{}",
            describe(&c),
            target,
            reason_suffix(reason)
        )),
    }
}

/// Explicit conversion `T(x)`.
pub fn convert(c: Constant, target: &Type, sizes: Sizes) -> Result<Constant, String> {
    let Some(basic) = target.basic() else {
        return Err(format!("{} converted to {} is not constant", describe(&c), target));
    };
    if basic.class() == Class::String && c.ty.class() == Some(Class::Int) {
        let text = c
            .value
            .to_int()
            .and_then(|i| i.to_u32())
            .and_then(char::from_u32)
            .unwrap_or('\u{FFFD}');
        return Ok(Constant::new(
            Value::String(text.to_string().into_bytes()),
            target.clone(),
        ));
    }
    match representable(&c.value, basic, sizes) {
        Ok(value) => Ok(Constant::new(value, target.clone())),
        Err(reason) => Err(format!(
            "cannot convert {} to type {}{}",
            describe(&c),
            target,
            reason_suffix(reason)
        )),
    }
}

fn reason_suffix(reason: Unrepresentable) -> &'static str {
    match reason {
        Unrepresentable::Mismatch => "",
        Unrepresentable::Truncated => " (truncated)",
        Unrepresentable::Overflow => " (overflows)",
    }
}

/// Converts an untyped operand to the type of the other, typed operand.
fn implicit(c: &Constant, target: &Type, sizes: Sizes) -> Result<Value, String> {
    let Some(basic) = target.basic() else {
        return Err(format!("cannot convert {} to type {}", describe(c), target));
    };
    representable(&c.value, basic, sizes).map_err(|reason| match reason {
        Unrepresentable::Mismatch => format!("cannot convert {} to type {}", describe(c), target),
        Unrepresentable::Truncated => format!("{} truncated to {}", describe(c), target),
        Unrepresentable::Overflow => format!("{} overflows {}", describe(c), target),
    })
}

/// Brings two operands to a common type.
pub fn match_operands(x: &Constant, y: &Constant, sizes: Sizes) -> Result<(Value, Value, Type), String> {
    let mismatched = || {
        format!(
            "invalid operation: mismatched types {} and {}",
            x.ty, y.ty
        )
    };
    match (&x.ty, &y.ty) {
        (Type::Untyped(a), Type::Untyped(b)) => {
            let kind = if a == b {
                *a
            } else {
                match (a.numeric_rank(), b.numeric_rank()) {
                    (Some(ra), Some(rb)) if ra >= rb => *a,
                    (Some(_), Some(_)) => *b,
                    _ => return Err(mismatched()),
                }
            };
            let class = kind.class();
            let xv = x.value.to_class(class).ok_or_else(mismatched)?;
            let yv = y.value.to_class(class).ok_or_else(mismatched)?;
            Ok((xv, yv, Type::Untyped(kind)))
        }
        (Type::Untyped(_), ty) => Ok((implicit(x, ty, sizes)?, y.value.clone(), ty.clone())),
        (ty, Type::Untyped(_)) => Ok((x.value.clone(), implicit(y, ty, sizes)?, ty.clone())),
        (a, b) if a == b => Ok((x.value.clone(), y.value.clone(), a.clone())),
        _ => Err(mismatched()),
    }
}

enum ArithError {
    Undefined,
    DivisionByZero,
}

fn arith(op: BinaryOp, x: Value, y: Value) -> Result<Value, ArithError> {
    match (x, y) {
        (Value::String(mut a), Value::String(b)) if op == BinaryOp::Add => {
            a.extend_from_slice(&b);
            Ok(Value::String(a))
        }
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Quo | BinaryOp::Rem if b.is_zero() => {
                return Err(ArithError::DivisionByZero)
            }
            BinaryOp::Quo => a / b,
            BinaryOp::Rem => a % b,
            BinaryOp::And => a & b,
            BinaryOp::Or => a | b,
            BinaryOp::Xor => a ^ b,
            BinaryOp::AndNot => a & !b,
            _ => return Err(ArithError::Undefined),
        })),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Quo if b.is_zero() => return Err(ArithError::DivisionByZero),
            BinaryOp::Quo => a / b,
            _ => return Err(ArithError::Undefined),
        })),
        (Value::Complex(a, b), Value::Complex(c, d)) => {
            let (re, im) = match op {
                BinaryOp::Add => (a + c, b + d),
                BinaryOp::Sub => (a - c, b - d),
                BinaryOp::Mul => (&a * &c - &b * &d, &a * &d + &b * &c),
                BinaryOp::Quo => {
                    let denom = &c * &c + &d * &d;
                    if denom.is_zero() {
                        return Err(ArithError::DivisionByZero);
                    }
                    (
                        (&a * &c + &b * &d) / &denom,
                        (&b * &c - &a * &d) / &denom,
                    )
                }
                _ => return Err(ArithError::Undefined),
            };
            Ok(Value::Complex(re, im))
        }
        _ => Err(ArithError::Undefined),
    }
}

fn ordering(x: &Value, y: &Value) -> Option<Ordering> {
    match (x, y) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Binary operation, including comparisons, logical operators and shifts.
pub fn binary(op: BinaryOp, x: Constant, y: Constant, sizes: Sizes) -> Result<Constant, String> {
    if matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
        return shift(op, x, y, sizes);
    }
    let (xv, yv, ty) = match_operands(&x, &y, sizes)?;
    let undefined = || {
        format!(
            "invalid operation: operator {} not defined on {}",
            op.token(),
            describe(&x)
        )
    };

    if op.is_comparison() {
        let result = match op {
            BinaryOp::Eq => xv == yv,
            BinaryOp::Ne => xv != yv,
            _ => {
                let ord = ordering(&xv, &yv).ok_or_else(undefined)?;
                match op {
                    BinaryOp::Lt => ord == Ordering::Less,
                    BinaryOp::Le => ord != Ordering::Greater,
                    BinaryOp::Gt => ord == Ordering::Greater,
                    _ => ord != Ordering::Less,
                }
            }
        };
        return Ok(Constant::untyped(Value::Bool(result), Untyped::Bool));
    }

    if matches!(op, BinaryOp::LogAnd | BinaryOp::LogOr) {
        let (Value::Bool(a), Value::Bool(b)) = (&xv, &yv) else {
            return Err(undefined());
        };
        let result = if op == BinaryOp::LogAnd { *a && *b } else { *a || *b };
        return Ok(Constant::new(Value::Bool(result), ty));
    }

    match arith(op, xv, yv) {
        Ok(value) => typed_result(value, ty, sizes, op.overflow_name()),
        Err(ArithError::DivisionByZero) => Err("invalid operation: division by zero".to_string()),
        Err(ArithError::Undefined) => Err(undefined()),
    }
}

/// `x << s` and `x >> s`.
pub fn shift(op: BinaryOp, x: Constant, y: Constant, sizes: Sizes) -> Result<Constant, String> {
    if !y.ty.is_untyped() && y.ty.class() != Some(Class::Int) {
        return Err(format!(
            "invalid operation: shift count {} must be integer",
            describe(&y)
        ));
    }
    let count = y.value.to_int().ok_or_else(|| {
        format!("invalid operation: shift count {} must be integer", describe(&y))
    })?;
    if count.is_negative() {
        return Err(format!("invalid operation: negative shift count {}", describe(&y)));
    }
    let count = count
        .to_usize()
        .filter(|&c| c <= MAX_SHIFT)
        .ok_or_else(|| format!("invalid shift count {}", describe(&y)))?;

    let not_integer = || {
        format!(
            "invalid operation: shifted operand {} must be integer",
            describe(&x)
        )
    };
    let ty = match &x.ty {
        Type::Untyped(kind) if kind.class() == Class::Int => x.ty.clone(),
        Type::Untyped(kind) if kind.class().is_numeric() => Type::Untyped(Untyped::Int),
        Type::Untyped(_) => return Err(not_integer()),
        typed if typed.class() == Some(Class::Int) => typed.clone(),
        _ => return Err(not_integer()),
    };
    let operand = x.value.to_int().ok_or_else(not_integer)?;
    let value = if op == BinaryOp::Shl {
        operand << count
    } else {
        operand >> count
    };
    typed_result(Value::Int(value), ty, sizes, op.overflow_name())
}

/// Unary `+`, `-`, `!` and `^`.
pub fn unary(op: UnaryOp, x: Constant, sizes: Sizes) -> Result<Constant, String> {
    let undefined = || {
        format!(
            "invalid operation: operator {} not defined on {}",
            op.token(),
            describe(&x)
        )
    };
    let value = match (op, &x.value) {
        (UnaryOp::Plus, v) if v.is_numeric() => v.clone(),
        (UnaryOp::Neg, Value::Int(i)) => Value::Int(-i),
        (UnaryOp::Neg, Value::Float(r)) => Value::Float(-r),
        (UnaryOp::Neg, Value::Complex(re, im)) => Value::Complex(-re, -im),
        (UnaryOp::Not, Value::Bool(b)) => Value::Bool(!b),
        (UnaryOp::Complement, Value::Int(i)) => match x.ty.basic() {
            Some(basic) if basic.is_unsigned() => {
                let mask = (BigInt::one() << basic.bits(sizes) as usize) - BigInt::one();
                Value::Int(i ^ &mask)
            }
            _ => Value::Int(!i),
        },
        _ => return Err(undefined()),
    };
    let name = if matches!(op, UnaryOp::Complement) {
        "bitwise complement"
    } else {
        ""
    };
    typed_result(value, x.ty.clone(), sizes, name)
}

/// `len(s)` of a constant string is a constant of type `int`.
pub fn len(x: &Constant) -> Result<Constant, String> {
    match &x.value {
        Value::String(bytes) => Ok(Constant::new(
            Value::Int(BigInt::from(bytes.len())),
            Type::Basic(Basic::Int),
        )),
        _ => Err(format!("invalid argument: {} for built-in len", describe(x))),
    }
}

/// `real(c)` and `imag(c)`.
pub fn real_imag(imag: bool, x: &Constant) -> Result<Constant, String> {
    let name = if imag { "imag" } else { "real" };
    let result_ty = match &x.ty {
        Type::Untyped(kind) if kind.class().is_numeric() => Type::Untyped(Untyped::Float),
        typed => match typed.basic() {
            Some(Basic::Complex64) => Type::Basic(Basic::Float32),
            Some(Basic::Complex128) => Type::Basic(Basic::Float64),
            _ => {
                return Err(format!(
                    "invalid argument: {} must be of complex type for built-in {}",
                    describe(x),
                    name
                ))
            }
        },
    };
    let (re, im) = x
        .value
        .to_complex()
        .ok_or_else(|| format!("invalid argument: {} for built-in {}", describe(x), name))?;
    let part = if imag { im } else { re };
    Ok(Constant::new(Value::Float(part), result_ty))
}

/// `complex(re, im)`.
pub fn complex(re: &Constant, im: &Constant, sizes: Sizes) -> Result<Constant, String> {
    let (rv, iv, ty) = match_operands(re, im, sizes)?;
    let invalid = || {
        format!(
            "invalid operation: complex({}, {}) requires float arguments",
            re.value.exact_string(),
            im.value.exact_string()
        )
    };
    let result_ty = match &ty {
        Type::Untyped(kind) if kind.class().is_numeric() => Type::Untyped(Untyped::Complex),
        typed => match typed.basic() {
            Some(Basic::Float32) => Type::Basic(Basic::Complex64),
            Some(Basic::Float64) => Type::Basic(Basic::Complex128),
            _ => return Err(invalid()),
        },
    };
    let (Some(r), Some(i)) = (rv.to_rat(), iv.to_rat()) else {
        return Err(invalid());
    };
    Ok(Constant::new(Value::Complex(r, i), result_ty))
}

/// `min(...)` and `max(...)` over ordered constants.
pub fn min_max(max: bool, args: Vec<Constant>, sizes: Sizes) -> Result<Constant, String> {
    let name = if max { "max" } else { "min" };
    let mut iter = args.into_iter();
    let Some(first) = iter.next() else {
        return Err(format!("not enough arguments for {}() (expected 1, found 0)", name));
    };
    if !first.ty.class().is_some_and(Class::is_ordered) {
        return Err(format!(
            "invalid argument: {} cannot be ordered",
            describe(&first)
        ));
    }
    iter.try_fold(first, |acc, next| {
        let (av, nv, ty) = match_operands(&acc, &next, sizes)?;
        let ord = ordering(&av, &nv)
            .ok_or_else(|| format!("invalid argument: {} cannot be ordered", describe(&next)))?;
        let take_next = if max {
            ord == Ordering::Less
        } else {
            ord == Ordering::Greater
        };
        Ok(Constant::new(if take_next { nv } else { av }, ty))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> Constant {
        Constant::untyped(Value::Int(BigInt::from(v)), Untyped::Int)
    }

    fn float(n: i64, d: i64) -> Constant {
        Constant::untyped(
            Value::Float(BigRational::new(BigInt::from(n), BigInt::from(d))),
            Untyped::Float,
        )
    }

    fn typed(v: i64, basic: Basic) -> Constant {
        Constant::new(Value::Int(BigInt::from(v)), Type::Basic(basic))
    }

    fn sizes() -> Sizes {
        Sizes::default()
    }

    #[test]
    fn test_shift_then_add() {
        let a = binary(BinaryOp::Shl, int(1), int(3), sizes()).unwrap();
        let b = binary(BinaryOp::Add, a, int(1), sizes()).unwrap();
        assert_eq!(b.exact_string(), "9");
        assert_eq!(b.ty, Type::Untyped(Untyped::Int));
    }

    #[test]
    fn test_untyped_promotion() {
        let sum = binary(BinaryOp::Add, int(1), float(1, 2), sizes()).unwrap();
        assert_eq!(sum.ty, Type::Untyped(Untyped::Float));
        assert_eq!(sum.exact_string(), "1.5");

        let rune = Constant::untyped(Value::Int(BigInt::from(97)), Untyped::Rune);
        let next = binary(BinaryOp::Add, rune, int(1), sizes()).unwrap();
        assert_eq!(next.ty, Type::Untyped(Untyped::Rune));
    }

    #[test]
    fn test_integer_division_truncates() {
        let q = binary(BinaryOp::Quo, int(-7), int(2), sizes()).unwrap();
        assert_eq!(q.exact_string(), "-3");
        let r = binary(BinaryOp::Rem, int(-7), int(2), sizes()).unwrap();
        assert_eq!(r.exact_string(), "-1");
        let f = binary(BinaryOp::Quo, float(7, 1), int(2), sizes()).unwrap();
        assert_eq!(f.exact_string(), "3.5");
    }

    #[test]
    fn test_division_by_zero() {
        let err = binary(BinaryOp::Quo, int(1), int(0), sizes()).unwrap_err();
        assert!(err.contains("division by zero"));
    }

    #[test]
    fn test_typed_overflow() {
        let err = binary(BinaryOp::Add, typed(255, Basic::Uint8), int(1), sizes()).unwrap_err();
        assert_eq!(err, "constant 256 overflows uint8");
        assert!(unary(UnaryOp::Neg, typed(1, Basic::Uint), sizes()).is_err());
        let err = binary(BinaryOp::Add, typed(1, Basic::Int8), int(300), sizes()).unwrap_err();
        assert!(err.contains("overflows int8"));
    }

    #[test]
    fn test_mismatched_types() {
        let err = binary(BinaryOp::Add, typed(1, Basic::Int32), typed(1, Basic::Int64), sizes())
            .unwrap_err();
        assert!(err.contains("mismatched types int32 and int64"));
        let s = Constant::untyped(Value::String(b"a".to_vec()), Untyped::String);
        assert!(binary(BinaryOp::Add, s, int(1), sizes()).is_err());
    }

    #[test]
    fn test_comparisons_are_untyped_bool() {
        let c = binary(BinaryOp::Lt, typed(1, Basic::Int), int(2), sizes()).unwrap();
        assert_eq!(c, Constant::untyped(Value::Bool(true), Untyped::Bool));
        let s1 = Constant::untyped(Value::String(b"abc".to_vec()), Untyped::String);
        let s2 = Constant::untyped(Value::String(b"abd".to_vec()), Untyped::String);
        assert_eq!(
            binary(BinaryOp::Ge, s1, s2, sizes()).unwrap().exact_string(),
            "false"
        );
    }

    #[test]
    fn test_string_concatenation() {
        let a = Constant::untyped(Value::String(b"go".to_vec()), Untyped::String);
        let b = Constant::untyped(Value::String(b"const".to_vec()), Untyped::String);
        assert_eq!(
            binary(BinaryOp::Add, a, b, sizes()).unwrap().exact_string(),
            "\"goconst\""
        );
    }

    #[test]
    fn test_shift_rules() {
        let f = binary(BinaryOp::Shl, float(2, 1), int(2), sizes()).unwrap();
        assert_eq!(f.ty, Type::Untyped(Untyped::Int));
        assert_eq!(f.exact_string(), "8");
        assert!(binary(BinaryOp::Shl, float(1, 2), int(1), sizes()).is_err());
        assert!(binary(BinaryOp::Shl, int(1), int(-1), sizes()).is_err());
        assert!(binary(BinaryOp::Shl, int(1), int(5000), sizes()).is_err());
        let big = binary(BinaryOp::Shl, int(1), int(100), sizes()).unwrap();
        assert_eq!(big.exact_string(), "1267650600228229401496703205376");
        assert!(binary(BinaryOp::Shl, typed(1, Basic::Int32), int(31), sizes()).is_err());
    }

    #[test]
    fn test_complement() {
        assert_eq!(unary(UnaryOp::Complement, int(0), sizes()).unwrap().exact_string(), "-1");
        assert_eq!(
            unary(UnaryOp::Complement, typed(0, Basic::Uint8), sizes())
                .unwrap()
                .exact_string(),
            "255"
        );
    }

    #[test]
    fn test_float_rounding() {
        let tenth = float(1, 10);
        let f64v = assign(tenth.clone(), &Type::Basic(Basic::Float64), sizes()).unwrap();
        assert_eq!(f64v.value.to_rat().unwrap().to_f64(), Some(0.1));
        let f32v = assign(tenth, &Type::Basic(Basic::Float32), sizes()).unwrap();
        assert_eq!(
            f32v.value.to_rat().unwrap().to_f64(),
            Some(f64::from(0.1f32))
        );
    }

    fn pow2(exp: i64) -> BigRational {
        if exp >= 0 {
            BigRational::from_integer(BigInt::one() << exp as usize)
        } else {
            BigRational::new(BigInt::one(), BigInt::one() << (-exp) as usize)
        }
    }

    fn untyped_float(rat: BigRational) -> Constant {
        Constant::untyped(Value::Float(rat), Untyped::Float)
    }

    #[test]
    fn test_float32_rounds_exact_value_once() {
        // Rounding through float64 first would land on the tie and round to 1.
        let value = pow2(0) + pow2(-24) + pow2(-60);
        let f = assign(untyped_float(value), &Type::Basic(Basic::Float32), sizes()).unwrap();
        assert_eq!(f.exact_string(), "1.00000011920928955078125");

        let tie = pow2(0) + pow2(-24);
        let even = assign(untyped_float(tie), &Type::Basic(Basic::Float32), sizes()).unwrap();
        assert_eq!(even.exact_string(), "1");

        let tie_up = pow2(0) + pow2(-23) + pow2(-24);
        let up = assign(untyped_float(tie_up), &Type::Basic(Basic::Float32), sizes()).unwrap();
        assert_eq!(up.value.to_rat().unwrap(), pow2(0) + pow2(-22));
    }

    #[test]
    fn test_float_range_limits() {
        let max32 = BigRational::from_float(f32::MAX).unwrap();
        let ok = assign(untyped_float(max32.clone()), &Type::Basic(Basic::Float32), sizes());
        assert!(ok.is_ok());
        let beyond = max32 + pow2(103);
        let err = assign(untyped_float(beyond), &Type::Basic(Basic::Float32), sizes()).unwrap_err();
        assert!(err.ends_with("(overflows)"), "{}", err);

        let tiny = assign(untyped_float(pow2(-149)), &Type::Basic(Basic::Float32), sizes()).unwrap();
        assert_eq!(tiny.value.to_rat().unwrap(), pow2(-149));
        let gone = assign(untyped_float(pow2(-151)), &Type::Basic(Basic::Float32), sizes()).unwrap();
        assert!(gone.value.to_rat().unwrap().is_zero());

        let c = Constant::untyped(Value::Complex(pow2(0) + pow2(-24) + pow2(-60), pow2(-1)), Untyped::Complex);
        let c64 = assign(c, &Type::Basic(Basic::Complex64), sizes()).unwrap();
        assert_eq!(c64.exact_string(), "(1.00000011920928955078125 + 0.5i)");
    }

    #[test]
    fn test_untyped_int_precision_limit() {
        let err = binary(BinaryOp::Shl, int(1), int(600), sizes()).unwrap_err();
        assert_eq!(err, "constant shift overflow");
        assert!(binary(BinaryOp::Shl, int(1), int(511), sizes()).is_ok());

        let half = binary(BinaryOp::Shl, int(1), int(400), sizes()).unwrap();
        let err = binary(BinaryOp::Mul, half.clone(), half, sizes()).unwrap_err();
        assert_eq!(err, "constant multiplication overflow");
    }

    #[test]
    fn test_assign_errors() {
        let err = assign(float(3, 2), &Type::Basic(Basic::Int), sizes()).unwrap_err();
        assert!(err.ends_with("(truncated)"));
        let err = assign(int(300), &Type::Basic(Basic::Uint8), sizes()).unwrap_err();
        assert!(err.ends_with("(overflows)"));
        let err = assign(typed(1, Basic::Int32), &Type::Basic(Basic::Int64), sizes()).unwrap_err();
        assert!(err.contains("constant of type int32"));
        assert!(assign(int(1), &Type::Other("[]int".into()), sizes()).is_err());
    }

    #[test]
    fn test_word_size_affects_int_range() {
        let small = Sizes { word_bits: 32 };
        assert!(assign(int(1 << 40), &Type::Basic(Basic::Int), small).is_err());
        assert!(assign(int(1 << 40), &Type::Basic(Basic::Int), sizes()).is_ok());
    }

    #[test]
    fn test_conversions() {
        let s = convert(int(65), &Type::Basic(Basic::String), sizes()).unwrap();
        assert_eq!(s.exact_string(), "\"A\"");
        let bad = convert(int(-1), &Type::Basic(Basic::String), sizes()).unwrap();
        assert_eq!(bad.value, Value::String("\u{FFFD}".as_bytes().to_vec()));
        let f = convert(int(3), &Type::Basic(Basic::Float64), sizes()).unwrap();
        assert_eq!(f.ty, Type::Basic(Basic::Float64));
        assert!(convert(float(3, 2), &Type::Basic(Basic::Int), sizes()).is_err());
        let named = Type::named("time", "Duration", Some(Basic::Int64));
        let d = convert(int(5), &named, sizes()).unwrap();
        assert_eq!(d.ty, named);
    }

    #[test]
    fn test_builtins() {
        let s = Constant::untyped(Value::String(b"hello".to_vec()), Untyped::String);
        let l = len(&s).unwrap();
        assert_eq!(l.exact_string(), "5");
        assert_eq!(l.ty, Type::Basic(Basic::Int));

        let c = complex(&int(1), &float(1, 2), sizes()).unwrap();
        assert_eq!(c.exact_string(), "(1 + 0.5i)");
        assert_eq!(real_imag(true, &c).unwrap().exact_string(), "0.5");
        assert_eq!(real_imag(false, &int(3)).unwrap().ty, Type::Untyped(Untyped::Float));

        let m = min_max(true, vec![int(3), float(7, 2), int(1)], sizes()).unwrap();
        assert_eq!(m.exact_string(), "3.5");
        let n = min_max(false, vec![int(3), int(-2)], sizes()).unwrap();
        assert_eq!(n.exact_string(), "-2");
        assert!(min_max(false, Vec::new(), sizes()).is_err());
    }
}
