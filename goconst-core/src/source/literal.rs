//! Exact decoding of Go literal tokens.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::One;

/// Largest effective decimal or binary exponent kept exactly in a float literal.
const MAX_EXPONENT: i64 = 100_000;

/// Decodes an integer literal: decimal, `0x`, `0b`, `0o` or legacy `0` octal.
pub fn parse_int(text: &str) -> Result<BigInt, String> {
    let clean: String = text.chars().filter(|&c| c != '_').collect();
    let lower = clean.to_ascii_lowercase();
    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (&lower[1..], 8)
    } else {
        (lower.as_str(), 10)
    };
    if digits.is_empty() {
        return Err(format!("invalid integer literal {}", text));
    }
    BigInt::parse_bytes(digits.as_bytes(), radix)
        .ok_or_else(|| format!("invalid integer literal {}", text))
}

/// Decodes a decimal or hexadecimal floating-point literal exactly.
pub fn parse_float(text: &str) -> Result<BigRational, String> {
    let clean: String = text.chars().filter(|&c| c != '_').collect();
    let lower = clean.to_ascii_lowercase();
    let invalid = || format!("invalid floating-point literal {}", text);

    if let Some(hex) = lower.strip_prefix("0x") {
        let (mantissa, exp) = hex.split_once('p').ok_or_else(invalid)?;
        let exp = parse_exponent(exp).ok_or_else(invalid)?;
        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let digits = format!("{}{}", int_part, frac_part);
        if digits.is_empty() {
            return Err(invalid());
        }
        let value = BigInt::parse_bytes(digits.as_bytes(), 16).ok_or_else(invalid)?;
        let binary_exp = exp.saturating_sub(4 * frac_part.len() as i64);
        return Ok(BigRational::from_integer(value) * pow_rat(2, bounded(binary_exp, text)?));
    }

    let (mantissa, exp) = match lower.split_once('e') {
        Some((m, e)) => (m, parse_exponent(e).ok_or_else(invalid)?),
        None => (lower.as_str(), 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{}{}", int_part, frac_part);
    if digits.is_empty() {
        return Err(invalid());
    }
    let value = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(invalid)?;
    let decimal_exp = exp.saturating_sub(frac_part.len() as i64);
    Ok(BigRational::from_integer(value) * pow_rat(10, bounded(decimal_exp, text)?))
}

/// Decodes an imaginary literal into the value of its imaginary part.
pub fn parse_imaginary(text: &str) -> Result<BigRational, String> {
    let body = text
        .strip_suffix('i')
        .ok_or_else(|| format!("invalid imaginary literal {}", text))?;
    let lower = body.to_ascii_lowercase();
    if body.chars().all(|c| c.is_ascii_digit() || c == '_') {
        // An all-decimal integer part is decimal even with a leading zero.
        let clean: String = body.chars().filter(|&c| c != '_').collect();
        let value = BigInt::parse_bytes(clean.as_bytes(), 10)
            .ok_or_else(|| format!("invalid imaginary literal {}", text))?;
        return Ok(BigRational::from_integer(value));
    }
    let is_prefixed_int = (lower.starts_with("0x") && !lower.contains('p') && !lower.contains('.'))
        || lower.starts_with("0b")
        || lower.starts_with("0o");
    if is_prefixed_int {
        return parse_int(body).map(BigRational::from_integer);
    }
    parse_float(body)
}

fn parse_exponent(text: &str) -> Option<i64> {
    let digits = text
        .strip_prefix('-')
        .or_else(|| text.strip_prefix('+'))
        .unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Saturate so that oversized exponents reach the range check.
    let exp: i64 = digits.parse().unwrap_or(i64::MAX);
    Some(if text.starts_with('-') { -exp } else { exp })
}

fn bounded(exp: i64, text: &str) -> Result<i64, String> {
    if exp.checked_abs().is_some_and(|e| e <= MAX_EXPONENT) {
        Ok(exp)
    } else {
        Err(format!("floating-point literal {} is not representable (exponent overflow)", text))
    }
}

fn pow_rat(base: u32, exp: i64) -> BigRational {
    let magnitude = num_traits::pow(BigInt::from(base), exp.unsigned_abs() as usize);
    if exp >= 0 {
        BigRational::from_integer(magnitude)
    } else {
        BigRational::new(BigInt::one(), magnitude)
    }
}

enum Escaped {
    Byte(u8),
    Char(char),
}

fn read_escape(chars: &mut std::str::Chars<'_>, quote: char) -> Result<Escaped, String> {
    let c = chars.next().ok_or("escape sequence not terminated")?;
    let simple = match c {
        'a' => Some(0x07),
        'b' => Some(0x08),
        'f' => Some(0x0c),
        'n' => Some(b'\n'),
        'r' => Some(b'\r'),
        't' => Some(b'\t'),
        'v' => Some(0x0b),
        '\\' => Some(b'\\'),
        c if c == quote => Some(c as u8),
        _ => None,
    };
    if let Some(byte) = simple {
        return Ok(Escaped::Byte(byte));
    }
    match c {
        '0'..='7' => {
            let mut digits = String::from(c);
            for _ in 0..2 {
                digits.push(chars.next().ok_or("escape sequence not terminated")?);
            }
            let value = u32::from_str_radix(&digits, 8)
                .map_err(|_| "invalid octal escape sequence".to_string())?;
            u8::try_from(value)
                .map(Escaped::Byte)
                .map_err(|_| "octal escape value > 255".to_string())
        }
        'x' | 'u' | 'U' => {
            let width = match c {
                'x' => 2,
                'u' => 4,
                _ => 8,
            };
            let digits: String = chars.by_ref().take(width).collect();
            if digits.len() != width {
                return Err("escape sequence not terminated".to_string());
            }
            let value = u32::from_str_radix(&digits, 16)
                .map_err(|_| "invalid hexadecimal escape sequence".to_string())?;
            if c == 'x' {
                // two hex digits always fit a byte
                return Ok(Escaped::Byte(value as u8));
            }
            char::from_u32(value)
                .map(Escaped::Char)
                .ok_or_else(|| "escape sequence is invalid Unicode code point".to_string())
        }
        _ => Err("unknown escape sequence".to_string()),
    }
}

/// Decodes a rune literal into its code point.
pub fn unquote_rune(text: &str) -> Result<u32, String> {
    let body = text
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .ok_or_else(|| format!("invalid rune literal {}", text))?;
    let mut chars = body.chars();
    let value = match chars.next() {
        Some('\\') => match read_escape(&mut chars, '\'')? {
            Escaped::Byte(b) => b as u32,
            Escaped::Char(c) => c as u32,
        },
        Some(c) => c as u32,
        None => return Err("empty rune literal or unescaped ' in rune literal".to_string()),
    };
    if chars.next().is_some() {
        return Err("more than one character in rune literal".to_string());
    }
    Ok(value)
}

/// Decodes an interpreted or raw string literal into bytes.
pub fn unquote_string(text: &str) -> Result<Vec<u8>, String> {
    if let Some(raw) = text.strip_prefix('`').and_then(|t| t.strip_suffix('`')) {
        return Ok(raw.bytes().filter(|&b| b != b'\r').collect());
    }
    let body = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .ok_or_else(|| format!("invalid string literal {}", text))?;

    let mut out = Vec::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match read_escape(&mut chars, '"')? {
            Escaped::Byte(b) => out.push(b),
            Escaped::Char(ch) => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rat(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn test_int_bases() {
        assert_eq!(parse_int("42").unwrap(), BigInt::from(42));
        assert_eq!(parse_int("0x_FF").unwrap(), BigInt::from(255));
        assert_eq!(parse_int("0b1010").unwrap(), BigInt::from(10));
        assert_eq!(parse_int("0o17").unwrap(), BigInt::from(15));
        assert_eq!(parse_int("017").unwrap(), BigInt::from(15));
        assert_eq!(parse_int("1_000_000").unwrap(), BigInt::from(1_000_000));
        assert_eq!(parse_int("0").unwrap(), BigInt::from(0));
        assert!(parse_int("09").is_err());
    }

    #[test]
    fn test_float_decimal() {
        assert_eq!(parse_float("3.14159").unwrap(), rat(314159, 100000));
        assert_eq!(parse_float("1e3").unwrap(), rat(1000, 1));
        assert_eq!(parse_float(".5").unwrap(), rat(1, 2));
        assert_eq!(parse_float("2.").unwrap(), rat(2, 1));
        assert_eq!(parse_float("25E-2").unwrap(), rat(1, 4));
    }

    #[test]
    fn test_float_exponent_bounds() {
        let err = parse_float("1e100000000").unwrap_err();
        assert!(err.contains("exponent overflow"), "{}", err);
        assert!(parse_float("1e99999999999999999999999").is_err());
        assert!(parse_float("0x1p-9999999").unwrap_err().contains("exponent overflow"));
        assert!(parse_float("1e+-5").is_err());
        assert_eq!(parse_float("1e4096").unwrap().numer().to_string().len(), 4097);
    }

    #[test]
    fn test_float_hex() {
        assert_eq!(parse_float("0x1p-2").unwrap(), rat(1, 4));
        assert_eq!(parse_float("0x1.8p1").unwrap(), rat(3, 1));
        assert!(parse_float("0x1.8").is_err());
    }

    #[test]
    fn test_imaginary() {
        assert_eq!(parse_imaginary("2i").unwrap(), rat(2, 1));
        assert_eq!(parse_imaginary("0123i").unwrap(), rat(123, 1));
        assert_eq!(parse_imaginary("1.5i").unwrap(), rat(3, 2));
        assert_eq!(parse_imaginary("0x10i").unwrap(), rat(16, 1));
    }

    #[test]
    fn test_runes() {
        assert_eq!(unquote_rune("'a'").unwrap(), 97);
        assert_eq!(unquote_rune("'\\n'").unwrap(), 10);
        assert_eq!(unquote_rune("'\\''").unwrap(), 39);
        assert_eq!(unquote_rune("'\\x41'").unwrap(), 65);
        assert_eq!(unquote_rune("'\\u00e9'").unwrap(), 0xe9);
        assert_eq!(unquote_rune("'\\377'").unwrap(), 255);
        assert_eq!(unquote_rune("'世'").unwrap(), 0x4e16);
        assert!(unquote_rune("'ab'").is_err());
    }

    #[test]
    fn test_strings() {
        assert_eq!(unquote_string("\"hi\\tthere\"").unwrap(), b"hi\tthere".to_vec());
        assert_eq!(unquote_string("\"\\xff\"").unwrap(), vec![0xff]);
        assert_eq!(unquote_string("\"\\u00e9\"").unwrap(), "é".as_bytes().to_vec());
        assert_eq!(unquote_string("`a\\n\r\nb`").unwrap(), b"a\\n\nb".to_vec());
        assert!(unquote_string("\"\\q\"").is_err());
        assert!(unquote_string("\"\\uD800\"").is_err());
    }
}
