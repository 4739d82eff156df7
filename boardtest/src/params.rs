//! Parsing of numeric probe arguments.
//!
//! Arguments arrive as operator-typed strings. Most accept the C integer
//! prefixes (`0x` hex, leading `0` octal, otherwise decimal); the I2C
//! arguments are always hexadecimal. Trailing garbage is an error rather
//! than being silently dropped.

/// Why an argument was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("'{0}' is not a hexadecimal number")]
    NotHex(String),

    #[error("{what} {value} is outside {min}..={max}")]
    OutOfRange {
        what: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("expected value '{0}' must have 2 or 4 hex digits")]
    BadWidth(String),
}

fn strip_hex_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

/// Parse an unsigned integer with C prefix rules.
pub fn parse_int(s: &str) -> Result<u64, ParamError> {
    let s = s.trim();
    let not_a_number = || ParamError::NotANumber(s.to_string());

    let (digits, radix) = if let Some(hex) = strip_hex_prefix(s) {
        (hex, 16)
    } else if s.len() > 1 && s.starts_with('0') {
        (&s[1..], 8)
    } else {
        (s, 10)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(not_a_number());
    }
    u64::from_str_radix(digits, radix).map_err(|_| not_a_number())
}

/// Parse a hexadecimal number, with or without `0x`.
pub fn parse_hex(s: &str) -> Result<u64, ParamError> {
    let s = s.trim();
    let digits = strip_hex_prefix(s).unwrap_or(s);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ParamError::NotHex(s.to_string()));
    }
    u64::from_str_radix(digits, 16).map_err(|_| ParamError::NotHex(s.to_string()))
}

/// Check that `value` lies in `min..=max`.
pub fn in_range(what: &'static str, value: u64, min: u64, max: u64) -> Result<u64, ParamError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ParamError::OutOfRange {
            what,
            value,
            min,
            max,
        })
    }
}

/// Number of bytes read from an I2C register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterWidth {
    Byte,
    /// Two bytes, most significant first
    Word,
}

impl RegisterWidth {
    pub fn bytes(self) -> usize {
        match self {
            RegisterWidth::Byte => 1,
            RegisterWidth::Word => 2,
        }
    }
}

/// An expected I2C register value.
///
/// The operator picks the read width by how many characters they type,
/// prefix included: `aa` reads one byte, while `00aa` and `0xaa` both read
/// two. Test scripts written for the board pass four characters to read a
/// word, so a `0x` prefix counts toward the width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedRegister {
    pub value: u16,
    pub width: RegisterWidth,
}

impl std::str::FromStr for ExpectedRegister {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let width = match s.len() {
            2 => RegisterWidth::Byte,
            4 => RegisterWidth::Word,
            _ => return Err(ParamError::BadWidth(s.to_string())),
        };
        let value = parse_hex(s)? as u16;
        Ok(Self { value, width })
    }
}
