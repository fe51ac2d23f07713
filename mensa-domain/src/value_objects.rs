//! Value Objects for the Mensa Domain
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::entities::UserId;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Address length out of bounds
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Phone does not match the accepted format
    #[error("Invalid phone: {0}")]
    InvalidPhone(String),

    /// Count out of bounds
    #[error("Invalid count: {0}")]
    InvalidCount(String),

    /// Currency code is not a three-letter ISO code
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    /// Order token is empty or too long
    #[error("Invalid order token: {0}")]
    InvalidToken(String),

    /// Idempotency key is empty, too long, or not printable
    #[error("Invalid idempotency key: {0}")]
    InvalidIdempotencyKey(String),

    /// Idempotency scope could not be parsed
    #[error("Invalid idempotency scope: {0}")]
    InvalidScope(String),

    /// Unknown order status string
    #[error("Invalid order status: {0}")]
    InvalidStatus(String),

    /// A price sheet lacks an item the order refers to
    #[error("Item {0} is missing from the price sheet")]
    MissingPrice(i64),

    /// An order must carry between 1 and 100 positions
    #[error("Invalid position count: {0}")]
    InvalidPositionCount(usize),
}

// =============================================================================
// Address
// =============================================================================

/// Delivery address
///
/// # Invariants
/// - Between 5 and 255 characters (after trimming)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Minimum address length in characters
    pub const MIN_LEN: usize = 5;
    /// Maximum address length in characters
    pub const MAX_LEN: usize = 255;

    /// Create a new Address with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidAddress` if the trimmed length is outside 5..=255
    pub fn new(value: &str) -> Result<Self, DomainError> {
        let trimmed = value.trim();
        let len = trimmed.chars().count();
        if !(Self::MIN_LEN..=Self::MAX_LEN).contains(&len) {
            return Err(DomainError::InvalidAddress(format!(
                "must be between {} and {} characters",
                Self::MIN_LEN,
                Self::MAX_LEN
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the address as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Phone
// =============================================================================

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[0-9]{6,20}$").expect("Invalid phone regex"));

/// Contact phone in `+<digits>` form
///
/// # Invariants
/// - Leading `+` followed by 6 to 20 digits, nothing else (after trimming)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phone(String);

impl Phone {
    /// Create a new Phone with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPhone` if the trimmed value does not match `+` and 6-20 digits
    pub fn new(value: &str) -> Result<Self, DomainError> {
        let value = value.trim();
        if !PHONE_RE.is_match(value) {
            return Err(DomainError::InvalidPhone(
                "must be a '+' followed by 6 to 20 digits".to_string(),
            ));
        }
        Ok(Self(value.to_string()))
    }

    /// Get the phone as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Count
// =============================================================================

/// Ordered quantity of a single menu item
///
/// # Invariants
/// - Between 1 and 100 inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Count(u8);

impl Count {
    /// Smallest accepted count
    pub const MIN: i64 = 1;
    /// Largest accepted count
    pub const MAX: i64 = 100;

    /// Create a new Count with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidCount` if value is outside 1..=100
    pub fn new(value: i64) -> Result<Self, DomainError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(DomainError::InvalidCount(format!(
                "must be between {} and {}",
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(value as u8))
    }

    /// Get the count as an integer
    pub fn get(&self) -> i32 {
        i32::from(self.0)
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Currency
// =============================================================================

/// ISO 4217 currency code (e.g., EUR, USD)
///
/// # Invariants
/// - Exactly three uppercase ASCII letters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency([u8; 3]);

impl Currency {
    /// Euro, the default base currency
    pub const EUR: Currency = Currency(*b"EUR");
    /// US dollar, the default reporting currency
    pub const USD: Currency = Currency(*b"USD");

    /// Parse a currency code (case-insensitive)
    ///
    /// # Errors
    /// Returns `DomainError::InvalidCurrency` if the code is not three ASCII letters
    pub fn new(code: &str) -> Result<Self, DomainError> {
        let upper = code.trim().to_ascii_uppercase();
        let bytes = upper.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_uppercase) {
            return Err(DomainError::InvalidCurrency(code.to_string()));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2]]))
    }

    /// Get the code as a string slice
    pub fn code(&self) -> &str {
        // Always three ASCII letters, see `new`
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// OrderToken
// =============================================================================

/// Opaque client-facing order token
///
/// Generated from the OS random source at order creation and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderToken(String);

impl OrderToken {
    /// Random bytes per token (encodes to 40 base64 characters)
    const RANDOM_BYTES: usize = 30;
    /// Longest token accepted when parsing
    const MAX_LEN: usize = 128;

    /// Generate a fresh, unguessable token
    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::RANDOM_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wrap a previously stored or client-supplied token
    ///
    /// # Errors
    /// Returns `DomainError::InvalidToken` if empty or longer than 128 characters
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        if value.is_empty() || value.len() > Self::MAX_LEN {
            return Err(DomainError::InvalidToken(format!(
                "length must be between 1 and {}",
                Self::MAX_LEN
            )));
        }
        Ok(Self(value.to_string()))
    }

    /// Get the token as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Idempotency
// =============================================================================

/// Client-supplied idempotency key (the `Idempotency-Key` header)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Longest key accepted
    pub const MAX_LEN: usize = 255;

    /// Create a new IdempotencyKey with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidIdempotencyKey` if empty, longer than 255 bytes,
    /// or containing non-printable characters
    pub fn new(value: &str) -> Result<Self, DomainError> {
        let value = value.trim();
        if value.is_empty() || value.len() > Self::MAX_LEN {
            return Err(DomainError::InvalidIdempotencyKey(format!(
                "length must be between 1 and {}",
                Self::MAX_LEN
            )));
        }
        if !value.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
            return Err(DomainError::InvalidIdempotencyKey(
                "must contain printable ASCII only".to_string(),
            ));
        }
        Ok(Self(value.to_string()))
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Namespace an idempotency key lives in
///
/// Keys from an identified caller never collide with anonymous keys or
/// with another caller's keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdempotencyScope {
    /// Keys supplied by an identified caller
    User(UserId),
    /// Keys supplied anonymously
    Global,
}

impl IdempotencyScope {
    /// Scope for an optional caller
    pub fn for_caller(user_id: Option<UserId>) -> Self {
        match user_id {
            Some(id) => IdempotencyScope::User(id),
            None => IdempotencyScope::Global,
        }
    }
}

impl fmt::Display for IdempotencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdempotencyScope::User(id) => write!(f, "user:{}", id),
            IdempotencyScope::Global => write!(f, "global"),
        }
    }
}

impl FromStr for IdempotencyScope {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "global" {
            return Ok(IdempotencyScope::Global);
        }
        s.strip_prefix("user:")
            .and_then(|id| id.parse::<UserId>().ok())
            .map(IdempotencyScope::User)
            .ok_or_else(|| DomainError::InvalidScope(s.to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_bounds() {
        assert!(Address::new("Some address").is_ok());
        assert!(Address::new("abcde").is_ok());
        assert!(Address::new("abcd").is_err());
        assert!(Address::new("").is_err());
        assert!(Address::new(&"a".repeat(255)).is_ok());
        assert!(Address::new(&"a".repeat(256)).is_err());
    }

    #[test]
    fn test_address_counts_characters_not_bytes() {
        // 5 characters, 10 bytes
        let address = Address::new("ÄÖÜßé").unwrap();
        assert_eq!(address.as_str().chars().count(), 5);
    }

    #[test]
    fn test_address_is_trimmed() {
        let address = Address::new("  Main St 1  ").unwrap();
        assert_eq!(address.as_str(), "Main St 1");
        assert!(Address::new("   ab   ").is_err());
    }

    #[test]
    fn test_phone_format() {
        assert!(Phone::new("+7955441112").is_ok());
        assert!(Phone::new("+123456").is_ok());
        assert!(Phone::new(&format!("+{}", "1".repeat(20))).is_ok());

        assert!(Phone::new("+99").is_err());
        assert!(Phone::new("").is_err());
        assert!(Phone::new("7955441112").is_err());
        assert!(Phone::new(&format!("+{}", "1".repeat(21))).is_err());
        assert!(Phone::new("call +7955441112").is_err());
        assert!(Phone::new("+7955 441112").is_err());
    }

    #[test]
    fn test_phone_is_trimmed() {
        let phone = Phone::new("  +7955441112 ").unwrap();
        assert_eq!(phone.as_str(), "+7955441112");
        assert!(Phone::new(" +99 ").is_err());
    }

    #[test]
    fn test_count_bounds() {
        assert_eq!(Count::new(1).unwrap().get(), 1);
        assert_eq!(Count::new(100).unwrap().get(), 100);
        assert!(Count::new(0).is_err());
        assert!(Count::new(101).is_err());
        assert!(Count::new(-3).is_err());
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!(Currency::new("eur").unwrap(), Currency::EUR);
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::USD);
        assert_eq!(Currency::USD.to_string(), "USD");
        assert!(Currency::new("EURO").is_err());
        assert!(Currency::new("E1R").is_err());
    }

    #[test]
    fn test_token_generation_is_unique_and_opaque() {
        let a = OrderToken::generate();
        let b = OrderToken::generate();

        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 40);
        assert!(a
            .as_str()
            .bytes()
            .all(|c| c.is_ascii_alphanumeric() || c == b'-' || c == b'_'));
    }

    #[test]
    fn test_token_parse() {
        assert!(OrderToken::parse("abc").is_ok());
        assert!(OrderToken::parse("").is_err());
        assert!(OrderToken::parse(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_idempotency_key_validation() {
        assert_eq!(IdempotencyKey::new(" 1 ").unwrap().as_str(), "1");
        assert!(IdempotencyKey::new("").is_err());
        assert!(IdempotencyKey::new(&"k".repeat(256)).is_err());
        assert!(IdempotencyKey::new("bad\u{7}key").is_err());
    }

    #[test]
    fn test_scope_roundtrip() {
        assert_eq!(IdempotencyScope::for_caller(None), IdempotencyScope::Global);
        assert_eq!(IdempotencyScope::for_caller(Some(7)).to_string(), "user:7");
        assert_eq!("user:7".parse::<IdempotencyScope>().unwrap(), IdempotencyScope::User(7));
        assert_eq!("global".parse::<IdempotencyScope>().unwrap(), IdempotencyScope::Global);
        assert!("user:x".parse::<IdempotencyScope>().is_err());
    }
}
