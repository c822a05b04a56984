//! Address types.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::error::SymbolizeError;

/// Strongly typed address or offset taken from a backtrace line
///
/// Backtrace lines mix program counters, stack pointers, DSO offsets and
/// load biases, all of them plain hex numbers. The newtype keeps them apart
/// from frame numbers and byte counts.
///
/// ## Example
///
/// ```rust
/// use crashsym_core::types::Address;
///
/// let addr: Address = "0x1000".parse()?;
/// assert_eq!(addr.value(), 0x1000);
/// assert_eq!(addr.to_string(), "0x1000");
/// # Ok::<(), crashsym_core::error::SymbolizeError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Parse a hex token, with or without a `0x` prefix.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidHex` when the token is empty or contains non-hex digits.
    pub fn from_hex(token: &str) -> Result<Self, SymbolizeError>
    {
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        u64::from_str_radix(digits, 16)
            .map(Address)
            .map_err(|_| SymbolizeError::InvalidHex(token.to_string()))
    }

    /// Address of the call instruction for a return address.
    ///
    /// A return address points just past the call; one byte back lands
    /// inside the call instruction itself, which is what line tables and
    /// inline chains should be queried with.
    ///
    /// ```rust
    /// use crashsym_core::types::Address;
    ///
    /// assert_eq!(Address::new(0x1000).call_site(), Address::new(0xfff));
    /// assert_eq!(Address::ZERO.call_site(), Address::ZERO);
    /// ```
    #[must_use]
    pub const fn call_site(self) -> Self
    {
        Address(self.0.saturating_sub(1))
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl FromStr for Address
{
    type Err = SymbolizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        Address::from_hex(s)
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}

/// An address as it was presented by the caller
///
/// Some values reach the KASLR adjuster straight from a regex capture (a
/// hex token), others after arithmetic (a number). Adjusting a value keeps
/// the form it came in, so callers never guess whether they get text back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressToken
{
    /// A hexadecimal text token such as `0x1000`
    Hex(String),
    /// An already decoded number
    Numeric(Address),
}

impl AddressToken
{
    /// Decode the token into an address.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidHex` for a malformed text token.
    pub fn address(&self) -> Result<Address, SymbolizeError>
    {
        match self {
            AddressToken::Hex(text) => Address::from_hex(text),
            AddressToken::Numeric(address) => Ok(*address),
        }
    }
}

impl From<Address> for AddressToken
{
    fn from(address: Address) -> Self
    {
        AddressToken::Numeric(address)
    }
}

impl From<&str> for AddressToken
{
    fn from(text: &str) -> Self
    {
        AddressToken::Hex(text.to_string())
    }
}

impl fmt::Display for AddressToken
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            AddressToken::Hex(text) => f.write_str(text),
            AddressToken::Numeric(address) => write!(f, "{address}"),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_from_hex_accepts_prefix_and_bare_digits()
    {
        assert_eq!(Address::from_hex("0x1f").unwrap(), Address::new(0x1f));
        assert_eq!(Address::from_hex("ffffffff80100000").unwrap(), Address::new(0xffff_ffff_8010_0000));
        assert!(Address::from_hex("0x").is_err());
        assert!(Address::from_hex("zz").is_err());
    }

    #[test]
    fn test_display_is_unpadded_lowercase()
    {
        assert_eq!(Address::new(0xF00).to_string(), "0xf00");
        assert_eq!(Address::ZERO.to_string(), "0x0");
    }

    #[test]
    fn test_token_keeps_hex_text()
    {
        let token = AddressToken::from("0x10");
        assert_eq!(token.address().unwrap(), Address::new(0x10));
        assert_eq!(token.to_string(), "0x10");
    }
}
