//! # KASLR Adjustment
//!
//! Translates runtime addresses back to their link-time values.
//!
//! A randomized kernel is loaded at `bias` while it was linked with its
//! first instruction (`__code_start`) at `code_start`. Every address seen at
//! runtime is therefore off by `bias - code_start`, and symbol lookups must
//! subtract that difference first. Until a kernel panic has established both
//! values the adjustment is the identity.

use crate::error::Result;
use crate::types::{Address, AddressToken};

/// Translate `value` given the observed load bias and the linked code start.
///
/// The arithmetic wraps, so a bias below the code start moves addresses up.
///
/// ```rust
/// use crashsym_core::kaslr::adjust;
/// use crashsym_core::types::Address;
///
/// let code_start = Some(Address::new(0x100));
/// let bias = Some(Address::new(0x200));
/// assert_eq!(adjust(Address::new(0x1000), code_start, bias), Address::new(0xf00));
/// assert_eq!(adjust(Address::new(0x1000), None, bias), Address::new(0x1000));
/// ```
pub fn adjust(value: Address, code_start: Option<Address>, bias: Option<Address>) -> Address
{
    match (code_start, bias) {
        (Some(code_start), Some(bias)) => value - bias.value().wrapping_sub(code_start.value()),
        _ => value,
    }
}

/// Like [`adjust`], keeping the form the value was presented in.
///
/// A hex token comes back as a hex token, a number as a number. With no
/// kernel context the token is returned untouched, even if it is not valid
/// hex.
///
/// ## Errors
///
/// Returns `InvalidHex` when an adjustment is needed and the text token
/// cannot be decoded.
pub fn adjust_token(value: &AddressToken, code_start: Option<Address>, bias: Option<Address>) -> Result<AddressToken>
{
    if code_start.is_none() || bias.is_none() {
        return Ok(value.clone());
    }

    let adjusted = adjust(value.address()?, code_start, bias);
    Ok(match value {
        AddressToken::Hex(_) => AddressToken::Hex(adjusted.to_string()),
        AddressToken::Numeric(_) => AddressToken::Numeric(adjusted),
    })
}

/// KASLR state established by a kernel panic.
///
/// `code_start` comes from the kernel symbol table, `bias` from the DSO
/// declaration the kernel prints for itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KaslrAdjuster
{
    /// Link-time address of `__code_start`.
    pub code_start: Option<Address>,
    /// Runtime load address of the kernel.
    pub bias: Option<Address>,
}

impl KaslrAdjuster
{
    /// Adjuster that leaves every value unchanged.
    pub const fn identity() -> Self
    {
        Self {
            code_start: None,
            bias: None,
        }
    }

    /// Adjust a numeric address.
    pub fn adjust(&self, value: Address) -> Address
    {
        adjust(value, self.code_start, self.bias)
    }

    /// Adjust a token, preserving its form.
    ///
    /// ## Errors
    ///
    /// See [`adjust_token`].
    pub fn adjust_token(&self, value: &AddressToken) -> Result<AddressToken>
    {
        adjust_token(value, self.code_start, self.bias)
    }

    /// Signed `bias - code_start`, when both are known.
    pub fn offset(&self) -> Option<i128>
    {
        match (self.code_start, self.bias) {
            (Some(code_start), Some(bias)) => Some(i128::from(bias.value()) - i128::from(code_start.value())),
            _ => None,
        }
    }
}

/// Render a KASLR offset as `+0x..` or `-0x..`.
pub fn format_offset(offset: i128) -> String
{
    let sign = if offset < 0 { '-' } else { '+' };
    format!("{sign}{:#x}", offset.unsigned_abs())
}
