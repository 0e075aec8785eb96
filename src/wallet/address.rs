//! Wallet address validation

use std::sync::OnceLock;

use alloy_primitives::Address;
use regex::Regex;

use crate::error::{Error, Result};

static ADDRESS_FORMAT: OnceLock<Regex> = OnceLock::new();

fn address_format() -> &'static Regex {
    ADDRESS_FORMAT.get_or_init(|| {
        Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("Invalid address format regex")
    })
}

/// Check that `address` is a well-formed Ethereum address
///
/// Requires the `0x` prefix and 40 hex digits. All-lowercase and
/// all-uppercase digits are accepted as-is; mixed case must match the
/// EIP-55 checksum.
pub fn is_valid_address(address: &str) -> bool {
    if !address_format().is_match(address) {
        return false;
    }

    let digits = &address[2..];
    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(address, None).is_ok();
    }

    true
}

/// Validate an address, returning it unchanged
pub fn validate_address(address: &str) -> Result<&str> {
    if is_valid_address(address) {
        Ok(address)
    } else {
        Err(Error::InvalidAddress(address.to_string()))
    }
}
