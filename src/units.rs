use bigdecimal::BigDecimal;
use num_bigint::{BigInt, BigUint};

/// Scale a raw token amount by the token's decimals for display.
pub fn format_units(amount: &BigUint, decimals: u8) -> BigDecimal {
    format_signed_units(&BigInt::from(amount.clone()), decimals)
}

pub fn format_signed_units(amount: &BigInt, decimals: u8) -> BigDecimal {
    BigDecimal::new(amount.clone(), decimals as i64)
}
