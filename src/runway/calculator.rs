use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::Zero;

use super::RunwayError;

/// Tokens transferred in minus tokens the schedule says were emitted. Negative when the
/// Minter has emitted more than it was funded with.
pub fn reward_debt(cumulative_filled: &BigUint, cumulative_used_up: &BigUint) -> BigInt {
    BigInt::from(cumulative_filled.clone()) - BigInt::from(cumulative_used_up.clone())
}

/// Seconds of emission left at `rate_per_second`, rounded toward negative infinity.
pub fn runway_in_seconds(
    cumulative_filled: &BigUint,
    cumulative_used_up: &BigUint,
    rate_per_second: &BigUint,
) -> Result<BigInt, RunwayError> {
    if rate_per_second.is_zero() {
        return Err(RunwayError::ZeroEmissionRate);
    }

    let remaining = reward_debt(cumulative_filled, cumulative_used_up);
    let rate = BigInt::from(rate_per_second.clone());
    Ok(remaining.div_floor(&rate))
}
