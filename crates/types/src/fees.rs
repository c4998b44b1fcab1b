//! Blob fee market arithmetic (EIP-4844 §"Gas accounting").

use alloy_primitives::U256;

use crate::constants::{
    BLOB_GASPRICE_UPDATE_FRACTION, GAS_PER_BLOB, MIN_BLOB_GASPRICE, TARGET_BLOB_GAS_PER_BLOCK,
};

/// Excess blob gas of a child block, from its parent's excess and usage.
///
/// Both inputs may come from a client under test, so the sum saturates.
pub fn calc_excess_blob_gas(parent_excess_blob_gas: u64, parent_blob_gas_used: u64) -> u64 {
    parent_excess_blob_gas
        .saturating_add(parent_blob_gas_used)
        .saturating_sub(TARGET_BLOB_GAS_PER_BLOCK)
}

/// Approximates `factor * e ** (numerator / denominator)` with a Taylor expansion.
///
/// Evaluated in 256-bit arithmetic; the result saturates at `u128::MAX`.
pub fn fake_exponential(factor: u128, numerator: u128, denominator: u128) -> u128 {
    let factor = U256::from(factor);
    let numerator = U256::from(numerator);
    let denominator = U256::from(denominator);

    // Past this the quotient no longer fits a u128.
    let ceiling = U256::from(u128::MAX).saturating_mul(denominator);

    let mut i = U256::from(1u8);
    let mut output = U256::ZERO;
    let mut numerator_accum = factor * denominator;
    while numerator_accum > U256::ZERO {
        output = output.saturating_add(numerator_accum);
        if output > ceiling {
            return u128::MAX;
        }
        numerator_accum = numerator_accum.saturating_mul(numerator) / (denominator * i);
        i += U256::from(1u8);
    }

    (output / denominator).saturating_to()
}

/// Blob base fee implied by `excess_blob_gas`.
pub fn blob_gas_price(excess_blob_gas: u64) -> u128 {
    fake_exponential(MIN_BLOB_GASPRICE, excess_blob_gas as u128, BLOB_GASPRICE_UPDATE_FRACTION)
}

/// Smallest excess blob gas (a multiple of [`GAS_PER_BLOB`]) whose blob base
/// fee reaches `price`.
pub fn min_excess_blob_gas_for_blob_gas_price(price: u128) -> u64 {
    let mut excess = 0u64;
    let mut current = MIN_BLOB_GASPRICE;
    while current < price {
        excess += GAS_PER_BLOB;
        current = blob_gas_price(excess);
    }
    excess
}

/// [`min_excess_blob_gas_for_blob_gas_price`] expressed in blobs.
pub fn min_excess_blobs_for_blob_gas_price(price: u128) -> u64 {
    min_excess_blob_gas_for_blob_gas_price(price) / GAS_PER_BLOB
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_BLOB_GAS_PER_BLOCK;

    #[test]
    fn excess_blob_gas_recurrence() {
        assert_eq!(calc_excess_blob_gas(0, 0), 0);
        assert_eq!(calc_excess_blob_gas(0, TARGET_BLOB_GAS_PER_BLOCK), 0);
        assert_eq!(calc_excess_blob_gas(0, MAX_BLOB_GAS_PER_BLOCK), 393_216);
        assert_eq!(calc_excess_blob_gas(393_216, MAX_BLOB_GAS_PER_BLOCK), 786_432);
        assert_eq!(calc_excess_blob_gas(393_216, 0), 0);
        assert_eq!(calc_excess_blob_gas(500_000, GAS_PER_BLOB), 237_856);
    }

    #[test]
    fn excess_blob_gas_saturates_on_bogus_usage() {
        let ceiling = u64::MAX - TARGET_BLOB_GAS_PER_BLOCK;
        assert_eq!(calc_excess_blob_gas(1 << 20, u64::MAX - 10), ceiling);
        assert_eq!(calc_excess_blob_gas(u64::MAX, u64::MAX), ceiling);
    }

    /// Reference vectors from the EIP-4844 test suite.
    #[test]
    fn fake_exponential_vectors() {
        let vectors: &[(u128, u128, u128, u128)] = &[
            (1, 0, 1, 1),
            (38493, 0, 1000, 38493),
            (0, 1234, 2345, 0),
            (1, 2, 1, 6),
            (1, 4, 2, 6),
            (1, 3, 1, 16),
            (1, 6, 2, 18),
            (1, 4, 1, 49),
            (1, 8, 2, 50),
            (10, 8, 2, 542),
            (11, 8, 2, 596),
            (1, 5, 1, 136),
            (1, 5, 2, 11),
            (2, 5, 2, 23),
            (1, 50000000, 2225652, 5709098764),
        ];
        for &(factor, numerator, denominator, expected) in vectors {
            assert_eq!(
                fake_exponential(factor, numerator, denominator),
                expected,
                "fake_exponential({factor}, {numerator}, {denominator})"
            );
        }
    }

    #[test]
    fn blob_gas_price_starts_at_minimum() {
        assert_eq!(blob_gas_price(0), MIN_BLOB_GASPRICE);
        assert_eq!(blob_gas_price(393_216), 1);
        assert!(blob_gas_price(10 * BLOB_GASPRICE_UPDATE_FRACTION as u64) > 1);
        assert_eq!(blob_gas_price(u64::MAX), u128::MAX);
    }

    #[test]
    fn min_excess_blobs_reaches_price() {
        assert_eq!(min_excess_blobs_for_blob_gas_price(1), 0);

        let blobs = min_excess_blobs_for_blob_gas_price(2);
        assert!(blob_gas_price(blobs * GAS_PER_BLOB) >= 2);
        assert!(blob_gas_price((blobs - 1) * GAS_PER_BLOB) < 2);
    }
}
