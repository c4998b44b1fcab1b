//! Protocol constants shared across cobalt crates.
//!
//! Values follow EIP-4844 (Cancun) and the Engine API error-code table.

/// Number of field elements in a single blob.
pub const FIELD_ELEMENTS_PER_BLOB: usize = 4096;

/// Size of one serialized field element.
pub const BYTES_PER_FIELD_ELEMENT: usize = 32;

/// Blob gas consumed by a single blob.
pub const GAS_PER_BLOB: u64 = 0x20000;

/// Blob gas a block is expected to consume on average.
pub const TARGET_BLOB_GAS_PER_BLOCK: u64 = 393_216;

/// Upper bound on blob gas a single block may consume.
pub const MAX_BLOB_GAS_PER_BLOCK: u64 = 786_432;

/// `TARGET_BLOB_GAS_PER_BLOCK / GAS_PER_BLOB`.
pub const TARGET_BLOBS_PER_BLOCK: u64 = TARGET_BLOB_GAS_PER_BLOCK / GAS_PER_BLOB;

/// `MAX_BLOB_GAS_PER_BLOCK / GAS_PER_BLOB`.
pub const MAX_BLOBS_PER_BLOCK: u64 = MAX_BLOB_GAS_PER_BLOCK / GAS_PER_BLOB;

/// Floor of the blob base fee, in wei.
pub const MIN_BLOB_GASPRICE: u128 = 1;

/// Denominator of the exponential blob base fee update.
pub const BLOB_GASPRICE_UPDATE_FRACTION: u128 = 3_338_477;

/// Version byte prefixed to KZG versioned hashes.
pub const BLOB_COMMITMENT_VERSION_KZG: u8 = 0x01;

/// Recipient of the synthetic blob transactions: the first address of the
/// BLOBHASH probing range.
pub const DATAHASH_START_ADDRESS: u64 = 0x100;

/// Gas limit attached to synthetic blob transactions.
pub const BLOB_TX_GAS_LIMIT: u64 = 100_000;

/// Engine API: the request parameters were malformed.
pub const INVALID_PARAMS_ERROR: i64 = -32602;

/// Engine API: the payload's timestamp belongs to a different fork than the
/// method version targets.
pub const UNSUPPORTED_FORK_ERROR: i64 = -38005;

/// Engine API: the requested payload id is not known to the client.
pub const UNKNOWN_PAYLOAD_ERROR: i64 = -38001;

#[cfg(test)]
mod tests {
    use super::*;

    /// Derived blob counts must agree with the gas constants.
    #[test]
    fn blob_counts_follow_gas_limits() {
        assert_eq!(TARGET_BLOBS_PER_BLOCK, 3);
        assert_eq!(MAX_BLOBS_PER_BLOCK, 6);
        assert_eq!(FIELD_ELEMENTS_PER_BLOB * BYTES_PER_FIELD_ELEMENT, 131_072);
    }
}
