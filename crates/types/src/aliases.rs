pub type U256 = alloy_primitives::U256;
pub type B256 = alloy_primitives::B256;
pub type Address = alloy_primitives::Address;
pub type Bloom = alloy_primitives::Bloom;
pub type Bytes = alloy_primitives::Bytes;

pub type BlockHash = alloy_primitives::BlockHash;
pub type BlockTimestamp = alloy_primitives::BlockTimestamp;
pub type TxHash = alloy_primitives::TxHash;
pub type VersionedHash = alloy_primitives::B256;

pub type TxEnvelope = alloy_consensus::TxEnvelope;
pub type Withdrawal = alloy_eips::eip4895::Withdrawal;
