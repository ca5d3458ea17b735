//! Engine parameters shared by every notarization.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::network::Network;

/// Constants of the notarization scheme plus the few knobs a deployment may
/// tune.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotaryParams {
    /// Network the node runs on.
    pub network: Network,

    /// Amount locked in every stake output.
    pub stake: Amount,

    /// Output index carrying the data payload.
    pub data_vout: u32,

    /// Output index carrying the stake; the one re-spent by the next update.
    pub stake_vout: u32,

    /// Assumed virtual size of a three-output notarization transaction.
    pub assumed_vsize: u64,

    /// Confirmation target passed to the node's fee estimator.
    pub fee_target_blocks: u32,
}

impl NotaryParams {
    /// 0.00001111 BTC.
    pub const STAKE: Amount = Amount::from_sat(1111);

    pub const DATA_VOUT: u32 = 0;

    pub const STAKE_VOUT: u32 = 1;

    pub const ASSUMED_VSIZE: u64 = 255;

    pub const FEE_TARGET_BLOCKS: u32 = 3;

    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }
}

impl Default for NotaryParams {
    fn default() -> Self {
        Self {
            network: Network::Main,
            stake: Self::STAKE,
            data_vout: Self::DATA_VOUT,
            stake_vout: Self::STAKE_VOUT,
            assumed_vsize: Self::ASSUMED_VSIZE,
            fee_target_blocks: Self::FEE_TARGET_BLOCKS,
        }
    }
}
