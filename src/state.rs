use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cosmwasm_std::{CanonicalAddr, Uint128};
use cw_storage_plus::{Item, Map};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Config {
    // Owner address
    pub owner: CanonicalAddr,
    // Recipient of the platform fee share
    pub platform: CanonicalAddr,
    // Platform fee in basis points
    pub platform_fee_bps: u64,
    // Native denom accepted by native-settled presales
    pub native_denom: String,
}

// Exactly one settlement currency per presale.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SettlementMode {
    Native {},
    Stable { token: CanonicalAddr },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Presale {
    /************** Address Infos *************/
    // Token being sold, escrowed at creation.
    pub sale_token: CanonicalAddr,
    // Settlement currency for contributions.
    pub mode: SettlementMode,
    // Membership registry consulted during the whitelist window.
    pub whitelist: Option<CanonicalAddr>,

    /************** Sale Params *************/
    // Maximum total raise, in settlement smallest units.
    pub hard_cap: Uint128,
    // Settlement smallest units per whole sale token.
    pub price_per_token: Uint128,
    // Per-user cumulative contribution limit.
    pub max_contribution: Uint128,
    pub start_time: u64,
    pub end_time: u64,
    // Seconds after start_time during which the whitelist applies.
    pub whitelist_duration: u64,
    // Seconds between finalization and the start of claims.
    pub claim_delay: u64,
    // Seconds past the vesting horizon before the owner may sweep.
    pub sweep_grace_period: u64,
    pub token_decimals: u8,
    pub stable_decimals: u8,
    // Sale-token amount escrowed at creation.
    pub tokens_needed: Uint128,

    /************** Vesting Params *************/
    // Fraction released at claim start, in basis points.
    pub initial_release_bps: u64,
    pub cliff_duration: u64,
    pub vesting_duration: u64,

    /************** Status Info *************/
    pub total_raised: Uint128,
    pub native_balance: Uint128,
    pub stable_balance: Uint128,
    // One-way flag; claim_time is fixed when it flips.
    pub finalized: bool,
    // 0 until finalized.
    pub claim_time: u64,
}

pub const CONFIG: Item<Config> = Item::new("config");

pub const PRESALE_COUNT: Item<u64> = Item::new("presale_count");

pub const PRESALES: Map<u64, Presale> = Map::new("presales");

pub const CONTRIBUTIONS: Map<(u64, String), Uint128> = Map::new("contributions");

pub const CLAIMED: Map<(u64, String), Uint128> = Map::new("claimed");

pub const REFUNDED: Map<(u64, String), bool> = Map::new("refunded");

pub const MAX_BPS: u64 = 10000;

pub const DEFAULT_DECIMALS: u8 = 18;
