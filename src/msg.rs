use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cosmwasm_std::Uint128;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct InstantiateMsg {
    pub platform: String,
    pub platform_fee_bps: u64,
    pub native_denom: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct PresaleParams {
    pub sale_token: String,
    pub whitelist: Option<String>,

    pub hard_cap: Uint128,
    pub price_per_token: Uint128,
    pub max_contribution: Uint128,
    pub start_time: u64,
    pub end_time: u64,
    pub whitelist_duration: u64,
    pub claim_delay: u64,
    pub initial_release_bps: u64,
    pub cliff_duration: u64,
    pub vesting_duration: u64,
    pub sweep_grace_period: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteMsg {
    TransferOwnership {
        new_owner: String,
    },
    CreateNativePresale {
        params: PresaleParams,
    },
    CreateStablePresale {
        stable_token: String,
        params: PresaleParams,
    },
    UpdatePresaleTimes {
        presale_id: u64,
        new_start_time: u64,
        new_end_time: u64,
        new_whitelist_duration: u64,
    },
    Contribute {
        presale_id: u64,
    },
    ContributeStable {
        presale_id: u64,
        amount: Uint128,
    },
    Finalize {
        presale_id: u64,
    },
    Claim {
        presale_id: u64,
    },
    RefundNative {
        presale_id: u64,
    },
    RefundStable {
        presale_id: u64,
    },
    WithdrawNativeFunds {
        presale_id: u64,
    },
    WithdrawStableFunds {
        presale_id: u64,
    },
    SweepUnclaimed {
        presale_id: u64,
        recipient: String,
    },
    RescueToken {
        token: String,
        recipient: String,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QueryMsg {
    PresaleCount {},
    PresaleSummary {
        presale_id: u64,
    },
    ContributionOf {
        presale_id: u64,
        user: String,
    },
    ClaimableOf {
        presale_id: u64,
        user: String,
    },
    ClaimedOf {
        presale_id: u64,
        user: String,
    },
    NativeBalance {
        presale_id: u64,
    },
    StableBalance {
        presale_id: u64,
    },
}

// Query interface of the external whitelist registry.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WhitelistQueryMsg {
    IsWhitelisted { user: String },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct IsWhitelistedResponse {
    pub whitelisted: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct PresaleCountResponse {
    pub count: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct AmountResponse {
    pub amount: Uint128,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct SummaryResponse {
    pub presale_id: u64,
    pub sale_token: String,
    pub stable_token: Option<String>,
    pub whitelist: Option<String>,

    pub hard_cap: Uint128,
    pub price_per_token: Uint128,
    pub max_contribution: Uint128,
    pub start_time: u64,
    pub end_time: u64,
    pub whitelist_duration: u64,
    pub claim_delay: u64,
    pub sweep_grace_period: u64,
    pub token_decimals: u8,
    pub stable_decimals: u8,
    pub tokens_needed: Uint128,
    pub initial_release_bps: u64,
    pub cliff_duration: u64,
    pub vesting_duration: u64,

    pub total_raised: Uint128,
    pub native_balance: Uint128,
    pub stable_balance: Uint128,
    pub finalized: bool,
    pub claim_time: u64,
}
