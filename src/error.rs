use cosmwasm_std::{OverflowError, StdError, Uint128};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Overflow(#[from] OverflowError),

    #[error("unauthorized")]
    Unauthorized {},

    #[error("presale {presale_id} not found")]
    PresaleNotFound { presale_id: u64 },

    #[error("price per token must be nonzero")]
    ZeroPrice {},

    #[error("hard cap must be nonzero")]
    ZeroHardCap {},

    #[error("basis points {bps} exceed 10000")]
    InvalidBps { bps: u64 },

    #[error("end time must come after start time")]
    InvalidTimes {},

    #[error("whitelist window exceeds sale duration")]
    WhitelistWindowTooLong {},

    #[error("presale {presale_id} is not accepting contributions")]
    SaleInactive { presale_id: u64 },

    #[error("presale {presale_id} is still in progress")]
    SaleInProgress { presale_id: u64 },

    #[error("{user} is not whitelisted")]
    NotWhitelisted { user: String },

    #[error("hard cap of presale {presale_id} reached")]
    HardCapReached { presale_id: u64 },

    #[error("contribution would exceed the per-user maximum of {max}")]
    MaxContributionExceeded { max: Uint128 },

    #[error("presale {presale_id} already finalized")]
    AlreadyFinalized { presale_id: u64 },

    #[error("presale {presale_id} not finalized")]
    NotFinalized { presale_id: u64 },

    #[error("presale {presale_id} did not reach its hard cap")]
    CapNotReached { presale_id: u64 },

    #[error("claims for presale {presale_id} open at {claim_time}")]
    ClaimNotOpen { presale_id: u64, claim_time: u64 },

    #[error("nothing to claim")]
    NothingToClaim {},

    #[error("no contribution recorded")]
    NoContribution {},

    #[error("contribution amount must be nonzero")]
    ZeroAmount {},

    #[error("expected funds in {denom}")]
    NoFunds { denom: String },

    #[error("settlement currency mismatch")]
    WrongCurrency {},

    #[error("no funds to withdraw")]
    NothingToWithdraw {},

    #[error("sweep locked until {available_at}")]
    SweepTooEarly { available_at: u64 },

    #[error("cannot rescue a token backing a presale")]
    CannotRescueSaleToken {},
}
