#[cfg(not(feature = "library"))]
use cosmwasm_std::entry_point;
use cosmwasm_std::{
    attr, coins, to_binary, Addr, Api, Attribute, BankMsg, Binary, CosmosMsg, Deps, DepsMut, Env,
    MessageInfo, Order, QueryRequest, Response, StdResult, Storage, Uint128, WasmMsg, WasmQuery,
};
use cw2::set_contract_version;
use cw20::{BalanceResponse, Cw20ExecuteMsg, Cw20QueryMsg, TokenInfoResponse};

use crate::error::ContractError;
use crate::msg::{
    AmountResponse, ExecuteMsg, InstantiateMsg, IsWhitelistedResponse, PresaleCountResponse,
    PresaleParams, QueryMsg, SummaryResponse, WhitelistQueryMsg,
};
use crate::state::{
    Config, Presale, SettlementMode, CLAIMED, CONFIG, CONTRIBUTIONS, DEFAULT_DECIMALS, MAX_BPS,
    PRESALES, PRESALE_COUNT, REFUNDED,
};
use crate::vesting;

const CONTRACT_NAME: &str = "crates.io:presale-engine";
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    if msg.platform_fee_bps > MAX_BPS {
        return Err(ContractError::InvalidBps {
            bps: msg.platform_fee_bps,
        });
    }

    let config = Config {
        owner: deps.api.addr_canonicalize(info.sender.as_str())?,
        platform: deps.api.addr_canonicalize(&msg.platform)?,
        platform_fee_bps: msg.platform_fee_bps,
        native_denom: msg.native_denom,
    };

    CONFIG.save(deps.storage, &config)?;
    PRESALE_COUNT.save(deps.storage, &0u64)?;

    Ok(Response::new())
}

/************************************ Execution *************************************/

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        ExecuteMsg::TransferOwnership { new_owner } => {
            execute_transfer_ownership(deps, info, new_owner)
        }
        ExecuteMsg::CreateNativePresale { params } => {
            execute_create_presale(deps, env, info, params, None)
        }
        ExecuteMsg::CreateStablePresale {
            stable_token,
            params,
        } => execute_create_presale(deps, env, info, params, Some(stable_token)),
        ExecuteMsg::UpdatePresaleTimes {
            presale_id,
            new_start_time,
            new_end_time,
            new_whitelist_duration,
        } => execute_update_times(
            deps,
            info,
            presale_id,
            new_start_time,
            new_end_time,
            new_whitelist_duration,
        ),
        ExecuteMsg::Contribute { presale_id } => {
            execute_contribute_native(deps, env, info, presale_id)
        }
        ExecuteMsg::ContributeStable { presale_id, amount } => {
            execute_contribute_stable(deps, env, info, presale_id, amount)
        }
        ExecuteMsg::Finalize { presale_id } => execute_finalize(deps, env, presale_id),
        ExecuteMsg::Claim { presale_id } => execute_claim(deps, env, info, presale_id),
        ExecuteMsg::RefundNative { presale_id } => {
            execute_refund(deps, env, info, presale_id, false)
        }
        ExecuteMsg::RefundStable { presale_id } => {
            execute_refund(deps, env, info, presale_id, true)
        }
        ExecuteMsg::WithdrawNativeFunds { presale_id } => {
            execute_withdraw_funds(deps, info, presale_id, false)
        }
        ExecuteMsg::WithdrawStableFunds { presale_id } => {
            execute_withdraw_funds(deps, info, presale_id, true)
        }
        ExecuteMsg::SweepUnclaimed {
            presale_id,
            recipient,
        } => execute_sweep_unclaimed(deps, env, info, presale_id, recipient),
        ExecuteMsg::RescueToken { token, recipient } => {
            execute_rescue_token(deps, env, info, token, recipient)
        }
    }
}

pub fn execute_transfer_ownership(
    deps: DepsMut,
    info: MessageInfo,
    new_owner: String,
) -> Result<Response, ContractError> {
    assert_owner(deps.storage, deps.api, &info.sender)?;

    let new_owner = deps.api.addr_canonicalize(new_owner.as_str())?;
    let mut config = CONFIG.load(deps.storage)?;

    config.owner = new_owner;
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new().add_attribute("method", "transfer_ownership"))
}

pub fn execute_create_presale(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    params: PresaleParams,
    stable_token: Option<String>,
) -> Result<Response, ContractError> {
    assert_owner(deps.storage, deps.api, &info.sender)?;

    if params.price_per_token.is_zero() {
        return Err(ContractError::ZeroPrice {});
    }
    if params.hard_cap.is_zero() {
        return Err(ContractError::ZeroHardCap {});
    }
    if params.initial_release_bps > MAX_BPS {
        return Err(ContractError::InvalidBps {
            bps: params.initial_release_bps,
        });
    }
    if params.end_time <= params.start_time {
        return Err(ContractError::InvalidTimes {});
    }
    if params.whitelist_duration > params.end_time - params.start_time {
        return Err(ContractError::WhitelistWindowTooLong {});
    }

    let sale_token = deps.api.addr_validate(&params.sale_token)?;
    let token_decimals = query_token_decimals(&deps, &sale_token);

    let (mode, stable_decimals) = match stable_token {
        Some(addr) => {
            let stable = deps.api.addr_validate(&addr)?;
            let decimals = query_token_decimals(&deps, &stable);
            let token = deps.api.addr_canonicalize(stable.as_str())?;
            (SettlementMode::Stable { token }, decimals)
        }
        None => (SettlementMode::Native {}, DEFAULT_DECIMALS),
    };

    let whitelist = match &params.whitelist {
        Some(addr) => Some(deps.api.addr_canonicalize(addr.as_str())?),
        None => None,
    };

    let tokens_needed =
        vesting::token_allocation(params.hard_cap, params.price_per_token, token_decimals)?;

    let presale_id = PRESALE_COUNT.load(deps.storage)?;
    let presale = Presale {
        sale_token: deps.api.addr_canonicalize(sale_token.as_str())?,
        mode: mode.clone(),
        whitelist,
        hard_cap: params.hard_cap,
        price_per_token: params.price_per_token,
        max_contribution: params.max_contribution,
        start_time: params.start_time,
        end_time: params.end_time,
        whitelist_duration: params.whitelist_duration,
        claim_delay: params.claim_delay,
        sweep_grace_period: params.sweep_grace_period,
        token_decimals,
        stable_decimals,
        tokens_needed,
        initial_release_bps: params.initial_release_bps,
        cliff_duration: params.cliff_duration,
        vesting_duration: params.vesting_duration,
        total_raised: Uint128::zero(),
        native_balance: Uint128::zero(),
        stable_balance: Uint128::zero(),
        finalized: false,
        claim_time: 0,
    };

    PRESALES.save(deps.storage, presale_id, &presale)?;
    PRESALE_COUNT.save(deps.storage, &(presale_id + 1))?;

    // escrow the full allocation before the sale can accept anything
    let escrow = CosmosMsg::Wasm(WasmMsg::Execute {
        contract_addr: sale_token.to_string(),
        msg: to_binary(&Cw20ExecuteMsg::TransferFrom {
            owner: info.sender.to_string(),
            recipient: env.contract.address.to_string(),
            amount: tokens_needed,
        })?,
        funds: vec![],
    });

    Ok(Response::new()
        .add_message(escrow)
        .add_attribute("method", "create_presale")
        .add_attribute("presale_id", presale_id.to_string())
        .add_attribute("currency", currency_label(&mode))
        .add_attribute("tokens_needed", tokens_needed))
}

pub fn execute_update_times(
    deps: DepsMut,
    info: MessageInfo,
    presale_id: u64,
    new_start_time: u64,
    new_end_time: u64,
    new_whitelist_duration: u64,
) -> Result<Response, ContractError> {
    assert_owner(deps.storage, deps.api, &info.sender)?;

    let mut presale = load_presale(deps.storage, presale_id)?;
    if presale.finalized {
        return Err(ContractError::AlreadyFinalized { presale_id });
    }
    if new_end_time <= new_start_time {
        return Err(ContractError::InvalidTimes {});
    }
    if new_whitelist_duration > new_end_time - new_start_time {
        return Err(ContractError::WhitelistWindowTooLong {});
    }

    presale.start_time = new_start_time;
    presale.end_time = new_end_time;
    presale.whitelist_duration = new_whitelist_duration;
    PRESALES.save(deps.storage, presale_id, &presale)?;

    Ok(Response::new()
        .add_attribute("method", "update_presale_times")
        .add_attribute("presale_id", presale_id.to_string()))
}

pub fn execute_contribute_native(
    mut deps: DepsMut,
    env: Env,
    info: MessageInfo,
    presale_id: u64,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut presale = load_presale(deps.storage, presale_id)?;

    if !matches!(presale.mode, SettlementMode::Native {}) {
        return Err(ContractError::WrongCurrency {});
    }

    let requested = native_payment(&info, &config.native_denom)?;
    let now = env.block.time.seconds();

    let accepted =
        apply_contribution(&mut deps, now, presale_id, &mut presale, &info.sender, requested)?;
    presale.native_balance = presale.native_balance.checked_add(accepted)?;

    let mut messages: Vec<CosmosMsg> = vec![];
    let mut attrs = vec![
        attr("method", "contribute"),
        attr("presale_id", presale_id.to_string()),
        attr("contributor", info.sender.as_str()),
        attr("currency", "native"),
        attr("accepted", accepted),
    ];

    // anything above the accepted amount goes straight back to the sender;
    // if that send fails the whole contribution fails with it
    let excess = requested.checked_sub(accepted)?;
    if !excess.is_zero() {
        messages.push(CosmosMsg::Bank(BankMsg::Send {
            to_address: info.sender.to_string(),
            amount: coins(excess.u128(), &config.native_denom),
        }));
        attrs.push(attr("returned", excess));
    }

    if presale.total_raised >= presale.hard_cap {
        let (msgs, fin_attrs) = settle_presale(deps.api, &config, &mut presale, presale_id, now)?;
        messages.extend(msgs);
        attrs.extend(fin_attrs);
    }

    PRESALES.save(deps.storage, presale_id, &presale)?;

    Ok(Response::new().add_messages(messages).add_attributes(attrs))
}

pub fn execute_contribute_stable(
    mut deps: DepsMut,
    env: Env,
    info: MessageInfo,
    presale_id: u64,
    amount: Uint128,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut presale = load_presale(deps.storage, presale_id)?;

    let stable = match &presale.mode {
        SettlementMode::Stable { token } => deps.api.addr_humanize(token)?,
        SettlementMode::Native {} => return Err(ContractError::WrongCurrency {}),
    };
    if amount.is_zero() {
        return Err(ContractError::ZeroAmount {});
    }

    let now = env.block.time.seconds();
    let accepted =
        apply_contribution(&mut deps, now, presale_id, &mut presale, &info.sender, amount)?;
    presale.stable_balance = presale.stable_balance.checked_add(accepted)?;

    // pull only the accepted amount; the contributor keeps any approved excess
    let mut messages = vec![CosmosMsg::Wasm(WasmMsg::Execute {
        contract_addr: stable.to_string(),
        msg: to_binary(&Cw20ExecuteMsg::TransferFrom {
            owner: info.sender.to_string(),
            recipient: env.contract.address.to_string(),
            amount: accepted,
        })?,
        funds: vec![],
    })];
    let mut attrs = vec![
        attr("method", "contribute"),
        attr("presale_id", presale_id.to_string()),
        attr("contributor", info.sender.as_str()),
        attr("currency", "stable"),
        attr("accepted", accepted),
    ];

    if presale.total_raised >= presale.hard_cap {
        let (msgs, fin_attrs) = settle_presale(deps.api, &config, &mut presale, presale_id, now)?;
        messages.extend(msgs);
        attrs.extend(fin_attrs);
    }

    PRESALES.save(deps.storage, presale_id, &presale)?;

    Ok(Response::new().add_messages(messages).add_attributes(attrs))
}

pub fn execute_finalize(
    deps: DepsMut,
    env: Env,
    presale_id: u64,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut presale = load_presale(deps.storage, presale_id)?;
    let now = env.block.time.seconds();

    if presale.finalized {
        return Err(ContractError::AlreadyFinalized { presale_id });
    }
    if now <= presale.end_time && presale.total_raised < presale.hard_cap {
        return Err(ContractError::SaleInProgress { presale_id });
    }

    let (messages, attrs) = settle_presale(deps.api, &config, &mut presale, presale_id, now)?;
    PRESALES.save(deps.storage, presale_id, &presale)?;

    Ok(Response::new().add_messages(messages).add_attributes(attrs))
}

pub fn execute_claim(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    presale_id: u64,
) -> Result<Response, ContractError> {
    let presale = load_presale(deps.storage, presale_id)?;
    let now = env.block.time.seconds();

    if !presale.finalized {
        return Err(ContractError::NotFinalized { presale_id });
    }
    if now < presale.claim_time {
        return Err(ContractError::ClaimNotOpen {
            presale_id,
            claim_time: presale.claim_time,
        });
    }

    let key = (presale_id, info.sender.to_string());
    let contributed = CONTRIBUTIONS
        .may_load(deps.storage, key.clone())?
        .unwrap_or_default();
    if contributed.is_zero() {
        return Err(ContractError::NoContribution {});
    }

    let total_allocation =
        vesting::token_allocation(contributed, presale.price_per_token, presale.token_decimals)?;
    let already_claimed = CLAIMED
        .may_load(deps.storage, key.clone())?
        .unwrap_or_default();
    let amount = vesting::claimable(
        total_allocation,
        already_claimed,
        presale.claim_time,
        presale.cliff_duration,
        presale.vesting_duration,
        presale.initial_release_bps,
        now,
    );
    if amount.is_zero() {
        return Err(ContractError::NothingToClaim {});
    }

    CLAIMED.save(deps.storage, key, &already_claimed.checked_add(amount)?)?;

    let transfer = CosmosMsg::Wasm(WasmMsg::Execute {
        contract_addr: deps.api.addr_humanize(&presale.sale_token)?.to_string(),
        msg: to_binary(&Cw20ExecuteMsg::Transfer {
            recipient: info.sender.to_string(),
            amount,
        })?,
        funds: vec![],
    });

    Ok(Response::new()
        .add_message(transfer)
        .add_attribute("method", "claim")
        .add_attribute("presale_id", presale_id.to_string())
        .add_attribute("recipient", info.sender.as_str())
        .add_attribute("amount", amount))
}

pub fn execute_refund(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    presale_id: u64,
    stable: bool,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut presale = load_presale(deps.storage, presale_id)?;
    let now = env.block.time.seconds();

    if now <= presale.end_time {
        return Err(ContractError::SaleInProgress { presale_id });
    }
    // past the end and never finalized means the cap was never reached
    if presale.finalized {
        return Err(ContractError::AlreadyFinalized { presale_id });
    }

    let key = (presale_id, info.sender.to_string());
    let contributed = CONTRIBUTIONS
        .may_load(deps.storage, key.clone())?
        .unwrap_or_default();
    if contributed.is_zero() {
        return Err(ContractError::NoContribution {});
    }

    let message: CosmosMsg = match (&presale.mode, stable) {
        (SettlementMode::Native {}, false) => {
            presale.native_balance = presale.native_balance.checked_sub(contributed)?;
            CosmosMsg::Bank(BankMsg::Send {
                to_address: info.sender.to_string(),
                amount: coins(contributed.u128(), &config.native_denom),
            })
        }
        (SettlementMode::Stable { token }, true) => {
            presale.stable_balance = presale.stable_balance.checked_sub(contributed)?;
            CosmosMsg::Wasm(WasmMsg::Execute {
                contract_addr: deps.api.addr_humanize(token)?.to_string(),
                msg: to_binary(&Cw20ExecuteMsg::Transfer {
                    recipient: info.sender.to_string(),
                    amount: contributed,
                })?,
                funds: vec![],
            })
        }
        _ => return Err(ContractError::WrongCurrency {}),
    };

    CONTRIBUTIONS.remove(deps.storage, key.clone());
    REFUNDED.save(deps.storage, key, &true)?;
    PRESALES.save(deps.storage, presale_id, &presale)?;

    Ok(Response::new()
        .add_message(message)
        .add_attribute("method", "refund")
        .add_attribute("presale_id", presale_id.to_string())
        .add_attribute("contributor", info.sender.as_str())
        .add_attribute("amount", contributed))
}

pub fn execute_withdraw_funds(
    deps: DepsMut,
    info: MessageInfo,
    presale_id: u64,
    stable: bool,
) -> Result<Response, ContractError> {
    assert_owner(deps.storage, deps.api, &info.sender)?;

    let config = CONFIG.load(deps.storage)?;
    let mut presale = load_presale(deps.storage, presale_id)?;

    if !presale.finalized {
        return Err(ContractError::NotFinalized { presale_id });
    }
    if presale.total_raised < presale.hard_cap {
        return Err(ContractError::CapNotReached { presale_id });
    }

    let (native_amount, stable_amount) = if stable {
        if !matches!(presale.mode, SettlementMode::Stable { .. }) {
            return Err(ContractError::WrongCurrency {});
        }
        let amount = presale.stable_balance;
        presale.stable_balance = Uint128::zero();
        (Uint128::zero(), amount)
    } else {
        if !matches!(presale.mode, SettlementMode::Native {}) {
            return Err(ContractError::WrongCurrency {});
        }
        let amount = presale.native_balance;
        presale.native_balance = Uint128::zero();
        (amount, Uint128::zero())
    };
    if native_amount.is_zero() && stable_amount.is_zero() {
        return Err(ContractError::NothingToWithdraw {});
    }

    let (messages, attrs) =
        distribution_msgs(deps.api, &config, &presale, native_amount, stable_amount)?;
    PRESALES.save(deps.storage, presale_id, &presale)?;

    Ok(Response::new()
        .add_messages(messages)
        .add_attribute("method", "withdraw_funds")
        .add_attribute("presale_id", presale_id.to_string())
        .add_attributes(attrs))
}

pub fn execute_sweep_unclaimed(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    presale_id: u64,
    recipient: String,
) -> Result<Response, ContractError> {
    assert_owner(deps.storage, deps.api, &info.sender)?;

    let presale = load_presale(deps.storage, presale_id)?;
    if !presale.finalized {
        return Err(ContractError::NotFinalized { presale_id });
    }

    let now = env.block.time.seconds();
    let available_at = presale
        .claim_time
        .saturating_add(presale.cliff_duration)
        .saturating_add(presale.vesting_duration)
        .saturating_add(presale.sweep_grace_period);
    if now < available_at {
        return Err(ContractError::SweepTooEarly { available_at });
    }

    let recipient = deps.api.addr_validate(&recipient)?;
    let sale_token = deps.api.addr_humanize(&presale.sale_token)?;

    // aggregate holder balance, not a per-presale remainder; deployments
    // must not run two live presales over the same sale token
    let balance: BalanceResponse = deps.querier.query(&QueryRequest::Wasm(WasmQuery::Smart {
        contract_addr: sale_token.to_string(),
        msg: to_binary(&Cw20QueryMsg::Balance {
            address: env.contract.address.to_string(),
        })?,
    }))?;
    if balance.balance.is_zero() {
        return Err(ContractError::NothingToWithdraw {});
    }

    let transfer = CosmosMsg::Wasm(WasmMsg::Execute {
        contract_addr: sale_token.to_string(),
        msg: to_binary(&Cw20ExecuteMsg::Transfer {
            recipient: recipient.to_string(),
            amount: balance.balance,
        })?,
        funds: vec![],
    });

    Ok(Response::new()
        .add_message(transfer)
        .add_attribute("method", "sweep_unclaimed")
        .add_attribute("presale_id", presale_id.to_string())
        .add_attribute("recipient", recipient.as_str())
        .add_attribute("amount", balance.balance))
}

pub fn execute_rescue_token(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    token: String,
    recipient: String,
) -> Result<Response, ContractError> {
    assert_owner(deps.storage, deps.api, &info.sender)?;

    let token = deps.api.addr_validate(&token)?;
    let recipient = deps.api.addr_validate(&recipient)?;
    let token_raw = deps.api.addr_canonicalize(token.as_str())?;

    // refuse anything that backs a registered presale, on either side
    for entry in PRESALES.range(deps.storage, None, None, Order::Ascending) {
        let (_, presale) = entry?;
        if presale.sale_token == token_raw {
            return Err(ContractError::CannotRescueSaleToken {});
        }
        if let SettlementMode::Stable { token: stable } = &presale.mode {
            if *stable == token_raw {
                return Err(ContractError::CannotRescueSaleToken {});
            }
        }
    }

    let balance: BalanceResponse = deps.querier.query(&QueryRequest::Wasm(WasmQuery::Smart {
        contract_addr: token.to_string(),
        msg: to_binary(&Cw20QueryMsg::Balance {
            address: env.contract.address.to_string(),
        })?,
    }))?;
    if balance.balance.is_zero() {
        return Err(ContractError::NothingToWithdraw {});
    }

    let transfer = CosmosMsg::Wasm(WasmMsg::Execute {
        contract_addr: token.to_string(),
        msg: to_binary(&Cw20ExecuteMsg::Transfer {
            recipient: recipient.to_string(),
            amount: balance.balance,
        })?,
        funds: vec![],
    });

    Ok(Response::new()
        .add_message(transfer)
        .add_attribute("method", "rescue_token")
        .add_attribute("token", token.as_str())
        .add_attribute("recipient", recipient.as_str())
        .add_attribute("amount", balance.balance))
}

/************************************ Internals *************************************/

fn assert_owner(
    storage: &dyn Storage,
    api: &dyn Api,
    sender: &Addr,
) -> Result<(), ContractError> {
    if CONFIG.load(storage)?.owner != api.addr_canonicalize(sender.as_str())? {
        return Err(ContractError::Unauthorized {});
    }

    Ok(())
}

fn load_presale(storage: &dyn Storage, presale_id: u64) -> Result<Presale, ContractError> {
    PRESALES
        .may_load(storage, presale_id)?
        .ok_or(ContractError::PresaleNotFound { presale_id })
}

fn currency_label(mode: &SettlementMode) -> &'static str {
    match mode {
        SettlementMode::Native {} => "native",
        SettlementMode::Stable { .. } => "stable",
    }
}

fn native_payment(info: &MessageInfo, denom: &str) -> Result<Uint128, ContractError> {
    let amount = info
        .funds
        .iter()
        .find(|coin| coin.denom == denom)
        .map(|coin| coin.amount)
        .unwrap_or_default();
    if amount.is_zero() {
        return Err(ContractError::NoFunds {
            denom: denom.to_string(),
        });
    }

    Ok(amount)
}

fn query_token_decimals(deps: &DepsMut, token: &Addr) -> u8 {
    deps.querier
        .query_wasm_smart::<TokenInfoResponse>(token.to_string(), &Cw20QueryMsg::TokenInfo {})
        .map(|info| info.decimals)
        .unwrap_or(DEFAULT_DECIMALS)
}

// Admission control and bookkeeping shared by both settlement paths.
// Accepts up to the remaining capacity and records the contribution;
// the caller moves the actual funds and handles any cap-triggered
// finalization.
fn apply_contribution(
    deps: &mut DepsMut,
    now: u64,
    presale_id: u64,
    presale: &mut Presale,
    contributor: &Addr,
    requested: Uint128,
) -> Result<Uint128, ContractError> {
    if presale.finalized {
        return Err(ContractError::AlreadyFinalized { presale_id });
    }
    if now < presale.start_time || now > presale.end_time {
        return Err(ContractError::SaleInactive { presale_id });
    }
    if presale.total_raised >= presale.hard_cap {
        return Err(ContractError::HardCapReached { presale_id });
    }

    if now < presale.start_time.saturating_add(presale.whitelist_duration) {
        if let Some(whitelist) = &presale.whitelist {
            let res: IsWhitelistedResponse =
                deps.querier.query(&QueryRequest::Wasm(WasmQuery::Smart {
                    contract_addr: deps.api.addr_humanize(whitelist)?.to_string(),
                    msg: to_binary(&WhitelistQueryMsg::IsWhitelisted {
                        user: contributor.to_string(),
                    })?,
                }))?;
            if !res.whitelisted {
                return Err(ContractError::NotWhitelisted {
                    user: contributor.to_string(),
                });
            }
        }
    }

    // partial fill against the remaining capacity
    let remaining = presale.hard_cap.checked_sub(presale.total_raised)?;
    let accepted = requested.min(remaining);
    if accepted.is_zero() {
        return Err(ContractError::HardCapReached { presale_id });
    }

    let key = (presale_id, contributor.to_string());
    let contributed = CONTRIBUTIONS
        .may_load(deps.storage, key.clone())?
        .unwrap_or_default();
    let new_total = contributed.checked_add(accepted)?;
    if new_total > presale.max_contribution {
        return Err(ContractError::MaxContributionExceeded {
            max: presale.max_contribution,
        });
    }

    CONTRIBUTIONS.save(deps.storage, key, &new_total)?;
    presale.total_raised = presale.total_raised.checked_add(accepted)?;

    Ok(accepted)
}

// One-way transition: fixes the claim schedule and, when the cap was
// reached, pays out the escrowed settlement balance. Called at most once
// per presale; every caller checks the finalized flag first.
fn settle_presale(
    api: &dyn Api,
    config: &Config,
    presale: &mut Presale,
    presale_id: u64,
    now: u64,
) -> Result<(Vec<CosmosMsg>, Vec<Attribute>), ContractError> {
    presale.finalized = true;
    presale.claim_time = now.saturating_add(presale.claim_delay);

    let mut messages = vec![];
    let mut attrs = vec![
        attr("method", "finalize"),
        attr("presale_id", presale_id.to_string()),
        attr("claim_time", presale.claim_time.to_string()),
    ];

    if presale.total_raised >= presale.hard_cap {
        // success branch: balances are zeroed here and the transfers ride
        // in the same transaction, so a failed payout rolls everything back
        let native_amount = presale.native_balance;
        let stable_amount = presale.stable_balance;
        presale.native_balance = Uint128::zero();
        presale.stable_balance = Uint128::zero();

        let (msgs, dist_attrs) =
            distribution_msgs(api, config, presale, native_amount, stable_amount)?;
        messages.extend(msgs);
        attrs.extend(dist_attrs);
    }

    Ok((messages, attrs))
}

// Fee split for a settled raise: platform takes its cut in basis points,
// the owner receives the rest.
fn distribution_msgs(
    api: &dyn Api,
    config: &Config,
    presale: &Presale,
    native_amount: Uint128,
    stable_amount: Uint128,
) -> Result<(Vec<CosmosMsg>, Vec<Attribute>), ContractError> {
    let platform = api.addr_humanize(&config.platform)?;
    let owner = api.addr_humanize(&config.owner)?;

    let mut messages: Vec<CosmosMsg> = vec![];
    let mut attrs: Vec<Attribute> = vec![];

    if !native_amount.is_zero() {
        let fee = native_amount.multiply_ratio(config.platform_fee_bps, MAX_BPS);
        let owner_share = native_amount.checked_sub(fee)?;
        if !fee.is_zero() {
            messages.push(CosmosMsg::Bank(BankMsg::Send {
                to_address: platform.to_string(),
                amount: coins(fee.u128(), &config.native_denom),
            }));
        }
        if !owner_share.is_zero() {
            messages.push(CosmosMsg::Bank(BankMsg::Send {
                to_address: owner.to_string(),
                amount: coins(owner_share.u128(), &config.native_denom),
            }));
        }
        attrs.push(attr("currency", "native"));
        attrs.push(attr("platform_fee", fee));
        attrs.push(attr("owner_share", owner_share));
    }

    if !stable_amount.is_zero() {
        if let SettlementMode::Stable { token } = &presale.mode {
            let token = api.addr_humanize(token)?;
            let fee = stable_amount.multiply_ratio(config.platform_fee_bps, MAX_BPS);
            let owner_share = stable_amount.checked_sub(fee)?;
            if !fee.is_zero() {
                messages.push(CosmosMsg::Wasm(WasmMsg::Execute {
                    contract_addr: token.to_string(),
                    msg: to_binary(&Cw20ExecuteMsg::Transfer {
                        recipient: platform.to_string(),
                        amount: fee,
                    })?,
                    funds: vec![],
                }));
            }
            if !owner_share.is_zero() {
                messages.push(CosmosMsg::Wasm(WasmMsg::Execute {
                    contract_addr: token.to_string(),
                    msg: to_binary(&Cw20ExecuteMsg::Transfer {
                        recipient: owner.to_string(),
                        amount: owner_share,
                    })?,
                    funds: vec![],
                }));
            }
            attrs.push(attr("currency", "stable"));
            attrs.push(attr("platform_fee", fee));
            attrs.push(attr("owner_share", owner_share));
        }
    }

    Ok((messages, attrs))
}

/************************************ Query *************************************/

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::PresaleCount {} => to_binary(&query_count(deps)?),
        QueryMsg::PresaleSummary { presale_id } => to_binary(&query_summary(deps, presale_id)?),
        QueryMsg::ContributionOf { presale_id, user } => {
            to_binary(&query_contribution(deps, presale_id, user)?)
        }
        QueryMsg::ClaimableOf { presale_id, user } => {
            to_binary(&query_claimable(deps, env, presale_id, user)?)
        }
        QueryMsg::ClaimedOf { presale_id, user } => {
            to_binary(&query_claimed(deps, presale_id, user)?)
        }
        QueryMsg::NativeBalance { presale_id } => {
            to_binary(&query_native_balance(deps, presale_id)?)
        }
        QueryMsg::StableBalance { presale_id } => {
            to_binary(&query_stable_balance(deps, presale_id)?)
        }
    }
}

fn query_count(deps: Deps) -> StdResult<PresaleCountResponse> {
    Ok(PresaleCountResponse {
        count: PRESALE_COUNT.load(deps.storage)?,
    })
}

fn query_summary(deps: Deps, presale_id: u64) -> StdResult<SummaryResponse> {
    let presale = PRESALES.load(deps.storage, presale_id)?;

    let stable_token = match &presale.mode {
        SettlementMode::Stable { token } => Some(deps.api.addr_humanize(token)?.to_string()),
        SettlementMode::Native {} => None,
    };
    let whitelist = match &presale.whitelist {
        Some(addr) => Some(deps.api.addr_humanize(addr)?.to_string()),
        None => None,
    };

    Ok(SummaryResponse {
        presale_id,
        sale_token: deps.api.addr_humanize(&presale.sale_token)?.to_string(),
        stable_token,
        whitelist,
        hard_cap: presale.hard_cap,
        price_per_token: presale.price_per_token,
        max_contribution: presale.max_contribution,
        start_time: presale.start_time,
        end_time: presale.end_time,
        whitelist_duration: presale.whitelist_duration,
        claim_delay: presale.claim_delay,
        sweep_grace_period: presale.sweep_grace_period,
        token_decimals: presale.token_decimals,
        stable_decimals: presale.stable_decimals,
        tokens_needed: presale.tokens_needed,
        initial_release_bps: presale.initial_release_bps,
        cliff_duration: presale.cliff_duration,
        vesting_duration: presale.vesting_duration,
        total_raised: presale.total_raised,
        native_balance: presale.native_balance,
        stable_balance: presale.stable_balance,
        finalized: presale.finalized,
        claim_time: presale.claim_time,
    })
}

fn query_contribution(deps: Deps, presale_id: u64, user: String) -> StdResult<AmountResponse> {
    Ok(AmountResponse {
        amount: CONTRIBUTIONS
            .may_load(deps.storage, (presale_id, user))?
            .unwrap_or_default(),
    })
}

fn query_claimable(deps: Deps, env: Env, presale_id: u64, user: String) -> StdResult<AmountResponse> {
    let presale = PRESALES.load(deps.storage, presale_id)?;
    let now = env.block.time.seconds();

    if !presale.finalized || now < presale.claim_time {
        return Ok(AmountResponse {
            amount: Uint128::zero(),
        });
    }

    let contributed = CONTRIBUTIONS
        .may_load(deps.storage, (presale_id, user.clone()))?
        .unwrap_or_default();
    if contributed.is_zero() {
        return Ok(AmountResponse {
            amount: Uint128::zero(),
        });
    }

    let total_allocation =
        vesting::token_allocation(contributed, presale.price_per_token, presale.token_decimals)?;
    let already_claimed = CLAIMED
        .may_load(deps.storage, (presale_id, user))?
        .unwrap_or_default();

    Ok(AmountResponse {
        amount: vesting::claimable(
            total_allocation,
            already_claimed,
            presale.claim_time,
            presale.cliff_duration,
            presale.vesting_duration,
            presale.initial_release_bps,
            now,
        ),
    })
}

fn query_claimed(deps: Deps, presale_id: u64, user: String) -> StdResult<AmountResponse> {
    Ok(AmountResponse {
        amount: CLAIMED
            .may_load(deps.storage, (presale_id, user))?
            .unwrap_or_default(),
    })
}

fn query_native_balance(deps: Deps, presale_id: u64) -> StdResult<AmountResponse> {
    let presale = PRESALES.load(deps.storage, presale_id)?;
    Ok(AmountResponse {
        amount: presale.native_balance,
    })
}

fn query_stable_balance(deps: Deps, presale_id: u64) -> StdResult<AmountResponse> {
    let presale = PRESALES.load(deps.storage, presale_id)?;
    Ok(AmountResponse {
        amount: presale.stable_balance,
    })
}
