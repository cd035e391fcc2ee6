use crate::contract::{execute, instantiate, query};
use crate::error::ContractError;
use crate::mock_querier::mock_dependencies;
use crate::msg::{
    AmountResponse, ExecuteMsg, InstantiateMsg, PresaleCountResponse, PresaleParams, QueryMsg,
    SummaryResponse,
};
use cosmwasm_std::testing::{mock_env, mock_info, MOCK_CONTRACT_ADDR};
use cosmwasm_std::{
    coins, from_binary, to_binary, BankMsg, CosmosMsg, Env, SubMsg, Timestamp, Uint128, WasmMsg,
};
use cw20::Cw20ExecuteMsg;

const OWNER: &str = "owner";
const PLATFORM: &str = "platform";
const DENOM: &str = "uusd";
const SALE_TOKEN: &str = "sale_token";
const STABLE_TOKEN: &str = "stable_token";

fn init_msg() -> InstantiateMsg {
    InstantiateMsg {
        platform: PLATFORM.to_string(),
        platform_fee_bps: 500,
        native_denom: DENOM.to_string(),
    }
}

fn default_params() -> PresaleParams {
    PresaleParams {
        sale_token: SALE_TOKEN.to_string(),
        whitelist: None,
        hard_cap: Uint128::new(100),
        price_per_token: Uint128::new(1),
        max_contribution: Uint128::new(100),
        start_time: 1_000,
        end_time: 2_000,
        whitelist_duration: 0,
        claim_delay: 100,
        initial_release_bps: 5_000,
        cliff_duration: 0,
        vesting_duration: 1_000,
        sweep_grace_period: 10_000,
    }
}

fn env_at(seconds: u64) -> Env {
    let mut env = mock_env();
    env.block.time = Timestamp::from_seconds(seconds);
    env
}

fn summary(deps: cosmwasm_std::Deps, presale_id: u64) -> SummaryResponse {
    from_binary(&query(deps, mock_env(), QueryMsg::PresaleSummary { presale_id }).unwrap()).unwrap()
}

fn contribution_of(deps: cosmwasm_std::Deps, presale_id: u64, user: &str) -> Uint128 {
    let res: AmountResponse = from_binary(
        &query(
            deps,
            mock_env(),
            QueryMsg::ContributionOf {
                presale_id,
                user: user.to_string(),
            },
        )
        .unwrap(),
    )
    .unwrap();
    res.amount
}

fn claimable_of(deps: cosmwasm_std::Deps, env: Env, presale_id: u64, user: &str) -> Uint128 {
    let res: AmountResponse = from_binary(
        &query(
            deps,
            env,
            QueryMsg::ClaimableOf {
                presale_id,
                user: user.to_string(),
            },
        )
        .unwrap(),
    )
    .unwrap();
    res.amount
}

fn claimed_of(deps: cosmwasm_std::Deps, presale_id: u64, user: &str) -> Uint128 {
    let res: AmountResponse = from_binary(
        &query(
            deps,
            mock_env(),
            QueryMsg::ClaimedOf {
                presale_id,
                user: user.to_string(),
            },
        )
        .unwrap(),
    )
    .unwrap();
    res.amount
}

#[test]
fn test_initialize() {
    let mut deps = mock_dependencies(&[]);
    let info = mock_info(&OWNER.to_string(), &[]);
    let _ = instantiate(deps.as_mut(), mock_env(), info, init_msg()).unwrap();

    let count: PresaleCountResponse =
        from_binary(&query(deps.as_ref(), mock_env(), QueryMsg::PresaleCount {}).unwrap()).unwrap();
    assert_eq!(count.count, 0);

    // fee above 100% is rejected
    let mut deps = mock_dependencies(&[]);
    let mut msg = init_msg();
    msg.platform_fee_bps = 10_001;
    let res = instantiate(deps.as_mut(), mock_env(), mock_info(&OWNER.to_string(), &[]), msg);
    match res {
        Err(ContractError::InvalidBps { bps }) => assert_eq!(bps, 10_001),
        _ => panic!("Invalid error"),
    }
}

#[test]
fn test_security() {
    let mut deps = mock_dependencies(&[]);
    deps.querier.with_token_decimals(SALE_TOKEN, 0);
    let info = mock_info(&OWNER.to_string(), &[]);
    let _ = instantiate(deps.as_mut(), mock_env(), info.clone(), init_msg()).unwrap();

    let create_msg = ExecuteMsg::CreateNativePresale {
        params: default_params(),
    };
    let update_msg = ExecuteMsg::UpdatePresaleTimes {
        presale_id: 0,
        new_start_time: 1_000,
        new_end_time: 3_000,
        new_whitelist_duration: 0,
    };
    let withdraw_msg = ExecuteMsg::WithdrawNativeFunds { presale_id: 0 };
    let sweep_msg = ExecuteMsg::SweepUnclaimed {
        presale_id: 0,
        recipient: "treasury".to_string(),
    };
    let rescue_msg = ExecuteMsg::RescueToken {
        token: "other_token".to_string(),
        recipient: "treasury".to_string(),
    };
    let transfer_ownership_msg = ExecuteMsg::TransferOwnership {
        new_owner: "user".to_string(),
    };

    for msg in [
        create_msg.clone(),
        update_msg,
        withdraw_msg,
        sweep_msg,
        rescue_msg,
        transfer_ownership_msg.clone(),
    ] {
        let res = execute(
            deps.as_mut(),
            mock_env(),
            mock_info(&"user".to_string(), &[]),
            msg,
        );
        match res {
            Err(ContractError::Unauthorized {}) => {}
            _ => panic!("Invalid error"),
        }
    }

    execute(deps.as_mut(), mock_env(), info, transfer_ownership_msg).unwrap();
    execute(
        deps.as_mut(),
        mock_env(),
        mock_info(&"user".to_string(), &[]),
        create_msg,
    )
    .unwrap();
}

#[test]
fn test_create_presale_validation() {
    let mut deps = mock_dependencies(&[]);
    deps.querier.with_token_decimals(SALE_TOKEN, 0);
    let info = mock_info(&OWNER.to_string(), &[]);
    let _ = instantiate(deps.as_mut(), mock_env(), info.clone(), init_msg()).unwrap();

    let mut params = default_params();
    params.price_per_token = Uint128::zero();
    let res = execute(
        deps.as_mut(),
        mock_env(),
        info.clone(),
        ExecuteMsg::CreateNativePresale { params },
    );
    match res {
        Err(ContractError::ZeroPrice {}) => {}
        _ => panic!("Invalid error"),
    }

    let mut params = default_params();
    params.hard_cap = Uint128::zero();
    let res = execute(
        deps.as_mut(),
        mock_env(),
        info.clone(),
        ExecuteMsg::CreateNativePresale { params },
    );
    match res {
        Err(ContractError::ZeroHardCap {}) => {}
        _ => panic!("Invalid error"),
    }

    let mut params = default_params();
    params.initial_release_bps = 20_000;
    let res = execute(
        deps.as_mut(),
        mock_env(),
        info.clone(),
        ExecuteMsg::CreateNativePresale { params },
    );
    match res {
        Err(ContractError::InvalidBps { bps }) => assert_eq!(bps, 20_000),
        _ => panic!("Invalid error"),
    }

    let mut params = default_params();
    params.end_time = params.start_time;
    let res = execute(
        deps.as_mut(),
        mock_env(),
        info.clone(),
        ExecuteMsg::CreateNativePresale { params },
    );
    match res {
        Err(ContractError::InvalidTimes {}) => {}
        _ => panic!("Invalid error"),
    }

    let mut params = default_params();
    params.whitelist_duration = 2_000;
    let res = execute(
        deps.as_mut(),
        mock_env(),
        info,
        ExecuteMsg::CreateNativePresale { params },
    );
    match res {
        Err(ContractError::WhitelistWindowTooLong {}) => {}
        _ => panic!("Invalid error"),
    }
}

#[test]
fn test_create_presale_escrows_tokens() {
    let mut deps = mock_dependencies(&[]);
    deps.querier.with_token_decimals(SALE_TOKEN, 0);
    let info = mock_info(&OWNER.to_string(), &[]);
    let _ = instantiate(deps.as_mut(), mock_env(), info.clone(), init_msg()).unwrap();

    let res = execute(
        deps.as_mut(),
        mock_env(),
        info,
        ExecuteMsg::CreateNativePresale {
            params: default_params(),
        },
    )
    .unwrap();

    // the full allocation is pulled from the owner up front
    assert_eq!(
        res.messages,
        vec![SubMsg::new(CosmosMsg::Wasm(WasmMsg::Execute {
            contract_addr: SALE_TOKEN.to_string(),
            msg: to_binary(&Cw20ExecuteMsg::TransferFrom {
                owner: OWNER.to_string(),
                recipient: MOCK_CONTRACT_ADDR.to_string(),
                amount: Uint128::new(100),
            })
            .unwrap(),
            funds: vec![],
        }))]
    );

    let count: PresaleCountResponse =
        from_binary(&query(deps.as_ref(), mock_env(), QueryMsg::PresaleCount {}).unwrap()).unwrap();
    assert_eq!(count.count, 1);

    let summary = summary(deps.as_ref(), 0);
    assert_eq!(summary.sale_token, SALE_TOKEN.to_string());
    assert_eq!(summary.stable_token, None);
    assert_eq!(summary.token_decimals, 0);
    assert_eq!(summary.tokens_needed, Uint128::new(100));
    assert_eq!(summary.total_raised, Uint128::zero());
    assert!(!summary.finalized);
    assert_eq!(summary.claim_time, 0);
}

#[test]
fn test_create_presale_decimals_fallback() {
    let mut deps = mock_dependencies(&[]);
    let info = mock_info(&OWNER.to_string(), &[]);
    let _ = instantiate(deps.as_mut(), mock_env(), info.clone(), init_msg()).unwrap();

    // the token info query fails for unregistered tokens; creation still
    // goes through with the 18-decimal default
    let _ = execute(
        deps.as_mut(),
        mock_env(),
        info,
        ExecuteMsg::CreateNativePresale {
            params: default_params(),
        },
    )
    .unwrap();

    let summary = summary(deps.as_ref(), 0);
    assert_eq!(summary.token_decimals, 18);
    assert_eq!(
        summary.tokens_needed,
        Uint128::new(100) * Uint128::new(10u128.pow(18))
    );
}

#[test]
fn test_contribute_partial_fill_and_auto_finalize() {
    let mut deps = mock_dependencies(&[]);
    deps.querier.with_token_decimals(SALE_TOKEN, 0);
    let info = mock_info(&OWNER.to_string(), &[]);
    let _ = instantiate(deps.as_mut(), mock_env(), info.clone(), init_msg()).unwrap();
    execute(
        deps.as_mut(),
        mock_env(),
        info,
        ExecuteMsg::CreateNativePresale {
            params: default_params(),
        },
    )
    .unwrap();

    // first contributor leaves 30 of capacity
    let res = execute(
        deps.as_mut(),
        env_at(1_500),
        mock_info(&"user1".to_string(), &coins(70, DENOM)),
        ExecuteMsg::Contribute { presale_id: 0 },
    )
    .unwrap();
    assert_eq!(res.messages.len(), 0);
    assert_eq!(contribution_of(deps.as_ref(), 0, "user1"), Uint128::new(70));

    let sum = summary(deps.as_ref(), 0);
    assert_eq!(sum.total_raised, Uint128::new(70));
    assert_eq!(sum.native_balance, Uint128::new(70));

    // second contributor asks for 50, gets 30, and is refunded 20 in the
    // same call; the cap fill finalizes and pays out the raise
    let res = execute(
        deps.as_mut(),
        env_at(1_500),
        mock_info(&"user2".to_string(), &coins(50, DENOM)),
        ExecuteMsg::Contribute { presale_id: 0 },
    )
    .unwrap();
    assert_eq!(
        res.messages,
        vec![
            SubMsg::new(CosmosMsg::Bank(BankMsg::Send {
                to_address: "user2".to_string(),
                amount: coins(20, DENOM),
            })),
            SubMsg::new(CosmosMsg::Bank(BankMsg::Send {
                to_address: PLATFORM.to_string(),
                amount: coins(5, DENOM),
            })),
            SubMsg::new(CosmosMsg::Bank(BankMsg::Send {
                to_address: OWNER.to_string(),
                amount: coins(95, DENOM),
            })),
        ]
    );
    assert_eq!(contribution_of(deps.as_ref(), 0, "user2"), Uint128::new(30));

    let sum = summary(deps.as_ref(), 0);
    assert_eq!(sum.total_raised, Uint128::new(100));
    assert_eq!(sum.native_balance, Uint128::zero());
    assert!(sum.finalized);
    assert_eq!(sum.claim_time, 1_600);

    // nothing more is accepted
    let res = execute(
        deps.as_mut(),
        env_at(1_700),
        mock_info(&"user3".to_string(), &coins(10, DENOM)),
        ExecuteMsg::Contribute { presale_id: 0 },
    );
    match res {
        Err(ContractError::AlreadyFinalized { presale_id }) => assert_eq!(presale_id, 0),
        _ => panic!("Invalid error"),
    }
}

#[test]
fn test_contribute_checks() {
    let mut deps = mock_dependencies(&[]);
    deps.querier.with_token_decimals(SALE_TOKEN, 0);
    let info = mock_info(&OWNER.to_string(), &[]);
    let _ = instantiate(deps.as_mut(), mock_env(), info.clone(), init_msg()).unwrap();

    let mut params = default_params();
    params.max_contribution = Uint128::new(50);
    execute(
        deps.as_mut(),
        mock_env(),
        info,
        ExecuteMsg::CreateNativePresale { params },
    )
    .unwrap();

    // missing presale
    let res = execute(
        deps.as_mut(),
        env_at(1_500),
        mock_info(&"user1".to_string(), &coins(10, DENOM)),
        ExecuteMsg::Contribute { presale_id: 9 },
    );
    match res {
        Err(ContractError::PresaleNotFound { presale_id }) => assert_eq!(presale_id, 9),
        _ => panic!("Invalid error"),
    }

    // outside the sale window
    let res = execute(
        deps.as_mut(),
        env_at(500),
        mock_info(&"user1".to_string(), &coins(10, DENOM)),
        ExecuteMsg::Contribute { presale_id: 0 },
    );
    match res {
        Err(ContractError::SaleInactive { .. }) => {}
        _ => panic!("Invalid error"),
    }
    let res = execute(
        deps.as_mut(),
        env_at(2_500),
        mock_info(&"user1".to_string(), &coins(10, DENOM)),
        ExecuteMsg::Contribute { presale_id: 0 },
    );
    match res {
        Err(ContractError::SaleInactive { .. }) => {}
        _ => panic!("Invalid error"),
    }

    // wrong denom attached
    let res = execute(
        deps.as_mut(),
        env_at(1_500),
        mock_info(&"user1".to_string(), &coins(10, "ukrw")),
        ExecuteMsg::Contribute { presale_id: 0 },
    );
    match res {
        Err(ContractError::NoFunds { denom }) => assert_eq!(denom, DENOM.to_string()),
        _ => panic!("Invalid error"),
    }

    // a single oversized contribution
    let res = execute(
        deps.as_mut(),
        env_at(1_500),
        mock_info(&"user1".to_string(), &coins(60, DENOM)),
        ExecuteMsg::Contribute { presale_id: 0 },
    );
    match res {
        Err(ContractError::MaxContributionExceeded { max }) => assert_eq!(max, Uint128::new(50)),
        _ => panic!("Invalid error"),
    }

    // the limit is cumulative
    execute(
        deps.as_mut(),
        env_at(1_500),
        mock_info(&"user1".to_string(), &coins(30, DENOM)),
        ExecuteMsg::Contribute { presale_id: 0 },
    )
    .unwrap();
    let res = execute(
        deps.as_mut(),
        env_at(1_500),
        mock_info(&"user1".to_string(), &coins(30, DENOM)),
        ExecuteMsg::Contribute { presale_id: 0 },
    );
    match res {
        Err(ContractError::MaxContributionExceeded { .. }) => {}
        _ => panic!("Invalid error"),
    }

    // the stable entry point rejects a native-settled sale
    let res = execute(
        deps.as_mut(),
        env_at(1_500),
        mock_info(&"user1".to_string(), &[]),
        ExecuteMsg::ContributeStable {
            presale_id: 0,
            amount: Uint128::new(10),
        },
    );
    match res {
        Err(ContractError::WrongCurrency {}) => {}
        _ => panic!("Invalid error"),
    }
}

#[test]
fn test_whitelist_window() {
    let mut deps = mock_dependencies(&[]);
    deps.querier.with_token_decimals(SALE_TOKEN, 0);
    deps.querier.with_whitelisted("user1");
    let info = mock_info(&OWNER.to_string(), &[]);
    let _ = instantiate(deps.as_mut(), mock_env(), info.clone(), init_msg()).unwrap();

    let mut params = default_params();
    params.whitelist = Some("whitelist".to_string());
    params.whitelist_duration = 500;
    execute(
        deps.as_mut(),
        mock_env(),
        info,
        ExecuteMsg::CreateNativePresale { params },
    )
    .unwrap();

    // inside the window only listed users get in
    let res = execute(
        deps.as_mut(),
        env_at(1_200),
        mock_info(&"user2".to_string(), &coins(10, DENOM)),
        ExecuteMsg::Contribute { presale_id: 0 },
    );
    match res {
        Err(ContractError::NotWhitelisted { user }) => assert_eq!(user, "user2".to_string()),
        _ => panic!("Invalid error"),
    }
    execute(
        deps.as_mut(),
        env_at(1_200),
        mock_info(&"user1".to_string(), &coins(10, DENOM)),
        ExecuteMsg::Contribute { presale_id: 0 },
    )
    .unwrap();

    // once the window passes the sale is open
    execute(
        deps.as_mut(),
        env_at(1_600),
        mock_info(&"user2".to_string(), &coins(10, DENOM)),
        ExecuteMsg::Contribute { presale_id: 0 },
    )
    .unwrap();
}

#[test]
fn test_contribute_stable_pulls_only_accepted() {
    let mut deps = mock_dependencies(&[]);
    deps.querier.with_token_decimals(SALE_TOKEN, 0);
    deps.querier.with_token_decimals(STABLE_TOKEN, 6);
    let info = mock_info(&OWNER.to_string(), &[]);
    let _ = instantiate(deps.as_mut(), mock_env(), info.clone(), init_msg()).unwrap();
    execute(
        deps.as_mut(),
        mock_env(),
        info,
        ExecuteMsg::CreateStablePresale {
            stable_token: STABLE_TOKEN.to_string(),
            params: default_params(),
        },
    )
    .unwrap();

    let sum = summary(deps.as_ref(), 0);
    assert_eq!(sum.stable_token, Some(STABLE_TOKEN.to_string()));
    assert_eq!(sum.stable_decimals, 6);

    let res = execute(
        deps.as_mut(),
        env_at(1_500),
        mock_info(&"user1".to_string(), &[]),
        ExecuteMsg::ContributeStable {
            presale_id: 0,
            amount: Uint128::zero(),
        },
    );
    match res {
        Err(ContractError::ZeroAmount {}) => {}
        _ => panic!("Invalid error"),
    }

    // 150 requested against 100 of capacity: only the accepted 100 is
    // pulled, and the cap fill finalizes with a cw20 fee split
    let res = execute(
        deps.as_mut(),
        env_at(1_500),
        mock_info(&"user1".to_string(), &[]),
        ExecuteMsg::ContributeStable {
            presale_id: 0,
            amount: Uint128::new(150),
        },
    )
    .unwrap();
    assert_eq!(
        res.messages,
        vec![
            SubMsg::new(CosmosMsg::Wasm(WasmMsg::Execute {
                contract_addr: STABLE_TOKEN.to_string(),
                msg: to_binary(&Cw20ExecuteMsg::TransferFrom {
                    owner: "user1".to_string(),
                    recipient: MOCK_CONTRACT_ADDR.to_string(),
                    amount: Uint128::new(100),
                })
                .unwrap(),
                funds: vec![],
            })),
            SubMsg::new(CosmosMsg::Wasm(WasmMsg::Execute {
                contract_addr: STABLE_TOKEN.to_string(),
                msg: to_binary(&Cw20ExecuteMsg::Transfer {
                    recipient: PLATFORM.to_string(),
                    amount: Uint128::new(5),
                })
                .unwrap(),
                funds: vec![],
            })),
            SubMsg::new(CosmosMsg::Wasm(WasmMsg::Execute {
                contract_addr: STABLE_TOKEN.to_string(),
                msg: to_binary(&Cw20ExecuteMsg::Transfer {
                    recipient: OWNER.to_string(),
                    amount: Uint128::new(95),
                })
                .unwrap(),
                funds: vec![],
            })),
        ]
    );
    assert_eq!(contribution_of(deps.as_ref(), 0, "user1"), Uint128::new(100));

    let sum = summary(deps.as_ref(), 0);
    assert!(sum.finalized);
    assert_eq!(sum.stable_balance, Uint128::zero());

    // the native entry point rejects a stable-settled sale
    let res = execute(
        deps.as_mut(),
        env_at(1_500),
        mock_info(&"user2".to_string(), &coins(10, DENOM)),
        ExecuteMsg::Contribute { presale_id: 0 },
    );
    match res {
        Err(ContractError::WrongCurrency {}) => {}
        _ => panic!("Invalid error"),
    }
}

#[test]
fn test_finalize() {
    let mut deps = mock_dependencies(&[]);
    deps.querier.with_token_decimals(SALE_TOKEN, 0);
    let info = mock_info(&OWNER.to_string(), &[]);
    let _ = instantiate(deps.as_mut(), mock_env(), info.clone(), init_msg()).unwrap();
    execute(
        deps.as_mut(),
        mock_env(),
        info,
        ExecuteMsg::CreateNativePresale {
            params: default_params(),
        },
    )
    .unwrap();
    execute(
        deps.as_mut(),
        env_at(1_500),
        mock_info(&"user1".to_string(), &coins(40, DENOM)),
        ExecuteMsg::Contribute { presale_id: 0 },
    )
    .unwrap();

    // under the cap the sale has to run its course
    let res = execute(
        deps.as_mut(),
        env_at(1_800),
        mock_info(&"anyone".to_string(), &[]),
        ExecuteMsg::Finalize { presale_id: 0 },
    );
    match res {
        Err(ContractError::SaleInProgress { .. }) => {}
        _ => panic!("Invalid error"),
    }

    // anyone may finalize after the end; the failed raise stays escrowed
    // for refunds
    let res = execute(
        deps.as_mut(),
        env_at(2_100),
        mock_info(&"anyone".to_string(), &[]),
        ExecuteMsg::Finalize { presale_id: 0 },
    )
    .unwrap();
    assert_eq!(res.messages.len(), 0);

    let sum = summary(deps.as_ref(), 0);
    assert!(sum.finalized);
    assert_eq!(sum.claim_time, 2_200);
    assert_eq!(sum.native_balance, Uint128::new(40));

    let res = execute(
        deps.as_mut(),
        env_at(2_200),
        mock_info(&"anyone".to_string(), &[]),
        ExecuteMsg::Finalize { presale_id: 0 },
    );
    match res {
        Err(ContractError::AlreadyFinalized { .. }) => {}
        _ => panic!("Invalid error"),
    }
}

#[test]
fn test_claim_vesting_schedule() {
    let mut deps = mock_dependencies(&[]);
    deps.querier.with_token_decimals(SALE_TOKEN, 0);
    let info = mock_info(&OWNER.to_string(), &[]);
    let _ = instantiate(deps.as_mut(), mock_env(), info.clone(), init_msg()).unwrap();

    let mut params = default_params();
    params.hard_cap = Uint128::new(1_000);
    params.max_contribution = Uint128::new(1_000);
    execute(
        deps.as_mut(),
        mock_env(),
        info,
        ExecuteMsg::CreateNativePresale { params },
    )
    .unwrap();

    // filling the cap finalizes; claims open at 1_600
    execute(
        deps.as_mut(),
        env_at(1_500),
        mock_info(&"user1".to_string(), &coins(1_000, DENOM)),
        ExecuteMsg::Contribute { presale_id: 0 },
    )
    .unwrap();

    let res = execute(
        deps.as_mut(),
        env_at(1_599),
        mock_info(&"user1".to_string(), &[]),
        ExecuteMsg::Claim { presale_id: 0 },
    );
    match res {
        Err(ContractError::ClaimNotOpen { claim_time, .. }) => assert_eq!(claim_time, 1_600),
        _ => panic!("Invalid error"),
    }
    assert_eq!(
        claimable_of(deps.as_ref(), env_at(1_599), 0, "user1"),
        Uint128::zero()
    );

    // half of the allocation is released at claim start
    assert_eq!(
        claimable_of(deps.as_ref(), env_at(1_600), 0, "user1"),
        Uint128::new(500)
    );
    let res = execute(
        deps.as_mut(),
        env_at(1_600),
        mock_info(&"user1".to_string(), &[]),
        ExecuteMsg::Claim { presale_id: 0 },
    )
    .unwrap();
    assert_eq!(
        res.messages,
        vec![SubMsg::new(CosmosMsg::Wasm(WasmMsg::Execute {
            contract_addr: SALE_TOKEN.to_string(),
            msg: to_binary(&Cw20ExecuteMsg::Transfer {
                recipient: "user1".to_string(),
                amount: Uint128::new(500),
            })
            .unwrap(),
            funds: vec![],
        }))]
    );
    assert_eq!(claimed_of(deps.as_ref(), 0, "user1"), Uint128::new(500));

    // nothing new has vested yet
    let res = execute(
        deps.as_mut(),
        env_at(1_600),
        mock_info(&"user1".to_string(), &[]),
        ExecuteMsg::Claim { presale_id: 0 },
    );
    match res {
        Err(ContractError::NothingToClaim {}) => {}
        _ => panic!("Invalid error"),
    }

    // halfway through the vesting window the cumulative release is 750
    assert_eq!(
        claimable_of(deps.as_ref(), env_at(2_100), 0, "user1"),
        Uint128::new(250)
    );
    execute(
        deps.as_mut(),
        env_at(2_100),
        mock_info(&"user1".to_string(), &[]),
        ExecuteMsg::Claim { presale_id: 0 },
    )
    .unwrap();
    assert_eq!(claimed_of(deps.as_ref(), 0, "user1"), Uint128::new(750));

    // fully vested
    execute(
        deps.as_mut(),
        env_at(2_600),
        mock_info(&"user1".to_string(), &[]),
        ExecuteMsg::Claim { presale_id: 0 },
    )
    .unwrap();
    assert_eq!(claimed_of(deps.as_ref(), 0, "user1"), Uint128::new(1_000));

    let res = execute(
        deps.as_mut(),
        env_at(3_000),
        mock_info(&"user1".to_string(), &[]),
        ExecuteMsg::Claim { presale_id: 0 },
    );
    match res {
        Err(ContractError::NothingToClaim {}) => {}
        _ => panic!("Invalid error"),
    }

    // outsiders have nothing
    let res = execute(
        deps.as_mut(),
        env_at(1_600),
        mock_info(&"user2".to_string(), &[]),
        ExecuteMsg::Claim { presale_id: 0 },
    );
    match res {
        Err(ContractError::NoContribution {}) => {}
        _ => panic!("Invalid error"),
    }
}

#[test]
fn test_refund_once() {
    let mut deps = mock_dependencies(&[]);
    deps.querier.with_token_decimals(SALE_TOKEN, 0);
    let info = mock_info(&OWNER.to_string(), &[]);
    let _ = instantiate(deps.as_mut(), mock_env(), info.clone(), init_msg()).unwrap();
    execute(
        deps.as_mut(),
        mock_env(),
        info.clone(),
        ExecuteMsg::CreateNativePresale {
            params: default_params(),
        },
    )
    .unwrap();
    execute(
        deps.as_mut(),
        env_at(1_500),
        mock_info(&"user1".to_string(), &coins(40, DENOM)),
        ExecuteMsg::Contribute { presale_id: 0 },
    )
    .unwrap();

    // no refunds while the sale can still fill
    let res = execute(
        deps.as_mut(),
        env_at(1_800),
        mock_info(&"user1".to_string(), &[]),
        ExecuteMsg::RefundNative { presale_id: 0 },
    );
    match res {
        Err(ContractError::SaleInProgress { .. }) => {}
        _ => panic!("Invalid error"),
    }

    // currency has to match the sale
    let res = execute(
        deps.as_mut(),
        env_at(2_100),
        mock_info(&"user1".to_string(), &[]),
        ExecuteMsg::RefundStable { presale_id: 0 },
    );
    match res {
        Err(ContractError::WrongCurrency {}) => {}
        _ => panic!("Invalid error"),
    }

    let res = execute(
        deps.as_mut(),
        env_at(2_100),
        mock_info(&"user1".to_string(), &[]),
        ExecuteMsg::RefundNative { presale_id: 0 },
    )
    .unwrap();
    assert_eq!(
        res.messages,
        vec![SubMsg::new(CosmosMsg::Bank(BankMsg::Send {
            to_address: "user1".to_string(),
            amount: coins(40, DENOM),
        }))]
    );
    assert_eq!(contribution_of(deps.as_ref(), 0, "user1"), Uint128::zero());
    assert_eq!(
        summary(deps.as_ref(), 0).native_balance,
        Uint128::zero()
    );

    // a refund happens at most once
    let res = execute(
        deps.as_mut(),
        env_at(2_200),
        mock_info(&"user1".to_string(), &[]),
        ExecuteMsg::RefundNative { presale_id: 0 },
    );
    match res {
        Err(ContractError::NoContribution {}) => {}
        _ => panic!("Invalid error"),
    }

    // strangers have nothing to refund
    let res = execute(
        deps.as_mut(),
        env_at(2_200),
        mock_info(&"user2".to_string(), &[]),
        ExecuteMsg::RefundNative { presale_id: 0 },
    );
    match res {
        Err(ContractError::NoContribution {}) => {}
        _ => panic!("Invalid error"),
    }

    // a finalized (successful) sale never refunds
    execute(
        deps.as_mut(),
        mock_env(),
        info,
        ExecuteMsg::CreateNativePresale {
            params: default_params(),
        },
    )
    .unwrap();
    execute(
        deps.as_mut(),
        env_at(1_500),
        mock_info(&"user1".to_string(), &coins(100, DENOM)),
        ExecuteMsg::Contribute { presale_id: 1 },
    )
    .unwrap();
    let res = execute(
        deps.as_mut(),
        env_at(2_100),
        mock_info(&"user1".to_string(), &[]),
        ExecuteMsg::RefundNative { presale_id: 1 },
    );
    match res {
        Err(ContractError::AlreadyFinalized { .. }) => {}
        _ => panic!("Invalid error"),
    }
}

#[test]
fn test_sweep_timing() {
    let mut deps = mock_dependencies(&[]);
    deps.querier.with_token_decimals(SALE_TOKEN, 0);
    let info = mock_info(&OWNER.to_string(), &[]);
    let _ = instantiate(deps.as_mut(), mock_env(), info.clone(), init_msg()).unwrap();
    execute(
        deps.as_mut(),
        mock_env(),
        info.clone(),
        ExecuteMsg::CreateNativePresale {
            params: default_params(),
        },
    )
    .unwrap();

    // not finalized yet
    let res = execute(
        deps.as_mut(),
        env_at(1_500),
        info.clone(),
        ExecuteMsg::SweepUnclaimed {
            presale_id: 0,
            recipient: "treasury".to_string(),
        },
    );
    match res {
        Err(ContractError::NotFinalized { .. }) => {}
        _ => panic!("Invalid error"),
    }

    // fill the cap; claim_time 1_600, vesting horizon 2_600, grace until 12_600
    execute(
        deps.as_mut(),
        env_at(1_500),
        mock_info(&"user1".to_string(), &coins(100, DENOM)),
        ExecuteMsg::Contribute { presale_id: 0 },
    )
    .unwrap();

    let res = execute(
        deps.as_mut(),
        env_at(12_599),
        info.clone(),
        ExecuteMsg::SweepUnclaimed {
            presale_id: 0,
            recipient: "treasury".to_string(),
        },
    );
    match res {
        Err(ContractError::SweepTooEarly { available_at }) => assert_eq!(available_at, 12_600),
        _ => panic!("Invalid error"),
    }

    deps.querier
        .with_token_balance(SALE_TOKEN, MOCK_CONTRACT_ADDR, Uint128::new(600));
    let res = execute(
        deps.as_mut(),
        env_at(12_600),
        info,
        ExecuteMsg::SweepUnclaimed {
            presale_id: 0,
            recipient: "treasury".to_string(),
        },
    )
    .unwrap();
    assert_eq!(
        res.messages,
        vec![SubMsg::new(CosmosMsg::Wasm(WasmMsg::Execute {
            contract_addr: SALE_TOKEN.to_string(),
            msg: to_binary(&Cw20ExecuteMsg::Transfer {
                recipient: "treasury".to_string(),
                amount: Uint128::new(600),
            })
            .unwrap(),
            funds: vec![],
        }))]
    );
}

#[test]
fn test_rescue_token() {
    let mut deps = mock_dependencies(&[]);
    deps.querier.with_token_decimals(SALE_TOKEN, 0);
    deps.querier.with_token_decimals(STABLE_TOKEN, 6);
    let info = mock_info(&OWNER.to_string(), &[]);
    let _ = instantiate(deps.as_mut(), mock_env(), info.clone(), init_msg()).unwrap();
    execute(
        deps.as_mut(),
        mock_env(),
        info.clone(),
        ExecuteMsg::CreateNativePresale {
            params: default_params(),
        },
    )
    .unwrap();
    execute(
        deps.as_mut(),
        mock_env(),
        info.clone(),
        ExecuteMsg::CreateStablePresale {
            stable_token: STABLE_TOKEN.to_string(),
            params: default_params(),
        },
    )
    .unwrap();

    // both sides of a registered presale are off limits
    for token in [SALE_TOKEN, STABLE_TOKEN] {
        let res = execute(
            deps.as_mut(),
            mock_env(),
            info.clone(),
            ExecuteMsg::RescueToken {
                token: token.to_string(),
                recipient: "treasury".to_string(),
            },
        );
        match res {
            Err(ContractError::CannotRescueSaleToken {}) => {}
            _ => panic!("Invalid error"),
        }
    }

    deps.querier
        .with_token_balance("other_token", MOCK_CONTRACT_ADDR, Uint128::new(300));
    let res = execute(
        deps.as_mut(),
        mock_env(),
        info,
        ExecuteMsg::RescueToken {
            token: "other_token".to_string(),
            recipient: "treasury".to_string(),
        },
    )
    .unwrap();
    assert_eq!(
        res.messages,
        vec![SubMsg::new(CosmosMsg::Wasm(WasmMsg::Execute {
            contract_addr: "other_token".to_string(),
            msg: to_binary(&Cw20ExecuteMsg::Transfer {
                recipient: "treasury".to_string(),
                amount: Uint128::new(300),
            })
            .unwrap(),
            funds: vec![],
        }))]
    );
}

#[test]
fn test_withdraw_funds() {
    let mut deps = mock_dependencies(&[]);
    deps.querier.with_token_decimals(SALE_TOKEN, 0);
    let info = mock_info(&OWNER.to_string(), &[]);
    let _ = instantiate(deps.as_mut(), mock_env(), info.clone(), init_msg()).unwrap();
    execute(
        deps.as_mut(),
        mock_env(),
        info.clone(),
        ExecuteMsg::CreateNativePresale {
            params: default_params(),
        },
    )
    .unwrap();

    // nothing to withdraw before finalization
    let res = execute(
        deps.as_mut(),
        env_at(1_500),
        info.clone(),
        ExecuteMsg::WithdrawNativeFunds { presale_id: 0 },
    );
    match res {
        Err(ContractError::NotFinalized { .. }) => {}
        _ => panic!("Invalid error"),
    }

    // the cap fill already paid everything out
    execute(
        deps.as_mut(),
        env_at(1_500),
        mock_info(&"user1".to_string(), &coins(100, DENOM)),
        ExecuteMsg::Contribute { presale_id: 0 },
    )
    .unwrap();
    let res = execute(
        deps.as_mut(),
        env_at(1_700),
        info.clone(),
        ExecuteMsg::WithdrawNativeFunds { presale_id: 0 },
    );
    match res {
        Err(ContractError::NothingToWithdraw {}) => {}
        _ => panic!("Invalid error"),
    }
    let res = execute(
        deps.as_mut(),
        env_at(1_700),
        info.clone(),
        ExecuteMsg::WithdrawStableFunds { presale_id: 0 },
    );
    match res {
        Err(ContractError::WrongCurrency {}) => {}
        _ => panic!("Invalid error"),
    }

    // a failed sale keeps its escrow for refunds
    execute(
        deps.as_mut(),
        mock_env(),
        info.clone(),
        ExecuteMsg::CreateNativePresale {
            params: default_params(),
        },
    )
    .unwrap();
    execute(
        deps.as_mut(),
        env_at(1_500),
        mock_info(&"user1".to_string(), &coins(40, DENOM)),
        ExecuteMsg::Contribute { presale_id: 1 },
    )
    .unwrap();
    execute(
        deps.as_mut(),
        env_at(2_100),
        mock_info(&"anyone".to_string(), &[]),
        ExecuteMsg::Finalize { presale_id: 1 },
    )
    .unwrap();
    let res = execute(
        deps.as_mut(),
        env_at(2_200),
        info,
        ExecuteMsg::WithdrawNativeFunds { presale_id: 1 },
    );
    match res {
        Err(ContractError::CapNotReached { .. }) => {}
        _ => panic!("Invalid error"),
    }
}

#[test]
fn test_update_presale_times() {
    let mut deps = mock_dependencies(&[]);
    deps.querier.with_token_decimals(SALE_TOKEN, 0);
    let info = mock_info(&OWNER.to_string(), &[]);
    let _ = instantiate(deps.as_mut(), mock_env(), info.clone(), init_msg()).unwrap();
    execute(
        deps.as_mut(),
        mock_env(),
        info.clone(),
        ExecuteMsg::CreateNativePresale {
            params: default_params(),
        },
    )
    .unwrap();

    let res = execute(
        deps.as_mut(),
        mock_env(),
        info.clone(),
        ExecuteMsg::UpdatePresaleTimes {
            presale_id: 0,
            new_start_time: 3_000,
            new_end_time: 2_000,
            new_whitelist_duration: 0,
        },
    );
    match res {
        Err(ContractError::InvalidTimes {}) => {}
        _ => panic!("Invalid error"),
    }

    execute(
        deps.as_mut(),
        mock_env(),
        info.clone(),
        ExecuteMsg::UpdatePresaleTimes {
            presale_id: 0,
            new_start_time: 2_000,
            new_end_time: 4_000,
            new_whitelist_duration: 100,
        },
    )
    .unwrap();
    let sum = summary(deps.as_ref(), 0);
    assert_eq!(sum.start_time, 2_000);
    assert_eq!(sum.end_time, 4_000);
    assert_eq!(sum.whitelist_duration, 100);

    // the schedule is frozen once finalized
    execute(
        deps.as_mut(),
        env_at(2_500),
        mock_info(&"user1".to_string(), &coins(100, DENOM)),
        ExecuteMsg::Contribute { presale_id: 0 },
    )
    .unwrap();
    let res = execute(
        deps.as_mut(),
        mock_env(),
        info,
        ExecuteMsg::UpdatePresaleTimes {
            presale_id: 0,
            new_start_time: 2_000,
            new_end_time: 4_000,
            new_whitelist_duration: 0,
        },
    );
    match res {
        Err(ContractError::AlreadyFinalized { .. }) => {}
        _ => panic!("Invalid error"),
    }
}
