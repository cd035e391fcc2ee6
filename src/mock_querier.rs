use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

use cosmwasm_std::testing::{MockApi, MockQuerier, MockStorage, MOCK_CONTRACT_ADDR};
use cosmwasm_std::{
    from_binary, from_slice, to_binary, Coin, ContractResult, Empty, OwnedDeps, Querier,
    QuerierResult, QueryRequest, SystemError, SystemResult, Uint128, WasmQuery,
};
use cw20::{BalanceResponse, Cw20QueryMsg, TokenInfoResponse};

use crate::msg::{IsWhitelistedResponse, WhitelistQueryMsg};

pub fn mock_dependencies(
    contract_balance: &[Coin],
) -> OwnedDeps<MockStorage, MockApi, WasmMockQuerier> {
    let custom_querier =
        WasmMockQuerier::new(MockQuerier::new(&[(MOCK_CONTRACT_ADDR, contract_balance)]));

    OwnedDeps {
        storage: MockStorage::default(),
        api: MockApi::default(),
        querier: custom_querier,
        custom_query_type: PhantomData,
    }
}

pub struct WasmMockQuerier {
    base: MockQuerier<Empty>,
    // cw20 contract -> decimals; unregistered tokens fail the TokenInfo query
    token_decimals: HashMap<String, u8>,
    // cw20 contract -> holder -> balance
    token_balances: HashMap<String, HashMap<String, Uint128>>,
    whitelisted: HashSet<String>,
}

impl Querier for WasmMockQuerier {
    fn raw_query(&self, bin_request: &[u8]) -> QuerierResult {
        let request: QueryRequest<Empty> = match from_slice(bin_request) {
            Ok(v) => v,
            Err(e) => {
                return SystemResult::Err(SystemError::InvalidRequest {
                    error: format!("Parsing query request: {}", e),
                    request: bin_request.into(),
                })
            }
        };
        self.handle_query(&request)
    }
}

impl WasmMockQuerier {
    pub fn handle_query(&self, request: &QueryRequest<Empty>) -> QuerierResult {
        match request {
            QueryRequest::Wasm(WasmQuery::Smart { contract_addr, msg }) => {
                if let Ok(query) = from_binary::<Cw20QueryMsg>(msg) {
                    return self.handle_cw20(contract_addr, query);
                }
                if let Ok(WhitelistQueryMsg::IsWhitelisted { user }) = from_binary(msg) {
                    return SystemResult::Ok(ContractResult::Ok(
                        to_binary(&IsWhitelistedResponse {
                            whitelisted: self.whitelisted.contains(&user),
                        })
                        .unwrap(),
                    ));
                }
                SystemResult::Err(SystemError::NoSuchContract {
                    addr: contract_addr.clone(),
                })
            }
            _ => self.base.handle_query(request),
        }
    }

    fn handle_cw20(&self, contract_addr: &str, query: Cw20QueryMsg) -> QuerierResult {
        match query {
            Cw20QueryMsg::TokenInfo {} => match self.token_decimals.get(contract_addr) {
                Some(decimals) => SystemResult::Ok(ContractResult::Ok(
                    to_binary(&TokenInfoResponse {
                        name: contract_addr.to_string(),
                        symbol: "TOKEN".to_string(),
                        decimals: *decimals,
                        total_supply: Uint128::zero(),
                    })
                    .unwrap(),
                )),
                None => SystemResult::Err(SystemError::NoSuchContract {
                    addr: contract_addr.to_string(),
                }),
            },
            Cw20QueryMsg::Balance { address } => {
                let balance = self
                    .token_balances
                    .get(contract_addr)
                    .and_then(|balances| balances.get(&address))
                    .copied()
                    .unwrap_or_default();
                SystemResult::Ok(ContractResult::Ok(
                    to_binary(&BalanceResponse { balance }).unwrap(),
                ))
            }
            _ => SystemResult::Err(SystemError::Unknown {}),
        }
    }

    pub fn new(base: MockQuerier<Empty>) -> Self {
        WasmMockQuerier {
            base,
            token_decimals: HashMap::new(),
            token_balances: HashMap::new(),
            whitelisted: HashSet::new(),
        }
    }

    pub fn with_token_decimals(&mut self, token: &str, decimals: u8) {
        self.token_decimals.insert(token.to_string(), decimals);
    }

    pub fn with_token_balance(&mut self, token: &str, holder: &str, balance: Uint128) {
        self.token_balances
            .entry(token.to_string())
            .or_default()
            .insert(holder.to_string(), balance);
    }

    pub fn with_whitelisted(&mut self, user: &str) {
        self.whitelisted.insert(user.to_string());
    }
}
