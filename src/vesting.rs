use core::convert::TryFrom;
use cosmwasm_std::{StdError, StdResult, Uint128, Uint256};

/// Sale-token amount bought by `fund_amount` settlement units at
/// `price_per_token` settlement units per whole token.
pub fn token_allocation(
    fund_amount: Uint128,
    price_per_token: Uint128,
    token_decimals: u8,
) -> StdResult<Uint128> {
    let scaled = Uint256::from(fund_amount)
        .checked_mul(Uint256::from(u128::pow(10, token_decimals as u32)))
        .map_err(StdError::overflow)?
        .checked_div(Uint256::from(price_per_token))
        .map_err(StdError::divide_by_zero)?;

    Uint128::try_from(scaled)
        .map_err(|_| StdError::generic_err("allocation does not fit in Uint128"))
}

/// Newly claimable amount at `now` for an allocation releasing
/// `initial_release_bps` at `claim_time` and vesting the rest linearly
/// between `claim_time + cliff_duration` and `+ vesting_duration`.
///
/// Deterministic and stateless; the claim entry point and the claimable
/// query both go through here. Callers gate on `now >= claim_time`.
pub fn claimable(
    total_allocation: Uint128,
    already_claimed: Uint128,
    claim_time: u64,
    cliff_duration: u64,
    vesting_duration: u64,
    initial_release_bps: u64,
    now: u64,
) -> Uint128 {
    let initial = total_allocation
        .multiply_ratio(initial_release_bps, crate::state::MAX_BPS)
        .min(total_allocation);
    let remaining = total_allocation - initial;

    let vesting_start = claim_time.saturating_add(cliff_duration);
    let vested = if now < vesting_start {
        Uint128::zero()
    } else if vesting_duration == 0 || now >= vesting_start.saturating_add(vesting_duration) {
        remaining
    } else {
        remaining.multiply_ratio(now - vesting_start, vesting_duration)
    };

    let available = initial + vested;
    if available <= already_claimed {
        Uint128::zero()
    } else {
        available - already_claimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_allocation() {
        // 100 units at 2 units per token, one decimal place
        let amount = token_allocation(Uint128::new(100), Uint128::new(2), 1).unwrap();
        assert_eq!(amount, Uint128::new(500));

        // floor division
        let amount = token_allocation(Uint128::new(7), Uint128::new(3), 0).unwrap();
        assert_eq!(amount, Uint128::new(2));

        // widened intermediate product must still fit Uint128 at the end
        let err = token_allocation(Uint128::MAX, Uint128::new(1), 18).unwrap_err();
        assert_eq!(
            err,
            StdError::generic_err("allocation does not fit in Uint128")
        );
    }

    #[test]
    fn test_claimable_schedule() {
        let total = Uint128::new(1000);
        let claim_time = 5000;

        // half up front, the rest over 1000 seconds, no cliff
        let at_start = claimable(total, Uint128::zero(), claim_time, 0, 1000, 5000, claim_time);
        assert_eq!(at_start, Uint128::new(500));

        let halfway = claimable(total, Uint128::zero(), claim_time, 0, 1000, 5000, claim_time + 500);
        assert_eq!(halfway, Uint128::new(750));

        let done = claimable(total, Uint128::zero(), claim_time, 0, 1000, 5000, claim_time + 1000);
        assert_eq!(done, Uint128::new(1000));

        let past = claimable(total, Uint128::zero(), claim_time, 0, 1000, 5000, claim_time + 9999);
        assert_eq!(past, Uint128::new(1000));
    }

    #[test]
    fn test_claimable_deducts_claimed() {
        let total = Uint128::new(1000);
        let claim_time = 5000;

        // claim the initial release, come back halfway through vesting
        let step = claimable(total, Uint128::new(500), claim_time, 0, 1000, 5000, claim_time + 500);
        assert_eq!(step, Uint128::new(250));

        // over-claimed state never yields a negative
        let none = claimable(total, Uint128::new(1000), claim_time, 0, 1000, 5000, claim_time + 500);
        assert_eq!(none, Uint128::zero());
    }

    #[test]
    fn test_claimable_cliff() {
        let total = Uint128::new(1000);
        let claim_time = 5000;

        // only the initial release before the cliff ends
        let before = claimable(total, Uint128::zero(), claim_time, 600, 1000, 1000, claim_time + 599);
        assert_eq!(before, Uint128::new(100));

        // linear vesting counts from the cliff end
        let after = claimable(total, Uint128::zero(), claim_time, 600, 1000, 1000, claim_time + 600 + 500);
        assert_eq!(after, Uint128::new(100) + Uint128::new(450));
    }

    #[test]
    fn test_claimable_no_vesting_duration() {
        let total = Uint128::new(1000);
        // everything unlocks as soon as the cliff passes
        let all = claimable(total, Uint128::zero(), 5000, 100, 0, 2500, 5100);
        assert_eq!(all, total);

        let before_cliff = claimable(total, Uint128::zero(), 5000, 100, 0, 2500, 5099);
        assert_eq!(before_cliff, Uint128::new(250));
    }

    #[test]
    fn test_claimable_floors() {
        // 3333 bps of 1000 floors to 333
        let initial = claimable(Uint128::new(1000), Uint128::zero(), 5000, 0, 1000, 3333, 5000);
        assert_eq!(initial, Uint128::new(333));

        // 667 remaining over 1000 seconds floors at each step
        let mid = claimable(Uint128::new(1000), Uint128::zero(), 5000, 0, 1000, 3333, 5001);
        assert_eq!(mid, Uint128::new(333));
    }
}
