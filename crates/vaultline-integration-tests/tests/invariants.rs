//! Property tests: accounting invariants under random operation sequences.
//!
//! Every generated sequence mixes deposits, withdrawals, claims, yield
//! credit and impairment across three users and both strategies. After
//! each operation:
//!
//! - ledger totals equal the sum over positions (principal and shares)
//! - the accumulator never decreases
//! - credited rewards are conserved up to carried fixed-point dust
//! - a failed operation leaves every piece of state untouched

use proptest::prelude::*;
use vaultline_integration_tests::Harness;
use vaultline_ledger::{RefreshOutcome, StrategyLedger, UserPosition};
use vaultline_types::units::tokens;
use vaultline_types::{wide, Address, Amount, StrategyId, ACC_PRECISION};

const USERS: [&str; 3] = ["alice", "bob", "carol"];

#[derive(Debug, Clone)]
enum Op {
    Deposit { user: usize, strategy: StrategyId, amount: Amount },
    Withdraw { user: usize, strategy: StrategyId, per_mille: u32 },
    Claim { user: usize, strategy: StrategyId },
    Accrue { strategy: StrategyId, amount: Amount },
    Impair { strategy: StrategyId, per_mille: u32 },
    Refresh { strategy: StrategyId },
}

fn strategy_strategy() -> impl Strategy<Value = StrategyId> {
    prop_oneof![Just(StrategyId::Staking), Just(StrategyId::Amm)]
}

// Amounts from dust up to a million tokens.
fn amount_strategy() -> impl Strategy<Value = Amount> {
    prop_oneof![1u128..1_000_000, 1u128..tokens(1_000_000)]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..USERS.len(), strategy_strategy(), amount_strategy())
            .prop_map(|(user, strategy, amount)| Op::Deposit { user, strategy, amount }),
        2 => (0..USERS.len(), strategy_strategy(), 1u32..=1000)
            .prop_map(|(user, strategy, per_mille)| Op::Withdraw { user, strategy, per_mille }),
        2 => (0..USERS.len(), strategy_strategy())
            .prop_map(|(user, strategy)| Op::Claim { user, strategy }),
        3 => (strategy_strategy(), 0u128..tokens(10_000))
            .prop_map(|(strategy, amount)| Op::Accrue { strategy, amount }),
        1 => (strategy_strategy(), 1u32..=200)
            .prop_map(|(strategy, per_mille)| Op::Impair { strategy, per_mille }),
        1 => strategy_strategy().prop_map(|strategy| Op::Refresh { strategy }),
    ]
}

type State = (Vec<StrategyLedger>, Vec<Option<UserPosition>>, Vec<Amount>);

fn users() -> Vec<Address> {
    USERS.iter().map(|label| Harness::user(label)).collect()
}

fn snapshot(h: &Harness, users: &[Address]) -> State {
    let ledgers = StrategyId::ALL
        .iter()
        .map(|s| h.vault.ledger(*s).clone())
        .collect();
    let positions = StrategyId::ALL
        .iter()
        .flat_map(|s| users.iter().map(move |u| (*s, *u)))
        .map(|(s, u)| h.vault.position(&u, s).cloned())
        .collect();
    let mut balances: Vec<Amount> = users.iter().map(|u| h.balance(u)).collect();
    balances.push(h.balance(&h.staking));
    balances.push(h.balance(&h.amm));
    (ledgers, positions, balances)
}

/// Apply `op`. Returns `false` if the vault rejected it.
fn apply(h: &mut Harness, users: &[Address], op: &Op) -> bool {
    match *op {
        Op::Deposit { user, strategy, amount } => {
            h.vault.deposit(&users[user], strategy, amount).is_ok()
        }
        Op::Withdraw { user, strategy, per_mille } => {
            let principal = h.vault.get_user_deposit_balance(&users[user], strategy);
            let amount = principal * per_mille as u128 / 1000;
            h.vault.withdraw(&users[user], strategy, amount).is_ok()
        }
        Op::Claim { user, strategy } => h.vault.claim(&users[user], strategy).is_ok(),
        Op::Accrue { strategy, amount } => {
            h.accrue(strategy, amount).expect("accrue");
            true
        }
        Op::Impair { strategy, per_mille } => {
            let reserve = h.balance(&h.source(strategy));
            h.impair(strategy, reserve * per_mille as u128 / 1000)
                .expect("impair");
            true
        }
        Op::Refresh { strategy } => {
            h.vault.refresh(strategy).expect("refresh");
            true
        }
    }
}

fn funded() -> (Harness, Vec<Address>) {
    let mut h = Harness::new().expect("harness");
    let users = users();
    for user in &users {
        h.fund(user, tokens(1_000_000_000)).expect("fund");
    }
    (h, users)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_accounting_invariants(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let (mut h, users) = funded();
        let mut acc_before = [0u128; 2];

        for (step, op) in ops.iter().enumerate() {
            let before = snapshot(&h, &users);
            let committed = apply(&mut h, &users, op);
            if !committed {
                prop_assert_eq!(&snapshot(&h, &users), &before, "rejected {:?} changed state", op);
            }

            for strategy in StrategyId::ALL {
                let ledger = h.vault.ledger(strategy);
                let acc = ledger.reward_acc_per_share();

                let mut principal = 0u128;
                let mut shares = 0u128;
                let mut rewards = 0u128;
                for user in &users {
                    if let Some(position) = h.vault.position(user, strategy) {
                        principal += position.principal;
                        shares += position.shares;
                        rewards += position.reward_balance(acc).expect("reward balance")
                            + position.claimed_rewards;
                    }
                }

                prop_assert_eq!(ledger.total_principal(), principal);
                prop_assert_eq!(ledger.total_shares(), shares);
                prop_assert!(acc >= acc_before[strategy.index()], "accumulator decreased");
                acc_before[strategy.index()] = acc;

                let distributed = ledger.total_distributed();
                prop_assert!(rewards <= distributed, "rewards {} exceed distributed {}", rewards, distributed);
                let max_shares = tokens(1_000_000) * 40;
                let dust = max_shares / ACC_PRECISION + 1 + 3 * (step as u128 + 2);
                prop_assert!(
                    distributed - rewards <= dust,
                    "lost {} base units of reward", distributed - rewards
                );
            }
        }
    }

    #[test]
    fn prop_refresh_is_idempotent(
        ops in prop::collection::vec(op_strategy(), 1..20),
        strategy in strategy_strategy(),
    ) {
        let (mut h, users) = funded();
        for op in &ops {
            apply(&mut h, &users, op);
        }

        h.vault.refresh(strategy).expect("first refresh");
        let ledger = h.vault.ledger(strategy).clone();
        let second = h.vault.refresh(strategy).expect("second refresh");

        prop_assert!(matches!(
            second,
            RefreshOutcome::Unchanged | RefreshOutcome::Loss { .. }
        ), "second refresh outcome was {:?}", second);
        prop_assert_eq!(h.vault.ledger(strategy), &ledger);
    }

    #[test]
    fn prop_views_do_not_mutate(ops in prop::collection::vec(op_strategy(), 1..20)) {
        let (mut h, users) = funded();
        for op in &ops {
            apply(&mut h, &users, op);
        }

        let before = snapshot(&h, &users);
        let sequence = h.vault.events().sequence();
        for user in &users {
            let preview = h.vault.get_reward_balance(user).expect("reward balance");
            prop_assert_eq!(h.vault.get_reward_balance(user).expect("reward balance"), preview);
        }
        prop_assert_eq!(snapshot(&h, &users), before);
        prop_assert_eq!(h.vault.events().sequence(), sequence);
    }

    #[test]
    fn prop_rewards_proportional_to_deposit(
        a in 1u128..tokens(1_000_000),
        b in 1u128..tokens(1_000_000),
        growth in 0u128..tokens(100_000),
        strategy in strategy_strategy(),
    ) {
        let (mut h, users) = funded();
        h.vault.deposit(&users[0], strategy, a).expect("deposit a");
        h.vault.deposit(&users[1], strategy, b).expect("deposit b");
        h.accrue(strategy, growth).expect("accrue");

        let reward_a = h.vault.get_reward_balance(&users[0]).expect("reward a").get(strategy);
        let reward_b = h.vault.get_reward_balance(&users[1]).expect("reward b").get(strategy);

        let ideal_a = wide::mul_div(growth, a, a + b).expect("ideal a");
        let ideal_b = wide::mul_div(growth, b, a + b).expect("ideal b");
        prop_assert!(reward_a <= ideal_a);
        prop_assert!(reward_b <= ideal_b);
        prop_assert!(ideal_a - reward_a <= a / ACC_PRECISION + 1);
        prop_assert!(ideal_b - reward_b <= b / ACC_PRECISION + 1);
    }

    #[test]
    fn prop_late_entry_does_not_dilute(
        early in 1u128..tokens(1_000_000),
        late in 1u128..tokens(1_000_000),
        growth in 0u128..tokens(100_000),
        strategy in strategy_strategy(),
    ) {
        let (mut h, users) = funded();
        h.vault.deposit(&users[0], strategy, early).expect("early deposit");
        h.accrue(strategy, growth).expect("accrue");
        let before = h.vault.get_reward_balance(&users[0]).expect("early reward");

        h.vault.deposit(&users[1], strategy, late).expect("late deposit");

        prop_assert_eq!(h.vault.get_reward_balance(&users[0]).expect("early reward"), before);
        prop_assert_eq!(h.vault.get_reward_balance(&users[1]).expect("late reward").total(), 0);
    }
}
