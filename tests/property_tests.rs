use proptest::prelude::*;
use rust_decimal::Decimal;
use settlement_engine::core::currency::{Currency, ExchangeRate};
use settlement_engine::core::member::MemberId;
use settlement_engine::core::transaction::{Transaction, TransactionKind};
use settlement_engine::engine::aggregation::aggregate;
use settlement_engine::engine::evaluation::SettlementEngine;
use settlement_engine::engine::planner::{settle, EPSILON};

const POOL: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

/// Generate a non-empty group drawn from a small pool of names.
fn arb_members() -> impl Strategy<Value = Vec<MemberId>> {
    (1usize..=POOL.len()).prop_map(|n| POOL[..n].iter().map(|name| MemberId::new(*name)).collect())
}

/// Generate a random positive amount (1 to 100,000).
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1u64..100_000u64).prop_map(Decimal::from)
}

fn arb_rate() -> impl Strategy<Value = ExchangeRate> {
    (1u32..500u32).prop_map(|r| ExchangeRate::new(Decimal::from(r)).unwrap())
}

fn arb_kind() -> impl Strategy<Value = TransactionKind> {
    prop_oneof![
        4 => Just(TransactionKind::Expense),
        1 => Just(TransactionKind::Income),
    ]
}

fn arb_currency() -> impl Strategy<Value = Currency> {
    prop_oneof![Just(Currency::Primary), Just(Currency::Secondary)]
}

/// Generate a transaction that only references `members`.
fn arb_transaction(members: Vec<MemberId>) -> impl Strategy<Value = Transaction> {
    let n = members.len();
    (
        arb_kind(),
        0..n,
        arb_amount(),
        arb_currency(),
        prop::collection::vec(any::<bool>(), n),
        prop::option::of(arb_rate()),
    )
        .prop_map(move |(kind, payer, amount, currency, mask, snapshot)| {
            let split: Vec<MemberId> = members
                .iter()
                .zip(mask)
                .filter(|(_, keep)| *keep)
                .map(|(m, _)| m.clone())
                .collect();
            let tx = Transaction::new(kind, members[payer].clone(), amount, currency)
                .with_split(split);
            match snapshot {
                Some(rate) => tx.with_exchange_rate(rate),
                None => tx,
            }
        })
}

/// Generate a group with 0..30 valid transactions.
fn arb_trip() -> impl Strategy<Value = (Vec<MemberId>, Vec<Transaction>)> {
    arb_members().prop_flat_map(|members| {
        let txs = prop::collection::vec(arb_transaction(members.clone()), 0..30);
        (Just(members), txs)
    })
}

proptest! {
    // ===================================================================
    // INVARIANT 1: Balances sum to zero.
    //
    // Every reference-currency unit paid is owed by the participants of
    // the same transaction, so the ledger is zero-sum up to residue.
    // ===================================================================
    #[test]
    fn balances_sum_to_zero((members, txs) in arb_trip(), rate in arb_rate()) {
        let agg = aggregate(&members, &txs, rate).unwrap();
        prop_assert!(
            agg.imbalance().abs() < EPSILON,
            "Imbalance {} must be within EPSILON",
            agg.imbalance()
        );
    }

    // ===================================================================
    // INVARIANT 2: Executing the plan zeroes every balance.
    // ===================================================================
    #[test]
    fn plan_settles_everyone((members, txs) in arb_trip(), rate in arb_rate()) {
        let eval = SettlementEngine::evaluate(&members, &txs, rate).unwrap();
        let residual = eval.plan.apply(eval.aggregate.net_balances());
        for (member, left) in &residual {
            prop_assert!(
                left.abs() < EPSILON,
                "{} is left with {} after settlement",
                member,
                left
            );
        }
    }

    // ===================================================================
    // INVARIANT 3: Every transfer is at least EPSILON and between two
    // different members.
    // ===================================================================
    #[test]
    fn transfers_are_meaningful((members, txs) in arb_trip(), rate in arb_rate()) {
        let eval = SettlementEngine::evaluate(&members, &txs, rate).unwrap();
        for s in &eval.plan {
            prop_assert!(s.amount >= EPSILON, "Transfer {} below EPSILON", s);
            prop_assert_ne!(&s.from, &s.to);
        }
    }

    // ===================================================================
    // INVARIANT 4: Evaluation is deterministic.
    //
    // Same inputs, same outputs. No randomness, no hidden state.
    // ===================================================================
    #[test]
    fn evaluation_is_deterministic((members, txs) in arb_trip(), rate in arb_rate()) {
        let first = SettlementEngine::evaluate(&members, &txs, rate).unwrap();
        let second = SettlementEngine::evaluate(&members, &txs, rate).unwrap();
        prop_assert_eq!(first, second);
    }

    // ===================================================================
    // INVARIANT 5: A single-member group never owes anything.
    // ===================================================================
    #[test]
    fn single_member_is_always_settled(
        txs in prop::collection::vec(arb_transaction(vec![MemberId::new("Solo")]), 0..20),
        rate in arb_rate(),
    ) {
        let members = vec![MemberId::new("Solo")];
        let eval = SettlementEngine::evaluate(&members, &txs, rate).unwrap();
        prop_assert_eq!(eval.aggregate.balance(&members[0]), Some(Decimal::ZERO));
        prop_assert!(eval.plan.is_empty());
    }

    // ===================================================================
    // INVARIANT 6: The plan needs at most (debtors + creditors - 1)
    // transfers.
    // ===================================================================
    #[test]
    fn plan_length_is_bounded((members, txs) in arb_trip(), rate in arb_rate()) {
        let agg = aggregate(&members, &txs, rate).unwrap();
        let parties = agg
            .balances
            .iter()
            .filter(|b| b.balance.abs() >= EPSILON)
            .count();
        let plan = settle(agg.net_balances());
        prop_assert!(
            plan.len() <= parties.saturating_sub(1),
            "{} transfers for {} unsettled members",
            plan.len(),
            parties
        );
    }

    // ===================================================================
    // INVARIANT 7: Totals match the converted transactions.
    // ===================================================================
    #[test]
    fn net_total_is_expense_minus_income((members, txs) in arb_trip(), rate in arb_rate()) {
        let agg = aggregate(&members, &txs, rate).unwrap();
        prop_assert_eq!(agg.net_total, agg.total_expense - agg.total_income);
        let from_entries: Decimal = agg.entries.iter().map(|e| e.amount).sum();
        let gross = agg.total_expense + agg.total_income;
        prop_assert!((from_entries - gross).abs() < EPSILON);
        prop_assert_eq!(agg.entries.len(), txs.len());
    }
}
