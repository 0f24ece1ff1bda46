//! Walkthrough of a small trip: mixed currencies, a refund, and a member
//! leaving the group.

use rust_decimal_macros::dec;
use settlement_engine::prelude::*;

fn main() {
    println!("╔══════════════════════════════════════════╗");
    println!("║  settlement-engine: Trip Split Example   ║");
    println!("╚══════════════════════════════════════════╝\n");

    let pair = CurrencyPair::default();
    let rate = ExchangeRate::new(dec!(115)).expect("positive rate");

    let mut group = Group::new("Nagoya Trip", ["Tongliang", "Weiren", "Chris", "David"]);
    let weiren = MemberId::new("Weiren");
    let tongliang = MemberId::new("Tongliang");
    let chris = MemberId::new("Chris");

    group.add_transaction(
        Transaction::expense(weiren.clone(), dec!(8250), Currency::Secondary)
            .with_description("Udon"),
    );
    group.add_transaction(
        Transaction::expense(weiren.clone(), dec!(70.80), Currency::Primary)
            .with_description("Nagoya Aquarium"),
    );
    group.add_transaction(
        Transaction::expense(tongliang.clone(), dec!(9650), Currency::Secondary)
            .with_exchange_rate(ExchangeRate::new(dec!(110)).expect("positive rate"))
            .with_description("Gujo lunch (rate pinned at 110)"),
    );
    group.add_transaction(
        Transaction::income(chris.clone(), dec!(2000), Currency::Secondary)
            .with_description("Parking refund"),
    );

    // --- Scenario 1: everyone present ---
    println!("━━━ Scenario 1: Four members ({} at {}) ━━━\n", pair, rate);
    let eval = group.evaluate(rate).expect("normalized group");
    println!("{}", eval);

    // --- Scenario 2: David leaves, his shares are redistributed ---
    println!("━━━ Scenario 2: David leaves the group ━━━\n");
    group.remove_member(&MemberId::new("David"));
    let eval = group.evaluate(rate).expect("normalized group");
    println!("{}", eval);

    // --- Scenario 3: the ambient rate moves ---
    println!("━━━ Scenario 3: Rate moves to 120 ━━━\n");
    let moved = ExchangeRate::new(dec!(120)).expect("positive rate");
    let eval = group.evaluate(moved).expect("normalized group");
    for entry in &eval.aggregate.entries {
        let rate = entry
            .rate
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<8} {:>10} {}  (rate {})",
            entry.kind.to_string(),
            entry.amount.round_dp(2),
            pair.code(Currency::Primary),
            rate
        );
    }
    println!();
    print!("{}", eval.plan);
}
