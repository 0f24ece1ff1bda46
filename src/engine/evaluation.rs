use crate::core::currency::ExchangeRate;
use crate::core::member::MemberId;
use crate::core::transaction::Transaction;
use crate::engine::aggregation::{aggregate, Aggregate, AggregationError};
use crate::engine::planner::{settle, SettlementPlan};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}

/// Everything the engine derives from a group: totals, balances and the
/// plan that settles them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub aggregate: Aggregate,
    pub plan: SettlementPlan,
}

/// The balance-aggregation and debt-settlement engine.
///
/// Stateless: every call recomputes from its inputs, so identical inputs
/// always yield identical outputs and independent calls can run
/// concurrently without coordination.
pub struct SettlementEngine;

impl SettlementEngine {
    /// Aggregate `transactions` over `members`, then plan the settlement.
    ///
    /// # Examples
    ///
    /// ```
    /// use settlement_engine::prelude::*;
    /// use rust_decimal_macros::dec;
    ///
    /// let members = vec![MemberId::new("Alice"), MemberId::new("Bob")];
    /// let txs = vec![Transaction::expense(MemberId::new("Alice"), dec!(100), Currency::Primary)];
    /// let rate = ExchangeRate::new(dec!(115)).unwrap();
    ///
    /// let eval = SettlementEngine::evaluate(&members, &txs, rate).unwrap();
    /// assert_eq!(eval.aggregate.balance(&MemberId::new("Bob")), Some(dec!(-50)));
    /// assert_eq!(eval.plan.len(), 1);
    /// ```
    pub fn evaluate(
        members: &[MemberId],
        transactions: &[Transaction],
        ambient: ExchangeRate,
    ) -> Result<Evaluation, EngineError> {
        let aggregate = aggregate(members, transactions, ambient)?;
        let plan = settle(aggregate.net_balances());
        debug!(
            "settlement plan: {} transfers moving {}",
            plan.len(),
            plan.total_transferred()
        );
        Ok(Evaluation { aggregate, plan })
    }
}

impl std::fmt::Display for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let agg = &self.aggregate;
        writeln!(f, "=== Settlement Result ===")?;
        writeln!(f, "Total Expense:  {}", agg.total_expense.round_dp(2))?;
        writeln!(f, "Total Income:   {}", agg.total_income.round_dp(2))?;
        writeln!(f, "Net Total:      {}", agg.net_total.round_dp(2))?;

        writeln!(f, "\n--- Balances ---")?;
        for b in &agg.balances {
            writeln!(
                f,
                "  {:<15} paid {:>12}  balance {:>12}",
                b.member.as_str(),
                b.paid.round_dp(2),
                b.balance.round_dp(2)
            )?;
        }

        writeln!(f, "\n--- Settlements ---")?;
        write!(f, "{}", self.plan)
    }
}
