use crate::core::member::MemberId;
use log::trace;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Tolerance, in reference-currency units, below which a balance or a
/// transfer counts as zero. Absorbs division residue; not a business rule.
pub const EPSILON: Decimal = dec!(0.01);

/// A single payment: `from` pays `to` the given `amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Debtor making the payment.
    pub from: MemberId,
    /// Creditor receiving it.
    pub to: MemberId,
    /// Amount in the reference currency, at least [`EPSILON`].
    pub amount: Decimal,
}

impl fmt::Display for Settlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}: {}", self.from, self.to, self.amount)
    }
}

/// Ordered list of payments that, once executed, zero every balance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettlementPlan {
    transfers: Vec<Settlement>,
}

impl SettlementPlan {
    pub fn transfers(&self) -> &[Settlement] {
        &self.transfers
    }

    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    /// Total money moved by the plan.
    pub fn total_transferred(&self) -> Decimal {
        self.transfers.iter().map(|s| s.amount).sum()
    }

    /// Execute every transfer against `balances` and return what is left.
    ///
    /// Paying moves the debtor up and the creditor down, so a correct plan
    /// leaves every residual within [`EPSILON`] of zero.
    pub fn apply(
        &self,
        balances: impl IntoIterator<Item = (MemberId, Decimal)>,
    ) -> HashMap<MemberId, Decimal> {
        let mut residual: HashMap<MemberId, Decimal> = balances.into_iter().collect();
        for transfer in &self.transfers {
            *residual.entry(transfer.from.clone()).or_insert(Decimal::ZERO) += transfer.amount;
            *residual.entry(transfer.to.clone()).or_insert(Decimal::ZERO) -= transfer.amount;
        }
        residual
    }
}

impl<'a> IntoIterator for &'a SettlementPlan {
    type Item = &'a Settlement;
    type IntoIter = std::slice::Iter<'a, Settlement>;

    fn into_iter(self) -> Self::IntoIter {
        self.transfers.iter()
    }
}

impl fmt::Display for SettlementPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.transfers.is_empty() {
            return writeln!(f, "All settled up.");
        }
        for transfer in &self.transfers {
            writeln!(f, "  {}", transfer)?;
        }
        Ok(())
    }
}

/// Build a settlement plan with a greedy minimum-cash-flow match.
///
/// # Algorithm
///
/// 1. Split members into debtors (balance ≤ -EPSILON) and creditors
///    (balance ≥ EPSILON); everyone else is already settled.
/// 2. Sort debtors most-negative first and creditors largest first. Ties
///    keep input order.
/// 3. Repeatedly match the front debtor with the front creditor for
///    `min(|debt|, credit)`, removing whoever drops below EPSILON.
///
/// Each emitted transfer resolves at least one party, so the plan has at
/// most `debtors + creditors - 1` entries. The greedy match is not a true
/// minimum-transaction solver; some inputs admit shorter plans.
///
/// # Examples
///
/// ```
/// use settlement_engine::core::member::MemberId;
/// use settlement_engine::engine::planner::settle;
/// use rust_decimal_macros::dec;
///
/// let plan = settle(vec![
///     (MemberId::new("Alice"), dec!(50)),
///     (MemberId::new("Bob"), dec!(-50)),
/// ]);
/// assert_eq!(plan.len(), 1);
/// assert_eq!(plan.transfers()[0].from, MemberId::new("Bob"));
/// ```
pub fn settle(balances: impl IntoIterator<Item = (MemberId, Decimal)>) -> SettlementPlan {
    let mut debtors = Vec::new();
    let mut creditors = Vec::new();
    for (member, balance) in balances {
        if balance <= -EPSILON {
            debtors.push((member, balance));
        } else if balance >= EPSILON {
            creditors.push((member, balance));
        }
    }
    debtors.sort_by(|a, b| a.1.cmp(&b.1));
    creditors.sort_by(|a, b| b.1.cmp(&a.1));

    let mut debtors = VecDeque::from(debtors);
    let mut creditors = VecDeque::from(creditors);
    let mut transfers = Vec::new();

    while let (Some(debtor), Some(creditor)) = (debtors.front_mut(), creditors.front_mut()) {
        let amount = debtor.1.abs().min(creditor.1);

        if amount < EPSILON {
            // Floating residue on both sides; drop the smaller one.
            let debtor_smaller = debtor.1.abs() < creditor.1.abs();
            if debtor_smaller {
                debtors.pop_front();
            } else {
                creditors.pop_front();
            }
            continue;
        }

        trace!("{} pays {} {}", debtor.0, creditor.0, amount);
        transfers.push(Settlement {
            from: debtor.0.clone(),
            to: creditor.0.clone(),
            amount,
        });

        debtor.1 += amount;
        creditor.1 -= amount;

        let debtor_done = debtor.1.abs() < EPSILON;
        let creditor_done = creditor.1.abs() < EPSILON;
        if debtor_done {
            debtors.pop_front();
        }
        if creditor_done {
            creditors.pop_front();
        }
    }

    SettlementPlan { transfers }
}
