use crate::core::member::MemberId;
use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("'{member}' is not a member of this ledger")]
    UnknownMember { member: MemberId },
    #[error("position of '{member}' no longer fits in a decimal")]
    Overflow { member: MemberId },
}

/// What one member fronted and what they consumed, in the reference currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Signed total paid on behalf of the group (incomes subtract).
    pub paid: Decimal,
    /// Signed total of the shares this member is responsible for.
    pub owed: Decimal,
}

impl Position {
    pub fn balance(&self) -> Decimal {
        self.paid - self.owed
    }
}

/// Net balance of one member.
///
/// A positive balance means the member is owed money (net creditor).
/// A negative balance means the member owes money (net debtor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBalance {
    pub member: MemberId,
    /// Signed total paid on behalf of the group.
    pub paid: Decimal,
    /// Signed total of this member's shares.
    pub owed: Decimal,
    /// `paid - owed`.
    pub balance: Decimal,
}

/// Tracks the paid/owed position of every member of a group.
///
/// The member list is fixed at construction and its order is preserved
/// in every report. Touching a name that was not registered is an error,
/// the ledger never creates positions on the fly.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    members: Vec<MemberId>,
    positions: HashMap<MemberId, Position>,
}

impl Ledger {
    /// Open a ledger with a zero position for every member.
    ///
    /// Duplicate names collapse into the first occurrence.
    pub fn new(members: impl IntoIterator<Item = MemberId>) -> Self {
        let mut ledger = Self::default();
        for member in members {
            if ledger.positions.contains_key(&member) {
                warn!("duplicate member '{}' ignored", member);
                continue;
            }
            ledger.positions.insert(member.clone(), Position::default());
            ledger.members.push(member);
        }
        ledger
    }

    pub fn members(&self) -> &[MemberId] {
        &self.members
    }

    pub fn contains(&self, member: &MemberId) -> bool {
        self.positions.contains_key(member)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Credit `member` with a signed payment.
    pub fn record_payment(&mut self, member: &MemberId, amount: Decimal) -> Result<(), LedgerError> {
        self.update(member, |p| {
            Some(Position {
                paid: p.paid.checked_add(amount)?,
                ..p
            })
        })
    }

    /// Charge `member` with a signed share.
    pub fn record_share(&mut self, member: &MemberId, amount: Decimal) -> Result<(), LedgerError> {
        self.update(member, |p| {
            Some(Position {
                owed: p.owed.checked_add(amount)?,
                ..p
            })
        })
    }

    /// Replace the position of `member`, keeping the old one if the new
    /// totals or the resulting balance overflow.
    fn update(
        &mut self,
        member: &MemberId,
        next: impl FnOnce(Position) -> Option<Position>,
    ) -> Result<(), LedgerError> {
        let position = self.position_mut(member)?;
        let updated = next(*position)
            .filter(|p| p.paid.checked_sub(p.owed).is_some())
            .ok_or_else(|| LedgerError::Overflow {
                member: member.clone(),
            })?;
        *position = updated;
        Ok(())
    }

    fn position_mut(&mut self, member: &MemberId) -> Result<&mut Position, LedgerError> {
        self.positions
            .get_mut(member)
            .ok_or_else(|| LedgerError::UnknownMember {
                member: member.clone(),
            })
    }

    /// Position of `member`; zero for unknown names.
    pub fn position(&self, member: &MemberId) -> Position {
        self.positions.get(member).copied().unwrap_or_default()
    }

    pub fn balance(&self, member: &MemberId) -> Decimal {
        self.position(member).balance()
    }

    /// Balances of all members, in membership order.
    pub fn balances(&self) -> Vec<MemberBalance> {
        self.members
            .iter()
            .map(|member| {
                let position = self.position(member);
                MemberBalance {
                    member: member.clone(),
                    paid: position.paid,
                    owed: position.owed,
                    balance: position.balance(),
                }
            })
            .collect()
    }

    /// Sum of all balances. Zero up to division residue for valid input.
    pub fn imbalance(&self) -> Decimal {
        self.positions.values().map(Position::balance).sum()
    }

    pub fn is_balanced(&self, tolerance: Decimal) -> bool {
        self.imbalance().abs() < tolerance
    }

    /// Total owed to creditors (sum of positive balances).
    pub fn total_outstanding(&self) -> Decimal {
        self.positions
            .values()
            .map(Position::balance)
            .filter(|b| *b > Decimal::ZERO)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ledger(names: &[&str]) -> Ledger {
        Ledger::new(names.iter().map(|n| MemberId::new(*n)))
    }

    #[test]
    fn test_ledger_basic() {
        let mut ledger = ledger(&["A", "B"]);
        let a = MemberId::new("A");
        let b = MemberId::new("B");
        ledger.record_payment(&a, dec!(100)).unwrap();
        ledger.record_share(&a, dec!(50)).unwrap();
        ledger.record_share(&b, dec!(50)).unwrap();

        assert_eq!(ledger.balance(&a), dec!(50));
        assert_eq!(ledger.balance(&b), dec!(-50));
        assert_eq!(ledger.total_outstanding(), dec!(50));
        assert!(ledger.is_balanced(dec!(0.01)));
    }

    #[test]
    fn test_unknown_member_rejected() {
        let mut ledger = ledger(&["A"]);
        let err = ledger
            .record_payment(&MemberId::new("Z"), dec!(10))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::UnknownMember {
                member: MemberId::new("Z")
            }
        );
        assert_eq!(ledger.balance(&MemberId::new("Z")), Decimal::ZERO);
    }

    #[test]
    fn test_overflow_rejected_and_position_kept() {
        let mut ledger = ledger(&["A", "B"]);
        let a = MemberId::new("A");
        ledger.record_payment(&a, Decimal::MAX).unwrap();

        let err = ledger.record_payment(&a, dec!(1)).unwrap_err();
        assert_eq!(err, LedgerError::Overflow { member: a.clone() });
        assert_eq!(ledger.position(&a).paid, Decimal::MAX);

        // The balance itself would overflow: MAX paid minus a negative share.
        assert!(ledger.record_share(&a, dec!(-1)).is_err());
        assert_eq!(ledger.balance(&a), Decimal::MAX);
    }

    #[test]
    fn test_balances_keep_member_order() {
        let ledger = ledger(&["Carol", "Alice", "Bob", "Alice"]);
        let names: Vec<_> = ledger
            .balances()
            .into_iter()
            .map(|b| b.member.to_string())
            .collect();
        assert_eq!(names, vec!["Carol", "Alice", "Bob"]);
    }

    #[test]
    fn test_imbalance_detected() {
        let mut ledger = ledger(&["A", "B"]);
        ledger.record_payment(&MemberId::new("A"), dec!(10)).unwrap();
        assert_eq!(ledger.imbalance(), dec!(10));
        assert!(!ledger.is_balanced(dec!(0.01)));
    }
}
