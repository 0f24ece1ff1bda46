use crate::core::currency::{checked_convert, effective_rate, ExchangeRate};
use crate::core::ledger::{Ledger, LedgerError, MemberBalance};
use crate::core::member::MemberId;
use crate::core::transaction::{Transaction, TransactionKind};
use crate::engine::planner::EPSILON;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised when transactions do not fit the member list.
///
/// Callers are expected to normalize `paid_by`/`split_among` against the
/// current membership before aggregating (see [`crate::core::group::Group`]).
/// The aggregator never repairs input, it refuses it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("transaction {transaction} references '{member}', who is not a member of the group")]
    InvalidMember { member: MemberId, transaction: Uuid },
    #[error("transaction {transaction} has nobody to split among")]
    EmptySplit { transaction: Uuid },
    #[error("transaction {transaction} pushes the group totals past the decimal range")]
    Overflow { transaction: Uuid },
}

/// How one transaction entered the balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedEntry {
    /// ID of the source transaction.
    pub transaction: Uuid,
    /// Expense or income; decides the sign applied to the balances.
    pub kind: TransactionKind,
    /// Amount in the reference currency (unsigned).
    pub amount: Decimal,
    /// Rate the amount was converted at; `None` for reference-currency entries.
    pub rate: Option<ExchangeRate>,
    /// Number of members the amount was split among.
    pub participants: usize,
    /// Per-participant share in the reference currency (unsigned).
    pub share: Decimal,
}

/// Totals and per-member balances of a group, in the reference currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    /// Sum of converted expense amounts.
    pub total_expense: Decimal,
    /// Sum of converted income amounts.
    pub total_income: Decimal,
    /// `total_expense - total_income`.
    pub net_total: Decimal,
    /// One entry per member, in membership order.
    pub balances: Vec<MemberBalance>,
    /// Audit trail, one entry per transaction in input order.
    pub entries: Vec<ConvertedEntry>,
}

impl Aggregate {
    /// The all-zero aggregate of a group without members.
    pub fn empty() -> Self {
        Self::default()
    }

    fn find(&self, member: &MemberId) -> Option<&MemberBalance> {
        self.balances.iter().find(|b| &b.member == member)
    }

    /// Net balance of `member`, if they belong to the group.
    pub fn balance(&self, member: &MemberId) -> Option<Decimal> {
        self.find(member).map(|b| b.balance)
    }

    /// Signed total `member` paid for the group.
    pub fn paid_by(&self, member: &MemberId) -> Option<Decimal> {
        self.find(member).map(|b| b.paid)
    }

    /// `(member, balance)` pairs ready for [`crate::engine::planner::settle`].
    pub fn net_balances(&self) -> impl Iterator<Item = (MemberId, Decimal)> + '_ {
        self.balances.iter().map(|b| (b.member.clone(), b.balance))
    }

    /// Sum of all balances; zero up to division residue.
    pub fn imbalance(&self) -> Decimal {
        self.balances.iter().map(|b| b.balance).sum()
    }
}

/// Compute totals and net balances for `members` over `transactions`.
///
/// # Algorithm
///
/// 1. Open a zero position (paid, owed) for every member.
/// 2. For each transaction, convert its amount into the reference
///    currency, credit the payer with `amount * sign` and charge every
///    participant `amount / participants * sign`, where `sign` is `+1`
///    for expenses and `-1` for incomes.
/// 3. Each balance is `paid - owed`.
///
/// An empty member list yields [`Aggregate::empty`] without looking at
/// the transactions. In a single-member group every transaction is
/// attributed to that member, so the balance is always zero.
///
/// # Errors
///
/// [`AggregationError::InvalidMember`] if a payer or participant is not
/// in `members`, [`AggregationError::Overflow`] if the converted amounts
/// do not fit in a [`Decimal`].
pub fn aggregate(
    members: &[MemberId],
    transactions: &[Transaction],
    ambient: ExchangeRate,
) -> Result<Aggregate, AggregationError> {
    let mut ledger = Ledger::new(members.iter().cloned());
    if ledger.is_empty() {
        return Ok(Aggregate::empty());
    }

    let roster = ledger.members().to_vec();
    let sole = match roster.as_slice() {
        [only] => Some(only),
        _ => None,
    };

    let mut total_expense = Decimal::ZERO;
    let mut total_income = Decimal::ZERO;
    let mut entries = Vec::with_capacity(transactions.len());

    // Gross volume (expense + income). While it fits, every position,
    // balance and partial sum of balances fits too.
    let mut gross = Decimal::ZERO;

    for tx in transactions {
        let overflow = || AggregationError::Overflow {
            transaction: tx.id(),
        };
        let amount = checked_convert(tx.amount(), tx.currency(), ambient, tx.exchange_rate())
            .ok_or_else(overflow)?;
        let rate = (!tx.currency().is_reference())
            .then(|| effective_rate(ambient, tx.exchange_rate()));
        gross = gross.checked_add(amount).ok_or_else(overflow)?;
        match tx.kind() {
            TransactionKind::Expense => total_expense += amount,
            TransactionKind::Income => total_income += amount,
        }
        let sign = tx.kind().sign();

        let (payer, participants) = match sole {
            Some(only) => (only, std::slice::from_ref(only)),
            None => (tx.paid_by(), tx.participants(&roster)),
        };
        if participants.is_empty() {
            return Err(AggregationError::EmptySplit {
                transaction: tx.id(),
            });
        }
        let share = amount / Decimal::from(participants.len());

        let rejected = |err: LedgerError| match err {
            LedgerError::UnknownMember { member } => AggregationError::InvalidMember {
                member,
                transaction: tx.id(),
            },
            LedgerError::Overflow { .. } => overflow(),
        };
        ledger.record_payment(payer, amount * sign).map_err(rejected)?;
        for participant in participants {
            ledger
                .record_share(participant, share * sign)
                .map_err(rejected)?;
        }

        entries.push(ConvertedEntry {
            transaction: tx.id(),
            kind: tx.kind(),
            amount,
            rate,
            participants: participants.len(),
            share,
        });
    }

    if !ledger.is_balanced(EPSILON) {
        warn!(
            "balances do not sum to zero: imbalance={}",
            ledger.imbalance()
        );
    }
    debug!(
        "aggregated {} transactions over {} members: expense={} income={} outstanding={}",
        transactions.len(),
        roster.len(),
        total_expense,
        total_income,
        ledger.total_outstanding()
    );

    Ok(Aggregate {
        total_expense,
        total_income,
        net_total: total_expense - total_income,
        balances: ledger.balances(),
        entries,
    })
}
