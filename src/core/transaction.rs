use crate::core::currency::{Currency, ExchangeRate};
use crate::core::member::MemberId;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Whether a transaction is money spent for the group or money received.
///
/// An income (refund, deposit returned, ...) inverts the sign of every
/// contribution: the payer's credit shrinks and the participants' share
/// is handed back to them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    #[default]
    Expense,
    Income,
}

impl TransactionKind {
    /// `+1` for expenses, `-1` for incomes.
    pub fn sign(self) -> Decimal {
        match self {
            TransactionKind::Expense => Decimal::ONE,
            TransactionKind::Income => Decimal::NEGATIVE_ONE,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Expense => write!(f, "expense"),
            TransactionKind::Income => write!(f, "income"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("transaction amount must be positive, got {amount}")]
    NonPositiveAmount { amount: Decimal },
}

/// One expense or income entry of a group.
///
/// `paid_by` fronted `amount` (denominated in `currency`) on behalf of the
/// members in `split_among`, who share it equally. An empty split means
/// "everyone in the group". An optional exchange-rate snapshot pins the
/// conversion used for this entry regardless of later ambient-rate edits.
///
/// Transactions are immutable once built. Deserialization goes through
/// the same positive-amount check as [`Transaction::try_new`].
///
/// # Examples
///
/// ```
/// use settlement_engine::core::currency::Currency;
/// use settlement_engine::core::member::MemberId;
/// use settlement_engine::core::transaction::Transaction;
/// use rust_decimal_macros::dec;
///
/// let dinner = Transaction::expense(MemberId::new("Alice"), dec!(90), Currency::Primary)
///     .with_split([MemberId::new("Alice"), MemberId::new("Bob")])
///     .with_description("Dinner");
///
/// assert_eq!(dinner.amount(), dec!(90));
/// assert_eq!(dinner.split_among().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TransactionRecord")]
pub struct Transaction {
    /// Unique identifier, referenced by aggregation entries and errors.
    id: Uuid,
    /// Expense or income.
    kind: TransactionKind,
    /// Member who fronted (or received) the money.
    paid_by: MemberId,
    /// Members sharing the amount equally; empty means the whole group.
    split_among: Vec<MemberId>,
    /// Strictly positive amount, in `currency`.
    amount: Decimal,
    /// Currency the amount is denominated in.
    currency: Currency,
    /// Snapshot of the rate at creation time, if one was captured.
    exchange_rate: Option<ExchangeRate>,
    /// Free-form label ("Udon", "Shirakawa parking").
    description: Option<String>,
    /// Day the transaction took place.
    date: NaiveDate,
}

/// Unvalidated wire form of a [`Transaction`].
#[derive(Deserialize)]
struct TransactionRecord {
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,
    #[serde(default)]
    kind: TransactionKind,
    paid_by: MemberId,
    #[serde(default)]
    split_among: Vec<MemberId>,
    amount: Decimal,
    currency: Currency,
    #[serde(default)]
    exchange_rate: Option<ExchangeRate>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "today")]
    date: NaiveDate,
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = TransactionError;

    fn try_from(record: TransactionRecord) -> Result<Self, Self::Error> {
        let mut tx = Transaction::try_new(record.kind, record.paid_by, record.amount, record.currency)?
            .with_id(record.id)
            .with_split(record.split_among)
            .with_date(record.date);
        tx.exchange_rate = record.exchange_rate;
        tx.description = record.description;
        Ok(tx)
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

impl Transaction {
    /// Create a new transaction split among the whole group.
    ///
    /// # Panics
    ///
    /// Panics if `amount` is not positive. Use [`Transaction::try_new`]
    /// for amounts that come from user input.
    pub fn new(kind: TransactionKind, paid_by: MemberId, amount: Decimal, currency: Currency) -> Self {
        assert!(
            amount > Decimal::ZERO,
            "Transaction amount must be positive, got {}",
            amount
        );
        Self {
            id: Uuid::new_v4(),
            kind,
            paid_by,
            split_among: Vec::new(),
            amount,
            currency,
            exchange_rate: None,
            description: None,
            date: today(),
        }
    }

    /// Fallible variant of [`Transaction::new`].
    pub fn try_new(
        kind: TransactionKind,
        paid_by: MemberId,
        amount: Decimal,
        currency: Currency,
    ) -> Result<Self, TransactionError> {
        if amount <= Decimal::ZERO {
            return Err(TransactionError::NonPositiveAmount { amount });
        }
        Ok(Self::new(kind, paid_by, amount, currency))
    }

    pub fn expense(paid_by: MemberId, amount: Decimal, currency: Currency) -> Self {
        Self::new(TransactionKind::Expense, paid_by, amount, currency)
    }

    pub fn income(paid_by: MemberId, amount: Decimal, currency: Currency) -> Self {
        Self::new(TransactionKind::Income, paid_by, amount, currency)
    }

    /// Restrict the cost to a subset of members.
    pub fn with_split(mut self, members: impl IntoIterator<Item = MemberId>) -> Self {
        self.split_among = members.into_iter().collect();
        self
    }

    /// Pin the exchange rate used for this transaction.
    pub fn with_exchange_rate(mut self, rate: ExchangeRate) -> Self {
        self.exchange_rate = Some(rate);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// Keep an ID assigned elsewhere, e.g. by a stored trip file.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    // --- Accessors ---

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn paid_by(&self) -> &MemberId {
        &self.paid_by
    }

    pub fn split_among(&self) -> &[MemberId] {
        &self.split_among
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn exchange_rate(&self) -> Option<ExchangeRate> {
        self.exchange_rate
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Reassign payer and split after a membership change.
    pub(crate) fn repair(&mut self, paid_by: MemberId, split_among: Vec<MemberId>) {
        self.paid_by = paid_by;
        self.split_among = split_among;
    }

    /// The members sharing this transaction: the explicit split, or all
    /// of `members` when the split is empty.
    pub fn participants<'a>(&'a self, members: &'a [MemberId]) -> &'a [MemberId] {
        if self.split_among.is_empty() {
            members
        } else {
            &self.split_among
        }
    }
}

/// An ordered collection of transactions, as kept by a group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionSet {
    transactions: Vec<Transaction>,
}

impl TransactionSet {
    pub fn new() -> Self {
        Self {
            transactions: Vec::new(),
        }
    }

    pub fn add(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub(crate) fn transactions_mut(&mut self) -> &mut [Transaction] {
        &mut self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Every member name referenced as payer or participant, sorted.
    pub fn referenced_members(&self) -> Vec<MemberId> {
        let mut members: Vec<MemberId> = self
            .transactions
            .iter()
            .flat_map(|t| std::iter::once(t.paid_by()).chain(t.split_among()))
            .cloned()
            .collect();
        members.sort();
        members.dedup();
        members
    }
}

impl FromIterator<Transaction> for TransactionSet {
    fn from_iter<T: IntoIterator<Item = Transaction>>(iter: T) -> Self {
        Self {
            transactions: iter.into_iter().collect(),
        }
    }
}
