use crate::core::currency::ExchangeRate;
use crate::core::member::MemberId;
use crate::core::transaction::{Transaction, TransactionSet};
use crate::engine::evaluation::{EngineError, Evaluation, SettlementEngine};
use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named set of members and the transactions they share.
///
/// The settlement engine refuses transactions that reference non-members.
/// `Group` is the caller-side half of that contract: it cleans member
/// names and repairs every transaction it stores so that payer and split
/// always refer to current members. A deserialized group is rebuilt
/// through the same cleanup and repair.
///
/// # Examples
///
/// ```
/// use settlement_engine::core::group::Group;
/// use settlement_engine::core::member::MemberId;
///
/// let group = Group::new("Nagoya Trip", [" Weiren", "Chris", "", "Chris"]);
/// assert_eq!(group.members(), &[MemberId::new("Weiren"), MemberId::new("Chris")]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "GroupRecord")]
pub struct Group {
    /// Stable identifier, kept across save and load.
    id: Uuid,
    /// Display name ("Nagoya Trip").
    name: String,
    /// Trimmed, non-blank, distinct member names in insertion order.
    members: Vec<MemberId>,
    /// Transactions, each normalized against `members`.
    transactions: TransactionSet,
}

/// Wire form of a [`Group`], before cleanup and repair.
#[derive(Deserialize)]
struct GroupRecord {
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,
    name: String,
    members: Vec<String>,
    #[serde(default)]
    transactions: Vec<Transaction>,
}

impl From<GroupRecord> for Group {
    fn from(record: GroupRecord) -> Self {
        let mut group = Group::new(record.name, &record.members);
        group.id = record.id;
        for tx in record.transactions {
            group.add_transaction(tx);
        }
        group
    }
}

impl Group {
    /// Create a group. Names are trimmed; blanks and repeats are dropped.
    pub fn new<S: AsRef<str>>(name: impl Into<String>, members: impl IntoIterator<Item = S>) -> Self {
        let mut group = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            members: Vec::new(),
            transactions: TransactionSet::new(),
        };
        for member in members {
            group.add_member(member.as_ref());
        }
        group
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[MemberId] {
        &self.members
    }

    pub fn transactions(&self) -> &TransactionSet {
        &self.transactions
    }

    pub fn is_member(&self, member: &MemberId) -> bool {
        self.members.contains(member)
    }

    /// Add a member. Returns `false` for blank or already-present names.
    pub fn add_member(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let member = MemberId::new(name);
        if self.is_member(&member) {
            return false;
        }
        self.members.push(member);
        true
    }

    /// Remove a member and repair every transaction that referenced them.
    ///
    /// Returns `false` if `member` was not in the group.
    pub fn remove_member(&mut self, member: &MemberId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != member);
        if self.members.len() == before {
            return false;
        }
        let group = self.id();
        let members = self.members.clone();
        for tx in self.transactions.transactions_mut() {
            let (paid_by, split_among) = normalized_parties(group, &members, tx);
            tx.repair(paid_by, split_among);
        }
        true
    }

    /// Bring `tx` in line with the current membership.
    ///
    /// - In a single-member group, payer and split become that member.
    /// - Otherwise the split keeps only current members (everyone if
    ///   nothing is left) and an unknown payer is replaced by the first
    ///   member.
    ///
    /// A group without members leaves the transaction untouched.
    pub fn normalize_transaction(&self, mut tx: Transaction) -> Transaction {
        let (paid_by, split_among) = normalized_parties(self.id(), &self.members, &tx);
        tx.repair(paid_by, split_among);
        tx
    }

    /// Normalize and store a transaction.
    pub fn add_transaction(&mut self, tx: Transaction) {
        let tx = self.normalize_transaction(tx);
        self.transactions.add(tx);
    }

    /// Run the settlement engine over this group.
    pub fn evaluate(&self, ambient: ExchangeRate) -> Result<Evaluation, EngineError> {
        SettlementEngine::evaluate(&self.members, self.transactions.transactions(), ambient)
    }
}

fn normalized_parties(
    group: Uuid,
    members: &[MemberId],
    tx: &Transaction,
) -> (MemberId, Vec<MemberId>) {
    match members {
        [] => (tx.paid_by().clone(), tx.split_among().to_vec()),
        [only] => {
            if tx.paid_by() != only {
                warn!(
                    "group {}: transaction {}: payer '{}' reassigned to sole member '{}'",
                    group,
                    tx.id(),
                    tx.paid_by(),
                    only
                );
            }
            (only.clone(), vec![only.clone()])
        }
        [first, ..] => {
            let split: Vec<MemberId> = tx
                .split_among()
                .iter()
                .filter(|m| members.contains(*m))
                .cloned()
                .collect();
            let split = if split.is_empty() {
                members.to_vec()
            } else {
                split
            };
            let paid_by = if members.contains(tx.paid_by()) {
                tx.paid_by().clone()
            } else {
                warn!(
                    "group {}: transaction {}: payer '{}' is not a member, reassigned to '{}'",
                    group,
                    tx.id(),
                    tx.paid_by(),
                    first
                );
                first.clone()
            };
            (paid_by, split)
        }
    }
}
