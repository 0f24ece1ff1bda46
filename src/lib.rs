//! # settlement-engine
//!
//! Shared-expense balance aggregation and debt settlement.
//!
//! Given the members of a group and the expenses (and incomes) they
//! recorded in two currencies, this engine computes every member's net
//! balance in the reference currency and a short list of payments that
//! settles all debts.
//!
//! ## Architecture
//!
//! - **core** — Foundational types: members, currencies and exchange rates,
//!   transactions, the paid/owed ledger, and group normalization
//! - **engine** — Balance aggregation, the greedy settlement planner, and
//!   the `SettlementEngine` facade
//! - **simulation** — Random trip generation for stress testing

pub mod core;
pub mod engine;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::core::currency::{checked_convert, convert, Currency, CurrencyPair, ExchangeRate};
    pub use crate::core::group::Group;
    pub use crate::core::ledger::MemberBalance;
    pub use crate::core::member::MemberId;
    pub use crate::core::transaction::{Transaction, TransactionKind, TransactionSet};
    pub use crate::engine::aggregation::{aggregate, Aggregate, AggregationError};
    pub use crate::engine::evaluation::{EngineError, Evaluation, SettlementEngine};
    pub use crate::engine::planner::{settle, Settlement, SettlementPlan, EPSILON};
}
