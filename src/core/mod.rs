pub mod currency;
pub mod group;
pub mod ledger;
pub mod member;
pub mod transaction;
