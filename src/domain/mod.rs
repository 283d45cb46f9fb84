//! Domain model: aggregates, pure workflow rules, and read-side computations.

pub mod aggregates;
pub mod catalog;
pub mod events;
pub mod ledger;
pub mod value_objects;
