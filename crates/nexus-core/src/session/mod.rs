//! Team collaboration sessions.
//!
//! A session takes a brief through planning, execution, review, and
//! completion. `machine` holds the pure phase transitions, `executor` runs
//! the chained execution phase, and `SessionService` wires both to the
//! repositories.

pub mod executor;
pub mod ledger;
pub mod machine;
pub mod prompt;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;
