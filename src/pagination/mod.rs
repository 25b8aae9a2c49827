//! Pagination module
//!
//! Follows server-supplied continuation links until the listing ends or a
//! termination predicate asks to stop.
//!
//! # Overview
//!
//! The driver walks the states
//! `Start → Fetching → Accumulating → EvaluatingPredicate → {Continuing | Stopping} → Done`.
//! Pages are fetched strictly one after another, since each page's URL comes
//! from the previous response. Items are concatenated in server order.

mod driver;
mod predicates;
mod types;

pub use driver::{fetch_all_pages, PaginationDriver};
pub use predicates::{extract_field, item_date, parse_item_date, OlderThan, DEFAULT_MAX_AGE_MS};
pub use types::{PaginationConfig, PaginationState, TerminationPredicate, MAX_DEADLINE};

#[cfg(test)]
mod tests;
