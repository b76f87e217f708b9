//! Shared data structures for the growth & feeding engine
//!
//! - `scope`: pond/species identifiers, `Scope` (species vs mixed), `DateRange`
//! - `records`: historical events supplied by the operations ledger
//! - `advice`: the engine's output (`FeedingAdvice`) and its adjustment breakdown

mod scope;
mod records;
mod advice;

pub use scope::*;
pub use records::*;
pub use advice::*;
