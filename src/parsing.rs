//! Predictive parsing: token buffering, decision resolution, recovery.
//!
//!     The committed walk lives in [`parser`]; [`simulation`] answers the
//!     decisions the static tables cannot, [`predicates`] evaluates semantic
//!     gates consistently across speculative and committed passes, and
//!     [`recovery`] keeps a broken parse moving.

pub mod parser;
pub mod predicates;
pub(crate) mod recovery;
pub(crate) mod simulation;
pub mod stream;

pub use parser::{ParseOutcome, Parser, ParserConfig};
pub use predicates::{PredicateContext, PredicateFn};
pub use stream::TokenStream;
