//! Call-site argument state analysis for Python sources.
//!
//! Given a set of target function symbols, `argstates` locates every call to
//! those functions in a Python codebase and determines, per argument
//! position, the set of concrete values the argument can take, marking the
//! position as non-deterministic when a value cannot be established
//! statically. The resulting report is intended as an input constraint set
//! for test-harness generation: parameters that are only ever called with a
//! finite set of literals can be restricted to that set.
//!
//! The analysis runs in two passes per file:
//!
//! 1. [`collect`] finds every call site and classifies each positional
//!    argument as a literal, a bare-name reference, or dynamic.
//! 2. [`resolve`] resolves bare-name references by scanning every assignment
//!    to that name in the enclosing scope that lexically precedes the call,
//!    falling back to the non-deterministic marker whenever value provenance
//!    cannot be established safely.

pub mod analyzer;
pub mod cli;
pub mod collect;
pub mod config;
pub mod constants;
pub mod output;
pub mod resolve;
pub mod store;
pub mod utils;

pub use analyzer::{AnalysisResult, ArgStates, ParseError};
pub use store::{ArgStateStore, ValueState};
