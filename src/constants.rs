//! Shared constants.

/// Maximum recursion depth for AST traversal, to prevent stack overflow on
/// pathologically nested code.
pub const MAX_RECURSION_DEPTH: usize = 400;

/// Sentinel recorded for a parameter value that is not statically reducible
/// to a literal. String literals keep their source quotes, so this marker
/// cannot collide with any recorded literal text.
pub const NONDET: &str = "<nondet>";

/// Scope key for statements outside any `def`.
pub const MODULE_SCOPE: &str = "<module>";

/// Name of the optional configuration file, discovered by walking up from
/// the analysis root.
pub const CONFIG_FILENAME: &str = "argstates.toml";

/// Default path of the serialized report.
pub const DEFAULT_REPORT_FILENAME: &str = "arg_states.json";
