//! Single file analysis: parse, index scopes, collect call sites, resolve.

use super::{FileOutcome, ParseError};
use crate::collect::{ArgExpr, CallSiteCollector};
use crate::resolve::ScopeIndex;
use crate::store::ValueState;
use crate::utils::LineIndex;
use ruff_python_parser::parse_module;
use rustc_hash::FxHashSet;
use std::path::Path;

/// Runs both passes over one file's source.
///
/// Pass 1 collects call sites in source order; pass 2 resolves each
/// reference argument against the scope index built up front. Every
/// argument of every call site contributes at least one resolved state, so
/// the extracted argument count always equals the call's syntactic count.
pub(crate) fn analyze_source(
    source: &str,
    file_path: &Path,
    targets: &FxHashSet<String>,
) -> FileOutcome {
    let module = match parse_module(source) {
        Ok(parsed) => parsed.into_syntax(),
        Err(e) => {
            return FileOutcome {
                parse_error: Some(ParseError {
                    file: file_path.to_path_buf(),
                    error: format!("Failed to parse file: {e}"),
                }),
                ..FileOutcome::default()
            };
        }
    };

    let line_index = LineIndex::new(source);
    let index = ScopeIndex::build(&module.body, source);

    let mut collector = CallSiteCollector::new(source, targets, &line_index);
    for stmt in &module.body {
        collector.visit_stmt(stmt);
    }

    let parse_error = collector.recursion_limit_hit.then(|| ParseError {
        file: file_path.to_path_buf(),
        error: "Recursion limit reached; results for this file may be partial".to_owned(),
    });

    let call_sites = collector.call_sites.len();
    let mut merges = Vec::new();
    for call in collector.call_sites {
        for (position, arg) in call.args.iter().enumerate() {
            match arg {
                ArgExpr::Literal(text) => {
                    merges.push((call.symbol.clone(), position, ValueState::Literal(text.clone())));
                }
                ArgExpr::Dynamic => {
                    merges.push((call.symbol.clone(), position, ValueState::Dynamic));
                }
                ArgExpr::Ref(name) => {
                    for state in index.resolve(&call.scope, name, call.offset) {
                        merges.push((call.symbol.clone(), position, state));
                    }
                }
            }
        }
    }

    FileOutcome {
        merges,
        call_sites,
        parse_error,
    }
}
