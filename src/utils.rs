//! Small shared helpers: line mapping and scope keys.

use crate::constants::MODULE_SCOPE;
use ruff_text_size::TextSize;

/// Converts byte offsets to 1-indexed line numbers.
///
/// The parser works with byte offsets; findings are reported with line
/// numbers. Built once per file.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Scans the source for newlines and records the start of each line.
    #[must_use]
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { line_starts }
    }

    /// Returns the 1-indexed line containing `offset`.
    #[must_use]
    pub fn line_of(&self, offset: TextSize) -> usize {
        let offset = offset.to_usize();
        self.line_starts.partition_point(|&start| start <= offset)
    }
}

/// Builds one scope frame for a definition named `name` at `offset`.
///
/// The byte offset disambiguates same-named definitions (overload stubs,
/// conditional or repeated `def`s), which would otherwise share one index
/// bucket and leak assignments between bodies.
#[must_use]
pub fn scope_frame(name: &str, offset: TextSize) -> String {
    format!("{name}@{}", offset.to_usize())
}

/// Builds the scope key for a stack of enclosing definition frames.
///
/// An empty stack is the module pseudo-scope. The collector and the scope
/// index builder must use identical stack discipline so their keys agree.
#[must_use]
pub fn scope_key(stack: &[String]) -> String {
    if stack.is_empty() {
        MODULE_SCOPE.to_owned()
    } else {
        stack.join(".")
    }
}
