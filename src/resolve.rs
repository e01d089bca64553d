//! Pass 2: backward value-origin resolution.
//!
//! A bare-name argument found in pass 1 is resolved against a scope index:
//! every assignment-producing statement for that name in the enclosing
//! scope, in lexical order. The index is built once per file so resolution
//! stays linear in function size instead of re-walking the tree per call
//! site. Resolution is conservative: a single assignment whose right-hand
//! side cannot be reduced to a literal makes the whole reference dynamic,
//! and so does the absence of any qualifying assignment (absence of
//! evidence is never reported as "no valid value").
//!
//! Ordering is lexical, not dynamic: an assignment inside a loop body
//! qualifies regardless of iteration count, and assignments after the call
//! or in other scopes never do. Values reached through attribute or
//! subscript indirection (`obj.field`, `d[k]`) are never simple references
//! and always resolve dynamic, even if the underlying storage only ever
//! holds literals; that soundness gap is intentional.

#![allow(missing_docs)]

use crate::collect::literal_text;
use crate::constants::MAX_RECURSION_DEPTH;
use crate::store::ValueState;
use crate::utils::{scope_frame, scope_key};
use ruff_python_ast::{self as ast, Expr, Stmt};
use ruff_text_size::{Ranged, TextSize};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Right-hand side of a recorded assignment, collapsed to
/// literal-or-dynamic. A bare name on the right is dynamic: there is no
/// transitive resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RhsValue {
    Literal(String),
    Dynamic,
}

/// One assignment to a named variable inside a scope.
#[derive(Debug, Clone)]
struct VariableAssignment {
    name: String,
    offset: TextSize,
    value: RhsValue,
}

/// Scope key -> assignments in lexical order. Built once per file.
pub struct ScopeIndex {
    scopes: FxHashMap<String, Vec<VariableAssignment>>,
}

impl ScopeIndex {
    /// Indexes every assignment-producing statement in the module body.
    #[must_use]
    pub fn build(body: &[Stmt], source: &str) -> Self {
        let mut builder = IndexBuilder {
            source,
            scopes: FxHashMap::default(),
            scope_stack: SmallVec::new(),
            depth: 0,
        };
        for stmt in body {
            builder.visit_stmt(stmt);
        }
        Self {
            scopes: builder.scopes,
        }
    }

    /// Resolves a reference to `name` observed at `call_offset` in `scope`.
    ///
    /// Returns every literal assigned to the name before the call, or a
    /// single `Dynamic` when any qualifying assignment is non-literal or
    /// none exists at all.
    #[must_use]
    pub fn resolve(&self, scope: &str, name: &str, call_offset: TextSize) -> Vec<ValueState> {
        let mut values = Vec::new();
        if let Some(assignments) = self.scopes.get(scope) {
            for assignment in assignments {
                if assignment.name != name || assignment.offset >= call_offset {
                    continue;
                }
                match &assignment.value {
                    RhsValue::Literal(text) => values.push(ValueState::Literal(text.clone())),
                    RhsValue::Dynamic => return vec![ValueState::Dynamic],
                }
            }
        }
        if values.is_empty() {
            // No qualifying assignment: e.g. a function parameter.
            values.push(ValueState::Dynamic);
        }
        values
    }
}

struct IndexBuilder<'a> {
    source: &'a str,
    scopes: FxHashMap<String, Vec<VariableAssignment>>,
    scope_stack: SmallVec<[String; 4]>,
    depth: usize,
}

impl IndexBuilder<'_> {
    fn record(&mut self, name: &str, offset: TextSize, value: RhsValue) {
        self.scopes
            .entry(scope_key(&self.scope_stack))
            .or_default()
            .push(VariableAssignment {
                name: name.to_owned(),
                offset,
                value,
            });
    }

    /// Records every bare name bound by an assignment target. Unpacking
    /// targets are always dynamic-valued; attribute and subscript targets
    /// are indirection and never tracked.
    fn record_target(&mut self, target: &Expr, value: &RhsValue) {
        match target {
            Expr::Name(name) => {
                self.record(name.id.as_str(), target.range().start(), value.clone());
            }
            Expr::Tuple(tuple) => {
                for elt in &tuple.elts {
                    self.record_target(elt, &RhsValue::Dynamic);
                }
            }
            Expr::List(list) => {
                for elt in &list.elts {
                    self.record_target(elt, &RhsValue::Dynamic);
                }
            }
            Expr::Starred(starred) => self.record_target(&starred.value, &RhsValue::Dynamic),
            _ => {}
        }
    }

    fn rhs_value(&self, expr: &Expr) -> RhsValue {
        literal_text(expr, self.source).map_or(RhsValue::Dynamic, |text| {
            RhsValue::Literal(text.to_owned())
        })
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        if self.depth >= MAX_RECURSION_DEPTH {
            return;
        }
        self.depth += 1;

        match stmt {
            Stmt::FunctionDef(node) => {
                self.visit_parameter_defaults(&node.parameters);
                self.scope_stack
                    .push(scope_frame(node.name.as_str(), node.range().start()));
                for inner in &node.body {
                    self.visit_stmt(inner);
                }
                self.scope_stack.pop();
            }
            Stmt::ClassDef(node) => {
                self.scope_stack
                    .push(scope_frame(node.name.as_str(), node.range().start()));
                for inner in &node.body {
                    self.visit_stmt(inner);
                }
                self.scope_stack.pop();
            }
            Stmt::Assign(node) => {
                let value = self.rhs_value(&node.value);
                for target in &node.targets {
                    self.record_target(target, &value);
                }
                self.visit_expr(&node.value);
            }
            Stmt::AnnAssign(node) => {
                // A bare annotation binds nothing.
                if let Some(value) = &node.value {
                    let rhs = self.rhs_value(value);
                    self.record_target(&node.target, &rhs);
                    self.visit_expr(value);
                }
            }
            Stmt::AugAssign(node) => {
                // `x += v` derives from the previous value; never a literal.
                self.record_target(&node.target, &RhsValue::Dynamic);
                self.visit_expr(&node.value);
            }
            Stmt::For(node) => {
                self.record_target(&node.target, &RhsValue::Dynamic);
                self.visit_expr(&node.iter);
                for inner in node.body.iter().chain(&node.orelse) {
                    self.visit_stmt(inner);
                }
            }
            Stmt::While(node) => {
                self.visit_expr(&node.test);
                for inner in node.body.iter().chain(&node.orelse) {
                    self.visit_stmt(inner);
                }
            }
            Stmt::If(node) => {
                self.visit_expr(&node.test);
                for inner in &node.body {
                    self.visit_stmt(inner);
                }
                for clause in &node.elif_else_clauses {
                    if let Some(test) = &clause.test {
                        self.visit_expr(test);
                    }
                    for inner in &clause.body {
                        self.visit_stmt(inner);
                    }
                }
            }
            Stmt::With(node) => {
                for item in &node.items {
                    self.visit_expr(&item.context_expr);
                    if let Some(vars) = &item.optional_vars {
                        self.record_target(vars, &RhsValue::Dynamic);
                    }
                }
                for inner in &node.body {
                    self.visit_stmt(inner);
                }
            }
            Stmt::Try(node) => {
                for inner in &node.body {
                    self.visit_stmt(inner);
                }
                for handler in &node.handlers {
                    let ast::ExceptHandler::ExceptHandler(h) = handler;
                    if let Some(name) = &h.name {
                        self.record(name.as_str(), name.range().start(), RhsValue::Dynamic);
                    }
                    for inner in &h.body {
                        self.visit_stmt(inner);
                    }
                }
                for inner in node.orelse.iter().chain(&node.finalbody) {
                    self.visit_stmt(inner);
                }
            }
            Stmt::Match(node) => {
                self.visit_expr(&node.subject);
                for case in &node.cases {
                    self.record_pattern(&case.pattern);
                    if let Some(guard) = &case.guard {
                        self.visit_expr(guard);
                    }
                    for inner in &case.body {
                        self.visit_stmt(inner);
                    }
                }
            }
            Stmt::Expr(node) => self.visit_expr(&node.value),
            Stmt::Return(node) => {
                if let Some(value) = &node.value {
                    self.visit_expr(value);
                }
            }
            Stmt::Assert(node) => {
                self.visit_expr(&node.test);
                if let Some(msg) = &node.msg {
                    self.visit_expr(msg);
                }
            }
            _ => {}
        }

        self.depth -= 1;
    }

    /// Match captures bind names to runtime values; always dynamic.
    fn record_pattern(&mut self, pattern: &ast::Pattern) {
        match pattern {
            ast::Pattern::MatchAs(node) => {
                if let Some(inner) = &node.pattern {
                    self.record_pattern(inner);
                }
                if let Some(name) = &node.name {
                    self.record(name.as_str(), name.range().start(), RhsValue::Dynamic);
                }
            }
            ast::Pattern::MatchStar(node) => {
                if let Some(name) = &node.name {
                    self.record(name.as_str(), name.range().start(), RhsValue::Dynamic);
                }
            }
            ast::Pattern::MatchSequence(node) => {
                for inner in &node.patterns {
                    self.record_pattern(inner);
                }
            }
            ast::Pattern::MatchMapping(node) => {
                for inner in &node.patterns {
                    self.record_pattern(inner);
                }
                if let Some(rest) = &node.rest {
                    self.record(rest.as_str(), rest.range().start(), RhsValue::Dynamic);
                }
            }
            ast::Pattern::MatchOr(node) => {
                for inner in &node.patterns {
                    self.record_pattern(inner);
                }
            }
            ast::Pattern::MatchClass(node) => {
                for inner in &node.arguments.patterns {
                    self.record_pattern(inner);
                }
                for keyword in &node.arguments.keywords {
                    self.record_pattern(&keyword.pattern);
                }
            }
            ast::Pattern::MatchValue(_) | ast::Pattern::MatchSingleton(_) => {}
        }
    }

    fn visit_parameter_defaults(&mut self, parameters: &ast::Parameters) {
        for param in parameters
            .posonlyargs
            .iter()
            .chain(&parameters.args)
            .chain(&parameters.kwonlyargs)
        {
            if let Some(default) = &param.default {
                self.visit_expr(default);
            }
        }
    }

    /// Walks expressions only to catch walrus bindings (`x := v`).
    /// Comprehension targets scope to the comprehension in Python 3 and are
    /// not recorded; a lambda body is indexed under its own scope frame, so
    /// its parameters shadow the enclosing scope.
    fn visit_expr(&mut self, expr: &Expr) {
        if self.depth >= MAX_RECURSION_DEPTH {
            return;
        }
        self.depth += 1;

        match expr {
            Expr::Named(node) => {
                let value = self.rhs_value(&node.value);
                self.record_target(&node.target, &value);
                self.visit_expr(&node.value);
            }
            Expr::BoolOp(node) => {
                for value in &node.values {
                    self.visit_expr(value);
                }
            }
            Expr::BinOp(node) => {
                self.visit_expr(&node.left);
                self.visit_expr(&node.right);
            }
            Expr::UnaryOp(node) => self.visit_expr(&node.operand),
            Expr::Lambda(node) => {
                if let Some(parameters) = &node.parameters {
                    self.visit_parameter_defaults(parameters);
                }
                self.scope_stack
                    .push(scope_frame("<lambda>", node.range().start()));
                self.visit_expr(&node.body);
                self.scope_stack.pop();
            }
            Expr::If(node) => {
                self.visit_expr(&node.test);
                self.visit_expr(&node.body);
                self.visit_expr(&node.orelse);
            }
            Expr::Call(node) => {
                self.visit_expr(&node.func);
                for arg in &node.arguments.args {
                    self.visit_expr(arg);
                }
                for keyword in &node.arguments.keywords {
                    self.visit_expr(&keyword.value);
                }
            }
            Expr::Compare(node) => {
                self.visit_expr(&node.left);
                for comparator in &node.comparators {
                    self.visit_expr(comparator);
                }
            }
            Expr::Attribute(node) => self.visit_expr(&node.value),
            Expr::Subscript(node) => {
                self.visit_expr(&node.value);
                self.visit_expr(&node.slice);
            }
            Expr::Tuple(node) => {
                for elt in &node.elts {
                    self.visit_expr(elt);
                }
            }
            Expr::List(node) => {
                for elt in &node.elts {
                    self.visit_expr(elt);
                }
            }
            Expr::Set(node) => {
                for elt in &node.elts {
                    self.visit_expr(elt);
                }
            }
            Expr::Dict(node) => {
                for item in &node.items {
                    if let Some(key) = &item.key {
                        self.visit_expr(key);
                    }
                    self.visit_expr(&item.value);
                }
            }
            Expr::Await(node) => self.visit_expr(&node.value),
            Expr::Starred(node) => self.visit_expr(&node.value),
            _ => {}
        }

        self.depth -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(source: &str) -> ScopeIndex {
        let parsed = ruff_python_parser::parse_module(source).unwrap();
        ScopeIndex::build(&parsed.into_syntax().body, source)
    }

    fn offset_of(source: &str, needle: &str) -> TextSize {
        TextSize::try_from(source.find(needle).unwrap()).unwrap()
    }

    /// Scope frame of the first `def <name>` in `source`.
    fn frame(source: &str, name: &str) -> String {
        let offset = source.find(&format!("def {name}")).unwrap();
        format!("{name}@{offset}")
    }

    #[test]
    fn all_preceding_literals_are_kept() {
        let source = "def h():\n    v = 1\n    v = 2\n    h(v)\n";
        let index = index_of(source);
        let call = offset_of(source, "h(v)");
        assert_eq!(
            index.resolve(&frame(source, "h"), "v", call),
            vec![
                ValueState::Literal("1".to_owned()),
                ValueState::Literal("2".to_owned())
            ]
        );
    }

    #[test]
    fn assignment_after_call_is_excluded() {
        let source = "def f():\n    x = 1\n    use(x)\n    x = 2\n";
        let index = index_of(source);
        let call = offset_of(source, "use(x)");
        assert_eq!(
            index.resolve(&frame(source, "f"), "x", call),
            vec![ValueState::Literal("1".to_owned())]
        );
    }

    #[test]
    fn non_literal_assignment_forces_dynamic() {
        let source = "def f():\n    x = 1\n    x = getValue()\n    use(x)\n";
        let index = index_of(source);
        let call = offset_of(source, "use(x)");
        assert_eq!(index.resolve(&frame(source, "f"), "x", call), vec![ValueState::Dynamic]);
    }

    #[test]
    fn name_on_right_hand_side_is_not_chased() {
        let source = "def f():\n    y = 1\n    x = y\n    use(x)\n";
        let index = index_of(source);
        let call = offset_of(source, "use(x)");
        assert_eq!(index.resolve(&frame(source, "f"), "x", call), vec![ValueState::Dynamic]);
    }

    #[test]
    fn missing_assignment_resolves_dynamic() {
        let source = "def f(p):\n    use(p)\n";
        let index = index_of(source);
        let call = offset_of(source, "use(p)");
        assert_eq!(index.resolve(&frame(source, "f"), "p", call), vec![ValueState::Dynamic]);
    }

    #[test]
    fn other_scopes_do_not_contribute() {
        let source = "def a():\n    x = 1\n\ndef b():\n    use(x)\n";
        let index = index_of(source);
        let call = offset_of(source, "use(x)");
        assert_eq!(index.resolve(&frame(source, "b"), "x", call), vec![ValueState::Dynamic]);
    }

    #[test]
    fn nested_function_body_is_a_separate_scope() {
        let source = "def outer():\n    x = 1\n    def inner():\n        x = f()\n    use(x)\n";
        let index = index_of(source);
        let call = offset_of(source, "use(x)");
        assert_eq!(
            index.resolve(&frame(source, "outer"), "x", call),
            vec![ValueState::Literal("1".to_owned())]
        );
    }

    #[test]
    fn loop_body_assignment_counts_lexically() {
        let source = "def f():\n    for i in r:\n        x = 1\n    use(x)\n";
        let index = index_of(source);
        let call = offset_of(source, "use(x)");
        assert_eq!(
            index.resolve(&frame(source, "f"), "x", call),
            vec![ValueState::Literal("1".to_owned())]
        );
    }

    #[test]
    fn walrus_binding_is_indexed() {
        let source = "def f():\n    if (x := 3):\n        use(x)\n";
        let index = index_of(source);
        let call = offset_of(source, "use(x)");
        assert_eq!(
            index.resolve(&frame(source, "f"), "x", call),
            vec![ValueState::Literal("3".to_owned())]
        );
    }

    #[test]
    fn for_target_rebinding_is_dynamic() {
        let source = "def f():\n    x = 1\n    for x in r:\n        pass\n    use(x)\n";
        let index = index_of(source);
        let call = offset_of(source, "use(x)");
        assert_eq!(index.resolve(&frame(source, "f"), "x", call), vec![ValueState::Dynamic]);
    }

    #[test]
    fn same_named_functions_do_not_share_assignments() {
        // Redefinition (overload stubs, conditional defs) must not leak the
        // first body's values into the second.
        let source = "def f():\n    x = 1\n\ndef f():\n    use(x)\n";
        let index = index_of(source);
        let call = offset_of(source, "use(x)");
        let second = format!("f@{}", source.rfind("def f").unwrap());
        assert_eq!(index.resolve(&second, "x", call), vec![ValueState::Dynamic]);
        // The first body keeps its own assignment.
        assert_eq!(
            index.resolve(&frame(source, "f"), "x", call),
            vec![ValueState::Literal("1".to_owned())]
        );
    }

    #[test]
    fn lambda_parameter_shadows_enclosing_assignment() {
        let source = "def d():\n    v = 1\n    cb = lambda v: use(v)\n";
        let index = index_of(source);
        let call = offset_of(source, "use(v)");
        let scope = format!(
            "{}.<lambda>@{}",
            frame(source, "d"),
            source.find("lambda").unwrap()
        );
        assert_eq!(index.resolve(&scope, "v", call), vec![ValueState::Dynamic]);
    }

    #[test]
    fn walrus_inside_lambda_body_is_indexed_under_the_lambda() {
        let source = "def d():\n    cb = lambda: (y := 4) and use(y)\n";
        let index = index_of(source);
        let call = offset_of(source, "use(y)");
        let scope = format!(
            "{}.<lambda>@{}",
            frame(source, "d"),
            source.find("lambda").unwrap()
        );
        assert_eq!(
            index.resolve(&scope, "y", call),
            vec![ValueState::Literal("4".to_owned())]
        );
        // The binding does not leak into the enclosing function.
        assert_eq!(
            index.resolve(&frame(source, "d"), "y", call),
            vec![ValueState::Dynamic]
        );
    }

    #[test]
    fn module_scope_assignments_resolve() {
        let source = "x = 5\nuse(x)\n";
        let index = index_of(source);
        let call = offset_of(source, "use(x)");
        assert_eq!(
            index.resolve("<module>", "x", call),
            vec![ValueState::Literal("5".to_owned())]
        );
    }
}
