//! Pass 1: call-site collection.
//!
//! Walks a parsed module, finds every call to a target symbol at any
//! nesting depth, and classifies each positional argument in call order.
//! Classification is deliberately shallow: literals keep their verbatim
//! source text, a bare name becomes a reference placeholder for pass 2,
//! and everything else is dynamic with no further resolution attempted.

#![allow(missing_docs)]

use crate::constants::MAX_RECURSION_DEPTH;
use crate::utils::{scope_frame, scope_key, LineIndex};
use ruff_python_ast::{self as ast, Expr, Stmt};
use ruff_text_size::{Ranged, TextSize};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// Classification of one argument expression at a call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgExpr {
    /// Literal argument; verbatim source text.
    Literal(String),
    /// Bare-name argument, pending backward value resolution.
    Ref(String),
    /// Not statically classifiable (nested call, arithmetic, attribute
    /// access, ternary, ...).
    Dynamic,
}

/// One invocation of a target symbol.
#[derive(Debug, Clone)]
pub struct CallSite {
    /// The target symbol being called.
    pub symbol: String,
    /// Scope key of the enclosing function (or `<module>`).
    pub scope: String,
    /// Byte offset of the call expression, used for lexical ordering
    /// against assignments in the same scope.
    pub offset: TextSize,
    /// 1-indexed source line of the call.
    pub line: usize,
    /// Positional arguments in call order.
    pub args: Vec<ArgExpr>,
}

/// Returns the verbatim source text of `expr` if it is a literal.
///
/// Number, string, bytes, boolean and `None` literals qualify, as does a
/// unary `+`/`-` applied directly to a number literal. Numeric text is not
/// normalized, so `0x10` stays `0x10`.
pub(crate) fn literal_text<'a>(expr: &Expr, source: &'a str) -> Option<&'a str> {
    let is_literal = match expr {
        Expr::NumberLiteral(_)
        | Expr::StringLiteral(_)
        | Expr::BytesLiteral(_)
        | Expr::BooleanLiteral(_)
        | Expr::NoneLiteral(_) => true,
        Expr::UnaryOp(unary) => {
            matches!(unary.op, ast::UnaryOp::USub | ast::UnaryOp::UAdd)
                && matches!(&*unary.operand, Expr::NumberLiteral(_))
        }
        _ => false,
    };
    if is_literal {
        let range = expr.range();
        Some(&source[range.start().to_usize()..range.end().to_usize()])
    } else {
        None
    }
}

/// Recursive visitor that records call sites of the target symbols.
pub struct CallSiteCollector<'a> {
    source: &'a str,
    targets: &'a FxHashSet<String>,
    line_index: &'a LineIndex,
    /// Collected call sites, in source order.
    pub call_sites: Vec<CallSite>,
    /// Whether traversal was cut short by the recursion limit.
    pub recursion_limit_hit: bool,
    scope_stack: SmallVec<[String; 4]>,
    depth: usize,
}

impl<'a> CallSiteCollector<'a> {
    pub fn new(
        source: &'a str,
        targets: &'a FxHashSet<String>,
        line_index: &'a LineIndex,
    ) -> Self {
        Self {
            source,
            targets,
            line_index,
            call_sites: Vec::new(),
            recursion_limit_hit: false,
            scope_stack: SmallVec::new(),
            depth: 0,
        }
    }

    pub fn visit_stmt(&mut self, stmt: &Stmt) {
        if self.depth >= MAX_RECURSION_DEPTH {
            self.recursion_limit_hit = true;
            return;
        }
        self.depth += 1;

        match stmt {
            Stmt::FunctionDef(node) => {
                // Decorators and defaults evaluate in the outer scope.
                for decorator in &node.decorator_list {
                    self.visit_expr(&decorator.expression);
                }
                self.visit_parameter_defaults(&node.parameters);
                self.scope_stack
                    .push(scope_frame(node.name.as_str(), node.range().start()));
                for inner in &node.body {
                    self.visit_stmt(inner);
                }
                self.scope_stack.pop();
            }
            Stmt::ClassDef(node) => {
                for decorator in &node.decorator_list {
                    self.visit_expr(&decorator.expression);
                }
                if let Some(arguments) = &node.arguments {
                    for base in &arguments.args {
                        self.visit_expr(base);
                    }
                    for keyword in &arguments.keywords {
                        self.visit_expr(&keyword.value);
                    }
                }
                self.scope_stack
                    .push(scope_frame(node.name.as_str(), node.range().start()));
                for inner in &node.body {
                    self.visit_stmt(inner);
                }
                self.scope_stack.pop();
            }
            Stmt::Assign(node) => {
                self.visit_expr(&node.value);
                for target in &node.targets {
                    self.visit_expr(target);
                }
            }
            Stmt::AnnAssign(node) => {
                if let Some(value) = &node.value {
                    self.visit_expr(value);
                }
            }
            Stmt::AugAssign(node) => {
                self.visit_expr(&node.target);
                self.visit_expr(&node.value);
            }
            Stmt::Expr(node) => self.visit_expr(&node.value),
            Stmt::Return(node) => {
                if let Some(value) = &node.value {
                    self.visit_expr(value);
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
            Stmt::While(node) => {
                self.visit_expr(&node.test);
                for inner in node.body.iter().chain(&node.orelse) {
                    self.visit_stmt(inner);
                }
            }
            Stmt::For(node) => {
                self.visit_expr(&node.iter);
                for inner in node.body.iter().chain(&node.orelse) {
                    self.visit_stmt(inner);
                }
            }
            Stmt::With(node) => {
                for item in &node.items {
                    self.visit_expr(&item.context_expr);
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
                    if let Some(guard) = &case.guard {
                        self.visit_expr(guard);
                    }
                    for inner in &case.body {
                        self.visit_stmt(inner);
                    }
                }
            }
            Stmt::Raise(node) => {
                if let Some(exc) = &node.exc {
                    self.visit_expr(exc);
                }
                if let Some(cause) = &node.cause {
                    self.visit_expr(cause);
                }
            }
            Stmt::Assert(node) => {
                self.visit_expr(&node.test);
                if let Some(msg) = &node.msg {
                    self.visit_expr(msg);
                }
            }
            Stmt::Delete(node) => {
                for target in &node.targets {
                    self.visit_expr(target);
                }
            }
            _ => {}
        }

        self.depth -= 1;
    }

    pub fn visit_expr(&mut self, expr: &Expr) {
        if self.depth >= MAX_RECURSION_DEPTH {
            self.recursion_limit_hit = true;
            return;
        }
        self.depth += 1;

        if let Expr::Call(call) = expr {
            if let Some(symbol) = self.match_target(&call.func) {
                self.record_call(symbol, call);
            }
        }
        self.visit_expr_children(expr);

        self.depth -= 1;
    }

    /// Matches a callee expression against the target set.
    ///
    /// Bare names (`f(...)`) and the final attribute of a dotted callee
    /// (`mod.f(...)`) both count; the callee itself is never treated as an
    /// argument reference.
    fn match_target(&self, func: &Expr) -> Option<String> {
        match func {
            Expr::Name(name) if self.targets.contains(name.id.as_str()) => {
                Some(name.id.to_string())
            }
            Expr::Attribute(attr) if self.targets.contains(attr.attr.as_str()) => {
                Some(attr.attr.to_string())
            }
            _ => None,
        }
    }

    fn record_call(&mut self, symbol: String, call: &ast::ExprCall) {
        let offset = call.range().start();
        let args = call
            .arguments
            .args
            .iter()
            .map(|arg| self.classify_arg(arg))
            .collect();
        self.call_sites.push(CallSite {
            symbol,
            scope: scope_key(&self.scope_stack),
            offset,
            line: self.line_index.line_of(offset),
            args,
        });
    }

    fn classify_arg(&self, expr: &Expr) -> ArgExpr {
        if let Some(text) = literal_text(expr, self.source) {
            return ArgExpr::Literal(text.to_owned());
        }
        if let Expr::Name(name) = expr {
            return ArgExpr::Ref(name.id.to_string());
        }
        ArgExpr::Dynamic
    }

    fn visit_expr_children(&mut self, expr: &Expr) {
        match expr {
            Expr::Call(node) => {
                self.visit_expr(&node.func);
                // Keyword values are traversed too, so nested target calls
                // inside them still get their own call sites.
                for arg in &node.arguments.args {
                    self.visit_expr(arg);
                }
                for keyword in &node.arguments.keywords {
                    self.visit_expr(&keyword.value);
                }
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
                // Defaults evaluate in the enclosing scope; the body is a
                // scope of its own, like a `def`.
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
            Expr::Named(node) => {
                self.visit_expr(&node.target);
                self.visit_expr(&node.value);
            }
            Expr::Attribute(node) => self.visit_expr(&node.value),
            Expr::Subscript(node) => {
                self.visit_expr(&node.value);
                self.visit_expr(&node.slice);
            }
            Expr::Compare(node) => {
                self.visit_expr(&node.left);
                for comparator in &node.comparators {
                    self.visit_expr(comparator);
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
            Expr::Set(node) => {
                for elt in &node.elts {
                    self.visit_expr(elt);
                }
            }
            Expr::List(node) => {
                for elt in &node.elts {
                    self.visit_expr(elt);
                }
            }
            Expr::Tuple(node) => {
                for elt in &node.elts {
                    self.visit_expr(elt);
                }
            }
            Expr::ListComp(node) => {
                self.visit_generators(&node.generators);
                self.visit_expr(&node.elt);
            }
            Expr::SetComp(node) => {
                self.visit_generators(&node.generators);
                self.visit_expr(&node.elt);
            }
            Expr::DictComp(node) => {
                self.visit_generators(&node.generators);
                if let Some(key) = &node.key {
                    self.visit_expr(key);
                }
                self.visit_expr(&node.value);
            }
            Expr::Generator(node) => {
                self.visit_generators(&node.generators);
                self.visit_expr(&node.elt);
            }
            Expr::Await(node) => self.visit_expr(&node.value),
            Expr::Yield(node) => {
                if let Some(value) = &node.value {
                    self.visit_expr(value);
                }
            }
            Expr::YieldFrom(node) => self.visit_expr(&node.value),
            Expr::Starred(node) => self.visit_expr(&node.value),
            Expr::Slice(node) => {
                for part in [&node.lower, &node.upper, &node.step].into_iter().flatten() {
                    self.visit_expr(part);
                }
            }
            Expr::FString(node) => {
                for part in &node.value {
                    if let ast::FStringPart::FString(f) = part {
                        for element in &f.elements {
                            if let ast::InterpolatedStringElement::Interpolation(interp) = element {
                                self.visit_expr(&interp.expression);
                            }
                        }
                    }
                }
            }
            _ => {}
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

    fn visit_generators(&mut self, generators: &[ast::Comprehension]) {
        for generator in generators {
            self.visit_expr(&generator.iter);
            for if_expr in &generator.ifs {
                self.visit_expr(if_expr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(source: &str, targets: &[&str]) -> Vec<CallSite> {
        let targets: FxHashSet<String> = targets.iter().map(|s| (*s).to_owned()).collect();
        let line_index = LineIndex::new(source);
        let parsed = ruff_python_parser::parse_module(source).unwrap();
        let mut collector = CallSiteCollector::new(source, &targets, &line_index);
        for stmt in &parsed.into_syntax().body {
            collector.visit_stmt(stmt);
        }
        assert!(!collector.recursion_limit_hit);
        collector.call_sites
    }

    #[test]
    fn finds_calls_at_any_nesting_depth() {
        let source = "\
def run():
    if cond:
        f(1)
    for _ in range(3):
        while other:
            f(2)
";
        let sites = collect(source, &["f"]);
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].line, 3);
        assert_eq!(sites[1].line, 6);
        assert_eq!(sites[0].scope, "run@0");
    }

    #[test]
    fn call_in_parameter_default_is_collected() {
        let source = "def g(a=f(1), *, b=f(2)):\n    pass\n";
        let sites = collect(source, &["f"]);
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].args, vec![ArgExpr::Literal("1".to_owned())]);
        assert_eq!(sites[1].args, vec![ArgExpr::Literal("2".to_owned())]);
        // Defaults evaluate at definition time, in the enclosing scope.
        assert_eq!(sites[0].scope, "<module>");
    }

    #[test]
    fn lambda_body_gets_its_own_scope() {
        let source = "def d():\n    cb = lambda v: f(v)\n";
        let sites = collect(source, &["f"]);
        assert_eq!(sites.len(), 1);
        let lambda_offset = source.find("lambda").unwrap();
        assert_eq!(sites[0].scope, format!("d@0.<lambda>@{lambda_offset}"));
    }

    #[test]
    fn call_in_lambda_default_uses_enclosing_scope() {
        let sites = collect("cb = lambda a=f(3): a\n", &["f"]);
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].scope, "<module>");
        assert_eq!(sites[0].args, vec![ArgExpr::Literal("3".to_owned())]);
    }

    #[test]
    fn argument_count_matches_call_syntax() {
        let sites = collect("f(1, x, g(), a.b, 'lit')\n", &["f"]);
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].args.len(), 5);
    }

    #[test]
    fn literal_text_is_verbatim() {
        let sites = collect("f(0x10, \"err\", True, None, -1, 1_000)\n", &["f"]);
        let args = &sites[0].args;
        assert_eq!(args[0], ArgExpr::Literal("0x10".to_owned()));
        assert_eq!(args[1], ArgExpr::Literal("\"err\"".to_owned()));
        assert_eq!(args[2], ArgExpr::Literal("True".to_owned()));
        assert_eq!(args[3], ArgExpr::Literal("None".to_owned()));
        assert_eq!(args[4], ArgExpr::Literal("-1".to_owned()));
        assert_eq!(args[5], ArgExpr::Literal("1_000".to_owned()));
    }

    #[test]
    fn bare_name_becomes_reference() {
        let sites = collect("f(x)\n", &["f"]);
        assert_eq!(sites[0].args, vec![ArgExpr::Ref("x".to_owned())]);
    }

    #[test]
    fn indirection_and_expressions_are_dynamic() {
        let sites = collect("f(p.field, d[k], a + 1, x if c else y)\n", &["f"]);
        assert!(sites[0].args.iter().all(|a| *a == ArgExpr::Dynamic));
    }

    #[test]
    fn nested_target_call_is_dynamic_but_still_collected() {
        let sites = collect("f(g(1))\n", &["f", "g"]);
        assert_eq!(sites.len(), 2);
        let f_site = sites.iter().find(|s| s.symbol == "f").unwrap();
        let g_site = sites.iter().find(|s| s.symbol == "g").unwrap();
        assert_eq!(f_site.args, vec![ArgExpr::Dynamic]);
        assert_eq!(g_site.args, vec![ArgExpr::Literal("1".to_owned())]);
    }

    #[test]
    fn target_call_inside_keyword_value_is_collected() {
        let sites = collect("other(key=f(2))\n", &["f"]);
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].args, vec![ArgExpr::Literal("2".to_owned())]);
    }

    #[test]
    fn dotted_callee_matches_final_attribute() {
        let sites = collect("lib.sub.f('a')\n", &["f"]);
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].args, vec![ArgExpr::Literal("'a'".to_owned())]);
    }

    #[test]
    fn zero_argument_call_yields_empty_record() {
        let sites = collect("f()\n", &["f"]);
        assert_eq!(sites.len(), 1);
        assert!(sites[0].args.is_empty());
    }

    #[test]
    fn callee_reference_is_not_an_argument() {
        let sites = collect("f(f)\n", &["f"]);
        assert_eq!(sites.len(), 1);
        // The callee position is not recorded; the argument position is a
        // reference like any other bare name.
        assert_eq!(sites[0].args, vec![ArgExpr::Ref("f".to_owned())]);
    }

    #[test]
    fn module_level_calls_use_module_scope() {
        let sites = collect("f(1)\n", &["f"]);
        assert_eq!(sites[0].scope, "<module>");
    }

    #[test]
    fn recursion_limit_sets_flag_instead_of_overflowing() {
        // Parentheses are not AST nodes; a long unary chain is.
        let source = format!("x = {}1\n", "-".repeat(500));
        let targets: FxHashSet<String> = std::iter::once("f".to_owned()).collect();
        let line_index = LineIndex::new(&source);
        let parsed = ruff_python_parser::parse_module(&source).unwrap();
        let mut collector = CallSiteCollector::new(&source, &targets, &line_index);
        for stmt in &parsed.into_syntax().body {
            collector.visit_stmt(stmt);
        }
        assert!(collector.recursion_limit_hit);
    }
}
