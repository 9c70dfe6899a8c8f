//! Python parsing with tree-sitter, lowered into the [`syntax`] model.
//!
//! tree-sitter recovers from invalid input instead of failing, so any
//! ERROR or MISSING node in the concrete tree is reported as a parse error.
//!
//! [`syntax`]: crate::indexer::syntax

use tree_sitter::{Node, Parser};

use crate::errors::{ScaffoldError, ScaffoldResult};
use crate::indexer::syntax::{
    Assign, BaseRef, Call, Callee, ClassDef, ExceptHandler, FunctionDef, Import, ImportFrom,
    Module, Return, SyntaxNode, TryBlock, WithBlock,
};

/// Reusable Python parser.
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> ScaffoldResult<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ScaffoldError::Parse {
                path: String::new(),
                line: 0,
                reason: format!("Failed to set language: {e}"),
            })?;
        Ok(Self { parser })
    }

    /// Parse `source` and lower it. `path` only labels errors.
    pub fn parse(&mut self, source: &str, path: &str) -> ScaffoldResult<Module> {
        let tree = self
            .parser
            .parse(source.as_bytes(), None)
            .ok_or_else(|| ScaffoldError::Parse {
                path: path.to_string(),
                line: 1,
                reason: "parser produced no tree".to_string(),
            })?;

        let root = tree.root_node();
        if root.has_error() {
            let (line, snippet) = first_error(root, source.as_bytes());
            return Err(ScaffoldError::Parse {
                path: path.to_string(),
                line,
                reason: format!("invalid syntax near `{snippet}`"),
            });
        }

        let src = source.as_bytes();
        Ok(Module {
            body: lower_children(root, src),
        })
    }
}

/// One-shot convenience around [`PythonParser`].
pub fn parse_module(source: &str, path: &str) -> ScaffoldResult<Module> {
    PythonParser::new()?.parse(source, path)
}

// ---------------------------------------------------------------------------
// Tree helpers
// ---------------------------------------------------------------------------

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

fn text(node: Node<'_>, src: &[u8]) -> String {
    node.utf8_text(src).unwrap_or_default().to_string()
}

fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

fn first_error(root: Node<'_>, src: &[u8]) -> (usize, String) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let snippet: String = text(node, src).lines().next().unwrap_or("").chars().take(40).collect();
            return (line_of(node), snippet);
        }
        let mut cursor = node.walk();
        let mut children: Vec<Node<'_>> = node
            .children(&mut cursor)
            .filter(|c| c.has_error() || c.is_missing())
            .collect();
        children.reverse();
        stack.extend(children);
    }
    (line_of(root), String::new())
}

// ---------------------------------------------------------------------------
// Lowering
// ---------------------------------------------------------------------------

fn lower_children(node: Node<'_>, src: &[u8]) -> Vec<SyntaxNode> {
    named_children(node)
        .into_iter()
        .flat_map(|child| lower(child, src))
        .collect()
}

/// Lower a `block` (or any suite) into a flat statement list.
fn lower_block(node: Option<Node<'_>>, src: &[u8]) -> Vec<SyntaxNode> {
    node.map(|n| lower_children(n, src)).unwrap_or_default()
}

fn lower(node: Node<'_>, src: &[u8]) -> Vec<SyntaxNode> {
    match node.kind() {
        "class_definition" => vec![SyntaxNode::ClassDef(lower_class(node, src, Vec::new()))],
        "function_definition" => {
            vec![SyntaxNode::FunctionDef(lower_function(node, src, Vec::new()))]
        }
        "decorated_definition" => lower_decorated(node, src),
        "import_statement" => vec![SyntaxNode::Import(Import {
            line: line_of(node),
            names: imported_names(node, src),
        })],
        "import_from_statement" | "future_import_statement" => {
            let module = match node.child_by_field_name("module_name") {
                Some(m) => text(m, src),
                None => "__future__".to_string(),
            };
            vec![SyntaxNode::ImportFrom(ImportFrom {
                line: line_of(node),
                module,
                names: imported_names(node, src),
            })]
        }
        "try_statement" => vec![SyntaxNode::Try(lower_try(node, src))],
        "with_statement" => vec![SyntaxNode::With(lower_with(node, src))],
        "return_statement" => vec![SyntaxNode::Return(Return {
            line: line_of(node),
            value: named_children(node)
                .into_iter()
                .next()
                .map(|v| Box::new(lower_value(v, src))),
        })],
        "call" => vec![SyntaxNode::Call(lower_call(node, src))],
        "assignment" | "augmented_assignment" => vec![SyntaxNode::Assign(Assign {
            line: line_of(node),
            targets: node
                .child_by_field_name("left")
                .map(|l| binding_targets(l, src))
                .unwrap_or_default(),
            value: node
                .child_by_field_name("right")
                .map(|r| lower(r, src))
                .unwrap_or_default(),
        })],
        "for_statement" => {
            let mut nodes = vec![SyntaxNode::Assign(Assign {
                line: line_of(node),
                targets: node
                    .child_by_field_name("left")
                    .map(|l| binding_targets(l, src))
                    .unwrap_or_default(),
                value: node
                    .child_by_field_name("right")
                    .map(|r| lower(r, src))
                    .unwrap_or_default(),
            })];
            nodes.extend(lower_block(node.child_by_field_name("body"), src));
            if let Some(alt) = node.child_by_field_name("alternative") {
                nodes.extend(lower_children(alt, src));
            }
            vec![SyntaxNode::Other(nodes)]
        }
        "block" | "module" => lower_children(node, src),
        _ => {
            let nested = lower_children(node, src);
            if nested.is_empty() {
                Vec::new()
            } else {
                vec![SyntaxNode::Other(nested)]
            }
        }
    }
}

/// Expression in value position: a call stays a call, anything else is
/// wrapped so a return of `x if c else Response.ok()` is not mistaken for
/// a direct call.
fn lower_value(node: Node<'_>, src: &[u8]) -> SyntaxNode {
    if node.kind() == "call" {
        SyntaxNode::Call(lower_call(node, src))
    } else {
        SyntaxNode::Other(lower(node, src))
    }
}

fn lower_decorated(node: Node<'_>, src: &[u8]) -> Vec<SyntaxNode> {
    let decorators: Vec<String> = named_children(node)
        .into_iter()
        .filter(|c| c.kind() == "decorator")
        .filter_map(|d| decorator_name(d, src))
        .collect();
    match node.child_by_field_name("definition") {
        Some(def) if def.kind() == "class_definition" => {
            vec![SyntaxNode::ClassDef(lower_class(def, src, decorators))]
        }
        Some(def) if def.kind() == "function_definition" => {
            vec![SyntaxNode::FunctionDef(lower_function(def, src, decorators))]
        }
        Some(def) => lower(def, src),
        None => Vec::new(),
    }
}

fn decorator_name(node: Node<'_>, src: &[u8]) -> Option<String> {
    let expr = named_children(node).into_iter().next()?;
    match expr.kind() {
        "identifier" | "attribute" => Some(text(expr, src)),
        "call" => expr.child_by_field_name("function").map(|f| text(f, src)),
        _ => None,
    }
}

fn lower_class(node: Node<'_>, src: &[u8], decorators: Vec<String>) -> ClassDef {
    let name = node
        .child_by_field_name("name")
        .map(|n| text(n, src))
        .unwrap_or_default();
    let bases = node
        .child_by_field_name("superclasses")
        .map(|args| {
            named_children(args)
                .into_iter()
                .map(|b| match b.kind() {
                    "identifier" => BaseRef::Name(text(b, src)),
                    _ => BaseRef::Expr(text(b, src)),
                })
                .collect()
        })
        .unwrap_or_default();
    ClassDef {
        name,
        line: line_of(node),
        bases,
        decorators,
        body: lower_block(node.child_by_field_name("body"), src),
    }
}

fn lower_function(node: Node<'_>, src: &[u8], decorators: Vec<String>) -> FunctionDef {
    let name = node
        .child_by_field_name("name")
        .map(|n| text(n, src))
        .unwrap_or_default();
    let is_async = node.child(0).map(|c| c.kind() == "async").unwrap_or(false);
    FunctionDef {
        name,
        line: line_of(node),
        params: node
            .child_by_field_name("parameters")
            .map(|p| positional_params(p, src))
            .unwrap_or_default(),
        decorators,
        is_async,
        body: lower_block(node.child_by_field_name("body"), src),
    }
}

/// Positional parameter names; stops at `*` / `*args` like Python's
/// `args.args`.
fn positional_params(node: Node<'_>, src: &[u8]) -> Vec<String> {
    let mut params = Vec::new();
    for param in named_children(node) {
        match param.kind() {
            "identifier" => params.push(text(param, src)),
            "typed_parameter" => {
                if let Some(first) = named_children(param).into_iter().next() {
                    if first.kind() == "identifier" {
                        params.push(text(first, src));
                    } else if first.kind() == "list_splat_pattern" {
                        break;
                    }
                }
            }
            "default_parameter" | "typed_default_parameter" => {
                if let Some(n) = param.child_by_field_name("name") {
                    params.push(text(n, src));
                }
            }
            "list_splat_pattern" | "keyword_separator" => break,
            _ => {}
        }
    }
    params
}

fn imported_names(node: Node<'_>, src: &[u8]) -> Vec<String> {
    let mut names: Vec<String> = field_children(node, "name")
        .into_iter()
        .map(|n| match n.kind() {
            "aliased_import" => n
                .child_by_field_name("name")
                .map(|inner| text(inner, src))
                .unwrap_or_default(),
            _ => text(n, src),
        })
        .filter(|n| !n.is_empty())
        .collect();
    if named_children(node)
        .iter()
        .any(|c| c.kind() == "wildcard_import")
    {
        names.push("*".to_string());
    }
    names
}

fn lower_try(node: Node<'_>, src: &[u8]) -> TryBlock {
    let mut handlers = Vec::new();
    let mut orelse = None;
    let mut finalbody = None;
    for clause in named_children(node) {
        match clause.kind() {
            "except_clause" | "except_group_clause" => {
                let parts = named_children(clause);
                let exceptions = parts
                    .iter()
                    .find(|p| p.kind() != "block")
                    .map(|e| exception_names(*e, src))
                    .unwrap_or_default();
                let body = parts
                    .iter()
                    .find(|p| p.kind() == "block")
                    .map(|b| lower_children(*b, src))
                    .unwrap_or_default();
                handlers.push(ExceptHandler { exceptions, body });
            }
            "else_clause" => {
                orelse = Some(lower_block(clause.child_by_field_name("body"), src));
            }
            "finally_clause" => {
                let block = named_children(clause)
                    .into_iter()
                    .find(|c| c.kind() == "block");
                finalbody = Some(lower_block(block, src));
            }
            _ => {}
        }
    }
    TryBlock {
        line: line_of(node),
        body: lower_block(node.child_by_field_name("body"), src),
        handlers,
        orelse,
        finalbody,
    }
}

fn exception_names(node: Node<'_>, src: &[u8]) -> Vec<String> {
    match node.kind() {
        "identifier" | "attribute" => vec![text(node, src)],
        "as_pattern" => named_children(node)
            .into_iter()
            .next()
            .map(|inner| exception_names(inner, src))
            .unwrap_or_default(),
        "tuple" | "parenthesized_expression" | "expression_list" => named_children(node)
            .into_iter()
            .flat_map(|c| exception_names(c, src))
            .collect(),
        _ => Vec::new(),
    }
}

fn lower_with(node: Node<'_>, src: &[u8]) -> WithBlock {
    let mut items = Vec::new();
    let mut item_nodes = Vec::new();
    for clause in named_children(node)
        .into_iter()
        .filter(|c| c.kind() == "with_clause")
    {
        for item in named_children(clause)
            .into_iter()
            .filter(|c| c.kind() == "with_item")
        {
            items.push(text(item, src));
            match item.child_by_field_name("value") {
                Some(value) if value.kind() == "as_pattern" => {
                    item_nodes.push(lower_as_pattern(value, src))
                }
                _ => item_nodes.extend(lower_children(item, src)),
            }
        }
    }
    WithBlock {
        line: line_of(node),
        items,
        item_nodes,
        body: lower_block(node.child_by_field_name("body"), src),
    }
}

/// `expr as target` binds `target` to `expr`.
fn lower_as_pattern(node: Node<'_>, src: &[u8]) -> SyntaxNode {
    let targets = match node.child_by_field_name("alias") {
        Some(alias) if alias.kind() == "as_pattern_target" => named_children(alias)
            .into_iter()
            .flat_map(|c| binding_targets(c, src))
            .collect(),
        Some(alias) => binding_targets(alias, src),
        None => Vec::new(),
    };
    let value = named_children(node)
        .into_iter()
        .next()
        .map(|expr| lower(expr, src))
        .unwrap_or_default();
    SyntaxNode::Assign(Assign {
        line: line_of(node),
        targets,
        value,
    })
}

fn lower_call(node: Node<'_>, src: &[u8]) -> Call {
    let mut children = Vec::new();
    let callee = match node.child_by_field_name("function") {
        Some(f) if f.kind() == "identifier" => Callee::Name(text(f, src)),
        Some(f) if f.kind() == "attribute" => {
            let receiver = f.child_by_field_name("object");
            if let Some(obj) = receiver {
                children.extend(lower(obj, src));
            }
            Callee::Attribute {
                receiver: receiver.map(|o| text(o, src)).unwrap_or_default(),
                member: f
                    .child_by_field_name("attribute")
                    .map(|a| text(a, src))
                    .unwrap_or_default(),
            }
        }
        Some(f) => {
            children.extend(lower(f, src));
            Callee::Expr(text(f, src))
        }
        None => Callee::Expr(String::new()),
    };
    if let Some(args) = node.child_by_field_name("arguments") {
        children.extend(lower_children(args, src));
    }
    Call {
        line: line_of(node),
        callee,
        children,
    }
}

/// Plain identifiers bound by an assignment target; attribute and
/// subscript targets bind nothing new.
fn binding_targets(node: Node<'_>, src: &[u8]) -> Vec<String> {
    match node.kind() {
        "identifier" => vec![text(node, src)],
        "pattern_list" | "tuple_pattern" | "list_pattern" | "tuple" | "list"
        | "expression_list" | "parenthesized_expression" => named_children(node)
            .into_iter()
            .flat_map(|c| binding_targets(c, src))
            .collect(),
        "list_splat_pattern" => named_children(node)
            .into_iter()
            .flat_map(|c| binding_targets(c, src))
            .collect(),
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
