//! Closed syntax model that extraction passes walk.
//!
//! The parser lowers a tree-sitter concrete tree into these variants and
//! drops everything the extraction heuristics never look at. Statements and
//! expressions without a dedicated variant become [`SyntaxNode::Other`],
//! which only keeps the interesting nodes nested below it.

/// A lowered source file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Module {
    pub body: Vec<SyntaxNode>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SyntaxNode {
    ClassDef(ClassDef),
    FunctionDef(FunctionDef),
    Import(Import),
    ImportFrom(ImportFrom),
    Try(TryBlock),
    With(WithBlock),
    Return(Return),
    Call(Call),
    Assign(Assign),
    Other(Vec<SyntaxNode>),
}

/// A base-class expression in a class header.
#[derive(Clone, Debug, PartialEq)]
pub enum BaseRef {
    /// A bare identifier such as `IController`.
    Name(String),
    /// Anything else (`models.Model`, `metaclass=ABCMeta`, ...), as source text.
    Expr(String),
}

impl BaseRef {
    pub fn name(&self) -> Option<&str> {
        match self {
            BaseRef::Name(name) => Some(name),
            BaseRef::Expr(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassDef {
    pub name: String,
    /// 1-based line of the `class` keyword.
    pub line: usize,
    pub bases: Vec<BaseRef>,
    pub decorators: Vec<String>,
    pub body: Vec<SyntaxNode>,
}

impl ClassDef {
    /// Function definitions directly in the class body, in declaration order.
    pub fn methods(&self) -> impl Iterator<Item = &FunctionDef> {
        self.body.iter().filter_map(|node| match node {
            SyntaxNode::FunctionDef(f) => Some(f),
            _ => None,
        })
    }

    pub fn has_base(&self, name: &str) -> bool {
        self.bases.iter().any(|b| b.name() == Some(name))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub line: usize,
    /// Positional parameter names, `self` included.
    pub params: Vec<String>,
    pub decorators: Vec<String>,
    pub is_async: bool,
    pub body: Vec<SyntaxNode>,
}

/// `import a.b, c as d` keeps the imported module paths.
#[derive(Clone, Debug, PartialEq)]
pub struct Import {
    pub line: usize,
    pub names: Vec<String>,
}

/// `from module import a, b`; a wildcard import has the single name `*`.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportFrom {
    pub line: usize,
    /// Source text of the module, leading dots kept for relative imports.
    pub module: String,
    pub names: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExceptHandler {
    pub exceptions: Vec<String>,
    pub body: Vec<SyntaxNode>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TryBlock {
    pub line: usize,
    pub body: Vec<SyntaxNode>,
    pub handlers: Vec<ExceptHandler>,
    pub orelse: Option<Vec<SyntaxNode>>,
    pub finalbody: Option<Vec<SyntaxNode>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WithBlock {
    pub line: usize,
    /// Source text of each `with` item, `as` targets included.
    pub items: Vec<String>,
    /// Lowered item expressions (calls inside the header).
    pub item_nodes: Vec<SyntaxNode>,
    pub body: Vec<SyntaxNode>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Return {
    pub line: usize,
    pub value: Option<Box<SyntaxNode>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Callee {
    Name(String),
    Attribute { receiver: String, member: String },
    Expr(String),
}

impl Callee {
    /// Member name for attribute calls (`Response.success` → `success`).
    pub fn member(&self) -> Option<&str> {
        match self {
            Callee::Attribute { member, .. } => Some(member),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub line: usize,
    pub callee: Callee,
    /// Lowered receiver and argument expressions.
    pub children: Vec<SyntaxNode>,
}

/// Binding of plain identifiers (`=`, augmented assignment, `for` and
/// `with ... as` targets).
#[derive(Clone, Debug, PartialEq)]
pub struct Assign {
    pub line: usize,
    pub targets: Vec<String>,
    pub value: Vec<SyntaxNode>,
}

impl SyntaxNode {
    /// Direct children, in source order.
    pub fn children(&self) -> Vec<&SyntaxNode> {
        match self {
            SyntaxNode::ClassDef(c) => c.body.iter().collect(),
            SyntaxNode::FunctionDef(f) => f.body.iter().collect(),
            SyntaxNode::Import(_) | SyntaxNode::ImportFrom(_) => Vec::new(),
            SyntaxNode::Try(t) => {
                let mut out: Vec<&SyntaxNode> = t.body.iter().collect();
                for handler in &t.handlers {
                    out.extend(handler.body.iter());
                }
                if let Some(orelse) = &t.orelse {
                    out.extend(orelse.iter());
                }
                if let Some(finalbody) = &t.finalbody {
                    out.extend(finalbody.iter());
                }
                out
            }
            SyntaxNode::With(w) => w.item_nodes.iter().chain(w.body.iter()).collect(),
            SyntaxNode::Return(r) => r.value.iter().map(|v| v.as_ref()).collect(),
            SyntaxNode::Call(c) => c.children.iter().collect(),
            SyntaxNode::Assign(a) => a.value.iter().collect(),
            SyntaxNode::Other(nodes) => nodes.iter().collect(),
        }
    }
}

/// Pre-order walk over `nodes` and everything below them.
pub fn descendants(nodes: &[SyntaxNode]) -> Vec<&SyntaxNode> {
    let mut out = Vec::new();
    let mut stack: Vec<&SyntaxNode> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        out.push(node);
        let children = node.children();
        stack.extend(children.into_iter().rev());
    }
    out
}

// ---------------------------------------------------------------------------
// Visitor
// ---------------------------------------------------------------------------

/// Typed traversal over a lowered module. Every hook defaults to walking
/// the node's children, so implementors override only what they inspect
/// and call the matching `walk_*` function to keep descending.
pub trait Visitor {
    fn visit_class(&mut self, class: &ClassDef) {
        walk_nodes(self, &class.body);
    }

    fn visit_function(&mut self, function: &FunctionDef) {
        walk_nodes(self, &function.body);
    }

    fn visit_import(&mut self, _import: &Import) {}

    fn visit_import_from(&mut self, _import: &ImportFrom) {}

    fn visit_try(&mut self, block: &TryBlock) {
        walk_try(self, block);
    }

    fn visit_with(&mut self, block: &WithBlock) {
        walk_nodes(self, &block.item_nodes);
        walk_nodes(self, &block.body);
    }

    fn visit_return(&mut self, ret: &Return) {
        if let Some(value) = &ret.value {
            walk_node(self, value);
        }
    }

    fn visit_call(&mut self, call: &Call) {
        walk_nodes(self, &call.children);
    }

    fn visit_assign(&mut self, assign: &Assign) {
        walk_nodes(self, &assign.value);
    }
}

pub fn walk_module<V: Visitor + ?Sized>(visitor: &mut V, module: &Module) {
    walk_nodes(visitor, &module.body);
}

pub fn walk_nodes<V: Visitor + ?Sized>(visitor: &mut V, nodes: &[SyntaxNode]) {
    for node in nodes {
        walk_node(visitor, node);
    }
}

pub fn walk_node<V: Visitor + ?Sized>(visitor: &mut V, node: &SyntaxNode) {
    match node {
        SyntaxNode::ClassDef(c) => visitor.visit_class(c),
        SyntaxNode::FunctionDef(f) => visitor.visit_function(f),
        SyntaxNode::Import(i) => visitor.visit_import(i),
        SyntaxNode::ImportFrom(i) => visitor.visit_import_from(i),
        SyntaxNode::Try(t) => visitor.visit_try(t),
        SyntaxNode::With(w) => visitor.visit_with(w),
        SyntaxNode::Return(r) => visitor.visit_return(r),
        SyntaxNode::Call(c) => visitor.visit_call(c),
        SyntaxNode::Assign(a) => visitor.visit_assign(a),
        SyntaxNode::Other(nodes) => walk_nodes(visitor, nodes),
    }
}

pub fn walk_try<V: Visitor + ?Sized>(visitor: &mut V, block: &TryBlock) {
    walk_nodes(visitor, &block.body);
    for handler in &block.handlers {
        walk_nodes(visitor, &handler.body);
    }
    if let Some(orelse) = &block.orelse {
        walk_nodes(visitor, orelse);
    }
    if let Some(finalbody) = &block.finalbody {
        walk_nodes(visitor, finalbody);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(member: &str, children: Vec<SyntaxNode>) -> SyntaxNode {
        SyntaxNode::Call(Call {
            line: 1,
            callee: Callee::Attribute {
                receiver: "self".into(),
                member: member.into(),
            },
            children,
        })
    }

    #[test]
    fn test_descendants_is_preorder() {
        let nodes = vec![SyntaxNode::Other(vec![
            call("outer", vec![call("inner", vec![])]),
            call("sibling", vec![]),
        ])];
        let members: Vec<&str> = descendants(&nodes)
            .into_iter()
            .filter_map(|n| match n {
                SyntaxNode::Call(c) => c.callee.member(),
                _ => None,
            })
            .collect();
        assert_eq!(members, vec!["outer", "inner", "sibling"]);
    }

    #[test]
    fn test_default_visitor_reaches_nested_calls() {
        struct CallCounter(usize);
        impl Visitor for CallCounter {
            fn visit_call(&mut self, call: &Call) {
                self.0 += 1;
                walk_nodes(self, &call.children);
            }
        }

        let module = Module {
            body: vec![SyntaxNode::Try(TryBlock {
                line: 1,
                body: vec![call("a", vec![call("b", vec![])])],
                handlers: vec![ExceptHandler {
                    exceptions: vec!["ValueError".into()],
                    body: vec![call("c", vec![])],
                }],
                orelse: None,
                finalbody: Some(vec![call("d", vec![])]),
            })],
        };
        let mut counter = CallCounter(0);
        walk_module(&mut counter, &module);
        assert_eq!(counter.0, 4);
    }
}
