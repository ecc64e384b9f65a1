//! Lowered program representation for lint analysis
//!
//! The upstream Python AST is lowered into a compact arena form: every
//! statement and expression gets a stable id, a byte span, and the scope it
//! occurs in. Constructs the checkers never look at lower to [`ExprKind::Opaque`]
//! with their operand expressions preserved, so traversal still reaches every
//! call site.

use indexmap::IndexMap;
use smallvec::SmallVec;
use std::collections::HashMap;

use crate::span::{LineIndex, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

/// One analyzed source file.
#[derive(Debug)]
pub struct HirModule {
    /// Module name derived from the file name; used to qualify user classes.
    pub name: String,
    pub body: Vec<StmtId>,
    stmts: Vec<HirStmt>,
    exprs: Vec<HirExpr>,
    scopes: Vec<Scope>,
    pub line_index: LineIndex,
    /// Call expressions that form the right side of a single-target,
    /// plain-name assignment directly in a class body. Consulted by the
    /// manager-attribute transform rule.
    pub class_attr_calls: HashMap<ExprId, ClassAttrAssign>,
}

/// `attr = SomeCall(...)` directly inside `class_def`'s body.
#[derive(Debug, Clone)]
pub struct ClassAttrAssign {
    pub class_def: StmtId,
    pub attr: String,
}

impl HirModule {
    pub fn new(name: String, line_index: LineIndex) -> Self {
        Self {
            name,
            body: Vec::new(),
            stmts: Vec::new(),
            exprs: Vec::new(),
            scopes: Vec::new(),
            line_index,
            class_attr_calls: HashMap::new(),
        }
    }

    pub fn stmt(&self, id: StmtId) -> &HirStmt {
        &self.stmts[id.0 as usize]
    }

    pub fn expr(&self, id: ExprId) -> &HirExpr {
        &self.exprs[id.0 as usize]
    }

    pub(crate) fn stmt_mut(&mut self, id: StmtId) -> &mut HirStmt {
        &mut self.stmts[id.0 as usize]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn alloc_stmt(&mut self, stmt: HirStmt) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(stmt);
        id
    }

    pub fn alloc_expr(&mut self, expr: HirExpr) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(expr);
        id
    }

    pub fn alloc_scope(&mut self, scope: Scope) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(scope);
        id
    }

    pub fn add_binding(&mut self, scope: ScopeId, name: &str, binding: Binding) {
        self.scopes[scope.0 as usize]
            .bindings
            .entry(name.to_string())
            .or_default()
            .push(binding);
    }

    pub fn stmt_ids(&self) -> impl Iterator<Item = StmtId> {
        (0..self.stmts.len() as u32).map(StmtId)
    }

    pub fn expr_ids(&self) -> impl Iterator<Item = ExprId> {
        (0..self.exprs.len() as u32).map(ExprId)
    }
}

#[derive(Debug)]
pub struct HirStmt {
    pub span: Span,
    pub scope: ScopeId,
    pub kind: StmtKind,
}

#[derive(Debug)]
pub enum StmtKind {
    FunctionDef {
        name: String,
        decorators: Vec<ExprId>,
        params: Vec<Param>,
        body: Vec<StmtId>,
        /// Scope introduced by the function body.
        inner_scope: ScopeId,
    },
    ClassDef {
        name: String,
        bases: Vec<ExprId>,
        body: Vec<StmtId>,
        inner_scope: ScopeId,
    },
    Assign {
        targets: Vec<ExprId>,
        value: ExprId,
    },
    AugAssign {
        target: ExprId,
        value: ExprId,
    },
    AnnAssign {
        target: ExprId,
        annotation: ExprId,
        value: Option<ExprId>,
    },
    Return {
        value: Option<ExprId>,
    },
    /// A bare expression statement.
    Expr {
        value: ExprId,
    },
    If {
        test: ExprId,
        body: Vec<StmtId>,
        orelse: Vec<StmtId>,
    },
    While {
        test: ExprId,
        body: Vec<StmtId>,
        orelse: Vec<StmtId>,
    },
    For {
        target: ExprId,
        iter: ExprId,
        body: Vec<StmtId>,
        orelse: Vec<StmtId>,
    },
    With {
        items: Vec<(ExprId, Option<ExprId>)>,
        body: Vec<StmtId>,
    },
    Try {
        body: Vec<StmtId>,
        handlers: Vec<Vec<StmtId>>,
        orelse: Vec<StmtId>,
        finalbody: Vec<StmtId>,
    },
    /// Imports only contribute bindings; the statement itself is inert.
    Import,
    /// Anything else. Operand expressions are preserved for traversal.
    Other {
        exprs: Vec<ExprId>,
    },
    Pass,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub annotation: Option<ExprId>,
}

#[derive(Debug)]
pub struct HirExpr {
    pub span: Span,
    pub scope: ScopeId,
    pub kind: ExprKind,
}

#[derive(Debug)]
pub enum ExprKind {
    Name {
        id: String,
    },
    Attribute {
        value: ExprId,
        attr: String,
    },
    Call {
        func: ExprId,
        args: Vec<ExprId>,
        keywords: Vec<HirKeyword>,
    },
    Literal {
        kind: LiteralKind,
    },
    List {
        elts: Vec<ExprId>,
    },
    Tuple {
        elts: Vec<ExprId>,
    },
    Dict {
        keys: Vec<Option<ExprId>>,
        values: Vec<ExprId>,
    },
    BinOp {
        left: ExprId,
        op: BinOpKind,
        right: ExprId,
    },
    BoolOp {
        values: Vec<ExprId>,
    },
    Subscript {
        value: ExprId,
        index: ExprId,
    },
    /// Unmodeled expression; children remain walkable.
    Opaque {
        children: Vec<ExprId>,
    },
}

#[derive(Debug, Clone)]
pub struct HirKeyword {
    pub arg: Option<String>,
    pub value: ExprId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Int,
    Float,
    Str,
    Bytes,
    Bool,
    None,
    Ellipsis,
}

/// Only the two operators the builder type overloads are distinguished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    BitAnd,
    BitOr,
    Other,
}

/// Lexical scope with bindings in source order.
#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    pub bindings: IndexMap<String, SmallVec<[Binding; 2]>>,
}

impl Scope {
    pub fn new(parent: Option<ScopeId>, kind: ScopeKind) -> Self {
        Self {
            parent,
            kind,
            bindings: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ScopeKind {
    Module,
    Class {
        def: StmtId,
    },
    Function {
        def: StmtId,
        /// Set when the function is defined directly inside a class body.
        method_of: Option<StmtId>,
        first_param: Option<String>,
    },
}

/// One way a name came to be bound in a scope.
#[derive(Debug, Clone)]
pub enum Binding {
    /// `import a.b` binds `a` (or the alias) to a module path.
    Import { path: String },
    /// `from m import n` binds `n` (or the alias) to a qualified name.
    ImportFrom { qname: String },
    Class { def: StmtId },
    Function { def: StmtId },
    Assign { value: ExprId },
    AnnAssign {
        annotation: ExprId,
        value: Option<ExprId>,
    },
    Param {
        index: usize,
        annotation: Option<ExprId>,
    },
}
