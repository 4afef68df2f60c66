//! The translator's own AST — the "opaque AST" that SPEC_FULL.md §6 says the parser
//! collaborator hands to the core. [`crate::frontend`] lowers `ruff_python_ast` into
//! this shape; everything downstream of this module only ever sees these types, never
//! `ruff_python_ast` directly, which keeps the parser swappable.

pub use ruff_text_size::TextRange as Range;

#[derive(Debug, Clone, Default)]
pub struct Module {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub range: Range,
    pub kind: StmtKind,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Assign { targets: Vec<Expr>, value: Expr },
    AugAssign { target: Box<Expr>, op: Operator, value: Box<Expr> },
    AnnAssign { target: Box<Expr>, annotation: Box<Expr>, value: Option<Box<Expr>> },
    If { test: Expr, body: Vec<Stmt>, orelse: Vec<Stmt> },
    While { test: Expr, body: Vec<Stmt>, orelse: Vec<Stmt> },
    For { target: Expr, iter: Expr, body: Vec<Stmt>, orelse: Vec<Stmt> },
    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
    Try(Try),
    With(With),
    Raise { exc: Option<Expr>, cause: Option<Expr> },
    Return(Option<Expr>),
    Import(Vec<Alias>),
    ImportFrom { module: Option<String>, names: Vec<Alias>, level: u32 },
    Global(Vec<String>),
    Del(Vec<Expr>),
    Assert { test: Expr, msg: Option<Expr> },
    ExprStmt(Expr),
    Break,
    Continue,
    Pass,
}

#[derive(Debug, Clone)]
pub struct Alias {
    pub name: String,
    pub asname: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub annotation: Option<Expr>,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub returns: Option<Expr>,
    pub body: Vec<Stmt>,
    pub is_async: bool,
    pub decorators: Vec<Expr>,
}

#[derive(Debug, Clone, Default)]
pub struct ClassDef {
    pub name: String,
    pub bases: Vec<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct ExceptHandler {
    pub exc_type: Option<Expr>,
    pub name: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Try {
    pub body: Vec<Stmt>,
    pub handlers: Vec<ExceptHandler>,
    pub orelse: Vec<Stmt>,
    pub finalbody: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct WithItem {
    pub context_expr: Expr,
    pub optional_vars: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct With {
    pub items: Vec<WithItem>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub range: Range,
    pub kind: Box<ExprKind>,
}

#[derive(Debug, Clone)]
pub struct Keyword {
    pub arg: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub struct Comprehension {
    pub target: Expr,
    pub iter: Expr,
    pub ifs: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
    MatMult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    USub,
    UAdd,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Name(String),
    Constant(Literal),
    Call { func: Expr, args: Vec<Expr>, keywords: Vec<Keyword> },
    Attribute { value: Expr, attr: String },
    Subscript { value: Expr, index: Expr },
    Slice { lower: Option<Expr>, upper: Option<Expr>, step: Option<Expr> },
    BinOp { left: Expr, op: Operator, right: Expr },
    UnaryOp { op: UnaryOperator, operand: Expr },
    Compare { left: Expr, ops: Vec<CmpOp>, comparators: Vec<Expr> },
    BoolOp { op: BoolOperator, values: Vec<Expr> },
    IfExpr { test: Expr, body: Expr, orelse: Expr },
    Lambda { params: Vec<String>, body: Expr },
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Set(Vec<Expr>),
    /// `None` key marks a `**expr` unpack entry.
    Dict(Vec<(Option<Expr>, Expr)>),
    ListComp { element: Expr, generators: Vec<Comprehension> },
    DictComp { key: Expr, value: Expr, generators: Vec<Comprehension> },
    SetComp { element: Expr, generators: Vec<Comprehension> },
    GeneratorExp { element: Expr, generators: Vec<Comprehension> },
    NamedExpr { target: String, value: Expr },
    Starred(Expr),
    Await(Expr),
    Ellipsis,
}

impl Expr {
    pub fn new(range: Range, kind: ExprKind) -> Self {
        Self { range, kind: Box::new(kind) }
    }
}

impl Stmt {
    pub fn new(range: Range, kind: StmtKind) -> Self {
        Self { range, kind }
    }
}
