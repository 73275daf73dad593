//=====================================================
// File: ast.rs
//=====================================================
// Author: Vesper Contributors
// License: MIT License
// Goal: VesperScript abstract syntax tree definitions
// Objective: Define the statement and expression node families produced by the
//            parser and consumed by the resolver and interpreter
//=====================================================

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::source::Position;
use crate::symbol::Symbol;

pub type NodeId = u32;

static NODE_COUNTER: AtomicU32 = AtomicU32::new(1);

pub fn next_node_id() -> NodeId {
    NODE_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A declared type, attached to variables, properties, and parameters.
/// `Dynamic` means "no annotation": every value conforms.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TypeHint {
    #[default]
    Dynamic,
    Bool,
    Int,
    Int64,
    Float,
    Float64,
    Str,
    Array,
    Named(Symbol),
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeHint::Dynamic => f.write_str("dynamic"),
            TypeHint::Bool => f.write_str("bool"),
            TypeHint::Int => f.write_str("int"),
            TypeHint::Int64 => f.write_str("int64"),
            TypeHint::Float => f.write_str("float"),
            TypeHint::Float64 => f.write_str("float64"),
            TypeHint::Str => f.write_str("string"),
            TypeHint::Array => f.write_str("array"),
            TypeHint::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnaryOp {
    Minus,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i32),
    Int64(i64),
    Float(f64),
    Str(String),
    Array(Vec<Expr>),
}

/// Expressions. Every variant carries the position it started at.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal {
        value: Literal,
        position: Position,
    },
    Grouping {
        inner: Box<Expr>,
        position: Position,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
        position: Position,
    },
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        position: Position,
    },
    Logical {
        left: Box<Expr>,
        operator: LogicalOp,
        right: Box<Expr>,
        position: Position,
    },
    Identifier {
        name: Symbol,
        position: Position,
        node_id: NodeId,
    },
    Assign {
        name: Symbol,
        value: Box<Expr>,
        position: Position,
        node_id: NodeId,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        position: Position,
    },
    /// A declared function parameter; `hint` is a `TypeHint` node when
    /// the parameter carries an annotation.
    Parameter {
        name: Symbol,
        hint: Option<Box<Expr>>,
        position: Position,
        node_id: NodeId,
    },
    TypeHint {
        hint: TypeHint,
        position: Position,
    },
    PropertyGet {
        object: Box<Expr>,
        name: Symbol,
        position: Position,
    },
    PropertySet {
        object: Box<Expr>,
        name: Symbol,
        value: Box<Expr>,
        position: Position,
    },
    This {
        position: Position,
        node_id: NodeId,
    },
    /// `value is type`
    TypeCheck {
        value: Box<Expr>,
        target: TypeHint,
        position: Position,
    },
    /// `value as type`
    TypeCast {
        value: Box<Expr>,
        target: TypeHint,
        position: Position,
    },
    Await {
        operand: Box<Expr>,
        position: Position,
    },
    IndexGet {
        object: Box<Expr>,
        index: Box<Expr>,
        position: Position,
    },
    IndexSet {
        object: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
        position: Position,
    },
    /// `value implements Interface`
    Implements {
        object: Box<Expr>,
        interface: Symbol,
        position: Position,
    },
    /// `new Class(args)` in expression position.
    New {
        class: Symbol,
        args: Vec<Expr>,
        position: Position,
        node_id: NodeId,
    },
}

impl Expr {
    pub fn position(&self) -> &Position {
        match self {
            Expr::Literal { position, .. }
            | Expr::Grouping { position, .. }
            | Expr::Unary { position, .. }
            | Expr::Binary { position, .. }
            | Expr::Logical { position, .. }
            | Expr::Identifier { position, .. }
            | Expr::Assign { position, .. }
            | Expr::Call { position, .. }
            | Expr::Parameter { position, .. }
            | Expr::TypeHint { position, .. }
            | Expr::PropertyGet { position, .. }
            | Expr::PropertySet { position, .. }
            | Expr::This { position, .. }
            | Expr::TypeCheck { position, .. }
            | Expr::TypeCast { position, .. }
            | Expr::Await { position, .. }
            | Expr::IndexGet { position, .. }
            | Expr::IndexSet { position, .. }
            | Expr::Implements { position, .. }
            | Expr::New { position, .. } => position,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub name: Symbol,
    pub hint: TypeHint,
    pub initializer: Option<Expr>,
    pub mutable: bool,
    pub position: Position,
    pub node_id: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Symbol,
    /// `Expr::Parameter` nodes.
    pub params: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub is_async: bool,
    pub position: Position,
    pub node_id: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub name: Symbol,
    pub hint: TypeHint,
    pub initializer: Option<Expr>,
    pub mutable: bool,
    pub position: Position,
    pub node_id: NodeId,
}

/// A method signature without a body: interface members and class
/// abstract-method declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSignature {
    pub name: Symbol,
    pub params: Vec<Expr>,
    pub is_async: bool,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Symbol,
    pub interfaces: Vec<Symbol>,
    /// PropertyDecl / MethodDecl / AbstractMethodDecl statements.
    pub members: Vec<Stmt>,
    pub position: Position,
    pub node_id: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    pub name: Symbol,
    pub methods: Vec<MethodSignature>,
    pub position: Position,
    pub node_id: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub path: String,
    pub alias: Option<Symbol>,
    pub position: Position,
    pub node_id: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FromImportDecl {
    pub path: String,
    pub names: Vec<(Symbol, NodeId)>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub variable: Symbol,
    pub body: Box<Stmt>,
    pub position: Position,
    pub node_id: NodeId,
}

/// Statements.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl {
        decl: VariableDecl,
    },
    Block {
        statements: Vec<Stmt>,
        position: Position,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        position: Position,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
        position: Position,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
        position: Position,
    },
    ForIn {
        variable: Symbol,
        iterable: Expr,
        body: Box<Stmt>,
        position: Position,
        node_id: NodeId,
    },
    Expression {
        expr: Expr,
        position: Position,
    },
    Print {
        expr: Expr,
        position: Position,
    },
    FuncDecl {
        decl: FunctionDecl,
    },
    Return {
        value: Option<Expr>,
        position: Position,
    },
    ClassDecl {
        decl: ClassDecl,
    },
    PropertyDecl {
        decl: PropertyDecl,
    },
    MethodDecl {
        decl: FunctionDecl,
    },
    AbstractMethodDecl {
        decl: MethodSignature,
    },
    /// `new name = Class(args)`: declare-and-instantiate.
    Instantiate {
        name: Symbol,
        class: Symbol,
        args: Vec<Expr>,
        position: Position,
        name_node_id: NodeId,
        class_node_id: NodeId,
    },
    Import {
        decl: ImportDecl,
    },
    FromImport {
        decl: FromImportDecl,
    },
    Package {
        name: Symbol,
        position: Position,
    },
    Throw {
        expr: Expr,
        position: Position,
    },
    InterfaceDecl {
        decl: InterfaceDecl,
    },
    Try {
        body: Box<Stmt>,
        catch: Option<CatchClause>,
        finally: Option<Box<Stmt>>,
        position: Position,
    },
    Break {
        position: Position,
    },
    Continue {
        position: Position,
    },
}

impl Stmt {
    pub fn position(&self) -> &Position {
        match self {
            Stmt::VarDecl { decl } => &decl.position,
            Stmt::Block { position, .. } => position,
            Stmt::If { position, .. } => position,
            Stmt::While { position, .. } => position,
            Stmt::For { position, .. } => position,
            Stmt::ForIn { position, .. } => position,
            Stmt::Expression { position, .. } => position,
            Stmt::Print { position, .. } => position,
            Stmt::FuncDecl { decl } => &decl.position,
            Stmt::Return { position, .. } => position,
            Stmt::ClassDecl { decl } => &decl.position,
            Stmt::PropertyDecl { decl } => &decl.position,
            Stmt::MethodDecl { decl } => &decl.position,
            Stmt::AbstractMethodDecl { decl } => &decl.position,
            Stmt::Instantiate { position, .. } => position,
            Stmt::Import { decl } => &decl.position,
            Stmt::FromImport { decl } => &decl.position,
            Stmt::Package { position, .. } => position,
            Stmt::Throw { position, .. } => position,
            Stmt::InterfaceDecl { decl } => &decl.position,
            Stmt::Try { position, .. } => position,
            Stmt::Break { position } => position,
            Stmt::Continue { position } => position,
        }
    }
}

/// A parsed compilation unit: the ordered top-level statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
    pub position: Position,
}

impl Program {
    pub fn new(statements: Vec<Stmt>, position: Position) -> Self {
        Self {
            statements,
            position,
        }
    }
}

//=====================================================
// End of file
//=====================================================
