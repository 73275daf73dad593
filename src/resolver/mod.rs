//=====================================================
// File: resolver.rs
//=====================================================
// Author: Vesper Contributors
// License: MIT License
// Goal: Static binding resolution for the VesperScript AST
// Objective: Map identifier references to lexical-scope coordinates and catch
//            structural errors before evaluation starts
//=====================================================

use std::collections::{HashMap, HashSet};

use log::trace;

use crate::ast::{CatchClause, ClassDecl, Expr, FunctionDecl, NodeId, Program, Stmt};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::source::Position;
use crate::symbol::{intern, Symbol};

/// Where an identifier reference lands at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarRef {
    Global,
    Local { depth: usize, slot: usize },
}

/// The side table consumed read-only by the interpreter. Complete
/// before evaluation starts; evaluation never triggers resolution.
#[derive(Debug, Default)]
pub struct Resolutions {
    map: HashMap<NodeId, VarRef>,
}

impl Resolutions {
    pub fn lookup(&self, node_id: NodeId) -> Option<VarRef> {
        self.map.get(&node_id).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Run the static pass over a parsed program. All problems are
/// accumulated on the sink; nothing is thrown.
pub fn resolve(program: &Program, diagnostics: &mut Diagnostics) -> Resolutions {
    let mut resolver = Resolver::new(diagnostics);
    resolver.resolve_statements(&program.statements);
    Resolutions {
        map: resolver.map,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
    AsyncFunction,
    Method,
    AsyncMethod,
}

impl FunctionKind {
    fn is_async(self) -> bool {
        matches!(self, FunctionKind::AsyncFunction | FunctionKind::AsyncMethod)
    }

    fn is_some(self) -> bool {
        self != FunctionKind::None
    }
}

struct LocalSlot {
    slot: usize,
    initialized: bool,
}

#[derive(Default)]
struct Scope {
    names: HashMap<Symbol, LocalSlot>,
    /// Names this scope will declare further down its statement list;
    /// referencing one of these is use-before-declaration.
    pending: HashSet<Symbol>,
    next_slot: usize,
}

struct Resolver<'a> {
    scopes: Vec<Scope>,
    function: FunctionKind,
    loop_depth: usize,
    in_class: bool,
    map: HashMap<NodeId, VarRef>,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Resolver<'a> {
    fn new(diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            scopes: Vec::new(),
            function: FunctionKind::None,
            loop_depth: 0,
            in_class: false,
            map: HashMap::new(),
            diagnostics,
        }
    }

    fn error(&mut self, message: impl Into<String>, position: &Position) {
        self.diagnostics.report(
            DiagnosticKind::Resolution,
            message,
            Some(position.clone()),
        );
    }

    fn begin_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Reserve a slot for `name` without marking it usable, so a
    /// reference inside the initializer is caught as use-before-declare.
    fn declare(&mut self, name: &Symbol, position: &Position) {
        if self.scopes.is_empty() {
            return; // top level: globals are late-bound by name
        }
        let duplicate = self
            .scopes
            .last()
            .map(|scope| scope.names.contains_key(name))
            .unwrap_or(false);
        if duplicate {
            self.error(
                format!("'{name}' is already declared in this scope"),
                position,
            );
            return;
        }
        let scope = self.scopes.last_mut().expect("scope checked above");
        scope.pending.remove(name);
        let slot = scope.next_slot;
        scope.next_slot += 1;
        scope.names.insert(
            name.clone(),
            LocalSlot {
                slot,
                initialized: false,
            },
        );
    }

    /// Note which names the current scope's statement list declares,
    /// so earlier references to them are caught statically.
    fn prescan_declarations(&mut self, statements: &[Stmt]) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        for stmt in statements {
            match stmt {
                Stmt::VarDecl { decl } => {
                    scope.pending.insert(decl.name.clone());
                }
                Stmt::FuncDecl { decl } => {
                    scope.pending.insert(decl.name.clone());
                }
                Stmt::ClassDecl { decl } => {
                    scope.pending.insert(decl.name.clone());
                }
                Stmt::Instantiate { name, .. } => {
                    scope.pending.insert(name.clone());
                }
                _ => {}
            }
        }
    }

    fn define(&mut self, name: &Symbol) {
        if let Some(scope) = self.scopes.last_mut() {
            if let Some(entry) = scope.names.get_mut(name) {
                entry.initialized = true;
            }
        }
    }

    fn resolve_name(&mut self, name: &Symbol, node_id: NodeId, position: &Position) {
        let mut found = None;
        for (distance, scope) in self.scopes.iter().rev().enumerate() {
            if let Some(entry) = scope.names.get(name) {
                found = Some((distance, entry.slot, entry.initialized));
                break;
            }
        }
        match found {
            Some((depth, slot, initialized)) => {
                if !initialized && depth == 0 {
                    self.error(
                        format!("'{name}' is used before its declaration completes"),
                        position,
                    );
                }
                trace!("resolved '{name}' at depth {depth} slot {slot}");
                self.map.insert(node_id, VarRef::Local { depth, slot });
            }
            None => {
                let declared_later = self
                    .scopes
                    .last()
                    .map(|scope| scope.pending.contains(name))
                    .unwrap_or(false);
                if declared_later {
                    self.error(
                        format!("'{name}' is used before its declaring statement"),
                        position,
                    );
                }
                self.map.insert(node_id, VarRef::Global);
            }
        }
    }

    fn resolve_statements(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { decl } => {
                self.declare(&decl.name, &decl.position);
                if let Some(initializer) = &decl.initializer {
                    self.resolve_expr(initializer);
                }
                self.define(&decl.name);
            }
            Stmt::Block {
                statements, ..
            } => {
                self.begin_scope();
                self.prescan_declarations(statements);
                self.resolve_statements(statements);
                self.end_scope();
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While {
                condition, body, ..
            } => {
                self.resolve_expr(condition);
                self.loop_depth += 1;
                self.resolve_stmt(body);
                self.loop_depth -= 1;
            }
            Stmt::For {
                init,
                condition,
                step,
                body,
                ..
            } => {
                self.begin_scope();
                if let Some(init) = init {
                    self.resolve_stmt(init);
                }
                if let Some(condition) = condition {
                    self.resolve_expr(condition);
                }
                if let Some(step) = step {
                    self.resolve_expr(step);
                }
                self.loop_depth += 1;
                self.resolve_stmt(body);
                self.loop_depth -= 1;
                self.end_scope();
            }
            Stmt::ForIn {
                variable,
                iterable,
                body,
                position,
                node_id,
            } => {
                self.resolve_expr(iterable);
                self.begin_scope();
                self.declare(variable, position);
                self.define(variable);
                // The loop variable is a reference too; the interpreter
                // rebinds it freshly each iteration.
                self.map.insert(
                    *node_id,
                    VarRef::Local {
                        depth: 0,
                        slot: 0,
                    },
                );
                self.loop_depth += 1;
                self.resolve_stmt(body);
                self.loop_depth -= 1;
                self.end_scope();
            }
            Stmt::Expression { expr, .. } => self.resolve_expr(expr),
            Stmt::Print { expr, .. } => self.resolve_expr(expr),
            Stmt::FuncDecl { decl } => {
                self.declare(&decl.name, &decl.position);
                self.define(&decl.name);
                let kind = if decl.is_async {
                    FunctionKind::AsyncFunction
                } else {
                    FunctionKind::Function
                };
                self.resolve_function(decl, kind);
            }
            Stmt::Return { value, position } => {
                if !self.function.is_some() {
                    self.error("'return' is only allowed inside a function body", position);
                }
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
            Stmt::ClassDecl { decl } => self.resolve_class(decl),
            Stmt::PropertyDecl { decl } => {
                // Reached only through resolve_class; property
                // initializers see `this`.
                if let Some(initializer) = &decl.initializer {
                    self.resolve_expr(initializer);
                }
            }
            Stmt::MethodDecl { decl } => {
                let kind = if decl.is_async {
                    FunctionKind::AsyncMethod
                } else {
                    FunctionKind::Method
                };
                self.resolve_function(decl, kind);
            }
            Stmt::AbstractMethodDecl { .. } => {}
            Stmt::Instantiate {
                name,
                class,
                args,
                position,
                name_node_id,
                class_node_id,
            } => {
                self.resolve_name(class, *class_node_id, position);
                for arg in args {
                    self.resolve_expr(arg);
                }
                self.declare(name, position);
                self.define(name);
                self.resolve_name(name, *name_node_id, position);
            }
            // Imports always bind at the unit's global scope, so the
            // resolver leaves them to late-bound name lookup.
            Stmt::Import { .. } | Stmt::FromImport { .. } => {}
            Stmt::Package { .. } => {}
            Stmt::Throw { expr, .. } => self.resolve_expr(expr),
            Stmt::InterfaceDecl { .. } => {}
            Stmt::Try {
                body,
                catch,
                finally,
                ..
            } => {
                self.resolve_stmt(body);
                if let Some(CatchClause {
                    variable,
                    body,
                    position,
                    ..
                }) = catch
                {
                    self.begin_scope();
                    self.declare(variable, position);
                    self.define(variable);
                    self.resolve_stmt(body);
                    self.end_scope();
                }
                if let Some(finally) = finally {
                    self.resolve_stmt(finally);
                }
            }
            Stmt::Break { position } => {
                if self.loop_depth == 0 {
                    self.error("'break' is only allowed inside a loop", position);
                }
            }
            Stmt::Continue { position } => {
                if self.loop_depth == 0 {
                    self.error("'continue' is only allowed inside a loop", position);
                }
            }
        }
    }

    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionKind) {
        let enclosing_function = self.function;
        let enclosing_loops = self.loop_depth;
        self.function = kind;
        self.loop_depth = 0;
        self.begin_scope();
        for param in &decl.params {
            if let Expr::Parameter {
                name,
                position,
                node_id,
                ..
            } = param
            {
                self.declare(name, position);
                self.define(name);
                let slot = self
                    .scopes
                    .last()
                    .map(|scope| scope.next_slot.saturating_sub(1))
                    .unwrap_or(0);
                self.map.insert(*node_id, VarRef::Local { depth: 0, slot });
            }
        }
        self.prescan_declarations(&decl.body);
        self.resolve_statements(&decl.body);
        self.end_scope();
        self.loop_depth = enclosing_loops;
        self.function = enclosing_function;
    }

    fn resolve_class(&mut self, decl: &ClassDecl) {
        self.declare(&decl.name, &decl.position);
        self.define(&decl.name);
        let was_in_class = self.in_class;
        self.in_class = true;
        // The class scope holds `this` at slot 0; method binding
        // inserts the matching frame at call time.
        self.begin_scope();
        let this = intern("this");
        self.declare(&this, &decl.position);
        self.define(&this);
        for member in &decl.members {
            self.resolve_stmt(member);
        }
        self.end_scope();
        self.in_class = was_in_class;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal { value, .. } => {
                if let crate::ast::Literal::Array(elements) = value {
                    for element in elements {
                        self.resolve_expr(element);
                    }
                }
            }
            Expr::Grouping { inner, .. } => self.resolve_expr(inner),
            Expr::Unary { operand, .. } => self.resolve_expr(operand),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Identifier {
                name,
                position,
                node_id,
            } => self.resolve_name(name, *node_id, position),
            Expr::Assign {
                name,
                value,
                position,
                node_id,
            } => {
                self.resolve_expr(value);
                self.resolve_name(name, *node_id, position);
            }
            Expr::Call { callee, args, .. } => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            Expr::Parameter { .. } | Expr::TypeHint { .. } => {}
            Expr::PropertyGet { object, .. } => self.resolve_expr(object),
            Expr::PropertySet { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }
            Expr::This { position, node_id } => {
                if !self.in_class {
                    self.error("'this' is only allowed inside a class body", position);
                    self.map.insert(*node_id, VarRef::Global);
                } else {
                    let this = intern("this");
                    self.resolve_name(&this, *node_id, position);
                }
            }
            Expr::TypeCheck { value, .. } | Expr::TypeCast { value, .. } => {
                self.resolve_expr(value)
            }
            Expr::Await { operand, position } => {
                // The top level drives the event loop itself; only a
                // non-async function body is a misplaced await.
                if self.function.is_some() && !self.function.is_async() {
                    self.error(
                        "'await' is only allowed inside an async function",
                        position,
                    );
                }
                self.resolve_expr(operand);
            }
            Expr::IndexGet { object, index, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(index);
            }
            Expr::IndexSet {
                object,
                index,
                value,
                ..
            } => {
                self.resolve_expr(object);
                self.resolve_expr(index);
                self.resolve_expr(value);
            }
            Expr::Implements { object, .. } => self.resolve_expr(object),
            Expr::New {
                class,
                args,
                position,
                node_id,
            } => {
                self.resolve_name(class, *node_id, position);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
        }
    }
}

//=====================================================
// End of file
//=====================================================
