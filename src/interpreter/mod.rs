//=====================================================
// File: interpreter.rs
//=====================================================
// Author: Vesper Contributors
// License: MIT License
// Goal: VesperScript tree-walking evaluator
// Objective: Execute resolved programs against the runtime value model,
//            the environment chain, and the cooperative async runtime
//=====================================================

pub mod environment;
pub mod errors;
pub mod value;

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use log::debug;

use crate::ast::{
    ClassDecl, Expr, FunctionDecl, Literal, LogicalOp, Program, Stmt, TypeHint, UnaryOp,
};
use crate::ast::BinaryOp;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::modules::{Module, ModuleError, ModuleLoad, ModuleRegistry};
use crate::parser::Parser;
use crate::resolver::{self, Resolutions, VarRef};
use crate::runtime::{EventLoop, Promise, Settlement};
use crate::source::{Position, SourceText};
use crate::symbol::{intern, Symbol};
use crate::tokenizer::Lexer;

use environment::{Environment, Variable};
pub use errors::{ErrorCode, RuntimeError, ScriptError};
use value::{
    as_float64, as_int64, values_equal, BoundMethod, ClassValue, Field, Function, ParamSpec,
    PropertySpec,
};
pub use value::{TypeTag, Value};

/// Statement-level control outcome: fall-through, or one of the
/// non-local signals that unwind enclosing statements.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// A script-level thrown value in flight. Runtime faults and `throw`
/// both travel here; only implementation bugs may panic.
#[derive(Debug)]
pub struct Exception {
    pub value: Value,
    pub position: Option<Position>,
    pub code: ErrorCode,
}

impl Exception {
    pub fn thrown(value: Value, position: &Position) -> Self {
        Self {
            value,
            position: Some(position.clone()),
            code: ErrorCode::RuntimePanic,
        }
    }

    pub fn runtime(error: RuntimeError, position: &Position) -> Self {
        Self {
            value: Value::string(error.to_string()),
            position: Some(position.clone()),
            code: errors::runtime_error_code(&error),
        }
    }
}

type ExprResult = Result<Value, Exception>;
type StmtResult = Result<Flow, Exception>;

/// An interface's required method names, registered per unit.
#[derive(Debug)]
pub struct InterfaceDef {
    pub name: Symbol,
    pub methods: Vec<Symbol>,
}

const BUILTIN_TYPE_NAMES: [&str; 8] = [
    "void", "bool", "int", "int64", "float", "float64", "string", "array",
];

/// Per-compilation-unit state: the global scope, the resolver's side
/// table, declared interfaces, and the package name. Functions and
/// classes carry their defining unit so cross-module calls see the
/// right globals.
pub struct Unit {
    pub globals: RefCell<HashMap<Symbol, Variable>>,
    pub resolutions: Resolutions,
    pub interfaces: RefCell<HashMap<Symbol, Rc<InterfaceDef>>>,
    pub package: RefCell<Option<Symbol>>,
}

impl Unit {
    fn new(resolutions: Resolutions) -> Self {
        let mut globals = HashMap::new();
        for (name, tag) in [
            ("void", TypeTag::Void),
            ("bool", TypeTag::Bool),
            ("int", TypeTag::Int),
            ("int64", TypeTag::Int64),
            ("float", TypeTag::Float),
            ("float64", TypeTag::Float64),
            ("string", TypeTag::Str),
            ("array", TypeTag::Array),
        ] {
            let name = intern(name);
            globals.insert(
                name.clone(),
                Variable {
                    name,
                    hint: TypeHint::Dynamic,
                    value: Value::Type(tag),
                    mutable: false,
                },
            );
        }
        Self {
            globals: RefCell::new(globals),
            resolutions,
            interfaces: RefCell::new(HashMap::new()),
            package: RefCell::new(None),
        }
    }

    /// Every top-level declaration is exported; the builtin type
    /// bindings are not.
    fn exports(&self) -> HashMap<Symbol, Value> {
        self.globals
            .borrow()
            .iter()
            .filter(|(name, _)| !BUILTIN_TYPE_NAMES.contains(&name.as_str()))
            .map(|(name, variable)| (name.clone(), variable.value.clone()))
            .collect()
    }
}

pub struct Interpreter {
    unit: Rc<Unit>,
    environment: Option<Rc<RefCell<Environment>>>,
    event_loop: Rc<EventLoop>,
    registry: ModuleRegistry,
    out: Rc<RefCell<dyn Write>>,
}

impl Interpreter {
    pub fn new(registry: ModuleRegistry) -> Self {
        Self::with_output(registry, Rc::new(RefCell::new(std::io::stdout())))
    }

    pub fn with_output(registry: ModuleRegistry, out: Rc<RefCell<dyn Write>>) -> Self {
        Self {
            unit: Rc::new(Unit::new(Resolutions::default())),
            environment: None,
            event_loop: EventLoop::new(),
            registry,
            out,
        }
    }

    pub fn event_loop(&self) -> Rc<EventLoop> {
        self.event_loop.clone()
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Run the whole pipeline over one source unit. Execution never
    /// proceeds past a phase that reported errors.
    pub fn run_source(
        &mut self,
        source: &SourceText,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), ScriptError> {
        let tokens = Lexer::new(source, diagnostics).tokenize();
        if diagnostics.has_kind(DiagnosticKind::Lexical) {
            return Err(ScriptError::new(
                ErrorCode::Syntax,
                "lexical errors in source",
            ));
        }
        let mut parser = Parser::new(tokens);
        let program = parser.parse();
        if !parser.errors().is_empty() {
            parser.report_errors(diagnostics);
            return Err(ScriptError::new(
                ErrorCode::Syntax,
                "syntax errors in source",
            ));
        }
        let resolutions = resolver::resolve(&program, diagnostics);
        if diagnostics.has_kind(DiagnosticKind::Resolution) {
            return Err(ScriptError::new(
                ErrorCode::Resolution,
                "resolution errors in source",
            ));
        }
        self.interpret(&program, resolutions, diagnostics)
    }

    /// Evaluate a resolved program. Uncaught exceptions terminate the
    /// unit, are reported to the sink, and surface as a `ScriptError`;
    /// the process keeps running.
    pub fn interpret(
        &mut self,
        program: &Program,
        resolutions: Resolutions,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), ScriptError> {
        self.unit = Rc::new(Unit::new(resolutions));
        self.environment = None;
        for stmt in &program.statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => {}
                Ok(_) => {
                    // The resolver rejects top-level return/break.
                    debug!("non-normal flow escaped to top level");
                }
                Err(exception) => {
                    let message = format!("uncaught exception: {}", exception.value);
                    diagnostics.report(
                        DiagnosticKind::Runtime,
                        message.clone(),
                        exception.position.clone(),
                    );
                    return Err(ScriptError::new(exception.code, message));
                }
            }
        }
        self.event_loop.drain();
        Ok(())
    }

    //=====================================================
    //            Section 1: Statements
    //=====================================================

    fn execute(&mut self, stmt: &Stmt) -> StmtResult {
        match stmt {
            Stmt::VarDecl { decl } => {
                let value = match &decl.initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Value::Null,
                };
                let value =
                    self.check_assignable(&decl.hint, value, &decl.name, &decl.position)?;
                self.define_variable(
                    decl.name.clone(),
                    decl.hint.clone(),
                    value,
                    decl.mutable,
                );
                Ok(Flow::Normal)
            }
            Stmt::Block { statements, .. } => {
                let env = Environment::new(self.environment.clone());
                self.execute_block(statements, env)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While {
                condition, body, ..
            } => {
                loop {
                    if !self.evaluate(condition)?.is_truthy() {
                        break;
                    }
                    match self.execute(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For {
                init,
                condition,
                step,
                body,
                ..
            } => {
                let env = Environment::new(self.environment.clone());
                let saved = std::mem::replace(&mut self.environment, Some(env));
                let result = self.run_for_loop(init, condition, step, body);
                self.environment = saved;
                result
            }
            Stmt::ForIn {
                variable,
                iterable,
                body,
                position,
                ..
            } => {
                let iterable = self.evaluate(iterable)?;
                let elements: Vec<Value> = match &iterable {
                    Value::Array(items) => items.borrow().clone(),
                    Value::Str(text) => text
                        .chars()
                        .map(|c| Value::string(c.to_string()))
                        .collect(),
                    other => {
                        return Err(Exception::runtime(
                            RuntimeError::TypeMismatch(format!(
                                "cannot iterate over {}",
                                other.type_tag()
                            )),
                            position,
                        ))
                    }
                };
                // Fresh binding per iteration, so closures made in the
                // body capture that iteration's value.
                for element in elements {
                    let env = Environment::new(self.environment.clone());
                    env.borrow_mut().define(Variable {
                        name: variable.clone(),
                        hint: TypeHint::Dynamic,
                        value: element,
                        mutable: true,
                    });
                    match self.execute_in(body, env)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Expression { expr, .. } => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Print { expr, position } => {
                let value = self.evaluate(expr)?;
                writeln!(self.out.borrow_mut(), "{value}").map_err(|error| {
                    Exception::runtime(
                        RuntimeError::TypeMismatch(format!("print failed: {error}")),
                        position,
                    )
                })?;
                Ok(Flow::Normal)
            }
            Stmt::FuncDecl { decl } => {
                let function = self.make_function(decl, false);
                self.define_variable(
                    decl.name.clone(),
                    TypeHint::Dynamic,
                    Value::Function(function),
                    false,
                );
                Ok(Flow::Normal)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Void,
                };
                Ok(Flow::Return(value))
            }
            Stmt::ClassDecl { decl } => {
                let class = self.make_class(decl)?;
                self.define_variable(
                    decl.name.clone(),
                    TypeHint::Dynamic,
                    Value::Class(class),
                    false,
                );
                Ok(Flow::Normal)
            }
            Stmt::PropertyDecl { decl } => Err(Exception::runtime(
                RuntimeError::TypeMismatch(
                    "property declarations are only allowed in class bodies".to_string(),
                ),
                &decl.position,
            )),
            Stmt::MethodDecl { decl } => Err(Exception::runtime(
                RuntimeError::TypeMismatch(
                    "method declarations are only allowed in class bodies".to_string(),
                ),
                &decl.position,
            )),
            Stmt::AbstractMethodDecl { decl } => Err(Exception::runtime(
                RuntimeError::TypeMismatch(
                    "abstract methods are only allowed in class bodies".to_string(),
                ),
                &decl.position,
            )),
            Stmt::Instantiate {
                name,
                class,
                args,
                position,
                class_node_id,
                ..
            } => {
                let class_value = self.lookup_name(class, *class_node_id, position)?;
                let class_rc = match &class_value {
                    Value::Class(class_rc) => class_rc.clone(),
                    other => {
                        return Err(Exception::runtime(
                            RuntimeError::TypeMismatch(format!(
                                "'new' expects a class, found {}",
                                other.type_tag()
                            )),
                            position,
                        ))
                    }
                };
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.evaluate(arg)?);
                }
                let instance = self.instantiate(&class_rc, arg_values, position)?;
                self.define_variable(
                    name.clone(),
                    TypeHint::Named(class_rc.name.clone()),
                    instance,
                    true,
                );
                Ok(Flow::Normal)
            }
            Stmt::Import { decl } => {
                let module = self.load_module(&decl.path, &decl.position)?;
                let binding = match &decl.alias {
                    Some(alias) => alias.clone(),
                    None => {
                        let canonical = &module.canonical;
                        let stem = canonical.rsplit('/').next().unwrap_or(canonical);
                        intern(stem)
                    }
                };
                self.unit.globals.borrow_mut().insert(
                    binding.clone(),
                    Variable {
                        name: binding,
                        hint: TypeHint::Dynamic,
                        value: Value::Module(module),
                        mutable: false,
                    },
                );
                Ok(Flow::Normal)
            }
            Stmt::FromImport { decl } => {
                let module = self.load_module(&decl.path, &decl.position)?;
                for (name, _) in &decl.names {
                    let Some(value) = module.export(name) else {
                        return Err(Exception::runtime(
                            RuntimeError::Module(format!(
                                "module '{}' has no export named '{}'",
                                module.canonical, name
                            )),
                            &decl.position,
                        ));
                    };
                    self.unit.globals.borrow_mut().insert(
                        name.clone(),
                        Variable {
                            name: name.clone(),
                            hint: TypeHint::Dynamic,
                            value,
                            mutable: false,
                        },
                    );
                }
                Ok(Flow::Normal)
            }
            Stmt::Package { name, .. } => {
                *self.unit.package.borrow_mut() = Some(name.clone());
                Ok(Flow::Normal)
            }
            Stmt::Throw { expr, position } => {
                let value = self.evaluate(expr)?;
                Err(Exception::thrown(value, position))
            }
            Stmt::InterfaceDecl { decl } => {
                let methods = decl.methods.iter().map(|m| m.name.clone()).collect();
                self.unit.interfaces.borrow_mut().insert(
                    decl.name.clone(),
                    Rc::new(InterfaceDef {
                        name: decl.name.clone(),
                        methods,
                    }),
                );
                Ok(Flow::Normal)
            }
            Stmt::Try {
                body,
                catch,
                finally,
                ..
            } => {
                let mut outcome = self.execute(body);
                if let Err(exception) = outcome {
                    if let Some(catch) = catch {
                        let env = Environment::new(self.environment.clone());
                        env.borrow_mut().define(Variable {
                            name: catch.variable.clone(),
                            hint: TypeHint::Dynamic,
                            value: exception.value.clone(),
                            mutable: true,
                        });
                        outcome = self.execute_in(&catch.body, env);
                    } else {
                        outcome = Err(exception);
                    }
                }
                if let Some(finally) = finally {
                    // Finally always runs; its own non-normal outcome
                    // replaces whatever was in flight.
                    match self.execute(finally) {
                        Ok(Flow::Normal) => {}
                        Ok(flow) => outcome = Ok(flow),
                        Err(exception) => outcome = Err(exception),
                    }
                }
                outcome
            }
            Stmt::Break { .. } => Ok(Flow::Break),
            Stmt::Continue { .. } => Ok(Flow::Continue),
        }
    }

    fn run_for_loop(
        &mut self,
        init: &Option<Box<Stmt>>,
        condition: &Option<Expr>,
        step: &Option<Expr>,
        body: &Stmt,
    ) -> StmtResult {
        if let Some(init) = init {
            match self.execute(init)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        loop {
            if let Some(condition) = condition {
                if !self.evaluate(condition)?.is_truthy() {
                    break;
                }
            }
            match self.execute(body)? {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
            }
            if let Some(step) = step {
                self.evaluate(step)?;
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_block(
        &mut self,
        statements: &[Stmt],
        env: Rc<RefCell<Environment>>,
    ) -> StmtResult {
        let saved = std::mem::replace(&mut self.environment, Some(env));
        let mut result = Ok(Flow::Normal);
        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => continue,
                other => {
                    result = other;
                    break;
                }
            }
        }
        self.environment = saved;
        result
    }

    /// Execute one statement with `env` installed as the current frame.
    fn execute_in(&mut self, stmt: &Stmt, env: Rc<RefCell<Environment>>) -> StmtResult {
        let saved = std::mem::replace(&mut self.environment, Some(env));
        let result = self.execute(stmt);
        self.environment = saved;
        result
    }

    //=====================================================
    //            Section 2: Expressions
    //=====================================================

    fn evaluate(&mut self, expr: &Expr) -> ExprResult {
        match expr {
            Expr::Literal { value, .. } => self.evaluate_literal(value),
            Expr::Grouping { inner, .. } => self.evaluate(inner),
            Expr::Unary {
                operator,
                operand,
                position,
            } => {
                let operand = self.evaluate(operand)?;
                match operator {
                    UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
                    UnaryOp::Minus => match operand {
                        Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
                        Value::Int64(n) => Ok(Value::Int64(n.wrapping_neg())),
                        Value::Float(n) => Ok(Value::Float(-n)),
                        Value::Float64(n) => Ok(Value::Float64(-n)),
                        other => Err(Exception::runtime(
                            RuntimeError::TypeMismatch(format!(
                                "cannot negate {}",
                                other.type_tag()
                            )),
                            position,
                        )),
                    },
                }
            }
            Expr::Binary {
                left,
                operator,
                right,
                position,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.evaluate_binary(operator, left, right, position)
            }
            Expr::Logical {
                left,
                operator,
                right,
                ..
            } => {
                let left = self.evaluate(left)?;
                match operator {
                    LogicalOp::And => {
                        if left.is_truthy() {
                            self.evaluate(right)
                        } else {
                            Ok(left)
                        }
                    }
                    LogicalOp::Or => {
                        if left.is_truthy() {
                            Ok(left)
                        } else {
                            self.evaluate(right)
                        }
                    }
                }
            }
            Expr::Identifier {
                name,
                position,
                node_id,
            } => self.lookup_name(name, *node_id, position),
            Expr::Assign {
                name,
                value,
                position,
                node_id,
            } => {
                let value = self.evaluate(value)?;
                self.assign_name(name, *node_id, value.clone(), position)?;
                Ok(value)
            }
            Expr::Call {
                callee,
                args,
                position,
            } => {
                let callee = self.evaluate(callee)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.evaluate(arg)?);
                }
                self.call_value(&callee, arg_values, position)
            }
            Expr::Parameter { .. } | Expr::TypeHint { .. } => {
                unreachable!("declaration-only nodes never reach expression evaluation")
            }
            Expr::PropertyGet {
                object,
                name,
                position,
            } => {
                let object = self.evaluate(object)?;
                self.property_get(&object, name, position)
            }
            Expr::PropertySet {
                object,
                name,
                value,
                position,
            } => {
                let object = self.evaluate(object)?;
                let value = self.evaluate(value)?;
                self.property_set(&object, name, value.clone(), position)?;
                Ok(value)
            }
            Expr::This { position, node_id } => self.lookup_name(&intern("this"), *node_id, position),
            Expr::TypeCheck { value, target, .. } => {
                let value = self.evaluate(value)?;
                Ok(Value::Bool(self.type_matches(&value, target)))
            }
            Expr::TypeCast {
                value,
                target,
                position,
            } => {
                let value = self.evaluate(value)?;
                self.cast_value(value, target, position)
            }
            Expr::Await { operand, position } => {
                let operand = self.evaluate(operand)?;
                let promise = match &operand {
                    Value::Promise(promise) => promise.clone(),
                    other => {
                        return Err(Exception::runtime(
                            RuntimeError::NotAwaitable(other.type_tag().to_string()),
                            position,
                        ))
                    }
                };
                self.await_promise(&promise, position)
            }
            Expr::IndexGet {
                object,
                index,
                position,
            } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                self.index_get(&object, &index, position)
            }
            Expr::IndexSet {
                object,
                index,
                value,
                position,
            } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                let value = self.evaluate(value)?;
                self.index_set(&object, &index, value.clone(), position)?;
                Ok(value)
            }
            Expr::Implements {
                object, interface, ..
            } => {
                let object = self.evaluate(object)?;
                let implements = match &object {
                    Value::Instance(instance) => {
                        instance.class.interfaces.contains(interface)
                    }
                    Value::Class(class) => class.interfaces.contains(interface),
                    _ => false,
                };
                Ok(Value::Bool(implements))
            }
            Expr::New {
                class,
                args,
                position,
                node_id,
            } => {
                let class_value = self.lookup_name(class, *node_id, position)?;
                let class_rc = match &class_value {
                    Value::Class(class_rc) => class_rc.clone(),
                    other => {
                        return Err(Exception::runtime(
                            RuntimeError::TypeMismatch(format!(
                                "'new' expects a class, found {}",
                                other.type_tag()
                            )),
                            position,
                        ))
                    }
                };
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.evaluate(arg)?);
                }
                self.instantiate(&class_rc, arg_values, position)
            }
        }
    }

    fn evaluate_literal(&mut self, literal: &Literal) -> ExprResult {
        Ok(match literal {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(n) => Value::Int(*n),
            Literal::Int64(n) => Value::Int64(*n),
            Literal::Float(n) => Value::Float64(*n),
            Literal::Str(s) => Value::string(s),
            Literal::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element)?);
                }
                Value::array(values)
            }
        })
    }

    fn evaluate_binary(
        &mut self,
        operator: &BinaryOp,
        left: Value,
        right: Value,
        position: &Position,
    ) -> ExprResult {
        use BinaryOp::*;
        match operator {
            Equal => return Ok(Value::Bool(values_equal(&left, &right))),
            NotEqual => return Ok(Value::Bool(!values_equal(&left, &right))),
            _ => {}
        }
        if let (Value::Str(a), Value::Str(b)) = (&left, &right) {
            return match operator {
                Add => Ok(Value::string(format!("{a}{b}"))),
                Less => Ok(Value::Bool(a < b)),
                LessEqual => Ok(Value::Bool(a <= b)),
                Greater => Ok(Value::Bool(a > b)),
                GreaterEqual => Ok(Value::Bool(a >= b)),
                _ => Err(Exception::runtime(
                    RuntimeError::TypeMismatch(format!(
                        "operator '{operator}' is not defined for strings"
                    )),
                    position,
                )),
            };
        }
        if left.is_numeric() && right.is_numeric() {
            return self.numeric_binary(operator, &left, &right, position);
        }
        Err(Exception::runtime(
            RuntimeError::TypeMismatch(format!(
                "operator '{}' is not defined for {} and {}",
                operator,
                left.type_tag(),
                right.type_tag()
            )),
            position,
        ))
    }

    /// Numeric promotion: int < int64 < float < float64. Integer
    /// overflow widens to int64; integer division by zero is an error.
    fn numeric_binary(
        &mut self,
        operator: &BinaryOp,
        left: &Value,
        right: &Value,
        position: &Position,
    ) -> ExprResult {
        use BinaryOp::*;
        let float_side = matches!(left, Value::Float(_) | Value::Float64(_))
            || matches!(right, Value::Float(_) | Value::Float64(_));
        if float_side {
            let a = as_float64(left).expect("numeric");
            let b = as_float64(right).expect("numeric");
            return Ok(match operator {
                Add => Value::Float64(a + b),
                Subtract => Value::Float64(a - b),
                Multiply => Value::Float64(a * b),
                Divide => Value::Float64(a / b),
                Modulo => Value::Float64(a % b),
                Less => Value::Bool(a < b),
                LessEqual => Value::Bool(a <= b),
                Greater => Value::Bool(a > b),
                GreaterEqual => Value::Bool(a >= b),
                Equal | NotEqual => unreachable!("handled before promotion"),
            });
        }
        let a = as_int64(left).expect("numeric");
        let b = as_int64(right).expect("numeric");
        let wide = matches!(left, Value::Int64(_)) || matches!(right, Value::Int64(_));
        let arith = |n: i64| -> Value {
            if !wide {
                if let Ok(narrow) = i32::try_from(n) {
                    return Value::Int(narrow);
                }
            }
            Value::Int64(n)
        };
        match operator {
            Add => Ok(arith(a.wrapping_add(b))),
            Subtract => Ok(arith(a.wrapping_sub(b))),
            Multiply => Ok(arith(a.wrapping_mul(b))),
            Divide | Modulo => {
                if b == 0 {
                    return Err(Exception::runtime(RuntimeError::DivisionByZero, position));
                }
                let n = if matches!(operator, Divide) { a / b } else { a % b };
                Ok(arith(n))
            }
            Less => Ok(Value::Bool(a < b)),
            LessEqual => Ok(Value::Bool(a <= b)),
            Greater => Ok(Value::Bool(a > b)),
            GreaterEqual => Ok(Value::Bool(a >= b)),
            Equal | NotEqual => unreachable!("handled before promotion"),
        }
    }

    //=====================================================
    //            Section 3: Bindings
    //=====================================================

    fn define_variable(
        &mut self,
        name: Symbol,
        hint: TypeHint,
        value: Value,
        mutable: bool,
    ) {
        let variable = Variable {
            name: name.clone(),
            hint,
            value,
            mutable,
        };
        match &self.environment {
            Some(env) => {
                env.borrow_mut().define(variable);
            }
            None => {
                self.unit.globals.borrow_mut().insert(name, variable);
            }
        }
    }

    fn lookup_name(
        &mut self,
        name: &Symbol,
        node_id: u32,
        position: &Position,
    ) -> ExprResult {
        match self.unit.resolutions.lookup(node_id) {
            Some(VarRef::Local { depth, slot }) => {
                let env = self.environment.as_ref().ok_or_else(|| {
                    Exception::runtime(
                        RuntimeError::UndefinedVariable(name.to_string()),
                        position,
                    )
                })?;
                match Environment::get_at(env, depth, slot) {
                    Some(variable) => Ok(variable.value),
                    None => Err(Exception::runtime(
                        RuntimeError::UndefinedVariable(name.to_string()),
                        position,
                    )),
                }
            }
            _ => match self.unit.globals.borrow().get(name) {
                Some(variable) => Ok(variable.value.clone()),
                None => Err(Exception::runtime(
                    RuntimeError::UndefinedVariable(name.to_string()),
                    position,
                )),
            },
        }
    }

    fn assign_name(
        &mut self,
        name: &Symbol,
        node_id: u32,
        value: Value,
        position: &Position,
    ) -> Result<(), Exception> {
        match self.unit.resolutions.lookup(node_id) {
            Some(VarRef::Local { depth, slot }) => {
                let env = self.environment.clone().ok_or_else(|| {
                    Exception::runtime(
                        RuntimeError::UndefinedVariable(name.to_string()),
                        position,
                    )
                })?;
                let Some(variable) = Environment::get_at(&env, depth, slot) else {
                    return Err(Exception::runtime(
                        RuntimeError::UndefinedVariable(name.to_string()),
                        position,
                    ));
                };
                if !variable.mutable {
                    return Err(Exception::runtime(
                        RuntimeError::ImmutableBinding(name.to_string()),
                        position,
                    ));
                }
                let value = self.check_assignable(&variable.hint, value, name, position)?;
                Environment::set_at(&env, depth, slot, value);
                Ok(())
            }
            _ => {
                let mut globals = self.unit.globals.borrow_mut();
                let Some(variable) = globals.get_mut(name) else {
                    return Err(Exception::runtime(
                        RuntimeError::UndefinedVariable(name.to_string()),
                        position,
                    ));
                };
                if !variable.mutable {
                    return Err(Exception::runtime(
                        RuntimeError::ImmutableBinding(name.to_string()),
                        position,
                    ));
                }
                let hint = variable.hint.clone();
                drop(globals);
                let value = self.check_assignable(&hint, value, name, position)?;
                let mut globals = self.unit.globals.borrow_mut();
                if let Some(variable) = globals.get_mut(name) {
                    variable.value = value;
                }
                Ok(())
            }
        }
    }

    /// Declared-type check on every write. Widening numeric
    /// conversions are applied; anything else must match exactly.
    fn check_assignable(
        &self,
        hint: &TypeHint,
        value: Value,
        name: &Symbol,
        position: &Position,
    ) -> ExprResult {
        if !value.conforms_to(hint) {
            return Err(Exception::runtime(
                RuntimeError::TypeMismatch(format!(
                    "cannot assign {} to '{}' declared as {}",
                    value.type_tag(),
                    name,
                    hint
                )),
                position,
            ));
        }
        Ok(widen_to(hint, value))
    }

    //=====================================================
    //            Section 4: Calls, Classes, Instances
    //=====================================================

    fn make_function(&self, decl: &FunctionDecl, is_initializer: bool) -> Rc<Function> {
        let params = decl
            .params
            .iter()
            .filter_map(|param| match param {
                Expr::Parameter { name, hint, .. } => {
                    let hint = match hint.as_deref() {
                        Some(Expr::TypeHint { hint, .. }) => hint.clone(),
                        _ => TypeHint::Dynamic,
                    };
                    Some(ParamSpec {
                        name: name.clone(),
                        hint,
                    })
                }
                _ => None,
            })
            .collect();
        Rc::new(Function {
            name: decl.name.clone(),
            params,
            body: Rc::new(decl.body.clone()),
            closure: self.environment.clone(),
            is_async: decl.is_async,
            is_initializer,
            unit: self.unit.clone(),
        })
    }

    fn make_class(&mut self, decl: &ClassDecl) -> Result<Rc<ClassValue>, Exception> {
        let mut properties = Vec::new();
        let mut methods = HashMap::new();
        let mut abstract_methods = Vec::new();
        for member in &decl.members {
            match member {
                Stmt::PropertyDecl { decl } => properties.push(PropertySpec {
                    name: decl.name.clone(),
                    hint: decl.hint.clone(),
                    initializer: decl.initializer.clone(),
                    mutable: decl.mutable,
                }),
                Stmt::MethodDecl { decl } => {
                    let is_initializer = decl.name.as_str() == "init";
                    let function = self.make_function(decl, is_initializer);
                    methods.insert(decl.name.clone(), function);
                }
                Stmt::AbstractMethodDecl { decl } => {
                    abstract_methods.push(decl.name.clone());
                }
                _ => {}
            }
        }
        // Interfaces are checked when the class is declared, not at
        // first instantiation.
        for interface_name in &decl.interfaces {
            let interface = self
                .unit
                .interfaces
                .borrow()
                .get(interface_name)
                .cloned()
                .ok_or_else(|| {
                    Exception::runtime(
                        RuntimeError::UnknownInterface(interface_name.to_string()),
                        &decl.position,
                    )
                })?;
            for required in &interface.methods {
                if !methods.contains_key(required) && !abstract_methods.contains(required) {
                    return Err(Exception::runtime(
                        RuntimeError::TypeMismatch(format!(
                            "class '{}' does not implement '{}' required by interface '{}'",
                            decl.name, required, interface.name
                        )),
                        &decl.position,
                    ));
                }
            }
        }
        Ok(Rc::new(ClassValue {
            name: decl.name.clone(),
            interfaces: decl.interfaces.clone(),
            properties,
            methods,
            abstract_methods,
            closure: self.environment.clone(),
            unit: self.unit.clone(),
        }))
    }

    fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        position: &Position,
    ) -> ExprResult {
        match callee {
            Value::Function(function) => self.call_function(function, None, args, position),
            Value::BoundMethod(method) => self.call_function(
                &method.function,
                Some(method.receiver.clone()),
                args,
                position,
            ),
            Value::Class(class) => self.instantiate(class, args, position),
            other => Err(Exception::runtime(
                RuntimeError::NotCallable(other.type_tag().to_string()),
                position,
            )),
        }
    }

    fn call_function(
        &mut self,
        function: &Rc<Function>,
        receiver: Option<Rc<value::Instance>>,
        mut args: Vec<Value>,
        position: &Position,
    ) -> ExprResult {
        if args.len() != function.params.len() {
            return Err(Exception::runtime(
                RuntimeError::Arity(format!(
                    "'{}' expects {} arguments, found {}",
                    function.name,
                    function.params.len(),
                    args.len()
                )),
                position,
            ));
        }
        let mut parent = function.closure.clone();
        if let Some(receiver) = &receiver {
            // The bind-time frame holding `this`, mirroring the class
            // scope laid down by the resolver.
            let this_frame = Environment::new(parent);
            this_frame.borrow_mut().define(Variable {
                name: intern("this"),
                hint: TypeHint::Dynamic,
                value: Value::Instance(receiver.clone()),
                mutable: false,
            });
            parent = Some(this_frame);
        }
        let call_env = Environment::new(parent);
        for (spec, arg) in function.params.iter().zip(args.drain(..)) {
            let arg = self.check_assignable(&spec.hint, arg, &spec.name, position)?;
            call_env.borrow_mut().define(Variable {
                name: spec.name.clone(),
                hint: spec.hint.clone(),
                value: arg,
                mutable: true,
            });
        }
        let saved_unit = std::mem::replace(&mut self.unit, function.unit.clone());
        let saved_env = std::mem::replace(&mut self.environment, Some(call_env));
        let mut result = self.run_body(&function.body);
        self.environment = saved_env;
        self.unit = saved_unit;
        // A constructor that falls through evaluates to its receiver.
        if function.is_initializer && !function.is_async && matches!(result, Ok(Value::Void)) {
            if let Some(receiver) = receiver {
                result = Ok(Value::Instance(receiver));
            }
        }
        if function.is_async {
            // An async call always yields a promise; the body's outcome
            // settles it and rejections surface at the await site.
            let promise = Promise::new(self.event_loop.clone());
            match result {
                Ok(value) => promise.resolve(value),
                Err(exception) => promise.reject(exception.value),
            }
            Ok(Value::Promise(promise))
        } else {
            result
        }
    }

    fn run_body(&mut self, body: &[Stmt]) -> ExprResult {
        for stmt in body {
            match self.execute(stmt)? {
                Flow::Normal => {}
                Flow::Return(value) => return Ok(value),
                // The resolver rejects loose break/continue.
                Flow::Break | Flow::Continue => {}
            }
        }
        Ok(Value::Void)
    }

    fn instantiate(
        &mut self,
        class: &Rc<ClassValue>,
        args: Vec<Value>,
        position: &Position,
    ) -> ExprResult {
        if class.is_abstract() {
            return Err(Exception::runtime(
                RuntimeError::AbstractInstantiation(class.name.to_string()),
                position,
            ));
        }
        let instance = Rc::new(value::Instance {
            class: class.clone(),
            fields: RefCell::new(HashMap::new()),
        });
        // Property initializers run with `this` bound, in the class's
        // defining unit.
        let this_frame = Environment::new(class.closure.clone());
        this_frame.borrow_mut().define(Variable {
            name: intern("this"),
            hint: TypeHint::Dynamic,
            value: Value::Instance(instance.clone()),
            mutable: false,
        });
        let saved_unit = std::mem::replace(&mut self.unit, class.unit.clone());
        let saved_env = std::mem::replace(&mut self.environment, Some(this_frame));
        let mut failure = None;
        for spec in &class.properties {
            let value = match &spec.initializer {
                Some(initializer) => match self.evaluate(initializer) {
                    Ok(value) => value,
                    Err(exception) => {
                        failure = Some(exception);
                        break;
                    }
                },
                None => Value::Null,
            };
            let value = match self.check_assignable(&spec.hint, value, &spec.name, position)
            {
                Ok(value) => value,
                Err(exception) => {
                    failure = Some(exception);
                    break;
                }
            };
            instance.fields.borrow_mut().insert(
                spec.name.clone(),
                Field {
                    hint: spec.hint.clone(),
                    mutable: spec.mutable,
                    value,
                },
            );
        }
        self.environment = saved_env;
        self.unit = saved_unit;
        if let Some(exception) = failure {
            return Err(exception);
        }
        // Constructor path.
        if let Some(init) = class.find_method(&intern("init")) {
            self.call_function(&init, Some(instance.clone()), args, position)?;
        } else if !args.is_empty() {
            return Err(Exception::runtime(
                RuntimeError::Arity(format!(
                    "class '{}' has no constructor but was given {} arguments",
                    class.name,
                    args.len()
                )),
                position,
            ));
        }
        Ok(Value::Instance(instance))
    }

    //=====================================================
    //            Section 5: Properties and Indexing
    //=====================================================

    fn property_get(
        &mut self,
        object: &Value,
        name: &Symbol,
        position: &Position,
    ) -> ExprResult {
        match object {
            Value::Instance(instance) => {
                if let Some(field) = instance.fields.borrow().get(name) {
                    return Ok(field.value.clone());
                }
                if let Some(method) = instance.class.find_method(name) {
                    return Ok(Value::BoundMethod(Rc::new(BoundMethod {
                        receiver: instance.clone(),
                        function: method,
                    })));
                }
                Err(Exception::runtime(
                    RuntimeError::UndefinedProperty(format!(
                        "{}.{}",
                        instance.class.name, name
                    )),
                    position,
                ))
            }
            Value::Module(module) => module.export(name).ok_or_else(|| {
                Exception::runtime(
                    RuntimeError::UndefinedProperty(format!(
                        "{}.{}",
                        module.canonical, name
                    )),
                    position,
                )
            }),
            Value::Array(items) => {
                if name.as_str() == "length" {
                    Ok(Value::Int(items.borrow().len() as i32))
                } else {
                    Err(Exception::runtime(
                        RuntimeError::UndefinedProperty(format!("array.{name}")),
                        position,
                    ))
                }
            }
            Value::Str(text) => {
                if name.as_str() == "length" {
                    Ok(Value::Int(text.chars().count() as i32))
                } else {
                    Err(Exception::runtime(
                        RuntimeError::UndefinedProperty(format!("string.{name}")),
                        position,
                    ))
                }
            }
            other => Err(Exception::runtime(
                RuntimeError::TypeMismatch(format!(
                    "{} values have no properties",
                    other.type_tag()
                )),
                position,
            )),
        }
    }

    fn property_set(
        &mut self,
        object: &Value,
        name: &Symbol,
        value: Value,
        position: &Position,
    ) -> Result<(), Exception> {
        match object {
            Value::Instance(instance) => {
                let (hint, mutable) = {
                    let fields = instance.fields.borrow();
                    let Some(field) = fields.get(name) else {
                        return Err(Exception::runtime(
                            RuntimeError::UndefinedProperty(format!(
                                "{}.{}",
                                instance.class.name, name
                            )),
                            position,
                        ));
                    };
                    (field.hint.clone(), field.mutable)
                };
                if !mutable {
                    return Err(Exception::runtime(
                        RuntimeError::ImmutableBinding(format!(
                            "{}.{}",
                            instance.class.name, name
                        )),
                        position,
                    ));
                }
                let value = self.check_assignable(&hint, value, name, position)?;
                if let Some(field) = instance.fields.borrow_mut().get_mut(name) {
                    field.value = value;
                }
                Ok(())
            }
            other => Err(Exception::runtime(
                RuntimeError::TypeMismatch(format!(
                    "cannot set properties on {}",
                    other.type_tag()
                )),
                position,
            )),
        }
    }

    fn index_get(
        &mut self,
        object: &Value,
        index: &Value,
        position: &Position,
    ) -> ExprResult {
        match object {
            Value::Array(items) => {
                let i = self.index_of(index, items.borrow().len(), position)?;
                Ok(items.borrow()[i].clone())
            }
            Value::Str(text) => {
                let chars: Vec<char> = text.chars().collect();
                let i = self.index_of(index, chars.len(), position)?;
                Ok(Value::string(chars[i].to_string()))
            }
            other => Err(Exception::runtime(
                RuntimeError::TypeMismatch(format!(
                    "{} values cannot be indexed",
                    other.type_tag()
                )),
                position,
            )),
        }
    }

    fn index_set(
        &mut self,
        object: &Value,
        index: &Value,
        value: Value,
        position: &Position,
    ) -> Result<(), Exception> {
        match object {
            Value::Array(items) => {
                let i = self.index_of(index, items.borrow().len(), position)?;
                items.borrow_mut()[i] = value;
                Ok(())
            }
            other => Err(Exception::runtime(
                RuntimeError::TypeMismatch(format!(
                    "{} values cannot be index-assigned",
                    other.type_tag()
                )),
                position,
            )),
        }
    }

    fn index_of(
        &self,
        index: &Value,
        len: usize,
        position: &Position,
    ) -> Result<usize, Exception> {
        let Some(i) = as_int64(index) else {
            return Err(Exception::runtime(
                RuntimeError::TypeMismatch(format!(
                    "index must be an integer, found {}",
                    index.type_tag()
                )),
                position,
            ));
        };
        if i < 0 || (i as usize) >= len {
            return Err(Exception::runtime(
                RuntimeError::IndexOutOfRange(format!("{i} (length {len})")),
                position,
            ));
        }
        Ok(i as usize)
    }

    //=====================================================
    //            Section 6: Types, Await, Modules
    //=====================================================

    fn type_matches(&self, value: &Value, target: &TypeHint) -> bool {
        match target {
            TypeHint::Dynamic => true,
            TypeHint::Bool => value.type_tag() == TypeTag::Bool,
            TypeHint::Int => value.type_tag() == TypeTag::Int,
            TypeHint::Int64 => value.type_tag() == TypeTag::Int64,
            TypeHint::Float => value.type_tag() == TypeTag::Float,
            TypeHint::Float64 => value.type_tag() == TypeTag::Float64,
            TypeHint::Str => value.type_tag() == TypeTag::Str,
            TypeHint::Array => value.type_tag() == TypeTag::Array,
            TypeHint::Named(name) => match value {
                Value::Instance(instance) => {
                    instance.class.name == *name
                        || instance.class.interfaces.contains(name)
                }
                Value::Class(class) => class.name == *name,
                _ => false,
            },
        }
    }

    fn cast_value(
        &mut self,
        value: Value,
        target: &TypeHint,
        position: &Position,
    ) -> ExprResult {
        let failure = |value: &Value| {
            Exception::runtime(
                RuntimeError::TypeMismatch(format!(
                    "cannot cast {} to {}",
                    value.type_tag(),
                    target
                )),
                position,
            )
        };
        match target {
            TypeHint::Dynamic => Ok(value),
            TypeHint::Bool => Ok(Value::Bool(value.is_truthy())),
            TypeHint::Str => Ok(Value::string(value.to_string())),
            TypeHint::Int => match &value {
                _ if value.is_numeric() => {
                    let n = as_float64(&value).expect("numeric");
                    Ok(Value::Int(n as i32))
                }
                Value::Str(text) => text
                    .trim()
                    .parse::<i32>()
                    .map(Value::Int)
                    .map_err(|_| failure(&value)),
                _ => Err(failure(&value)),
            },
            TypeHint::Int64 => match &value {
                _ if value.is_numeric() => {
                    let n = as_float64(&value).expect("numeric");
                    Ok(Value::Int64(n as i64))
                }
                Value::Str(text) => text
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int64)
                    .map_err(|_| failure(&value)),
                _ => Err(failure(&value)),
            },
            TypeHint::Float => match &value {
                _ if value.is_numeric() => {
                    Ok(Value::Float(as_float64(&value).expect("numeric") as f32))
                }
                Value::Str(text) => text
                    .trim()
                    .parse::<f32>()
                    .map(Value::Float)
                    .map_err(|_| failure(&value)),
                _ => Err(failure(&value)),
            },
            TypeHint::Float64 => match &value {
                _ if value.is_numeric() => {
                    Ok(Value::Float64(as_float64(&value).expect("numeric")))
                }
                Value::Str(text) => text
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float64)
                    .map_err(|_| failure(&value)),
                _ => Err(failure(&value)),
            },
            TypeHint::Array => match value {
                Value::Array(_) => Ok(value),
                _ => Err(failure(&value)),
            },
            TypeHint::Named(name) => {
                let is_instance_of =
                    matches!(&value, Value::Instance(instance) if instance.class.name == *name);
                if is_instance_of {
                    Ok(value)
                } else {
                    Err(failure(&value))
                }
            }
        }
    }

    /// Suspend at an await: register the resume continuation, then
    /// pump the event loop until it has run. A drained queue with the
    /// promise still pending can never settle on one thread.
    fn await_promise(&mut self, promise: &Promise, position: &Position) -> ExprResult {
        let outcome: Rc<RefCell<Option<Settlement>>> = Rc::new(RefCell::new(None));
        let slot = outcome.clone();
        promise.subscribe(move |settlement| {
            *slot.borrow_mut() = Some(settlement);
        });
        loop {
            let settled = outcome.borrow_mut().take();
            if let Some(settlement) = settled {
                return match settlement {
                    Ok(value) => Ok(value),
                    Err(error) => Err(Exception::thrown(error, position)),
                };
            }
            if !self.event_loop.step() {
                return Err(Exception::runtime(RuntimeError::StalledAwait, position));
            }
        }
    }

    fn load_module(
        &mut self,
        path: &str,
        position: &Position,
    ) -> Result<Rc<Module>, Exception> {
        let load = self.registry.begin(path).map_err(|error| {
            Exception::runtime(RuntimeError::from(error), position)
        })?;
        let (canonical, source) = match load {
            ModuleLoad::Cached(module) => return Ok(module),
            ModuleLoad::Source { canonical, source } => (canonical, source),
        };
        match self.execute_module(&canonical, &source) {
            Ok(module) => Ok(self.registry.finish(module)),
            Err(message) => {
                self.registry.abort(&canonical);
                Err(Exception::runtime(
                    RuntimeError::from(ModuleError::Failed {
                        module: canonical,
                        message,
                    }),
                    position,
                ))
            }
        }
    }

    /// Compile and run a module's top level in a fresh unit; the
    /// resulting globals become its exported bindings.
    fn execute_module(
        &mut self,
        canonical: &str,
        source: &SourceText,
    ) -> Result<Module, String> {
        let mut diagnostics = Diagnostics::new();
        let tokens = Lexer::new(source, &mut diagnostics).tokenize();
        if diagnostics.has_errors() {
            return Err(first_message(&diagnostics));
        }
        let mut parser = Parser::new(tokens);
        let program = parser.parse();
        if !parser.errors().is_empty() {
            parser.report_errors(&mut diagnostics);
            return Err(first_message(&diagnostics));
        }
        let resolutions = resolver::resolve(&program, &mut diagnostics);
        if diagnostics.has_errors() {
            return Err(first_message(&diagnostics));
        }
        let module_unit = Rc::new(Unit::new(resolutions));
        let saved_unit = std::mem::replace(&mut self.unit, module_unit.clone());
        let saved_env = self.environment.take();
        let mut failure = None;
        for stmt in &program.statements {
            match self.execute(stmt) {
                Ok(_) => {}
                Err(exception) => {
                    failure = Some(format!("uncaught exception: {}", exception.value));
                    break;
                }
            }
        }
        self.environment = saved_env;
        self.unit = saved_unit;
        if let Some(message) = failure {
            return Err(message);
        }
        let package = module_unit.package.borrow().clone();
        let exports = module_unit.exports();
        Ok(Module {
            canonical: canonical.to_string(),
            package,
            exports,
        })
    }
}

/// Widening numeric conversion toward a declared type; non-numeric
/// hints return the value unchanged (conformance already checked).
fn widen_to(hint: &TypeHint, value: Value) -> Value {
    match (hint, &value) {
        (TypeHint::Int64, Value::Int(n)) => Value::Int64(i64::from(*n)),
        (TypeHint::Float, Value::Int(n)) => Value::Float(*n as f32),
        (TypeHint::Float, Value::Int64(n)) => Value::Float(*n as f32),
        (TypeHint::Float64, Value::Int(n)) => Value::Float64(f64::from(*n)),
        (TypeHint::Float64, Value::Int64(n)) => Value::Float64(*n as f64),
        (TypeHint::Float64, Value::Float(n)) => Value::Float64(f64::from(*n)),
        _ => value,
    }
}

fn first_message(diagnostics: &Diagnostics) -> String {
    diagnostics
        .entries()
        .first()
        .map(|entry| entry.message.clone())
        .unwrap_or_else(|| "unknown error".to_string())
}

//=====================================================
// End of file
//=====================================================
