//! The runtime value model: a tagged union over primitive and
//! reference kinds. Values are immutable carriers; only the slot
//! holding one (a variable, array element, or instance field) mutates.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::{Expr, Stmt, TypeHint};
use crate::interpreter::environment::Environment;
use crate::interpreter::Unit;
use crate::modules::Module;
use crate::runtime::Promise;
use crate::symbol::Symbol;

/// The runtime type of a value, the first leg of the uniform
/// evaluation contract (type, value, truthiness, callability).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Void,
    Null,
    Bool,
    Int,
    Int64,
    Float,
    Float64,
    Str,
    Array,
    Function,
    BoundMethod,
    Class,
    Instance,
    Type,
    Promise,
    Module,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TypeTag::Void => "void",
            TypeTag::Null => "null",
            TypeTag::Bool => "bool",
            TypeTag::Int => "int",
            TypeTag::Int64 => "int64",
            TypeTag::Float => "float",
            TypeTag::Float64 => "float64",
            TypeTag::Str => "string",
            TypeTag::Array => "array",
            TypeTag::Function => "function",
            TypeTag::BoundMethod => "bound method",
            TypeTag::Class => "class",
            TypeTag::Instance => "instance",
            TypeTag::Type => "type",
            TypeTag::Promise => "promise",
            TypeTag::Module => "module",
        };
        f.write_str(text)
    }
}

#[derive(Clone)]
pub enum Value {
    Void,
    Null,
    Bool(bool),
    Int(i32),
    Int64(i64),
    Float(f32),
    Float64(f64),
    Str(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Function(Rc<Function>),
    BoundMethod(Rc<BoundMethod>),
    Class(Rc<ClassValue>),
    Instance(Rc<Instance>),
    Type(TypeTag),
    Promise(Promise),
    Module(Rc<Module>),
}

impl Value {
    pub fn string(text: impl AsRef<str>) -> Value {
        Value::Str(Rc::from(text.as_ref()))
    }

    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Void => TypeTag::Void,
            Value::Null => TypeTag::Null,
            Value::Bool(_) => TypeTag::Bool,
            Value::Int(_) => TypeTag::Int,
            Value::Int64(_) => TypeTag::Int64,
            Value::Float(_) => TypeTag::Float,
            Value::Float64(_) => TypeTag::Float64,
            Value::Str(_) => TypeTag::Str,
            Value::Array(_) => TypeTag::Array,
            Value::Function(_) => TypeTag::Function,
            Value::BoundMethod(_) => TypeTag::BoundMethod,
            Value::Class(_) => TypeTag::Class,
            Value::Instance(_) => TypeTag::Instance,
            Value::Type(_) => TypeTag::Type,
            Value::Promise(_) => TypeTag::Promise,
            Value::Module(_) => TypeTag::Module,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Void | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Int64(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Float64(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Function(_) | Value::BoundMethod(_) | Value::Class(_)
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Int(_) | Value::Int64(_) | Value::Float(_) | Value::Float64(_)
        )
    }

    /// Whether a value may be written into a slot declared with `hint`.
    /// Numeric widening is allowed; `null` conforms to every declared
    /// type; `Dynamic` accepts anything.
    pub fn conforms_to(&self, hint: &TypeHint) -> bool {
        match hint {
            TypeHint::Dynamic => true,
            _ if matches!(self, Value::Null) => true,
            TypeHint::Bool => matches!(self, Value::Bool(_)),
            TypeHint::Int => matches!(self, Value::Int(_)),
            TypeHint::Int64 => matches!(self, Value::Int(_) | Value::Int64(_)),
            TypeHint::Float => {
                matches!(self, Value::Int(_) | Value::Int64(_) | Value::Float(_))
            }
            TypeHint::Float64 => self.is_numeric(),
            TypeHint::Str => matches!(self, Value::Str(_)),
            TypeHint::Array => matches!(self, Value::Array(_)),
            TypeHint::Named(name) => match self {
                Value::Instance(instance) => instance.class.name == *name,
                Value::Class(class) => class.name == *name,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => f.write_str("void"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Int64(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Float64(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
            Value::Array(elements) => {
                f.write_str("[")?;
                for (i, element) in elements.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
            Value::Function(function) => write!(f, "<func {}>", function.name),
            Value::BoundMethod(method) => write!(
                f,
                "<bound method {}.{}>",
                method.receiver.class.name, method.function.name
            ),
            Value::Class(class) => write!(f, "<class {}>", class.name),
            Value::Instance(instance) => write!(f, "<{} instance>", instance.class.name),
            Value::Type(tag) => write!(f, "<type {tag}>"),
            Value::Promise(_) => f.write_str("<promise>"),
            Value::Module(module) => write!(f, "<module {}>", module.canonical),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_tag(), self)
    }
}

/// A declared parameter after evaluation of its `Expr::Parameter` node.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: Symbol,
    pub hint: TypeHint,
}

/// A user function value: declaration parts plus the captured lexical
/// environment. `closure == None` means the function closed over the
/// global scope only.
pub struct Function {
    pub name: Symbol,
    pub params: Vec<ParamSpec>,
    pub body: Rc<Vec<Stmt>>,
    pub closure: Option<Rc<RefCell<Environment>>>,
    pub is_async: bool,
    pub is_initializer: bool,
    /// The defining compilation unit; calls from other modules still
    /// see this unit's globals and side table.
    pub unit: Rc<Unit>,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<func {}/{}>", self.name, self.params.len())
    }
}

/// A method paired with the receiver it was looked up on.
#[derive(Debug)]
pub struct BoundMethod {
    pub receiver: Rc<Instance>,
    pub function: Rc<Function>,
}

/// A declared class property: name, declared type, initializer
/// expression, mutability.
#[derive(Debug, Clone)]
pub struct PropertySpec {
    pub name: Symbol,
    pub hint: TypeHint,
    pub initializer: Option<Expr>,
    pub mutable: bool,
}

pub struct ClassValue {
    pub name: Symbol,
    pub interfaces: Vec<Symbol>,
    pub properties: Vec<PropertySpec>,
    pub methods: HashMap<Symbol, Rc<Function>>,
    pub abstract_methods: Vec<Symbol>,
    pub closure: Option<Rc<RefCell<Environment>>>,
    pub unit: Rc<Unit>,
}

impl ClassValue {
    pub fn is_abstract(&self) -> bool {
        !self.abstract_methods.is_empty()
    }

    pub fn find_method(&self, name: &Symbol) -> Option<Rc<Function>> {
        self.methods.get(name).cloned()
    }
}

impl fmt::Debug for ClassValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class {}>", self.name)
    }
}

/// A mutable instance field with its declared type.
#[derive(Debug, Clone)]
pub struct Field {
    pub hint: TypeHint,
    pub mutable: bool,
    pub value: Value,
}

pub struct Instance {
    pub class: Rc<ClassValue>,
    pub fields: RefCell<HashMap<Symbol, Field>>,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} instance>", self.class.name)
    }
}

/// Structural equality over values: numerics compare across widths,
/// reference kinds compare by identity.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Void, Value::Void) | (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (a, b) if a.is_numeric() && b.is_numeric() => match (as_float64(a), as_float64(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
        (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
        (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
        (Value::Type(a), Value::Type(b)) => a == b,
        _ => false,
    }
}

pub fn as_float64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(f64::from(*n)),
        Value::Int64(n) => Some(*n as f64),
        Value::Float(n) => Some(f64::from(*n)),
        Value::Float64(n) => Some(*n),
        _ => None,
    }
}

pub fn as_int64(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(i64::from(*n)),
        Value::Int64(n) => Some(*n),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_follows_the_value_model() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Void.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(3).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(Value::string("x").is_truthy());
        assert!(Value::array(vec![]).is_truthy());
    }

    #[test]
    fn numeric_equality_crosses_widths() {
        assert!(values_equal(&Value::Int(7), &Value::Int64(7)));
        assert!(values_equal(&Value::Int(2), &Value::Float64(2.0)));
        assert!(!values_equal(&Value::Int(2), &Value::Float64(2.5)));
    }

    #[test]
    fn declared_types_allow_widening_only() {
        assert!(Value::Int(1).conforms_to(&TypeHint::Int64));
        assert!(Value::Int(1).conforms_to(&TypeHint::Float64));
        assert!(!Value::Int64(1).conforms_to(&TypeHint::Int));
        assert!(!Value::Float64(1.0).conforms_to(&TypeHint::Int));
        assert!(Value::Null.conforms_to(&TypeHint::Str));
    }
}
