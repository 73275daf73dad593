use thiserror::Error;

use crate::modules::ModuleError;
use crate::parser::ParseError;

/// Host-facing runtime failures. Script-level `throw` is not an error
/// variant; it travels through the interpreter's exception channel.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("{0}")]
    Arity(String),
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("undefined property '{0}'")]
    UndefinedProperty(String),
    #[error("index out of range: {0}")]
    IndexOutOfRange(String),
    #[error("integer division by zero")]
    DivisionByZero,
    #[error("value is not callable: {0}")]
    NotCallable(String),
    #[error("await expects a promise, found {0}")]
    NotAwaitable(String),
    #[error("event loop ran dry while awaiting a pending promise")]
    StalledAwait,
    #[error("cannot instantiate abstract class '{0}'")]
    AbstractInstantiation(String),
    #[error("unknown interface '{0}'")]
    UnknownInterface(String),
    #[error("assignment to immutable binding '{0}'")]
    ImmutableBinding(String),
    #[error("{0}")]
    Module(String),
}

impl From<ModuleError> for RuntimeError {
    fn from(error: ModuleError) -> Self {
        RuntimeError::Module(error.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Syntax,
    Resolution,
    ModuleResolution,
    TypeMismatch,
    InvalidOperation,
    RuntimePanic,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Syntax => "E001",
            ErrorCode::ModuleResolution => "E002",
            ErrorCode::TypeMismatch => "E003",
            ErrorCode::InvalidOperation => "E004",
            ErrorCode::RuntimePanic => "E005",
            ErrorCode::Resolution => "E006",
        }
    }
}

/// Stable-coded error surfaced to embedders and the CLI.
#[derive(Debug, Clone)]
pub struct ScriptError {
    pub code: ErrorCode,
    pub message: String,
}

impl ScriptError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ScriptError {}

impl From<ParseError> for ScriptError {
    fn from(value: ParseError) -> Self {
        ScriptError::new(ErrorCode::Syntax, value.to_string())
    }
}

impl From<ModuleError> for ScriptError {
    fn from(value: ModuleError) -> Self {
        ScriptError::new(ErrorCode::ModuleResolution, value.to_string())
    }
}

impl From<RuntimeError> for ScriptError {
    fn from(value: RuntimeError) -> Self {
        ScriptError::new(runtime_error_code(&value), value.to_string())
    }
}

pub fn runtime_error_code(error: &RuntimeError) -> ErrorCode {
    match error {
        RuntimeError::TypeMismatch(_) | RuntimeError::NotAwaitable(_) => ErrorCode::TypeMismatch,
        RuntimeError::Arity(_)
        | RuntimeError::UndefinedVariable(_)
        | RuntimeError::UndefinedProperty(_)
        | RuntimeError::IndexOutOfRange(_)
        | RuntimeError::DivisionByZero
        | RuntimeError::NotCallable(_)
        | RuntimeError::AbstractInstantiation(_)
        | RuntimeError::UnknownInterface(_)
        | RuntimeError::ImmutableBinding(_) => ErrorCode::InvalidOperation,
        RuntimeError::Module(_) => ErrorCode::ModuleResolution,
        RuntimeError::StalledAwait => ErrorCode::RuntimePanic,
    }
}

impl RuntimeError {
    pub fn code(&self) -> &'static str {
        runtime_error_code(self).as_str()
    }
}
