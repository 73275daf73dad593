mod common;

use common::run_err;
use vesperscript::interpreter::{RuntimeError, ScriptError};
use vesperscript::modules::ModuleError;
use vesperscript::parser::Parser;
use vesperscript::diagnostics::Diagnostics;
use vesperscript::source::SourceText;
use vesperscript::tokenizer::Lexer;

#[test]
fn parse_error_uses_e001() {
    let source = SourceText::new("test.vsp", "func demo(");
    let mut diagnostics = Diagnostics::new();
    let tokens = Lexer::new(&source, &mut diagnostics).tokenize();
    let mut parser = Parser::new(tokens);
    let _ = parser.parse();
    let error = parser.errors().first().expect("should fail").clone();
    let script_err: ScriptError = error.into();
    assert_eq!(script_err.code_str(), "E001");
}

#[test]
fn module_error_uses_e002() {
    let err = ModuleError::NotFound {
        module: "missing".to_string(),
    };
    let script_err: ScriptError = err.into();
    assert_eq!(script_err.code_str(), "E002");
}

#[test]
fn runtime_type_error_maps_to_e003() {
    let err = RuntimeError::TypeMismatch("expected number".into());
    let script_err: ScriptError = err.clone().into();
    assert_eq!(script_err.code_str(), "E003");
    assert_eq!(err.code(), "E003");
}

#[test]
fn invalid_operation_maps_to_e004() {
    assert_eq!(RuntimeError::NotCallable("int".into()).code(), "E004");
    assert_eq!(RuntimeError::DivisionByZero.code(), "E004");
}

#[test]
fn stalled_await_maps_to_e005() {
    assert_eq!(RuntimeError::StalledAwait.code(), "E005");
}

#[test]
fn resolution_failure_surfaces_as_e006() {
    let (error, _) = run_err("return 1");
    assert_eq!(error.code_str(), "E006");
}

#[test]
fn syntax_failure_surfaces_as_e001_from_the_pipeline() {
    let (error, outcome) = run_err("func broken(");
    assert_eq!(error.code_str(), "E001");
    assert!(outcome.diagnostics.has_errors());
}
