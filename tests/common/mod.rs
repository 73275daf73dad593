#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use vesperscript::config::ModuleConfig;
use vesperscript::diagnostics::Diagnostics;
use vesperscript::interpreter::{Interpreter, ScriptError};
use vesperscript::modules::ModuleRegistry;
use vesperscript::source::SourceText;

pub struct RunOutcome {
    pub output: String,
    pub result: Result<(), ScriptError>,
    pub diagnostics: Diagnostics,
}

pub fn run_script(source_text: &str) -> RunOutcome {
    run_script_with_registry(
        source_text,
        ModuleRegistry::with_defaults(&ModuleConfig::default()),
    )
}

pub fn run_script_with_registry(source_text: &str, registry: ModuleRegistry) -> RunOutcome {
    let buffer: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
    let mut interpreter = Interpreter::with_output(registry, buffer.clone());
    let source = SourceText::new("test.vsp", source_text);
    let mut diagnostics = Diagnostics::new();
    let result = interpreter.run_source(&source, &mut diagnostics);
    let output = String::from_utf8(buffer.borrow().clone()).expect("utf8 output");
    RunOutcome {
        output,
        result,
        diagnostics,
    }
}

/// Run a script that must succeed; returns the captured print output.
pub fn run_ok(source_text: &str) -> String {
    let outcome = run_script(source_text);
    assert!(
        outcome.result.is_ok(),
        "script failed: {:?}\ndiagnostics: {:?}",
        outcome.result,
        outcome.diagnostics.entries()
    );
    outcome.output
}

/// Run a script that must fail; returns the error and its diagnostics.
pub fn run_err(source_text: &str) -> (ScriptError, RunOutcome) {
    let outcome = run_script(source_text);
    let error = match outcome.result.clone() {
        Ok(()) => panic!("expected failure, got output: {}", outcome.output),
        Err(error) => error,
    };
    (error, outcome)
}
