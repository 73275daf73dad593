mod common;

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use common::{run_ok, run_script_with_registry};
use vesperscript::diagnostics::Diagnostics;
use vesperscript::interpreter::Interpreter;
use vesperscript::modules::{FileSystemProvider, ModuleRegistry};
use vesperscript::source::SourceText;

fn registry_with_dir(dir: &std::path::Path) -> ModuleRegistry {
    let mut provider = FileSystemProvider::new();
    provider.add_search_dir(dir.to_path_buf());
    let mut registry = ModuleRegistry::new();
    registry.add_provider(Rc::new(provider));
    registry
}

#[test]
fn bundled_modules_are_importable_without_a_filesystem() {
    let output = run_ok(
        "import \"core/math\" as math\n\
         print math.PI > 3\n\
         print math.abs(-5)",
    );
    assert_eq!(output, "true\n5\n");
}

#[test]
fn from_import_binds_individual_exports() {
    let output = run_ok(
        "from \"core/math\" import abs, PI\n\
         print abs(-3)\n\
         print PI > 3",
    );
    assert_eq!(output, "3\ntrue\n");
}

#[test]
fn missing_export_in_from_import_is_an_error() {
    let outcome = common::run_script("from \"core/math\" import missing");
    assert!(outcome.result.is_err());
    assert!(outcome
        .diagnostics
        .entries()
        .iter()
        .any(|entry| entry.message.contains("no export named 'missing'")));
}

#[test]
fn module_top_level_executes_exactly_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("tracked.vsp"),
        "print \"loading\"\nvar marker = 7\n",
    )
    .expect("write module");

    let outcome = run_script_with_registry(
        "import \"tracked\"\n\
         import \"tracked\" as second\n\
         print tracked.marker\n\
         print second.marker",
        registry_with_dir(dir.path()),
    );
    assert!(outcome.result.is_ok(), "{:?}", outcome.result);
    // One "loading", two reads of the same cached exports.
    assert_eq!(outcome.output, "loading\n7\n7\n");
}

#[test]
fn module_functions_see_their_own_module_globals() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("counter.vsp"),
        "var loads = 0\n\
         loads = loads + 1\n\
         func loadCount() { return loads }\n",
    )
    .expect("write module");

    let outcome = run_script_with_registry(
        "from \"counter\" import loadCount\n\
         print loadCount()",
        registry_with_dir(dir.path()),
    );
    assert!(outcome.result.is_ok(), "{:?}", outcome.result);
    assert_eq!(outcome.output, "1\n");
}

#[test]
fn failed_import_reports_module_not_found_and_stays_uncached() {
    let buffer: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
    let mut interpreter = Interpreter::with_output(ModuleRegistry::new(), buffer);
    let source = SourceText::new("test.vsp", "import \"no/such/module\"");
    let mut diagnostics = Diagnostics::new();
    let result = interpreter.run_source(&source, &mut diagnostics);
    assert!(result.is_err());
    assert!(diagnostics
        .entries()
        .iter()
        .any(|entry| entry.message.contains("could not be located")));
    assert!(!interpreter.registry().is_cached("no/such/module"));
}

#[test]
fn cyclic_imports_are_detected_not_hung() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("a.vsp"), "import \"b\"\nvar a1 = 1\n").expect("write a");
    fs::write(dir.path().join("b.vsp"), "import \"a\"\nvar b1 = 2\n").expect("write b");

    let outcome =
        run_script_with_registry("import \"a\"", registry_with_dir(dir.path()));
    assert!(outcome.result.is_err());
    assert!(outcome
        .diagnostics
        .entries()
        .iter()
        .any(|entry| entry.message.contains("cyclic")));
}

#[test]
fn package_declarations_are_recorded_on_the_module() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("tools.vsp"),
        "package toolkit\nfunc double(n) { return n * 2 }\n",
    )
    .expect("write module");

    let buffer: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
    let mut interpreter =
        Interpreter::with_output(registry_with_dir(dir.path()), buffer.clone());
    let source = SourceText::new("test.vsp", "import \"tools\"\nprint tools.double(21)");
    let mut diagnostics = Diagnostics::new();
    let result = interpreter.run_source(&source, &mut diagnostics);
    assert!(result.is_ok(), "{result:?} {:?}", diagnostics.entries());
    assert_eq!(String::from_utf8(buffer.borrow().clone()).unwrap(), "42\n");

    let module = interpreter
        .registry()
        .lookup("tools")
        .expect("module cached");
    assert_eq!(module.package.as_ref().map(|p| p.as_str()), Some("toolkit"));
}

#[test]
fn package_qualified_paths_resolve_against_package_roots() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pkg_root = dir.path().join("toolkit_src");
    fs::create_dir_all(&pkg_root).expect("mkdir");
    fs::write(
        pkg_root.join("strings.vsp"),
        "func shout(s) { return s + \"!\" }\n",
    )
    .expect("write module");

    let mut provider = FileSystemProvider::new();
    provider.register_package("toolkit", pkg_root);
    let mut registry = ModuleRegistry::new();
    registry.add_provider(Rc::new(provider));

    let outcome = run_script_with_registry(
        "from \"toolkit/strings\" import shout\nprint shout(\"hey\")",
        registry,
    );
    assert!(outcome.result.is_ok(), "{:?}", outcome.result);
    assert_eq!(outcome.output, "hey!\n");
}

#[test]
fn bundled_prelude_helpers_work_end_to_end() {
    let output = run_ok(
        "from \"core/prelude\" import clamp, repeat\n\
         print clamp(12, 0, 10)\n\
         print repeat(\"ab\", 3)",
    );
    assert_eq!(output, "10\nababab\n");
}
