mod common;

use common::{run_err, run_ok, run_script};

#[test]
fn arithmetic_precedence_evaluates_to_seven() {
    let output = run_ok("var x = 1 + 2 * 3\nprint x\nprint x is int");
    assert_eq!(output, "7\ntrue\n");
}

#[test]
fn grouping_overrides_precedence() {
    assert_eq!(run_ok("print (1 + 2) * 3"), "9\n");
}

#[test]
fn logical_operators_short_circuit() {
    let output = run_ok(
        "func boom() { throw \"must not run\" }\n\
         print false and boom()\n\
         print true or boom()\n\
         print 1 and 2\n\
         print null or \"fallback\"",
    );
    assert_eq!(output, "false\ntrue\n2\nfallback\n");
}

#[test]
fn closures_capture_their_defining_environment() {
    let output = run_ok(
        "func makeCounter() {\n\
             var count = 0\n\
             func increment() {\n\
                 count = count + 1\n\
                 return count\n\
             }\n\
             return increment\n\
         }\n\
         var counter = makeCounter()\n\
         print counter()\n\
         print counter()\n\
         var other = makeCounter()\n\
         print other()",
    );
    assert_eq!(output, "1\n2\n1\n");
}

#[test]
fn for_in_binds_freshly_each_iteration() {
    let output = run_ok(
        "var fns = [null, null]\n\
         var i = 0\n\
         for x in [10, 20] {\n\
             func capture() { return x }\n\
             fns[i] = capture\n\
             i = i + 1\n\
         }\n\
         print fns[0]()\n\
         print fns[1]()",
    );
    assert_eq!(output, "10\n20\n");
}

#[test]
fn while_loop_with_break_and_continue() {
    let output = run_ok(
        "var i = 0\n\
         var total = 0\n\
         while (true) {\n\
             i = i + 1\n\
             if (i == 3) { continue }\n\
             if (i > 5) { break }\n\
             total = total + i\n\
         }\n\
         print total",
    );
    // 1 + 2 + 4 + 5
    assert_eq!(output, "12\n");
}

#[test]
fn c_style_for_loop_runs_init_condition_step() {
    let output = run_ok(
        "var total = 0\n\
         for (var i = 1; i <= 4; i = i + 1) {\n\
             total = total + i\n\
         }\n\
         print total",
    );
    assert_eq!(output, "10\n");
}

#[test]
fn arrays_support_index_get_set_and_length() {
    let output = run_ok(
        "var items = [1, 2, 3]\n\
         items[1] = 20\n\
         print items[1]\n\
         print items.length\n\
         print items",
    );
    assert_eq!(output, "20\n3\n[1, 20, 3]\n");
}

#[test]
fn strings_concatenate_index_and_measure() {
    let output = run_ok(
        "var s = \"abc\" + \"def\"\n\
         print s\n\
         print s[3]\n\
         print s.length",
    );
    assert_eq!(output, "abcdef\nd\n6\n");
}

#[test]
fn string_iteration_yields_characters() {
    assert_eq!(run_ok("for c in \"hi\" { print c }"), "h\ni\n");
}

#[test]
fn integer_overflow_widens_to_int64() {
    let output = run_ok(
        "var big = 2000000000 + 2000000000\n\
         print big\n\
         print big is int64",
    );
    assert_eq!(output, "4000000000\ntrue\n");
}

#[test]
fn declared_type_rejects_wrong_writes() {
    let (error, outcome) = run_err("var n: int = 1\nn = 2.5");
    assert_eq!(error.code_str(), "E003");
    assert!(outcome
        .diagnostics
        .entries()
        .iter()
        .any(|entry| entry.message.contains("declared as int")));
}

#[test]
fn declared_type_widens_on_write() {
    let output = run_ok("var n: float64 = 1\nprint n is float64");
    assert_eq!(output, "true\n");
}

#[test]
fn const_bindings_reject_assignment() {
    let (error, _) = run_err("const k = 1\nk = 2");
    assert_eq!(error.code_str(), "E004");
}

#[test]
fn calling_a_non_callable_is_a_runtime_error() {
    let (error, outcome) = run_err("var n = 4\nn()");
    assert_eq!(error.code_str(), "E004");
    assert!(outcome
        .diagnostics
        .entries()
        .iter()
        .any(|entry| entry.message.contains("not callable")));
}

#[test]
fn arity_mismatch_is_reported_with_the_function_name() {
    let (_, outcome) = run_err("func pair(a, b) { return a + b }\npair(1)");
    assert!(outcome
        .diagnostics
        .entries()
        .iter()
        .any(|entry| entry.message.contains("'pair' expects 2 arguments")));
}

#[test]
fn casts_convert_between_primitive_kinds() {
    let output = run_ok(
        "print 2.9 as int\n\
         print \"42\" as int\n\
         print 5 as float64\n\
         print (5 as string) + \"!\"",
    );
    assert_eq!(output, "2\n42\n5\n5!\n");
}

#[test]
fn bad_cast_is_a_catchable_type_error() {
    let output = run_ok(
        "try {\n\
             var n = \"oops\" as int\n\
             print n\n\
         } catch (e) {\n\
             print \"caught \" + e\n\
         }",
    );
    assert!(output.contains("caught"), "output: {output}");
}

#[test]
fn undefined_variable_fails_at_runtime_not_resolve_time() {
    let (error, _) = run_err("print missing");
    assert_eq!(error.code_str(), "E004");
}

#[test]
fn print_renders_the_value_model() {
    let output = run_ok("print null\nprint true\nprint 1.5\nprint [1, \"two\"]");
    assert_eq!(output, "null\ntrue\n1.5\n[1, two]\n");
}

#[test]
fn script_errors_do_not_stop_later_runs() {
    // The process embeds the interpreter; a failed unit must leave the
    // host able to run another one.
    let (_, _) = run_err("throw \"first\"");
    assert_eq!(run_ok("print \"second\""), "second\n");
}

#[test]
fn diagnostics_report_runtime_kind_on_uncaught_errors() {
    let outcome = run_script("throw \"kaboom\"");
    assert!(outcome.result.is_err());
    assert!(outcome
        .diagnostics
        .entries()
        .iter()
        .any(|entry| entry.message.contains("kaboom")));
}
