mod common;

use common::{run_err, run_ok};

#[test]
fn thrown_values_are_caught_and_finally_always_runs() {
    let output = run_ok(
        "func risky() { throw \"boom\" }\n\
         try {\n\
             risky()\n\
             print \"unreached\"\n\
         } catch (e) {\n\
             print \"caught \" + e\n\
         } finally {\n\
             print \"cleanup\"\n\
         }",
    );
    assert_eq!(output, "caught boom\ncleanup\n");
}

#[test]
fn finally_runs_on_the_return_path() {
    let output = run_ok(
        "func f() {\n\
             try {\n\
                 return 1\n\
             } finally {\n\
                 print \"finally\"\n\
             }\n\
         }\n\
         print f()",
    );
    assert_eq!(output, "finally\n1\n");
}

#[test]
fn a_throw_in_finally_replaces_the_outcome() {
    let output = run_ok(
        "func g() {\n\
             try {\n\
                 return 1\n\
             } finally {\n\
                 throw \"replaced\"\n\
             }\n\
         }\n\
         try {\n\
             print g()\n\
         } catch (e) {\n\
             print e\n\
         }",
    );
    assert_eq!(output, "replaced\n");
}

#[test]
fn runtime_faults_are_catchable_like_thrown_values() {
    let output = run_ok(
        "try {\n\
             print 1 / 0\n\
         } catch (e) {\n\
             print \"err: \" + e\n\
         }",
    );
    assert_eq!(output, "err: integer division by zero\n");
}

#[test]
fn exceptions_unwind_through_nested_calls() {
    let output = run_ok(
        "func inner() { throw \"deep\" }\n\
         func middle() { inner() }\n\
         try {\n\
             middle()\n\
         } catch (e) {\n\
             print e\n\
         }",
    );
    assert_eq!(output, "deep\n");
}

#[test]
fn uncaught_exceptions_terminate_the_unit_with_a_report() {
    let (error, outcome) = run_err("print \"before\"\nthrow \"fatal\"\nprint \"after\"");
    assert_eq!(error.code_str(), "E005");
    assert_eq!(outcome.output, "before\n");
    assert!(outcome
        .diagnostics
        .entries()
        .iter()
        .any(|entry| entry.message.contains("fatal")));
}

#[test]
fn catch_scope_sees_only_its_own_variable() {
    let output = run_ok(
        "var e = \"outer\"\n\
         try {\n\
             throw \"inner\"\n\
         } catch (e) {\n\
             print e\n\
         }\n\
         print e",
    );
    assert_eq!(output, "inner\nouter\n");
}

#[test]
fn break_escapes_a_loop_through_try_finally() {
    let output = run_ok(
        "var i = 0\n\
         while (true) {\n\
             try {\n\
                 i = i + 1\n\
                 if (i == 2) { break }\n\
             } finally {\n\
                 print \"tick\"\n\
             }\n\
         }\n\
         print i",
    );
    assert_eq!(output, "tick\ntick\n2\n");
}
