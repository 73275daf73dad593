mod common;

use common::{run_err, run_ok};

#[test]
fn awaiting_an_async_function_drains_the_queue_and_prints() {
    let output = run_ok("async func f() { return 42 }\nprint await f()");
    assert_eq!(output, "42\n");
}

#[test]
fn async_results_flow_through_dependent_awaits() {
    let output = run_ok(
        "async func one() { return 1 }\n\
         async func two() {\n\
             var v = await one()\n\
             return v + 1\n\
         }\n\
         print await two()",
    );
    assert_eq!(output, "2\n");
}

#[test]
fn a_rejection_becomes_a_thrown_error_at_the_await_site() {
    let output = run_ok(
        "async func boom() { throw \"bad\" }\n\
         try {\n\
             print await boom()\n\
         } catch (e) {\n\
             print \"caught \" + e\n\
         }",
    );
    assert_eq!(output, "caught bad\n");
}

#[test]
fn an_unawaited_rejection_is_not_an_error() {
    let output = run_ok(
        "async func boom() { throw \"ignored\" }\n\
         var p = boom()\n\
         print \"done\"",
    );
    assert_eq!(output, "done\n");
}

#[test]
fn async_functions_return_promises_not_values() {
    let output = run_ok(
        "async func f() { return 7 }\n\
         var p = f()\n\
         print p is int\n\
         print await p",
    );
    assert_eq!(output, "false\n7\n");
}

#[test]
fn async_methods_bind_their_receiver() {
    let output = run_ok(
        "class Fetcher {\n\
             var base: int = 40\n\
             async func fetch(extra) {\n\
                 return this.base + extra\n\
             }\n\
         }\n\
         new f = Fetcher()\n\
         print await f.fetch(2)",
    );
    assert_eq!(output, "42\n");
}

#[test]
fn awaiting_a_non_promise_is_a_type_error() {
    let (error, outcome) = run_err("var x = await 5");
    assert_eq!(error.code_str(), "E003");
    assert!(outcome
        .diagnostics
        .entries()
        .iter()
        .any(|entry| entry.message.contains("await expects a promise")));
}

#[test]
fn await_results_compose_with_ordinary_evaluation() {
    let output = run_ok(
        "async func part(n) { return n }\n\
         var total = await part(3) + await part(4)\n\
         print total",
    );
    assert_eq!(output, "7\n");
}
