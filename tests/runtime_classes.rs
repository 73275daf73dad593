mod common;

use common::{run_err, run_ok};

#[test]
fn classes_compose_properties_methods_and_a_constructor() {
    let output = run_ok(
        "class Point {\n\
             var x: int = 0\n\
             var y: int = 0\n\
             func init(x, y) {\n\
                 this.x = x\n\
                 this.y = y\n\
             }\n\
             func sum() {\n\
                 return this.x + this.y\n\
             }\n\
         }\n\
         new p = Point(3, 4)\n\
         print p.sum()\n\
         print p.x\n\
         print p is Point",
    );
    assert_eq!(output, "7\n3\ntrue\n");
}

#[test]
fn bound_methods_retain_their_receiver() {
    let output = run_ok(
        "class Greeter {\n\
             var name: string = \"\"\n\
             func init(name) { this.name = name }\n\
             func greet() { return \"hi \" + this.name }\n\
         }\n\
         new a = Greeter(\"ada\")\n\
         var method = a.greet\n\
         print method()",
    );
    assert_eq!(output, "hi ada\n");
}

#[test]
fn property_initializers_run_without_a_constructor() {
    let output = run_ok(
        "class Settings {\n\
             var retries: int = 3\n\
             var label = \"default\"\n\
         }\n\
         var s = new Settings()\n\
         print s.retries\n\
         print s.label",
    );
    assert_eq!(output, "3\ndefault\n");
}

#[test]
fn declared_property_types_are_checked_on_write() {
    let (error, outcome) = run_err(
        "class Box {\n\
             var size: int = 1\n\
         }\n\
         new b = Box()\n\
         b.size = \"wide\"",
    );
    assert_eq!(error.code_str(), "E003");
    assert!(outcome
        .diagnostics
        .entries()
        .iter()
        .any(|entry| entry.message.contains("declared as int")));
}

#[test]
fn unknown_properties_do_not_spring_into_existence() {
    let (error, _) = run_err(
        "class Empty { }\n\
         new e = Empty()\n\
         e.surprise = 1",
    );
    assert_eq!(error.code_str(), "E004");
}

#[test]
fn interfaces_gate_class_declarations() {
    let output = run_ok(
        "interface Walker {\n\
             abstract func walk(steps)\n\
         }\n\
         class Robot implements Walker {\n\
             func walk(steps) { return steps }\n\
         }\n\
         new r = Robot()\n\
         print r implements Walker\n\
         print r is Walker",
    );
    assert_eq!(output, "true\ntrue\n");
}

#[test]
fn missing_interface_method_fails_the_class_declaration() {
    let (_, outcome) = run_err(
        "interface Walker {\n\
             abstract func walk(steps)\n\
         }\n\
         class Rock implements Walker { }",
    );
    assert!(outcome
        .diagnostics
        .entries()
        .iter()
        .any(|entry| entry.message.contains("does not implement 'walk'")));
}

#[test]
fn abstract_classes_cannot_be_instantiated() {
    let (error, outcome) = run_err(
        "class Shape {\n\
             abstract func area()\n\
         }\n\
         new s = Shape()",
    );
    assert_eq!(error.code_str(), "E004");
    assert!(outcome
        .diagnostics
        .entries()
        .iter()
        .any(|entry| entry.message.contains("abstract")));
}

#[test]
fn constructor_arity_is_checked() {
    let (_, outcome) = run_err(
        "class Pair {\n\
             var a = 0\n\
             func init(a, b) { this.a = a + b }\n\
         }\n\
         new p = Pair(1)",
    );
    assert!(outcome
        .diagnostics
        .entries()
        .iter()
        .any(|entry| entry.message.contains("expects 2 arguments")));
}

#[test]
fn classes_without_constructor_reject_arguments() {
    let (_, outcome) = run_err("class Plain { }\nnew p = Plain(1)");
    assert!(outcome
        .diagnostics
        .entries()
        .iter()
        .any(|entry| entry.message.contains("no constructor")));
}

#[test]
fn instances_are_mutable_through_methods() {
    let output = run_ok(
        "class Counter {\n\
             var count: int = 0\n\
             func bump() {\n\
                 this.count = this.count + 1\n\
                 return this.count\n\
             }\n\
         }\n\
         new c = Counter()\n\
         c.bump()\n\
         c.bump()\n\
         print c.count",
    );
    assert_eq!(output, "2\n");
}
