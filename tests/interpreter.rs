use std::cell::RefCell;
use std::rc::Rc;

use rlox::error::{LoxError, RuntimeErrorKind};
use rlox::interpreter::Interpreter;
use rlox::native::default_natives;
use rlox::parser::Parser;
use rlox::resolver::Resolver;
use rlox::scanner::Scanner;
use rlox::token::Token;

/// Run a program through the full pipeline, capturing `print` output.
/// Panics on lexical, parse, or resolution errors; runtime errors come back
/// in the result so tests can assert on their kind.
fn run(source: &str) -> (String, Result<(), LoxError>) {
    let tokens: Vec<Token> = Scanner::new(source.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .expect("source should lex");

    let statements = Parser::new(tokens).parse().expect("source should parse");

    let sink: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
    let mut interpreter = Interpreter::configure(default_natives(), sink.clone());

    let errors = Resolver::new(&mut interpreter).resolve(&statements);
    assert!(errors.is_empty(), "unexpected resolve errors: {:?}", errors);

    let result = interpreter.interpret(&statements);
    let output = String::from_utf8(sink.borrow().clone()).expect("output is UTF-8");

    (output, result)
}

/// Like [`run`], but the program is expected to finish cleanly.
fn run_ok(source: &str) -> String {
    let (output, result) = run(source);

    result.expect("program should run without error");

    output
}

fn runtime_kind(source: &str) -> RuntimeErrorKind {
    let (_, result) = run(source);

    result
        .expect_err("program should fail at runtime")
        .runtime_kind()
        .expect("error should be a runtime error")
}

// ───────────────────────── arithmetic & coercion ─────────────────────────

#[test]
fn arithmetic_and_string_concatenation() {
    assert_eq!(run_ok("print 1 + 2;"), "3\n");
    assert_eq!(run_ok("print \"a\" + \"b\";"), "ab\n");
    assert_eq!(run_ok("print 3 * 4 - 10 / 2;"), "7\n");
    assert_eq!(run_ok("print -(3 + 2);"), "-5\n");
}

#[test]
fn mixed_plus_operands_are_a_type_error() {
    assert_eq!(runtime_kind("print 1 + \"a\";"), RuntimeErrorKind::TypeMismatch);
    assert_eq!(runtime_kind("print \"a\" + nil;"), RuntimeErrorKind::TypeMismatch);
}

#[test]
fn unary_minus_requires_a_number() {
    assert_eq!(runtime_kind("print -\"oops\";"), RuntimeErrorKind::TypeMismatch);
}

#[test]
fn comparison_requires_numbers() {
    assert_eq!(run_ok("print 1 < 2;"), "true\n");
    assert_eq!(run_ok("print 2 <= 2;"), "true\n");
    assert_eq!(runtime_kind("print 1 < \"2\";"), RuntimeErrorKind::TypeMismatch);
}

#[test]
fn division_by_zero_yields_infinity() {
    assert_eq!(run_ok("print 1 / 0;"), "inf\n");
}

#[test]
fn integral_results_drop_the_fraction_suffix() {
    assert_eq!(run_ok("print 8 / 4;"), "2\n");
    assert_eq!(run_ok("print 8 / 3;"), "2.6666666666666665\n");
}

#[test]
fn equality_semantics() {
    assert_eq!(run_ok("print nil == nil;"), "true\n");
    assert_eq!(run_ok("print nil == false;"), "false\n");
    assert_eq!(run_ok("print 1 == 1;"), "true\n");
    assert_eq!(run_ok("print \"x\" == \"x\";"), "true\n");
    assert_eq!(run_ok("print 1 == \"1\";"), "false\n");
    assert_eq!(run_ok("print 1 != 2;"), "true\n");
}

#[test]
fn truthiness_of_zero_and_empty_string() {
    assert_eq!(run_ok("if (0) print \"zero\";"), "zero\n");
    assert_eq!(run_ok("if (\"\") print \"empty\";"), "empty\n");
    assert_eq!(run_ok("if (nil) print \"nil\"; else print \"falsy\";"), "falsy\n");
    assert_eq!(run_ok("print !nil;"), "true\n");
}

#[test]
fn logical_operators_return_the_operand_value() {
    assert_eq!(run_ok("print \"hi\" or 2;"), "hi\n");
    assert_eq!(run_ok("print nil or \"yes\";"), "yes\n");
    assert_eq!(run_ok("print nil and 2;"), "nil\n");
    assert_eq!(run_ok("print 1 and 2;"), "2\n");
}

#[test]
fn logical_operators_short_circuit() {
    // The right side would blow up if evaluated.
    assert_eq!(run_ok("print true or missing;"), "true\n");
    assert_eq!(run_ok("print false and missing;"), "false\n");
}

// ───────────────────────── variables & scoping ─────────────────────────

#[test]
fn block_shadowing_restores_on_exit() {
    let source = "
        var a = 1;
        {
            var a = 2;
            print a;
        }
        print a;
    ";

    assert_eq!(run_ok(source), "2\n1\n");
}

#[test]
fn closures_resolve_statically_not_dynamically() {
    // The closure's `a` is bound when `show` is resolved; the later inner
    // declaration must not capture it.
    let source = "
        var a = \"global\";
        {
            fun show() { print a; }
            show();
            var a = \"block\";
            show();
        }
    ";

    assert_eq!(run_ok(source), "global\nglobal\n");
}

#[test]
fn assignment_yields_the_assigned_value() {
    assert_eq!(run_ok("var a = 1; print a = 2;"), "2\n");
}

#[test]
fn undefined_variable_read_fails() {
    assert_eq!(runtime_kind("print ghost;"), RuntimeErrorKind::UndefinedVariable);
}

#[test]
fn assignment_never_creates_a_global() {
    assert_eq!(runtime_kind("ghost = 1;"), RuntimeErrorKind::UndefinedVariable);
}

#[test]
fn uninitialized_var_is_nil() {
    assert_eq!(run_ok("var a; print a;"), "nil\n");
}

// ───────────────────────── functions & closures ─────────────────────────

#[test]
fn closure_counter_shares_captured_state() {
    let source = "
        fun makeCounter() {
            var i = 0;
            fun inc() {
                i = i + 1;
                return i;
            }
            return inc;
        }
        var c = makeCounter();
        print c();
        print c();
    ";

    assert_eq!(run_ok(source), "1\n2\n");
}

#[test]
fn recursion_by_name() {
    let source = "
        fun fib(n) {
            if (n < 2) return n;
            return fib(n - 1) + fib(n - 2);
        }
        print fib(10);
    ";

    assert_eq!(run_ok(source), "55\n");
}

#[test]
fn bare_return_yields_nil() {
    let source = "
        fun noisy() {
            print \"before\";
            return;
        }
        print noisy();
    ";

    assert_eq!(run_ok(source), "before\nnil\n");
}

#[test]
fn arity_is_checked_exactly() {
    assert_eq!(
        runtime_kind("fun f(a, b) { return a; } f(1);"),
        RuntimeErrorKind::ArityMismatch
    );
    assert_eq!(
        runtime_kind("fun f() { } f(1, 2);"),
        RuntimeErrorKind::ArityMismatch
    );
}

#[test]
fn only_functions_and_classes_are_callable() {
    assert_eq!(runtime_kind("\"str\"();"), RuntimeErrorKind::NotCallable);
    assert_eq!(runtime_kind("var x = 4; x();"), RuntimeErrorKind::NotCallable);
}

#[test]
fn function_values_print_their_name() {
    assert_eq!(run_ok("fun f() {} print f;"), "<fn f>\n");
    assert_eq!(run_ok("print clock;"), "<native fn>\n");
}

#[test]
fn native_clock_returns_a_number() {
    assert_eq!(run_ok("print clock() > 0;"), "true\n");
}

// ───────────────────────── control flow ─────────────────────────

#[test]
fn while_loop_re_evaluates_its_condition() {
    let source = "
        var n = 3;
        while (n > 0) {
            print n;
            n = n - 1;
        }
    ";

    assert_eq!(run_ok(source), "3\n2\n1\n");
}

#[test]
fn for_loop_desugars_to_while() {
    assert_eq!(
        run_ok("for (var i = 0; i < 3; i = i + 1) print i;"),
        "0\n1\n2\n"
    );
}

#[test]
fn runtime_error_aborts_remaining_statements() {
    let (output, result) = run("print 1; print missing; print 2;");

    assert_eq!(output, "1\n");
    assert!(result.is_err());
}

// ───────────────────────── classes & instances ─────────────────────────

#[test]
fn initializer_sets_fields_and_yields_the_instance() {
    let source = "
        class Foo {
            init(x) { this.x = x; }
        }
        var f = Foo(1);
        print f.x;
        print f;
    ";

    assert_eq!(run_ok(source), "1\nFoo instance\n");
}

#[test]
fn early_return_in_init_still_yields_the_instance() {
    let source = "
        class Foo {
            init(x) {
                this.x = x;
                if (x > 0) return;
                this.x = 0 - x;
            }
        }
        print Foo(3).x;
        print Foo(-3).x;
    ";

    assert_eq!(run_ok(source), "3\n3\n");
}

#[test]
fn calling_init_directly_returns_this() {
    let source = "
        class Foo {
            init() { this.n = 1; }
        }
        var f = Foo();
        print f.init();
    ";

    assert_eq!(run_ok(source), "Foo instance\n");
}

#[test]
fn class_arity_comes_from_init() {
    assert_eq!(
        runtime_kind("class Foo { init(x) {} } Foo();"),
        RuntimeErrorKind::ArityMismatch
    );
    assert_eq!(
        runtime_kind("class Bare {} Bare(1);"),
        RuntimeErrorKind::ArityMismatch
    );
}

#[test]
fn fields_are_dynamic_and_shadow_methods() {
    let source = "
        class C {
            m() { return \"method\"; }
        }
        var c = C();
        print c.m();
        c.m = \"field\";
        print c.m;
    ";

    assert_eq!(run_ok(source), "method\nfield\n");
}

#[test]
fn instances_compare_by_identity() {
    let source = "
        class P { init(n) { this.n = n; } }
        var a = P(1);
        var b = P(1);
        print a == a;
        print a == b;
    ";

    assert_eq!(run_ok(source), "true\nfalse\n");
}

#[test]
fn bound_methods_remember_their_instance() {
    let source = "
        class Person {
            init(name) { this.name = name; }
            greet() { print this.name; }
        }
        var hello = Person(\"bob\").greet;
        hello();
    ";

    assert_eq!(run_ok(source), "bob\n");
}

#[test]
fn property_access_on_non_instances_fails() {
    assert_eq!(runtime_kind("print \"str\".length;"), RuntimeErrorKind::NotAnInstance);
    assert_eq!(runtime_kind("4.x = 1;"), RuntimeErrorKind::NotAnInstance);
}

#[test]
fn missing_property_fails() {
    assert_eq!(
        runtime_kind("class C {} print C().missing;"),
        RuntimeErrorKind::UndefinedProperty
    );
}

// ───────────────────────── inheritance ─────────────────────────

#[test]
fn subclass_overrides_win_over_superclass_methods() {
    let source = "
        class A { m() { print \"A\"; } }
        class B < A { m() { print \"B\"; } }
        B().m();
    ";

    assert_eq!(run_ok(source), "B\n");
}

#[test]
fn inherited_methods_are_found_through_the_chain() {
    let source = "
        class A { m() { print \"inherited\"; } }
        class B < A {}
        B().m();
    ";

    assert_eq!(run_ok(source), "inherited\n");
}

#[test]
fn super_invokes_the_superclass_method_on_this() {
    let source = "
        class Doughnut {
            cook() { print \"Fry until golden.\"; }
        }
        class Cruller < Doughnut {
            cook() {
                super.cook();
                print \"Glaze.\";
            }
        }
        Cruller().cook();
    ";

    assert_eq!(run_ok(source), "Fry until golden.\nGlaze.\n");
}

#[test]
fn super_binds_this_to_the_original_instance() {
    let source = "
        class Base {
            whoAmI() { print this.name; }
        }
        class Derived < Base {
            init(name) { this.name = name; }
            check() { super.whoAmI(); }
        }
        Derived(\"original\").check();
    ";

    assert_eq!(run_ok(source), "original\n");
}

#[test]
fn super_method_miss_is_undefined_property() {
    let source = "
        class A {}
        class B < A {
            m() { super.nothing(); }
        }
        B().m();
    ";

    assert_eq!(runtime_kind(source), RuntimeErrorKind::UndefinedProperty);
}

#[test]
fn superclass_must_be_a_class() {
    assert_eq!(
        runtime_kind("var NotAClass = 42; class Sub < NotAClass {}"),
        RuntimeErrorKind::TypeMismatch
    );
}

#[test]
fn init_is_inherited_when_absent() {
    let source = "
        class A { init(v) { this.v = v; } }
        class B < A {}
        print B(7).v;
    ";

    assert_eq!(run_ok(source), "7\n");
}
