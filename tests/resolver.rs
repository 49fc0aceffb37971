use rlox::error::LoxError;
use rlox::interpreter::Interpreter;
use rlox::parser::Parser;
use rlox::resolver::Resolver;
use rlox::scanner::Scanner;
use rlox::token::Token;

/// Scan, parse, and resolve a program, returning every resolution error.
fn resolve_errors(source: &str) -> Vec<LoxError> {
    let tokens: Vec<Token> = Scanner::new(source.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .expect("source should lex");

    let statements = Parser::new(tokens).parse().expect("source should parse");

    let mut interpreter = Interpreter::new();

    Resolver::new(&mut interpreter).resolve(&statements)
}

fn assert_single_error(source: &str, fragment: &str) {
    let errors = resolve_errors(source);

    assert_eq!(errors.len(), 1, "expected one error, got: {:?}", errors);
    assert!(
        errors[0].to_string().contains(fragment),
        "expected {:?} in: {}",
        fragment,
        errors[0]
    );
}

#[test]
fn clean_program_resolves_without_errors() {
    let source = "
        var a = 1;
        fun f(x) { return x + a; }
        class Base {}
        class C < Base {
            init() { this.n = f(2); }
            m() { return this.n; }
        }
        { var b = a; print b; }
    ";

    assert!(resolve_errors(source).is_empty());
}

#[test]
fn reading_a_local_in_its_own_initializer_is_an_error() {
    assert_single_error(
        "{ var a = a; }",
        "Can't read local variable in its own initializer.",
    );
}

#[test]
fn global_self_initialization_is_allowed() {
    // Globals are late-bound; only locals get the initializer check.
    assert!(resolve_errors("var a = a;").is_empty());
}

#[test]
fn redeclaring_a_local_is_an_error() {
    assert_single_error(
        "{ var a = 1; var a = 2; }",
        "Already a variable with this name in this scope.",
    );
}

#[test]
fn redeclaring_a_global_is_allowed() {
    assert!(resolve_errors("var a = 1; var a = 2;").is_empty());
}

#[test]
fn top_level_return_is_an_error() {
    assert_single_error("return 1;", "Can't return from top-level code.");
}

#[test]
fn returning_a_value_from_init_is_an_error() {
    assert_single_error(
        "class C { init() { return 1; } }",
        "Can't return a value from an initializer.",
    );
}

#[test]
fn bare_return_from_init_is_allowed() {
    assert!(resolve_errors("class C { init() { return; } }").is_empty());
}

#[test]
fn this_outside_a_class_is_an_error() {
    assert_single_error("print this;", "Can't use 'this' outside of a class.");
    assert_single_error(
        "fun f() { return this; }",
        "Can't use 'this' outside of a class.",
    );
}

#[test]
fn super_outside_a_class_is_an_error() {
    assert_single_error(
        "print super.m;",
        "Can't use 'super' outside of a class.",
    );
}

#[test]
fn super_without_a_superclass_is_an_error() {
    assert_single_error(
        "class C { m() { return super.m; } }",
        "Can't use 'super' in a class with no superclass.",
    );
}

#[test]
fn super_in_a_subclass_method_is_allowed() {
    let source = "
        class A { m() {} }
        class B < A { m() { super.m(); } }
    ";

    assert!(resolve_errors(source).is_empty());
}

#[test]
fn a_class_cannot_inherit_from_itself() {
    assert_single_error("class C < C {}", "A class can't inherit from itself.");
}

#[test]
fn all_errors_are_collected_in_one_pass() {
    let source = "
        return 1;
        print this;
        { var a = a; }
    ";

    assert_eq!(resolve_errors(source).len(), 3);
}
