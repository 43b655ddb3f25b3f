//! Diagnostics: every rejected program reports the right error kind.

use x32_compiler::{compile_to_x86, CompileError, SemanticErrorKind};

fn err_of(source: &str) -> CompileError {
    compile_to_x86(source).expect_err("program should be rejected")
}

fn semantic_kind(source: &str) -> SemanticErrorKind {
    match err_of(source) {
        CompileError::Semantic { kind, .. } => kind,
        other => panic!("expected a semantic error, got: {}", other),
    }
}

#[test]
fn unexpected_character_is_a_lexical_error() {
    let err = err_of("void main() { int_32 x = $; }");
    match err {
        CompileError::Lexical(lex) => {
            assert_eq!(lex.unexpected_char, '$');
            assert_eq!(lex.line, 1);
        }
        other => panic!("expected a lexical error, got: {}", other),
    }
}

#[test]
fn missing_semicolon_is_a_parse_error() {
    let err = err_of("void main() { int_32 x = 1 }");
    assert!(matches!(err, CompileError::Parse { .. }));
}

#[test]
fn undeclared_identifier() {
    let kind = semantic_kind("void main() { x = 1; }");
    assert_eq!(kind, SemanticErrorKind::UndeclaredIdentifier);
}

#[test]
fn redeclaration_in_the_same_block() {
    let kind = semantic_kind("void main() { int_32 x = 1; int_32 x = 2; }");
    assert_eq!(kind, SemanticErrorKind::DuplicateDeclaration);
}

#[test]
fn shadowing_in_a_nested_block_is_legal() {
    let source = r#"
        void main() {
            int_32 x = 1;
            if (x < 2) {
                int_32 x = 5;
                @print x;
            }
            @print x;
        }
    "#;
    assert!(compile_to_x86(source).is_ok());
}

#[test]
fn initializer_reads_the_outer_binding() {
    // `x + 1` inside the block refers to the outer `x`, which is still
    // the only `x` in scope while the initializer is parsed.
    let source = r#"
        void main() {
            int_32 x = 1;
            if (x < 2) {
                int_32 x = x + 1;
                @print x;
            }
        }
    "#;
    assert!(compile_to_x86(source).is_ok());
}

#[test]
fn scalar_used_as_array() {
    let kind = semantic_kind("void main() { int_32 x = 1; x[0] = 2; }");
    assert_eq!(kind, SemanticErrorKind::NotAnArray);
}

#[test]
fn array_used_as_scalar() {
    let kind = semantic_kind("void main() { int_32 a[4]; a = 2; }");
    assert_eq!(kind, SemanticErrorKind::NotAScalar);
}

#[test]
fn array_over_the_size_limit() {
    let kind = semantic_kind("void main() { int_32 a[1025]; }");
    assert_eq!(kind, SemanticErrorKind::ArrayTooLarge);
}

#[test]
fn array_at_the_size_limit_is_accepted() {
    assert!(compile_to_x86("void main() { int_32 a[1024]; a[0] = 1; }").is_ok());
}

#[test]
fn duplicate_function_definition() {
    let kind = semantic_kind("void f() { } void f() { } void main() { }");
    assert_eq!(kind, SemanticErrorKind::DuplicateFunction);
}

#[test]
fn call_before_definition_is_rejected() {
    let kind = semantic_kind("void main() { f(); } void f() { }");
    assert_eq!(kind, SemanticErrorKind::UndefinedFunction);
}

#[test]
fn direct_recursion_is_legal() {
    let source = r#"
        int_32 fact(int_32 n) {
            if (n < 2) {
                return 1;
            }
            return n * fact(n - 1);
        }
        void main() {
            @print fact(5);
        }
    "#;
    assert!(compile_to_x86(source).is_ok());
}

#[test]
fn wrong_argument_count() {
    let kind = semantic_kind(
        "int_32 f(int_32 a) { return a; } void main() { int_32 x = f(1, 2); }",
    );
    assert_eq!(kind, SemanticErrorKind::ArgumentCountMismatch);
}

#[test]
fn wrong_argument_type() {
    let kind = semantic_kind(
        "int_32 f(char c) { return 0; } void main() { int_32 x = f(1); }",
    );
    assert_eq!(kind, SemanticErrorKind::ArgumentTypeMismatch);
}

#[test]
fn void_call_in_value_position() {
    let kind = semantic_kind("void f() { } void main() { int_32 x = f(); }");
    assert_eq!(kind, SemanticErrorKind::VoidValueUsed);
}

#[test]
fn return_with_value_from_void_function() {
    let kind = semantic_kind("void main() { return 1; }");
    assert_eq!(kind, SemanticErrorKind::ValueTypeMismatch);
}

#[test]
fn bare_return_from_value_function() {
    let kind = semantic_kind("int_32 f() { return; } void main() { }");
    assert_eq!(kind, SemanticErrorKind::ValueTypeMismatch);
}

#[test]
fn program_without_main() {
    let kind = semantic_kind("void f() { }");
    assert_eq!(kind, SemanticErrorKind::MissingMain);
}

#[test]
fn duplicate_parameter_name() {
    let kind = semantic_kind("void f(int_32 a, int_32 a) { } void main() { }");
    assert_eq!(kind, SemanticErrorKind::DuplicateDeclaration);
}

#[test]
fn undeclared_name_in_grouped_condition_keeps_its_diagnostic() {
    // The grouped-condition reading fails on the undeclared name; the
    // report must be that name, not a generic operator complaint from
    // re-reading the parentheses as an expression.
    let kind = semantic_kind("void main() { int_32 a = 1; if ((a < b)) { @print a; } }");
    assert_eq!(kind, SemanticErrorKind::UndeclaredIdentifier);
}

#[test]
fn name_declared_out_of_its_block_is_gone() {
    let source = r#"
        void main() {
            if (1 < 2) {
                int_32 x = 1;
            }
            x = 2;
        }
    "#;
    assert_eq!(
        semantic_kind(source),
        SemanticErrorKind::UndeclaredIdentifier
    );
}
