//! End-to-end program tests.
//!
//! Each program goes through the full pipeline (tokenize, parse, compile)
//! and then runs on the VM with a buffer sink; assertions are on the exact
//! bytes printed.

use quill_runtime::{BufferEffects, RuntimeError, RuntimeErrorKind, Vm};
use quillc::{CompileError, CompilerConfig};

fn run_program(source: &str) -> String {
    let bc = quillc::compile_source(source, &CompilerConfig::default()).expect("compiles");
    let mut vm = Vm::new(BufferEffects::new());
    vm.run(&bc).expect("runs");
    assert_eq!(vm.stack_depth(), 0, "stack must be empty after a run");
    let fx = vm.into_effects();
    fx.output_str().to_string()
}

fn run_program_err(source: &str) -> RuntimeError {
    let bc = quillc::compile_source(source, &CompilerConfig::default()).expect("compiles");
    let mut vm = Vm::new(BufferEffects::new());
    vm.run(&bc).expect_err("run fails")
}

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(run_program("PRINT 1 + 2 * 3\n"), " 7 \n");
}

#[test]
fn test_print_zones_and_signs() {
    // Commas pad to 14-column zones; semicolons juxtapose the sign-space
    // formatted fields; the trailing semicolon suppresses the newline.
    assert_eq!(
        run_program("print \"a\", \"b\", \"c\"\nprint 1;-2;3;\n"),
        "a             b             c\n 1 -2  3 "
    );
}

#[test]
fn test_string_concatenation() {
    assert_eq!(run_program("print \"a\"+\"b\"\n"), "ab\n");
}

#[test]
fn test_string_variables_round_trip() {
    assert_eq!(
        run_program("a$ = \"koer\"\nprint a$;\"a\";a$;\n"),
        "koerakoer"
    );
}

#[test]
fn test_numeric_promotion_across_let() {
    assert_eq!(
        run_program("a! = 1 + 1.5\nb& = 1 + 32768\nPRINT a!; b&\n"),
        " 2.5  32769 \n"
    );
}

#[test]
fn test_autovivification() {
    assert_eq!(
        run_program("a = 1 * b\na$ = \"x\" + b$\nprint a; a$\n"),
        " 0 x\n"
    );
}

#[test]
fn test_string_plus_number_rejected_at_compile_time() {
    let err = quillc::compile_source("print \"a\"+2\n", &CompilerConfig::default()).unwrap_err();
    match err {
        CompileError::TypeMismatch { msg, .. } => {
            assert_eq!(msg, "cannot coerce INTEGER to STRING");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_long_to_integer_overflow_at_run_time() {
    let err = run_program_err("a% = 70000\n");
    assert_eq!(err.kind, RuntimeErrorKind::Overflow);
    assert_eq!(err.info.msg, "overflow coercing LONG to INTEGER");
    // The range table points back at the failing statement.
    let range = err.info.range.expect("range recorded");
    assert_eq!(range.start.line, 1);
}

#[test]
fn test_runtime_error_points_at_statement() {
    let err = run_program_err("a = 1\nb% = 32767 + 32767\n");
    assert_eq!(err.kind, RuntimeErrorKind::Overflow);
    assert_eq!(err.info.range.expect("range").start.line, 2);
}

#[test]
fn test_concatenation_is_associative() {
    let left = run_program("PRINT (\"a\"+\"b\")+\"c\"\n");
    let right = run_program("PRINT \"a\"+(\"b\"+\"c\")\n");
    assert_eq!(left, right);
    assert_eq!(left, "abc\n");
}

#[test]
fn test_integer_divide_and_mod() {
    assert_eq!(run_program("print 7 \\ 2; 7 mod 2\n"), " 3  1 \n");
    // Float operands round half-to-even before dividing.
    assert_eq!(run_program("print 7.5 \\ 2.5\n"), " 4 \n");
}

#[test]
fn test_float_divide_of_integers_is_single() {
    assert_eq!(run_program("print 1 / 2\n"), " 0.5 \n");
}

#[test]
fn test_float_divide_config_double() {
    let config = CompilerConfig::from_toml_str("float_divide = \"double\"").unwrap();
    let bc = quillc::compile_source("print 1 / 3\n", &config).unwrap();
    let mut vm = Vm::new(BufferEffects::new());
    vm.run(&bc).unwrap();
    // f64 precision shows in the digits.
    assert_eq!(
        vm.effects().output_str(),
        format!(" {} \n", 1.0f64 / 3.0f64)
    );
}

#[test]
fn test_comma_past_last_zone_wraps() {
    let mut source = String::from("print \"");
    source.push_str(&"x".repeat(72));
    source.push_str("\", \"y\"\n");
    let out = run_program(&source);
    assert_eq!(out, format!("{}\ny\n", "x".repeat(72)));
}

#[test]
fn test_end_stops_execution() {
    assert_eq!(run_program("print 1\nend\nprint 2\n"), " 1 \n");
}

#[test]
fn test_colon_and_remarks() {
    assert_eq!(
        run_program("a = 1: print a ' trailing note\nREM full line\n"),
        " 1 \n"
    );
}

#[test]
fn test_jump_labels_are_inert() {
    assert_eq!(run_program("start:\nprint 1\n"), " 1 \n");
}

#[test]
fn test_let_keyword_form() {
    assert_eq!(run_program("LET a = 2\nprint a\n"), " 2 \n");
}

#[test]
fn test_case_insensitive_variables_and_builtins() {
    assert_eq!(run_program("Count = 3\nPrInT COUNT\n"), " 3 \n");
}

#[test]
fn test_pragma_printed_passes() {
    assert_eq!(run_program("print \"ok\";\npragma printed \"ok\"\n"), "ok");
}

#[test]
fn test_pragma_printed_mismatch_fails() {
    let err = run_program_err("print \"ok\";\npragma printed \"nope\"\n");
    assert_eq!(err.kind, RuntimeErrorKind::Effect);
}

#[test]
fn test_print_bytes_match_column_accounting() {
    let bc = quillc::compile_source(
        "print \"abc\", 12;\nprint -5;\n",
        &CompilerConfig::default(),
    )
    .unwrap();
    let mut vm = Vm::new(BufferEffects::new());
    vm.run(&bc).unwrap();
    let fx = vm.into_effects();
    // Column equals bytes since the last newline.
    let tail = fx
        .output()
        .iter()
        .rev()
        .take_while(|&&b| b != b'\n')
        .count();
    assert_eq!(fx.column(), tail);
}

#[test]
fn test_division_by_zero() {
    let err = run_program_err("print 1 \\ 0\n");
    assert_eq!(err.kind, RuntimeErrorKind::DivisionByZero);
}

#[test]
fn test_negative_literal_through_long() {
    // 32768 only fits LONG; negating keeps it LONG, and the narrowing back
    // to INTEGER is in range.
    assert_eq!(run_program("a% = -32768\nprint a%\n"), "-32768 \n");
}
