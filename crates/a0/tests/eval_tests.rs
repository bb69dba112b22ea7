//! Evaluator semantics: values, paths, records, control flow, calls.

use a0::{CancelToken, ErrorCode, ExecOptions, Outcome, Runner, RuntimeError, StdlibRegistry, ToolRegistry, Value};
use pretty_assertions::assert_eq;

fn run(src: &str) -> Result<Outcome, RuntimeError> {
    let tools = ToolRegistry::new();
    let stdlib = StdlibRegistry::with_defaults();
    let runner = Runner::new(src, "test.a0", &tools).expect("program should validate");
    runner.execute(ExecOptions::new(&tools, &stdlib), &CancelToken::new())
}

fn eval(src: &str) -> Value {
    run(src).expect("program should succeed").value
}

fn fail(src: &str) -> RuntimeError {
    run(src).expect_err("program should fail")
}

fn as_json(value: &Value) -> String {
    serde_json::to_string(value).unwrap()
}

// === literals and program results ===

#[test]
fn literals() {
    assert_eq!(eval("return 42"), Value::Number(42.0));
    assert_eq!(eval("return 2.5"), Value::Number(2.5));
    assert_eq!(eval("return true"), Value::Bool(true));
    assert_eq!(eval("return null"), Value::Null);
    assert_eq!(eval("return \"hi\\n\""), Value::String("hi\n".into()));
    assert_eq!(eval("return -3"), Value::Number(-3.0));
}

#[test]
fn program_result_falls_back_to_last_expression_statement() {
    assert_eq!(eval("1 + 1\n2 + 2"), Value::Number(4.0));
    assert_eq!(eval("let x = 5"), Value::Null);
}

// === paths ===

#[test]
fn null_field_versus_missing_field() {
    assert_eq!(eval("let r = { a: null }\nreturn r.a"), Value::Null);
    let err = fail("let r = { }\nreturn r.b");
    assert_eq!(err.code, ErrorCode::Path);
}

#[test]
fn path_through_non_record_fails() {
    let err = fail("let x = 5\nreturn x.y");
    assert_eq!(err.code, ErrorCode::Path);
}

#[test]
fn nested_path_traversal() {
    assert_eq!(eval("let r = { a: { b: { c: 7 } } }\nreturn r.a.b.c"), Value::Number(7.0));
}

#[test]
fn keyword_segments_after_the_first() {
    assert_eq!(eval("let r = { if: 1, for: 2 }\nreturn r.if + r.for"), Value::Number(3.0));
}

// === records ===

#[test]
fn record_keys_keep_insertion_order_and_overwrite_in_place() {
    let value = eval("return { b: 1, a: 2, b: 3 }");
    assert_eq!(as_json(&value), r#"{"b":3,"a":2}"#);
}

#[test]
fn spread_copies_entries_in_order() {
    let value = eval("let base = { a: 1, b: 2 }\nreturn { ...base, b: 9, c: 3 }");
    assert_eq!(as_json(&value), r#"{"a":1,"b":9,"c":3}"#);
}

#[test]
fn spread_of_non_record_fails() {
    let err = fail("return { ...[1, 2] }");
    assert_eq!(err.code, ErrorCode::Type);
}

#[test]
fn dotted_record_keys_are_plain_strings() {
    let value = eval("return { fs.read: true }");
    assert_eq!(as_json(&value), r#"{"fs.read":true}"#);
}

// === operators ===

#[test]
fn string_concatenation_and_comparison() {
    assert_eq!(eval("return \"foo\" + \"bar\""), Value::String("foobar".into()));
    assert_eq!(eval("return \"a\" < \"b\""), Value::Bool(true));
    assert_eq!(eval("return \"b\" >= \"b\""), Value::Bool(true));
}

#[test]
fn mixed_operand_kinds_fail() {
    assert_eq!(fail("return 1 + \"x\"").code, ErrorCode::Type);
    assert_eq!(fail("return 1 < \"x\"").code, ErrorCode::Type);
    assert_eq!(fail("return -\"x\"").code, ErrorCode::Type);
}

#[test]
fn division_and_modulo_by_zero_fail() {
    let err = fail("return 1 / 0");
    assert_eq!(err.code, ErrorCode::Type);
    assert!(err.message.contains("division by zero"));
    let err = fail("return 1 % 0");
    assert!(err.message.contains("modulo by zero"));
}

#[test]
fn equality_is_deep_and_kind_strict() {
    assert_eq!(eval("return 1 == 1.0"), Value::Bool(true));
    assert_eq!(eval("return 1 == \"1\""), Value::Bool(false));
    assert_eq!(eval("return { a: [1, 2] } == { a: [1, 2] }"), Value::Bool(true));
    assert_eq!(eval("return [1, 2] != [2, 1]"), Value::Bool(true));
}

// === conditionals ===

#[test]
fn inline_if_takes_one_branch_by_truthiness() {
    assert_eq!(eval("return if { cond: [], then: \"t\", else: \"f\" }"), Value::String("t".into()));
    assert_eq!(eval("return if { cond: 0, then: \"t\", else: \"f\" }"), Value::String("f".into()));
    // The untaken branch is never evaluated.
    assert_eq!(eval("return if { cond: true, then: 1, else: 1 / 0 }"), Value::Number(1.0));
}

#[test]
fn block_if_yields_return_value_or_null() {
    assert_eq!(eval("return if (1 < 2) { return \"yes\" } else { return \"no\" }"), Value::String("yes".into()));
    assert_eq!(eval("return if (false) { return \"yes\" }"), Value::Null);
    assert_eq!(eval("return if (true) { let x = 1 }"), Value::Null);
}

// === arrow targets ===

#[test]
fn arrow_target_binds_single_name() {
    assert_eq!(eval("1 + 2 -> x\nreturn x"), Value::Number(3.0));
}

#[test]
fn arrow_target_wraps_nested_records() {
    let value = eval("5 -> a.b.c\nreturn a");
    assert_eq!(as_json(&value), r#"{"b":{"c":5}}"#);
    assert_eq!(eval("5 -> a.b.c\nreturn a.b.c"), Value::Number(5.0));
}

// === iteration ===

#[test]
fn for_collects_body_values() {
    assert_eq!(
        eval("return for { in: [1, 2, 3], as: \"n\" } { return n * n }"),
        Value::List(vec![Value::Number(1.0), Value::Number(4.0), Value::Number(9.0)])
    );
}

#[test]
fn for_over_non_list_fails() {
    assert_eq!(fail("return for { in: 5, as: \"n\" } { return n }").code, ErrorCode::ForNotList);
}

#[test]
fn filter_block_keeps_truthy_predicates() {
    assert_eq!(
        eval("return filter { in: [1, 2, 3], as: \"n\" } { return n > 1 }"),
        Value::List(vec![Value::Number(2.0), Value::Number(3.0)])
    );
}

#[test]
fn filter_block_unwraps_record_predicates_by_first_field() {
    assert_eq!(
        eval("return filter { in: [1, 2, 3], as: \"n\" } { return { ok: n > 1, note: \"ignored\" } }"),
        Value::List(vec![Value::Number(2.0), Value::Number(3.0)])
    );
}

#[test]
fn loop_threads_the_accumulator() {
    assert_eq!(eval("return loop { init: 1, times: 4, as: \"acc\" } { return acc * 2 }"), Value::Number(16.0));
}

#[test]
fn loop_with_zero_times_yields_init() {
    assert_eq!(eval("return loop { init: \"seed\", times: 0, as: \"acc\" } { return 0 }"), Value::String("seed".into()));
}

#[test]
fn loop_times_must_be_a_non_negative_integer() {
    assert_eq!(fail("return loop { init: 0, times: 1.5, as: \"a\" } { return a }").code, ErrorCode::Type);
    assert_eq!(fail("return loop { init: 0, times: -1, as: \"a\" } { return a }").code, ErrorCode::Type);
}

// === match and try ===

#[test]
fn match_prefers_ok_over_err() {
    let src = "let r = { ok: 1, err: 2 }\nreturn match (r) { ok { v } { return v } err { e } { return e } }";
    assert_eq!(eval(src), Value::Number(1.0));
}

#[test]
fn match_without_matching_arm_fails() {
    assert_eq!(
        fail("return match ({ other: 1 }) { ok { v } { return v } }").code,
        ErrorCode::MatchNoArm
    );
    assert_eq!(
        fail("return match ({ err: 1 }) { ok { v } { return v } }").code,
        ErrorCode::MatchNoArm
    );
}

#[test]
fn match_on_non_record_fails() {
    assert_eq!(fail("return match ([1]) { ok { v } { return v } }").code, ErrorCode::MatchNotRecord);
}

#[test]
fn try_passes_through_success() {
    assert_eq!(eval("return try { return 9 } catch e { return 0 }"), Value::Number(9.0));
}

#[test]
fn catch_binding_exposes_code_and_message() {
    let src = "return try { return nope { } } catch e { return e.code + \": \" + e.message }";
    assert_eq!(eval(src), Value::String("E_UNKNOWN_FN: unknown function `nope`".into()));
}

#[test]
fn try_catches_budget_errors() {
    let src = "budget { maxIterations: 1 }\n\
               return try { return for { in: [1, 2], as: \"n\" } { return n } } catch e { return e.code }";
    assert_eq!(eval(src), Value::String("E_BUDGET".into()));
}

#[test]
fn evidence_survives_a_caught_failure() {
    let src = "check { that: true, msg: \"before\" }\n\
               return try { assert { that: false, msg: \"inner\" } return 0 } catch e { return e.code }";
    let outcome = run(src).unwrap();
    assert_eq!(outcome.value, Value::String("E_ASSERT".into()));
    let msgs: Vec<&str> = outcome.evidence.iter().map(|e| e.msg.as_str()).collect();
    assert_eq!(msgs, vec!["before", "inner"]);
}

// === functions ===

#[test]
fn missing_arguments_default_to_null() {
    let src = "fn pick { a, b } { return coalesce { in: [b, a] } }\nreturn pick { a: 7 }";
    assert_eq!(eval(src), Value::Number(7.0));
}

#[test]
fn recursion_through_the_top_level_closure() {
    let src = "fn fact { n } { return if { cond: n < 2, then: 1, else: n * fact { n: n - 1 } } }\n\
               return fact { n: 5 }";
    assert_eq!(eval(src), Value::Number(120.0));
}

#[test]
fn unknown_function_fails() {
    assert_eq!(fail("return nope { }").code, ErrorCode::UnknownFn);
}

#[test]
fn map_applies_a_user_function() {
    let src = "fn double { x } { return x * 2 }\nreturn map { in: [1, 2, 3], fn: \"double\" }";
    assert_eq!(
        eval(src),
        Value::List(vec![Value::Number(2.0), Value::Number(4.0), Value::Number(6.0)])
    );
}

#[test]
fn map_destructures_records_across_parameters() {
    let src = "fn add { a, b } { return a + b }\n\
               return map { in: [{ a: 1, b: 2 }, { a: 3, b: 4 }], fn: \"add\" }";
    assert_eq!(eval(src), Value::List(vec![Value::Number(3.0), Value::Number(7.0)]));
}

#[test]
fn map_binds_missing_destructured_fields_to_null() {
    let src = "fn first { a, b } { return coalesce { in: [b, a] } }\n\
               return map { in: [{ a: 5 }], fn: \"first\" }";
    assert_eq!(eval(src), Value::List(vec![Value::Number(5.0)]));
}

#[test]
fn reduce_folds_with_a_two_parameter_function() {
    let src = "fn add { acc, n } { return acc + n }\nreturn reduce { in: [1, 2, 3, 4], init: 0, fn: \"add\" }";
    assert_eq!(eval(src), Value::Number(10.0));
}

#[test]
fn reduce_requires_exactly_two_parameters() {
    let src = "fn one { a } { return a }\nreturn reduce { in: [1], init: 0, fn: \"one\" }";
    assert_eq!(fail(src).code, ErrorCode::Type);
}

#[test]
fn assert_expression_value_can_be_captured() {
    let src = "check { that: 1 < 2, msg: \"m\" } -> c\nreturn c";
    let value = eval(src);
    assert_eq!(as_json(&value), r#"{"kind":"check","ok":true,"msg":"m"}"#);
}
