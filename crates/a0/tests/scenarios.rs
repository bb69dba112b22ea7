//! End-to-end scenarios exercising the documented language behavior.

use a0::{
    CancelToken, ErrorCode, ExecOptions, Outcome, Runner, RuntimeError, StdlibRegistry, ToolRegistry, Value,
    capability::CapabilitySet,
};
use pretty_assertions::assert_eq;

fn run(src: &str) -> Result<Outcome, RuntimeError> {
    run_with_caps(src, CapabilitySet::unrestricted())
}

fn run_with_caps(src: &str, caps: CapabilitySet) -> Result<Outcome, RuntimeError> {
    let tools = ToolRegistry::new();
    let stdlib = StdlibRegistry::with_defaults();
    let runner = Runner::new(src, "test.a0", &tools).expect("program should validate");
    runner.execute(ExecOptions::new(&tools, &stdlib).with_caps(caps), &CancelToken::new())
}

fn eval(src: &str) -> Value {
    run(src).expect("program should succeed").value
}

#[test]
fn arithmetic_precedence() {
    assert_eq!(eval("return 2 + 3 * 4"), Value::Number(14.0));
    assert_eq!(eval("return (2 + 3) * 4"), Value::Number(20.0));
}

#[test]
fn capability_denied_by_policy() {
    let err = run_with_caps(
        "cap { fs.read: true }\nreturn \"x\"",
        CapabilitySet::new(["http.get"]),
    )
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::CapDenied);
    assert_eq!(err.code.exit_status(), 3);
    assert!(err.evidence.is_empty());
}

#[test]
fn iteration_budget_exhausts_after_three_elements() {
    let err = run("budget { maxIterations: 3 }\nreturn for { in: [1, 2, 3, 4, 5], as: \"n\" } { return n }")
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Budget);
    assert!(err.message.contains("iteration budget"), "message: {}", err.message);
    assert!(err.evidence.is_empty());
    assert_eq!(err.code.exit_status(), 4);
}

#[test]
fn try_catches_division_by_zero() {
    let outcome = run("return try { return 1 / 0 } catch e { return e.code }").unwrap();
    assert_eq!(outcome.value, Value::String("E_TYPE".into()));
    assert!(outcome.evidence.is_empty());
}

#[test]
fn match_selects_err_arm() {
    let src = "let r = { err: \"boom\" }\nreturn match (r) { ok { v } { return v } err { e } { return e } }";
    assert_eq!(eval(src), Value::String("boom".into()));
}

#[test]
fn assert_halts_and_preserves_evidence() {
    let src = "check { that: true, msg: \"a\" }\n\
               check { that: false, msg: \"b\" }\n\
               assert { that: false, msg: \"c\" }\n\
               return \"unreached\"";
    let err = run(src).unwrap_err();
    assert_eq!(err.code, ErrorCode::Assert);
    assert_eq!(err.message, "assertion failed: c");
    assert_eq!(err.code.exit_status(), 5);
    let flags: Vec<(bool, &str)> = err.evidence.iter().map(|e| (e.ok, e.msg.as_str())).collect();
    assert_eq!(flags, vec![(true, "a"), (false, "b"), (false, "c")]);
}

#[test]
fn failed_check_flips_exit_status_without_halting() {
    let src = "check { that: true, msg: \"a\" }\n\
               check { that: false, msg: \"b\" }\n\
               return \"unreached\"";
    let outcome = run(src).unwrap();
    assert_eq!(outcome.value, Value::String("unreached".into()));
    assert!(outcome.has_failed_checks());
    assert_eq!(outcome.exit_status(), 5);
}

#[test]
fn user_function_captures_declaration_scope() {
    let src = "let m = 10\nfn scale { x } { return x * m }\nreturn scale { x: 5 }";
    assert_eq!(eval(src), Value::Number(50.0));
}

#[test]
fn closure_sees_captured_scope_not_call_site() {
    // The call site shadows `m` in a child scope; the function body still
    // resolves `m` through its declaration-site closure.
    let src = "let m = 10\n\
               fn scale { x } { return x * m }\n\
               let r = if (true) { let m = 99 return scale { x: 5 } }\n\
               return r";
    assert_eq!(eval(src), Value::Number(50.0));
}

#[test]
fn pure_programs_are_deterministic() {
    let src = "check { that: 1 < 2, msg: \"ord\" }\n\
               let xs = for { in: [1, 2, 3], as: \"n\" } { return n * n }\n\
               return { xs: xs, total: len { in: xs } }";
    let a = run(src).unwrap();
    let b = run(src).unwrap();
    assert_eq!(a.value, b.value);
    assert_eq!(a.evidence, b.evidence);
}
