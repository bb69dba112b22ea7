//! Static checks: every validator diagnostic and the scope rules.

use a0::{ErrorCode, Runner, SchemaType, ToolDef, ToolMode, ToolRegistry, Value};

fn codes(src: &str) -> Vec<ErrorCode> {
    codes_with(src, &ToolRegistry::new())
}

fn codes_with(src: &str, tools: &ToolRegistry) -> Vec<ErrorCode> {
    match Runner::new(src, "test.a0", tools) {
        Ok(_) => Vec::new(),
        Err(diags) => diags.iter().map(|d| d.code).collect(),
    }
}

fn sample_tools() -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(ToolDef::new("fs.read", ToolMode::Read, "fs.read", |_, _| Ok(Value::Null)));
    tools.register(
        ToolDef::new("sh.exec", ToolMode::Effect, "sh.exec", |_, _| Ok(Value::Null))
            .with_schema(a0::InputSchema::new().required("cmd", SchemaType::String)),
    );
    tools
}

#[test]
fn function_bodies_must_end_in_return() {
    assert_eq!(codes("fn f { } { let x = 1 }\nreturn 1"), vec![ErrorCode::NoReturn]);
    assert_eq!(codes("fn f { } { }\nreturn 1"), vec![ErrorCode::NoReturn]);
    assert_eq!(codes("fn f { x } { return x }\nreturn f { x: 1 }"), vec![]);
}

#[test]
fn return_must_be_terminal() {
    assert_eq!(codes("return 1\nreturn 2"), vec![ErrorCode::ReturnNotLast]);
    // A non-terminal return also leaves the function body without a
    // terminal one, so both findings surface.
    assert_eq!(
        codes("fn f { } { return 1 let x = 2 }\nreturn 1"),
        vec![ErrorCode::ReturnNotLast, ErrorCode::NoReturn]
    );
}

#[test]
fn unknown_capability_key() {
    assert_eq!(codes("cap { nope: true }\nreturn 1"), vec![ErrorCode::UnknownCap]);
    assert_eq!(codes("cap { fs.read: true }\nreturn 1"), vec![]);
}

#[test]
fn capability_flags_must_be_boolean_literals() {
    assert_eq!(codes("cap { fs.read: 1 }\nreturn 1"), vec![ErrorCode::UnknownCap]);
}

#[test]
fn unknown_or_non_integer_budget_fields() {
    assert_eq!(codes("budget { nope: 1 }\nreturn 1"), vec![ErrorCode::UnknownBudget]);
    assert_eq!(codes("budget { timeMs: \"x\" }\nreturn 1"), vec![ErrorCode::UnknownBudget]);
    assert_eq!(codes("budget { timeMs: 1.5 }\nreturn 1"), vec![ErrorCode::UnknownBudget]);
    assert_eq!(codes("budget { timeMs: -1 }\nreturn 1"), vec![ErrorCode::UnknownBudget]);
    assert_eq!(codes("budget { timeMs: 100, maxIterations: 5 }\nreturn 1"), vec![]);
}

#[test]
fn duplicate_bindings_in_one_block() {
    assert_eq!(codes("let x = 1\nlet x = 2\nreturn x"), vec![ErrorCode::DupBinding]);
    assert_eq!(
        codes("let f = 1\nfn f { } { return 1 }\nreturn f"),
        vec![ErrorCode::DupBinding]
    );
}

#[test]
fn shadowing_in_a_child_block_is_allowed() {
    assert_eq!(codes("let x = 1\nreturn if (true) { let x = 2 return x }"), vec![]);
}

#[test]
fn duplicate_function_names_program_wide() {
    let found = codes("fn f { } { return 1 }\nfn f { } { return 2 }\nreturn 1");
    assert!(found.contains(&ErrorCode::FnDup), "found: {found:?}");
}

#[test]
fn duplicate_parameters() {
    assert_eq!(codes("fn f { a, a } { return a }\nreturn 1"), vec![ErrorCode::DupBinding]);
}

#[test]
fn unbound_names() {
    assert_eq!(codes("return y"), vec![ErrorCode::Unbound]);
    assert_eq!(codes("let x = x"), vec![ErrorCode::Unbound]);
}

#[test]
fn bindings_are_visible_in_nested_bodies() {
    assert_eq!(
        codes("let base = 10\nreturn for { in: [1], as: \"n\" } { return n + base }"),
        vec![]
    );
}

#[test]
fn loop_bindings_do_not_escape_their_body() {
    assert_eq!(
        codes("let l = for { in: [1], as: \"n\" } { return n }\nreturn n"),
        vec![ErrorCode::Unbound]
    );
    assert_eq!(
        codes("let l = filter { in: [1], as: \"k\" } { return k }\nreturn k"),
        vec![ErrorCode::Unbound]
    );
    assert_eq!(
        codes("let l = loop { init: 0, times: 1, as: \"acc\" } { return acc }\nreturn acc"),
        vec![ErrorCode::Unbound]
    );
}

#[test]
fn match_and_catch_bindings_do_not_escape() {
    assert_eq!(
        codes("let m = match ({ ok: 1 }) { ok { v } { return v } }\nreturn v"),
        vec![ErrorCode::Unbound]
    );
    assert_eq!(
        codes("let t = try { return 1 } catch e { return 2 }\nreturn e"),
        vec![ErrorCode::Unbound]
    );
}

#[test]
fn arrow_targets_bind_for_later_statements() {
    assert_eq!(codes("1 + 2 -> x\nreturn x"), vec![]);
}

#[test]
fn call_effect_is_static_when_the_tool_is_known() {
    let tools = sample_tools();
    assert_eq!(
        codes_with("cap { sh.exec: true }\nreturn call? sh.exec { cmd: \"ls\" }", &tools),
        vec![ErrorCode::CallEffect]
    );
    assert_eq!(
        codes_with("cap { sh.exec: true }\nreturn do sh.exec { cmd: \"ls\" }", &tools),
        vec![]
    );
}

#[test]
fn tools_need_their_capability_declared() {
    let tools = sample_tools();
    assert_eq!(
        codes_with("return call? fs.read { path: \"x\" }", &tools),
        vec![ErrorCode::UndeclaredCap]
    );
    assert_eq!(
        codes_with("cap { fs.read: true }\nreturn call? fs.read { path: \"x\" }", &tools),
        vec![]
    );
}

#[test]
fn unknown_tools_are_left_for_runtime() {
    assert_eq!(codes("return call? nosuch.tool { }"), vec![]);
}

#[test]
fn all_findings_are_reported_together() {
    let found = codes("let x = 1\nlet x = 2\nreturn y");
    assert_eq!(found, vec![ErrorCode::DupBinding, ErrorCode::Unbound]);
}
