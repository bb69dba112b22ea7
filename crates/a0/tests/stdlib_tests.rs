//! The default standard-library function set, exercised through programs.

use a0::{CancelToken, ErrorCode, ExecOptions, Runner, RuntimeError, StdlibRegistry, ToolRegistry, Value};
use pretty_assertions::assert_eq;

fn run(src: &str) -> Result<Value, RuntimeError> {
    let tools = ToolRegistry::new();
    let stdlib = StdlibRegistry::with_defaults();
    let runner = Runner::new(src, "test.a0", &tools).expect("program should validate");
    runner
        .execute(ExecOptions::new(&tools, &stdlib), &CancelToken::new())
        .map(|outcome| outcome.value)
}

fn eval(src: &str) -> Value {
    run(src).expect("program should succeed")
}

fn eval_json(src: &str) -> String {
    serde_json::to_string(&eval(src)).unwrap()
}

fn numbers(values: &[f64]) -> Value {
    Value::List(values.iter().copied().map(Value::Number).collect())
}

#[test]
fn logic_helpers() {
    assert_eq!(eval("return eq { a: { x: [1] }, b: { x: [1] } }"), Value::Bool(true));
    assert_eq!(eval("return eq { a: 1, b: \"1\" }"), Value::Bool(false));
    assert_eq!(eval("return not { v: 0 }"), Value::Bool(true));
    assert_eq!(eval("return and { a: 1, b: \"\" }"), Value::Bool(false));
    assert_eq!(eval("return or { a: 0, b: [] }"), Value::Bool(true));
}

#[test]
fn coalesce_picks_the_first_non_null() {
    assert_eq!(eval("return coalesce { in: [null, null, 3, 4] }"), Value::Number(3.0));
    assert_eq!(eval("return coalesce { in: [null] }"), Value::Null);
}

#[test]
fn contains_on_lists_strings_and_records() {
    assert_eq!(eval("return contains { in: [1, 2], value: 2 }"), Value::Bool(true));
    assert_eq!(eval("return contains { in: \"hello\", value: \"ell\" }"), Value::Bool(true));
    assert_eq!(eval("return contains { in: { a: 1 }, value: \"a\" }"), Value::Bool(true));
    assert_eq!(eval("return contains { in: { a: 1 }, value: \"b\" }"), Value::Bool(false));
}

#[test]
fn typeof_names_every_variant() {
    assert_eq!(eval("return typeof { v: null }"), Value::String("null".into()));
    assert_eq!(eval("return typeof { v: [1] }"), Value::String("list".into()));
    assert_eq!(eval("return typeof { v: { } }"), Value::String("record".into()));
}

#[test]
fn len_counts_characters_not_bytes() {
    assert_eq!(eval("return len { in: [1, 2, 3] }"), Value::Number(3.0));
    assert_eq!(eval("return len { in: { a: 1 } }"), Value::Number(1.0));
    assert_eq!(eval("return len { in: \"héllo\" }"), Value::Number(5.0));
}

#[test]
fn get_returns_default_when_absent() {
    assert_eq!(eval("return get { in: { a: 1 }, key: \"a\" }"), Value::Number(1.0));
    assert_eq!(eval("return get { in: { }, key: \"a\" }"), Value::Null);
    assert_eq!(eval("return get { in: [1, 2], index: 1 }"), Value::Number(2.0));
    assert_eq!(eval("return get { in: [1, 2], index: 9, default: \"d\" }"), Value::String("d".into()));
}

#[test]
fn put_updates_without_reordering() {
    assert_eq!(
        eval_json("return put { in: { b: 1, a: 2 }, key: \"b\", value: 9 }"),
        r#"{"b":9,"a":2}"#
    );
}

#[test]
fn list_building_helpers() {
    assert_eq!(eval("return append { in: [1], value: 2 }"), numbers(&[1.0, 2.0]));
    assert_eq!(eval("return concat { a: [1], b: [2, 3] }"), numbers(&[1.0, 2.0, 3.0]));
    assert_eq!(eval("return flat { in: [[1, 2], [3], 4] }"), numbers(&[1.0, 2.0, 3.0, 4.0]));
    assert_eq!(eval("return unique { in: [1, 2, 1, 3, 2] }"), numbers(&[1.0, 2.0, 3.0]));
}

#[test]
fn sort_numbers_strings_and_by_field() {
    assert_eq!(eval("return sort { in: [3, 1, 2] }"), numbers(&[1.0, 2.0, 3.0]));
    assert_eq!(
        eval_json("return sort { in: [\"b\", \"a\"] }"),
        r#"["a","b"]"#
    );
    assert_eq!(
        eval_json("return sort { in: [{ n: 2 }, { n: 1 }], by: \"n\" }"),
        r#"[{"n":1},{"n":2}]"#
    );
    assert_eq!(run("return sort { in: [1, \"a\"] }").unwrap_err().code, ErrorCode::Fn);
}

#[test]
fn stdlib_filter_keeps_truthy_fields() {
    assert_eq!(
        eval_json("return filter { in: [{ keep: true, v: 1 }, { keep: false, v: 2 }, { v: 3 }], by: \"keep\" }"),
        r#"[{"keep":true,"v":1}]"#
    );
}

#[test]
fn find_by_field_or_value() {
    assert_eq!(
        eval_json("return find { in: [{ id: 1 }, { id: 2 }], by: \"id\", value: 2 }"),
        r#"{"id":2}"#
    );
    assert_eq!(eval("return find { in: [1, 2, 3], value: 2 }"), Value::Number(2.0));
    assert_eq!(eval("return find { in: [1], value: 9 }"), Value::Null);
}

#[test]
fn range_defaults_and_steps() {
    assert_eq!(eval("return range { to: 3 }"), numbers(&[0.0, 1.0, 2.0]));
    assert_eq!(eval("return range { from: 2, to: 8, step: 3 }"), numbers(&[2.0, 5.0]));
    assert_eq!(eval("return range { to: 0 }"), Value::List(vec![]));
}

#[test]
fn join_and_pluck() {
    assert_eq!(eval("return join { in: [1, \"b\", true], sep: \"-\" }"), Value::String("1-b-true".into()));
    assert_eq!(
        eval_json("return pluck { in: [{ a: 1 }, { b: 2 }], key: \"a\" }"),
        "[1,null]"
    );
}

#[test]
fn record_views() {
    assert_eq!(eval_json("return keys { in: { b: 1, a: 2 } }"), r#"["b","a"]"#);
    assert_eq!(eval_json("return values { in: { b: 1, a: 2 } }"), "[1,2]");
    assert_eq!(
        eval_json("return entries { in: { a: 1 } }"),
        r#"[{"key":"a","value":1}]"#
    );
}

#[test]
fn merge_appends_and_overwrites_in_place() {
    assert_eq!(
        eval_json("return merge { a: { x: 1, y: 2 }, b: { y: 9, z: 3 } }"),
        r#"{"x":1,"y":9,"z":3}"#
    );
}

#[test]
fn patch_merges_recursively_and_null_removes() {
    assert_eq!(
        eval_json("return patch { in: { a: { x: 1, y: 2 }, b: 3 }, patch: { a: { y: 9 }, b: null, c: 4 } }"),
        r#"{"a":{"x":1,"y":9},"c":4}"#
    );
}

#[test]
fn parse_json_preserves_object_order() {
    assert_eq!(
        eval_json("return keys { in: parse.json { in: \"{\\\"z\\\":1,\\\"a\\\":2}\" } }"),
        r#"["z","a"]"#
    );
    assert_eq!(run("return parse.json { in: \"nope{\" }").unwrap_err().code, ErrorCode::Fn);
}

#[test]
fn math_extrema() {
    assert_eq!(eval("return math.max { in: [1, 9, 4] }"), Value::Number(9.0));
    assert_eq!(eval("return math.min { in: [1, 9, 4] }"), Value::Number(1.0));
    assert_eq!(run("return math.max { in: [] }").unwrap_err().code, ErrorCode::Fn);
}

#[test]
fn math_arithmetic_helpers() {
    assert_eq!(eval("return math.sum { in: [1, 2, 3.5] }"), Value::Number(6.5));
    assert_eq!(eval("return math.sum { in: [] }"), Value::Number(0.0));
    assert_eq!(eval("return math.abs { v: -4 }"), Value::Number(4.0));
    assert_eq!(eval("return math.floor { v: 2.7 }"), Value::Number(2.0));
    assert_eq!(eval("return math.ceil { v: 2.1 }"), Value::Number(3.0));
    assert_eq!(eval("return math.round { v: 2.5 }"), Value::Number(3.0));
}

#[test]
fn reverse_and_slice() {
    assert_eq!(eval("return reverse { in: [1, 2, 3] }"), numbers(&[3.0, 2.0, 1.0]));
    assert_eq!(eval("return slice { in: [1, 2, 3, 4], from: 1, to: 3 }"), numbers(&[2.0, 3.0]));
    assert_eq!(eval("return slice { in: [1, 2], to: 9 }"), numbers(&[1.0, 2.0]));
    assert_eq!(eval("return slice { in: [1, 2], from: 2 }"), Value::List(vec![]));
}

#[test]
fn string_case_and_trim() {
    assert_eq!(eval("return str.lower { in: \"AbC\" }"), Value::String("abc".into()));
    assert_eq!(eval("return str.upper { in: \"AbC\" }"), Value::String("ABC".into()));
    assert_eq!(eval("return str.trim { in: \"  x \" }"), Value::String("x".into()));
}

#[test]
fn string_helpers() {
    assert_eq!(eval("return str.concat { in: [\"a\", 1, true] }"), Value::String("a1true".into()));
    assert_eq!(eval_json("return str.split { in: \"a,b,,c\", sep: \",\" }"), r#"["a","b","","c"]"#);
    assert_eq!(eval("return str.starts { in: \"abc\", prefix: \"ab\" }"), Value::Bool(true));
    assert_eq!(eval("return str.ends { in: \"abc\", suffix: \"bc\" }"), Value::Bool(true));
    assert_eq!(
        eval("return str.replace { in: \"a-b-c\", from: \"-\", to: \"+\" }"),
        Value::String("a+b+c".into())
    );
}

#[test]
fn string_templates_fill_known_placeholders() {
    assert_eq!(
        eval("return str.template { in: \"{greeting}, {name}! {missing}\", vars: { greeting: \"hi\", name: \"a0\" } }"),
        Value::String("hi, a0! {missing}".into())
    );
}

#[test]
fn path_helpers() {
    assert_eq!(
        eval("return path.join { in: [\"/srv\", \"data/\", \"file.json\"] }"),
        Value::String("/srv/data/file.json".into())
    );
    assert_eq!(eval("return path.base { in: \"/a/b/c.txt\" }"), Value::String("c.txt".into()));
    assert_eq!(eval("return path.dir { in: \"/a/b/c.txt\" }"), Value::String("/a/b".into()));
    assert_eq!(eval("return path.ext { in: \"/a/b/c.tar.gz\" }"), Value::String("gz".into()));
    assert_eq!(eval("return path.ext { in: \"/a/b/noext\" }"), Value::String("".into()));
}

#[test]
fn stdlib_errors_wrap_as_e_fn_with_the_function_name() {
    let err = run("return len { in: 5 }").unwrap_err();
    assert_eq!(err.code, ErrorCode::Fn);
    assert!(err.message.starts_with("len:"), "message: {}", err.message);
}
