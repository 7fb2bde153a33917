use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(tag: &str) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("fnexpr-cli-{tag}-{}-{ts}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn fnexpr(tag: &str, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fnexpr"))
        .args(args)
        .current_dir(temp_dir(tag))
        .env_remove("FNEXPR_LOG")
        .output()
        .expect("spawn fnexpr")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn eval_prints_one_line_per_element() {
    let out = fnexpr("eval", &["eval", "x * 2 + 1", "--var", "x:int=1,2,3"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "3\n5\n7\n");
}

#[test]
fn eval_converts_to_the_requested_output() {
    let out = fnexpr("output", &["eval", "1 + 2", "--output", "string", "--batch", "2"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "3\n3\n");
}

#[test]
fn eval_reads_the_nearest_config() {
    let root = temp_dir("config");
    let nested = root.join("a").join("b");
    std::fs::create_dir_all(&nested).expect("create nested dir");
    std::fs::write(
        root.join("fnexpr.toml"),
        "output = \"float\"\n\n[[variables]]\nname = \"r\"\ntype = \"float\"\nvalues = [1.0, 2.0]\n\n[[constants]]\nname = \"k\"\ntype = \"float\"\nvalue = 0.5\n",
    )
    .expect("write config");

    let out = Command::new(env!("CARGO_BIN_EXE_fnexpr"))
        .args(["eval", "r * k"])
        .current_dir(&nested)
        .output()
        .expect("spawn fnexpr");
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "0.5\n1.0\n");
}

#[test]
fn unknown_identifier_is_reported_with_its_name() {
    let out = fnexpr("unknown", &["eval", "1 + missing"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("missing"), "{}", stderr(&out));
}

#[test]
fn not_implemented_functions_fail() {
    let out = fnexpr("unsupported", &["check", "pingpong(1.0, 2.0)"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("pingpong"), "{}", stderr(&out));
}

#[test]
fn graph_shows_nodes_and_result() {
    let out = fnexpr("graph", &["graph", "a + 1", "--var", "a:float=1"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("fn \"a+b\""), "{text}");
    assert!(text.contains("Result"), "{text}");
}

#[test]
fn check_reports_types_and_counts() {
    let out = fnexpr("check", &["check", "n + 0.5", "--var", "n:int=1", "--output", "string"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("type: float -> string"), "{text}");
    assert!(text.contains("conversions: 2"), "{text}");
}

#[test]
fn symbols_lists_builtins() {
    let out = fnexpr("symbols", &["symbols"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("functions:"));
    assert!(text.contains("  sqrt: sqrt(in In1: float, out Out1: float)"), "{text}");
    assert!(text.contains("  bool -> int"));
}

#[test]
fn bad_var_flag_is_a_config_error() {
    let out = fnexpr("badvar", &["eval", "x", "--var", "x=1"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("name:type=values"), "{}", stderr(&out));
}
