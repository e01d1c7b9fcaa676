use assert_cmd::Command;
use cache_js::Cache;
use serde_json::json;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;
use tree_js::NodeKind;
use tree_js::Tree;

fn rename_js_cli() -> Command {
  Command::cargo_bin("rename-js").unwrap()
}

fn parse_stdout_json(stdout: &[u8]) -> Value {
  serde_json::from_slice(stdout).expect("stdout should be valid JSON")
}

/// var total; function sum(values) { var acc; return reduce(values, acc, total); }
fn write_sample(path: &Path) {
  let tree = json!({
    "type": "script",
    "children": [
      {"type": "var", "children": [{"type": "declaration", "name": "total"}]},
      {"type": "function", "name": "sum", "children": [
        {"type": "list", "rel": "params", "children": [{"type": "identifier", "value": "values"}]},
        {"type": "script", "rel": "body", "children": [
          {"type": "var", "children": [{"type": "declaration", "name": "acc"}]},
          {"type": "return", "children": [{"type": "call", "children": [
            {"type": "identifier", "value": "reduce"},
            {"type": "list", "children": [
              {"type": "identifier", "value": "values"},
              {"type": "identifier", "value": "acc"},
              {"type": "identifier", "value": "total"}
            ]}
          ]}]}
        ]}
      ]}
    ]
  });
  std::fs::write(path, serde_json::to_vec(&tree).unwrap()).unwrap();
}

#[test]
fn renames_locals_and_keeps_globals() {
  let dir = tempdir().unwrap();
  let input = dir.path().join("sum.json");
  write_sample(&input);

  let assert = rename_js_cli()
    .timeout(Duration::from_secs(5))
    .arg("--input")
    .arg(&input)
    .assert()
    .success();

  let output = parse_stdout_json(&assert.get_output().stdout);
  let func = &output["children"][1];
  assert_eq!(func["name"], "sum");
  assert_eq!(func["children"][0]["children"][0]["value"], "a");
  let body = &func["children"][1];
  assert_eq!(body["children"][0]["children"][0]["name"], "b");
  let args = &body["children"][1]["children"][0]["children"][1]["children"];
  assert_eq!(args[0]["value"], "a");
  assert_eq!(args[1]["value"], "b");
  assert_eq!(args[2]["value"], "total");
  assert_eq!(output["children"][0]["children"][0]["name"], "total");
}

#[test]
fn second_run_is_served_from_cache() {
  let dir = tempdir().unwrap();
  let input = dir.path().join("sum.json");
  let cache_dir = dir.path().join("cache");
  write_sample(&input);

  let run = || {
    rename_js_cli()
      .timeout(Duration::from_secs(10))
      .env("RUST_LOG", "rename_js=debug")
      .arg("--input")
      .arg(&input)
      .arg("--cache-dir")
      .arg(&cache_dir)
      .assert()
      .success()
  };

  let first = run();
  let first_stderr = String::from_utf8_lossy(&first.get_output().stderr).into_owned();
  assert!(first_stderr.contains("cache miss"), "stderr: {first_stderr}");

  let second = run();
  let second_stderr = String::from_utf8_lossy(&second.get_output().stderr).into_owned();
  assert!(second_stderr.contains("cache hit"), "stderr: {second_stderr}");

  assert_eq!(
    parse_stdout_json(&first.get_output().stdout),
    parse_stdout_json(&second.get_output().stdout)
  );
}

#[test]
fn writes_to_output_file() {
  let dir = tempdir().unwrap();
  let input = dir.path().join("sum.json");
  let output = dir.path().join("out.json");
  write_sample(&input);

  rename_js_cli()
    .timeout(Duration::from_secs(5))
    .arg("--input")
    .arg(&input)
    .arg("--output")
    .arg(&output)
    .arg("--pretty")
    .assert()
    .success();

  let written: Value = serde_json::from_slice(&std::fs::read(&output).unwrap()).unwrap();
  assert_eq!(written["type"], "script");
  assert_eq!(written["children"][1]["name"], "sum");
}

#[test]
fn malformed_tree_fails() {
  let dir = tempdir().unwrap();
  let input = dir.path().join("broken.json");
  std::fs::write(&input, "{\"children\": []}").unwrap();

  let assert = rename_js_cli()
    .timeout(Duration::from_secs(5))
    .arg("--input")
    .arg(&input)
    .assert()
    .failure()
    .code(1);

  let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
  assert!(stderr.contains("is not a valid tree"), "stderr: {stderr}");
}

#[test]
fn parser_attributes_survive_renaming_and_cache() {
  let dir = tempdir().unwrap();
  let input = dir.path().join("inc.json");
  let cache_dir = dir.path().join("cache");
  // function inc(count) { count += 1; }
  let tree = json!({
    "type": "script",
    "children": [
      {"type": "function", "name": "inc", "line": 1, "children": [
        {"type": "list", "rel": "params", "children": [{"type": "identifier", "value": "count"}]},
        {"type": "script", "rel": "body", "children": [
          {"type": "assign", "assignOp": "plus", "line": 1, "children": [
            {"type": "identifier", "value": "count"},
            {"type": "number", "value": "1"}
          ]}
        ]}
      ]}
    ]
  });
  std::fs::write(&input, serde_json::to_vec(&tree).unwrap()).unwrap();

  let run = || {
    rename_js_cli()
      .timeout(Duration::from_secs(10))
      .arg("--input")
      .arg(&input)
      .arg("--cache-dir")
      .arg(&cache_dir)
      .assert()
      .success()
  };

  for assert in [run(), run()] {
    let output = parse_stdout_json(&assert.get_output().stdout);
    let func = &output["children"][0];
    assert_eq!(func["line"], 1);
    let assign = &func["children"][1]["children"][0];
    assert_eq!(assign["assignOp"], "plus");
    assert_eq!(assign["line"], 1);
    assert_eq!(assign["children"][0]["value"], "a");
    assert_eq!(assign["children"][1]["value"], "1");
  }
}

#[test]
fn cache_from_another_renamer_version_is_not_used() {
  let dir = tempdir().unwrap();
  let input = dir.path().join("sum.json");
  let cache_dir = dir.path().join("cache");
  write_sample(&input);

  // Fresh entry under the right key, written by some other producer.
  let key = format!(
    "optimized:{}",
    std::fs::canonicalize(&input).unwrap().display()
  );
  let mut cache = Cache::<Tree>::open_with_version(&cache_dir, "symbol-js@0.0.0").unwrap();
  cache.store(&key, Tree::new(NodeKind::Script)).unwrap();
  cache.close().unwrap();
  drop(cache);

  let assert = rename_js_cli()
    .timeout(Duration::from_secs(10))
    .env("RUST_LOG", "rename_js=debug")
    .arg("--input")
    .arg(&input)
    .arg("--cache-dir")
    .arg(&cache_dir)
    .assert()
    .success();

  let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
  assert!(stderr.contains("cache miss"), "stderr: {stderr}");
  let output = parse_stdout_json(&assert.get_output().stdout);
  assert_eq!(output["children"][1]["name"], "sum");
}
