#![allow(dead_code)]

use serde_json::json;
use serde_json::Value;
use tree_js::NodeId;
use tree_js::NodeKind;
use tree_js::SourceNode;
use tree_js::Tree;

pub fn tree(root: Value) -> Tree {
  let source: SourceNode = serde_json::from_value(root).expect("valid source tree");
  Tree::from_source(&source)
}

pub fn script(children: Vec<Value>) -> Value {
  json!({"type": "script", "children": children})
}

pub fn function(name: &str, params: &[&str], body: Vec<Value>) -> Value {
  let params: Vec<Value> = params.iter().map(|p| id(p)).collect();
  json!({
    "type": "function",
    "name": name,
    "children": [
      {"type": "list", "rel": "params", "children": params},
      {"type": "script", "rel": "body", "children": body}
    ]
  })
}

pub fn var(names: &[&str]) -> Value {
  let decls: Vec<Value> = names
    .iter()
    .map(|n| json!({"type": "declaration", "name": n}))
    .collect();
  json!({"type": "var", "children": decls})
}

pub fn id(name: &str) -> Value {
  json!({"type": "identifier", "value": name})
}

/// `object.property`
pub fn dot(object: Value, property: &str) -> Value {
  json!({"type": "dot", "children": [object, id(property)]})
}

pub fn call(callee: Value, args: Vec<Value>) -> Value {
  json!({"type": "call", "children": [callee, {"type": "list", "children": args}]})
}

pub fn ret(value: Value) -> Value {
  json!({"type": "return", "children": [value]})
}

pub fn number(value: &str) -> Value {
  json!({"type": "number", "value": value})
}

/// Nodes of `kind` whose `name` or `value` currently equals `text`, in allocation order.
pub fn find(tree: &Tree, kind: NodeKind, text: &str) -> Vec<NodeId> {
  tree
    .ids()
    .filter(|id| tree.kind(*id) == &kind)
    .filter(|id| tree.name(*id) == Some(text) || tree.value(*id) == Some(text))
    .collect()
}

pub fn find_one(tree: &Tree, kind: NodeKind, text: &str) -> NodeId {
  let found = find(tree, kind.clone(), text);
  assert_eq!(found.len(), 1, "expected exactly one {kind} named {text}");
  found[0]
}

/// The body `script` of the function named `name`.
pub fn body_of(tree: &Tree, name: &str) -> NodeId {
  let func = find_one(tree, NodeKind::Function, name);
  tree
    .children(func)
    .iter()
    .copied()
    .find(|c| tree.rel(*c) == Some("body"))
    .expect("function body")
}

pub fn text(tree: &Tree, id: NodeId) -> &str {
  tree.name(id).or(tree.value(id)).expect("named node")
}
