use crate::node::{Attributes, NodeId, NodeKind, Tree};
use serde::{Deserialize, Serialize};

/// Nested interchange form of a tree, as emitted by the parser side of the toolchain. Fields other
/// than the ones below are collected into `attributes` and written back as they were read:
///
/// ```json
/// {"type": "dot", "children": [{"type": "identifier", "value": "a"}, {"type": "identifier", "value": "b"}]}
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SourceNode {
  #[serde(rename = "type")]
  pub kind: NodeKind,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub value: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rel: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub children: Vec<SourceNode>,
  #[serde(flatten)]
  pub attributes: Attributes,
}

impl Tree {
  pub fn from_source(root: &SourceNode) -> Tree {
    let mut tree = Tree::new(root.kind.clone());
    let id = tree.root();
    copy_attributes(&mut tree, id, root);
    for child in root.children.iter() {
      append_source(&mut tree, id, child);
    }
    tree
  }

  pub fn to_source(&self) -> SourceNode {
    source_of(self, self.root())
  }
}

fn append_source(tree: &mut Tree, parent: NodeId, source: &SourceNode) {
  let id = match &source.rel {
    Some(rel) => tree.append_with_rel(parent, source.kind.clone(), rel),
    None => tree.append(parent, source.kind.clone()),
  };
  copy_attributes(tree, id, source);
  for child in source.children.iter() {
    append_source(tree, id, child);
  }
}

fn copy_attributes(tree: &mut Tree, id: NodeId, source: &SourceNode) {
  if let Some(name) = &source.name {
    tree.set_name(id, name.clone());
  }
  if let Some(value) = &source.value {
    tree.set_value(id, value.clone());
  }
  if !source.attributes.is_empty() {
    tree.set_attributes(id, source.attributes.clone());
  }
}

fn source_of(tree: &Tree, id: NodeId) -> SourceNode {
  let node = tree.node(id);
  SourceNode {
    kind: node.kind().clone(),
    name: node.name().map(str::to_string),
    value: node.value().map(str::to_string),
    rel: node.rel().map(str::to_string),
    children: node
      .children()
      .iter()
      .map(|child| source_of(tree, *child))
      .collect(),
    attributes: node.attributes().clone(),
  }
}
