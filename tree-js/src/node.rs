use serde::{Deserialize, Serialize};
use serde_json::Map;
use serde_json::Value;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Node kinds the renamer distinguishes. Any other kind produced by the parser is carried opaquely
/// under its textual tag so the tree can be written back out unchanged.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
  Script,
  Function,
  Declaration,
  Identifier,
  List,
  Dot,
  Other(String),
}

impl NodeKind {
  pub fn as_str(&self) -> &str {
    match self {
      NodeKind::Script => "script",
      NodeKind::Function => "function",
      NodeKind::Declaration => "declaration",
      NodeKind::Identifier => "identifier",
      NodeKind::List => "list",
      NodeKind::Dot => "dot",
      NodeKind::Other(tag) => tag,
    }
  }
}

impl From<&str> for NodeKind {
  fn from(tag: &str) -> Self {
    match tag {
      "script" => NodeKind::Script,
      "function" => NodeKind::Function,
      "declaration" => NodeKind::Declaration,
      "identifier" => NodeKind::Identifier,
      "list" => NodeKind::List,
      "dot" => NodeKind::Dot,
      other => NodeKind::Other(other.to_string()),
    }
  }
}

impl From<String> for NodeKind {
  fn from(tag: String) -> Self {
    match NodeKind::from(tag.as_str()) {
      NodeKind::Other(_) => NodeKind::Other(tag),
      known => known,
    }
  }
}

impl From<NodeKind> for String {
  fn from(kind: NodeKind) -> Self {
    match kind {
      NodeKind::Other(tag) => tag,
      known => known.as_str().to_string(),
    }
  }
}

impl Display for NodeKind {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Parser attributes the renamer does not interpret (`line`, `assignOp`, ...), kept verbatim.
pub type Attributes = Map<String, Value>;

/// Stable handle of a node within its owning [`Tree`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

impl Display for NodeId {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Node {
  kind: NodeKind,
  parent: Option<NodeId>,
  children: Vec<NodeId>,
  name: Option<String>,
  value: Option<String>,
  rel: Option<String>,
  // Only set on `function` nodes: the `list` child holding the formal parameters.
  params: Option<NodeId>,
  // Stored as JSON text so non-self-describing formats can encode the tree.
  #[serde(with = "attributes_text")]
  attributes: Attributes,
}

mod attributes_text {
  use super::Attributes;
  use serde::de::Error as _;
  use serde::ser::Error as _;
  use serde::Deserialize;
  use serde::Deserializer;
  use serde::Serializer;

  pub fn serialize<S: Serializer>(
    attributes: &Attributes,
    serializer: S,
  ) -> Result<S::Ok, S::Error> {
    let text = serde_json::to_string(attributes).map_err(S::Error::custom)?;
    serializer.serialize_str(&text)
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Attributes, D::Error> {
    let text = String::deserialize(deserializer)?;
    serde_json::from_str(&text).map_err(D::Error::custom)
  }
}

impl Node {
  fn new(kind: NodeKind, parent: Option<NodeId>, rel: Option<String>) -> Node {
    Node {
      kind,
      parent,
      children: Vec::new(),
      name: None,
      value: None,
      rel,
      params: None,
      attributes: Attributes::new(),
    }
  }

  pub fn kind(&self) -> &NodeKind {
    &self.kind
  }

  pub fn parent(&self) -> Option<NodeId> {
    self.parent
  }

  pub fn children(&self) -> &[NodeId] {
    &self.children
  }

  /// Binder of a `function` or `declaration`.
  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  /// Text of an `identifier`.
  pub fn value(&self) -> Option<&str> {
    self.value.as_deref()
  }

  /// Role of this node relative to its parent, e.g. `params` or `body`.
  pub fn rel(&self) -> Option<&str> {
    self.rel.as_deref()
  }

  pub fn params(&self) -> Option<NodeId> {
    self.params
  }

  pub fn attributes(&self) -> &Attributes {
    &self.attributes
  }
}

/// Arena of nodes. The root is always the first node; parent and child links are plain indices into
/// the arena.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Tree {
  nodes: Vec<Node>,
}

impl Tree {
  pub fn new(root: NodeKind) -> Tree {
    Tree {
      nodes: vec![Node::new(root, None, None)],
    }
  }

  pub fn root(&self) -> NodeId {
    NodeId(0)
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// All node handles in allocation order.
  pub fn ids(&self) -> impl Iterator<Item = NodeId> {
    (0..self.nodes.len() as u32).map(NodeId)
  }

  pub fn node(&self, id: NodeId) -> &Node {
    &self.nodes[id.index()]
  }

  pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
    self.push_child(parent, kind, None)
  }

  /// Appends a child playing the given role. A `params` child of a `function` also becomes that
  /// function's parameter list.
  pub fn append_with_rel(&mut self, parent: NodeId, kind: NodeKind, rel: &str) -> NodeId {
    let id = self.push_child(parent, kind, Some(rel.to_string()));
    let owner = &mut self.nodes[parent.index()];
    if rel == "params" && owner.kind == NodeKind::Function {
      owner.params = Some(id);
    }
    id
  }

  fn push_child(&mut self, parent: NodeId, kind: NodeKind, rel: Option<String>) -> NodeId {
    let id = NodeId(self.nodes.len() as u32);
    self.nodes.push(Node::new(kind, Some(parent), rel));
    self.nodes[parent.index()].children.push(id);
    id
  }

  pub fn kind(&self, id: NodeId) -> &NodeKind {
    &self.node(id).kind
  }

  pub fn parent(&self, id: NodeId) -> Option<NodeId> {
    self.node(id).parent
  }

  pub fn children(&self, id: NodeId) -> &[NodeId] {
    &self.node(id).children
  }

  pub fn rel(&self, id: NodeId) -> Option<&str> {
    self.node(id).rel()
  }

  pub fn name(&self, id: NodeId) -> Option<&str> {
    self.node(id).name()
  }

  pub fn value(&self, id: NodeId) -> Option<&str> {
    self.node(id).value()
  }

  pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) {
    self.nodes[id.index()].name = Some(name.into());
  }

  pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) {
    self.nodes[id.index()].value = Some(value.into());
  }

  pub fn attributes(&self, id: NodeId) -> &Attributes {
    &self.node(id).attributes
  }

  pub fn set_attributes(&mut self, id: NodeId, attributes: Attributes) {
    self.nodes[id.index()].attributes = attributes;
  }

  pub fn params(&self, function: NodeId) -> Option<NodeId> {
    self.node(function).params
  }

  /// The identifiers of a function's formal parameter list; empty when it has none.
  pub fn param_identifiers(&self, function: NodeId) -> &[NodeId] {
    match self.params(function) {
      Some(list) => self.children(list),
      None => &[],
    }
  }

  /// Position of `id` among its parent's children.
  pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
    let parent = self.parent(id)?;
    self.children(parent).iter().position(|c| *c == id)
  }
}
