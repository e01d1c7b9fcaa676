use ahash::HashMap;
use indexmap::IndexSet;
use tree_js::NodeId;
use tree_js::NodeKind;
use tree_js::Tree;

use crate::OptimizeError;

/// Name to occurrence count.
pub type UseCounts = HashMap<String, usize>;

/// Bindings and references of one `script` node.
#[derive(Clone, Debug, Default)]
pub struct ScopeRecord {
  /// Names bound directly in this scope, in order of first encounter (parameters first).
  pub declares: IndexSet<String>,
  /// References made in this scope, including the free references of nested scopes.
  pub uses: UseCounts,
  /// Entries of `uses` that this scope does not declare.
  pub free_uses: UseCounts,
}

/// Scope records of an analyzed tree, keyed by `script` node.
#[derive(Debug, Default)]
pub struct Scopes {
  records: HashMap<NodeId, ScopeRecord>,
}

impl Scopes {
  pub fn get(&self, scope: NodeId) -> Option<&ScopeRecord> {
    self.records.get(&scope)
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ScopeRecord)> {
    self.records.iter().map(|(id, record)| (*id, record))
  }
}

/// Analyzes the whole tree. The root is treated as a scope whatever its kind.
pub fn analyze(tree: &Tree) -> Result<Scopes, OptimizeError> {
  let mut scopes = Scopes::default();
  analyze_scope(tree, tree.root(), &mut scopes)?;
  Ok(scopes)
}

/// Analyzes the scope rooted at `scope`, records it and every nested scope, and returns its free
/// uses.
pub fn analyze_scope(
  tree: &Tree,
  scope: NodeId,
  scopes: &mut Scopes,
) -> Result<UseCounts, OptimizeError> {
  let mut declares = IndexSet::new();
  let mut uses = UseCounts::default();

  if let Some(function) = enclosing_function(tree, scope) {
    for param in tree.param_identifiers(function) {
      let name = identifier_value(tree, *param)?;
      declares.insert(name.to_string());
    }
  }

  for child in tree.children(scope) {
    scan_node(tree, *child, &mut declares, &mut uses, scopes)?;
  }

  let free_uses: UseCounts = uses
    .iter()
    .filter(|(name, _)| !declares.contains(*name))
    .map(|(name, count)| (name.clone(), *count))
    .collect();

  tracing::debug!(
    target: "symbol_js::scope",
    node = %scope,
    declares = declares.len(),
    uses = uses.len(),
    free_uses = free_uses.len(),
    "left scope"
  );
  tracing::trace!(target: "symbol_js::scope", node = %scope, ?declares, ?uses, ?free_uses);

  scopes.records.insert(scope, ScopeRecord {
    declares,
    uses,
    free_uses: free_uses.clone(),
  });
  Ok(free_uses)
}

fn scan_node(
  tree: &Tree,
  node: NodeId,
  declares: &mut IndexSet<String>,
  uses: &mut UseCounts,
  scopes: &mut Scopes,
) -> Result<(), OptimizeError> {
  match tree.kind(node) {
    NodeKind::Function | NodeKind::Declaration => {
      if let Some(name) = tree.name(node) {
        declares.insert(name.to_string());
      }
    }
    NodeKind::Identifier if is_reference(tree, node) => {
      let name = identifier_value(tree, node)?;
      *uses.entry(name.to_string()).or_default() += 1;
    }
    _ => {}
  }

  if tree.kind(node) == &NodeKind::Script {
    for (name, count) in analyze_scope(tree, node, scopes)? {
      *uses.entry(name).or_default() += count;
    }
    return Ok(());
  }

  for child in tree.children(node) {
    scan_node(tree, *child, declares, uses, scopes)?;
  }
  Ok(())
}

/// The function whose body is `scope`, if any.
pub(crate) fn enclosing_function(tree: &Tree, scope: NodeId) -> Option<NodeId> {
  if tree.rel(scope) != Some("body") {
    return None;
  }
  tree
    .parent(scope)
    .filter(|parent| tree.kind(*parent) == &NodeKind::Function)
}

/// Whether an identifier node refers to a lexical binding. Formal parameters are handled by their
/// function body's scope and the property side of a `dot` names an object member.
pub(crate) fn is_reference(tree: &Tree, identifier: NodeId) -> bool {
  let Some(parent) = tree.parent(identifier) else {
    return true;
  };
  match tree.kind(parent) {
    NodeKind::List => tree.rel(parent) != Some("params"),
    NodeKind::Dot => tree.index_in_parent(identifier) == Some(0),
    _ => true,
  }
}

pub(crate) fn identifier_value(tree: &Tree, identifier: NodeId) -> Result<&str, OptimizeError> {
  tree
    .value(identifier)
    .ok_or(OptimizeError::MissingIdentifierValue { node: identifier })
}
