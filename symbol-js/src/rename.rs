use ahash::HashMap;
use ahash::HashSet;
use tree_js::NodeId;
use tree_js::NodeKind;
use tree_js::Tree;

use crate::mangle::allocate;
use crate::mangle::Translation;
use crate::scope::enclosing_function;
use crate::scope::is_reference;
use crate::scope::Scopes;
use crate::OptimizeError;

/// Rewrites `node` and its descendants in place through the translation tables of the scopes
/// they belong to. `inherited` is the table in force at `node`; each `script` below the root
/// derives its own table from it. Returns the table built for every scope visited.
pub fn rewrite(
  tree: &mut Tree,
  scopes: &Scopes,
  node: NodeId,
  inherited: Option<&Translation>,
) -> Result<HashMap<NodeId, Translation>, OptimizeError> {
  let mut rewriter = Rewriter {
    tree,
    scopes,
    tables: HashMap::default(),
  };
  rewriter.rewrite_node(node, inherited)?;
  Ok(rewriter.tables)
}

struct Rewriter<'a> {
  tree: &'a mut Tree,
  scopes: &'a Scopes,
  tables: HashMap<NodeId, Translation>,
}

impl Rewriter<'_> {
  fn rewrite_node(
    &mut self,
    node: NodeId,
    inherited: Option<&Translation>,
  ) -> Result<(), OptimizeError> {
    let local = if self.tree.kind(node) == &NodeKind::Script && self.tree.parent(node).is_some() {
      Some(self.scope_translation(node, inherited)?)
    } else {
      None
    };
    let active = local.as_ref().or(inherited);

    if let Some(translation) = active.filter(|t| !t.is_empty()) {
      self.apply(node, translation);
    }

    let children = self.tree.children(node).to_vec();
    for child in children {
      self.rewrite_node(child, active)?;
    }

    if let Some(table) = local {
      self.tables.insert(node, table);
    }
    Ok(())
  }

  fn scope_translation(
    &self,
    scope: NodeId,
    inherited: Option<&Translation>,
  ) -> Result<Translation, OptimizeError> {
    let record = self
      .scopes
      .get(scope)
      .ok_or(OptimizeError::UnanalyzedScope { node: scope })?;

    let mut translation = Translation::default();
    let mut reserved = HashSet::default();
    for name in record.free_uses.keys() {
      match inherited.and_then(|t| t.get(name)) {
        Some(replacement) => {
          translation.insert(name.clone(), replacement.clone());
          reserved.insert(replacement.clone());
        }
        // Left as is, so no local may take this name.
        None => {
          reserved.insert(name.clone());
        }
      }
    }

    translation.extend(allocate(record.declares.iter(), &reserved));
    Ok(translation)
  }

  fn apply(&mut self, node: NodeId, translation: &Translation) {
    let kind = self.tree.kind(node).clone();
    match kind {
      NodeKind::Script => {
        let Some(function) = enclosing_function(self.tree, node) else {
          return;
        };
        let params = self.tree.param_identifiers(function).to_vec();
        for param in params {
          self.translate_value(param, translation);
        }
      }
      NodeKind::Function | NodeKind::Declaration => {
        let replacement = self
          .tree
          .name(node)
          .and_then(|name| translation.get(name))
          .cloned();
        if let Some(replacement) = replacement {
          self.tree.set_name(node, replacement);
        }
      }
      NodeKind::Identifier if is_reference(self.tree, node) => {
        self.translate_value(node, translation);
      }
      _ => {}
    }
  }

  fn translate_value(&mut self, identifier: NodeId, translation: &Translation) {
    let replacement = self
      .tree
      .value(identifier)
      .and_then(|value| translation.get(value))
      .cloned();
    if let Some(replacement) = replacement {
      self.tree.set_value(identifier, replacement);
    }
  }
}
