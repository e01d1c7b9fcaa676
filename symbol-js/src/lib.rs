//! Scope-aware renaming of local JavaScript identifiers.
//!
//! [`optimize`] runs two passes over a [`Tree`]:
//!
//! 1. [`scope::analyze`] records, for every `script` node, the names it declares, the names it
//!    uses, and the names it uses without declaring them (its free uses). Free uses of nested
//!    scopes are folded into their parent's uses.
//! 2. [`rename::rewrite`] walks the tree again, giving every scope below the top level a
//!    translation table: the parent's entries for its free uses, plus fresh short names from
//!    [`mangle::allocate`] for its own declarations.
//!
//! Top-level bindings are globals and keep their names. Property names (`b` in `a.b`) are never
//! renamed.

use ahash::HashMap;
use tree_js::NodeId;
use tree_js::Tree;

pub use error::OptimizeError;
pub use mangle::Translation;

pub mod error;
pub mod mangle;
pub mod rename;
pub mod scope;

/// Version of the renaming logic. Persisted renamer output should be discarded when it changes.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Translation tables built during a rewrite.
#[derive(Debug, Default)]
pub struct OptimizeResult {
  /// Table of each renamed scope, keyed by its `script` node.
  pub translations: HashMap<NodeId, Translation>,
}

/// Renames local identifiers of `tree` in place.
pub fn optimize(tree: &mut Tree) -> Result<OptimizeResult, OptimizeError> {
  let scopes = scope::analyze(tree)?;
  let root = tree.root();
  let translations = rename::rewrite(tree, &scopes, root, None)?;
  Ok(OptimizeResult { translations })
}
