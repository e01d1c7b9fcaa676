use thiserror::Error;
use tree_js::NodeId;

/// The input tree does not have the shape the parser guarantees.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OptimizeError {
  #[error("identifier node {node} has no value")]
  MissingIdentifierValue { node: NodeId },
  #[error("script node {node} was not seen by scope analysis")]
  UnanalyzedScope { node: NodeId },
}
