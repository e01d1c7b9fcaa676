//! Syntax tree consumed by the identifier renamer.
//!
//! Nodes live in an arena owned by [`Tree`] and refer to each other through [`NodeId`] handles, so
//! parent back-links carry no ownership. Trees arrive from the parser in the nested
//! [`SourceNode`] form and are converted with [`Tree::from_source`].

pub mod keywords;
pub mod node;
pub mod source;

pub use node::Attributes;
pub use node::Node;
pub use node::NodeId;
pub use node::NodeKind;
pub use node::Tree;
pub use source::SourceNode;
