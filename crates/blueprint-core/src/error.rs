use thiserror::Error;

use crate::graph::NodeId;

/// Errors raised by the graph model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A node with this name already exists in the active graph
    #[error("Duplicate node name: {0}")]
    DuplicateNode(String),

    /// The node handle belongs to a torn-down graph or was never issued
    #[error("Node {0} is not part of the active graph")]
    StaleNode(NodeId),

    /// The slot handle does not point at an existing slot
    #[error("Slot {index} of node {node} does not exist")]
    StaleSlot {
        /// Owning node
        node: NodeId,
        /// Slot index
        index: usize,
    },

    /// Slots can only be built once per node
    #[error("Slots of node {0} have already been built")]
    SlotsAlreadyBuilt(String),
}

impl GraphError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            GraphError::DuplicateNode(_) => "ERR_GRAPH_DUPLICATE_NODE",
            GraphError::StaleNode(_) => "ERR_GRAPH_STALE_NODE",
            GraphError::StaleSlot { .. } => "ERR_GRAPH_STALE_SLOT",
            GraphError::SlotsAlreadyBuilt(_) => "ERR_GRAPH_SLOTS_BUILT",
        }
    }
}

/// A `node.slot` address that could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed slot address: {0:?}")]
pub struct AddressError(pub String);

/// Errors raised by the editor context
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// A node names a bare type that was never registered.
    /// Node construction must not proceed.
    #[error("Node {node} uses unregistered local type {type_name}")]
    UnknownLocalType {
        /// Node being constructed
        node: String,
        /// The missing type
        type_name: String,
    },

    /// Graph model error
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl EditorError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            EditorError::UnknownLocalType { .. } => "ERR_EDITOR_UNKNOWN_LOCAL_TYPE",
            EditorError::Graph(err) => err.error_code(),
        }
    }

    /// Whether this error indicates a registration bug that must stop the editor
    pub fn is_fatal(&self) -> bool {
        matches!(self, EditorError::UnknownLocalType { .. })
    }
}
