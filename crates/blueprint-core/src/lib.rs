//!
//! Blueprint Core - the live graph behind the Blueprint editor
//!
//! This crate owns the node/slot/link model, the worklist of link directives
//! that cannot be resolved yet, the interactive linking gesture and the
//! [`Editor`] context that ties them to a type registry and a rendering
//! surface.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Nodes, slots and the symmetric link relation
pub mod graph;

/// Link directives waiting for their endpoints
pub mod worklist;

/// Click-driven linking
pub mod interaction;

/// Interface to the rendering surface
pub mod render;

/// Session-scoped editor context
pub mod editor;

/// Error types
pub mod error;

pub use editor::{Editor, NodeSpec};
pub use error::{AddressError, EditorError, GraphError};
pub use graph::{
    Graph, InputRef, InputSlot, Node, NodeId, OutputRef, OutputSlot, Position, SlotRef, SlotState,
};
pub use interaction::{ClickOutcome, GestureAction, LinkGesture};
pub use render::{NullSurface, RenderSurface};
pub use worklist::{LinkDirective, SlotAddress, Worklist};
