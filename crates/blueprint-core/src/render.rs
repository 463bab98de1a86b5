use crate::graph::{InputRef, Node, Position, SlotRef};

/// Drawing backend for nodes and connectors.
///
/// Connectors are keyed by the input slot they end at, since an input holds
/// at most one link.
pub trait RenderSurface: Send {
    /// Screen anchor of a slot on a node
    fn anchor(&self, node: &Node, slot: SlotRef) -> Position;

    /// Draw, or redraw, the connector ending at `input`
    fn draw_connector(&mut self, input: InputRef, from: Position, to: Position);

    /// Remove the connector ending at `input`
    fn erase_connector(&mut self, input: InputRef);

    /// Remove every connector
    fn clear(&mut self);
}

/// A surface that draws nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl RenderSurface for NullSurface {
    fn anchor(&self, node: &Node, _slot: SlotRef) -> Position {
        node.position()
    }

    fn draw_connector(&mut self, _input: InputRef, _from: Position, _to: Position) {}

    fn erase_connector(&mut self, _input: InputRef) {}

    fn clear(&mut self) {}
}
