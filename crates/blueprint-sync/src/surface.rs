use std::collections::HashMap;

use blueprint_core::{InputRef, Node, Position, RenderSurface, SlotRef};
use tracing::trace;

/// A headless surface that records connectors and traces every change
#[derive(Debug, Default)]
pub struct TracingSurface {
    connectors: HashMap<InputRef, (Position, Position)>,
}

impl TracingSurface {
    /// Create an empty surface
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of connectors currently drawn
    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    /// Endpoints of the connector ending at `input`
    pub fn connector(&self, input: InputRef) -> Option<(Position, Position)> {
        self.connectors.get(&input).copied()
    }
}

impl RenderSurface for TracingSurface {
    fn anchor(&self, node: &Node, _slot: SlotRef) -> Position {
        node.position()
    }

    fn draw_connector(&mut self, input: InputRef, from: Position, to: Position) {
        trace!(node = %input.node, slot = input.index, ?from, ?to, "Draw connector");
        self.connectors.insert(input, (from, to));
    }

    fn erase_connector(&mut self, input: InputRef) {
        if self.connectors.remove(&input).is_some() {
            trace!(node = %input.node, slot = input.index, "Erase connector");
        }
    }

    fn clear(&mut self) {
        trace!(connectors = self.connectors.len(), "Clear surface");
        self.connectors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_core::Graph;
    use blueprint_types::{SlotDirection, SlotLayout, TypeRef, VariableInfo};

    #[test]
    fn test_records_connectors() {
        let layout = SlotLayout {
            inputs: vec![VariableInfo::new("in", "int", Some(SlotDirection::Input))],
            outputs: Vec::new(),
        };
        let mut graph = Graph::new();
        let id = graph
            .create_node(TypeRef::parse("Pipe"), "b", Position::new(5.0, 6.0), Some(&layout))
            .unwrap();
        let input = graph.find_input(id, "in").unwrap();

        let mut surface = TracingSurface::new();
        let to = surface.anchor(graph.node(id).unwrap(), SlotRef::Input(input));
        assert_eq!(to, Position::new(5.0, 6.0));

        surface.draw_connector(input, Position::new(1.0, 2.0), to);
        surface.draw_connector(input, Position::new(0.0, 0.0), to);
        assert_eq!(surface.connector_count(), 1);
        assert_eq!(surface.connector(input), Some((Position::new(0.0, 0.0), to)));

        surface.erase_connector(input);
        assert_eq!(surface.connector_count(), 0);

        surface.draw_connector(input, Position::new(1.0, 2.0), to);
        surface.clear();
        assert_eq!(surface.connector(input), None);
    }
}
