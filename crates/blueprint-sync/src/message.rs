//! Wire messages exchanged with the external process

use blueprint_core::{Graph, LinkDirective, NodeSpec, Position};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A node as described by a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    /// Bare or compound type name
    pub udt_name: String,
    /// Node name
    pub id: String,
    /// Horizontal position
    #[serde(default)]
    pub x: f32,
    /// Vertical position
    #[serde(default)]
    pub y: f32,
}

/// A link between two `node.slot` addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    /// Input side
    #[serde(rename = "in")]
    pub input: String,
    /// Output side
    #[serde(rename = "out")]
    pub output: String,
}

/// Full description of the graph pushed by the external process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Nodes, in creation order
    pub nodes: Vec<SnapshotNode>,
    /// Links to stage
    #[serde(default)]
    pub links: Vec<LinkEntry>,
}

impl Snapshot {
    /// Parse an inbound text frame
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Split into node descriptions and link directives.
    ///
    /// Links with a malformed address are reported and dropped.
    pub fn into_parts(self) -> (Vec<NodeSpec>, Vec<LinkDirective>) {
        let nodes = self
            .nodes
            .into_iter()
            .map(|node| NodeSpec::new(node.udt_name, node.id, Position::new(node.x, node.y)))
            .collect();

        let links = self
            .links
            .into_iter()
            .filter_map(|link| match LinkDirective::parse(&link.input, &link.output) {
                Ok(directive) => Some(directive),
                Err(err) => {
                    warn!(input = %link.input, output = %link.output, error = %err, "Dropping malformed link");
                    None
                }
            })
            .collect();

        (nodes, links)
    }
}

/// A node as written by Save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedNode {
    /// Node name
    pub name: String,
    /// Horizontal position
    pub x: f32,
    /// Vertical position
    pub y: f32,
}

/// The outbound Save message.
///
/// Links are never written; the receiving side keeps its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMessage {
    /// Every node with its position
    pub nodes: Vec<SavedNode>,
    /// Always empty
    pub links: Vec<LinkEntry>,
}

impl SaveMessage {
    /// Capture node names and positions from the graph
    pub fn from_graph(graph: &Graph) -> Self {
        let nodes = graph
            .nodes()
            .map(|(_, node)| SavedNode {
                name: node.name().to_string(),
                x: node.position().x,
                y: node.position().y,
            })
            .collect();

        Self {
            nodes,
            links: Vec::new(),
        }
    }

    /// Serialize to a text frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_core::SlotAddress;
    use blueprint_types::TypeRef;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_snapshot() {
        let snapshot = Snapshot::parse(
            r#"{
                "nodes": [
                    { "udt_name": "A", "id": "n1", "x": 10, "y": 20.5 },
                    { "udt_name": "flame_graphics.dll:Sprite", "id": "n2" }
                ],
                "links": [ { "in": "n2.texture", "out": "n1.out1" } ]
            }"#,
        )
        .unwrap();

        let (nodes, links) = snapshot.into_parts();

        assert_eq!(nodes[0], NodeSpec::new("A", "n1", Position::new(10.0, 20.5)));
        assert_eq!(nodes[1].position, Position::default());
        assert_eq!(links[0].input, SlotAddress::new("n2", "texture"));
        assert_eq!(links[0].output, SlotAddress::new("n1", "out1"));
    }

    #[test]
    fn test_links_default_to_empty() {
        let snapshot = Snapshot::parse(r#"{ "nodes": [] }"#).unwrap();
        assert!(snapshot.links.is_empty());
    }

    #[test]
    fn test_structurally_invalid_snapshot() {
        assert!(Snapshot::parse(r#"{ "links": [] }"#).is_err());
        assert!(Snapshot::parse(r#"{ "nodes": [ { "id": "n1" } ] }"#).is_err());
        assert!(Snapshot::parse("not json").is_err());
    }

    #[test]
    fn test_malformed_link_is_dropped() {
        let snapshot = Snapshot::parse(
            r#"{ "nodes": [], "links": [ { "in": "broken", "out": "n1.out" }, { "in": "n2.in", "out": "n1.out" } ] }"#,
        )
        .unwrap();

        let (_, links) = snapshot.into_parts();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].input.node, "n2");
    }

    #[test]
    fn test_save_message_omits_links() {
        let mut graph = Graph::new();
        graph
            .create_node(TypeRef::parse("A"), "n1", Position::new(3.0, 4.0), None)
            .unwrap();

        let save = SaveMessage::from_graph(&graph);
        let value: serde_json::Value = serde_json::from_str(&save.to_json().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({ "nodes": [ { "name": "n1", "x": 3.0, "y": 4.0 } ], "links": [] })
        );
    }
}
