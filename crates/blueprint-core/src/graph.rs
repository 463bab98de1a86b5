use std::collections::HashSet;
use std::fmt;

use blueprint_types::{SlotLayout, TypeRef, VariableInfo};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GraphError;

/// A point in editor space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate
    pub x: f32,
    /// Vertical coordinate
    pub y: f32,
}

impl Position {
    /// Create a new position
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Handle to a node of one particular graph generation.
///
/// Handles issued before a [`Graph::replace_all`] never resolve afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    generation: u64,
    index: usize,
}

impl NodeId {
    /// Graph generation this handle was issued in
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.generation, self.index)
    }
}

/// Handle to an input slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputRef {
    /// Owning node
    pub node: NodeId,
    /// Position among the node's inputs
    pub index: usize,
}

/// Handle to an output slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputRef {
    /// Owning node
    pub node: NodeId,
    /// Position among the node's outputs
    pub index: usize,
}

/// Handle to a slot of either direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotRef {
    /// An input slot
    Input(InputRef),
    /// An output slot
    Output(OutputRef),
}

impl SlotRef {
    /// Owning node
    pub fn node(&self) -> NodeId {
        match self {
            SlotRef::Input(input) => input.node,
            SlotRef::Output(output) => output.node,
        }
    }
}

/// An input slot: linked to at most one output
#[derive(Debug, Clone)]
pub struct InputSlot {
    info: VariableInfo,
    link: Option<OutputRef>,
}

impl InputSlot {
    /// Slot name
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Member description the slot was built from
    pub fn info(&self) -> &VariableInfo {
        &self.info
    }

    /// The output this input is linked to
    pub fn link(&self) -> Option<OutputRef> {
        self.link
    }
}

/// An output slot: linked to any number of inputs
#[derive(Debug, Clone)]
pub struct OutputSlot {
    info: VariableInfo,
    links: Vec<InputRef>,
}

impl OutputSlot {
    /// Slot name
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Member description the slot was built from
    pub fn info(&self) -> &VariableInfo {
        &self.info
    }

    /// Inputs linked to this output
    pub fn links(&self) -> &[InputRef] {
        &self.links
    }
}

/// Where a node stands in slot construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotState {
    /// Waiting for its type to become known
    Pending,
    /// Slots are built
    Ready,
    /// The type could not be obtained; the node stays without slots
    Failed,
}

/// A typed node
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    type_ref: TypeRef,
    position: Position,
    state: SlotState,
    inputs: Vec<InputSlot>,
    outputs: Vec<OutputSlot>,
}

impl Node {
    /// Create a node whose slots are not built yet
    pub fn new(name: impl Into<String>, type_ref: TypeRef, position: Position) -> Self {
        Self {
            name: name.into(),
            type_ref,
            position,
            state: SlotState::Pending,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Build the node's slots from a layout
    pub fn with_slots(mut self, layout: &SlotLayout) -> Self {
        self.build_slots(layout);
        self
    }

    fn build_slots(&mut self, layout: &SlotLayout) {
        self.inputs = layout
            .inputs
            .iter()
            .map(|info| InputSlot {
                info: info.clone(),
                link: None,
            })
            .collect();
        self.outputs = layout
            .outputs
            .iter()
            .map(|info| OutputSlot {
                info: info.clone(),
                links: Vec::new(),
            })
            .collect();
        self.state = SlotState::Ready;
    }

    /// Unique name of the node
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type the node was instantiated from
    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    /// Current position
    pub fn position(&self) -> Position {
        self.position
    }

    /// Slot construction state
    pub fn state(&self) -> SlotState {
        self.state
    }

    /// Input slots in declaration order
    pub fn inputs(&self) -> &[InputSlot] {
        &self.inputs
    }

    /// Output slots in declaration order
    pub fn outputs(&self) -> &[OutputSlot] {
        &self.outputs
    }
}

/// The active graph
#[derive(Debug, Default)]
pub struct Graph {
    generation: u64,
    nodes: Vec<Node>,
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation; bumped by every [`Graph::replace_all`]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn id_at(&self, index: usize) -> NodeId {
        NodeId {
            generation: self.generation,
            index,
        }
    }

    /// Discard every node, slot and link and install a new node set.
    ///
    /// The new set is checked for duplicate names first; on error the
    /// current graph is left untouched.
    pub fn replace_all<I>(&mut self, nodes: I) -> Result<Vec<NodeId>, GraphError>
    where
        I: IntoIterator<Item = Node>,
    {
        let nodes: Vec<Node> = nodes.into_iter().collect();

        {
            let mut names = HashSet::new();
            for node in &nodes {
                if !names.insert(node.name.as_str()) {
                    return Err(GraphError::DuplicateNode(node.name.clone()));
                }
            }
        }

        self.generation += 1;
        self.nodes = nodes;
        debug!(generation = self.generation, nodes = self.nodes.len(), "Replaced graph");

        Ok((0..self.nodes.len()).map(|index| self.id_at(index)).collect())
    }

    /// Add a node, building its slots when a layout is given
    pub fn create_node(
        &mut self,
        type_ref: TypeRef,
        name: impl Into<String>,
        position: Position,
        layout: Option<&SlotLayout>,
    ) -> Result<NodeId, GraphError> {
        let name = name.into();
        if self.find_node(&name).is_some() {
            return Err(GraphError::DuplicateNode(name));
        }

        let mut node = Node::new(name, type_ref, position);
        if let Some(layout) = layout {
            node.build_slots(layout);
        }

        self.nodes.push(node);
        Ok(self.id_at(self.nodes.len() - 1))
    }

    /// Build the slots of a node that was created without them
    pub fn install_slots(&mut self, id: NodeId, layout: &SlotLayout) -> Result<(), GraphError> {
        let node = self.node_mut(id)?;
        if node.state == SlotState::Ready {
            return Err(GraphError::SlotsAlreadyBuilt(node.name.clone()));
        }
        node.build_slots(layout);
        Ok(())
    }

    /// Record that a node's type could not be obtained
    pub fn mark_failed(&mut self, id: NodeId) -> Result<(), GraphError> {
        let node = self.node_mut(id)?;
        if node.state == SlotState::Ready {
            return Err(GraphError::SlotsAlreadyBuilt(node.name.clone()));
        }
        node.state = SlotState::Failed;
        Ok(())
    }

    /// Look up a node by handle
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        if id.generation != self.generation {
            return None;
        }
        self.nodes.get(id.index)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        if id.generation != self.generation {
            return Err(GraphError::StaleNode(id));
        }
        self.nodes.get_mut(id.index).ok_or(GraphError::StaleNode(id))
    }

    /// All nodes with their handles, in creation order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        let generation = self.generation;
        self.nodes
            .iter()
            .enumerate()
            .map(move |(index, node)| (NodeId { generation, index }, node))
    }

    /// Find a node by exact name
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.name == name)
            .map(|index| self.id_at(index))
    }

    /// Find an input slot of a node by exact name
    pub fn find_input(&self, node: NodeId, slot_name: &str) -> Option<InputRef> {
        self.node(node)?
            .inputs
            .iter()
            .position(|slot| slot.name() == slot_name)
            .map(|index| InputRef { node, index })
    }

    /// Find an output slot of a node by exact name
    pub fn find_output(&self, node: NodeId, slot_name: &str) -> Option<OutputRef> {
        self.node(node)?
            .outputs
            .iter()
            .position(|slot| slot.name() == slot_name)
            .map(|index| OutputRef { node, index })
    }

    /// Look up an input slot
    pub fn input(&self, input: InputRef) -> Option<&InputSlot> {
        self.node(input.node)?.inputs.get(input.index)
    }

    /// Look up an output slot
    pub fn output(&self, output: OutputRef) -> Option<&OutputSlot> {
        self.node(output.node)?.outputs.get(output.index)
    }

    fn check_input(&self, input: InputRef) -> Result<(), GraphError> {
        let node = self.node(input.node).ok_or(GraphError::StaleNode(input.node))?;
        if input.index >= node.inputs.len() {
            return Err(GraphError::StaleSlot {
                node: input.node,
                index: input.index,
            });
        }
        Ok(())
    }

    fn check_output(&self, output: OutputRef) -> Result<(), GraphError> {
        let node = self.node(output.node).ok_or(GraphError::StaleNode(output.node))?;
        if output.index >= node.outputs.len() {
            return Err(GraphError::StaleSlot {
                node: output.node,
                index: output.index,
            });
        }
        Ok(())
    }

    /// Link an input to an output.
    ///
    /// An existing link on the input is severed on both sides first. Returns
    /// the output that was severed, if any.
    pub fn connect(&mut self, input: InputRef, output: OutputRef) -> Result<Option<OutputRef>, GraphError> {
        self.check_input(input)?;
        self.check_output(output)?;

        if self.nodes[input.node.index].inputs[input.index].link == Some(output) {
            return Ok(None);
        }

        let previous = self.sever(input);
        self.nodes[input.node.index].inputs[input.index].link = Some(output);
        self.nodes[output.node.index].outputs[output.index].links.push(input);

        Ok(previous)
    }

    /// Remove the link held by an input, on both sides.
    ///
    /// Returns the output it was linked to; a stale or unlinked input is a no-op.
    pub fn disconnect(&mut self, input: InputRef) -> Option<OutputRef> {
        self.check_input(input).ok()?;
        self.sever(input)
    }

    fn sever(&mut self, input: InputRef) -> Option<OutputRef> {
        let previous = self.nodes[input.node.index].inputs[input.index].link.take()?;
        if self.check_output(previous).is_ok() {
            self.nodes[previous.node.index].outputs[previous.index]
                .links
                .retain(|linked| *linked != input);
        }
        Some(previous)
    }

    /// Move a node
    pub fn set_position(&mut self, id: NodeId, position: Position) -> Result<(), GraphError> {
        self.node_mut(id)?.position = position;
        Ok(())
    }

    /// Every live link as `(input, output)`
    pub fn links(&self) -> impl Iterator<Item = (InputRef, OutputRef)> + '_ {
        self.nodes().flat_map(|(node, data)| {
            data.inputs
                .iter()
                .enumerate()
                .filter_map(move |(index, slot)| slot.link.map(|output| (InputRef { node, index }, output)))
        })
    }

    /// Every live link touching a node, each listed once
    pub fn links_of(&self, id: NodeId) -> Vec<(InputRef, OutputRef)> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };

        let mut links: Vec<_> = node
            .inputs
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.link.map(|output| (InputRef { node: id, index }, output)))
            .collect();

        for (index, slot) in node.outputs.iter().enumerate() {
            let output = OutputRef { node: id, index };
            // Links from the node to itself were already listed from the input side
            links.extend(
                slot.links
                    .iter()
                    .filter(|input| input.node != id)
                    .map(|input| (*input, output)),
            );
        }

        links
    }

    /// Check the symmetric link invariant over the whole graph
    pub fn links_consistent(&self) -> bool {
        let inputs_agree = self.links().all(|(input, output)| {
            self.output(output)
                .map(|slot| slot.links.iter().filter(|linked| **linked == input).count() == 1)
                .unwrap_or(false)
        });

        let outputs_agree = self.nodes().all(|(node, data)| {
            data.outputs.iter().enumerate().all(|(index, slot)| {
                let output = OutputRef { node, index };
                slot.links
                    .iter()
                    .all(|input| self.input(*input).and_then(InputSlot::link) == Some(output))
            })
        });

        inputs_agree && outputs_agree
    }
}
