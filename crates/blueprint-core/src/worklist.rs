use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AddressError;
use crate::graph::{Graph, InputRef, OutputRef};

/// A `node.slot` address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotAddress {
    /// Node name
    pub node: String,
    /// Slot name
    pub slot: String,
}

impl SlotAddress {
    /// Create an address from its parts
    pub fn new(node: impl Into<String>, slot: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            slot: slot.into(),
        }
    }
}

impl FromStr for SlotAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((node, slot)) if !node.is_empty() && !slot.is_empty() => Ok(Self::new(node, slot)),
            _ => Err(AddressError(s.to_string())),
        }
    }
}

impl fmt::Display for SlotAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.slot)
    }
}

/// A request to link an input slot to an output slot, by address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkDirective {
    /// The input side
    pub input: SlotAddress,
    /// The output side
    pub output: SlotAddress,
}

impl LinkDirective {
    /// Create a directive from parsed addresses
    pub fn new(input: SlotAddress, output: SlotAddress) -> Self {
        Self { input, output }
    }

    /// Parse both addresses
    pub fn parse(input: &str, output: &str) -> Result<Self, AddressError> {
        Ok(Self::new(input.parse()?, output.parse()?))
    }
}

impl fmt::Display for LinkDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {}", self.input, self.output)
    }
}

/// Link directives whose endpoints do not exist yet.
///
/// Staged directives persist until both endpoints appear; resolving one
/// removes it, and a directive that resolves is never retried.
#[derive(Debug, Default)]
pub struct Worklist {
    staged: Vec<LinkDirective>,
}

impl Worklist {
    /// Create an empty worklist
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directive
    pub fn stage(&mut self, directive: LinkDirective) {
        self.staged.push(directive);
    }

    /// Add several directives
    pub fn stage_all<I: IntoIterator<Item = LinkDirective>>(&mut self, directives: I) {
        self.staged.extend(directives);
    }

    /// Drop every staged directive and stage a new set
    pub fn replace<I: IntoIterator<Item = LinkDirective>>(&mut self, directives: I) {
        self.staged.clear();
        self.staged.extend(directives);
    }

    /// Drop every staged directive
    pub fn clear(&mut self) {
        self.staged.clear();
    }

    /// Number of staged directives
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    /// Check if nothing is staged
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Staged directives in staging order
    pub fn iter(&self) -> impl Iterator<Item = &LinkDirective> {
        self.staged.iter()
    }

    /// Resolve every directive whose endpoints now exist.
    ///
    /// Resolved directives are linked into the graph and removed; the rest
    /// stay staged in their original order. Returns the links made.
    pub fn try_resolve(&mut self, graph: &mut Graph) -> Vec<(InputRef, OutputRef)> {
        let mut linked = Vec::new();
        let mut remaining = Vec::new();

        for directive in std::mem::take(&mut self.staged) {
            match locate(graph, &directive) {
                Some((input, output)) => match graph.connect(input, output) {
                    Ok(_) => {
                        debug!(link = %directive, "Resolved staged link");
                        linked.push((input, output));
                    }
                    Err(_) => remaining.push(directive),
                },
                None => remaining.push(directive),
            }
        }

        self.staged = remaining;
        linked
    }
}

fn locate(graph: &Graph, directive: &LinkDirective) -> Option<(InputRef, OutputRef)> {
    let input_node = graph.find_node(&directive.input.node)?;
    let output_node = graph.find_node(&directive.output.node)?;
    let input = graph.find_input(input_node, &directive.input.slot)?;
    let output = graph.find_output(output_node, &directive.output.slot)?;
    Some((input, output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Position;
    use blueprint_types::{SlotDirection, SlotLayout, TypeRef, VariableInfo};
    use pretty_assertions::assert_eq;

    fn layout(inputs: &[&str], outputs: &[&str]) -> SlotLayout {
        SlotLayout {
            inputs: inputs
                .iter()
                .map(|name| VariableInfo::new(*name, "int", Some(SlotDirection::Input)))
                .collect(),
            outputs: outputs
                .iter()
                .map(|name| VariableInfo::new(*name, "int", Some(SlotDirection::Output)))
                .collect(),
        }
    }

    #[test]
    fn test_parse_address() {
        let address: SlotAddress = "n2.in".parse().unwrap();
        assert_eq!(address, SlotAddress::new("n2", "in"));
        assert_eq!(address.to_string(), "n2.in");

        let nested: SlotAddress = "n2.a.b".parse().unwrap();
        assert_eq!(nested.slot, "a.b");
    }

    #[test]
    fn test_parse_malformed_address() {
        for bad in ["n2", ".in", "n2.", ""] {
            let err = bad.parse::<SlotAddress>().unwrap_err();
            assert_eq!(err, AddressError(bad.to_string()));
        }
    }

    #[test]
    fn test_unresolved_directive_stays_staged() {
        let mut graph = Graph::new();
        let mut worklist = Worklist::new();
        worklist.stage(LinkDirective::parse("n2.in", "n1.out").unwrap());

        assert!(worklist.try_resolve(&mut graph).is_empty());
        assert_eq!(worklist.len(), 1);

        graph
            .create_node(TypeRef::parse("T"), "n1", Position::default(), Some(&layout(&[], &["out"])))
            .unwrap();
        assert!(worklist.try_resolve(&mut graph).is_empty());
        assert_eq!(worklist.len(), 1);

        graph
            .create_node(TypeRef::parse("T"), "n2", Position::default(), Some(&layout(&["in"], &[])))
            .unwrap();
        assert_eq!(worklist.try_resolve(&mut graph).len(), 1);
        assert!(worklist.is_empty());
        assert_eq!(graph.links().count(), 1);
    }

    #[test]
    fn test_resolve_keeps_order_of_remaining() {
        let mut graph = Graph::new();
        graph
            .create_node(TypeRef::parse("T"), "a", Position::default(), Some(&layout(&["in"], &["out"])))
            .unwrap();

        let mut worklist = Worklist::new();
        worklist.stage_all([
            LinkDirective::parse("x.in", "a.out").unwrap(),
            LinkDirective::parse("a.in", "a.out").unwrap(),
            LinkDirective::parse("y.in", "a.out").unwrap(),
        ]);

        assert_eq!(worklist.try_resolve(&mut graph).len(), 1);
        let remaining: Vec<String> = worklist.iter().map(|d| d.input.node.clone()).collect();
        assert_eq!(remaining, vec!["x", "y"]);
    }

    #[test]
    fn test_replace_drops_previous() {
        let mut worklist = Worklist::new();
        worklist.stage(LinkDirective::parse("a.in", "b.out").unwrap());
        worklist.replace([LinkDirective::parse("c.in", "d.out").unwrap()]);

        assert_eq!(worklist.len(), 1);
        assert_eq!(worklist.iter().next().unwrap().input.node, "c");
    }
}
