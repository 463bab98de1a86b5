use serde::{Deserialize, Serialize};

/// Directionality of a UDT member, resolved once when the bundle is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotDirection {
    /// Member is fed from another node
    Input,
    /// Member feeds other nodes
    Output,
    /// Member is marked both ways
    InputOutput,
}

impl SlotDirection {
    /// Convert a bundle `attribute` string (containing `i` and/or `o`).
    ///
    /// Returns `None` for plain members that carry neither flag.
    pub fn from_attribute(attribute: &str) -> Option<Self> {
        match (attribute.contains('i'), attribute.contains('o')) {
            (true, true) => Some(SlotDirection::InputOutput),
            (true, false) => Some(SlotDirection::Input),
            (false, true) => Some(SlotDirection::Output),
            (false, false) => None,
        }
    }

    /// Check if members with this direction accept links
    pub fn is_input(self) -> bool {
        matches!(self, SlotDirection::Input | SlotDirection::InputOutput)
    }

    /// Check if members with this direction emit links
    pub fn is_output(self) -> bool {
        matches!(self, SlotDirection::Output | SlotDirection::InputOutput)
    }
}

/// A member of a user-defined type
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawVariable")]
pub struct VariableInfo {
    /// Member name, used as the slot name
    pub name: String,
    /// Declared type of the member
    pub type_name: String,
    /// Slot direction, `None` for members that never become slots
    pub direction: Option<SlotDirection>,
}

impl VariableInfo {
    /// Create a new member description
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, direction: Option<SlotDirection>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            direction,
        }
    }
}

/// Wire shape of a UDT member
#[derive(Deserialize)]
struct RawVariable {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    attribute: String,
}

impl From<RawVariable> for VariableInfo {
    fn from(raw: RawVariable) -> Self {
        Self {
            direction: SlotDirection::from_attribute(&raw.attribute),
            name: raw.name,
            type_name: raw.type_name,
        }
    }
}

/// A struct-like user type: the template a node's slots are built from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UdtDescriptor {
    /// Type name
    pub name: String,
    /// Members in declaration order
    #[serde(default)]
    pub items: Vec<VariableInfo>,
}

/// Input and output members of a UDT, split and kept in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotLayout {
    /// Members that become input slots
    pub inputs: Vec<VariableInfo>,
    /// Members that become output slots
    pub outputs: Vec<VariableInfo>,
}

impl UdtDescriptor {
    /// Create a new UDT descriptor
    pub fn new(name: impl Into<String>, items: Vec<VariableInfo>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    /// Split the members into input and output slots.
    ///
    /// A member flagged both ways becomes an input slot only.
    pub fn slot_layout(&self) -> SlotLayout {
        let mut layout = SlotLayout::default();
        for item in &self.items {
            match item.direction {
                Some(direction) if direction.is_input() => layout.inputs.push(item.clone()),
                Some(direction) if direction.is_output() => layout.outputs.push(item.clone()),
                _ => {}
            }
        }
        layout
    }
}

/// A single enumerator
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnumItem {
    /// Enumerator name
    pub name: String,
    /// Enumerator value
    #[serde(default)]
    pub value: i64,
}

/// An enum type
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnumDescriptor {
    /// Enum name
    pub name: String,
    /// Enumerators in declaration order
    #[serde(default)]
    pub items: Vec<EnumItem>,
}

/// A free function signature
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FunctionDescriptor {
    /// Function name
    pub name: String,
    /// Return type, `None` for void
    #[serde(default)]
    pub return_type: Option<String>,
    /// Parameter types in order
    #[serde(default)]
    pub parameters: Vec<String>,
}

/// A bundle of type descriptors as published by one type source
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TypeBundle {
    /// Enum descriptors
    #[serde(default)]
    pub enums: Vec<EnumDescriptor>,
    /// User-defined types
    #[serde(default)]
    pub udts: Vec<UdtDescriptor>,
    /// Function signatures
    #[serde(default)]
    pub functions: Vec<FunctionDescriptor>,
}

impl TypeBundle {
    /// Parse a bundle document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Create a bundle holding only the given UDTs
    pub fn with_udts(udts: Vec<UdtDescriptor>) -> Self {
        Self {
            udts,
            ..Self::default()
        }
    }

    /// Check if the bundle has no descriptors at all
    pub fn is_empty(&self) -> bool {
        self.enums.is_empty() && self.udts.is_empty() && self.functions.is_empty()
    }
}
