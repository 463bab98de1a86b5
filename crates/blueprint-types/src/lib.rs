//! # Blueprint Types
//!
//! Type descriptors for the Blueprint editor. A node's slot layout is never
//! hard-coded: it is derived from the user-defined type (UDT) the node was
//! instantiated from. This crate owns those descriptors and everything needed
//! to obtain them:
//!
//! * [`TypeBundle`] - the JSON bundle format (`enums`, `udts`, `functions`)
//! * [`TypeRegistry`] - the append-only store that resolves type names
//! * [`TypeRef`] - bare (`Foo`) and compound (`library.dll:Foo`) type names
//! * [`BundleSource`] - where bundles come from (HTTP, a directory, memory)
//!
//! ## Example
//!
//! ```
//! use blueprint_types::{TypeBundle, TypeRef, TypeRegistry};
//!
//! let bundle = TypeBundle::from_json(r#"{
//!     "udts": [
//!         { "name": "Adder", "items": [
//!             { "name": "a", "type": "float", "attribute": "i" },
//!             { "name": "sum", "type": "float", "attribute": "o" }
//!         ]}
//!     ]
//! }"#).unwrap();
//!
//! let mut registry = TypeRegistry::new();
//! registry.register(bundle);
//!
//! let udt = registry.resolve(&TypeRef::parse("Adder")).unwrap();
//! let layout = udt.slot_layout();
//! assert_eq!(layout.inputs.len(), 1);
//! assert_eq!(layout.outputs.len(), 1);
//! ```

#![forbid(unsafe_code)]

mod error;

pub mod descriptor;
pub mod registry;
pub mod source;

pub use descriptor::{
    EnumDescriptor, EnumItem, FunctionDescriptor, SlotDirection, SlotLayout, TypeBundle,
    UdtDescriptor, VariableInfo,
};
pub use error::{FetchError, TypeError};
pub use registry::{TypeRef, TypeRegistry};
pub use source::{
    bundle_file_name, preload, BundleSource, DirBundleSource, HttpBundleSource,
    StaticBundleSource,
};
