//! The type registry
//!
//! Holds every enum, UDT and function descriptor loaded during an editor
//! session. Registration is append-only: the first descriptor registered
//! under a name is the one that resolves.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::{EnumDescriptor, FunctionDescriptor, TypeBundle, UdtDescriptor};
use crate::error::TypeError;

/// A type name as it appears on a node.
///
/// Either a bare local name (`Sprite`) or a compound reference qualified by an
/// external source locator (`flame_graphics.dll:Sprite`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    /// A name expected to be registered already
    Local(String),
    /// A name owned by an external type source
    Remote {
        /// Source locator
        origin: String,
        /// Type name inside the source
        name: String,
    },
}

impl TypeRef {
    /// Parse a type name. A compound reference is `origin:name`; anything
    /// after a second `:` is ignored.
    pub fn parse(type_name: &str) -> Self {
        let mut parts = type_name.split(':');
        match (parts.next(), parts.next()) {
            (Some(origin), Some(name)) => TypeRef::Remote {
                origin: origin.to_string(),
                name: name.to_string(),
            },
            _ => TypeRef::Local(type_name.to_string()),
        }
    }

    /// The type name without its source
    pub fn name(&self) -> &str {
        match self {
            TypeRef::Local(name) => name,
            TypeRef::Remote { name, .. } => name,
        }
    }

    /// The source locator, for compound references
    pub fn origin(&self) -> Option<&str> {
        match self {
            TypeRef::Local(_) => None,
            TypeRef::Remote { origin, .. } => Some(origin),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Local(name) => write!(f, "{}", name),
            TypeRef::Remote { origin, name } => write!(f, "{}:{}", origin, name),
        }
    }
}

/// Append-only store of type descriptors
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    enums: HashMap<String, EnumDescriptor>,
    udts: HashMap<String, UdtDescriptor>,
    functions: HashMap<String, FunctionDescriptor>,
    loaded_bundles: HashSet<String>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a bundle into the registry.
    ///
    /// Returns the number of descriptors that were new.
    pub fn register(&mut self, bundle: TypeBundle) -> usize {
        let mut added = 0;

        for descriptor in bundle.enums {
            added += insert_new(&mut self.enums, descriptor.name.clone(), descriptor, "enum");
        }
        for descriptor in bundle.udts {
            added += insert_new(&mut self.udts, descriptor.name.clone(), descriptor, "udt");
        }
        for descriptor in bundle.functions {
            added += insert_new(&mut self.functions, descriptor.name.clone(), descriptor, "function");
        }

        added
    }

    /// Merge a bundle and remember that its file has been loaded
    pub fn register_bundle(&mut self, file_name: &str, bundle: TypeBundle) -> usize {
        self.loaded_bundles.insert(file_name.to_string());
        let added = self.register(bundle);
        debug!(bundle = %file_name, added, "Registered type bundle");
        added
    }

    /// Check if a bundle file has already been merged
    pub fn is_bundle_loaded(&self, file_name: &str) -> bool {
        self.loaded_bundles.contains(file_name)
    }

    /// Resolve a type reference to its UDT.
    ///
    /// A missing bare name yields [`TypeError::UnknownLocalType`]; a missing
    /// compound name yields [`TypeError::UnknownRemoteType`] so the caller
    /// can fetch the owning bundle.
    pub fn resolve(&self, type_ref: &TypeRef) -> Result<&UdtDescriptor, TypeError> {
        match type_ref {
            TypeRef::Local(name) => self
                .udts
                .get(name)
                .ok_or_else(|| TypeError::UnknownLocalType(name.clone())),
            TypeRef::Remote { origin, name } => {
                self.udts
                    .get(name)
                    .ok_or_else(|| TypeError::UnknownRemoteType {
                        origin: origin.clone(),
                        name: name.clone(),
                    })
            }
        }
    }

    /// Find a UDT by name
    pub fn find_udt(&self, name: &str) -> Option<&UdtDescriptor> {
        self.udts.get(name)
    }

    /// Find an enum by name
    pub fn find_enum(&self, name: &str) -> Option<&EnumDescriptor> {
        self.enums.get(name)
    }

    /// Find a function by name
    pub fn find_function(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions.get(name)
    }

    /// Number of registered UDTs
    pub fn udt_count(&self) -> usize {
        self.udts.len()
    }

    /// Number of registered enums
    pub fn enum_count(&self) -> usize {
        self.enums.len()
    }

    /// Number of registered functions
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}

fn insert_new<T>(map: &mut HashMap<String, T>, name: String, descriptor: T, kind: &str) -> usize {
    if map.contains_key(&name) {
        debug!(kind, name = %name, "Ignoring re-registration of existing type");
        return 0;
    }
    map.insert(name, descriptor);
    1
}
