//! The session-scoped editor context
//!
//! [`Editor`] owns the type registry, the graph, the worklist, the linking
//! gesture and the rendering surface for one editing session. It never
//! performs I/O itself: operations that need a type bundle return the bundle
//! file name, and the caller feeds the outcome back through
//! [`Editor::complete_fetch`].

use std::collections::{HashMap, HashSet};

use blueprint_types::{bundle_file_name, FetchError, TypeBundle, TypeError, TypeRef, TypeRegistry};
use tracing::{debug, error, info, warn};

use crate::error::{EditorError, GraphError};
use crate::graph::{Graph, InputRef, NodeId, OutputRef, Position, SlotRef};
use crate::interaction::{ClickOutcome, GestureAction, LinkGesture};
use crate::render::{NullSurface, RenderSurface};
use crate::worklist::{LinkDirective, Worklist};

/// Description of a node to create
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    /// Bare (`Sprite`) or compound (`flame_graphics.dll:Sprite`) type name
    pub type_name: String,
    /// Unique node name
    pub name: String,
    /// Initial position
    pub position: Position,
}

impl NodeSpec {
    /// Create a node description
    pub fn new(type_name: impl Into<String>, name: impl Into<String>, position: Position) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
            position,
        }
    }
}

/// Editor context
pub struct Editor {
    registry: TypeRegistry,
    graph: Graph,
    worklist: Worklist,
    gesture: LinkGesture,
    /// Nodes waiting for a bundle, keyed by bundle file name
    waiting: HashMap<String, Vec<NodeId>>,
    in_flight: HashSet<String>,
    surface: Box<dyn RenderSurface>,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("nodes", &self.graph.len())
            .field("pending_links", &self.worklist.len())
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

impl Editor {
    /// Create an editor over a preloaded registry, drawing nothing
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry,
            graph: Graph::new(),
            worklist: Worklist::new(),
            gesture: LinkGesture::new(),
            waiting: HashMap::new(),
            in_flight: HashSet::new(),
            surface: Box::new(NullSurface),
        }
    }

    /// Draw through the given surface
    pub fn with_surface(mut self, surface: Box<dyn RenderSurface>) -> Self {
        self.surface = surface;
        self
    }

    /// The type registry
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The active graph
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The staged link directives
    pub fn worklist(&self) -> &Worklist {
        &self.worklist
    }

    /// Number of staged link directives
    pub fn pending_links(&self) -> usize {
        self.worklist.len()
    }

    /// Bundle files requested but not completed yet
    pub fn pending_fetches(&self) -> Vec<&str> {
        let mut files: Vec<&str> = self.in_flight.iter().map(String::as_str).collect();
        files.sort_unstable();
        files
    }

    /// The slot waiting for a counterpart
    pub fn pending_slot(&self) -> Option<SlotRef> {
        self.gesture.pending()
    }

    /// Replace the whole graph with a snapshot.
    ///
    /// Every bare type is checked first; an unregistered one rejects the
    /// snapshot before anything changes. The graph is then torn down before any node is created, every node is
    /// created before any link is resolved, and the worklist is replaced by
    /// `links`. Returns the bundle files that must be fetched; each must be
    /// answered with [`Editor::complete_fetch`].
    pub fn load_snapshot(
        &mut self,
        nodes: Vec<NodeSpec>,
        links: Vec<LinkDirective>,
    ) -> Result<Vec<String>, EditorError> {
        // A fatal snapshot leaves the current graph and worklist untouched
        for spec in &nodes {
            if let Err(TypeError::UnknownLocalType(type_name)) = self.registry.resolve(&TypeRef::parse(&spec.type_name)) {
                error!(node = %spec.name, type_name = %type_name, "Snapshot uses an unregistered local type");
                return Err(EditorError::UnknownLocalType {
                    node: spec.name.clone(),
                    type_name,
                });
            }
        }

        self.graph.replace_all(Vec::new())?;
        self.waiting.clear();
        self.gesture.cancel();
        self.surface.clear();

        let mut fetches = Vec::new();
        for spec in nodes {
            match self.create_node(spec) {
                Ok((_, Some(file))) => fetches.push(file),
                Ok((_, None)) => {}
                Err(EditorError::Graph(GraphError::DuplicateNode(name))) => {
                    warn!(node = %name, "Skipping duplicate node in snapshot");
                }
                Err(err) => return Err(err),
            }
        }

        self.worklist.replace(links);
        let linked = self.resolve_links();

        info!(
            generation = self.graph.generation(),
            nodes = self.graph.len(),
            linked,
            staged = self.worklist.len(),
            fetches = fetches.len(),
            "Applied snapshot"
        );

        Ok(fetches)
    }

    /// Create a node.
    ///
    /// A bare type that is not registered is fatal. A compound type that is
    /// not registered yields a slot-less node; unless its bundle has already
    /// been loaded, the node waits for the bundle and the bundle file name is
    /// returned when a fetch has to be started for it.
    pub fn create_node(&mut self, spec: NodeSpec) -> Result<(NodeId, Option<String>), EditorError> {
        let type_ref = TypeRef::parse(&spec.type_name);

        match self.registry.resolve(&type_ref).map(|udt| udt.slot_layout()) {
            Ok(layout) => {
                let id = self
                    .graph
                    .create_node(type_ref, spec.name, spec.position, Some(&layout))?;
                Ok((id, None))
            }
            Err(TypeError::UnknownLocalType(type_name)) => {
                error!(node = %spec.name, type_name = %type_name, "Node uses an unregistered local type");
                Err(EditorError::UnknownLocalType {
                    node: spec.name,
                    type_name,
                })
            }
            Err(TypeError::UnknownRemoteType { origin, name }) => {
                let file = bundle_file_name(&origin);
                let node_name = spec.name.clone();
                let id = self.graph.create_node(type_ref, spec.name, spec.position, None)?;

                if self.registry.is_bundle_loaded(&file) {
                    warn!(node = %node_name, type_name = %name, bundle = %file, "Type missing from loaded bundle");
                    self.graph.mark_failed(id)?;
                    return Ok((id, None));
                }

                debug!(node = %node_name, type_name = %name, bundle = %file, "Deferring slots until bundle arrives");
                self.waiting.entry(file.clone()).or_default().push(id);

                if self.in_flight.insert(file.clone()) {
                    Ok((id, Some(file)))
                } else {
                    Ok((id, None))
                }
            }
        }
    }

    /// Feed back the outcome of a bundle fetch.
    ///
    /// A fetched bundle is merged even when every node that asked for it has
    /// been torn down since. Slots are only built on waiters of the current
    /// graph, with a single resolution attempt each. Returns the nodes that
    /// received slots.
    pub fn complete_fetch(&mut self, file: &str, result: Result<TypeBundle, FetchError>) -> Vec<NodeId> {
        self.in_flight.remove(file);
        let waiters = self.waiting.remove(file).unwrap_or_default();

        let bundle = match result {
            Ok(bundle) => bundle,
            Err(err) => {
                warn!(bundle = %file, error = %err, code = err.error_code(), "Type bundle fetch failed");
                for id in waiters {
                    // Stale waiters belong to a torn-down graph
                    let _ = self.graph.mark_failed(id);
                }
                return Vec::new();
            }
        };

        self.registry.register_bundle(file, bundle);

        let mut ready = Vec::new();
        for id in waiters {
            let Some(node) = self.graph.node(id) else {
                debug!(node = %id, bundle = %file, "Dropping stale waiter");
                continue;
            };
            let name = node.name().to_string();
            let type_ref = node.type_ref().clone();

            match self.registry.resolve(&type_ref).map(|udt| udt.slot_layout()) {
                Ok(layout) => {
                    if self.graph.install_slots(id, &layout).is_ok() {
                        debug!(node = %name, bundle = %file, "Installed deferred slots");
                        ready.push(id);
                    }
                }
                Err(err) => {
                    warn!(node = %name, bundle = %file, error = %err, "Type still unresolved after fetch");
                    let _ = self.graph.mark_failed(id);
                }
            }
        }

        if !ready.is_empty() {
            self.resolve_links();
        }

        ready
    }

    /// Stage one more link directive and try to resolve it right away
    pub fn stage_link(&mut self, directive: LinkDirective) -> usize {
        self.worklist.stage(directive);
        self.resolve_links()
    }

    /// Resolve every staged directive whose endpoints exist and draw the new
    /// links. Returns how many links were made.
    pub fn resolve_links(&mut self) -> usize {
        let links = self.worklist.try_resolve(&mut self.graph);
        for (input, output) in &links {
            self.draw_link(*input, *output);
        }
        links.len()
    }

    /// Link an input to an output directly, bypassing the worklist
    pub fn connect(&mut self, input: InputRef, output: OutputRef) -> Result<(), EditorError> {
        self.graph.connect(input, output)?;
        self.draw_link(input, output);
        Ok(())
    }

    /// Remove the link held by an input
    pub fn disconnect(&mut self, input: InputRef) -> Option<OutputRef> {
        let previous = self.graph.disconnect(input)?;
        self.surface.erase_connector(input);
        Some(previous)
    }

    /// Move a node and redraw every connector touching it
    pub fn set_position(&mut self, id: NodeId, position: Position) -> Result<(), EditorError> {
        self.graph.set_position(id, position)?;
        for (input, output) in self.graph.links_of(id) {
            self.draw_link(input, output);
        }
        Ok(())
    }

    /// Handle a click on a slot
    pub fn click_slot(&mut self, slot: SlotRef) -> Result<ClickOutcome, EditorError> {
        let input_linked = match slot {
            SlotRef::Input(input) => {
                self.check_slot(input.node, input.index, self.graph.input(input).is_some())?;
                self.graph.input(input).and_then(|s| s.link()).is_some()
            }
            SlotRef::Output(output) => {
                self.check_slot(output.node, output.index, self.graph.output(output).is_some())?;
                false
            }
        };

        match self.gesture.click(slot, input_linked) {
            GestureAction::Begin { sever } => {
                if let Some(input) = sever {
                    self.disconnect(input);
                }
                Ok(ClickOutcome::Pending(slot))
            }
            GestureAction::Complete(input, output) => {
                self.connect(input, output)?;
                Ok(ClickOutcome::Linked(input, output))
            }
            GestureAction::Ignore => Ok(ClickOutcome::Ignored),
        }
    }

    /// Handle a click on empty canvas: drop the pending slot
    pub fn click_canvas(&mut self) -> ClickOutcome {
        if self.gesture.cancel() {
            ClickOutcome::Cleared
        } else {
            ClickOutcome::Ignored
        }
    }

    fn check_slot(&self, node: NodeId, index: usize, exists: bool) -> Result<(), GraphError> {
        if self.graph.node(node).is_none() {
            return Err(GraphError::StaleNode(node));
        }
        if !exists {
            return Err(GraphError::StaleSlot { node, index });
        }
        Ok(())
    }

    fn draw_link(&mut self, input: InputRef, output: OutputRef) {
        let (Some(input_node), Some(output_node)) = (self.graph.node(input.node), self.graph.node(output.node))
        else {
            return;
        };
        let from = self.surface.anchor(output_node, SlotRef::Output(output));
        let to = self.surface.anchor(input_node, SlotRef::Input(input));
        self.surface.draw_connector(input, from, to);
    }
}
