//! Scene graph for displayed objects.
//!
//! The scene owns every displayed node. Nodes form a tree under a root group;
//! detaching a node hands it (and its content) back to the caller, who is
//! responsible for releasing any GPU-backed resources it owns.

mod node;

pub use node::*;

use std::collections::HashMap;
use std::sync::Arc;

use glam::Mat4;
use parking_lot::RwLock;

/// Scene shared between clients and the renderer.
pub type SharedScene = Arc<RwLock<Scene>>;

/// Scene containing all displayed nodes.
pub struct Scene {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    dirty: bool,
}

impl Scene {
    /// Creates a scene holding only its root group.
    pub fn new() -> Self {
        let root = Node::group("root");
        let root_id = root.id;
        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);
        Self {
            nodes,
            root: root_id,
            dirty: false,
        }
    }

    /// Creates a scene wrapped for sharing.
    pub fn shared() -> SharedScene {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Returns the root group.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns true if the scene has been modified since last render.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Marks the scene as clean (called after rendering).
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Marks the scene as dirty (needs re-render).
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Attaches `node` under `parent`.
    ///
    /// Hands the node back as `Err` if the parent does not exist.
    pub fn add(&mut self, parent: NodeId, mut node: Node) -> Result<NodeId, Node> {
        let Some(parent_node) = self.nodes.get_mut(&parent) else {
            return Err(node);
        };
        let id = node.id;
        parent_node.children.push(id);
        node.parent = Some(parent);
        self.nodes.insert(id, node);
        self.dirty = true;
        Ok(id)
    }

    /// Attaches `node` under the root group.
    pub fn add_to_root(&mut self, node: Node) -> NodeId {
        let id = node.id;
        let root = self.root;
        let _ = self.add(root, node);
        id
    }

    /// Gets a node by ID.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Gets a mutable reference to a node by ID.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.dirty = true;
        self.nodes.get_mut(&id)
    }

    /// Returns true if the scene contains a node with the given ID.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Children of a node (empty if unknown).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Detaches a node from its parent and removes it from the scene.
    ///
    /// Descendants are removed as well and dropped; use
    /// [`Scene::remove_subtree`] to get them back. The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        self.remove_subtree(id).into_iter().next()
    }

    /// Detaches a node and returns it followed by all its descendants.
    pub fn remove_subtree(&mut self, id: NodeId) -> Vec<Node> {
        if id == self.root || !self.nodes.contains_key(&id) {
            return Vec::new();
        }

        if let Some(parent_id) = self.parent(id)
            && let Some(parent) = self.nodes.get_mut(&parent_id)
        {
            parent.children.retain(|c| *c != id);
        }

        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(mut node) = self.nodes.remove(&current) {
                stack.extend(node.children.iter().rev().copied());
                if current == id {
                    node.parent = None;
                }
                removed.push(node);
            }
        }

        self.dirty = true;
        removed
    }

    /// Moves a node under a new parent, keeping its local transform.
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> bool {
        if id == self.root || !self.nodes.contains_key(&new_parent) {
            return false;
        }
        // Refuse to create a cycle
        if self.ancestors(new_parent).any(|a| a == id) || new_parent == id {
            return false;
        }
        let Some(old_parent) = self.parent(id) else {
            return false;
        };

        if let Some(parent) = self.nodes.get_mut(&old_parent) {
            parent.children.retain(|c| *c != id);
        }
        if let Some(parent) = self.nodes.get_mut(&new_parent) {
            parent.children.push(id);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(new_parent);
        }
        self.dirty = true;
        true
    }

    /// Iterates from the parent of `id` up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// Gets the world transform of a node.
    pub fn world_transform(&self, id: NodeId) -> Mat4 {
        let Some(node) = self.nodes.get(&id) else {
            return Mat4::IDENTITY;
        };

        // Build transform chain from the node up to the root
        let mut transform = node.transform;
        for ancestor in self.ancestors(id) {
            if let Some(a) = self.nodes.get(&ancestor) {
                transform = a.transform * transform;
            }
        }
        transform
    }

    /// Whether a node and all of its ancestors are visible.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        node.visible
            && self
                .ancestors(id)
                .all(|a| self.nodes.get(&a).is_some_and(|n| n.visible))
    }

    /// Sets a node's local transform.
    pub fn set_transform(&mut self, id: NodeId, transform: Mat4) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.transform = transform;
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Sets a node's visibility.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.visible = visible;
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Returns the number of nodes including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if only the root remains.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Returns an iterator over all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Height maps with their node IDs.
    pub fn height_maps(&self) -> impl Iterator<Item = (NodeId, &crate::heightmap::HeightMap)> {
        self.nodes
            .values()
            .filter_map(|n| n.as_height_map().map(|m| (n.id, m)))
    }

    /// Mesh containers with their node IDs.
    pub fn meshes(&self) -> impl Iterator<Item = (NodeId, &SharedMeshResource)> {
        self.nodes.values().filter_map(|n| match &n.content {
            NodeContent::Mesh(mesh) => Some((n.id, mesh)),
            _ => None,
        })
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
