//! Scene node definition.

use std::sync::Arc;

use glam::Mat4;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::heightmap::HeightMap;
use crate::mesh::MeshResource;

/// Identifier of a node in a [`super::Scene`].
pub type NodeId = Uuid;

/// Mesh container shared between the scene and its loader.
pub type SharedMeshResource = Arc<Mutex<MeshResource>>;

/// What a node displays.
#[derive(Debug, Default)]
pub enum NodeContent {
    /// Pure transform node.
    #[default]
    Group,
    /// A height map owning its texture, material and geometry.
    HeightMap(HeightMap),
    /// A mesh container populated by a loader.
    Mesh(SharedMeshResource),
}

impl NodeContent {
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeContent::Group => "Group",
            NodeContent::HeightMap(_) => "HeightMap",
            NodeContent::Mesh(_) => "Mesh",
        }
    }
}

/// A node in the scene graph.
#[derive(Debug)]
pub struct Node {
    /// Unique identifier for this node.
    pub id: NodeId,

    /// Display name.
    pub name: String,

    /// Parent node (None only for the root or a detached node).
    pub parent: Option<NodeId>,

    /// Child nodes in insertion order.
    pub children: Vec<NodeId>,

    /// Transform relative to the parent.
    pub transform: Mat4,

    /// Whether this node (and therefore its subtree) is drawn.
    pub visible: bool,

    pub content: NodeContent,
}

impl Node {
    /// Creates an empty group node.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            parent: None,
            children: Vec::new(),
            transform: Mat4::IDENTITY,
            visible: true,
            content: NodeContent::Group,
        }
    }

    /// Creates a node displaying a height map, placed by the map's own transform.
    pub fn height_map(height_map: HeightMap) -> Self {
        let mut node = Self::group("height_map");
        node.transform = height_map.local_transform();
        node.content = NodeContent::HeightMap(height_map);
        node
    }

    /// Creates a node displaying a mesh container.
    pub fn mesh(name: impl Into<String>, mesh: SharedMeshResource) -> Self {
        let mut node = Self::group(name);
        node.content = NodeContent::Mesh(mesh);
        node
    }

    /// Sets the transform matrix.
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Sets the visibility.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn as_height_map(&self) -> Option<&HeightMap> {
        match &self.content {
            NodeContent::HeightMap(map) => Some(map),
            _ => None,
        }
    }

    /// Takes the height map out of the node, leaving a group behind.
    pub fn take_height_map(&mut self) -> Option<HeightMap> {
        match std::mem::take(&mut self.content) {
            NodeContent::HeightMap(map) => Some(map),
            other => {
                self.content = other;
                None
            }
        }
    }
}
