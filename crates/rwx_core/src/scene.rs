//! Scene graph types for RWX models.
//!
//! Nodes live in an index-addressed arena owned by the [`Scene`]. Each node
//! is a group, a triangle mesh or a set of wireframe line segments; meshes
//! are immutable and shared by reference, so copying a subtree only
//! duplicates the node records and their transforms.

use std::sync::Arc;

use rwx_math::{Aabb, Mat4, Mat4Ext};
use serde::{Deserialize, Serialize};

use crate::flatten::{flatten_scene, FlatModel};
use crate::mesh::{LineSegments, Mesh};

/// Handle to a node inside one [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Facing hint stored on the root of a model.
///
/// Renderers use it to turn the model towards the viewer; it is never applied
/// to geometry here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisAlignment {
    #[default]
    None,
    ZOrientX,
    ZOrientY,
    Xyz,
}

/// Metadata attached to the model root.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootMetadata {
    pub axis_alignment: AxisAlignment,
}

/// Payload of a scene node.
#[derive(Clone, Debug)]
pub enum NodeKind {
    Group,
    Mesh(Arc<Mesh>),
    Lines(Arc<LineSegments>),
}

/// A single entry in the scene arena.
#[derive(Clone, Debug)]
pub struct SceneNode {
    pub kind: NodeKind,

    /// Local transform relative to the parent
    pub transform: Mat4,

    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,

    /// Prototype name for template roots and their instances
    pub name: Option<String>,
}

impl SceneNode {
    fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            transform: Mat4::IDENTITY,
            parent,
            children: Vec::new(),
            name: None,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group)
    }

    pub fn mesh(&self) -> Option<&Arc<Mesh>> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn lines(&self) -> Option<&Arc<LineSegments>> {
        match &self.kind {
            NodeKind::Lines(lines) => Some(lines),
            _ => None,
        }
    }
}

/// A loaded RWX model: a tree of groups, meshes and line sets under one root.
#[derive(Clone, Debug)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    root: NodeId,
    metadata: RootMetadata,

    /// Scene name (usually from filename)
    pub name: String,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("")
    }
}

impl Scene {
    /// Create a scene holding only an empty root group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            nodes: vec![SceneNode::new(NodeKind::Group, None)],
            root: NodeId(0),
            metadata: RootMetadata::default(),
            name: name.into(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)
    }

    /// Child ids of `id` in insertion order; empty for unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |node| node.children.as_slice())
    }

    pub fn metadata(&self) -> &RootMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut RootMetadata {
        &mut self.metadata
    }

    /// Add a node under `parent`, or detached when `parent` is `None`.
    /// Add a node under `parent`, or detached when `parent` is `None`.
    ///
    /// Only groups take children; a mesh or line parent leaves the new node
    /// detached.
    pub fn add_node(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent = parent.filter(|p| match self.nodes.get(p.0) {
            Some(node) if node.is_group() => true,
            _ => {
                log::warn!("Node {:?} cannot take children, {:?} left detached", p, id);
                false
            }
        });

        self.nodes.push(SceneNode::new(kind, parent));
        if let Some(node) = parent.and_then(|p| self.nodes.get_mut(p.0)) {
            node.children.push(id);
        }

        id
    }

    pub fn add_group(&mut self, parent: NodeId) -> NodeId {
        self.add_node(Some(parent), NodeKind::Group)
    }

    pub fn add_mesh(&mut self, parent: NodeId, mesh: Arc<Mesh>) -> NodeId {
        self.add_node(Some(parent), NodeKind::Mesh(mesh))
    }

    pub fn add_lines(&mut self, parent: NodeId, lines: Arc<LineSegments>) -> NodeId {
        self.add_node(Some(parent), NodeKind::Lines(lines))
    }

    /// Copy the subtree rooted at `source` and attach the copy under `parent`.
    ///
    /// Meshes are shared with the source; node records and transforms are
    /// independent. Returns the id of the copied root, or `None` if `source`
    /// does not exist.
    pub fn clone_subtree(&mut self, source: NodeId, parent: NodeId) -> Option<NodeId> {
        let copied = self.collect_subtree(source)?;
        let offset = self.nodes.len();

        for (i, mut node) in copied.into_iter().enumerate() {
            node.parent = if i == 0 {
                Some(parent)
            } else {
                node.parent.map(|p| NodeId(p.0 + offset))
            };
            for child in &mut node.children {
                child.0 += offset;
            }
            self.nodes.push(node);
        }

        let id = NodeId(offset);
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.push(id);
        }
        Some(id)
    }

    /// A new scene containing only the subtree under `root`, compacted so
    /// that unreachable nodes are dropped.
    pub fn extract(&self, root: NodeId) -> Scene {
        let mut nodes = self.collect_subtree(root).unwrap_or_default();
        if nodes.is_empty() {
            nodes.push(SceneNode::new(NodeKind::Group, None));
        }
        nodes[0].parent = None;

        Scene {
            nodes,
            root: NodeId(0),
            metadata: self.metadata,
            name: self.name.clone(),
        }
    }

    /// Depth-first copy of a subtree with ids rebased to start at 0.
    fn collect_subtree(&self, source: NodeId) -> Option<Vec<SceneNode>> {
        self.node(source)?;

        let mut order = Vec::new();
        let mut stack = vec![source];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev());
        }

        let mut remap = vec![usize::MAX; self.nodes.len()];
        for (new_index, id) in order.iter().enumerate() {
            remap[id.0] = new_index;
        }

        let copied = order
            .iter()
            .map(|id| {
                let mut node = self.nodes[id.0].clone();
                node.parent = node
                    .parent
                    .and_then(|p| (remap[p.0] != usize::MAX).then(|| NodeId(remap[p.0])));
                node.children = node.children.iter().map(|c| NodeId(remap[c.0])).collect();
                node
            })
            .collect();

        Some(copied)
    }

    /// Get total node count, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of mesh nodes reachable from the root.
    pub fn mesh_count(&self) -> usize {
        self.meshes().len()
    }

    /// Get total triangle count across all reachable meshes.
    pub fn total_triangle_count(&self) -> usize {
        self.meshes()
            .iter()
            .map(|(_, _, mesh)| mesh.triangle_count())
            .sum()
    }

    /// Product of every local transform from the root down to `id`.
    pub fn world_transform(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut cursor = self.node(id);

        while let Some(node) = cursor {
            matrix = node.transform * matrix;
            cursor = node.parent.and_then(|p| self.node(p));
        }

        matrix
    }

    /// Every mesh reachable from the root with its world transform, in
    /// depth-first child order.
    pub fn meshes(&self) -> Vec<(NodeId, Mat4, &Mesh)> {
        let mut result = Vec::new();
        self.visit_meshes(self.root, Mat4::IDENTITY, &mut result);
        result
    }

    fn visit_meshes<'a>(&'a self, id: NodeId, parent: Mat4, out: &mut Vec<(NodeId, Mat4, &'a Mesh)>) {
        let Some(node) = self.node(id) else {
            return;
        };

        let world = parent * node.transform;
        if let NodeKind::Mesh(mesh) = &node.kind {
            out.push((id, world, mesh.as_ref()));
        }
        for child in &node.children {
            self.visit_meshes(*child, world, out);
        }
    }

    /// Compute the world-space bounding box of all reachable meshes.
    pub fn world_bounds(&self) -> Aabb {
        self.meshes()
            .iter()
            .fold(Aabb::EMPTY, |bounds, (_, matrix, mesh)| {
                Aabb::surrounding(&bounds, &matrix.transform_aabb(&mesh.bounds))
            })
    }

    /// Merge the whole hierarchy into a single mesh.
    pub fn flatten(&self) -> FlatModel {
        flatten_scene(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rwx_math::Vec3;

    fn triangle() -> Arc<Mesh> {
        Arc::new(Mesh::untextured(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2]))
    }

    #[test]
    fn test_scene_creation() {
        let mut scene = Scene::new("test");
        let root = scene.root();

        let group = scene.add_group(root);
        scene.add_mesh(group, triangle());
        scene.add_mesh(root, triangle());

        assert_eq!(scene.node_count(), 4);
        assert_eq!(scene.children(root).len(), 2);
        assert_eq!(scene.mesh_count(), 2);
        assert_eq!(scene.total_triangle_count(), 2);
        assert_eq!(scene.node(group).unwrap().parent, Some(root));
        assert!(scene.node(group).unwrap().is_group());
    }

    #[test]
    fn test_mesh_nodes_take_no_children() {
        let mut scene = Scene::new("test");
        let mesh = scene.add_mesh(scene.root(), triangle());
        assert!(!scene.node(mesh).unwrap().is_group());

        let orphan = scene.add_group(mesh);
        assert!(scene.children(mesh).is_empty());
        assert_eq!(scene.node(orphan).unwrap().parent, None);
        assert_eq!(scene.mesh_count(), 1);
    }

    #[test]
    fn test_world_transform_composes_parents() {
        let mut scene = Scene::new("test");
        let root = scene.root();
        scene.node_mut(root).unwrap().transform = Mat4::from_scale(Vec3::splat(10.0));

        let group = scene.add_group(root);
        scene.node_mut(group).unwrap().transform = Mat4::from_translation(Vec3::X);
        let mesh = scene.add_mesh(group, triangle());

        let p = scene.world_transform(mesh).transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-5);

        let bounds = scene.world_bounds();
        assert!((bounds.min - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-5);
        assert!((bounds.max - Vec3::new(20.0, 10.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_clone_subtree_is_independent() {
        let mut scene = Scene::new("test");
        let root = scene.root();

        let template = scene.add_node(None, NodeKind::Group);
        let inner = scene.add_group(template);
        scene.add_mesh(inner, triangle());

        let a = scene.clone_subtree(template, root).unwrap();
        let b = scene.clone_subtree(template, root).unwrap();
        scene.node_mut(a).unwrap().transform = Mat4::from_translation(Vec3::Z);

        assert_eq!(scene.children(root), &[a, b]);
        assert_eq!(scene.node(b).unwrap().transform, Mat4::IDENTITY);
        assert_eq!(scene.node(template).unwrap().transform, Mat4::IDENTITY);
        assert_eq!(scene.mesh_count(), 2);

        // Both copies point at the same immutable mesh.
        let meshes = scene.meshes();
        assert!(std::ptr::eq(meshes[0].2, meshes[1].2));
    }

    #[test]
    fn test_extract_drops_detached_nodes() {
        let mut scene = Scene::new("test");
        let root = scene.root();
        let template = scene.add_node(None, NodeKind::Group);
        scene.add_mesh(template, triangle());
        scene.add_mesh(root, triangle());
        scene.metadata_mut().axis_alignment = AxisAlignment::ZOrientY;

        let extracted = scene.extract(root);

        assert_eq!(extracted.node_count(), 2);
        assert_eq!(extracted.root(), NodeId(0));
        assert_eq!(extracted.metadata().axis_alignment, AxisAlignment::ZOrientY);
        assert_eq!(extracted.node(NodeId(1)).unwrap().parent, Some(NodeId(0)));
    }

    #[test]
    fn test_children_of_unknown_node_is_empty() {
        let scene = Scene::new("test");
        assert!(scene.children(NodeId(42)).is_empty());
        assert!(scene.world_bounds().is_empty());
    }
}
