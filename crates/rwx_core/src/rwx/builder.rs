//! Scene assembly from a stream of RWX commands.
//!
//! The builder owns every piece of interpreter state for one parse: the
//! node arena, the transform stacks, the material registry, the leaf
//! geometry buffers and the prototype table. Commands must be applied in
//! source order.

use std::collections::HashMap;
use std::sync::Arc;

use rwx_math::{Mat4, Vec3};

use super::accumulator::GeometryAccumulator;
use super::command::Command;
use super::grammar;
use super::registry::MaterialRegistry;
use super::transform::TransformStack;
use crate::material::{GeometrySampling, MaterialResource};
use crate::scene::{NodeId, NodeKind, Scene};
use crate::texture::TextureResolver;

/// Uniform scale applied to the root at the end of a parse; RWX units are
/// decameters.
pub const ROOT_SCALE: f32 = 10.0;

/// Construction context saved while a prototype body is being built.
struct ProtoContext {
    group: NodeId,
    group_stack: Vec<NodeId>,
    transforms: TransformStack,
}

/// Result of a finished parse.
#[derive(Debug)]
pub struct BuildOutput {
    pub scene: Scene,

    /// Every distinct material resolved, in creation order
    pub materials: Vec<Arc<MaterialResource>>,
}

pub struct SceneBuilder {
    scene: Scene,
    model_started: bool,
    model_ended: bool,

    current_group: NodeId,
    group_stack: Vec<NodeId>,

    transforms: TransformStack,
    registry: MaterialRegistry,
    geometry: GeometryAccumulator,

    prototypes: HashMap<String, NodeId>,
    proto_stack: Vec<ProtoContext>,
}

impl SceneBuilder {
    pub fn new(name: &str, resolver: Arc<dyn TextureResolver>) -> Self {
        let scene = Scene::new(name);
        let root = scene.root();

        Self {
            scene,
            model_started: false,
            model_ended: false,
            current_group: root,
            group_stack: Vec::new(),
            transforms: TransformStack::new(),
            registry: MaterialRegistry::new(resolver),
            geometry: GeometryAccumulator::new(),
            prototypes: HashMap::new(),
            proto_stack: Vec::new(),
        }
    }

    /// True once `modelend` was seen; later commands are ignored.
    pub fn is_finished(&self) -> bool {
        self.model_ended
    }

    /// Apply every command in `text` until `modelend` or the end of input.
    pub fn apply_text(&mut self, text: &str) {
        for command in grammar::commands(text) {
            self.apply(&command);
            if self.is_finished() {
                break;
            }
        }
    }

    pub fn apply(&mut self, command: &Command) {
        if self.model_ended {
            return;
        }

        if matches!(command, Command::ModelBegin) {
            self.begin_model();
            return;
        }
        self.model_started = true;

        match command {
            Command::ModelEnd => {
                self.flush_leaf();
                self.model_ended = true;
            }
            Command::ClumpBegin => self.begin_clump(),
            Command::ClumpEnd => self.end_clump(),
            Command::ProtoBegin(name) => self.begin_proto(name),
            Command::ProtoEnd => self.end_proto(),
            Command::ProtoInstance(name) => self.instance_proto(name),
            Command::Vertex { position, uv } => {
                let transform = self.transforms.final_transform();
                self.geometry.add_vertex(*position, *uv, &transform);
            }
            Command::Triangle(face) => {
                if self.geometry.check_face(face) {
                    let slot = self.registry.resolve_current();
                    self.geometry.add_triangle(*face, slot);
                }
            }
            Command::Quad(face) => self.add_quad(*face),
            Command::Polygon(indices) => {
                if self.geometry.check_face(indices) {
                    let registry = &mut self.registry;
                    self.geometry
                        .add_polygon(indices, || registry.resolve_current());
                }
            }
            Command::AxisAlignment(alignment) => {
                // Always recorded on the model root, whatever the nesting.
                self.scene.metadata_mut().axis_alignment = *alignment;
            }
            other if other.is_transform_edit() => {
                self.transforms.apply(other);
            }
            other if other.is_material_edit() => {
                self.registry.apply(other);
            }
            other => log::debug!("Ignoring {:?}", other),
        }
    }

    fn begin_model(&mut self) {
        if self.model_started {
            log::debug!("Ignoring modelbegin inside an open model");
            return;
        }
        self.model_started = true;
        self.transforms.push_scope();
    }

    fn begin_clump(&mut self) {
        self.flush_leaf();

        let group = self.scene.add_group(self.current_group);
        self.group_stack.push(self.current_group);
        self.current_group = group;
        self.transforms.push_scope();
    }

    fn end_clump(&mut self) {
        let Some(parent) = self.group_stack.pop() else {
            log::warn!("Ignoring clumpend without a matching clumpbegin");
            return;
        };

        self.flush_leaf();
        self.transforms.pop_scope();
        self.current_group = parent;
        self.registry.reset();
    }

    fn begin_proto(&mut self, name: &str) {
        self.flush_leaf();

        self.proto_stack.push(ProtoContext {
            group: self.current_group,
            group_stack: std::mem::take(&mut self.group_stack),
            transforms: std::mem::take(&mut self.transforms),
        });

        let template = self.scene.add_node(None, NodeKind::Group);
        if let Some(node) = self.scene.node_mut(template) {
            node.name = Some(name.to_string());
        }
        if self.prototypes.insert(name.to_string(), template).is_some() {
            log::debug!("Prototype {} redefined", name);
        }

        self.current_group = template;
        self.registry.reset();
    }

    fn end_proto(&mut self) {
        let Some(saved) = self.proto_stack.pop() else {
            log::warn!("Ignoring protoend without a matching protobegin");
            return;
        };

        self.flush_leaf();
        self.current_group = saved.group;
        self.group_stack = saved.group_stack;
        self.transforms = saved.transforms;
        self.registry.reset();
    }

    fn instance_proto(&mut self, name: &str) {
        let Some(&template) = self.prototypes.get(name) else {
            log::warn!("Unknown prototype {}, instance skipped", name);
            return;
        };

        let placement = self.transforms.final_transform();
        if let Some(instance) = self.scene.clone_subtree(template, self.current_group) {
            if let Some(node) = self.scene.node_mut(instance) {
                node.transform = placement * node.transform;
            }
        }
    }

    fn add_quad(&mut self, face: [u32; 4]) {
        if !self.geometry.check_face(&face) {
            return;
        }

        let material = self.registry.current();
        if material.geometry_sampling == GeometrySampling::Wireframe {
            let color = material.color;
            let lines = self.geometry.quad_outline(face, color);
            self.scene.add_lines(self.current_group, Arc::new(lines));
        } else {
            let slot = self.registry.resolve_current();
            self.geometry.add_quad(face, slot);
        }
    }

    /// Turn the open leaf buffers into a mesh under the current group.
    fn flush_leaf(&mut self) {
        if let Some(mesh) = self.geometry.finish(self.registry.local_materials()) {
            self.scene.add_mesh(self.current_group, Arc::new(mesh));
        }
    }

    /// The scene under construction, prototype templates included.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn current_group(&self) -> NodeId {
        self.current_group
    }

    pub fn has_prototype(&self, name: &str) -> bool {
        self.prototypes.contains_key(name)
    }

    pub fn transforms(&self) -> &TransformStack {
        &self.transforms
    }

    pub fn registry(&self) -> &MaterialRegistry {
        &self.registry
    }

    /// Flush what is still open, scale the root and return the model.
    pub fn finish(mut self) -> BuildOutput {
        while !self.proto_stack.is_empty() {
            log::warn!("Closing unterminated prototype body");
            self.end_proto();
        }
        self.flush_leaf();

        let root = self.scene.root();
        if let Some(node) = self.scene.node_mut(root) {
            node.transform = Mat4::from_scale(Vec3::splat(ROOT_SCALE)) * node.transform;
        }

        let scene = self.scene.extract(root);
        log::info!(
            "Built RWX model {}: {} nodes, {} meshes, {} triangles, {} materials, {} prototypes",
            scene.name,
            scene.node_count(),
            scene.mesh_count(),
            scene.total_triangle_count(),
            self.registry.resources().len(),
            self.prototypes.len()
        );

        BuildOutput {
            scene,
            materials: self.registry.resources().to_vec(),
        }
    }
}
