//! Working material state and material deduplication.
//!
//! Resources are created once per distinct signature for the whole parse.
//! Each leaf mesh also keeps its own ordered material list; faces refer to
//! materials by their slot in that list. A new slot is appended every time
//! the resolved signature differs from the previous one, so the same
//! material can occupy several slots of one list.

use std::collections::HashMap;
use std::sync::Arc;

use super::command::Command;
use crate::material::{Material, MaterialResource};
use crate::texture::TextureResolver;

pub struct MaterialRegistry {
    resolver: Arc<dyn TextureResolver>,
    current: Material,

    /// Every resource created so far, in creation order
    resources: Vec<Arc<MaterialResource>>,
    by_signature: HashMap<String, usize>,

    local: Vec<Arc<MaterialResource>>,
    local_signature: Option<String>,
}

impl MaterialRegistry {
    pub fn new(resolver: Arc<dyn TextureResolver>) -> Self {
        Self {
            resolver,
            current: Material::default(),
            resources: Vec::new(),
            by_signature: HashMap::new(),
            local: Vec::new(),
            local_signature: None,
        }
    }

    /// The working material.
    pub fn current(&self) -> &Material {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut Material {
        &mut self.current
    }

    /// Apply a material-editing command. Returns false for any other command.
    pub fn apply(&mut self, command: &Command) -> bool {
        let material = &mut self.current;

        match command {
            Command::Texture { name, mask } => {
                material.texture = name.clone();
                material.mask = mask.clone();
            }
            Command::Color(color) => material.color = *color,
            Command::Opacity(opacity) => material.opacity = *opacity,
            Command::Surface(surface) => material.surface = *surface,
            Command::Ambient(value) => material.surface.x = *value,
            Command::Diffuse(value) => material.surface.y = *value,
            Command::Specular(value) => material.surface.z = *value,
            Command::MaterialMode(mode) => material.material_mode = *mode,
            Command::TextureModes { modes, additive } => {
                if !*additive {
                    material.texture_modes.clear();
                }
                for mode in modes {
                    if !material.texture_modes.contains(mode) {
                        material.texture_modes.push(*mode);
                    }
                }
            }
            Command::Collision(collision) => material.collision = *collision,
            Command::LightSampling(sampling) => material.light_sampling = *sampling,
            Command::GeometrySampling(sampling) => material.geometry_sampling = *sampling,
            _ => return false,
        }

        true
    }

    /// Slot of the working material in the current leaf's material list.
    pub fn resolve_current(&mut self) -> usize {
        let signature = self.current.signature();

        if self.local_signature.as_deref() != Some(signature.as_str()) {
            let resource = self.resource_for(&signature);
            self.local.push(resource);
            self.local_signature = Some(signature);
        }

        self.local.len() - 1
    }

    fn resource_for(&mut self, signature: &str) -> Arc<MaterialResource> {
        if let Some(&index) = self.by_signature.get(signature) {
            return Arc::clone(&self.resources[index]);
        }

        log::debug!("New material: {}", signature);
        let resource = Arc::new(MaterialResource::new(&self.current, self.resolver.as_ref()));
        self.by_signature
            .insert(signature.to_string(), self.resources.len());
        self.resources.push(Arc::clone(&resource));
        resource
    }

    /// Material list of the current leaf, indexed by slot.
    pub fn local_materials(&self) -> &[Arc<MaterialResource>] {
        &self.local
    }

    /// Every distinct material resolved during this parse.
    pub fn resources(&self) -> &[Arc<MaterialResource>] {
        &self.resources
    }

    /// Clear the leaf material list and restore the default working material.
    ///
    /// Resources already created stay cached for the rest of the parse.
    pub fn reset(&mut self) {
        self.local.clear();
        self.local_signature = None;
        self.current = Material::default();
    }
}
