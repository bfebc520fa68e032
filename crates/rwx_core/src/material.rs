//! RWX material state and resolved material resources.
//!
//! A [`Material`] is the mutable working state the grammar edits line by
//! line. Whenever geometry needs it, the material is frozen into a
//! [`MaterialResource`], keyed by its [signature](Material::signature) so that
//! identical states share one resource.

use std::fmt;
use std::sync::Arc;

use futures::future::FutureExt;
use rwx_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::texture::{ResourceResult, Texture, TextureHandle, TextureResolver};

/// How lighting is evaluated across a face.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightSampling {
    #[default]
    Facet = 1,
    Vertex = 2,
}

/// How faces are rasterised.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometrySampling {
    PointCloud = 1,
    Wireframe = 2,
    #[default]
    Solid = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureMode {
    Lit = 1,
    Foreshorten = 2,
    Filter = 3,
}

/// Which sides of a face are drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialMode {
    /// Faces are not drawn at all
    None = 0,
    /// Front side only
    #[default]
    Null = 1,
    /// Both sides
    Double = 2,
}

/// Working material state.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Base colour (RGB, 0-1)
    pub color: Vec3,

    /// Ambient, diffuse and specular factors
    pub surface: Vec3,

    /// Opacity (0=transparent, 1=opaque)
    pub opacity: f32,

    pub light_sampling: LightSampling,
    pub geometry_sampling: GeometrySampling,

    /// Enabled texture modes, in declaration order
    pub texture_modes: Vec<TextureMode>,

    pub material_mode: MaterialMode,

    /// Texture name without folder or extension
    pub texture: Option<String>,

    /// Mask name without folder or extension
    pub mask: Option<String>,

    pub collision: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Vec3::ZERO,
            surface: Vec3::ZERO,
            opacity: 1.0,
            light_sampling: LightSampling::Facet,
            geometry_sampling: GeometrySampling::Solid,
            texture_modes: vec![TextureMode::Lit],
            material_mode: MaterialMode::Null,
            texture: None,
            mask: None,
            collision: true,
        }
    }
}

impl Material {
    /// Canonical string identifying this material state.
    ///
    /// Floats are written with three decimals, so states that only differ
    /// below that precision share a signature.
    pub fn signature(&self) -> String {
        let mut sign = format!(
            "{:.3}{:.3}{:.3}{:.3}{:.3}{:.3}{:.3}",
            unsigned_zero(self.color.x),
            unsigned_zero(self.color.y),
            unsigned_zero(self.color.z),
            unsigned_zero(self.surface.x),
            unsigned_zero(self.surface.y),
            unsigned_zero(self.surface.z),
            unsigned_zero(self.opacity)
        );

        sign.push_str(&(self.light_sampling as u8).to_string());
        sign.push_str(&(self.geometry_sampling as u8).to_string());
        for mode in &self.texture_modes {
            sign.push_str(&(*mode as u8).to_string());
        }
        sign.push_str(&(self.material_mode as u8).to_string());

        if let Some(texture) = &self.texture {
            sign.push_str(texture);
        }
        if let Some(mask) = &self.mask {
            sign.push_str(mask);
        }

        sign.push_str(if self.collision { "true" } else { "false" });
        sign
    }

    /// Colour packed as `0xRRGGBB`.
    pub fn color_rgb(&self) -> u32 {
        pack_rgb(self.color)
    }
}

/// Turn `-0.0` into `0.0` so both print the same.
fn unsigned_zero(value: f32) -> f32 {
    value + 0.0
}

/// Pack a 0-1 RGB triple as `0xRRGGBB`, truncating each channel.
fn pack_rgb(color: Vec3) -> u32 {
    let channel = |v: f32| ((v * 255.0).clamp(0.0, 255.0) as u32) & 0xff;
    (channel(color.x) << 16) | (channel(color.y) << 8) | channel(color.z)
}

/// Face culling derived from the material mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Front,
    Double,
}

/// Renderer-facing description of a resolved material.
#[derive(Clone, Debug, PartialEq)]
pub struct Appearance {
    pub side: Side,
    pub visible: bool,
    pub transparent: bool,
    pub flat_shading: bool,
    pub wireframe: bool,

    /// Diffuse colour; white when a texture supplies the colour
    pub color: Vec3,

    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub shininess: f32,
    pub opacity: f32,

    /// Alpha cutoff, set when a mask is applied
    pub alpha_test: Option<f32>,

    pub collision: bool,
}

impl Appearance {
    /// Phong shininess used for every RWX material.
    pub const SHININESS: f32 = 30.0;

    /// Alpha cutoff used with masks.
    pub const MASK_ALPHA_TEST: f32 = 0.2;

    pub fn from_material(material: &Material) -> Self {
        let textured = material.texture.is_some();
        let masked = textured && material.mask.is_some();

        Self {
            side: match material.material_mode {
                MaterialMode::Double => Side::Double,
                MaterialMode::Null | MaterialMode::None => Side::Front,
            },
            visible: material.material_mode != MaterialMode::None,
            transparent: material.opacity < 1.0 || masked,
            flat_shading: material.light_sampling == LightSampling::Facet,
            wireframe: material.geometry_sampling < GeometrySampling::Solid,
            color: if textured { Vec3::ONE } else { material.color },
            ambient: material.surface.x,
            diffuse: material.surface.y,
            specular: material.surface.z,
            shininess: Self::SHININESS,
            opacity: material.opacity,
            alpha_test: masked.then_some(Self::MASK_ALPHA_TEST),
            collision: material.collision,
        }
    }

    /// Specular term under a white light, packed as `0xRRGGBB`.
    pub fn specular_rgb(&self) -> u32 {
        pack_rgb(Vec3::splat(self.specular))
    }
}

/// A material frozen for rendering, shared by every face batch using it.
///
/// Texture and mask requests start when the resource is created. Until they
/// settle, [`texture`](Self::texture) and [`mask`](Self::mask) return `None`
/// and the material renders untextured.
pub struct MaterialResource {
    signature: String,
    appearance: Appearance,
    texture_name: Option<String>,
    mask_name: Option<String>,
    texture: Option<TextureHandle>,
    mask: Option<TextureHandle>,
}

impl MaterialResource {
    pub fn new(material: &Material, resolver: &dyn TextureResolver) -> Self {
        let texture_name = material.texture.clone();
        // Masks only apply on top of a texture.
        let mask_name = texture_name.as_ref().and(material.mask.clone());

        let texture = texture_name
            .as_deref()
            .map(|name| resolver.resolve_texture(name).shared());
        let mask = mask_name
            .as_deref()
            .map(|name| resolver.resolve_mask(name).shared());

        Self {
            signature: material.signature(),
            appearance: Appearance::from_material(material),
            texture_name,
            mask_name,
            texture,
            mask,
        }
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    pub fn texture_name(&self) -> Option<&str> {
        self.texture_name.as_deref()
    }

    pub fn mask_name(&self) -> Option<&str> {
        self.mask_name.as_deref()
    }

    /// The loaded texture, if its request has settled successfully.
    pub fn texture(&self) -> Option<Arc<Texture>> {
        settled(self.texture.as_ref())
    }

    /// The loaded mask, if its request has settled successfully.
    pub fn mask(&self) -> Option<Arc<Texture>> {
        settled(self.mask.as_ref())
    }

    /// Handles for every request this material issued.
    pub fn handles(&self) -> impl Iterator<Item = &TextureHandle> {
        self.texture.iter().chain(self.mask.iter())
    }

    /// True once every request has settled, successfully or not.
    pub fn is_settled(&self) -> bool {
        self.handles().all(|handle| poll_settled(handle).is_some())
    }
}

/// Result of `handle` if its request has finished, without blocking.
///
/// A finished background load sits in the handle's inner future until
/// something polls it, so an unsettled handle is polled once here.
fn poll_settled(handle: &TextureHandle) -> Option<ResourceResult<Arc<Texture>>> {
    if let Some(result) = handle.peek() {
        return Some(result.clone());
    }
    handle.clone().now_or_never()
}

fn settled(handle: Option<&TextureHandle>) -> Option<Arc<Texture>> {
    poll_settled(handle?)?.ok()
}

impl fmt::Debug for MaterialResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterialResource")
            .field("signature", &self.signature)
            .field("texture", &self.texture_name)
            .field("mask", &self.mask_name)
            .field("settled", &self.is_settled())
            .finish()
    }
}
