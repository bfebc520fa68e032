//! Parsed RWX statements.
//!
//! A [`Command`] is the immutable result of matching one source line. Vertex
//! indices are already converted to 0-based form and polygon loops are
//! already reversed into the loader's winding.

use rwx_math::{Vec2, Vec3};

use crate::material::{GeometrySampling, LightSampling, MaterialMode, TextureMode};
use crate::scene::AxisAlignment;

/// One recognised RWX statement.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    ModelBegin,
    ModelEnd,
    ClumpBegin,
    ClumpEnd,
    TransformBegin,
    TransformEnd,
    ProtoBegin(String),
    ProtoEnd,
    ProtoInstance(String),

    /// Vertex position with optional texture coordinates as written
    Vertex {
        position: Vec3,
        uv: Option<Vec2>,
    },

    Triangle([u32; 3]),
    Quad([u32; 4]),

    /// Polygon loop, reversed from declaration order
    Polygon(Vec<u32>),

    /// `None` texture means `texture null`
    Texture {
        name: Option<String>,
        mask: Option<String>,
    },

    Color(Vec3),
    Opacity(f32),
    Identity,

    /// Sixteen values in column-major order, exactly as written
    Transform([f32; 16]),

    Translate(Vec3),
    Rotate {
        axis: Vec3,
        angle: f32,
    },
    Scale(Vec3),

    /// Ambient, diffuse and specular factors
    Surface(Vec3),
    Ambient(f32),
    Diffuse(f32),
    Specular(f32),

    MaterialMode(MaterialMode),

    /// `additive` is set for the `addtexturemode` form; an empty list
    /// comes from `texturemode null`
    TextureModes {
        modes: Vec<TextureMode>,
        additive: bool,
    },

    Collision(bool),
    LightSampling(LightSampling),
    GeometrySampling(GeometrySampling),
    AxisAlignment(AxisAlignment),
}

impl Command {
    /// True for commands that edit the working material.
    pub fn is_material_edit(&self) -> bool {
        matches!(
            self,
            Command::Texture { .. }
                | Command::Color(_)
                | Command::Opacity(_)
                | Command::Surface(_)
                | Command::Ambient(_)
                | Command::Diffuse(_)
                | Command::Specular(_)
                | Command::MaterialMode(_)
                | Command::TextureModes { .. }
                | Command::Collision(_)
                | Command::LightSampling(_)
                | Command::GeometrySampling(_)
        )
    }

    /// True for commands that edit the current transform.
    pub fn is_transform_edit(&self) -> bool {
        matches!(
            self,
            Command::Identity
                | Command::Transform(_)
                | Command::Translate(_)
                | Command::Rotate { .. }
                | Command::Scale(_)
                | Command::TransformBegin
                | Command::TransformEnd
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_classes_are_disjoint() {
        let commands = [
            Command::Color(Vec3::ONE),
            Command::Collision(false),
            Command::Translate(Vec3::X),
            Command::TransformEnd,
            Command::ClumpBegin,
            Command::Triangle([0, 1, 2]),
        ];
        let classes: Vec<(bool, bool)> = commands
            .iter()
            .map(|c| (c.is_material_edit(), c.is_transform_edit()))
            .collect();

        assert_eq!(
            classes,
            vec![
                (true, false),
                (true, false),
                (false, true),
                (false, true),
                (false, false),
                (false, false),
            ]
        );
    }
}
