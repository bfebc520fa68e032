//! Line grammar for RWX text.
//!
//! Matching is a pure function from one cleaned line to an optional
//! [`Command`]. Keywords are case-insensitive. Anything the grammar does not
//! recognise, including lines with malformed or missing numbers, yields
//! `None` and is skipped by the caller. Tokens after the expected arguments
//! are ignored.
//!
//! # Supported Syntax
//!
//! - `modelbegin`, `modelend`, `clumpbegin`, `clumpend`
//! - `transformbegin`, `transformend`
//! - `protobegin <name>`, `protoend`, `protoinstance <name>`
//! - `vertex|vertexext x y z [uv u v]`
//! - `triangle|triangleext i j k`, `quad|quadext i j k l`
//! - `polygon|polygonext n i1 .. in`
//! - `texture <name|null> [mask <name>]`
//! - `color r g b`, `opacity v`, `surface a d s`, `ambient|diffuse|specular v`
//! - `identity`, `transform <16 values>`, `translate x y z`, `scale x y z`,
//!   `rotate x y z angle`
//! - `materialmode(s)|addmaterialmode(s) none|null|double`
//! - `texturemode(s)|addtexturemode(s) lit|foreshorten|filter|null ...`
//! - `collision on|off`, `lightsampling facet|vertex`,
//!   `geometrysampling pointcloud|wireframe|solid`
//! - `axisalignment none|zorientx|zorienty|xyz`

use rwx_math::{Vec2, Vec3};

use super::command::Command;
use crate::material::{GeometrySampling, LightSampling, MaterialMode, TextureMode};
use crate::scene::AxisAlignment;

/// Strip the trailing comment, turn tabs into spaces and trim.
pub fn clean_line(raw: &str) -> String {
    let code = match raw.find('#') {
        Some(pos) => &raw[..pos],
        None => raw,
    };
    code.replace('\t', " ").trim().to_string()
}

/// Split RWX text into cleaned, non-empty lines.
pub fn source_lines(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| c == '\n' || c == '\r')
        .map(clean_line)
        .filter(|line| !line.is_empty())
}

/// Iterate over every recognised command in `text`, in source order.
pub fn commands(text: &str) -> impl Iterator<Item = Command> + '_ {
    source_lines(text).filter_map(|line| match_line(&line))
}

/// Match one cleaned line.
pub fn match_line(line: &str) -> Option<Command> {
    let mut tokens = line.split_whitespace();
    let keyword = tokens.next()?.to_ascii_lowercase();
    let args: Vec<&str> = tokens.collect();

    let command = match keyword.as_str() {
        "modelbegin" => Command::ModelBegin,
        "modelend" => Command::ModelEnd,
        "clumpbegin" => Command::ClumpBegin,
        "clumpend" => Command::ClumpEnd,
        "transformbegin" => Command::TransformBegin,
        "transformend" => Command::TransformEnd,
        "protobegin" => Command::ProtoBegin(parse_name(args.first()?)?),
        "protoend" => Command::ProtoEnd,
        "protoinstance" => Command::ProtoInstance(parse_name(args.first()?)?),
        "vertex" | "vertexext" => parse_vertex(&args)?,
        "triangle" | "triangleext" => Command::Triangle(parse_indices::<3>(&args)?),
        "quad" | "quadext" => Command::Quad(parse_indices::<4>(&args)?),
        "polygon" | "polygonext" => parse_polygon(&args)?,
        "texture" => parse_texture(&args)?,
        "color" => Command::Color(parse_vec3(&args)?),
        "opacity" => Command::Opacity(parse_decimal(args.first()?)?),
        "identity" => Command::Identity,
        "transform" => Command::Transform(parse_decimals::<16>(&args)?),
        "translate" => Command::Translate(parse_vec3(&args)?),
        "scale" => Command::Scale(parse_vec3(&args)?),
        "rotate" => {
            let [x, y, z, angle] = parse_decimals::<4>(&args)?;
            Command::Rotate {
                axis: Vec3::new(x, y, z),
                angle,
            }
        }
        "surface" => Command::Surface(parse_vec3(&args)?),
        "ambient" => Command::Ambient(parse_decimal(args.first()?)?),
        "diffuse" => Command::Diffuse(parse_decimal(args.first()?)?),
        "specular" => Command::Specular(parse_decimal(args.first()?)?),
        "materialmode" | "materialmodes" | "addmaterialmode" | "addmaterialmodes" => {
            Command::MaterialMode(parse_material_mode(args.first()?)?)
        }
        "texturemode" | "texturemodes" => parse_texture_modes(&args, false)?,
        "addtexturemode" | "addtexturemodes" => parse_texture_modes(&args, true)?,
        "collision" => match args.first()?.to_ascii_lowercase().as_str() {
            "on" => Command::Collision(true),
            "off" => Command::Collision(false),
            _ => return None,
        },
        "lightsampling" => match args.first()?.to_ascii_lowercase().as_str() {
            "facet" => Command::LightSampling(LightSampling::Facet),
            "vertex" => Command::LightSampling(LightSampling::Vertex),
            _ => return None,
        },
        "geometrysampling" => match args.first()?.to_ascii_lowercase().as_str() {
            "pointcloud" => Command::GeometrySampling(GeometrySampling::PointCloud),
            "wireframe" => Command::GeometrySampling(GeometrySampling::Wireframe),
            "solid" => Command::GeometrySampling(GeometrySampling::Solid),
            _ => return None,
        },
        "axisalignment" => match args.first()?.to_ascii_lowercase().as_str() {
            "none" => Command::AxisAlignment(AxisAlignment::None),
            "zorientx" => Command::AxisAlignment(AxisAlignment::ZOrientX),
            "zorienty" => Command::AxisAlignment(AxisAlignment::ZOrientY),
            "xyz" => Command::AxisAlignment(AxisAlignment::Xyz),
            _ => return None,
        },
        _ => return None,
    };

    Some(command)
}

/// Parse a plain decimal: optional sign, digits with an optional fraction,
/// or a bare fraction. Exponents, `inf` and `nan` are rejected.
fn parse_decimal(token: &str) -> Option<f32> {
    let body = token
        .strip_prefix(|c: char| c == '+' || c == '-')
        .unwrap_or(token);
    let (int_part, frac_part) = match body.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (body, None),
    };

    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let valid = match frac_part {
        None => !int_part.is_empty() && digits(int_part),
        Some(frac) => {
            digits(int_part) && digits(frac) && !(int_part.is_empty() && frac.is_empty())
        }
    };

    if !valid {
        return None;
    }
    token.parse().ok()
}

fn parse_decimals<const N: usize>(args: &[&str]) -> Option<[f32; N]> {
    if args.len() < N {
        return None;
    }

    let mut values = [0.0; N];
    for (value, token) in values.iter_mut().zip(args) {
        *value = parse_decimal(token)?;
    }
    Some(values)
}

fn parse_vec3(args: &[&str]) -> Option<Vec3> {
    parse_decimals::<3>(args).map(Vec3::from_array)
}

/// Parse a 1-based vertex index into 0-based form. Zero is invalid.
fn parse_index(token: &str) -> Option<u32> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse::<u32>().ok()?.checked_sub(1)
}

fn parse_indices<const N: usize>(args: &[&str]) -> Option<[u32; N]> {
    if args.len() < N {
        return None;
    }

    let mut indices = [0; N];
    for (index, token) in indices.iter_mut().zip(args) {
        *index = parse_index(token)?;
    }
    Some(indices)
}

/// Prototype, texture and mask names: the leading run of
/// `[A-Za-z0-9_-]` characters.
fn parse_name(token: &str) -> Option<String> {
    let end = token
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(token.len());

    (end > 0).then(|| token[..end].to_string())
}

fn parse_vertex(args: &[&str]) -> Option<Command> {
    let position = parse_vec3(args)?;

    // A malformed uv clause is ignored rather than dropping the vertex.
    let uv = match args.get(3) {
        Some(tag) if tag.eq_ignore_ascii_case("uv") => {
            parse_decimals::<2>(&args[4..]).map(Vec2::from_array)
        }
        _ => None,
    };

    Some(Command::Vertex { position, uv })
}

fn parse_polygon(args: &[&str]) -> Option<Command> {
    let (count, rest) = args.split_first()?;
    if !count.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let count: usize = count.parse().ok()?;
    if count == 0 || rest.len() < count {
        return None;
    }

    let mut indices = rest[..count]
        .iter()
        .map(|token| parse_index(token))
        .collect::<Option<Vec<u32>>>()?;
    indices.reverse();

    Some(Command::Polygon(indices))
}

fn parse_texture(args: &[&str]) -> Option<Command> {
    let name = parse_name(args.first()?)?;
    let name = (!name.eq_ignore_ascii_case("null")).then_some(name);

    let mask = match (args.get(1), args.get(2)) {
        (Some(tag), Some(mask)) if tag.eq_ignore_ascii_case("mask") => parse_name(mask),
        _ => None,
    };

    Some(Command::Texture { name, mask })
}

fn parse_material_mode(token: &str) -> Option<MaterialMode> {
    match token.to_ascii_lowercase().as_str() {
        "none" => Some(MaterialMode::None),
        "null" => Some(MaterialMode::Null),
        "double" => Some(MaterialMode::Double),
        _ => None,
    }
}

fn parse_texture_modes(args: &[&str], additive: bool) -> Option<Command> {
    if args.is_empty() {
        return None;
    }

    let mut modes = Vec::new();
    for token in args {
        match token.to_ascii_lowercase().as_str() {
            "lit" => modes.push(TextureMode::Lit),
            "foreshorten" => modes.push(TextureMode::Foreshorten),
            "filter" => modes.push(TextureMode::Filter),
            "null" => {}
            _ => return None,
        }
    }

    Some(Command::TextureModes { modes, additive })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_line() {
        assert_eq!(clean_line("\tvertex 1 2 3 # corner"), "vertex 1 2 3");
        assert_eq!(clean_line("# only a comment"), "");
        assert_eq!(clean_line("color\t1\t0\t0"), "color 1 0 0");
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(match_line("ModelBegin"), Some(Command::ModelBegin));
        assert_eq!(match_line("CLUMPEND"), Some(Command::ClumpEnd));
        assert_eq!(match_line("TransformBegin"), Some(Command::TransformBegin));
    }

    #[test]
    fn test_unknown_lines_are_skipped() {
        assert_eq!(match_line("hint something"), None);
        assert_eq!(match_line(""), None);
        assert_eq!(match_line("vertices 1 2 3"), None);
    }

    #[test]
    fn test_vertex_with_and_without_uv() {
        assert_eq!(
            match_line("vertex 1 -2.5 .5"),
            Some(Command::Vertex {
                position: Vec3::new(1.0, -2.5, 0.5),
                uv: None
            })
        );
        assert_eq!(
            match_line("VertexExt 0 0 0 UV 0.25 1."),
            Some(Command::Vertex {
                position: Vec3::ZERO,
                uv: Some(Vec2::new(0.25, 1.0))
            })
        );
    }

    #[test]
    fn test_malformed_numbers_drop_the_line() {
        assert_eq!(match_line("vertex 1 2"), None);
        assert_eq!(match_line("vertex 1 2 abc"), None);
        assert_eq!(match_line("vertex 1e3 0 0"), None);
        assert_eq!(match_line("color 1 . 0"), None);
        assert_eq!(match_line("opacity nan"), None);
    }

    #[test]
    fn test_bad_uv_keeps_vertex() {
        assert_eq!(
            match_line("vertex 1 2 3 uv x y"),
            Some(Command::Vertex {
                position: Vec3::new(1.0, 2.0, 3.0),
                uv: None
            })
        );
    }

    #[test]
    fn test_faces_are_zero_based() {
        assert_eq!(match_line("triangle 1 2 3"), Some(Command::Triangle([0, 1, 2])));
        assert_eq!(match_line("quadext 4 3 2 1 tag 7"), Some(Command::Quad([3, 2, 1, 0])));
        assert_eq!(match_line("triangle 0 1 2"), None);
        assert_eq!(match_line("triangle -1 1 2"), None);
    }

    #[test]
    fn test_polygon_is_reversed_and_truncated() {
        assert_eq!(
            match_line("polygon 4 1 2 3 4 5 6"),
            Some(Command::Polygon(vec![3, 2, 1, 0]))
        );
        assert_eq!(match_line("polygon 5 1 2 3"), None);
        assert_eq!(match_line("polygon 0"), None);
    }

    #[test]
    fn test_texture_and_mask() {
        assert_eq!(
            match_line("texture wood1"),
            Some(Command::Texture {
                name: Some("wood1".to_string()),
                mask: None
            })
        );
        assert_eq!(
            match_line("Texture fence mask fencem"),
            Some(Command::Texture {
                name: Some("fence".to_string()),
                mask: Some("fencem".to_string())
            })
        );
        assert_eq!(
            match_line("texture NULL"),
            Some(Command::Texture {
                name: None,
                mask: None
            })
        );
        assert_eq!(
            match_line("texture brick.jpg"),
            Some(Command::Texture {
                name: Some("brick".to_string()),
                mask: None
            })
        );
    }

    #[test]
    fn test_transform_needs_sixteen_values() {
        let line = "transform 1 0 0 0 0 1 0 0 0 0 1 0 4 5 6 0";
        match match_line(line) {
            Some(Command::Transform(values)) => {
                assert_eq!(values[12], 4.0);
                // Stored as written; the engine fixes the last value.
                assert_eq!(values[15], 0.0);
            }
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(match_line("transform 1 0 0 0"), None);
    }

    #[test]
    fn test_rotate() {
        assert_eq!(
            match_line("rotate 0 0 1 90"),
            Some(Command::Rotate {
                axis: Vec3::Z,
                angle: 90.0
            })
        );
    }

    #[test]
    fn test_material_keywords() {
        assert_eq!(
            match_line("addmaterialmodes double"),
            Some(Command::MaterialMode(MaterialMode::Double))
        );
        assert_eq!(match_line("materialmode bogus"), None);
        assert_eq!(match_line("collision off"), Some(Command::Collision(false)));
        assert_eq!(
            match_line("lightsampling vertex"),
            Some(Command::LightSampling(LightSampling::Vertex))
        );
        assert_eq!(
            match_line("geometrysampling wireframe"),
            Some(Command::GeometrySampling(GeometrySampling::Wireframe))
        );
        assert_eq!(
            match_line("surface 0.1 0.2 0.3"),
            Some(Command::Surface(Vec3::new(0.1, 0.2, 0.3)))
        );
    }

    #[test]
    fn test_texture_modes() {
        assert_eq!(
            match_line("texturemodes lit filter"),
            Some(Command::TextureModes {
                modes: vec![TextureMode::Lit, TextureMode::Filter],
                additive: false
            })
        );
        assert_eq!(
            match_line("addtexturemode foreshorten"),
            Some(Command::TextureModes {
                modes: vec![TextureMode::Foreshorten],
                additive: true
            })
        );
        assert_eq!(
            match_line("texturemode null"),
            Some(Command::TextureModes {
                modes: vec![],
                additive: false
            })
        );
    }

    #[test]
    fn test_axis_alignment_and_protos() {
        assert_eq!(
            match_line("AxisAlignment ZOrientY"),
            Some(Command::AxisAlignment(AxisAlignment::ZOrientY))
        );
        assert_eq!(
            match_line("protobegin tree_1"),
            Some(Command::ProtoBegin("tree_1".to_string()))
        );
        assert_eq!(match_line("protoinstance"), None);
    }

    #[test]
    fn test_commands_iterates_in_order() {
        let text = "modelbegin\r\n  clumpbegin # open\n\n\tvertex 0 0 0\nbogus\nclumpend\nmodelend";
        let parsed: Vec<Command> = commands(text).collect();

        assert_eq!(parsed.len(), 5);
        assert_eq!(parsed[0], Command::ModelBegin);
        assert_eq!(parsed[4], Command::ModelEnd);
    }
}
