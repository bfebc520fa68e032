//! Merge a scene hierarchy into a single mesh.

use std::sync::Arc;

use rwx_math::{Vec2, Vec3};

use crate::material::MaterialResource;
use crate::mesh::{MaterialGroup, Mesh};
use crate::scene::{RootMetadata, Scene};

/// A whole model baked into one mesh.
#[derive(Clone, Debug)]
pub struct FlatModel {
    pub mesh: Mesh,
    pub metadata: RootMetadata,
}

/// Bake every reachable mesh of `scene` into one mesh in world space.
///
/// Material lists are concatenated in traversal order and each mesh's groups
/// are rebased onto the merged index and material lists. Wireframe line sets
/// are not part of the result.
pub fn flatten_scene(scene: &Scene) -> FlatModel {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut uvs: Vec<Vec2> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut groups: Vec<MaterialGroup> = Vec::new();
    let mut materials: Vec<Arc<MaterialResource>> = Vec::new();

    for (_, world, mesh) in scene.meshes() {
        let vertex_offset = positions.len() as u32;

        groups.extend(mesh.groups.iter().map(|g| MaterialGroup {
            start: g.start + indices.len(),
            count: g.count,
            material_index: g.material_index + materials.len(),
        }));

        positions.extend(mesh.positions.iter().map(|p| world.transform_point3(*p)));
        uvs.extend_from_slice(&mesh.uvs);
        uvs.resize(positions.len(), Vec2::ZERO);
        indices.extend(mesh.indices.iter().map(|i| i + vertex_offset));
        materials.extend(mesh.materials.iter().cloned());
    }

    let mut mesh = Mesh::new(positions, uvs, indices).with_materials(groups, materials);
    mesh.compute_normals();

    log::debug!(
        "Flattened {} into {} vertices, {} triangles, {} groups",
        scene.name,
        mesh.vertex_count(),
        mesh.triangle_count(),
        mesh.groups.len()
    );

    FlatModel {
        mesh,
        metadata: *scene.metadata(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rwx_math::Mat4;

    use crate::material::Material;
    use crate::scene::AxisAlignment;
    use crate::texture::NullTextureResolver;

    fn tri_mesh(material: Material) -> Arc<Mesh> {
        let resource = Arc::new(MaterialResource::new(&material, &NullTextureResolver));
        let group = MaterialGroup {
            start: 0,
            count: 3,
            material_index: 0,
        };
        let mesh = Mesh::untextured(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2])
            .with_materials(vec![group], vec![resource]);
        Arc::new(mesh)
    }

    #[test]
    fn test_flatten_rebases_groups_and_indices() {
        let mut scene = Scene::new("flat");
        let root = scene.root();
        scene.metadata_mut().axis_alignment = AxisAlignment::Xyz;

        scene.add_mesh(root, tri_mesh(Material::default()));
        let group = scene.add_group(root);
        scene.node_mut(group).unwrap().transform = Mat4::from_translation(Vec3::Z);
        scene.add_mesh(
            group,
            tri_mesh(Material {
                color: Vec3::ONE,
                ..Default::default()
            }),
        );

        let flat = scene.flatten();
        let mesh = &flat.mesh;

        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(mesh.groups[1].start, 3);
        assert_eq!(mesh.groups[1].material_index, 1);
        assert_eq!(mesh.materials.len(), 2);
        assert_eq!(mesh.positions[3], Vec3::Z);
        assert_eq!(mesh.uvs.len(), 6);
        assert!(mesh.has_normals());
        assert_eq!(flat.metadata.axis_alignment, AxisAlignment::Xyz);
    }

    #[test]
    fn test_flatten_empty_scene() {
        let flat = Scene::new("empty").flatten();
        assert_eq!(flat.mesh.vertex_count(), 0);
        assert!(flat.mesh.bounds.is_empty());
    }
}
