//! Triangulation of planar polygon loops.
//!
//! The loop is flattened onto its own plane, ear-clipped in 2D and mapped
//! back onto the original 3D coordinates, so projection error never reaches
//! the output.

use rwx_math::{newell_normal, PlaneBasis, Vec2, Vec3};

/// Vertices and faces produced for one polygon.
///
/// `positions` and `uvs` are copies of the loop's vertices in loop order,
/// meant to be appended to the source buffers. `indices` already point at
/// those appended slots.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Triangulation {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl Triangulation {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Triangulate the loop `indices` over the given vertex buffers.
///
/// Faces keep the winding of the loop. Loops with fewer than three
/// vertices, out-of-range indices or no enclosed area produce an empty
/// result.
pub fn triangulate_loop(positions: &[Vec3], uvs: &[Vec2], indices: &[u32]) -> Triangulation {
    if indices.len() < 3 {
        return Triangulation::default();
    }

    if let Some(bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
        log::warn!(
            "Polygon index {} out of range, vertex count: {}",
            bad + 1,
            positions.len()
        );
        return Triangulation::default();
    }

    let points: Vec<Vec3> = indices.iter().map(|&i| positions[i as usize]).collect();
    let centroid = points.iter().copied().sum::<Vec3>() / points.len() as f32;

    let Some(basis) = PlaneBasis::from_normal(centroid, newell_normal(&points)) else {
        log::debug!("Skipping degenerate polygon with {} vertices", points.len());
        return Triangulation::default();
    };

    let projected: Vec<Vec2> = points.iter().map(|p| basis.project(*p)).collect();
    let coords: Vec<f64> = projected
        .iter()
        .flat_map(|p| [p.x as f64, p.y as f64])
        .collect();

    let triangles = match earcutr::earcut(&coords, &[], 2) {
        Ok(triangles) => triangles,
        Err(e) => {
            log::warn!("Polygon triangulation failed: {:?}", e);
            return Triangulation::default();
        }
    };

    let loop_area = signed_area(&projected);
    let base = positions.len() as u32;
    let mut faces = Vec::with_capacity(triangles.len());

    for tri in triangles.chunks_exact(3) {
        let (a, b, c) = (tri[0], tri[1], tri[2]);
        let area = signed_area(&[projected[a], projected[b], projected[c]]);

        let ordered = if area * loop_area < 0.0 { [a, c, b] } else { [a, b, c] };
        faces.extend(ordered.iter().map(|&i| base + i as u32));
    }

    let loop_uvs = indices
        .iter()
        .map(|&i| uvs.get(i as usize).copied().unwrap_or(Vec2::ZERO))
        .collect();

    Triangulation {
        positions: points,
        uvs: loop_uvs,
        indices: faces,
    }
}

/// Shoelace area of a 2D loop; the sign gives its orientation.
fn signed_area(points: &[Vec2]) -> f32 {
    let mut sum = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        sum += p.x * q.y - q.x * p.y;
    }
    sum * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn area_3d(t: &Triangulation) -> f32 {
        t.indices
            .chunks_exact(3)
            .map(|f| {
                let base = t.indices.iter().min().copied().unwrap_or(0);
                let p = |i: u32| t.positions[(i - base) as usize];
                (p(f[1]) - p(f[0])).cross(p(f[2]) - p(f[0])).length() * 0.5
            })
            .sum()
    }

    fn regular_polygon(n: usize, radius: f32) -> Vec<Vec3> {
        (0..n)
            .map(|i| {
                let a = i as f32 / n as f32 * std::f32::consts::TAU;
                Vec3::new(radius * a.cos(), radius * a.sin(), 0.0)
            })
            .collect()
    }

    #[test]
    fn test_convex_ngon() {
        let n = 7;
        let positions = regular_polygon(n, 2.0);
        let loop_indices: Vec<u32> = (0..n as u32).collect();

        let t = triangulate_loop(&positions, &[], &loop_indices);
        assert_eq!(t.triangle_count(), n - 2);

        let expected = 0.5 * n as f32 * 4.0 * (std::f32::consts::TAU / n as f32).sin();
        assert!((area_3d(&t) - expected).abs() < 1e-3);
    }

    #[test]
    fn test_no_new_boundary_edges() {
        let positions = regular_polygon(6, 1.0);
        let loop_indices: Vec<u32> = (0..6).collect();
        let t = triangulate_loop(&positions, &[], &loop_indices);

        // Count undirected edges: loop edges appear once, diagonals twice.
        let mut edges: HashMap<(u32, u32), usize> = HashMap::new();
        for f in t.indices.chunks_exact(3) {
            for (a, b) in [(f[0], f[1]), (f[1], f[2]), (f[2], f[0])] {
                *edges.entry((a.min(b), a.max(b))).or_default() += 1;
            }
        }

        let base = positions.len() as u32;
        let boundary: Vec<_> = edges.iter().filter(|(_, &count)| count == 1).collect();
        assert_eq!(boundary.len(), 6);
        for ((a, b), _) in boundary {
            let (la, lb) = (a - base, b - base);
            assert!(lb - la == 1 || (la == 0 && lb == 5));
        }
    }

    #[test]
    fn test_winding_follows_loop() {
        let positions = regular_polygon(5, 1.0);

        for loop_indices in [vec![0, 1, 2, 3, 4], vec![4, 3, 2, 1, 0]] {
            let points: Vec<Vec3> = loop_indices.iter().map(|&i| positions[i as usize]).collect();
            let normal = newell_normal(&points);
            let t = triangulate_loop(&positions, &[], &loop_indices);

            for f in t.indices.chunks_exact(3) {
                let p = |i: u32| t.positions[(i - 5) as usize];
                let face_normal = (p(f[1]) - p(f[0])).cross(p(f[2]) - p(f[0]));
                assert!(face_normal.dot(normal) > 0.0);
            }
        }
    }

    #[test]
    fn test_concave_polygon_on_tilted_plane() {
        // L shape of area 3, rotated off every axis plane.
        let flat = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(2.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 2.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
        ];
        let rotation = rwx_math::Quat::from_euler(rwx_math::EulerRot::XYZ, 0.4, 0.7, 0.2);
        let positions: Vec<Vec3> = flat.iter().map(|p| rotation * *p).collect();

        let t = triangulate_loop(&positions, &[], &[0, 1, 2, 3, 4, 5]);
        assert_eq!(t.triangle_count(), 4);
        assert!((area_3d(&t) - 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_original_coordinates_and_uvs_are_copied() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::ONE, Vec3::new(0.0, 1.0, 1.0)];
        let uvs = vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y];

        let t = triangulate_loop(&positions, &uvs, &[3, 2, 1, 0]);

        assert_eq!(t.positions, vec![positions[3], positions[2], positions[1], positions[0]]);
        assert_eq!(t.uvs, vec![uvs[3], uvs[2], uvs[1], uvs[0]]);
        assert!(t.indices.iter().all(|&i| (4..8).contains(&i)));
    }

    #[test]
    fn test_degenerate_loops_are_empty() {
        let collinear = vec![Vec3::ZERO, Vec3::X, Vec3::X * 2.0];
        assert!(triangulate_loop(&collinear, &[], &[0, 1, 2]).is_empty());
        assert!(triangulate_loop(&collinear, &[], &[0, 1]).is_empty());
        assert!(triangulate_loop(&collinear, &[], &[0, 1, 9]).is_empty());
    }
}
