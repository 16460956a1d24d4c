use std::collections::HashMap;

use glam::Vec3;

/// Indexed triangle mesh shared by every pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn element_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

const ICOSAHEDRON_FACES: [[u32; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// Unit icosahedron with counter-clockwise, outward-facing triangles.
pub fn icosahedron() -> Mesh {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let corners = [
        Vec3::new(-1.0, t, 0.0),
        Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0),
        Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t),
        Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t),
        Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0),
        Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0),
        Vec3::new(-t, 0.0, 1.0),
    ];
    Mesh {
        positions: corners
            .iter()
            .map(|corner| corner.normalize().to_array())
            .collect(),
        indices: ICOSAHEDRON_FACES.iter().flatten().copied().collect(),
    }
}

/// Icosahedron refined `subdivisions` times, every vertex pushed onto the unit sphere.
///
/// Stands in for tessellation on backends without tessellation stages.
pub fn icosphere(subdivisions: u32) -> Mesh {
    let mut mesh = icosahedron();
    for _ in 0..subdivisions {
        mesh = subdivide(&mesh);
    }
    mesh
}

fn subdivide(mesh: &Mesh) -> Mesh {
    let mut positions = mesh.positions.clone();
    let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
    let mut indices = Vec::with_capacity(mesh.indices.len() * 4);

    let mut midpoint = |a: u32, b: u32, positions: &mut Vec<[f32; 3]>| -> u32 {
        let key = (a.min(b), a.max(b));
        *midpoints.entry(key).or_insert_with(|| {
            let pa = Vec3::from(positions[a as usize]);
            let pb = Vec3::from(positions[b as usize]);
            positions.push(((pa + pb) * 0.5).normalize().to_array());
            (positions.len() - 1) as u32
        })
    };

    for tri in mesh.indices.chunks_exact(3) {
        let (a, b, c) = (tri[0], tri[1], tri[2]);
        let ab = midpoint(a, b, &mut positions);
        let bc = midpoint(b, c, &mut positions);
        let ca = midpoint(c, a, &mut positions);
        indices.extend_from_slice(&[a, ab, ca, b, bc, ab, c, ca, bc, ab, bc, ca]);
    }

    Mesh { positions, indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_outward(mesh: &Mesh) {
        for tri in mesh.indices.chunks_exact(3) {
            let a = Vec3::from(mesh.positions[tri[0] as usize]);
            let b = Vec3::from(mesh.positions[tri[1] as usize]);
            let c = Vec3::from(mesh.positions[tri[2] as usize]);
            assert!((b - a).cross(c - a).dot(a) > 0.0, "inward face {tri:?}");
        }
    }

    #[test]
    fn icosahedron_has_twenty_outward_faces() {
        let mesh = icosahedron();
        assert_eq!(mesh.positions.len(), 12);
        assert_eq!(mesh.triangle_count(), 20);
        assert_eq!(mesh.element_count(), 60);
        assert_outward(&mesh);
    }

    #[test]
    fn subdivision_shares_edge_midpoints() {
        let mesh = icosphere(2);
        // V = 10 * 4^n + 2 for a geodesic icosphere.
        assert_eq!(mesh.positions.len(), 162);
        assert_eq!(mesh.triangle_count(), 320);
        assert_outward(&mesh);
        for position in &mesh.positions {
            assert!((Vec3::from(*position).length() - 1.0).abs() < 1e-5);
        }
    }
}
