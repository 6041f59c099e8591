//! Normal computation for flat shaded meshes

/// Unit normal of a counter-clockwise triangle (+Z for degenerate faces)
pub fn calculate_triangle_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let cross = [
        e1[1] * e2[2] - e1[2] * e2[1],
        e1[2] * e2[0] - e1[0] * e2[2],
        e1[0] * e2[1] - e1[1] * e2[0],
    ];
    let len = (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt();
    if len > 0.0 {
        [cross[0] / len, cross[1] / len, cross[2] / len]
    } else {
        [0.0, 0.0, 1.0]
    }
}

/// Expand an indexed mesh into per-face vertices carrying face normals
///
/// Returns positions, normals and sequential indices. Trailing indices that
/// do not form a whole triangle, and out-of-range indices, are skipped.
pub fn flat_shade(
    positions: &[[f32; 3]],
    indices: &[u32],
) -> (Vec<[f32; 3]>, Vec<[f32; 3]>, Vec<u32>) {
    let mut out_positions = Vec::with_capacity(indices.len());
    let mut out_normals = Vec::with_capacity(indices.len());

    for tri in indices.chunks_exact(3) {
        let corners: Option<Vec<[f32; 3]>> = tri
            .iter()
            .map(|&i| positions.get(i as usize).copied())
            .collect();
        let Some(corners) = corners else {
            continue;
        };
        let normal = calculate_triangle_normal(corners[0], corners[1], corners[2]);
        for corner in corners {
            out_positions.push(corner);
            out_normals.push(normal);
        }
    }

    let out_indices = (0..out_positions.len() as u32).collect();
    (out_positions, out_normals, out_indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_normal() {
        let n = calculate_triangle_normal([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        assert_eq!(n, [0.0, 0.0, 1.0]);

        let degenerate = calculate_triangle_normal([0.0; 3], [0.0; 3], [0.0; 3]);
        assert_eq!(degenerate, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_flat_shade_skips_bad_triangles() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let (p, n, i) = flat_shade(&positions, &[0, 1, 2, 0, 1, 9, 2]);
        assert_eq!(p.len(), 3);
        assert_eq!(n, vec![[0.0, 0.0, 1.0]; 3]);
        assert_eq!(i, vec![0, 1, 2]);
    }
}
