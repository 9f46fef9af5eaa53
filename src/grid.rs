use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{GeoTessError, ParseError};
use crate::geomath::{self, Vector3};

/// A contiguous range of triangle indices forming one subdivision level
/// of a tessellation. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub first: usize,
    pub last: usize,
}

impl Level {
    pub fn triangles(&self) -> std::ops::RangeInclusive<usize> {
        self.first..=self.last
    }

    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }
}

/// A multi-level triangular tessellation of the unit sphere.
///
/// Vertices are unit vectors; triangles are CCW-ordered vertex triples
/// referenced by index. Each tessellation is a family of levels, every
/// level a complete triangulation of the sphere refined 4-to-1 from the
/// previous one. Triangles reference their edge neighbors within the
/// same level and one descendant on the next finer level, both as plain
/// indices into the grid-owned arrays.
#[derive(Debug)]
pub struct Grid {
    vertices: Vec<Vector3>,
    triangles: Vec<[i32; 3]>,
    tessellations: Vec<Vec<Level>>,
    /// neighbors[t][i] is across the edge opposite vertex i, -1 if none.
    neighbors: Vec<[i32; 3]>,
    /// Index of the child triangle containing this triangle's center on
    /// the next finer level, -1 on the finest level of a tessellation.
    descendants: Vec<i32>,
    grid_id: String,
    /// Per tessellation, per vertex: the top-level triangles touching the
    /// vertex. Built on first use, read-only afterwards.
    incidence: OnceLock<Vec<Vec<Vec<usize>>>>,
}

/// Containment tolerance of the walk: a point this far outside an edge
/// still counts as inside, so the walk cannot oscillate across an edge
/// on floating-point noise.
const WALK_TOLERANCE: f64 = -1e-15;

fn max_walk_steps(n_triangles: usize) -> usize {
    4 * n_triangles + 16
}

impl Grid {
    /// Builds a grid from bare vertex and triangle lists, computing the
    /// neighbor and descendant tables and the content fingerprint.
    pub fn new(
        vertices: Vec<Vector3>,
        triangles: Vec<[i32; 3]>,
        tessellations: Vec<Vec<Level>>,
    ) -> Result<Self, GeoTessError> {
        validate_structure(&vertices, &triangles, &tessellations)?;

        let neighbors = build_neighbors(&triangles, &tessellations)?;
        let grid_id = fingerprint(&vertices, &triangles, &tessellations);
        let mut grid = Self {
            vertices,
            triangles,
            tessellations,
            neighbors,
            descendants: Vec::new(),
            grid_id,
            incidence: OnceLock::new(),
        };
        grid.descendants = grid.build_descendants()?;
        Ok(grid)
    }

    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn n_triangles(&self) -> usize {
        self.triangles.len()
    }

    pub fn n_tessellations(&self) -> usize {
        self.tessellations.len()
    }

    pub fn n_levels(&self, tessellation: usize) -> usize {
        self.tessellations[tessellation].len()
    }

    /// Index of the finest level of a tessellation.
    pub fn top_level(&self, tessellation: usize) -> usize {
        self.tessellations[tessellation].len() - 1
    }

    pub fn level(&self, tessellation: usize, level: usize) -> Level {
        self.tessellations[tessellation][level]
    }

    pub fn tessellations(&self) -> &[Vec<Level>] {
        &self.tessellations
    }

    pub fn vertex(&self, vertex: usize) -> &Vector3 {
        &self.vertices[vertex]
    }

    pub fn vertices(&self) -> &[Vector3] {
        &self.vertices
    }

    pub fn triangle_vertex_indexes(&self, triangle: usize) -> [usize; 3] {
        let t = self.triangles[triangle];
        [t[0] as usize, t[1] as usize, t[2] as usize]
    }

    pub fn triangles(&self) -> &[[i32; 3]] {
        &self.triangles
    }

    pub fn triangle_vertex(&self, triangle: usize, corner: usize) -> &Vector3 {
        &self.vertices[self.triangles[triangle][corner] as usize]
    }

    /// The neighbor sharing the edge opposite the given corner.
    pub fn neighbor(&self, triangle: usize, side: usize) -> Option<usize> {
        let n = self.neighbors[triangle][side];
        (n >= 0).then_some(n as usize)
    }

    pub fn descendant(&self, triangle: usize) -> Option<usize> {
        let d = self.descendants[triangle];
        (d >= 0).then_some(d as usize)
    }

    /// Hex digest identifying the grid content.
    pub fn grid_id(&self) -> &str {
        &self.grid_id
    }

    /// Center of a triangle, on the sphere.
    pub fn triangle_center(&self, triangle: usize) -> Vector3 {
        let [a, b, c] = self.triangle_vertex_indexes(triangle);
        let va = &self.vertices[a];
        let vb = &self.vertices[b];
        let vc = &self.vertices[c];
        let mut center = [
            va[0] + vb[0] + vc[0],
            va[1] + vb[1] + vc[1],
            va[2] + vb[2] + vc[2],
        ];
        geomath::normalize(&mut center);
        center
    }

    /// The three edge tests of the walk: `s[i] = v · (vⱼ × vₖ)` where j, k
    /// are the corners other than i, in CCW order. All non-negative means
    /// `v` is inside (or on the boundary of) the triangle.
    fn edge_tests(&self, triangle: usize, v: &Vector3) -> [f64; 3] {
        let [a, b, c] = self.triangle_vertex_indexes(triangle);
        let va = &self.vertices[a];
        let vb = &self.vertices[b];
        let vc = &self.vertices[c];
        [
            geomath::scalar_triple_product(vb, vc, v),
            geomath::scalar_triple_product(vc, va, v),
            geomath::scalar_triple_product(va, vb, v),
        ]
    }

    /// Walks from `start` to the triangle containing `v`, staying on the
    /// level `start` belongs to.
    ///
    /// Each step evaluates the three edge tests and, unless all are
    /// non-negative, crosses the edge with the most negative one. A point
    /// on an edge or vertex resolves to the containing triangle with the
    /// lowest index, so the result does not depend on the walk's origin.
    pub fn find_triangle(&self, start: usize, v: &Vector3) -> Result<usize, GeoTessError> {
        let mut t = start;
        for _ in 0..max_walk_steps(self.triangles.len()) {
            let s = self.edge_tests(t, v);
            let mut worst = 0;
            for i in 1..3 {
                if s[i] < s[worst] {
                    worst = i;
                }
            }
            if s[worst] >= WALK_TOLERANCE {
                return Ok(self.resolve_boundary_tie(t, v, s));
            }
            t = self.neighbor(t, worst).ok_or_else(|| {
                GeoTessError::StateError(format!("triangle {t} has no neighbor on side {worst}"))
            })?;
        }
        Err(GeoTessError::StateError(
            "triangle walk did not terminate".to_owned(),
        ))
    }

    /// Among the triangles containing a point that sits on an edge or a
    /// vertex, steps to lower-indexed containing neighbors until the
    /// lowest one is reached.
    fn resolve_boundary_tie(&self, mut t: usize, v: &Vector3, mut s: [f64; 3]) -> usize {
        loop {
            let mut best = t;
            for i in 0..3 {
                if s[i] <= 0.0 {
                    if let Some(n) = self.neighbor(t, i) {
                        best = best.min(n);
                    }
                }
            }
            if best == t {
                return t;
            }
            t = best;
            s = self.edge_tests(t, v);
        }
    }

    /// Finds the triangle containing `v` on the given level, descending
    /// from `start` (a triangle on any coarser level of the same
    /// tessellation, typically a cached previous result).
    pub fn find_triangle_on_level(
        &self,
        tessellation: usize,
        level: usize,
        start: usize,
        v: &Vector3,
    ) -> Result<usize, GeoTessError> {
        let mut t = self.find_triangle(start, v)?;
        let target = self.level(tessellation, level);
        while !target.triangles().contains(&t) {
            let d = self.descendant(t).ok_or_else(|| {
                GeoTessError::StateError(format!(
                    "triangle {t} outside level {level} of tessellation {tessellation} \
                     has no descendant"
                ))
            })?;
            t = self.find_triangle(d, v)?;
        }
        Ok(t)
    }

    /// Triangles of a tessellation's top level incident to a vertex.
    pub fn triangles_incident(&self, vertex: usize, tessellation: usize) -> &[usize] {
        &self.incidence()[tessellation][vertex]
    }

    /// Vertices connected to `vertex` by an edge of the tessellation's
    /// top level, in no particular order.
    pub fn vertex_neighbors(&self, vertex: usize, tessellation: usize) -> Vec<usize> {
        let mut out = Vec::new();
        for &t in self.triangles_incident(vertex, tessellation) {
            for w in self.triangle_vertex_indexes(t) {
                if w != vertex && !out.contains(&w) {
                    out.push(w);
                }
            }
        }
        out
    }

    fn incidence(&self) -> &Vec<Vec<Vec<usize>>> {
        self.incidence.get_or_init(|| {
            let mut all = Vec::with_capacity(self.tessellations.len());
            for levels in &self.tessellations {
                let mut per_vertex = vec![Vec::new(); self.vertices.len()];
                let top = levels[levels.len() - 1];
                for t in top.triangles() {
                    for v in self.triangle_vertex_indexes(t) {
                        per_vertex[v].push(t);
                    }
                }
                all.push(per_vertex);
            }
            all
        })
    }

    /// For every triangle below the finest level of its tessellation,
    /// walks the next finer level to the child containing the triangle's
    /// center. Each walk restarts from the previous parent's descendant,
    /// which stays short because consecutive triangles are spatial
    /// neighbors.
    fn build_descendants(&self) -> Result<Vec<i32>, GeoTessError> {
        let mut descendants = vec![-1; self.triangles.len()];
        for levels in &self.tessellations {
            for pair in levels.windows(2) {
                let [coarse, fine] = [pair[0], pair[1]];
                let mut hint = fine.first;
                for t in coarse.triangles() {
                    let center = self.triangle_center(t);
                    let child = self.find_triangle(hint, &center)?;
                    descendants[t] = child as i32;
                    hint = child;
                }
            }
        }
        Ok(descendants)
    }

    /// Checks the structural invariants: neighbor symmetry, shared edges
    /// in opposite orientation, descendants on the next finer level.
    pub fn test_grid(&self) -> Result<(), GeoTessError> {
        for (t, sides) in self.neighbors.iter().enumerate() {
            for (side, &n) in sides.iter().enumerate() {
                if n < 0 {
                    return Err(GeoTessError::StateError(format!(
                        "triangle {t} has no neighbor on side {side}"
                    )));
                }
                let n = n as usize;
                let verts = self.triangle_vertex_indexes(t);
                let shared: Vec<usize> = self
                    .triangle_vertex_indexes(n)
                    .into_iter()
                    .filter(|v| verts.contains(v))
                    .collect();
                if shared.len() != 2 || shared.contains(&verts[side]) {
                    return Err(GeoTessError::StateError(format!(
                        "triangles {t} and {n} do not share the edge opposite corner {side}"
                    )));
                }
                if !self.neighbors[n].contains(&(t as i32)) {
                    return Err(GeoTessError::StateError(format!(
                        "neighbor link {t} -> {n} is not symmetric"
                    )));
                }
            }
        }
        for levels in &self.tessellations {
            for pair in levels.windows(2) {
                for t in pair[0].triangles() {
                    match self.descendant(t) {
                        Some(d) if pair[1].triangles().contains(&d) => {}
                        _ => {
                            return Err(GeoTessError::StateError(format!(
                                "triangle {t} has no descendant on the next level"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn validate_structure(
    vertices: &[Vector3],
    triangles: &[[i32; 3]],
    tessellations: &[Vec<Level>],
) -> Result<(), GeoTessError> {
    if tessellations.is_empty() || tessellations.iter().any(|levels| levels.is_empty()) {
        return Err(GeoTessError::InvalidArgument(
            "a grid needs at least one tessellation with at least one level".to_owned(),
        ));
    }
    for (i, t) in triangles.iter().enumerate() {
        for &v in t {
            if v < 0 || v as usize >= vertices.len() {
                return Err(GeoTessError::ParseError(ParseError::VertexIndexOutOfRange(
                    v.max(0) as usize,
                    vertices.len(),
                )));
            }
        }
        let [a, b, c] = [t[0] as usize, t[1] as usize, t[2] as usize];
        if geomath::scalar_triple_product(&vertices[a], &vertices[b], &vertices[c]) <= 0.0 {
            return Err(GeoTessError::InvalidArgument(format!(
                "triangle {i} is not counter-clockwise"
            )));
        }
    }
    for levels in tessellations {
        for level in levels {
            if level.first > level.last || level.last >= triangles.len() {
                return Err(GeoTessError::ParseError(
                    ParseError::TriangleIndexOutOfRange(level.last, triangles.len()),
                ));
            }
        }
    }
    Ok(())
}

/// Matches triangles that share a directed edge in opposite directions.
/// Every edge of every level must pair up, since each level tiles the
/// whole sphere.
fn build_neighbors(
    triangles: &[[i32; 3]],
    tessellations: &[Vec<Level>],
) -> Result<Vec<[i32; 3]>, GeoTessError> {
    let mut neighbors = vec![[-1; 3]; triangles.len()];
    for levels in tessellations {
        for level in levels {
            let mut edges: HashMap<(i32, i32), (usize, usize)> =
                HashMap::with_capacity(3 * level.len());
            for t in level.triangles() {
                let tri = triangles[t];
                for side in 0..3 {
                    // Edge opposite corner `side`, in CCW direction.
                    let edge = (tri[(side + 1) % 3], tri[(side + 2) % 3]);
                    edges.insert(edge, (t, side));
                }
            }
            for (&(a, b), &(t, side)) in &edges {
                match edges.get(&(b, a)) {
                    Some(&(n, _)) => neighbors[t][side] = n as i32,
                    None => {
                        return Err(GeoTessError::InvalidArgument(format!(
                            "edge ({a}, {b}) of triangle {t} has no matching neighbor"
                        )));
                    }
                }
            }
        }
    }
    Ok(neighbors)
}

/// 128-bit FNV-1a digest of the canonical grid payload, as 32 hex chars.
fn fingerprint(
    vertices: &[Vector3],
    triangles: &[[i32; 3]],
    tessellations: &[Vec<Level>],
) -> String {
    const OFFSET: u128 = 0x6c62272e07bb014262b821756295c58d;
    const PRIME: u128 = 0x0000000001000000000000000000013b;

    let mut hash = OFFSET;
    let mut eat = |bytes: &[u8]| {
        for &byte in bytes {
            hash ^= u128::from(byte);
            hash = hash.wrapping_mul(PRIME);
        }
    };

    eat(&(vertices.len() as u32).to_be_bytes());
    for v in vertices {
        for component in v {
            eat(&component.to_be_bytes());
        }
    }
    eat(&(tessellations.len() as u32).to_be_bytes());
    for levels in tessellations {
        eat(&(levels.len() as u32).to_be_bytes());
        for level in levels {
            eat(&(level.first as u32).to_be_bytes());
            eat(&(level.last as u32).to_be_bytes());
        }
    }
    eat(&(triangles.len() as u32).to_be_bytes());
    for t in triangles {
        for &v in t {
            eat(&v.to_be_bytes());
        }
    }

    format!("{hash:032x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::earth::EarthShape;
    use approx::assert_relative_eq;

    /// The regular octahedron: 6 vertices, 8 CCW faces, one level.
    fn octahedron_vertices() -> Vec<Vector3> {
        vec![
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
        ]
    }

    fn octahedron_triangles() -> Vec<[i32; 3]> {
        vec![
            [0, 1, 4],
            [1, 2, 4],
            [2, 3, 4],
            [3, 0, 4],
            [1, 0, 5],
            [2, 1, 5],
            [3, 2, 5],
            [0, 3, 5],
        ]
    }

    fn octahedron() -> Grid {
        Grid::new(
            octahedron_vertices(),
            octahedron_triangles(),
            vec![vec![Level { first: 0, last: 7 }]],
        )
        .unwrap()
    }

    #[test]
    fn neighbors_are_symmetric_and_complete() {
        let grid = octahedron();
        grid.test_grid().unwrap();
        for t in 0..grid.n_triangles() {
            for side in 0..3 {
                let n = grid.neighbor(t, side).unwrap();
                assert_ne!(n, t);
            }
        }
    }

    #[test]
    fn rejects_clockwise_triangles() {
        let mut triangles = octahedron_triangles();
        triangles[0] = [1, 0, 4];
        let result = Grid::new(
            octahedron_vertices(),
            triangles,
            vec![vec![Level { first: 0, last: 7 }]],
        );
        assert!(matches!(result, Err(GeoTessError::InvalidArgument(_))));
    }

    #[test]
    fn rejects_vertex_index_out_of_range() {
        let mut triangles = octahedron_triangles();
        triangles[3] = [3, 0, 9];
        let result = Grid::new(
            octahedron_vertices(),
            triangles,
            vec![vec![Level { first: 0, last: 7 }]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn walk_finds_containing_triangle_from_any_start() {
        let grid = octahedron();
        let v = EarthShape::Sphere.vector_degrees(35.0, 40.0);
        let expected = grid.find_triangle(0, &v).unwrap();
        for start in 0..grid.n_triangles() {
            assert_eq!(grid.find_triangle(start, &v).unwrap(), expected);
        }
        // The found triangle actually contains the point.
        for s in grid.edge_tests(expected, &v) {
            assert!(s >= 0.0);
        }
    }

    #[test]
    fn walk_on_edge_is_deterministic() {
        let grid = octahedron();
        // On the edge between vertices 0 and 4, shared by triangles 0 and 3.
        let v = geomath::midpoint(&[1.0, 0.0, 0.0], &[0.0, 0.0, 1.0]);
        let mut results: Vec<usize> = (0..grid.n_triangles())
            .map(|start| grid.find_triangle(start, &v).unwrap())
            .collect();
        results.dedup();
        assert_eq!(results, vec![0]);
    }

    #[test]
    fn walk_at_vertex_is_deterministic() {
        let grid = octahedron();
        // The north pole is a corner of triangles 0 through 3.
        let v = [0.0, 0.0, 1.0];
        for start in 0..grid.n_triangles() {
            assert_eq!(grid.find_triangle(start, &v).unwrap(), 0);
        }
    }

    #[test]
    fn incidence_lists_cover_each_vertex() {
        let grid = octahedron();
        for vertex in 0..grid.n_vertices() {
            assert_eq!(grid.triangles_incident(vertex, 0).len(), 4);
        }
        let mut ring = grid.vertex_neighbors(4, 0);
        ring.sort();
        assert_eq!(ring, vec![0, 1, 2, 3]);
    }

    #[test]
    fn fingerprint_is_content_sensitive() {
        let a = octahedron();
        let b = octahedron();
        assert_eq!(a.grid_id(), b.grid_id());
        assert_eq!(a.grid_id().len(), 32);

        let mut triangles = octahedron_triangles();
        triangles.swap(0, 1);
        let c = Grid::new(
            octahedron_vertices(),
            triangles,
            vec![vec![Level { first: 0, last: 7 }]],
        )
        .unwrap();
        assert_ne!(a.grid_id(), c.grid_id());
    }

    #[test]
    fn triangle_center_is_inside() {
        let grid = octahedron();
        for t in 0..grid.n_triangles() {
            let center = grid.triangle_center(t);
            assert!(geomath::is_unit_vector(&center));
            assert_eq!(grid.find_triangle(t, &center).unwrap(), t);
        }
    }

    #[test]
    fn triangle_areas_cover_the_sphere() {
        let grid = octahedron();
        let total: f64 = (0..grid.n_triangles())
            .map(|t| {
                let [a, b, c] = grid.triangle_vertex_indexes(t);
                geomath::triangle_area(grid.vertex(a), grid.vertex(b), grid.vertex(c))
            })
            .sum();
        assert_relative_eq!(total, 4.0 * std::f64::consts::PI, epsilon = 1e-9);
    }
}
