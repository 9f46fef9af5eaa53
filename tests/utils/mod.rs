//! Synthetic grids and models shared by the integration tests.

use std::collections::HashMap;
use std::sync::Arc;

use geotess::geomath;
use geotess::{
    DataType, DataValues, EarthShape, Grid, Level, Model, ModelMetadata, Profile,
};

/// Incrementally subdivided icosahedron. The midpoint cache is kept
/// across subdivisions so repeated level sequences reuse vertices.
pub struct Icosahedron {
    vertices: Vec<[f64; 3]>,
    midpoints: HashMap<(i32, i32), i32>,
}

impl Icosahedron {
    pub fn new() -> Self {
        let t = (1.0 + 5f64.sqrt()) / 2.0;
        let mut vertices: Vec<[f64; 3]> = vec![
            [-1.0, t, 0.0],
            [1.0, t, 0.0],
            [-1.0, -t, 0.0],
            [1.0, -t, 0.0],
            [0.0, -1.0, t],
            [0.0, 1.0, t],
            [0.0, -1.0, -t],
            [0.0, 1.0, -t],
            [t, 0.0, -1.0],
            [t, 0.0, 1.0],
            [-t, 0.0, -1.0],
            [-t, 0.0, 1.0],
        ];
        for v in &mut vertices {
            geomath::normalize(v);
        }
        Self {
            vertices,
            midpoints: HashMap::new(),
        }
    }

    pub fn base_faces(&self) -> Vec<[i32; 3]> {
        vec![
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
        ]
    }

    fn midpoint(&mut self, a: i32, b: i32) -> i32 {
        let key = if a < b { (a, b) } else { (b, a) };
        if let Some(&m) = self.midpoints.get(&key) {
            return m;
        }
        let m = geomath::midpoint(
            &self.vertices[a as usize],
            &self.vertices[b as usize],
        );
        let index = self.vertices.len() as i32;
        self.vertices.push(m);
        self.midpoints.insert(key, index);
        index
    }

    /// One 4-to-1 subdivision pass, children in parent order.
    pub fn subdivide(&mut self, faces: &[[i32; 3]]) -> Vec<[i32; 3]> {
        let mut out = Vec::with_capacity(4 * faces.len());
        for &[a, b, c] in faces {
            let ab = self.midpoint(a, b);
            let bc = self.midpoint(b, c);
            let ca = self.midpoint(c, a);
            out.push([a, ab, ca]);
            out.push([b, bc, ab]);
            out.push([c, ca, bc]);
            out.push([ab, bc, ca]);
        }
        out
    }

    pub fn into_vertices(self) -> Vec<[f64; 3]> {
        self.vertices
    }
}

/// A grid with a single tessellation subdivided `n_subdivisions` times.
pub fn icosphere_grid(n_subdivisions: usize) -> Arc<Grid> {
    let mut ico = Icosahedron::new();
    let mut faces = ico.base_faces();
    let mut triangles = Vec::new();
    let mut levels = Vec::new();
    for level in 0..=n_subdivisions {
        let first = triangles.len();
        triangles.extend_from_slice(&faces);
        levels.push(Level {
            first,
            last: triangles.len() - 1,
        });
        if level < n_subdivisions {
            faces = ico.subdivide(&faces);
        }
    }
    Arc::new(Grid::new(ico.into_vertices(), triangles, vec![levels]).unwrap())
}

/// A grid with two tessellations over one vertex pool: a coarse one
/// (one subdivision) and a fine one (two subdivisions).
pub fn two_tessellation_grid() -> Arc<Grid> {
    let mut ico = Icosahedron::new();
    let level0 = ico.base_faces();
    let level1 = ico.subdivide(&level0);
    let level2 = ico.subdivide(&level1);

    let mut triangles = Vec::new();
    let mut tessellations = Vec::new();
    for levels in [vec![&level0, &level1], vec![&level0, &level1, &level2]] {
        let mut ranges = Vec::new();
        for faces in levels {
            let first = triangles.len();
            triangles.extend_from_slice(faces);
            ranges.push(Level {
                first,
                last: triangles.len() - 1,
            });
        }
        tessellations.push(ranges);
    }
    Arc::new(Grid::new(ico.into_vertices(), triangles, tessellations).unwrap())
}

pub const MANTLE_RADII: [f32; 5] = [5771.0, 5971.0, 6071.0, 6171.0, 6271.0];
pub const CRUST_TOP: f32 = 6371.0;

fn tuple(data_type: DataType, values: &[f64]) -> DataValues {
    let mut data = DataValues::new(data_type, values.len());
    for (i, &v) in values.iter().enumerate() {
        data.set(i, v);
    }
    data
}

/// A two-layer spherical-earth model: an NPOINT mantle below a CONSTANT
/// crust, one attribute.
///
/// The mantle value at every vertex and node is `mantle_value(r)`, so
/// horizontally interpolated mantle values are exact; the crust value is
/// `crust_value(vertex_z)`, linear in the vertex's z-component.
pub fn two_layer_model(grid: Arc<Grid>) -> Model {
    // The crust gets its own tessellation when the grid has more than one.
    let tess_ids = if grid.n_tessellations() > 1 {
        vec![0, 1]
    } else {
        vec![0, 0]
    };
    let metadata = ModelMetadata::new(
        "synthetic two-layer model",
        vec!["mantle".to_owned(), "crust".to_owned()],
        tess_ids,
        vec!["pslowness".to_owned()],
        vec!["sec/km".to_owned()],
        DataType::Double,
        EarthShape::Sphere,
    )
    .unwrap();
    let mut model = Model::new(Arc::clone(&grid), metadata).unwrap();
    for vertex in 0..grid.n_vertices() {
        let radii: Vec<f32> = MANTLE_RADII.to_vec();
        let data: Vec<DataValues> = MANTLE_RADII
            .iter()
            .map(|&r| tuple(DataType::Double, &[mantle_value(f64::from(r))]))
            .collect();
        model
            .set_profile(vertex, 0, Profile::npoint(radii, data).unwrap())
            .unwrap();
        let z = grid.vertex(vertex)[2];
        model
            .set_profile(
                vertex,
                1,
                Profile::constant(
                    *MANTLE_RADII.last().unwrap(),
                    CRUST_TOP,
                    tuple(DataType::Double, &[crust_value(z)]),
                )
                .unwrap(),
            )
            .unwrap();
    }
    model.validate().unwrap();
    model
}

/// Mantle attribute as a function of radius only.
pub fn mantle_value(r: f64) -> f64 {
    8.0 + (6271.0 - r) / 500.0
}

/// Crust attribute as a function of the vertex z-component.
pub fn crust_value(z: f64) -> f64 {
    2.0 + z
}
