use std::collections::HashSet;

use crate::error::GeoTessError;
use crate::geomath::{self, Vector3};
use crate::grid::Grid;
use crate::model::Model;
use crate::profile::RadialInterpolation;

/// How values are interpolated between grid vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalInterpolation {
    #[default]
    Linear,
    NaturalNeighbor,
}

/// Query cursor state for one tessellation: the last triangle found on
/// each level and the horizontal coefficients computed on the top level.
#[derive(Debug, Clone)]
struct TessState {
    level_hints: Vec<usize>,
    triangle: usize,
    coefficients: Vec<(usize, f64)>,
    valid: bool,
}

/// A query cursor bound to one model.
///
/// `set*` moves the cursor; `value` interpolates. The cursor caches the
/// triangles found by previous walks and restarts new walks from them,
/// which makes sequences of nearby queries cheap. Results never depend
/// on the cache: a walk from any start triangle finds the same triangle.
#[derive(Debug)]
pub struct Position<'a> {
    model: &'a Model,
    horizontal: HorizontalInterpolation,
    radial: RadialInterpolation,
    u: Vector3,
    radius: f64,
    layer: usize,
    tess: Vec<TessState>,
    /// Per participating vertex, the (node, weight) pairs of the radial
    /// interpolation in the current layer.
    radial_coefficients: Vec<Vec<(usize, f64)>>,
    radial_valid: bool,
}

/// Angular tolerance below which a query point is taken to coincide
/// with a grid vertex.
const VERTEX_COINCIDENCE: f64 = 1e-9;

/// Tolerance of the circumcircle test: a query point closer than this to
/// the circle itself counts as sitting on it.
const COCIRCULAR_TOLERANCE: f64 = 1e-15;

impl<'a> Position<'a> {
    pub fn new(
        model: &'a Model,
        horizontal: HorizontalInterpolation,
        radial: RadialInterpolation,
    ) -> Self {
        let grid = model.grid();
        let tess = (0..grid.n_tessellations())
            .map(|t| TessState {
                level_hints: (0..grid.n_levels(t)).map(|l| grid.level(t, l).first).collect(),
                triangle: grid.level(t, grid.top_level(t)).first,
                coefficients: Vec::new(),
                valid: false,
            })
            .collect();
        Self {
            model,
            horizontal,
            radial,
            u: [0.0, 0.0, 1.0],
            radius: 0.0,
            layer: model.n_layers() - 1,
            tess,
            radial_coefficients: Vec::new(),
            radial_valid: false,
        }
    }

    pub fn model(&self) -> &Model {
        self.model
    }

    pub fn horizontal_interpolation(&self) -> HorizontalInterpolation {
        self.horizontal
    }

    pub fn radial_interpolation(&self) -> RadialInterpolation {
        self.radial
    }

    /// Moves the cursor to a geographic latitude and longitude in degrees
    /// and a depth in km below the model's reference surface. The layer
    /// containing the resulting radius is selected automatically.
    pub fn set(&mut self, lat: f64, lon: f64, depth: f64) -> Result<(), GeoTessError> {
        let shape = self.model.metadata().earth_shape;
        let u = shape.vector_degrees(lat, lon);
        let radius = shape.earth_radius(&u) - depth;
        self.relocate(u, radius, None)
    }

    /// Like [`Position::set`] but pins the query to a layer; the radius
    /// is clamped into that layer's radial extent at the query point.
    pub fn set_in_layer(
        &mut self,
        layer: usize,
        lat: f64,
        lon: f64,
        depth: f64,
    ) -> Result<(), GeoTessError> {
        let shape = self.model.metadata().earth_shape;
        let u = shape.vector_degrees(lat, lon);
        let radius = shape.earth_radius(&u) - depth;
        self.relocate(u, radius, Some(layer))
    }

    /// Moves the cursor to a unit vector and radius directly.
    pub fn set_vector(&mut self, v: Vector3, radius: f64) -> Result<(), GeoTessError> {
        if !geomath::is_unit_vector(&v) {
            return Err(GeoTessError::InvalidArgument(format!(
                "not a unit vector: [{}, {}, {}]",
                v[0], v[1], v[2]
            )));
        }
        self.relocate(v, radius, None)
    }

    /// Changes the radius, keeping the horizontal position and its
    /// coefficients. Only the radial coefficients are invalidated; the
    /// layer is re-selected from the new radius.
    pub fn set_radius(&mut self, radius: f64) -> Result<(), GeoTessError> {
        self.radius = radius.max(0.0);
        self.radial_valid = false;
        self.layer = self.select_layer()?;
        Ok(())
    }

    /// Changes the depth below the reference surface at the current
    /// horizontal position.
    pub fn set_depth(&mut self, depth: f64) -> Result<(), GeoTessError> {
        let shape = self.model.metadata().earth_shape;
        let radius = shape.earth_radius(&self.u) - depth;
        self.set_radius(radius)
    }

    /// Moves the radius to the top of a layer at the current horizontal
    /// position.
    pub fn set_top(&mut self, layer: usize) -> Result<(), GeoTessError> {
        self.check_layer(layer)?;
        let r = self.radius_top_of_layer(layer)?;
        self.radius = r;
        self.radial_valid = false;
        self.layer = layer;
        Ok(())
    }

    /// Moves the radius to the bottom of a layer at the current
    /// horizontal position.
    pub fn set_bottom(&mut self, layer: usize) -> Result<(), GeoTessError> {
        self.check_layer(layer)?;
        let r = self.radius_bottom_of_layer(layer)?;
        self.radius = r;
        self.radial_valid = false;
        self.layer = layer;
        Ok(())
    }

    fn relocate(
        &mut self,
        u: Vector3,
        radius: f64,
        layer: Option<usize>,
    ) -> Result<(), GeoTessError> {
        self.u = u;
        self.radius = radius.max(0.0);
        for state in &mut self.tess {
            state.valid = false;
        }
        self.radial_valid = false;
        self.layer = match layer {
            Some(layer) => {
                self.check_layer(layer)?;
                let bottom = self.radius_bottom_of_layer(layer)?;
                let top = self.radius_top_of_layer(layer)?;
                if bottom.is_finite() && top.is_finite() {
                    self.radius = self.radius.clamp(bottom, top);
                }
                layer
            }
            None => self.select_layer()?,
        };
        Ok(())
    }

    fn check_layer(&self, layer: usize) -> Result<(), GeoTessError> {
        if layer >= self.model.n_layers() {
            return Err(GeoTessError::InvalidArgument(format!(
                "layer {layer} out of range ({} layers)",
                self.model.n_layers()
            )));
        }
        Ok(())
    }

    /// The deepest layer whose interpolated top is at or above the
    /// current radius, or the top layer when the radius is above the
    /// whole model.
    fn select_layer(&mut self) -> Result<usize, GeoTessError> {
        let n = self.model.n_layers();
        for layer in 0..n {
            let top = self.radius_top_of_layer(layer)?;
            if self.radius <= top {
                return Ok(layer);
            }
        }
        Ok(n - 1)
    }

    pub fn vector(&self) -> &Vector3 {
        &self.u
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn depth(&self) -> f64 {
        self.model.metadata().earth_shape.earth_radius(&self.u) - self.radius
    }

    /// The layer actually providing values, which callers compare with
    /// the layer they asked for to detect clamping.
    pub fn layer_id(&self) -> usize {
        self.layer
    }

    /// The containing triangle on the top level of the current layer's
    /// tessellation.
    pub fn triangle(&mut self) -> Result<usize, GeoTessError> {
        let tess = self.model.metadata().tess_id(self.layer);
        self.update_tess(tess)?;
        Ok(self.tess[tess].triangle)
    }

    /// The horizontal (vertex, weight) pairs at the current position.
    pub fn horizontal_coefficients(&mut self) -> Result<&[(usize, f64)], GeoTessError> {
        let tess = self.model.metadata().tess_id(self.layer);
        self.update_tess(tess)?;
        Ok(&self.tess[tess].coefficients)
    }

    /// Interpolated top radius of a layer at the current horizontal
    /// position, in km.
    pub fn radius_top_of_layer(&mut self, layer: usize) -> Result<f64, GeoTessError> {
        let tess = self.model.metadata().tess_id(layer);
        self.update_tess(tess)?;
        Ok(self.tess[tess]
            .coefficients
            .iter()
            .map(|&(v, w)| w * f64::from(self.model.radius_top(v, layer)))
            .sum())
    }

    /// Interpolated bottom radius of a layer at the current horizontal
    /// position, in km.
    pub fn radius_bottom_of_layer(&mut self, layer: usize) -> Result<f64, GeoTessError> {
        let tess = self.model.metadata().tess_id(layer);
        self.update_tess(tess)?;
        Ok(self.tess[tess]
            .coefficients
            .iter()
            .map(|&(v, w)| w * f64::from(self.model.radius_bottom(v, layer)))
            .sum())
    }

    pub fn radius_top(&mut self) -> Result<f64, GeoTessError> {
        self.radius_top_of_layer(self.layer)
    }

    pub fn radius_bottom(&mut self) -> Result<f64, GeoTessError> {
        self.radius_bottom_of_layer(self.layer)
    }

    /// Interpolated attribute value at the current position.
    ///
    /// Out-of-range radii are clamped into the profile stacks; missing
    /// data and empty profiles yield NaN rather than an error.
    pub fn value(&mut self, attribute: usize) -> Result<f64, GeoTessError> {
        if attribute >= self.model.n_attributes() {
            return Err(GeoTessError::InvalidArgument(format!(
                "attribute {attribute} out of range ({} attributes)",
                self.model.n_attributes()
            )));
        }
        self.update_radial()?;
        let tess = self.model.metadata().tess_id(self.layer);
        let mut sum = 0.0;
        for (i, &(vertex, w)) in self.tess[tess].coefficients.iter().enumerate() {
            if w == 0.0 {
                continue;
            }
            let profile = self.model.profile(vertex, self.layer);
            let nodes = &self.radial_coefficients[i];
            if nodes.is_empty() {
                // A participating profile with no data.
                return Ok(f64::NAN);
            }
            let mut radial_sum = 0.0;
            for &(node, rw) in nodes {
                radial_sum += rw * profile.value(node, attribute);
            }
            sum += w * radial_sum;
        }
        Ok(sum)
    }

    /// The combined interpolation weights, addressed by point-map index.
    /// Points masked out of the active region are omitted.
    pub fn indexes_and_weights(&mut self) -> Result<Vec<(usize, f64)>, GeoTessError> {
        self.update_radial()?;
        let tess = self.model.metadata().tess_id(self.layer);
        let map = self.model.point_map();
        let mut out = Vec::new();
        for (i, &(vertex, w)) in self.tess[tess].coefficients.iter().enumerate() {
            for &(node, rw) in &self.radial_coefficients[i] {
                if let Some(point) = map.point_index(vertex, self.layer, node) {
                    out.push((point, w * rw));
                }
            }
        }
        Ok(out)
    }

    fn update_radial(&mut self) -> Result<(), GeoTessError> {
        let tess = self.model.metadata().tess_id(self.layer);
        self.update_tess(tess)?;
        if self.radial_valid {
            return Ok(());
        }
        let model = self.model;
        let n = self.tess[tess].coefficients.len();
        while self.radial_coefficients.len() < n {
            self.radial_coefficients.push(Vec::new());
        }
        for i in 0..n {
            let (vertex, _) = self.tess[tess].coefficients[i];
            model.profile(vertex, self.layer).radial_coefficients(
                self.radius,
                self.radial,
                &mut self.radial_coefficients[i],
            );
        }
        self.radial_valid = true;
        Ok(())
    }

    /// Walks to the containing triangle on every level of a tessellation
    /// and computes the horizontal coefficients on its top level.
    fn update_tess(&mut self, tess: usize) -> Result<(), GeoTessError> {
        if self.tess[tess].valid {
            return Ok(());
        }
        let model = self.model;
        let grid = model.grid();
        let u = self.u;

        let mut t = grid.find_triangle(self.tess[tess].level_hints[0], &u)?;
        self.tess[tess].level_hints[0] = t;
        for level in 1..grid.n_levels(tess) {
            let d = grid.descendant(t).ok_or_else(|| {
                GeoTessError::StateError(format!("triangle {t} has no descendant"))
            })?;
            t = grid.find_triangle(d, &u)?;
            self.tess[tess].level_hints[level] = t;
        }

        let coefficients = match self.horizontal {
            HorizontalInterpolation::Linear => barycentric_coefficients(grid, t, &u),
            HorizontalInterpolation::NaturalNeighbor => {
                natural_neighbor_coefficients(grid, tess, t, &u)?
            }
        };
        let state = &mut self.tess[tess];
        state.triangle = t;
        state.coefficients = coefficients;
        state.valid = true;
        // Horizontal movement always invalidates the radial pairing.
        self.radial_valid = false;
        Ok(())
    }
}

/// Weights proportional to the areas of the three sub-triangles cut off
/// by the query point, normalized to sum to 1. A query at a vertex gets
/// that vertex's weight 1 exactly.
fn barycentric_coefficients(grid: &Grid, triangle: usize, u: &Vector3) -> Vec<(usize, f64)> {
    let [a, b, c] = grid.triangle_vertex_indexes(triangle);
    let va = grid.vertex(a);
    let vb = grid.vertex(b);
    let vc = grid.vertex(c);
    let s = [
        geomath::scalar_triple_product(vb, vc, u).max(0.0),
        geomath::scalar_triple_product(vc, va, u).max(0.0),
        geomath::scalar_triple_product(va, vb, u).max(0.0),
    ];
    let total: f64 = s.iter().sum();
    if total <= 0.0 {
        // Degenerate: snap to the closest corner.
        let mut best = (a, geomath::angle(va, u));
        for (v, vv) in [(b, vb), (c, vc)] {
            let d = geomath::angle(vv, u);
            if d < best.1 {
                best = (v, d);
            }
        }
        return vec![(best.0, 1.0)];
    }
    vec![
        (a, s[0] / total),
        (b, s[1] / total),
        (c, s[2] / total),
    ]
}

/// Sibson (natural neighbor) weights on the sphere.
///
/// The query point is notionally inserted into the top-level
/// triangulation: the cavity of triangles whose circumcircles contain
/// the point is collected, its boundary ring is the set of natural
/// neighbors, and each neighbor's weight is the fraction of the new
/// Voronoi cell's area stolen from that neighbor's cell. Cell fragments
/// are bounded by circumcenters of the cavity triangles and of the fan
/// triangles created by the insertion. A point exactly on a triangle's
/// circumscribing circle is a tie, broken by lowest triangle index as in
/// the walk; such a triangle steals no area either way, so the weights
/// do not depend on how the tie falls.
fn natural_neighbor_coefficients(
    grid: &Grid,
    tess: usize,
    triangle: usize,
    u: &Vector3,
) -> Result<Vec<(usize, f64)>, GeoTessError> {
    // A query at a grid vertex is that vertex alone.
    for v in grid.triangle_vertex_indexes(triangle) {
        if geomath::angle(grid.vertex(v), u) < VERTEX_COINCIDENCE {
            return Ok(vec![(v, 1.0)]);
        }
    }

    let cavity = collect_cavity(grid, tess, triangle, u);
    let ring = boundary_ring(grid, &cavity)?;

    // Circumcenters of the fan triangles (u, ring[k], ring[k+1]). If any
    // is degenerate the point is collinear with a boundary edge; the
    // barycentric weights are the correct limit there.
    let m = ring.len();
    let mut fan_centers = Vec::with_capacity(m);
    for k in 0..m {
        let (a, _) = ring[k];
        let (b, _) = ring[(k + 1) % m];
        match geomath::circumcenter(u, grid.vertex(a), grid.vertex(b)) {
            Some(cc) => fan_centers.push(cc),
            None => return Ok(barycentric_coefficients(grid, triangle, u)),
        }
    }

    let mut weights = Vec::with_capacity(m);
    let mut total = 0.0;
    for k in 0..m {
        let (vertex, _) = ring[k];
        let prev = (k + m - 1) % m;
        // Cavity triangles incident to this ring vertex, from the one
        // owning the incoming boundary edge to the one owning the
        // outgoing edge.
        let fan = vertex_fan(grid, &cavity, ring[prev].1, ring[k].1, vertex)?;
        let mut polygon: Vec<Vector3> = fan.iter().map(|&t| triangle_circumcenter(grid, t)).collect();
        polygon.push(fan_centers[k]);
        polygon.push(fan_centers[prev]);
        let area = polygon_area(&polygon);
        total += area;
        weights.push((vertex, area));
    }

    if !(total > 0.0) {
        return Ok(barycentric_coefficients(grid, triangle, u));
    }
    for (_, w) in &mut weights {
        *w /= total;
    }
    Ok(weights)
}

/// Where a query point sits relative to a triangle's circumscribing
/// circle.
enum CircleTest {
    Inside,
    OnCircle,
    Outside,
}

/// Breadth-first collection of the triangles whose circumcircles contain
/// `u`, starting from the containing triangle. A triangle whose circle
/// passes exactly through `u` joins only when its index is lower than
/// the containing triangle's; an exactly co-circular triangle steals no
/// Voronoi area, so either resolution yields the same weights and the
/// index rule just makes the cavity reproducible.
fn collect_cavity(grid: &Grid, tess: usize, triangle: usize, u: &Vector3) -> HashSet<usize> {
    let top = grid.level(tess, grid.top_level(tess));
    let mut cavity = HashSet::new();
    cavity.insert(triangle);
    let mut frontier = vec![triangle];
    while let Some(t) = frontier.pop() {
        for side in 0..3 {
            let Some(n) = grid.neighbor(t, side) else { continue };
            if cavity.contains(&n) || !top.triangles().contains(&n) {
                continue;
            }
            let joins = match circumcircle_test(grid, n, u) {
                CircleTest::Inside => true,
                CircleTest::OnCircle => n < triangle,
                CircleTest::Outside => false,
            };
            if joins {
                cavity.insert(n);
                frontier.push(n);
            }
        }
    }
    cavity
}

fn circumcircle_test(grid: &Grid, triangle: usize, u: &Vector3) -> CircleTest {
    let [a, b, c] = grid.triangle_vertex_indexes(triangle);
    let Some(cc) = geomath::circumcenter(grid.vertex(a), grid.vertex(b), grid.vertex(c)) else {
        return CircleTest::Outside;
    };
    let d = geomath::dot(&cc, u) - geomath::dot(&cc, grid.vertex(a));
    if d.abs() <= COCIRCULAR_TOLERANCE {
        CircleTest::OnCircle
    } else if d > 0.0 {
        CircleTest::Inside
    } else {
        CircleTest::Outside
    }
}

fn triangle_circumcenter(grid: &Grid, triangle: usize) -> Vector3 {
    let [a, b, c] = grid.triangle_vertex_indexes(triangle);
    geomath::circumcenter(grid.vertex(a), grid.vertex(b), grid.vertex(c))
        .unwrap_or_else(|| grid.triangle_center(triangle))
}

/// The directed boundary of the cavity as a CCW ring of
/// (vertex, owning cavity triangle) pairs: entry `k` holds the edge from
/// `ring[k].0` to `ring[k+1].0`, lying in cavity triangle `ring[k].1`.
fn boundary_ring(
    grid: &Grid,
    cavity: &HashSet<usize>,
) -> Result<Vec<(usize, usize)>, GeoTessError> {
    let mut next: Vec<(usize, usize, usize)> = Vec::new();
    let mut triangles: Vec<usize> = cavity.iter().copied().collect();
    triangles.sort_unstable();
    for &t in &triangles {
        let verts = grid.triangle_vertex_indexes(t);
        for side in 0..3 {
            let outside = match grid.neighbor(t, side) {
                Some(n) => !cavity.contains(&n),
                None => true,
            };
            if outside {
                next.push((verts[(side + 1) % 3], verts[(side + 2) % 3], t));
            }
        }
    }

    let mut ring = Vec::with_capacity(next.len());
    let Some(&(start, _, _)) = next.iter().min() else {
        return Err(GeoTessError::StateError("empty interpolation cavity".to_owned()));
    };
    let mut a = start;
    for _ in 0..next.len() {
        let &(_, b, t) = next
            .iter()
            .find(|&&(from, _, _)| from == a)
            .ok_or_else(|| {
                GeoTessError::StateError("interpolation cavity boundary is not closed".to_owned())
            })?;
        ring.push((a, t));
        a = b;
        if a == start {
            break;
        }
    }
    if ring.len() != next.len() {
        return Err(GeoTessError::StateError(
            "interpolation cavity boundary is not a single ring".to_owned(),
        ));
    }
    Ok(ring)
}

/// The cavity triangles sharing `vertex`, walked from `first` (owner of
/// the boundary edge arriving at the vertex) to `last` (owner of the
/// edge leaving it).
fn vertex_fan(
    grid: &Grid,
    cavity: &HashSet<usize>,
    first: usize,
    last: usize,
    vertex: usize,
) -> Result<Vec<usize>, GeoTessError> {
    let mut fan = vec![first];
    let mut current = first;
    let mut came_from = usize::MAX;
    for _ in 0..cavity.len() {
        if current == last {
            return Ok(fan);
        }
        let verts = grid.triangle_vertex_indexes(current);
        let corner = verts
            .iter()
            .position(|&v| v == vertex)
            .ok_or_else(|| GeoTessError::StateError("cavity fan lost its vertex".to_owned()))?;
        // The two edges containing the vertex are opposite the other two
        // corners.
        let mut stepped = false;
        for side in [(corner + 1) % 3, (corner + 2) % 3] {
            if let Some(n) = grid.neighbor(current, side) {
                if n != came_from && cavity.contains(&n) {
                    came_from = current;
                    current = n;
                    fan.push(n);
                    stepped = true;
                    break;
                }
            }
        }
        if !stepped {
            break;
        }
    }
    if current == last {
        Ok(fan)
    } else {
        Err(GeoTessError::StateError(
            "interpolation cavity is not edge-connected around a vertex".to_owned(),
        ))
    }
}

/// Unsigned area of a spherical polygon, by fanning triangles from the
/// first point.
fn polygon_area(points: &[Vector3]) -> f64 {
    let mut area = 0.0;
    for i in 1..points.len().saturating_sub(1) {
        area += geomath::triangle_area(&points[0], &points[i], &points[i + 1]);
    }
    area.abs()
}
