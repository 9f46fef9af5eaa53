use crate::error::GeoTessError;
use crate::geomath::{self, Vector3};
use crate::model::Model;

/// A closed loop of great-circle segments on the unit sphere, used to
/// mask which vertices of a model are in scope.
///
/// Containment is decided by crossing parity: the arc from a reference
/// point of known sidedness to the query point is intersected with every
/// edge, and an odd number of crossings flips the answer.
#[derive(Debug, Clone)]
pub struct Polygon {
    vertices: Vec<Vector3>,
    reference: Vector3,
    reference_inside: bool,
}

impl Polygon {
    /// A polygon whose reference point is the normalized centroid of its
    /// vertices, assumed inside. Use [`Polygon::with_reference`] for
    /// loops where the centroid is not interior.
    pub fn new(vertices: Vec<Vector3>) -> Result<Self, GeoTessError> {
        let mut reference = [0.0, 0.0, 0.0];
        for v in &vertices {
            reference[0] += v[0];
            reference[1] += v[1];
            reference[2] += v[2];
        }
        if geomath::normalize(&mut reference) == 0.0 {
            return Err(GeoTessError::InvalidArgument(
                "polygon vertices have no usable centroid; supply a reference point".to_owned(),
            ));
        }
        Self::with_reference(vertices, reference, true)
    }

    pub fn with_reference(
        vertices: Vec<Vector3>,
        reference: Vector3,
        reference_inside: bool,
    ) -> Result<Self, GeoTessError> {
        if vertices.len() < 3 {
            return Err(GeoTessError::InvalidArgument(format!(
                "a polygon needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        for v in vertices.iter().chain(std::iter::once(&reference)) {
            if !geomath::is_unit_vector(v) {
                return Err(GeoTessError::InvalidArgument(
                    "polygon points must be unit vectors".to_owned(),
                ));
            }
        }
        Ok(Self {
            vertices,
            reference,
            reference_inside,
        })
    }

    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertices(&self) -> &[Vector3] {
        &self.vertices
    }

    pub fn contains(&self, v: &Vector3) -> bool {
        if geomath::angle(&self.reference, v) < 1e-12 {
            return self.reference_inside;
        }
        let mut crossings = 0;
        for i in 0..self.vertices.len() {
            let a = &self.vertices[i];
            let b = &self.vertices[(i + 1) % self.vertices.len()];
            if arcs_cross(&self.reference, v, a, b) {
                crossings += 1;
            }
        }
        (crossings % 2 == 1) != self.reference_inside
    }

    pub fn contains_any<'a, I: IntoIterator<Item = &'a Vector3>>(&self, points: I) -> bool {
        points.into_iter().any(|p| self.contains(p))
    }

    pub fn contains_all<'a, I: IntoIterator<Item = &'a Vector3>>(&self, points: I) -> bool {
        points.into_iter().all(|p| self.contains(p))
    }
}

/// True when `p` lies on the minor arc from `a` to `b`.
fn arc_contains(a: &Vector3, b: &Vector3, p: &Vector3) -> bool {
    geomath::angle(a, p) + geomath::angle(p, b) <= geomath::angle(a, b) + 1e-12
}

/// True when the minor arcs `a`-`b` and `c`-`d` intersect. Arcs on the
/// same great circle report no crossing.
fn arcs_cross(a: &Vector3, b: &Vector3, c: &Vector3, d: &Vector3) -> bool {
    let n1 = geomath::cross(a, b);
    let n2 = geomath::cross(c, d);
    let mut p = geomath::cross(&n1, &n2);
    if geomath::normalize(&mut p) == 0.0 {
        return false;
    }
    let q = [-p[0], -p[1], -p[2]];
    (arc_contains(a, b, &p) && arc_contains(c, d, &p))
        || (arc_contains(a, b, &q) && arc_contains(c, d, &q))
}

/// A radial surface specified independently of any grid vertex: a fixed
/// depth below sea level, a fixed radius, or a fractional position
/// within a named layer. Horizons bound the radial extent of a model's
/// active region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Horizon {
    /// Depth below the surface of the model's earth shape, in km.
    /// When `layer` is set, the resolved radius is clamped into that
    /// layer at each vertex.
    Depth { depth: f64, layer: Option<usize> },
    /// Radius from the center of the Earth, in km.
    Radius { radius: f64, layer: Option<usize> },
    /// Fractional position within a layer: 0 is the layer bottom, 1 the
    /// layer top.
    LayerFraction { fraction: f64, layer: usize },
}

impl Horizon {
    /// The radius of this horizon at the given grid vertex, in km.
    pub fn radius_at(&self, model: &Model, vertex: usize) -> f64 {
        match *self {
            Self::Depth { depth, layer } => {
                let r = model.earth_radius_at(vertex) - depth;
                clamp_to_layer(model, vertex, r, layer)
            }
            Self::Radius { radius, layer } => clamp_to_layer(model, vertex, radius, layer),
            Self::LayerFraction { fraction, layer } => {
                let bottom = f64::from(model.radius_bottom(vertex, layer));
                let top = f64::from(model.radius_top(vertex, layer));
                bottom + fraction.clamp(0.0, 1.0) * (top - bottom)
            }
        }
    }
}

fn clamp_to_layer(model: &Model, vertex: usize, r: f64, layer: Option<usize>) -> f64 {
    match layer {
        Some(layer) => r.clamp(
            f64::from(model.radius_bottom(vertex, layer)),
            f64::from(model.radius_top(vertex, layer)),
        ),
        None => r,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::earth::EarthShape;

    fn cap_polygon(lat: f64, n: usize) -> Polygon {
        // A ring of constant latitude around the north pole.
        let shape = EarthShape::Sphere;
        let vertices = (0..n)
            .map(|i| shape.vector_degrees(lat, 360.0 * i as f64 / n as f64))
            .collect();
        Polygon::with_reference(vertices, [0.0, 0.0, 1.0], true).unwrap()
    }

    #[test]
    fn needs_three_vertices() {
        let result = Polygon::new(vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        assert!(matches!(result, Err(GeoTessError::InvalidArgument(_))));
    }

    #[test]
    fn rejects_non_unit_vertices() {
        let result = Polygon::new(vec![[2.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        assert!(result.is_err());
    }

    #[test]
    fn polar_cap_contains_the_pole_region() {
        let shape = EarthShape::Sphere;
        let cap = cap_polygon(40.0, 24);
        assert!(cap.contains(&[0.0, 0.0, 1.0]));
        assert!(cap.contains(&shape.vector_degrees(60.0, 123.0)));
        assert!(!cap.contains(&shape.vector_degrees(20.0, 123.0)));
        assert!(!cap.contains(&shape.vector_degrees(-60.0, 5.0)));
    }

    #[test]
    fn outside_reference_flips_the_parity() {
        let shape = EarthShape::Sphere;
        let vertices: Vec<_> = (0..24)
            .map(|i| shape.vector_degrees(40.0, 360.0 * f64::from(i) / 24.0))
            .collect();
        let cap = Polygon::with_reference(vertices, [0.0, 0.0, -1.0], false).unwrap();
        assert!(cap.contains(&shape.vector_degrees(80.0, 10.0)));
        assert!(!cap.contains(&shape.vector_degrees(-10.0, 77.0)));
    }

    #[test]
    fn small_lune_shaped_polygon() {
        let shape = EarthShape::Sphere;
        let vertices = vec![
            shape.vector_degrees(0.0, 0.0),
            shape.vector_degrees(0.0, 10.0),
            shape.vector_degrees(10.0, 10.0),
            shape.vector_degrees(10.0, 0.0),
        ];
        let quad = Polygon::new(vertices).unwrap();
        assert!(quad.contains(&shape.vector_degrees(5.0, 5.0)));
        assert!(!quad.contains(&shape.vector_degrees(5.0, 15.0)));
        assert!(!quad.contains(&shape.vector_degrees(-5.0, 5.0)));
        assert!(!quad.contains(&shape.vector_degrees(5.0, 185.0)));
    }

    #[test]
    fn contains_any_and_all() {
        let shape = EarthShape::Sphere;
        let cap = cap_polygon(40.0, 24);
        let inside = shape.vector_degrees(80.0, 0.0);
        let outside = shape.vector_degrees(0.0, 0.0);
        let points = [inside, outside];
        assert!(cap.contains_any(points.iter()));
        assert!(!cap.contains_all(points.iter()));
    }

    #[test]
    fn arc_crossing_basics() {
        let shape = EarthShape::Sphere;
        let a = shape.vector_degrees(-10.0, 0.0);
        let b = shape.vector_degrees(10.0, 0.0);
        let c = shape.vector_degrees(0.0, -10.0);
        let d = shape.vector_degrees(0.0, 10.0);
        assert!(arcs_cross(&a, &b, &c, &d));
        // Disjoint arcs.
        let e = shape.vector_degrees(0.0, 20.0);
        let f = shape.vector_degrees(0.0, 40.0);
        assert!(!arcs_cross(&a, &b, &e, &f));
        // Same great circle.
        assert!(!arcs_cross(&c, &d, &e, &f));
    }
}
