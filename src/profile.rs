use std::sync::OnceLock;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::data::DataValues;
use crate::error::GeoTessError;
use crate::spline::SplineFactors;

/// On-disk tag of a profile variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ProfileKind {
    Empty = 0,
    Thin,
    Constant,
    Npoint,
    Surface,
    SurfaceEmpty,
}

/// How values between radial nodes are interpolated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RadialInterpolation {
    #[default]
    Linear,
    CubicSpline,
}

/// The radial stack of attribute data at one vertex within one layer.
///
/// Radii are km from the Earth's center, ascending. The variant encodes
/// how much radial structure the layer has at this vertex, from a
/// zero-thickness gap (`Empty`) to a full stack of nodes (`Npoint`).
#[derive(Debug, Clone)]
pub enum Profile {
    /// Zero-thickness layer: interface radii only, no data.
    Empty { radii: [f32; 2] },
    /// Infinitesimal layer: one radius, one data tuple.
    Thin { radius: f32, data: DataValues },
    /// One data tuple that applies throughout the layer.
    Constant { radii: [f32; 2], data: DataValues },
    /// Two or more nodes with radially varying data.
    Npoint {
        radii: Vec<f32>,
        data: Vec<DataValues>,
        spline: OnceLock<Option<SplineFactors>>,
    },
    /// Data on the sphere surface of a 2D model; no radial extent.
    Surface { data: DataValues },
    /// 2D model vertex with no data.
    SurfaceEmpty,
}

impl Profile {
    pub fn empty(radius_bottom: f32, radius_top: f32) -> Result<Self, GeoTessError> {
        check_interval(radius_bottom, radius_top)?;
        Ok(Self::Empty {
            radii: [radius_bottom, radius_top],
        })
    }

    pub fn thin(radius: f32, data: DataValues) -> Result<Self, GeoTessError> {
        if radius < 0.0 {
            return Err(GeoTessError::InvalidArgument(format!(
                "negative radius: {radius}"
            )));
        }
        Ok(Self::Thin { radius, data })
    }

    pub fn constant(
        radius_bottom: f32,
        radius_top: f32,
        data: DataValues,
    ) -> Result<Self, GeoTessError> {
        check_interval(radius_bottom, radius_top)?;
        Ok(Self::Constant {
            radii: [radius_bottom, radius_top],
            data,
        })
    }

    pub fn npoint(radii: Vec<f32>, data: Vec<DataValues>) -> Result<Self, GeoTessError> {
        if radii.len() < 2 {
            return Err(GeoTessError::InvalidArgument(format!(
                "a multi-node profile needs at least 2 radii, got {}",
                radii.len()
            )));
        }
        if radii.len() != data.len() {
            return Err(GeoTessError::InvalidArgument(format!(
                "{} radii but {} data tuples",
                radii.len(),
                data.len()
            )));
        }
        if radii[0] < 0.0 || radii.windows(2).any(|w| w[1] < w[0]) {
            return Err(GeoTessError::InvalidArgument(
                "radii must be non-negative and ascending".to_owned(),
            ));
        }
        Ok(Self::Npoint {
            radii,
            data,
            spline: OnceLock::new(),
        })
    }

    pub fn surface(data: DataValues) -> Self {
        Self::Surface { data }
    }

    pub fn surface_empty() -> Self {
        Self::SurfaceEmpty
    }

    pub fn kind(&self) -> ProfileKind {
        match self {
            Self::Empty { .. } => ProfileKind::Empty,
            Self::Thin { .. } => ProfileKind::Thin,
            Self::Constant { .. } => ProfileKind::Constant,
            Self::Npoint { .. } => ProfileKind::Npoint,
            Self::Surface { .. } => ProfileKind::Surface,
            Self::SurfaceEmpty => ProfileKind::SurfaceEmpty,
        }
    }

    pub fn radii(&self) -> &[f32] {
        match self {
            Self::Empty { radii } | Self::Constant { radii, .. } => radii,
            Self::Thin { radius, .. } => std::slice::from_ref(radius),
            Self::Npoint { radii, .. } => radii,
            Self::Surface { .. } | Self::SurfaceEmpty => &[],
        }
    }

    pub fn n_radii(&self) -> usize {
        self.radii().len()
    }

    /// Number of radial nodes that carry data.
    pub fn n_data(&self) -> usize {
        match self {
            Self::Empty { .. } | Self::SurfaceEmpty => 0,
            Self::Thin { .. } | Self::Constant { .. } | Self::Surface { .. } => 1,
            Self::Npoint { data, .. } => data.len(),
        }
    }

    pub fn radius_bottom(&self) -> f32 {
        self.radii().first().copied().unwrap_or(0.0)
    }

    pub fn radius_top(&self) -> f32 {
        self.radii().last().copied().unwrap_or(0.0)
    }

    pub fn thickness(&self) -> f32 {
        self.radius_top() - self.radius_bottom()
    }

    /// Radius of the data node `node`; for single-tuple variants this is
    /// the layer center.
    pub fn radius_of_node(&self, node: usize) -> f32 {
        match self {
            Self::Npoint { radii, .. } => radii[node],
            Self::Thin { radius, .. } => *radius,
            Self::Constant { radii, .. } => 0.5 * (radii[0] + radii[1]),
            Self::Empty { .. } | Self::Surface { .. } | Self::SurfaceEmpty => 0.0,
        }
    }

    pub fn data(&self, node: usize) -> Option<&DataValues> {
        match self {
            Self::Empty { .. } | Self::SurfaceEmpty => None,
            Self::Thin { data, .. } | Self::Constant { data, .. } | Self::Surface { data } => {
                (node == 0).then_some(data)
            }
            Self::Npoint { data, .. } => data.get(node),
        }
    }

    pub fn data_mut(&mut self, node: usize) -> Option<&mut DataValues> {
        match self {
            Self::Empty { .. } | Self::SurfaceEmpty => None,
            Self::Thin { data, .. } | Self::Constant { data, .. } | Self::Surface { data } => {
                (node == 0).then_some(data)
            }
            Self::Npoint { data, .. } => data.get_mut(node),
        }
    }

    /// Attribute value at a data node, NaN when the profile has no data.
    pub fn value(&self, node: usize, attribute: usize) -> f64 {
        self.data(node).map_or(f64::NAN, |d| d.get(attribute))
    }

    /// Fills `out` with `(node, weight)` pairs such that the interpolated
    /// value at radius `r` is `Σ weight * value(node, attr)`. Radii
    /// outside the stack are clamped; the weights sum to 1 whenever any
    /// pair is emitted. Data-free variants emit nothing.
    pub fn radial_coefficients(
        &self,
        r: f64,
        radial: RadialInterpolation,
        out: &mut Vec<(usize, f64)>,
    ) {
        out.clear();
        match self {
            Self::Empty { .. } | Self::SurfaceEmpty => {}
            Self::Thin { .. } | Self::Constant { .. } | Self::Surface { .. } => {
                out.push((0, 1.0));
            }
            Self::Npoint { radii, .. } => match radial {
                RadialInterpolation::Linear => linear_coefficients(radii, r, out),
                RadialInterpolation::CubicSpline => match self.spline_factors() {
                    Some(factors) => {
                        let mut weights = Vec::new();
                        factors.weights(r, &mut weights);
                        out.extend(weights.into_iter().enumerate());
                    }
                    // Stacks with repeated radii have no spline.
                    None => linear_coefficients(radii, r, out),
                },
            },
        }
    }

    /// Interpolated attribute value at radius `r`.
    pub fn interpolate(&self, r: f64, radial: RadialInterpolation, attribute: usize) -> f64 {
        match self {
            Self::Thin { data, .. } | Self::Constant { data, .. } | Self::Surface { data } => {
                data.get(attribute)
            }
            Self::Empty { .. } | Self::SurfaceEmpty => f64::NAN,
            Self::Npoint { .. } => {
                let mut coefficients = Vec::new();
                self.radial_coefficients(r, radial, &mut coefficients);
                coefficients
                    .iter()
                    .map(|&(node, w)| w * self.value(node, attribute))
                    .sum()
            }
        }
    }

    fn spline_factors(&self) -> Option<&SplineFactors> {
        match self {
            Self::Npoint { radii, spline, .. } => {
                spline.get_or_init(|| SplineFactors::new(radii)).as_ref()
            }
            _ => None,
        }
    }

    /// Equality for model comparison: same variant, radii within 1e-6 km,
    /// data exactly equal (bit-exact for floating types).
    pub fn eq_exact(&self, other: &Self) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        let ra = self.radii();
        let rb = other.radii();
        if ra.len() != rb.len()
            || ra
                .iter()
                .zip(rb)
                .any(|(&a, &b)| (f64::from(a) - f64::from(b)).abs() > 1e-6)
        {
            return false;
        }
        if self.n_data() != other.n_data() {
            return false;
        }
        (0..self.n_data()).all(|node| {
            match (self.data(node), other.data(node)) {
                (Some(a), Some(b)) => a.eq_exact(b),
                (None, None) => true,
                _ => false,
            }
        })
    }
}

fn check_interval(radius_bottom: f32, radius_top: f32) -> Result<(), GeoTessError> {
    if radius_bottom < 0.0 || radius_top < radius_bottom {
        return Err(GeoTessError::InvalidArgument(format!(
            "bad layer interval [{radius_bottom}, {radius_top}]"
        )));
    }
    Ok(())
}

/// Two-node linear weights at `r`, clamped to the ends of the stack. A
/// zero-thickness segment puts all weight on its upper node.
fn linear_coefficients(radii: &[f32], r: f64, out: &mut Vec<(usize, f64)>) {
    let n = radii.len();
    let bottom = f64::from(radii[0]);
    let top = f64::from(radii[n - 1]);
    if r <= bottom {
        out.push((0, 1.0));
        return;
    }
    if r >= top {
        out.push((n - 1, 1.0));
        return;
    }
    let i = match radii.partition_point(|&x| f64::from(x) <= r) {
        0 => 0,
        p if p >= n => n - 2,
        p => p - 1,
    };
    let h = f64::from(radii[i + 1]) - f64::from(radii[i]);
    if h <= 0.0 {
        out.push((i + 1, 1.0));
        return;
    }
    let c = (r - f64::from(radii[i])) / h;
    out.push((i, 1.0 - c));
    out.push((i + 1, c));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataType;
    use approx::assert_relative_eq;

    fn tuple(values: &[f64]) -> DataValues {
        let mut data = DataValues::new(DataType::Double, values.len());
        for (i, &v) in values.iter().enumerate() {
            data.set(i, v);
        }
        data
    }

    fn npoint_profile() -> Profile {
        Profile::npoint(
            vec![6200.0, 6250.0, 6300.0, 6371.0],
            vec![
                tuple(&[8.0]),
                tuple(&[7.0]),
                tuple(&[6.5]),
                tuple(&[5.8]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn construction_validation() {
        assert!(Profile::empty(6300.0, 6200.0).is_err());
        assert!(Profile::thin(-1.0, tuple(&[0.0])).is_err());
        assert!(Profile::npoint(vec![6300.0], vec![tuple(&[0.0])]).is_err());
        assert!(Profile::npoint(vec![6300.0, 6371.0], vec![tuple(&[0.0])]).is_err());
        assert!(Profile::npoint(vec![6371.0, 6300.0], vec![tuple(&[0.0]), tuple(&[1.0])]).is_err());
    }

    macro_rules! test_profile_shape {
        ($(($name:ident, $profile:expr, $kind:expr, $n_radii:expr, $n_data:expr),)*) => ($(
            #[test]
            fn $name() {
                let profile = $profile;
                assert_eq!(profile.kind(), $kind);
                assert_eq!(profile.n_radii(), $n_radii);
                assert_eq!(profile.n_data(), $n_data);
            }
        )*);
    }

    test_profile_shape! {
        (
            shape_empty,
            Profile::empty(6300.0, 6300.0).unwrap(),
            ProfileKind::Empty, 2, 0
        ),
        (
            shape_thin,
            Profile::thin(6300.0, tuple(&[1.0])).unwrap(),
            ProfileKind::Thin, 1, 1
        ),
        (
            shape_constant,
            Profile::constant(6300.0, 6371.0, tuple(&[1.0])).unwrap(),
            ProfileKind::Constant, 2, 1
        ),
        (shape_npoint, npoint_profile(), ProfileKind::Npoint, 4, 4),
        (shape_surface, Profile::surface(tuple(&[1.0])), ProfileKind::Surface, 0, 1),
        (shape_surface_empty, Profile::surface_empty(), ProfileKind::SurfaceEmpty, 0, 0),
    }

    #[test]
    fn kind_tag_round_trip() {
        for kind in [
            ProfileKind::Empty,
            ProfileKind::Thin,
            ProfileKind::Constant,
            ProfileKind::Npoint,
            ProfileKind::Surface,
            ProfileKind::SurfaceEmpty,
        ] {
            let tag: u8 = kind.into();
            assert_eq!(ProfileKind::try_from(tag), Ok(kind));
        }
        assert!(ProfileKind::try_from(6u8).is_err());
    }

    #[test]
    fn linear_interpolation_between_nodes() {
        let profile = npoint_profile();
        assert_relative_eq!(
            profile.interpolate(6225.0, RadialInterpolation::Linear, 0),
            7.5,
            epsilon = 1e-9
        );
        // Clamped below and above.
        assert_relative_eq!(
            profile.interpolate(6000.0, RadialInterpolation::Linear, 0),
            8.0
        );
        assert_relative_eq!(
            profile.interpolate(6400.0, RadialInterpolation::Linear, 0),
            5.8
        );
    }

    #[test]
    fn cubic_interpolation_hits_nodes() {
        let profile = npoint_profile();
        for (node, expected) in [(0, 8.0), (1, 7.0), (2, 6.5), (3, 5.8)] {
            let r = f64::from(profile.radii()[node]);
            assert_relative_eq!(
                profile.interpolate(r, RadialInterpolation::CubicSpline, 0),
                expected,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn cubic_emits_all_nodes() {
        let profile = npoint_profile();
        let mut coefficients = Vec::new();
        profile.radial_coefficients(6270.0, RadialInterpolation::CubicSpline, &mut coefficients);
        assert_eq!(coefficients.len(), 4);
        let total: f64 = coefficients.iter().map(|&(_, w)| w).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn repeated_radius_falls_back_to_linear() {
        // A first-order discontinuity in the middle of the stack.
        let profile = Profile::npoint(
            vec![6200.0, 6300.0, 6300.0, 6371.0],
            vec![tuple(&[8.0]), tuple(&[7.0]), tuple(&[9.0]), tuple(&[10.0])],
        )
        .unwrap();
        let mut coefficients = Vec::new();
        profile.radial_coefficients(6300.0, RadialInterpolation::CubicSpline, &mut coefficients);
        assert_eq!(coefficients.len(), 2);
        assert_eq!(coefficients[0], (2, 1.0));
        assert_relative_eq!(coefficients.iter().map(|&(_, w)| w).sum::<f64>(), 1.0);
        assert_relative_eq!(
            profile.interpolate(6335.5, RadialInterpolation::Linear, 0),
            9.5,
            epsilon = 1e-9
        );
    }

    #[test]
    fn data_free_variants_interpolate_to_nan() {
        let empty = Profile::empty(6300.0, 6300.0).unwrap();
        assert!(empty.interpolate(6300.0, RadialInterpolation::Linear, 0).is_nan());
        let mut coefficients = vec![(0, 1.0)];
        empty.radial_coefficients(6300.0, RadialInterpolation::Linear, &mut coefficients);
        assert!(coefficients.is_empty());
        assert!(
            Profile::surface_empty()
                .interpolate(0.0, RadialInterpolation::Linear, 0)
                .is_nan()
        );
    }

    #[test]
    fn exact_equality_tolerates_tiny_radius_noise() {
        let a = npoint_profile();
        let b = Profile::npoint(
            vec![6200.0, 6250.0, 6300.0, 6371.0],
            vec![tuple(&[8.0]), tuple(&[7.0]), tuple(&[6.5]), tuple(&[5.8])],
        )
        .unwrap();
        assert!(a.eq_exact(&b));
        let c = Profile::npoint(
            vec![6200.0, 6250.0, 6300.5, 6371.0],
            vec![tuple(&[8.0]), tuple(&[7.0]), tuple(&[6.5]), tuple(&[5.8])],
        )
        .unwrap();
        assert!(!a.eq_exact(&c));
        assert!(!a.eq_exact(&Profile::surface_empty()));
    }
}
