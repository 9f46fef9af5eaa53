use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::ParseError;
use crate::geomath::Vector3;

/// Radius of the spherical Earth approximation in km.
pub const SPHERE_RADIUS_KM: f64 = 6371.0;

/// The reference figure of the Earth used to convert between geographic
/// latitude, geocentric latitude, unit vector and radius.
///
/// The `*Rconst` variants keep the ellipsoidal latitude conversions but
/// report a constant radius of 6371 km everywhere, which is how layered
/// models defined relative to a spherical Earth are queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EarthShape {
    Sphere,
    Grs80,
    Grs80Rconst,
    #[default]
    Wgs84,
    Wgs84Rconst,
    Iers2003,
    Iers2003Rconst,
}

impl EarthShape {
    /// Equatorial radius in km.
    pub fn equatorial_radius(&self) -> f64 {
        match self {
            Self::Sphere => SPHERE_RADIUS_KM,
            Self::Grs80 | Self::Grs80Rconst => 6378.137,
            Self::Wgs84 | Self::Wgs84Rconst => 6378.137,
            Self::Iers2003 | Self::Iers2003Rconst => 6378.1366,
        }
    }

    /// Inverse flattening 1/f, infinite for the sphere.
    fn inverse_flattening(&self) -> f64 {
        match self {
            Self::Sphere => f64::INFINITY,
            Self::Grs80 | Self::Grs80Rconst => 298.257222101,
            Self::Wgs84 | Self::Wgs84Rconst => 298.257223563,
            Self::Iers2003 | Self::Iers2003Rconst => 298.25642,
        }
    }

    /// First eccentricity squared, e² = f(2 − f).
    pub fn eccentricity_sqr(&self) -> f64 {
        let f = 1.0 / self.inverse_flattening();
        f * (2.0 - f)
    }

    fn constant_radius(&self) -> bool {
        matches!(
            self,
            Self::Sphere | Self::Grs80Rconst | Self::Wgs84Rconst | Self::Iers2003Rconst
        )
    }

    /// Unit vector of a geographic latitude and longitude, both in radians.
    pub fn vector(&self, lat: f64, lon: f64) -> Vector3 {
        let gc = self.geocentric_lat(lat);
        let (sin_lat, cos_lat) = gc.sin_cos();
        let (sin_lon, cos_lon) = lon.sin_cos();
        [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat]
    }

    /// Unit vector of a geographic latitude and longitude, both in degrees.
    pub fn vector_degrees(&self, lat: f64, lon: f64) -> Vector3 {
        self.vector(lat.to_radians(), lon.to_radians())
    }

    /// Geographic latitude of a unit vector, in radians.
    pub fn lat(&self, v: &Vector3) -> f64 {
        let cos_gc = v[0].hypot(v[1]);
        v[2].atan2((1.0 - self.eccentricity_sqr()) * cos_gc)
    }

    /// Longitude of a unit vector, in radians. The poles report 0.
    pub fn lon(&self, v: &Vector3) -> f64 {
        if v[0] == 0.0 && v[1] == 0.0 {
            return 0.0;
        }
        v[1].atan2(v[0])
    }

    pub fn lat_degrees(&self, v: &Vector3) -> f64 {
        self.lat(v).to_degrees()
    }

    pub fn lon_degrees(&self, v: &Vector3) -> f64 {
        self.lon(v).to_degrees()
    }

    /// Distance in km from the Earth's center to the surface of the
    /// reference figure in the direction of the unit vector `v`.
    pub fn earth_radius(&self, v: &Vector3) -> f64 {
        if self.constant_radius() {
            return SPHERE_RADIUS_KM;
        }
        // r(φ) = a / sqrt(1 + ((a/b)² − 1) sin²φ) at geocentric latitude φ,
        // with sin φ = v[2] and (b/a)² = 1 − e².
        let e2 = self.eccentricity_sqr();
        let axis_ratio_sqr = 1.0 / (1.0 - e2);
        self.equatorial_radius() / (1.0 + (axis_ratio_sqr - 1.0) * v[2] * v[2]).sqrt()
    }

    /// Geocentric latitude of a geographic latitude, both in radians:
    /// tan φ_c = (1 − e²) tan φ_g.
    pub fn geocentric_lat(&self, geographic_lat: f64) -> f64 {
        ((1.0 - self.eccentricity_sqr()) * geographic_lat.tan()).atan()
    }

    /// Geographic latitude of a geocentric latitude, both in radians.
    pub fn geographic_lat(&self, geocentric_lat: f64) -> f64 {
        (geocentric_lat.tan() / (1.0 - self.eccentricity_sqr())).atan()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sphere => "SPHERE",
            Self::Grs80 => "GRS80",
            Self::Grs80Rconst => "GRS80_RCONST",
            Self::Wgs84 => "WGS84",
            Self::Wgs84Rconst => "WGS84_RCONST",
            Self::Iers2003 => "IERS2003",
            Self::Iers2003Rconst => "IERS2003_RCONST",
        }
    }
}

impl Display for EarthShape {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EarthShape {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SPHERE" => Ok(Self::Sphere),
            "GRS80" => Ok(Self::Grs80),
            "GRS80_RCONST" => Ok(Self::Grs80Rconst),
            "WGS84" => Ok(Self::Wgs84),
            "WGS84_RCONST" => Ok(Self::Wgs84Rconst),
            "IERS2003" => Ok(Self::Iers2003),
            "IERS2003_RCONST" => Ok(Self::Iers2003Rconst),
            _ => Err(ParseError::UnknownEarthShape(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::geomath;

    #[test]
    fn vector_round_trip_wgs84() {
        let shape = EarthShape::Wgs84;
        let v = shape.vector_degrees(30.0, 90.0);
        assert!(geomath::is_unit_vector(&v));
        assert_relative_eq!(shape.lat_degrees(&v), 30.0, epsilon = 1e-10);
        assert_relative_eq!(shape.lon_degrees(&v), 90.0, epsilon = 1e-10);
    }

    #[test]
    fn poles_report_longitude_zero() {
        let shape = EarthShape::Wgs84;
        assert_eq!(shape.lon(&[0.0, 0.0, 1.0]), 0.0);
        assert_eq!(shape.lon(&[0.0, 0.0, -1.0]), 0.0);
        assert_relative_eq!(shape.lat_degrees(&[0.0, 0.0, 1.0]), 90.0);
    }

    #[test]
    fn geocentric_geographic_round_trip() {
        let shape = EarthShape::Wgs84;
        for deg in [-89, -60, -30, 0, 30, 45, 60, 89] {
            let geographic = f64::from(deg).to_radians();
            let geocentric = shape.geocentric_lat(geographic);
            assert_relative_eq!(shape.geographic_lat(geocentric), geographic, epsilon = 1e-12);
            // Geocentric latitude is pulled toward the equator.
            assert!(geocentric.abs() <= geographic.abs() + 1e-15);
        }
    }

    #[test]
    fn sphere_is_round() {
        let shape = EarthShape::Sphere;
        assert_eq!(shape.eccentricity_sqr(), 0.0);
        let v = shape.vector_degrees(45.0, 10.0);
        assert_eq!(shape.earth_radius(&v), SPHERE_RADIUS_KM);
        assert_relative_eq!(shape.geocentric_lat(0.5), 0.5);
    }

    macro_rules! test_earth_radius {
        ($(($name:ident, $shape:expr, $lat:expr, $expected:expr),)*) => ($(
            #[test]
            fn $name() {
                let shape = $shape;
                let v = shape.vector_degrees($lat, 0.0);
                assert_relative_eq!(shape.earth_radius(&v), $expected, epsilon = 1e-2);
            }
        )*);
    }

    test_earth_radius! {
        (earth_radius_wgs84_equator, EarthShape::Wgs84, 0.0, 6378.137),
        (earth_radius_wgs84_pole, EarthShape::Wgs84, 90.0, 6356.752),
        (earth_radius_grs80_pole, EarthShape::Grs80, 90.0, 6356.752),
        (earth_radius_rconst_anywhere, EarthShape::Wgs84Rconst, 37.5, 6371.0),
    }

    #[test]
    fn earth_radius_positive_everywhere() {
        let shape = EarthShape::Iers2003;
        for lat in (-90..=90).step_by(15) {
            for lon in (-180..=180).step_by(45) {
                let v = shape.vector_degrees(f64::from(lat), f64::from(lon));
                assert!(shape.earth_radius(&v) > 0.0);
            }
        }
    }

    #[test]
    fn shape_name_round_trip() {
        for shape in [
            EarthShape::Sphere,
            EarthShape::Grs80,
            EarthShape::Grs80Rconst,
            EarthShape::Wgs84,
            EarthShape::Wgs84Rconst,
            EarthShape::Iers2003,
            EarthShape::Iers2003Rconst,
        ] {
            assert_eq!(shape.name().parse::<EarthShape>(), Ok(shape));
        }
        assert_eq!(
            "MARS".parse::<EarthShape>(),
            Err(ParseError::UnknownEarthShape("MARS".to_owned()))
        );
    }
}
