//! Storage of and interpolation over 3D Earth models defined on
//! multi-level triangular tessellations of the unit sphere.
//!
//! A [`Grid`] triangulates the sphere at one or more resolutions; a
//! [`Model`] attaches a radial stack of attribute data (a [`Profile`])
//! to every vertex in every layer; a [`Position`] walks the grid to a
//! query point and interpolates values there, horizontally with
//! barycentric or natural-neighbor weights and radially with linear or
//! cubic-spline weights.
//!
//! ```no_run
//! use geotess::{load_model, HorizontalInterpolation, Position, RadialInterpolation};
//!
//! # fn main() -> Result<(), geotess::GeoTessError> {
//! let model = load_model("crust20.geotess")?;
//! let mut position = Position::new(
//!     &model,
//!     HorizontalInterpolation::Linear,
//!     RadialInterpolation::Linear,
//! );
//! position.set(30.0, 90.0, 60.0)?;
//! let slowness = position.value(0)?;
//! # let _ = slowness;
//! # Ok(())
//! # }
//! ```

mod data;
mod earth;
mod error;
pub mod geomath;
mod grid;
mod model;
mod pointmap;
mod polygon;
mod position;
mod profile;
mod reader;
mod spline;
mod writer;

pub use crate::{
    data::{DataType, DataValues},
    earth::{EarthShape, SPHERE_RADIUS_KM},
    error::{GeoTessError, ParseError},
    grid::{Grid, Level},
    model::{ActiveRegion, Model, ModelMetadata},
    pointmap::PointMap,
    polygon::{Horizon, Polygon},
    position::{HorizontalInterpolation, Position},
    profile::{Profile, ProfileKind, RadialInterpolation},
    reader::{load_grid, load_model, read_grid, read_grid_ascii, read_model, read_model_ascii, GeoTessRead},
    writer::{
        save_grid, save_model, write_grid, write_grid_ascii, write_model, write_model_ascii,
        write_model_referenced, GeoTessWrite,
    },
};
