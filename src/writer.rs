use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::data::DataValues;
use crate::error::GeoTessError;
use crate::grid::Grid;
use crate::model::Model;
use crate::profile::Profile;
use crate::reader::{
    CLASS_NAME, EMBEDDED_GRID, GRID_FORMAT_VERSION, GRID_MAGIC, MODEL_FORMAT_VERSION, MODEL_MAGIC,
};

/// Typed big-endian encoding, the mirror of [`crate::reader::GeoTessRead`].
pub trait GeoTessWrite: Write {
    fn write_u8_value(&mut self, value: u8) -> Result<(), GeoTessError> {
        self.write_all(&[value])?;
        Ok(())
    }

    fn write_i16_value(&mut self, value: i16) -> Result<(), GeoTessError> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    fn write_i32_value(&mut self, value: i32) -> Result<(), GeoTessError> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    fn write_i64_value(&mut self, value: i64) -> Result<(), GeoTessError> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    fn write_f32_value(&mut self, value: f32) -> Result<(), GeoTessError> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    fn write_f64_value(&mut self, value: f64) -> Result<(), GeoTessError> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    fn write_utf(&mut self, value: &str) -> Result<(), GeoTessError> {
        let bytes = value.as_bytes();
        let len = u16::try_from(bytes.len()).map_err(|_| {
            GeoTessError::InvalidArgument(format!(
                "string of {} bytes does not fit the container",
                bytes.len()
            ))
        })?;
        self.write_all(&len.to_be_bytes())?;
        self.write_all(bytes)?;
        Ok(())
    }
}

impl<W: Write> GeoTessWrite for W {}

/// Writes the binary grid encoding.
pub fn write_grid<W: Write>(writer: &mut W, grid: &Grid) -> Result<(), GeoTessError> {
    writer.write_all(GRID_MAGIC)?;
    writer.write_i32_value(GRID_FORMAT_VERSION)?;
    let digest = u128::from_str_radix(grid.grid_id(), 16).map_err(|_| {
        GeoTessError::InvalidArgument(format!(
            "grid id {} is not a 128-bit hex digest",
            grid.grid_id()
        ))
    })?;
    writer.write_all(&digest.to_be_bytes())?;
    writer.write_utf("")?;

    writer.write_i32_value(grid.n_vertices() as i32)?;
    for v in grid.vertices() {
        for &component in v {
            writer.write_f64_value(component)?;
        }
    }

    writer.write_i32_value(grid.n_tessellations() as i32)?;
    for levels in grid.tessellations() {
        writer.write_i32_value(levels.len() as i32)?;
        for level in levels {
            writer.write_i32_value(level.first as i32)?;
            writer.write_i32_value(level.last as i32)?;
        }
    }

    writer.write_i32_value(grid.n_triangles() as i32)?;
    for t in grid.triangles() {
        for &corner in t {
            writer.write_i32_value(corner)?;
        }
    }
    Ok(())
}

/// Writes the binary model encoding with the grid embedded.
pub fn write_model<W: Write>(writer: &mut W, model: &Model) -> Result<(), GeoTessError> {
    write_model_header(writer, model)?;
    writer.write_utf(EMBEDDED_GRID)?;
    write_grid(writer, model.grid())?;
    write_profiles(writer, model)
}

/// Writes the binary model encoding referencing an external grid file;
/// the grid itself is written separately with [`write_grid`].
pub fn write_model_referenced<W: Write>(
    writer: &mut W,
    model: &Model,
    grid_file: &str,
) -> Result<(), GeoTessError> {
    write_model_header(writer, model)?;
    writer.write_utf(grid_file)?;
    writer.write_utf(model.grid().grid_id())?;
    writer.write_i32_value(model.n_vertices() as i32)?;
    write_profiles(writer, model)
}

fn write_model_header<W: Write>(writer: &mut W, model: &Model) -> Result<(), GeoTessError> {
    let metadata = model.metadata();
    writer.write_all(MODEL_MAGIC)?;
    writer.write_i32_value(MODEL_FORMAT_VERSION)?;
    writer.write_utf(CLASS_NAME)?;
    writer.write_utf(&metadata.description)?;
    writer.write_utf(&metadata.attribute_names().join("; "))?;
    writer.write_utf(&metadata.attribute_units().join("; "))?;
    writer.write_utf(&metadata.layer_names().join("; "))?;
    writer.write_utf(metadata.data_type().name())?;
    writer.write_utf(metadata.earth_shape.name())?;
    writer.write_utf(&metadata.model_software_version)?;
    writer.write_utf(&metadata.model_generation_date)?;
    for &tess in metadata.layer_tess_ids() {
        writer.write_i32_value(tess as i32)?;
    }
    Ok(())
}

fn write_profiles<W: Write>(writer: &mut W, model: &Model) -> Result<(), GeoTessError> {
    for layers in model.profiles() {
        for profile in layers {
            write_profile(writer, profile)?;
        }
    }
    Ok(())
}

fn write_profile<W: Write>(writer: &mut W, profile: &Profile) -> Result<(), GeoTessError> {
    writer.write_u8_value(profile.kind().into())?;
    match profile {
        Profile::Empty { radii } => {
            writer.write_f32_value(radii[0])?;
            writer.write_f32_value(radii[1])?;
        }
        Profile::Thin { radius, data } => {
            writer.write_f32_value(*radius)?;
            write_data(writer, data)?;
        }
        Profile::Constant { radii, data } => {
            writer.write_f32_value(radii[0])?;
            writer.write_f32_value(radii[1])?;
            write_data(writer, data)?;
        }
        Profile::Npoint { radii, data, .. } => {
            writer.write_i32_value(radii.len() as i32)?;
            for &r in radii {
                writer.write_f32_value(r)?;
            }
            for tuple in data {
                write_data(writer, tuple)?;
            }
        }
        Profile::Surface { data } => write_data(writer, data)?,
        Profile::SurfaceEmpty => {}
    }
    Ok(())
}

fn write_data<W: Write>(writer: &mut W, data: &DataValues) -> Result<(), GeoTessError> {
    match data {
        DataValues::Double(v) => {
            for &x in v {
                writer.write_f64_value(x)?;
            }
        }
        DataValues::Float(v) => {
            for &x in v {
                writer.write_f32_value(x)?;
            }
        }
        DataValues::Long(v) => {
            for &x in v {
                writer.write_i64_value(x)?;
            }
        }
        DataValues::Int(v) => {
            for &x in v {
                writer.write_i32_value(x)?;
            }
        }
        DataValues::Short(v) => {
            for &x in v {
                writer.write_i16_value(x)?;
            }
        }
        DataValues::Byte(v) => {
            for &x in v {
                writer.write_u8_value(x as u8)?;
            }
        }
    }
    Ok(())
}

/// Writes the ASCII grid encoding, mirroring the binary layout line by
/// line.
pub fn write_grid_ascii<W: Write>(writer: &mut W, grid: &Grid) -> Result<(), GeoTessError> {
    writeln!(writer, "GEOTESSGRID")?;
    writeln!(writer, "{GRID_FORMAT_VERSION}")?;
    writeln!(writer, "{}", grid.grid_id())?;
    writeln!(writer)?;

    writeln!(writer, "{}", grid.n_vertices())?;
    for v in grid.vertices() {
        writeln!(writer, "{} {} {}", v[0], v[1], v[2])?;
    }

    writeln!(writer, "{}", grid.n_tessellations())?;
    for levels in grid.tessellations() {
        writeln!(writer, "{}", levels.len())?;
        for level in levels {
            writeln!(writer, "{} {}", level.first, level.last)?;
        }
    }

    writeln!(writer, "{}", grid.n_triangles())?;
    for t in grid.triangles() {
        writeln!(writer, "{} {} {}", t[0], t[1], t[2])?;
    }
    Ok(())
}

/// Writes the ASCII model encoding with the grid embedded. Multi-line
/// descriptions are flattened, since the encoding is line-oriented.
pub fn write_model_ascii<W: Write>(writer: &mut W, model: &Model) -> Result<(), GeoTessError> {
    let metadata = model.metadata();
    writeln!(writer, "GEOTESSMODEL")?;
    writeln!(writer, "{MODEL_FORMAT_VERSION}")?;
    writeln!(writer, "{CLASS_NAME}")?;
    writeln!(writer, "{}", single_line(&metadata.description))?;
    writeln!(writer, "{}", metadata.attribute_names().join("; "))?;
    writeln!(writer, "{}", metadata.attribute_units().join("; "))?;
    writeln!(writer, "{}", metadata.layer_names().join("; "))?;
    writeln!(writer, "{}", metadata.data_type())?;
    writeln!(writer, "{}", metadata.earth_shape)?;
    writeln!(writer, "{}", single_line(&metadata.model_software_version))?;
    writeln!(writer, "{}", single_line(&metadata.model_generation_date))?;
    let tess_ids: Vec<String> = metadata
        .layer_tess_ids()
        .iter()
        .map(|t| t.to_string())
        .collect();
    writeln!(writer, "{}", tess_ids.join(" "))?;
    writeln!(writer, "{EMBEDDED_GRID}")?;
    write_grid_ascii(writer, model.grid())?;

    for layers in model.profiles() {
        for profile in layers {
            write_profile_ascii(writer, profile)?;
        }
    }
    Ok(())
}

fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

fn write_profile_ascii<W: Write>(writer: &mut W, profile: &Profile) -> Result<(), GeoTessError> {
    let tag: u8 = profile.kind().into();
    write!(writer, "{tag}")?;
    match profile {
        Profile::Empty { radii } => write!(writer, " {} {}", radii[0], radii[1])?,
        Profile::Thin { radius, data } => {
            write!(writer, " {radius}")?;
            write_data_ascii(writer, data)?;
        }
        Profile::Constant { radii, data } => {
            write!(writer, " {} {}", radii[0], radii[1])?;
            write_data_ascii(writer, data)?;
        }
        Profile::Npoint { radii, data, .. } => {
            write!(writer, " {}", radii.len())?;
            for r in radii {
                write!(writer, " {r}")?;
            }
            for tuple in data {
                write_data_ascii(writer, tuple)?;
            }
        }
        Profile::Surface { data } => write_data_ascii(writer, data)?,
        Profile::SurfaceEmpty => {}
    }
    writeln!(writer)?;
    Ok(())
}

fn write_data_ascii<W: Write>(writer: &mut W, data: &DataValues) -> Result<(), GeoTessError> {
    match data {
        DataValues::Double(v) => {
            for x in v {
                write!(writer, " {x}")?;
            }
        }
        DataValues::Float(v) => {
            for x in v {
                write!(writer, " {x}")?;
            }
        }
        DataValues::Long(v) => {
            for x in v {
                write!(writer, " {x}")?;
            }
        }
        DataValues::Int(v) => {
            for x in v {
                write!(writer, " {x}")?;
            }
        }
        DataValues::Short(v) => {
            for x in v {
                write!(writer, " {x}")?;
            }
        }
        DataValues::Byte(v) => {
            for x in v {
                write!(writer, " {x}")?;
            }
        }
    }
    Ok(())
}

/// Saves a model to a file: ASCII when the extension is `ascii`, binary
/// otherwise. The grid is embedded.
pub fn save_model<P: AsRef<Path>>(model: &Model, path: P) -> Result<(), GeoTessError> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    if is_ascii_path(path) {
        write_model_ascii(&mut writer, model)?;
    } else {
        write_model(&mut writer, model)?;
    }
    writer.flush()?;
    Ok(())
}

/// Saves a grid to a file: ASCII when the extension is `ascii`, binary
/// otherwise.
pub fn save_grid<P: AsRef<Path>>(grid: &Grid, path: P) -> Result<(), GeoTessError> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    if is_ascii_path(path) {
        write_grid_ascii(&mut writer, grid)?;
    } else {
        write_grid(&mut writer, grid)?;
    }
    writer.flush()?;
    Ok(())
}

fn is_ascii_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ascii"))
}
