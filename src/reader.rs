use std::fs;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::data::{DataType, DataValues};
use crate::earth::EarthShape;
use crate::error::{GeoTessError, ParseError};
use crate::grid::{Grid, Level};
use crate::model::{Model, ModelMetadata};
use crate::profile::{Profile, ProfileKind};

pub(crate) const MODEL_MAGIC: &[u8] = b"GEOTESSMODEL";
pub(crate) const GRID_MAGIC: &[u8] = b"GEOTESSGRID";
pub(crate) const MODEL_FORMAT_VERSION: i32 = 3;
pub(crate) const GRID_FORMAT_VERSION: i32 = 2;
pub(crate) const CLASS_NAME: &str = "GeoTessModel";
/// Grid file name marking an embedded grid payload.
pub(crate) const EMBEDDED_GRID: &str = "*";

/// Typed big-endian decoding over any byte stream, with length-prefixed
/// UTF-8 strings. Every primitive the container stores goes through
/// these.
pub trait GeoTessRead: Read {
    fn read_u8_value(&mut self) -> Result<u8, ParseError> {
        let mut buf = [0; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_i32_value(&mut self) -> Result<i32, ParseError> {
        let mut buf = [0; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }

    fn read_i64_value(&mut self) -> Result<i64, ParseError> {
        let mut buf = [0; 8];
        self.read_exact(&mut buf)?;
        Ok(i64::from_be_bytes(buf))
    }

    fn read_i16_value(&mut self) -> Result<i16, ParseError> {
        let mut buf = [0; 2];
        self.read_exact(&mut buf)?;
        Ok(i16::from_be_bytes(buf))
    }

    fn read_f32_value(&mut self) -> Result<f32, ParseError> {
        let mut buf = [0; 4];
        self.read_exact(&mut buf)?;
        Ok(f32::from_be_bytes(buf))
    }

    fn read_f64_value(&mut self) -> Result<f64, ParseError> {
        let mut buf = [0; 8];
        self.read_exact(&mut buf)?;
        Ok(f64::from_be_bytes(buf))
    }

    fn read_utf(&mut self) -> Result<String, ParseError> {
        let mut len = [0; 2];
        self.read_exact(&mut len)?;
        let len = usize::from(u16::from_be_bytes(len));
        let mut buf = vec![0; len];
        self.read_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|e| ParseError::BadUtf8(e.utf8_error().valid_up_to()))
    }
}

impl<R: Read> GeoTessRead for R {}

/// Reads a binary grid.
pub fn read_grid<R: Read>(reader: &mut R) -> Result<Arc<Grid>, GeoTessError> {
    let mut magic = [0; GRID_MAGIC.len()];
    reader
        .read_exact(&mut magic)
        .map_err(|e| ParseError::ReadError(e.to_string()))?;
    if magic != GRID_MAGIC {
        return Err(ParseError::NotGeoTessGrid.into());
    }
    let version = reader.read_i32_value()?;
    if version != GRID_FORMAT_VERSION {
        return Err(ParseError::GridVersionMismatch(version).into());
    }
    // The content digest travels as its 16 raw bytes here; everywhere
    // else the id is its 32-char hex text.
    let mut digest = [0; 16];
    reader
        .read_exact(&mut digest)
        .map_err(|e| ParseError::ReadError(e.to_string()))?;
    let grid_id = format!("{:032x}", u128::from_be_bytes(digest));
    let _description = reader.read_utf()?;

    let n_vertices = read_count(reader)?;
    let mut vertices = Vec::with_capacity(n_vertices);
    for _ in 0..n_vertices {
        vertices.push([
            reader.read_f64_value()?,
            reader.read_f64_value()?,
            reader.read_f64_value()?,
        ]);
    }

    let n_tessellations = read_count(reader)?;
    let mut tessellations = Vec::with_capacity(n_tessellations);
    for _ in 0..n_tessellations {
        let n_levels = read_count(reader)?;
        let mut levels = Vec::with_capacity(n_levels);
        for _ in 0..n_levels {
            let first = read_count(reader)?;
            let last = read_count(reader)?;
            levels.push(Level { first, last });
        }
        tessellations.push(levels);
    }

    let n_triangles = read_count(reader)?;
    let mut triangles = Vec::with_capacity(n_triangles);
    for _ in 0..n_triangles {
        triangles.push([
            reader.read_i32_value()?,
            reader.read_i32_value()?,
            reader.read_i32_value()?,
        ]);
    }

    finish_grid(vertices, triangles, tessellations, &grid_id)
}

/// Reads a binary model with an embedded grid. Models referencing an
/// external grid file need the path context of [`load_model`].
pub fn read_model<R: Read>(reader: &mut R) -> Result<Model, GeoTessError> {
    match read_model_internal(reader)? {
        ModelPayload::Complete(model) => Ok(model),
        ModelPayload::NeedsGrid { grid_file, .. } => Err(GeoTessError::StateError(format!(
            "model references external grid file {grid_file}; load it through a path"
        ))),
    }
}

/// Loads a model from a file, binary or ASCII, resolving a referenced
/// grid file relative to the model's directory and verifying that its
/// grid id matches the one recorded in the model.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Model, GeoTessError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| ParseError::ReadError(e.to_string()))?;
    let payload = if is_ascii(&bytes, MODEL_MAGIC.len()) {
        let text = std::str::from_utf8(&bytes).map_err(|e| ParseError::BadUtf8(e.valid_up_to()))?;
        read_model_ascii_internal(text)?
    } else {
        read_model_internal(&mut bytes.as_slice())?
    };
    match payload {
        ModelPayload::Complete(model) => Ok(model),
        ModelPayload::NeedsGrid {
            metadata,
            profiles,
            grid_file,
            grid_id,
        } => {
            let grid_path = match path.parent() {
                Some(dir) => dir.join(&grid_file),
                None => Path::new(&grid_file).to_path_buf(),
            };
            let grid = load_grid(&grid_path)?;
            if grid.grid_id() != grid_id {
                return Err(GeoTessError::FormatMismatch(format!(
                    "model expects grid {grid_id} but {} contains grid {}",
                    grid_path.display(),
                    grid.grid_id()
                )));
            }
            assemble_model(grid, metadata, profiles)
        }
    }
}

/// Loads a grid from a file, binary or ASCII.
pub fn load_grid<P: AsRef<Path>>(path: P) -> Result<Arc<Grid>, GeoTessError> {
    let bytes = fs::read(path.as_ref()).map_err(|e| ParseError::ReadError(e.to_string()))?;
    if is_ascii(&bytes, GRID_MAGIC.len()) {
        let text = std::str::from_utf8(&bytes).map_err(|e| ParseError::BadUtf8(e.valid_up_to()))?;
        read_grid_ascii(text)
    } else {
        read_grid(&mut bytes.as_slice())
    }
}

/// Both encodings open with the same magic; in the ASCII form it is
/// followed by a line break instead of binary payload.
fn is_ascii(bytes: &[u8], magic_len: usize) -> bool {
    matches!(bytes.get(magic_len), Some(b'\n') | Some(b'\r'))
}

enum ModelPayload {
    Complete(Model),
    NeedsGrid {
        metadata: ModelMetadata,
        profiles: Vec<Vec<Profile>>,
        grid_file: String,
        grid_id: String,
    },
}

fn read_model_internal<R: Read>(reader: &mut R) -> Result<ModelPayload, GeoTessError> {
    let mut magic = [0; MODEL_MAGIC.len()];
    reader
        .read_exact(&mut magic)
        .map_err(|e| ParseError::ReadError(e.to_string()))?;
    if magic != MODEL_MAGIC {
        return Err(ParseError::NotGeoTessModel.into());
    }
    let version = reader.read_i32_value()?;
    if version != MODEL_FORMAT_VERSION {
        return Err(ParseError::ModelVersionMismatch(version).into());
    }
    let class = reader.read_utf()?;
    if class != CLASS_NAME {
        return Err(ParseError::UnsupportedClass(class).into());
    }

    let description = reader.read_utf()?;
    let attribute_names = split_list(&reader.read_utf()?);
    let attribute_units = split_list(&reader.read_utf()?);
    let layer_names = split_list(&reader.read_utf()?);
    let data_type = DataType::from_str(&reader.read_utf()?)?;
    let earth_shape = EarthShape::from_str(&reader.read_utf()?)?;
    let software_version = reader.read_utf()?;
    let generation_date = reader.read_utf()?;
    let mut layer_tess_ids = Vec::with_capacity(layer_names.len());
    for _ in 0..layer_names.len() {
        layer_tess_ids.push(read_count(reader)?);
    }

    let mut metadata = ModelMetadata::new(
        description,
        layer_names,
        layer_tess_ids,
        attribute_names,
        attribute_units,
        data_type,
        earth_shape,
    )?;
    metadata.model_software_version = software_version;
    metadata.model_generation_date = generation_date;

    let grid_file = reader.read_utf()?;
    if grid_file == EMBEDDED_GRID {
        let grid = read_grid(reader)?;
        let profiles = read_profiles(reader, &metadata, grid.n_vertices())?;
        Ok(ModelPayload::Complete(assemble_model(
            grid, metadata, profiles,
        )?))
    } else {
        let grid_id = reader.read_utf()?;
        let n_vertices = read_count(reader)?;
        let profiles = read_profiles(reader, &metadata, n_vertices)?;
        Ok(ModelPayload::NeedsGrid {
            metadata,
            profiles,
            grid_file,
            grid_id,
        })
    }
}

fn read_profiles<R: Read>(
    reader: &mut R,
    metadata: &ModelMetadata,
    n_vertices: usize,
) -> Result<Vec<Vec<Profile>>, GeoTessError> {
    let mut profiles = Vec::with_capacity(n_vertices);
    for vertex in 0..n_vertices {
        let mut layers = Vec::with_capacity(metadata.n_layers());
        for layer in 0..metadata.n_layers() {
            let profile = read_profile(reader, metadata).map_err(|e| match e {
                GeoTessError::InvalidArgument(_) => {
                    ParseError::NonMonotoneRadii(vertex, layer).into()
                }
                other => other,
            })?;
            layers.push(profile);
        }
        profiles.push(layers);
    }
    Ok(profiles)
}

fn read_profile<R: Read>(
    reader: &mut R,
    metadata: &ModelMetadata,
) -> Result<Profile, GeoTessError> {
    let tag = reader.read_u8_value()?;
    let kind =
        ProfileKind::try_from(tag).map_err(|_| ParseError::UnknownProfileKind(tag))?;
    match kind {
        ProfileKind::Empty => {
            let bottom = reader.read_f32_value()?;
            let top = reader.read_f32_value()?;
            Profile::empty(bottom, top)
        }
        ProfileKind::Thin => {
            let radius = reader.read_f32_value()?;
            let data = read_data(reader, metadata)?;
            Profile::thin(radius, data)
        }
        ProfileKind::Constant => {
            let bottom = reader.read_f32_value()?;
            let top = reader.read_f32_value()?;
            let data = read_data(reader, metadata)?;
            Profile::constant(bottom, top, data)
        }
        ProfileKind::Npoint => {
            let n = read_count(reader)?;
            let mut radii = Vec::with_capacity(n);
            for _ in 0..n {
                radii.push(reader.read_f32_value()?);
            }
            let mut data = Vec::with_capacity(n);
            for _ in 0..n {
                data.push(read_data(reader, metadata)?);
            }
            Profile::npoint(radii, data)
        }
        ProfileKind::Surface => Ok(Profile::surface(read_data(reader, metadata)?)),
        ProfileKind::SurfaceEmpty => Ok(Profile::surface_empty()),
    }
}

fn read_data<R: Read>(
    reader: &mut R,
    metadata: &ModelMetadata,
) -> Result<DataValues, GeoTessError> {
    let n = metadata.n_attributes();
    let values = match metadata.data_type() {
        DataType::Double => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push(reader.read_f64_value()?);
            }
            DataValues::Double(v)
        }
        DataType::Float => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push(reader.read_f32_value()?);
            }
            DataValues::Float(v)
        }
        DataType::Long => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push(reader.read_i64_value()?);
            }
            DataValues::Long(v)
        }
        DataType::Int => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push(reader.read_i32_value()?);
            }
            DataValues::Int(v)
        }
        DataType::Short => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push(reader.read_i16_value()?);
            }
            DataValues::Short(v)
        }
        DataType::Byte => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push(reader.read_u8_value()? as i8);
            }
            DataValues::Byte(v)
        }
    };
    Ok(values)
}

fn assemble_model(
    grid: Arc<Grid>,
    mut metadata: ModelMetadata,
    profiles: Vec<Vec<Profile>>,
) -> Result<Model, GeoTessError> {
    metadata.repair_historical_layer_order();
    let mut model = Model::new(grid, metadata)?;
    for (vertex, layers) in profiles.into_iter().enumerate() {
        for (layer, profile) in layers.into_iter().enumerate() {
            model.set_profile(vertex, layer, profile)?;
        }
    }
    model.validate()?;
    Ok(model)
}

fn finish_grid(
    vertices: Vec<[f64; 3]>,
    triangles: Vec<[i32; 3]>,
    tessellations: Vec<Vec<Level>>,
    expected_id: &str,
) -> Result<Arc<Grid>, GeoTessError> {
    let grid = Grid::new(vertices, triangles, tessellations)?;
    if grid.grid_id() != expected_id {
        return Err(GeoTessError::FormatMismatch(format!(
            "grid content digest {} does not match recorded id {expected_id}",
            grid.grid_id()
        )));
    }
    Ok(Arc::new(grid))
}

fn read_count<R: Read>(reader: &mut R) -> Result<usize, ParseError> {
    let n = reader.read_i32_value()?;
    usize::try_from(n).map_err(|_| ParseError::ReadError(format!("negative count {n}")))
}

fn split_list(joined: &str) -> Vec<String> {
    joined.split(';').map(|s| s.trim().to_owned()).collect()
}

/// Line-oriented cursor over an ASCII encoding.
struct AsciiLines<'t> {
    lines: std::str::Lines<'t>,
    consumed: usize,
}

impl<'t> AsciiLines<'t> {
    fn new(text: &'t str) -> Self {
        Self {
            lines: text.lines(),
            consumed: 0,
        }
    }

    fn next_line(&mut self) -> Result<&'t str, ParseError> {
        self.consumed += 1;
        self.lines
            .next()
            .ok_or_else(|| ParseError::ReadError(format!("file ends at line {}", self.consumed)))
    }

    fn parse<T: FromStr>(&mut self) -> Result<T, ParseError> {
        let line = self.next_line()?;
        parse_token(line.trim())
    }
}

fn parse_token<T: FromStr>(token: &str) -> Result<T, ParseError> {
    token
        .parse()
        .map_err(|_| ParseError::BadAsciiLine(token.to_owned()))
}

/// Reads the ASCII grid encoding, which mirrors the binary layout line
/// by line.
pub fn read_grid_ascii(text: &str) -> Result<Arc<Grid>, GeoTessError> {
    let mut lines = AsciiLines::new(text);
    read_grid_ascii_lines(&mut lines)
}

fn read_grid_ascii_lines(lines: &mut AsciiLines) -> Result<Arc<Grid>, GeoTessError> {
    if lines.next_line()?.trim() != "GEOTESSGRID" {
        return Err(ParseError::NotGeoTessGrid.into());
    }
    let version: i32 = lines.parse()?;
    if version != GRID_FORMAT_VERSION {
        return Err(ParseError::GridVersionMismatch(version).into());
    }
    let grid_id = lines.next_line()?.trim().to_owned();
    let _description = lines.next_line()?;

    let n_vertices: usize = lines.parse()?;
    let mut vertices = Vec::with_capacity(n_vertices);
    for _ in 0..n_vertices {
        let line = lines.next_line()?;
        let mut parts = line.split_whitespace();
        let mut v = [0.0; 3];
        for component in &mut v {
            *component = parse_token(parts.next().ok_or_else(|| {
                ParseError::BadAsciiLine(line.to_owned())
            })?)?;
        }
        vertices.push(v);
    }

    let n_tessellations: usize = lines.parse()?;
    let mut tessellations = Vec::with_capacity(n_tessellations);
    for _ in 0..n_tessellations {
        let n_levels: usize = lines.parse()?;
        let mut levels = Vec::with_capacity(n_levels);
        for _ in 0..n_levels {
            let line = lines.next_line()?;
            let mut parts = line.split_whitespace();
            let first = parse_token(
                parts
                    .next()
                    .ok_or_else(|| ParseError::BadAsciiLine(line.to_owned()))?,
            )?;
            let last = parse_token(
                parts
                    .next()
                    .ok_or_else(|| ParseError::BadAsciiLine(line.to_owned()))?,
            )?;
            levels.push(Level { first, last });
        }
        tessellations.push(levels);
    }

    let n_triangles: usize = lines.parse()?;
    let mut triangles = Vec::with_capacity(n_triangles);
    for _ in 0..n_triangles {
        let line = lines.next_line()?;
        let mut parts = line.split_whitespace();
        let mut t = [0; 3];
        for corner in &mut t {
            *corner = parse_token(parts.next().ok_or_else(|| {
                ParseError::BadAsciiLine(line.to_owned())
            })?)?;
        }
        triangles.push(t);
    }

    finish_grid(vertices, triangles, tessellations, &grid_id)
}

/// Reads the ASCII model encoding.
pub fn read_model_ascii(text: &str) -> Result<Model, GeoTessError> {
    match read_model_ascii_internal(text)? {
        ModelPayload::Complete(model) => Ok(model),
        ModelPayload::NeedsGrid { grid_file, .. } => Err(GeoTessError::StateError(format!(
            "model references external grid file {grid_file}; load it through a path"
        ))),
    }
}

fn read_model_ascii_internal(text: &str) -> Result<ModelPayload, GeoTessError> {
    let mut lines = AsciiLines::new(text);
    if lines.next_line()?.trim() != "GEOTESSMODEL" {
        return Err(ParseError::NotGeoTessModel.into());
    }
    let version: i32 = lines.parse()?;
    if version != MODEL_FORMAT_VERSION {
        return Err(ParseError::ModelVersionMismatch(version).into());
    }
    let class = lines.next_line()?.trim().to_owned();
    if class != CLASS_NAME {
        return Err(ParseError::UnsupportedClass(class).into());
    }

    let description = lines.next_line()?.to_owned();
    let attribute_names = split_list(lines.next_line()?);
    let attribute_units = split_list(lines.next_line()?);
    let layer_names = split_list(lines.next_line()?);
    let data_type: DataType = lines.parse()?;
    let earth_shape: EarthShape = lines.parse()?;
    let software_version = lines.next_line()?.to_owned();
    let generation_date = lines.next_line()?.to_owned();

    let tess_line = lines.next_line()?;
    let mut layer_tess_ids = Vec::with_capacity(layer_names.len());
    let mut parts = tess_line.split_whitespace();
    for _ in 0..layer_names.len() {
        layer_tess_ids.push(parse_token(parts.next().ok_or_else(|| {
            ParseError::BadAsciiLine(tess_line.to_owned())
        })?)?);
    }

    let mut metadata = ModelMetadata::new(
        description,
        layer_names,
        layer_tess_ids,
        attribute_names,
        attribute_units,
        data_type,
        earth_shape,
    )?;
    metadata.model_software_version = software_version;
    metadata.model_generation_date = generation_date;

    let grid_file = lines.next_line()?.trim().to_owned();
    if grid_file == EMBEDDED_GRID {
        let grid = read_grid_ascii_lines(&mut lines)?;
        let profiles = read_profiles_ascii(&mut lines, &metadata, grid.n_vertices())?;
        Ok(ModelPayload::Complete(assemble_model(
            grid, metadata, profiles,
        )?))
    } else {
        let grid_id = lines.next_line()?.trim().to_owned();
        let n_vertices: usize = lines.parse()?;
        let profiles = read_profiles_ascii(&mut lines, &metadata, n_vertices)?;
        Ok(ModelPayload::NeedsGrid {
            metadata,
            profiles,
            grid_file,
            grid_id,
        })
    }
}

fn read_profiles_ascii(
    lines: &mut AsciiLines,
    metadata: &ModelMetadata,
    n_vertices: usize,
) -> Result<Vec<Vec<Profile>>, GeoTessError> {
    let mut profiles = Vec::with_capacity(n_vertices);
    for _ in 0..n_vertices {
        let mut layers = Vec::with_capacity(metadata.n_layers());
        for _ in 0..metadata.n_layers() {
            layers.push(read_profile_ascii(lines, metadata)?);
        }
        profiles.push(layers);
    }
    Ok(profiles)
}

fn read_profile_ascii(
    lines: &mut AsciiLines,
    metadata: &ModelMetadata,
) -> Result<Profile, GeoTessError> {
    let line = lines.next_line()?;
    let mut parts = line.split_whitespace();
    let mut next = |line: &str| -> Result<String, ParseError> {
        parts
            .next()
            .map(str::to_owned)
            .ok_or_else(|| ParseError::BadAsciiLine(line.to_owned()))
    };
    let tag: u8 = parse_token(&next(line)?)?;
    let kind =
        ProfileKind::try_from(tag).map_err(|_| ParseError::UnknownProfileKind(tag))?;
    match kind {
        ProfileKind::Empty => {
            let bottom: f32 = parse_token(&next(line)?)?;
            let top: f32 = parse_token(&next(line)?)?;
            Profile::empty(bottom, top)
        }
        ProfileKind::Thin => {
            let radius: f32 = parse_token(&next(line)?)?;
            let data = read_data_ascii(&mut next, line, metadata)?;
            Profile::thin(radius, data)
        }
        ProfileKind::Constant => {
            let bottom: f32 = parse_token(&next(line)?)?;
            let top: f32 = parse_token(&next(line)?)?;
            let data = read_data_ascii(&mut next, line, metadata)?;
            Profile::constant(bottom, top, data)
        }
        ProfileKind::Npoint => {
            let n: usize = parse_token(&next(line)?)?;
            let mut radii = Vec::with_capacity(n);
            for _ in 0..n {
                radii.push(parse_token(&next(line)?)?);
            }
            let mut data = Vec::with_capacity(n);
            for _ in 0..n {
                data.push(read_data_ascii(&mut next, line, metadata)?);
            }
            Profile::npoint(radii, data)
        }
        ProfileKind::Surface => {
            let data = read_data_ascii(&mut next, line, metadata)?;
            Ok(Profile::surface(data))
        }
        ProfileKind::SurfaceEmpty => Ok(Profile::surface_empty()),
    }
}

fn read_data_ascii(
    next: &mut dyn FnMut(&str) -> Result<String, ParseError>,
    line: &str,
    metadata: &ModelMetadata,
) -> Result<DataValues, GeoTessError> {
    let n = metadata.n_attributes();
    let values = match metadata.data_type() {
        DataType::Double => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push(parse_token(&next(line)?)?);
            }
            DataValues::Double(v)
        }
        DataType::Float => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push(parse_token(&next(line)?)?);
            }
            DataValues::Float(v)
        }
        DataType::Long => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push(parse_token(&next(line)?)?);
            }
            DataValues::Long(v)
        }
        DataType::Int => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push(parse_token(&next(line)?)?);
            }
            DataValues::Int(v)
        }
        DataType::Short => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push(parse_token(&next(line)?)?);
            }
            DataValues::Short(v)
        }
        DataType::Byte => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push(parse_token(&next(line)?)?);
            }
            DataValues::Byte(v)
        }
    };
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_magic_is_rejected() {
        let mut bytes: &[u8] = b"GEOTESSMAGIC0000";
        assert!(matches!(
            read_model(&mut bytes),
            Err(GeoTessError::ParseError(ParseError::NotGeoTessModel))
        ));
        let mut bytes: &[u8] = b"NOTAGRIDFIL";
        assert!(matches!(
            read_grid(&mut bytes),
            Err(GeoTessError::ParseError(ParseError::NotGeoTessGrid))
        ));
    }

    #[test]
    fn truncated_input_is_a_read_error() {
        let mut bytes: &[u8] = b"GEOTESSMODEL";
        assert!(matches!(
            read_model(&mut bytes),
            Err(GeoTessError::ParseError(ParseError::ReadError(_)))
        ));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MODEL_MAGIC);
        bytes.extend_from_slice(&7i32.to_be_bytes());
        assert!(matches!(
            read_model(&mut bytes.as_slice()),
            Err(GeoTessError::ParseError(ParseError::ModelVersionMismatch(7)))
        ));
    }

    #[test]
    fn unsupported_class_is_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MODEL_MAGIC);
        bytes.extend_from_slice(&MODEL_FORMAT_VERSION.to_be_bytes());
        let class = b"LibCorr3DModel";
        bytes.extend_from_slice(&(class.len() as u16).to_be_bytes());
        bytes.extend_from_slice(class);
        assert!(matches!(
            read_model(&mut bytes.as_slice()),
            Err(GeoTessError::ParseError(ParseError::UnsupportedClass(_)))
        ));
    }

    #[test]
    fn ascii_detection() {
        assert!(is_ascii(b"GEOTESSGRID\n2\n", GRID_MAGIC.len()));
        assert!(is_ascii(b"GEOTESSGRID\r\n2\r\n", GRID_MAGIC.len()));
        let mut binary = Vec::new();
        binary.extend_from_slice(GRID_MAGIC);
        binary.extend_from_slice(&2i32.to_be_bytes());
        assert!(!is_ascii(&binary, GRID_MAGIC.len()));
    }

    #[test]
    fn split_list_trims_entries() {
        assert_eq!(split_list("a; b;c"), vec!["a", "b", "c"]);
        assert_eq!(split_list("single"), vec!["single"]);
    }
}
