use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;

#[derive(Debug, Clone, PartialEq)]
pub enum GeoTessError {
    InvalidArgument(String),
    ParseError(ParseError),
    FormatMismatch(String),
    StateError(String),
    NotFound(String),
}

impl Error for GeoTessError {}

impl From<ParseError> for GeoTessError {
    fn from(e: ParseError) -> Self {
        Self::ParseError(e)
    }
}

impl From<io::Error> for GeoTessError {
    fn from(e: io::Error) -> Self {
        Self::ParseError(ParseError::from(e))
    }
}

impl Display for GeoTessError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::InvalidArgument(s) => write!(f, "Invalid argument: {s}"),
            Self::ParseError(e) => write!(f, "{e}"),
            Self::FormatMismatch(s) => write!(f, "Format mismatch: {s}"),
            Self::StateError(s) => write!(f, "Invalid state: {s}"),
            Self::NotFound(s) => write!(f, "Not found: {s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    ReadError(String),
    NotGeoTessModel,
    NotGeoTessGrid,
    ModelVersionMismatch(i32),
    GridVersionMismatch(i32),
    UnsupportedClass(String),
    UnknownDataType(String),
    UnknownProfileKind(u8),
    UnknownEarthShape(String),
    BadUtf8(usize),
    TriangleIndexOutOfRange(usize, usize),
    VertexIndexOutOfRange(usize, usize),
    NonMonotoneRadii(usize, usize),
    AttributeCountMismatch(usize, usize),
    BadAsciiLine(String),
}

impl Error for ParseError {}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::ReadError(s) => write!(f, "Read error: {s}"),
            Self::NotGeoTessModel => write!(f, "Not GeoTess model data"),
            Self::NotGeoTessGrid => write!(f, "Not GeoTess grid data"),
            Self::ModelVersionMismatch(i) => write!(f, "Unsupported model format version: {i}"),
            Self::GridVersionMismatch(i) => write!(f, "Unsupported grid format version: {i}"),
            Self::UnsupportedClass(s) => write!(f, "Unsupported model class: {s}"),
            Self::UnknownDataType(s) => write!(f, "Unknown data type: {s}"),
            Self::UnknownProfileKind(i) => write!(f, "Unknown profile kind: {i}"),
            Self::UnknownEarthShape(s) => write!(f, "Unknown earth shape: {s}"),
            Self::BadUtf8(i) => write!(f, "String at offset {i} is not valid UTF-8"),
            Self::TriangleIndexOutOfRange(i, n) => {
                write!(f, "Triangle index {i} out of range ({n} triangles)")
            }
            Self::VertexIndexOutOfRange(i, n) => {
                write!(f, "Vertex index {i} out of range ({n} vertices)")
            }
            Self::NonMonotoneRadii(v, l) => {
                write!(f, "Radii not monotone in profile at vertex {v}, layer {l}")
            }
            Self::AttributeCountMismatch(want, got) => {
                write!(f, "Expected {want} attribute values, found {got}")
            }
            Self::BadAsciiLine(s) => write!(f, "Malformed line: {s}"),
        }
    }
}

impl From<io::Error> for ParseError {
    fn from(e: io::Error) -> Self {
        Self::ReadError(e.to_string())
    }
}
