use std::sync::{Arc, OnceLock};

use chrono::Utc;

use crate::data::DataType;
use crate::earth::EarthShape;
use crate::error::GeoTessError;
use crate::geomath::Vector3;
use crate::grid::Grid;
use crate::pointmap::PointMap;
use crate::polygon::{Horizon, Polygon};
use crate::profile::Profile;

/// Everything a model declares about itself apart from the grid and the
/// profile data: attributes, layers, the layer-to-tessellation map, the
/// reference earth shape and provenance strings.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMetadata {
    pub description: String,
    attribute_names: Vec<String>,
    attribute_units: Vec<String>,
    layer_names: Vec<String>,
    layer_tess_ids: Vec<usize>,
    data_type: DataType,
    pub earth_shape: EarthShape,
    pub model_software_version: String,
    pub model_generation_date: String,
}

impl ModelMetadata {
    pub fn new(
        description: impl Into<String>,
        layer_names: Vec<String>,
        layer_tess_ids: Vec<usize>,
        attribute_names: Vec<String>,
        attribute_units: Vec<String>,
        data_type: DataType,
        earth_shape: EarthShape,
    ) -> Result<Self, GeoTessError> {
        if layer_names.is_empty() {
            return Err(GeoTessError::InvalidArgument(
                "a model needs at least one layer".to_owned(),
            ));
        }
        if layer_names.len() != layer_tess_ids.len() {
            return Err(GeoTessError::InvalidArgument(format!(
                "{} layer names but {} tessellation ids",
                layer_names.len(),
                layer_tess_ids.len()
            )));
        }
        if layer_tess_ids.windows(2).any(|w| w[1] < w[0]) {
            return Err(GeoTessError::InvalidArgument(
                "layer tessellation ids must be non-decreasing from the bottom layer up"
                    .to_owned(),
            ));
        }
        if attribute_names.is_empty() {
            return Err(GeoTessError::InvalidArgument(
                "a model needs at least one attribute".to_owned(),
            ));
        }
        if attribute_names.len() != attribute_units.len() {
            return Err(GeoTessError::InvalidArgument(format!(
                "{} attribute names but {} units",
                attribute_names.len(),
                attribute_units.len()
            )));
        }
        Ok(Self {
            description: description.into(),
            attribute_names,
            attribute_units,
            layer_names,
            layer_tess_ids,
            data_type,
            earth_shape,
            model_software_version: concat!("GeoTess.Rust.", env!("CARGO_PKG_VERSION")).to_owned(),
            model_generation_date: Utc::now().to_rfc2822(),
        })
    }

    pub fn n_attributes(&self) -> usize {
        self.attribute_names.len()
    }

    pub fn n_layers(&self) -> usize {
        self.layer_names.len()
    }

    pub fn attribute_names(&self) -> &[String] {
        &self.attribute_names
    }

    pub fn attribute_units(&self) -> &[String] {
        &self.attribute_units
    }

    pub fn layer_names(&self) -> &[String] {
        &self.layer_names
    }

    pub fn layer_tess_ids(&self) -> &[usize] {
        &self.layer_tess_ids
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The tessellation a layer is sampled on.
    pub fn tess_id(&self, layer: usize) -> usize {
        self.layer_tess_ids[layer]
    }

    pub fn attribute_index(&self, name: &str) -> Result<usize, GeoTessError> {
        self.attribute_names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| GeoTessError::NotFound(format!("attribute {name}")))
    }

    pub fn layer_index(&self, name: &str) -> Result<usize, GeoTessError> {
        self.layer_names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| GeoTessError::NotFound(format!("layer {name}")))
    }

    /// Historical crust models carry the two middle-crust layer names in
    /// reversed order. The documented repair swaps exactly that pair;
    /// nothing else is ever reordered.
    pub(crate) fn repair_historical_layer_order(&mut self) {
        let g = self.layer_names.iter().position(|n| n == "middle_crust_G");
        let n = self.layer_names.iter().position(|n| n == "middle_crust_N");
        if let (Some(g), Some(n)) = (g, n) {
            if n < g {
                log::warn!(
                    "layers middle_crust_N and middle_crust_G are in historical order; \
                     swapping the two names"
                );
                self.layer_names.swap(n, g);
            }
        }
    }
}

/// The active-region mask: a horizontal polygon and two bounding
/// horizons. Points outside it are excluded from the point map.
#[derive(Debug, Clone)]
pub struct ActiveRegion {
    pub polygon: Option<Polygon>,
    pub bottom: Option<Horizon>,
    pub top: Option<Horizon>,
}

/// A 3D Earth model: a shared grid, metadata, and one [`Profile`] per
/// (vertex, layer) cell.
#[derive(Debug)]
pub struct Model {
    grid: Arc<Grid>,
    metadata: ModelMetadata,
    profiles: Vec<Vec<Profile>>,
    active_region: Option<ActiveRegion>,
    point_map: OnceLock<PointMap>,
}

impl Model {
    /// A model with every profile initially unset (no data nodes). Fill
    /// the table with [`Model::set_profile`].
    pub fn new(grid: Arc<Grid>, metadata: ModelMetadata) -> Result<Self, GeoTessError> {
        for (layer, &tess) in metadata.layer_tess_ids.iter().enumerate() {
            if tess >= grid.n_tessellations() {
                return Err(GeoTessError::InvalidArgument(format!(
                    "layer {layer} maps to tessellation {tess} but the grid has only {}",
                    grid.n_tessellations()
                )));
            }
        }
        let profiles = (0..grid.n_vertices())
            .map(|_| (0..metadata.n_layers()).map(|_| Profile::surface_empty()).collect())
            .collect();
        Ok(Self {
            grid,
            metadata,
            profiles,
            active_region: None,
            point_map: OnceLock::new(),
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_shared(&self) -> Arc<Grid> {
        Arc::clone(&self.grid)
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut ModelMetadata {
        &mut self.metadata
    }

    pub fn n_layers(&self) -> usize {
        self.metadata.n_layers()
    }

    pub fn n_attributes(&self) -> usize {
        self.metadata.n_attributes()
    }

    pub fn n_vertices(&self) -> usize {
        self.grid.n_vertices()
    }

    pub fn profile(&self, vertex: usize, layer: usize) -> &Profile {
        &self.profiles[vertex][layer]
    }

    pub fn profiles(&self) -> &[Vec<Profile>] {
        &self.profiles
    }

    /// Installs a profile, checking index bounds and that its data agrees
    /// with the declared attribute count and type.
    pub fn set_profile(
        &mut self,
        vertex: usize,
        layer: usize,
        profile: Profile,
    ) -> Result<(), GeoTessError> {
        if vertex >= self.n_vertices() {
            return Err(GeoTessError::InvalidArgument(format!(
                "vertex {vertex} out of range ({} vertices)",
                self.n_vertices()
            )));
        }
        if layer >= self.n_layers() {
            return Err(GeoTessError::InvalidArgument(format!(
                "layer {layer} out of range ({} layers)",
                self.n_layers()
            )));
        }
        for node in 0..profile.n_data() {
            let Some(data) = profile.data(node) else {
                continue;
            };
            if data.data_type() != self.metadata.data_type {
                return Err(GeoTessError::InvalidArgument(format!(
                    "profile data is {} but the model stores {}",
                    data.data_type(),
                    self.metadata.data_type
                )));
            }
            if data.len() != self.metadata.n_attributes() {
                return Err(GeoTessError::InvalidArgument(format!(
                    "profile data carries {} values but the model has {} attributes",
                    data.len(),
                    self.metadata.n_attributes()
                )));
            }
        }
        self.profiles[vertex][layer] = profile;
        self.point_map = OnceLock::new();
        Ok(())
    }

    pub fn radius_bottom(&self, vertex: usize, layer: usize) -> f32 {
        self.profiles[vertex][layer].radius_bottom()
    }

    pub fn radius_top(&self, vertex: usize, layer: usize) -> f32 {
        self.profiles[vertex][layer].radius_top()
    }

    /// Radius of the reference surface at a grid vertex, in km.
    pub fn earth_radius_at(&self, vertex: usize) -> f64 {
        self.metadata.earth_shape.earth_radius(self.grid.vertex(vertex))
    }

    pub fn depth_of(&self, vertex: usize, radius: f64) -> f64 {
        self.earth_radius_at(vertex) - radius
    }

    /// The layer containing radius `r` at a vertex: the deepest layer
    /// whose top is at or above `r`, or the top layer when `r` is above
    /// the model.
    pub fn layer_of_radius(&self, vertex: usize, r: f64) -> usize {
        let n = self.n_layers();
        for layer in 0..n {
            if r <= f64::from(self.radius_top(vertex, layer)) {
                return layer;
            }
        }
        n - 1
    }

    /// Attribute value at a single model node.
    pub fn value(&self, vertex: usize, layer: usize, node: usize, attribute: usize) -> f64 {
        self.profiles[vertex][layer].value(node, attribute)
    }

    pub fn set_value(
        &mut self,
        vertex: usize,
        layer: usize,
        node: usize,
        attribute: usize,
        value: f64,
    ) -> Result<(), GeoTessError> {
        if attribute >= self.n_attributes() {
            return Err(GeoTessError::InvalidArgument(format!(
                "attribute {attribute} out of range ({} attributes)",
                self.n_attributes()
            )));
        }
        match self.profiles[vertex][layer].data_mut(node) {
            Some(data) => {
                data.set(attribute, value);
                Ok(())
            }
            None => Err(GeoTessError::InvalidArgument(format!(
                "profile at vertex {vertex}, layer {layer} has no data node {node}"
            ))),
        }
    }

    /// The point map over the current active region; the whole model is
    /// active when no region is set.
    pub fn point_map(&self) -> &PointMap {
        self.point_map.get_or_init(|| match &self.active_region {
            None => PointMap::build(&self.profiles, |_, _, _| true),
            Some(region) => {
                let vertex_in = self.polygon_mask(region);
                let bounds = self.horizon_bounds(region);
                PointMap::build(&self.profiles, |vertex, layer, node| {
                    if !vertex_in[vertex] {
                        return false;
                    }
                    match &bounds {
                        None => true,
                        Some(bounds) => {
                            let r = f64::from(self.profiles[vertex][layer].radius_of_node(node));
                            let (bottom, top) = bounds[vertex];
                            r >= bottom && r <= top
                        }
                    }
                })
            }
        })
    }

    pub fn n_points(&self) -> usize {
        self.point_map().size()
    }

    /// Restricts the point map to the given region. Pass `None` fields to
    /// leave that dimension unbounded.
    pub fn set_active_region(&mut self, region: Option<ActiveRegion>) {
        self.active_region = region;
        self.point_map = OnceLock::new();
    }

    pub fn active_region(&self) -> Option<&ActiveRegion> {
        self.active_region.as_ref()
    }

    fn polygon_mask(&self, region: &ActiveRegion) -> Vec<bool> {
        match &region.polygon {
            None => vec![true; self.n_vertices()],
            Some(polygon) => self
                .grid
                .vertices()
                .iter()
                .map(|v| polygon.contains(v))
                .collect(),
        }
    }

    fn horizon_bounds(&self, region: &ActiveRegion) -> Option<Vec<(f64, f64)>> {
        if region.bottom.is_none() && region.top.is_none() {
            return None;
        }
        let bounds = (0..self.n_vertices())
            .map(|vertex| {
                let bottom = region
                    .bottom
                    .as_ref()
                    .map_or(0.0, |h| h.radius_at(self, vertex));
                let top = region
                    .top
                    .as_ref()
                    .map_or(f64::INFINITY, |h| h.radius_at(self, vertex));
                (bottom, top)
            })
            .collect();
        Some(bounds)
    }

    pub fn point_vector(&self, point: usize) -> &Vector3 {
        self.grid.vertex(self.point_map().vertex(point))
    }

    pub fn point_radius(&self, point: usize) -> f64 {
        let (vertex, layer, node) = self.point_map().of(point);
        f64::from(self.profiles[vertex][layer].radius_of_node(node))
    }

    pub fn point_depth(&self, point: usize) -> f64 {
        let (vertex, _, _) = self.point_map().of(point);
        self.earth_radius_at(vertex) - self.point_radius(point)
    }

    pub fn point_value(&self, point: usize, attribute: usize) -> f64 {
        let (vertex, layer, node) = self.point_map().of(point);
        self.profiles[vertex][layer].value(node, attribute)
    }

    /// Writes an attribute value through the point map into the owning
    /// profile.
    pub fn set_point_value(
        &mut self,
        point: usize,
        attribute: usize,
        value: f64,
    ) -> Result<(), GeoTessError> {
        let (vertex, layer, node) = self.point_map().of(point);
        self.set_value(vertex, layer, node, attribute, value)
    }

    /// Checks the whole-model invariants: stacked interface radii and
    /// uniform 2D/3D character.
    pub fn validate(&self) -> Result<(), GeoTessError> {
        let surface_kind = self.profiles[0][0].radii().is_empty();
        for (vertex, layers) in self.profiles.iter().enumerate() {
            for (layer, profile) in layers.iter().enumerate() {
                let is_surface = profile.radii().is_empty();
                if is_surface != surface_kind {
                    return Err(GeoTessError::FormatMismatch(format!(
                        "vertex {vertex}, layer {layer} mixes surface and radial profiles"
                    )));
                }
            }
            if surface_kind {
                continue;
            }
            for layer in 0..layers.len() - 1 {
                let top = f64::from(layers[layer].radius_top());
                let bottom = f64::from(layers[layer + 1].radius_bottom());
                if (top - bottom).abs() > 1e-6 {
                    return Err(GeoTessError::FormatMismatch(format!(
                        "vertex {vertex}: top of layer {layer} is {top} km but bottom of \
                         layer {} is {bottom} km",
                        layer + 1
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Two models are equal when their grids have the same content id, their
/// metadata match, and every profile is equal node for node.
impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.grid.grid_id() == other.grid.grid_id()
            && self.metadata == other.metadata
            && self.profiles.len() == other.profiles.len()
            && self
                .profiles
                .iter()
                .zip(&other.profiles)
                .all(|(a, b)| {
                    a.len() == b.len() && a.iter().zip(b).all(|(p, q)| p.eq_exact(q))
                })
    }
}
