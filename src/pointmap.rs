use crate::profile::Profile;

/// A flat enumeration of the active (vertex, layer, radial node) cells
/// of a model.
///
/// Points are ordered vertex-major, then by layer ascending, then by
/// radial node from the bottom of the layer up. The map is the address
/// space used by file I/O and by bulk attribute assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointMap {
    records: Vec<(usize, usize, usize)>,
}

impl PointMap {
    /// Enumerates the data nodes of every profile, keeping those the
    /// `active` predicate admits.
    pub(crate) fn build<F>(profiles: &[Vec<Profile>], mut active: F) -> Self
    where
        F: FnMut(usize, usize, usize) -> bool,
    {
        let mut records = Vec::new();
        for (vertex, layers) in profiles.iter().enumerate() {
            for (layer, profile) in layers.iter().enumerate() {
                for node in 0..profile.n_data() {
                    if active(vertex, layer, node) {
                        records.push((vertex, layer, node));
                    }
                }
            }
        }
        Self { records }
    }

    /// Number of active points.
    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The point index of a cell, or `None` when the cell is inactive.
    pub fn point_index(&self, vertex: usize, layer: usize, node: usize) -> Option<usize> {
        self.records.binary_search(&(vertex, layer, node)).ok()
    }

    /// The (vertex, layer, node) triple of a point index.
    pub fn of(&self, point: usize) -> (usize, usize, usize) {
        self.records[point]
    }

    pub fn vertex(&self, point: usize) -> usize {
        self.records[point].0
    }

    pub fn layer(&self, point: usize) -> usize {
        self.records[point].1
    }

    pub fn node(&self, point: usize) -> usize {
        self.records[point].2
    }

    /// All points in order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.records.iter().copied()
    }
}
