//! Derived bounding-box index over the store's features.
//!
//! Wraps an [`rstar::RTree`] of axis-aligned rectangles tagged with feature
//! ids, plus an id → bbox map so removal always goes through exact id lookup
//! and never depends on bbox equality (features with identical boxes must
//! not interfere with each other).
//!
//! The index is fully driven by store mutations; it has no public mutation
//! path of its own once wired into a [`FeatureStore`](super::FeatureStore).

use crate::error::IndexError;
use crate::geometry::{BoundingBox, Feature, FeatureId, Geometry};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};
use std::collections::HashMap;

type IndexEntry = GeomWithData<Rectangle<[f64; 2]>, FeatureId>;

fn entry_for(id: &FeatureId, bbox: &BoundingBox) -> IndexEntry {
    GeomWithData::new(
        Rectangle::from_corners([bbox.min_x, bbox.min_y], [bbox.max_x, bbox.max_y]),
        id.clone(),
    )
}

/// Bounding-box spatial index answering "what is near this region" queries
/// in better than linear time.
#[derive(Default)]
pub struct SpatialIndex {
    tree: RTree<IndexEntry>,
    nodes: HashMap<FeatureId, BoundingBox>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed features.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True when the id currently has an index node.
    pub fn contains(&self, id: &FeatureId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Ids of every indexed feature, in no particular order.
    pub fn ids(&self) -> Vec<FeatureId> {
        self.nodes.keys().cloned().collect()
    }

    /// Indexes one feature's bounding box.
    ///
    /// Fails if the id already has a node; callers must `remove` first.
    pub fn insert(&mut self, feature: &Feature) -> Result<(), IndexError> {
        if self.nodes.contains_key(&feature.id) {
            return Err(IndexError::DuplicateNode(feature.id.clone()));
        }
        let bbox = BoundingBox::from_geometry(&feature.geometry);
        self.tree.insert(entry_for(&feature.id, &bbox));
        self.nodes.insert(feature.id.clone(), bbox);
        Ok(())
    }

    /// Bulk rebuild path used by store `load`.
    ///
    /// The whole batch fails if it contains a duplicate id or an id that is
    /// already indexed; a bulk load cannot proceed with ambiguous id
    /// ownership. On success the underlying tree is rebuilt from the union
    /// of existing and new entries.
    pub fn load(&mut self, features: &[Feature]) -> Result<(), IndexError> {
        let mut incoming: HashMap<FeatureId, BoundingBox> = HashMap::with_capacity(features.len());
        for feature in features {
            if self.nodes.contains_key(&feature.id) {
                return Err(IndexError::DuplicateInLoad(feature.id.clone()));
            }
            let bbox = BoundingBox::from_geometry(&feature.geometry);
            if incoming.insert(feature.id.clone(), bbox).is_some() {
                return Err(IndexError::DuplicateInLoad(feature.id.clone()));
            }
        }

        self.nodes.extend(incoming);
        let entries: Vec<IndexEntry> = self
            .nodes
            .iter()
            .map(|(id, bbox)| entry_for(id, bbox))
            .collect();
        self.tree = RTree::bulk_load(entries);
        Ok(())
    }

    /// Re-indexes a feature whose geometry changed. Equivalent to `remove`
    /// followed by `insert`.
    pub fn update(&mut self, feature: &Feature) -> Result<(), IndexError> {
        self.remove(&feature.id)?;
        self.insert(feature)
    }

    /// Drops a feature's index node. Fails if the id has no node.
    pub fn remove(&mut self, id: &FeatureId) -> Result<(), IndexError> {
        let bbox = self
            .nodes
            .remove(id)
            .ok_or_else(|| IndexError::UnknownNode(id.clone()))?;
        self.tree.remove(&entry_for(id, &bbox));
        Ok(())
    }

    /// Ids of every indexed feature whose bbox intersects the query
    /// geometry's bbox.
    ///
    /// This is a candidate set; callers needing exact geometric intersection
    /// post-filter the result.
    pub fn search(&self, area: &Geometry) -> Vec<FeatureId> {
        let bbox = BoundingBox::from_geometry(area);
        let envelope = AABB::from_corners([bbox.min_x, bbox.min_y], [bbox.max_x, bbox.max_y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data.clone())
            .collect()
    }

    /// Cheaper existence check than [`search`](Self::search) when only a
    /// boolean is needed.
    pub fn collides(&self, area: &Geometry) -> bool {
        let bbox = BoundingBox::from_geometry(area);
        let envelope = AABB::from_corners([bbox.min_x, bbox.min_y], [bbox.max_x, bbox.max_y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .next()
            .is_some()
    }

    /// Drops all nodes and mappings.
    pub fn clear(&mut self) {
        self.tree = RTree::new();
        self.nodes.clear();
    }
}
