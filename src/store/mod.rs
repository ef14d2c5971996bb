//! Authoritative feature table with validation, change notification, and a
//! lock-step spatial index.
//!
//! The store owns the id → feature mapping exclusively. Every read returns a
//! deep copy, so callers can never mutate internal state or make the table
//! and index diverge; the only mutation path is the store's own methods,
//! each of which updates table and index as one logical transaction and
//! fires its change notification synchronously before returning.

pub mod id;
pub mod index;

pub use id::{IdStrategy, UuidIdStrategy};
pub use index::SpatialIndex;

use crate::error::StoreError;
use crate::geometry::{Feature, FeatureId, FeatureType, Geometry, Properties};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Which kind of mutation a change notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Create,
    Update,
    Delete,
}

/// Change handler invoked synchronously, in-line with the mutating call.
pub type OnChangeHandler = Box<dyn FnMut(&[FeatureId], ChangeType)>;

/// Per-feature validation verdict, used by mode `validate_feature`
/// implementations and the optional `load` validator.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub valid: bool,
    pub reason: Option<String>,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Validator callback run against each feature during `load`.
pub type FeatureValidator<'a> = &'a dyn Fn(&Feature) -> Validation;

/// Per-feature outcome of a `load` call, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadResult {
    pub id: FeatureId,
    pub valid: bool,
    pub reason: Option<String>,
}

/// Input to [`FeatureStore::create`]: geometry plus optional properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Properties,
}

impl FeatureSpec {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            properties: Properties::new(),
        }
    }

    pub fn with_properties(geometry: Geometry, properties: Properties) -> Self {
        Self {
            geometry,
            properties,
        }
    }
}

/// Input to [`FeatureStore::load`]: a wire-format feature whose id and
/// tracked timestamps may be absent (both are backfilled).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingFeature {
    #[serde(rename = "type", default)]
    pub feature_type: FeatureType,
    #[serde(default)]
    pub id: Option<FeatureId>,
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Properties,
}

impl From<Feature> for IncomingFeature {
    fn from(feature: Feature) -> Self {
        Self {
            feature_type: FeatureType::Feature,
            id: Some(feature.id),
            geometry: feature.geometry,
            properties: feature.properties,
        }
    }
}

/// One geometry replacement for [`FeatureStore::update_geometry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryUpdate {
    pub id: FeatureId,
    pub geometry: Geometry,
}

/// One property assignment for [`FeatureStore::update_property`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyUpdate {
    pub id: FeatureId,
    pub key: String,
    pub value: Value,
}

/// Store configuration.
///
/// `tracked` stores stamp and maintain numeric `createdAt` / `updatedAt`
/// epoch-millisecond properties automatically. `coordinate_precision` is the
/// number of decimal digits coordinates are limited to before commit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoreConfig {
    pub tracked: bool,
    pub coordinate_precision: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            tracked: true,
            coordinate_precision: 9,
        }
    }
}

impl StoreConfig {
    /// Clamps configuration values to acceptable ranges.
    ///
    /// Precision beyond 15 decimal digits exceeds f64 resolution and is
    /// clamped with a warning.
    fn validate_and_clamp(mut self) -> Self {
        if self.coordinate_precision > 15 {
            log::warn!(
                "Invalid coordinate_precision {}, clamping to 15",
                self.coordinate_precision
            );
            self.coordinate_precision = 15;
        }
        self
    }
}

const CREATED_AT: &str = "createdAt";
const UPDATED_AT: &str = "updatedAt";
const MODE_PROPERTY: &str = "mode";

fn timestamp_error(properties: &Properties) -> Option<String> {
    for key in [CREATED_AT, UPDATED_AT] {
        if let Some(value) = properties.get(key) {
            let finite = value.as_f64().is_some_and(f64::is_finite);
            if !finite {
                return Some(format!("{key} must be a finite numeric timestamp"));
            }
        }
    }
    None
}

/// Stamps tracked timestamps, preserving caller-supplied numeric values.
fn stamp_timestamps(properties: &mut Properties, now_ms: i64) {
    for key in [CREATED_AT, UPDATED_AT] {
        if !properties.get(key).and_then(Value::as_f64).is_some() {
            properties.insert(key.to_string(), Value::from(now_ms));
        }
    }
}

/// Authoritative mapping from feature id to geometry + properties.
pub struct FeatureStore {
    table: HashMap<FeatureId, Feature>,
    index: SpatialIndex,
    ids: Box<dyn IdStrategy>,
    config: StoreConfig,
    on_change: Option<OnChangeHandler>,
}

impl Default for FeatureStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureStore {
    /// Creates a tracked store with the default UUID id strategy.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self::with_strategy(config, Box::new(UuidIdStrategy))
    }

    /// Creates a store with a custom identifier strategy.
    pub fn with_strategy(config: StoreConfig, ids: Box<dyn IdStrategy>) -> Self {
        Self {
            table: HashMap::new(),
            index: SpatialIndex::new(),
            ids,
            config: config.validate_and_clamp(),
            on_change: None,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Registers the change handler. Exactly one handler is active at a
    /// time; the last registration wins.
    pub fn register_on_change(&mut self, handler: OnChangeHandler) {
        self.on_change = Some(handler);
    }

    fn notify(&mut self, ids: &[FeatureId], change: ChangeType) {
        if ids.is_empty() {
            return;
        }
        if let Some(handler) = self.on_change.as_mut() {
            handler(ids, change);
        }
    }

    /// Creates one feature per spec and returns the new ids in order.
    ///
    /// Assigns ids via the identifier strategy, limits coordinate precision,
    /// stamps tracked timestamps (preserving caller-supplied numeric ones),
    /// inserts into table and index, and fires exactly one `Create`
    /// notification carrying the whole batch.
    ///
    /// # Errors
    /// Fails without mutating anything on a malformed geometry, a
    /// non-numeric tracked timestamp, or an id collision from the strategy
    /// (fatal, never retried).
    pub fn create(&mut self, specs: Vec<FeatureSpec>) -> Result<Vec<FeatureId>, StoreError> {
        // Validate the whole batch before touching the table.
        for spec in &specs {
            if let Some(reason) = spec.geometry.shape_error() {
                return Err(StoreError::InvalidFeature(reason));
            }
            if self.config.tracked
                && let Some(reason) = timestamp_error(&spec.properties)
            {
                return Err(StoreError::InvalidFeature(reason));
            }
        }

        let mut assigned: Vec<FeatureId> = Vec::with_capacity(specs.len());
        for _ in &specs {
            let id = self.ids.generate();
            if self.table.contains_key(&id) || assigned.contains(&id) {
                return Err(StoreError::IdCollision(id));
            }
            assigned.push(id);
        }

        let now_ms = Utc::now().timestamp_millis();
        for (spec, id) in specs.into_iter().zip(assigned.iter()) {
            let mut geometry = spec.geometry;
            geometry.limit_precision(self.config.coordinate_precision);
            let mut properties = spec.properties;
            if self.config.tracked {
                stamp_timestamps(&mut properties, now_ms);
            }
            let feature = Feature::new(id.clone(), geometry, properties);
            self.index.insert(&feature)?;
            self.table.insert(id.clone(), feature);
        }

        log::debug!("Created {} feature(s)", assigned.len());
        self.notify(&assigned, ChangeType::Create);
        Ok(assigned)
    }

    /// Bulk-imports wire-format features, backfilling missing ids and
    /// tracked timestamps.
    ///
    /// Each feature is checked individually: malformed geometry, a missing
    /// `mode` property tag, an invalid or duplicate id, a non-numeric
    /// tracked timestamp, or a validator failure excludes that feature from
    /// the import and reports it as `valid: false` with a reason. The rest
    /// of the batch still commits — this is the only operation with
    /// partial-batch success. One `Create` notification fires for the
    /// accepted subset, then the spatial index bulk-loads that subset.
    pub fn load(
        &mut self,
        incoming: Vec<IncomingFeature>,
        validator: Option<FeatureValidator<'_>>,
    ) -> Result<Vec<LoadResult>, StoreError> {
        let now_ms = Utc::now().timestamp_millis();
        let mut results = Vec::with_capacity(incoming.len());
        let mut accepted: Vec<Feature> = Vec::with_capacity(incoming.len());
        let mut batch_ids: HashSet<FeatureId> = HashSet::with_capacity(incoming.len());

        for feature in incoming {
            let (id, supplied) = match feature.id {
                Some(id) => (id, true),
                None => (self.ids.generate(), false),
            };

            fn reject(id: &FeatureId, reason: String, results: &mut Vec<LoadResult>) {
                log::debug!("Rejected feature '{id}' during load: {reason}");
                results.push(LoadResult {
                    id: id.clone(),
                    valid: false,
                    reason: Some(reason),
                });
            }

            if supplied && !self.ids.is_valid(&id) {
                reject(&id, "feature id is not valid".to_string(), &mut results);
                continue;
            }
            if self.table.contains_key(&id) || batch_ids.contains(&id) {
                reject(&id, "feature id already exists".to_string(), &mut results);
                continue;
            }
            if let Some(reason) = feature.geometry.shape_error() {
                reject(&id, reason, &mut results);
                continue;
            }
            if !feature
                .properties
                .get(MODE_PROPERTY)
                .is_some_and(Value::is_string)
            {
                reject(
                    &id,
                    "feature properties must include a string 'mode' tag".to_string(),
                    &mut results,
                );
                continue;
            }
            if self.config.tracked
                && let Some(reason) = timestamp_error(&feature.properties)
            {
                reject(&id, reason, &mut results);
                continue;
            }

            let mut geometry = feature.geometry;
            geometry.limit_precision(self.config.coordinate_precision);
            let mut properties = feature.properties;
            if self.config.tracked {
                stamp_timestamps(&mut properties, now_ms);
            }
            let candidate = Feature::new(id.clone(), geometry, properties);

            if let Some(validate) = validator {
                let verdict = validate(&candidate);
                if !verdict.valid {
                    let reason = verdict
                        .reason
                        .unwrap_or_else(|| "feature failed validation".to_string());
                    reject(&id, reason, &mut results);
                    continue;
                }
            }

            batch_ids.insert(id.clone());
            results.push(LoadResult {
                id,
                valid: true,
                reason: None,
            });
            accepted.push(candidate);
        }

        let accepted_ids: Vec<FeatureId> = accepted.iter().map(|f| f.id.clone()).collect();
        for feature in &accepted {
            self.table.insert(feature.id.clone(), feature.clone());
        }
        self.notify(&accepted_ids, ChangeType::Create);
        self.index.load(&accepted)?;

        log::debug!(
            "Loaded {} of {} feature(s)",
            accepted_ids.len(),
            results.len()
        );
        Ok(results)
    }

    /// Replaces geometry for each update and re-indexes the features.
    ///
    /// All-or-nothing: an absent id or malformed geometry fails the whole
    /// call before any mutation. Tracked stores bump `updatedAt`. One
    /// `Update` notification fires with the full id batch.
    pub fn update_geometry(&mut self, updates: Vec<GeometryUpdate>) -> Result<(), StoreError> {
        for update in &updates {
            if !self.table.contains_key(&update.id) {
                return Err(StoreError::NotFound(update.id.clone()));
            }
            if let Some(reason) = update.geometry.shape_error() {
                return Err(StoreError::InvalidFeature(reason));
            }
        }

        let now_ms = Utc::now().timestamp_millis();
        let mut ids = Vec::with_capacity(updates.len());
        for update in updates {
            let mut geometry = update.geometry;
            geometry.limit_precision(self.config.coordinate_precision);
            let feature = self
                .table
                .get_mut(&update.id)
                .expect("id presence checked above");
            feature.geometry = geometry;
            if self.config.tracked {
                feature
                    .properties
                    .insert(UPDATED_AT.to_string(), Value::from(now_ms));
            }
            let reindex = feature.clone();
            self.index.update(&reindex)?;
            ids.push(update.id);
        }

        self.notify(&ids, ChangeType::Update);
        Ok(())
    }

    /// Sets one property per update.
    ///
    /// All-or-nothing on absent ids. Property updates never touch geometry,
    /// so the spatial index is not re-indexed. Tracked stores bump
    /// `updatedAt`. One `Update` notification fires with the full id batch.
    pub fn update_property(&mut self, updates: Vec<PropertyUpdate>) -> Result<(), StoreError> {
        for update in &updates {
            if !self.table.contains_key(&update.id) {
                return Err(StoreError::NotFound(update.id.clone()));
            }
        }

        let now_ms = Utc::now().timestamp_millis();
        let mut ids = Vec::with_capacity(updates.len());
        for update in updates {
            let feature = self
                .table
                .get_mut(&update.id)
                .expect("id presence checked above");
            feature.properties.insert(update.key, update.value);
            if self.config.tracked {
                feature
                    .properties
                    .insert(UPDATED_AT.to_string(), Value::from(now_ms));
            }
            ids.push(update.id);
        }

        self.notify(&ids, ChangeType::Update);
        Ok(())
    }

    /// Deletes the given features from table and index.
    ///
    /// All-or-nothing: any absent id fails the call before removal starts.
    /// The index entry is removed before the table entry so a failure can
    /// never leave a dangling index node. One `Delete` notification fires
    /// with the full id batch.
    pub fn delete(&mut self, ids: &[FeatureId]) -> Result<(), StoreError> {
        for id in ids {
            if !self.table.contains_key(id) {
                return Err(StoreError::NotFound(id.clone()));
            }
        }

        for id in ids {
            self.index.remove(id)?;
            self.table.remove(id);
        }

        log::debug!("Deleted {} feature(s)", ids.len());
        self.notify(ids, ChangeType::Delete);
        Ok(())
    }

    /// Deep copy of one feature's geometry.
    pub fn get_geometry_copy(&self, id: &FeatureId) -> Result<Geometry, StoreError> {
        self.table
            .get(id)
            .map(|feature| feature.geometry.clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// Deep copy of one feature's properties.
    pub fn get_properties_copy(&self, id: &FeatureId) -> Result<Properties, StoreError> {
        self.table
            .get(id)
            .map(|feature| feature.properties.clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// Deep copies of every stored feature, in no particular order.
    pub fn copy_all(&self) -> Vec<Feature> {
        self.table.values().cloned().collect()
    }

    pub fn has(&self, id: &FeatureId) -> bool {
        self.table.contains_key(id)
    }

    pub fn size(&self) -> usize {
        self.table.len()
    }

    /// Removes every feature from table and index.
    pub fn clear(&mut self) {
        self.table.clear();
        self.index.clear();
    }

    /// Features whose bounding boxes intersect the query geometry's box.
    ///
    /// Candidate selection is delegated to the spatial index, then the
    /// optional predicate filters the copies before they are returned.
    pub fn search(
        &self,
        area: &Geometry,
        filter: Option<&dyn Fn(&Feature) -> bool>,
    ) -> Vec<Feature> {
        self.index
            .search(area)
            .into_iter()
            .filter_map(|id| self.table.get(&id))
            .filter(|feature| filter.is_none_or(|f| f(feature)))
            .cloned()
            .collect()
    }

    /// Ids currently present in the spatial index. Exposed so the
    /// store/index lock-step invariant can be asserted directly in tests.
    pub fn indexed_ids(&self) -> Vec<FeatureId> {
        self.index.ids()
    }
}
