//! Selection and editing mode.
//!
//! Clicking a feature selects it, marks it with `selected: true`, and
//! spawns one selection-point feature per editable vertex. Dragging moves
//! the whole feature or a single vertex, gated per source mode by
//! [`DragPermissions`]. Delete removes the selection; Escape and a click on
//! empty space deselect.

use super::{validate_mode_feature, Key, KeyEvent, Mode, ModeBase, PointerEvent, Styling};
use crate::behaviors::{ClickBoundingBoxBehavior, Cursor, PixelDistanceBehavior};
use crate::geometry::planar::{distance_to_segment, point_in_polygon};
use crate::geometry::{Feature, FeatureId, Geometry, Position, Properties};
use crate::store::{FeatureSpec, GeometryUpdate, PropertyUpdate, Validation};
use serde_json::Value;
use std::collections::HashMap;
use std::rc::Rc;

const MODE_NAME: &str = "select";

/// What dragging may do to features authored by one source mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct DragPermissions {
    /// Allow dragging the whole feature.
    pub feature: bool,
    /// Allow dragging individual vertices via their selection points.
    pub coordinates: bool,
}

enum DragTarget {
    Feature,
    Coordinate { index: usize },
}

pub struct SelectMode {
    base: ModeBase,
    /// Drag permissions keyed by the `mode` property of the hit feature.
    /// Modes absent from the map get no drag permissions at all.
    permissions: HashMap<String, DragPermissions>,
    selected: Option<FeatureId>,
    /// Selection-point features, one per editable vertex, in vertex order.
    selection_points: Vec<FeatureId>,
    drag: Option<DragTarget>,
    last_drag_position: Option<Position>,
    click_bbox: Option<ClickBoundingBoxBehavior>,
    pixel_distance: Option<PixelDistanceBehavior>,
}

/// Vertices a selected feature exposes for editing. Polygons expose the
/// outer ring without its closing coordinate.
fn editable_vertices(geometry: &Geometry) -> Vec<Position> {
    match geometry {
        Geometry::Point(position) => vec![*position],
        Geometry::LineString(coords) => coords.clone(),
        Geometry::Polygon(rings) => rings
            .first()
            .map(|ring| ring[..ring.len().saturating_sub(1)].to_vec())
            .unwrap_or_default(),
    }
}

/// Replaces the editable vertex at `index`. For polygons, moving vertex 0
/// also moves the closing coordinate so the ring stays closed.
fn set_vertex(geometry: &mut Geometry, index: usize, position: Position) {
    match geometry {
        Geometry::Point(p) => *p = position,
        Geometry::LineString(coords) => {
            if let Some(vertex) = coords.get_mut(index) {
                *vertex = position;
            }
        }
        Geometry::Polygon(rings) => {
            if let Some(ring) = rings.first_mut()
                && index < ring.len()
            {
                ring[index] = position;
                if index == 0 && let Some(last) = ring.last_mut() {
                    *last = position;
                }
            }
        }
    }
}

fn translate(geometry: &mut Geometry, dlng: f64, dlat: f64) {
    let shift = |p: &mut Position| {
        p[0] += dlng;
        p[1] += dlat;
    };
    match geometry {
        Geometry::Point(p) => shift(p),
        Geometry::LineString(coords) => coords.iter_mut().for_each(shift),
        Geometry::Polygon(rings) => rings.iter_mut().flatten().for_each(shift),
    }
}

fn is_selection_point(feature: &Feature) -> bool {
    feature
        .properties
        .get("selectionPoint")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

impl SelectMode {
    pub fn new(permissions: HashMap<String, DragPermissions>) -> Self {
        Self {
            base: ModeBase::new(MODE_NAME),
            permissions,
            selected: None,
            selection_points: Vec::new(),
            drag: None,
            last_drag_position: None,
            click_bbox: None,
            pixel_distance: None,
        }
    }

    /// Nearest selectable feature within pointer tolerance of the event.
    ///
    /// Selection points are never hits; they only matter for coordinate
    /// drags.
    fn hit_test(&self, event: &PointerEvent) -> Option<FeatureId> {
        let ctx = self.base.context()?;
        let (click_bbox, pixel_distance) =
            (self.click_bbox.as_ref()?, self.pixel_distance.as_ref()?);

        let area = click_bbox.create(event);
        let skip_points = |feature: &Feature| !is_selection_point(feature);
        let candidates = ctx.store.borrow().search(&area, Some(&skip_points));

        let pointer = (event.container_x, event.container_y);
        let mut best: Option<(f64, FeatureId)> = None;
        for feature in &candidates {
            let distance = match &feature.geometry {
                Geometry::Point(position) => pixel_distance.measure(event, *position),
                Geometry::LineString(coords) => coords
                    .windows(2)
                    .map(|pair| {
                        distance_to_segment(pointer, ctx.project(pair[0]), ctx.project(pair[1]))
                    })
                    .fold(f64::INFINITY, f64::min),
                Geometry::Polygon(rings) => {
                    if point_in_polygon(event.position(), rings) {
                        0.0
                    } else {
                        rings
                            .iter()
                            .flat_map(|ring| ring.windows(2))
                            .map(|pair| {
                                distance_to_segment(
                                    pointer,
                                    ctx.project(pair[0]),
                                    ctx.project(pair[1]),
                                )
                            })
                            .fold(f64::INFINITY, f64::min)
                    }
                }
            };
            if distance <= ctx.pointer_distance
                && best.as_ref().is_none_or(|(closest, _)| distance < *closest)
            {
                best = Some((distance, feature.id.clone()));
            }
        }
        best.map(|(_, id)| id)
    }

    fn select(&mut self, id: FeatureId) {
        let Some(ctx) = self.base.context().map(Rc::clone) else {
            return;
        };

        let flag = PropertyUpdate {
            id: id.clone(),
            key: "selected".to_string(),
            value: Value::Bool(true),
        };
        if let Err(err) = ctx.store.borrow_mut().update_property(vec![flag]) {
            log::warn!("Select mode failed to flag selection: {err}");
            return;
        }

        let geometry = match ctx.store.borrow().get_geometry_copy(&id) {
            Ok(geometry) => geometry,
            Err(err) => {
                log::warn!("Select mode failed to read selected geometry: {err}");
                return;
            }
        };
        let specs: Vec<FeatureSpec> = editable_vertices(&geometry)
            .into_iter()
            .enumerate()
            .map(|(index, vertex)| {
                let mut properties = Properties::new();
                properties.insert("mode".to_string(), Value::from(MODE_NAME));
                properties.insert("selectionPoint".to_string(), Value::Bool(true));
                properties.insert("parentId".to_string(), Value::from(id.as_str()));
                properties.insert("index".to_string(), Value::from(index as u64));
                FeatureSpec::with_properties(Geometry::Point(vertex), properties)
            })
            .collect();
        match ctx.store.borrow_mut().create(specs) {
            Ok(ids) => self.selection_points = ids,
            Err(err) => log::warn!("Select mode failed to create selection points: {err}"),
        }

        (ctx.on_select)(&id);
        self.selected = Some(id);
    }

    fn deselect(&mut self) {
        let Some(id) = self.selected.take() else {
            return;
        };
        let Some(ctx) = self.base.context().map(Rc::clone) else {
            return;
        };

        let points = std::mem::take(&mut self.selection_points);
        if !points.is_empty()
            && let Err(err) = ctx.store.borrow_mut().delete(&points)
        {
            log::warn!("Select mode failed to remove selection points: {err}");
        }

        let flag = PropertyUpdate {
            id: id.clone(),
            key: "selected".to_string(),
            value: Value::Bool(false),
        };
        if let Err(err) = ctx.store.borrow_mut().update_property(vec![flag]) {
            log::warn!("Select mode failed to clear selection flag: {err}");
        }

        (ctx.on_deselect)(&id);
        self.drag = None;
        self.last_drag_position = None;
    }

    fn permissions_for(&self, id: &FeatureId) -> DragPermissions {
        let Some(ctx) = self.base.context() else {
            return DragPermissions::default();
        };
        let properties = match ctx.store.borrow().get_properties_copy(id) {
            Ok(properties) => properties,
            Err(_) => return DragPermissions::default(),
        };
        properties
            .get("mode")
            .and_then(Value::as_str)
            .and_then(|mode| self.permissions.get(mode))
            .copied()
            .unwrap_or_default()
    }
}

impl Mode for SelectMode {
    fn name(&self) -> &'static str {
        MODE_NAME
    }

    fn base(&self) -> &ModeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModeBase {
        &mut self.base
    }

    fn on_register(&mut self) {
        if let Some(ctx) = self.base.context() {
            self.click_bbox = Some(ClickBoundingBoxBehavior::new(Rc::clone(ctx)));
            self.pixel_distance = Some(PixelDistanceBehavior::new(Rc::clone(ctx)));
        }
    }

    fn starting_cursor(&self) -> Cursor {
        Cursor::Pointer
    }

    fn on_click(&mut self, event: &PointerEvent) {
        if self.base.active_context().is_none() {
            return;
        }

        match self.hit_test(event) {
            Some(hit) => {
                if self.selected.as_ref() == Some(&hit) {
                    // Clicking the selected feature again toggles it off.
                    self.deselect();
                } else {
                    self.deselect();
                    self.select(hit);
                }
            }
            None => self.deselect(),
        }
    }

    fn on_drag_start(&mut self, event: &PointerEvent) {
        let Some(ctx) = self.base.active_context() else {
            return;
        };
        let Some(selected) = self.selected.clone() else {
            return;
        };
        let permissions = self.permissions_for(&selected);

        if permissions.coordinates
            && let Some(pixel_distance) = &self.pixel_distance
        {
            for (index, point_id) in self.selection_points.iter().enumerate() {
                let vertex = match ctx.store.borrow().get_geometry_copy(point_id) {
                    Ok(Geometry::Point(position)) => position,
                    _ => continue,
                };
                if pixel_distance.within_tolerance(event, vertex) {
                    self.drag = Some(DragTarget::Coordinate { index });
                    ctx.set_cursor(Cursor::Grabbing);
                    return;
                }
            }
        }

        if permissions.feature && self.hit_test(event).as_ref() == Some(&selected) {
            self.drag = Some(DragTarget::Feature);
            self.last_drag_position = Some(event.position());
            ctx.set_cursor(Cursor::Grabbing);
        }
    }

    fn on_drag(&mut self, event: &PointerEvent) {
        let Some(ctx) = self.base.active_context() else {
            return;
        };
        let Some(selected) = self.selected.clone() else {
            return;
        };

        match self.drag {
            Some(DragTarget::Feature) => {
                let Some(last) = self.last_drag_position else {
                    return;
                };
                let position = event.position();
                let (dlng, dlat) = (position[0] - last[0], position[1] - last[1]);

                let mut updates = Vec::with_capacity(1 + self.selection_points.len());
                for id in std::iter::once(&selected).chain(&self.selection_points) {
                    let mut geometry = match ctx.store.borrow().get_geometry_copy(id) {
                        Ok(geometry) => geometry,
                        Err(err) => {
                            log::warn!("Select mode lost a dragged feature: {err}");
                            return;
                        }
                    };
                    translate(&mut geometry, dlng, dlat);
                    updates.push(GeometryUpdate {
                        id: id.clone(),
                        geometry,
                    });
                }
                if let Err(err) = ctx.store.borrow_mut().update_geometry(updates) {
                    log::warn!("Select mode failed to drag feature: {err}");
                    return;
                }
                self.last_drag_position = Some(position);
            }
            Some(DragTarget::Coordinate { index }) => {
                let position = event.position();
                let mut geometry = match ctx.store.borrow().get_geometry_copy(&selected) {
                    Ok(geometry) => geometry,
                    Err(err) => {
                        log::warn!("Select mode lost the selected feature: {err}");
                        return;
                    }
                };
                set_vertex(&mut geometry, index, position);

                let mut updates = vec![GeometryUpdate {
                    id: selected,
                    geometry,
                }];
                if let Some(point_id) = self.selection_points.get(index) {
                    updates.push(GeometryUpdate {
                        id: point_id.clone(),
                        geometry: Geometry::Point(position),
                    });
                }
                if let Err(err) = ctx.store.borrow_mut().update_geometry(updates) {
                    log::warn!("Select mode failed to drag vertex: {err}");
                }
            }
            None => {}
        }
    }

    fn on_drag_end(&mut self, _event: &PointerEvent) {
        if self.drag.take().is_some() {
            self.last_drag_position = None;
            if let Some(ctx) = self.base.context() {
                ctx.set_cursor(Cursor::Pointer);
            }
        }
    }

    fn on_key_down(&mut self, event: &mut KeyEvent) {
        match event.key {
            Key::Delete => {
                let Some(id) = self.selected.take() else {
                    return;
                };
                event.prevent_default();
                let Some(ctx) = self.base.context().map(Rc::clone) else {
                    return;
                };
                let mut doomed = std::mem::take(&mut self.selection_points);
                doomed.push(id.clone());
                if let Err(err) = ctx.store.borrow_mut().delete(&doomed) {
                    log::warn!("Select mode failed to delete selection: {err}");
                }
                (ctx.on_deselect)(&id);
                self.drag = None;
                self.last_drag_position = None;
            }
            Key::Escape => {
                if self.selected.is_some() {
                    event.prevent_default();
                    self.deselect();
                }
            }
            _ => {}
        }
    }

    fn clean_up(&mut self) {
        self.deselect();
    }

    fn style_feature(&self, feature: &Feature) -> Styling {
        let selected = feature
            .properties
            .get("selected")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if selected {
            Styling::selected()
        } else {
            Styling::default()
        }
    }

    fn validate_feature(&self, feature: &Feature) -> Validation {
        validate_mode_feature(feature, MODE_NAME, "Point")
    }
}
