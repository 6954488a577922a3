use plotmap_shared::{FeatureCollection, Geometry};

pub const DRAW_POLYGON_MODE: &str = "draw_polygon";

/// Notifications coming out of the draw widget.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawEvent {
    ModeChanged(String),
    /// Create or update; carries the first drawn feature's geometry.
    Changed(Option<Geometry>),
    Deleted,
}

/// The user's unsaved shape.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Draft {
    #[default]
    Empty,
    Drawing,
    Drafted(Geometry),
}

impl Draft {
    pub fn apply(&mut self, event: DrawEvent) {
        *self = match (std::mem::take(self), event) {
            (Draft::Empty, DrawEvent::ModeChanged(mode)) if mode == DRAW_POLYGON_MODE => {
                Draft::Drawing
            }
            // Left polygon mode without finishing a shape.
            (Draft::Drawing, DrawEvent::ModeChanged(mode)) if mode != DRAW_POLYGON_MODE => {
                Draft::Empty
            }
            (current, DrawEvent::ModeChanged(_)) => current,
            (_, DrawEvent::Changed(Some(geometry))) => Draft::Drafted(geometry),
            (_, DrawEvent::Changed(None)) | (_, DrawEvent::Deleted) => Draft::Empty,
        };
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        match self {
            Draft::Drafted(geometry) => Some(geometry),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        *self = Draft::Empty;
    }
}

/// Geometry of the first feature in a `getAll()` snapshot of the draw widget.
pub fn first_drawn_geometry(snapshot: &str) -> Option<Geometry> {
    let collection: FeatureCollection = serde_json::from_str(snapshot).ok()?;
    collection.features.into_iter().next()?.geometry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Geometry {
        Geometry::Polygon {
            coordinates: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
        }
    }

    #[test]
    fn follows_draw_lifecycle() {
        let mut draft = Draft::default();
        draft.apply(DrawEvent::ModeChanged(DRAW_POLYGON_MODE.to_string()));
        assert_eq!(draft, Draft::Drawing);
        draft.apply(DrawEvent::Changed(Some(square())));
        assert_eq!(draft.geometry(), Some(&square()));
        draft.apply(DrawEvent::ModeChanged("simple_select".to_string()));
        assert_eq!(draft.geometry(), Some(&square()));
        draft.apply(DrawEvent::Deleted);
        assert_eq!(draft, Draft::Empty);
    }

    #[test]
    fn update_replaces_geometry_from_any_state() {
        let mut draft = Draft::Drafted(square());
        let moved = Geometry::Polygon {
            coordinates: vec![vec![[2.0, 2.0], [3.0, 2.0], [3.0, 3.0], [2.0, 2.0]]],
        };
        draft.apply(DrawEvent::Changed(Some(moved.clone())));
        assert_eq!(draft, Draft::Drafted(moved));
    }

    #[test]
    fn cancelled_drawing_returns_to_empty() {
        let mut draft = Draft::Drawing;
        draft.apply(DrawEvent::ModeChanged("simple_select".to_string()));
        assert_eq!(draft, Draft::Empty);
    }

    #[test]
    fn reads_first_feature_from_snapshot() {
        let snapshot = r#"{"type":"FeatureCollection","features":[
            {"id":"a1b2","type":"Feature","properties":{},
             "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}},
            {"id":"c3d4","type":"Feature","properties":{},
             "geometry":{"type":"Polygon","coordinates":[[[5,5],[6,5],[6,6],[5,5]]]}}
        ]}"#;
        assert_eq!(first_drawn_geometry(snapshot), Some(square()));
        assert_eq!(
            first_drawn_geometry(r#"{"type":"FeatureCollection","features":[]}"#),
            None
        );
        assert_eq!(first_drawn_geometry("not json"), None);
    }
}
