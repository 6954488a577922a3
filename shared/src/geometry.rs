use serde::{Deserialize, Serialize};

/// `[longitude, latitude]`.
pub type Position = [f64; 2];
pub type Ring = Vec<Position>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon {
        coordinates: Vec<Ring>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Ring>>,
    },
    /// Any other GeoJSON geometry. It has no outer ring.
    #[serde(other)]
    Unsupported,
}

impl Geometry {
    /// Outer ring of the polygon, or of the first polygon of a multipolygon.
    pub fn outer_ring(&self) -> Option<&[Position]> {
        let ring = match self {
            Geometry::Polygon { coordinates } => coordinates.first(),
            Geometry::MultiPolygon { coordinates } => {
                coordinates.first().and_then(|polygon| polygon.first())
            }
            Geometry::Unsupported => None,
        }?;
        if ring.is_empty() {
            None
        } else {
            Some(ring)
        }
    }

    /// Each polygon as a list of rings, outer ring first.
    pub fn polygons(&self) -> Vec<&[Ring]> {
        match self {
            Geometry::Polygon { coordinates } => vec![coordinates.as_slice()],
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().map(|polygon| polygon.as_slice()).collect()
            }
            Geometry::Unsupported => Vec::new(),
        }
    }
}

/// Axis-aligned longitude/latitude box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    pub fn from_position(position: Position) -> Self {
        Self::new(position[0], position[1], position[0], position[1])
    }

    /// Smallest box holding every finite position, or `None` if there is none.
    pub fn from_positions<'a>(positions: impl IntoIterator<Item = &'a Position>) -> Option<Self> {
        let mut bounds: Option<Bounds> = None;
        for position in positions {
            if !position[0].is_finite() || !position[1].is_finite() {
                continue;
            }
            match bounds.as_mut() {
                Some(bounds) => bounds.extend(*position),
                None => bounds = Some(Self::from_position(*position)),
            }
        }
        bounds
    }

    pub fn extend(&mut self, position: Position) {
        self.west = self.west.min(position[0]);
        self.south = self.south.min(position[1]);
        self.east = self.east.max(position[0]);
        self.north = self.north.max(position[1]);
    }

    /// `[[west, south], [east, north]]`, the shape map cameras take.
    pub fn corners(&self) -> [Position; 2] {
        [[self.west, self.south], [self.east, self.north]]
    }

    pub fn to_polygon(&self) -> Geometry {
        Geometry::Polygon {
            coordinates: vec![vec![
                [self.west, self.south],
                [self.east, self.south],
                [self.east, self.north],
                [self.west, self.north],
                [self.west, self.south],
            ]],
        }
    }
}
