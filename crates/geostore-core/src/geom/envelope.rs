use super::{Coord, Geometry, Srid};

/// An axis aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// An envelope in a given spatial reference system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub envelope: Envelope,
    pub srid: Srid,
}

impl Envelope {
    /// Creates an envelope, normalizing the corner order.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Envelope {
        Envelope {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Inclusive of the border.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn contains(&self, other: &Envelope) -> bool {
        self.contains_point(other.min_x, other.min_y)
            && self.contains_point(other.max_x, other.max_y)
    }

    /// Inclusive of the border, so touching envelopes intersect.
    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn expand_to_include_point(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn expand_to_include(&mut self, other: &Envelope) {
        self.expand_to_include_point(other.min_x, other.min_y);
        self.expand_to_include_point(other.max_x, other.max_y);
    }

    /// Grows each side by `ratio` times the width (horizontally) or height
    /// (vertically) of the envelope.
    pub fn pad(&self, ratio: f64) -> Envelope {
        let dx = self.width() * ratio;
        let dy = self.height() * ratio;
        Envelope {
            min_x: self.min_x - dx,
            min_y: self.min_y - dy,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
        }
    }

    /// The envelope as a closed, counter-clockwise polygon.
    pub fn to_geometry(&self) -> Geometry {
        Geometry::Polygon(vec![vec![
            Coord::xy(self.min_x, self.min_y),
            Coord::xy(self.max_x, self.min_y),
            Coord::xy(self.max_x, self.max_y),
            Coord::xy(self.min_x, self.max_y),
            Coord::xy(self.min_x, self.min_y),
        ]])
    }
}

impl BoundingBox {
    pub fn new(envelope: Envelope, srid: Srid) -> BoundingBox {
        BoundingBox { envelope, srid }
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.envelope.contains_point(x, y)
    }

    /// Merges `other` into `self`. Both are assumed to share an SRID.
    pub fn expand_to_include(&mut self, other: &BoundingBox) {
        self.envelope.expand_to_include(&other.envelope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_grows_each_side() {
        let env = Envelope::new(0.0, 0.0, 10.0, 20.0).pad(0.1);
        assert_eq!(env, Envelope::new(-1.0, -2.0, 11.0, 22.0));
    }

    #[test]
    fn touching_envelopes_intersect() {
        let a = Envelope::new(0.0, 0.0, 1.0, 1.0);
        let b = Envelope::new(1.0, 1.0, 2.0, 2.0);
        let c = Envelope::new(1.5, 1.5, 2.0, 2.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn new_normalizes_corners() {
        assert_eq!(
            Envelope::new(5.0, 1.0, -5.0, -1.0),
            Envelope::new(-5.0, -1.0, 5.0, 1.0)
        );
    }
}
