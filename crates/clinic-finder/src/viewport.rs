use clinic_finder_data::Coordinate;

/// Axis-aligned latitude/longitude box handed to the rendering sink for
/// fitting the map. Boxes crossing the antimeridian are not special-cased.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

impl Viewport {
    /// Smallest box containing every point, or `None` for no points.
    pub fn enclosing(points: impl IntoIterator<Item = Coordinate>) -> Option<Self> {
        points.into_iter().fold(None, |viewport, point| {
            Some(match viewport {
                None => Self {
                    south_west: point,
                    north_east: point,
                },
                Some(v) => v.extend(point),
            })
        })
    }

    /// Grow the box to include `point`.
    pub fn extend(self, point: Coordinate) -> Self {
        Self {
            south_west: Coordinate::new(
                self.south_west.latitude().min(point.latitude()),
                self.south_west.longitude().min(point.longitude()),
            ),
            north_east: Coordinate::new(
                self.north_east.latitude().max(point.latitude()),
                self.north_east.longitude().max(point.longitude()),
            ),
        }
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        (self.south_west.latitude()..=self.north_east.latitude()).contains(&point.latitude())
            && (self.south_west.longitude()..=self.north_east.longitude())
                .contains(&point.longitude())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enclosing() {
        let viewport = Viewport::enclosing([
            Coordinate::new(45.0, 9.0),
            Coordinate::new(41.9, 12.5),
            Coordinate::new(44.4, 8.9),
        ])
        .unwrap();

        assert_eq!(viewport.south_west, Coordinate::new(41.9, 8.9));
        assert_eq!(viewport.north_east, Coordinate::new(45.0, 12.5));
        assert!(viewport.contains(Coordinate::new(43.0, 10.0)));
        assert!(!viewport.contains(Coordinate::new(46.0, 10.0)));
    }

    #[test]
    fn test_enclosing_nothing() {
        assert!(Viewport::enclosing(std::iter::empty()).is_none());
    }

    #[test]
    fn test_single_point_is_degenerate_box() {
        let p = Coordinate::new(45.0, 9.0);
        let viewport = Viewport::enclosing([p]).unwrap();

        assert_eq!(viewport.south_west, p);
        assert_eq!(viewport.north_east, p);
        assert!(viewport.contains(p));
    }
}
