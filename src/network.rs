use crate::error::{positive, BuildError, BuildResult};
use crate::heading::Heading;
use crate::light::TrafficLight;
use crate::math::{rot90, Point2d, Vector2d};
use crate::util::Interval;
use crate::{IntersectionId, IntersectionSet};
use itertools::iproduct;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A position on the intersection grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring coordinate in the given direction.
    pub fn step(self, heading: Heading) -> Self {
        let (dx, dy) = heading.delta();
        Self::new(self.x + dx, self.y + dy)
    }
}

/// A signalised intersection.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Intersection {
    id: IntersectionId,
    label: String,
    coord: GridCoord,
    light: TrafficLight,
}

/// Identifies the road segment between two adjacent intersections.
/// The order the intersections are given in does not matter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentId(IntersectionId, IntersectionId);

/// A road segment joining two grid-adjacent intersections.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    id: SegmentId,
    name: String,
    closed: bool,
}

/// The attributes of a grid road network.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NetworkAttributes {
    /// The number of intersections along the x-axis.
    pub width: u32,
    /// The number of intersections along the y-axis.
    pub height: u32,
    /// Intersection labels, assigned column by column.
    pub labels: Vec<String>,
    /// Names of east-west roads, one per row (cycled).
    pub horizontal_names: Vec<String>,
    /// Names of north-south roads, one per column (cycled).
    pub vertical_names: Vec<String>,
    /// Distance between adjacent intersection centres.
    pub block_size: f64,
    /// Width of each two-lane road.
    pub road_width: f64,
}

impl Default for NetworkAttributes {
    fn default() -> Self {
        Self {
            width: 2,
            height: 2,
            labels: vec![],
            horizontal_names: vec![],
            vertical_names: vec![],
            block_size: 240.0,
            road_width: 70.0,
        }
    }
}

/// The static road network: a rectangular grid of intersections and the
/// segments between orthogonal neighbours.
#[derive(Clone, Debug)]
pub struct RoadNetwork {
    width: u32,
    height: u32,
    block_size: f64,
    road_width: f64,
    intersections: IntersectionSet,
    /// Intersection IDs in row-major order.
    grid: Vec<IntersectionId>,
    segments: BTreeMap<SegmentId, Segment>,
}

impl Intersection {
    pub fn id(&self) -> IntersectionId {
        self.id
    }

    /// The human readable name of the intersection.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn coord(&self) -> GridCoord {
        self.coord
    }

    pub fn light(&self) -> &TrafficLight {
        &self.light
    }

    pub(crate) fn light_mut(&mut self) -> &mut TrafficLight {
        &mut self.light
    }
}

impl SegmentId {
    /// Creates the ID of the segment joining `a` and `b`.
    pub fn new(a: IntersectionId, b: IntersectionId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    /// The two intersections the segment joins.
    pub fn ends(&self) -> [IntersectionId; 2] {
        [self.0, self.1]
    }
}

impl Segment {
    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// The display name of the road.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RoadNetwork {
    /// Builds a grid network with traffic lights using the given timings.
    pub fn grid(
        attribs: &NetworkAttributes,
        green_time: u32,
        yellow_time: u32,
    ) -> BuildResult<Self> {
        if attribs.width == 0 || attribs.height == 0 {
            return Err(BuildError::EmptyGrid {
                width: attribs.width,
                height: attribs.height,
            });
        }
        let block_size = positive("block size", attribs.block_size)?;
        let road_width = positive("road width", attribs.road_width)?;
        if road_width >= block_size {
            return Err(BuildError::RoadTooWide {
                road_width,
                block_size,
            });
        }

        let (width, height) = (attribs.width as i32, attribs.height as i32);
        let mut intersections = IntersectionSet::with_key();
        let mut grid = vec![IntersectionId::default(); (width * height) as usize];

        for (idx, (x, y)) in iproduct!(0..width, 0..height).enumerate() {
            let label = attribs
                .labels
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("Sector {}-{}", x, y));
            let id = intersections.insert_with_key(|id| Intersection {
                id,
                label,
                coord: GridCoord::new(x, y),
                light: TrafficLight::new(green_time, yellow_time),
            });
            grid[(y * width + x) as usize] = id;
        }

        let mut segments = BTreeMap::new();
        for (y, x) in iproduct!(0..height, 0..width) {
            let here = grid[(y * width + x) as usize];
            if x + 1 < width {
                let name = road_name(&attribs.horizontal_names, y as usize, "East-West", y);
                let id = SegmentId::new(here, grid[(y * width + x + 1) as usize]);
                segments.insert(id, Segment { id, name, closed: false });
            }
            if y + 1 < height {
                let name = road_name(&attribs.vertical_names, x as usize, "North-South", x);
                let id = SegmentId::new(here, grid[((y + 1) * width + x) as usize]);
                segments.insert(id, Segment { id, name, closed: false });
            }
        }

        Ok(Self {
            width: attribs.width,
            height: attribs.height,
            block_size,
            road_width,
            intersections,
            grid,
            segments,
        })
    }

    /// The number of intersections along each axis.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn block_size(&self) -> f64 {
        self.block_size
    }

    pub fn road_width(&self) -> f64 {
        self.road_width
    }

    /// Returns an iterator over all the intersections.
    pub fn iter_intersections(&self) -> impl Iterator<Item = &Intersection> {
        self.intersections.values()
    }

    /// Returns an iterator over all the road segments.
    pub fn iter_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    pub fn intersection(&self, id: IntersectionId) -> Option<&Intersection> {
        self.intersections.get(id)
    }

    pub(crate) fn intersection_mut(&mut self, id: IntersectionId) -> Option<&mut Intersection> {
        self.intersections.get_mut(id)
    }

    pub(crate) fn intersections_mut(&mut self) -> impl Iterator<Item = &mut Intersection> {
        self.intersections.values_mut()
    }

    /// Finds the intersection at the given grid coordinate.
    pub fn at(&self, coord: GridCoord) -> Option<IntersectionId> {
        if !self.in_bounds(coord) {
            return None;
        }
        self.grid
            .get((coord.y * self.width as i32 + coord.x) as usize)
            .copied()
    }

    pub fn in_bounds(&self, coord: GridCoord) -> bool {
        (0..self.width as i32).contains(&coord.x) && (0..self.height as i32).contains(&coord.y)
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(&id)
    }

    /// Finds the segment leaving an intersection in the given direction.
    /// Returns `None` at the edge of the grid.
    pub fn segment_towards(&self, from: IntersectionId, heading: Heading) -> Option<SegmentId> {
        let coord = self.intersections.get(from)?.coord.step(heading);
        let to = self.at(coord)?;
        Some(SegmentId::new(from, to))
    }

    /// Whether a vehicle may leave `from` travelling in `heading`.
    /// Leaving the grid is always allowed.
    pub fn is_open(&self, from: IntersectionId, heading: Heading) -> bool {
        self.segment_towards(from, heading)
            .and_then(|id| self.segments.get(&id))
            .map_or(true, |segment| !segment.closed)
    }

    /// Sets the closed flag of a segment. Returns `false` if it doesn't exist.
    pub(crate) fn set_closed(&mut self, id: SegmentId, closed: bool) -> bool {
        match self.segments.get_mut(&id) {
            Some(segment) => {
                segment.closed = closed;
                true
            }
            None => false,
        }
    }

    /// The world space centre of the intersection at a grid coordinate.
    pub fn centre_of(&self, coord: GridCoord) -> Point2d {
        Point2d::new(
            (coord.x as f64 + 0.5) * self.block_size,
            (coord.y as f64 + 0.5) * self.block_size,
        )
    }

    /// The world space centre of an intersection.
    pub fn centre(&self, id: IntersectionId) -> Option<Point2d> {
        self.intersections.get(id).map(|i| self.centre_of(i.coord))
    }

    /// The offset from a road's centre line to the lane carrying traffic
    /// in the given direction.
    pub fn lane_offset(&self, heading: Heading) -> Vector2d {
        rot90(heading.vector()) * (0.25 * self.road_width)
    }

    /// The point where the lane for `heading` crosses the centre of an intersection.
    pub fn crossing_point(&self, coord: GridCoord, heading: Heading) -> Point2d {
        self.centre_of(coord) + self.lane_offset(heading)
    }

    /// The point where traffic in `heading` waits for the signal, on the
    /// edge of the intersection.
    pub fn stop_line(&self, coord: GridCoord, heading: Heading) -> Point2d {
        self.crossing_point(coord, heading) - heading.vector() * (0.5 * self.road_width)
    }

    /// The extents of the grid, without any margin.
    pub fn extents(&self) -> [Interval<f64>; 2] {
        [
            Interval::new(0.0, self.width as f64 * self.block_size),
            Interval::new(0.0, self.height as f64 * self.block_size),
        ]
    }

    /// Finds the first intersection strictly ahead of a point travelling in `heading`,
    /// on the road the point lies on.
    pub fn next_intersection(&self, pos: Point2d, heading: Heading) -> Option<IntersectionId> {
        let (x, y) = (pos.x / self.block_size, pos.y / self.block_size);
        // The cell the point is in, and the first centre line strictly ahead of it
        let cell = |v: f64| v.floor() as i32;
        let forward = |v: f64| (v + 0.5).floor() as i32;
        let backward = |v: f64| (v - 0.5).ceil() as i32 - 1;
        let coord = match heading {
            Heading::South => GridCoord::new(cell(x), forward(y)),
            Heading::North => GridCoord::new(cell(x), backward(y)),
            Heading::East => GridCoord::new(forward(x), cell(y)),
            Heading::West => GridCoord::new(backward(x), cell(y)),
        };
        self.at(coord)
    }

    /// Finds the intersection whose centre is nearest to a point.
    pub fn nearest(&self, point: Point2d) -> Option<IntersectionId> {
        let clamp = |v: f64, n: u32| ((v / self.block_size).floor() as i32).clamp(0, n as i32 - 1);
        self.at(GridCoord::new(clamp(point.x, self.width), clamp(point.y, self.height)))
    }
}

fn road_name(names: &[String], idx: usize, kind: &str, n: i32) -> String {
    if names.is_empty() {
        format!("{} Road {}", kind, n + 1)
    } else {
        names[idx % names.len()].clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn network(width: u32, height: u32) -> RoadNetwork {
        let attribs = NetworkAttributes {
            width,
            height,
            ..Default::default()
        };
        RoadNetwork::grid(&attribs, 150, 60).unwrap()
    }

    #[test]
    fn segments_join_orthogonal_neighbours() {
        let net = network(3, 2);
        // 2 per row horizontally, 3 vertically
        assert_eq!(net.iter_segments().count(), 2 * 2 + 3);
        assert_eq!(net.iter_intersections().count(), 6);

        let corner = net.at(GridCoord::new(0, 0)).unwrap();
        let middle = net.at(GridCoord::new(1, 0)).unwrap();
        let neighbours = |id| {
            Heading::ALL
                .into_iter()
                .filter(|heading| net.segment_towards(id, *heading).is_some())
                .count()
        };
        assert_eq!(neighbours(corner), 2);
        assert_eq!(neighbours(middle), 3);
        assert!(net.segment_towards(corner, Heading::North).is_none());
    }

    #[test]
    fn segment_id_is_unordered() {
        let net = network(2, 1);
        let a = net.at(GridCoord::new(0, 0)).unwrap();
        let b = net.at(GridCoord::new(1, 0)).unwrap();
        assert_eq!(SegmentId::new(a, b), SegmentId::new(b, a));
        assert_eq!(net.segment_towards(a, Heading::East), net.segment_towards(b, Heading::West));
    }

    #[test]
    fn closure_applies_at_both_ends() {
        let mut net = network(2, 2);
        let a = net.at(GridCoord::new(0, 0)).unwrap();
        let b = net.at(GridCoord::new(0, 1)).unwrap();
        let id = SegmentId::new(a, b);
        assert!(net.set_closed(id, true));
        assert!(!net.is_open(a, Heading::South));
        assert!(!net.is_open(b, Heading::North));
        assert!(net.is_open(a, Heading::East));
        // Leaving the grid is never blocked.
        assert!(net.is_open(a, Heading::West));
    }

    #[test]
    fn labels_and_names() {
        let attribs = NetworkAttributes {
            labels: vec!["Silk Board".into()],
            horizontal_names: vec!["MG Road".into()],
            ..Default::default()
        };
        let net = RoadNetwork::grid(&attribs, 150, 60).unwrap();
        let first = net.at(GridCoord::new(0, 0)).unwrap();
        assert_eq!(net.intersection(first).unwrap().label(), "Silk Board");
        let second = net.at(GridCoord::new(0, 1)).unwrap();
        assert_eq!(net.intersection(second).unwrap().label(), "Sector 0-1");
        let east = net.segment_towards(first, Heading::East).unwrap();
        assert_eq!(net.segment(east).unwrap().name(), "MG Road");
    }

    #[test]
    fn rejects_bad_geometry() {
        let attribs = NetworkAttributes {
            road_width: 300.0,
            ..Default::default()
        };
        assert!(matches!(
            RoadNetwork::grid(&attribs, 150, 60),
            Err(BuildError::RoadTooWide { .. })
        ));
        let attribs = NetworkAttributes {
            width: 0,
            ..Default::default()
        };
        assert!(matches!(
            RoadNetwork::grid(&attribs, 150, 60),
            Err(BuildError::EmptyGrid { .. })
        ));
    }

    #[test]
    fn next_intersection_is_strictly_ahead() {
        let net = network(2, 2);
        let next = |x: f64, y: f64, heading: Heading| {
            net.next_intersection(Point2d::new(x, y), heading)
                .map(|id| net.intersection(id).unwrap().coord())
        };

        assert_eq!(next(100.0, -42.0, Heading::South), Some(GridCoord::new(0, 0)));
        assert_eq!(next(100.0, 120.0, Heading::South), Some(GridCoord::new(0, 1)));
        assert_eq!(next(100.0, 400.0, Heading::South), None);
        assert_eq!(next(380.0, 522.0, Heading::North), Some(GridCoord::new(1, 1)));
        assert_eq!(next(380.0, 360.0, Heading::North), Some(GridCoord::new(1, 0)));
        assert_eq!(next(200.0, 100.0, Heading::East), Some(GridCoord::new(1, 0)));
        assert_eq!(next(200.0, 100.0, Heading::West), Some(GridCoord::new(0, 0)));
        assert_eq!(next(100.0, 100.0, Heading::West), None);
    }

    #[test]
    fn nearest_intersection() {
        let net = network(2, 2);
        let id = net.nearest(Point2d::new(300.0, 10.0)).unwrap();
        assert_eq!(net.intersection(id).unwrap().coord(), GridCoord::new(1, 0));
        let id = net.nearest(Point2d::new(-40.0, 900.0)).unwrap();
        assert_eq!(net.intersection(id).unwrap().coord(), GridCoord::new(0, 1));
    }
}
