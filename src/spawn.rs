use crate::heading::{Axis, Heading};
use crate::math::Point2d;
use crate::network::{GridCoord, RoadNetwork};
use crate::util::Interval;
use crate::vehicle::{Vehicle, VehicleClass};
use crate::{IntersectionId, VehicleSet};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Spawn zones are this many vehicle lengths across.
const CLEARANCE_LENGTHS: f64 = 3.0;

/// Introduces new vehicles at the edges of the grid.
#[derive(Clone, Debug)]
pub(crate) struct Spawner {
    /// A spawn is attempted once every this many frames.
    interval: usize,
    max_vehicles: usize,
    max_police: usize,
    /// The length of a car. Vehicles appear three of these outside the grid.
    base_size: f64,
}

/// A vehicle ready to be added to the simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SpawnRequest {
    pub class: VehicleClass,
    pub pos: Point2d,
    pub heading: Heading,
    pub target: Option<IntersectionId>,
}

impl Spawner {
    pub fn new(interval: u32, max_vehicles: usize, max_police: usize, base_size: f64) -> Self {
        Self {
            interval: interval.max(1) as usize,
            max_vehicles,
            max_police,
            base_size,
        }
    }

    /// Proposes a vehicle to add this frame. Returns `None` if it isn't time to
    /// spawn, the population is at capacity, or the chosen spawn zone is occupied.
    pub fn spawn(
        &self,
        frame: usize,
        vehicles: &VehicleSet,
        network: &RoadNetwork,
        rng: &mut impl Rng,
    ) -> Option<SpawnRequest> {
        if frame % self.interval != 0 || vehicles.len() >= self.max_vehicles {
            return None;
        }

        let (width, height) = network.dimensions();
        let heading = Heading::ALL[rng.gen_range(0..4)];
        let lanes = match heading.axis() {
            Axis::NorthSouth => width,
            Axis::EastWest => height,
        };
        let lane = rng.gen_range(0..lanes) as i32;
        let class = self.choose_class(vehicles, rng)?;

        let first = match heading {
            Heading::South => GridCoord::new(lane, 0),
            Heading::North => GridCoord::new(lane, height as i32 - 1),
            Heading::East => GridCoord::new(0, lane),
            Heading::West => GridCoord::new(width as i32 - 1, lane),
        };
        let run_in = 0.5 * network.block_size() + CLEARANCE_LENGTHS * self.base_size;
        let pos = network.crossing_point(first, heading) - heading.vector() * run_in;

        let (length, _) = class.proportions();
        let clearance = CLEARANCE_LENGTHS * length * self.base_size;
        if !is_clear(pos, clearance, vehicles) {
            log::debug!("spawn zone at ({:.0}, {:.0}) occupied", pos.x, pos.y);
            return None;
        }

        Some(SpawnRequest {
            class,
            pos,
            heading,
            target: network.at(first),
        })
    }

    /// Picks a vehicle class by spawn weight. Police are excluded once enough are live.
    fn choose_class(&self, vehicles: &VehicleSet, rng: &mut impl Rng) -> Option<VehicleClass> {
        let police = vehicles
            .values()
            .filter(|v| v.class() == VehicleClass::Police)
            .count();
        let classes = VehicleClass::ALL
            .into_iter()
            .filter(|class| *class != VehicleClass::Police || police < self.max_police)
            .collect::<Vec<_>>();
        let weights = WeightedIndex::new(classes.iter().map(|c| c.spawn_weight())).ok()?;
        Some(classes[weights.sample(rng)])
    }
}

/// Whether no vehicle lies within `clearance` of `pos` on both axes.
fn is_clear(pos: Point2d, clearance: f64, vehicles: &VehicleSet) -> bool {
    let xs = Interval::disc(pos.x, clearance);
    let ys = Interval::disc(pos.y, clearance);
    !vehicles
        .values()
        .map(Vehicle::position)
        .any(|p| xs.contains_strict(p.x) && ys.contains_strict(p.y))
}
