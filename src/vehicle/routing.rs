//! Turn selection at intersections.
//!
//! Ordinary vehicles choose uniformly among the open exits. Police on a
//! response mission greedily head for their target, which may oscillate on
//! sparse grids; nothing here tries to prevent that.

use super::Vehicle;
use crate::heading::{Heading, Turn};
use crate::math::Point2d;
use crate::network::{GridCoord, RoadNetwork};
use crate::IntersectionId;
use cgmath::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use smallvec::SmallVec;

/// How close to the crossing point a stopped vehicle must be to turn.
const ARRIVAL_EPSILON: f64 = 1.0;

/// Below this speed a vehicle counts as stopped.
const SPEED_EPSILON: f64 = 0.1;

/// The outcome of a vehicle reaching its target intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Arrival {
    /// The vehicle leaves in `heading`, from `pos`, towards `target`.
    Depart {
        heading: Heading,
        pos: Point2d,
        target: Option<IntersectionId>,
    },
    /// Every exit is closed; the vehicle waits at the crossing point.
    Stall { pos: Point2d },
}

/// The turns out of an intersection whose road isn't closed.
pub(crate) fn legal_turns(
    network: &RoadNetwork,
    at: IntersectionId,
    heading: Heading,
) -> SmallVec<[Turn; 3]> {
    Turn::ALL
        .into_iter()
        .filter(|turn| network.is_open(at, heading.turn(*turn)))
        .collect()
}

/// The turn which most directly reduces the grid distance from `from` to `to`,
/// if there is one.
pub(crate) fn preferred_turn(heading: Heading, from: GridCoord, to: GridCoord) -> Option<Turn> {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let along = |h: Heading| {
        let (hx, hy) = h.delta();
        dx * hx + dy * hy
    };
    if along(heading) > 0 {
        Some(Turn::Straight)
    } else if along(heading.left()) > 0 {
        Some(Turn::Left)
    } else if along(heading.right()) > 0 {
        Some(Turn::Right)
    } else {
        None
    }
}

/// Picks the vehicle's next turn at `at`, or `None` if every exit is closed.
pub(crate) fn choose_turn(
    vehicle: &Vehicle,
    at: IntersectionId,
    network: &RoadNetwork,
    rng: &mut impl Rng,
) -> Option<Turn> {
    let options = legal_turns(network, at, vehicle.heading);

    let preferred = vehicle.response_target().and_then(|target| {
        let from = network.intersection(at)?.coord();
        let to = network.intersection(target)?.coord();
        preferred_turn(vehicle.heading, from, to)
    });

    match preferred {
        Some(turn) if options.contains(&turn) => Some(turn),
        _ => options.choose(rng).copied(),
    }
}

/// Checks whether the vehicle has arrived at its target intersection and,
/// if so, decides what it does there.
pub(crate) fn resolve(
    vehicle: &Vehicle,
    network: &RoadNetwork,
    rng: &mut impl Rng,
) -> Option<Arrival> {
    if vehicle.broken_down {
        return None;
    }
    let at = vehicle.target?;
    let coord = network.intersection(at)?.coord();
    let crossing = network.crossing_point(coord, vehicle.heading);
    let remaining = (crossing - vehicle.pos).dot(vehicle.heading.vector());

    let stopped_at = remaining.abs() < ARRIVAL_EPSILON && vehicle.speed < SPEED_EPSILON;
    if !(stopped_at || remaining <= 0.0) {
        return None;
    }

    let arrival = match choose_turn(vehicle, at, network, rng) {
        Some(turn) => {
            let heading = vehicle.heading.turn(turn);
            let pos = match turn {
                Turn::Straight => vehicle.pos,
                Turn::Left | Turn::Right => {
                    network.centre_of(coord)
                        + heading.vector() * (0.5 * network.road_width() + 1.0)
                        + network.lane_offset(heading)
                }
            };
            Arrival::Depart {
                heading,
                pos,
                target: network.at(coord.step(heading)),
            }
        }
        None => {
            log::debug!("vehicle {:?} stalled, no open exit", vehicle.id);
            Arrival::Stall { pos: crossing }
        }
    };
    Some(arrival)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::network::{NetworkAttributes, SegmentId};
    use crate::vehicle::{Mission, VehicleClass};
    use crate::{IncidentId, VehicleId};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn network() -> RoadNetwork {
        let attribs = NetworkAttributes {
            width: 3,
            height: 3,
            ..Default::default()
        };
        RoadNetwork::grid(&attribs, 150, 60).unwrap()
    }

    fn arriving(
        network: &RoadNetwork,
        class: VehicleClass,
        at: GridCoord,
        heading: Heading,
    ) -> Vehicle {
        let pos = network.crossing_point(at, heading);
        Vehicle::new(VehicleId::default(), class, 14.0, pos, heading, 0.0, network.at(at))
    }

    #[test]
    fn preferred_turn_reduces_delta() {
        let here = GridCoord::new(1, 1);
        use Heading::*;
        assert_eq!(preferred_turn(North, here, GridCoord::new(1, 0)), Some(Turn::Straight));
        assert_eq!(preferred_turn(North, here, GridCoord::new(2, 2)), Some(Turn::Right));
        assert_eq!(preferred_turn(North, here, GridCoord::new(0, 1)), Some(Turn::Left));
        assert_eq!(preferred_turn(East, here, GridCoord::new(1, 2)), Some(Turn::Right));
        assert_eq!(preferred_turn(East, here, GridCoord::new(0, 1)), None);
        assert_eq!(preferred_turn(East, here, here), None);
    }

    #[test]
    fn closed_segment_is_not_a_legal_turn() {
        let mut network = network();
        let centre = network.at(GridCoord::new(1, 1)).unwrap();
        let north = network.at(GridCoord::new(1, 0)).unwrap();
        assert_eq!(legal_turns(&network, centre, Heading::North).len(), 3);

        network.set_closed(SegmentId::new(centre, north), true);
        let turns = legal_turns(&network, centre, Heading::North);
        assert_eq!(turns.as_slice(), &[Turn::Left, Turn::Right]);
        // From the other end, heading south into the closed road
        let turns = legal_turns(&network, north, Heading::South);
        assert!(!turns.contains(&Turn::Straight));

        network.set_closed(SegmentId::new(centre, north), false);
        assert_eq!(legal_turns(&network, centre, Heading::North).len(), 3);
    }

    #[test]
    fn stalls_when_every_exit_is_closed() {
        let mut network = network();
        let at = GridCoord::new(1, 1);
        let centre = network.at(at).unwrap();
        for heading in [Heading::North, Heading::East, Heading::West] {
            let id = network.segment_towards(centre, heading).unwrap();
            network.set_closed(id, true);
        }
        let vehicle = arriving(&network, VehicleClass::Car, at, Heading::North);
        let mut rng = SmallRng::seed_from_u64(1);
        let arrival = resolve(&vehicle, &network, &mut rng).unwrap();
        assert_eq!(arrival, Arrival::Stall { pos: network.crossing_point(at, Heading::North) });
    }

    #[test]
    fn responding_police_head_for_target() {
        let network = network();
        let at = GridCoord::new(1, 1);
        let mut police = arriving(&network, VehicleClass::Police, at, Heading::North);
        police.set_mission(Mission::Response {
            incident: IncidentId::default(),
            target: network.at(GridCoord::new(2, 1)).unwrap(),
        });
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..20 {
            match resolve(&police, &network, &mut rng) {
                Some(Arrival::Depart { heading, target, .. }) => {
                    assert_eq!(heading, Heading::East);
                    assert_eq!(target, network.at(GridCoord::new(2, 1)));
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn responding_police_fall_back_when_preferred_closed() {
        let mut network = network();
        let at = GridCoord::new(1, 1);
        let centre = network.at(at).unwrap();
        let east = network.segment_towards(centre, Heading::East).unwrap();
        network.set_closed(east, true);

        let mut police = arriving(&network, VehicleClass::Police, at, Heading::North);
        police.set_mission(Mission::Response {
            incident: IncidentId::default(),
            target: network.at(GridCoord::new(2, 1)).unwrap(),
        });
        let mut rng = SmallRng::seed_from_u64(3);
        let turn = choose_turn(&police, centre, &network, &mut rng).unwrap();
        assert_ne!(turn, Turn::Right);
    }

    #[test]
    fn ordinary_vehicles_use_every_open_exit() {
        let network = network();
        let at = GridCoord::new(1, 1);
        let car = arriving(&network, VehicleClass::Car, at, Heading::East);
        let centre = network.at(at).unwrap();
        let mut rng = SmallRng::seed_from_u64(11);
        let mut seen = vec![];
        for _ in 0..100 {
            let turn = choose_turn(&car, centre, &network, &mut rng).unwrap();
            if !seen.contains(&turn) {
                seen.push(turn);
            }
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn leaving_the_grid_clears_target() {
        let network = network();
        let at = GridCoord::new(2, 1);
        let mut police = arriving(&network, VehicleClass::Police, at, Heading::East);
        // Target further east than the grid reaches
        police.set_mission(Mission::Response {
            incident: IncidentId::default(),
            target: network.at(GridCoord::new(2, 1)).unwrap(),
        });
        let mut rng = SmallRng::seed_from_u64(5);
        let mut left_grid = false;
        for _ in 0..50 {
            if let Some(Arrival::Depart { heading: Heading::East, target, .. }) =
                resolve(&police, &network, &mut rng)
            {
                assert_eq!(target, None);
                left_grid = true;
            }
        }
        assert!(left_grid);
    }

    #[test]
    fn moving_vehicles_short_of_the_crossing_keep_going() {
        let network = network();
        let at = GridCoord::new(1, 1);
        let mut car = arriving(&network, VehicleClass::Car, at, Heading::South);
        car.pos.y -= 20.0;
        car.speed = 3.0;
        let mut rng = SmallRng::seed_from_u64(2);
        assert!(resolve(&car, &network, &mut rng).is_none());

        // Having crossed this frame, it must pick an exit.
        car.pos.y += 21.0;
        assert!(resolve(&car, &network, &mut rng).is_some());
    }
}
