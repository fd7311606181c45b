use crate::config::SimulationConfig;
use crate::error::BuildResult;
use crate::heading::Heading;
use crate::incident::{self, BreakdownInjector, Incident, IncidentKind, Severity};
use crate::light::SignalOverride;
use crate::math::Point2d;
use crate::network::{Intersection, RoadNetwork, Segment, SegmentId};
use crate::spawn::Spawner;
use crate::telemetry::{self, Telemetry};
use crate::vehicle::{routing, KinematicModel, Mission, Vehicle, VehicleClass};
use crate::{IncidentId, IncidentSet, IntersectionId, VehicleId, VehicleSet};
use cgmath::prelude::*;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// A traffic simulation on a grid of signalised intersections.
#[derive(Clone, Debug)]
pub struct Simulation {
    /// The configuration the simulation was built from.
    config: SimulationConfig,
    /// The intersections and road segments.
    network: RoadNetwork,
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    /// The incidents which haven't been resolved.
    incidents: IncidentSet,
    /// Incidents created since the last call to [Self::take_new_incidents].
    new_incidents: Vec<IncidentId>,
    /// Decides each vehicle's speed and motion state every frame.
    kinematics: KinematicModel,
    /// Introduces new vehicles at the edges of the grid.
    spawner: Spawner,
    /// Breaks down a random vehicle every so often.
    injector: BreakdownInjector,
    /// The statistics computed at the end of the last frame.
    telemetry: Telemetry,
    /// The source of randomness for spawning, routing, breakdowns and patrols.
    rng: SmallRng,
    /// The current frame of simulation.
    frame: usize,
    /// Whether [Self::step] advances the simulation.
    running: bool,
}

impl Simulation {
    /// Creates a new simulation, seeded from the operating system's entropy source.
    pub fn new(config: SimulationConfig) -> BuildResult<Self> {
        Self::with_rng(config, SmallRng::from_entropy())
    }

    /// Creates a new simulation whose random choices are determined by `seed`.
    pub fn with_seed(config: SimulationConfig, seed: u64) -> BuildResult<Self> {
        Self::with_rng(config, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(config: SimulationConfig, rng: SmallRng) -> BuildResult<Self> {
        config.validate()?;
        let network = RoadNetwork::grid(&config.network, config.green_time, config.yellow_time)?;
        let k = &config.kinematics;
        Ok(Self {
            kinematics: KinematicModel::new(k),
            spawner: Spawner::new(
                config.spawn_interval,
                config.max_vehicles,
                config.max_police,
                k.base_size,
            ),
            injector: BreakdownInjector::new(
                config.breakdown_interval,
                config.breakdown_probability,
                config.breakdown_min_population,
            ),
            network,
            vehicles: VehicleSet::with_key(),
            incidents: IncidentSet::with_key(),
            new_incidents: vec![],
            telemetry: Telemetry::default(),
            rng,
            frame: 0,
            running: true,
            config,
        })
    }

    /// Advances the simulation by one frame. Does nothing while paused.
    pub fn step(&mut self) {
        if !self.running {
            return;
        }
        self.frame += 1;
        self.update_lights();
        self.spawn_vehicles();
        self.update_patrols();
        self.inject_breakdown();
        self.apply_kinematics();
        self.resolve_arrivals();
        self.remove_exited();
        self.telemetry = telemetry::aggregate(
            self.vehicles.values(),
            &self.network,
            self.config.queue_radius * self.network.road_width(),
        );
    }

    /// Stops [Self::step] from advancing the simulation.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Undoes [Self::pause].
    pub fn resume(&mut self) {
        self.running = true;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Gets the current simulation frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Gets the road network.
    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    /// Returns an iterator over all the intersections in the simulation.
    pub fn iter_intersections(&self) -> impl Iterator<Item = &Intersection> {
        self.network.iter_intersections()
    }

    /// Returns an iterator over all the road segments in the simulation.
    pub fn iter_segments(&self) -> impl Iterator<Item = &Segment> {
        self.network.iter_segments()
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Returns an iterator over the unresolved incidents.
    pub fn iter_incidents(&self) -> impl Iterator<Item = &Incident> {
        self.incidents.values()
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(vehicle_id)
    }

    /// Gets a reference to the incident with the given ID.
    pub fn get_incident(&self, incident_id: IncidentId) -> Option<&Incident> {
        self.incidents.get(incident_id)
    }

    /// The statistics computed at the end of the last frame.
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Returns the incidents created since this was last called, oldest first.
    pub fn take_new_incidents(&mut self) -> Vec<IncidentId> {
        std::mem::take(&mut self.new_incidents)
    }

    /// Forces an intersection's signals, or hands them back to the automatic
    /// cycle when `override_state` is `None`.
    ///
    /// Returns false if the intersection doesn't exist.
    pub fn set_override(
        &mut self,
        intersection_id: IntersectionId,
        override_state: Option<SignalOverride>,
    ) -> bool {
        match self.network.intersection_mut(intersection_id) {
            Some(intersection) => {
                log::debug!(
                    "{}: signal override {:?}",
                    intersection.label(),
                    override_state
                );
                intersection.light_mut().set_override(override_state);
                true
            }
            None => false,
        }
    }

    /// Sets the green duration of an intersection, in frames.
    /// The new duration takes effect from its next green phase.
    ///
    /// Returns false if the intersection doesn't exist.
    pub fn set_green_duration(&mut self, intersection_id: IntersectionId, frames: u32) -> bool {
        match self.network.intersection_mut(intersection_id) {
            Some(intersection) => {
                log::debug!("{}: green duration {}", intersection.label(), frames);
                intersection.light_mut().set_green_time(frames);
                true
            }
            None => false,
        }
    }

    /// Adds a vehicle to the simulation.
    ///
    /// The vehicle heads for the first intersection ahead of it on its road,
    /// and its speed is clamped to the speed ceiling.
    pub fn add_vehicle(
        &mut self,
        class: VehicleClass,
        pos: Point2d,
        heading: Heading,
        speed: f64,
    ) -> VehicleId {
        let target = self.network.next_intersection(pos, heading);
        let speed = speed.clamp(0.0, self.kinematics.max_speed());
        let base_size = self.config.kinematics.base_size;
        self.vehicles
            .insert_with_key(|id| Vehicle::new(id, class, base_size, pos, heading, speed, target))
    }

    /// Removes a vehicle from the simulation. Returns false if it doesn't exist.
    pub fn remove_vehicle(&mut self, vehicle_id: VehicleId) -> bool {
        self.vehicles.remove(vehicle_id).is_some()
    }

    /// Records an incident reported from outside the simulation,
    /// closing the road segment it blocks.
    pub fn report_incident(
        &mut self,
        kind: IncidentKind,
        location: Point2d,
        description: impl Into<String>,
        severity: Severity,
        blocks: Option<SegmentId>,
    ) -> IncidentId {
        let blocks = blocks.filter(|id| self.network.set_closed(*id, true));
        let frame = self.frame;
        let description = description.into();
        let incident_id = self.incidents.insert_with_key(|id| Incident {
            id,
            kind,
            location,
            description,
            severity,
            created: frame,
            blocks,
            vehicle: None,
        });
        log::info!("{:?} incident {:?} reported", kind, incident_id);
        self.new_incidents.push(incident_id);
        incident_id
    }

    /// Clears an incident.
    ///
    /// Its segment is reopened unless another incident still blocks it, the
    /// vehicle it disabled is towed away, and police responding to it go back
    /// to patrolling. Returns false if the incident doesn't exist.
    pub fn resolve_incident(&mut self, incident_id: IncidentId) -> bool {
        let incident = match self.incidents.remove(incident_id) {
            Some(incident) => incident,
            None => return false,
        };

        if let Some(segment_id) = incident.blocks {
            let still_blocked = self
                .incidents
                .values()
                .any(|other| other.blocks == Some(segment_id));
            if !still_blocked {
                self.network.set_closed(segment_id, false);
            }
        }
        if let Some(vehicle_id) = incident.vehicle {
            self.vehicles.remove(vehicle_id);
        }
        for vehicle in self.vehicles.values_mut() {
            if let Some(Mission::Response { incident, .. }) = vehicle.mission() {
                if incident == incident_id {
                    vehicle.set_mission(Mission::Patrol { point: None });
                }
            }
        }
        self.new_incidents.retain(|id| *id != incident_id);

        log::info!("incident {:?} resolved", incident_id);
        true
    }

    /// Sends a police vehicle to an incident. If `vehicle_id` is `None`,
    /// the nearest patrolling police vehicle is sent.
    ///
    /// Returns the vehicle dispatched, or `None` if the incident doesn't exist
    /// or no suitable vehicle is available.
    pub fn dispatch_police(
        &mut self,
        incident_id: IncidentId,
        vehicle_id: Option<VehicleId>,
    ) -> Option<VehicleId> {
        let location = self.incidents.get(incident_id)?.location;
        let target = self.network.nearest(location)?;

        let vehicle_id = match vehicle_id {
            Some(id) => {
                let vehicle = self.vehicles.get(id)?;
                if vehicle.class() != VehicleClass::Police || vehicle.is_broken_down() {
                    return None;
                }
                id
            }
            None => self
                .vehicles
                .values()
                .filter(|v| v.class() == VehicleClass::Police && !v.is_broken_down())
                .filter(|v| matches!(v.mission(), Some(Mission::Patrol { .. })))
                .map(|v| (v.id(), (v.position() - location).magnitude2()))
                .min_by(|a, b| a.1.total_cmp(&b.1))?
                .0,
        };

        self.vehicles[vehicle_id].set_mission(Mission::Response {
            incident: incident_id,
            target,
        });
        log::info!(
            "police vehicle {:?} dispatched to incident {:?}",
            vehicle_id,
            incident_id
        );
        Some(vehicle_id)
    }

    /// Advances every traffic light by one frame.
    fn update_lights(&mut self) {
        for intersection in self.network.intersections_mut() {
            let before = intersection.light().states();
            intersection.light_mut().step();
            let after = intersection.light().states();
            if before != after {
                log::trace!("{}: {:?} -> {:?}", intersection.label(), before, after);
            }
        }
    }

    /// Introduces a new vehicle at the edge of the grid, if one is due.
    fn spawn_vehicles(&mut self) {
        let request = self
            .spawner
            .spawn(self.frame, &self.vehicles, &self.network, &mut self.rng);
        if let Some(request) = request {
            let speed = 0.5 * self.kinematics.max_speed();
            let base_size = self.config.kinematics.base_size;
            let vehicle_id = self.vehicles.insert_with_key(|id| {
                Vehicle::new(
                    id,
                    request.class,
                    base_size,
                    request.pos,
                    request.heading,
                    speed,
                    request.target,
                )
            });
            log::debug!(
                "spawned {:?} {:?} heading {:?}",
                request.class,
                vehicle_id,
                request.heading
            );
        }
    }

    /// Occasionally moves the patrol point of each patrolling police vehicle.
    fn update_patrols(&mut self) {
        if self.frame % self.config.patrol_interval as usize != 0 {
            return;
        }
        let points = self
            .network
            .iter_intersections()
            .map(Intersection::id)
            .collect::<Vec<_>>();
        for vehicle in self.vehicles.values_mut() {
            if !matches!(vehicle.mission(), Some(Mission::Patrol { .. })) {
                continue;
            }
            if self.rng.gen_bool(self.config.patrol_probability) {
                let point = points.choose(&mut self.rng).copied();
                vehicle.set_mission(Mission::Patrol { point });
            }
        }
    }

    /// Breaks down a random vehicle, if one is due, and closes its road.
    fn inject_breakdown(&mut self) {
        let vehicle_id = match self.injector.pick(self.frame, &self.vehicles, &mut self.rng) {
            Some(id) => id,
            None => return,
        };
        self.vehicles[vehicle_id].break_down();

        let vehicle = &self.vehicles[vehicle_id];
        let network = &self.network;
        let frame = self.frame;
        let incident_id = self
            .incidents
            .insert_with_key(|id| incident::breakdown(id, vehicle, network, frame));

        let incident = &self.incidents[incident_id];
        if let Some(segment_id) = incident.blocks {
            self.network.set_closed(segment_id, true);
        }
        log::info!("{}", incident.description);
        self.new_incidents.push(incident_id);
    }

    /// Moves every vehicle which isn't broken down.
    fn apply_kinematics(&mut self) {
        let motions = self
            .vehicles
            .values()
            .filter(|vehicle| !vehicle.is_broken_down())
            .map(|vehicle| {
                let motion = self.kinematics.plan(vehicle, &self.vehicles, &self.network);
                (vehicle.id(), motion)
            })
            .collect::<Vec<_>>();

        for (vehicle_id, motion) in motions {
            self.vehicles[vehicle_id].apply_motion(motion);
        }
    }

    /// Turns vehicles which have reached their target intersection.
    fn resolve_arrivals(&mut self) {
        let mut arrivals = vec![];
        for vehicle in self.vehicles.values() {
            if let Some(arrival) = routing::resolve(vehicle, &self.network, &mut self.rng) {
                arrivals.push((vehicle.id(), arrival));
            }
        }

        for (vehicle_id, arrival) in arrivals {
            self.vehicles[vehicle_id].apply_arrival(arrival);
        }
    }

    /// Removes vehicles which have driven off the edge of the grid.
    fn remove_exited(&mut self) {
        let margin = self.config.boundary_margin;
        let [xs, ys] = self.network.extents();
        let (xs, ys) = (xs.expand(margin), ys.expand(margin));
        self.vehicles.retain(|_, vehicle| {
            let pos = vehicle.position();
            xs.contains_strict(pos.x) && ys.contains_strict(pos.y)
        });
    }
}
