use std::time::Instant;

use grid_traffic_sim::{Simulation, SimulationConfig};

fn main() {
    let config = SimulationConfig::default();
    let mut sim = match Simulation::new(config) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    println!("Simulating...");
    const NUM_FRAMES: u32 = 1000;
    for _ in 0..10 {
        let start = Instant::now();
        for _ in 0..NUM_FRAMES {
            sim.step();
        }
        let frame = start.elapsed() / NUM_FRAMES;
        let telemetry = sim.telemetry();
        println!(
            "Frame {}: avg. frame {:?} ({} vehs, avg. speed {:.2}, {} incidents)",
            sim.frame(),
            frame,
            telemetry.count,
            telemetry.avg_speed,
            sim.iter_incidents().count(),
        );
        if let Some((id, queued)) = telemetry.queues.most_congested() {
            if let Some(intersection) = sim.network().intersection(id) {
                println!("  most congested: {} ({} queued)", intersection.label(), queued);
            }
        }

        // Clear everything so the grid doesn't lock up between rounds
        for incident in sim.take_new_incidents() {
            if let Some(incident) = sim.get_incident(incident) {
                println!("  {}", incident.description);
            }
            sim.dispatch_police(incident, None);
            sim.resolve_incident(incident);
        }
    }
}
