//! Seven hosts behind four routers: build the topology, offer Poisson
//! traffic, run for a minute of simulated time and print the measured
//! matrices.
//!
//! Run with `cargo run --example assignment`.

use rand_chacha::ChaChaRng;
use rand_core::SeedableRng as _;
use routesim_core::{
    EmissionPlan, EndpointName, Simulation, Timestamp, TrafficMatrix, defaults,
    topology::{NodeId, Topology},
};
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut builder = Topology::builder();
    let hosts: Vec<NodeId> = ["A", "B", "C", "D", "E", "F", "G"]
        .into_iter()
        .map(|name| builder.host(name))
        .collect();
    let routers: Vec<NodeId> = ["R1", "R2", "R3", "R4"]
        .into_iter()
        .map(|name| builder.router(name))
        .collect();
    let [a, b, c, d, e, f, g] = hosts[..] else {
        unreachable!()
    };
    let [r1, r2, r3, r4] = routers[..] else {
        unreachable!()
    };

    // Host access links, one /24 each; all links share a 2 ms delay.
    let access = [
        (a, r1, "1Mbps"),
        (b, r1, "1Mbps"),
        (c, r3, "1Mbps"),
        (d, r3, "2Mbps"),
        (e, r2, "1Mbps"),
        (f, r2, "1Mbps"),
        (g, r4, "1Mbps"),
    ];
    for (i, (host, router, rate)) in access.into_iter().enumerate() {
        builder.bind(host, format!("10.1.{i}.1/24").parse()?);
        builder.bind(router, format!("10.1.{i}.2/24").parse()?);
        builder
            .link(host, router)
            .set_capacity(rate.parse()?)
            .apply();
    }

    // Router backbone.
    let backbone = [
        (r1, r2, "3Mbps"),
        (r1, r3, "2.5Mbps"),
        (r3, r4, "1.5Mbps"),
        (r2, r4, "1Mbps"),
    ];
    for (i, (x, y, rate)) in backbone.into_iter().enumerate() {
        builder.bind(x, format!("10.1.{}.1/24", i + 7).parse()?);
        builder.bind(y, format!("10.1.{}.2/24", i + 7).parse()?);
        builder.link(x, y).set_capacity(rate.parse()?).apply();
    }

    let topology = builder.build()?;

    // The offered load every pair would like to exchange.
    let names: Vec<EndpointName> = topology
        .host_names()
        .into_iter()
        .map(EndpointName::new)
        .collect();
    let mut rng = ChaChaRng::seed_from_u64(42);
    let offered = TrafficMatrix::poisson(&names, 80.0, &mut rng);

    let mut sim = Simulation::new(topology);
    sim.set_seed(42);
    sim.install_emissions(&EmissionPlan::default())?;
    for (x, y, _) in backbone {
        for secs in [1, 2, 3] {
            sim.probe_queue(x, y, Timestamp::ZERO + Duration::from_secs(secs))?;
        }
    }
    sim.run(defaults::DEFAULT_HORIZON)?;

    println!("== Routing tables ==");
    for node in sim.topology().nodes() {
        println!("{}:", node.name());
        for entry in sim.oracle().routes_from(node.id()) {
            println!("  {} via node {}", entry.destination, entry.next_hop);
        }
    }

    let report = sim.report();
    println!("\n== Offered load (packets) ==");
    println!("{}", report.offered_load_matrix(&offered));
    println!("== Average end-to-end delay (s) ==");
    println!("{}", report.delay_matrix());
    println!("== Delay variation (s) ==");
    println!("{}", report.variance_matrix());
    println!("== Lost packets ==");
    println!("{}", report.loss_matrix());

    println!("== Queue depths ==");
    for (link, timeline) in report.queue_timelines() {
        for sample in timeline {
            println!("link {link} at {}: {} packets", sample.at, sample.depth);
        }
    }

    Ok(())
}
