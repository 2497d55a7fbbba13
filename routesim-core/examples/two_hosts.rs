//! The smallest possible run: two hosts on one lossy link, a handful of
//! packets, and the resulting counters.
//!
//! Run with `cargo run --example two_hosts`.

use routesim_core::{PacketTuple, Simulation, Timestamp, defaults, topology::Topology};
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let mut builder = Topology::builder();
    let a = builder.host("A");
    let b = builder.host("B");
    builder.bind(a, "10.1.0.1/24".parse()?);
    builder.bind(b, "10.1.1.1/24".parse()?);
    builder
        .link(a, b)
        .set_capacity("1Mbps".parse()?)
        .set_delay("2ms".parse()?)
        .set_loss("10%".parse()?)
        .apply();

    let mut sim = Simulation::new(builder.build()?);
    sim.set_seed(1);

    let tuple = PacketTuple {
        src: "10.1.0.1".parse()?,
        dst: "10.1.1.1".parse()?,
        src_port: defaults::DEFAULT_EPHEMERAL_PORT,
        dst_port: defaults::DEFAULT_PORT,
    };
    for k in 0..100u64 {
        sim.send_at(
            Timestamp::ZERO + Duration::from_millis(10 * k),
            tuple,
            defaults::DEFAULT_PACKET_SIZE,
        )?;
    }
    sim.run(Duration::from_secs(5))?;

    for (flow, stats) in sim.stats().flows() {
        println!(
            "{flow}: sent {} delivered {} lost {} (avg delay {:.6}s)",
            stats.tx_packets,
            stats.rx_packets,
            stats.lost_packets,
            stats.average_delay(),
        );
    }
    Ok(())
}
