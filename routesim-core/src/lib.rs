//! Measurement primitives for routed network simulations.
//!
//! This crate builds an immutable multi-hop [`topology`] (hosts and
//! routers connected by links with a nominal capacity, a propagation
//! delay and a loss model), drives synthetic traffic through it with a
//! deterministic event [`Simulation`], and aggregates what happened
//! into host-by-host matrices: mean delay, delay variation, losses and
//! offered load.
//!
//! Determinism is the design constraint everything else follows from:
//! the scheduler executes same-time events in scheduling order, routing
//! breaks ties by node identifier, and every random draw flows from one
//! seedable generator. A topology, a workload and a seed fully
//! determine a run's report.
//!
//! # Example
//!
//! ```
//! use routesim_core::{EmissionPlan, Simulation, topology::Topology};
//! use std::time::Duration;
//!
//! // A -- R1 -- B
//! let mut builder = Topology::builder();
//! let a = builder.host("A");
//! let r1 = builder.router("R1");
//! let b = builder.host("B");
//! builder.bind(a, "10.1.0.1/24".parse().unwrap());
//! builder.bind(b, "10.1.1.1/24".parse().unwrap());
//! builder
//!     .link(a, r1)
//!     .set_capacity("1Mbps".parse().unwrap())
//!     .set_delay("2ms".parse().unwrap())
//!     .apply();
//! builder.link(r1, b).apply();
//!
//! let mut sim = Simulation::new(builder.build().unwrap());
//! sim.set_seed(42);
//! sim.install_emissions(&EmissionPlan::default()).unwrap();
//! sim.run(Duration::from_secs(60)).unwrap();
//!
//! let delay = sim.report().delay_matrix();
//! assert!(delay.get(0, 1) > 0.0); // A -> B saw traffic
//! assert_eq!(delay.get(0, 0), 0.0); // the diagonal stays empty
//! ```

pub mod defaults;
mod flow;
pub mod measure;
mod report;
mod routing;
mod scheduler;
mod sim;
mod stats;
pub mod time;
pub mod topology;
mod traffic;

pub use self::{
    flow::{EndpointName, FlowClassifier, FlowKey, PacketTuple},
    report::{Report, SquareMatrix},
    routing::{NextHop, RouteEntry, RoutingOracle, ShortestPath},
    scheduler::{EventScheduler, ScheduleError},
    sim::{SimError, Simulation},
    stats::{FlowStats, QueueSample, StatsCollector},
    time::Timestamp,
    traffic::{EmissionPlan, TrafficMatrix},
};
