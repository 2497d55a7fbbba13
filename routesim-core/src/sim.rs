use crate::{
    defaults,
    flow::{FlowClassifier, FlowKey, PacketTuple},
    routing::{RoutingOracle, ShortestPath},
    scheduler::{EventScheduler, ScheduleError},
    stats::StatsCollector,
    time::Timestamp,
    topology::{LinkDirection, LinkId, NodeId, Topology},
    traffic::EmissionPlan,
};
use rand_chacha::ChaChaRng;
use rand_core::SeedableRng as _;
use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    net::Ipv4Addr,
    time::Duration,
};
use thiserror::Error;

/// A packet in flight through the simulated network.
#[derive(Debug, Clone, Copy)]
struct Packet {
    tuple: PacketTuple,
    size: u64,
    sent_at: Timestamp,
}

/// Everything that can happen in a run.
#[derive(Debug, Clone, Copy)]
enum Event {
    /// A source emits one packet of its burst.
    Emit {
        from: NodeId,
        tuple: PacketTuple,
        size: u64,
        remaining: u32,
        interval: Duration,
        stop: Timestamp,
    },
    /// The head packet of a direction's queue finished serializing.
    Transmitted {
        link: LinkId,
        direction: LinkDirection,
    },
    /// A packet reached the node at the far end of a link.
    Arrive { at: NodeId, packet: Packet },
    /// Sample the buffered depth of a link's queues.
    QueueProbe { link: LinkId },
}

/// The outbound buffer of one direction of a link.
///
/// `buffered` includes the packet currently being serialized (the
/// front) whenever `busy` is set. `busy` is false exactly when the
/// buffer is empty or the head can never finish serializing.
#[derive(Debug, Default)]
struct LinkQueue {
    buffered: VecDeque<Packet>,
    busy: bool,
}

/// Error returned when setting up or driving a [`Simulation`].
#[derive(Debug, Error)]
pub enum SimError {
    /// A host that should emit or receive traffic has no bound address.
    #[error("host `{name}' has no bound address")]
    NoAddress { name: String },
    /// A packet names a source address no node owns.
    #[error("address {ip} is not bound to any node")]
    UnboundAddress { ip: Ipv4Addr },
    /// A queue probe targets a pair of nodes that are not linked.
    #[error("no link between nodes {a} and {b}")]
    UnknownLink { a: NodeId, b: NodeId },
    /// A scheduling request was malformed.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// A measurement run over one [`Topology`].
///
/// The simulation owns the event scheduler, the per-direction link
/// queues and the [`StatsCollector`], and drives packets hop by hop:
/// emission, per-link serialization and propagation, probabilistic
/// loss, and delivery. Forwarding decisions are delegated to the
/// [`RoutingOracle`] (hop-count shortest paths unless another oracle is
/// supplied).
///
/// All randomness flows from one seedable generator, so a topology, a
/// workload and a seed fully determine the run's statistics.
///
/// # Loss accounting
///
/// Every emitted packet ends up in exactly one counter: delivered, or
/// lost. "Lost" covers the loss model's drops, unroutable destinations,
/// and packets still queued or in flight when the run's horizon cuts
/// them off. At the end of a run, for every flow,
/// `tx_packets == rx_packets + lost_packets`.
///
/// # Example
///
/// ```
/// use routesim_core::{Simulation, PacketTuple, Timestamp, topology::Topology};
/// use std::time::Duration;
///
/// let mut builder = Topology::builder();
/// let a = builder.host("A");
/// let b = builder.host("B");
/// builder.bind(a, "10.1.0.1/24".parse().unwrap());
/// builder.bind(b, "10.1.1.1/24".parse().unwrap());
/// builder.link(a, b).apply();
///
/// let mut sim = Simulation::new(builder.build().unwrap());
/// sim.send_at(
///     Timestamp::ZERO,
///     PacketTuple {
///         src: "10.1.0.1".parse().unwrap(),
///         dst: "10.1.1.1".parse().unwrap(),
///         src_port: 49_152,
///         dst_port: 9,
///     },
///     1_024,
/// )
/// .unwrap();
/// sim.run(Duration::from_secs(60)).unwrap();
///
/// let (flow, stats) = sim.stats().flows().next().unwrap();
/// assert_eq!(flow.to_string(), "A -> B");
/// assert_eq!(stats.rx_packets, 1);
/// ```
pub struct Simulation<O = ShortestPath> {
    topology: Topology,
    oracle: O,
    classifier: FlowClassifier,
    scheduler: EventScheduler<Event>,
    stats: StatsCollector,
    queues: BTreeMap<(LinkId, LinkDirection), LinkQueue>,
    // last end-to-end delay per flow, for jitter accumulation
    last_delay: HashMap<FlowKey, Duration>,
    rng: ChaChaRng,
}

impl Simulation<ShortestPath> {
    /// Create a simulation routed by hop-count shortest paths.
    pub fn new(topology: Topology) -> Self {
        let oracle = ShortestPath::compute(&topology);
        Self::with_oracle(topology, oracle)
    }
}

impl<O: RoutingOracle> Simulation<O> {
    /// Create a simulation with a caller-provided forwarding policy.
    pub fn with_oracle(topology: Topology, oracle: O) -> Self {
        let classifier = FlowClassifier::new(&topology);
        Self {
            topology,
            oracle,
            classifier,
            scheduler: EventScheduler::new(),
            stats: StatsCollector::new(),
            queues: BTreeMap::new(),
            last_delay: HashMap::new(),
            rng: ChaChaRng::seed_from_u64(0),
        }
    }

    /// Reseed the run's random source (loss draws).
    ///
    /// Call before [`run`](Self::run); the default seed is 0.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = ChaChaRng::seed_from_u64(seed);
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// The measurements accumulated so far.
    pub fn stats(&self) -> &StatsCollector {
        &self.stats
    }

    /// The current simulated time.
    pub fn now(&self) -> Timestamp {
        self.scheduler.now()
    }

    /// Schedule a single packet emission at the absolute time `at`.
    ///
    /// The emitting node is resolved from the tuple's source address.
    pub fn send_at(
        &mut self,
        at: Timestamp,
        tuple: PacketTuple,
        size: u64,
    ) -> Result<(), SimError> {
        let from = self
            .topology
            .node_for_address(tuple.src)
            .ok_or(SimError::UnboundAddress { ip: tuple.src })?;
        self.scheduler.schedule_at(
            at,
            Event::Emit {
                from,
                tuple,
                size,
                remaining: 1,
                interval: Duration::ZERO,
                stop: at,
            },
        )?;
        Ok(())
    }

    /// Install one paced burst per ordered pair of distinct hosts.
    ///
    /// Hosts are ranked alphabetically by name; the pair with source
    /// rank `i` and destination rank `j` starts emitting at
    /// `base_start + (i + j) × stagger` and emits every `interval`
    /// until its burst is exhausted or the plan's `stop` is reached
    /// (no emission happens at or after `stop`). Each packet goes from
    /// the source's first bound address to the destination's first
    /// bound address.
    ///
    /// # Errors
    ///
    /// [`SimError::NoAddress`] if any host has no bound address;
    /// [`ScheduleError::Overflow`] if a pair's staggered start time is
    /// not representable.
    pub fn install_emissions(&mut self, plan: &EmissionPlan) -> Result<(), SimError> {
        let mut hosts: Vec<_> = self.topology.hosts().collect();
        hosts.sort_unstable_by(|a, b| a.name().cmp(b.name()));

        for (i, src) in hosts.iter().enumerate() {
            for (j, dst) in hosts.iter().enumerate() {
                if i == j {
                    continue;
                }
                let src_ip = src
                    .addresses()
                    .first()
                    .ok_or_else(|| SimError::NoAddress {
                        name: src.name().to_owned(),
                    })?
                    .ip();
                let dst_ip = dst
                    .addresses()
                    .first()
                    .ok_or_else(|| SimError::NoAddress {
                        name: dst.name().to_owned(),
                    })?
                    .ip();

                let start = plan
                    .stagger
                    .checked_mul((i + j) as u32)
                    .and_then(|staggered| plan.base_start.checked_add(staggered))
                    .ok_or(ScheduleError::Overflow)?;
                if plan.packets == 0 || start >= plan.stop {
                    continue;
                }
                self.scheduler.schedule_at(
                    Timestamp::ZERO + start,
                    Event::Emit {
                        from: src.id(),
                        tuple: PacketTuple {
                            src: src_ip,
                            dst: dst_ip,
                            src_port: defaults::DEFAULT_EPHEMERAL_PORT,
                            dst_port: plan.port,
                        },
                        size: plan.packet_size,
                        remaining: plan.packets,
                        interval: plan.interval,
                        stop: Timestamp::ZERO + plan.stop,
                    },
                )?;
            }
        }
        Ok(())
    }

    /// Schedule one queue-depth sample of the link between `a` and `b`
    /// at the absolute time `at`.
    ///
    /// The sample counts the packets waiting in both directions of the
    /// link, excluding the ones being serialized.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownLink`] if `a` and `b` are not linked.
    pub fn probe_queue(&mut self, a: NodeId, b: NodeId, at: Timestamp) -> Result<(), SimError> {
        let link = LinkId::new((a, b));
        if self.topology.link(link).is_none() {
            return Err(SimError::UnknownLink { a, b });
        }
        self.scheduler.schedule_at(at, Event::QueueProbe { link })?;
        Ok(())
    }

    /// Schedule queue-depth samples of the link between `a` and `b` at
    /// `start`, `start + every`, and so on up to and including `until`.
    pub fn probe_queue_every(
        &mut self,
        a: NodeId,
        b: NodeId,
        start: Timestamp,
        every: Duration,
        until: Timestamp,
    ) -> Result<(), SimError> {
        let mut at = start;
        while at <= until {
            self.probe_queue(a, b, at)?;
            let Some(next) = at.checked_add(every) else {
                break;
            };
            if next == at {
                break; // zero interval, one sample is all there is
            }
            at = next;
        }
        Ok(())
    }

    /// Run the simulation up to (and including) the given horizon.
    ///
    /// Pops events until the timeline is exhausted, then accounts every
    /// still-buffered packet as lost so that the per-flow counters
    /// balance.
    pub fn run(&mut self, horizon: Duration) -> Result<(), SimError> {
        let horizon = Timestamp::ZERO + horizon;
        self.scheduler.set_horizon(horizon);
        tracing::info!(%horizon, "run started");

        let mut executed = 0u64;
        while let Some((now, event)) = self.scheduler.pop() {
            self.dispatch(now, event)?;
            executed += 1;
        }
        self.drain_stranded();

        tracing::info!(executed, reached = %self.scheduler.now(), "run finished");
        Ok(())
    }

    fn dispatch(&mut self, now: Timestamp, event: Event) -> Result<(), ScheduleError> {
        match event {
            Event::Emit {
                from,
                tuple,
                size,
                remaining,
                interval,
                stop,
            } => {
                let flow = self.classifier.classify(&tuple);
                self.stats.record_tx(flow);
                self.forward(
                    from,
                    Packet {
                        tuple,
                        size,
                        sent_at: now,
                    },
                )?;

                // An unrepresentable next emission time ends the burst.
                if remaining > 1
                    && let Some(next) = now.checked_add(interval)
                    && next < stop
                {
                    self.scheduler.schedule_at(
                        next,
                        Event::Emit {
                            from,
                            tuple,
                            size,
                            remaining: remaining - 1,
                            interval,
                            stop,
                        },
                    )?;
                }
            }
            Event::Transmitted { link, direction } => self.transmitted(now, link, direction)?,
            Event::Arrive { at, packet } => self.forward(at, packet)?,
            Event::QueueProbe { link } => {
                let depth: usize = [LinkDirection::Forward, LinkDirection::Reverse]
                    .into_iter()
                    .filter_map(|d| self.queues.get(&(link, d)))
                    .map(|q| q.buffered.len().saturating_sub(q.busy as usize))
                    .sum();
                self.stats.sample_queue(link, now, depth as u32);
            }
        }
        Ok(())
    }

    /// Move `packet` one step: deliver it if `at` owns the destination
    /// address, otherwise hand it to the next hop's queue; count it
    /// lost if no route exists.
    fn forward(&mut self, at: NodeId, packet: Packet) -> Result<(), ScheduleError> {
        let delivered = self
            .topology
            .node(at)
            .is_some_and(|node| node.owns(packet.tuple.dst));
        if delivered {
            let flow = self.classifier.classify(&packet.tuple);
            let delay = self.scheduler.now().duration_since(packet.sent_at);
            let jitter = match self.last_delay.insert(flow.clone(), delay) {
                Some(previous) => {
                    if delay > previous {
                        delay - previous
                    } else {
                        previous - delay
                    }
                }
                None => Duration::ZERO,
            };
            self.stats.record_delivery(flow, delay, jitter);
            return Ok(());
        }

        match self.oracle.next_hop(at, packet.tuple.dst) {
            Some(hop) => self.enqueue(hop.link, hop.link.towards(hop.node), packet),
            None => {
                let flow = self.classifier.classify(&packet.tuple);
                tracing::debug!(%flow, dest = %packet.tuple.dst, "no route, packet dropped");
                self.stats.record_loss(flow, 1);
                Ok(())
            }
        }
    }

    fn enqueue(
        &mut self,
        link: LinkId,
        direction: LinkDirection,
        packet: Packet,
    ) -> Result<(), ScheduleError> {
        let capacity = self
            .topology
            .link(link)
            .expect("the oracle only returns links of its topology")
            .capacity();
        let size = packet.size;
        let queue = self.queues.entry((link, direction)).or_default();
        queue.buffered.push_back(packet);
        if !queue.busy {
            queue.busy = true;
            self.start_serialization(link, direction, capacity.serialization_delay(size))?;
        }
        Ok(())
    }

    fn start_serialization(
        &mut self,
        link: LinkId,
        direction: LinkDirection,
        delay: Duration,
    ) -> Result<(), ScheduleError> {
        let Some(due) = self.scheduler.now().checked_add(delay) else {
            // The head can never finish serializing (zero capacity); it
            // stays buffered until the end of the run drains it as lost.
            return Ok(());
        };
        self.scheduler
            .schedule_at(due, Event::Transmitted { link, direction })
    }

    fn transmitted(
        &mut self,
        now: Timestamp,
        link: LinkId,
        direction: LinkDirection,
    ) -> Result<(), ScheduleError> {
        let (capacity, propagation, loss) = {
            let l = self
                .topology
                .link(link)
                .expect("only installed links carry traffic");
            (l.capacity(), l.delay().into_duration(), l.loss())
        };

        let Some(queue) = self.queues.get_mut(&(link, direction)) else {
            return Ok(());
        };
        let Some(packet) = queue.buffered.pop_front() else {
            return Ok(());
        };
        let next_size = queue.buffered.front().map(|p| p.size);
        if next_size.is_none() {
            queue.busy = false;
        }

        if loss.should_drop(&mut self.rng) {
            let flow = self.classifier.classify(&packet.tuple);
            tracing::trace!(%flow, %link, "packet lost on the wire");
            self.stats.record_loss(flow, 1);
        } else {
            let due = now.checked_add(propagation);
            match due {
                Some(due) if self.scheduler.horizon().is_none_or(|h| due <= h) => {
                    self.scheduler.schedule_at(
                        due,
                        Event::Arrive {
                            at: link.receiver(direction),
                            packet,
                        },
                    )?;
                }
                _ => {
                    // Still propagating when the horizon cuts the run off.
                    let flow = self.classifier.classify(&packet.tuple);
                    tracing::trace!(%flow, %link, "in flight at the horizon, counted lost");
                    self.stats.record_loss(flow, 1);
                }
            }
        }

        if let Some(size) = next_size {
            self.start_serialization(link, direction, capacity.serialization_delay(size))?;
        }
        Ok(())
    }

    /// Count every packet still buffered at the end of the run as lost.
    fn drain_stranded(&mut self) {
        for queue in self.queues.values_mut() {
            while let Some(packet) = queue.buffered.pop_front() {
                let flow = self.classifier.classify(&packet.tuple);
                self.stats.record_loss(flow, 1);
            }
            queue.busy = false;
        }
    }
}
