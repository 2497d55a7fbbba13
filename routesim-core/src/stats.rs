use crate::{
    flow::FlowKey,
    time::Timestamp,
    topology::LinkId,
};
use std::{collections::BTreeMap, time::Duration};

/// The per-flow counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowStats {
    /// Packets handed to the network by the source.
    pub tx_packets: u64,
    /// Packets delivered at the destination.
    pub rx_packets: u64,
    /// Packets dropped in transit (loss model or no route).
    pub lost_packets: u64,
    /// Sum of the end-to-end delays of delivered packets.
    pub delay_sum: Duration,
    /// Sum of the delay differences between consecutive deliveries.
    pub jitter_sum: Duration,
}

impl FlowStats {
    /// Mean end-to-end delay of the delivered packets, in seconds.
    ///
    /// Zero when nothing was delivered.
    pub fn average_delay(&self) -> f64 {
        if self.rx_packets == 0 {
            0.0
        } else {
            self.delay_sum.as_secs_f64() / self.rx_packets as f64
        }
    }

    /// Delay-variation figure of the delivered packets, in seconds:
    /// twice the mean jitter.
    ///
    /// This is a dispersion proxy, not a statistical variance; its scale
    /// matches the jitter accumulation and is comparable across flows of
    /// the same run. Zero when nothing was delivered.
    pub fn delay_variance(&self) -> f64 {
        if self.rx_packets == 0 {
            0.0
        } else {
            2.0 * (self.jitter_sum.as_secs_f64() / self.rx_packets as f64)
        }
    }
}

/// One observation of a queue's depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSample {
    /// When the probe fired.
    pub at: Timestamp,
    /// Packets buffered at that instant (excludes the one being
    /// serialized).
    pub depth: u32,
}

/// The accumulator every measurement of a run flows into.
///
/// The collector trusts its callers: it never interprets, filters or
/// rejects an observation, it only adds it to the right counter. All
/// derived figures (averages, matrices) are computed at reporting time
/// from these raw sums.
///
/// Iteration over flows and queue timelines is in key order, so two
/// identical runs produce identically ordered reports.
#[derive(Debug, Clone, Default)]
pub struct StatsCollector {
    flows: BTreeMap<FlowKey, FlowStats>,
    queues: BTreeMap<LinkId, Vec<QueueSample>>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one packet handed to the network on `flow`.
    pub fn record_tx(&mut self, flow: FlowKey) {
        self.flows.entry(flow).or_default().tx_packets += 1;
    }

    /// Count one delivery on `flow` with its end-to-end `delay` and the
    /// `jitter` relative to the previous delivery of the same flow.
    pub fn record_delivery(&mut self, flow: FlowKey, delay: Duration, jitter: Duration) {
        let stats = self.flows.entry(flow).or_default();
        stats.rx_packets += 1;
        stats.delay_sum += delay;
        stats.jitter_sum += jitter;
    }

    /// Count `count` packets of `flow` dropped in transit.
    pub fn record_loss(&mut self, flow: FlowKey, count: u64) {
        self.flows.entry(flow).or_default().lost_packets += count;
    }

    /// Append one queue-depth observation to `link`'s timeline.
    ///
    /// Samples arrive in probe-firing order, which the scheduler keeps
    /// chronological, so timelines are sorted by construction.
    pub fn sample_queue(&mut self, link: LinkId, at: Timestamp, depth: u32) {
        self.queues
            .entry(link)
            .or_default()
            .push(QueueSample { at, depth });
    }

    /// The counters of one flow, if any packet of it was ever observed.
    pub fn flow(&self, key: &FlowKey) -> Option<&FlowStats> {
        self.flows.get(key)
    }

    /// All observed flows, in key order.
    pub fn flows(&self) -> impl Iterator<Item = (&FlowKey, &FlowStats)> {
        self.flows.iter()
    }

    /// The depth timeline of one link's queue; empty if it was never
    /// probed.
    pub fn queue_timeline(&self, link: LinkId) -> &[QueueSample] {
        self.queues.get(&link).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All probed queue timelines, in link order.
    pub fn queue_timelines(&self) -> impl Iterator<Item = (LinkId, &[QueueSample])> {
        self.queues.iter().map(|(id, v)| (*id, v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{flow::EndpointName, topology::NodeId};

    fn flow(src: &str, dst: &str) -> FlowKey {
        FlowKey {
            src: EndpointName::new(src),
            dst: EndpointName::new(dst),
        }
    }

    #[test]
    fn averages_over_deliveries() {
        let mut stats = StatsCollector::new();
        let key = flow("A", "B");

        stats.record_tx(key.clone());
        stats.record_tx(key.clone());
        stats.record_delivery(key.clone(), Duration::from_millis(10), Duration::ZERO);
        stats.record_delivery(key.clone(), Duration::from_millis(30), Duration::from_millis(20));

        let s = stats.flow(&key).unwrap();
        assert_eq!(s.tx_packets, 2);
        assert_eq!(s.rx_packets, 2);
        assert!((s.average_delay() - 0.020).abs() < 1e-12);
        assert!((s.delay_variance() - 0.020).abs() < 1e-12);
    }

    #[test]
    fn empty_flow_reports_zero_not_nan() {
        let stats = FlowStats::default();
        assert_eq!(stats.average_delay(), 0.0);
        assert_eq!(stats.delay_variance(), 0.0);
    }

    #[test]
    fn losses_accumulate() {
        let mut stats = StatsCollector::new();
        let key = flow("A", "B");
        stats.record_loss(key.clone(), 1);
        stats.record_loss(key.clone(), 3);

        assert_eq!(stats.flow(&key).unwrap().lost_packets, 4);
    }

    #[test]
    fn flows_iterate_in_key_order() {
        let mut stats = StatsCollector::new();
        stats.record_tx(flow("C", "A"));
        stats.record_tx(flow("A", "B"));
        stats.record_tx(flow("A", "C"));

        let keys: Vec<String> = stats.flows().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, ["A -> B", "A -> C", "C -> A"]);
    }

    #[test]
    fn unprobed_queue_has_an_empty_timeline() {
        let stats = StatsCollector::new();
        let link = LinkId::new((NodeId::ZERO, NodeId::ONE));
        assert!(stats.queue_timeline(link).is_empty());
    }

    #[test]
    fn queue_samples_keep_arrival_order() {
        let mut stats = StatsCollector::new();
        let link = LinkId::new((NodeId::ZERO, NodeId::ONE));
        for (secs, depth) in [(1, 3), (2, 7), (3, 0)] {
            stats.sample_queue(
                link,
                Timestamp::ZERO + Duration::from_secs(secs),
                depth,
            );
        }

        let depths: Vec<u32> = stats.queue_timeline(link).iter().map(|s| s.depth).collect();
        assert_eq!(depths, [3, 7, 0]);
    }
}
