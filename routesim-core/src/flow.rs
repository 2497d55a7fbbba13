use crate::topology::Topology;
use std::{collections::HashMap, fmt, net::Ipv4Addr};

/// The display name of a traffic endpoint, e.g. `A` or `G`.
///
/// Names come from the topology's node names. Addresses the classifier
/// cannot attribute to any node map to the reserved
/// [`unknown`](Self::unknown) name instead of being dropped, so the
/// per-flow counters still account for every observed packet.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EndpointName(String);

impl EndpointName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The reserved name for unattributable endpoints.
    pub fn unknown() -> Self {
        Self("Unknown".to_owned())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == "Unknown"
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for EndpointName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// The identity of a unidirectional flow: source and destination
/// endpoint names.
///
/// `A -> B` and `B -> A` are distinct flows with independent counters.
/// Ports do not split flows; all traffic between the same pair of
/// endpoints aggregates into one set of counters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlowKey {
    pub src: EndpointName,
    pub dst: EndpointName,
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)
    }
}

/// The addressing 4-tuple carried by every simulated packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketTuple {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
}

/// Maps packet tuples to [`FlowKey`]s through the address-to-name
/// mapping of a [`Topology`].
///
/// Built once per topology; classification afterwards is a pair of hash
/// lookups.
///
/// # Example
///
/// ```
/// use routesim_core::{FlowClassifier, PacketTuple, topology::Topology};
///
/// let mut builder = Topology::builder();
/// let a = builder.host("A");
/// let b = builder.host("B");
/// builder.bind(a, "10.1.0.1/24".parse().unwrap());
/// builder.bind(b, "10.1.1.1/24".parse().unwrap());
/// let topology = builder.build().unwrap();
///
/// let classifier = FlowClassifier::new(&topology);
/// let flow = classifier.classify(&PacketTuple {
///     src: "10.1.0.1".parse().unwrap(),
///     dst: "10.1.1.1".parse().unwrap(),
///     src_port: 49_152,
///     dst_port: 9,
/// });
/// assert_eq!(flow.to_string(), "A -> B");
/// ```
#[derive(Debug, Clone)]
pub struct FlowClassifier {
    names: HashMap<Ipv4Addr, EndpointName>,
}

impl FlowClassifier {
    /// Build the classifier from every bound interface of `topology`.
    pub fn new(topology: &Topology) -> Self {
        let names = topology
            .nodes()
            .flat_map(|node| {
                node.addresses()
                    .iter()
                    .map(move |address| (address.ip(), EndpointName::new(node.name())))
            })
            .collect();
        Self { names }
    }

    /// The endpoint name owning `ip`, or the `Unknown` name.
    pub fn name_of(&self, ip: Ipv4Addr) -> EndpointName {
        self.names
            .get(&ip)
            .cloned()
            .unwrap_or_else(EndpointName::unknown)
    }

    /// The flow this packet belongs to.
    pub fn classify(&self, tuple: &PacketTuple) -> FlowKey {
        FlowKey {
            src: self.name_of(tuple.src),
            dst: self.name_of(tuple.dst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> FlowClassifier {
        let mut builder = Topology::builder();
        let a = builder.host("A");
        let b = builder.host("B");
        builder.bind(a, "10.1.0.1/24".parse().unwrap());
        builder.bind(b, "10.1.1.1/24".parse().unwrap());
        // A second interface on B, as routers and multi-homed hosts have.
        builder.bind(b, "10.1.2.1/24".parse().unwrap());
        FlowClassifier::new(&builder.build().unwrap())
    }

    #[test]
    fn direction_matters() {
        let classifier = classifier();
        let forward = classifier.classify(&PacketTuple {
            src: "10.1.0.1".parse().unwrap(),
            dst: "10.1.1.1".parse().unwrap(),
            src_port: 49_152,
            dst_port: 9,
        });
        let reverse = classifier.classify(&PacketTuple {
            src: "10.1.1.1".parse().unwrap(),
            dst: "10.1.0.1".parse().unwrap(),
            src_port: 49_152,
            dst_port: 9,
        });

        assert_ne!(forward, reverse);
        assert_eq!(forward.src, reverse.dst);
    }

    #[test]
    fn all_interfaces_map_to_their_node() {
        let classifier = classifier();
        assert_eq!(
            classifier.name_of("10.1.1.1".parse().unwrap()),
            // ==
            classifier.name_of("10.1.2.1".parse().unwrap()),
        );
    }

    #[test]
    fn unknown_address_gets_the_reserved_name() {
        let classifier = classifier();
        let name = classifier.name_of("192.168.0.1".parse().unwrap());
        assert!(name.is_unknown());
        assert_eq!(name.as_str(), "Unknown");
    }

    #[test]
    fn ports_do_not_split_flows() {
        let classifier = classifier();
        let tuple = |src_port| PacketTuple {
            src: "10.1.0.1".parse().unwrap(),
            dst: "10.1.1.1".parse().unwrap(),
            src_port,
            dst_port: 9,
        };

        assert_eq!(
            classifier.classify(&tuple(49_152)),
            classifier.classify(&tuple(50_000)),
        );
    }
}
