use crate::topology::{LinkId, NodeId, Topology};
use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    net::Ipv4Addr,
};

/// The forwarding decision at one node for one destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextHop {
    /// The link to send the packet over.
    pub link: LinkId,
    /// The node at the other end of that link.
    pub node: NodeId,
}

/// Where forwarding decisions come from.
///
/// The simulation consults the oracle once per hop; it does not model
/// routing-protocol convergence, so the oracle is expected to be stable
/// for the whole run. The default implementation is [`ShortestPath`];
/// swap in another one to study a different forwarding policy on the
/// same topology.
pub trait RoutingOracle {
    /// The next hop from `at` towards the node owning `dest`, or `None`
    /// if the oracle knows no route (the packet is then dropped and
    /// counted lost).
    fn next_hop(&self, at: NodeId, dest: Ipv4Addr) -> Option<NextHop>;
}

/// One line of a node's forwarding table, as reported by
/// [`ShortestPath::routes_from`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    /// The destination address this line matches.
    pub destination: Ipv4Addr,
    /// The neighbour the packet is handed to.
    pub next_hop: NodeId,
    /// The link carrying the packet to that neighbour.
    pub link: LinkId,
}

/// Hop-count shortest paths over the whole topology, computed once.
///
/// A breadth-first search from every node fills a complete forwarding
/// table: node × destination address → next hop. Neighbours are visited
/// in [`NodeId`] order, so when several paths tie on hop count the one
/// through the smallest-id neighbour wins, and the same topology always
/// yields the same tables.
///
/// # Example
///
/// ```
/// use routesim_core::{ShortestPath, RoutingOracle, topology::Topology};
///
/// let mut builder = Topology::builder();
/// let a = builder.host("A");
/// let r = builder.router("R1");
/// let b = builder.host("B");
/// builder.bind(b, "10.1.1.2/24".parse().unwrap());
/// builder.link(a, r).apply();
/// builder.link(r, b).apply();
/// let topology = builder.build().unwrap();
///
/// let routes = ShortestPath::compute(&topology);
/// let hop = routes.next_hop(a, "10.1.1.2".parse().unwrap()).unwrap();
/// assert_eq!(hop.node, r);
/// ```
#[derive(Debug, Clone)]
pub struct ShortestPath {
    // (source node, destination node) -> next hop
    tables: HashMap<(NodeId, NodeId), NextHop>,
    by_address: HashMap<Ipv4Addr, NodeId>,
}

impl ShortestPath {
    /// Compute the forwarding tables of every node of `topology`.
    pub fn compute(topology: &Topology) -> Self {
        let mut adjacency: BTreeMap<NodeId, Vec<(NodeId, LinkId)>> = topology
            .nodes()
            .map(|node| (node.id(), Vec::new()))
            .collect();
        for (link_id, _) in topology.links() {
            let (a, b) = link_id.into_nodes();
            adjacency.entry(a).or_default().push((b, link_id));
            adjacency.entry(b).or_default().push((a, link_id));
        }
        for neighbours in adjacency.values_mut() {
            neighbours.sort_unstable_by_key(|(node, _)| *node);
        }

        let mut tables = HashMap::new();
        for source in adjacency.keys().copied() {
            // BFS from `source`; remember the first hop taken to reach
            // each node.
            let mut first_hop: HashMap<NodeId, NextHop> = HashMap::new();
            let mut queue = VecDeque::new();
            queue.push_back(source);
            first_hop.insert(
                source,
                NextHop {
                    link: LinkId::new((source, source)),
                    node: source,
                },
            );
            while let Some(current) = queue.pop_front() {
                let via = first_hop[&current];
                for (neighbour, link) in &adjacency[&current] {
                    if first_hop.contains_key(neighbour) {
                        continue;
                    }
                    let hop = if current == source {
                        NextHop {
                            link: *link,
                            node: *neighbour,
                        }
                    } else {
                        via
                    };
                    first_hop.insert(*neighbour, hop);
                    queue.push_back(*neighbour);
                }
            }
            for (reached, hop) in first_hop {
                if reached != source {
                    tables.insert((source, reached), hop);
                }
            }
        }

        let by_address = topology
            .nodes()
            .flat_map(|node| {
                node.addresses()
                    .iter()
                    .map(move |address| (address.ip(), node.id()))
            })
            .collect();

        Self { tables, by_address }
    }

    /// The forwarding table of `node`, one entry per known destination
    /// address, sorted by destination.
    pub fn routes_from(&self, node: NodeId) -> Vec<RouteEntry> {
        let mut entries: Vec<RouteEntry> = self
            .by_address
            .iter()
            .filter_map(|(destination, owner)| {
                let hop = self.tables.get(&(node, *owner))?;
                Some(RouteEntry {
                    destination: *destination,
                    next_hop: hop.node,
                    link: hop.link,
                })
            })
            .collect();
        entries.sort_unstable_by_key(|entry| entry.destination);
        entries
    }
}

impl RoutingOracle for ShortestPath {
    fn next_hop(&self, at: NodeId, dest: Ipv4Addr) -> Option<NextHop> {
        let owner = *self.by_address.get(&dest)?;
        if owner == at {
            // Local delivery is handled by the caller, not the oracle.
            return None;
        }
        self.tables.get(&(at, owner)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_topology() -> (Topology, NodeId, NodeId, NodeId) {
        // A -- R1 -- B
        let mut builder = Topology::builder();
        let a = builder.host("A");
        let r1 = builder.router("R1");
        let b = builder.host("B");
        builder.bind(a, "10.1.0.1/24".parse().unwrap());
        builder.bind(b, "10.1.1.1/24".parse().unwrap());
        builder.link(a, r1).apply();
        builder.link(r1, b).apply();
        (builder.build().unwrap(), a, r1, b)
    }

    #[test]
    fn routes_through_intermediate_router() {
        let (topology, a, r1, b) = line_topology();
        let routes = ShortestPath::compute(&topology);

        let dest: Ipv4Addr = "10.1.1.1".parse().unwrap();
        let hop = routes.next_hop(a, dest).unwrap();
        assert_eq!(hop.node, r1);
        assert_eq!(hop.link, LinkId::new((a, r1)));

        let hop = routes.next_hop(r1, dest).unwrap();
        assert_eq!(hop.node, b);
    }

    #[test]
    fn no_route_to_unknown_destination() {
        let (topology, a, ..) = line_topology();
        let routes = ShortestPath::compute(&topology);

        assert!(routes.next_hop(a, "192.168.0.1".parse().unwrap()).is_none());
    }

    #[test]
    fn own_address_has_no_next_hop() {
        let (topology, a, ..) = line_topology();
        let routes = ShortestPath::compute(&topology);

        assert!(routes.next_hop(a, "10.1.0.1".parse().unwrap()).is_none());
    }

    #[test]
    fn disconnected_node_is_unreachable() {
        let mut builder = Topology::builder();
        let a = builder.host("A");
        let b = builder.host("B");
        let c = builder.host("C");
        builder.bind(c, "10.1.2.1/24".parse().unwrap());
        builder.link(a, b).apply();

        let topology = builder.build().unwrap();
        let routes = ShortestPath::compute(&topology);
        assert!(routes.next_hop(a, "10.1.2.1".parse().unwrap()).is_none());
    }

    #[test]
    fn ties_break_towards_smaller_neighbour_id() {
        // Two equal-length paths from A to B: through R1 (smaller id)
        // and through R2. R1 must win, deterministically.
        let mut builder = Topology::builder();
        let a = builder.host("A");
        let r1 = builder.router("R1");
        let r2 = builder.router("R2");
        let b = builder.host("B");
        builder.bind(b, "10.1.1.1/24".parse().unwrap());
        builder.link(a, r2).apply();
        builder.link(a, r1).apply();
        builder.link(r1, b).apply();
        builder.link(r2, b).apply();

        let topology = builder.build().unwrap();
        let routes = ShortestPath::compute(&topology);
        let hop = routes.next_hop(a, "10.1.1.1".parse().unwrap()).unwrap();
        assert_eq!(hop.node, r1);
    }

    #[test]
    fn routes_from_lists_all_destinations() {
        let (topology, a, r1, b) = line_topology();
        let routes = ShortestPath::compute(&topology);

        let table = routes.routes_from(a);
        // One line per remote address plus none for A's own interface.
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].destination, "10.1.1.1".parse::<Ipv4Addr>().unwrap());
        assert_eq!(table[0].next_hop, r1);

        let table = routes.routes_from(r1);
        assert_eq!(table.len(), 2);
        assert!(table.iter().any(|e| e.next_hop == a));
        assert!(table.iter().any(|e| e.next_hop == b));
    }
}
