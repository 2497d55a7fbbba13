use crate::topology::Address;
use std::fmt;

/// The identifier of a node in the topology.
///
/// Identifiers are assigned sequentially by the [`TopologyBuilder`];
/// [`NodeId::ZERO`] is a sentinel that is never assigned to a real node.
///
/// [`TopologyBuilder`]: crate::topology::TopologyBuilder
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    pub const ZERO: Self = NodeId::new(0);
    pub const ONE: Self = NodeId::new(1);

    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use = "function does not modify the current value"]
    pub(crate) fn next(self) -> Self {
        Self::new(self.0 + 1)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The role of a node in the topology.
///
/// Only hosts terminate traffic: packets are emitted by hosts and
/// delivered at hosts. Routers forward packets according to the
/// [`RoutingOracle`] and never appear in the reported matrices.
///
/// [`RoutingOracle`]: crate::RoutingOracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// An end host; named with a single letter ("A", "B", …).
    Host,
    /// A forwarding router; named "R1", "R2", ….
    Router,
}

/// A node of the topology: identity, role, display name and the set of
/// addresses bound to its interfaces.
///
/// Nodes are created once at topology build time and are immutable
/// afterwards.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    role: Role,
    name: String,
    addresses: Vec<Address>,
}

impl Node {
    pub(crate) fn new(id: NodeId, role: Role, name: String) -> Self {
        Self {
            id,
            role,
            name,
            addresses: Vec::new(),
        }
    }

    pub(crate) fn push_address(&mut self, address: Address) {
        self.addresses.push(address);
    }

    /// The node's identifier.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node's role.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// The node's display name ("A" for a host, "R1" for a router).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The addresses bound to this node's interfaces.
    #[inline]
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// Returns `true` if any of this node's interfaces owns `ip`.
    pub fn owns(&self, ip: std::net::Ipv4Addr) -> bool {
        self.addresses.iter().any(|a| a.ip() == ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids() {
        let id = NodeId::ZERO.next();
        assert_eq!(id, NodeId::ONE);
        assert!(id < id.next());
    }

    #[test]
    fn owns_bound_address() {
        let mut node = Node::new(NodeId::ONE, Role::Host, "A".to_owned());
        node.push_address("10.1.0.1/24".parse().unwrap());

        assert!(node.owns("10.1.0.1".parse().unwrap()));
        assert!(!node.owns("10.1.0.2".parse().unwrap()));
    }
}
