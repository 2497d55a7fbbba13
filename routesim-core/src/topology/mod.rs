//! The topology data model: [`Node`]s with [`Address`]es bound to their
//! interfaces, connected by bidirectional [`Link`]s.
//!
//! A topology is built once through the [`TopologyBuilder`] and is
//! immutable afterwards; the builder validates the configuration at
//! [`build`](TopologyBuilder::build) time and refuses malformed input
//! before any simulation starts.
//!
//! # Example
//!
//! ```
//! use routesim_core::topology::Topology;
//!
//! let mut builder = Topology::builder();
//! let a = builder.host("A");
//! let b = builder.host("B");
//! builder.bind(a, "10.1.0.1/24".parse().unwrap());
//! builder.bind(b, "10.1.1.1/24".parse().unwrap());
//! builder
//!     .link(a, b)
//!     .set_capacity("1Mbps".parse().unwrap())
//!     .set_delay("2ms".parse().unwrap())
//!     .apply();
//! let topology = builder.build().unwrap();
//! assert_eq!(topology.host_names(), ["A", "B"]);
//! ```

mod address;
mod link;
mod node;

pub use self::{
    address::{Address, AddressParseError},
    link::{Link, LinkDirection, LinkId},
    node::{Node, NodeId, Role},
};

use crate::measure::{Capacity, PacketLoss, PropagationDelay};
use std::{
    collections::{BTreeMap, HashMap},
    net::Ipv4Addr,
};
use thiserror::Error;

/// Error returned when the topology configuration is malformed.
///
/// All variants are fatal: the simulation must not start on a topology
/// that failed validation, because nothing downstream can recover
/// meaningfully from, say, an ambiguous address-to-node mapping.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The same address is bound to more than one interface.
    #[error("address {address} is bound more than once")]
    DuplicateAddress { address: Address },
    /// Two nodes share the same display name.
    #[error("display name `{name}' is used by more than one node")]
    DuplicateName { name: String },
    /// A link or binding references a node this builder never created.
    #[error("node {node} is not part of this topology")]
    UnknownNode { node: NodeId },
    /// A link connects a node to itself.
    #[error("node {node} cannot be linked to itself")]
    SelfLink { node: NodeId },
}

/// The immutable description of the simulated network.
///
/// Obtained from a [`TopologyBuilder`]; see the [module](self)
/// documentation for an example.
#[derive(Debug, Clone)]
pub struct Topology {
    nodes: BTreeMap<NodeId, Node>,
    links: BTreeMap<LinkId, Link>,
    by_address: HashMap<Ipv4Addr, NodeId>,
}

impl Topology {
    /// Start building a new topology.
    pub fn builder() -> TopologyBuilder {
        TopologyBuilder {
            nodes: BTreeMap::new(),
            links: Vec::new(),
            bindings: Vec::new(),
            id: NodeId::ZERO,
        }
    }

    /// The node with the given identifier, if any.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// All nodes, in identifier order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// The link with the given identifier, if any.
    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    /// All links, in identifier order.
    pub fn links(&self) -> impl Iterator<Item = (LinkId, &Link)> {
        self.links.iter().map(|(id, link)| (*id, link))
    }

    /// The node owning the interface `ip` was bound to.
    ///
    /// The mapping is total and collision-free for every address ever
    /// bound (enforced at build time).
    pub fn node_for_address(&self, ip: Ipv4Addr) -> Option<NodeId> {
        self.by_address.get(&ip).copied()
    }

    /// The first address bound to `node`, if any.
    ///
    /// This is the address generated traffic targets when the node is a
    /// destination host.
    pub fn address_of(&self, node: NodeId) -> Option<Address> {
        self.nodes.get(&node)?.addresses().first().copied()
    }

    /// The display names of all hosts, sorted alphabetically.
    ///
    /// This ordering defines the row/column indexing of every reported
    /// matrix and is independent of construction order.
    pub fn host_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .nodes
            .values()
            .filter(|n| n.role() == Role::Host)
            .map(|n| n.name())
            .collect();
        names.sort_unstable();
        names
    }

    /// The hosts of the topology, in identifier order.
    pub fn hosts(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| n.role() == Role::Host)
    }
}

/// Builder for a [`Topology`].
///
/// Create nodes with [`host`](Self::host) and [`router`](Self::router),
/// bind addresses with [`bind`](Self::bind), connect nodes with
/// [`link`](Self::link), then call [`build`](Self::build) to validate
/// and freeze the topology.
pub struct TopologyBuilder {
    nodes: BTreeMap<NodeId, Node>,
    links: Vec<(NodeId, NodeId, Link)>,
    bindings: Vec<(NodeId, Address)>,

    /// the last assigned ID
    ///
    /// ID 0 is a sentinel and is never assigned
    id: NodeId,
}

/// Builder for configuring a link between two nodes.
///
/// Obtained via [`TopologyBuilder::link`]. Call
/// [`apply`](LinkBuilder::apply) to commit the configuration.
pub struct LinkBuilder<'a> {
    a: NodeId,
    b: NodeId,
    capacity: Capacity,
    delay: PropagationDelay,
    loss: PacketLoss,
    builder: &'a mut TopologyBuilder,
}

impl LinkBuilder<'_> {
    /// Set the nominal capacity of this link.
    pub fn set_capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the one-way propagation delay of this link.
    pub fn set_delay(mut self, delay: PropagationDelay) -> Self {
        self.delay = delay;
        self
    }

    /// Set the probabilistic loss model of this link.
    pub fn set_loss(mut self, loss: PacketLoss) -> Self {
        self.loss = loss;
        self
    }

    /// Commit the link configuration.
    pub fn apply(self) {
        let Self {
            a,
            b,
            capacity,
            delay,
            loss,
            builder,
        } = self;
        builder.links.push((a, b, Link::new(capacity, delay, loss)));
    }
}

impl TopologyBuilder {
    fn new_node(&mut self, role: Role, name: String) -> NodeId {
        self.id = self.id.next();
        self.nodes.insert(self.id, Node::new(self.id, role, name));
        self.id
    }

    /// Add a host with the given display name (conventionally a single
    /// letter, "A".."Z").
    pub fn host(&mut self, name: impl Into<String>) -> NodeId {
        self.new_node(Role::Host, name.into())
    }

    /// Add a router with the given display name (conventionally "R1",
    /// "R2", …).
    pub fn router(&mut self, name: impl Into<String>) -> NodeId {
        self.new_node(Role::Router, name.into())
    }

    /// Bind an address to one of `node`'s interfaces.
    pub fn bind(&mut self, node: NodeId, address: Address) -> &mut Self {
        self.bindings.push((node, address));
        self
    }

    /// Configure the link between two nodes.
    ///
    /// Defaults: 1 Mbps capacity, 2 ms propagation delay, no loss.
    /// Call [`apply`](LinkBuilder::apply) to commit.
    pub fn link(&mut self, a: NodeId, b: NodeId) -> LinkBuilder<'_> {
        LinkBuilder {
            a,
            b,
            capacity: Capacity::default(),
            delay: PropagationDelay::default(),
            loss: PacketLoss::default(),
            builder: self,
        }
    }

    /// Validate the configuration and freeze it into a [`Topology`].
    ///
    /// # Errors
    ///
    /// - [`ConfigError::DuplicateName`] — two nodes share a display name.
    /// - [`ConfigError::DuplicateAddress`] — an address is bound twice.
    /// - [`ConfigError::UnknownNode`] — a link or binding references a
    ///   node that was not created by this builder.
    /// - [`ConfigError::SelfLink`] — a link connects a node to itself.
    pub fn build(self) -> Result<Topology, ConfigError> {
        let Self {
            mut nodes,
            links,
            bindings,
            id: _,
        } = self;

        let mut seen_names: HashMap<&str, NodeId> = HashMap::new();
        for node in nodes.values() {
            if seen_names.insert(node.name(), node.id()).is_some() {
                return Err(ConfigError::DuplicateName {
                    name: node.name().to_owned(),
                });
            }
        }
        drop(seen_names);

        let mut by_address: HashMap<Ipv4Addr, NodeId> = HashMap::new();
        for (node_id, address) in bindings {
            if !nodes.contains_key(&node_id) {
                return Err(ConfigError::UnknownNode { node: node_id });
            }
            if by_address.insert(address.ip(), node_id).is_some() {
                return Err(ConfigError::DuplicateAddress { address });
            }
            nodes
                .get_mut(&node_id)
                .expect("presence checked just above")
                .push_address(address);
        }

        let mut link_map = BTreeMap::new();
        for (a, b, link) in links {
            if a == b {
                return Err(ConfigError::SelfLink { node: a });
            }
            for endpoint in [a, b] {
                if !nodes.contains_key(&endpoint) {
                    return Err(ConfigError::UnknownNode { node: endpoint });
                }
            }
            link_map.insert(LinkId::new((a, b)), link);
        }

        Ok(Topology {
            nodes,
            links: link_map,
            by_address,
        })
    }
}
