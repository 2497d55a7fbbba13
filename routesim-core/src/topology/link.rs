use crate::{
    measure::{Capacity, PacketLoss, PropagationDelay},
    topology::NodeId,
};
use std::fmt;

/// Unique identifier of the link between two nodes.
///
/// The link is bidirectional and unique for two nodes: for all nodes `n1`
/// and `n2` the identifier `(n1, n2)` is the same as `(n2, n1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkId {
    smaller_id: NodeId,
    larger_id: NodeId,
}

/// One of the two directions of a bidirectional [`LinkId`].
///
/// Each direction has its own outbound queue; traffic in one direction
/// does not occupy the interface of the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LinkDirection {
    /// From the smaller [`NodeId`] towards the larger one.
    Forward,
    /// From the larger [`NodeId`] towards the smaller one.
    Reverse,
}

impl LinkId {
    /// Create the link identifier from the given node tuple; the order of
    /// the tuple does not matter.
    pub fn new((a, b): (NodeId, NodeId)) -> Self {
        if a < b {
            Self {
                smaller_id: a,
                larger_id: b,
            }
        } else {
            Self {
                smaller_id: b,
                larger_id: a,
            }
        }
    }

    /// The [`NodeId`]s composing this link identifier, smaller first.
    #[inline]
    pub fn into_nodes(self) -> (NodeId, NodeId) {
        (self.smaller_id, self.larger_id)
    }

    /// The direction of this link that delivers towards `to`.
    pub fn towards(self, to: NodeId) -> LinkDirection {
        if to == self.larger_id {
            LinkDirection::Forward
        } else {
            LinkDirection::Reverse
        }
    }

    /// The node receiving traffic flowing in `direction`.
    pub fn receiver(self, direction: LinkDirection) -> NodeId {
        match direction {
            LinkDirection::Forward => self.larger_id,
            LinkDirection::Reverse => self.smaller_id,
        }
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.smaller_id, self.larger_id)
    }
}

/// A link of the topology: nominal capacity, one-way propagation delay
/// and loss model. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Link {
    capacity: Capacity,
    delay: PropagationDelay,
    loss: PacketLoss,
}

impl Link {
    pub(crate) fn new(capacity: Capacity, delay: PropagationDelay, loss: PacketLoss) -> Self {
        Self {
            capacity,
            delay,
            loss,
        }
    }

    /// The nominal capacity of the link.
    #[inline]
    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// The one-way propagation delay of the link.
    #[inline]
    pub fn delay(&self) -> PropagationDelay {
        self.delay
    }

    /// The probabilistic loss model applied to packets crossing the link.
    #[inline]
    pub fn loss(&self) -> PacketLoss {
        self.loss
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n1n2_eq_n2n1() {
        let n1 = NodeId::ZERO;
        let n2 = NodeId::ONE;

        assert_eq!(
            LinkId::new((n1, n2)),
            // ==
            LinkId::new((n2, n1)),
        );
    }

    #[test]
    fn directions() {
        let n1 = NodeId::new(1);
        let n2 = NodeId::new(2);
        let link = LinkId::new((n2, n1));

        assert_eq!(link.towards(n2), LinkDirection::Forward);
        assert_eq!(link.towards(n1), LinkDirection::Reverse);
        assert_eq!(link.receiver(LinkDirection::Forward), n2);
        assert_eq!(link.receiver(LinkDirection::Reverse), n1);
    }
}
