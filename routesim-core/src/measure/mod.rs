//! Measures attached to the links of a topology: nominal [`Capacity`],
//! one-way [`PropagationDelay`] and the probabilistic [`PacketLoss`] model.

mod capacity;
mod packet_loss;
mod propagation;

pub use self::{
    capacity::{Capacity, CapacityParseError},
    packet_loss::{PacketLoss, PacketLossError, PacketLossParseError},
    propagation::PropagationDelay,
};
