use crate::measure::{Capacity, PropagationDelay};
use std::time::Duration;

/// Default one-way propagation delay of a [`Link`].
///
/// ```
/// # use routesim_core::defaults::*;
/// assert_eq!(
///     DEFAULT_PROPAGATION_DELAY.to_string(),
///     "2ms"
/// );
/// ```
///
/// [`Link`]: crate::topology::Link
pub const DEFAULT_PROPAGATION_DELAY: PropagationDelay =
    PropagationDelay::new(Duration::from_millis(2));

/// Default nominal capacity of a [`Link`].
///
/// ```
/// # use routesim_core::defaults::*;
/// assert_eq!(
///     DEFAULT_CAPACITY.to_string(),
///     "1Mbps"
/// );
/// ```
///
/// [`Link`]: crate::topology::Link
pub const DEFAULT_CAPACITY: Capacity = Capacity::from_bps(1_000_000);

/// Default destination port for generated traffic (the echo port).
pub const DEFAULT_PORT: u16 = 9;

/// Source port used by generated traffic.
pub const DEFAULT_EPHEMERAL_PORT: u16 = 49_152;

/// Default size of a generated packet, in bytes.
pub const DEFAULT_PACKET_SIZE: u64 = 1_024;

/// Default number of packets emitted per ordered host pair.
pub const DEFAULT_PACKET_COUNT: u32 = 1_000;

/// Default interval between two packets of the same pair.
pub const DEFAULT_EMISSION_INTERVAL: Duration = Duration::from_millis(10);

/// Default base start time for traffic emission.
///
/// Each ordered host pair starts at this base plus a per-pair stagger so
/// that not every flow saturates the shared links at the same instant.
pub const DEFAULT_EMISSION_START: Duration = Duration::from_secs(2);

/// Default per-pair stagger added to the emission start time.
pub const DEFAULT_EMISSION_STAGGER: Duration = Duration::from_secs(1);

/// Default time at which traffic emission stops.
pub const DEFAULT_EMISSION_STOP: Duration = Duration::from_secs(10);

/// Default simulation horizon.
///
/// Events due after the horizon are silently dropped; this is the only
/// cancellation mechanism of the simulation.
pub const DEFAULT_HORIZON: Duration = Duration::from_secs(60);
