use crate::{defaults, flow::EndpointName};
use rand_core::Rng;
use std::{collections::BTreeMap, time::Duration};

/// The offered load between every ordered pair of hosts, in packets.
///
/// Cells are keyed by `(source, destination)` endpoint names; the
/// diagonal is structurally absent (a host never addresses itself) and
/// unset cells read as zero.
///
/// # Example
///
/// ```
/// use routesim_core::{EndpointName, TrafficMatrix};
///
/// let mut matrix = TrafficMatrix::new();
/// matrix.set(EndpointName::new("A"), EndpointName::new("B"), 1_000);
/// assert_eq!(matrix.get(&EndpointName::new("A"), &EndpointName::new("B")), 1_000);
/// assert_eq!(matrix.get(&EndpointName::new("B"), &EndpointName::new("A")), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TrafficMatrix {
    cells: BTreeMap<(EndpointName, EndpointName), u64>,
}

impl TrafficMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the matrix with Poisson(`lambda`) draws for every ordered
    /// pair of distinct hosts.
    ///
    /// Pairs are visited in the order of `hosts`, one draw each, so a
    /// given seed and host list always produce the same matrix.
    pub fn poisson<R: Rng>(hosts: &[EndpointName], lambda: f64, rng: &mut R) -> Self {
        let mut matrix = Self::new();
        for src in hosts {
            for dst in hosts {
                if src == dst {
                    continue;
                }
                matrix.set(src.clone(), dst.clone(), poisson_draw(lambda, rng));
            }
        }
        matrix
    }

    /// The offered load from `src` to `dst`; zero if unset.
    pub fn get(&self, src: &EndpointName, dst: &EndpointName) -> u64 {
        self.cells
            .get(&(src.clone(), dst.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Set the offered load from `src` to `dst`.
    ///
    /// Self-pairs are ignored: the diagonal stays empty.
    pub fn set(&mut self, src: EndpointName, dst: EndpointName, packets: u64) {
        if src == dst {
            return;
        }
        self.cells.insert((src, dst), packets);
    }

    /// All set cells, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&EndpointName, &EndpointName, u64)> {
        self.cells.iter().map(|((src, dst), v)| (src, dst, *v))
    }
}

/// One Poisson draw by Knuth's product method.
///
/// Runtime is proportional to the drawn value, fine for the intended
/// per-pair magnitudes (tens to hundreds).
fn poisson_draw<R: Rng>(lambda: f64, rng: &mut R) -> u64 {
    let threshold = (-lambda).exp();
    let mut k = 0u64;
    let mut product = 1.0f64;
    loop {
        product *= uniform(rng);
        if product <= threshold {
            return k;
        }
        k += 1;
    }
}

fn uniform<R: Rng>(rng: &mut R) -> f64 {
    // 53 significant bits, uniform in [0, 1).
    (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
}

/// How each source emits its packets: a fixed-size burst paced at a
/// fixed interval, with start times staggered per host pair.
///
/// The pair `(i, j)` (alphabetic ranks of source and destination)
/// starts emitting at `base_start + (i + j) × stagger` and stops
/// emitting at `stop` even if packets of its burst remain unsent.
/// Packets already in flight at the horizon still count as sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmissionPlan {
    /// Packets per source-destination pair.
    pub packets: u32,
    /// Payload size of every packet, in bytes.
    pub packet_size: u64,
    /// Pacing interval between consecutive packets of one pair.
    pub interval: Duration,
    /// Earliest emission start across all pairs.
    pub base_start: Duration,
    /// Extra start delay per unit of `i + j`.
    pub stagger: Duration,
    /// Absolute time after which no pair emits anymore.
    pub stop: Duration,
    /// Destination port of every emitted packet.
    pub port: u16,
}

impl Default for EmissionPlan {
    fn default() -> Self {
        Self {
            packets: defaults::DEFAULT_PACKET_COUNT,
            packet_size: defaults::DEFAULT_PACKET_SIZE,
            interval: defaults::DEFAULT_EMISSION_INTERVAL,
            base_start: defaults::DEFAULT_EMISSION_START,
            stagger: defaults::DEFAULT_EMISSION_STAGGER,
            stop: defaults::DEFAULT_EMISSION_STOP,
            port: defaults::DEFAULT_PORT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaChaRng;
    use rand_core::SeedableRng;

    fn hosts(names: &[&str]) -> Vec<EndpointName> {
        names.iter().map(|n| EndpointName::new(*n)).collect()
    }

    #[test]
    fn diagonal_stays_empty() {
        let hosts = hosts(&["A", "B", "C"]);
        let mut rng = ChaChaRng::seed_from_u64(42);
        let matrix = TrafficMatrix::poisson(&hosts, 80.0, &mut rng);

        for name in &hosts {
            assert_eq!(matrix.get(name, name), 0);
        }
        assert_eq!(matrix.iter().count(), 6);
    }

    #[test]
    fn seven_hosts_fill_forty_two_cells() {
        let hosts = hosts(&["A", "B", "C", "D", "E", "F", "G"]);
        let mut rng = ChaChaRng::seed_from_u64(42);
        let matrix = TrafficMatrix::poisson(&hosts, 80.0, &mut rng);

        assert_eq!(matrix.iter().count(), 42);
        assert!(matrix.iter().all(|(src, dst, _)| src != dst));
    }

    #[test]
    fn same_seed_same_matrix() {
        let hosts = hosts(&["A", "B", "C", "D"]);
        let matrix_1 =
            TrafficMatrix::poisson(&hosts, 80.0, &mut ChaChaRng::seed_from_u64(7));
        let matrix_2 =
            TrafficMatrix::poisson(&hosts, 80.0, &mut ChaChaRng::seed_from_u64(7));

        for (src, dst, v) in matrix_1.iter() {
            assert_eq!(v, matrix_2.get(src, dst));
        }
    }

    #[test]
    fn draws_concentrate_around_lambda() {
        let mut rng = ChaChaRng::seed_from_u64(1);
        let n = 2_000;
        let sum: u64 = (0..n).map(|_| poisson_draw(80.0, &mut rng)).sum();
        let mean = sum as f64 / n as f64;

        // Mean of 2000 draws at λ=80 stays within a generous band.
        assert!((mean - 80.0).abs() < 2.0, "mean was {mean}");
    }

    #[test]
    fn unset_cell_reads_zero() {
        let matrix = TrafficMatrix::new();
        assert_eq!(
            matrix.get(&EndpointName::new("A"), &EndpointName::new("B")),
            0
        );
    }

    #[test]
    fn set_ignores_self_pair() {
        let mut matrix = TrafficMatrix::new();
        matrix.set(EndpointName::new("A"), EndpointName::new("A"), 99);
        assert_eq!(
            matrix.get(&EndpointName::new("A"), &EndpointName::new("A")),
            0
        );
    }
}
