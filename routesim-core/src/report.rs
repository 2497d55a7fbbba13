use crate::{
    flow::EndpointName,
    routing::RoutingOracle,
    sim::Simulation,
    stats::{QueueSample, StatsCollector},
    topology::{LinkId, Topology},
    traffic::TrafficMatrix,
};
use std::fmt;

/// A host-by-host matrix of measurement figures.
///
/// Rows are sources and columns destinations, both indexed by the
/// alphabetic rank of the host name; the diagonal always holds the
/// default value (a host does not send to itself). The label order is a
/// property of the topology, not of the traffic, so matrices from
/// different runs over the same topology line up cell for cell.
#[derive(Debug, Clone, PartialEq)]
pub struct SquareMatrix<T> {
    labels: Vec<EndpointName>,
    cells: Vec<T>,
}

impl<T: Copy + Default> SquareMatrix<T> {
    /// Create a zeroed matrix over the given labels.
    ///
    /// Labels must already be sorted; [`Topology::host_names`] provides
    /// them in the right order.
    pub(crate) fn new(labels: Vec<EndpointName>) -> Self {
        let dim = labels.len();
        Self {
            labels,
            cells: vec![T::default(); dim * dim],
        }
    }

    /// The number of rows (and columns).
    #[inline]
    pub fn dim(&self) -> usize {
        self.labels.len()
    }

    /// The row/column labels, in index order.
    pub fn labels(&self) -> &[EndpointName] {
        &self.labels
    }

    /// The alphabetic rank of `name`, if it labels this matrix.
    pub fn index_of(&self, name: &EndpointName) -> Option<usize> {
        self.labels.binary_search(name).ok()
    }

    /// The cell at row `i`, column `j`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn get(&self, i: usize, j: usize) -> T {
        assert!(i < self.dim() && j < self.dim(), "index out of bounds");
        self.cells[i * self.dim() + j]
    }

    pub(crate) fn set(&mut self, i: usize, j: usize, value: T) {
        let dim = self.dim();
        self.cells[i * dim + j] = value;
    }
}

impl fmt::Display for SquareMatrix<f64> {
    /// Fixed-width table with six decimals, header row and row labels.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<4}", "")?;
        for label in &self.labels {
            write!(f, "{label:>12}")?;
        }
        writeln!(f)?;
        for (i, label) in self.labels.iter().enumerate() {
            write!(f, "{label:<4}")?;
            for j in 0..self.dim() {
                write!(f, "{:>12.6}", self.get(i, j))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for SquareMatrix<u64> {
    /// Fixed-width table of counts, header row and row labels.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<4}", "")?;
        for label in &self.labels {
            write!(f, "{label:>8}")?;
        }
        writeln!(f)?;
        for (i, label) in self.labels.iter().enumerate() {
            write!(f, "{label:<4}")?;
            for j in 0..self.dim() {
                write!(f, "{:>8}", self.get(i, j))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Read-only view turning raw counters into host-by-host matrices.
///
/// Only flows whose both endpoints are hosts of the topology appear in
/// the matrices; flows involving routers or unattributable addresses
/// are skipped (their raw counters remain available through the
/// [`StatsCollector`]).
///
/// # Example
///
/// ```
/// use routesim_core::{Simulation, topology::Topology};
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
/// sim.run(Duration::from_secs(1)).unwrap();
///
/// let delay = sim.report().delay_matrix();
/// assert_eq!(delay.dim(), 2);
/// assert_eq!(delay.get(0, 0), 0.0);
/// ```
pub struct Report<'a> {
    topology: &'a Topology,
    stats: &'a StatsCollector,
}

impl<'a> Report<'a> {
    pub fn new(topology: &'a Topology, stats: &'a StatsCollector) -> Self {
        Self { topology, stats }
    }

    fn labels(&self) -> Vec<EndpointName> {
        self.topology
            .host_names()
            .into_iter()
            .map(EndpointName::new)
            .collect()
    }

    fn flow_matrix<T, F>(&self, figure: F) -> SquareMatrix<T>
    where
        T: Copy + Default,
        F: Fn(&crate::stats::FlowStats) -> T,
    {
        let mut matrix = SquareMatrix::new(self.labels());
        for (key, stats) in self.stats.flows() {
            let (Some(i), Some(j)) = (matrix.index_of(&key.src), matrix.index_of(&key.dst))
            else {
                continue;
            };
            matrix.set(i, j, figure(stats));
        }
        matrix
    }

    /// Mean end-to-end delay per host pair, in seconds.
    pub fn delay_matrix(&self) -> SquareMatrix<f64> {
        self.flow_matrix(|stats| stats.average_delay())
    }

    /// Delay-variation figure per host pair, in seconds.
    pub fn variance_matrix(&self) -> SquareMatrix<f64> {
        self.flow_matrix(|stats| stats.delay_variance())
    }

    /// Packets lost in transit per host pair.
    pub fn loss_matrix(&self) -> SquareMatrix<u64> {
        self.flow_matrix(|stats| stats.lost_packets)
    }

    /// Packets delivered per host pair.
    pub fn delivered_matrix(&self) -> SquareMatrix<u64> {
        self.flow_matrix(|stats| stats.rx_packets)
    }

    /// The offered load of `traffic`, laid out over this topology's
    /// hosts.
    pub fn offered_load_matrix(&self, traffic: &TrafficMatrix) -> SquareMatrix<u64> {
        let mut matrix = SquareMatrix::new(self.labels());
        for (src, dst, packets) in traffic.iter() {
            let (Some(i), Some(j)) = (matrix.index_of(src), matrix.index_of(dst)) else {
                continue;
            };
            matrix.set(i, j, packets);
        }
        matrix
    }

    /// The probed queue timelines, in link order.
    pub fn queue_timelines(&self) -> impl Iterator<Item = (LinkId, &[QueueSample])> {
        self.stats.queue_timelines()
    }
}

impl<O: RoutingOracle> Simulation<O> {
    /// A reporting view over this simulation's topology and counters.
    pub fn report(&self) -> Report<'_> {
        Report::new(self.topology(), self.stats())
    }
}
