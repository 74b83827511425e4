//! Island-model genetic algorithm for the Euclidean travelling salesman problem.
//!
//! Workers evolve independent populations, pass snapshots around an intra-node
//! ring, and nodes exchange elite tours around an inter-node ring between GA
//! rounds. The shortest tour over all nodes is the result.

mod cluster;
mod error;
mod ga;
mod io;
pub mod logging;
mod solver;

pub(crate) use cluster::ring;
pub(crate) use ga::{operators, population};
pub(crate) use io::options;

pub use cluster::node::{NodeConfig, NodeCoordinator};
pub use cluster::reducer::{GlobalReducer, reduce};
pub use cluster::ring::RingDirection;
pub use cluster::transport::{Envelope, MigrationBus};
pub use cluster::worker::WorkerUnit;
pub use error::{Error, Result};
pub use ga::operators::ordered_crossover;
pub use ga::point::Point;
pub use ga::population::{EvolutionParams, Population};
pub use ga::tour::Tour;
pub use io::options::{GaOptions, LogFormat, LogLevel};
pub use io::points::{ListPointSource, PointSource, PointSourceSpec, RandomPointSource};
pub use io::report::{TourReport, write_report};
pub use solver::solve;
