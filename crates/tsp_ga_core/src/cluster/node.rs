use std::time::Duration;

use crossbeam_channel::Sender;
use rayon::prelude::*;

use crate::{
    Envelope, EvolutionParams, GaOptions, MigrationBus, Result, RingDirection, Tour, WorkerUnit,
    logging::{self, LogContext},
    reduce,
    ring::successor,
};

/// Per-node settings, derived from the run options.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub rank: usize,
    pub nodes: usize,
    pub workers: usize,
    pub ga_iterations: usize,
    pub migration_rounds: usize,
    pub elite_count: usize,
    pub direction: RingDirection,
    pub timeout: Duration,
}

impl NodeConfig {
    pub fn from_options(rank: usize, options: &GaOptions) -> Self {
        Self {
            rank,
            nodes: options.nodes,
            workers: options.workers,
            ga_iterations: options.ga_iterations,
            migration_rounds: options.migration_rounds,
            elite_count: options.elite_count,
            direction: options.ring_direction,
            timeout: options.migration_timeout(),
        }
    }

    /// Node this one ships its elites to.
    pub fn target_node(&self) -> usize {
        self.direction.target(self.rank, self.nodes)
    }

    /// Worker that ships this node's elites out.
    pub fn exporter(&self) -> usize {
        0
    }

    /// Worker that takes inbound elites in.
    pub fn importer(&self) -> usize {
        self.workers - 1
    }
}

/// Drives the workers of one node through the evolve/migrate rounds.
#[derive(Debug)]
pub struct NodeCoordinator<'bus> {
    config: NodeConfig,
    workers: Vec<WorkerUnit>,
    inboxes: Vec<Sender<Vec<Tour>>>,
    bus: &'bus MigrationBus,
}

impl<'bus> NodeCoordinator<'bus> {
    /// `seeds` holds one seed per worker.
    pub fn new(
        config: NodeConfig,
        initial: &Tour,
        params: EvolutionParams,
        seeds: &[u64],
        bus: &'bus MigrationBus,
    ) -> Self {
        let (workers, inboxes): (Vec<_>, Vec<_>) = seeds
            .iter()
            .take(config.workers)
            .enumerate()
            .map(|(rank, &seed)| WorkerUnit::spawn(rank, initial, params, seed))
            .unzip();

        Self {
            config,
            workers,
            inboxes,
            bus,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn workers(&self) -> &[WorkerUnit] {
        &self.workers
    }

    /// Shortest tour held by any worker of the node.
    pub fn best(&self) -> Option<&Tour> {
        self.workers
            .iter()
            .filter_map(WorkerUnit::best)
            .reduce(reduce)
    }

    /// Runs every round and returns the node's best tour.
    #[tsp_ga_derive::timer("node.run")]
    pub fn run(mut self) -> Result<Option<Tour>> {
        let _context = logging::enter(LogContext::node(self.config.rank));
        log::debug!(
            "node.start: node={} workers={} rounds={} target={}",
            self.config.rank,
            self.workers.len(),
            self.config.migration_rounds,
            self.config.target_node()
        );

        for round in 0..self.config.migration_rounds {
            self.evolve_phase();
            self.migrate_phase(round)?;

            log::info!(
                "node.round: node={} round={round} best={:.3}",
                self.config.rank,
                self.best().map_or(f64::NAN, Tour::length)
            );
        }

        Ok(self.best().cloned())
    }

    /// Every worker drains its inbox and evolves; returns once all are done.
    fn evolve_phase(&mut self) {
        let generations = self.config.ga_iterations;
        let node = self.config.rank;
        self.workers.par_iter_mut().for_each(|worker| {
            let _context = logging::enter(LogContext::worker(node, worker.rank()));
            worker.evolve(generations);
        });
    }

    fn migrate_phase(&mut self, round: usize) -> Result<()> {
        let w = self.workers.len();
        let exporter = self.config.exporter();
        let importer = self.config.importer();

        for r in 0..w {
            if r == exporter {
                let tours = self.workers[r]
                    .population()
                    .extract_best(self.config.elite_count);
                self.bus.send(Envelope {
                    source_node: self.config.rank,
                    dest_node: self.config.target_node(),
                    dest_worker: importer,
                    round,
                    tours,
                })?;
            }

            if r != importer {
                let snapshot = self.workers[r].population().snapshot();
                self.deliver(successor(r, w), snapshot);
            } else {
                match self.bus.take(self.config.rank, importer, self.config.timeout) {
                    Some(envelope) => {
                        log::debug!(
                            "node.migrate: node={} round={round} from={} sent_round={} tours={}",
                            self.config.rank,
                            envelope.source_node,
                            envelope.round,
                            envelope.tours.len()
                        );
                        self.deliver(r, envelope.tours);
                    }
                    None => {
                        log::warn!(
                            "node.migrate: node={} round={round} no elites from node={} within {:?}; skipping",
                            self.config.rank,
                            self.config.direction.source(self.config.rank, self.config.nodes),
                            self.config.timeout
                        );
                    }
                }
            }
        }

        Ok(())
    }

    fn deliver(&self, worker: usize, tours: Vec<Tour>) {
        if self.inboxes[worker].send(tours).is_err() {
            log::warn!(
                "node.migrate: node={} worker={worker} inbox closed",
                self.config.rank
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{NodeConfig, NodeCoordinator};
    use crate::{Envelope, EvolutionParams, MigrationBus, RandomPointSource, RingDirection, Tour};

    fn instance() -> Tour {
        let mut source = RandomPointSource::new(12, 100.0, 5);
        Tour::from_source(&mut source).expect("instance")
    }

    fn config(rank: usize, nodes: usize, workers: usize, rounds: usize) -> NodeConfig {
        NodeConfig {
            rank,
            nodes,
            workers,
            ga_iterations: 3,
            migration_rounds: rounds,
            elite_count: 2,
            direction: RingDirection::AntiClockwise,
            timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn migration_follows_the_worker_ring_and_feeds_the_importer() {
        let initial = instance();
        let bus = MigrationBus::new(1);
        let mut node = NodeCoordinator::new(
            config(0, 1, 3, 1),
            &initial,
            EvolutionParams::new(6),
            &[1, 2, 3],
            &bus,
        );

        node.migrate_phase(0).expect("migrate");

        // Worker 0 receives nothing: worker 2 closes the ring through the bus only.
        assert_eq!(node.workers[0].drain_inbox(), 0);
        // Worker 1 gets worker 0's whole snapshot.
        assert_eq!(node.workers[1].drain_inbox(), 6);
        // Worker 2 gets worker 1's snapshot plus worker 0's two elites via the bus.
        assert_eq!(node.workers[2].drain_inbox(), 6 + 2);
        assert_eq!(node.workers[2].population().len(), 14);
        assert_eq!(node.workers[0].population().len(), 6);
        assert!(bus.take(0, 2, Duration::from_millis(1)).is_none());
    }

    #[test]
    fn immigrants_from_the_bus_reach_the_last_worker() {
        let initial = instance();
        let bus = MigrationBus::new(2);
        let mut node = NodeCoordinator::new(
            config(1, 2, 2, 1),
            &initial,
            EvolutionParams::new(4),
            &[5, 6],
            &bus,
        );
        let foreign: Vec<Tour> = (0..3).map(|_| initial.clone()).collect();
        bus.send(Envelope {
            source_node: 0,
            dest_node: 1,
            dest_worker: 1,
            round: 0,
            tours: foreign,
        })
        .expect("send");

        node.migrate_phase(0).expect("migrate");

        assert_eq!(node.workers[0].drain_inbox(), 0);
        assert_eq!(node.workers[1].drain_inbox(), 4 + 3);
        // Node 1 exports anti-clockwise to node 0.
        let out = bus.take(0, 1, Duration::from_millis(10)).expect("exported elites");
        assert_eq!((out.source_node, out.tours.len()), (1, 2));
    }

    #[test]
    fn exporter_and_importer_coincide_for_single_worker() {
        let cfg = config(0, 1, 1, 1);
        assert_eq!(cfg.exporter(), cfg.importer());
        assert_eq!(cfg.target_node(), 0);
    }

    #[test]
    fn single_node_loops_elites_back_to_itself() {
        let initial = instance();
        let bus = MigrationBus::new(1);
        let node = NodeCoordinator::new(
            config(0, 1, 3, 2),
            &initial,
            EvolutionParams::new(10),
            &[1, 2, 3],
            &bus,
        );
        assert_eq!(node.workers().len(), 3);

        let best = node.run().expect("run").expect("best tour");
        assert!(best.is_permutation_of(&initial));
        assert!(bus.take(0, 2, Duration::from_millis(1)).is_none());
    }

    #[test]
    fn single_worker_single_node_runs() {
        let initial = instance();
        let bus = MigrationBus::new(1);
        let node = NodeCoordinator::new(
            config(0, 1, 1, 3),
            &initial,
            EvolutionParams::new(8),
            &[9],
            &bus,
        );
        let best = node.run().expect("run").expect("best tour");
        assert_eq!(best.len(), initial.len());
    }

    #[test]
    fn missing_neighbour_times_out_and_round_is_skipped() {
        let initial = instance();
        let bus = MigrationBus::new(2);
        let mut cfg = config(0, 2, 2, 2);
        cfg.timeout = Duration::from_millis(20);
        let node = NodeCoordinator::new(cfg, &initial, EvolutionParams::new(8), &[4, 5], &bus);

        let best = node.run().expect("run").expect("best tour");
        assert!(best.is_permutation_of(&initial));

        // Node 1 never ran, so its mailbox holds both rounds of node 0's elites.
        let first = bus.take(1, 1, Duration::from_millis(10)).expect("round 0");
        let second = bus.take(1, 1, Duration::from_millis(10)).expect("round 1");
        assert_eq!((first.round, second.round), (0, 1));
        assert_eq!(first.tours.len(), 2);
    }

    #[test]
    fn node_best_is_minimum_over_workers() {
        let initial = instance();
        let bus = MigrationBus::new(1);
        let node = NodeCoordinator::new(
            config(0, 1, 3, 1),
            &initial,
            EvolutionParams::new(6),
            &[7, 8, 9],
            &bus,
        );
        let expected = node
            .workers()
            .iter()
            .filter_map(|w| w.best())
            .map(Tour::length)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(node.best().expect("best").length(), expected);
    }
}
