use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::{EvolutionParams, Population, Tour};

/// One evolution slot of a node: a population and the inbox its ring
/// predecessor delivers into.
#[derive(Debug)]
pub struct WorkerUnit {
    rank: usize,
    population: Population,
    inbox: Receiver<Vec<Tour>>,
}

impl WorkerUnit {
    /// Builds the worker together with the sending half of its inbox.
    pub fn spawn(
        rank: usize,
        initial: &Tour,
        params: EvolutionParams,
        seed: u64,
    ) -> (Self, Sender<Vec<Tour>>) {
        let (tx, rx) = unbounded();
        let worker = Self {
            rank,
            population: Population::seeded(initial, params, seed),
            inbox: rx,
        };
        (worker, tx)
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn best(&self) -> Option<&Tour> {
        self.population.best()
    }

    /// Ingests every batch delivered since the last call. Returns the tour count.
    pub fn drain_inbox(&mut self) -> usize {
        let mut received = 0;
        for batch in self.inbox.try_iter() {
            received += batch.len();
            self.population.ingest(batch);
        }
        received
    }

    pub fn evolve(&mut self, generations: usize) {
        let received = self.drain_inbox();
        if received > 0 {
            log::debug!(
                "worker.ingest: worker={} tours={received} size={}",
                self.rank,
                self.population.len()
            );
        }
        self.population.run_ga(generations);
    }
}
