use std::thread;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    Error, EvolutionParams, GaOptions, GlobalReducer, MigrationBus, NodeConfig, NodeCoordinator,
    Result, Tour,
};

/// Derives `count` worker seeds from one base seed.
pub(crate) fn generate_seeds(base_seed: u64, count: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(base_seed);
    (0..count).map(|_| rng.random::<u64>()).collect()
}

/// A panicked node thread becomes `Error::Migration`.
fn node_result(rank: usize, joined: thread::Result<Result<Option<Tour>>>) -> Result<Option<Tour>> {
    joined.unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| String::from("unknown panic"));
        Err(Error::migration(format!("node {rank} panicked: {reason}")))
    })
}

/// Runs the island GA on `options.nodes` node threads and returns the shortest
/// tour any of them found.
///
/// `None` only when no node produced a tour.
#[tsp_ga_derive::timer("solver")]
pub fn solve(initial: &Tour, options: &GaOptions) -> Result<Option<Tour>> {
    options.validate()?;
    if initial.is_empty() {
        return Err(Error::invalid_input("initial tour has no cities"));
    }

    let nodes = options.nodes;
    let workers = options.workers;
    let params =
        EvolutionParams::new(options.population_size).with_mutation_rate(options.mutation_rate);
    let seeds = generate_seeds(options.seed, nodes * workers);
    let bus = MigrationBus::new(nodes);

    log::info!(
        "solver: start n={} nodes={nodes} workers={workers} rounds={} iterations={} population={}",
        initial.len(),
        options.migration_rounds,
        options.ga_iterations,
        options.population_size
    );

    let results = thread::scope(|scope| -> Result<Vec<(usize, Result<Option<Tour>>)>> {
        let mut handles = Vec::with_capacity(nodes);
        let mut spawn_error = None;

        for (rank, node_seeds) in seeds.chunks(workers).enumerate() {
            let bus = &bus;
            let config = NodeConfig::from_options(rank, options);

            let spawned = thread::Builder::new()
                .name(format!("node-{rank}"))
                .spawn_scoped(scope, move || {
                    NodeCoordinator::new(config, initial, params, node_seeds, bus).run()
                });
            match spawned {
                Ok(handle) => handles.push((rank, handle)),
                Err(e) => {
                    spawn_error = Some(Error::other(format!("failed to spawn node {rank}: {e}")));
                    break;
                }
            }
        }

        // Join everything already running before reporting a spawn failure.
        let joined = handles
            .into_iter()
            .map(|(rank, handle)| (rank, node_result(rank, handle.join())))
            .collect();
        match spawn_error {
            Some(err) => Err(err),
            None => Ok(joined),
        }
    })?;

    let mut reducer = GlobalReducer::new();
    for (rank, result) in results {
        match result? {
            Some(tour) => {
                log::debug!("solver.node: node={rank} length={:.3}", tour.length());
                reducer.offer(tour);
            }
            None => log::warn!("solver.node: node={rank} returned no tour"),
        }
    }

    match reducer.best() {
        Some(best) => log::info!(
            "solver: done nodes={} best={:.3}",
            reducer.candidates(),
            best.length()
        ),
        None => log::warn!("solver: done without a tour"),
    }

    Ok(reducer.finish())
}
