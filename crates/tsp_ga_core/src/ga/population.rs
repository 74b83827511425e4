use std::collections::HashSet;

use rand::{Rng, SeedableRng, rngs::SmallRng};

use crate::{
    Tour,
    operators::{draw_cut_points, ordered_crossover, swap_mutation},
};

/// Default share of the offspring buffer hit by swap mutation, in percent.
pub const DEFAULT_MUTATION_RATE: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvolutionParams {
    pub target_size: usize,
    /// Percent of the offspring buffer mutated per generation, `0..=100`.
    pub mutation_rate: u32,
}

impl EvolutionParams {
    pub fn new(target_size: usize) -> Self {
        Self {
            target_size,
            mutation_rate: DEFAULT_MUTATION_RATE,
        }
    }

    pub fn with_mutation_rate(mut self, mutation_rate: u32) -> Self {
        self.mutation_rate = mutation_rate;
        self
    }
}

/// The unit of evolution: tours evolved together by one worker.
///
/// Fitness is relative to `max_length`, the longest tour currently held. Both
/// are refreshed together by `rescale`, after each generation and after each
/// ingestion, so no tour is ever ranked against a stale maximum.
#[derive(Debug)]
pub struct Population {
    tours: Vec<Tour>,
    offspring: Vec<Tour>,
    mating_pool: Vec<usize>,
    params: EvolutionParams,
    max_length: f64,
    rng: SmallRng,
}

impl Population {
    /// `params.target_size` independent shuffles of `initial`.
    pub fn seeded(initial: &Tour, params: EvolutionParams, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let tours = (0..params.target_size)
            .map(|_| initial.shuffled(&mut rng))
            .collect();
        Self::with_rng(tours, params, rng)
    }

    pub fn from_tours(tours: Vec<Tour>, params: EvolutionParams, seed: u64) -> Self {
        Self::with_rng(tours, params, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(tours: Vec<Tour>, params: EvolutionParams, rng: SmallRng) -> Self {
        let mut population = Self {
            tours,
            offspring: Vec::new(),
            mating_pool: Vec::new(),
            params,
            max_length: 0.0,
            rng,
        };
        population.rescale();
        population
    }

    pub fn tours(&self) -> &[Tour] {
        &self.tours
    }

    pub fn len(&self) -> usize {
        self.tours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tours.is_empty()
    }

    pub fn target_size(&self) -> usize {
        self.params.target_size
    }

    pub fn max_length(&self) -> f64 {
        self.max_length
    }

    pub fn mating_pool(&self) -> &[usize] {
        &self.mating_pool
    }

    pub fn offspring(&self) -> &[Tour] {
        &self.offspring
    }

    /// Shortest tour currently held.
    pub fn best(&self) -> Option<&Tour> {
        self.tours
            .iter()
            .min_by(|a, b| a.length().total_cmp(&b.length()))
    }

    fn rescale(&mut self) {
        let max_length = self.tours.iter().map(Tour::length).fold(0.0, f64::max);
        for tour in &mut self.tours {
            tour.compute_fitness(max_length);
        }
        self.max_length = max_length;
    }

    /// Indices of `tours` by fitness, best first; ties keep insertion order.
    fn rank_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.tours.len()).collect();
        order.sort_by(|&a, &b| self.tours[b].fitness().total_cmp(&self.tours[a].fitness()));
        order
    }

    /// Scores, ranks and truncates the population, then fills the mating pool.
    pub fn selection(&mut self) {
        let total_fitness: f64 = self.tours.iter().map(Tour::fitness).sum();
        let target_size = self.params.target_size;
        for tour in &mut self.tours {
            tour.compute_selection_probability(total_fitness);
            tour.compute_sample_count(target_size);
        }

        self.tours
            .sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
        self.tours.truncate(target_size);

        self.mating_pool.clear();
        for (idx, tour) in self.tours.iter().enumerate() {
            self.mating_pool
                .extend(std::iter::repeat_n(idx, tour.sample_count()));
        }
    }

    /// Breeds `target_size / 2` pairs from the mating pool into the offspring buffer.
    ///
    /// A pair may reuse at most one slot that already bred this round.
    pub fn crossover(&mut self) {
        let pool_len = self.mating_pool.len();
        if pool_len < 2 {
            log::debug!("population.crossover: skipped pool={pool_len}");
            return;
        }
        let city_count = self.tours.first().map_or(0, Tour::len);
        let mut visited: HashSet<usize> = HashSet::with_capacity(pool_len);

        for _ in 0..self.params.target_size / 2 {
            if visited.len() >= pool_len {
                visited.clear();
            }
            let (i, j) = loop {
                let i = self.rng.random_range(0..pool_len);
                let j = self.rng.random_range(0..pool_len);
                if i != j && !(visited.contains(&i) && visited.contains(&j)) {
                    break (i, j);
                }
            };
            visited.insert(i);
            visited.insert(j);

            let parent_a = &self.tours[self.mating_pool[i]];
            let parent_b = &self.tours[self.mating_pool[j]];
            let (child_a, child_b) = if city_count < 2 {
                (parent_a.clone(), parent_b.clone())
            } else {
                let (p1, p2) = draw_cut_points(&mut self.rng, city_count);
                ordered_crossover(parent_a, parent_b, p1, p2)
            };
            self.offspring.push(child_a);
            self.offspring.push(child_b);
        }
    }

    /// Applies `floor(len * rate / 100)` swap mutations to the offspring buffer.
    ///
    /// Targets are drawn with replacement, so one child may be hit twice and
    /// another not at all.
    pub fn mutation(&mut self) {
        let size = self.offspring.len();
        if size == 0 {
            return;
        }
        let count = size * self.params.mutation_rate as usize / 100;
        let mut touched = vec![false; size];
        for _ in 0..count {
            let target = self.rng.random_range(0..size);
            swap_mutation(&mut self.offspring[target], &mut self.rng);
            touched[target] = true;
        }
        for (tour, touched) in self.offspring.iter_mut().zip(touched) {
            if touched {
                tour.recompute_length();
            }
        }
    }

    /// Merges the offspring into the survivors and keeps the `target_size` shortest.
    fn commit(&mut self) {
        self.tours.append(&mut self.offspring);
        self.mating_pool.clear();
        self.tours
            .sort_by(|a, b| a.length().total_cmp(&b.length()));
        self.tours.truncate(self.params.target_size);
        self.rescale();
    }

    pub fn advance_generation(&mut self) {
        self.selection();
        self.crossover();
        self.mutation();
        self.commit();
    }

    pub fn run_ga(&mut self, generations: usize) {
        for generation in 0..generations {
            self.advance_generation();
            log::trace!(
                "population.generation: gen={generation} size={} max={:.3} best={:.3}",
                self.tours.len(),
                self.max_length,
                self.best().map_or(0.0, Tour::length)
            );
        }
    }

    /// Deep copies of the `n` fittest tours; the population is left as is.
    pub fn extract_best(&self, n: usize) -> Vec<Tour> {
        self.rank_order()
            .into_iter()
            .take(n)
            .map(|idx| self.tours[idx].clone())
            .collect()
    }

    /// Deep copy of every tour, for the intra-node ring push.
    pub fn snapshot(&self) -> Vec<Tour> {
        self.tours.clone()
    }

    /// Adds immigrants next to the incumbents and rescales everyone.
    ///
    /// The population may exceed `target_size` until the next selection.
    pub fn ingest(&mut self, incoming: Vec<Tour>) {
        if incoming.is_empty() {
            return;
        }
        self.tours.extend(incoming);
        self.rescale();
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::SmallRng};

    use super::{EvolutionParams, Population};
    use crate::{Point, RandomPointSource, Tour};

    fn random_instance(n: usize, seed: u64) -> Tour {
        let mut source = RandomPointSource::new(n, 100.0, seed);
        Tour::from_source(&mut source).expect("random instance")
    }

    fn worst_length(tours: &[Tour]) -> f64 {
        tours.iter().map(Tour::length).fold(0.0, f64::max)
    }

    #[test]
    fn seeded_population_has_target_size_and_scaled_fitness() {
        let initial = random_instance(12, 1);
        let population = Population::seeded(&initial, EvolutionParams::new(30), 9);

        assert_eq!(population.len(), 30);
        assert!((population.max_length() - worst_length(population.tours())).abs() < 1e-12);
        for tour in population.tours() {
            assert!(tour.is_permutation_of(&initial));
            assert!(tour.fitness() >= 0.0);
            assert!((tour.fitness() - (population.max_length() - tour.length())).abs() < 1e-9);
        }
    }

    #[test]
    fn selection_truncates_to_the_shortest_tours() {
        let initial = random_instance(10, 2);
        let mut rng = SmallRng::seed_from_u64(4);
        let tours: Vec<Tour> = (0..25).map(|_| initial.shuffled(&mut rng)).collect();

        let mut lengths: Vec<f64> = tours.iter().map(Tour::length).collect();
        lengths.sort_by(f64::total_cmp);
        let cutoff = lengths[9];

        let mut population = Population::from_tours(tours, EvolutionParams::new(10), 4);
        population.selection();

        assert_eq!(population.len(), 10);
        for tour in population.tours() {
            assert!(tour.length() <= cutoff + 1e-12);
        }
        let fitness: Vec<f64> = population.tours().iter().map(Tour::fitness).collect();
        assert!(fitness.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn mating_pool_holds_every_survivor_in_rank_order() {
        let initial = random_instance(8, 3);
        let mut population = Population::seeded(&initial, EvolutionParams::new(16), 5);
        population.selection();

        let pool = population.mating_pool();
        assert!(pool.windows(2).all(|w| w[0] <= w[1]));
        for (idx, tour) in population.tours().iter().enumerate() {
            let copies = pool.iter().filter(|&&slot| slot == idx).count();
            assert!(copies >= 1);
            assert_eq!(copies, tour.sample_count());
        }
    }

    #[test]
    fn mating_pool_keeps_everyone_when_fitness_is_flat() {
        let initial = random_instance(6, 4);
        let tours = vec![initial.clone(); 8];
        let mut population = Population::from_tours(tours, EvolutionParams::new(8), 1);
        population.selection();

        assert!(population.tours().iter().all(|t| t.fitness() == 0.0));
        assert_eq!(population.mating_pool(), &[0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn crossover_fills_offspring_with_valid_children() {
        let initial = random_instance(9, 5);
        let mut population = Population::seeded(&initial, EvolutionParams::new(20), 6);
        population.selection();
        population.crossover();

        assert_eq!(population.offspring().len(), 20);
        for child in population.offspring() {
            assert!(child.is_permutation_of(&initial));
        }
        assert_eq!(population.len(), 20);
    }

    #[test]
    fn odd_target_size_breeds_floor_half_pairs() {
        let initial = random_instance(7, 6);
        let mut population = Population::seeded(&initial, EvolutionParams::new(11), 2);
        population.selection();
        population.crossover();
        assert_eq!(population.offspring().len(), 10);
    }

    #[test]
    fn mutation_keeps_children_valid_and_lengths_fresh() {
        let initial = random_instance(10, 7);
        let params = EvolutionParams::new(40).with_mutation_rate(100);
        let mut population = Population::seeded(&initial, params, 8);
        population.selection();
        population.crossover();
        population.mutation();

        for child in population.offspring() {
            assert!(child.is_permutation_of(&initial));
            let mut fresh = child.clone();
            fresh.recompute_length();
            assert!((fresh.length() - child.length()).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_mutation_rate_leaves_offspring_alone() {
        let initial = random_instance(10, 8);
        let params = EvolutionParams::new(10).with_mutation_rate(0);
        let mut population = Population::seeded(&initial, params, 8);
        population.selection();
        population.crossover();
        let before: Vec<Vec<usize>> = population.offspring().iter().map(Tour::city_ids).collect();
        population.mutation();
        let after: Vec<Vec<usize>> = population.offspring().iter().map(Tour::city_ids).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn generation_restores_target_size_and_clears_buffers() {
        let initial = random_instance(10, 9);
        let mut population = Population::seeded(&initial, EvolutionParams::new(24), 10);
        population.advance_generation();

        assert_eq!(population.len(), 24);
        assert!(population.offspring().is_empty());
        assert!(population.mating_pool().is_empty());
        assert!((population.max_length() - worst_length(population.tours())).abs() < 1e-12);
    }

    #[test]
    fn commit_keeps_the_shortest_sorted_even_after_ingestion() {
        let initial = random_instance(12, 13);
        let mut population = Population::seeded(&initial, EvolutionParams::new(10), 14);
        let mut rng = SmallRng::seed_from_u64(15);
        population.ingest((0..7).map(|_| initial.shuffled(&mut rng)).collect());
        assert_eq!(population.len(), 17);

        population.advance_generation();

        assert_eq!(population.len(), 10);
        let lengths: Vec<f64> = population.tours().iter().map(Tour::length).collect();
        assert!(lengths.windows(2).all(|w| w[0] <= w[1]), "{lengths:?}");
    }

    #[test]
    fn best_length_never_gets_worse() {
        let initial = random_instance(15, 10);
        let mut population = Population::seeded(&initial, EvolutionParams::new(30), 11);
        let mut best = population.best().expect("best").length();
        for _ in 0..40 {
            population.run_ga(1);
            let next = population.best().expect("best").length();
            assert!(next <= best + 1e-12);
            best = next;
        }
    }

    #[test]
    fn extract_best_copies_without_removing() {
        let initial = random_instance(8, 11);
        let population = Population::seeded(&initial, EvolutionParams::new(12), 3);
        let elites = population.extract_best(4);

        assert_eq!(elites.len(), 4);
        assert_eq!(population.len(), 12);
        let best = population.best().expect("best");
        assert!((elites[0].length() - best.length()).abs() < 1e-12);
        assert!(elites.windows(2).all(|w| w[0].fitness() >= w[1].fitness()));
    }

    #[test]
    fn extract_best_caps_at_population_size() {
        let initial = random_instance(5, 12);
        let population = Population::seeded(&initial, EvolutionParams::new(3), 3);
        assert_eq!(population.extract_best(10).len(), 3);
    }

    #[test]
    fn ingest_grows_population_and_rescales() {
        let initial = random_instance(8, 13);
        let mut population = Population::seeded(&initial, EvolutionParams::new(10), 1);
        let mut rng = SmallRng::seed_from_u64(99);
        let immigrants: Vec<Tour> = (0..5).map(|_| initial.shuffled(&mut rng)).collect();

        population.ingest(immigrants);

        assert_eq!(population.len(), 15);
        assert!((population.max_length() - worst_length(population.tours())).abs() < 1e-12);
        population.selection();
        assert_eq!(population.len(), 10);
    }

    #[test]
    fn ingesting_own_elites_never_raises_max_length() {
        let initial = random_instance(12, 14);
        let mut population = Population::seeded(&initial, EvolutionParams::new(20), 2);
        population.run_ga(3);
        let before = worst_length(population.tours());

        let elites = population.extract_best(5);
        population.ingest(elites);
        population.selection();

        assert!(worst_length(population.tours()) <= before + 1e-12);
    }

    #[test]
    fn same_seed_evolves_identically() {
        let initial = random_instance(14, 6);
        let params = EvolutionParams::new(12).with_mutation_rate(20);
        let mut a = Population::seeded(&initial, params, 21);
        let mut b = Population::seeded(&initial, params, 21);
        a.run_ga(8);
        b.run_ga(8);

        let ids = |p: &Population| p.tours().iter().map(Tour::city_ids).collect::<Vec<_>>();
        let lengths = |p: &Population| p.tours().iter().map(Tour::length).collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&b));
        assert_eq!(lengths(&a), lengths(&b));
    }

    #[test]
    fn single_city_instance_evolves_without_panicking() {
        let initial = Tour::new(vec![Point::new(1.0, 1.0, 0)]);
        let mut population = Population::seeded(&initial, EvolutionParams::new(4), 1);
        population.run_ga(3);
        assert_eq!(population.len(), 4);
        assert_eq!(population.best().expect("best").length(), 0.0);
    }
}
