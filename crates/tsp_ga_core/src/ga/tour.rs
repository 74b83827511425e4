use rand::{Rng, seq::SliceRandom};

use crate::{Error, Point, PointSource, Result};

/// One closed ordering of every city plus the metrics the GA ranks it by.
///
/// `length` is stored, not derived: it is only valid after
/// [`Tour::recompute_length`] has run since the cities last changed. `fitness`,
/// `selection_probability` and `sample_count` are relative to the population
/// that last scored the tour.
#[derive(Clone, Debug, Default)]
pub struct Tour {
    cities: Vec<Point>,
    length: f64,
    fitness: f64,
    selection_probability: f64,
    sample_count: usize,
}

impl Tour {
    pub fn new(cities: Vec<Point>) -> Self {
        let mut tour = Self {
            cities,
            ..Self::default()
        };
        tour.recompute_length();
        tour
    }

    /// Reads exactly `source.count()` points, labelling them `0..count` in read order.
    pub fn from_source(source: &mut dyn PointSource) -> Result<Self> {
        let count = source.count();
        if count == 0 {
            return Err(Error::invalid_input("point source yields no points"));
        }

        let mut cities = Vec::with_capacity(count);
        for id in 0..count {
            let (x, y) = source.next_point()?;
            let point = Point::new(x, y, id);
            if !point.is_finite() {
                return Err(Error::invalid_input(format!(
                    "point {point} has non-finite coordinates"
                )));
            }
            log::trace!("tour.from_source: point={point}");
            cities.push(point);
        }

        log::debug!("tour.from_source: n={count}");
        Ok(Self::new(cities))
    }

    /// Fresh random permutation of the same cities, metrics recomputed.
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let mut cities = self.cities.clone();
        cities.shuffle(rng);
        Self::new(cities)
    }

    pub fn recompute_length(&mut self) {
        let n = self.cities.len();
        self.length = if n < 2 {
            0.0
        } else {
            (0..n)
                .map(|i| self.cities[i].dist(&self.cities[(i + 1) % n]))
                .sum()
        };
    }

    pub fn compute_fitness(&mut self, max_length: f64) {
        self.fitness = max_length - self.length;
    }

    pub fn compute_selection_probability(&mut self, total_fitness: f64) {
        self.selection_probability = if total_fitness > 0.0 {
            self.fitness / total_fitness
        } else {
            0.0
        };
    }

    /// Copies this tour gets in the mating pool. Never below one.
    pub fn compute_sample_count(&mut self, population_size: usize) {
        let expected = (self.selection_probability * population_size as f64).round();
        self.sample_count = expected.max(0.0) as usize + 1;
    }

    pub(crate) fn swap_cities(&mut self, a: usize, b: usize) {
        self.cities.swap(a, b);
    }

    pub fn cities(&self) -> &[Point] {
        &self.cities
    }

    pub fn city_ids(&self) -> Vec<usize> {
        self.cities.iter().map(|c| c.id).collect()
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn selection_probability(&self) -> f64 {
        self.selection_probability
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// True when both tours visit exactly the same set of city ids, each once.
    pub fn is_permutation_of(&self, other: &Self) -> bool {
        let mut a = self.city_ids();
        let mut b = other.city_ids();
        a.sort_unstable();
        b.sort_unstable();
        a.windows(2).all(|w| w[0] != w[1]) && a == b
    }
}
