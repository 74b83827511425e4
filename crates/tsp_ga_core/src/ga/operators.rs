use std::collections::HashSet;

use rand::Rng;

use crate::{Point, Tour};

/// Two distinct positions in `[0, n)`, returned as `(low, high)`.
///
/// Callers must ensure `n >= 2`.
pub(crate) fn draw_cut_points<R: Rng + ?Sized>(rng: &mut R, n: usize) -> (usize, usize) {
    let p1 = rng.random_range(0..n);
    let mut p2 = rng.random_range(0..n);
    while p2 == p1 {
        p2 = rng.random_range(0..n);
    }
    if p1 > p2 { (p2, p1) } else { (p1, p2) }
}

/// Ordered crossover (OX) with the segment `[p1, p2]`.
///
/// The first child takes the segment from `parent_b` and the rest of the
/// cities in `parent_a`'s order, read from `p2 + 1` with wrap-around. The
/// second child mirrors it. Both children come back with their length computed.
pub fn ordered_crossover(parent_a: &Tour, parent_b: &Tour, p1: usize, p2: usize) -> (Tour, Tour) {
    debug_assert!(p1 < p2 && p2 < parent_a.len());
    debug_assert_eq!(parent_a.len(), parent_b.len());

    let child_a = ox_child(parent_b.cities(), parent_a.cities(), p1, p2);
    let child_b = ox_child(parent_a.cities(), parent_b.cities(), p1, p2);
    (Tour::new(child_a), Tour::new(child_b))
}

fn ox_child(segment_src: &[Point], fill_src: &[Point], p1: usize, p2: usize) -> Vec<Point> {
    let n = fill_src.len();
    let mut slots: Vec<Option<Point>> = vec![None; n];
    let mut placed = HashSet::with_capacity(n);

    for i in p1..=p2 {
        slots[i] = Some(segment_src[i]);
        placed.insert(segment_src[i].id);
    }

    let mut write = (p2 + 1) % n;
    for step in 0..n {
        let city = fill_src[(p2 + 1 + step) % n];
        if placed.insert(city.id) {
            slots[write] = Some(city);
            write = (write + 1) % n;
        }
    }

    slots.into_iter().flatten().collect()
}

/// Swaps two distinct, uniformly drawn positions. Leaves `length` stale.
pub(crate) fn swap_mutation<R: Rng + ?Sized>(tour: &mut Tour, rng: &mut R) {
    if tour.len() < 2 {
        return;
    }
    let (a, b) = draw_cut_points(rng, tour.len());
    tour.swap_cities(a, b);
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::SmallRng};

    use super::{draw_cut_points, ordered_crossover, swap_mutation};
    use crate::{Point, Tour};

    fn line(ids: &[usize]) -> Tour {
        Tour::new(
            ids.iter()
                .map(|&id| Point::new(id as f64, (id * id) as f64, id))
                .collect(),
        )
    }

    #[test]
    fn cut_points_are_distinct_and_ordered() {
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..500 {
            let (p1, p2) = draw_cut_points(&mut rng, 5);
            assert!(p1 < p2);
            assert!(p2 < 5);
        }
    }

    #[test]
    fn cut_points_for_two_cities_cover_both() {
        let mut rng = SmallRng::seed_from_u64(3);
        assert_eq!(draw_cut_points(&mut rng, 2), (0, 1));
    }

    #[test]
    fn crossover_injects_segment_and_fills_in_parent_order() {
        let a = line(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let b = line(&[7, 6, 5, 4, 3, 2, 1, 0]);

        let (child_a, child_b) = ordered_crossover(&a, &b, 2, 4);

        // segment [5, 4, 3] from b; a read from index 5: 5, 6, 7, 0, 1, 2, 3, 4
        assert_eq!(child_a.city_ids(), vec![1, 2, 5, 4, 3, 6, 7, 0]);
        // segment [2, 3, 4] from a; b read from index 5: 2, 1, 0, 7, 6, 5, 4, 3
        assert_eq!(child_b.city_ids(), vec![6, 5, 2, 3, 4, 1, 0, 7]);
    }

    #[test]
    fn crossover_with_full_span_copies_other_parent() {
        let a = line(&[0, 1, 2, 3]);
        let b = line(&[2, 0, 3, 1]);
        let (child_a, child_b) = ordered_crossover(&a, &b, 0, 3);
        assert_eq!(child_a.city_ids(), b.city_ids());
        assert_eq!(child_b.city_ids(), a.city_ids());
    }

    #[test]
    fn crossover_children_are_permutations_with_fresh_lengths() {
        let mut rng = SmallRng::seed_from_u64(11);
        let base = line(&(0..12).collect::<Vec<_>>());
        for _ in 0..200 {
            let a = base.shuffled(&mut rng);
            let b = base.shuffled(&mut rng);
            let (p1, p2) = draw_cut_points(&mut rng, base.len());
            let (child_a, child_b) = ordered_crossover(&a, &b, p1, p2);

            for child in [&child_a, &child_b] {
                assert!(child.is_permutation_of(&base));
                let mut fresh = (*child).clone();
                fresh.recompute_length();
                assert!((fresh.length() - child.length()).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn crossover_leaves_parents_untouched() {
        let a = line(&[0, 1, 2, 3, 4]);
        let b = line(&[4, 3, 2, 1, 0]);
        let _ = ordered_crossover(&a, &b, 1, 3);
        assert_eq!(a.city_ids(), vec![0, 1, 2, 3, 4]);
        assert_eq!(b.city_ids(), vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn swap_mutation_changes_exactly_two_positions() {
        let mut rng = SmallRng::seed_from_u64(5);
        let original = line(&[0, 1, 2, 3, 4, 5]);
        for _ in 0..100 {
            let mut tour = original.clone();
            swap_mutation(&mut tour, &mut rng);
            let changed = tour
                .city_ids()
                .iter()
                .zip(original.city_ids())
                .filter(|(a, b)| **a != *b)
                .count();
            assert_eq!(changed, 2);
            assert!(tour.is_permutation_of(&original));
        }
    }

    #[test]
    fn swap_mutation_ignores_single_city_tours() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut tour = line(&[0]);
        swap_mutation(&mut tour, &mut rng);
        assert_eq!(tour.city_ids(), vec![0]);
    }
}
