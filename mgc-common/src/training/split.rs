//! Stratified train/test splitting

use rand::seq::SliceRandom;
use std::collections::BTreeMap;

use crate::seed::rng_for_seed;

/// Split row indices so every class keeps roughly its share on both sides
///
/// Each class with at least two rows contributes at least one row to each
/// side. Returns `(train, test)`, each shuffled.
pub fn stratified_split(labels: &[usize], test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = rng_for_seed(seed);
    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (index, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(index);
    }

    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for (_, mut indices) in by_class {
        indices.shuffle(&mut rng);
        let n = indices.len();
        let mut n_test = (n as f64 * test_fraction).round() as usize;
        if n >= 2 {
            n_test = n_test.clamp(1, n - 1);
        } else {
            n_test = 0;
        }
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    (train, test)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proportions_per_class() {
        let labels: Vec<usize> = (0..100).map(|i| i % 4).collect();
        let (train, test) = stratified_split(&labels, 0.2, 42);
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);
        for class in 0..4 {
            assert_eq!(test.iter().filter(|&&i| labels[i] == class).count(), 5);
        }
    }

    #[test]
    fn test_disjoint_and_complete() {
        let labels: Vec<usize> = (0..37).map(|i| i % 3).collect();
        let (mut train, test) = stratified_split(&labels, 0.1, 7);
        train.extend(test);
        train.sort_unstable();
        assert_eq!(train, (0..37).collect::<Vec<_>>());
    }

    #[test]
    fn test_small_classes_keep_training_rows() {
        let labels = vec![0, 0, 1];
        let (train, test) = stratified_split(&labels, 0.5, 1);
        assert_eq!(test.len(), 1);
        assert!(train.contains(&2));
    }

    #[test]
    fn test_same_seed_same_split() {
        let labels: Vec<usize> = (0..50).map(|i| i % 5).collect();
        assert_eq!(stratified_split(&labels, 0.2, 3), stratified_split(&labels, 0.2, 3));
    }
}
