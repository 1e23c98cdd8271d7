//! Proportional train/val/test partitioning.

use rand::seq::SliceRandom;
use rand::Rng;

const TRAIN_CUT: f64 = 0.8;
const VAL_CUT: f64 = 0.9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splits<T> {
    pub train: Vec<T>,
    pub val: Vec<T>,
    pub test: Vec<T>,
}

impl<T: Clone> Splits<T> {
    /// `train`, `val` and `test` concatenated, in that order.
    #[must_use]
    pub fn full(&self) -> Vec<T> {
        let mut all = Vec::with_capacity(self.len());
        all.extend_from_slice(&self.train);
        all.extend_from_slice(&self.val);
        all.extend_from_slice(&self.test);
        all
    }
}

impl<T> Splits<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn cut(n: usize, fraction: f64) -> usize {
    (n as f64 * fraction).floor() as usize
}

/// Shuffle once and cut at 80% and 90%.
pub fn split<T, R>(mut records: Vec<T>, rng: &mut R) -> Splits<T>
where
    R: Rng + ?Sized,
{
    records.shuffle(rng);

    let n = records.len();
    let train_end = cut(n, TRAIN_CUT);
    let val_end = cut(n, VAL_CUT);

    let test = records.split_off(val_end);
    let val = records.split_off(train_end);
    Splits { train: records, val, test }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::shuffle_rng;
    use std::collections::HashSet;

    #[test]
    fn test_split_sizes_follow_floor_cuts() {
        let out = split((0..10).collect::<Vec<u32>>(), &mut shuffle_rng(Some(3)));
        assert_eq!((out.train.len(), out.val.len(), out.test.len()), (8, 1, 1));

        let out = split((0..7).collect::<Vec<u32>>(), &mut shuffle_rng(Some(3)));
        assert_eq!((out.train.len(), out.val.len(), out.test.len()), (5, 1, 1));
    }

    #[test]
    fn test_splits_are_disjoint_and_exhaustive() {
        let out = split((0..1000).collect::<Vec<u32>>(), &mut shuffle_rng(Some(9)));
        let full = out.full();
        assert_eq!(full.len(), 1000);
        let unique: HashSet<_> = full.iter().collect();
        assert_eq!(unique.len(), 1000);
        assert_eq!(&full[..out.train.len()], out.train.as_slice());
    }

    #[test]
    fn test_tiny_inputs() {
        let out = split(Vec::<u32>::new(), &mut shuffle_rng(Some(1)));
        assert!(out.is_empty());

        let out = split(vec![1u32], &mut shuffle_rng(Some(1)));
        assert_eq!(out.test, vec![1]);
        assert!(out.train.is_empty());
    }
}
