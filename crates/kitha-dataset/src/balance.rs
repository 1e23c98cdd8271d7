//! Class balancing by undersampling.

use crate::record::{Label, Labeled};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Build the generator shared by balancing and splitting.
///
/// `Some(seed)` makes a run reproducible; `None` draws from OS entropy.
#[must_use]
pub fn shuffle_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

/// Undersample the majority class so both labels have the same count.
///
/// Each class is shuffled, truncated to the smaller class size (or
/// `max_per_class` when lower), then the union is shuffled again.
pub fn balance<T, R>(records: Vec<T>, max_per_class: Option<usize>, rng: &mut R) -> Vec<T>
where
    T: Labeled,
    R: Rng + ?Sized,
{
    let (mut human, mut ai): (Vec<T>, Vec<T>) =
        records.into_iter().partition(|r| r.label() == Label::Human);

    human.shuffle(rng);
    ai.shuffle(rng);

    let mut keep = human.len().min(ai.len());
    if let Some(cap) = max_per_class {
        keep = keep.min(cap);
    }
    human.truncate(keep);
    ai.truncate(keep);

    let mut out = human;
    out.append(&mut ai);
    out.shuffle(rng);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn records(human: usize, ai: usize) -> Vec<Record> {
        let make = |i: usize, label: Label| Record {
            text: format!("{label} sample number {i}"),
            label,
            source: "test".to_string(),
            category: "mixed".to_string(),
        };
        (0..human)
            .map(|i| make(i, Label::Human))
            .chain((0..ai).map(|i| make(i, Label::Ai)))
            .collect()
    }

    fn count(records: &[Record], label: Label) -> usize {
        records.iter().filter(|r| r.label == label).count()
    }

    #[test]
    fn test_balance_equalizes_to_minority_count() {
        let mut rng = shuffle_rng(Some(7));
        let out = balance(records(30, 12), None, &mut rng);
        assert_eq!(out.len(), 24);
        assert_eq!(count(&out, Label::Human), 12);
        assert_eq!(count(&out, Label::Ai), 12);
    }

    #[test]
    fn test_balance_respects_per_class_cap() {
        let mut rng = shuffle_rng(Some(7));
        let out = balance(records(30, 12), Some(5), &mut rng);
        assert_eq!(count(&out, Label::Human), 5);
        assert_eq!(count(&out, Label::Ai), 5);
    }

    #[test]
    fn test_single_class_input_balances_to_nothing() {
        let mut rng = shuffle_rng(Some(1));
        assert!(balance(records(10, 0), None, &mut rng).is_empty());
    }

    #[test]
    fn test_same_seed_same_order() {
        let a = balance(records(20, 20), None, &mut shuffle_rng(Some(42)));
        let b = balance(records(20, 20), None, &mut shuffle_rng(Some(42)));
        assert_eq!(a, b);
    }
}
