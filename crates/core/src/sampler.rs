//! Shuffling and sampling of question sets.
//!
//! All functions work on a copy; the input slice is never reordered.

use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, HashSet};

use crate::model::{OptionKey, Question, QuestionId};

/// Uniformly shuffle a copy of `items` using the thread-local RNG.
#[must_use]
pub fn shuffle<T: Clone>(items: &[T]) -> Vec<T> {
    shuffle_with(items, &mut rand::rng())
}

/// Uniformly shuffle a copy of `items` using the given RNG.
#[must_use]
pub fn shuffle_with<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut shuffled = items.to_vec();
    shuffled.shuffle(rng);
    shuffled
}

/// Pick `count` random items. Asking for more than available returns all of them, shuffled.
#[must_use]
pub fn sample<T: Clone>(items: &[T], count: usize) -> Vec<T> {
    sample_with(items, count, &mut rand::rng())
}

#[must_use]
pub fn sample_with<T: Clone, R: Rng + ?Sized>(items: &[T], count: usize, rng: &mut R) -> Vec<T> {
    if items.is_empty() {
        tracing::warn!("sampling from an empty set");
        return Vec::new();
    }
    if count == 0 {
        tracing::warn!("sample requested with a count of zero");
        return Vec::new();
    }
    let take = if count > items.len() {
        tracing::warn!(
            requested = count,
            available = items.len(),
            "sample count exceeds available items; clamping"
        );
        items.len()
    } else {
        count
    };

    let mut pool = items.to_vec();
    let (picked, _) = pool.partial_shuffle(rng, take);
    picked.to_vec()
}

/// Sample questions whose ids are not in `exclude_ids`.
#[must_use]
pub fn sample_excluding(
    questions: &[Question],
    exclude_ids: &[QuestionId],
    count: usize,
) -> Vec<Question> {
    sample_excluding_with(questions, exclude_ids, count, &mut rand::rng())
}

#[must_use]
pub fn sample_excluding_with<R: Rng + ?Sized>(
    questions: &[Question],
    exclude_ids: &[QuestionId],
    count: usize,
    rng: &mut R,
) -> Vec<Question> {
    let excluded: HashSet<QuestionId> = exclude_ids.iter().copied().collect();
    let available: Vec<Question> = questions
        .iter()
        .filter(|q| !excluded.contains(&q.id))
        .cloned()
        .collect();

    if available.is_empty() {
        tracing::warn!(
            excluded = excluded.len(),
            "no questions left after exclusion"
        );
        return Vec::new();
    }
    sample_with(&available, count, rng)
}

//
// ─── SEEDED SHUFFLE ───────────────────────────────────────────────────────────
//

const LCG_MULTIPLIER: i64 = 9301;
const LCG_INCREMENT: i64 = 49_297;
const LCG_MODULUS: i64 = 233_280;

/// Small linear-congruential generator seeded from a string.
///
/// Not suitable for anything but reproducible test orderings.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    state: i64,
}

impl SeededRandom {
    #[must_use]
    pub fn new(seed: &str) -> Self {
        let hash = seed
            .encode_utf16()
            .fold(0_i32, |acc, unit| acc.wrapping_mul(31).wrapping_add(i32::from(unit)));
        Self {
            state: i64::from(hash),
        }
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.state = (self.state * LCG_MULTIPLIER + LCG_INCREMENT).rem_euclid(LCG_MODULUS);
        #[allow(clippy::cast_precision_loss)]
        let value = self.state as f64 / LCG_MODULUS as f64;
        value
    }

    /// Next index in `0..bound`. `bound` must be non-zero.
    pub fn next_index(&mut self, bound: usize) -> usize {
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let index = (self.next_f64() * bound as f64).floor() as usize;
        index.min(bound - 1)
    }
}

/// Deterministic shuffle: the same seed and input always produce the same order.
///
/// Walks the slice from the back, swapping each slot with one drawn from the
/// LCG, so orders stay stable for a given seed across `rand` releases.
#[must_use]
pub fn seeded_shuffle<T: Clone>(items: &[T], seed: &str) -> Vec<T> {
    let mut random = SeededRandom::new(seed);
    let mut shuffled = items.to_vec();
    for i in (1..shuffled.len()).rev() {
        let j = random.next_index(i + 1);
        shuffled.swap(i, j);
    }
    shuffled
}

//
// ─── OPTION SHUFFLE ───────────────────────────────────────────────────────────
//

/// Return a copy of `question` with its options moved to randomly permuted keys.
///
/// `correct_answer` follows the correct text to its new key.
#[must_use]
pub fn shuffle_options(question: &Question) -> Question {
    shuffle_options_with(question, &mut rand::rng())
}

#[must_use]
pub fn shuffle_options_with<R: Rng + ?Sized>(question: &Question, rng: &mut R) -> Question {
    let targets = shuffle_with(&OptionKey::ALL, rng);
    let mapping: BTreeMap<OptionKey, OptionKey> =
        OptionKey::ALL.iter().copied().zip(targets).collect();

    let options = question
        .options
        .iter()
        .map(|(old_key, text)| (mapping[old_key], text.clone()))
        .collect();

    Question {
        id: question.id,
        question: question.question.clone(),
        options,
        correct_answer: mapping[&question.correct_answer],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sorted(mut v: Vec<u32>) -> Vec<u32> {
        v.sort_unstable();
        v
    }

    #[test]
    fn shuffle_preserves_elements_and_input() {
        let input: Vec<u32> = (0..50).collect();
        let snapshot = input.clone();
        let out = shuffle(&input);
        assert_eq!(input, snapshot);
        assert_eq!(out.len(), input.len());
        assert_eq!(sorted(out), snapshot);
    }

    #[test]
    fn shuffle_of_trivial_inputs_is_identity() {
        let empty: Vec<u32> = Vec::new();
        assert!(shuffle(&empty).is_empty());
        assert_eq!(shuffle(&[7_u32]), vec![7]);
    }

    #[test]
    fn shuffle_is_roughly_uniform_over_permutations() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts: BTreeMap<Vec<u32>, u32> = BTreeMap::new();
        for _ in 0..6000 {
            *counts.entry(shuffle_with(&[1_u32, 2, 3], &mut rng)).or_default() += 1;
        }
        assert_eq!(counts.len(), 6);
        for count in counts.values() {
            assert!((800..=1200).contains(count), "skewed count {count}");
        }
    }

    #[test]
    fn sample_clamps_to_available() {
        let qs = fixtures::questions(3);
        let picked = sample(&qs, 10);
        assert_eq!(picked.len(), 3);
        let mut ids: Vec<u64> = picked.iter().map(|q| q.id.value()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn sample_takes_requested_count_without_duplicates() {
        let qs = fixtures::questions(340);
        let picked = sample(&qs, 70);
        assert_eq!(picked.len(), 70);
        let unique: HashSet<QuestionId> = picked.iter().map(|q| q.id).collect();
        assert_eq!(unique.len(), 70);
    }

    #[test]
    fn sample_reaches_every_item() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen: BTreeMap<u32, u32> = BTreeMap::new();
        for _ in 0..500 {
            let picked = sample_with(&[1_u32, 2, 3, 4, 5], 1, &mut rng);
            *seen.entry(picked[0]).or_default() += 1;
        }
        assert_eq!(seen.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn sample_with_same_seed_is_reproducible() {
        let qs = fixtures::questions(40);
        let first = sample_with(&qs, 5, &mut StdRng::seed_from_u64(3));
        let second = sample_with(&qs, 5, &mut StdRng::seed_from_u64(3));
        assert_eq!(first.len(), 5);
        assert_eq!(first, second);
    }

    #[test]
    fn sample_of_nothing_is_empty() {
        let empty: Vec<u32> = Vec::new();
        assert!(sample(&empty, 5).is_empty());
        assert!(sample(&[1_u32, 2], 0).is_empty());
    }

    #[test]
    fn sample_excluding_skips_ids() {
        let qs = fixtures::questions(5);
        let exclude = [QuestionId::new(1), QuestionId::new(2)];
        let picked = sample_excluding(&qs, &exclude, 10);
        assert_eq!(picked.len(), 3);
        assert!(picked.iter().all(|q| !exclude.contains(&q.id)));
    }

    #[test]
    fn sample_excluding_everything_is_empty() {
        let qs = fixtures::questions(2);
        let exclude = [QuestionId::new(1), QuestionId::new(2)];
        assert!(sample_excluding(&qs, &exclude, 1).is_empty());
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let input: Vec<u32> = (1..=10).collect();
        let first = seeded_shuffle(&input, "abc");
        let second = seeded_shuffle(&input, "abc");
        assert_eq!(first, second);
        assert_eq!(sorted(first.clone()), input);
        assert_ne!(first, input);
    }

    #[test]
    fn seeded_shuffle_order_is_pinned() {
        let input: Vec<u32> = (1..=10).collect();
        assert_eq!(
            seeded_shuffle(&input, "abc"),
            vec![4, 7, 3, 1, 6, 5, 2, 8, 10, 9]
        );
    }

    #[test]
    fn seeded_shuffle_differs_across_seeds() {
        let input: Vec<u32> = (1..=10).collect();
        assert_ne!(seeded_shuffle(&input, "abc"), seeded_shuffle(&input, "exam-2025"));
    }

    #[test]
    fn seeded_random_stays_in_unit_interval() {
        let mut random = SeededRandom::new("a fairly long seed string to overflow the hash");
        for _ in 0..1000 {
            let v = random.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn shuffled_options_keep_correct_text() {
        let mut rng = StdRng::seed_from_u64(7);
        for key in OptionKey::ALL {
            let original = fixtures::question(1, key);
            for _ in 0..20 {
                let shuffled = shuffle_options_with(&original, &mut rng);
                assert_eq!(shuffled.correct_text(), original.correct_text());
                assert_eq!(shuffled.options.len(), 4);
                let mut texts: Vec<&String> = shuffled.options.values().collect();
                let mut expected: Vec<&String> = original.options.values().collect();
                texts.sort();
                expected.sort();
                assert_eq!(texts, expected);
            }
        }
    }
}
