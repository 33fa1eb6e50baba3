// ============================================================
// Train/validation/test splitter
// ============================================================
// Randomly shuffles samples and splits them by fraction. Shuffling
// first matters: dataset files are ordered (all of batch 1 before
// batch 2, days in calendar order), so an unshuffled split would
// hand the validation set a biased slice of the data.
//
// Uses Fisher-Yates via rand::seq::SliceRandom, the standard
// unbiased shuffle.

use rand::seq::SliceRandom;

/// Randomly shuffle `samples` and split into (train, validation).
///
/// `train_fraction` is the proportion kept for training, e.g. 0.8.
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64) -> (Vec<T>, Vec<T>) {
    let mut rng = rand::thread_rng();
    samples.shuffle(&mut rng);

    let total = samples.len();
    let split_at = ((total as f64) * train_fraction).round() as usize;
    let split_at = split_at.min(total);

    // split_off(n) removes [n..] and returns it
    let val = samples.split_off(split_at);

    tracing::debug!("Dataset split: {} training, {} validation", samples.len(), val.len());

    (samples, val)
}

/// Randomly shuffle `samples` and split into (train, validation,
/// test) by fraction. The third subset takes whatever remains after
/// rounding, so the three sizes always sum to the input size.
pub fn split_three<T>(
    mut samples: Vec<T>,
    train_fraction: f64,
    validation_fraction: f64,
) -> (Vec<T>, Vec<T>, Vec<T>) {
    let mut rng = rand::thread_rng();
    samples.shuffle(&mut rng);

    let total = samples.len();
    let train_end = (((total as f64) * train_fraction).round() as usize).min(total);
    let val_end = (train_end + ((total as f64) * validation_fraction).round() as usize).min(total);

    let mut rest = samples.split_off(train_end);
    let test = rest.split_off(val_end - train_end);

    tracing::debug!(
        "Dataset split: {} training, {} validation, {} test",
        samples.len(),
        rest.len(),
        test.len()
    );

    (samples, rest, test)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, val) = split_train_val(items, 0.8);
        assert_eq!(train.len(), 80);
        assert_eq!(val.len(), 20);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..50).collect();
        let (train, val) = split_train_val(items, 0.7);
        assert_eq!(train.len() + val.len(), 50);
    }

    #[test]
    fn test_empty_dataset() {
        let items: Vec<usize> = Vec::new();
        let (train, val) = split_train_val(items, 0.8);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }

    #[test]
    fn test_full_training_split() {
        let items: Vec<usize> = (0..10).collect();
        let (train, val) = split_train_val(items, 1.0);
        assert_eq!(train.len(), 10);
        assert!(val.is_empty());
    }

    #[test]
    fn test_three_way_sizes_sum_to_total() {
        for total in [0usize, 1, 7, 10, 97, 730] {
            let items: Vec<usize> = (0..total).collect();
            let (train, val, test) = split_three(items, 0.7, 0.2);
            assert_eq!(train.len() + val.len() + test.len(), total);
        }
    }

    #[test]
    fn test_three_way_no_items_lost_or_duplicated() {
        let items: Vec<usize> = (0..100).collect();
        let (train, val, test) = split_three(items, 0.7, 0.2);

        let mut all: Vec<usize> = train.into_iter().chain(val).chain(test).collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<usize>>());
    }

    #[test]
    fn test_three_way_fractions_respected() {
        let items: Vec<usize> = (0..1000).collect();
        let (train, val, test) = split_three(items, 0.7, 0.2);
        assert_eq!(train.len(), 700);
        assert_eq!(val.len(), 200);
        assert_eq!(test.len(), 100);
    }
}
