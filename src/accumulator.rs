#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use serde::Serialize;

/// Incremental weighted mean.
///
/// Folding `(value, weight)` pairs in any order converges to
/// `Σ(value·weight) / Σ(weight)` without keeping the running products around.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WeightedMean {
    /// current weighted mean
    mean:       f64,
    /// sum of all weights folded so far
    weight_sum: f64,
}

impl WeightedMean {
    /// An empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one observation into the mean. A zero weight leaves it as is.
    pub fn fold(&mut self, value: f64, weight: f64) {
        let weight_sum = self.weight_sum + weight;
        if self.weight_sum == 0.0 && weight_sum > 0.0 {
            self.mean = value;
        } else if weight_sum > 0.0 {
            self.mean += (value - self.mean) * weight / weight_sum;
        }
        self.weight_sum = weight_sum;
    }

    /// Current weighted mean, `0.0` before anything with weight was folded.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sum of the weights folded so far.
    pub fn weight_sum(&self) -> f64 {
        self.weight_sum
    }
}

impl Extend<(f64, f64)> for WeightedMean {
    fn extend<I: IntoIterator<Item = (f64, f64)>>(&mut self, iter: I) {
        for (value, weight) in iter {
            self.fold(value, weight);
        }
    }
}

impl FromIterator<(f64, f64)> for WeightedMean {
    fn from_iter<I: IntoIterator<Item = (f64, f64)>>(iter: I) -> Self {
        let mut acc = Self::new();
        acc.extend(iter);
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fold_takes_the_value_exactly() {
        let mut acc = WeightedMean::new();
        acc.fold(83.0035693274327, 6.736025107499303);
        assert_eq!(acc.mean(), 83.0035693274327);

        let mut after_zero = WeightedMean::new();
        after_zero.fold(12.0, 0.0);
        after_zero.fold(83.0035693274327, 6.736025107499303);
        assert_eq!(after_zero.mean(), 83.0035693274327);
    }

    #[test]
    fn zero_weight_is_a_no_op() {
        let mut acc = WeightedMean::new();
        acc.fold(50.0, 0.0);
        assert_eq!(acc.mean(), 0.0);
        acc.fold(80.0, 2.0);
        acc.fold(0.0, 0.0);
        assert_eq!(acc.mean(), 80.0);
        assert_eq!(acc.weight_sum(), 2.0);
    }

    #[test]
    fn order_does_not_matter() {
        let pairs = [(10.0, 1.0), (95.5, 3.0), (0.0, 0.5), (100.0, 2.0), (42.0, 1.25)];
        let expected = pairs.iter().map(|(v, w)| v * w).sum::<f64>()
            / pairs.iter().map(|(_, w)| w).sum::<f64>();

        let forward: WeightedMean = pairs.iter().copied().collect();
        let backward: WeightedMean = pairs.iter().rev().copied().collect();
        let mut shuffled = pairs;
        shuffled.swap(0, 3);
        shuffled.swap(1, 4);
        let shuffled: WeightedMean = shuffled.iter().copied().collect();

        for acc in [forward, backward, shuffled] {
            assert!((acc.mean() - expected).abs() < 1e-9, "{} vs {expected}", acc.mean());
        }
    }
}
