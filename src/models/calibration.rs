//! Isotonic probability calibration.
//!
//! Maps raw forest scores onto observed outcome frequencies with a
//! non-decreasing piecewise-linear function fit by pool-adjacent-violators.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsotonicCalibrator {
    /// Increasing raw-score breakpoints
    pub thresholds: Vec<f64>,
    /// Calibrated probability at each breakpoint (non-decreasing)
    pub values: Vec<f64>,
}

impl Default for IsotonicCalibrator {
    fn default() -> Self {
        Self {
            thresholds: vec![0.0, 1.0],
            values: vec![0.0, 1.0],
        }
    }
}

impl IsotonicCalibrator {
    /// Fit from raw scores and binary labels. Empty input yields the identity map.
    pub fn fit(scores: &[f64], labels: &[u8]) -> Self {
        let mut pairs: Vec<(f64, f64)> = scores
            .iter()
            .zip(labels.iter())
            .filter(|(s, _)| s.is_finite())
            .map(|(&s, &l)| (s, f64::from(l)))
            .collect();
        if pairs.is_empty() {
            return Self::default();
        }
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        // Ties in score share one block so the fitted map stays a function.
        struct Block {
            score: f64,
            sum: f64,
            weight: f64,
        }
        let mut tied: Vec<Block> = Vec::with_capacity(pairs.len());
        for (score, y) in pairs {
            match tied.last_mut() {
                Some(last) if last.score == score => {
                    last.sum += y;
                    last.weight += 1.0;
                }
                _ => tied.push(Block {
                    score,
                    sum: y,
                    weight: 1.0,
                }),
            }
        }

        // Pool adjacent violators; each pooled block keeps its score range.
        let mut pooled: Vec<(f64, f64, f64, f64)> = Vec::new(); // (lo, hi, sum, weight)
        for block in tied {
            pooled.push((block.score, block.score, block.sum, block.weight));
            while pooled.len() > 1 {
                let last = pooled[pooled.len() - 1];
                let prev = pooled[pooled.len() - 2];
                if prev.2 / prev.3 <= last.2 / last.3 {
                    break;
                }
                pooled.pop();
                pooled.pop();
                pooled.push((prev.0, last.1, prev.2 + last.2, prev.3 + last.3));
            }
        }

        let mut thresholds = Vec::with_capacity(pooled.len() * 2);
        let mut values = Vec::with_capacity(pooled.len() * 2);
        for (lo, hi, sum, weight) in pooled {
            let mean = sum / weight;
            thresholds.push(lo);
            values.push(mean);
            if hi > lo {
                thresholds.push(hi);
                values.push(mean);
            }
        }

        Self { thresholds, values }
    }

    /// Check the breakpoints of a decoded calibrator
    pub fn validate(&self) -> Result<(), String> {
        if self.thresholds.is_empty() || self.thresholds.len() != self.values.len() {
            return Err(format!(
                "calibrator has {} thresholds and {} values",
                self.thresholds.len(),
                self.values.len()
            ));
        }
        if self.thresholds.iter().any(|t| !t.is_finite())
            || self.thresholds.windows(2).any(|w| w[0] > w[1])
        {
            return Err("calibrator thresholds are not finite and increasing".to_string());
        }
        if self.values.iter().any(|v| !(0.0..=1.0).contains(v)) {
            return Err("calibrator values outside [0, 1]".to_string());
        }
        Ok(())
    }

    /// Calibrated probability for a raw score, clipped to the fitted range
    pub fn calibrate(&self, score: f64) -> f64 {
        let (Some(&first), Some(&last)) = (self.thresholds.first(), self.thresholds.last()) else {
            return score;
        };
        if score <= first {
            return self.values[0];
        }
        if score >= last {
            return self.values[self.values.len() - 1];
        }

        // first index with threshold > score; score lies in [i-1, i)
        let i = self.thresholds.partition_point(|&t| t <= score);
        let (x0, x1) = (self.thresholds[i - 1], self.thresholds[i]);
        let (y0, y1) = (self.values[i - 1], self.values[i]);
        y0 + (y1 - y0) * (score - x0) / (x1 - x0)
    }
}
