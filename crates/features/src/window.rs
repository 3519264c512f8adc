//! Streaming window accumulators.
//!
//! Every rolling feature is computed with one pass over an asset's series.
//! Missing values occupy a window slot but do not count toward statistics.

use std::collections::VecDeque;

/// Trailing window over an `Option<f64>` stream.
///
/// Keeps shifted sum and sum of squares (shifted by the first valid value,
/// which keeps the variance numerically stable for large price levels) and
/// monotonic deques for the window minimum and maximum.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    size: usize,
    slots: VecDeque<Option<f64>>,
    count: usize,
    shift: f64,
    sum: f64,
    sum_sq: f64,
    min_deque: VecDeque<(usize, f64)>,
    max_deque: VecDeque<(usize, f64)>,
    index: usize,
}

impl RollingWindow {
    /// Creates a window spanning `size` rows (at least one).
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            slots: VecDeque::with_capacity(size),
            count: 0,
            shift: 0.0,
            sum: 0.0,
            sum_sq: 0.0,
            min_deque: VecDeque::new(),
            max_deque: VecDeque::new(),
            index: 0,
        }
    }

    /// Pushes the next value, evicting the oldest once the window is full.
    pub fn push(&mut self, value: Option<f64>) {
        if self.slots.len() == self.size {
            if let Some(Some(old)) = self.slots.pop_front() {
                let d = old - self.shift;
                self.sum -= d;
                self.sum_sq -= d * d;
                self.count -= 1;
            }
        }

        if let Some(v) = value {
            if self.count == 0 {
                self.shift = v;
                self.sum = 0.0;
                self.sum_sq = 0.0;
            }
            let d = v - self.shift;
            self.sum += d;
            self.sum_sq += d * d;
            self.count += 1;

            while self.max_deque.back().is_some_and(|&(_, b)| b <= v) {
                self.max_deque.pop_back();
            }
            self.max_deque.push_back((self.index, v));
            while self.min_deque.back().is_some_and(|&(_, b)| b >= v) {
                self.min_deque.pop_back();
            }
            self.min_deque.push_back((self.index, v));
        }
        self.slots.push_back(value);

        let oldest = (self.index + 1).saturating_sub(self.size);
        while self.max_deque.front().is_some_and(|&(i, _)| i < oldest) {
            self.max_deque.pop_front();
        }
        while self.min_deque.front().is_some_and(|&(i, _)| i < oldest) {
            self.min_deque.pop_front();
        }
        self.index += 1;
    }

    /// Number of valid values in the window.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// True once every slot holds a valid value.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.count == self.size
    }

    /// Mean of the valid values, once at least `min_periods` are present.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self, min_periods: usize) -> Option<f64> {
        if self.count == 0 || self.count < min_periods {
            return None;
        }
        Some(self.shift + self.sum / self.count as f64)
    }

    /// Sample variance (`ddof = 1`), needing two values and `min_periods`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn variance(&self, min_periods: usize) -> Option<f64> {
        if self.count < 2 || self.count < min_periods {
            return None;
        }
        let n = self.count as f64;
        let var = (self.sum_sq - self.sum * self.sum / n) / (n - 1.0);
        Some(var.max(0.0))
    }

    /// Sample standard deviation.
    #[must_use]
    pub fn std(&self, min_periods: usize) -> Option<f64> {
        self.variance(min_periods).map(f64::sqrt)
    }

    #[must_use]
    pub fn min(&self) -> Option<f64> {
        self.min_deque.front().map(|&(_, v)| v)
    }

    #[must_use]
    pub fn max(&self) -> Option<f64> {
        self.max_deque.front().map(|&(_, v)| v)
    }
}

/// Trailing-window Pearson correlation over paired streams.
///
/// A pair counts only when both sides are present.
#[derive(Debug, Clone)]
pub struct RollingCorrelation {
    size: usize,
    slots: VecDeque<Option<(f64, f64)>>,
    count: usize,
    shift: (f64, f64),
    sx: f64,
    sy: f64,
    sxx: f64,
    syy: f64,
    sxy: f64,
}

impl RollingCorrelation {
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            slots: VecDeque::with_capacity(size),
            count: 0,
            shift: (0.0, 0.0),
            sx: 0.0,
            sy: 0.0,
            sxx: 0.0,
            syy: 0.0,
            sxy: 0.0,
        }
    }

    pub fn push(&mut self, x: Option<f64>, y: Option<f64>) {
        if self.slots.len() == self.size {
            if let Some(Some((ox, oy))) = self.slots.pop_front() {
                self.accumulate(ox, oy, -1.0);
                self.count -= 1;
            }
        }

        let pair = x.zip(y);
        if let Some((x, y)) = pair {
            if self.count == 0 {
                self.shift = (x, y);
                self.sx = 0.0;
                self.sy = 0.0;
                self.sxx = 0.0;
                self.syy = 0.0;
                self.sxy = 0.0;
            }
            self.accumulate(x, y, 1.0);
            self.count += 1;
        }
        self.slots.push_back(pair);
    }

    fn accumulate(&mut self, x: f64, y: f64, sign: f64) {
        let dx = x - self.shift.0;
        let dy = y - self.shift.1;
        self.sx += sign * dx;
        self.sy += sign * dy;
        self.sxx += sign * dx * dx;
        self.syy += sign * dy * dy;
        self.sxy += sign * dx * dy;
    }

    /// Correlation over a full window of valid pairs.
    ///
    /// `None` until the window is full or when either side has zero variance.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn correlation(&self) -> Option<f64> {
        if self.count < self.size || self.count < 2 {
            return None;
        }
        let n = self.count as f64;
        let cov = self.sxy - self.sx * self.sy / n;
        let var_x = self.sxx - self.sx * self.sx / n;
        let var_y = self.syy - self.sy * self.sy / n;
        if var_x <= f64::EPSILON * self.sxx.abs() || var_y <= f64::EPSILON * self.syy.abs() {
            return None;
        }
        let denom = (var_x * var_y).sqrt();
        if denom <= 0.0 {
            return None;
        }
        Some((cov / denom).clamp(-1.0, 1.0))
    }
}

/// Linear-interpolated quantile of the valid values (`q` in `[0, 1]`).
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn quantile(values: &[Option<f64>], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Exponential moving average with `alpha = 2 / (span + 1)`, seeded with the
/// first valid value. Missing inputs repeat the previous average.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ema(values: &[Option<f64>], span: usize) -> Vec<Option<f64>> {
    let alpha = 2.0 / (span.max(1) as f64 + 1.0);
    let mut current: Option<f64> = None;
    values
        .iter()
        .map(|value| {
            current = match (current, value) {
                (None, v) => *v,
                (Some(prev), Some(v)) => Some(alpha * v + (1.0 - alpha) * prev),
                (Some(prev), None) => Some(prev),
            };
            current
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn push_all(window: &mut RollingWindow, values: &[Option<f64>]) {
        for v in values {
            window.push(*v);
        }
    }

    // ============================================
    // RollingWindow Tests
    // ============================================

    #[test]
    fn mean_tracks_trailing_window() {
        let mut window = RollingWindow::new(3);
        push_all(&mut window, &[Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)]);
        assert!((window.mean(1).unwrap() - 4.0).abs() < EPS);
        assert!(window.is_full());
    }

    #[test]
    fn min_periods_gate_mean_and_std() {
        let mut window = RollingWindow::new(3);
        window.push(Some(2.0));
        assert_eq!(window.mean(2), None);
        assert!((window.mean(1).unwrap() - 2.0).abs() < EPS);
        assert_eq!(window.std(1), None);

        window.push(Some(4.0));
        assert!((window.std(1).unwrap() - 2.0_f64.sqrt()).abs() < EPS);
    }

    #[test]
    fn missing_values_occupy_slots() {
        let mut window = RollingWindow::new(2);
        push_all(&mut window, &[Some(10.0), None, None]);
        assert_eq!(window.count(), 0);
        assert_eq!(window.mean(1), None);
        assert_eq!(window.max(), None);

        window.push(Some(3.0));
        assert_eq!(window.count(), 1);
        assert!((window.mean(1).unwrap() - 3.0).abs() < EPS);
    }

    #[test]
    fn min_max_follow_evictions() {
        let mut window = RollingWindow::new(3);
        let values = [5.0, 1.0, 4.0, 3.0, 2.0, 6.0];
        let mut mins = Vec::new();
        let mut maxs = Vec::new();
        for v in values {
            window.push(Some(v));
            mins.push(window.min().unwrap());
            maxs.push(window.max().unwrap());
        }
        assert_eq!(mins, vec![5.0, 1.0, 1.0, 1.0, 2.0, 2.0]);
        assert_eq!(maxs, vec![5.0, 5.0, 5.0, 4.0, 4.0, 6.0]);
    }

    #[test]
    fn variance_is_stable_at_high_levels() {
        let mut window = RollingWindow::new(4);
        push_all(
            &mut window,
            &[Some(1e9 + 1.0), Some(1e9 + 2.0), Some(1e9 + 3.0), Some(1e9 + 4.0)],
        );
        let expected = (5.0_f64 / 3.0).sqrt();
        assert!((window.std(4).unwrap() - expected).abs() < 1e-6);
    }

    // ============================================
    // RollingCorrelation Tests
    // ============================================

    #[test]
    fn perfect_correlation_needs_full_window() {
        let mut corr = RollingCorrelation::new(3);
        corr.push(Some(1.0), Some(2.0));
        corr.push(Some(2.0), Some(4.0));
        assert_eq!(corr.correlation(), None);
        corr.push(Some(3.0), Some(6.0));
        assert!((corr.correlation().unwrap() - 1.0).abs() < EPS);
        corr.push(Some(4.0), Some(0.0));
        assert!(corr.correlation().unwrap() < 0.0);
    }

    #[test]
    fn constant_series_has_no_correlation() {
        let mut corr = RollingCorrelation::new(2);
        corr.push(Some(1.0), Some(5.0));
        corr.push(Some(2.0), Some(5.0));
        assert_eq!(corr.correlation(), None);
    }

    // ============================================
    // Quantile and EMA Tests
    // ============================================

    #[test]
    fn quantile_interpolates_linearly() {
        let values: Vec<Option<f64>> = (1..=5).map(|v| Some(f64::from(v))).collect();
        assert!((quantile(&values, 0.5).unwrap() - 3.0).abs() < EPS);
        assert!((quantile(&values, 0.95).unwrap() - 4.8).abs() < EPS);
        assert_eq!(quantile(&[None, None], 0.95), None);
    }

    #[test]
    fn ema_seeds_with_first_value() {
        let out = ema(&[None, Some(10.0), Some(20.0), None], 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], Some(10.0));
        assert!((out[2].unwrap() - 15.0).abs() < EPS);
        assert!((out[3].unwrap() - 15.0).abs() < EPS);
    }
}
