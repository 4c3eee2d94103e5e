//! Peak picking on sampled curves
//!
//! Local maxima are filtered in a fixed order: height, then minimum
//! separation (tallest first), then prominence. The order matters: raising
//! the height bound can only remove peaks from the result, never add them.

/// Criteria for [`find_peaks`]
#[derive(Debug, Clone, Copy)]
pub struct PeakCriteria {
    /// Minimum height (inclusive)
    pub min_height: f64,
    /// Minimum distance between kept peaks, in samples
    pub min_distance: usize,
    /// Minimum prominence (0 disables the check)
    pub min_prominence: f64,
    /// Window for the prominence search, in samples (0 = whole curve)
    pub prominence_window: usize,
}

impl Default for PeakCriteria {
    fn default() -> Self {
        Self {
            min_height: f64::NEG_INFINITY,
            min_distance: 1,
            min_prominence: 0.0,
            prominence_window: 0,
        }
    }
}

/// Indices of local maxima; flat tops report their middle sample
pub fn local_maxima<T: Copy + Into<f64>>(data: &[T]) -> Vec<usize> {
    let n = data.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }

    let value = |i: usize| -> f64 { data[i].into() };
    let mut i = 1;
    while i < n - 1 {
        if value(i - 1) < value(i) {
            let mut ahead = i + 1;
            while ahead < n - 1 && value(ahead) == value(i) {
                ahead += 1;
            }
            if value(ahead) < value(i) {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }

    peaks
}

/// Keep the tallest peak in every `distance`-sample neighbourhood.
///
/// Ties are resolved towards the earlier index. Output is sorted by index.
pub fn select_by_distance<T: Copy + Into<f64>>(data: &[T], peaks: &[usize], distance: usize) -> Vec<usize> {
    if distance <= 1 || peaks.len() < 2 {
        return peaks.to_vec();
    }

    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| {
        let ha: f64 = data[peaks[a]].into();
        let hb: f64 = data[peaks[b]].into();
        hb.total_cmp(&ha).then(peaks[a].cmp(&peaks[b]))
    });

    let mut keep = vec![true; peaks.len()];
    for &i in &order {
        if !keep[i] {
            continue;
        }
        let mut j = i;
        while j > 0 && peaks[i] - peaks[j - 1] < distance {
            j -= 1;
            keep[j] = false;
        }
        let mut j = i + 1;
        while j < peaks.len() && peaks[j] - peaks[i] < distance {
            keep[j] = false;
            j += 1;
        }
    }

    peaks
        .iter()
        .zip(&keep)
        .filter(|(_, &k)| k)
        .map(|(&p, _)| p)
        .collect()
}

/// Topographic prominence of the peak at `peak`, searching at most
/// `window / 2` samples to each side (0 = unbounded)
pub fn prominence<T: Copy + Into<f64>>(data: &[T], peak: usize, window: usize) -> f64 {
    let height: f64 = data[peak].into();
    let (lo, hi) = if window > 1 {
        let half = window / 2;
        (peak.saturating_sub(half), (peak + half).min(data.len() - 1))
    } else {
        (0, data.len() - 1)
    };

    let mut left_min = height;
    let mut i = peak;
    while i > lo {
        i -= 1;
        let v: f64 = data[i].into();
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    let mut i = peak;
    while i < hi {
        i += 1;
        let v: f64 = data[i].into();
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

/// Find peaks matching all criteria, sorted by index
pub fn find_peaks<T: Copy + Into<f64>>(data: &[T], criteria: &PeakCriteria) -> Vec<usize> {
    let tall: Vec<usize> = local_maxima(data)
        .into_iter()
        .filter(|&i| data[i].into() >= criteria.min_height)
        .collect();

    let spaced = select_by_distance(data, &tall, criteria.min_distance);

    if criteria.min_prominence <= 0.0 {
        return spaced;
    }
    spaced
        .into_iter()
        .filter(|&i| prominence(data, i, criteria.prominence_window) >= criteria.min_prominence)
        .collect()
}

/// Vertex of the parabola through three equally spaced samples, as an offset
/// from the middle sample clamped to ±0.5. `None` for (near) zero curvature.
pub fn parabolic_offset(y1: f64, y2: f64, y3: f64) -> Option<f64> {
    parabolic_vertex(y1, y2, y3).map(|(offset, _)| offset)
}

/// Like [`parabolic_offset`], also returning the parabola's value at the
/// (clamped) offset
pub fn parabolic_vertex(y1: f64, y2: f64, y3: f64) -> Option<(f64, f64)> {
    let a = (y1 - 2.0 * y2 + y3) / 2.0;
    let b = (y3 - y1) / 2.0;
    if a.abs() > 1e-10 {
        let offset = (-b / (2.0 * a)).clamp(-0.5, 0.5);
        Some((offset, y2 + b * offset + a * offset * offset))
    } else {
        None
    }
}
