/// Largest-Triangle-Three-Buckets (LTTB) downsampling.
/// Takes x,y arrays and target number of output points.
/// Returns (downsampled_x, downsampled_y).
pub fn lttb_downsample(x: &[f64], y: &[f64], target: usize) -> (Vec<f64>, Vec<f64>) {
    let n = x.len().min(y.len());
    if n <= target || target < 3 {
        return (x[..n].to_vec(), y[..n].to_vec());
    }

    let mut out_x = Vec::with_capacity(target);
    let mut out_y = Vec::with_capacity(target);

    // Always keep the first point
    out_x.push(x[0]);
    out_y.push(y[0]);

    let bucket_size = (n - 2) as f64 / (target - 2) as f64;
    let mut prev_idx: usize = 0;

    for i in 0..(target - 2) {
        let bucket_start = ((i as f64 + 1.0) * bucket_size) as usize + 1;
        let bucket_end = (((i as f64 + 2.0) * bucket_size) as usize + 1).min(n - 1);

        // Average of the next bucket is the third triangle vertex.
        let next_start = bucket_end;
        let next_end = (((i as f64 + 3.0) * bucket_size) as usize + 1).min(n);
        let next_count = next_end.saturating_sub(next_start).max(1) as f64;
        let (sum_x, sum_y) = (next_start..next_end)
            .fold((0.0, 0.0), |(sx, sy), j| (sx + x[j], sy + y[j]));
        let (avg_x, avg_y) = (sum_x / next_count, sum_y / next_count);

        let (prev_x, prev_y) = (x[prev_idx], y[prev_idx]);
        let mut max_area = -1.0f64;
        let mut best_idx = bucket_start;
        for j in bucket_start..bucket_end {
            // Doubled area; only compared.
            let area = ((prev_x - avg_x) * (y[j] - prev_y) - (prev_x - x[j]) * (avg_y - prev_y)).abs();
            if area > max_area {
                max_area = area;
                best_idx = j;
            }
        }

        out_x.push(x[best_idx]);
        out_y.push(y[best_idx]);
        prev_idx = best_idx;
    }

    // Always keep the last point
    out_x.push(x[n - 1]);
    out_y.push(y[n - 1]);

    (out_x, out_y)
}

/// Slice a sorted trace to the visible x range (plus one point either side so
/// the line reaches the edges), then LTTB it down to `max_points`.
pub fn downsample_for_view(
    x: &[f64],
    y: &[f64],
    view: (f64, f64),
    max_points: usize,
) -> (Vec<f64>, Vec<f64>) {
    let n = x.len().min(y.len());
    if n == 0 {
        return (Vec::new(), Vec::new());
    }
    let (view_min, view_max) = view;
    let x = &x[..n];
    let start = x.partition_point(|&v| v < view_min).saturating_sub(1);
    let end = (x.partition_point(|&v| v <= view_max) + 1).min(n);
    if start >= end {
        return (Vec::new(), Vec::new());
    }
    lttb_downsample(&x[start..end], &y[start..end], max_points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_traces_pass_through() {
        let x = [0.0, 1.0, 2.0];
        let y = [5.0, 6.0, 7.0];
        assert_eq!(lttb_downsample(&x, &y, 10), (x.to_vec(), y.to_vec()));
    }

    #[test]
    fn lttb_keeps_endpoints_and_peak() {
        let x: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let mut y = vec![0.0; 1000];
        y[500] = 100.0;
        let (dx, dy) = lttb_downsample(&x, &y, 50);
        assert_eq!(dx.len(), 50);
        assert_eq!(dx.first(), Some(&0.0));
        assert_eq!(dx.last(), Some(&999.0));
        assert!(dy.contains(&100.0));
    }

    #[test]
    fn view_slice_includes_neighbours() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y = x.clone();
        let (dx, _) = downsample_for_view(&x, &y, (3.5, 5.5), 100);
        assert_eq!(dx, vec![3.0, 4.0, 5.0, 6.0]);
    }
}
