#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorMetrics {
    pub samples: usize,
    pub mae: f64,
    pub rmse: f64,
}

/// Returns `None` when the slices are empty or differ in length.
pub fn evaluate_errors(predictions: &[f64], actuals: &[f64]) -> Option<ErrorMetrics> {
    if predictions.is_empty() || predictions.len() != actuals.len() {
        return None;
    }

    let mut abs_sum = 0.0_f64;
    let mut sq_sum = 0.0_f64;
    for (p, y) in predictions.iter().zip(actuals) {
        let err = p - y;
        abs_sum += err.abs();
        sq_sum += err * err;
    }

    let n = predictions.len() as f64;
    Some(ErrorMetrics {
        samples: predictions.len(),
        mae: abs_sum / n,
        rmse: (sq_sum / n).sqrt(),
    })
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
