//! Imputation statistics

use std::collections::BTreeMap;

/// Median of the present values, `None` when every value is missing
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(|a, b| a.total_cmp(b));
    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        Some((present[mid - 1] + present[mid]) / 2.0)
    } else {
        Some(present[mid])
    }
}

/// Most frequent present value; ties go to the lexicographically smallest
pub fn most_frequent<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.into_iter().flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }
    // BTreeMap iterates in key order, so the first maximum wins ties
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_ignores_missing() {
        assert_eq!(median(&[Some(3.0), None, Some(1.0), Some(2.0)]), Some(2.0));
        assert_eq!(median(&[Some(4.0), Some(1.0), Some(3.0), Some(2.0)]), Some(2.5));
        assert_eq!(median(&[None, None]), None);
    }

    #[test]
    fn test_most_frequent_tie_break() {
        let values = [Some("b"), Some("a"), Some("b"), Some("a"), None, Some("c")];
        assert_eq!(most_frequent(values), Some("a".to_string()));
        assert_eq!(most_frequent([Some("z"), Some("z"), Some("a")]), Some("z".to_string()));
        assert_eq!(most_frequent([None, None]), None);
    }
}
