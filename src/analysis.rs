// Heart rate statistics over the loaded workouts
use crate::dataset::Dataset;

/// One equal-width bucket of a histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

impl HistogramBin {
    pub fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

/// Minimum and maximum average heart rate, ignoring blank values.
pub fn heart_rate_range(dataset: &Dataset) -> Option<(f64, f64)> {
    dataset
        .records()
        .iter()
        .filter_map(|r| r.heart_rate_avg)
        .fold(None, |acc, hr| match acc {
            None => Some((hr, hr)),
            Some((lo, hi)) => Some((lo.min(hr), hi.max(hr))),
        })
}

/// Number of workouts for each type, in catalog order.
pub fn workouts_per_type(dataset: &Dataset) -> Vec<(String, usize)> {
    dataset
        .catalog()
        .as_slice()
        .iter()
        .map(|t| {
            let count = dataset.records().iter().filter(|r| &r.title == t).count();
            (t.clone(), count)
        })
        .collect()
}

/// Split `values` into `bins` equal-width buckets spanning their range.
///
/// The last bucket is closed so the maximum value is counted. When every
/// value is identical a single bucket of width one is returned.
pub fn histogram_bins(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max <= min {
        return vec![HistogramBin {
            start: min - 0.5,
            end: min + 0.5,
            count: values.len(),
        }];
    }
    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            start: min + width * i as f64,
            end: min + width * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

/// Format a user facing message after loading the workout CSV.
pub fn format_load_message(workouts: usize, types: usize, filename: &str) -> String {
    format!("Loaded {workouts} workouts ({types} types) from {filename}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heart_rate_range_skips_blanks() {
        let data = "Title,WorkoutDay,HeartRateAverage,Pace\n\
Base,2024-01-01,131,6.1\n\
Tempo,2024-01-02,,5.0\n\
Intervals,2024-01-03,162,4.1\n\
Base,2024-01-04,125,6.3\n";
        let ds = Dataset::from_reader(data.as_bytes()).unwrap();
        assert_eq!(heart_rate_range(&ds), Some((125.0, 162.0)));
    }

    #[test]
    fn heart_rate_range_empty() {
        let ds = Dataset::from_reader("Title,WorkoutDay,HeartRateAverage,Pace\n".as_bytes()).unwrap();
        assert_eq!(heart_rate_range(&ds), None);
    }

    #[test]
    fn workouts_per_type_in_catalog_order() {
        let data = "Title,WorkoutDay,HeartRateAverage,Pace\n\
Tempo,2024-01-01,150,5.0\n\
Base,2024-01-02,130,6.0\n\
Tempo,2024-01-03,152,4.9\n";
        let ds = Dataset::from_reader(data.as_bytes()).unwrap();
        assert_eq!(
            workouts_per_type(&ds),
            vec![("Tempo".to_string(), 2), ("Base".to_string(), 1)]
        );
    }

    #[test]
    fn histogram_counts_every_value() {
        let values = [120.0, 125.0, 130.0, 140.0, 160.0];
        let bins = histogram_bins(&values, 4);
        assert_eq!(bins.len(), 4);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), values.len());
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[3].count, 1);
        assert!((bins[0].start - 120.0).abs() < 1e-9);
        assert!((bins[3].end - 160.0).abs() < 1e-9);
        assert!((bins[1].center() - 135.0).abs() < 1e-9);
    }

    #[test]
    fn histogram_single_value() {
        let bins = histogram_bins(&[150.0, 150.0], 40);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 2);
        assert!((bins[0].center() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn histogram_empty() {
        assert!(histogram_bins(&[], 40).is_empty());
        assert!(histogram_bins(&[1.0], 0).is_empty());
    }

    #[test]
    fn test_format_load_message() {
        let msg = format_load_message(42, 5, "running_data.csv");
        assert_eq!(msg, "Loaded 42 workouts (5 types) from running_data.csv");
    }
}
