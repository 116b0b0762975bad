//! Simple aggregates over track samples.

use crate::error::{Result, TrackError};

/// Arithmetic mean of a non-empty sequence of numbers.
///
/// Returns [`TrackError::EmptyInput`] when the sequence is empty.
///
/// # Example
///
/// ```rust
/// use vessel_track::stats::mean;
///
/// assert_eq!(mean([1.0, 2.0, 6.0]).unwrap(), 3.0);
/// assert!(mean(Vec::<f64>::new()).is_err());
/// ```
pub fn mean<I>(values: I) -> Result<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        return Err(TrackError::EmptyInput {
            what: "values".to_string(),
        });
    }

    Ok(sum / count as f64)
}

/// Arithmetic mean of a numeric field selected from each record.
///
/// ```rust
/// use vessel_track::stats::mean_of_field;
///
/// struct Fix { speed: f64 }
/// let fixes = [Fix { speed: 4.0 }, Fix { speed: 6.0 }];
/// assert_eq!(mean_of_field(&fixes, |f| f.speed).unwrap(), 5.0);
/// ```
pub fn mean_of_field<T, F>(records: &[T], field: F) -> Result<f64>
where
    F: Fn(&T) -> f64,
{
    if records.is_empty() {
        return Err(TrackError::EmptyInput {
            what: "records".to_string(),
        });
    }
    mean(records.iter().map(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean([1.0, 2.0, 3.0, 4.0]).unwrap(), 2.5);
        assert_eq!(mean([148.0]).unwrap(), 148.0);
    }

    #[test]
    fn test_mean_empty() {
        let result = mean(std::iter::empty());
        assert!(matches!(result, Err(TrackError::EmptyInput { .. })));
    }

    #[test]
    fn test_mean_of_field() {
        let courses = [(0, 148.0), (1, 148.0), (2, 145.0)];
        let avg = mean_of_field(&courses, |c| c.1).unwrap();
        assert!((avg - 147.0).abs() < 1e-9);
    }

    #[test]
    fn test_mean_of_field_empty() {
        let empty: [(u8, f64); 0] = [];
        assert!(matches!(
            mean_of_field(&empty, |c| c.1),
            Err(TrackError::EmptyInput { .. })
        ));
    }
}
