//! One-hot label encoding
//!
//! Pure helpers that turn integer class labels into one-hot vectors and
//! back. The trainer consumes the batch form when computing categorical
//! cross-entropy.

use crate::utils::error::{CataractError, Result};

/// Encode a single label as a one-hot vector over `num_classes` classes
pub fn one_hot(label: usize, num_classes: usize) -> Result<Vec<f32>> {
    if label >= num_classes {
        return Err(CataractError::Dataset(format!(
            "Label {} out of range for {} classes",
            label, num_classes
        )));
    }

    let mut encoded = vec![0.0f32; num_classes];
    encoded[label] = 1.0;
    Ok(encoded)
}

/// Encode a batch of labels as a flat row-major one-hot matrix
/// of shape `[labels.len(), num_classes]`
pub fn one_hot_batch(labels: &[usize], num_classes: usize) -> Result<Vec<f32>> {
    let mut encoded = vec![0.0f32; labels.len() * num_classes];
    for (row, &label) in labels.iter().enumerate() {
        if label >= num_classes {
            return Err(CataractError::Dataset(format!(
                "Label {} out of range for {} classes",
                label, num_classes
            )));
        }
        encoded[row * num_classes + label] = 1.0;
    }
    Ok(encoded)
}

/// Decode a one-hot (or probability) vector back to the index of its
/// largest component
pub fn decode(encoded: &[f32]) -> Result<usize> {
    if encoded.is_empty() {
        return Err(CataractError::Dataset(
            "Cannot decode an empty vector".to_string(),
        ));
    }

    let mut best = 0usize;
    for (idx, &value) in encoded.iter().enumerate() {
        if value > encoded[best] {
            best = idx;
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_hot() {
        assert_eq!(one_hot(0, 2).unwrap(), vec![1.0, 0.0]);
        assert_eq!(one_hot(1, 2).unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_one_hot_out_of_range() {
        assert!(one_hot(2, 2).is_err());
    }

    #[test]
    fn test_one_hot_batch() {
        let encoded = one_hot_batch(&[0, 1, 1], 2).unwrap();
        assert_eq!(encoded, vec![1.0, 0.0, 0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode(&[0.9, 0.1]).unwrap(), 0);
        assert_eq!(decode(&[0.2, 0.8]).unwrap(), 1);
        // Ties resolve to the first maximum
        assert_eq!(decode(&[0.5, 0.5]).unwrap(), 0);
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn test_round_trip() {
        for label in 0..2 {
            let encoded = one_hot(label, 2).unwrap();
            assert_eq!(decode(&encoded).unwrap(), label);
        }
    }
}
