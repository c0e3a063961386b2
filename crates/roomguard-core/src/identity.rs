//! Trusted identities: enrolled face encodings and distance comparison.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One face embedding (128 floats for dlib-style encoders).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceEncoding(pub Vec<f32>);

impl FaceEncoding {
    /// Euclidean distance; `None` if the two encodings have different dimensions.
    pub fn distance(&self, other: &FaceEncoding) -> Option<f32> {
        if self.0.len() != other.0.len() || self.0.is_empty() {
            return None;
        }
        let sum: f32 = self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        Some(sum.sqrt())
    }
}

/// An enrolled identity: the source image and its first detected face.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustedFace {
    pub source: PathBuf,
    pub encoding: FaceEncoding,
}

/// Read-only set of enrolled faces, loaded once per session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrustedIdentitySet {
    faces: Vec<TrustedFace>,
}

impl TrustedIdentitySet {
    pub fn new(faces: Vec<TrustedFace>) -> Self {
        Self { faces }
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn faces(&self) -> &[TrustedFace] {
        &self.faces
    }

    /// True if `probe` is within `tolerance` of any enrolled face.
    pub fn recognizes(&self, probe: &FaceEncoding, tolerance: f32) -> bool {
        self.faces
            .iter()
            .filter_map(|f| f.encoding.distance(probe))
            .any(|d| d <= tolerance)
    }

    /// True if at least one of the observed faces is trusted.
    pub fn any_recognized(&self, observed: &[FaceEncoding], tolerance: f32) -> bool {
        observed.iter().any(|probe| self.recognizes(probe, tolerance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(v: &[f32]) -> TrustedFace {
        TrustedFace {
            source: PathBuf::from("owner.jpg"),
            encoding: FaceEncoding(v.to_vec()),
        }
    }

    #[test]
    fn distance_is_euclidean() {
        let a = FaceEncoding(vec![0.0, 0.0]);
        let b = FaceEncoding(vec![3.0, 4.0]);
        assert_eq!(a.distance(&b), Some(5.0));
    }

    #[test]
    fn mismatched_dimensions_never_match() {
        let set = TrustedIdentitySet::new(vec![face(&[0.1, 0.2, 0.3])]);
        assert!(!set.recognizes(&FaceEncoding(vec![0.1, 0.2]), 10.0));
    }

    #[test]
    fn recognizes_within_tolerance_only() {
        let set = TrustedIdentitySet::new(vec![face(&[0.0, 0.0]), face(&[1.0, 1.0])]);
        assert!(set.recognizes(&FaceEncoding(vec![0.3, 0.3]), 0.6));
        assert!(!set.recognizes(&FaceEncoding(vec![0.5, -0.5]), 0.6));
    }

    #[test]
    fn any_recognized_needs_one_trusted_face() {
        let set = TrustedIdentitySet::new(vec![face(&[0.0, 0.0])]);
        let stranger = FaceEncoding(vec![5.0, 5.0]);
        let owner = FaceEncoding(vec![0.1, 0.0]);
        assert!(!set.any_recognized(&[stranger.clone()], 0.6));
        assert!(set.any_recognized(&[stranger, owner], 0.6));
        assert!(!set.any_recognized(&[], 0.6));
    }

    #[test]
    fn empty_set_recognizes_nobody() {
        let set = TrustedIdentitySet::default();
        assert!(!set.recognizes(&FaceEncoding(vec![0.0]), 1.0));
    }
}
