//! Face detections and the per-frame observation built from them

use serde::{Deserialize, Serialize};

/// Axis-aligned face box in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Horizontal centre of the box
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }
}

/// What the detector saw in one frame
///
/// With several faces the largest by area is chosen; equal areas keep the
/// first one the detector reported. Detector order is not guaranteed stable
/// across implementations, so neither is the tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FaceObservation {
    NoFace,
    OneFace { face: BoundingBox },
    MultipleFaces { chosen: BoundingBox, count: usize },
}

impl FaceObservation {
    pub fn from_detections(detections: &[BoundingBox]) -> Self {
        match detections {
            [] => FaceObservation::NoFace,
            [face] => FaceObservation::OneFace { face: *face },
            [first, rest @ ..] => {
                let chosen = rest.iter().fold(*first, |best, candidate| {
                    if candidate.area() > best.area() {
                        *candidate
                    } else {
                        best
                    }
                });
                FaceObservation::MultipleFaces {
                    chosen,
                    count: detections.len(),
                }
            }
        }
    }

    /// The face the estimator should measure, if any
    pub fn face(&self) -> Option<&BoundingBox> {
        match self {
            FaceObservation::NoFace => None,
            FaceObservation::OneFace { face } => Some(face),
            FaceObservation::MultipleFaces { chosen, .. } => Some(chosen),
        }
    }

    pub fn is_present(&self) -> bool {
        self.face().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_no_face() {
        let obs = FaceObservation::from_detections(&[]);
        assert_eq!(obs, FaceObservation::NoFace);
        assert!(!obs.is_present());
    }

    #[test]
    fn test_single_face() {
        let b = BoundingBox::new(10.0, 10.0, 80.0, 90.0);
        let obs = FaceObservation::from_detections(&[b]);
        assert_eq!(obs, FaceObservation::OneFace { face: b });
    }

    #[test]
    fn test_largest_area_wins() {
        let small = BoundingBox::new(0.0, 0.0, 50.0, 50.0);
        let wide_short = BoundingBox::new(0.0, 0.0, 100.0, 20.0);
        let big = BoundingBox::new(200.0, 0.0, 70.0, 70.0);
        let obs = FaceObservation::from_detections(&[small, wide_short, big]);
        assert_eq!(obs.face(), Some(&big));
        assert!(matches!(obs, FaceObservation::MultipleFaces { count: 3, .. }));
    }

    #[test]
    fn test_tie_keeps_first_match() {
        let a = BoundingBox::new(0.0, 0.0, 60.0, 60.0);
        let b = BoundingBox::new(300.0, 0.0, 60.0, 60.0);
        let obs = FaceObservation::from_detections(&[a, b]);
        assert_eq!(obs.face(), Some(&a));
    }
}
