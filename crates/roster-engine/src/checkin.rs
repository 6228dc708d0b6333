use crate::attempt::capture_first_face;
use crate::error::AttendanceError;
use roster_core::{
    distance, is_blank, is_match, CheckInEvent, FaceExtractor, FrameSource, DEFAULT_TOLERANCE,
};
use roster_store::{EmbeddingStore, Ledger};

/// Location recorded when the caller supplies none.
pub const DEFAULT_LOCATION: &str = "office";

/// Verifies a claimed identity against a live capture and records the
/// attendance event on success.
///
/// Matching is scoped to the claimed name: a face that matches some other
/// enrolled identity is still a mismatch.
pub struct CheckInService<'a, X> {
    store: &'a EmbeddingStore,
    ledger: &'a mut Ledger,
    extractor: X,
    tolerance: f64,
    default_location: String,
}

impl<'a, X: FaceExtractor> CheckInService<'a, X> {
    pub fn new(store: &'a EmbeddingStore, ledger: &'a mut Ledger, extractor: X) -> Self {
        Self {
            store,
            ledger,
            extractor,
            tolerance: DEFAULT_TOLERANCE,
            default_location: DEFAULT_LOCATION.to_string(),
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_default_location(mut self, location: impl Into<String>) -> Self {
        self.default_location = location.into();
        self
    }

    /// Check `name` in at `location` (or the default location).
    ///
    /// The store is consulted before the camera is touched, so an unknown
    /// name fails without a capture. Exactly one ledger row is appended on
    /// success and none on any failure.
    pub fn check_in<S>(
        &mut self,
        name: &str,
        source: &mut S,
        location: Option<&str>,
    ) -> Result<CheckInEvent, AttendanceError>
    where
        S: FrameSource + ?Sized,
    {
        if is_blank(name) {
            return Err(AttendanceError::EmptyName);
        }
        let name = name.trim();

        let stored = self
            .store
            .get(name)
            .ok_or_else(|| AttendanceError::UnknownIdentity(name.to_string()))?;

        let probe = capture_first_face(source, &mut self.extractor)?.embedding;

        tracing::debug!(stage = "matching", name, "attempt stage");
        let d = distance(stored, &probe)?;
        if !is_match(stored, &probe, self.tolerance)? {
            tracing::info!(name, distance = d, tolerance = self.tolerance, "check-in rejected");
            return Err(AttendanceError::FaceMismatch {
                name: name.to_string(),
                distance: d,
                tolerance: self.tolerance,
            });
        }

        let location = location
            .filter(|l| !is_blank(l))
            .map(str::trim)
            .unwrap_or(self.default_location.as_str());
        let event = self.ledger.append(name, location)?;

        tracing::info!(
            name,
            distance = d,
            location,
            time = %event.timestamp,
            "check-in recorded"
        );
        Ok(event)
    }
}
