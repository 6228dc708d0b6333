use crate::attempt::capture_first_face;
use crate::error::AttendanceError;
use roster_core::{FaceExtractor, FrameSource, MatchPolicy, MatchResult, DEFAULT_TOLERANCE};
use roster_store::EmbeddingStore;

/// Searches the whole registry for the face in front of the camera.
///
/// Read-only: holds the store immutably and has no ledger.
pub struct IdentifyService<'a, X> {
    store: &'a EmbeddingStore,
    extractor: X,
    tolerance: f64,
    policy: MatchPolicy,
}

impl<'a, X: FaceExtractor> IdentifyService<'a, X> {
    pub fn new(store: &'a EmbeddingStore, extractor: X) -> Self {
        Self {
            store,
            extractor,
            tolerance: DEFAULT_TOLERANCE,
            policy: MatchPolicy::default(),
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Who is in front of the camera? `None` when nobody enrolled is within
    /// tolerance.
    pub fn identify<S>(&mut self, source: &mut S) -> Result<Option<MatchResult>, AttendanceError>
    where
        S: FrameSource + ?Sized,
    {
        let probe = capture_first_face(source, &mut self.extractor)?.embedding;

        tracing::debug!(stage = "matching", policy = %self.policy, "attempt stage");
        let found = self
            .policy
            .find_match(&probe, self.store.all(), self.tolerance)?;

        match &found {
            Some(m) => tracing::info!(name = %m.name, distance = m.distance, "identified"),
            None => tracing::info!("no enrolled identity within tolerance"),
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCamera, ScriptedExtractor};
    use roster_core::Embedding;

    fn enrolled(entries: &[(&str, &[f64])]) -> EmbeddingStore {
        let mut store = EmbeddingStore::open_in_memory(3).unwrap();
        for (name, values) in entries {
            store.put(name, Embedding::new(values.to_vec())).unwrap();
        }
        store
    }

    #[test]
    fn test_identify_first_and_nearest() {
        let store = enrolled(&[("Alice", &[0.5, 0.0, 0.0]), ("Bob", &[0.1, 0.0, 0.0])]);
        let mut camera = FakeCamera::working();

        let first = IdentifyService::new(&store, ScriptedExtractor::new().then_face(&[0.0, 0.0, 0.0]))
            .identify(&mut camera)
            .unwrap()
            .unwrap();
        assert_eq!(first.name, "Alice");

        let nearest = IdentifyService::new(&store, ScriptedExtractor::new().then_face(&[0.0, 0.0, 0.0]))
            .with_policy(MatchPolicy::Nearest)
            .identify(&mut camera)
            .unwrap()
            .unwrap();
        assert_eq!(nearest.name, "Bob");
        assert!((nearest.distance - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_identify_no_match() {
        let store = enrolled(&[("Alice", &[0.1, 0.2, 0.3])]);
        let mut camera = FakeCamera::working();

        let found = IdentifyService::new(&store, ScriptedExtractor::new().then_face(&[0.9, 0.9, 0.9]))
            .identify(&mut camera)
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_identify_empty_registry_and_nan_tolerance() {
        let empty = enrolled(&[]);
        let mut camera = FakeCamera::working();
        let found = IdentifyService::new(&empty, ScriptedExtractor::new().then_face(&[0.0, 0.0, 0.0]))
            .identify(&mut camera)
            .unwrap();
        assert!(found.is_none());

        let store = enrolled(&[("Alice", &[0.0, 0.0, 0.0])]);
        let found = IdentifyService::new(&store, ScriptedExtractor::new().then_face(&[9.0, 9.0, 9.0]))
            .with_tolerance(f64::NAN)
            .with_policy(MatchPolicy::Nearest)
            .identify(&mut camera)
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_identify_without_face() {
        let store = enrolled(&[("Alice", &[0.0, 0.0, 0.0])]);
        let mut camera = FakeCamera::working();
        let err = IdentifyService::new(&store, ScriptedExtractor::new().then(vec![]))
            .identify(&mut camera)
            .unwrap_err();
        assert!(matches!(err, AttendanceError::NoFaceDetected));
    }
}
