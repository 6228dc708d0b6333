use crate::attempt::capture_first_face;
use crate::error::AttendanceError;
use roster_core::{is_blank, FaceExtractor, FrameSource, Identity};
use roster_store::EmbeddingStore;

/// Associates a name with a freshly captured embedding.
///
/// Holds the store mutably, so no check-in can read it mid-write.
pub struct EnrollmentService<'a, X> {
    store: &'a mut EmbeddingStore,
    extractor: X,
}

impl<'a, X: FaceExtractor> EnrollmentService<'a, X> {
    pub fn new(store: &'a mut EmbeddingStore, extractor: X) -> Self {
        Self { store, extractor }
    }

    /// Capture a frame from `source` and store its first face under `name`.
    ///
    /// Re-enrolling an existing name silently replaces its embedding.
    pub fn enroll<S>(&mut self, name: &str, source: &mut S) -> Result<Identity, AttendanceError>
    where
        S: FrameSource + ?Sized,
    {
        if is_blank(name) {
            return Err(AttendanceError::EmptyName);
        }
        let name = name.trim();

        let face = capture_first_face(source, &mut self.extractor)?;
        self.store.put(name, face.embedding.clone())?;

        tracing::info!(name, dim = face.embedding.dim(), "identity enrolled");

        Ok(Identity {
            name: name.to_string(),
            embedding: face.embedding,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{face, FakeCamera, ScriptedExtractor};
    use roster_core::Embedding;

    #[test]
    fn test_enroll_stores_embedding() {
        let mut store = EmbeddingStore::open_in_memory(3).unwrap();
        let mut camera = FakeCamera::working();
        let extractor = ScriptedExtractor::new().then_face(&[0.1, 0.2, 0.3]);

        let identity = EnrollmentService::new(&mut store, extractor)
            .enroll("Alice", &mut camera)
            .unwrap();

        assert_eq!(identity.name, "Alice");
        assert_eq!(store.get("Alice"), Some(&Embedding::new(vec![0.1, 0.2, 0.3])));
    }

    #[test]
    fn test_enroll_empty_name_leaves_store_unchanged() {
        let mut store = EmbeddingStore::open_in_memory(3).unwrap();
        let mut camera = FakeCamera::working();
        let extractor = ScriptedExtractor::new().then_face(&[0.1, 0.2, 0.3]);

        let err = EnrollmentService::new(&mut store, extractor)
            .enroll("  ", &mut camera)
            .unwrap_err();

        assert!(matches!(err, AttendanceError::EmptyName));
        assert!(store.is_empty());
        assert_eq!(camera.captures, 0);
    }

    #[test]
    fn test_enroll_capture_failure() {
        let mut store = EmbeddingStore::open_in_memory(3).unwrap();
        let mut camera = FakeCamera::broken();

        let err = EnrollmentService::new(&mut store, ScriptedExtractor::new())
            .enroll("Alice", &mut camera)
            .unwrap_err();

        assert!(matches!(err, AttendanceError::Capture(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_enroll_no_face() {
        let mut store = EmbeddingStore::open_in_memory(3).unwrap();
        let mut camera = FakeCamera::working();
        let extractor = ScriptedExtractor::new().then(vec![]);

        let err = EnrollmentService::new(&mut store, extractor)
            .enroll("Alice", &mut camera)
            .unwrap_err();

        assert!(matches!(err, AttendanceError::NoFaceDetected));
        assert!(store.is_empty());
    }

    #[test]
    fn test_enroll_uses_first_of_many_faces() {
        let mut store = EmbeddingStore::open_in_memory(2).unwrap();
        let mut camera = FakeCamera::working();
        let extractor =
            ScriptedExtractor::new().then(vec![face(&[1.0, 1.0]), face(&[9.0, 9.0])]);

        EnrollmentService::new(&mut store, extractor)
            .enroll("Alice", &mut camera)
            .unwrap();

        assert_eq!(store.get("Alice"), Some(&Embedding::new(vec![1.0, 1.0])));
    }

    #[test]
    fn test_reenroll_overwrites() {
        let mut store = EmbeddingStore::open_in_memory(2).unwrap();
        let mut camera = FakeCamera::working();
        let extractor = ScriptedExtractor::new()
            .then_face(&[1.0, 1.0])
            .then_face(&[2.0, 2.0]);

        let mut service = EnrollmentService::new(&mut store, extractor);
        service.enroll("Alice", &mut camera).unwrap();
        service.enroll("Alice", &mut camera).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("Alice"), Some(&Embedding::new(vec![2.0, 2.0])));
    }

    #[test]
    fn test_enroll_wrong_dimension() {
        let mut store = EmbeddingStore::open_in_memory(128).unwrap();
        let mut camera = FakeCamera::working();
        let extractor = ScriptedExtractor::new().then_face(&[1.0, 1.0]);

        let err = EnrollmentService::new(&mut store, extractor)
            .enroll("Alice", &mut camera)
            .unwrap_err();

        assert!(matches!(
            err,
            AttendanceError::DimensionMismatch { expected: 128, actual: 2 }
        ));
    }

    #[test]
    fn test_enroll_trims_name() {
        let mut store = EmbeddingStore::open_in_memory(1).unwrap();
        let mut camera = FakeCamera::working();
        let extractor = ScriptedExtractor::new().then_face(&[0.5]);

        EnrollmentService::new(&mut store, extractor)
            .enroll("  Bob \n", &mut camera)
            .unwrap();

        assert!(store.contains("Bob"));
    }
}
