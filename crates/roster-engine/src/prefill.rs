use roster_core::{RawImage, TextRecognizer};

/// Suggest a name from handwriting in `image`.
///
/// Returns the first non-blank recognized line, trimmed. Any recognizer
/// failure yields `None` so the caller falls back to manual entry.
pub fn prefill_name<R>(recognizer: &mut R, image: &RawImage) -> Option<String>
where
    R: TextRecognizer + ?Sized,
{
    match recognizer.recognize_text(image) {
        Ok(text) => {
            let name = text
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(str::to_string);
            if name.is_none() {
                tracing::warn!("text recognizer returned no text");
            }
            name
        }
        Err(e) => {
            tracing::warn!(error = %e, "name recognition failed; enter the name manually");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{frame, FixedText};

    #[test]
    fn test_first_nonblank_line() {
        let mut ocr = FixedText(Ok("\n  Alice Zhang \nsecond line".into()));
        assert_eq!(prefill_name(&mut ocr, &frame()).as_deref(), Some("Alice Zhang"));
    }

    #[test]
    fn test_blank_text_is_none() {
        let mut ocr = FixedText(Ok("  \n \t".into()));
        assert_eq!(prefill_name(&mut ocr, &frame()), None);
    }

    #[test]
    fn test_failure_is_none() {
        let mut ocr = FixedText(Err("model missing".into()));
        assert_eq!(prefill_name(&mut ocr, &frame()), None);
    }
}
