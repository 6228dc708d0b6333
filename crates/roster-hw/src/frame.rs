//! Raw buffer conversions — YUYV/Y16 to grayscale, dark-frame detection.

/// Convert packed YUYV (4:2:2) to grayscale by extracting the Y channel.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V].
/// Grayscale = every even-indexed byte.
pub fn yuyv_to_grayscale(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }
    Ok(yuyv[..expected].iter().step_by(2).copied().collect())
}

/// Convert 16-bit little-endian grayscale to 8-bit by keeping the high byte.
pub fn y16_to_grayscale(y16: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if y16.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: y16.len(),
        });
    }
    Ok(y16[..expected].chunks_exact(2).map(|px| px[1]).collect())
}

/// Copy an 8-bit grayscale buffer, trimming driver padding.
pub fn grey_to_grayscale(grey: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height) as usize;
    if grey.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: grey.len(),
        });
    }
    Ok(grey[..expected].to_vec())
}

/// True if more than `threshold_pct` of pixels are in the darkest bucket (0–31).
///
/// Cameras commonly deliver a few black frames right after the stream starts.
pub fn is_dark_frame(gray: &[u8], threshold_pct: f32) -> bool {
    if gray.is_empty() {
        return true;
    }
    let dark_count = gray.iter().filter(|&&p| p < 32).count();
    (dark_count as f32 / gray.len() as f32) > threshold_pct
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid buffer length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_takes_luma_and_ignores_padding() {
        // 2x2 frame plus 4 bytes of driver padding.
        let yuyv = vec![10, 90, 20, 91, 30, 92, 40, 93, 0xEE, 0xEE, 0xEE, 0xEE];
        assert_eq!(yuyv_to_grayscale(&yuyv, 2, 2).unwrap(), vec![10, 20, 30, 40]);
        match yuyv_to_grayscale(&yuyv[..6], 2, 2) {
            Err(FrameError::InvalidLength { expected, actual }) => {
                assert_eq!((expected, actual), (8, 6));
            }
            other => panic!("expected InvalidLength, got {other:?}"),
        }
    }

    #[test]
    fn test_y16_keeps_high_byte() {
        // Two pixels: 0x12FF and 0x8000 (little-endian)
        let y16 = vec![0xFF, 0x12, 0x00, 0x80];
        assert_eq!(y16_to_grayscale(&y16, 2, 1).unwrap(), vec![0x12, 0x80]);
    }

    #[test]
    fn test_y16_low_byte_cannot_lift_dark_pixel() {
        // 0x1FFF is bright in 16 bits of noise but maps to 0x1F, still dark.
        let y16 = [0xFF, 0x1F].repeat(4);
        let gray = y16_to_grayscale(&y16, 4, 1).unwrap();
        assert_eq!(gray, vec![0x1F; 4]);
        assert!(is_dark_frame(&gray, 0.95));
    }

    #[test]
    fn test_grey_trims_padding() {
        let grey = vec![1, 2, 3, 4, 0, 0];
        assert_eq!(grey_to_grayscale(&grey, 2, 2).unwrap(), vec![1, 2, 3, 4]);
        assert!(grey_to_grayscale(&grey, 4, 2).is_err());
    }

    #[test]
    fn test_dark_bucket_edge() {
        // 31 counts as dark, 32 does not.
        assert!(is_dark_frame(&[31; 8], 0.95));
        assert!(!is_dark_frame(&[32; 8], 0.95));
    }

    #[test]
    fn test_dark_ratio_is_strictly_above_threshold() {
        let mut gray = vec![0u8; 3];
        gray.push(255);
        // 75% dark
        assert!(!is_dark_frame(&gray, 0.75));
        assert!(is_dark_frame(&gray, 0.74));
        assert!(is_dark_frame(&[], 0.95));
    }
}
