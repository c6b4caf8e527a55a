use anyhow::{anyhow, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PixelFormat {
    Rgb24,
    /// Packed 4:2:2, the default format of most USB webcams.
    Yuyv,
}

impl PixelFormat {
    pub(crate) fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"RGB3" => Some(Self::Rgb24),
            b"YUYV" => Some(Self::Yuyv),
            _ => None,
        }
    }

    fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb24 => 3,
            Self::Yuyv => 2,
        }
    }
}

/// Convert one captured buffer to packed RGB24.
///
/// `stride` is the driver's bytes per line. Zero means rows are packed.
pub(crate) fn normalize_to_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
) -> Result<Vec<u8>> {
    let pixel_count = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
    let packed = pack_rows(pixels, width as usize, height as usize, stride, format)?;
    match format {
        PixelFormat::Rgb24 => Ok(packed),
        PixelFormat::Yuyv => yuyv_to_rgb(&packed, pixel_count),
    }
}

/// Drop per-row padding. Drivers may also pad the buffer past the last row.
fn pack_rows(
    pixels: &[u8],
    width: usize,
    height: usize,
    stride: usize,
    format: PixelFormat,
) -> Result<Vec<u8>> {
    let row_len = width * format.bytes_per_pixel();
    let stride = if stride == 0 { row_len } else { stride };
    if stride < row_len {
        return Err(anyhow!(
            "{:?} stride {} shorter than a {} byte row",
            format,
            stride,
            row_len
        ));
    }
    let needed = match height {
        0 => 0,
        h => stride * (h - 1) + row_len,
    };
    if pixels.len() < needed {
        return Err(anyhow!(
            "{:?} frame length mismatch: expected {}, got {}",
            format,
            needed,
            pixels.len()
        ));
    }

    let mut packed = Vec::with_capacity(row_len * height);
    for row in 0..height {
        let start = row * stride;
        packed.extend_from_slice(&pixels[start..start + row_len]);
    }
    Ok(packed)
}

fn yuyv_to_rgb(pixels: &[u8], pixel_count: usize) -> Result<Vec<u8>> {
    let expected = pixel_count * 2;
    if pixel_count % 2 != 0 || pixels.len() < expected {
        return Err(anyhow!(
            "YUYV frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        ));
    }

    let mut rgb = Vec::with_capacity(pixel_count * 3);
    for chunk in pixels[..expected].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0], chunk[2]] {
            let y = y as f32;
            rgb.push(clamp_to_u8(y + 1.402_f32 * v));
            rgb.push(clamp_to_u8(y - 0.344_136_f32 * u - 0.714_136_f32 * v));
            rgb.push(clamp_to_u8(y + 1.772_f32 * u));
        }
    }
    Ok(rgb)
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yuyv_neutral_chroma_is_gray() -> Result<()> {
        let yuyv = [90u8, 128, 90, 128, 200, 128, 200, 128];
        let rgb = normalize_to_rgb(&yuyv, 4, 1, 0, PixelFormat::Yuyv)?;
        assert_eq!(rgb, vec![90, 90, 90, 90, 90, 90, 200, 200, 200, 200, 200, 200]);
        Ok(())
    }

    #[test]
    fn rgb_pass_through_trims_padding() -> Result<()> {
        let pixels = vec![1u8; 12];
        let rgb = normalize_to_rgb(&pixels, 1, 3, 0, PixelFormat::Rgb24)?;
        assert_eq!(rgb, vec![1u8; 9]);
        assert!(normalize_to_rgb(&pixels[..8], 1, 3, 0, PixelFormat::Rgb24).is_err());
        Ok(())
    }

    #[test]
    fn padded_rows_are_not_sheared() -> Result<()> {
        // 2x2 RGB rows of 6 bytes, each padded to an 8 byte stride.
        let pixels = [
            10u8, 11, 12, 20, 21, 22, 0xAA, 0xAA, //
            30, 31, 32, 40, 41, 42, 0xAA, 0xAA,
        ];
        let rgb = normalize_to_rgb(&pixels, 2, 2, 8, PixelFormat::Rgb24)?;
        assert_eq!(rgb, vec![10, 11, 12, 20, 21, 22, 30, 31, 32, 40, 41, 42]);

        // Last row needs no trailing padding.
        let rgb = normalize_to_rgb(&pixels[..14], 2, 2, 8, PixelFormat::Rgb24)?;
        assert_eq!(rgb.len(), 12);

        let yuyv = [90u8, 128, 90, 128, 0, 0, 200, 128, 200, 128, 0, 0];
        let rgb = normalize_to_rgb(&yuyv, 2, 2, 6, PixelFormat::Yuyv)?;
        assert_eq!(rgb, vec![90, 90, 90, 90, 90, 90, 200, 200, 200, 200, 200, 200]);
        Ok(())
    }

    #[test]
    fn stride_shorter_than_a_row_is_rejected() {
        assert!(normalize_to_rgb(&[0u8; 24], 2, 2, 4, PixelFormat::Rgb24).is_err());
    }

    #[test]
    fn fourcc_mapping() {
        assert_eq!(PixelFormat::from_fourcc(b"YUYV"), Some(PixelFormat::Yuyv));
        assert_eq!(PixelFormat::from_fourcc(b"MJPG"), None);
    }
}
