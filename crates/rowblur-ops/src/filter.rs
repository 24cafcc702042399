//! Flattened averaging window.
//!
//! For a pixel at row `i`, column `j` the kernel averages the bytes at linear
//! offsets `i*width + j + x` for `x` in `-(k+1)..=(k+1)`, where `k` is the
//! kernel size. The window therefore holds `2*(k+1)+1` positions.
//!
//! Two properties are kept deliberately literal:
//!
//! - The window walks the flattened row-major buffer, so near the ends of a
//!   row it picks up bytes from the neighbouring row. It is not a 2-D box.
//! - Positions outside `[0, width*height*3)` (or past the end of the buffer
//!   actually held) add nothing to the sum but still count in the divisor.
//!   Edges are therefore biased toward zero.
//!
//! Results are truncated toward zero. Every window reads the unfiltered
//! input; output bytes never feed back into later windows.

use crate::{OpsError, OpsResult};
use rowblur_core::PlaneSlice;
#[allow(unused_imports)]
use tracing::{debug, trace};

/// Number of positions in the window for `kernel_size`.
#[inline]
pub fn window_len(kernel_size: u32) -> usize {
    2 * (kernel_size as usize + 1) + 1
}

/// Averaged byte at linear index `idx`.
///
/// `width` and `height` are the full image dimensions; they only define the
/// `width*height*3` bound. The bound is further clipped to `input.len()`, so
/// a rank holding a partial slice never reads past what it owns.
pub fn average_at(input: &[u8], idx: usize, width: u32, height: u32, kernel_size: u32) -> u8 {
    let reach = kernel_size as usize + 1;
    let limit = (width as usize * height as usize * 3).min(input.len());

    let lo = idx.saturating_sub(reach);
    let hi = idx.saturating_add(reach + 1).min(limit);
    let sum: u64 = if lo < hi {
        input[lo..hi].iter().map(|&v| v as u64).sum()
    } else {
        0
    };

    (sum / window_len(kernel_size) as u64) as u8
}

/// Filters the first `count` bytes of `input`.
///
/// Returns a buffer the same length as `input`. Bytes at or after `count`
/// are copied through unfiltered.
pub fn smooth(
    input: &[u8],
    count: usize,
    width: u32,
    height: u32,
    kernel_size: u32,
) -> OpsResult<Vec<u8>> {
    trace!(len = input.len(), count, width, height, kernel_size, "smooth");
    if count > input.len() {
        return Err(OpsError::InvalidParameter(format!(
            "element count {} exceeds buffer length {}",
            count,
            input.len()
        )));
    }

    let mut out = input.to_vec();
    for (idx, dst) in out.iter_mut().enumerate().take(count) {
        *dst = average_at(input, idx, width, height, kernel_size);
    }
    Ok(out)
}

/// Filters a rank's slice, returning the slice with its bytes replaced.
///
/// Indices are local to the slice: the window never sees bytes held by
/// another rank.
pub fn smooth_slice(
    mut slice: PlaneSlice,
    count: usize,
    width: u32,
    height: u32,
    kernel_size: u32,
) -> OpsResult<PlaneSlice> {
    debug!(
        channel = %slice.channel(),
        offset = slice.offset(),
        count,
        kernel_size,
        "filtering slice"
    );
    let filtered = smooth(slice.data(), count, width, height, kernel_size)?;
    slice.replace_data(filtered)?;
    Ok(slice)
}

/// Filters a whole plane held in one buffer, without any partitioning.
pub fn smooth_plane(plane: &[u8], width: u32, height: u32, kernel_size: u32) -> OpsResult<Vec<u8>> {
    let expected = width as usize * height as usize;
    if plane.len() != expected {
        return Err(OpsError::InvalidDimensions(format!(
            "expected {} bytes for {}x{}, got {}",
            expected,
            width,
            height,
            plane.len()
        )));
    }
    smooth(plane, plane.len(), width, height, kernel_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowblur_core::Channel;

    fn variance(data: &[u8]) -> f64 {
        let n = data.len() as f64;
        let mean = data.iter().map(|&v| v as f64).sum::<f64>() / n;
        data.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n
    }

    fn stripes(len: usize) -> Vec<u8> {
        (0..len).map(|i| if i % 2 == 0 { 50 } else { 255 }).collect()
    }

    #[test]
    fn test_window_len() {
        assert_eq!(window_len(0), 3);
        assert_eq!(window_len(1), 5);
        assert_eq!(window_len(4), 11);
    }

    #[test]
    fn test_zero_plane_stays_zero() {
        let out = smooth_plane(&[0u8; 16], 4, 4, 0).unwrap();
        assert!(out.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_uniform_plane_interior() {
        let v = 200u8;
        let k = 2u32;
        let plane = vec![v; 8 * 4];
        let out = smooth_plane(&plane, 8, 4, k).unwrap();

        let edge = k as usize + 1;
        for (i, &o) in out.iter().enumerate() {
            if i >= edge && i < out.len() - edge {
                assert_eq!(o, v, "interior byte {} changed", i);
            }
        }
        // Edge bias: missing positions still count in the divisor.
        assert!(out[0] < v);
        assert!(out[out.len() - 1] < v);
    }

    #[test]
    fn test_edge_divisor_bias() {
        // idx 0, k = 0: window covers -1, 0, 1; only 0 and 1 are in range.
        let plane = [90u8, 90, 90, 90];
        assert_eq!(average_at(&plane, 0, 2, 2, 0), 60);
        assert_eq!(average_at(&plane, 1, 2, 2, 0), 90);
    }

    #[test]
    fn test_stripes_never_identity() {
        let plane = stripes(16);
        let out = smooth_plane(&plane, 4, 4, 0).unwrap();
        for (i, (&a, &b)) in plane.iter().zip(&out).enumerate() {
            assert_ne!(a, b, "byte {} unchanged", i);
        }
        assert_eq!(out[0], 101); // (50 + 255) / 3
        assert_eq!(out[1], 118); // (50 + 255 + 50) / 3
        assert_eq!(out[2], 186); // (255 + 50 + 255) / 3
    }

    #[test]
    fn test_window_crosses_rows() {
        // Last byte of row 0 sees the first byte of row 1.
        let plane = [0u8, 0, 0, 90, 90, 90];
        let out = smooth_plane(&plane, 3, 2, 0).unwrap();
        assert_eq!(out[2], 30);
    }

    #[test]
    fn test_larger_kernel_smooths_more() {
        let plane = stripes(64);
        let reach = 4;
        let interior = |d: &[u8]| variance(&d[reach..d.len() - reach]);

        let mut last = interior(&plane);
        for k in 0..3 {
            let out = smooth_plane(&plane, 16, 4, k).unwrap();
            let v = interior(&out);
            assert!(v <= last, "variance grew at k={}: {} > {}", k, v, last);
            last = v;
        }
    }

    #[test]
    fn test_reads_unfiltered_input() {
        // With feedback the second byte would see the already-lowered first byte.
        let plane = [255u8; 9];
        let out = smooth_plane(&plane, 3, 3, 0).unwrap();
        assert_eq!(out[0], 170);
        assert_eq!(out[1], 255);
    }

    #[test]
    fn test_count_limits_work() {
        let plane = stripes(8);
        let out = smooth(&plane, 4, 4, 2, 0).unwrap();
        assert_eq!(&out[4..], &plane[4..]);
        assert_ne!(out[3], plane[3]);
    }

    #[test]
    fn test_count_too_large() {
        assert!(smooth(&[1, 2, 3], 4, 3, 1, 0).is_err());
    }

    #[test]
    fn test_plane_size_check() {
        assert!(matches!(
            smooth_plane(&[0u8; 5], 2, 2, 0),
            Err(OpsError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_smooth_slice_keeps_identity() {
        let slice = PlaneSlice::new(Channel::Green, 8, stripes(8));
        let out = smooth_slice(slice, 8, 4, 4, 0).unwrap();
        assert_eq!(out.channel(), Channel::Green);
        assert_eq!(out.offset(), 8);
        assert_eq!(out.len(), 8);
        // Slice-local index 0 has nothing to its left.
        assert_eq!(out.data()[0], 101);
    }
}
