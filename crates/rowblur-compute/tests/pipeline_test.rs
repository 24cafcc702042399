//! End-to-end tests for the distributed smoothing pipeline.

use rowblur_compute::{smooth_bitmap, smooth_file, ComputeError, JobConfig};
use rowblur_core::{Channel, PixelStore, Rgb};
use rowblur_io::{bmp, Bitmap};
use rowblur_ops::filter::{smooth, smooth_plane};
use tempfile::TempDir;

fn noisy(w: u32, h: u32) -> Bitmap {
    // Small LCG so the test image has no structure the window could hide.
    let mut state = 0x2545_f491u32;
    let mut next = || {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        (state >> 16) as u8
    };
    let pixels = (0..w * h).map(|_| Rgb::new(next(), next(), next())).collect();
    Bitmap::from_store(PixelStore::from_pixels(w, h, pixels).unwrap())
}

fn striped_rows(w: u32, h: u32) -> Bitmap {
    let pixels = (0..w * h)
        .map(|i| if i % 2 == 0 { Rgb::splat(50) } else { Rgb::splat(255) })
        .collect();
    Bitmap::from_store(PixelStore::from_pixels(w, h, pixels).unwrap())
}

#[test]
fn test_single_worker_matches_direct_kernel() {
    let input = noisy(9, 7);
    let config = JobConfig::new(2, 1).unwrap();
    let out = smooth_bitmap(input.clone(), &config).unwrap();

    for channel in Channel::ALL {
        let plane = input.pixels.plane(channel);
        let direct = smooth_plane(plane.data(), 9, 7, 2).unwrap();
        assert_eq!(out.pixels.plane(channel).data(), direct.as_slice(), "{}", channel);
    }
}

#[test]
fn test_each_partition_filtered_independently() {
    let (w, h) = (6u32, 8u32);
    let input = noisy(w, h);

    for workers in [1usize, 2, 4, 8] {
        let config = JobConfig::new(1, workers).unwrap();
        let out = smooth_bitmap(input.clone(), &config).unwrap();
        let count = (w * h) as usize / workers;

        for channel in Channel::ALL {
            let plane = input.pixels.plane(channel);
            let expected: Vec<u8> = plane
                .data()
                .chunks(count)
                .flat_map(|chunk| smooth(chunk, chunk.len(), w, h, 1).unwrap())
                .collect();
            assert_eq!(
                out.pixels.plane(channel).data(),
                expected.as_slice(),
                "workers={} channel={}",
                workers,
                channel
            );
        }
    }
}

#[test]
fn test_dimensions_preserved() {
    for workers in [1usize, 3] {
        let input = noisy(5, 9);
        let out = smooth_bitmap(input, &JobConfig::new(0, workers).unwrap()).unwrap();
        assert_eq!(out.width(), 5);
        assert_eq!(out.height(), 9);
        assert_eq!((out.frame_header.width, out.frame_header.height), (5, 9));
    }
}

#[test]
fn test_uniform_image_interior_unchanged() {
    let v = 137u8;
    let k = 1u32;
    let input = Bitmap::from_store(PixelStore::filled(8, 8, Rgb::splat(v)));
    let out = smooth_bitmap(input, &JobConfig::new(k, 1).unwrap()).unwrap();

    let edge = k as usize + 1;
    for channel in Channel::ALL {
        let plane = out.pixels.plane(channel);
        let data = plane.data();
        for (i, &b) in data.iter().enumerate() {
            if i >= edge && i < data.len() - edge {
                assert_eq!(b, v, "{} byte {}", channel, i);
            }
        }
    }
}

#[test]
fn test_all_zero_stays_zero() {
    let input = Bitmap::from_store(PixelStore::new(4, 4));
    let out = smooth_bitmap(input, &JobConfig::new(0, 2).unwrap()).unwrap();
    assert!(out.pixels.pixels().iter().all(|&px| px == Rgb::splat(0)));
}

#[test]
fn test_filter_is_never_identity() {
    let input = striped_rows(4, 4);
    let out = smooth_bitmap(input.clone(), &JobConfig::new(0, 1).unwrap()).unwrap();

    for channel in Channel::ALL {
        let before = input.pixels.plane(channel);
        let after = out.pixels.plane(channel);
        for (i, (a, b)) in before.data().iter().zip(after.data()).enumerate() {
            assert_ne!(a, b, "{} byte {} unchanged", channel, i);
        }
    }
}

#[test]
fn test_uneven_split_leaves_tail_unfiltered() {
    // 4x5 over 3 ranks: 6 bytes each, so the last 2 bytes belong to nobody.
    let input = striped_rows(4, 5);
    let out = smooth_bitmap(input.clone(), &JobConfig::new(0, 3).unwrap()).unwrap();

    let before = input.pixels.plane(Channel::Red);
    let after = out.pixels.plane(Channel::Red);
    assert_eq!(&after.data()[18..], &before.data()[18..]);
    assert_ne!(&after.data()[..18], &before.data()[..18]);
}

#[test]
fn test_file_pipeline() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("in.bmp");
    let dst = dir.path().join("out.bmp");

    let input = noisy(8, 6);
    bmp::write(&src, &input).unwrap();

    let config = JobConfig::new(1, 3).unwrap();
    smooth_file(&src, &dst, &config).unwrap();

    let written = std::fs::read(&dst).unwrap();
    let original = std::fs::read(&src).unwrap();
    assert_eq!(written.len(), original.len());
    assert_eq!(&written[..54], &original[..54]);

    let out = bmp::read(&dst).unwrap();
    let expected = smooth_bitmap(input, &config).unwrap();
    assert_eq!(out, expected);
}

#[test]
fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();
    let err = smooth_file(
        dir.path().join("missing.bmp"),
        dir.path().join("out.bmp"),
        &JobConfig::new(0, 2).unwrap(),
    )
    .unwrap_err();
    assert!(matches!(err, ComputeError::Io(_)));
}

#[test]
fn test_unwritable_output() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("in.bmp");
    bmp::write(&src, &noisy(2, 2)).unwrap();

    let err = smooth_file(
        &src,
        dir.path().join("no-such-dir").join("out.bmp"),
        &JobConfig::new(0, 1).unwrap(),
    )
    .unwrap_err();
    assert!(matches!(err, ComputeError::Io(_)));
}
