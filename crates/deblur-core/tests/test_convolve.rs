#[allow(dead_code)]
mod common;

use approx::assert_abs_diff_eq;
use ndarray::Array2;

use deblur_core::filters::convolve::{clamp_coord, ring_sum, window_mean};
use deblur_core::filters::{disk_blur, sharpen};
use deblur_core::kernel::{disk_weights, ring_offsets, DiskProfile};
use deblur_core::raster::Raster;

// ---------------------------------------------------------------------------
// Clamp-to-edge sampling
// ---------------------------------------------------------------------------

#[test]
fn ring_sum_at_corner_clamps_every_tap() {
    let plane = Array2::from_shape_fn((8, 8), |(x, y)| (x + 10 * y) as f32);
    let ring = ring_offsets(3.0).unwrap();

    let expected: f32 = ring
        .iter()
        .map(|(dx, dy)| {
            let x = clamp_coord(dx as isize, 8);
            let y = clamp_coord(dy as isize, 8);
            (x + 10 * y) as f32
        })
        .sum();
    assert_abs_diff_eq!(ring_sum(&plane.view(), &ring, 0, 0), expected, epsilon = 1e-4);
}

#[test]
fn window_mean_on_flat_plane_is_the_value() {
    let plane = Array2::from_elem((6, 4), 42.0f32);
    let disk = disk_weights(5.0, DiskProfile::Binary).unwrap();
    for (x, y) in [(0, 0), (5, 3), (2, 1)] {
        assert_abs_diff_eq!(window_mean(&plane.view(), &disk, x, y), 42.0, epsilon = 1e-4);
    }
}

// ---------------------------------------------------------------------------
// Disk blur
// ---------------------------------------------------------------------------

#[test]
fn disk_blur_spreads_single_bright_pixel() {
    let mut input = Raster::new(3, 3);
    for c in 0..3 {
        input.set(c, 1, 1, 255.0);
    }
    let out = disk_blur(&input, 1.0, &common::pool(2), &common::detached())
        .unwrap()
        .unwrap();
    for c in 0..3 {
        for x in 0..3 {
            for y in 0..3 {
                assert_abs_diff_eq!(out.get(c, x, y), 255.0 / 9.0, epsilon = 1e-4);
            }
        }
    }
}

#[test]
fn disk_blur_includes_cells_on_the_rim() {
    // distance 2 is exactly r + 0.5 for r = 1.5
    let mut input = Raster::new(5, 5);
    for c in 0..3 {
        input.set(c, 4, 2, 90.0);
    }
    let out = disk_blur(&input, 1.5, &common::pool(2), &common::detached())
        .unwrap()
        .unwrap();
    for c in 0..3 {
        assert_abs_diff_eq!(out.get(c, 2, 2), 90.0 / 13.0, epsilon = 1e-4);
    }
}

#[test]
fn disk_blur_preserves_flat_image() {
    let input = Raster::filled(10, 7, 128.0);
    let out = disk_blur(&input, 3.0, &common::pool(3), &common::detached())
        .unwrap()
        .unwrap();
    assert!(common::max_abs_diff(&input, &out) < 1e-4);
}

#[test]
fn disk_blur_canceled_returns_none() {
    let input = Raster::filled(10, 7, 1.0);
    let out = disk_blur(&input, 2.0, &common::pool(2), &common::canceled()).unwrap();
    assert!(out.is_none());
}

// ---------------------------------------------------------------------------
// Sharpen
// ---------------------------------------------------------------------------

#[test]
fn sharpen_keeps_flat_image() {
    let input = Raster::filled(9, 9, 80.0);
    let out = sharpen(&input, 2.0, 2.0, &common::pool(2), &common::detached())
        .unwrap()
        .unwrap();
    assert!(common::max_abs_diff(&input, &out) < 1e-3);
}

#[test]
fn sharpen_overshoots_both_sides_of_an_edge() {
    let input = Raster::from_fn(12, 6, |_, x, _| if x < 6 { 50.0 } else { 200.0 });
    // weight = r² gives a blend of 1
    let out = sharpen(&input, 4.0, 2.0, &common::pool(2), &common::detached())
        .unwrap()
        .unwrap();
    assert!(out.get(0, 5, 3) < 50.0);
    assert!(out.get(0, 6, 3) > 200.0);
    assert_abs_diff_eq!(out.get(0, 0, 3), 50.0, epsilon = 1e-3);
}

#[test]
fn sharpen_zero_weight_is_identity() {
    let input = common::textured_raster(11, 8);
    let out = sharpen(&input, 0.0, 3.0, &common::pool(2), &common::detached())
        .unwrap()
        .unwrap();
    assert!(common::max_abs_diff(&input, &out) < 1e-4);
}
