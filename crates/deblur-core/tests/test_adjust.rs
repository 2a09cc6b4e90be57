#[allow(dead_code)]
mod common;

use approx::assert_abs_diff_eq;

use deblur_core::consts::EXPOSURE_KNEE;
use deblur_core::filters::adjust::expose;
use deblur_core::filters::{adjust, AdjustParams};
use deblur_core::raster::Raster;

// ---------------------------------------------------------------------------
// Per-pixel math
// ---------------------------------------------------------------------------

#[test]
fn default_params_leave_pixels_unchanged() {
    let params = AdjustParams::default();
    for rgb in [[0.0, 0.0, 0.0], [12.0, 127.0, 255.0], [300.0, -4.0, 90.5]] {
        let out = params.apply(rgb);
        for c in 0..3 {
            assert_abs_diff_eq!(out[c], rgb[c], epsilon = 1e-4);
        }
    }
}

#[test]
fn contrast_scales_around_mid_grey_then_adds_brightness() {
    let params = AdjustParams {
        contrast: 10.0,
        brightness: 10.0,
        ..AdjustParams::default()
    };
    let gain = 1.03f32.powf(10.0);
    let out = params.apply([200.0, 127.0, 27.0]);
    assert_abs_diff_eq!(out[0], 73.0 * gain + 137.0, epsilon = 1e-3);
    assert_abs_diff_eq!(out[1], 137.0, epsilon = 1e-3);
    assert_abs_diff_eq!(out[2], -100.0 * gain + 137.0, epsilon = 1e-3);
}

#[test]
fn zero_saturation_gives_channel_mean() {
    let params = AdjustParams {
        saturation: 0.0,
        ..AdjustParams::default()
    };
    assert_eq!(params.apply([30.0, 60.0, 90.0]), [60.0, 60.0, 60.0]);
}

#[test]
fn double_saturation_doubles_distance_from_mean() {
    let params = AdjustParams {
        saturation: 2.0,
        ..AdjustParams::default()
    };
    let out = params.apply([30.0, 60.0, 90.0]);
    assert_abs_diff_eq!(out[0], 0.0, epsilon = 1e-4);
    assert_abs_diff_eq!(out[1], 60.0, epsilon = 1e-4);
    assert_abs_diff_eq!(out[2], 120.0, epsilon = 1e-4);
}

// ---------------------------------------------------------------------------
// Exposure curve
// ---------------------------------------------------------------------------

#[test]
fn exposure_maps_knee_to_white_and_black_to_black() {
    for gamma in [0.5, 1.0, 1.6] {
        assert_abs_diff_eq!(expose(EXPOSURE_KNEE, 2.0, gamma), 255.0, epsilon = 1e-4);
        assert_abs_diff_eq!(expose(0.0, 2.0, gamma), 0.0, epsilon = 1e-4);
    }
}

#[test]
fn exposure_stays_in_range_below_the_knee() {
    let params = AdjustParams {
        exposure: 3.0,
        ..AdjustParams::default()
    };
    let mut v = 0.0;
    while v <= EXPOSURE_KNEE {
        let out = params.apply([v, v, v]);
        assert!((0.0..=255.0 + 1e-3).contains(&out[0]), "{v} -> {}", out[0]);
        v += 6.5;
    }
}

#[test]
fn exposure_compresses_highlights_above_the_knee() {
    assert_abs_diff_eq!(expose(300.0, 2.0, 1.0), 265.0, epsilon = 1e-4);
    // Non-positive exposure falls back to 20 stops of compression
    assert_abs_diff_eq!(expose(EXPOSURE_KNEE + 1048576.0, 0.0, 1.0), 256.0, epsilon = 1e-3);
}

#[test]
fn brighter_exposure_lifts_midtones() {
    let brighter = AdjustParams {
        exposure: 2.0,
        ..AdjustParams::default()
    };
    let darker = AdjustParams {
        exposure: 0.5,
        ..AdjustParams::default()
    };
    let mid = [100.0, 100.0, 100.0];
    assert!(brighter.apply(mid)[0] > 100.0);
    assert!(darker.apply(mid)[0] < brighter.apply(mid)[0]);
}

// ---------------------------------------------------------------------------
// Whole-raster pass
// ---------------------------------------------------------------------------

#[test]
fn adjust_with_default_params_returns_the_input() {
    let input = common::textured_raster(11, 7);
    let out = adjust(&input, &AdjustParams::default(), &common::pool(3), &common::detached())
        .unwrap()
        .unwrap();
    assert!(common::max_abs_diff(&out, &input) < 1e-4);
}

#[test]
fn adjust_mixes_channels_per_pixel() {
    let input = Raster::from_fn(5, 4, |c, x, y| (c * 40 + x * 7 + y) as f32);
    let params = AdjustParams {
        saturation: 0.0,
        ..AdjustParams::default()
    };
    let out = adjust(&input, &params, &common::pool(2), &common::detached())
        .unwrap()
        .unwrap();
    for x in 0..5 {
        for y in 0..4 {
            let mean = (input.get(0, x, y) + input.get(1, x, y) + input.get(2, x, y)) / 3.0;
            for c in 0..3 {
                assert_abs_diff_eq!(out.get(c, x, y), mean, epsilon = 1e-4);
            }
        }
    }
}

#[test]
fn adjust_reports_progress_and_honours_cancel() {
    let input = common::textured_raster(8, 8);
    let params = AdjustParams {
        contrast: 5.0,
        ..AdjustParams::default()
    };
    let (progress, ctx) = common::recording();
    assert!(adjust(&input, &params, &common::pool(2), &ctx).unwrap().is_some());
    assert_eq!(progress.updates.lock().unwrap().last().copied(), Some(1.0));

    assert!(adjust(&input, &params, &common::pool(2), &common::canceled())
        .unwrap()
        .is_none());
}
