use std::collections::HashSet;

use deblur_core::error::DeblurError;
use deblur_core::kernel::{disk_weights, ring_offsets, ring_offsets_quarter, DiskProfile};

const RADII: [f32; 7] = [0.5, 1.0, 2.5, 3.0, 5.0, 7.3, 12.0];

// ---------------------------------------------------------------------------
// Ring offsets
// ---------------------------------------------------------------------------

#[test]
fn ring_is_closed_under_quarter_turns() {
    for r in RADII {
        for ring in [ring_offsets(r).unwrap(), ring_offsets_quarter(r).unwrap()] {
            let set: HashSet<(i32, i32)> = ring.iter().collect();
            for (dx, dy) in ring.iter() {
                assert!(set.contains(&(-dy, dx)), "r={r}: ({dx},{dy}) rotated missing");
            }
        }
    }
}

#[test]
fn ring_has_no_duplicates() {
    for r in RADII {
        let ring = ring_offsets(r).unwrap();
        let set: HashSet<(i32, i32)> = ring.iter().collect();
        assert_eq!(set.len(), ring.len(), "r={r}");
    }
}

#[test]
fn ring_points_lie_near_the_radius() {
    for r in [3.0f32, 5.0, 12.0] {
        for (dx, dy) in ring_offsets(r).unwrap().iter() {
            let d = ((dx * dx + dy * dy) as f32).sqrt();
            assert!((d - r).abs() < 1.0, "r={r}: ({dx},{dy}) at distance {d}");
        }
    }
}

#[test]
fn quarter_ring_is_a_subset() {
    for r in RADII {
        let full: HashSet<(i32, i32)> = ring_offsets(r).unwrap().iter().collect();
        let quarter = ring_offsets_quarter(r).unwrap();
        assert!(quarter.len() <= full.len());
        assert!(quarter.iter().all(|p| full.contains(&p)));
    }
}

#[test]
fn quarter_ring_is_sparser_for_large_radii() {
    assert!(ring_offsets_quarter(12.0).unwrap().len() < ring_offsets(12.0).unwrap().len());
}

#[test]
fn tiny_radius_uses_minimal_ring() {
    let ring = ring_offsets(0.3).unwrap();
    assert_eq!(ring.len(), 8);
    assert_eq!(ring.extent(), 1);
    assert!(!ring.iter().any(|p| p == (0, 0)));
}

#[test]
fn invalid_radius_is_rejected() {
    for r in [0.0f32, -1.0, f32::NAN, f32::INFINITY] {
        assert!(matches!(ring_offsets(r), Err(DeblurError::InvalidKernelRadius { .. })));
        assert!(matches!(
            disk_weights(r, DiskProfile::Binary),
            Err(DeblurError::InvalidKernelRadius { .. })
        ));
    }
}

// ---------------------------------------------------------------------------
// Disk weights
// ---------------------------------------------------------------------------

#[test]
fn binary_disk_radius_two_has_21_cells() {
    let disk = disk_weights(2.0, DiskProfile::Binary).unwrap();
    assert_eq!(disk.size(), 5);
    assert_eq!(disk.total(), 21.0);
    assert_eq!(disk.weight(2, 2), 0.0);
    assert_eq!(disk.weight(-2, 1), 1.0);
}

#[test]
fn disk_is_symmetric() {
    for profile in [DiskProfile::Binary, DiskProfile::Graded] {
        let disk = disk_weights(4.2, profile).unwrap();
        let half = disk.half_width() as isize;
        for dx in -half..=half {
            for dy in -half..=half {
                assert_eq!(disk.weight(dx, dy), disk.weight(-dy, dx));
                assert_eq!(disk.weight(dx, dy), disk.weight(-dx, -dy));
            }
        }
    }
}

#[test]
fn graded_disk_fades_at_the_rim() {
    let disk = disk_weights(3.0, DiskProfile::Graded).unwrap();
    assert_eq!(disk.weight(0, 0), 0.0);
    assert_eq!(disk.weight(1, 1), 1.0);
    // distance sqrt(10) ≈ 3.16: (3 - 3.16 + 0.5) * 1.6 ≈ 0.54
    let rim = disk.weight(3, 1);
    assert!(rim > 0.0 && rim < 1.0, "rim weight {rim}");
    assert_eq!(disk.weight(3, 3), 0.0);
}
