use crate::consts::MINIMAL_RING_RADIUS;
use crate::error::Result;

use super::validate_radius;

/// Integer pixel offsets lying on a rasterised circle.
///
/// Offsets are unique and the set is closed under 90° rotation. Devices
/// receive the set flattened as `[dx0, dy0, dx1, dy1, ...]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelOffsetSet {
    offsets: Vec<(i32, i32)>,
}

impl KernelOffsetSet {
    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.offsets.iter().copied()
    }

    /// Largest |dx| or |dy| in the set.
    pub fn extent(&self) -> i32 {
        self.offsets
            .iter()
            .map(|&(dx, dy)| dx.abs().max(dy.abs()))
            .max()
            .unwrap_or(0)
    }

    pub fn to_flat(&self) -> Vec<i32> {
        self.offsets.iter().flat_map(|&(dx, dy)| [dx, dy]).collect()
    }

    pub fn from_flat(flat: &[i32]) -> Self {
        Self {
            offsets: flat.chunks_exact(2).map(|p| (p[0], p[1])).collect(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Density {
    Full,
    /// Only every fourth step of the octant walk.
    Quarter,
}

/// Offsets on the circle of the given radius.
pub fn ring_offsets(radius: f32) -> Result<KernelOffsetSet> {
    validate_radius(radius)?;
    Ok(trace_circle(radius, Density::Full))
}

/// A sparser circle used for the fast method's coarse neighbourhood.
pub fn ring_offsets_quarter(radius: f32) -> Result<KernelOffsetSet> {
    validate_radius(radius)?;
    Ok(trace_circle(radius, Density::Quarter))
}

fn minimal_ring() -> KernelOffsetSet {
    KernelOffsetSet {
        offsets: vec![
            (1, 0),
            (-1, 0),
            (0, 1),
            (0, -1),
            (1, 1),
            (-1, 1),
            (1, -1),
            (-1, -1),
        ],
    }
}

/// Midpoint-style octant walk: starting at `(radius, 0)`, each step raises y
/// by one and recomputes x from `x² - 2y - 1`, mirroring every point into
/// all eight octants.
fn trace_circle(radius: f32, density: Density) -> KernelOffsetSet {
    if radius < MINIMAL_RING_RADIUS {
        return minimal_ring();
    }

    let r = radius.round() as i32;
    let mut offsets = vec![(r, 0), (-r, 0), (0, r), (0, -r)];

    let mut x = radius;
    let mut y = 0i32;
    loop {
        x = (x * x - 2.0 * y as f32 - 1.0).sqrt();
        y += 1;
        // NaN rounds to 0 and ends the walk
        let xr = x.round() as i32;
        if xr == 0 || xr < y {
            break;
        }
        if density == Density::Quarter && y % 4 != 0 {
            continue;
        }
        offsets.extend([(xr, y), (-xr, y), (xr, -y), (-xr, -y)]);
        if xr == y {
            break;
        }
        offsets.extend([(y, xr), (-y, xr), (y, -xr), (-y, -xr)]);
    }

    KernelOffsetSet { offsets }
}
