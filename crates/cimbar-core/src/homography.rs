use crate::consts::{grid_cells, CELL_SIZE, FINDER_CELLS};
use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector2, Vector3};

/// Barcode outer corners, ordered TL, TR, BR, BL.
pub type Quad = [Point2<f32>; 4];

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomographyError {
    #[error("linear system is singular (pivot below 1e-12)")]
    Singular,
}

/// Plane projective transform `p' ~ H p`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    /// Like [`apply`](Self::apply), but refuses points that project through
    /// the plane at infinity.
    #[inline]
    pub fn apply_checked(&self, p: Point2<f32>) -> Option<Point2<f32>> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        if w.abs() < 1e-10 {
            return None;
        }
        Some(Point2::new((v[0] / w) as f32, (v[1] / w) as f32))
    }
}

/// Solve for H (with `h22 = 1`) from four point correspondences
/// `src[i] -> dst[i]` via the 8x8 DLT system.
///
/// Gaussian elimination with partial pivoting; a pivot magnitude below
/// `1e-12` (degenerate correspondences) fails with
/// [`HomographyError::Singular`].
pub fn homography_from_quad(src: &Quad, dst: &Quad) -> Result<Homography, HomographyError> {
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for k in 0..4 {
        let x = src[k].x as f64;
        let y = src[k].y as f64;
        let u = dst[k].x as f64;
        let v = dst[k].y as f64;

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -x * u;
        a[(r0, 7)] = -y * u;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -x * v;
        a[(r1, 7)] = -y * v;
        b[r1] = v;
    }

    let h = solve_8x8(&mut a, &mut b)?;

    Ok(Homography::new(Matrix3::new(
        h[0], h[1], h[2], //
        h[3], h[4], h[5], //
        h[6], h[7], 1.0,
    )))
}

fn solve_8x8(
    a: &mut SMatrix<f64, 8, 8>,
    b: &mut SVector<f64, 8>,
) -> Result<SVector<f64, 8>, HomographyError> {
    const N: usize = 8;

    for col in 0..N {
        let mut pivot = col;
        for row in (col + 1)..N {
            if a[(row, col)].abs() > a[(pivot, col)].abs() {
                pivot = row;
            }
        }
        if a[(pivot, col)].abs() < 1e-12 {
            return Err(HomographyError::Singular);
        }
        if pivot != col {
            a.swap_rows(col, pivot);
            b.swap_rows(col, pivot);
        }

        for row in (col + 1)..N {
            let f = a[(row, col)] / a[(col, col)];
            if f == 0.0 {
                continue;
            }
            for c in col..N {
                a[(row, c)] -= f * a[(col, c)];
            }
            b[row] -= f * b[col];
        }
    }

    let mut x = SVector::<f64, 8>::zeros();
    for row in (0..N).rev() {
        let mut sum = b[row];
        for c in (row + 1)..N {
            sum -= a[(row, c)] * x[c];
        }
        x[row] = sum / a[(row, row)];
    }
    Ok(x)
}

/// The canonical destination quad of a rectified frame:
/// `(0,0), (s,0), (s,s), (0,s)`.
pub fn dest_quad(frame_size: u32) -> Quad {
    let s = frame_size as f32;
    [
        Point2::new(0.0, 0.0),
        Point2::new(s, 0.0),
        Point2::new(s, s),
        Point2::new(0.0, s),
    ]
}

/// Estimate the barcode's outer corners from the TL and BR finder centers
/// alone.
///
/// The finder-to-finder diagonal spans `(cells - 3) * CELL_SIZE` canonical
/// pixels along each barcode axis; the y axis is the x axis rotated 90
/// degrees clockwise in screen coordinates. Returns `None` when the anchors
/// are degenerate (too close together, or a frame too small to carry data).
pub fn corners_from_diagonal(
    tl: Point2<f32>,
    br: Point2<f32>,
    frame_size: u32,
) -> Option<Quad> {
    let cells = grid_cells(frame_size);
    let n = (cells as i64 - 3) as f32 * CELL_SIZE as f32;
    let dx = br.x - tl.x;
    let dy = br.y - tl.y;
    if n <= 0.0 || (dx * dx + dy * dy).sqrt() < 10.0 {
        return None;
    }

    let ux = Vector2::new((dx + dy) / (2.0 * n), (dy - dx) / (2.0 * n));
    let uy = Vector2::new(-(dy - dx) / (2.0 * n), (dx + dy) / (2.0 * n));

    let pad = 1.5 * CELL_SIZE as f32;
    let origin = tl - pad * (ux + uy);
    let s = frame_size as f32;

    Some([
        origin,
        origin + s * ux,
        origin + s * (ux + uy),
        origin + s * uy,
    ])
}

/// Estimate the barcode's outer corners from all four finder centers.
///
/// Each center sits 1.5 cells inside the barcode along both adjacent edges,
/// so it is pushed outward along the directions away from its two edge
/// neighbors, scaled by the locally observed cell size. Rejects anchor sets
/// that do not form a convex quad (the two-anchor path takes over).
pub fn corners_from_anchors(
    tl: Point2<f32>,
    tr: Point2<f32>,
    bl: Point2<f32>,
    br: Point2<f32>,
    frame_size: u32,
) -> Option<Quad> {
    // adjacent finder centers are (cells - 3) cells apart
    let span = (grid_cells(frame_size).saturating_sub(FINDER_CELLS) as f32).max(1.0);

    let out = [
        push_out(tl, tr, bl, span),
        push_out(tr, tl, br, span),
        push_out(br, bl, tr, span),
        push_out(bl, br, tl, span),
    ];
    let quad = [out[0]?, out[1]?, out[2]?, out[3]?];

    if !is_convex(&quad) {
        return None;
    }
    Some(quad)
}

/// Offset `corner` outward by 1.5 locally-scaled cells away from each of its
/// two edge neighbors.
fn push_out(
    corner: Point2<f32>,
    n1: Point2<f32>,
    n2: Point2<f32>,
    span_cells: f32,
) -> Option<Point2<f32>> {
    let away1 = corner - n1;
    let away2 = corner - n2;
    let len1 = away1.norm();
    let len2 = away2.norm();
    if len1 < 1e-3 || len2 < 1e-3 {
        return None;
    }
    let cell1 = len1 / span_cells;
    let cell2 = len2 / span_cells;
    Some(corner + (1.5 * cell1 / len1) * away1 + (1.5 * cell2 / len2) * away2)
}

fn is_convex(quad: &Quad) -> bool {
    let mut sign = 0.0f32;
    for i in 0..4 {
        let a = quad[i];
        let b = quad[(i + 1) % 4];
        let c = quad[(i + 2) % 4];
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross == 0.0 {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rotate(p: Point2<f32>, origin: Point2<f32>, theta: f32) -> Point2<f32> {
        let (s, c) = theta.sin_cos();
        let d = p - origin;
        Point2::new(origin.x + c * d.x - s * d.y, origin.y + s * d.x + c * d.y)
    }

    #[test]
    fn homography_maps_unit_square_to_quad() {
        let src = dest_quad(1);
        let dst: Quad = [
            Point2::new(10.0, 20.0),
            Point2::new(110.0, 25.0),
            Point2::new(105.0, 130.0),
            Point2::new(8.0, 118.0),
        ];
        let h = homography_from_quad(&src, &dst).expect("solvable");
        for (s, d) in src.iter().zip(dst.iter()) {
            let m = h.apply(*s);
            assert_relative_eq!(m.x, d.x, epsilon = 1e-3);
            assert_relative_eq!(m.y, d.y, epsilon = 1e-3);
        }
    }

    #[test]
    fn degenerate_quad_is_singular() {
        let src = dest_quad(256);
        let p = Point2::new(5.0, 5.0);
        let dst: Quad = [p, p, p, p];
        assert_eq!(
            homography_from_quad(&src, &dst),
            Err(HomographyError::Singular)
        );
    }

    #[test]
    fn diagonal_corners_form_a_square_under_rotation() {
        let frame = 256u32;
        let pad = 1.5 * CELL_SIZE as f32;
        let origin = Point2::new(300.0, 240.0);

        for deg in [0.0f32, 15.0, 30.0, 45.0] {
            let theta = deg.to_radians();
            let tl = rotate(origin + Vector2::new(pad, pad), origin, theta);
            let br = rotate(
                origin + Vector2::new(frame as f32 - pad, frame as f32 - pad),
                origin,
                theta,
            );

            let quad = corners_from_diagonal(tl, br, frame).expect("valid anchors");
            let sides = [
                (quad[1] - quad[0]).norm(),
                (quad[2] - quad[1]).norm(),
                (quad[3] - quad[2]).norm(),
                (quad[0] - quad[3]).norm(),
            ];
            for side in sides {
                assert!(
                    (side - frame as f32).abs() < 2.0,
                    "side {side} off at {deg} deg"
                );
            }
            let d0 = (quad[2] - quad[0]).norm();
            let d1 = (quad[3] - quad[1]).norm();
            assert!((d0 - d1).abs() < 2.0, "diagonals differ at {deg} deg");
        }
    }

    #[test]
    fn diagonal_rejects_close_anchors() {
        let tl = Point2::new(100.0, 100.0);
        let br = Point2::new(104.0, 103.0);
        assert!(corners_from_diagonal(tl, br, 256).is_none());
    }

    #[test]
    fn four_anchor_corners_extend_outward() {
        let frame = 256u32;
        let pad = 1.5 * CELL_SIZE as f32;
        let s = frame as f32;
        let tl = Point2::new(pad, pad);
        let tr = Point2::new(s - pad, pad);
        let bl = Point2::new(pad, s - pad);
        let br = Point2::new(s - pad, s - pad);

        let quad = corners_from_anchors(tl, tr, bl, br, frame).expect("convex");
        assert_relative_eq!(quad[0].x, 0.0, epsilon = 0.5);
        assert_relative_eq!(quad[0].y, 0.0, epsilon = 0.5);
        assert_relative_eq!(quad[2].x, s, epsilon = 0.5);
        assert_relative_eq!(quad[2].y, s, epsilon = 0.5);
    }

    #[test]
    fn non_convex_anchor_set_is_rejected() {
        let tl = Point2::new(0.0, 0.0);
        let tr = Point2::new(100.0, 0.0);
        // "bl" dragged across the diagonal
        let bl = Point2::new(120.0, 20.0);
        let br = Point2::new(100.0, 100.0);
        assert!(corners_from_anchors(tl, tr, bl, br, 256).is_none());
    }
}
