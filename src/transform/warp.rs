//! Perspective skew by dragging one image corner.
//!
//! The source rectangle `(0,0) (w,0) (w,h) (0,h)` is mapped onto the same
//! quad with one corner moved; the output keeps the source size and is
//! filled by inverse mapping with bilinear sampling.

use crate::candidate::Corner;
use crate::image::{ImageView, OwnedImage};
use crate::template::rotate::sample_bilinear;
use crate::util::Unscored;
use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

/// Solves the homography taking four source points onto four destination
/// points (`h33 = 1`). Returns `None` for a singular configuration.
fn homography_from_quads(src: &[[f64; 2]; 4], dst: &[[f64; 2]; 4]) -> Option<Matrix3<f64>> {
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for i in 0..4 {
        let [x, y] = src[i];
        let [u, v] = dst[i];
        let r = 2 * i;
        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -u * x;
        a[(r, 7)] = -u * y;
        b[r] = u;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -v * x;
        a[(r + 1, 7)] = -v * y;
        b[r + 1] = v;
    }

    let h = a.lu().solve(&b)?;
    if h.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0))
}

/// True if the quad (in order) is strictly convex with non-zero area.
fn is_strictly_convex(quad: &[[f64; 2]; 4]) -> bool {
    let mut sign = 0.0f64;
    for i in 0..4 {
        let p0 = quad[i];
        let p1 = quad[(i + 1) % 4];
        let p2 = quad[(i + 2) % 4];
        let cross = (p1[0] - p0[0]) * (p2[1] - p1[1]) - (p1[1] - p0[1]) * (p2[0] - p1[0]);
        if cross.abs() < 1e-9 {
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

/// Homography mapping the `width × height` rectangle onto the skewed quad.
pub fn skew_homography(
    width: usize,
    height: usize,
    corner: Corner,
    magnitude: i32,
) -> Result<Matrix3<f64>, Unscored> {
    let (w, h) = (width as f64, height as f64);
    // Order: tl, tr, br, bl (perimeter order, required by the convexity test).
    let src = [[0.0, 0.0], [w, 0.0], [w, h], [0.0, h]];
    let moved = match corner {
        Corner::TopLeft => 0,
        Corner::TopRight => 1,
        Corner::BottomRight => 2,
        Corner::BottomLeft => 3,
    };
    let (sx, sy) = corner.outward();
    let m = f64::from(magnitude);
    let mut dst = src;
    dst[moved][0] += sx * m;
    dst[moved][1] += sy * m;

    if !is_strictly_convex(&dst) {
        return Err(Unscored::DegenerateGeometry("skewed quad is not convex"));
    }
    homography_from_quads(&src, &dst).ok_or(Unscored::DegenerateGeometry("singular homography"))
}

/// Warps `src` by dragging `corner` outward by `magnitude` pixels (inward
/// when negative). Uncovered pixels take `fill`.
pub fn perspective_skew(
    src: ImageView<'_, u8>,
    corner: Corner,
    magnitude: i32,
    fill: u8,
) -> Result<OwnedImage, Unscored> {
    let width = src.width();
    let height = src.height();
    let channels = src.channels();
    if width < 2 || height < 2 {
        return Err(Unscored::DegenerateGeometry("image too small to skew"));
    }
    let forward = skew_homography(width, height, corner, magnitude)?;
    let inverse = forward
        .try_inverse()
        .ok_or(Unscored::DegenerateGeometry("homography not invertible"))?;

    let mut out = vec![fill; width * height * channels];
    for y in 0..height {
        for x in 0..width {
            let p = inverse * Vector3::new(x as f64, y as f64, 1.0);
            if p[2].abs() < 1e-12 {
                continue;
            }
            let sx = (p[0] / p[2]) as f32;
            let sy = (p[1] / p[2]) as f32;
            let dst = (y * width + x) * channels;
            sample_bilinear(src, sx, sy, &mut out[dst..dst + channels]);
        }
    }
    Ok(OwnedImage::from_parts(out, width, height, channels))
}
