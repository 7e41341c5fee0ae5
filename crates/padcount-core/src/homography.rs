use crate::{sample_bilinear_rgb, RgbImageView};
use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Planar projective transform `p' ~ H p` in homogeneous coordinates.
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
}

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };

    Matrix3::<f64>::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn normalize_points4(pts: &[Point2<f32>; 4]) -> ([Point2<f64>; 4], Matrix3<f64>) {
    let cx = pts.iter().map(|p| p.x as f64).sum::<f64>() / 4.0;
    let cy = pts.iter().map(|p| p.y as f64).sum::<f64>() / 4.0;
    let mean_dist = pts
        .iter()
        .map(|p| (p.x as f64 - cx).hypot(p.y as f64 - cy))
        .sum::<f64>()
        / 4.0;

    let t = hartley_normalization(cx, cy, mean_dist);

    let out = pts.map(|p| {
        let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
        Point2::new(v[0], v[1])
    });

    (out, t)
}

/// Compute H such that `dst ~ H * src` from 4 point correspondences.
///
/// Corner order must be consistent between `src` and `dst`. Returns `None`
/// for degenerate configurations (three collinear points, repeated points).
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    // Unknowns: [h11 h12 h13 h21 h22 h23 h31 h32], with h33 = 1
    let (src_n, t_src) = normalize_points4(src);
    let (dst_n, t_dst) = normalize_points4(dst);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for k in 0..4 {
        let x = src_n[k].x;
        let y = src_n[k].y;
        let u = dst_n[k].x;
        let v = dst_n[k].y;

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = a.lu().solve(&b)?;
    if x.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let hn = Matrix3::<f64>::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );

    // H = T_dst^-1 * Hn * T_src, rescaled so h33 = 1
    let h = t_dst.try_inverse()? * hn * t_src;
    let s = h[(2, 2)];
    if s.abs() < 1e-12 {
        return None;
    }

    Some(Homography::new(h / s))
}

/// Warp `src` into `out`, an interleaved RGB canvas `out_w` pixels wide.
///
/// `h_src_from_dst` maps output pixel centres into source coordinates; pixels
/// that land outside the source read as black. Trailing bytes that do not
/// form a whole pixel are left untouched.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(src, h_src_from_dst, out))
)]
pub fn warp_perspective_rgb_into(
    src: &RgbImageView<'_>,
    h_src_from_dst: Homography,
    out_w: usize,
    out: &mut [u8],
) {
    if out_w == 0 {
        return;
    }
    for (i, px) in out.chunks_exact_mut(3).enumerate() {
        let (x, y) = (i % out_w, i / out_w);
        let ps = h_src_from_dst.apply(Point2::new(x as f32, y as f32));
        px.copy_from_slice(&sample_bilinear_rgb(src, ps.x, ps.y));
    }
}
