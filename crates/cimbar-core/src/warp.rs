use crate::homography::{dest_quad, homography_from_quad, Homography, HomographyError, Quad};
use crate::image::{get_rgb, RgbImage, RgbImageView};
use nalgebra::Point2;

/// Warp `src` into a `frame_size x frame_size` rectified image.
///
/// `h_src_from_dst` maps destination pixel centers into source coordinates.
/// Sampling is nearest-neighbor: interpolation smears adjacent tiles into
/// each other on the 8px cell grid. Destinations that project through the
/// plane at infinity come out opaque black.
pub fn warp_perspective(
    src: &RgbImageView<'_>,
    h_src_from_dst: &Homography,
    frame_size: u32,
) -> RgbImage {
    let size = frame_size as usize;
    let mut out = RgbImage::new(size, size);

    for y in 0..size {
        for x in 0..size {
            let pd = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
            let Some(ps) = h_src_from_dst.apply_checked(pd) else {
                continue;
            };
            let rgb = get_rgb(src, ps.x.floor() as i32, ps.y.floor() as i32);
            out.set_pixel(x, y, rgb);
        }
    }
    out
}

/// Rectify the quad `corners` (barcode outer corners in source coordinates,
/// ordered TL, TR, BR, BL) into a `frame_size x frame_size` image.
pub fn warp_quad(
    src: &RgbImageView<'_>,
    corners: &Quad,
    frame_size: u32,
) -> Result<RgbImage, HomographyError> {
    let h = homography_from_quad(&dest_quad(frame_size), corners)?;
    Ok(warp_perspective(src, &h, frame_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_quad_warp_copies_pixels() {
        let mut src = RgbImage::new(16, 16);
        src.set_pixel(3, 5, [10, 20, 30]);
        src.set_pixel(12, 9, [40, 50, 60]);

        let corners = dest_quad(16);
        let out = warp_quad(&src.view(), &corners, 16).expect("identity warp");
        assert_eq!(get_rgb(&out.view(), 3, 5), [10, 20, 30]);
        assert_eq!(get_rgb(&out.view(), 12, 9), [40, 50, 60]);
    }

    #[test]
    fn translated_quad_warp_shifts_pixels() {
        let mut src = RgbImage::new(32, 32);
        src.set_pixel(13, 14, [99, 88, 77]);

        let corners: Quad = [
            Point2::new(10.0, 10.0),
            Point2::new(26.0, 10.0),
            Point2::new(26.0, 26.0),
            Point2::new(10.0, 26.0),
        ];
        let out = warp_quad(&src.view(), &corners, 16).expect("translation warp");
        assert_eq!(get_rgb(&out.view(), 3, 4), [99, 88, 77]);
    }
}
