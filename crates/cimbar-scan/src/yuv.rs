//! YUV 4:2:0 camera planes -> RGB, ITU-R BT.601.

use cimbar_core::RgbImage;

/// Owned copy of one camera frame's planes. The camera driver reuses its
/// buffers across frames, so planes are copied at the ingest boundary and
/// owned here exclusively.
#[derive(Clone, Debug)]
pub struct YuvPlanes {
    pub width: usize,
    pub height: usize,
    pub y: Vec<u8>,
    pub u: Vec<u8>,
    pub v: Vec<u8>,
    pub y_row_stride: usize,
    pub uv_row_stride: usize,
    pub uv_pixel_stride: usize,
}

/// Convert to RGB with BT.601 coefficients, clamping each channel.
pub fn yuv_to_rgb(planes: &YuvPlanes) -> RgbImage {
    let mut out = RgbImage::new(planes.width, planes.height);
    for y in 0..planes.height {
        for x in 0..planes.width {
            let luma = planes.y[y * planes.y_row_stride + x] as f32;
            let uv_index = (y / 2) * planes.uv_row_stride + (x / 2) * planes.uv_pixel_stride;
            let cb = planes.u[uv_index] as f32 - 128.0;
            let cr = planes.v[uv_index] as f32 - 128.0;

            let r = luma + 1.402 * cr;
            let g = luma - 0.344_136 * cb - 0.714_136 * cr;
            let b = luma + 1.772 * cb;
            out.set_pixel(
                x,
                y,
                [
                    r.round().clamp(0.0, 255.0) as u8,
                    g.round().clamp(0.0, 255.0) as u8,
                    b.round().clamp(0.0, 255.0) as u8,
                ],
            );
        }
    }
    out
}

/// Encode an RGB image into 4:2:0 planes. Test/demo helper; cameras hand us
/// planes directly.
pub fn rgb_to_yuv(img: &cimbar_core::RgbImageView<'_>) -> YuvPlanes {
    let width = img.width;
    let height = img.height;
    let uv_w = width.div_ceil(2);
    let uv_h = height.div_ceil(2);

    let mut y_plane = vec![0u8; width * height];
    let mut u_plane = vec![0u8; uv_w * uv_h];
    let mut v_plane = vec![0u8; uv_w * uv_h];

    for py in 0..height {
        for px in 0..width {
            let rgb = cimbar_core::get_rgb(img, px as i32, py as i32);
            let (r, g, b) = (rgb[0] as f32, rgb[1] as f32, rgb[2] as f32);
            let luma = 0.299 * r + 0.587 * g + 0.114 * b;
            y_plane[py * width + px] = luma.round().clamp(0.0, 255.0) as u8;
            if py % 2 == 0 && px % 2 == 0 {
                let cb = (b - luma) / 1.772 + 128.0;
                let cr = (r - luma) / 1.402 + 128.0;
                let i = (py / 2) * uv_w + px / 2;
                u_plane[i] = cb.round().clamp(0.0, 255.0) as u8;
                v_plane[i] = cr.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    YuvPlanes {
        width,
        height,
        y: y_plane,
        u: u_plane,
        v: v_plane,
        y_row_stride: width,
        uv_row_stride: uv_w,
        uv_pixel_stride: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cimbar_core::{get_rgb, RgbImage};

    #[test]
    fn neutral_gray_is_identity() {
        let planes = YuvPlanes {
            width: 2,
            height: 2,
            y: vec![128; 4],
            u: vec![128; 1],
            v: vec![128; 1],
            y_row_stride: 2,
            uv_row_stride: 1,
            uv_pixel_stride: 1,
        };
        let rgb = yuv_to_rgb(&planes);
        assert_eq!(get_rgb(&rgb.view(), 0, 0), [128, 128, 128]);
    }

    #[test]
    fn round_trip_is_close_on_flat_blocks() {
        let mut img = RgbImage::new(8, 8);
        img.fill_rect(0, 0, 8, 8, [220, 40, 40]);
        let back = yuv_to_rgb(&rgb_to_yuv(&img.view()));
        let got = get_rgb(&back.view(), 3, 3);
        for c in 0..3 {
            assert!(
                (got[c] as i32 - [220, 40, 40][c] as i32).abs() <= 3,
                "channel {c}: {got:?}"
            );
        }
    }

    #[test]
    fn respects_row_and_pixel_strides() {
        // 2x2 image with padded strides and interleaved chroma
        let planes = YuvPlanes {
            width: 2,
            height: 2,
            y: vec![100, 200, 0, 50, 60, 0],
            u: vec![128, 0],
            v: vec![200, 0],
            y_row_stride: 3,
            uv_row_stride: 2,
            uv_pixel_stride: 2,
        };
        let rgb = yuv_to_rgb(&planes);
        // r = y + 1.402 * (200 - 128) = y + 100.9
        assert_eq!(get_rgb(&rgb.view(), 0, 0)[0], 201);
        assert_eq!(get_rgb(&rgb.view(), 1, 1)[0], 161);
    }
}
