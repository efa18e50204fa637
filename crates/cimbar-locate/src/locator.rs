use crate::candidates::{
    confirm_vertical, downscale_luma_half, merge_candidates, scan_rows, Candidate,
};
use crate::classify::classify_roles;
use cimbar_core::{crop, RgbImage, RgbImageView, FINDER_CELLS};
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Tunable thresholds for the locator. Defaults match the wire reference.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocatorParams {
    /// Half-resolution luma at or above this is "bright".
    pub bright_threshold: u8,
    /// Minimum width of a bright-dark-bright triple, in half-res pixels.
    pub min_triple_span: usize,
    /// Lower bound on `min(bright_run) / dark_run`.
    pub min_ratio: f32,
    /// Upper bound on `min(bright_run) / dark_run`.
    pub max_ratio: f32,
    /// Minimum bright-minus-dark mean luma across a triple.
    pub min_contrast: f32,
    /// Horizontal scan visits every n-th row.
    pub row_stride: usize,
    /// Luma floor for the bounding-box fallback crop.
    pub fallback_luma: u8,
    /// Required gap between the darkest and second-darkest candidate for
    /// brightness-based TL identification.
    pub tl_brightness_gap: f32,
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self {
            bright_threshold: 180,
            min_triple_span: 6,
            min_ratio: 0.25,
            max_ratio: 4.0,
            min_contrast: 30.0,
            row_stride: 2,
            fallback_luma: 30,
            tl_brightness_gap: 20.0,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateError {
    #[error("no barcode found in the image")]
    NoBarcode,
}

/// Square crop region in source-image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub size: usize,
}

/// Locator output: a square crop that encloses the barcode, and (when
/// classification succeeded) the finder centers in source coordinates.
/// Anchors are all-or-nothing below two: either `tl` and `br` are present,
/// or all four are `None` and the crop came from the luma fallback.
#[derive(Clone, Debug)]
pub struct LocateResult {
    pub cropped: RgbImage,
    pub rect: Rect,
    pub tl: Option<Point2<f32>>,
    pub tr: Option<Point2<f32>>,
    pub bl: Option<Point2<f32>>,
    pub br: Option<Point2<f32>>,
}

impl LocateResult {
    /// All four finder centers, when every role was classified.
    pub fn four_anchors(&self) -> Option<[Point2<f32>; 4]> {
        Some([self.tl?, self.tr?, self.bl?, self.br?])
    }

    /// The TL/BR diagonal, when present.
    pub fn diagonal(&self) -> Option<(Point2<f32>, Point2<f32>)> {
        Some((self.tl?, self.br?))
    }
}

/// Finder-pattern locator.
#[derive(Clone, Debug, Default)]
pub struct FrameLocator {
    params: LocatorParams,
}

impl FrameLocator {
    pub fn new(params: LocatorParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &LocatorParams {
        &self.params
    }

    /// Locate the barcode in `src`.
    ///
    /// Returns the crop plus finder centers when at least two finders were
    /// classified; falls back to a bright-pixel bounding box otherwise.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, src), fields(width = src.width, height = src.height))
    )]
    pub fn locate(&self, src: &RgbImageView<'_>) -> Result<LocateResult, LocateError> {
        let p = &self.params;
        let buf = downscale_luma_half(src);
        if buf.width == 0 || buf.height == 0 {
            return Err(LocateError::NoBarcode);
        }

        let raw = scan_rows(&buf, p);
        let confirmed: Vec<Candidate> = raw
            .iter()
            .filter_map(|c| confirm_vertical(&buf, c, p))
            .collect();

        let radius = buf.width.max(buf.height) as f32 / 30.0;
        let mut merged = merge_candidates(&confirmed, radius);
        debug!(
            "locator: {} raw, {} confirmed, {} merged candidates",
            raw.len(),
            confirmed.len(),
            merged.len()
        );

        // back to full-resolution coordinates
        for c in &mut merged {
            c.x *= 2.0;
            c.y *= 2.0;
            c.h_size *= 2.0;
            c.v_size *= 2.0;
        }

        if merged.len() > 4 {
            merged.sort_by(|a, b| {
                (b.hits, b.contrast as u32).cmp(&(a.hits, a.contrast as u32))
            });
            merged.truncate(4);
        }

        if let Some(result) = self.crop_from_anchors(src, &merged) {
            return Ok(result);
        }

        debug!("locator: no classified anchors, using luma-threshold fallback");
        self.fallback_crop(src, &buf)
    }

    fn crop_from_anchors(
        &self,
        src: &RgbImageView<'_>,
        cands: &[Candidate],
    ) -> Option<LocateResult> {
        let roles = classify_roles(src, cands, self.params.tl_brightness_gap)?;

        let picked: Vec<&Candidate> = [roles.tl, roles.tr, roles.bl, roles.br]
            .iter()
            .flatten()
            .map(|&i| &cands[i])
            .collect();

        // finder spans 3 cells, so its triple width estimates the cell size
        let mut size_sum = 0.0f32;
        let mut size_n = 0u32;
        for c in &picked {
            for s in [c.h_size, c.v_size] {
                if s > 0.0 {
                    size_sum += s;
                    size_n += 1;
                }
            }
        }
        let cell_size = size_sum / size_n.max(1) as f32 / FINDER_CELLS as f32;
        if cell_size < 1.0 {
            return None;
        }

        let pad = 1.5 * cell_size;
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for c in &picked {
            min_x = min_x.min(c.x - pad);
            min_y = min_y.min(c.y - pad);
            max_x = max_x.max(c.x + pad);
            max_y = max_y.max(c.y + pad);
        }

        let rect = square_with_margin(min_x, min_y, max_x, max_y, src.width, src.height);
        let cropped = crop(src, rect.x, rect.y, rect.size, rect.size);

        let point = |i: Option<usize>| i.map(|i| Point2::new(cands[i].x, cands[i].y));
        Some(LocateResult {
            cropped,
            rect,
            tl: point(roles.tl),
            tr: point(roles.tr),
            bl: point(roles.bl),
            br: point(roles.br),
        })
    }

    fn fallback_crop(
        &self,
        src: &RgbImageView<'_>,
        buf: &crate::candidates::LumaHalf,
    ) -> Result<LocateResult, LocateError> {
        let mut min_x = usize::MAX;
        let mut min_y = usize::MAX;
        let mut max_x = 0usize;
        let mut max_y = 0usize;
        let mut any = false;
        for y in 0..buf.height {
            for x in 0..buf.width {
                if buf.at(x, y) > self.params.fallback_luma {
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                    any = true;
                }
            }
        }
        if !any {
            return Err(LocateError::NoBarcode);
        }

        let rect = square_with_margin(
            (min_x * 2) as f32,
            (min_y * 2) as f32,
            (max_x * 2 + 1) as f32,
            (max_y * 2 + 1) as f32,
            src.width,
            src.height,
        );
        let cropped = crop(src, rect.x, rect.y, rect.size, rect.size);
        Ok(LocateResult {
            cropped,
            rect,
            tl: None,
            tr: None,
            bl: None,
            br: None,
        })
    }
}

/// Square up a bounding box around its midpoint, add a 2% margin, and clamp
/// to the image bounds.
fn square_with_margin(
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
    img_w: usize,
    img_h: usize,
) -> Rect {
    let side = (max_x - min_x).max(max_y - min_y).max(1.0) * 1.02;
    let cx = (min_x + max_x) / 2.0;
    let cy = (min_y + max_y) / 2.0;

    let size = (side.ceil() as usize).min(img_w.min(img_h));
    let mut x = (cx - side / 2.0).round() as i32;
    let mut y = (cy - side / 2.0).round() as i32;
    x = x.clamp(0, (img_w - size) as i32);
    y = y.clamp(0, (img_h - size) as i32);
    Rect { x, y, size }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cimbar_core::RgbImage;

    /// Paint a finder: 3x3 cells of white ring around a dark center cell,
    /// optionally with a white dot inside the center.
    fn paint_finder(img: &mut RgbImage, ox: usize, oy: usize, cell: usize, dot: bool) {
        img.fill_rect(ox, oy, 3 * cell, 3 * cell, [255, 255, 255]);
        img.fill_rect(ox + cell, oy + cell, cell, cell, [12, 12, 12]);
        if dot {
            let d = (cell * 3) / 8;
            let off = ox + cell + (cell - d) / 2;
            let voff = oy + cell + (cell - d) / 2;
            img.fill_rect(off, voff, d, d, [255, 255, 255]);
        }
    }

    fn photo_with_finders(cell: usize) -> (RgbImage, [(f32, f32); 4]) {
        let mut img = RgbImage::new(640, 640);
        let grid = 32; // 256px frame worth of cells
        let off = 120usize;
        let span = (grid - 3) * cell;
        let centers = [
            (off + cell + cell / 2, off + cell + cell / 2), // TL, dotless
            (off + cell + cell / 2 + span, off + cell + cell / 2),
            (off + cell + cell / 2, off + cell + cell / 2 + span),
            (off + cell + cell / 2 + span, off + cell + cell / 2 + span),
        ];
        paint_finder(&mut img, off, off, cell, false);
        paint_finder(&mut img, off + span, off, cell, true);
        paint_finder(&mut img, off, off + span, cell, true);
        paint_finder(&mut img, off + span, off + span, cell, true);
        let pts = centers.map(|(x, y)| (x as f32, y as f32));
        (img, pts)
    }

    #[test]
    fn locates_four_finders_and_roles() {
        let (img, centers) = photo_with_finders(8);
        let locator = FrameLocator::default();
        let res = locator.locate(&img.view()).expect("barcode located");

        let anchors = res.four_anchors().expect("all four anchors");
        for (anchor, (ex, ey)) in anchors.iter().zip(centers.iter()) {
            assert!(
                (anchor.x - ex).abs() < 6.0 && (anchor.y - ey).abs() < 6.0,
                "anchor {anchor:?} expected near ({ex}, {ey})"
            );
        }
        // the crop must cover all four finders
        assert!(res.rect.x as f32 <= centers[0].0 - 12.0);
        assert!(res.rect.x as f32 + res.rect.size as f32 >= centers[3].0 + 12.0);
    }

    #[test]
    fn dark_image_has_no_barcode() {
        let img = RgbImage::new(200, 200);
        let locator = FrameLocator::default();
        assert_eq!(
            locator.locate(&img.view()).err(),
            Some(LocateError::NoBarcode)
        );
    }

    #[test]
    fn bright_blob_without_finders_falls_back() {
        let mut img = RgbImage::new(300, 300);
        img.fill_rect(100, 120, 80, 60, [230, 230, 230]);
        let locator = FrameLocator::default();
        let res = locator.locate(&img.view()).expect("fallback crop");
        assert!(res.tl.is_none() && res.br.is_none());
        assert!(res.rect.size >= 80);
        assert!(res.rect.x <= 100 && res.rect.x + res.rect.size as i32 >= 180);
    }
}
