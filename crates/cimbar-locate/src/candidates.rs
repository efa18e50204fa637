//! Finder candidates from run-length scanning of a half-resolution luma
//! buffer.

use crate::locator::LocatorParams;
use cimbar_core::{get_rgb, luma, RgbImageView};

/// One (possibly merged) finder candidate. Coordinates and sizes are in the
/// space of the buffer the candidate was found in.
#[derive(Clone, Copy, Debug)]
pub struct Candidate {
    pub x: f32,
    pub y: f32,
    /// Width of the bright-dark-bright triple along the scan row.
    pub h_size: f32,
    /// Height of the confirming vertical triple; zero until confirmed.
    pub v_size: f32,
    pub contrast: f32,
    pub hits: u32,
}

/// Half-resolution luma plane.
pub(crate) struct LumaHalf {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl LumaHalf {
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}

/// Downscale by two with 2x2 averaging, converting to BT.601 luma.
pub(crate) fn downscale_luma_half(src: &RgbImageView<'_>) -> LumaHalf {
    let width = src.width / 2;
    let height = src.height / 2;
    let mut data = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0u32;
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let p = get_rgb(src, (2 * x + dx) as i32, (2 * y + dy) as i32);
                sum += luma(p) as u32;
            }
            data[y * width + x] = ((sum + 2) / 4) as u8;
        }
    }
    LumaHalf {
        width,
        height,
        data,
    }
}

/// One run of same-class pixels along a scan line.
#[derive(Clone, Copy, Debug)]
struct Run {
    bright: bool,
    start: usize,
    len: usize,
    sum: u32,
}

fn run_length_encode(values: impl Iterator<Item = u8>, bright_threshold: u8) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (i, v) in values.enumerate() {
        let bright = v >= bright_threshold;
        match runs.last_mut() {
            Some(run) if run.bright == bright => {
                run.len += 1;
                run.sum += v as u32;
            }
            _ => runs.push(Run {
                bright,
                start: i,
                len: 1,
                sum: v as u32,
            }),
        }
    }
    runs
}

/// Horizontal pass: every `row_stride` rows, emit a candidate for each
/// bright-dark-bright run triple that looks like a finder cross-section.
pub(crate) fn scan_rows(buf: &LumaHalf, p: &LocatorParams) -> Vec<Candidate> {
    let mut out = Vec::new();
    for y in (0..buf.height).step_by(p.row_stride) {
        let row = (0..buf.width).map(|x| buf.at(x, y));
        let runs = run_length_encode(row, p.bright_threshold);
        for w in runs.windows(3) {
            let [r0, r1, r2] = [w[0], w[1], w[2]];
            if !r0.bright || r1.bright || !r2.bright {
                continue;
            }
            let total = r0.len + r1.len + r2.len;
            if total < p.min_triple_span {
                continue;
            }
            // asymmetry is tolerated when a finder borders a bright background
            let ratio = r0.len.min(r2.len) as f32 / r1.len as f32;
            if !(p.min_ratio..=p.max_ratio).contains(&ratio) {
                continue;
            }
            let bright_mean = r0.sum as f32 / r0.len as f32;
            let dark_mean = r1.sum as f32 / r1.len as f32;
            if bright_mean - dark_mean < p.min_contrast {
                continue;
            }
            out.push(Candidate {
                x: r0.start as f32 + total as f32 / 2.0,
                y: y as f32,
                h_size: total as f32,
                v_size: 0.0,
                contrast: bright_mean - dark_mean,
                hits: 1,
            });
        }
    }
    out
}

/// Vertical confirmation: look for a matching bright-dark-bright triple in
/// the candidate's own column, only within `3 * h_size` of the scan row.
/// Local scanning keeps other finders in the same column from matching.
pub(crate) fn confirm_vertical(
    buf: &LumaHalf,
    cand: &Candidate,
    p: &LocatorParams,
) -> Option<Candidate> {
    let cx = cand.x.round() as i64;
    if cx < 0 || cx >= buf.width as i64 {
        return None;
    }
    let reach = (3.0 * cand.h_size) as i64;
    let y0 = (cand.y as i64 - reach).max(0) as usize;
    let y1 = ((cand.y as i64 + reach) as usize).min(buf.height - 1);

    let column = (y0..=y1).map(|y| buf.at(cx as usize, y));
    let runs = run_length_encode(column, p.bright_threshold);

    let mut best: Option<(f32, f32)> = None; // (center, total)
    for w in runs.windows(3) {
        let [r0, r1, r2] = [w[0], w[1], w[2]];
        if !r0.bright || r1.bright || !r2.bright {
            continue;
        }
        let total = (r0.len + r1.len + r2.len) as f32;
        if total < 0.5 * cand.h_size || total > 2.0 * cand.h_size {
            continue;
        }
        let center = y0 as f32 + r0.start as f32 + total / 2.0;
        let better = match best {
            None => true,
            Some((prev_center, _)) => {
                (center - cand.y).abs() < (prev_center - cand.y).abs()
            }
        };
        if better {
            best = Some((center, total));
        }
    }

    best.map(|(center, total)| Candidate {
        y: center,
        v_size: total,
        ..*cand
    })
}

/// Merge candidates whose centers fall within `radius` of an existing
/// group: mean centroid, max sizes, summed hit counts.
pub(crate) fn merge_candidates(cands: &[Candidate], radius: f32) -> Vec<Candidate> {
    struct Group {
        sum_x: f32,
        sum_y: f32,
        n: u32,
        h_size: f32,
        v_size: f32,
        contrast: f32,
        hits: u32,
    }

    let mut groups: Vec<Group> = Vec::new();
    for c in cands {
        let found = groups.iter_mut().find(|g| {
            let gx = g.sum_x / g.n as f32;
            let gy = g.sum_y / g.n as f32;
            (gx - c.x).hypot(gy - c.y) <= radius
        });
        match found {
            Some(g) => {
                g.sum_x += c.x;
                g.sum_y += c.y;
                g.n += 1;
                g.h_size = g.h_size.max(c.h_size);
                g.v_size = g.v_size.max(c.v_size);
                g.contrast = g.contrast.max(c.contrast);
                g.hits += c.hits;
            }
            None => groups.push(Group {
                sum_x: c.x,
                sum_y: c.y,
                n: 1,
                h_size: c.h_size,
                v_size: c.v_size,
                contrast: c.contrast,
                hits: c.hits,
            }),
        }
    }

    groups
        .into_iter()
        .map(|g| Candidate {
            x: g.sum_x / g.n as f32,
            y: g.sum_y / g.n as f32,
            h_size: g.h_size,
            v_size: g.v_size,
            contrast: g.contrast,
            hits: g.hits,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cimbar_core::RgbImage;

    fn params() -> LocatorParams {
        LocatorParams::default()
    }

    /// Paint a synthetic finder cross-section image: white square with a
    /// dark core, on a dark background.
    fn finder_image(cx: usize, cy: usize) -> RgbImage {
        let mut img = RgbImage::new(160, 160);
        img.fill_rect(cx - 24, cy - 24, 48, 48, [255, 255, 255]);
        img.fill_rect(cx - 8, cy - 8, 16, 16, [10, 10, 10]);
        img
    }

    #[test]
    fn scan_finds_a_centered_finder() {
        let img = finder_image(80, 80);
        let buf = downscale_luma_half(&img.view());
        let raw = scan_rows(&buf, &params());
        assert!(!raw.is_empty());

        let confirmed: Vec<Candidate> = raw
            .iter()
            .filter_map(|c| confirm_vertical(&buf, c, &params()))
            .collect();
        assert!(!confirmed.is_empty());

        let merged = merge_candidates(&confirmed, 80.0 / 30.0);
        assert_eq!(merged.len(), 1);
        let c = merged[0];
        assert!((c.x - 40.0).abs() < 3.0, "x = {}", c.x);
        assert!((c.y - 40.0).abs() < 3.0, "y = {}", c.y);
    }

    #[test]
    fn low_contrast_triples_are_rejected() {
        let mut img = RgbImage::new(160, 160);
        img.fill_rect(56, 56, 48, 48, [190, 190, 190]);
        img.fill_rect(72, 72, 16, 16, [170, 170, 170]);
        let buf = downscale_luma_half(&img.view());
        assert!(scan_rows(&buf, &params()).is_empty());
    }

    #[test]
    fn merge_keeps_distant_candidates_separate() {
        let a = Candidate {
            x: 10.0,
            y: 10.0,
            h_size: 6.0,
            v_size: 6.0,
            contrast: 100.0,
            hits: 1,
        };
        let b = Candidate { x: 100.0, y: 8.0, ..a };
        let merged = merge_candidates(&[a, b, a], 4.0);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].hits, 2);
    }
}
