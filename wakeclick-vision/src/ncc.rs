//! Zero-mean normalized cross-correlation
//!
//! Window means and variances come from integral images, so each candidate
//! position costs one template-sized dot product. Large templates are first
//! located on a 2x downscaled copy and then refined at full resolution.

use image::DynamicImage;

/// Templates at least this wide and tall are searched coarse to fine.
const PYRAMID_MIN_SIDE: usize = 32;

/// A coarse peak must reach `confidence - COARSE_MARGIN` to be refined.
const COARSE_MARGIN: f32 = 0.25;

/// Full-resolution search radius around the upscaled coarse peak.
const REFINE_RADIUS: usize = 2;

const FLAT_EPSILON: f64 = 1e-6;

/// One channel of an image as `f32` samples, row-major.
#[derive(Debug, Clone)]
pub struct Plane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl Plane {
    /// Split an image into the planes used for matching: a single luma plane
    /// when `grayscale`, otherwise red, green and blue.
    pub fn from_image(img: &DynamicImage, grayscale: bool) -> Vec<Plane> {
        let (width, height) = (img.width() as usize, img.height() as usize);
        if grayscale {
            let luma = img.to_luma8();
            return vec![Plane {
                width,
                height,
                data: luma.as_raw().iter().map(|&v| v as f32).collect(),
            }];
        }

        let rgb = img.to_rgb8();
        (0..3)
            .map(|channel| Plane {
                width,
                height,
                data: rgb.pixels().map(|p| p.0[channel] as f32).collect(),
            })
            .collect()
    }

    /// Halve both dimensions by averaging 2x2 blocks.
    fn downscale2(&self) -> Plane {
        let width = self.width / 2;
        let height = self.height / 2;
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            let r0 = &self.data[(2 * y) * self.width..][..self.width];
            let r1 = &self.data[(2 * y + 1) * self.width..][..self.width];
            for x in 0..width {
                data.push((r0[2 * x] + r0[2 * x + 1] + r1[2 * x] + r1[2 * x + 1]) * 0.25);
            }
        }
        Plane {
            width,
            height,
            data,
        }
    }
}

/// Summed-area tables of values and squared values.
struct Integral {
    stride: usize,
    sum: Vec<f64>,
    sq: Vec<f64>,
}

impl Integral {
    fn new(plane: &Plane) -> Self {
        let stride = plane.width + 1;
        let mut sum = vec![0.0f64; stride * (plane.height + 1)];
        let mut sq = vec![0.0f64; stride * (plane.height + 1)];
        for y in 0..plane.height {
            let mut row_sum = 0.0f64;
            let mut row_sq = 0.0f64;
            for x in 0..plane.width {
                let v = plane.data[y * plane.width + x] as f64;
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sq[idx] = sq[idx - stride] + row_sq;
            }
        }
        Self { stride, sum, sq }
    }

    fn window(&self, x: usize, y: usize, w: usize, h: usize) -> (f64, f64) {
        let s = self.stride;
        let a = y * s + x;
        let b = y * s + x + w;
        let c = (y + h) * s + x;
        let d = (y + h) * s + x + w;
        (
            self.sum[d] - self.sum[b] - self.sum[c] + self.sum[a],
            self.sq[d] - self.sq[b] - self.sq[c] + self.sq[a],
        )
    }
}

/// Template with its mean removed, plus its L2 norm.
struct Prepared {
    zero_mean: Vec<f32>,
    norm: f64,
}

impl Prepared {
    fn new(plane: &Plane) -> Option<Self> {
        let n = plane.data.len() as f64;
        let mean = plane.data.iter().map(|&v| v as f64).sum::<f64>() / n;
        let zero_mean: Vec<f32> = plane.data.iter().map(|&v| (v as f64 - mean) as f32).collect();
        let norm = zero_mean
            .iter()
            .map(|&v| (v as f64) * (v as f64))
            .sum::<f64>()
            .sqrt();
        if norm < FLAT_EPSILON {
            return None;
        }
        Some(Self {
            zero_mean,
            norm,
        })
    }
}

/// One haystack plane paired with the template plane it is compared to.
struct Channel {
    plane: Plane,
    integral: Integral,
    template: Prepared,
}

/// Search state for one haystack/needle pair.
///
/// Template channels without contrast carry no information and are left
/// out; the score is the mean over the remaining channels.
struct Search {
    channels: Vec<Channel>,
    width: usize,
    height: usize,
}

impl Search {
    fn new(haystack: &[Plane], needle: &[Plane]) -> Result<Option<Self>, FlatTemplate> {
        let (nw, nh) = (needle[0].width, needle[0].height);
        let (hw, hh) = (haystack[0].width, haystack[0].height);
        if nw == 0 || nh == 0 || nw > hw || nh > hh {
            return Ok(None);
        }

        let channels: Vec<Channel> = haystack
            .iter()
            .zip(needle)
            .filter_map(|(plane, tpl)| {
                Prepared::new(tpl).map(|template| Channel {
                    plane: plane.clone(),
                    integral: Integral::new(plane),
                    template,
                })
            })
            .collect();
        if channels.is_empty() {
            return Err(FlatTemplate);
        }

        Ok(Some(Self {
            channels,
            width: nw,
            height: nh,
        }))
    }

    fn max_x(&self) -> usize {
        self.channels[0].plane.width - self.width
    }

    fn max_y(&self) -> usize {
        self.channels[0].plane.height - self.height
    }

    /// Mean ZNCC over the template's textured channels at top-left `(x, y)`.
    fn score_at(&self, x: usize, y: usize) -> f32 {
        let n = (self.width * self.height) as f64;
        let mut total = 0.0f64;
        for channel in &self.channels {
            let (sum, sq) = channel.integral.window(x, y, self.width, self.height);
            let variance = sq - sum * sum / n;
            if variance <= FLAT_EPSILON {
                continue;
            }
            let plane = &channel.plane;
            let mut dot = 0.0f64;
            for row in 0..self.height {
                let img = &plane.data[(y + row) * plane.width + x..][..self.width];
                let tpl_row = &channel.template.zero_mean[row * self.width..][..self.width];
                let partial: f32 = img.iter().zip(tpl_row).map(|(a, b)| a * b).sum();
                dot += partial as f64;
            }
            total += dot / (variance.sqrt() * channel.template.norm);
        }
        (total / self.channels.len() as f64) as f32
    }

    fn best_in(&self, xs: std::ops::RangeInclusive<usize>, ys: std::ops::RangeInclusive<usize>) -> Peak {
        let mut best = Peak {
            x: *xs.start(),
            y: *ys.start(),
            score: f32::MIN,
        };
        for y in ys {
            for x in xs.clone() {
                let score = self.score_at(x, y);
                if score > best.score {
                    best = Peak { x, y, score };
                }
            }
        }
        best
    }

    fn best(&self) -> Peak {
        self.best_in(0..=self.max_x(), 0..=self.max_y())
    }
}

/// Marker error: every template channel has zero variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatTemplate;

/// Best correlation peak, top-left corner in haystack pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub x: usize,
    pub y: usize,
    pub score: f32,
}

/// Find the best placement of `needle` inside `haystack`.
///
/// Returns `Ok(None)` when the needle does not fit, or when a coarse pass
/// already rules out reaching `confidence`. The returned peak may still score
/// below `confidence`; the caller applies the threshold.
pub fn find_best(
    haystack: &[Plane],
    needle: &[Plane],
    confidence: f32,
) -> Result<Option<Peak>, FlatTemplate> {
    let Some(full) = Search::new(haystack, needle)? else {
        return Ok(None);
    };

    if full.width < PYRAMID_MIN_SIDE || full.height < PYRAMID_MIN_SIDE {
        return Ok(Some(full.best()));
    }

    let small_hay: Vec<Plane> = haystack.iter().map(Plane::downscale2).collect();
    let small_needle: Vec<Plane> = needle.iter().map(Plane::downscale2).collect();
    let coarse = match Search::new(&small_hay, &small_needle) {
        Ok(Some(search)) => search.best(),
        // Downscaling can flatten a barely-textured template; fall back.
        _ => return Ok(Some(full.best())),
    };

    if coarse.score < confidence - COARSE_MARGIN {
        return Ok(None);
    }

    let cx = coarse.x * 2;
    let cy = coarse.y * 2;
    let xs = cx.saturating_sub(REFINE_RADIUS)..=(cx + REFINE_RADIUS).min(full.max_x());
    let ys = cy.saturating_sub(REFINE_RADIUS)..=(cy + REFINE_RADIUS).min(full.max_y());
    Ok(Some(full.best_in(xs, ys)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Deterministic smooth texture: LCG noise with a 3x3 box blur.
    pub(crate) fn textured_plane(width: usize, height: usize, seed: u64) -> Plane {
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let noise: Vec<f32> = (0..width * height)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((state >> 33) % 256) as f32
            })
            .collect();

        let mut data = vec![0.0f32; width * height];
        for y in 0..height {
            for x in 0..width {
                let mut acc = 0.0;
                let mut count = 0.0;
                for dy in -1i32..=1 {
                    for dx in -1i32..=1 {
                        let sx = x as i32 + dx;
                        let sy = y as i32 + dy;
                        if sx >= 0 && sy >= 0 && (sx as usize) < width && (sy as usize) < height {
                            acc += noise[sy as usize * width + sx as usize];
                            count += 1.0;
                        }
                    }
                }
                data[y * width + x] = acc / count;
            }
        }
        Plane {
            width,
            height,
            data,
        }
    }

    pub(crate) fn crop(plane: &Plane, x: usize, y: usize, w: usize, h: usize) -> Plane {
        let mut data = Vec::with_capacity(w * h);
        for row in y..y + h {
            data.extend_from_slice(&plane.data[row * plane.width + x..][..w]);
        }
        Plane {
            width: w,
            height: h,
            data,
        }
    }

    #[test]
    fn test_exact_small_template_found() {
        let hay = textured_plane(120, 90, 7);
        let needle = crop(&hay, 37, 23, 20, 18);

        let peak = find_best(&[hay], &[needle], 0.8).unwrap().unwrap();
        assert_eq!((peak.x, peak.y), (37, 23));
        assert!(peak.score > 0.999, "score {}", peak.score);
    }

    #[test]
    fn test_large_template_coarse_to_fine() {
        let hay = textured_plane(200, 160, 11);
        let needle = crop(&hay, 80, 44, 48, 40);

        let peak = find_best(&[hay], &[needle], 0.8).unwrap().unwrap();
        assert_eq!((peak.x, peak.y), (80, 44));
        assert!(peak.score > 0.99);
    }

    #[test]
    fn test_unrelated_template_scores_low() {
        let hay = textured_plane(60, 60, 3);
        let needle = textured_plane(24, 24, 99);

        let peak = find_best(&[hay], &[needle], 0.8).unwrap().unwrap();
        assert!(peak.score < 0.8, "score {}", peak.score);
    }

    #[test]
    fn test_needle_larger_than_haystack() {
        let hay = textured_plane(20, 20, 1);
        let needle = textured_plane(30, 10, 2);
        assert_eq!(find_best(&[hay], &[needle], 0.8).unwrap(), None);
    }

    #[test]
    fn test_flat_template_rejected() {
        let hay = textured_plane(40, 40, 1);
        let needle = Plane {
            width: 8,
            height: 8,
            data: vec![128.0; 64],
        };
        assert_eq!(find_best(&[hay], &[needle], 0.8), Err(FlatTemplate));
    }

    #[test]
    fn test_rgb_template_with_constant_channels() {
        // Red detail on black: green and blue carry no contrast
        let red = textured_plane(80, 60, 21);
        let black = Plane {
            width: 80,
            height: 60,
            data: vec![0.0; 80 * 60],
        };
        let hay = [red.clone(), black.clone(), black.clone()];
        let needle = [
            crop(&red, 28, 18, 20, 20),
            crop(&black, 28, 18, 20, 20),
            crop(&black, 28, 18, 20, 20),
        ];

        let peak = find_best(&hay, &needle, 0.8).unwrap().unwrap();
        assert_eq!((peak.x, peak.y), (28, 18));
        assert!(peak.score > 0.999, "score {}", peak.score);
    }

    #[test]
    fn test_all_channels_flat_rejected() {
        let hay = textured_plane(40, 40, 4);
        let flat = Plane {
            width: 8,
            height: 8,
            data: vec![90.0; 64],
        };
        assert_eq!(
            find_best(
                &[hay.clone(), hay.clone(), hay],
                &[flat.clone(), flat.clone(), flat],
                0.8
            ),
            Err(FlatTemplate)
        );
    }

    #[test]
    fn test_integral_window() {
        let plane = Plane {
            width: 3,
            height: 2,
            data: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        };
        let integral = Integral::new(&plane);
        assert_eq!(integral.window(1, 0, 2, 2), (16.0, 4.0 + 9.0 + 25.0 + 36.0));
        assert_eq!(integral.window(0, 0, 3, 2), (21.0, 91.0));
    }
}
