//! Template matching against a live screen region

use std::path::Path;

use image::DynamicImage;
use tracing::debug;

use crate::error::{Result, VisionError};
use crate::geometry::{BoundingBox, Rect};
use crate::grabber::ScreenGrabber;
use crate::ncc::{self, Plane};

/// Default minimum similarity for a match.
pub const DEFAULT_CONFIDENCE: f32 = 0.8;

/// Finds a template image inside a screen region.
pub trait TemplateMatcher {
    /// Bounding box of the best match in screen coordinates, or `None` when
    /// nothing scores at least `confidence`.
    fn locate(
        &self,
        template: &Path,
        region: &Rect,
        confidence: f32,
        grayscale: bool,
    ) -> Result<Option<BoundingBox>>;
}

/// Match found inside an in-memory image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageMatch {
    /// Location relative to the haystack's top-left corner.
    pub bbox: Rect,
    pub score: f32,
}

/// Search `haystack` for `template`. Errors only when the template is flat.
pub fn locate_in_image(
    haystack: &DynamicImage,
    template: &DynamicImage,
    confidence: f32,
    grayscale: bool,
) -> std::result::Result<Option<ImageMatch>, ncc::FlatTemplate> {
    let hay = Plane::from_image(haystack, grayscale);
    let needle = Plane::from_image(template, grayscale);

    let peak = match ncc::find_best(&hay, &needle, confidence)? {
        Some(peak) if peak.score >= confidence => peak,
        _ => return Ok(None),
    };

    Ok(Some(ImageMatch {
        bbox: Rect::new(
            peak.x as i32,
            peak.y as i32,
            template.width(),
            template.height(),
        ),
        score: peak.score,
    }))
}

/// Decode a template file.
pub fn load_template(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|source| VisionError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Matcher that captures the region fresh for every call.
pub struct ScreenMatcher<G> {
    grabber: G,
}

impl<G: ScreenGrabber> ScreenMatcher<G> {
    pub fn new(grabber: G) -> Self {
        Self { grabber }
    }

    pub fn grabber(&self) -> &G {
        &self.grabber
    }
}

impl<G: ScreenGrabber> TemplateMatcher for ScreenMatcher<G> {
    fn locate(
        &self,
        template: &Path,
        region: &Rect,
        confidence: f32,
        grayscale: bool,
    ) -> Result<Option<BoundingBox>> {
        let needle = load_template(template)?;
        let screen = DynamicImage::ImageRgba8(self.grabber.grab(region)?);

        let found = locate_in_image(&screen, &needle, confidence, grayscale)
            .map_err(|_| VisionError::FlatTemplate(template.to_path_buf()))?;

        match found {
            Some(m) => {
                let bbox = m.bbox.offset(region.left, region.top);
                debug!(
                    "{} matched at {} (score {:.3})",
                    template.display(),
                    bbox,
                    m.score
                );
                Ok(Some(bbox))
            }
            None => Ok(None),
        }
    }
}
