//! Screen region capture
//!
//! On Linux the pixels come from an external screenshot tool (grim on
//! Wayland, maim or scrot on X11) writing a PNG into the temp directory. On
//! Windows the desktop DC is copied through GDI.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use image::{ImageFormat, RgbaImage};
use tracing::debug;

use crate::error::{Result, VisionError};
use crate::geometry::Rect;

/// Captures a rectangle of the screen.
pub trait ScreenGrabber {
    fn grab(&self, region: &Rect) -> Result<RgbaImage>;
}

impl<G: ScreenGrabber + ?Sized> ScreenGrabber for &G {
    fn grab(&self, region: &Rect) -> Result<RgbaImage> {
        (**self).grab(region)
    }
}

impl<G: ScreenGrabber + ?Sized> ScreenGrabber for Arc<G> {
    fn grab(&self, region: &Rect) -> Result<RgbaImage> {
        (**self).grab(region)
    }
}

/// Grab `region` and write it to `path` as PNG.
pub fn capture_to_file<G: ScreenGrabber + ?Sized>(
    grabber: &G,
    region: &Rect,
    path: &Path,
) -> Result<()> {
    let img = grabber.grab(region)?;
    img.save_with_format(path, ImageFormat::Png)
        .map_err(|source| VisionError::Save {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Saved {} capture to {}", region, path.display());
    Ok(())
}

/// External screenshot tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTool {
    Grim,
    Maim,
    Scrot,
}

impl CaptureTool {
    pub fn command(&self) -> &'static str {
        match self {
            CaptureTool::Grim => "grim",
            CaptureTool::Maim => "maim",
            CaptureTool::Scrot => "scrot",
        }
    }

    /// Arguments that capture `region` into `output`.
    pub fn args(&self, region: &Rect, output: &str) -> Vec<String> {
        match self {
            CaptureTool::Grim => vec![
                "-g".to_string(),
                format!(
                    "{},{} {}x{}",
                    region.left, region.top, region.width, region.height
                ),
                output.to_string(),
            ],
            CaptureTool::Maim => vec![
                "-g".to_string(),
                format!(
                    "{}x{}+{}+{}",
                    region.width, region.height, region.left, region.top
                ),
                output.to_string(),
            ],
            CaptureTool::Scrot => vec![
                "-a".to_string(),
                format!(
                    "{},{},{},{}",
                    region.left, region.top, region.width, region.height
                ),
                "-o".to_string(),
                output.to_string(),
            ],
        }
    }

    /// Whether the tool is on `PATH`.
    pub fn is_installed(&self) -> bool {
        Command::new("which")
            .arg(self.command())
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

/// Grabber that shells out to a screenshot tool.
pub struct ToolGrabber {
    tool: CaptureTool,
    scratch: PathBuf,
}

impl ToolGrabber {
    pub fn new(tool: CaptureTool) -> Self {
        let scratch =
            std::env::temp_dir().join(format!("wakeclick-capture-{}.png", std::process::id()));
        Self { tool, scratch }
    }

    pub fn tool(&self) -> CaptureTool {
        self.tool
    }
}

impl ScreenGrabber for ToolGrabber {
    fn grab(&self, region: &Rect) -> Result<RgbaImage> {
        if region.is_empty() {
            return Err(VisionError::EmptyRegion(region.width, region.height));
        }

        let output_path = self.scratch.to_string_lossy().into_owned();
        let output = Command::new(self.tool.command())
            .args(self.tool.args(region, &output_path))
            .output()
            .map_err(|e| {
                VisionError::capture(format!("failed to run {}: {}", self.tool.command(), e))
            })?;

        if !output.status.success() {
            return Err(VisionError::capture(format!(
                "{} failed: {}",
                self.tool.command(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let decoded = image::open(&self.scratch).map_err(|source| VisionError::Decode {
            path: self.scratch.clone(),
            source,
        });
        let _ = std::fs::remove_file(&self.scratch);
        let img = decoded?.to_rgba8();

        debug!("Captured {} via {}", region, self.tool.command());
        Ok(img)
    }
}

#[cfg(windows)]
pub use gdi::GdiGrabber;

#[cfg(windows)]
mod gdi {
    use std::ffi::c_void;

    use image::RgbaImage;
    use windows::Win32::Foundation::HWND;
    use windows::Win32::Graphics::Gdi::{
        BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC,
        GetDIBits, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB,
        DIB_RGB_COLORS, HGDIOBJ, SRCCOPY,
    };

    use super::ScreenGrabber;
    use crate::error::{Result, VisionError};
    use crate::geometry::Rect;

    /// Copies a region of the virtual desktop through GDI.
    #[derive(Debug, Default)]
    pub struct GdiGrabber;

    impl GdiGrabber {
        pub fn new() -> Self {
            Self
        }
    }

    impl ScreenGrabber for GdiGrabber {
        fn grab(&self, region: &Rect) -> Result<RgbaImage> {
            if region.is_empty() {
                return Err(VisionError::EmptyRegion(region.width, region.height));
            }
            let width = region.width as i32;
            let height = region.height as i32;

            unsafe {
                let screen = GetDC(HWND::default());
                if screen.is_invalid() {
                    return Err(VisionError::capture("GetDC failed"));
                }
                let memory = CreateCompatibleDC(screen);
                let bitmap = CreateCompatibleBitmap(screen, width, height);
                let previous = SelectObject(memory, HGDIOBJ(bitmap.0));

                let blit = BitBlt(
                    memory, 0, 0, width, height, screen, region.left, region.top, SRCCOPY,
                );

                let mut info = BITMAPINFO {
                    bmiHeader: BITMAPINFOHEADER {
                        biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                        biWidth: width,
                        // Negative height: top-down rows
                        biHeight: -height,
                        biPlanes: 1,
                        biBitCount: 32,
                        biCompression: BI_RGB.0,
                        ..Default::default()
                    },
                    ..Default::default()
                };
                let mut pixels = vec![0u8; (width * height * 4) as usize];
                let lines = if blit.is_ok() {
                    GetDIBits(
                        memory,
                        bitmap,
                        0,
                        height as u32,
                        Some(pixels.as_mut_ptr() as *mut c_void),
                        &mut info,
                        DIB_RGB_COLORS,
                    )
                } else {
                    0
                };

                SelectObject(memory, previous);
                let _ = DeleteObject(HGDIOBJ(bitmap.0));
                let _ = DeleteDC(memory);
                ReleaseDC(HWND::default(), screen);

                if let Err(e) = blit {
                    return Err(VisionError::capture(format!("BitBlt failed: {}", e)));
                }
                if lines != height {
                    return Err(VisionError::capture("GetDIBits returned a short read"));
                }

                // BGRA -> RGBA, opaque
                for px in pixels.chunks_exact_mut(4) {
                    px.swap(0, 2);
                    px[3] = 255;
                }
                RgbaImage::from_raw(region.width, region.height, pixels)
                    .ok_or_else(|| VisionError::capture("pixel buffer size mismatch"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_geometry_arguments() {
        let region = Rect::new(100, 50, 640, 480);
        assert_eq!(
            CaptureTool::Grim.args(&region, "/tmp/x.png"),
            vec!["-g", "100,50 640x480", "/tmp/x.png"]
        );
        assert_eq!(
            CaptureTool::Maim.args(&region, "/tmp/x.png"),
            vec!["-g", "640x480+100+50", "/tmp/x.png"]
        );
        assert_eq!(
            CaptureTool::Scrot.args(&region, "/tmp/x.png"),
            vec!["-a", "100,50,640,480", "-o", "/tmp/x.png"]
        );
    }

    struct Solid;

    impl ScreenGrabber for Solid {
        fn grab(&self, region: &Rect) -> Result<RgbaImage> {
            Ok(RgbaImage::from_pixel(
                region.width,
                region.height,
                image::Rgba([10, 20, 30, 255]),
            ))
        }
    }

    #[test]
    fn test_capture_to_file_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        capture_to_file(&Solid, &Rect::new(5, 5, 8, 6), &path).unwrap();

        let saved = image::open(&path).unwrap();
        assert_eq!((saved.width(), saved.height()), (8, 6));
    }

    #[test]
    fn test_empty_region_rejected() {
        let grabber = ToolGrabber::new(CaptureTool::Grim);
        assert!(matches!(
            grabber.grab(&Rect::new(0, 0, 0, 10)),
            Err(VisionError::EmptyRegion(0, 10))
        ));
    }
}
