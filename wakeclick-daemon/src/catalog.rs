//! Template image discovery
//!
//! Layout: `<root>/<scene>/[<w>x<h>/]*.{png,jpg,jpeg,bmp}`. Images captured at
//! the current display resolution are tried before everything else.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(
        "Template resources directory {} does not exist. Create it with one \
         subdirectory per scene (e.g. `call/`, `hangup/`) or set `resources_dir` \
         in the configuration file",
        .0.display()
    )]
    MissingRoot(PathBuf),
}

/// Resolves scene names to ordered template paths.
#[derive(Debug, Clone)]
pub struct SceneCatalog {
    root: PathBuf,
}

impl SceneCatalog {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CatalogError::MissingRoot(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Template paths for `scene`, resolution folder first.
    ///
    /// Re-reads the filesystem on every call. An unknown scene yields an
    /// empty list.
    pub fn resolve(&self, scene: &str, resolution: Option<(u32, u32)>) -> Vec<PathBuf> {
        let scene_dir = self.root.join(scene);
        if !scene_dir.is_dir() {
            debug!("Scene directory {} not found", scene_dir.display());
            return Vec::new();
        }

        let mut images = Vec::new();
        let preferred = resolution
            .map(|(w, h)| scene_dir.join(format!("{}x{}", w, h)))
            .filter(|dir| dir.is_dir());

        if let Some(dir) = &preferred {
            collect_images(dir, None, &mut images);
        }
        collect_images(&scene_dir, preferred.as_deref(), &mut images);

        debug!("Scene '{}': {} template(s)", scene, images.len());
        images
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Depth-first walk: this level's images in name order, then subdirectories
/// in name order. `skip` is excluded along with everything under it, and
/// symlinked directories are not entered.
fn collect_images(dir: &Path, skip: Option<&Path>, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Skipping unreadable directory {}: {}", dir.display(), e);
            return;
        }
    };

    let mut paths: Vec<(PathBuf, fs::FileType)> = entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let file_type = entry.file_type().ok()?;
            Some((entry.path(), file_type))
        })
        .collect();
    paths.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));

    let mut subdirs = Vec::new();
    for (path, file_type) in paths {
        if file_type.is_dir() {
            if Some(path.as_path()) != skip {
                subdirs.push(path);
            }
        } else if file_type.is_symlink() && path.is_dir() {
            // Not followed: a link back to an ancestor would loop
            debug!("Skipping symlinked directory {}", path.display());
        } else if is_image(&path) {
            out.push(path);
        }
    }

    for sub in subdirs {
        collect_images(&sub, skip, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn names(root: &Path, paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        let err = SceneCatalog::open(tmp.path().join("nope")).unwrap_err();
        assert!(err.to_string().contains("resources_dir"));
    }

    #[test]
    fn test_resolution_folder_first() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(root, "call/b.png");
        touch(root, "call/1920x1080/a.png");
        touch(root, "call/1280x720/c.png");
        touch(root, "call/notes.txt");

        let catalog = SceneCatalog::open(root).unwrap();
        let found = catalog.resolve("call", Some((1920, 1080)));
        assert_eq!(
            names(root, &found),
            vec!["call/1920x1080/a.png", "call/b.png", "call/1280x720/c.png"]
        );
    }

    #[test]
    fn test_without_matching_resolution() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(root, "call/z.PNG");
        touch(root, "call/1920x1080/a.jpg");
        touch(root, "call/m.Bmp");

        let catalog = SceneCatalog::open(root).unwrap();
        let found = catalog.resolve("call", Some((2560, 1440)));
        assert_eq!(
            names(root, &found),
            vec!["call/m.Bmp", "call/z.PNG", "call/1920x1080/a.jpg"]
        );
        assert_eq!(catalog.resolve("call", None).len(), 3);
    }

    #[test]
    fn test_nested_order() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(root, "hangup/2/b.png");
        touch(root, "hangup/1/x/a.png");
        touch(root, "hangup/1/c.jpeg");
        touch(root, "hangup/d.png");

        let catalog = SceneCatalog::open(root).unwrap();
        assert_eq!(
            names(root, &catalog.resolve("hangup", None)),
            vec![
                "hangup/d.png",
                "hangup/1/c.jpeg",
                "hangup/1/x/a.png",
                "hangup/2/b.png"
            ]
        );
    }

    #[test]
    fn test_unknown_or_empty_scene() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("hangup")).unwrap();
        let catalog = SceneCatalog::open(tmp.path()).unwrap();
        assert!(catalog.resolve("hangup", Some((1920, 1080))).is_empty());
        assert!(catalog.resolve("missing", None).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_not_followed() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "call/a.png");
        std::os::unix::fs::symlink(tmp.path().join("call"), tmp.path().join("call/loop")).unwrap();

        let catalog = SceneCatalog::open(tmp.path()).unwrap();
        let found = catalog.resolve("call", None);
        assert_eq!(names(tmp.path(), &found), vec!["call/a.png"]);
    }
}
