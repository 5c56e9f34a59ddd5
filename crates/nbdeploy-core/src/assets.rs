//! Asset relocation into the site's image directory

use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Extensions of loose images copied next to the supporting files
static IMAGE_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(jpe?g|png|gif)$").unwrap());

/// What happened to the supporting-files directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRelocation {
    /// Moved to `to`; `replaced` is set if a stale copy was deleted first
    Moved {
        from: PathBuf,
        to: PathBuf,
        replaced: bool,
    },
    /// Source and destination are the same directory
    AlreadyInPlace(PathBuf),
    /// The converter did not produce a supporting-files directory;
    /// `removed_stale` is set if an old copy was deleted from the destination
    NotFound { removed_stale: bool },
}

/// Check whether a path has a jpg, jpeg, png or gif extension (any case)
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSION.is_match(ext))
}

/// Copy every loose image in `src_dir` into `dest_dir`
///
/// Only regular files directly inside `src_dir` are considered. Returns the
/// destination paths, sorted.
pub fn copy_loose_images(src_dir: &Path, dest_dir: &Path) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(dest_dir)?;
    if same_location(src_dir, dest_dir) {
        return Ok(Vec::new());
    }

    let mut images = Vec::new();
    for entry in fs::read_dir(src_dir)? {
        let path = entry?.path();
        if path.is_file() && is_image_file(&path) {
            images.push(path);
        }
    }
    images.sort();

    let mut copied = Vec::with_capacity(images.len());
    for image in images {
        let Some(name) = image.file_name() else {
            continue;
        };
        let dest = dest_dir.join(name);
        fs::copy(&image, &dest)?;
        copied.push(dest);
    }

    Ok(copied)
}

/// Move a supporting-files directory into `dest_dir`, replacing any stale copy
///
/// The stale copy is deleted even when `src` is missing, so a notebook that
/// no longer produces supporting files leaves none behind. A missing `src` is
/// not an error.
pub fn replace_supporting_files(src: &Path, dest_dir: &Path) -> io::Result<AssetRelocation> {
    let Some(name) = src.file_name() else {
        return Ok(AssetRelocation::NotFound {
            removed_stale: false,
        });
    };
    let dest = dest_dir.join(name);

    if same_location(src, &dest) {
        return Ok(AssetRelocation::AlreadyInPlace(dest));
    }

    let replaced = remove_stale(&dest)?;
    if !src.is_dir() {
        return Ok(AssetRelocation::NotFound {
            removed_stale: replaced,
        });
    }

    fs::create_dir_all(dest_dir)?;
    move_dir(src, &dest)?;

    Ok(AssetRelocation::Moved {
        from: src.to_path_buf(),
        to: dest,
        replaced,
    })
}

/// Delete whatever sits at `dest`, reporting whether anything was there
fn remove_stale(dest: &Path) -> io::Result<bool> {
    let Ok(metadata) = fs::symlink_metadata(dest) else {
        return Ok(false);
    };

    if metadata.is_dir() {
        fs::remove_dir_all(dest)?;
    } else {
        fs::remove_file(dest)?;
    }
    Ok(true)
}

/// Rename a directory, falling back to copy and delete across filesystems
fn move_dir(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    copy_dir_recursive(from, to)?;
    fs::remove_dir_all(from)
}

fn copy_dir_recursive(src_dir: &Path, dest_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dest_dir)?;

    for entry in fs::read_dir(src_dir)? {
        let entry = entry?;
        let src_path = entry.path();
        let dest_path = dest_dir.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dest_path)?;
        } else {
            fs::copy(&src_path, &dest_path)?;
        }
    }

    Ok(())
}

fn same_location(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_is_image_file() {
        for name in ["a.png", "b.PNG", "c.jpg", "d.jpeg", "e.JPEG", "f.gif", "g.Gif"] {
            assert!(is_image_file(Path::new(name)), "{name}");
        }
        for name in ["a.svg", "b.pdf", "c.jpgx", "d.xpng", "png", "e.tex", "f.jpeeg"] {
            assert!(!is_image_file(Path::new(name)), "{name}");
        }
    }

    #[test]
    fn test_copy_loose_images() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        let dest = out.path().join("images");

        fs::write(src.path().join("b.PNG"), b"png").unwrap();
        fs::write(src.path().join("a.jpeg"), b"jpeg").unwrap();
        fs::write(src.path().join("notes.txt"), b"text").unwrap();
        fs::write(src.path().join("formula.tex"), b"tex").unwrap();
        fs::create_dir(src.path().join("dir.png")).unwrap();

        let copied = copy_loose_images(src.path(), &dest).unwrap();

        assert_eq!(copied, vec![dest.join("a.jpeg"), dest.join("b.PNG")]);
        assert_eq!(fs::read(dest.join("b.PNG")).unwrap(), b"png");
        assert!(src.path().join("a.jpeg").exists(), "images are copied, not moved");
        assert!(!dest.join("notes.txt").exists());
        assert!(!dest.join("dir.png").exists());
    }

    #[test]
    fn test_copy_loose_images_same_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"png").unwrap();

        let copied = copy_loose_images(dir.path(), dir.path()).unwrap();

        assert!(copied.is_empty());
        assert_eq!(fs::read(dir.path().join("a.png")).unwrap(), b"png");
    }

    #[test]
    fn test_replace_supporting_files_moves_directory() {
        let nb = tempdir().unwrap();
        let images = tempdir().unwrap();
        let src = nb.path().join("demo_files");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("demo_1_0.png"), b"plot").unwrap();
        fs::write(src.join("nested/x.svg"), b"svg").unwrap();

        let result = replace_supporting_files(&src, images.path()).unwrap();

        let dest = images.path().join("demo_files");
        assert_eq!(
            result,
            AssetRelocation::Moved {
                from: src.clone(),
                to: dest.clone(),
                replaced: false,
            }
        );
        assert!(!src.exists());
        assert_eq!(fs::read(dest.join("demo_1_0.png")).unwrap(), b"plot");
        assert!(dest.join("nested/x.svg").exists());
    }

    #[test]
    fn test_replace_supporting_files_removes_stale_copy() {
        let nb = tempdir().unwrap();
        let images = tempdir().unwrap();
        let stale = images.path().join("demo_files");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("old.png"), b"old").unwrap();

        let src = nb.path().join("demo_files");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("new.png"), b"new").unwrap();

        let result = replace_supporting_files(&src, images.path()).unwrap();

        assert!(matches!(result, AssetRelocation::Moved { replaced: true, .. }));
        assert!(!stale.join("old.png").exists());
        assert!(stale.join("new.png").exists());
        assert!(!images.path().join("demo_files/demo_files").exists());
    }

    #[test]
    fn test_replace_supporting_files_missing_source() {
        let nb = tempdir().unwrap();
        let images = tempdir().unwrap();

        let result = replace_supporting_files(&nb.path().join("demo_files"), images.path()).unwrap();

        assert_eq!(
            result,
            AssetRelocation::NotFound {
                removed_stale: false
            }
        );
        assert!(!images.path().join("demo_files").exists());
    }

    #[test]
    fn test_replace_supporting_files_removes_stale_copy_without_source() {
        let nb = tempdir().unwrap();
        let images = tempdir().unwrap();
        let stale = images.path().join("demo_files");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("old.png"), b"old").unwrap();

        let result = replace_supporting_files(&nb.path().join("demo_files"), images.path()).unwrap();

        assert_eq!(
            result,
            AssetRelocation::NotFound {
                removed_stale: true
            }
        );
        assert!(!stale.exists());
    }

    #[test]
    fn test_replace_supporting_files_in_place() {
        let nb = tempdir().unwrap();
        let src = nb.path().join("demo_files");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.png"), b"a").unwrap();

        let result = replace_supporting_files(&src, nb.path()).unwrap();

        assert!(matches!(result, AssetRelocation::AlreadyInPlace(_)));
        assert!(src.join("a.png").exists());
    }

    #[test]
    fn test_copy_dir_recursive() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::create_dir_all(src.path().join("a/b")).unwrap();
        fs::write(src.path().join("a/b/c.txt"), b"c").unwrap();

        let dest = out.path().join("copy");
        copy_dir_recursive(src.path(), &dest).unwrap();

        assert_eq!(fs::read(dest.join("a/b/c.txt")).unwrap(), b"c");
    }
}
