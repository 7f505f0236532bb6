use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use tracing::{debug, info};

use crate::error::SurveyError;
use crate::visualization::RenderedFigure;

/// Attempts at ` (n)` suffixes before giving up.
pub const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// `<dir>/<label> - <title> bar graphs`, without extension.
pub fn base_name(dir: &Path, sheet_label: &str, title: &str) -> PathBuf {
    dir.join(format!("{sheet_label} - {title} bar graphs"))
}

/// First free `.png` path for the figure; existing files are never touched.
///
/// Tries the bare name, then ` (1)`, ` (2)` and so on.
pub fn resolve_output_path(
    dir: &Path,
    sheet_label: &str,
    title: &str,
) -> Result<PathBuf, SurveyError> {
    let base = base_name(dir, sheet_label, title);
    let stem = base.as_os_str().to_string_lossy().into_owned();

    let first = PathBuf::from(format!("{stem}.png"));
    if !first.exists() {
        return Ok(first);
    }
    for n in 1..=MAX_NAME_ATTEMPTS {
        let candidate = PathBuf::from(format!("{stem} ({n}).png"));
        if !candidate.exists() {
            debug!(path = %candidate.display(), "name taken, using suffix");
            return Ok(candidate);
        }
    }
    Err(SurveyError::NoFreeName {
        base,
        attempts: MAX_NAME_ATTEMPTS,
    })
}

/// Persist the figure as PNG under `dir`, creating it if needed.
pub fn write_figure(
    figure: &RenderedFigure,
    dir: &Path,
    sheet_label: &str,
    title: &str,
) -> Result<PathBuf, SurveyError> {
    fs::create_dir_all(dir).map_err(|e| SurveyError::Write {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let path = resolve_output_path(dir, sheet_label, title)?;
    info!(path = %path.display(), "saving image");
    figure
        .image()
        .save_with_format(&path, ImageFormat::Png)
        .map_err(|e| SurveyError::Encode {
            path: path.clone(),
            source: e,
        })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn bare_name_when_free() {
        let dir = tempdir().unwrap();
        let path = resolve_output_path(dir.path(), "North", "Mollusca").unwrap();
        assert_eq!(path, dir.path().join("North - Mollusca bar graphs.png"));
    }

    #[test]
    fn collisions_get_numbered_suffixes() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("North - Mollusca bar graphs.png"), b"x").unwrap();
        let path = resolve_output_path(dir.path(), "North", "Mollusca").unwrap();
        assert_eq!(path, dir.path().join("North - Mollusca bar graphs (1).png"));

        fs::write(&path, b"x").unwrap();
        let path = resolve_output_path(dir.path(), "North", "Mollusca").unwrap();
        assert_eq!(path, dir.path().join("North - Mollusca bar graphs (2).png"));
    }

    #[test]
    fn gap_in_suffixes_is_reused() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("A - B bar graphs.png"), b"x").unwrap();
        fs::write(dir.path().join("A - B bar graphs (2).png"), b"x").unwrap();
        let path = resolve_output_path(dir.path(), "A", "B").unwrap();
        assert_eq!(path, dir.path().join("A - B bar graphs (1).png"));
    }
}
