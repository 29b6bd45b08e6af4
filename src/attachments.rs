//! Reading user-selected images into embeddable data URLs.

use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::types::AttachmentDraft;

/// Attachments accepted per submission. Extra selections are dropped silently.
pub const MAX_ATTACHMENTS: usize = 5;

pub fn read_attachment(path: &Path) -> Result<AttachmentDraft> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    let display_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
        .unwrap_or_else(|| path.display().to_string());
    let data_url = format!("data:{mime_type};base64,{}", STANDARD.encode(&bytes));
    Ok(AttachmentDraft {
        path: path.to_path_buf(),
        display_name,
        mime_type,
        data_url,
    })
}

/// Read every file concurrently and return the batch only once all reads have
/// finished. Files that cannot be read are logged and left out. Order follows
/// `paths`.
pub fn read_batch(paths: &[PathBuf]) -> Vec<AttachmentDraft> {
    let results: Vec<(PathBuf, Result<AttachmentDraft>)> = std::thread::scope(|scope| {
        let handles: Vec<_> = paths
            .iter()
            .map(|path| (path, scope.spawn(move || read_attachment(path))))
            .collect();
        handles
            .into_iter()
            .map(|(path, handle)| {
                let result = handle
                    .join()
                    .unwrap_or_else(|_| Err(anyhow::anyhow!("attachment reader panicked")));
                (path.clone(), result)
            })
            .collect()
    });

    results
        .into_iter()
        .filter_map(|(path, result)| match result {
            Ok(draft) => Some(draft),
            Err(err) => {
                warn!(path = %path.display(), error = %format!("{err:#}"), "skipping attachment");
                None
            }
        })
        .collect()
}

/// Append `incoming` after `staged`, keeping at most [`MAX_ATTACHMENTS`]
pub fn merge_staged(
    mut staged: Vec<AttachmentDraft>,
    incoming: Vec<AttachmentDraft>,
) -> Vec<AttachmentDraft> {
    staged.extend(incoming);
    staged.truncate(MAX_ATTACHMENTS);
    staged
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_files(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                fs::write(&path, name.as_bytes()).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn reads_file_as_data_url() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logo.png");
        fs::write(&path, b"hello").unwrap();

        let draft = read_attachment(&path).unwrap();
        assert_eq!(draft.display_name, "logo.png");
        assert_eq!(draft.mime_type, "image/png");
        assert_eq!(draft.data_url, "data:image/png;base64,aGVsbG8=");
        assert_eq!(draft.payload(), "aGVsbG8=");
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("blob.unknownext");
        fs::write(&path, b"x").unwrap();
        assert_eq!(
            read_attachment(&path).unwrap().mime_type,
            "application/octet-stream"
        );
    }

    #[test]
    fn batch_preserves_order_and_skips_unreadable() {
        let tmp = TempDir::new().unwrap();
        let mut paths = write_files(tmp.path(), &["a.jpg", "b.jpg"]);
        paths.insert(1, tmp.path().join("missing.jpg"));

        let batch = read_batch(&paths);
        let names: Vec<_> = batch.iter().map(|d| d.display_name.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn merge_caps_at_five() {
        let tmp = TempDir::new().unwrap();
        let paths = write_files(
            tmp.path(),
            &["1.png", "2.png", "3.png", "4.png", "5.png", "6.png", "7.png"],
        );
        let staged = merge_staged(Vec::new(), read_batch(&paths[..3]));
        let staged = merge_staged(staged, read_batch(&paths[3..]));
        let names: Vec<_> = staged.iter().map(|d| d.display_name.as_str()).collect();
        assert_eq!(names, vec!["1.png", "2.png", "3.png", "4.png", "5.png"]);
    }
}
