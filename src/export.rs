//! Export of the active site as a self-contained document and zip archive.

use anyhow::{Context, Result};
use maud::{DOCTYPE, PreEscaped, html};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::locale::Lang;
use crate::types::SiteBundle;

pub const ARCHIVE_NAME: &str = "website.zip";
pub const DOCUMENT_NAME: &str = "index.html";

/// Full HTML document: css inlined in `<style>`, js in `<script>`, html as the body
pub fn render_document(bundle: &SiteBundle, lang: Lang) -> String {
    html! {
        (DOCTYPE)
        html lang=(lang.as_str()) dir=(lang.dir()) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Generated Website" }
                style { (PreEscaped(&bundle.css)) }
            }
            body {
                (PreEscaped(&bundle.html))
                script { (PreEscaped(&bundle.js)) }
            }
        }
    }
    .into_string()
}

pub fn archive_bytes(bundle: &SiteBundle, lang: Lang) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(DOCUMENT_NAME, options)
        .context("failed to start archive entry")?;
    zip.write_all(render_document(bundle, lang).as_bytes())
        .context("failed to write archive entry")?;
    let cursor = zip.finish().context("failed to finish archive")?;
    Ok(cursor.into_inner())
}

/// Write the archive. A directory destination gets `website.zip` inside it.
pub fn write_archive(bundle: &SiteBundle, lang: Lang, dest: &Path) -> Result<PathBuf> {
    let path = if dest.is_dir() {
        dest.join(ARCHIVE_NAME)
    } else {
        dest.to_path_buf()
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let bytes = archive_bytes(bundle, lang)?;
    fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Write the document to `dir/index.html` for viewing in a browser
pub fn write_preview(bundle: &SiteBundle, lang: Lang, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(DOCUMENT_NAME);
    fs::write(&path, render_document(bundle, lang))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
