use std::fs;
use std::path::{Path, PathBuf};

use kb_core::{FileRef, PDF_MEDIA_TYPE};
use kb_logging::{kb_debug, kb_warn};

const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// Media type inferred from the file extension.
pub fn media_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => PDF_MEDIA_TYPE,
        _ => UNKNOWN_MEDIA_TYPE,
    }
}

/// Reads each PDF path into a [`FileRef`]; other and unreadable paths are logged and skipped.
pub fn read_files(paths: &[PathBuf]) -> Vec<FileRef> {
    paths
        .iter()
        .filter(|path| {
            let is_pdf = media_type_for(path) == PDF_MEDIA_TYPE;
            if !is_pdf {
                kb_warn!("Skipping {:?}: not a PDF", path);
            }
            is_pdf
        })
        .filter_map(|path| match fs::read(path) {
            Ok(payload) => {
                let name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                kb_debug!("Read {} ({} bytes)", name, payload.len());
                Some(FileRef::new(name, PDF_MEDIA_TYPE, payload))
            }
            Err(err) => {
                kb_warn!("Skipping {:?}: {}", path, err);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_decides_media_type() {
        assert_eq!(media_type_for(Path::new("a/Report.PDF")), PDF_MEDIA_TYPE);
        assert_eq!(media_type_for(Path::new("notes.txt")), UNKNOWN_MEDIA_TYPE);
        assert_eq!(media_type_for(Path::new("pdf")), UNKNOWN_MEDIA_TYPE);
    }

    #[test]
    fn only_pdf_paths_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("Manual.Pdf");
        fs::write(&pdf, b"%PDF-1.4").unwrap();
        // A directory named like a non-PDF would fail to read if it were tried.
        let not_pdf = dir.path().join("notes.txt");
        fs::create_dir(&not_pdf).unwrap();

        let files = read_files(&[not_pdf, pdf]);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "Manual.Pdf");
        assert_eq!(files[0].media_type, PDF_MEDIA_TYPE);
    }
}
