//! Upload rules: accepted extensions, size limits, file-name sanitizing and
//! storage key layout.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;
use crate::types::DbId;

/// Largest accepted upload (100 MiB).
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Longest sanitized file name kept in a storage key.
const MAX_FILE_NAME_LEN: usize = 120;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid regex"));

/// What an uploaded file is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Manuscript,
    Proof,
}

impl UploadKind {
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            UploadKind::Manuscript => &["docx", "doc", "pdf", "rtf", "odt", "txt"],
            UploadKind::Proof => &["pdf", "png", "jpg", "jpeg", "tiff"],
        }
    }

    fn label(self) -> &'static str {
        match self {
            UploadKind::Manuscript => "manuscript",
            UploadKind::Proof => "proof",
        }
    }
}

/// Lower-cased extension of `file_name`, if any.
pub fn extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Check extension and size for an upload of `kind`. Returns the extension.
pub fn validate_upload(kind: UploadKind, file_name: &str, size: usize) -> Result<String, CoreError> {
    if size == 0 {
        return Err(CoreError::Validation("Uploaded file is empty".into()));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(CoreError::Validation(format!(
            "Uploaded file exceeds the {} MiB limit",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }
    let allowed = kind.allowed_extensions();
    match extension(file_name) {
        Some(ext) if allowed.contains(&ext.as_str()) => Ok(ext),
        _ => Err(CoreError::Validation(format!(
            "Unsupported {} file '{file_name}'. Allowed extensions: {allowed:?}",
            kind.label()
        ))),
    }
}

/// MIME type for a known extension.
pub fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        "rtf" => "application/rtf",
        "odt" => "application/vnd.oasis.opendocument.text",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Replace anything outside `[A-Za-z0-9._-]` with `_` and cap the length,
/// keeping the extension. Never returns an empty string.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned = UNSAFE_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');
    if cleaned.is_empty() {
        return "file".to_string();
    }
    if cleaned.len() <= MAX_FILE_NAME_LEN {
        return cleaned.to_string();
    }
    match cleaned.rsplit_once('.') {
        Some((stem, ext)) if ext.len() < 16 => {
            let keep = MAX_FILE_NAME_LEN - ext.len() - 1;
            format!("{}.{ext}", &stem[..keep.min(stem.len())])
        }
        _ => cleaned[..MAX_FILE_NAME_LEN].to_string(),
    }
}

fn project_prefix(tenant_id: DbId, project_id: DbId) -> String {
    format!("tenants/{tenant_id}/projects/{project_id}")
}

/// Storage key for a manuscript upload. `unique` disambiguates re-uploads.
pub fn manuscript_key(tenant_id: DbId, project_id: DbId, unique: &str, file_name: &str) -> String {
    format!(
        "{}/manuscript/{unique}-{}",
        project_prefix(tenant_id, project_id),
        sanitize_file_name(file_name)
    )
}

/// Storage key for proof `version` of a project.
pub fn proof_key(tenant_id: DbId, project_id: DbId, version: i32, file_name: &str) -> String {
    format!(
        "{}/proofs/v{version}-{}",
        project_prefix(tenant_id, project_id),
        sanitize_file_name(file_name)
    )
}

/// Whether `key` belongs to `tenant_id`.
pub fn key_belongs_to_tenant(key: &str, tenant_id: DbId) -> bool {
    key.starts_with(&format!("tenants/{tenant_id}/"))
}

/// Reject keys that could escape the storage root.
pub fn validate_storage_key(key: &str) -> Result<(), CoreError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.contains('\0')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        Err(CoreError::Validation(format!("Invalid storage key '{key}'")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_parsing() {
        assert_eq!(extension("Book.DOCX").as_deref(), Some("docx"));
        assert_eq!(extension("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension("README"), None);
        assert_eq!(extension(".hidden"), None);
    }

    #[test]
    fn manuscript_uploads() {
        assert_eq!(validate_upload(UploadKind::Manuscript, "novel.docx", 10).unwrap(), "docx");
        assert!(validate_upload(UploadKind::Manuscript, "novel.exe", 10).is_err());
        assert!(validate_upload(UploadKind::Manuscript, "novel.pdf", 0).is_err());
        assert!(validate_upload(UploadKind::Manuscript, "novel.pdf", MAX_UPLOAD_BYTES + 1).is_err());
    }

    #[test]
    fn proofs_reject_word_files() {
        assert!(validate_upload(UploadKind::Proof, "proof.docx", 10).is_err());
        assert!(validate_upload(UploadKind::Proof, "proof.PDF", 10).is_ok());
    }

    #[test]
    fn sanitizing() {
        assert_eq!(sanitize_file_name("My Novel (final).docx"), "My_Novel_final_.docx");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\draft.pdf"), "draft.pdf");
        assert_eq!(sanitize_file_name("???"), "file");
    }

    #[test]
    fn long_names_keep_extension() {
        let long = format!("{}.pdf", "a".repeat(300));
        let s = sanitize_file_name(&long);
        assert_eq!(s.len(), 120);
        assert!(s.ends_with(".pdf"));
    }

    #[test]
    fn key_layout() {
        assert_eq!(
            proof_key(3, 9, 2, "proof one.pdf"),
            "tenants/3/projects/9/proofs/v2-proof_one.pdf"
        );
        let k = manuscript_key(3, 9, "abc", "ms.docx");
        assert_eq!(k, "tenants/3/projects/9/manuscript/abc-ms.docx");
        assert!(key_belongs_to_tenant(&k, 3));
        assert!(!key_belongs_to_tenant(&k, 33));
        assert!(validate_storage_key(&k).is_ok());
    }

    #[test]
    fn traversal_keys_rejected() {
        for key in ["", "/etc/passwd", "a/../b", "a//b", "a/./b", "a\\b"] {
            assert!(validate_storage_key(key).is_err(), "{key:?} should be rejected");
        }
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for("pdf"), "application/pdf");
        assert_eq!(content_type_for("jpeg"), "image/jpeg");
        assert_eq!(content_type_for("zzz"), "application/octet-stream");
    }
}
