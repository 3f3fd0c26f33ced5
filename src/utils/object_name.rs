//! Object-identity derivation from target URLs.
//!
//! Decides whether a redirect target points at an object in the configured
//! bucket, and if so under which name. Used to populate the existence cache
//! and to build the reconciler's live-reference set.

use url::Url;

/// File extensions treated as object names.
///
/// A final path segment without one of these extensions is never considered
/// an object, even when the host matches the storage endpoint. This is a
/// policy choice to avoid false positives on extensionless API paths that
/// happen to share the endpoint host.
const RECOGNIZED_EXTENSIONS: &[&str] = &[
    // Archives
    "zip", "tar", "gz", "bz2", "xz", "zst", "7z", "rar", "tgz",
    // Documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp", "txt", "md", "rtf",
    "csv", "json", "xml", "yaml", "yml", "toml", "ini", "log", "html", "htm", "epub",
    // Images
    "png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "ico", "tif", "tiff", "avif", "heic",
    // Audio
    "mp3", "wav", "flac", "ogg", "m4a", "aac", "opus",
    // Video
    "mp4", "mkv", "webm", "avi", "mov", "wmv", "m4v",
    // Packages and binaries
    "exe", "msi", "dmg", "pkg", "deb", "rpm", "apk", "appimage", "iso", "img", "bin", "jar",
    "war", "wasm", "so", "dll",
    // Fonts
    "woff", "woff2", "ttf", "otf",
    // Certificates and signatures
    "pem", "crt", "asc", "sig",
    // Data
    "sql", "db", "sqlite", "parquet", "bak",
];

/// Identifies which target URLs refer to objects in the configured bucket.
///
/// Built once from the storage configuration and shared by the key store and
/// the reconciler. Derivation is a pure function of the target string, so
/// deriving twice from the same URL always yields the same name.
#[derive(Debug, Clone)]
pub struct ObjectUrlPolicy {
    host: String,
    port: Option<u16>,
    bucket: String,
}

impl ObjectUrlPolicy {
    /// Creates a policy for the given endpoint URL and bucket.
    ///
    /// The endpoint's host and port (explicit or scheme default) become the
    /// authority that target URLs must match. Bucket matching assumes
    /// path-style addressing, which is how this service writes and presigns
    /// objects.
    pub fn new(endpoint: &Url, bucket: impl Into<String>) -> Self {
        Self {
            host: endpoint.host_str().unwrap_or_default().to_ascii_lowercase(),
            port: endpoint.port_or_known_default(),
            bucket: bucket.into(),
        }
    }

    /// Derives the object name a target URL refers to, if any.
    ///
    /// Returns `Some(name)` only when all of the following hold:
    ///
    /// 1. The target parses as a URL whose host and port match the endpoint
    /// 2. The first path segment is the configured bucket
    /// 3. The final path segment is non-empty and carries a recognized
    ///    file extension
    ///
    /// Anything else, including a malformed target string, derives to `None`
    /// ("not object-backed"). Query parameters such as presign signatures
    /// are ignored.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let endpoint = Url::parse("http://minio.internal:9000").unwrap();
    /// let policy = ObjectUrlPolicy::new(&endpoint, "shortlink");
    ///
    /// assert_eq!(
    ///     policy.derive("http://minio.internal:9000/shortlink/report.pdf?X-Amz-Signature=abc"),
    ///     Some("report.pdf".to_string())
    /// );
    /// assert_eq!(policy.derive("https://example.com/report.pdf"), None);
    /// assert_eq!(policy.derive("http://minio.internal:9000/shortlink/api/v2/status"), None);
    /// ```
    pub fn derive(&self, target: &str) -> Option<String> {
        let url = Url::parse(target).ok()?;

        let host_matches = url
            .host_str()
            .is_some_and(|h| h.eq_ignore_ascii_case(&self.host));
        if !host_matches || url.port_or_known_default() != self.port {
            return None;
        }

        let mut segments = url.path_segments()?;
        if segments.next() != Some(self.bucket.as_str()) {
            return None;
        }

        let name = segments.next_back().filter(|s| !s.is_empty())?;
        if !has_recognized_extension(name) {
            return None;
        }

        Some(name.to_string())
    }
}

/// Checks whether a file name ends in a recognized extension.
///
/// The extension is everything after the last dot, compared
/// case-insensitively. Dotfiles and bare names have no extension.
pub fn has_recognized_extension(name: &str) -> bool {
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return false;
    };
    if stem.is_empty() || ext.is_empty() {
        return false;
    }

    let ext = ext.to_ascii_lowercase();
    RECOGNIZED_EXTENSIONS.contains(&ext.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ObjectUrlPolicy {
        let endpoint = Url::parse("http://minio.internal:9000").unwrap();
        ObjectUrlPolicy::new(&endpoint, "shortlink")
    }

    #[test]
    fn test_derive_simple_object_url() {
        let result = policy().derive("http://minio.internal:9000/shortlink/report.pdf");
        assert_eq!(result, Some("report.pdf".to_string()));
    }

    #[test]
    fn test_derive_ignores_presign_query() {
        let result = policy().derive(
            "http://minio.internal:9000/shortlink/report.pdf?X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Signature=deadbeef",
        );
        assert_eq!(result, Some("report.pdf".to_string()));
    }

    #[test]
    fn test_derive_host_case_insensitive() {
        let result = policy().derive("http://MINIO.INTERNAL:9000/shortlink/report.pdf");
        assert_eq!(result, Some("report.pdf".to_string()));
    }

    #[test]
    fn test_derive_foreign_host() {
        let result = policy().derive("https://example.com/shortlink/report.pdf");
        assert_eq!(result, None);
    }

    #[test]
    fn test_derive_wrong_port() {
        let result = policy().derive("http://minio.internal:9001/shortlink/report.pdf");
        assert_eq!(result, None);
    }

    #[test]
    fn test_derive_default_port_matches_explicit() {
        let endpoint = Url::parse("https://storage.example.com").unwrap();
        let policy = ObjectUrlPolicy::new(&endpoint, "files");

        let result = policy.derive("https://storage.example.com:443/files/data.csv");
        assert_eq!(result, Some("data.csv".to_string()));
    }

    #[test]
    fn test_derive_wrong_bucket() {
        let result = policy().derive("http://minio.internal:9000/other-bucket/report.pdf");
        assert_eq!(result, None);
    }

    #[test]
    fn test_derive_bucket_only_path() {
        let result = policy().derive("http://minio.internal:9000/shortlink");
        assert_eq!(result, None);
    }

    #[test]
    fn test_derive_trailing_slash() {
        let result = policy().derive("http://minio.internal:9000/shortlink/");
        assert_eq!(result, None);
    }

    #[test]
    fn test_derive_nested_path_uses_final_segment() {
        let result = policy().derive("http://minio.internal:9000/shortlink/nested/deep/file.txt");
        assert_eq!(result, Some("file.txt".to_string()));
    }

    #[test]
    fn test_derive_extensionless_path() {
        let result = policy().derive("http://minio.internal:9000/shortlink/api/v2/status");
        assert_eq!(result, None);
    }

    #[test]
    fn test_derive_unrecognized_extension() {
        let result = policy().derive("http://minio.internal:9000/shortlink/file.xyzzy");
        assert_eq!(result, None);
    }

    #[test]
    fn test_derive_extension_case_insensitive() {
        let result = policy().derive("http://minio.internal:9000/shortlink/REPORT.PDF");
        assert_eq!(result, Some("REPORT.PDF".to_string()));
    }

    #[test]
    fn test_derive_double_extension() {
        let result = policy().derive("http://minio.internal:9000/shortlink/backup.tar.gz");
        assert_eq!(result, Some("backup.tar.gz".to_string()));
    }

    #[test]
    fn test_derive_malformed_url() {
        let result = policy().derive("not a url at all");
        assert_eq!(result, None);
    }

    #[test]
    fn test_derive_empty_string() {
        let result = policy().derive("");
        assert_eq!(result, None);
    }

    #[test]
    fn test_derive_relative_url() {
        let result = policy().derive("/shortlink/report.pdf");
        assert_eq!(result, None);
    }

    #[test]
    fn test_derive_is_idempotent() {
        let p = policy();
        let url = "http://minio.internal:9000/shortlink/report.pdf";
        assert_eq!(p.derive(url), p.derive(url));
    }

    #[test]
    fn test_extension_dotfile() {
        assert!(!has_recognized_extension(".gitignore"));
    }

    #[test]
    fn test_extension_bare_name() {
        assert!(!has_recognized_extension("README"));
    }

    #[test]
    fn test_extension_trailing_dot() {
        assert!(!has_recognized_extension("file."));
    }

    #[test]
    fn test_extension_common_formats() {
        for name in ["a.pdf", "a.zip", "a.png", "a.mp4", "a.json", "a.tar.gz"] {
            assert!(has_recognized_extension(name), "{name} should be recognized");
        }
    }
}
