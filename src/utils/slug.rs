//! Upload filename slugification.
//!
//! Object names come from user-supplied filenames and end up in URLs, bucket
//! listings, and cache keys, so they are reduced to a safe ASCII form before
//! storage. The extension is preserved so derivation keeps recognizing the
//! name as a file.

/// Compound extensions that must survive slugification as a unit.
///
/// Without this list `backup.tar.gz` would slugify to `backup-tar.gz`.
const DOUBLE_EXTENSIONS: &[&str] = &[".tar.gz", ".tar.bz2", ".tar.xz", ".tar.zst"];

/// Fallback stem for filenames that slugify to nothing.
const EMPTY_STEM: &str = "file";

/// Reduces a filename to a URL-safe slug, preserving its extension.
///
/// The stem is lowercased and non-alphanumeric runs collapse to single
/// hyphens, trimmed at both ends. Compound archive extensions
/// (`.tar.gz` and friends) are kept intact. A stem with no usable characters
/// becomes `file`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify_filename("Quarterly Report (final).pdf"), "quarterly-report-final.pdf");
/// assert_eq!(slugify_filename("backup 2024.tar.gz"), "backup-2024.tar.gz");
/// assert_eq!(slugify_filename("???.png"), "file.png");
/// ```
pub fn slugify_filename(filename: &str) -> String {
    let (stem, ext) = split_extension(filename);

    let slug = slugify(stem);
    if slug.is_empty() {
        format!("{EMPTY_STEM}{ext}")
    } else {
        format!("{slug}{ext}")
    }
}

/// Splits a filename into stem and extension, extension including the dot.
///
/// Checks compound extensions first, then falls back to the last dot. Names
/// without a dot, dotfiles, and names ending in a dot have an empty
/// extension.
fn split_extension(filename: &str) -> (&str, &str) {
    for double_ext in DOUBLE_EXTENSIONS {
        if let Some(stem) = filename.strip_suffix(double_ext) {
            return (stem, double_ext);
        }
    }

    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            (stem, &filename[stem.len()..])
        }
        _ => (filename, ""),
    }
}

fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    out
}
