//! Upload filename sanitizing.

/// Name used when nothing usable is left of the client's filename.
pub const FALLBACK_UPLOAD_NAME: &str = "upload.bin";

/// Reduce a client-supplied filename to something safe to join onto a
/// server path.
///
/// Only the last path component is kept. Whitespace becomes `_`, anything
/// other than ASCII alphanumerics, `.`, `-` and `_` is dropped, and leading
/// dots are stripped so the result can never be `..` or a hidden file.
///
/// ```
/// use vidtally_core::naming::sanitize_filename;
///
/// assert_eq!(sanitize_filename("My Clip.mp4"), "My_Clip.mp4");
/// assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
/// assert_eq!(sanitize_filename("..."), "upload.bin");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_whitespace() => Some('_'),
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            _ => None,
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_UPLOAD_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}
