//! Naming, formatting and redaction helpers

/// Repository name used when the app name has no usable characters
pub const FALLBACK_REPO_NAME: &str = "storefront2app-build";

/// File name used when an artifact name has no usable characters
pub const FALLBACK_FILE_NAME: &str = "artifact";

/// Placeholder substituted for secrets in logs and error messages
pub const REDACTED: &str = "[REDACTED]";

/// Keep only `[A-Za-z0-9_-]` from an app name, for use in file names
///
/// # Examples
///
/// ```
/// use storefront2app::utils::sanitize_app_name;
///
/// assert_eq!(sanitize_app_name("My Store!"), "MyStore");
/// assert_eq!(sanitize_app_name("über-shop_2"), "ber-shop_2");
/// ```
pub fn sanitize_app_name(app_name: &str) -> String {
    app_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Deterministic local file name for a downloaded artifact
///
/// The artifact name is matched case-insensitively against known build kinds,
/// first match wins:
///
/// | contains | file name |
/// |---|---|
/// | `release-bundle` or `release-aab` | `<app>-release.aab` |
/// | `release-signed` | `<app>-release-signed.apk` |
/// | `release` | `<app>-release.apk` |
/// | `debug` | `<app>-debug.apk` |
/// | `ios` or `archive` | `<app>-ios.xcarchive.zip` |
/// | anything else | `<app>-<artifact name>` |
///
/// # Examples
///
/// ```
/// use storefront2app::utils::artifact_filename;
///
/// assert_eq!(artifact_filename("release-bundle-1", "My Store!"), "MyStore-release.aab");
/// assert_eq!(artifact_filename("app-debug", "My Store!"), "MyStore-debug.apk");
/// assert_eq!(artifact_filename("foo", "My Store!"), "MyStore-foo");
/// ```
pub fn artifact_filename(artifact_name: &str, app_name: &str) -> String {
    let app = sanitize_app_name(app_name);
    let lower = artifact_name.to_lowercase();

    let suffix = if lower.contains("release-bundle") || lower.contains("release-aab") {
        "release.aab"
    } else if lower.contains("release-signed") {
        "release-signed.apk"
    } else if lower.contains("release") {
        "release.apk"
    } else if lower.contains("debug") {
        "debug.apk"
    } else if lower.contains("ios") || lower.contains("archive") {
        "ios.xcarchive.zip"
    } else {
        return format!("{app}-{}", file_component(artifact_name));
    };

    format!("{app}-{suffix}")
}

/// Reduce a server-supplied name to a single plain file name
///
/// Path separators and control characters become `_`; names that would still
/// resolve to the current or parent directory become [`FALLBACK_FILE_NAME`].
/// The result can be joined onto a directory without leaving it.
///
/// # Examples
///
/// ```
/// use storefront2app::utils::file_component;
///
/// assert_eq!(file_component("../../etc/passwd"), ".._.._etc_passwd");
/// assert_eq!(file_component(".."), "artifact");
/// ```
pub fn file_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.trim() {
        "" | "." | ".." => FALLBACK_FILE_NAME.to_string(),
        _ => cleaned,
    }
}

/// Repository name derived from an app name
///
/// Lowercased, every character outside `[a-z0-9-]` becomes `-`, runs of `-`
/// collapse to one and leading/trailing `-` are trimmed. Falls back to
/// [`FALLBACK_REPO_NAME`] when nothing is left.
///
/// # Examples
///
/// ```
/// use storefront2app::utils::derive_repo_name;
///
/// assert_eq!(derive_repo_name("My Store!"), "my-store");
/// assert_eq!(derive_repo_name("!!!"), "storefront2app-build");
/// ```
pub fn derive_repo_name(app_name: &str) -> String {
    let mut name = String::with_capacity(app_name.len());
    for c in app_name.to_lowercase().chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            c
        } else {
            '-'
        };
        if c == '-' && name.ends_with('-') {
            continue;
        }
        name.push(c);
    }

    let trimmed = name.trim_matches('-');
    if trimmed.is_empty() {
        FALLBACK_REPO_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Human-readable size: bytes below 1 KiB, otherwise KB/MB with one decimal
///
/// # Examples
///
/// ```
/// use storefront2app::utils::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(1536), "1.5 KB");
/// assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;

    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

/// Replace every occurrence of `secret` in `text` with [`REDACTED`]
///
/// An empty secret leaves the text unchanged.
pub fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, REDACTED)
}
