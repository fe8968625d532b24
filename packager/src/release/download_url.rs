//! Download URL templating.
//!
//! Templates use `{tag}`, `{version}` and `{filename}` placeholders, for
//! example `https://github.com/Alex-C-EE/PULSAR-KiCad-Lib/releases/download/{tag}/{filename}`.

use crate::error::InputError;

/// Values substituted into a download URL template.
#[derive(Debug, Clone, Copy)]
pub struct UrlContext<'a> {
    /// Release tag, e.g. `v1.0.0`.
    pub tag: &'a str,
    /// Release version, e.g. `1.0.0`.
    pub version: &'a str,
    /// Archive filename.
    pub filename: &'a str,
}

/// Render `template` with the values in `context`.
///
/// # Errors
///
/// Returns [`InputError::UnknownPlaceholder`] for placeholders other than
/// `tag`, `version` and `filename`, and
/// [`InputError::UnterminatedPlaceholder`] when a `{` has no closing `}`.
///
/// # Examples
///
/// ```
/// use pulsar_packager::release::download_url::{UrlContext, render_download_url};
///
/// let url = render_download_url(
///     "https://example.com/{tag}/{filename}",
///     UrlContext { tag: "v1.0.0", version: "1.0.0", filename: "lib-1.0.0.zip" },
/// )
/// .expect("valid template");
/// assert_eq!(url, "https://example.com/v1.0.0/lib-1.0.0.zip");
/// ```
pub fn render_download_url(template: &str, context: UrlContext<'_>) -> Result<String, InputError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| InputError::UnterminatedPlaceholder {
                template: template.to_owned(),
            })?;
        let value = match &after[..close] {
            "tag" => context.tag,
            "version" => context.version,
            "filename" => context.filename,
            other => {
                return Err(InputError::UnknownPlaceholder {
                    placeholder: other.to_owned(),
                });
            }
        };
        out.push_str(value);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
