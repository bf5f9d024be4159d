//! Client-supplied filename sanitization.

/// Device names Windows refuses as file names regardless of extension.
const WINDOWS_DEVICE_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Reduce a client filename to a safe basename.
///
/// Path separators become word breaks, every character outside
/// `[A-Za-z0-9._-]` is dropped, whitespace runs collapse to `_` and leading
/// or trailing `.`/`_` are stripped. The result never contains `/`, `\` or a
/// `..` component. Returns `None` when nothing usable is left.
pub fn secure_filename(raw: &str) -> Option<String> {
    let spaced: String = raw
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    let mut name = joined.trim_matches(|c| c == '.' || c == '_').to_string();
    if name.is_empty() {
        return None;
    }

    let stem = name.split('.').next().unwrap_or_default();
    if WINDOWS_DEVICE_NAMES
        .iter()
        .any(|device| device.eq_ignore_ascii_case(stem))
    {
        name.insert(0, '_');
    }

    Some(name)
}
