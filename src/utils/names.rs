use std::collections::HashMap;
use percent_encoding::percent_decode_str;

/// Percent-decode a stream or application name. Invalid UTF-8 is replaced
/// rather than rejected.
pub fn url_decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Split `name?a=1&b=2` into the bare name and its query parameters.
pub fn split_query(raw: &str) -> (String, HashMap<String, String>) {
    match raw.split_once('?') {
        Some((name, query)) => {
            let params = url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect();
            (name.to_string(), params)
        }
        None => (raw.to_string(), HashMap::new()),
    }
}

/// Keep only the first path segment. A slash in the very first position is
/// left alone so that the name never becomes empty here.
pub fn first_segment(name: &str) -> &str {
    match name.find('/') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    }
}

/// Rewrite the `prefix:name` convention used by Flash-era clients.
///
/// With a colon inside the first six characters, `mp4:movie.mp4` becomes
/// `movie.mp4` (the prefix already matches the extension) while
/// `mp4:movie` becomes `movie.mp4`.
pub fn swap_colon_prefix(name: &str) -> String {
    let Some(colon) = name.find(':') else {
        return name.to_string();
    };
    if colon >= 6 {
        return name.to_string();
    }

    let prefix = &name[..colon];
    let rest = &name[colon + 1..];
    let dotted = format!(".{}", prefix);
    if name.ends_with(&dotted) {
        rest.to_string()
    } else {
        format!("{}.{}", rest, prefix)
    }
}

/// Strip everything a stream name may not contain and lowercase the rest.
/// Anything after a `?` is dropped.
pub fn sanitize_name(name: &str) -> String {
    let name = name.split('?').next().unwrap_or_default();
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Full normalisation applied to publish and play arguments after decoding.
pub fn normalize_stream_name(decoded: &str) -> String {
    let segment = first_segment(decoded);
    sanitize_name(&swap_colon_prefix(segment))
}
