// URL normalization for the `url` column. Normalization never fails:
// anything `url::Url` rejects is split by hand into best-effort components.

use crate::NormalizedUrl;
use tracing::debug;
use url::Url;

const DEFAULT_SCHEME: &str = "http";

/// Schemes written without `//` that must not get a default scheme prefixed.
const OPAQUE_SCHEMES: &[&str] = &["mailto", "urn", "data", "tel", "news"];

/// Normalize a raw URL string.
///
/// Scheme and host are lower-cased, default ports are dropped and dot
/// segments are resolved. The path keeps its case and trailing slash; a URL
/// with an authority but no path gets `/`. Strings without a scheme are
/// treated as `http`, so `example.com/a` has host `example.com`.
pub fn normalize_url(raw: &str) -> NormalizedUrl {
    let trimmed = raw.trim();
    let candidate = with_default_scheme(trimmed);

    match Url::parse(&candidate) {
        Ok(url) => from_parsed(&url),
        Err(e) => {
            debug!("URL {:?} did not parse ({}), using best-effort split", trimmed, e);
            best_effort(trimmed)
        }
    }
}

/// The scheme at the very start of `raw`, if it is a valid scheme token
/// (`ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`) followed by `:`.
fn leading_scheme(raw: &str) -> Option<&str> {
    let (scheme, _) = raw.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

/// The scheme and the text after `scheme://`, for hierarchical URLs only.
fn split_authority_scheme(raw: &str) -> Option<(&str, &str)> {
    let scheme = leading_scheme(raw)?;
    raw[scheme.len() + 1..]
        .strip_prefix("//")
        .map(|rest| (scheme, rest))
}

fn with_default_scheme(raw: &str) -> String {
    if split_authority_scheme(raw).is_some() {
        return raw.to_string();
    }
    if let Some(scheme) = leading_scheme(raw) {
        if OPAQUE_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) {
            return raw.to_string();
        }
    }
    format!("{}://{}", DEFAULT_SCHEME, raw)
}

fn from_parsed(url: &Url) -> NormalizedUrl {
    if url.cannot_be_a_base() {
        return NormalizedUrl {
            scheme: url.scheme().to_string(),
            host: String::new(),
            path: String::new(),
            opaque: url.path().to_string(),
        };
    }

    // Only special schemes get their host lower-cased by `url`.
    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host.to_ascii_lowercase(), port),
        (Some(host), None) => host.to_ascii_lowercase(),
        (None, _) => String::new(),
    };

    NormalizedUrl {
        scheme: url.scheme().to_string(),
        host,
        path: url.path().to_string(),
        opaque: String::new(),
    }
}

fn best_effort(raw: &str) -> NormalizedUrl {
    let (scheme, rest) = match split_authority_scheme(raw) {
        Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
        None => (DEFAULT_SCHEME.to_string(), raw),
    };

    let rest = rest.split(['?', '#']).next().unwrap_or("");
    let (authority, path) = match rest.find('/') {
        Some(pos) => rest.split_at(pos),
        None => (rest, ""),
    };

    NormalizedUrl {
        host: strip_default_port(&scheme, &authority.to_ascii_lowercase()),
        scheme,
        path: path.to_string(),
        opaque: String::new(),
    }
}

fn strip_default_port(scheme: &str, host: &str) -> String {
    let default_port = match scheme {
        "http" | "ws" => ":80",
        "https" | "wss" => ":443",
        "ftp" => ":21",
        _ => return host.to_string(),
    };
    host.strip_suffix(default_port).unwrap_or(host).to_string()
}
