// src/crawl/resolve.rs
// =============================================================================
// Turns a link found on a page into an absolute URL we can crawl.
//
// Links on a page come in many shapes:
//   https://other.com/page   -> already absolute, passes through
//   /docs                    -> relative to the host root
//   ./x.php or ../x.php      -> relative to the current directory
//   //cdn.example.com/a.js   -> protocol-relative
//   ?page=2 or #top          -> query/fragment only
//
// The url crate implements the standard resolution rules (the same ones a
// browser uses) in Url::join, including "." and ".." segment removal.
//
// Rust concepts:
// - Result with a custom error enum: Callers can see why a link was rejected
// - map_err: Convert one error type into another
// =============================================================================

use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The page URL itself is not a usable absolute URL
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBase { url: String, reason: String },

    /// The link could not be parsed against the base
    #[error("invalid link '{link}': {reason}")]
    InvalidCandidate { link: String, reason: String },

    /// The link resolved to something that is not a crawlable absolute URL
    #[error("link '{link}' does not resolve to an absolute URL")]
    NotAbsolute { link: String },
}

// Resolves `candidate` against `base` and returns the normalized absolute URL
//
// Parameters:
//   base: absolute URL of the page the link was found on
//   candidate: the raw link text (relative or absolute)
//
// Examples:
//   resolve("https://h/a/index.php", "/x.php")  -> "https://h/x.php"
//   resolve("https://h/a/index.php", "./x.php") -> "https://h/a/x.php"
//   resolve("https://h/a/", "mailto:me@h")      -> Err(NotAbsolute)
pub fn resolve(base: &str, candidate: &str) -> Result<String, ResolveError> {
    let base_url = Url::parse(base).map_err(|e| ResolveError::InvalidBase {
        url: base.to_string(),
        reason: e.to_string(),
    })?;

    // "mailto:someone" parses, but nothing can be resolved against it
    if base_url.cannot_be_a_base() {
        return Err(ResolveError::InvalidBase {
            url: base.to_string(),
            reason: "URL cannot be used as a base".to_string(),
        });
    }

    let resolved = base_url
        .join(candidate)
        .map_err(|e| ResolveError::InvalidCandidate {
            link: candidate.to_string(),
            reason: e.to_string(),
        })?;

    // mailto:, javascript:, data: and friends have no host or path hierarchy
    if resolved.cannot_be_a_base() {
        return Err(ResolveError::NotAbsolute {
            link: candidate.to_string(),
        });
    }

    Ok(resolved.to_string())
}
