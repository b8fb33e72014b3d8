//! Media types and `Accept` header negotiation for key material
//!
//! Only a single media range is accepted, without parameters. The grammar is
//! the RFC 2045 `type/subtype *(";" parameter)` form; type and subtype are
//! compared case-insensitively.

use std::collections::BTreeMap;
use thiserror::Error;

/// Media type of a single JSON Web Key
pub const JWK_MEDIA_TYPE: &str = "application/jwk+json";

/// Media type of a JSON Web Key set
pub const JWK_SET_MEDIA_TYPE: &str = "application/jwk-set+json";

/// Media type of a PEM-encoded key
pub const PEM_MEDIA_TYPE: &str = "application/x-pem-file";

/// Media type of a compact serialized JWT
pub const JWT_MEDIA_TYPE: &str = "application/jwt";

/// Representations in which public key material can be served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFormat {
    /// A single key as JSON
    Jwk,
    /// A key set as JSON
    JwkSet,
    /// SPKI public key, PEM armored
    Pem,
}

impl KeyFormat {
    /// The canonical media type for this format
    pub fn media_type(&self) -> &'static str {
        match self {
            KeyFormat::Jwk => JWK_MEDIA_TYPE,
            KeyFormat::JwkSet => JWK_SET_MEDIA_TYPE,
            KeyFormat::Pem => PEM_MEDIA_TYPE,
        }
    }
}

impl std::fmt::Display for KeyFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.media_type())
    }
}

/// Reasons an `Accept` header cannot be honored
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    /// The header is not a syntactically valid media type
    #[error("Malformed media type: {0}")]
    Malformed(String),

    /// The header carries media type parameters
    #[error("Media type parameters are not supported")]
    ParamsUnsupported,

    /// The header names a media type with no matching representation
    #[error("Unsupported media type: {0}")]
    Unsupported(String),
}

/// Pick the key representation for an `Accept` header value
///
/// An empty header, `*/*` and `application/*` select [`KeyFormat::Jwk`].
/// Only the JWK and PEM media types match exactly; a key set is never
/// negotiated here because it has its own endpoint.
pub fn negotiate(accept: &str) -> Result<KeyFormat, NegotiationError> {
    if accept.is_empty() {
        return Ok(KeyFormat::Jwk);
    }

    let (media_type, params) = parse_media_type(accept)?;
    if !params.is_empty() {
        return Err(NegotiationError::ParamsUnsupported);
    }

    match media_type.as_str() {
        "*/*" | "application/*" | JWK_MEDIA_TYPE => Ok(KeyFormat::Jwk),
        PEM_MEDIA_TYPE => Ok(KeyFormat::Pem),
        _ => Err(NegotiationError::Unsupported(media_type)),
    }
}

/// Parse a media type and its parameters
///
/// Returns the lowercased `type/subtype` (or bare type) and the parameters
/// keyed by lowercased name. A trailing `;` with no parameter is ignored.
pub fn parse_media_type(value: &str) -> Result<(String, BTreeMap<String, String>), NegotiationError> {
    let (base, mut rest) = match value.find(';') {
        Some(idx) => (&value[..idx], &value[idx..]),
        None => (value, ""),
    };

    let media_type = base.trim().to_ascii_lowercase();
    check_media_type(&media_type)?;

    let mut params = BTreeMap::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        match consume_param(rest) {
            Some((key, param_value, remainder)) => {
                if params.insert(key.clone(), param_value).is_some() {
                    return Err(NegotiationError::Malformed(format!(
                        "duplicate parameter '{}'",
                        key
                    )));
                }
                rest = remainder;
            }
            None if rest.trim() == ";" => break,
            None => {
                return Err(NegotiationError::Malformed(
                    "invalid media parameter".into(),
                ))
            }
        }
    }

    Ok((media_type, params))
}

fn check_media_type(media_type: &str) -> Result<(), NegotiationError> {
    let (kind, rest) = consume_token(media_type);
    if kind.is_empty() {
        return Err(NegotiationError::Malformed("no media type".into()));
    }
    if rest.is_empty() {
        return Ok(());
    }

    let Some(rest) = rest.strip_prefix('/') else {
        return Err(NegotiationError::Malformed(
            "expected slash after first token".into(),
        ));
    };

    let (subtype, rest) = consume_token(rest);
    if subtype.is_empty() {
        return Err(NegotiationError::Malformed(
            "expected token after slash".into(),
        ));
    }
    if !rest.is_empty() {
        return Err(NegotiationError::Malformed(
            "unexpected content after media subtype".into(),
        ));
    }

    Ok(())
}

/// Consume `; key=value` from the front of `input`
fn consume_param(input: &str) -> Option<(String, String, &str)> {
    let rest = input.trim_start().strip_prefix(';')?.trim_start();

    let (key, rest) = consume_token(rest);
    if key.is_empty() {
        return None;
    }

    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let (value, rest) = consume_value(rest)?;

    Some((key.to_ascii_lowercase(), value, rest))
}

fn consume_value(input: &str) -> Option<(String, &str)> {
    match input.strip_prefix('"') {
        Some(quoted) => consume_quoted(quoted),
        None => {
            let (token, rest) = consume_token(input);
            if token.is_empty() {
                None
            } else {
                Some((token.to_string(), rest))
            }
        }
    }
}

/// Consume the remainder of a quoted string whose opening quote is gone
fn consume_quoted(input: &str) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut chars = input.char_indices();

    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return Some((value, &input[idx + 1..])),
            '\\' => {
                let (_, escaped) = chars.next()?;
                value.push(escaped);
            }
            '\r' | '\n' => return None,
            _ => value.push(c),
        }
    }

    None
}

fn consume_token(input: &str) -> (&str, &str) {
    let end = input
        .char_indices()
        .find(|&(_, c)| !is_token_char(c))
        .map(|(idx, _)| idx)
        .unwrap_or(input.len());
    input.split_at(end)
}

fn is_token_char(c: char) -> bool {
    c.is_ascii() && c > ' ' && c != '\x7f' && !"()<>@,;:\\\"/[]?=".contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_jwk() {
        assert_eq!(negotiate(""), Ok(KeyFormat::Jwk));
        assert_eq!(negotiate("*/*"), Ok(KeyFormat::Jwk));
        assert_eq!(negotiate("application/*"), Ok(KeyFormat::Jwk));
    }

    #[test]
    fn test_exact_matches() {
        assert_eq!(negotiate(JWK_MEDIA_TYPE), Ok(KeyFormat::Jwk));
        assert_eq!(negotiate(PEM_MEDIA_TYPE), Ok(KeyFormat::Pem));
        assert_eq!(negotiate("Application/X-PEM-File"), Ok(KeyFormat::Pem));
        assert_eq!(negotiate("  application/jwk+json  "), Ok(KeyFormat::Jwk));
    }

    #[test]
    fn test_key_set_not_negotiable() {
        assert_eq!(
            negotiate(JWK_SET_MEDIA_TYPE),
            Err(NegotiationError::Unsupported(JWK_SET_MEDIA_TYPE.into()))
        );
    }

    #[test]
    fn test_parameters_rejected() {
        assert_eq!(
            negotiate("application/jwk-set+json; charset=utf-8"),
            Err(NegotiationError::ParamsUnsupported)
        );
        assert_eq!(
            negotiate("application/jwk+json;q=0.9"),
            Err(NegotiationError::ParamsUnsupported)
        );
        assert_eq!(
            negotiate(r#"*/*; profile="a b""#),
            Err(NegotiationError::ParamsUnsupported)
        );
    }

    #[test]
    fn test_trailing_semicolon_ignored() {
        assert_eq!(negotiate("application/jwk+json;"), Ok(KeyFormat::Jwk));
    }

    #[test]
    fn test_malformed_headers() {
        for header in [
            "   ",
            "/json",
            "application/",
            "application/json, text/html",
            "application/jwk+json; charset",
            "application/jwk+json; a=1; a=2",
            "text/plain; x=\"unterminated",
        ] {
            assert!(
                matches!(negotiate(header), Err(NegotiationError::Malformed(_))),
                "expected malformed: {:?}",
                header
            );
        }
    }

    #[test]
    fn test_unsupported_types() {
        assert!(matches!(negotiate("text/html"), Err(NegotiationError::Unsupported(_))));
        assert!(matches!(negotiate("application"), Err(NegotiationError::Unsupported(_))));
        assert!(matches!(negotiate("text/*"), Err(NegotiationError::Unsupported(_))));
    }

    #[test]
    fn test_parse_parameters() {
        let (media_type, params) =
            parse_media_type(r#"Text/Plain; Charset=utf-8; title="a \"b\"""#).unwrap();
        assert_eq!(media_type, "text/plain");
        assert_eq!(params.get("charset").map(String::as_str), Some("utf-8"));
        assert_eq!(params.get("title").map(String::as_str), Some("a \"b\""));
    }
}
