//! Session and user hints from a bearer credential.
//!
//! This does not verify anything. Signature checks belong to the
//! authentication layer; here we only read what the token claims so the
//! access record can be correlated.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;

/// What the access log knows about the caller.
///
/// All-zero for anonymous requests and for malformed credentials alike.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenInfo {
    pub session_id: String,
    pub user_id: i64,
}

/// Reads a three-segment `header.payload.signature` credential, with or
/// without a `Bearer ` prefix.
///
/// The signature segment doubles as the session id. The payload's `userId`
/// claim (any letter case) becomes the user id when it is an integer.
pub fn token_info(credential: &str) -> TokenInfo {
    let token = strip_bearer(credential.trim());
    let segments: Vec<&str> = token.split('.').collect();
    let &[_, payload, signature] = segments.as_slice() else {
        return TokenInfo::default();
    };

    TokenInfo {
        session_id: signature.to_owned(),
        user_id: decode_segment(payload)
            .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok())
            .and_then(|claims| user_id_claim(&claims))
            .unwrap_or_default(),
    }
}

fn strip_bearer(value: &str) -> &str {
    match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim_start(),
        _ => value,
    }
}

fn user_id_claim(claims: &serde_json::Value) -> Option<i64> {
    claims
        .as_object()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("userid"))
        .and_then(|(_, value)| value.as_i64())
}

/// base64url with the padding put back, so unpadded JWT segments decode.
fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    let mut padded = segment.to_owned();
    let rem = padded.len() % 4;
    if rem > 0 {
        padded.extend(std::iter::repeat_n('=', 4 - rem));
    }
    URL_SAFE.decode(padded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn token(claims: &str) -> String {
        format!(
            "{}.{}.sig-123",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#),
            URL_SAFE_NO_PAD.encode(claims),
        )
    }

    #[test]
    fn reads_session_and_user_from_bearer_header() {
        let info = token_info(&format!("Bearer {}", token(r#"{"userId":42,"role":"admin"}"#)));
        assert_eq!(info, TokenInfo { session_id: "sig-123".into(), user_id: 42 });
    }

    #[test]
    fn user_id_key_is_case_insensitive() {
        assert_eq!(token_info(&token(r#"{"UserId":9}"#)).user_id, 9);
        assert_eq!(token_info(&token(r#"{"userid":10}"#)).user_id, 10);
    }

    #[test]
    fn fewer_than_three_segments_yields_zero_identity() {
        assert_eq!(token_info("abc.def"), TokenInfo::default());
        assert_eq!(token_info(""), TokenInfo::default());
        assert_eq!(token_info("a.b.c.d"), TokenInfo::default());
    }

    #[test]
    fn undecodable_payload_keeps_session_only() {
        let info = token_info("head.%%%not-base64%%%.sess");
        assert_eq!(info.session_id, "sess");
        assert_eq!(info.user_id, 0);
    }

    #[test]
    fn non_integer_user_id_is_ignored() {
        assert_eq!(token_info(&token(r#"{"userId":"42"}"#)).user_id, 0);
        assert_eq!(token_info(&token(r#"{"userId":4.5}"#)).user_id, 0);
    }

    #[test]
    fn padding_is_normalized() {
        // 7 payload bytes → 10 base64 chars, two `=` short.
        let payload = URL_SAFE_NO_PAD.encode(r#"{"a":1}"#);
        assert_ne!(payload.len() % 4, 0);
        assert!(decode_segment(&payload).is_some());
    }
}
