//! Identifier derivation for image-transform jobs.
//!
//! An identifier is url-safe base64 of the raw request URL bytes, no padding
//! stripped. It is the only key used across the cache, the queue, and the
//! in-flight slot, so two `Create` calls for the same URL always converge on
//! the same job.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;

/// Derives the stable job identifier for a source URL.
pub fn derive(url: &str) -> String {
    URL_SAFE.encode(url.as_bytes())
}

/// Recovers the original URL from an identifier, if it decodes to valid UTF-8.
pub fn decode(id: &str) -> Option<String> {
    let bytes = URL_SAFE.decode(id).ok()?;
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_decode() {
        let url = "http://x.test/a.jpg";
        let id = derive(url);
        assert_eq!(id, "aHR0cDovL3gudGVzdC9hLmpwZw==");
        assert_eq!(decode(&id).as_deref(), Some(url));
    }

    #[test]
    fn same_url_yields_same_id() {
        let a = derive("http://example.com/cat.png");
        let b = derive("http://example.com/cat.png");
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_id_fails_to_decode_as_utf8_or_base64() {
        assert!(decode("not valid base64!!").is_none());
    }
}
