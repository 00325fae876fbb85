//! SASL XOAUTH2 initial response for token-based authentication.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Generates XOAUTH2 initial response.
///
/// Format: `user=<user>\x01auth=Bearer <token>\x01\x01` (base64 encoded)
///
/// # Example
///
/// ```
/// use unimail_oauth::sasl::xoauth2_response;
///
/// let response = xoauth2_response("user@example.com", "EwB4A8l6...");
/// // Send: AUTHENTICATE XOAUTH2 {response}
/// ```
#[must_use]
pub fn xoauth2_response(user: &str, token: &str) -> String {
    let auth_string = format!("user={user}\x01auth=Bearer {token}\x01\x01");
    STANDARD.encode(auth_string.as_bytes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn decode(response: &str) -> String {
        String::from_utf8(STANDARD.decode(response).unwrap()).unwrap()
    }

    #[test]
    fn test_xoauth2_format() {
        let response = xoauth2_response("test@test.com", "abc");
        assert_eq!(decode(&response), "user=test@test.com\x01auth=Bearer abc\x01\x01");
    }

    #[test]
    fn test_responses_are_base64() {
        let response = xoauth2_response("user@example.com", "token");
        assert!(!response.contains("user@example.com"));
        assert!(!response.contains("token"));
    }
}
