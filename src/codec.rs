// Stream locator codec.
// Locators have the form: sshvideo://stream/<base64url-no-pad(utf8 path)>

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::SessionError;

/// Private URI scheme intercepted by the host runtime. Locators under this
/// scheme are resolved to streamed byte ranges of the remote file, never
/// over ordinary DNS/HTTP resolution.
pub const STREAM_SCHEME: &str = "sshvideo";

const STREAM_PREFIX: &str = "sshvideo://stream/";

/// Encode a remote absolute path into a URL-safe token.
///
/// Deterministic and injective: the token contains only `[A-Za-z0-9_-]`
/// and no padding, so it can be embedded in a locator without escaping.
pub fn encode_path(path: &str) -> String {
    URL_SAFE_NO_PAD.encode(path.as_bytes())
}

/// Inverse of [`encode_path`].
pub fn decode_token(token: &str) -> Result<String, SessionError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| SessionError::InvalidLocator("Invalid stream path encoding.".to_string()))?;
    String::from_utf8(bytes).map_err(|_| SessionError::InvalidStreamPath)
}

/// Build the full stream locator for a remote path.
pub fn stream_locator(path: &str) -> String {
    format!("{STREAM_PREFIX}{}", encode_path(path))
}

/// Extract the remote path from a stream locator.
///
/// Tolerates a trailing `?query` suffix, which some media elements append
/// when re-requesting byte ranges.
pub fn parse_stream_locator(uri: &str) -> Result<String, SessionError> {
    let Some(rest) = uri.strip_prefix(STREAM_PREFIX) else {
        return Err(SessionError::InvalidLocator(format!(
            "Expected {STREAM_PREFIX}<token>, got: {uri}"
        )));
    };
    let token = rest.split('?').next().unwrap_or(rest);
    decode_token(token)
}
