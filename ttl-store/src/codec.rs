use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use shared::{Error, Result};

/// Maps logical keys to object names: `prefix + base64(utf8(key))`.
///
/// Any key content (slashes, control characters, unicode) becomes a name made
/// of the base64 alphabet, so the backend's naming rules never see it.
#[derive(Clone, Debug, Default)]
pub struct KeyCodec {
    prefix: String,
}

impl KeyCodec {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Prefix to send with list requests; omitted when empty.
    pub fn listing_prefix(&self) -> Option<String> {
        (!self.prefix.is_empty()).then(|| self.prefix.clone())
    }

    /// With an empty prefix the empty key encodes to `""`, which object stores
    /// reject; [`object_name`](Self::object_name) turns that into an error.
    pub fn encode(&self, key: &str) -> String {
        let mut name = String::with_capacity(self.prefix.len() + key.len().div_ceil(3) * 4);
        name.push_str(&self.prefix);
        B64.encode_string(key.as_bytes(), &mut name);
        name
    }

    /// Encoded name for a backend request.
    pub fn object_name(&self, key: &str) -> Result<String> {
        let name = self.encode(key);
        if name.is_empty() {
            return Err(Error::EmptyObjectName);
        }
        Ok(name)
    }

    /// Inverse of [`encode`](Self::encode). Only names enumerated under this
    /// codec's prefix are expected here.
    pub fn decode(&self, name: &str) -> Result<String> {
        let encoded = name
            .strip_prefix(self.prefix.as_str())
            .ok_or_else(|| Error::InvalidObjectName(name.to_string()))?;
        let bytes = B64
            .decode(encoded)
            .map_err(|_| Error::InvalidObjectName(name.to_string()))?;
        String::from_utf8(bytes).map_err(|_| Error::InvalidObjectName(name.to_string()))
    }
}
