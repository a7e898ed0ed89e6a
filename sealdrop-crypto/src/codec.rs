//! Binary to text transcoding for keys, ciphertexts, salts, IVs and wrapped
//! keys, so they can cross a text-only storage boundary.

use crate::error::{CryptoError, CryptoResult};
use base64::{Engine, engine::general_purpose::STANDARD};

/// Encodes bytes as padded standard base64.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes padded standard base64.
///
/// Characters outside the alphabet, bad padding and trailing garbage all map
/// to [`CryptoError::MalformedEncoding`].
pub fn decode(text: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(text)
        .map_err(|_| CryptoError::MalformedEncoding)
}

/// Decodes into a fixed-size array, treating a length mismatch as malformed.
pub(crate) fn decode_array<const N: usize>(text: &str) -> CryptoResult<[u8; N]> {
    let bytes = decode(text)?;
    bytes.try_into().map_err(|_| CryptoError::MalformedEncoding)
}

/// Serde adapter that stores byte fields as codec text.
///
/// ```ignore
/// #[serde(with = "crate::codec::text")]
/// ciphertext: Vec<u8>,
/// ```
pub mod text {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S, T>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: AsRef<[u8]>,
    {
        serializer.serialize_str(&super::encode(bytes.as_ref()))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<Vec<u8>>,
    {
        let text = String::deserialize(deserializer)?;
        let bytes = super::decode(&text).map_err(D::Error::custom)?;
        T::try_from(bytes).map_err(|_| D::Error::custom("unexpected byte length"))
    }
}
