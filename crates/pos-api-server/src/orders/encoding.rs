use thiserror::Error;
use tracing::warn;

/// Legacy delimiter used by the menu `ingredients` column and the
/// sales_history `cart` column. Single backslash, no escaping.
pub const ID_SEPARATOR: char = '\\';

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EncodingError {
    /// The legacy format cannot represent an id containing the separator;
    /// joining it would produce an ambiguous stream on decode.
    #[error("id '{0}' contains the reserved separator character")]
    SeparatorInId(String),

    #[error("'{0}' is not a valid ingredient id")]
    MalformedToken(String),
}

/// Join ids into the legacy backslash-delimited wire format.
pub fn encode_ids<I, S>(ids: I) -> Result<String, EncodingError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parts: Vec<String> = Vec::new();
    for id in ids {
        let id = id.as_ref();
        if id.contains(ID_SEPARATOR) {
            return Err(EncodingError::SeparatorInId(id.to_string()));
        }
        parts.push(id.to_string());
    }
    Ok(parts.join(&ID_SEPARATOR.to_string()))
}

/// Split a legacy-encoded id list. Whitespace around entries is trimmed and
/// empty entries are dropped.
pub fn decode_ids(encoded: &str) -> Vec<String> {
    encoded
        .split(ID_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a menu row's ingredient list into inventory ids. A token that is not
/// an integer is logged and skipped, never fatal.
pub fn parse_ingredient_ids(encoded: &str) -> Vec<i32> {
    decode_ids(encoded)
        .into_iter()
        .filter_map(|token| match token.parse::<i32>() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("Skipping malformed ingredient id token '{}'", token);
                None
            }
        })
        .collect()
}

/// Strict variant for validating incoming ingredient lists before they are
/// written to the catalog: any malformed token is an error, not a skip.
pub fn parse_ingredient_ids_strict(encoded: &str) -> Result<Vec<i32>, EncodingError> {
    decode_ids(encoded)
        .into_iter()
        .map(|token| {
            token
                .parse::<i32>()
                .map_err(|_| EncodingError::MalformedToken(token))
        })
        .collect()
}
