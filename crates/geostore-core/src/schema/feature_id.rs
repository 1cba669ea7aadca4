use crate::{Error, Result, Value};

use url::form_urlencoded;

/// Opaque feature identifier of the form `<type>.<key>`.
///
/// Composite keys join their url-encoded parts with `&`. Rows of tables
/// without a primary key get volatile identifiers of the form
/// `<type>.fid-<uuid>` that only hold for the read that produced them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(String);

impl FeatureId {
    pub fn new(type_name: &str, key: &[Value]) -> FeatureId {
        let mut id = format!("{type_name}.");
        for (i, part) in key.iter().enumerate() {
            if i > 0 {
                id.push('&');
            }
            let text = part.to_text().unwrap_or_default();
            id.extend(form_urlencoded::byte_serialize(text.as_bytes()));
        }
        FeatureId(id)
    }

    pub fn volatile(type_name: &str) -> FeatureId {
        FeatureId(format!("{type_name}.fid-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_volatile(&self) -> bool {
        self.0.contains(".fid-")
    }

    /// Splits the identifier into its decoded key parts, checking that it
    /// belongs to `type_name`.
    pub fn key_parts(&self, type_name: &str) -> Result<Vec<String>> {
        let key = self
            .0
            .strip_prefix(type_name)
            .and_then(|rest| rest.strip_prefix('.'))
            .ok_or_else(|| {
                Error::validation(format!("feature id `{}` does not belong to `{type_name}`", self.0))
            })?;

        Ok(key.split('&').map(decode).collect())
    }
}

fn decode(part: &str) -> String {
    form_urlencoded::parse(part.as_bytes())
        .next()
        .map(|(decoded, _)| decoded.into_owned())
        .unwrap_or_default()
}

impl From<&str> for FeatureId {
    fn from(value: &str) -> FeatureId {
        FeatureId(value.to_string())
    }
}

impl From<String> for FeatureId {
    fn from(value: String) -> FeatureId {
        FeatureId(value)
    }
}

impl core::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
