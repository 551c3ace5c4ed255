//! Case-insensitive header map handed to the pipeline by framework adapters.

use std::collections::HashMap;

/// Request headers as received alongside a webhook body
///
/// Names are matched case-insensitively. A header that arrived more than once
/// keeps every value in arrival order, and lookups return the first one.
///
/// # Example
///
/// ```rust,ignore
/// use tideway_webhooks::webhooks::WebhookHeaders;
///
/// let mut headers = WebhookHeaders::new();
/// headers.insert("X-Paystack-Signature", "ab12...");
/// assert_eq!(headers.get("x-paystack-signature"), Some("ab12..."));
///
/// // Or straight from an axum/hyper request
/// let headers = WebhookHeaders::from(request.headers());
/// ```
#[derive(Debug, Clone, Default)]
pub struct WebhookHeaders {
    values: HashMap<String, Vec<String>>,
}

impl WebhookHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing any previous values
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.values
            .insert(name.as_ref().to_ascii_lowercase(), vec![value.into()]);
    }

    /// Add another value for a repeated header
    pub fn append(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.values
            .entry(name.as_ref().to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// First value of the named header
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of the named header, in arrival order
    pub fn get_all(&self, name: &str) -> &[String] {
        self.values
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for WebhookHeaders
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

impl From<&http::HeaderMap> for WebhookHeaders {
    /// Values that are not visible ASCII are skipped; signatures never contain them.
    fn from(map: &http::HeaderMap) -> Self {
        let mut headers = Self::new();
        for (name, value) in map {
            match value.to_str() {
                Ok(value) => headers.append(name.as_str(), value),
                Err(_) => {
                    tracing::debug!(header = %name, "Skipping non-ASCII header value");
                }
            }
        }
        headers
    }
}
