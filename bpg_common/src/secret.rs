use std::{
    fmt,
    fmt::{Debug, Display},
};

/// A wrapper for API keys, signing secrets and access tokens that refuses to print its contents.
#[derive(Clone, Default)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl Secret<String> {
    /// An empty secret is treated as "not configured" by the consumers of this type.
    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }

    /// Interprets an optional string as a secret, mapping `None` and blank strings to `None`.
    pub fn from_optional(value: Option<String>) -> Option<Self> {
        value.map(Self::new).filter(|s| !s.is_empty())
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}
