/// Bearer token handed to the registration call.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    /// `true` when read back from the cache file instead of the token endpoint.
    pub from_cache: bool,
}

impl Token {
    pub fn cached(value: String) -> Self {
        Self { value, from_cache: true }
    }

    pub fn fresh(value: String) -> Self {
        Self { value, from_cache: false }
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("from_cache", &self.from_cache)
            .finish()
    }
}
