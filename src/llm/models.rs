//! Canonical model id handling

/// Maps canonical `vendor/name` ids onto one transport's native names.
///
/// Ids listed in `mappings` translate to their target; anything else loses
/// its vendor prefix (everything up to and including the first `/`).
#[derive(Debug, Clone, Copy)]
pub struct ModelNormalizer {
    /// Prefix of canonical ids owned by this vendor, e.g. `"openai/"`
    pub vendor_prefix: &'static str,
    /// Bare native names this transport recognizes, e.g. `"gpt-"`
    pub bare_prefixes: &'static [&'static str],
    /// Legacy or alias canonical ids and their current native name
    pub mappings: &'static [(&'static str, &'static str)],
}

impl ModelNormalizer {
    /// Whether the id follows this vendor's naming convention
    pub fn matches(&self, model: &str) -> bool {
        self.mapped(model).is_some()
            || model.starts_with(self.vendor_prefix)
            || self.bare_prefixes.iter().any(|p| model.starts_with(p))
    }

    pub fn normalize(&self, model: &str) -> String {
        match self.mapped(model) {
            Some(native) => native.to_string(),
            None => strip_vendor_prefix(model).to_string(),
        }
    }

    pub fn known_models(&self) -> Vec<String> {
        self.mappings.iter().map(|(id, _)| id.to_string()).collect()
    }

    fn mapped(&self, model: &str) -> Option<&'static str> {
        self.mappings
            .iter()
            .find(|(id, _)| *id == model)
            .map(|(_, native)| *native)
    }
}

/// `"vendor/name"` -> `"name"`; bare names pass through
pub fn strip_vendor_prefix(model: &str) -> &str {
    model.split_once('/').map_or(model, |(_, rest)| rest)
}
