/// Maps capability names used in requests to positions in node feature
/// vectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureCatalog {
    names: Vec<String>,
}

impl FeatureCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_positional(&self) -> bool {
        self.names.is_empty()
    }

    /// Without configured names, `"3"`, `"f3"` and `"feature_3"` all resolve
    /// to position 3.
    pub fn resolve(&self, capability: &str) -> Option<usize> {
        let capability = capability.trim();
        if !self.names.is_empty() {
            return self.names.iter().position(|name| name == capability);
        }
        let digits = capability
            .strip_prefix("feature_")
            .or_else(|| capability.strip_prefix('f'))
            .unwrap_or(capability);
        digits.parse::<usize>().ok()
    }
}
