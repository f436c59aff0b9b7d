//! Profiles: named, ordered sets of feature descriptors.

use std::collections::HashMap;

use crate::feature::Feature;

/// A named collection of features.
///
/// Feature lookup is O(1) through a `HashMap`. Profiles are assembled at
/// endpoint construction and never mutated during request processing.
#[derive(Debug)]
pub struct Profile {
    name: String,
    features: HashMap<String, Feature>,
}

impl Profile {
    pub fn new(name: impl Into<String>, features: Vec<Feature>) -> Self {
        let mut map = HashMap::with_capacity(features.len());
        for feature in features {
            map.insert(feature.name().to_string(), feature);
        }
        Self {
            name: name.into(),
            features: map,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this profile registers a feature for `action`.
    ///
    /// Tolerates arbitrary and empty strings; an unknown action is simply
    /// `false`.
    pub fn supports(&self, action: &str) -> bool {
        self.features.contains_key(action)
    }

    pub fn feature(&self, action: &str) -> Option<&Feature> {
        self.features.get(action)
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{mock_profile, MOCK_FEATURE_NAME};

    #[test]
    fn feature_lookup() {
        let profile = mock_profile();
        assert!(profile.supports(MOCK_FEATURE_NAME));
        assert_eq!(
            profile.feature(MOCK_FEATURE_NAME).unwrap().name(),
            MOCK_FEATURE_NAME
        );
    }

    #[test]
    fn unknown_action_is_not_found() {
        let profile = mock_profile();
        assert!(!profile.supports("NoSuchAction"));
        assert!(profile.feature("").is_none());
        assert!(profile.feature("\u{0}weird\u{ffff}").is_none());
    }
}
