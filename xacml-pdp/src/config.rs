//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Where the standard environment attributes (current-time, current-date,
/// current-dateTime) come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StandardEnvAttributeSource {
    /// The PDP snapshot always wins; request-supplied values are ignored
    PdpOnly,
    /// Request-supplied values win, the PDP fills the gaps
    #[default]
    RequestElsePdp,
    /// Only request-supplied values; absent means absent
    RequestOnly,
}

/// PDP engine configuration (the bootstrap knobs of section 6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdpConfig {
    /// Maximum VariableReference nesting depth
    pub max_variable_ref_depth: usize,
    /// Maximum Policy(Set)IdReference chain depth
    pub max_policy_ref_depth: usize,
    /// Disable the XACML 5.29 any-issuer widening for issuer-less
    /// designators
    pub strict_attribute_issuer_match: bool,
    pub std_env_attribute_source: StandardEnvAttributeSource,
    /// Enable AttributeSelector evaluation (requires an XPath evaluator)
    pub xpath_enabled: bool,
    /// Per-evaluation deadline in milliseconds; exceeded mid-evaluation
    /// means Indeterminate(processing-error)
    pub evaluation_timeout_ms: Option<u64>,
    /// Record which attributes each evaluation actually consumed and
    /// surface them in the Result
    pub track_used_attributes: bool,
    /// Decision cache capacity; `None` disables caching
    pub decision_cache_capacity: Option<usize>,
}

impl Default for PdpConfig {
    fn default() -> Self {
        Self {
            max_variable_ref_depth: 10,
            max_policy_ref_depth: 10,
            strict_attribute_issuer_match: false,
            std_env_attribute_source: StandardEnvAttributeSource::default(),
            xpath_enabled: false,
            evaluation_timeout_ms: None,
            track_used_attributes: false,
            decision_cache_capacity: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = PdpConfig::default();
        assert_eq!(cfg.max_variable_ref_depth, 10);
        assert_eq!(cfg.max_policy_ref_depth, 10);
        assert_eq!(
            cfg.std_env_attribute_source,
            StandardEnvAttributeSource::RequestElsePdp
        );
        assert!(!cfg.xpath_enabled);
    }

    #[test]
    fn test_partial_config_deserializes_over_defaults() {
        let cfg: PdpConfig =
            serde_json::from_str(r#"{"max_policy_ref_depth": 3, "std_env_attribute_source": "PDP_ONLY"}"#)
                .unwrap();
        assert_eq!(cfg.max_policy_ref_depth, 3);
        assert_eq!(cfg.std_env_attribute_source, StandardEnvAttributeSource::PdpOnly);
        assert_eq!(cfg.max_variable_ref_depth, 10);
    }
}
