use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The decline-analysis methods that contribute to a comprehensive EUR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeclineMethod {
    Fetkovich,
    Blasingame,
    #[serde(rename = "NPI", alias = "Npi")]
    Npi,
}

impl DeclineMethod {
    pub const ALL: [DeclineMethod; 3] = [
        DeclineMethod::Fetkovich,
        DeclineMethod::Blasingame,
        DeclineMethod::Npi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeclineMethod::Fetkovich => "Fetkovich",
            DeclineMethod::Blasingame => "Blasingame",
            DeclineMethod::Npi => "NPI",
        }
    }
}

impl fmt::Display for DeclineMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Method weights, keyed in a fixed order so aggregation is deterministic.
pub type MethodWeights = BTreeMap<DeclineMethod, f64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_parse_with_external_method_names() {
        let yaml = "Fetkovich: 0.3\nBlasingame: 0.5\nNPI: 0.2\n";
        let weights: MethodWeights = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(weights.len(), 3);
        assert_eq!(weights[&DeclineMethod::Npi], 0.2);
        assert_eq!(DeclineMethod::Npi.to_string(), "NPI");
    }
}
