// meridian-core/src/domain/model/contract.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::meta::ObjectMeta;

/// Named choice among contexts; a claim targets one contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    #[serde(flatten)]
    pub meta: ObjectMeta,
    pub contexts: Vec<Context>,
}

/// One branch of a contract: a match predicate, an allocation, and parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub name: String,
    #[serde(default)]
    pub predicate: Predicate,
    pub allocation: Allocation,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

/// Which service to instantiate when a context is chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub service_namespace: String,
    pub service_name: String,
}

/// A boolean expression over the merged user+claim label set.
///
/// `Predicate::Default` always matches and is how a context declares itself
/// as the fallback branch (evaluated last since contexts are tried in order).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    #[default]
    Default,
    All(Vec<LabelClause>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LabelClause {
    Equals { key: String, value: String },
    Matches { key: String, pattern: String },
}

#[derive(Debug, thiserror::Error)]
pub enum PredicateError {
    #[error("invalid regex pattern '{0}': {1}")]
    BadPattern(String, regex::Error),
}

impl Predicate {
    /// Evaluates the predicate against a merged label set. `Default` always matches;
    /// `All` matches iff every clause matches (conjunction).
    pub fn matches(&self, labels: &HashMap<String, String>) -> Result<bool, PredicateError> {
        match self {
            Predicate::Default => Ok(true),
            Predicate::All(clauses) => {
                for clause in clauses {
                    if !clause.matches(labels)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }
}

impl LabelClause {
    fn matches(&self, labels: &HashMap<String, String>) -> Result<bool, PredicateError> {
        match self {
            LabelClause::Equals { key, value } => Ok(labels.get(key).map(|v| v == value).unwrap_or(false)),
            LabelClause::Matches { key, pattern } => {
                let re = Regex::new(pattern).map_err(|e| PredicateError::BadPattern(pattern.clone(), e))?;
                Ok(labels.get(key).map(|v| re.is_match(v)).unwrap_or(false))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn default_predicate_always_matches() {
        assert!(Predicate::Default.matches(&HashMap::new()).unwrap());
    }

    #[test]
    fn equals_clause_requires_exact_value() {
        let pred = Predicate::All(vec![LabelClause::Equals { key: "env".into(), value: "prod".into() }]);
        assert!(pred.matches(&labels(&[("env", "prod")])).unwrap());
        assert!(!pred.matches(&labels(&[("env", "staging")])).unwrap());
        assert!(!pred.matches(&HashMap::new()).unwrap());
    }

    #[test]
    fn all_clauses_are_conjunctive() {
        let pred = Predicate::All(vec![
            LabelClause::Equals { key: "env".into(), value: "prod".into() },
            LabelClause::Equals { key: "region".into(), value: "eu".into() },
        ]);
        assert!(pred.matches(&labels(&[("env", "prod"), ("region", "eu")])).unwrap());
        assert!(!pred.matches(&labels(&[("env", "prod")])).unwrap());
    }

    #[test]
    fn regex_clause_matches_pattern() {
        let pred = Predicate::All(vec![LabelClause::Matches { key: "tier".into(), pattern: "^gold-.*".into() }]);
        assert!(pred.matches(&labels(&[("tier", "gold-1")])).unwrap());
        assert!(!pred.matches(&labels(&[("tier", "silver-1")])).unwrap());
    }
}
