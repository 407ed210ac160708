//! Entity resolution: rewrite answer terms using `keyword:replacement` rules.

use std::collections::HashMap;

use docgrid_core::{Rule, RuleType};
use regex::Regex;
use tracing::{debug, warn};

use crate::types::AnswerValue;

/// Before/after record of one resolution pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    pub original: AnswerValue,
    pub resolved: AnswerValue,
}

impl Transformation {
    pub fn changed(&self) -> bool {
        self.original != self.resolved
    }
}

/// Single-pass keyword substitution built from `resolve_entity` rules.
#[derive(Debug, Clone)]
pub struct EntityResolver {
    replacements: HashMap<String, String>,
    pattern: Option<Regex>,
}

impl EntityResolver {
    pub fn from_rules(rules: &[Rule]) -> Self {
        let mut replacements: HashMap<String, String> = HashMap::new();
        for rule in rules.iter().filter(|r| r.rule_type == RuleType::ResolveEntity) {
            for option in &rule.options {
                match option.split_once(':') {
                    Some((keyword, replacement)) if !keyword.trim().is_empty() => {
                        replacements.insert(keyword.trim().to_string(), replacement.trim().to_string());
                    }
                    _ => debug!("Skipping malformed resolve_entity option: {:?}", option),
                }
            }
        }

        // Replacement phrases match themselves so resolved text stays fixed.
        let targets: Vec<String> = replacements.values().cloned().collect();
        for target in targets {
            if !target.is_empty() {
                replacements.entry(target.clone()).or_insert(target);
            }
        }

        let pattern = if replacements.is_empty() {
            None
        } else {
            let mut keys: Vec<&String> = replacements.keys().collect();
            keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
            let alternation = keys
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            match Regex::new(&format!(r"\b(?:{})\b", alternation)) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Could not build entity pattern: {}", e);
                    None
                }
            }
        };

        Self {
            replacements,
            pattern,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
    }

    fn resolve_text(&self, text: &str) -> String {
        match &self.pattern {
            Some(re) => re
                .replace_all(text, |caps: &regex::Captures<'_>| {
                    let found = &caps[0];
                    self.replacements
                        .get(found)
                        .cloned()
                        .unwrap_or_else(|| found.to_string())
                })
                .into_owned(),
            None => text.to_string(),
        }
    }

    /// Resolve a textual answer. Other answer kinds pass through untouched.
    pub fn resolve(&self, answer: &AnswerValue) -> (AnswerValue, Transformation) {
        let resolved = match answer {
            AnswerValue::Str(s) => AnswerValue::Str(self.resolve_text(s)),
            AnswerValue::StrArray(items) => {
                AnswerValue::StrArray(items.iter().map(|s| self.resolve_text(s)).collect())
            }
            other => other.clone(),
        };
        let transformation = Transformation {
            original: answer.clone(),
            resolved: resolved.clone(),
        };
        (resolved, transformation)
    }
}
