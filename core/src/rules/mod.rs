//! Rule engine (spec §4.4): the artifact-flow firewall language.
//!
//! Each rule is parsed from a tokenized `Vec<String>` (the JSON shape is a
//! flat array of strings, spec §6). Keywords are matched case-insensitively;
//! patterns and step names preserve case, mirroring
//! `original_source/in_toto/rulelib.py::unpack_rule`.

use std::collections::BTreeSet;
use std::fmt;

use globset::Glob;
use serde::{Deserialize, Serialize};

use crate::error::{InTotoError, Result};
use crate::model::link::HashDict;

/// Which artifact side (materials or products) a `MATCH ... WITH` rule
/// reaches into on the referenced step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Materials,
    Products,
}

/// A single parsed artifact rule (spec §4.4 table).
///
/// On the wire a rule is a flat JSON array of tokens (spec §6), not a
/// tagged object, so `Rule` gets hand-written `Serialize`/`Deserialize`
/// impls that go through [`parse_rule`] and a `to_tokens` inverse rather
/// than `#[derive]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Create(String),
    Delete(String),
    Modify(String),
    Allow(String),
    Disallow(String),
    Require(String),
    Match {
        pattern: String,
        src_prefix: Option<String>,
        dst_prefix: Option<String>,
        side: Side,
        step: String,
    },
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Create(p) => write!(f, "CREATE {p}"),
            Rule::Delete(p) => write!(f, "DELETE {p}"),
            Rule::Modify(p) => write!(f, "MODIFY {p}"),
            Rule::Allow(p) => write!(f, "ALLOW {p}"),
            Rule::Disallow(p) => write!(f, "DISALLOW {p}"),
            Rule::Require(p) => write!(f, "REQUIRE {p}"),
            Rule::Match {
                pattern,
                src_prefix,
                dst_prefix,
                side,
                step,
            } => {
                write!(f, "MATCH {pattern} ")?;
                if let Some(s) = src_prefix {
                    write!(f, "IN {s} ")?;
                }
                write!(f, "WITH {side:?} ")?;
                if let Some(d) = dst_prefix {
                    write!(f, "IN {d} ")?;
                }
                write!(f, "FROM {step}")
            }
        }
    }
}

impl Rule {
    /// Inverse of [`parse_rule`]: the flat token form this rule serializes
    /// to on the wire.
    pub fn to_tokens(&self) -> Vec<String> {
        match self {
            Rule::Create(p) => vec!["CREATE".into(), p.clone()],
            Rule::Delete(p) => vec!["DELETE".into(), p.clone()],
            Rule::Modify(p) => vec!["MODIFY".into(), p.clone()],
            Rule::Allow(p) => vec!["ALLOW".into(), p.clone()],
            Rule::Disallow(p) => vec!["DISALLOW".into(), p.clone()],
            Rule::Require(p) => vec!["REQUIRE".into(), p.clone()],
            Rule::Match {
                pattern,
                src_prefix,
                dst_prefix,
                side,
                step,
            } => {
                let mut tokens = vec!["MATCH".to_string(), pattern.clone()];
                if let Some(s) = src_prefix {
                    tokens.push("IN".into());
                    tokens.push(s.clone());
                }
                tokens.push("WITH".into());
                tokens.push(match side {
                    Side::Materials => "MATERIALS".into(),
                    Side::Products => "PRODUCTS".into(),
                });
                if let Some(d) = dst_prefix {
                    tokens.push("IN".into());
                    tokens.push(d.clone());
                }
                tokens.push("FROM".into());
                tokens.push(step.clone());
                tokens
            }
        }
    }
}

impl Serialize for Rule {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_tokens().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tokens = Vec::<String>::deserialize(deserializer)?;
        parse_rule(&tokens).map_err(serde::de::Error::custom)
    }
}

/// Parse one rule from its tokenized JSON array form.
pub fn parse_rule(tokens: &[String]) -> Result<Rule> {
    if tokens.is_empty() {
        return Err(InTotoError::FormatError("empty artifact rule".into()));
    }

    let keyword = tokens[0].to_uppercase();

    let single_pattern = |name: &str| -> Result<String> {
        if tokens.len() != 2 {
            return Err(InTotoError::FormatError(format!(
                "{name} rule must have exactly one pattern argument"
            )));
        }
        Ok(tokens[1].clone())
    };

    match keyword.as_str() {
        "CREATE" => Ok(Rule::Create(single_pattern("CREATE")?)),
        "DELETE" => Ok(Rule::Delete(single_pattern("DELETE")?)),
        "MODIFY" => Ok(Rule::Modify(single_pattern("MODIFY")?)),
        "ALLOW" => Ok(Rule::Allow(single_pattern("ALLOW")?)),
        "DISALLOW" => Ok(Rule::Disallow(single_pattern("DISALLOW")?)),
        "REQUIRE" => Ok(Rule::Require(single_pattern("REQUIRE")?)),
        "MATCH" => parse_match_rule(tokens),
        other => Err(InTotoError::FormatError(format!(
            "unrecognized artifact rule keyword '{other}'"
        ))),
    }
}

fn parse_match_rule(tokens: &[String]) -> Result<Rule> {
    // Valid shapes (spec §4.4):
    //   MATCH <pattern> WITH (MATERIALS|PRODUCTS) FROM <step>                         (len 6)
    //   MATCH <pattern> IN <src> WITH (...) FROM <step>                               (len 8)
    //   MATCH <pattern> WITH (...) IN <dst> FROM <step>                               (len 8)
    //   MATCH <pattern> IN <src> WITH (...) IN <dst> FROM <step>                      (len 10)
    let bad = || {
        InTotoError::FormatError(format!(
            "malformed MATCH rule: {:?}",
            tokens.join(" ")
        ))
    };

    if tokens.len() != 6 && tokens.len() != 8 && tokens.len() != 10 {
        return Err(bad());
    }

    let pattern = tokens[1].clone();
    let mut idx = 2;
    let mut src_prefix = None;

    if tokens[idx].eq_ignore_ascii_case("IN") {
        if tokens.len() == 6 {
            return Err(bad());
        }
        src_prefix = Some(tokens[idx + 1].clone());
        idx += 2;
    }

    if !tokens[idx].eq_ignore_ascii_case("WITH") {
        return Err(bad());
    }
    idx += 1;

    let side = match tokens[idx].to_uppercase().as_str() {
        "MATERIALS" => Side::Materials,
        "PRODUCTS" => Side::Products,
        _ => return Err(bad()),
    };
    idx += 1;

    let mut dst_prefix = None;
    if idx < tokens.len() && tokens[idx].eq_ignore_ascii_case("IN") {
        dst_prefix = Some(tokens[idx + 1].clone());
        idx += 2;
    }

    if idx >= tokens.len() || !tokens[idx].eq_ignore_ascii_case("FROM") {
        return Err(bad());
    }
    idx += 1;

    if idx >= tokens.len() {
        return Err(bad());
    }
    let step = tokens[idx].clone();

    Ok(Rule::Match {
        pattern,
        src_prefix,
        dst_prefix,
        side,
        step,
    })
}

/// Strip a resolver scheme prefix (`file:`, `dir:`, `ostree:`) before any
/// pattern match. The Python reference is inconsistent about when scheme
/// prefixes are stripped before rule matching; this port strips uniformly
/// for every rule kind, a deliberate simplification documented in the
/// rule-engine design notes.
pub fn strip_scheme(uri: &str) -> &str {
    for scheme in ["file:", "dir:", "ostree:"] {
        if let Some(rest) = uri.strip_prefix(scheme) {
            return rest;
        }
    }
    uri
}

fn glob_match(pattern: &str, candidate: &str) -> bool {
    Glob::new(pattern)
        .map(|g| g.compile_matcher().is_match(candidate))
        .unwrap_or(false)
}

/// One step of the trace recorded while walking a rule list, used to report
/// a `RuleVerificationError` with full context (spec §4.4).
#[derive(Debug, Clone)]
pub struct RuleTraceEntry {
    pub rule: String,
    pub queue_after: Vec<String>,
}

/// The full trace of a rule-list evaluation against one item/side, attached
/// to `InTotoError::RuleVerificationError`.
#[derive(Debug, Clone, Default)]
pub struct RuleTrace {
    pub entries: Vec<RuleTraceEntry>,
    pub materials: Vec<String>,
    pub products: Vec<String>,
}

impl fmt::Display for RuleTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "  {} -> queue: {:?}", entry.rule, entry.queue_after)?;
        }
        Ok(())
    }
}

/// The artifact sets available to a `MATCH` rule when it looks up another
/// step's materials/products.
pub struct StepArtifacts<'a> {
    pub materials: &'a std::collections::HashMap<String, HashDict>,
    pub products: &'a std::collections::HashMap<String, HashDict>,
}

/// Evaluate `rules` against `queue` (the recorded artifact keys for one
/// item/side), consuming matched items as described in spec §4.4. Returns
/// the trace; callers decide pass/fail (an explicit `DISALLOW` match or
/// unmatched `REQUIRE` raises immediately).
pub fn evaluate_rules(
    rules: &[Rule],
    side: Side,
    own_materials: &HashDictMap,
    own_products: &HashDictMap,
    mut queue: BTreeSet<String>,
    other_steps: &dyn Fn(&str) -> Option<StepArtifacts<'_>>,
) -> Result<RuleTrace> {
    let mut trace = RuleTrace {
        materials: own_materials.keys().cloned().collect(),
        products: own_products.keys().cloned().collect(),
        entries: Vec::new(),
    };

    let own_artifacts = match side {
        Side::Materials => own_materials,
        Side::Products => own_products,
    };

    for rule in rules {
        match rule {
            Rule::Create(pattern) => {
                let matched: Vec<String> = queue
                    .iter()
                    .filter(|item| {
                        glob_match(pattern, strip_scheme(item))
                            && own_products.contains_key(*item)
                            && !own_materials.contains_key(*item)
                    })
                    .cloned()
                    .collect();
                for m in matched {
                    queue.remove(&m);
                }
            }
            Rule::Allow(pattern) => {
                let matched: Vec<String> = queue
                    .iter()
                    .filter(|item| glob_match(pattern, strip_scheme(item)))
                    .cloned()
                    .collect();
                for m in matched {
                    queue.remove(&m);
                }
            }
            Rule::Delete(pattern) => {
                let matched: Vec<String> = queue
                    .iter()
                    .filter(|item| {
                        glob_match(pattern, strip_scheme(item))
                            && own_materials.contains_key(*item)
                            && !own_products.contains_key(*item)
                    })
                    .cloned()
                    .collect();
                for m in matched {
                    queue.remove(&m);
                }
            }
            Rule::Modify(pattern) => {
                let matched: Vec<String> = queue
                    .iter()
                    .filter(|item| {
                        glob_match(pattern, strip_scheme(item))
                            && match (own_materials.get(*item), own_products.get(*item)) {
                                (Some(m), Some(p)) => m != p,
                                _ => false,
                            }
                    })
                    .cloned()
                    .collect();
                for m in matched {
                    queue.remove(&m);
                }
            }
            Rule::Disallow(pattern) => {
                if let Some(hit) = queue.iter().find(|item| glob_match(pattern, strip_scheme(item))) {
                    return Err(InTotoError::RuleVerificationError {
                        item: hit.clone(),
                        side: format!("{side:?}").to_lowercase(),
                        trace: Box::new(trace),
                    });
                }
            }
            Rule::Require(filename) => {
                if !queue.iter().any(|item| item == filename) {
                    return Err(InTotoError::RuleVerificationError {
                        item: filename.clone(),
                        side: format!("{side:?}").to_lowercase(),
                        trace: Box::new(trace),
                    });
                }
            }
            Rule::Match {
                pattern,
                src_prefix,
                dst_prefix,
                side,
                step,
            } => {
                let Some(remote) = other_steps(step) else {
                    continue;
                };
                let remote_set = match side {
                    Side::Materials => remote.materials,
                    Side::Products => remote.products,
                };

                let candidates: Vec<(String, String)> = queue
                    .iter()
                    .filter_map(|item| {
                        let stripped = strip_scheme(item);
                        let candidate = match src_prefix {
                            Some(prefix) => stripped.strip_prefix(&format!("{prefix}/"))?,
                            None => stripped,
                        };
                        if glob_match(pattern, candidate) {
                            Some((item.clone(), candidate.to_string()))
                        } else {
                            None
                        }
                    })
                    .collect();

                for (src_item, candidate) in candidates {
                    let dst_key = match dst_prefix {
                        Some(prefix) => format!("{prefix}/{candidate}"),
                        None => candidate.clone(),
                    };
                    if let (Some(src_hash), Some(dst_hash)) =
                        (own_artifacts.get(&src_item), remote_set.get(&dst_key))
                    {
                        if src_hash == dst_hash {
                            queue.remove(&src_item);
                        }
                    }
                }
            }
        }

        trace.entries.push(RuleTraceEntry {
            rule: rule.to_string(),
            queue_after: queue.iter().cloned().collect(),
        });
    }

    // Implicit terminal `ALLOW *`: a non-empty remaining queue is not an
    // error unless an explicit DISALLOW rule matched above.
    Ok(trace)
}

pub type HashDictMap = std::collections::HashMap<String, HashDict>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generic_rules_case_insensitively() {
        assert_eq!(
            parse_rule(&["create".into(), "foo.py".into()]).unwrap(),
            Rule::Create("foo.py".into())
        );
        assert_eq!(
            parse_rule(&["DISALLOW".into(), "*".into()]).unwrap(),
            Rule::Disallow("*".into())
        );
    }

    #[test]
    fn parses_all_four_match_shapes() {
        let short = ["MATCH", "foo.py", "WITH", "PRODUCTS", "FROM", "write-code"]
            .map(String::from);
        assert!(matches!(parse_rule(&short).unwrap(), Rule::Match { src_prefix: None, dst_prefix: None, .. }));

        let with_src = [
            "MATCH", "foo.py", "IN", "src", "WITH", "PRODUCTS", "FROM", "write-code",
        ]
        .map(String::from);
        assert!(matches!(
            parse_rule(&with_src).unwrap(),
            Rule::Match { src_prefix: Some(_), dst_prefix: None, .. }
        ));

        let with_dst = [
            "MATCH", "foo.py", "WITH", "PRODUCTS", "IN", "dst", "FROM", "write-code",
        ]
        .map(String::from);
        assert!(matches!(
            parse_rule(&with_dst).unwrap(),
            Rule::Match { src_prefix: None, dst_prefix: Some(_), .. }
        ));

        let both = [
            "MATCH", "foo.py", "IN", "src", "WITH", "PRODUCTS", "IN", "dst", "FROM", "write-code",
        ]
        .map(String::from);
        assert!(matches!(
            parse_rule(&both).unwrap(),
            Rule::Match { src_prefix: Some(_), dst_prefix: Some(_), .. }
        ));
    }

    #[test]
    fn disallow_star_fails_on_nonempty_queue() {
        let rules = vec![Rule::Disallow("*".into())];
        let mut queue = BTreeSet::new();
        queue.insert("leftover.txt".to_string());
        let empty = HashDictMap::new();
        let result = evaluate_rules(&rules, Side::Products, &empty, &empty, queue, &|_| None);
        assert!(result.is_err());
    }

    #[test]
    fn allow_consumes_matching_items() {
        let rules = vec![Rule::Allow("*.py".into())];
        let mut queue = BTreeSet::new();
        queue.insert("foo.py".to_string());
        let empty = HashDictMap::new();
        let trace =
            evaluate_rules(&rules, Side::Products, &empty, &empty, queue, &|_| None).unwrap();
        assert!(trace.entries.last().unwrap().queue_after.is_empty());
    }
}
