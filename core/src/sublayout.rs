//! Sublayout recursion (spec §4.9): a retained link slot that is itself a
//! `layout` payload is treated as a nested supply chain rather than a leaf
//! link.

use crate::model::{Layout, Link, Payload};

/// Directory name a sublayout's own link files live under, composing for
/// nested sublayouts (spec §6: `<step_name>.<keyid[:8]>/`).
pub fn sublayout_link_dir(step_name: &str, keyid: &str) -> String {
    let prefix: String = keyid.chars().take(8).collect();
    format!("{step_name}.{prefix}")
}

/// Build the one-key `{keyid: key}` map a sublayout verification call is
/// authorized against (spec §4.9 step 1): only the key whose signature
/// slot produced this sublayout is carried down.
pub fn sublayout_verification_keys(
    outer_layout: &Layout,
    signing_keyid: &str,
) -> std::collections::HashMap<String, crate::model::PublicKey> {
    let mut map = std::collections::HashMap::new();
    if let Some(key) = outer_layout.resolve_key(signing_keyid) {
        map.insert(signing_keyid.to_string(), key.clone());
    }
    map
}

/// Build the summary link a sublayout's own verification run collapses to
/// (spec §4.9 step 4): materials from the sublayout's first step, products/
/// command/byproducts from its last, or an entirely empty link if the
/// sublayout declares no steps.
pub fn summarize(name: &str, sublayout: &Layout, step_links: &[&Link]) -> Link {
    if sublayout.steps.is_empty() || step_links.is_empty() {
        return Link::empty(name.to_string());
    }

    let first = step_links[0];
    let last = step_links[step_links.len() - 1];

    let mut summary = Link::new(name.to_string());
    summary.materials = first.materials.clone();
    summary.products = last.products.clone();
    summary.command = last.command.clone();
    summary.byproducts = last.byproducts.clone();
    summary
}

/// True if a retained link slot is actually a nested layout rather than a
/// plain link (spec §4.9 preamble).
pub fn is_sublayout(payload: &Payload) -> bool {
    matches!(payload, Payload::Layout(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_dir_uses_first_eight_hex_chars() {
        assert_eq!(
            sublayout_link_dir("build", "deadbeefcafef00d"),
            "build.deadbeef"
        );
    }

    #[test]
    fn summary_is_empty_for_stepless_sublayout() {
        let sublayout = Layout {
            type_: "layout".to_string(),
            expires: "2099-01-01T00:00:00Z".to_string(),
            readme: String::new(),
            keys: std::collections::HashMap::new(),
            steps: Vec::new(),
            inspect: Vec::new(),
        };
        let summary = summarize("nested", &sublayout, &[]);
        assert!(summary.materials.is_empty());
        assert!(summary.products.is_empty());
    }

    #[test]
    fn summary_takes_materials_from_first_and_products_from_last() {
        let sublayout = Layout {
            type_: "layout".to_string(),
            expires: "2099-01-01T00:00:00Z".to_string(),
            readme: String::new(),
            keys: std::collections::HashMap::new(),
            steps: vec![
                crate::model::Step::new("a"),
                crate::model::Step::new("b"),
            ],
            inspect: Vec::new(),
        };

        let mut first = Link::new("a");
        first
            .materials
            .insert("in.txt".to_string(), [("sha256".to_string(), "aaa".to_string())].into());
        let mut last = Link::new("b");
        last.products
            .insert("out.txt".to_string(), [("sha256".to_string(), "bbb".to_string())].into());

        let summary = summarize("nested", &sublayout, &[&first, &last]);
        assert!(summary.materials.contains_key("in.txt"));
        assert!(summary.products.contains_key("out.txt"));
    }
}
