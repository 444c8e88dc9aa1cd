//! Parameter substitution (spec §4.6): `{NAME}` placeholders in a layout's
//! `expected_command`/rule/`run` token lists, replaced from a user-supplied
//! mapping before anything else consumes the layout's strings.

use crate::error::{InTotoError, Result};

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Substitute every `{NAME}` occurrence in `template` using `params`,
/// failing with `ParameterError` if `NAME` is not in the map. A `{` not
/// immediately followed by a valid name and a matching `}` is left
/// untouched, since it is not a placeholder.
pub fn substitute(template: &str, params: &std::collections::HashMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let chars: Vec<char> = template.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '{' {
            if let Some(end) = chars[i + 1..].iter().position(|&c| c == '}') {
                let name: String = chars[i + 1..i + 1 + end].iter().collect();
                if !name.is_empty() && name.chars().all(is_name_char) {
                    let value = params
                        .get(&name)
                        .ok_or_else(|| InTotoError::ParameterError { name: name.clone() })?;
                    out.push_str(value);
                    i += end + 2;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    Ok(out)
}

/// Substitute every token in `tokens` in place, returning a new `Vec`.
pub fn substitute_all(
    tokens: &[String],
    params: &std::collections::HashMap<String, String>,
) -> Result<Vec<String>> {
    tokens.iter().map(|t| substitute(t, params)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn substitutes_known_name() {
        let mut params = HashMap::new();
        params.insert("VERSION".to_string(), "1.2.3".to_string());
        assert_eq!(substitute("release-{VERSION}.tar.gz", &params).unwrap(), "release-1.2.3.tar.gz");
    }

    #[test]
    fn missing_name_is_a_parameter_error() {
        let params = HashMap::new();
        let result = substitute("{MISSING}", &params);
        assert!(matches!(result, Err(InTotoError::ParameterError { .. })));
    }

    #[test]
    fn non_placeholder_braces_are_left_alone() {
        let params = HashMap::new();
        assert_eq!(substitute("{not a name}", &params).unwrap(), "{not a name}");
    }
}
