//! Variable substitution engine for templates

use std::collections::HashMap;

/// How `[name]` tokens are replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubstitutionMode {
    /// One left-to-right scan resolving every token against the value map.
    /// Inserted values are never scanned again.
    #[default]
    SinglePass,
    /// One full replace per variable, in the given order. A value that
    /// contains a later variable's token gets that token replaced too.
    Sequential,
}

/// Substitute `[name]` tokens in `body` with their values.
///
/// Tokens with no entry in `values` are copied through unchanged.
pub fn substitute_tokens(
    body: &str,
    values: &[(String, String)],
    mode: SubstitutionMode,
) -> String {
    match mode {
        SubstitutionMode::SinglePass => substitute_single_pass(body, values),
        SubstitutionMode::Sequential => substitute_sequential(body, values),
    }
}

fn substitute_single_pass(body: &str, values: &[(String, String)]) -> String {
    let mut lookup: HashMap<&str, &str> = HashMap::with_capacity(values.len());
    for (name, value) in values {
        lookup.entry(name.as_str()).or_insert(value.as_str());
    }

    let mut result = String::with_capacity(body.len());
    let mut rest = body;

    while let Some(open) = rest.find('[') {
        result.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        let replacement = after_open.find(']').and_then(|close| {
            let name = &after_open[..close];
            lookup.get(name).map(|value| (*value, close))
        });

        match replacement {
            Some((value, close)) => {
                result.push_str(value);
                rest = &after_open[close + 1..];
            }
            None => {
                result.push('[');
                rest = after_open;
            }
        }
    }

    result.push_str(rest);
    result
}

fn substitute_sequential(body: &str, values: &[(String, String)]) -> String {
    values.iter().fold(body.to_string(), |content, (name, value)| {
        content.replace(&format!("[{}]", name), value)
    })
}

/// List the distinct bracketed tokens of `body`, in first-seen order.
///
/// Markdown link text such as `[Download here]` is reported too; callers
/// filter against the registry when they need only variables.
pub fn placeholders(body: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut rest = body;

    while let Some(open) = rest.find('[') {
        let after_open = &rest[open + 1..];
        match after_open.find(['[', ']']) {
            Some(close) if after_open[close..].starts_with(']') => {
                let name = &after_open[..close];
                if !name.is_empty() && !name.contains('\n') && !found.iter().any(|f| f == name) {
                    found.push(name.to_string());
                }
                rest = &after_open[close + 1..];
            }
            Some(next_open) => rest = &after_open[next_open..],
            None => break,
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute_simple() {
        let result = substitute_tokens(
            "[a]-[b]",
            &values(&[("a", "X"), ("b", "Y")]),
            SubstitutionMode::SinglePass,
        );
        assert_eq!(result, "X-Y");
    }

    #[test]
    fn test_substitute_repeated_token() {
        let result = substitute_tokens(
            "[a] and [a]",
            &values(&[("a", "X")]),
            SubstitutionMode::SinglePass,
        );
        assert_eq!(result, "X and X");
    }

    #[test]
    fn test_unknown_tokens_untouched() {
        let body = "[Accès au jeu original]([game_link]) [unclosed";
        let result = substitute_tokens(
            body,
            &values(&[("game_link", "https://x")]),
            SubstitutionMode::SinglePass,
        );
        assert_eq!(result, "[Accès au jeu original](https://x) [unclosed");
    }

    #[test]
    fn test_nested_open_bracket() {
        let result =
            substitute_tokens("[[a]]", &values(&[("a", "X")]), SubstitutionMode::SinglePass);
        assert_eq!(result, "[X]");
    }

    #[test]
    fn test_single_pass_does_not_rescan_values() {
        let vars = values(&[("a", "[b]"), ("b", "Y")]);
        assert_eq!(
            substitute_tokens("[a] [b]", &vars, SubstitutionMode::SinglePass),
            "[b] Y"
        );
    }

    #[test]
    fn test_sequential_rescans_later_tokens() {
        let vars = values(&[("a", "[b]"), ("b", "Y")]);
        assert_eq!(
            substitute_tokens("[a] [b]", &vars, SubstitutionMode::Sequential),
            "Y Y"
        );
    }

    #[test]
    fn test_modes_agree_without_overlap() {
        let vars = values(&[("name", "Lost Solace"), ("version", "v1")]);
        let body = "## [name] ([version]) [name]";
        assert_eq!(
            substitute_tokens(body, &vars, SubstitutionMode::SinglePass),
            substitute_tokens(body, &vars, SubstitutionMode::Sequential)
        );
    }

    #[test]
    fn test_multibyte_text_preserved() {
        let result = substitute_tokens(
            "Été: [a] — fin",
            &values(&[("a", "ok")]),
            SubstitutionMode::SinglePass,
        );
        assert_eq!(result, "Été: ok — fin");
    }

    #[test]
    fn test_placeholders() {
        let found = placeholders("[a] [b]([a]) [[c]] [] [open");
        assert_eq!(found, vec!["a", "b", "c"]);
    }
}
