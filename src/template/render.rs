//! Post preview rendering.
//!
//! Rendering runs in three steps:
//!
//! 1. Build the value of every registered variable. Values are trimmed; the
//!    `overview` value is reflowed into a Markdown blockquote and, when an
//!    `instruction` binding is present, followed by the installation
//!    instructions list. Empty values fall back to the literal `[name]` so
//!    unfilled fields stay visible.
//! 2. Substitute `[name]` tokens in the template body.
//! 3. Strip every remaining `[instruction]` marker.
//!
//! Rendering is pure and cannot fail; it runs on every edit.

use crate::variable::{Bindings, VariableDefinition};

use super::substitution::{substitute_tokens, SubstitutionMode};
use super::types::Template;

/// Variable whose value is reflowed as a blockquote
pub const OVERVIEW_VARIABLE: &str = "overview";

/// Binding holding installation instructions, one step per line
pub const INSTRUCTION_VARIABLE: &str = "instruction";

/// Marker consumed by instruction injection and stripped afterwards
pub const INSTRUCTION_MARKER: &str = "[instruction]";

/// Heading placed before the instruction list
pub const INSTRUCTIONS_HEADING: &str = "\n\n**Instructions d'installation :**\n";

/// Render a template with the default single-pass substitution
pub fn render(
    template: &Template,
    variables: &[VariableDefinition],
    bindings: &Bindings,
) -> String {
    render_with_mode(template, variables, bindings, SubstitutionMode::SinglePass)
}

/// Render a template with an explicit substitution mode
pub fn render_with_mode(
    template: &Template,
    variables: &[VariableDefinition],
    bindings: &Bindings,
    mode: SubstitutionMode,
) -> String {
    let values = token_values(variables, bindings);
    let content = substitute_tokens(&template.body, &values, mode);
    content.replace(INSTRUCTION_MARKER, "")
}

/// Compute the substitution value of every variable, in registry order.
pub fn token_values(
    variables: &[VariableDefinition],
    bindings: &Bindings,
) -> Vec<(String, String)> {
    let instruction = bindings.get(INSTRUCTION_VARIABLE);

    variables
        .iter()
        .map(|var| {
            let raw = bindings.get(&var.name).trim();
            let value = if raw.is_empty() {
                var.token()
            } else if is_overview(&var.name) {
                overview_value(raw, instruction)
            } else {
                raw.to_string()
            };
            (var.name.clone(), value)
        })
        .collect()
}

fn is_overview(name: &str) -> bool {
    name.eq_ignore_ascii_case(OVERVIEW_VARIABLE)
}

/// Reflow the overview as blockquote continuation lines, then append the
/// instruction block if any.
pub fn overview_value(overview: &str, instruction: &str) -> String {
    let mut value = quote_reflow(overview);
    if let Some(block) = instruction_block(instruction) {
        value.push_str(&block);
    }
    value
}

/// Join the trimmed, non-empty lines of `text` with `"\n> "`.
///
/// The template is expected to prefix the first line with `"> "` itself.
pub fn quote_reflow(text: &str) -> String {
    non_empty_lines(text).collect::<Vec<_>>().join("\n> ")
}

/// The heading plus one `* step` line per non-empty instruction line,
/// or `None` when there are no instructions.
pub fn instruction_block(instruction: &str) -> Option<String> {
    let steps: Vec<String> = non_empty_lines(instruction)
        .map(|line| format!("* {}", line))
        .collect();

    if steps.is_empty() {
        return None;
    }

    Some(format!("{}{}", INSTRUCTIONS_HEADING, steps.join("\n")))
}

fn non_empty_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(str::trim).filter(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateKind;
    use crate::variable::VariableKind;

    fn template(body: &str) -> Template {
        Template::new("t", "Test", TemplateKind::My, body)
    }

    fn vars(names: &[&str]) -> Vec<VariableDefinition> {
        names
            .iter()
            .map(|n| VariableDefinition::new(*n, *n))
            .collect()
    }

    fn bindings(pairs: &[(&str, &str)]) -> Bindings {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_full_substitution() {
        let out = render(
            &template("[a]-[b]"),
            &vars(&["a", "b"]),
            &bindings(&[("a", "X"), ("b", "Y")]),
        );
        assert_eq!(out, "X-Y");
    }

    #[test]
    fn test_empty_value_keeps_placeholder() {
        let out = render(
            &template("Title: [a] / [b]"),
            &vars(&["a", "b"]),
            &bindings(&[("a", "   ")]),
        );
        assert_eq!(out, "Title: [a] / [b]");
    }

    #[test]
    fn test_values_trimmed() {
        let out = render(&template("<[a]>"), &vars(&["a"]), &bindings(&[("a", "  X \n")]));
        assert_eq!(out, "<X>");
    }

    #[test]
    fn test_quote_reflow() {
        assert_eq!(quote_reflow("line1\nline2\n\nline3"), "line1\n> line2\n> line3");
        assert_eq!(quote_reflow("  only  "), "only");
        assert_eq!(quote_reflow("\r\n"), "");
    }

    #[test]
    fn test_overview_reflowed_in_render() {
        let out = render(
            &template("> [overview]"),
            &vars(&["overview"]),
            &bindings(&[("overview", "line1\nline2\n\nline3")]),
        );
        assert_eq!(out, "> line1\n> line2\n> line3");
    }

    #[test]
    fn test_capitalized_overview_reflowed() {
        let out = render(
            &template("> [Overview]"),
            &vars(&["Overview"]),
            &bindings(&[("Overview", "a\nb")]),
        );
        assert_eq!(out, "> a\n> b");
    }

    #[test]
    fn test_other_multiline_not_reflowed() {
        let variables =
            vec![VariableDefinition::new("notes", "Notes").with_kind(VariableKind::MultiLine)];
        let out = render(&template("[notes]"), &variables, &bindings(&[("notes", "a\nb")]));
        assert_eq!(out, "a\nb");
    }

    #[test]
    fn test_instruction_injection() {
        let value = overview_value("Desc", "step1\nstep2");
        assert!(value.ends_with("\n\n**Instructions d'installation :**\n* step1\n* step2"));
        assert!(value.starts_with("Desc"));
    }

    #[test]
    fn test_blank_instruction_not_injected() {
        assert_eq!(overview_value("Desc", " \n \n"), "Desc");
        assert!(instruction_block("").is_none());
    }

    #[test]
    fn test_instruction_needs_overview() {
        let out = render(
            &template("[overview][instruction]"),
            &vars(&["overview"]),
            &bindings(&[("instruction", "step1")]),
        );
        assert_eq!(out, "[overview]");
    }

    #[test]
    fn test_instruction_marker_stripped() {
        let out = render(
            &template("before\n[instruction]\nafter [instruction]"),
            &vars(&[]),
            &Bindings::new(),
        );
        assert_eq!(out, "before\n\nafter ");
        assert!(!out.contains(INSTRUCTION_MARKER));
    }

    #[test]
    fn test_end_to_end_scenario() {
        let out = render(
            &template("## [Name_game]\n> [overview][instruction]"),
            &vars(&["Name_game", "overview"]),
            &bindings(&[
                ("Name_game", "Lost Solace"),
                ("overview", "A hero.\nA quest."),
                ("instruction", "Download.\nExtract."),
            ]),
        );
        assert_eq!(
            out,
            "## Lost Solace\n> A hero.\n> A quest.\n\n**Instructions d'installation :**\n* Download.\n* Extract."
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let t = template("[a] [overview] [instruction] [b]");
        let v = vars(&["b", "overview", "a"]);
        let b = bindings(&[("a", "1"), ("overview", "x\ny"), ("instruction", "go")]);
        assert_eq!(render(&t, &v, &b), render(&t, &v, &b));
    }

    #[test]
    fn test_registry_order_irrelevant_for_distinct_names() {
        let t = template("[a] [b] [c]");
        let b = bindings(&[("a", "1"), ("b", "2"), ("c", "3")]);
        assert_eq!(
            render(&t, &vars(&["a", "b", "c"]), &b),
            render(&t, &vars(&["c", "a", "b"]), &b)
        );
    }

    #[test]
    fn test_value_containing_token_not_resubstituted() {
        let t = template("[a] [b]");
        let v = vars(&["a", "b"]);
        let b = bindings(&[("a", "see [b]"), ("b", "B")]);

        assert_eq!(render(&t, &v, &b), "see [b] B");
        assert_eq!(
            render_with_mode(&t, &v, &b, SubstitutionMode::Sequential),
            "see B B"
        );
    }

    #[test]
    fn test_empty_template() {
        assert_eq!(render(&template(""), &vars(&["a"]), &Bindings::new()), "");
    }

    #[test]
    fn test_unregistered_binding_ignored() {
        let out = render(&template("[ghost]"), &vars(&[]), &bindings(&[("ghost", "boo")]));
        assert_eq!(out, "[ghost]");
    }
}
