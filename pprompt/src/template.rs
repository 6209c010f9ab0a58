//! `{{name}}` placeholder rendering.
//!
//! A single hand-rolled scan: no escapes, no nesting, no conditionals.
//! Placeholder names are trimmed, so `{{ input }}` and `{{input}}` are the
//! same variable.

use std::collections::BTreeMap;

use crate::TemplateError;

pub type TemplateVars = BTreeMap<String, String>;

pub fn render(template: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        output.push_str(&rest[..open]);
        rest = &rest[open + 2..];

        let Some(close) = rest.find("}}") else {
            return Err(TemplateError::unterminated_placeholder());
        };

        let name = rest[..close].trim();
        let value = vars
            .get(name)
            .ok_or_else(|| TemplateError::missing_variable(name))?;
        output.push_str(value);
        rest = &rest[close + 2..];
    }

    output.push_str(rest);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> TemplateVars {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn renders_plain_text_unchanged() {
        let rendered = render("no placeholders here", &TemplateVars::new())
            .expect("plain text renders");
        assert_eq!(rendered, "no placeholders here");
    }

    #[test]
    fn substitutes_supplied_variables() {
        let rendered = render(
            "Summarize {{input}} for {{audience}}.",
            &vars(&[("input", "the report"), ("audience", "executives")]),
        )
        .expect("template renders");
        assert_eq!(rendered, "Summarize the report for executives.");
    }

    #[test]
    fn placeholder_names_are_trimmed() {
        let rendered =
            render("{{ input }}", &vars(&[("input", "hello")])).expect("template renders");
        assert_eq!(rendered, "hello");
    }

    #[test]
    fn missing_variable_names_the_placeholder() {
        let err = render("{{input}} and {{missing}}", &vars(&[("input", "x")]))
            .expect_err("missing variable must fail");
        assert_eq!(err.variable.as_deref(), Some("missing"));
    }

    #[test]
    fn unterminated_placeholder_is_an_error() {
        let err = render("broken {{input", &vars(&[("input", "x")]))
            .expect_err("unterminated placeholder must fail");
        assert_eq!(err.variable, None);
    }

    #[test]
    fn repeated_placeholders_render_each_occurrence() {
        let rendered = render("{{word}} {{word}}", &vars(&[("word", "twice")]))
            .expect("template renders");
        assert_eq!(rendered, "twice twice");
    }
}
