//! Lenient `{{token}}` template rendering for campaign messages.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("placeholder regex is valid"));

/// Replace `{{token}}` placeholders with values from `vars`.
///
/// Unknown tokens are left verbatim so a typo'd template still delivers the
/// rest of the message instead of failing the whole send.
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => {
                tracing::debug!(token = &caps[1], "Unknown template placeholder left verbatim");
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// Build the standard recipient variable map from profile attributes.
pub fn recipient_vars(
    full_name: &str,
    email: &str,
    branch: &str,
    cgpa: Option<f64>,
) -> HashMap<String, String> {
    HashMap::from([
        ("student_name".to_string(), full_name.to_string()),
        ("email".to_string(), email.to_string()),
        ("branch".to_string(), branch.to_string()),
        (
            "cgpa".to_string(),
            cgpa.map(|c| c.to_string()).unwrap_or_default(),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_known_tokens() {
        let out = render(
            "Dear {{student_name}}, your branch is {{branch}}.",
            &vars(&[("student_name", "Asha Rao"), ("branch", "CSE")]),
        );
        assert_eq!(out, "Dear Asha Rao, your branch is CSE.");
    }

    #[test]
    fn test_unknown_tokens_left_verbatim() {
        let out = render("Hello {{student_name}}, see {{venue}}.", &vars(&[("student_name", "A")]));
        assert_eq!(out, "Hello A, see {{venue}}.");
    }

    #[test]
    fn test_whitespace_inside_braces() {
        let out = render("Hi {{ student_name }}!", &vars(&[("student_name", "B")]));
        assert_eq!(out, "Hi B!");
    }

    #[test]
    fn test_no_placeholders_is_identity() {
        let out = render("Plain message.", &HashMap::new());
        assert_eq!(out, "Plain message.");
    }

    #[test]
    fn test_recipient_vars_missing_cgpa_is_empty() {
        let v = recipient_vars("A", "a@x.edu", "IT", None);
        assert_eq!(v.get("cgpa").unwrap(), "");
        let v = recipient_vars("A", "a@x.edu", "IT", Some(8.5));
        assert_eq!(v.get("cgpa").unwrap(), "8.5");
    }
}
