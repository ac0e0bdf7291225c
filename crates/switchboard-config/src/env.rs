use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Placeholder syntax: `{{ env.VAR }}` or `{{ env.VAR | default("fallback") }}`
fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([A-Za-z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
            .expect("placeholder pattern is valid")
    })
}

/// Substitute environment placeholders in raw TOML text
///
/// Runs before deserialization so config structs only ever see plain
/// strings. Comment lines are copied through untouched, which lets a
/// disabled entry reference a variable that is not set.
pub fn expand_env(input: &str) -> Result<String, String> {
    let mut lines = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_owned());
            continue;
        }

        let mut failure = None;
        let expanded = placeholder().replace_all(line, |caps: &Captures<'_>| {
            match substitute(&caps[1], caps.get(2).map(|m| m.as_str())) {
                Ok(value) => value,
                Err(e) => {
                    failure.get_or_insert(e);
                    String::new()
                }
            }
        });

        if let Some(e) = failure {
            return Err(e);
        }
        lines.push(expanded.into_owned());
    }

    let mut output = lines.join("\n");
    if input.ends_with('\n') {
        output.push('\n');
    }
    Ok(output)
}

fn substitute(key: &str, default: Option<&str>) -> Result<String, String> {
    let Some(var) = key.strip_prefix("env.").filter(|v| !v.is_empty() && !v.contains('.')) else {
        return Err(format!("only variables scoped with 'env.' are supported: `{key}`"));
    };

    match (std::env::var(var), default) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(fallback)) => Ok(fallback.to_owned()),
        (Err(_), None) => Err(format!("environment variable not found: `{var}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let input = "[retry]\nmax_attempts = 3\n";
        assert_eq!(expand_env(input).unwrap(), input);
    }

    #[test]
    fn substitutes_credentials() {
        temp_env::with_var("SB_OPENAI_KEY", Some("sk-test"), || {
            let out = expand_env("openai = \"{{ env.SB_OPENAI_KEY }}\"").unwrap();
            assert_eq!(out, "openai = \"sk-test\"");
        });
    }

    #[test]
    fn substitutes_several_on_one_line() {
        temp_env::with_vars([("SB_A", Some("a")), ("SB_B", Some("b"))], || {
            let out = expand_env("x = \"{{ env.SB_A }}-{{env.SB_B}}\"").unwrap();
            assert_eq!(out, "x = \"a-b\"");
        });
    }

    #[test]
    fn missing_variable_is_an_error() {
        temp_env::with_var_unset("SB_MISSING", || {
            let err = expand_env("key = \"{{ env.SB_MISSING }}\"").unwrap_err();
            assert!(err.contains("SB_MISSING"));
        });
    }

    #[test]
    fn default_applies_only_when_unset() {
        temp_env::with_var_unset("SB_OPTIONAL", || {
            let out = expand_env("k = \"{{ env.SB_OPTIONAL | default(\"none\") }}\"").unwrap();
            assert_eq!(out, "k = \"none\"");
        });
        temp_env::with_var("SB_OPTIONAL", Some("set"), || {
            let out = expand_env("k = \"{{ env.SB_OPTIONAL | default(\"none\") }}\"").unwrap();
            assert_eq!(out, "k = \"set\"");
        });
    }

    #[test]
    fn rejects_other_scopes() {
        let err = expand_env("k = \"{{ secrets.TOKEN }}\"").unwrap_err();
        assert!(err.contains("only variables scoped with 'env.'"));
    }

    #[test]
    fn comment_lines_are_not_expanded() {
        temp_env::with_var_unset("SB_COMMENTED", || {
            let input = "  # token = \"{{ env.SB_COMMENTED }}\"\nx = 1";
            assert_eq!(expand_env(input).unwrap(), input);
        });
    }
}
