// src/utils.rs
use std::collections::HashMap;

/// Replace `{{key}}` placeholders in one pass. Substituted text is never rescanned,
/// and unknown placeholders are left as-is.
pub fn render_template(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                match vars.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(key);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// First line of `text`, trimmed and cut to at most `max_chars` characters
pub fn topic_from_text(text: &str, max_chars: usize) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .chars()
        .take(max_chars)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template_replaces_known_keys() {
        let mut vars = HashMap::new();
        vars.insert("name", "Ada".to_string());
        assert_eq!(render_template("Hi {{name}}!", &vars), "Hi Ada!");
    }

    #[test]
    fn test_render_template_does_not_rescan_values() {
        let mut vars = HashMap::new();
        vars.insert("a", "{{b}}".to_string());
        vars.insert("b", "oops".to_string());
        assert_eq!(render_template("<{{a}}>", &vars), "<{{b}}>");
    }

    #[test]
    fn test_render_template_keeps_unknown_and_unterminated() {
        let vars = HashMap::new();
        assert_eq!(render_template("x {{missing}} y", &vars), "x {{missing}} y");
        assert_eq!(render_template("open {{ end", &vars), "open {{ end");
    }

    #[test]
    fn test_topic_from_text() {
        assert_eq!(topic_from_text("\n  First line \nsecond", 200), "First line");
        assert_eq!(topic_from_text("abcdef", 3), "abc");
        assert_eq!(topic_from_text("   ", 10), "");
    }
}
