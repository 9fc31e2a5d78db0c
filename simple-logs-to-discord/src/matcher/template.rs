use super::MatchResult;

/// Expand a message template for a matched line.
///
/// Supported placeholders:
/// - `{line}` - the matched (trimmed) line
/// - `{pattern}` - text of the pattern that matched
/// - `{source}` - the configured source label, e.g. `docker:myapp`
/// - `{<name>}` - any named capture of the winning pattern; captures that did
///   not participate expand to an empty string
///
/// Each placeholder is replaced literally and globally, one key at a time in
/// the order above, captures last in definition order. Text inserted by one
/// key is still visible to the keys after it but never to the keys before it.
/// Unknown `{...}` tokens are left as they are.
pub fn expand_template(template: &str, result: &MatchResult, source: &str) -> String {
    let mut message = template
        .replace("{line}", &result.line)
        .replace("{pattern}", &result.pattern)
        .replace("{source}", source);

    for (name, value) in &result.groups {
        let placeholder = format!("{{{name}}}");
        if message.contains(&placeholder) {
            message = message.replace(&placeholder, value.as_deref().unwrap_or(""));
        }
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{Pattern, match_line};

    fn result(line: &str, pattern: &str, groups: &[(&str, Option<&str>)]) -> MatchResult {
        MatchResult {
            line: line.to_string(),
            pattern: pattern.to_string(),
            groups: groups
                .iter()
                .map(|(n, v)| (n.to_string(), v.map(str::to_string)))
                .collect(),
        }
    }

    #[test]
    fn test_expand_line() {
        let r = result("test line", "test", &[]);
        assert_eq!(expand_template("{line}", &r, "source.log"), "test line");
    }

    #[test]
    fn test_expand_pattern() {
        let r = result("test", "ERROR.*", &[]);
        assert_eq!(
            expand_template("Pattern: {pattern}", &r, "source.log"),
            "Pattern: ERROR.*"
        );
    }

    #[test]
    fn test_expand_source() {
        let r = result("test", "test", &[]);
        assert_eq!(expand_template("From: {source}", &r, "app.log"), "From: app.log");
    }

    #[test]
    fn test_expand_named_groups() {
        let r = result(
            "ERROR db failed",
            "test",
            &[("level", Some("ERROR")), ("msg", Some("db failed"))],
        );
        assert_eq!(expand_template("[{level}] {msg}", &r, "source.log"), "[ERROR] db failed");
    }

    #[test]
    fn test_missing_group_expands_empty() {
        let r = result("test", "test", &[("level", None)]);
        assert_eq!(expand_template("[{level}]", &r, "source.log"), "[]");
    }

    #[test]
    fn test_repeated_placeholders_all_replaced() {
        let r = result("boom", "b", &[]);
        assert_eq!(expand_template("{line}/{line}", &r, "s"), "boom/boom");
    }

    #[test]
    fn test_unknown_placeholders_untouched() {
        let r = result("x", "x", &[("level", Some("ERROR"))]);
        assert_eq!(
            expand_template("{unknown} {level} {{line}", &r, "s"),
            "{unknown} ERROR {x"
        );
    }

    #[test]
    fn test_template_without_placeholders_is_unchanged() {
        let r = result("line", "p", &[("level", Some("WARN"))]);
        let template = "static alert text with {braces} but nothing known";
        assert_eq!(expand_template(template, &r, "src"), template);
    }

    #[test]
    fn test_earlier_keys_not_resubstituted() {
        // A capture value containing `{line}` is inserted after `{line}` was
        // already expanded, so it stays literal.
        let r = result("the line", "p", &[("msg", Some("{line}"))]);
        assert_eq!(expand_template("{msg} | {line}", &r, "s"), "{line} | the line");
    }

    #[test]
    fn test_later_keys_see_inserted_text() {
        let r = result("from {source}", "p", &[]);
        assert_eq!(expand_template("{line}", &r, "app.log"), "from app.log");
    }

    #[test]
    fn test_complex_template() {
        let r = result(
            "2024-01-01 ERROR connection timeout",
            r"(?P<level>ERROR|WARN)",
            &[("level", Some("ERROR"))],
        );
        let template = "🚨 **{level}** from `{source}`\n```\n{line}\n```";
        assert_eq!(
            expand_template(template, &r, "docker:myapp"),
            "🚨 **ERROR** from `docker:myapp`\n```\n2024-01-01 ERROR connection timeout\n```"
        );
    }

    #[test]
    fn test_match_then_expand() {
        let patterns = vec![Pattern::new(r"(?P<level>ERROR|WARN) (?P<message>.+)").unwrap()];
        let r = match_line("WARN disk 90%", &patterns).unwrap();
        assert_eq!(expand_template("[{level}] {message}", &r, "app.log"), "[WARN] disk 90%");
    }

    #[test]
    fn test_unmatched_alternative_branch_expands_empty() {
        let patterns =
            vec![Pattern::new(r"(?P<level>ERROR) (?P<a>\w+)|(?P<other>WARN) (?P<b>\w+)").unwrap()];
        let r = match_line("WARN disk", &patterns).unwrap();
        assert_eq!(expand_template("[{level}] {other} {b}", &r, "s"), "[] WARN disk");
    }
}
