//! @ai:module:intent Classify single source lines and decompose annotation syntax
//! @ai:module:layer domain
//! @ai:module:public_api is_annotation, is_extension_definition, is_function_signature, is_function_terminator, is_identifier, extract_annotation, extract_extension_definition, extract_function_name, split_args, split_args_bounded
//! @ai:module:depends_on annotation
//! @ai:module:stateless true
//!
//! Every function here looks at one line at a time. Malformed syntax never
//! fails: extraction returns whatever could be recovered.

use crate::annotation::Extension;
use regex::Regex;
use std::sync::LazyLock;

/// Prefix of an annotation comment, e.g. `// @Test("adds")`.
pub const ANNOTATION_SENTINEL: &str = "// @";

/// Prefix of an extension definition, e.g. `// #annotation @Test(desc) : @When(TARGET_TEST)`.
pub const EXTENSION_SENTINEL: &str = "// #annotation ";

/// Separator between an extension and the base it resolves to.
pub const BASE_MARKER: &str = " : @";

/// Argument cap used when no configuration is supplied.
pub const DEFAULT_MAX_ARGS: usize = 8;

static TRAILING_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\s*$").expect("Invalid regex"));

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid regex"));

/// @ai:intent Check if a line is an annotation comment
/// @ai:example ("// @Test") -> true
/// @ai:example ("    // @Test") -> false
/// @ai:effects pure
pub fn is_annotation(line: &str) -> bool {
    line.starts_with(ANNOTATION_SENTINEL)
}

/// @ai:intent Check if a line defines an annotation extension
/// @ai:effects pure
pub fn is_extension_definition(line: &str) -> bool {
    line.starts_with(EXTENSION_SENTINEL)
}

/// @ai:intent Heuristically check if a line opens a function definition
/// @ai:assumes the signature and its opening brace share one line
/// @ai:effects pure
pub fn is_function_signature(line: &str) -> bool {
    line.contains('(') && line.contains(')') && line.contains('{')
}

/// @ai:intent Check if a line can end a function body
/// @ai:effects pure
pub fn is_function_terminator(line: &str) -> bool {
    line.contains('}')
}

/// @ai:intent Extract the name and raw argument string from an annotation comment
/// @ai:example ("// @Name(A, B)") -> ("Name", "A, B")
/// @ai:example ("// @Name(A") -> ("Name", "A")
/// @ai:example ("// @Name") -> ("Name", "")
/// @ai:effects pure
pub fn extract_annotation(line: &str) -> (String, String) {
    match line.find('@') {
        Some(at) => {
            let call = split_call(&line[at + 1..]);
            (call.name.to_string(), call.arg.to_string())
        }
        None => (String::new(), String::new()),
    }
}

/// @ai:intent Decompose an extension definition into name, args, base and base arg
/// @ai:post None only when no extension name can be recovered
/// @ai:edge_cases missing " : @" leaves base and base_arg empty
/// @ai:effects pure
pub fn extract_extension_definition(line: &str) -> Option<Extension> {
    let body = line.strip_prefix(EXTENSION_SENTINEL).unwrap_or(line);
    let at = body.find('@')?;
    let call = split_call(&body[at + 1..]);
    if call.name.is_empty() {
        return None;
    }

    let mut extension = Extension {
        name: call.name.to_string(),
        args: call.arg.to_string(),
        ..Default::default()
    };

    let tail = &body[at + 1 + call.consumed..];
    if let Some(marker) = tail.find(BASE_MARKER) {
        let base = split_call(&tail[marker + BASE_MARKER.len()..]);
        extension.base = base.name.to_string();
        extension.base_arg = base.arg.to_string();
    }

    Some(extension)
}

/// @ai:intent Extract the function name from a signature line
/// @ai:example ("void f() {") -> "f"
/// @ai:example ("static int *make(void) {") -> "make"
/// @ai:effects pure
pub fn extract_function_name(line: &str) -> String {
    let Some(paren) = line.find('(') else {
        return String::new();
    };
    let head = &line[..paren];

    if let Some(captures) = TRAILING_IDENT.captures(head) {
        return captures[1].to_string();
    }

    // No identifier right before the paren; fall back to first-space-to-paren.
    match head.find(' ') {
        Some(space) => head[space + 1..].trim().to_string(),
        None => head.trim().to_string(),
    }
}

/// @ai:intent Check that a name can be used as a preprocessor symbol or C identifier
/// @ai:effects pure
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// @ai:intent Split an argument string with the default argument cap
/// @ai:effects pure
pub fn split_args(input: &str) -> Vec<String> {
    split_args_bounded(input, DEFAULT_MAX_ARGS).0
}

/// @ai:intent Split a comma-separated argument string, keeping at most `limit` values
/// @ai:post returns (kept, dropped) where kept.len() <= limit
/// @ai:edge_cases commas inside double quotes do not split; blank tokens are skipped
/// @ai:effects pure
pub fn split_args_bounded(input: &str, limit: usize) -> (Vec<String>, usize) {
    let mut kept = Vec::new();
    let mut dropped = 0;

    for token in split_top_level_commas(input) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if kept.len() >= limit {
            dropped += 1;
            continue;
        }
        kept.push(unquote(token).to_string());
    }

    (kept, dropped)
}

/// A `Name(arg)` call recovered from annotation text.
struct Call<'a> {
    name: &'a str,
    arg: &'a str,
    /// Bytes of the input covered by the call, including the closing paren.
    consumed: usize,
}

/// @ai:intent Split `Name(arg)...` into its name, argument text and consumed length
/// @ai:effects pure
fn split_call(text: &str) -> Call<'_> {
    let name_end = text
        .find(|c: char| c == '(' || c.is_whitespace())
        .unwrap_or(text.len());
    let name = &text[..name_end];

    let after_name = &text[name_end..];
    let padding = after_name.len() - after_name.trim_start().len();
    let open = name_end + padding;

    if !text[open..].starts_with('(') {
        return Call {
            name,
            arg: "",
            consumed: name_end,
        };
    }

    let inner = &text[open + 1..];
    match find_closing_paren(inner) {
        Some(close) => Call {
            name,
            arg: &inner[..close],
            consumed: open + 1 + close + 1,
        },
        None => Call {
            name,
            arg: inner.trim_end(),
            consumed: text.len(),
        },
    }
}

/// @ai:intent Find the paren that closes an already-opened group, ignoring quoted text
/// @ai:effects pure
fn find_closing_paren(inner: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in inner.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }

    None
}

/// @ai:intent Split on commas that are not inside a double-quoted string
/// @ai:effects pure
fn split_top_level_commas(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in input.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            ',' => {
                parts.push(&input[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);

    parts
}

/// @ai:intent Strip one pair of surrounding double quotes
/// @ai:effects pure
fn unquote(token: &str) -> &str {
    if token.len() > 1 && token.starts_with('"') && token.ends_with('"') {
        &token[1..token.len() - 1]
    } else {
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifiers() {
        assert!(is_annotation("// @Test"));
        assert!(!is_annotation("  // @Test"));
        assert!(!is_annotation("/* @Test */"));
        assert!(is_extension_definition(
            "// #annotation @Test(desc) : @When(TARGET_TEST)"
        ));
        assert!(!is_extension_definition("// @Test"));
        assert!(is_function_signature("void f(void) {"));
        assert!(!is_function_signature("void f(void);"));
        assert!(!is_function_signature("int x = 1;"));
        assert!(is_function_terminator("}"));
        assert!(!is_function_terminator("    return 0;"));
    }

    #[test]
    fn test_extract_simple_annotation() {
        assert_eq!(
            extract_annotation("// @When"),
            ("When".to_string(), String::new())
        );
    }

    #[test]
    fn test_extract_annotation_with_args_is_verbatim() {
        assert_eq!(
            extract_annotation("// @Test(TARGET_TEST, \"desc\")"),
            ("Test".to_string(), "TARGET_TEST, \"desc\"".to_string())
        );
        assert_eq!(
            extract_annotation("// @Name(A, B)"),
            ("Name".to_string(), "A, B".to_string())
        );
    }

    #[test]
    fn test_extract_annotation_missing_paren() {
        assert_eq!(
            extract_annotation("// @Name(A"),
            ("Name".to_string(), "A".to_string())
        );
    }

    #[test]
    fn test_extract_annotation_with_whitespace() {
        assert_eq!(
            extract_annotation("// @When   \t"),
            ("When".to_string(), String::new())
        );
    }

    #[test]
    fn test_extract_annotation_keeps_parens_inside_strings() {
        assert_eq!(
            extract_annotation("// @Test(\"f(x) works\") trailing"),
            ("Test".to_string(), "\"f(x) works\"".to_string())
        );
    }

    #[test]
    fn test_extract_annotation_without_at() {
        assert_eq!(extract_annotation("// nothing"), (String::new(), String::new()));
    }

    #[test]
    fn test_extract_extension() {
        let ext = extract_extension_definition("// #annotation @Custom(flag) : @When(cond)").unwrap();
        assert_eq!(ext.name, "Custom");
        assert_eq!(ext.args, "flag");
        assert_eq!(ext.base, "When");
        assert_eq!(ext.base_arg, "cond");

        let ext = extract_extension_definition(
            "// #annotation @Test(condition, desc) : @When(cond)",
        )
        .unwrap();
        assert_eq!(ext.args, "condition, desc");
    }

    #[test]
    fn test_extract_extension_without_base() {
        let ext = extract_extension_definition("// #annotation @Custom(flag)").unwrap();
        assert_eq!(ext.name, "Custom");
        assert_eq!(ext.args, "flag");
        assert_eq!(ext.base, "");
        assert_eq!(ext.base_arg, "");
    }

    #[test]
    fn test_extract_extension_without_name() {
        assert_eq!(extract_extension_definition("// #annotation nothing here"), None);
    }

    #[test]
    fn test_extract_function_name() {
        assert_eq!(extract_function_name("void f() {}"), "f");
        assert_eq!(extract_function_name("void test_func(void) {"), "test_func");
        assert_eq!(extract_function_name("static int *make(void) {"), "make");
        assert_eq!(extract_function_name("no parens here {"), "");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("TARGET_TEST"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("not a symbol"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_split_args_trims_and_unquotes() {
        assert_eq!(
            split_args("TARGET_TEST, \"desc\""),
            vec!["TARGET_TEST".to_string(), "desc".to_string()]
        );
        assert_eq!(split_args("\"a, b\", c"), vec!["a, b".to_string(), "c".to_string()]);
        assert!(split_args("   ").is_empty());
    }

    #[test]
    fn test_split_args_truncates_at_limit() {
        let (kept, dropped) = split_args_bounded("a,b,c,d,e,f,g,h,i,j", 8);
        assert_eq!(kept.len(), 8);
        assert_eq!(kept.last().map(String::as_str), Some("h"));
        assert_eq!(dropped, 2);
        assert_eq!(split_args("1,2,3,4,5,6,7,8,9").len(), DEFAULT_MAX_ARGS);
    }
}
