//! @ai:module:intent Rewrite one source file, wrapping conditionally annotated functions in guards
//! @ai:module:layer application
//! @ai:module:public_api Transformer, TransformContext, TransformStats, BraceScanner, GUARD_CLOSE
//! @ai:module:depends_on annotation, classifier, extensions, table, config, error
//!
//! A single pass over the lines of one file. Annotation comments are
//! collected until the function signature they precede; if any of them
//! resolves to the `When` base, the function body is bracketed by
//! `#ifdef <condition>` / `#endif` and the closing brace is found with a
//! literal- and comment-aware brace counter.

use crate::annotation::{Annotation, AnnotationUse, Location, WHEN_ANNOTATION};
use crate::classifier::{
    extract_annotation, extract_function_name, is_annotation, is_extension_definition,
    is_function_signature, is_function_terminator, is_identifier, split_args_bounded,
};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::extensions::ExtensionRegistry;
use crate::table::AnnotationTable;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directive closing a guarded function.
pub const GUARD_CLOSE: &str = "#endif";

/// @ai:intent Build the directive opening a guarded function
/// @ai:effects pure
pub fn guard_open(condition: &str) -> String {
    format!("#ifdef {}", condition)
}

/// @ai:intent Borrowed engine state a transformer reads and grows
pub struct TransformContext<'a> {
    pub config: &'a EngineConfig,
    pub extensions: &'a mut ExtensionRegistry,
    pub table: &'a mut AnnotationTable,
}

/// @ai:intent Counters describing one transformed file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformStats {
    pub lines: usize,
    pub annotations_recorded: usize,
    pub annotations_dropped: usize,
    pub extensions_registered: usize,
    pub guards_emitted: usize,
    pub unclosed_guard: bool,
}

/// @ai:intent Tracks brace depth inside a guarded body, skipping literals and comments
#[derive(Debug, Clone, Default)]
pub struct BraceScanner {
    depth: i64,
    in_block_comment: bool,
}

impl BraceScanner {
    /// @ai:intent Update the depth with the braces of one line
    /// @ai:edge_cases escaped quotes stay inside their literal; block comments span lines
    /// @ai:edge_cases a quote after a digit or identifier (`1'000`) is a digit separator
    pub fn scan(&mut self, line: &str) {
        let mut chars = line.char_indices().peekable();
        let mut literal: Option<char> = None;

        while let Some((idx, c)) = chars.next() {
            let next = chars.peek().map(|&(_, n)| n);

            if self.in_block_comment {
                if c == '*' && next == Some('/') {
                    chars.next();
                    self.in_block_comment = false;
                }
                continue;
            }

            if let Some(quote) = literal {
                if c == '\\' {
                    chars.next();
                } else if c == quote {
                    literal = None;
                }
                continue;
            }

            match c {
                '"' => literal = Some(c),
                '\'' if opens_char_literal(&line[..idx]) => literal = Some(c),
                '/' if next == Some('/') => break,
                '/' if next == Some('*') => {
                    chars.next();
                    self.in_block_comment = true;
                }
                '{' => self.depth += 1,
                '}' => self.depth -= 1,
                _ => {}
            }
        }
    }

    pub fn depth(&self) -> i64 {
        self.depth
    }

    /// @ai:intent Check whether every opened brace has been closed
    pub fn is_closed(&self) -> bool {
        self.depth <= 0
    }
}

/// @ai:intent Decide whether a `'` starts a char literal given the text before it
/// @ai:example ("x = ") -> true
/// @ai:example ("n > 1") -> false
/// @ai:example ("c = L") -> true
/// @ai:effects pure
fn opens_char_literal(before: &str) -> bool {
    let word_start = before
        .trim_end_matches(|c: char| c.is_ascii_alphanumeric() || c == '_')
        .len();
    matches!(&before[word_start..], "" | "L" | "u" | "U" | "u8")
}

enum State {
    Outside,
    Pending(Vec<AnnotationUse>),
    Guarded(BraceScanner),
}

/// @ai:intent Line-by-line state machine for one source file
pub struct Transformer<'a, 'c> {
    ctx: &'a mut TransformContext<'c>,
    source: PathBuf,
    stats: TransformStats,
}

impl<'a, 'c> Transformer<'a, 'c> {
    /// @ai:intent Create a transformer for the file at `source` (used for locations only)
    pub fn new(ctx: &'a mut TransformContext<'c>, source: &Path) -> Self {
        Self {
            ctx,
            source: source.to_path_buf(),
            stats: TransformStats::default(),
        }
    }

    /// @ai:intent Transform source text, writing the rewritten file to `out`
    /// @ai:post every emitted guard-open has a matching guard-close
    /// @ai:effects io:write
    pub fn run<W: Write>(mut self, input: &str, out: &mut W) -> Result<TransformStats> {
        let mut state = State::Outside;

        for (idx, line) in input.lines().enumerate() {
            let line_number = idx + 1;
            self.stats.lines += 1;

            if is_extension_definition(line) {
                self.register_extension(line);
                writeln!(out, "{}", line)?;
                continue;
            }

            state = match state {
                State::Guarded(mut scanner) => {
                    writeln!(out, "{}", line)?;
                    scanner.scan(line);
                    if scanner.is_closed() && is_function_terminator(line) {
                        writeln!(out, "{}", GUARD_CLOSE)?;
                        State::Outside
                    } else {
                        State::Guarded(scanner)
                    }
                }
                State::Outside if is_annotation(line) => {
                    State::Pending(vec![self.annotation_use(line, line_number)])
                }
                State::Pending(mut pending) if is_annotation(line) => {
                    pending.push(self.annotation_use(line, line_number));
                    State::Pending(pending)
                }
                State::Pending(pending) if is_function_signature(line) => {
                    self.bind(pending, line, line_number, out)?
                }
                other => {
                    writeln!(out, "{}", line)?;
                    other
                }
            };
        }

        match state {
            State::Guarded(scanner) => {
                tracing::warn!(
                    "{}: unbalanced braces (depth {}) at end of file, closing guard",
                    self.source.display(),
                    scanner.depth()
                );
                writeln!(out, "{}", GUARD_CLOSE)?;
                self.stats.unclosed_guard = true;
            }
            State::Pending(pending) => {
                tracing::warn!(
                    "{}: {} annotation(s) not followed by a function, ignored",
                    self.source.display(),
                    pending.len()
                );
            }
            State::Outside => {}
        }

        if self.stats.annotations_dropped > 0 {
            tracing::warn!(
                "{}: annotation table full ({} entries), dropped {} annotation(s)",
                self.source.display(),
                self.ctx.table.capacity(),
                self.stats.annotations_dropped
            );
        }

        Ok(self.stats)
    }

    fn register_extension(&mut self, line: &str) {
        match self.ctx.extensions.register_line(line) {
            Ok(true) => self.stats.extensions_registered += 1,
            Ok(false) => {}
            Err(e) => tracing::warn!("{}: {}", self.source.display(), e),
        }
    }

    fn annotation_use(&self, line: &str, line_number: usize) -> AnnotationUse {
        let (name, arg) = extract_annotation(line);
        tracing::debug!(line = line_number, %name, %arg, "pending annotation");
        AnnotationUse {
            name,
            arg,
            line: line_number,
        }
    }

    /// @ai:intent Attach pending annotations to the function opened on `line`
    /// @ai:post one table entry per pending annotation, all sharing the guard condition
    fn bind<W: Write>(
        &mut self,
        pending: Vec<AnnotationUse>,
        line: &str,
        line_number: usize,
        out: &mut W,
    ) -> Result<State> {
        let config: &'c EngineConfig = self.ctx.config;
        let function = extract_function_name(line);
        let max_args = config.limits.max_args;

        let mut resolved = Vec::with_capacity(pending.len());
        for usage in pending {
            let (args, dropped) = split_args_bounded(&usage.arg, max_args);
            if dropped > 0 {
                tracing::warn!(
                    "{}:{}: @{} has more than {} arguments, dropped {}",
                    self.source.display(),
                    usage.line,
                    usage.name,
                    max_args,
                    dropped
                );
            }
            let condition = self.resolve_condition(&usage, &args);
            resolved.push((usage, args, condition));
        }

        let guard = self.choose_guard(&resolved, &function);
        if let Some(condition) = &guard {
            writeln!(out, "{}", guard_open(condition))?;
            self.stats.guards_emitted += 1;
        }

        let disable_symbol = config.disable.symbol.as_str();
        for (usage, args, _) in resolved {
            let annotation =
                Annotation::function(&usage.name, &function, args, guard.clone(), disable_symbol)
                    .at(Location::new(self.source.clone(), line_number));
            match self.ctx.table.push(annotation) {
                Ok(()) => self.stats.annotations_recorded += 1,
                Err(_) => self.stats.annotations_dropped += 1,
            }
        }

        writeln!(out, "{}", line)?;

        if guard.is_none() {
            return Ok(State::Outside);
        }

        let mut scanner = BraceScanner::default();
        scanner.scan(line);
        if scanner.is_closed() && is_function_terminator(line) {
            writeln!(out, "{}", GUARD_CLOSE)?;
            return Ok(State::Outside);
        }
        Ok(State::Guarded(scanner))
    }

    /// @ai:intent Resolve the condition symbol an annotation guards on, if any
    /// @ai:edge_cases a base arg naming an extension parameter takes the usage's argument
    fn resolve_condition(&self, usage: &AnnotationUse, args: &[String]) -> Option<String> {
        let config: &'c EngineConfig = self.ctx.config;

        let condition = if usage.name == WHEN_ANNOTATION {
            args.first().cloned()
        } else if let Some(extension) = self.ctx.extensions.get(&usage.name) {
            if !extension.is_conditional() {
                return None;
            }
            if extension.base_arg.is_empty() {
                args.first().cloned()
            } else {
                let param = extension
                    .params()
                    .iter()
                    .position(|p| *p == extension.base_arg);
                match param {
                    Some(idx) => match args.get(idx) {
                        Some(arg) => Some(arg.clone()),
                        None => {
                            tracing::warn!(
                                "{}:{}: @{} needs argument `{}` for its condition, no guard emitted",
                                self.source.display(),
                                usage.line,
                                usage.name,
                                extension.base_arg
                            );
                            return None;
                        }
                    },
                    None => Some(extension.base_arg.clone()),
                }
            }
        } else if usage.name == config.disable.annotation {
            Some(config.disable.symbol.clone())
        } else {
            None
        };

        match condition {
            Some(symbol) if is_identifier(&symbol) => Some(symbol),
            Some(symbol) => {
                tracing::warn!(
                    "{}:{}: @{} condition {:?} is not a valid symbol, no guard emitted",
                    self.source.display(),
                    usage.line,
                    usage.name,
                    symbol
                );
                None
            }
            None => None,
        }
    }

    /// @ai:intent Pick the single condition a function is guarded by
    /// @ai:post the disable symbol wins, otherwise the first condition in source order
    fn choose_guard(
        &self,
        resolved: &[(AnnotationUse, Vec<String>, Option<String>)],
        function: &str,
    ) -> Option<String> {
        let disable_symbol = self.ctx.config.disable.symbol.as_str();
        let conditions: Vec<&str> = resolved
            .iter()
            .filter_map(|(_, _, condition)| condition.as_deref())
            .collect();

        let chosen = conditions
            .iter()
            .find(|c| **c == disable_symbol)
            .or_else(|| conditions.first())
            .map(|c| c.to_string())?;

        for other in conditions.iter().filter(|c| **c != chosen) {
            tracing::warn!(
                "{}: `{}` is guarded by {}, condition {} ignored",
                self.source.display(),
                function,
                chosen,
                other
            );
        }

        Some(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Extension;
    use pretty_assertions::assert_eq;

    struct Fixture {
        config: EngineConfig,
        extensions: ExtensionRegistry,
        table: AnnotationTable,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_config(EngineConfig::default())
        }

        fn with_config(config: EngineConfig) -> Self {
            Self {
                extensions: ExtensionRegistry::new(config.limits.max_extensions),
                table: AnnotationTable::new(config.limits.max_annotations),
                config,
            }
        }

        fn transform(&mut self, input: &str) -> (String, TransformStats) {
            let mut ctx = TransformContext {
                config: &self.config,
                extensions: &mut self.extensions,
                table: &mut self.table,
            };
            let mut out = Vec::new();
            let stats = Transformer::new(&mut ctx, Path::new("input.c"))
                .run(input, &mut out)
                .unwrap();
            (String::from_utf8(out).unwrap(), stats)
        }
    }

    #[test]
    fn test_when_one_line_function() {
        let mut fx = Fixture::new();
        let (out, stats) = fx.transform("// @When(TARGET_TEST)\nvoid f() {}\n");

        assert_eq!(out, "#ifdef TARGET_TEST\nvoid f() {}\n#endif\n");
        assert_eq!(stats.guards_emitted, 1);
        assert!(!stats.unclosed_guard);

        let entries = fx.table.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "When");
        assert_eq!(entries[0].target_name, "f");
        assert_eq!(entries[0].condition.as_deref(), Some("TARGET_TEST"));
        assert_eq!(entries[0].args, vec!["TARGET_TEST".to_string()]);
        assert_eq!(entries[0].location.line, 2);
    }

    #[test]
    fn test_when_without_argument_has_no_guard() {
        let mut fx = Fixture::new();
        let (out, _) = fx.transform("// @When\nvoid f() {\n}\n");

        assert_eq!(out, "void f() {\n}\n");
        assert_eq!(fx.table.entries()[0].condition, None);
    }

    #[test]
    fn test_extension_in_file_guards_function() {
        let mut fx = Fixture::new();
        let input = "// #annotation @Custom(flag) : @When(TARGET_TEST)\n\
                     // @Custom(\"flag1\")\n\
                     void test_func() {\n\
                     \tint x = 1;\n\
                     }\n\
                     int after;\n";
        let (out, stats) = fx.transform(input);

        assert_eq!(
            out,
            "// #annotation @Custom(flag) : @When(TARGET_TEST)\n\
             #ifdef TARGET_TEST\n\
             void test_func() {\n\
             \tint x = 1;\n\
             }\n\
             #endif\n\
             int after;\n"
        );
        assert_eq!(stats.extensions_registered, 1);

        let found = fx.table.entries().iter().filter(|a| a.name == "Custom").collect::<Vec<_>>();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].condition.as_deref(), Some("TARGET_TEST"));
        assert_eq!(found[0].args, vec!["flag1".to_string()]);
    }

    #[test]
    fn test_templated_base_arg_takes_usage_argument() {
        let mut fx = Fixture::new();
        fx.extensions
            .register(Extension {
                name: "Feature".to_string(),
                args: "flag".to_string(),
                base: "When".to_string(),
                base_arg: "flag".to_string(),
            })
            .unwrap();

        let (out, _) = fx.transform("// @Feature(FAST_PATH)\nvoid go() {}\n");
        assert_eq!(out, "#ifdef FAST_PATH\nvoid go() {}\n#endif\n");
    }

    #[test]
    fn test_templated_base_arg_without_argument_has_no_guard() {
        let mut fx = Fixture::new();
        fx.extensions
            .register_line("// #annotation @Feature(flag) : @When(flag)")
            .unwrap();

        let (out, stats) = fx.transform("// @Feature\nvoid go() {}\n");
        assert_eq!(out, "void go() {}\n");
        assert_eq!(stats.guards_emitted, 0);
        assert_eq!(fx.table.entries()[0].condition, None);
    }

    #[test]
    fn test_digit_separator_does_not_hide_braces() {
        let mut fx = Fixture::new();
        let input = concat!(
            "// @When(X)\n",
            "void f(int n) {\n",
            "    if (n > 1'000) {\n",
            "        n = 0;\n",
            "    }\n",
            "    g(n);\n",
            "}\n",
        );
        let (out, stats) = fx.transform(input);

        let body = input.strip_prefix("// @When(X)\n").unwrap();
        assert_eq!(out, format!("#ifdef X\n{}#endif\n", body));
        assert!(!stats.unclosed_guard);
    }

    #[test]
    fn test_opens_char_literal() {
        assert!(opens_char_literal("    char c = "));
        assert!(opens_char_literal("case "));
        assert!(opens_char_literal("wchar_t w = L"));
        assert!(!opens_char_literal("if (n > 1"));
        assert!(!opens_char_literal("mask = 0xFF"));

        let mut scanner = BraceScanner::default();
        scanner.scan("int big = 1'000'000; {");
        assert_eq!(scanner.depth(), 1);
        scanner.scan("char c = '{'; }");
        assert!(scanner.is_closed());
    }

    #[test]
    fn test_plain_annotation_has_no_guard() {
        let mut fx = Fixture::new();
        let (out, _) = fx.transform("// @Setup\nvoid setup() {\n    count = 0;\n}\n");

        assert_eq!(out, "void setup() {\n    count = 0;\n}\n");
        let entries = fx.table.entries();
        assert_eq!(entries[0].name, "Setup");
        assert_eq!(entries[0].condition, None);
        assert!(!entries[0].is_removed);
    }

    #[test]
    fn test_braces_in_string_literal_do_not_close_guard() {
        let mut fx = Fixture::new();
        let input = "// @When(TARGET_TEST)\n\
                     void f() {\n\
                     \tprintf(\"}\");\n\
                     \tprintf(\"{\");\n\
                     \tchar c = '}';\n\
                     \tputs(\"\\\"}\");\n\
                     }\n";
        let (out, stats) = fx.transform(input);

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.first(), Some(&"#ifdef TARGET_TEST"));
        assert_eq!(lines[lines.len() - 2], "}");
        assert_eq!(lines.last(), Some(&"#endif"));
        assert_eq!(out.matches("#endif").count(), 1);
        assert!(!stats.unclosed_guard);
    }

    #[test]
    fn test_nested_blocks_and_comments() {
        let mut fx = Fixture::new();
        let input = "// @When(X)\n\
                     int g(int a) {\n\
                     \tif (a) { // }\n\
                     \t\treturn 1;\n\
                     \t} /* } */\n\
                     \t/* {\n\
                     \t}} */\n\
                     \treturn 0;\n\
                     }\n";
        let (out, _) = fx.transform(input);
        let body = input.strip_prefix("// @When(X)\n").unwrap();
        assert_eq!(out, format!("#ifdef X\n{}#endif\n", body));
    }

    #[test]
    fn test_unbalanced_body_closed_at_end_of_file() {
        let mut fx = Fixture::new();
        let (out, stats) = fx.transform("// @When(X)\nvoid f() {\n\tint y;\n");

        assert_eq!(out, "#ifdef X\nvoid f() {\n\tint y;\n#endif\n");
        assert!(stats.unclosed_guard);
    }

    #[test]
    fn test_stacked_annotations_share_condition() {
        let mut fx = Fixture::new();
        fx.extensions
            .register_line("// #annotation @Test(description) : @When(TARGET_TEST)")
            .unwrap();

        let input = "// @Test(\"adds\")\n// @Disable(\"flaky\")\nvoid t() {\n}\n";
        let (out, _) = fx.transform(input);

        let symbol = fx.config.disable.symbol.clone();
        assert_eq!(out, format!("#ifdef {}\nvoid t() {{\n}}\n#endif\n", symbol));

        let entries = fx.table.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .all(|e| e.condition.as_deref() == Some(symbol.as_str())));
        assert!(entries.iter().all(|e| e.is_removed));
        assert_eq!(entries[0].description(), Some("adds"));
    }

    #[test]
    fn test_registered_disable_extension_takes_precedence() {
        let mut fx = Fixture::new();
        fx.extensions
            .register_line("// #annotation @Disable(reason) : @When(NEVER)")
            .unwrap();

        let (out, _) = fx.transform("// @Disable\nvoid t() {}\n");
        assert_eq!(out, "#ifdef NEVER\nvoid t() {}\n#endif\n");
        assert!(!fx.table.entries()[0].is_removed);
    }

    #[test]
    fn test_invalid_condition_symbol_is_not_emitted() {
        let mut fx = Fixture::new();
        let (out, _) = fx.transform("// @When(\"not a symbol\")\nvoid f() {}\n");
        assert_eq!(out, "void f() {}\n");
    }

    #[test]
    fn test_lines_between_annotation_and_signature_are_kept() {
        let mut fx = Fixture::new();
        let (out, _) = fx.transform("// @When(X)\n\n/* doc */\nvoid f(void) {\n}\n");
        assert_eq!(out, "\n/* doc */\n#ifdef X\nvoid f(void) {\n}\n#endif\n");
    }

    #[test]
    fn test_dangling_annotation_is_dropped() {
        let mut fx = Fixture::new();
        let (out, _) = fx.transform("int x;\n// @Test\n");
        assert_eq!(out, "int x;\n");
        assert!(fx.table.is_empty());
    }

    #[test]
    fn test_table_overflow_drops_silently() {
        let mut fx = Fixture::with_config(EngineConfig::with_capacity(1));
        let (_, stats) = fx.transform("// @Test\nvoid a() {}\n// @Test\nvoid b() {}\n");

        assert_eq!(stats.annotations_recorded, 1);
        assert_eq!(stats.annotations_dropped, 1);
        assert_eq!(fx.table.entries()[0].target_name, "a");
    }

    #[test]
    fn test_extension_overflow_keeps_transforming() {
        let mut config = EngineConfig::default();
        config.limits.max_extensions = 1;
        let mut fx = Fixture::with_config(config);

        let input = concat!(
            "// #annotation @Fast() : @When(FAST)\n",
            "// #annotation @Slow() : @When(SLOW)\n",
            "// @Slow\n",
            "void s() {}\n",
        );
        let (out, stats) = fx.transform(input);

        assert_eq!(stats.extensions_registered, 1);
        assert_eq!(fx.extensions.len(), 1);
        assert!(fx.extensions.get("Slow").is_none());
        assert_eq!(
            out,
            "// #annotation @Fast() : @When(FAST)\n// #annotation @Slow() : @When(SLOW)\nvoid s() {}\n"
        );
        assert_eq!(fx.table.entries()[0].name, "Slow");
    }

    #[test]
    fn test_brace_scanner_escape_handling() {
        let mut scanner = BraceScanner::default();
        scanner.scan(r#"void f() { puts("\\"); {"#);
        assert_eq!(scanner.depth(), 2);
        scanner.scan("}}");
        assert!(scanner.is_closed());
    }
}
