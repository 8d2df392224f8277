//! @ai:module:intent Emit the declarations header, the data source and the JSON manifest from a table snapshot
//! @ai:module:layer infrastructure
//! @ai:module:public_api MetadataGenerator, include_guard_for, c_string_literal, ARRAY_SYMBOL, COUNT_SYMBOL, QUERY_SYMBOL
//! @ai:module:depends_on annotation, classifier, table, transform, error
//! @ai:module:stateless true

use crate::annotation::Annotation;
use crate::classifier::{is_extension_definition, is_identifier};
use crate::error::{Error, Result};
use crate::table::TableSnapshot;
use crate::transform::{guard_open, GUARD_CLOSE};
use std::fmt::Write as _;
use std::path::Path;

/// Tracking array holding one record per annotation.
pub const ARRAY_SYMBOL: &str = "__ANNOTATIONS";
/// Number of records in the tracking array.
pub const COUNT_SYMBOL: &str = "__ANNOTATION_COUNT";
/// Runtime lookup by annotation name.
pub const QUERY_SYMBOL: &str = "find_annotated_blocks";

const STRUCT_GUARD: &str = "ANNOTATION_STRUCT_DEFINED";

/// @ai:intent Renders generated artifacts for one table snapshot
pub struct MetadataGenerator<'a> {
    snapshot: &'a TableSnapshot,
    max_args: usize,
}

impl<'a> MetadataGenerator<'a> {
    /// @ai:intent Create a generator; max_args sizes the args array of each record
    pub fn new(snapshot: &'a TableSnapshot, max_args: usize) -> Self {
        Self { snapshot, max_args }
    }

    /// @ai:intent Render the declarations header
    /// @ai:post contains the include guard, extension lines, one forward declaration per distinct function, and the tracking declarations
    /// @ai:effects pure
    pub fn declarations(&self, extension_lines: &[String], include_guard: &str) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "#ifndef {}", include_guard);
        let _ = writeln!(out, "#define {}", include_guard);
        out.push('\n');

        let _ = writeln!(out, "#ifndef {}", STRUCT_GUARD);
        let _ = writeln!(out, "#define {}", STRUCT_GUARD);
        out.push_str("struct Annotation {\n");
        out.push_str("    const char *name;\n");
        out.push_str("    void *target;\n");
        out.push_str("    const char *type;\n");
        out.push_str("    int isRemoved;\n");
        let _ = writeln!(out, "    const char *args[{}];", self.max_args.max(1));
        out.push_str("    int arg_count;\n");
        out.push_str("    const char *condition;\n");
        out.push_str("    const char *target_name;\n");
        out.push_str("};\n");
        let _ = writeln!(out, "#endif // {}", STRUCT_GUARD);
        out.push('\n');

        out.push_str("// User-defined Annotation Extensions\n");
        for line in extension_lines {
            let _ = writeln!(out, "{}", line);
        }
        out.push('\n');

        out.push_str("// Function Declarations\n");
        for target in self.snapshot.distinct_targets() {
            let _ = writeln!(out, "extern void {}(void);", target);
        }
        out.push('\n');

        out.push_str("// Annotation Tracking Declarations\n");
        let _ = writeln!(out, "extern struct Annotation {}[];", ARRAY_SYMBOL);
        let _ = writeln!(out, "extern int {};", COUNT_SYMBOL);
        let _ = writeln!(
            out,
            "extern struct Annotation *{}(const char *name, int *count);",
            QUERY_SYMBOL
        );
        out.push('\n');
        let _ = writeln!(out, "#endif // {}", include_guard);

        out
    }

    /// @ai:intent Render the data source defining the tracking array, its count and the query function
    /// @ai:post records appear in table order; guarded records are split into enabled/disabled alternatives
    /// @ai:effects pure
    pub fn data(&self, header_name: &str) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "#include \"{}\"", header_name);
        out.push_str("#include <stdlib.h>\n");
        out.push_str("#include <string.h>\n");
        out.push('\n');
        out.push_str("// Generated Annotation Tracking\n");

        if self.snapshot.is_empty() {
            let _ = writeln!(out, "struct Annotation {}[1] = {{{{0}}}};", ARRAY_SYMBOL);
        } else {
            let _ = writeln!(out, "struct Annotation {}[] = {{", ARRAY_SYMBOL);
            for annotation in &self.snapshot.annotations {
                self.write_record(&mut out, annotation);
            }
            out.push_str("};\n");
        }
        let _ = writeln!(
            out,
            "int {} = {};",
            COUNT_SYMBOL,
            self.snapshot.annotations.len()
        );
        out.push('\n');

        self.write_query_function(&mut out);
        out
    }

    /// @ai:intent Render the snapshot as pretty JSON
    /// @ai:effects pure
    pub fn manifest(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self.snapshot)?)
    }

    fn write_record(&self, out: &mut String, annotation: &Annotation) {
        let target = if is_identifier(&annotation.target_name) {
            format!("(void *){}", annotation.target_name)
        } else {
            "NULL".to_string()
        };

        match &annotation.condition {
            Some(condition) => {
                let _ = writeln!(out, "{}", guard_open(condition));
                let enabled = self.record(annotation, &target, annotation.is_removed);
                let _ = writeln!(out, "    {},", enabled);
                out.push_str("#else\n");
                let disabled = self.record(annotation, "NULL", true);
                let _ = writeln!(out, "    {},", disabled);
                let _ = writeln!(out, "{}", GUARD_CLOSE);
            }
            None => {
                let record = self.record(annotation, &target, annotation.is_removed);
                let _ = writeln!(out, "    {},", record);
            }
        }
    }

    fn record(&self, annotation: &Annotation, target: &str, is_removed: bool) -> String {
        let slots = self.max_args.max(1);
        let args: Vec<String> = (0..slots)
            .map(|idx| match annotation.args.get(idx) {
                Some(arg) => c_string_literal(arg),
                None => "NULL".to_string(),
            })
            .collect();
        let condition = annotation
            .condition
            .as_deref()
            .map(c_string_literal)
            .unwrap_or_else(|| "NULL".to_string());

        format!(
            "{{{}, {}, {}, {}, {{{}}}, {}, {}, {}}}",
            c_string_literal(&annotation.name),
            target,
            c_string_literal(annotation.kind.as_str()),
            i32::from(is_removed),
            args.join(", "),
            annotation.args.len().min(slots),
            condition,
            c_string_literal(&annotation.target_name)
        )
    }

    fn write_query_function(&self, out: &mut String) {
        let _ = writeln!(
            out,
            "struct Annotation *{}(const char *name, int *count) {{",
            QUERY_SYMBOL
        );
        let _ = writeln!(
            out,
            "    size_t slots = {count} > 0 ? (size_t){count} : 1;",
            count = COUNT_SYMBOL
        );
        out.push_str("    struct Annotation *matches = malloc(sizeof(struct Annotation) * slots);\n");
        out.push_str("    int found = 0;\n");
        out.push_str("    if (!matches) {\n");
        out.push_str("        if (count) *count = 0;\n");
        out.push_str("        return NULL;\n");
        out.push_str("    }\n");
        let _ = writeln!(out, "    for (int i = 0; i < {}; i++) {{", COUNT_SYMBOL);
        let _ = writeln!(
            out,
            "        if ({array}[i].name && strcmp({array}[i].name, name) == 0) {{",
            array = ARRAY_SYMBOL
        );
        let _ = writeln!(out, "            matches[found++] = {}[i];", ARRAY_SYMBOL);
        out.push_str("        }\n");
        out.push_str("    }\n");
        out.push_str("    if (count) *count = found;\n");
        out.push_str("    return matches;\n");
        out.push_str("}\n");
    }
}

/// @ai:intent Collect the extension definition lines of a declarations file, in order
/// @ai:effects fs:read
pub fn read_extension_lines(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(content
        .lines()
        .filter(|line| is_extension_definition(line))
        .map(str::to_string)
        .collect())
}

/// @ai:intent Derive an include guard symbol from an output file name
/// @ai:example ("out/annotations.h") -> "ANNOTATIONS_H"
/// @ai:effects pure
pub fn include_guard_for(path: &Path) -> String {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("annotations.h");

    let mut guard: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    if guard.starts_with(|c: char| c.is_ascii_digit()) {
        guard.insert(0, '_');
    }
    guard
}

/// @ai:intent Quote a string as a C string literal
/// @ai:example ("say \"hi\"") -> "\"say \\\"hi\\\"\""
/// @ai:effects pure
pub fn c_string_literal(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('"');
    for c in value.chars() {
        match c {
            '"' => literal.push_str("\\\""),
            '\\' => literal.push_str("\\\\"),
            '\n' => literal.push_str("\\n"),
            '\t' => literal.push_str("\\t"),
            '\r' => literal.push_str("\\r"),
            _ => literal.push(c),
        }
    }
    literal.push('"');
    literal
}
