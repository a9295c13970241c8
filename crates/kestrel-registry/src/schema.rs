//! Schema synthesis: `Signature` → `InvocationSchema`.
//!
//! Algorithm:
//!
//! 1. Map each declared parameter's type name onto a `SemanticType`,
//!    falling back to `string` for missing or unrecognized names.
//! 2. Parse the description text line by line:
//!    - free text before the first annotation becomes the top-level description
//!    - `:param <name>: <text>` starts that parameter's description; following
//!      plain lines continue it
//!    - `:return`, `:returns`, `:rtype`, `:raises` and `:type` blocks are dropped
//!    - Google-style `Args:` sections are read as `name (type): text` entries;
//!      `Returns:` and `Raises:` sections are dropped
//! 3. A parameter is required iff it has no default.
//!
//! Every declared parameter appears exactly once, in declaration order.
//! Annotations for names that are not declared are ignored.

use std::collections::HashMap;

use kestrel_contracts::schema::{InvocationSchema, ParameterSchema, SemanticType, Signature};

/// Build the invocation schema for one declared callable.
pub fn synthesize(signature: &Signature) -> InvocationSchema {
    let doc = parse_doc(signature.doc.as_deref().unwrap_or_default());

    let parameters = signature
        .params
        .iter()
        .map(|p| ParameterSchema {
            name: p.name.clone(),
            semantic_type: semantic_type(p.declared_type.as_deref()),
            description: doc.params.get(&p.name).cloned().unwrap_or_default(),
            required: p.default.is_none(),
        })
        .collect();

    InvocationSchema {
        name: signature.name.clone(),
        description: doc.description,
        parameters,
    }
}

/// Map a declared type name onto one of the six semantic types.
pub fn semantic_type(declared: Option<&str>) -> SemanticType {
    let Some(name) = declared else {
        return SemanticType::String;
    };
    match name.trim().to_ascii_lowercase().as_str() {
        "int" | "integer" => SemanticType::Integer,
        "float" | "number" => SemanticType::Number,
        "bool" | "boolean" => SemanticType::Boolean,
        "dict" | "object" | "map" => SemanticType::Object,
        "list" | "array" => SemanticType::Array,
        _ => SemanticType::String,
    }
}

/// Description text split into its top-level summary and per-parameter parts.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedDoc {
    pub description: String,
    pub params: HashMap<String, String>,
}

enum Section {
    Description,
    Param(String),
    Discard,
    /// Inside a Google-style `Args:` block. `indent` is the indentation of
    /// the first entry, once seen.
    Args { indent: Option<usize>, current: Option<String> },
}

const DISCARD_MARKERS: &[&str] = &[":return", ":rtype", ":raise", ":type ", ":type:"];
const ARGS_HEADERS: &[&str] = &["Args:", "Arguments:", "Parameters:"];
const DISCARD_HEADERS: &[&str] = &["Returns:", "Return:", "Raises:", "Yields:"];

/// Parse description text. Empty input yields an empty `ParsedDoc`.
pub fn parse_doc(text: &str) -> ParsedDoc {
    let mut description: Vec<&str> = Vec::new();
    let mut params: HashMap<String, Vec<String>> = HashMap::new();
    let mut section = Section::Description;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix(":param") {
            let (name, text) = split_param_annotation(rest);
            push_part(&mut params, &name, text);
            section = Section::Param(name);
            continue;
        }
        if DISCARD_MARKERS.iter().any(|m| line.starts_with(m)) {
            section = Section::Discard;
            continue;
        }
        if ARGS_HEADERS.contains(&line) {
            section = Section::Args { indent: None, current: None };
            continue;
        }
        if DISCARD_HEADERS.contains(&line) {
            section = Section::Discard;
            continue;
        }

        match &mut section {
            Section::Description => description.push(line),
            Section::Param(name) => push_part(&mut params, name, line),
            Section::Discard => {}
            Section::Args { indent, current } => {
                let depth = raw.len() - raw.trim_start().len();
                let is_entry_depth = indent.map_or(true, |i| depth <= i);
                match google_entry(line) {
                    Some((name, text)) if is_entry_depth => {
                        *indent = Some(depth);
                        push_part(&mut params, name, text);
                        *current = Some(name.to_string());
                    }
                    _ => {
                        if let Some(name) = current {
                            push_part(&mut params, name, line);
                        }
                    }
                }
            }
        }
    }

    ParsedDoc {
        description: description.join(" "),
        params: params
            .into_iter()
            .map(|(name, parts)| (name, parts.join(" ")))
            .collect(),
    }
}

/// Split the remainder of a `:param` line.
///
/// Accepts `a: text`, `int a: text` (typed form, name is the last word) and a
/// bare `a` with no text.
fn split_param_annotation(rest: &str) -> (String, &str) {
    let (head, text) = match rest.split_once(':') {
        Some((head, text)) => (head, text.trim()),
        None => (rest, ""),
    };
    let name = head.split_whitespace().last().unwrap_or_default();
    (name.to_string(), text)
}

/// Recognize `name (type): text` or `name: text` where `name` is an identifier.
fn google_entry(line: &str) -> Option<(&str, &str)> {
    let (head, text) = line.split_once(':')?;
    let name = match head.split_once('(') {
        Some((name, ty)) if ty.trim_end().ends_with(')') => name.trim(),
        Some(_) => return None,
        None => head.trim(),
    };
    let is_ident = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    is_ident.then_some((name, text.trim()))
}

fn push_part(params: &mut HashMap<String, Vec<String>>, name: &str, text: &str) {
    if name.is_empty() {
        return;
    }
    let parts = params.entry(name.to_string()).or_default();
    if !text.is_empty() {
        parts.push(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use kestrel_contracts::schema::DeclaredParam;

    use super::*;

    fn sig(params: Vec<DeclaredParam>, doc: Option<&str>) -> Signature {
        Signature {
            name: "tool".to_string(),
            params,
            doc: doc.map(str::to_string),
        }
    }

    #[test]
    fn add_example_produces_expected_schema() {
        let signature = Signature {
            name: "add".to_string(),
            params: vec![
                DeclaredParam::new("a", Some("integer")),
                DeclaredParam::new("b", Some("integer")),
            ],
            doc: Some("Add two numbers\n:param a: first\n:param b: second".to_string()),
        };

        let schema = synthesize(&signature);

        assert_eq!(schema.name, "add");
        assert_eq!(schema.description, "Add two numbers");
        assert_eq!(schema.required(), vec!["a", "b"]);
        let a = schema.parameter("a").unwrap();
        assert_eq!(a.semantic_type, SemanticType::Integer);
        assert_eq!(a.description, "first");
        let b = schema.parameter("b").unwrap();
        assert_eq!(b.semantic_type, SemanticType::Integer);
        assert_eq!(b.description, "second");
    }

    #[test]
    fn required_and_total_counts_follow_defaults() {
        for (n, m) in [(0, 0), (1, 0), (0, 2), (3, 2)] {
            let mut params: Vec<DeclaredParam> =
                (0..n).map(|i| DeclaredParam::new(format!("r{i}"), None)).collect();
            params.extend((0..m).map(|i| DeclaredParam::new(format!("o{i}"), None).with_default(json!(i))));

            let schema = synthesize(&sig(params, None));

            assert_eq!(schema.required().len(), n, "n={n} m={m}");
            assert_eq!(schema.parameters.len(), n + m, "n={n} m={m}");
        }
    }

    #[test]
    fn missing_doc_yields_empty_descriptions() {
        let schema = synthesize(&sig(vec![DeclaredParam::new("path", Some("str"))], None));
        assert_eq!(schema.description, "");
        assert_eq!(schema.parameters[0].description, "");
    }

    #[test]
    fn type_map_defaults_to_string() {
        assert_eq!(semantic_type(Some("int")), SemanticType::Integer);
        assert_eq!(semantic_type(Some("float")), SemanticType::Number);
        assert_eq!(semantic_type(Some("Bool")), SemanticType::Boolean);
        assert_eq!(semantic_type(Some("dict")), SemanticType::Object);
        assert_eq!(semantic_type(Some("list")), SemanticType::Array);
        assert_eq!(semantic_type(Some("Path")), SemanticType::String);
        assert_eq!(semantic_type(None), SemanticType::String);
    }

    #[test]
    fn return_blocks_and_unknown_params_are_dropped() {
        let doc = "Read a file.\n\
                   :param path: where to read\n\
                   :param ghost: not declared\n\
                   :return: the contents\n\
                   which may be long\n\
                   :rtype: str";
        let schema = synthesize(&sig(vec![DeclaredParam::new("path", None)], Some(doc)));

        assert_eq!(schema.description, "Read a file.");
        assert_eq!(schema.parameters.len(), 1);
        assert_eq!(schema.parameters[0].description, "where to read");
    }

    #[test]
    fn description_and_param_text_span_lines() {
        let doc = "Run a shell command\nand capture its output.\n\n:param command: the command\n    line to run";
        let parsed = parse_doc(doc);
        assert_eq!(parsed.description, "Run a shell command and capture its output.");
        assert_eq!(parsed.params["command"], "the command line to run");
    }

    #[test]
    fn typed_param_annotation_uses_last_word() {
        let parsed = parse_doc(":param int count: how many");
        assert_eq!(parsed.params["count"], "how many");
    }

    #[test]
    fn google_style_sections_are_parsed() {
        let doc = "Copy a file.\n\
                   \n\
                   Args:\n    src (str): source path\n    dst: destination\n        path on disk\n\
                   \n\
                   Returns:\n    str: status text";
        let parsed = parse_doc(doc);

        assert_eq!(parsed.description, "Copy a file.");
        assert_eq!(parsed.params["src"], "source path");
        assert_eq!(parsed.params["dst"], "destination path on disk");
        assert!(!parsed.params.contains_key("str"));
    }

    #[test]
    fn synthesis_is_deterministic() {
        let signature = sig(
            vec![DeclaredParam::new("a", Some("int")), DeclaredParam::new("b", None)],
            Some("x\n:param a: y"),
        );
        assert_eq!(synthesize(&signature), synthesize(&signature));
    }
}
