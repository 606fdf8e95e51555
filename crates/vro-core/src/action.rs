//! The canonical action record and its two renderers.
//!
//! An [`Action`] is built once from either source format through
//! [`Action::construct`] and then rendered to the other format. It carries
//! its result type in both spellings; see [`ResultType`].

use crate::error::Result;
use crate::{io, paths};
use quick_xml::escape::escape;
use serde::Serialize;
use std::fmt;
use std::path::Path;

pub const ACTION_START: &str = "/* VRO ACTION START */";
pub const ACTION_END: &str = "/* VRO ACTION END */";

const INDENT: &str = "    ";
const ARRAY_PREFIX: &str = "Array/";
const ARRAY_SUFFIX: &str = "[]";

// ---------------------------------------------------------------------------
// Param
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
}

impl Param {
    pub fn new(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ResultType
// ---------------------------------------------------------------------------

/// Result type in script spelling (`Foo[]`) and schema spelling (`Array/Foo`).
///
/// Only one spelling ever comes from a source document; the other is derived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultType {
    simple: String,
    qualified: String,
}

impl ResultType {
    pub fn from_simple(simple: &str) -> Self {
        let qualified = match simple.strip_suffix(ARRAY_SUFFIX) {
            Some(element) => format!("{ARRAY_PREFIX}{element}"),
            None => simple.to_string(),
        };
        Self {
            simple: simple.to_string(),
            qualified,
        }
    }

    pub fn from_qualified(qualified: &str) -> Self {
        let simple = match qualified.strip_prefix(ARRAY_PREFIX) {
            Some(element) => format!("{element}{ARRAY_SUFFIX}"),
            None => qualified.to_string(),
        };
        Self {
            simple,
            qualified: qualified.to_string(),
        }
    }

    pub fn simple(&self) -> &str {
        &self.simple
    }

    pub fn qualified(&self) -> &str {
        &self.qualified
    }

    pub fn is_empty(&self) -> bool {
        self.simple.is_empty() && self.qualified.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Raw fields gathered by an extractor, before the result-type rules apply.
#[derive(Debug, Clone, Default)]
pub struct ActionDraft {
    pub id: String,
    pub name: String,
    pub script: String,
    pub category: String,
    pub description: String,
    pub params: Vec<Param>,
    pub simple_result: Option<String>,
    pub qualified_result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructionWarning {
    /// Neither result-type spelling was supplied; both are left empty.
    MissingResultType { id: String, name: String },
}

impl fmt::Display for ConstructionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructionWarning::MissingResultType { id, name } => write!(
                f,
                "action '{name}' ({id}) has no result type; an empty result type will be written"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    id: String,
    name: String,
    description: String,
    params: Vec<Param>,
    script: String,
    category: String,
    result: ResultType,
}

impl Action {
    /// Build an action, deriving the missing result-type spelling.
    ///
    /// The simple spelling wins when both are present. When neither is, the
    /// action is still returned together with a warning.
    pub fn construct(draft: ActionDraft) -> (Action, Option<ConstructionWarning>) {
        let simple = draft.simple_result.filter(|s| !s.is_empty());
        let qualified = draft.qualified_result.filter(|s| !s.is_empty());

        let (result, warning) = match (simple, qualified) {
            (Some(s), _) => (ResultType::from_simple(&s), None),
            (None, Some(q)) => (ResultType::from_qualified(&q), None),
            (None, None) => (
                ResultType::default(),
                Some(ConstructionWarning::MissingResultType {
                    id: draft.id.clone(),
                    name: draft.name.clone(),
                }),
            ),
        };

        let action = Action {
            id: draft.id,
            name: draft.name,
            description: draft.description.trim().to_string(),
            params: draft.params,
            script: draft.script,
            category: draft.category,
            result,
        };
        (action, warning)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn result(&self) -> &ResultType {
        &self.result
    }

    // -----------------------------------------------------------------------
    // Script rendering
    // -----------------------------------------------------------------------

    /// Documented function fragment, delimited by the action sentinels.
    pub fn render_script(&self) -> String {
        let mut out = String::new();
        out.push_str(ACTION_START);
        out.push('\n');
        out.push_str(&format!("/* id:{} */\n", self.id));
        out.push_str("/**\n");
        if !self.description.is_empty() {
            for line in self.description.lines() {
                push_doc_line(&mut out, &escape_doc_line(line));
            }
            out.push_str(" *\n");
        }
        out.push_str(&format!(" * @method {}\n", self.name));
        out.push_str(" *\n");
        for p in &self.params {
            let mut lines = p.description.lines();
            let mut head = format!("@param {{{}}} {}", p.param_type, p.name);
            if let Some(first) = lines.next().filter(|l| !l.trim().is_empty()) {
                head.push(' ');
                head.push_str(&escape_doc_line(first));
            }
            push_doc_line(&mut out, &head);
            for line in lines {
                push_doc_line(&mut out, &escape_doc_line(line));
            }
        }
        if !self.result.simple().is_empty() {
            if !self.params.is_empty() {
                out.push_str(" *\n");
            }
            out.push_str(&format!(" * @return {{{}}}\n", self.result.simple()));
        }
        out.push_str(" */\n");
        out.push_str(&format!("function {} () {{\n", self.name));
        out.push_str(INDENT);
        out.push_str(&self.script.replace('\n', &format!("\n{INDENT}")));
        out.push_str("\n};\n");
        out.push_str(ACTION_END);
        out.push_str("\n\n");
        out
    }

    /// Append the script fragment to `path`. Never truncates.
    pub fn append_script(&self, path: &Path) -> Result<()> {
        io::append_text(path, &self.render_script())
    }

    // -----------------------------------------------------------------------
    // XML rendering
    // -----------------------------------------------------------------------

    pub fn render_xml(&self) -> String {
        let mut out = String::new();
        out.push_str("<?xml version='1.0' encoding='UTF-16'?>\n");
        out.push_str(&format!(
            "<dunes-script-module name=\"{}\" result-type=\"{}\" api-version=\"6.0.0\" id=\"{}\" version=\"0.0.0\" allowed-operations=\"vef\">\n",
            escape(&self.name),
            escape(self.result.qualified()),
            escape(&self.id),
        ));
        if !self.description.is_empty() {
            out.push_str(&format!(
                "<description>{}</description>\n",
                cdata(&self.description)
            ));
        }
        for p in &self.params {
            out.push_str(&format!(
                "<param n=\"{}\" t=\"{}\">{}</param>\n",
                escape(&p.name),
                escape(&p.param_type),
                cdata(&p.description)
            ));
        }
        out.push_str(&format!(
            "<script encoded=\"false\">{}</script>\n",
            cdata(&dedent_once(&self.script))
        ));
        out.push_str("</dunes-script-module>");
        out
    }

    /// Write `<expand_root>/elements/<id>/data` as UTF-16BE with a BOM.
    ///
    /// The element directory must already exist.
    pub fn write_xml(&self, expand_root: &Path) -> Result<()> {
        paths::validate_id(&self.id)?;
        let path = paths::element_data(expand_root, &self.id);
        io::replace_in_existing_dir(&path, &encode_utf16be(&self.render_xml()))
    }
}

fn push_doc_line(out: &mut String, line: &str) {
    if line.is_empty() {
        out.push_str(" *\n");
    } else {
        out.push_str(" * ");
        out.push_str(line);
        out.push('\n');
    }
}

/// Make free text safe inside a `/** */` block: `*/` becomes `*\/`, and a
/// line that would read as a tag (or starts with `\`) gets a `\` in front.
/// `script::unescape_doc_line` reverses this.
pub(crate) fn escape_doc_line(line: &str) -> String {
    let line = line.trim_start().replace("*/", "*\\/");
    if line.starts_with('@') || line.starts_with('\\') {
        format!("\\{line}")
    } else {
        line
    }
}

/// Remove exactly one 4-space indent from every line that starts with one.
fn dedent_once(script: &str) -> String {
    script
        .split('\n')
        .map(|line| line.strip_prefix(INDENT).unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

pub fn encode_utf16be(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(2 + text.len() * 2);
    bytes.extend_from_slice(&[0xFE, 0xFF]);
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
