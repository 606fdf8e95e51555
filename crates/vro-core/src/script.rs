//! Extracts actions from a documented JavaScript module.
//!
//! Extraction runs in two phases:
//!
//! 1. A sentinel lexer splits the module into action units delimited by
//!    `/* VRO ACTION START */` and `/* VRO ACTION END */` and pulls the
//!    `/* id:<token> */` comment out of each. A unit without an id fails the
//!    whole module before anything is parsed further.
//! 2. A small state machine walks each unit through its documentation block,
//!    the zero-argument `function` declaration and the body. Each stage has
//!    its own [`SyntaxError`], so a malformed unit says where it went wrong.

use crate::action::{ActionDraft, Param};
use crate::error::{Result, VroError};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

static UNIT_RE: OnceLock<Regex> = OnceLock::new();
static ID_RE: OnceLock<Regex> = OnceLock::new();

fn unit_re() -> &'static Regex {
    UNIT_RE.get_or_init(|| {
        Regex::new(r"(?s)/\*[ ]*VRO[ ]+ACTION[ ]+START[ ]*\*/(.*?)/\*[ ]*VRO[ ]+ACTION[ ]+END[ ]*\*/")
            .unwrap()
    })
}

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"/\*[ ]*id:([\w-]+)").unwrap())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("no documentation block (/** ... */) found")]
    MissingDocBlock,

    #[error("documentation block is never closed")]
    UnterminatedDocBlock,

    #[error("documentation block is not followed by a function declaration")]
    MissingFunction,

    #[error("malformed function declaration: {0}")]
    MalformedDeclaration(&'static str),

    #[error("function body is never closed by a '}}' at the start of a line")]
    UnterminatedBody,
}

/// One action unit found in a module.
#[derive(Debug, Clone)]
pub struct ScriptUnit {
    pub id: String,
    pub parsed: std::result::Result<ActionDraft, SyntaxError>,
}

/// Split `content` into action units and parse each one.
///
/// Fails with [`VroError::MissingId`] if any unit lacks its id comment; in
/// that case no unit of the module is returned.
pub fn extract_module(module_name: &str, content: &str) -> Result<Vec<ScriptUnit>> {
    let mut raw_units = Vec::new();
    for caps in unit_re().captures_iter(content) {
        let raw = caps.get(1).map_or("", |m| m.as_str());
        let Some(id_match) = id_re().captures(raw) else {
            return Err(VroError::MissingId {
                module: module_name.to_string(),
                snippet: snippet(raw),
            });
        };
        let id = id_match[1].to_string();
        let after_id = id_match.get(0).map_or(0, |m| m.end());
        raw_units.push((id, &raw[after_id..]));
    }

    Ok(raw_units
        .into_iter()
        .map(|(id, body)| {
            let parsed = parse_unit(body).map(|unit| ActionDraft {
                id: id.clone(),
                name: unit.name,
                script: unit.body,
                category: module_name.to_string(),
                description: unit.doc.description,
                params: unit.doc.params,
                simple_result: unit.doc.result,
                qualified_result: None,
            });
            ScriptUnit { id, parsed }
        })
        .collect())
}

fn snippet(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(80) {
        Some((i, _)) => format!("{}...", &trimmed[..i]),
        None => trimmed.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Structural pass
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    SeekDoc,
    InDoc,
    SeekFunction,
    Declaration,
    Body,
}

#[derive(Debug)]
struct ParsedUnit {
    name: String,
    body: String,
    doc: DocBlock,
}

fn parse_unit(text: &str) -> std::result::Result<ParsedUnit, SyntaxError> {
    let mut stage = Stage::SeekDoc;
    let mut rest = text;
    let mut doc = DocBlock::default();
    let mut name = String::new();

    loop {
        match stage {
            Stage::SeekDoc => {
                let start = rest.find("/**").ok_or(SyntaxError::MissingDocBlock)?;
                rest = &rest[start + 3..];
                stage = Stage::InDoc;
            }
            Stage::InDoc => {
                let end = rest.find("*/").ok_or(SyntaxError::UnterminatedDocBlock)?;
                doc = parse_doc(&rest[..end]);
                rest = &rest[end + 2..];
                stage = Stage::SeekFunction;
            }
            Stage::SeekFunction => {
                rest = rest
                    .trim_start()
                    .strip_prefix("function")
                    .filter(|r| r.starts_with(char::is_whitespace))
                    .ok_or(SyntaxError::MissingFunction)?;
                stage = Stage::Declaration;
            }
            Stage::Declaration => {
                rest = rest.trim_start();
                let name_len = rest
                    .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-' || c == '$'))
                    .unwrap_or(rest.len());
                if name_len == 0 {
                    return Err(SyntaxError::MalformedDeclaration("missing function name"));
                }
                name = rest[..name_len].to_string();
                rest = rest[name_len..]
                    .trim_start()
                    .strip_prefix('(')
                    .ok_or(SyntaxError::MalformedDeclaration("expected '('"))?
                    .trim_start()
                    .strip_prefix(')')
                    .ok_or(SyntaxError::MalformedDeclaration(
                        "action functions take no parameters",
                    ))?
                    .trim_start()
                    .strip_prefix('{')
                    .ok_or(SyntaxError::MalformedDeclaration("expected '{'"))?;
                stage = Stage::Body;
            }
            Stage::Body => {
                let close = rest.find("\n}").ok_or(SyntaxError::UnterminatedBody)?;
                return Ok(ParsedUnit {
                    name,
                    body: rest[..close].trim().to_string(),
                    doc,
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Documentation block
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct DocBlock {
    description: String,
    params: Vec<Param>,
    result: Option<String>,
}

/// Parse the inside of a `/** ... */` block.
///
/// Plain lines are description; `@param` and the first `@return` are kept;
/// every other tag is ignored. Plain lines right after an `@param` continue
/// that parameter's description, blank lines included when more text
/// follows.
fn parse_doc(doc: &str) -> DocBlock {
    let mut block = DocBlock::default();
    let mut description = Vec::new();
    let mut in_param = false;
    let mut pending_blank = 0usize;

    for line in doc.lines() {
        let line = line.trim_start();
        let line = line.strip_prefix('*').unwrap_or(line).trim();
        if let Some(tag) = line.strip_prefix('@') {
            in_param = false;
            pending_blank = 0;
            if let Some(rest) = tag.strip_prefix("param") {
                if let Some(param) = parse_param(rest) {
                    block.params.push(param);
                    in_param = true;
                }
            } else if let Some(rest) = tag.strip_prefix("return") {
                if block.result.is_none() {
                    block.result = parse_return(rest);
                }
            }
        } else if in_param {
            if line.is_empty() {
                pending_blank += 1;
                continue;
            }
            if let Some(param) = block.params.last_mut() {
                if !param.description.is_empty() {
                    param.description.push_str(&"\n".repeat(pending_blank + 1));
                }
                param.description.push_str(&unescape_doc_line(line));
            }
            pending_blank = 0;
        } else {
            description.push(unescape_doc_line(line));
        }
    }

    block.description = description.join("\n").trim().to_string();
    block
}

/// Reverse of `action::escape_doc_line`.
fn unescape_doc_line(line: &str) -> String {
    let line = match line.strip_prefix('\\') {
        Some(rest) if rest.starts_with('@') || rest.starts_with('\\') => rest,
        _ => line,
    };
    line.replace("*\\/", "*/")
}

/// `{Type}` at the start of `text` (after at least one space), and what follows.
fn braced_type(text: &str) -> Option<(&str, &str)> {
    if !text.starts_with(' ') {
        return None;
    }
    let inner = text.trim_start().strip_prefix('{')?;
    let mut depth = 1usize;
    for (i, c) in inner.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&inner[..i], &inner[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_param(text: &str) -> Option<Param> {
    let (param_type, rest) = braced_type(text)?;
    if !rest.starts_with(' ') {
        return None;
    }
    let rest = rest.trim_start();
    let name_len = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if name_len == 0 {
        return None;
    }
    Some(Param::new(
        &rest[..name_len],
        param_type,
        unescape_doc_line(rest[name_len..].trim()),
    ))
}

fn parse_return(text: &str) -> Option<String> {
    braced_type(text).map(|(t, _)| t.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
