//! Mustache-style template rendering
//!
//! Templates render shell snippets and config text, so the engine's renderer
//! is built without HTML escaping. Escaping is a property of the renderer
//! value, never a process-wide switch.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{MutationError, MutationResult};

/// A template variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateValue {
    Bool(bool),
    Text(String),
    List(Vec<String>),
}

impl TemplateValue {
    fn render(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Text(s) => s.clone(),
            Self::List(items) => items.join("\n"),
        }
    }

    fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Text(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for TemplateValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for TemplateValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Flat variable map handed to a template
pub type TemplateVars = BTreeMap<String, TemplateValue>;

/// Resolves a template id to its raw text
#[async_trait]
pub trait TemplateLoader: Send + Sync {
    /// Load the template body
    ///
    /// # Errors
    /// Returns `TemplateNotFound` for unknown ids
    async fn load(&self, template_id: &str) -> MutationResult<String>;
}

/// In-memory templates keyed by id
#[derive(Debug, Clone, Default)]
pub struct StaticTemplates {
    templates: HashMap<String, String>,
}

impl StaticTemplates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template body
    #[must_use]
    pub fn with(mut self, id: impl Into<String>, body: impl Into<String>) -> Self {
        self.templates.insert(id.into(), body.into());
        self
    }
}

#[async_trait]
impl TemplateLoader for StaticTemplates {
    async fn load(&self, template_id: &str) -> MutationResult<String> {
        self.templates
            .get(template_id)
            .cloned()
            .ok_or_else(|| MutationError::TemplateNotFound(template_id.to_string()))
    }
}

/// Template renderer, configured once at construction
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    escape_html: bool,
}

impl Renderer {
    /// A renderer that never escapes
    #[must_use]
    pub fn new() -> Self {
        Self { escape_html: false }
    }

    /// A renderer that HTML-escapes `{{name}}` interpolations
    #[must_use]
    pub fn html() -> Self {
        Self { escape_html: true }
    }

    /// Render `template` against `vars`
    ///
    /// # Errors
    /// Returns `Template` for unclosed tags or mismatched sections
    pub fn render(&self, template: &str, vars: &TemplateVars) -> MutationResult<String> {
        self.render_named("<inline>", template, vars)
    }

    pub(crate) fn render_named(
        &self,
        name: &str,
        template: &str,
        vars: &TemplateVars,
    ) -> MutationResult<String> {
        let tokens = tokenize(template).map_err(|message| MutationError::Template {
            template: name.to_string(),
            message,
        })?;
        let mut output = String::with_capacity(template.len());
        let mut position = 0;
        self.render_tokens(&tokens, &mut position, vars, &mut output, None)
            .map_err(|message| MutationError::Template {
                template: name.to_string(),
                message,
            })?;
        Ok(output)
    }

    fn render_tokens(
        &self,
        tokens: &[Token<'_>],
        position: &mut usize,
        vars: &TemplateVars,
        output: &mut String,
        section: Option<&str>,
    ) -> Result<(), String> {
        while let Some(token) = tokens.get(*position) {
            *position += 1;
            match token {
                Token::Text(text) => output.push_str(text),
                Token::Comment => {}
                Token::Var { name, raw } => {
                    if let Some(value) = vars.get(name) {
                        let rendered = value.render();
                        if self.escape_html && !raw {
                            output.push_str(&escape_html(&rendered));
                        } else {
                            output.push_str(&rendered);
                        }
                    }
                }
                Token::Open { name, inverted } => {
                    let truthy = vars.get(name).is_some_and(TemplateValue::is_truthy);
                    if truthy == *inverted {
                        let mut discard = String::new();
                        self.render_tokens(tokens, position, vars, &mut discard, Some(name.as_str()))?;
                    } else {
                        self.render_tokens(tokens, position, vars, output, Some(name.as_str()))?;
                    }
                }
                Token::Close(name) => {
                    return match section {
                        Some(open) if open == name.as_str() => Ok(()),
                        Some(open) => Err(format!(
                            "section '{open}' closed by '{{{{/{name}}}}}'"
                        )),
                        None => Err(format!("unexpected closing tag '{name}'")),
                    };
                }
            }
        }

        match section {
            Some(open) => Err(format!("section '{open}' is never closed")),
            None => Ok(()),
        }
    }
}

/// Render with the engine's non-escaping renderer
///
/// # Errors
/// Returns `Template` for malformed templates
pub fn render_template(template: &str, vars: &TemplateVars) -> MutationResult<String> {
    Renderer::new().render(template, vars)
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Text(&'a str),
    Var { name: String, raw: bool },
    Open { name: String, inverted: bool },
    Close(String),
    Comment,
}

fn tokenize(template: &str) -> Result<Vec<Token<'_>>, String> {
    let mut tokens = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            tokens.push(Token::Text(&rest[..start]));
        }
        let after = &rest[start + 2..];

        if let Some(triple) = after.strip_prefix('{') {
            let end = triple
                .find("}}}")
                .ok_or_else(|| "unclosed '{{{' tag".to_string())?;
            tokens.push(Token::Var {
                name: tag_name(&triple[..end])?,
                raw: true,
            });
            rest = &triple[end + 3..];
        } else {
            let end = after
                .find("}}")
                .ok_or_else(|| "unclosed '{{' tag".to_string())?;
            tokens.push(classify(&after[..end])?);
            rest = &after[end + 2..];
        }
    }

    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }
    Ok(tokens)
}

fn classify(body: &str) -> Result<Token<'static>, String> {
    let body = body.trim();
    let mut chars = body.chars();
    let token = match chars.next() {
        Some('!') => Token::Comment,
        Some('#') => Token::Open {
            name: tag_name(chars.as_str())?,
            inverted: false,
        },
        Some('^') => Token::Open {
            name: tag_name(chars.as_str())?,
            inverted: true,
        },
        Some('/') => Token::Close(tag_name(chars.as_str())?),
        Some('&') => Token::Var {
            name: tag_name(chars.as_str())?,
            raw: true,
        },
        _ => Token::Var {
            name: tag_name(body)?,
            raw: false,
        },
    };
    Ok(token)
}

fn tag_name(raw: &str) -> Result<String, String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err("empty tag".to_string());
    }
    Ok(name.to_string())
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, TemplateValue)]) -> TemplateVars {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_interpolation_is_not_escaped() {
        let v = vars(&[("cmd", "a && b > \"c\"".into())]);
        assert_eq!(
            render_template("run: {{cmd}}", &v).unwrap(),
            "run: a && b > \"c\""
        );
    }

    #[test]
    fn test_html_renderer_escapes() {
        let v = vars(&[("cmd", "a & b".into())]);
        assert_eq!(Renderer::html().render("{{cmd}}", &v).unwrap(), "a &amp; b");
        assert_eq!(Renderer::html().render("{{{cmd}}}", &v).unwrap(), "a & b");
        assert_eq!(Renderer::html().render("{{& cmd}}", &v).unwrap(), "a & b");
        // The non-escaping renderer is unaffected by the html one
        assert_eq!(render_template("{{cmd}}", &v).unwrap(), "a & b");
    }

    #[test]
    fn test_lists_join_with_newlines() {
        let v = vars(&[("lines", vec!["one".to_string(), "two".to_string()].into())]);
        assert_eq!(render_template("{{ lines }}\n", &v).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        assert_eq!(render_template("[{{nope}}]", &TemplateVars::new()).unwrap(), "[]");
    }

    #[test]
    fn test_sections() {
        let v = vars(&[("yes", true.into()), ("empty", "".into())]);
        let out = render_template("{{#yes}}A{{/yes}}{{#empty}}B{{/empty}}{{^empty}}C{{/empty}}{{! note }}", &v)
            .unwrap();
        assert_eq!(out, "AC");
    }

    #[test]
    fn test_malformed_templates() {
        let v = TemplateVars::new();
        assert!(render_template("{{open", &v).is_err());
        assert!(render_template("{{#a}}x", &v).is_err());
        assert!(render_template("{{#a}}x{{/b}}", &v).is_err());
        assert!(render_template("x{{/a}}", &v).is_err());
        assert!(render_template("{{}}", &v).is_err());
    }

    #[tokio::test]
    async fn test_static_templates() {
        let loader = StaticTemplates::new().with("skill", "body");
        assert_eq!(loader.load("skill").await.unwrap(), "body");
        assert!(matches!(
            loader.load("missing").await,
            Err(MutationError::TemplateNotFound(_))
        ));
    }
}
