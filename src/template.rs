// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Payload templates.
//!
//! Every channel has an optional command template, applied to a payload
//! before it is published, and an optional value template, applied to an
//! inbound payload before it is decoded. Without a template the payload
//! passes through unchanged.
//!
//! Rendering is delegated to a [`TemplateRenderer`]. Hosts with a full
//! templating engine plug it in; [`SimpleRenderer`] covers the common
//! `{{ value }}` and `{{ value_json.key }}` forms.

use std::fmt;

use serde_json::Value;

use crate::capabilities::{Channel, ChannelMap};
use crate::error::TemplateError;

/// Renders a template against a single string value.
pub trait TemplateRenderer: Send + Sync + fmt::Debug {
    /// Renders `template` with `value` bound as the template's input.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] if the template is invalid or references
    /// something the value does not provide.
    fn render(&self, template: &str, value: &str) -> Result<String, TemplateError>;
}

/// Minimal renderer for `{{ ... }}` expressions.
///
/// Supported expressions:
/// - `value` - the raw value
/// - `value_json` - the value parsed as JSON
/// - `value_json.key`, `value_json[0]`, `value_json['key']` and chains of those
///
/// JSON strings render without quotes, `null` renders as `None` and booleans
/// as `True`/`False`.
///
/// # Examples
///
/// ```
/// use fanbind::template::{SimpleRenderer, TemplateRenderer};
///
/// let renderer = SimpleRenderer;
/// assert_eq!(renderer.render("{{ value }}%", "40").unwrap(), "40%");
/// assert_eq!(
///     renderer.render("{{ value_json.fan.speed }}", r#"{"fan":{"speed":3}}"#).unwrap(),
///     "3"
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleRenderer;

impl TemplateRenderer for SimpleRenderer {
    fn render(&self, template: &str, value: &str) -> Result<String, TemplateError> {
        let mut output = String::with_capacity(template.len());
        let mut rest = template;
        // parsed lazily, only when value_json is referenced
        let mut json: Option<Value> = None;

        while let Some(start) = rest.find("{{") {
            output.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                return Err(TemplateError::Syntax {
                    template: template.to_string(),
                    message: "unclosed '{{'".to_string(),
                });
            };
            let expr = after[..end].trim();
            output.push_str(&evaluate(template, expr, value, &mut json)?);
            rest = &after[end + 2..];
        }
        output.push_str(rest);
        Ok(output)
    }
}

fn evaluate(
    template: &str,
    expr: &str,
    value: &str,
    json: &mut Option<Value>,
) -> Result<String, TemplateError> {
    if expr == "value" {
        return Ok(value.to_string());
    }
    let Some(path) = expr.strip_prefix("value_json") else {
        return Err(TemplateError::Syntax {
            template: template.to_string(),
            message: format!("unknown expression '{expr}'"),
        });
    };

    if json.is_none() {
        let parsed = serde_json::from_str(value)
            .map_err(|_| TemplateError::NotJson(value.to_string()))?;
        *json = Some(parsed);
    }
    let mut current = json.as_ref().ok_or_else(|| TemplateError::NotJson(value.to_string()))?;

    for segment in parse_path(template, path)? {
        let next = match &segment {
            PathSegment::Key(key) => current.get(key.as_str()),
            PathSegment::Index(index) => current.get(*index),
        };
        current = next.ok_or_else(|| TemplateError::Undefined(expr.to_string()))?;
    }
    Ok(display_json(current))
}

#[derive(Debug, PartialEq, Eq)]
enum PathSegment {
    Key(String),
    Index(usize),
}

fn parse_path(template: &str, mut path: &str) -> Result<Vec<PathSegment>, TemplateError> {
    let syntax = |message: &str| TemplateError::Syntax {
        template: template.to_string(),
        message: message.to_string(),
    };

    let mut segments = Vec::new();
    while !path.is_empty() {
        if let Some(rest) = path.strip_prefix('.') {
            let len = rest
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            if len == 0 {
                return Err(syntax("empty attribute name"));
            }
            segments.push(PathSegment::Key(rest[..len].to_string()));
            path = &rest[len..];
        } else if let Some(rest) = path.strip_prefix('[') {
            let close = rest.find(']').ok_or_else(|| syntax("unclosed '['"))?;
            let inner = rest[..close].trim();
            let quoted = inner
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
                .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')));
            let segment = match quoted {
                Some(key) => PathSegment::Key(key.to_string()),
                None => PathSegment::Index(
                    inner
                        .parse()
                        .map_err(|_| syntax("subscript must be an index or a quoted key"))?,
                ),
            };
            segments.push(segment);
            path = &rest[close + 1..];
        } else {
            return Err(syntax("expected '.' or '[' after value_json"));
        }
    }
    Ok(segments)
}

fn display_json(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}

/// Template applied to a command payload before publishing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTemplate(Option<String>);

impl CommandTemplate {
    /// Wraps an optional template source.
    #[must_use]
    pub fn new(source: Option<String>) -> Self {
        Self(source)
    }

    /// Template source, if any.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Renders the outgoing payload.
    ///
    /// # Errors
    ///
    /// Propagates renderer errors.
    pub fn render(
        &self,
        renderer: &dyn TemplateRenderer,
        value: &str,
    ) -> Result<String, TemplateError> {
        match &self.0 {
            Some(template) => renderer.render(template, value),
            None => Ok(value.to_string()),
        }
    }
}

/// Template applied to an inbound payload before decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueTemplate(Option<String>);

impl ValueTemplate {
    /// Wraps an optional template source.
    #[must_use]
    pub fn new(source: Option<String>) -> Self {
        Self(source)
    }

    /// Template source, if any.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Renders the inbound payload.
    ///
    /// # Errors
    ///
    /// Propagates renderer errors.
    pub fn render(
        &self,
        renderer: &dyn TemplateRenderer,
        payload: &str,
    ) -> Result<String, TemplateError> {
        match &self.0 {
            Some(template) => renderer.render(template, payload),
            None => Ok(payload.to_string()),
        }
    }
}

/// Command and value templates for every channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelTemplates {
    /// Outbound templates.
    pub command: ChannelMap<CommandTemplate>,
    /// Inbound templates.
    pub value: ChannelMap<ValueTemplate>,
}

impl ChannelTemplates {
    /// Command template of a channel.
    #[must_use]
    pub fn command(&self, channel: Channel) -> &CommandTemplate {
        self.command.get(channel)
    }

    /// Value template of a channel.
    #[must_use]
    pub fn value(&self, channel: Channel) -> &ValueTemplate {
        self.value.get(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(template: &str, value: &str) -> Result<String, TemplateError> {
        SimpleRenderer.render(template, value)
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(render("speed", "1").unwrap(), "speed");
    }

    #[test]
    fn value_substitution() {
        assert_eq!(render("{{ value }}", "ON").unwrap(), "ON");
        assert_eq!(render("{\"state\": \"{{value}}\"}", "ON").unwrap(), "{\"state\": \"ON\"}");
        assert_eq!(render("{{ value }}-{{ value }}", "a").unwrap(), "a-a");
    }

    #[test]
    fn json_paths() {
        let payload = r#"{"fan": {"speed": 3, "mode": "eco", "modes": ["a", "b"]}, "osc": true, "p": null}"#;
        assert_eq!(render("{{ value_json.fan.speed }}", payload).unwrap(), "3");
        assert_eq!(render("{{ value_json.fan.mode }}", payload).unwrap(), "eco");
        assert_eq!(render("{{ value_json.fan.modes[1] }}", payload).unwrap(), "b");
        assert_eq!(render("{{ value_json['fan'][\"mode\"] }}", payload).unwrap(), "eco");
        assert_eq!(render("{{ value_json.osc }}", payload).unwrap(), "True");
        assert_eq!(render("{{ value_json.p }}", payload).unwrap(), "None");
    }

    #[test]
    fn missing_json_key_is_undefined() {
        assert_eq!(
            render("{{ value_json.speed }}", "{}"),
            Err(TemplateError::Undefined("value_json.speed".to_string()))
        );
    }

    #[test]
    fn non_json_value() {
        assert_eq!(
            render("{{ value_json.speed }}", "fast"),
            Err(TemplateError::NotJson("fast".to_string()))
        );
    }

    #[test]
    fn syntax_errors() {
        assert!(matches!(render("{{ value", "1"), Err(TemplateError::Syntax { .. })));
        assert!(matches!(render("{{ foo }}", "1"), Err(TemplateError::Syntax { .. })));
        assert!(matches!(
            render("{{ value_json[x] }}", "[1]"),
            Err(TemplateError::Syntax { .. })
        ));
    }

    #[test]
    fn absent_templates_pass_through() {
        assert_eq!(CommandTemplate::default().render(&SimpleRenderer, "42").unwrap(), "42");
        assert_eq!(ValueTemplate::default().render(&SimpleRenderer, "raw").unwrap(), "raw");
    }

    #[test]
    fn command_template_wraps_value() {
        let template = CommandTemplate::new(Some("{\"speed\": {{ value }}}".to_string()));
        assert_eq!(template.render(&SimpleRenderer, "2").unwrap(), "{\"speed\": 2}");
    }
}
