// file: src/search/render.rs
// description: local renderer for the mustache subset used by search templates
// reference: https://mustache.github.io/mustache.5.html

use crate::error::{Result, ServiceError};
use serde_json::{Map, Value};

#[derive(Debug, PartialEq)]
enum Node {
    Text(String),
    Variable { name: String, escape: bool },
    Section {
        name: String,
        inverted: bool,
        children: Vec<Node>,
    },
}

/// Renders `source` against `params`. Supports variables (`{{x}}`, JSON-string
/// escaped; `{{{x}}}` raw), sections (`{{#x}}`), inverted sections (`{{^x}}`)
/// and comments (`{{! ... }}`). Partials and delimiter changes are rejected.
pub fn render(source: &str, params: &Map<String, Value>) -> Result<String> {
    let nodes = parse(source)?;
    let root = Value::Object(params.clone());
    let mut stack = vec![&root];
    let mut out = String::with_capacity(source.len());
    render_nodes(&nodes, &mut stack, &mut out)?;
    Ok(out)
}

/// Renders and parses the output, as Elasticsearch would before executing it.
pub fn render_json(source: &str, params: &Map<String, Value>) -> Result<Value> {
    let rendered = render(source, params)?;
    serde_json::from_str(&rendered).map_err(|e| {
        ServiceError::Validation(format!("rendered template is not valid JSON: {}", e))
    })
}

fn parse(source: &str) -> Result<Vec<Node>> {
    // Each frame holds the section name (None for the root) and its nodes.
    let mut frames: Vec<(Option<(String, bool)>, Vec<Node>)> = vec![(None, Vec::new())];
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        push_text(&mut frames, &rest[..start]);
        let after_open = &rest[start..];

        let (tag, consumed) = if let Some(inner) = after_open.strip_prefix("{{{") {
            let end = inner
                .find("}}}")
                .ok_or_else(|| syntax_error("unterminated {{{ tag"))?;
            (format!("{{{}", inner[..end].trim()), end + 6)
        } else {
            let inner = &after_open[2..];
            let end = inner
                .find("}}")
                .ok_or_else(|| syntax_error("unterminated {{ tag"))?;
            (inner[..end].trim().to_string(), end + 4)
        };
        rest = &after_open[consumed..];

        let sigil = tag.chars().next();
        match sigil {
            Some('#') | Some('^') => {
                let inverted = tag.starts_with('^');
                let name = tag[1..].trim().to_string();
                frames.push((Some((name, inverted)), Vec::new()));
            }
            Some('/') => {
                let name = tag[1..].trim();
                let (open, children) = frames
                    .pop()
                    .filter(|_| !frames.is_empty())
                    .ok_or_else(|| syntax_error(&format!("unexpected closing tag {}", name)))?;
                let (open_name, inverted) = open
                    .ok_or_else(|| syntax_error(&format!("unexpected closing tag {}", name)))?;
                if open_name != name {
                    return Err(syntax_error(&format!(
                        "section {} closed by {}",
                        open_name, name
                    )));
                }
                current(&mut frames).push(Node::Section {
                    name: open_name,
                    inverted,
                    children,
                });
            }
            Some('!') => {}
            Some('{') => current(&mut frames).push(Node::Variable {
                name: tag[1..].trim().to_string(),
                escape: false,
            }),
            Some('&') => current(&mut frames).push(Node::Variable {
                name: tag[1..].trim().to_string(),
                escape: false,
            }),
            Some('>') | Some('=') => {
                return Err(syntax_error(&format!("unsupported tag {{{{{}}}}}", tag)));
            }
            Some(_) => current(&mut frames).push(Node::Variable {
                name: tag,
                escape: true,
            }),
            None => return Err(syntax_error("empty tag")),
        }
    }
    push_text(&mut frames, rest);

    if frames.len() != 1 {
        let unclosed = frames
            .last()
            .and_then(|(open, _)| open.as_ref())
            .map(|(name, _)| name.clone())
            .unwrap_or_default();
        return Err(syntax_error(&format!("unclosed section {}", unclosed)));
    }

    Ok(frames.pop().map(|(_, nodes)| nodes).unwrap_or_default())
}

fn current(frames: &mut [(Option<(String, bool)>, Vec<Node>)]) -> &mut Vec<Node> {
    // The root frame is never popped while parsing, so there is always one.
    &mut frames[frames.len() - 1].1
}

fn push_text(frames: &mut [(Option<(String, bool)>, Vec<Node>)], text: &str) {
    if !text.is_empty() {
        current(frames).push(Node::Text(text.to_string()));
    }
}

fn syntax_error(message: &str) -> ServiceError {
    ServiceError::Validation(format!("template syntax: {}", message))
}

fn lookup<'a>(stack: &[&'a Value], name: &str) -> Option<&'a Value> {
    if name == "." {
        return stack.last().copied();
    }
    stack.iter().rev().copied().find_map(|context| match context {
        Value::Object(obj) => obj.get(name),
        _ => None,
    })
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

fn write_value(value: &Value, escape: bool, out: &mut String) -> Result<()> {
    match value {
        Value::Null => {}
        Value::String(s) if escape => {
            let quoted = serde_json::to_string(s)?;
            out.push_str(&quoted[1..quoted.len() - 1]);
        }
        Value::String(s) => out.push_str(s),
        other => out.push_str(&serde_json::to_string(other)?),
    }
    Ok(())
}

fn render_nodes<'a>(nodes: &[Node], stack: &mut Vec<&'a Value>, out: &mut String) -> Result<()> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Variable { name, escape } => {
                if let Some(value) = lookup(stack, name) {
                    write_value(value, *escape, out)?;
                }
            }
            Node::Section {
                name,
                inverted,
                children,
            } => {
                let value = lookup(stack, name);
                let truthy = is_truthy(value);

                if *inverted {
                    if !truthy {
                        render_nodes(children, stack, out)?;
                    }
                    continue;
                }

                match value {
                    Some(Value::Array(items)) => {
                        for item in items {
                            stack.push(item);
                            render_nodes(children, stack, out)?;
                            stack.pop();
                        }
                    }
                    Some(value) if truthy => {
                        stack.push(value);
                        render_nodes(children, stack, out)?;
                        stack.pop();
                    }
                    _ => {}
                }
            }
        }
    }
    Ok(())
}
