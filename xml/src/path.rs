//! Minimal path expressions over [`Element`] trees.
//!
//! Only the subset the XML Store glue needs is supported:
//! - absolute (`/a/b`) and descendant (`//tuple`) location paths
//! - steps `name`, `*`, `.`, `..`, `@name` and `text()`
//! - predicates `[n]`, `[@a='v']`, `[@a]` and `[child='v']`
//!
//! Results are returned in document order without duplicates.

use thiserror::Error;

use crate::dom::{Element, Node, NodePath};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid path `{expr}`: {reason}")]
pub struct PathError {
    pub expr: String,
    pub reason: &'static str,
}

impl PathError {
    fn new(expr: &str, reason: &'static str) -> Self {
        Self {
            expr: expr.to_string(),
            reason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    /// `//`: descendant-or-self, then child.
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Name(String),
    Any,
    SelfNode,
    Parent,
    Attribute(String),
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    AttrEquals(String, String),
    AttrExists(String),
    ChildEquals(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

/// A compiled path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPath {
    absolute: bool,
    steps: Vec<Step>,
}

/// What a selection points at on its node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    Element,
    Attribute(String),
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Selection {
    pub node: NodePath,
    pub target: Target,
}

impl XPath {
    pub fn parse(expr: &str) -> Result<Self, PathError> {
        let chars: Vec<char> = expr.trim().chars().collect();
        if chars.is_empty() {
            return Err(PathError::new(expr, "empty expression"));
        }

        let mut pos = 0;
        let mut absolute = false;
        let mut axis = Axis::Child;
        if chars.starts_with(&['/', '/']) {
            absolute = true;
            axis = Axis::Descendant;
            pos = 2;
        } else if chars[0] == '/' {
            absolute = true;
            pos = 1;
            if chars.len() == 1 {
                return Ok(Self {
                    absolute,
                    steps: Vec::new(),
                });
            }
        }

        let mut steps = Vec::new();
        loop {
            let (step, next) = parse_step(expr, &chars, pos, axis)?;
            steps.push(step);
            pos = next;
            if pos == chars.len() {
                break;
            }
            // parse_step stops only at '/' or end of input.
            if chars.get(pos + 1) == Some(&'/') {
                axis = Axis::Descendant;
                pos += 2;
            } else {
                axis = Axis::Child;
                pos += 1;
            }
            if pos >= chars.len() {
                return Err(PathError::new(expr, "trailing separator"));
            }
        }

        let last = steps.len() - 1;
        for (i, step) in steps.iter().enumerate() {
            let terminal = matches!(step.test, NodeTest::Attribute(_) | NodeTest::Text);
            if terminal && i != last {
                return Err(PathError::new(
                    expr,
                    "attribute and text() steps must come last",
                ));
            }
        }

        Ok(Self { absolute, steps })
    }
}

fn parse_step(
    expr: &str,
    chars: &[char],
    start: usize,
    axis: Axis,
) -> Result<(Step, usize), PathError> {
    let mut pos = start;
    while pos < chars.len() && chars[pos] != '/' && chars[pos] != '[' {
        if chars[pos] == ']' {
            return Err(PathError::new(expr, "unbalanced `]`"));
        }
        pos += 1;
    }
    let raw: String = chars[start..pos].iter().collect();
    let raw = raw.trim();
    let test = match raw {
        "" => return Err(PathError::new(expr, "empty step")),
        "." => NodeTest::SelfNode,
        ".." => NodeTest::Parent,
        "*" => NodeTest::Any,
        "text()" => NodeTest::Text,
        _ => {
            if let Some(name) = raw.strip_prefix('@') {
                if name.is_empty() {
                    return Err(PathError::new(expr, "missing attribute name"));
                }
                NodeTest::Attribute(name.to_string())
            } else {
                NodeTest::Name(raw.to_string())
            }
        }
    };

    let mut predicates = Vec::new();
    while pos < chars.len() && chars[pos] == '[' {
        let close = find_predicate_end(chars, pos + 1)
            .ok_or_else(|| PathError::new(expr, "unterminated predicate"))?;
        let body: String = chars[pos + 1..close].iter().collect();
        predicates.push(parse_predicate(expr, body.trim())?);
        pos = close + 1;
    }
    if pos < chars.len() && chars[pos] != '/' {
        return Err(PathError::new(expr, "unexpected text after predicate"));
    }
    if !predicates.is_empty() && matches!(test, NodeTest::Attribute(_) | NodeTest::Text) {
        return Err(PathError::new(
            expr,
            "predicates are not supported on attribute or text() steps",
        ));
    }

    Ok((
        Step {
            axis,
            test,
            predicates,
        },
        pos,
    ))
}

fn find_predicate_end(chars: &[char], from: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (offset, ch) in chars[from..].iter().enumerate() {
        match (quote, *ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(*ch),
            (None, ']') => return Some(from + offset),
            (None, _) => {}
        }
    }
    None
}

fn parse_predicate(expr: &str, body: &str) -> Result<Predicate, PathError> {
    if body.is_empty() {
        return Err(PathError::new(expr, "empty predicate"));
    }
    if body.chars().all(|c| c.is_ascii_digit()) {
        let position: usize = body
            .parse()
            .map_err(|_| PathError::new(expr, "position out of range"))?;
        if position == 0 {
            return Err(PathError::new(expr, "positions start at 1"));
        }
        return Ok(Predicate::Position(position));
    }

    let unquoted_head = body.split(['\'', '"']).next().unwrap_or(body);
    if unquoted_head.contains(['!', '<', '>']) {
        return Err(PathError::new(expr, "only `=` comparisons are supported"));
    }

    if let Some((lhs, rhs)) = body.split_once('=') {
        let lhs = lhs.trim();
        let value = unquote(rhs.trim())
            .ok_or_else(|| PathError::new(expr, "comparison value must be quoted"))?;
        if let Some(attr) = lhs.strip_prefix('@') {
            if attr.is_empty() {
                return Err(PathError::new(expr, "missing attribute name"));
            }
            return Ok(Predicate::AttrEquals(attr.to_string(), value.to_string()));
        }
        if lhs.is_empty() || lhs.contains(['/', '[', '*']) {
            return Err(PathError::new(expr, "unsupported predicate"));
        }
        return Ok(Predicate::ChildEquals(lhs.to_string(), value.to_string()));
    }

    if let Some(attr) = body.strip_prefix('@')
        && !attr.is_empty()
    {
        return Ok(Predicate::AttrExists(attr.to_string()));
    }

    Err(PathError::new(expr, "unsupported predicate"))
}

fn unquote(value: &str) -> Option<&str> {
    let inner = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))?;
    Some(inner)
}

// ============================================================================
// Evaluation
// ============================================================================

/// Evaluates `xpath` against the tree rooted at `top` from `context`.
pub(crate) fn evaluate(top: &Element, context: &NodePath, xpath: &XPath) -> Vec<Selection> {
    let mut current = if xpath.absolute {
        vec![NodePath::document()]
    } else {
        vec![context.clone()]
    };

    if xpath.steps.is_empty() {
        return current
            .into_iter()
            .map(|node| Selection {
                node,
                target: Target::Element,
            })
            .collect();
    }

    for step in &xpath.steps {
        let bases: Vec<NodePath> = match step.axis {
            Axis::Child => current,
            Axis::Descendant => {
                let mut all = Vec::new();
                for node in &current {
                    descendants_or_self(top, node, &mut all);
                }
                all.sort();
                all.dedup();
                all
            }
        };

        match &step.test {
            NodeTest::Attribute(name) => {
                let mut out: Vec<Selection> = bases
                    .into_iter()
                    .filter(|node| {
                        top.element_at(node)
                            .is_some_and(|e| e.attr(name).is_some())
                    })
                    .map(|node| Selection {
                        node,
                        target: Target::Attribute(name.clone()),
                    })
                    .collect();
                out.sort();
                out.dedup();
                return out;
            }
            NodeTest::Text => {
                let mut out: Vec<Selection> = bases
                    .into_iter()
                    .filter(|node| top.element_at(node).is_some_and(Element::has_text_child))
                    .map(|node| Selection {
                        node,
                        target: Target::Text,
                    })
                    .collect();
                out.sort();
                out.dedup();
                return out;
            }
            _ => {}
        }

        let mut next = Vec::new();
        for base in &bases {
            let mut matched = apply_test(top, base, &step.test);
            for predicate in &step.predicates {
                matched = apply_predicate(top, matched, predicate);
            }
            next.extend(matched);
        }
        next.sort();
        next.dedup();
        current = next;
    }

    current
        .into_iter()
        .map(|node| Selection {
            node,
            target: Target::Element,
        })
        .collect()
}

fn element_children<'a>(top: &'a Element, node: &NodePath) -> Vec<(NodePath, &'a Element)> {
    if node.is_document() {
        return vec![(NodePath::root(), top)];
    }
    let Some(element) = top.element_at(node) else {
        return Vec::new();
    };
    element
        .children()
        .iter()
        .enumerate()
        .filter_map(|(index, child)| match child {
            Node::Element(e) => Some((node.child(index), e)),
            Node::Text(_) => None,
        })
        .collect()
}

fn descendants_or_self(top: &Element, node: &NodePath, out: &mut Vec<NodePath>) {
    out.push(node.clone());
    for (child, _) in element_children(top, node) {
        descendants_or_self(top, &child, out);
    }
}

fn apply_test(top: &Element, base: &NodePath, test: &NodeTest) -> Vec<NodePath> {
    match test {
        NodeTest::SelfNode => vec![base.clone()],
        NodeTest::Parent => base.parent().into_iter().collect(),
        NodeTest::Any => element_children(top, base)
            .into_iter()
            .map(|(path, _)| path)
            .collect(),
        NodeTest::Name(name) => element_children(top, base)
            .into_iter()
            .filter(|(_, e)| e.name() == name)
            .map(|(path, _)| path)
            .collect(),
        NodeTest::Attribute(_) | NodeTest::Text => Vec::new(),
    }
}

fn apply_predicate(top: &Element, nodes: Vec<NodePath>, predicate: &Predicate) -> Vec<NodePath> {
    match predicate {
        Predicate::Position(position) => nodes.into_iter().nth(position - 1).into_iter().collect(),
        Predicate::AttrEquals(name, value) => nodes
            .into_iter()
            .filter(|node| top.element_at(node).and_then(|e| e.attr(name)) == Some(value.as_str()))
            .collect(),
        Predicate::AttrExists(name) => nodes
            .into_iter()
            .filter(|node| {
                top.element_at(node)
                    .is_some_and(|e| e.attr(name).is_some())
            })
            .collect(),
        Predicate::ChildEquals(name, value) => nodes
            .into_iter()
            .filter(|node| {
                top.element_at(node).is_some_and(|e| {
                    e.child_elements()
                        .any(|c| c.name() == name && c.text() == *value)
                })
            })
            .collect(),
    }
}

/// Text value of a selection.
pub(crate) fn selection_value(top: &Element, selection: &Selection) -> Option<String> {
    let element = top.element_at(&selection.node)?;
    match &selection.target {
        Target::Element => Some(element.text()),
        Target::Attribute(name) => element.attr(name).map(ToString::to_string),
        Target::Text => Some(element.direct_text()),
    }
}
