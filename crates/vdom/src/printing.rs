use std::fmt;

use crate::document::Document;
use crate::element::VirtualElement;
use actions::{AttrMap, ElementId};
use serde_json::{Map, Value, json};

// -----------------------
// Module-scope helpers
// -----------------------

fn map_to_json(map: &AttrMap) -> Value {
    let mut object = Map::new();
    for (key, value) in map.iter() {
        object.insert(key.to_owned(), Value::String(value.to_owned()));
    }
    Value::Object(object)
}

fn element_to_json(document: &Document, element: &VirtualElement) -> Value {
    let children: Vec<Value> = element
        .children()
        .iter()
        .filter_map(|child| document.registry.get(*child))
        .map(|child| element_to_json(document, child))
        .collect();
    let mut node = json!({
        "id": element.id().0,
        "tag": element.tag(),
        "class": element.class().name,
        "realized": element.is_realized(),
    });
    if let Value::Object(fields) = &mut node {
        if !element.state().attrs.is_empty() {
            fields.insert("attrs".to_owned(), map_to_json(&element.state().attrs));
        }
        if !element.state().styles.is_empty() {
            fields.insert("styles".to_owned(), map_to_json(&element.state().styles));
        }
        if !element.state().events.is_empty() {
            fields.insert("events".to_owned(), json!(element.state().events));
        }
        if element.is_group() {
            fields.insert("children".to_owned(), Value::Array(children));
        }
    }
    node
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out
}

impl Document {
    /// Deterministic JSON view of the virtual tree:
    /// `{ "id", "tag", "class", "realized", "attrs"?, "styles"?, "events"?, "children"? }`.
    pub fn to_json_value(&self) -> Value {
        self.registry
            .get(ElementId::DOCUMENT)
            .map_or(Value::Null, |root| element_to_json(self, root))
    }

    /// Pretty JSON string for snapshots and test comparisons.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(&self.to_json_value()).unwrap_or_else(|_| String::from("{}"))
    }

    /// Indented markup-like outline of the tree.
    pub const fn outline(&self) -> Outline<'_> {
        Outline(self)
    }
}

/// Display adapter returned by [`Document::outline`].
pub struct Outline<'doc>(&'doc Document);

impl fmt::Display for Outline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_node(document: &Document, id: ElementId, out: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
            let Some(element) = document.registry.get(id) else {
                return Ok(());
            };
            for _ in 0..depth {
                out.write_str("  ")?;
            }
            write!(out, "<{} {}", element.tag(), element.id())?;
            for (key, value) in element.state().attrs.iter() {
                write!(out, " {key}=\"{}\"", escape_text(value))?;
            }
            match element.render_handle() {
                Some(handle) => writeln!(out, "> {handle}")?,
                None => writeln!(out, "> (unrealized)")?,
            }
            for child in element.children() {
                write_node(document, *child, out, depth + 1)?;
            }
            Ok(())
        }

        write_node(self.0, ElementId::DOCUMENT, f, 0)
    }
}
