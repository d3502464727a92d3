//! Application definitions for opening pages in the host shell.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use xstore_xml::Element;

const DEFAULT_EXTENT: i64 = 100;
const MODAL_FRAME: &str = "_modal";
const MAIN_FRAME: &str = "main";

fn feature_regex() -> &'static Regex {
    static FEATURE: OnceLock<Regex> = OnceLock::new();
    FEATURE.get_or_init(|| {
        Regex::new(r"\s*(\w+)\s*:\s*([\d\w]+)\s*(?:,|;|$)").expect("valid feature regex")
    })
}

/// `name:value` pairs of a window features string; later pairs win.
#[must_use]
pub fn parse_features(features: &str) -> BTreeMap<String, String> {
    feature_regex()
        .captures_iter(features)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

/// Leading decimal integer of `value`, ignoring what follows (`"300px"` is 300).
fn leading_int(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// Placement of a docked page; absent extents default to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    pub docked: bool,
    pub left: Option<i64>,
    pub top: Option<i64>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

/// A page to open, rendered as an `Application` element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplicationDefinition {
    url: String,
    frame: String,
    id: String,
    caption: String,
    description: String,
    features: Option<String>,
    placement: Option<Placement>,
}

impl ApplicationDefinition {
    pub fn new(url: impl Into<String>, frame: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            frame: frame.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_features(mut self, features: impl Into<String>) -> Self {
        self.features = Some(features.into());
        self
    }

    #[must_use]
    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = Some(placement);
        self
    }

    /// URL as it will be opened: a bare file name is resolved against the
    /// directory of `current_page_path`.
    #[must_use]
    pub fn resolved_url(&self, current_page_path: &str) -> String {
        if self.url.contains('/') {
            return self.url.clone();
        }
        let directory = current_page_path
            .rfind('/')
            .map_or("", |pos| &current_page_path[..pos]);
        format!("{directory}/{}", self.url)
    }

    /// Renders `<Application><id/><description/><caption/><url/><frame/></Application>`.
    ///
    /// Modal pages open in the main frame undocked, positioned by the
    /// `dialogLeft`, `dialogTop`, `dialogWidth` and `dialogHeight` features.
    #[must_use]
    pub fn to_element(&self, current_page_path: &str) -> Element {
        let mut frame = Element::new("frame").with_text(self.frame.as_str());
        if let Some(features) = &self.features {
            frame.set_attr("features", features.as_str());
        }
        if let Some(placement) = &self.placement {
            frame.set_attr("docked", if placement.docked { "true" } else { "false" });
            for (name, value) in [
                ("left", placement.left),
                ("top", placement.top),
                ("width", placement.width),
                ("height", placement.height),
            ] {
                frame.set_attr(name, value.unwrap_or(DEFAULT_EXTENT).to_string());
            }
        }
        if self.frame == MODAL_FRAME {
            frame.set_text(MAIN_FRAME);
            frame.set_attr("docked", "false");
            let features = parse_features(self.features.as_deref().unwrap_or_default());
            for (feature, name) in [
                ("dialogLeft", "left"),
                ("dialogTop", "top"),
                ("dialogWidth", "width"),
                ("dialogHeight", "height"),
            ] {
                if let Some(value) = features.get(feature).and_then(|v| leading_int(v)) {
                    frame.set_attr(name, value.to_string());
                }
            }
        }

        Element::new("Application")
            .with_child(Element::new("id").with_text(self.id.as_str()))
            .with_child(Element::new("description").with_text(self.description.as_str()))
            .with_child(Element::new("caption").with_text(self.caption.as_str()))
            .with_child(Element::new("url").with_text(self.resolved_url(current_page_path)))
            .with_child(frame)
    }
}

/// Rewrites the `features` attribute of the definition's `frame`.
///
/// Existing `name:value` entries are updated in place; new names are appended
/// in the order given. Returns `false` when there is no `frame` child.
pub fn change_window_features(definition: &mut Element, updates: &[(&str, &str)]) -> bool {
    let Some(frame) = definition.first_child_mut("frame") else {
        return false;
    };

    let mut entries: Vec<String> = frame
        .attr("features")
        .map(|features| {
            features
                .split(';')
                .filter(|entry| !entry.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    for (name, value) in updates {
        let existing = entries
            .iter_mut()
            .find(|entry| entry.split(':').next() == Some(*name));
        match existing {
            Some(entry) => *entry = format!("{name}:{value}"),
            None => entries.push(format!("{name}:{value}")),
        }
    }

    frame.set_attr("features", entries.join(";"));
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_definition() {
        let element = ApplicationDefinition::new("edit.htm", "content")
            .with_id("editor")
            .with_caption("Edit")
            .with_description("Edit a document")
            .to_element("/cordys/app/list.htm");
        assert_eq!(
            element.to_xml_string(),
            "<Application><id>editor</id><description>Edit a document</description>\
             <caption>Edit</caption><url>/cordys/app/edit.htm</url><frame>content</frame></Application>"
        );
    }

    #[test]
    fn url_with_slash_kept() {
        let def = ApplicationDefinition::new("/other/page.htm", "main");
        assert_eq!(def.resolved_url("/cordys/app/list.htm"), "/other/page.htm");
        assert_eq!(ApplicationDefinition::new("p.htm", "main").resolved_url("list.htm"), "/p.htm");
    }

    #[test]
    fn docked_placement_defaults() {
        let element = ApplicationDefinition::new("/p.htm", "main")
            .with_placement(Placement {
                docked: true,
                width: Some(640),
                ..Placement::default()
            })
            .to_element("/");
        let frame = element.first_child("frame").unwrap();
        assert_eq!(frame.attr("docked"), Some("true"));
        assert_eq!(frame.attr("left"), Some("100"));
        assert_eq!(frame.attr("width"), Some("640"));
        assert_eq!(frame.attr("height"), Some("100"));
    }

    #[test]
    fn modal_frame_uses_dialog_features() {
        let element = ApplicationDefinition::new("/p.htm", "_modal")
            .with_features("dialogWidth:400px; dialogHeight: 300px, dialogLeft:x1; resizable:yes")
            .to_element("/");
        let frame = element.first_child("frame").unwrap();
        assert_eq!(frame.text(), "main");
        assert_eq!(frame.attr("docked"), Some("false"));
        assert_eq!(frame.attr("width"), Some("400"));
        assert_eq!(frame.attr("height"), Some("300"));
        assert_eq!(frame.attr("left"), None);
        assert_eq!(frame.attr("top"), None);
    }

    #[test]
    fn features_split_on_commas_and_semicolons() {
        let features = parse_features("a:1;b : two,c:3");
        assert_eq!(features.get("a").map(String::as_str), Some("1"));
        assert_eq!(features.get("b").map(String::as_str), Some("two"));
        assert_eq!(features.get("c").map(String::as_str), Some("3"));
    }

    #[test]
    fn leading_int_ignores_unit_suffix() {
        assert_eq!(leading_int("300px"), Some(300));
        assert_eq!(leading_int("-5"), Some(-5));
        assert_eq!(leading_int("px"), None);
    }

    #[test]
    fn change_window_features_updates_and_appends() {
        let mut def = ApplicationDefinition::new("/p.htm", "main")
            .with_features("width:100;height:200")
            .to_element("/");
        assert!(change_window_features(&mut def, &[("height", "50"), ("zoom", "2")]));
        assert_eq!(
            def.first_child("frame").unwrap().attr("features"),
            Some("width:100;height:50;zoom:2")
        );
    }

    #[test]
    fn change_window_features_without_frame() {
        let mut element = Element::new("Application");
        assert!(!change_window_features(&mut element, &[("a", "1")]));
    }
}
