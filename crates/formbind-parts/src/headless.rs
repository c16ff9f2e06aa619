#![forbid(unsafe_code)]

//! In-memory rendering surface.
//!
//! [`HeadlessSurface`] records every widget, the latest value of each
//! property, the parent links and the relayout requests it receives. Its
//! `Display` impl renders the widget tree as an indented outline:
//!
//! ```text
//! notebook
//!   page "General" icon=cog.png
//!     group "Network"
//!       integer "Port" = 8080 range=0..65535
//!       check "Use TLS" = true
//! ```

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use formbind_store::display_value;
use serde_json::Value;

use crate::part::PartKind;
use crate::surface::{Property, RenderSurface, WidgetHandle};

/// Everything a headless widget has been told.
#[derive(Clone, Debug, PartialEq)]
pub struct WidgetRecord {
    pub kind: PartKind,
    pub parent: Option<WidgetHandle>,
    pub children: Vec<WidgetHandle>,
    pub title: Option<String>,
    pub label: Option<String>,
    pub tooltip: Option<String>,
    pub visible: bool,
    pub icon: Option<String>,
    pub range: Option<(f64, f64)>,
    pub digits: Option<u32>,
    pub options: Vec<String>,
    pub value: Option<Value>,
    pub selection: Option<usize>,
    pub pages: BTreeMap<usize, String>,
    pub page_icons: BTreeMap<usize, String>,
    /// Number of properties applied so far.
    pub updates: usize,
}

impl WidgetRecord {
    fn new(kind: PartKind, parent: Option<WidgetHandle>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            title: None,
            label: None,
            tooltip: None,
            visible: true,
            icon: None,
            range: None,
            digits: None,
            options: Vec::new(),
            value: None,
            selection: None,
            pages: BTreeMap::new(),
            page_icons: BTreeMap::new(),
            updates: 0,
        }
    }

    fn apply(&mut self, property: Property) {
        self.updates += 1;
        match property {
            Property::Title(text) => self.title = Some(text),
            Property::Label(text) => self.label = Some(text),
            Property::Tooltip(tip) => self.tooltip = tip,
            Property::Visible(visible) => self.visible = visible,
            Property::Icon(icon) => self.icon = Some(icon),
            Property::Range { min, max } => self.range = Some((min, max)),
            Property::Digits(digits) => self.digits = Some(digits),
            Property::Options(options) => self.options = options,
            Property::Value(value) => self.value = Some(value),
            Property::Selection(index) => self.selection = index,
            Property::PageText { index, text } => {
                self.pages.insert(index, text);
            }
            Property::PageIcon { index, icon } => {
                self.page_icons.insert(index, icon);
            }
        }
    }

    /// The value as shown: fixed digits for real inputs, the selected label
    /// for choices.
    fn shown_value(&self) -> Option<String> {
        if self.kind == PartKind::Choice {
            return Some(
                self.selection
                    .and_then(|index| self.options.get(index))
                    .cloned()
                    .unwrap_or_else(|| "-".to_owned()),
            );
        }
        let value = self.value.as_ref()?;
        match (self.digits, value.as_f64()) {
            (Some(digits), Some(number)) => Some(format!("{number:.prec$}", prec = digits as usize)),
            _ => Some(display_value(value)),
        }
    }
}

/// A [`RenderSurface`] that keeps widgets in memory.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    widgets: Vec<WidgetRecord>,
    relayouts: Vec<WidgetHandle>,
}

impl HeadlessSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn widget(&self, handle: WidgetHandle) -> Option<&WidgetRecord> {
        self.widgets.get(handle.raw() as usize)
    }

    /// Number of widgets created since the last reset.
    #[must_use]
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Widgets without a parent, in creation order.
    pub fn roots(&self) -> impl Iterator<Item = WidgetHandle> + '_ {
        self.handles()
            .filter(move |handle| self.widgets[handle.raw() as usize].parent.is_none())
    }

    /// Every widget handle, in creation order.
    pub fn handles(&self) -> impl Iterator<Item = WidgetHandle> + '_ {
        (0..self.widgets.len()).map(|index| WidgetHandle::new(index as u32))
    }

    /// Handles of all widgets of `kind`, in creation order.
    #[must_use]
    pub fn find(&self, kind: PartKind) -> Vec<WidgetHandle> {
        self.handles()
            .filter(|handle| self.widgets[handle.raw() as usize].kind == kind)
            .collect()
    }

    /// The first widget whose title is `title`.
    #[must_use]
    pub fn find_titled(&self, title: &str) -> Option<WidgetHandle> {
        self.handles().find(|handle| {
            self.widgets[handle.raw() as usize].title.as_deref() == Some(title)
        })
    }

    /// Relayout requests received, oldest first.
    #[must_use]
    pub fn relayouts(&self) -> &[WidgetHandle] {
        &self.relayouts
    }

    fn outline(&self, out: &mut String, handle: WidgetHandle, depth: usize) -> fmt::Result {
        let Some(record) = self.widget(handle) else {
            return Ok(());
        };
        write!(out, "{:indent$}{}", "", record.kind, indent = depth * 2)?;
        if let Some(title) = &record.title {
            write!(out, " {title:?}")?;
        }
        if let Some(value) = record.shown_value() {
            write!(out, " = {value}")?;
        }
        if let Some((min, max)) = record.range {
            write!(out, " range={min}..{max}")?;
        }
        if let Some(label) = record.label.as_deref().filter(|label| !label.is_empty()) {
            write!(out, " label={label:?}")?;
        }
        if let Some(icon) = &record.icon {
            write!(out, " icon={icon}")?;
        }
        if !record.visible {
            out.push_str(" [hidden]");
        }
        out.push('\n');
        for child in &record.children {
            self.outline(out, *child, depth + 1)?;
        }
        Ok(())
    }
}

impl RenderSurface for HeadlessSurface {
    fn create(&mut self, kind: PartKind, parent: Option<WidgetHandle>) -> WidgetHandle {
        let handle = WidgetHandle::new(self.widgets.len() as u32);
        if let Some(record) = parent.and_then(|p| self.widgets.get_mut(p.raw() as usize)) {
            record.children.push(handle);
        }
        self.widgets.push(WidgetRecord::new(kind, parent));
        handle
    }

    fn apply(&mut self, handle: WidgetHandle, property: Property) {
        match self.widgets.get_mut(handle.raw() as usize) {
            Some(record) => record.apply(property),
            None => tracing::debug!(%handle, "property for unknown widget dropped"),
        }
    }

    fn parent(&self, handle: WidgetHandle) -> Option<WidgetHandle> {
        self.widget(handle).and_then(|record| record.parent)
    }

    fn relayout(&mut self, handle: WidgetHandle) {
        self.relayouts.push(handle);
    }

    fn reset(&mut self) {
        self.widgets.clear();
        self.relayouts.clear();
    }
}

impl fmt::Display for HeadlessSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for root in self.roots() {
            self.outline(&mut out, root, 0)?;
        }
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_links_parent_and_children() {
        let mut surface = HeadlessSurface::new();
        let root = surface.create(PartKind::Notebook, None);
        let page = surface.create(PartKind::Page, Some(root));
        assert_eq!(surface.parent(page), Some(root));
        assert_eq!(surface.widget(root).unwrap().children, vec![page]);
        assert_eq!(surface.roots().collect::<Vec<_>>(), vec![root]);
    }

    #[test]
    fn apply_keeps_latest_property() {
        let mut surface = HeadlessSurface::new();
        let w = surface.create(PartKind::Text, None);
        surface.apply(w, Property::Title("a".into()));
        surface.apply(w, Property::Title("b".into()));
        surface.apply(w, Property::PageText { index: 1, text: "x".into() });
        let record = surface.widget(w).unwrap();
        assert_eq!(record.title.as_deref(), Some("b"));
        assert_eq!(record.pages.get(&1).map(String::as_str), Some("x"));
        assert_eq!(record.updates, 3);
    }

    #[test]
    fn apply_to_unknown_widget_is_ignored() {
        let mut surface = HeadlessSurface::new();
        surface.apply(WidgetHandle::new(9), Property::Visible(false));
        assert!(surface.is_empty());
    }

    #[test]
    fn outline_renders_tree() {
        let mut surface = HeadlessSurface::new();
        let page = surface.create(PartKind::Page, None);
        surface.apply(page, Property::Title("General".into()));
        let real = surface.create(PartKind::Real, Some(page));
        surface.apply(real, Property::Title("Ratio".into()));
        surface.apply(real, Property::Digits(2));
        surface.apply(real, Property::Value(json!(0.5)));
        let choice = surface.create(PartKind::Choice, Some(page));
        surface.apply(choice, Property::Options(vec!["Low".into(), "High".into()]));
        surface.apply(choice, Property::Selection(Some(1)));
        surface.apply(choice, Property::Visible(false));

        let text = surface.to_string();
        assert_eq!(
            text,
            "page \"General\"\n  real \"Ratio\" = 0.50\n  choice = High [hidden]\n"
        );
    }

    #[test]
    fn reset_discards_everything() {
        let mut surface = HeadlessSurface::new();
        let w = surface.create(PartKind::Group, None);
        surface.relayout(w);
        surface.reset();
        assert!(surface.is_empty());
        assert!(surface.relayouts().is_empty());
        assert_eq!(surface.to_string(), "");
    }
}
