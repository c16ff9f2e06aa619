#![forbid(unsafe_code)]

//! Container parts: notebooks, tab navigators, pages and option groups.

use std::cell::Cell;
use std::rc::Rc;

use formbind_store::{Attribute, Bindable, PathStore};

use crate::bind::{current, present};
use crate::error::PartError;
use crate::part::{Part, PartBase, PartKind};
use crate::surface::{Property, SharedSurface, WidgetHandle, WidgetRef};

/// Keep the navigator entry at `index` in sync with a child's title and icon.
fn label_page(navigator: &WidgetRef, child: &dyn Part, index: usize) {
    if let Some(title) = child.title() {
        let nav = navigator.clone();
        present(title, "title", move |text: &String| {
            nav.apply(Property::PageText {
                index,
                text: text.clone(),
            });
        });
    }
}

// ---------------------------------------------------------------------------
// Notebook
// ---------------------------------------------------------------------------

/// Top-level container showing each child as a captioned page.
pub struct Notebook {
    base: PartBase,
}

impl Notebook {
    #[must_use]
    pub fn new(store: &PathStore) -> Self {
        Self {
            base: PartBase::new(store),
        }
    }

    #[must_use]
    pub fn with_child(mut self, child: impl Part + 'static) -> Self {
        self.push(Box::new(child));
        self
    }

    pub fn push(&mut self, child: Box<dyn Part>) {
        self.base.add_child(child);
    }
}

impl Part for Notebook {
    fn kind(&self) -> PartKind {
        PartKind::Notebook
    }

    fn base(&self) -> &PartBase {
        &self.base
    }

    fn build(
        &self,
        surface: &SharedSurface,
        parent: Option<WidgetHandle>,
    ) -> Result<WidgetHandle, PartError> {
        let widget = self.base.create_widget(PartKind::Notebook, surface, parent)?;
        self.base.build_children(surface, widget.handle())?;
        for (index, child) in self.base.children().iter().enumerate() {
            label_page(&widget, child.as_ref(), index);
        }
        Ok(widget.handle())
    }
}

// ---------------------------------------------------------------------------
// Tab
// ---------------------------------------------------------------------------

/// A navigator listing child pages, showing one at a time.
///
/// The first page is selected when the tab is built.
pub struct Tab {
    base: PartBase,
    title: Attribute<String>,
    selected: Rc<Cell<Option<usize>>>,
}

impl Tab {
    pub fn new(store: &PathStore, title: impl Into<Bindable<String>>) -> Self {
        Self {
            title: Attribute::new(store, title),
            base: PartBase::new(store),
            selected: Rc::new(Cell::new(None)),
        }
    }

    #[must_use]
    pub fn with_child(mut self, child: impl Part + 'static) -> Self {
        self.push(Box::new(child));
        self
    }

    pub fn push(&mut self, child: Box<dyn Part>) {
        self.base.add_child(child);
    }

    /// Index of the page currently shown.
    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected.get()
    }

    /// Show the page at `index`, hide every other page, then relayout.
    pub fn select(&self, index: usize) -> Result<(), PartError> {
        let widget = self.base.require_widget()?;
        let children = self.base.children();
        if index >= children.len() {
            return Err(PartError::OutOfRange {
                index,
                len: children.len(),
            });
        }
        for (i, child) in children.iter().enumerate() {
            if let Some(handle) = child.handle() {
                widget.apply_to(handle, Property::Visible(i == index));
            }
        }
        widget.apply(Property::Selection(Some(index)));
        self.selected.set(Some(index));
        tracing::debug!(index, "tab page selected");
        self.layout();
        Ok(())
    }
}

impl Part for Tab {
    fn kind(&self) -> PartKind {
        PartKind::Tab
    }

    fn base(&self) -> &PartBase {
        &self.base
    }

    fn title(&self) -> Option<&Attribute<String>> {
        Some(&self.title)
    }

    fn build(
        &self,
        surface: &SharedSurface,
        parent: Option<WidgetHandle>,
    ) -> Result<WidgetHandle, PartError> {
        let widget = self.base.create_widget(PartKind::Tab, surface, parent)?;
        let own = widget.clone();
        present(&self.title, "title", move |text: &String| {
            own.apply(Property::Title(text.clone()));
        });

        let pages = self.base.build_children(surface, widget.handle())?;
        for (index, (child, page)) in self.base.children().iter().zip(&pages).enumerate() {
            widget.apply_to(*page, Property::Visible(false));
            label_page(&widget, child.as_ref(), index);
            if let Some(icon) = child.icon() {
                let nav = widget.clone();
                present(icon, "icon", move |name: &String| {
                    nav.apply(Property::PageIcon {
                        index,
                        icon: name.clone(),
                    });
                });
            }
        }
        if !pages.is_empty() {
            self.select(0)?;
        }
        Ok(widget.handle())
    }

    fn refresh_self(&self) {
        if let (Some(widget), Some(title)) = (self.base.widget(), current(&self.title, "title")) {
            widget.apply(Property::Title(title));
        }
    }
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// Default icon of a page in a tab navigator.
pub const DEFAULT_PAGE_ICON: &str = "cog.png";

/// A scrollable column of parts.
pub struct Page {
    base: PartBase,
    title: Attribute<String>,
    icon: Attribute<String>,
}

impl Page {
    pub fn new(store: &PathStore, title: impl Into<Bindable<String>>) -> Self {
        Self {
            title: Attribute::new(store, title),
            icon: Attribute::constant(DEFAULT_PAGE_ICON.to_owned()),
            base: PartBase::new(store),
        }
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<Bindable<String>>) -> Self {
        self.icon = Attribute::new(self.base.store(), icon);
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: impl Part + 'static) -> Self {
        self.push(Box::new(child));
        self
    }

    pub fn push(&mut self, child: Box<dyn Part>) {
        self.base.add_child(child);
    }
}

impl Part for Page {
    fn kind(&self) -> PartKind {
        PartKind::Page
    }

    fn base(&self) -> &PartBase {
        &self.base
    }

    fn title(&self) -> Option<&Attribute<String>> {
        Some(&self.title)
    }

    fn icon(&self) -> Option<&Attribute<String>> {
        Some(&self.icon)
    }

    fn build(
        &self,
        surface: &SharedSurface,
        parent: Option<WidgetHandle>,
    ) -> Result<WidgetHandle, PartError> {
        let widget = self.base.create_widget(PartKind::Page, surface, parent)?;
        let own = widget.clone();
        present(&self.title, "title", move |text: &String| {
            own.apply(Property::Title(text.clone()));
        });
        let own = widget.clone();
        present(&self.icon, "icon", move |name: &String| {
            own.apply(Property::Icon(name.clone()));
        });
        self.base.build_children(surface, widget.handle())?;
        Ok(widget.handle())
    }

    fn refresh_self(&self) {
        let Some(widget) = self.base.widget() else {
            return;
        };
        if let Some(title) = current(&self.title, "title") {
            widget.apply(Property::Title(title));
        }
        if let Some(icon) = current(&self.icon, "icon") {
            widget.apply(Property::Icon(icon));
        }
    }
}

// ---------------------------------------------------------------------------
// OptionsGroup
// ---------------------------------------------------------------------------

/// A titled box around related inputs that can be shown or hidden.
pub struct OptionsGroup {
    base: PartBase,
    title: Attribute<String>,
    visible: Attribute<bool>,
}

impl OptionsGroup {
    pub fn new(store: &PathStore, title: impl Into<Bindable<String>>) -> Self {
        Self {
            title: Attribute::new(store, title),
            visible: Attribute::constant(true),
            base: PartBase::new(store),
        }
    }

    #[must_use]
    pub fn visible(mut self, visible: impl Into<Bindable<bool>>) -> Self {
        self.visible = Attribute::new(self.base.store(), visible);
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: impl Part + 'static) -> Self {
        self.push(Box::new(child));
        self
    }

    pub fn push(&mut self, child: Box<dyn Part>) {
        self.base.add_child(child);
    }

    #[must_use]
    pub fn visibility(&self) -> &Attribute<bool> {
        &self.visible
    }
}

impl Part for OptionsGroup {
    fn kind(&self) -> PartKind {
        PartKind::Group
    }

    fn base(&self) -> &PartBase {
        &self.base
    }

    fn title(&self) -> Option<&Attribute<String>> {
        Some(&self.title)
    }

    fn build(
        &self,
        surface: &SharedSurface,
        parent: Option<WidgetHandle>,
    ) -> Result<WidgetHandle, PartError> {
        let widget = self.base.create_widget(PartKind::Group, surface, parent)?;
        let own = widget.clone();
        present(&self.title, "title", move |text: &String| {
            own.apply(Property::Title(text.clone()));
        });

        // Initial visibility is applied without a relayout; later changes
        // relayout from the root.
        if let Some(visible) = current(&self.visible, "visible") {
            widget.apply(Property::Visible(visible));
        }
        let own = widget.clone();
        self.visible.add_handler(
            move |visible: &bool| {
                own.apply(Property::Visible(*visible));
                own.relayout_root();
            },
            false,
        )?;

        self.base.build_children(surface, widget.handle())?;
        Ok(widget.handle())
    }

    fn refresh_self(&self) {
        let Some(widget) = self.base.widget() else {
            return;
        };
        if let Some(title) = current(&self.title, "title") {
            widget.apply(Property::Title(title));
        }
        if let Some(visible) = current(&self.visible, "visible") {
            widget.apply(Property::Visible(visible));
        }
    }
}
