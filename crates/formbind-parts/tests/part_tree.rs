#![forbid(unsafe_code)]

//! Part tree behavior against the headless surface.

use std::cell::RefCell;
use std::rc::Rc;

use formbind_parts::{
    CheckInput, ChoiceInput, ChoiceOption, HeadlessSurface, IntegerInput, Notebook, OptionsGroup,
    Page, Part, PartError, PartKind, Property, RealInput, SharedSurface, Tab, TextInput, shared,
};
use formbind_store::{Bindable, Func, PathStore};
use proptest::prelude::*;
use serde_json::{Value, json};
use tracing_test::traced_test;

fn surfaces() -> (Rc<RefCell<HeadlessSurface>>, SharedSurface) {
    let headless = shared(HeadlessSurface::new());
    let surface: SharedSurface = headless.clone();
    (headless, surface)
}

fn value_of(headless: &Rc<RefCell<HeadlessSurface>>, title: &str) -> Option<Value> {
    let surface = headless.borrow();
    let handle = surface.find_titled(title)?;
    surface.widget(handle)?.value.clone()
}

#[test]
fn build_materializes_tree_once() {
    let store = PathStore::new();
    store.set("name", "alpha").unwrap();
    let (headless, surface) = surfaces();

    let page = Page::new(&store, "General").with_child(TextInput::new(&store, "Name", "name"));
    let root = page.build(&surface, None).unwrap();
    assert_eq!(page.handle(), Some(root));
    assert_eq!(headless.borrow().len(), 2);
    assert_eq!(value_of(&headless, "Name"), Some(json!("alpha")));

    assert_eq!(page.build(&surface, None), Err(PartError::AlreadyBuilt));
    assert_eq!(headless.borrow().len(), 2);
}

#[test]
fn outline_matches_document_shape() {
    let store = PathStore::new();
    store.update([
        ("port", json!(8080)),
        ("tls", json!(true)),
        ("ratio", json!(0.25)),
    ]);
    let (headless, surface) = surfaces();

    let notebook = Notebook::new(&store).with_child(
        Page::new(&store, "General").with_child(
            OptionsGroup::new(&store, "Network")
                .with_child(IntegerInput::new(&store, "Port", "port").max(65535i64))
                .with_child(CheckInput::new(&store, "Use TLS", "tls"))
                .with_child(RealInput::new(&store, "Ratio", "ratio").max(1.0f64)),
        ),
    );
    notebook.build(&surface, None).unwrap();

    let expected = "\
notebook
  page \"General\" icon=cog.png
    group \"Network\"
      integer \"Port\" = 8080 range=0..65535
      check \"Use TLS\" = true
      real \"Ratio\" = 0.25 range=0..1
";
    assert_eq!(headless.borrow().to_string(), expected);
}

#[test]
fn notebook_page_text_follows_child_title() {
    let store = PathStore::new();
    store.set("user", "ann").unwrap();
    let (headless, surface) = surfaces();

    let notebook = Notebook::new(&store)
        .with_child(Page::new(&store, "Static"))
        .with_child(Page::new(&store, Func::format("Profile of {user}")));
    let root = notebook.build(&surface, None).unwrap();

    let pages = |h: &Rc<RefCell<HeadlessSurface>>| h.borrow().widget(root).unwrap().pages.clone();
    assert_eq!(pages(&headless).get(&0).map(String::as_str), Some("Static"));
    assert_eq!(pages(&headless).get(&1).map(String::as_str), Some("Profile of ann"));

    store.set("user", "bob").unwrap();
    assert_eq!(pages(&headless).get(&1).map(String::as_str), Some("Profile of bob"));
}

#[test]
fn tab_shows_one_page_at_a_time() {
    let store = PathStore::new();
    let (headless, surface) = surfaces();

    let tab = Tab::new(&store, "Settings")
        .with_child(Page::new(&store, "One"))
        .with_child(Page::new(&store, "Two").icon("net.png"));
    let root = tab.build(&surface, None).unwrap();
    assert_eq!(tab.selected(), Some(0));

    let visible = |index: usize| {
        let handle = tab.children()[index].handle().unwrap();
        headless.borrow().widget(handle).unwrap().visible
    };
    assert!(visible(0));
    assert!(!visible(1));

    tab.select(1).unwrap();
    assert!(!visible(0));
    assert!(visible(1));
    assert_eq!(headless.borrow().relayouts().last(), Some(&root));

    let record = headless.borrow().widget(root).unwrap().clone();
    assert_eq!(record.page_icons.get(&1).map(String::as_str), Some("net.png"));
    assert_eq!(record.page_icons.get(&0).map(String::as_str), Some("cog.png"));

    assert_eq!(
        tab.select(5),
        Err(PartError::OutOfRange { index: 5, len: 2 })
    );
}

#[test]
fn select_before_build_fails() {
    let store = PathStore::new();
    let tab = Tab::new(&store, "T").with_child(Page::new(&store, "P"));
    assert_eq!(tab.select(0), Err(PartError::NotBuilt));
}

#[test]
fn group_visibility_change_relayouts_root() {
    let store = PathStore::new();
    store.set("mode", "basic").unwrap();
    let (headless, surface) = surfaces();

    let page = Page::new(&store, "P").with_child(
        OptionsGroup::new(&store, "Expert").visible(Func::equals("mode", "expert")),
    );
    let root = page.build(&surface, None).unwrap();
    let group = page.children()[0].handle().unwrap();
    assert!(!headless.borrow().widget(group).unwrap().visible);
    assert!(headless.borrow().relayouts().is_empty());

    store.set("mode", "expert").unwrap();
    assert!(headless.borrow().widget(group).unwrap().visible);
    assert_eq!(headless.borrow().relayouts(), &[root]);
}

#[test]
fn input_follows_store_and_writes_back() {
    let store = PathStore::new();
    store.set("host", "a.example").unwrap();
    let (headless, surface) = surfaces();

    let input = TextInput::new(&store, "Host", "host").label("(fqdn)");
    input.build(&surface, None).unwrap();
    assert_eq!(value_of(&headless, "Host"), Some(json!("a.example")));

    store.set("host", "b.example").unwrap();
    assert_eq!(value_of(&headless, "Host"), Some(json!("b.example")));

    input.on_value_changed("c.example").unwrap();
    assert_eq!(store.get("host").unwrap(), json!("c.example"));
    assert_eq!(value_of(&headless, "Host"), Some(json!("c.example")));
}

#[test]
fn nested_name_edits_nested_value() {
    let store = PathStore::new();
    store.set("server", json!({"port": 80})).unwrap();
    let (headless, surface) = surfaces();

    let input = IntegerInput::new(&store, "Port", "server.port").max(65535i64);
    input.build(&surface, None).unwrap();
    assert_eq!(input.shown(), Some(80));

    input.on_value_changed(8080).unwrap();
    assert_eq!(store.get("server.port").unwrap(), json!(8080));
    assert_eq!(value_of(&headless, "Port"), Some(json!(8080)));
}

#[test]
fn computed_name_retargets_input() {
    let store = PathStore::new();
    store.update([
        ("profile", json!("home")),
        ("home", json!({"proxy": "none"})),
        ("work", json!({"proxy": "corp:3128"})),
    ]);
    let (headless, surface) = surfaces();

    let input = TextInput::new(&store, "Proxy", Func::format("{profile}.proxy"));
    input.build(&surface, None).unwrap();
    assert_eq!(value_of(&headless, "Proxy"), Some(json!("none")));

    store.set("profile", "work").unwrap();
    assert_eq!(input.path().unwrap().to_string(), "work.proxy");
    assert_eq!(value_of(&headless, "Proxy"), Some(json!("corp:3128")));

    input.on_value_changed("direct").unwrap();
    assert_eq!(store.get("work.proxy").unwrap(), json!("direct"));
    assert_eq!(store.get("home.proxy").unwrap(), json!("none"));
}

#[test]
fn integer_range_change_reclamps_and_writes_back() {
    let store = PathStore::new();
    store.update([("limit", json!(50)), ("count", json!(40))]);
    let (headless, surface) = surfaces();

    let input = IntegerInput::new(&store, "Count", "count").max(Func::<i64>::bind("limit"));
    input.build(&surface, None).unwrap();
    assert_eq!(input.range(), (0, 50));
    assert_eq!(input.shown(), Some(40));

    store.set("limit", 10).unwrap();
    assert_eq!(input.range(), (0, 10));
    assert_eq!(input.shown(), Some(10));
    assert_eq!(store.get("count").unwrap(), json!(10));

    let surface_ref = headless.borrow();
    let handle = surface_ref.find_titled("Count").unwrap();
    assert_eq!(surface_ref.widget(handle).unwrap().range, Some((0.0, 10.0)));
}

#[test]
fn integer_shows_clamped_value_without_writing() {
    let store = PathStore::new();
    store.set("n", 500).unwrap();
    let (_headless, surface) = surfaces();

    let input = IntegerInput::new(&store, "N", "n");
    input.build(&surface, None).unwrap();
    assert_eq!(input.shown(), Some(100));
    assert_eq!(store.get("n").unwrap(), json!(500));
}

#[test]
fn real_input_writes_initial_value_on_build() {
    let store = PathStore::new();
    store.set("gain", 3).unwrap();
    let (headless, surface) = surfaces();

    let gain = RealInput::new(&store, "Gain", "gain").min(1.0f64).max(2.0f64);
    gain.build(&surface, None).unwrap();
    assert_eq!(gain.shown(), Some(2.0));
    assert_eq!(store.get("gain").unwrap(), json!(2.0));

    let surface_ref = headless.borrow();
    let record = surface_ref.widget(surface_ref.find_titled("Gain").unwrap()).unwrap();
    assert_eq!(record.digits, Some(2));
}

#[test]
fn real_input_creates_missing_key_at_lower_bound() {
    let store = PathStore::new();
    let (_headless, surface) = surfaces();
    RealInput::new(&store, "Offset", "offset")
        .min(-5.0f64)
        .build(&surface, None)
        .unwrap();
    assert_eq!(store.get("offset").unwrap(), json!(-5.0));
}

#[test]
fn choice_selection_tracks_ids() {
    let store = PathStore::new();
    store.set("level", "mid").unwrap();
    let (_headless, surface) = surfaces();

    let choice = ChoiceInput::new(&store, "Level", "level").choices([
        ("low", "Low"),
        ("mid", "Medium"),
        ("high", "High"),
    ]);
    choice.build(&surface, None).unwrap();
    assert_eq!(choice.selected(), Some(1));

    choice.select(2).unwrap();
    assert_eq!(store.get("level").unwrap(), json!("high"));
    assert_eq!(choice.selected(), Some(2));

    store.set("level", "unknown").unwrap();
    assert_eq!(choice.selected(), None);

    assert_eq!(
        choice.select(3),
        Err(PartError::OutOfRange { index: 3, len: 3 })
    );
}

#[test]
fn choice_options_from_store() {
    let store = PathStore::new();
    store.update([
        ("codecs", json!([["h264", "H.264"], {"id": "av1", "label": "AV1"}, "vp9"])),
        ("codec", json!("vp9")),
    ]);
    let (headless, surface) = surfaces();

    let choice = ChoiceInput::new(&store, "Codec", "codec")
        .options(Func::<Vec<ChoiceOption>>::bind("codecs"));
    let handle = choice.build(&surface, None).unwrap();
    assert_eq!(choice.option_ids(), vec![json!("h264"), json!("av1"), json!("vp9")]);
    assert_eq!(choice.selected(), Some(2));
    assert_eq!(
        headless.borrow().widget(handle).unwrap().options,
        vec!["H.264", "AV1", "vp9"]
    );

    store.set("codecs", json!(["vp9", "h264"])).unwrap();
    assert_eq!(choice.selected(), Some(0));
}

#[test]
fn check_toggle_writes_bool() {
    let store = PathStore::new();
    store.set("debug", false).unwrap();
    let (headless, surface) = surfaces();

    let check = CheckInput::new(&store, "Debug", "debug").tooltip("Verbose output");
    let handle = check.build(&surface, None).unwrap();
    assert_eq!(check.checked(), Some(false));
    assert_eq!(
        headless.borrow().widget(handle).unwrap().tooltip.as_deref(),
        Some("Verbose output")
    );
    check.on_toggled(true).unwrap();
    assert_eq!(store.get("debug").unwrap(), json!(true));
    assert_eq!(check.checked(), Some(true));
}

#[test]
fn tooltip_blank_means_none() {
    let store = PathStore::new();
    store.set("t", "").unwrap();
    let (headless, surface) = surfaces();
    let input = TextInput::new(&store, "T", "t").tooltip(Bindable::Computed(
        Func::<Option<String>>::bind("t"),
    ));
    let handle = input.build(&surface, None).unwrap();
    assert_eq!(headless.borrow().widget(handle).unwrap().tooltip, None);
    store.set("t", "hint").unwrap();
    assert_eq!(
        headless.borrow().widget(handle).unwrap().tooltip.as_deref(),
        Some("hint")
    );
}

#[traced_test]
#[test]
fn missing_key_leaves_presentation_unchanged() {
    let store = PathStore::new();
    store.set("a", "first").unwrap();
    let (headless, surface) = surfaces();
    let input = TextInput::new(&store, "A", "a");
    input.build(&surface, None).unwrap();

    store.clear();
    input.refresh(true);
    assert_eq!(value_of(&headless, "A"), Some(json!("first")));
    assert!(logs_contain("attribute unavailable"));
}

#[test]
fn refresh_recurses_children_first() {
    let store = PathStore::new();
    store.update([("a", json!("1")), ("b", json!(true))]);
    let (headless, surface) = surfaces();
    let page = Page::new(&store, "P")
        .with_child(TextInput::new(&store, "A", "a"))
        .with_child(CheckInput::new(&store, "B", "b"));
    page.build(&surface, None).unwrap();

    let before: Vec<usize> = headless
        .borrow()
        .handles()
        .map(|h| headless.borrow().widget(h).unwrap().updates)
        .collect();
    page.refresh(true);
    let after: Vec<usize> = headless
        .borrow()
        .handles()
        .map(|h| headless.borrow().widget(h).unwrap().updates)
        .collect();
    assert!(before.iter().zip(&after).all(|(b, a)| a > b));
}

#[test]
fn dropping_tree_releases_store_bindings() {
    let store = PathStore::new();
    store.update([("mode", json!("x")), ("v", json!(1))]);
    let (_headless, surface) = surfaces();
    {
        let page = Page::new(&store, Func::format("{mode}")).with_child(
            OptionsGroup::new(&store, "G")
                .visible(Func::equals("mode", "x"))
                .with_child(IntegerInput::new(&store, "V", "v")),
        );
        page.build(&surface, None).unwrap();
        assert!(store.binding_count("mode") >= 2);
        assert_eq!(store.binding_count("v"), 1);
    }
    assert_eq!(store.binding_count("mode"), 0);
    assert_eq!(store.binding_count("v"), 0);
}

#[test]
fn kinds_report_container_status() {
    assert!(PartKind::Notebook.is_container());
    assert!(!PartKind::Choice.is_container());
    assert_eq!(PartKind::Group.to_string(), "group");
    let _ = Property::Visible(true);
}

fn bound() -> impl Strategy<Value = f64> {
    prop_oneof![
        4 => -1.0e6..1.0e6f64,
        1 => Just(f64::NAN),
        1 => Just(f64::INFINITY),
        1 => Just(f64::NEG_INFINITY),
    ]
}

/// Expected display of `value` in `min..=max`: non-finite bounds are ignored
/// and an inverted range collapses to `min`.
fn bounded(value: f64, min: f64, max: f64) -> f64 {
    let mut value = value;
    if max.is_finite() && value > max {
        value = max;
    }
    if min.is_finite() && value < min {
        value = min;
    }
    value
}

proptest! {
    #[test]
    fn integer_clamp_is_total(
        min in any::<i64>(),
        max in any::<i64>(),
        stored in proptest::option::of(any::<i64>()),
    ) {
        let store = PathStore::new();
        if let Some(value) = stored {
            store.set("n", value).unwrap();
        }
        let (headless, surface) = surfaces();
        let input = IntegerInput::new(&store, "N", "n").min(min).max(max);
        input.build(&surface, None).unwrap();

        let expected = stored.map(|value| if value > max { max } else { value })
            .map(|value| if value < min { min } else { value });
        prop_assert_eq!(input.shown(), expected);
        if min > max {
            prop_assert!(expected.is_none() || expected == Some(min));
        }
        prop_assert_eq!(value_of(&headless, "N"), expected.map(Value::from));

        input.refresh(true);
        prop_assert_eq!(input.shown(), expected);
        prop_assert_eq!(store.get("n").ok(), stored.map(Value::from));
    }

    #[test]
    fn real_clamp_is_total_and_finite(
        min in bound(),
        max in bound(),
        stored in proptest::option::of(-1.0e6..1.0e6f64),
    ) {
        let store = PathStore::new();
        if let Some(value) = stored {
            store.set("x", value).unwrap();
        }
        let (_headless, surface) = surfaces();
        let input = RealInput::new(&store, "X", "x").min(min).max(max);
        input.build(&surface, None).unwrap();

        let origin = if min.is_finite() { min } else { 0.0 };
        let expected = bounded(stored.unwrap_or(origin), min, max);
        prop_assert!(expected.is_finite());
        if min.is_finite() && max.is_finite() && min > max {
            prop_assert_eq!(expected, min);
        }
        prop_assert_eq!(input.shown(), Some(expected));
        prop_assert_eq!(store.get("x").unwrap(), Value::from(expected));

        input.refresh(true);
        prop_assert_eq!(input.shown(), Some(expected));
        prop_assert_eq!(store.get("x").unwrap(), Value::from(expected));
    }
}
