#![forbid(unsafe_code)]

//! Attribute-to-widget plumbing shared by containers and inputs.

use formbind_store::{Attribute, StoreError};
use tracing::{debug, warn};

/// Log an attribute that could not be read. Missing keys are expected while a
/// document is half loaded; anything else is a declaration error.
pub(crate) fn report(what: &'static str, err: &StoreError) {
    if err.is_key_not_found() {
        debug!(attribute = what, error = %err, "attribute unavailable; presentation unchanged");
    } else {
        warn!(attribute = what, error = %err, "attribute unreadable; presentation unchanged");
    }
}

/// Current value of `attr`, or `None` after logging why not.
pub(crate) fn current<T: Clone + 'static>(attr: &Attribute<T>, what: &'static str) -> Option<T> {
    attr.value().map_err(|err| report(what, &err)).ok()
}

/// Register `apply` on `attr` and run it once with the current value.
///
/// An unreadable initial value is logged; the handler stays registered and
/// takes over once the value becomes readable.
pub(crate) fn present<T: Clone + 'static>(
    attr: &Attribute<T>,
    what: &'static str,
    apply: impl Fn(&T) + 'static,
) {
    if let Err(err) = attr.add_handler(apply, true) {
        report(what, &err);
    }
}

/// Blank tooltips mean no tooltip.
pub(crate) fn tooltip_text(tooltip: Option<&str>) -> Option<String> {
    tooltip.filter(|text| !text.is_empty()).map(str::to_owned)
}
