//! Attribute-level diff for one matched element.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use crate::host::{Host, HostHandler, HostId, PropValue};
use crate::node::{AttrMap, AttrValue, Event, ListenerFn};
use crate::runtime::PatchCtx;
use crate::value::format_float;

/// Applies the attribute diff between `old` and `new` to the host element.
///
/// Writes only what changed; re-applying an identical attribute set is a
/// no-op on the host.
pub(crate) fn patch_attributes<H: Host + ?Sized>(
    host: &mut H,
    id: HostId,
    old: Option<&AttrMap>,
    new: Option<&AttrMap>,
    ctx: &PatchCtx,
) -> Result<(), crate::host::HostError> {
    let empty = AttrMap::new();
    let old = old.unwrap_or(&empty);
    let new = new.unwrap_or(&empty);

    for (name, value) in new {
        let prior = old.get(name);
        if let AttrValue::Listener(handler) = value {
            match prior {
                // Same function reference: leave the attachment alone.
                Some(AttrValue::Listener(previous)) if Rc::ptr_eq(handler, previous) => {}
                other => {
                    if matches!(other, Some(v) if !matches!(v, AttrValue::Listener(_))) {
                        host.remove_attribute(id, name)?;
                    }
                    host.add_listener(id, name, wrap_listener(ctx, Rc::clone(handler)))?;
                }
            }
            continue;
        }
        if matches!(prior, Some(AttrValue::Listener(_))) {
            host.remove_listener(id, name)?;
        }

        let new_text = rendered_attr(name, value);
        let old_text = prior.and_then(|p| rendered_attr(name, p));
        let changed = match prior {
            Some(_) => new_text != old_text,
            None => new_text.is_some(),
        };
        if changed {
            match &new_text {
                Some(text) => host.set_attribute(id, name, text)?,
                None => {
                    if old_text.is_some() {
                        host.remove_attribute(id, name)?;
                    }
                }
            }
        }
        // Controlled inputs do not reliably reflect attribute writes, so
        // `value` and `checked` also go through the property path.
        match name.as_str() {
            "value" => {
                let desired = new_text.clone().unwrap_or_default();
                let previous = prior.map(|p| rendered_attr(name, p).unwrap_or_default());
                if previous.as_deref() != Some(desired.as_str()) {
                    host.set_property(id, "value", PropValue::Str(desired))?;
                }
            }
            "checked" => {
                let desired = truthy(value);
                if prior.map(truthy) != Some(desired) {
                    host.set_property(id, "checked", PropValue::Bool(desired))?;
                }
            }
            _ => {}
        }
    }

    for (name, old_value) in old {
        if new.contains_key(name) {
            continue;
        }
        match old_value {
            AttrValue::Listener(_) => host.remove_listener(id, name)?,
            _ => match name.as_str() {
                "class" | "style" => host.set_attribute(id, name, "")?,
                "value" => {
                    host.set_property(id, "value", PropValue::Str(String::new()))?;
                    host.remove_attribute(id, name)?;
                }
                "checked" => {
                    host.set_property(id, "checked", PropValue::Bool(false))?;
                    host.remove_attribute(id, name)?;
                }
                _ => host.remove_attribute(id, name)?,
            },
        }
    }
    Ok(())
}

/// Wraps a user listener for host attachment: dispatch-depth guard around
/// the call and a panic barrier so a failing handler cannot take down the
/// turn or the pending re-render.
pub(crate) fn wrap_listener(ctx: &PatchCtx, listener: ListenerFn) -> HostHandler {
    let store = ctx.store.clone();
    let scheduler = ctx.scheduler.clone();
    Rc::new(move |event: &Event| {
        if let Some(scheduler) = scheduler.upgrade() {
            scheduler.enter_dispatch();
        }
        let outcome = catch_unwind(AssertUnwindSafe(|| listener(event, &store)));
        if outcome.is_err() {
            log::error!("listener for {:?} panicked", event.name);
        }
        if let Some(scheduler) = scheduler.upgrade() {
            scheduler.exit_dispatch();
        }
    })
}

/// Host-facing text for one attribute. `None` means the attribute is absent
/// (listener-valued or boolean false); `Some("")` is a bare boolean-true
/// attribute.
pub(crate) fn rendered_attr(name: &str, value: &AttrValue) -> Option<String> {
    match value {
        AttrValue::Listener(_) => None,
        AttrValue::Bool(false) => None,
        AttrValue::Bool(true) => Some(String::new()),
        _ => Some(match name {
            "class" => class_text(value),
            "style" => style_text(value),
            _ => plain_text(value),
        }),
    }
}

pub(crate) fn truthy(value: &AttrValue) -> bool {
    match value {
        AttrValue::Bool(b) => *b,
        AttrValue::Num(n) => *n != 0.0,
        AttrValue::Str(s) => !s.is_empty(),
        AttrValue::List(_) | AttrValue::Map(_) => true,
        AttrValue::Listener(_) => true,
    }
}

fn class_text(value: &AttrValue) -> String {
    match value {
        AttrValue::Str(s) => s.clone(),
        AttrValue::List(items) => items.join(" "),
        AttrValue::Map(map) => {
            let names: Vec<&str> = map
                .iter()
                .filter(|(_, v)| truthy(v))
                .map(|(name, _)| name.as_str())
                .collect();
            names.join(" ")
        }
        other => plain_text(other),
    }
}

fn style_text(value: &AttrValue) -> String {
    match value {
        AttrValue::Str(s) => s.clone(),
        AttrValue::List(items) => items.join("; "),
        AttrValue::Map(map) => {
            let decls: Vec<String> = map
                .iter()
                .map(|(name, v)| format!("{}: {}", kebab(name), style_entry(v)))
                .collect();
            decls.join("; ")
        }
        other => plain_text(other),
    }
}

fn style_entry(value: &AttrValue) -> String {
    match value {
        // Array-valued style entries are space-joined.
        AttrValue::List(items) => items.join(" "),
        other => plain_text(other),
    }
}

fn plain_text(value: &AttrValue) -> String {
    match value {
        AttrValue::Bool(b) => b.to_string(),
        AttrValue::Num(n) => format_float(*n),
        AttrValue::Str(s) => s.clone(),
        AttrValue::List(items) => items.join(" "),
        AttrValue::Map(map) => {
            let decls: Vec<String> = map
                .iter()
                .map(|(name, v)| format!("{}: {}", name, plain_text(v)))
                .collect();
            decls.join("; ")
        }
        AttrValue::Listener(_) => String::new(),
    }
}

/// camelCase to kebab-case; already-kebab names pass through.
pub(crate) fn kebab(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
