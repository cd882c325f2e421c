//! Defines [`Locals`], the context mapping handed to index views, and the
//! deep-merge rules used to combine plugin options, call options, pagination
//! data, and caller-supplied locals.

use gtmpl_value::Value;
use std::collections::HashMap;

/// The context mapping for a view. Values are [`gtmpl_value::Value`]s so the
/// same mapping can be handed straight to the template engine.
pub type Locals = HashMap<String, Value>;

/// Deep-merges `source` into `target`. When both sides hold an object (or
/// map) under the same key the two are merged recursively; otherwise the
/// value from `source` replaces the one in `target`.
pub fn merge(target: &mut Locals, source: &Locals) {
    for (key, value) in source {
        if let Some(existing) = target.get_mut(key) {
            if is_mapping(existing) && is_mapping(value) {
                merge_value(existing, value);
                continue;
            }
        }
        target.insert(key.clone(), value.clone());
    }
}

/// Merges any number of [`Locals`] left to right into a fresh mapping. Later
/// sources win on conflicts.
pub fn merged<'a>(sources: impl IntoIterator<Item = &'a Locals>) -> Locals {
    let mut out = Locals::new();
    for source in sources {
        merge(&mut out, source);
    }
    out
}

fn is_mapping(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Map(_))
}

fn merge_value(target: &mut Value, source: &Value) {
    let source = match source {
        Value::Object(m) | Value::Map(m) => m,
        _ => return,
    };
    if let Value::Object(m) | Value::Map(m) = target {
        merge(m, source);
    }
}

/// Builds a [`Locals`] from `(key, value)` pairs. Mostly a convenience for
/// callers and tests.
pub fn locals<K, V, I>(pairs: I) -> Locals
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
