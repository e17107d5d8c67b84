//! Small traversal helpers over [`serde_json::Value`] trees.

use serde_json::{Map, Value};

/// Borrows the value at `path`, keying into objects and indexing into
/// arrays. Returns `None` as soon as a segment does not exist.
pub fn deep_get<'v, I, S>(value: &'v Value, path: I) -> Option<&'v Value>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut current = value;
    for segment in path {
        let segment = segment.as_ref();
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Inserts `new` at `path`, creating intermediate objects for missing
/// segments. Any non-object value on the way is replaced by an object.
pub fn deep_set(value: &mut Value, path: &[&str], new: Value) {
    let Some((last, parents)) = path.split_last() else {
        *value = new;
        return;
    };
    let mut current = value;
    for segment in parents {
        current = ensure_object(current)
            .entry((*segment).to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(current).insert((*last).to_owned(), new);
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by an object"),
    }
}

/// Applies `transform` to every scalar leaf of the tree, replacing it in
/// place. Objects and arrays are traversed; null, booleans, numbers and
/// strings are handed to the closure.
pub fn map_values_in_place<F>(value: &mut Value, transform: &mut F)
where
    F: FnMut(Value) -> Value,
{
    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                map_values_in_place(child, transform);
            }
        }
        Value::Array(items) => {
            for child in items {
                map_values_in_place(child, transform);
            }
        }
        scalar => {
            *scalar = transform(std::mem::take(scalar));
        }
    }
}
