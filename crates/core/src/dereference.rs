//! In-place resolution of `$ref` pointer nodes in JSON documents.
//!
//! Deployment resource definitions reference shared fragments through
//! `{"$ref": "#/path/to/node"}` placeholders. [`dereference_json`] replaces
//! every placeholder with the value its pointer names, resolving chained
//! references and sharing one resolution between repeated pointers.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::trace;

/// Key that marks an object as a reference node.
///
/// Only an object with exactly this one key, holding a string that starts
/// with `#`, is treated as a reference; anything else passes through
/// untouched.
pub const REF_KEY: &str = "$ref";

type Segments<'p> = SmallVec<[&'p str; 8]>;

/// Failures raised while resolving reference nodes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DereferenceError {
    /// The pointer walks out of the document.
    #[error("pointer `{0}` does not resolve to an existing node")]
    DanglingReference(String),
    /// Resolving the pointer requires resolving itself first.
    #[error("pointer `{0}` is part of a reference cycle")]
    UnresolvableCycle(String),
}

/// Resolves every reference node in `root`, in place.
///
/// Pointers are root-relative: `#/a/b/0/c` keys into objects and indexes
/// into arrays. Repeated pointers resolve once and share the result; a
/// pointer whose walk passes through another reference node resolves that
/// node first and continues inside the resolved value.
///
/// On success no reference node remains reachable in the document. On
/// failure the document is left exactly as it was passed in.
pub fn dereference_json(root: &mut Value) -> Result<(), DereferenceError> {
    let snapshot = std::mem::take(root);
    let mut resolver = Resolver {
        root: &snapshot,
        resolved: HashMap::new(),
        resolving: HashSet::new(),
    };
    match resolver.resolve(snapshot.clone()) {
        Ok(value) => {
            *root = value;
            Ok(())
        }
        Err(err) => {
            *root = snapshot;
            Err(err)
        }
    }
}

struct Resolver<'t> {
    /// Pristine copy of the document every pointer walk starts from.
    root: &'t Value,
    /// Pointer string to fully resolved value; lives for one top-level call.
    resolved: HashMap<String, Value>,
    /// Pointers currently being resolved further up the call stack.
    resolving: HashSet<String>,
}

impl Resolver<'_> {
    fn resolve(&mut self, value: Value) -> Result<Value, DereferenceError> {
        match value {
            Value::Object(map) => {
                if let Some(pointer) = reference_target(&map) {
                    let pointer = pointer.to_owned();
                    return self.resolve_pointer(&pointer);
                }
                let mut out = serde_json::Map::with_capacity(map.len());
                for (key, child) in map {
                    out.insert(key, self.resolve(child)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for child in items {
                    out.push(self.resolve(child)?);
                }
                Ok(Value::Array(out))
            }
            scalar => Ok(scalar),
        }
    }

    fn resolve_pointer(&mut self, pointer: &str) -> Result<Value, DereferenceError> {
        if let Some(hit) = self.resolved.get(pointer) {
            return Ok(hit.clone());
        }
        if !self.resolving.insert(pointer.to_owned()) {
            return Err(DereferenceError::UnresolvableCycle(pointer.to_owned()));
        }
        trace!(pointer, "resolving reference");
        // The marker must come off again on the error path too, so the
        // question mark waits until after the removal.
        let outcome = self
            .lookup(pointer)
            .and_then(|target| self.resolve(target));
        self.resolving.remove(pointer);
        let value = outcome?;
        self.resolved.insert(pointer.to_owned(), value.clone());
        Ok(value)
    }

    /// Walks `pointer` from the document root and returns the raw target.
    fn lookup(&mut self, pointer: &str) -> Result<Value, DereferenceError> {
        let segments = parse_pointer(pointer)
            .ok_or_else(|| DereferenceError::DanglingReference(pointer.to_owned()))?;
        let mut current: &Value = self.root;
        for (depth, &segment) in segments.iter().enumerate() {
            if let Value::Object(map) = current
                && let Some(inner) = reference_target(map)
            {
                let inner = inner.to_owned();
                let through = self.resolve_pointer(&inner)?;
                return self.walk_owned(through, &segments[depth..], pointer);
            }
            current = step(current, segment)
                .ok_or_else(|| DereferenceError::DanglingReference(pointer.to_owned()))?;
        }
        Ok(current.clone())
    }

    /// Continuation of [`Resolver::lookup`] once the walk has left the
    /// original document and moved into an already resolved value.
    fn walk_owned(
        &mut self,
        mut current: Value,
        segments: &[&str],
        pointer: &str,
    ) -> Result<Value, DereferenceError> {
        for &segment in segments {
            if let Value::Object(map) = &current
                && let Some(inner) = reference_target(map)
            {
                let inner = inner.to_owned();
                current = self.resolve_pointer(&inner)?;
            }
            current = step_owned(current, segment)
                .ok_or_else(|| DereferenceError::DanglingReference(pointer.to_owned()))?;
        }
        Ok(current)
    }
}

fn reference_target(map: &serde_json::Map<String, Value>) -> Option<&str> {
    if map.len() != 1 {
        return None;
    }
    match map.get(REF_KEY) {
        Some(Value::String(pointer)) if pointer.starts_with('#') => Some(pointer),
        _ => None,
    }
}

fn parse_pointer(pointer: &str) -> Option<Segments<'_>> {
    let rest = pointer.strip_prefix('#')?;
    Some(rest.split('/').filter(|segment| !segment.is_empty()).collect())
}

fn step<'v>(value: &'v Value, segment: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

fn step_owned(value: Value, segment: &str) -> Option<Value> {
    match value {
        Value::Object(mut map) => map.remove(segment),
        Value::Array(items) => {
            let index = segment.parse::<usize>().ok()?;
            items.into_iter().nth(index)
        }
        _ => None,
    }
}
