#![forbid(unsafe_code)]

//! Dependency declarations for computed attributes.
//!
//! A [`Func<T>`] is an ordered list of top-level dependency keys plus a pure
//! evaluator over the values of those keys, passed positionally in declared
//! order. The key list drives subscription; the evaluator never touches the
//! store itself.
//!
//! # Usage
//!
//! ```
//! # use formbind_store::{Func, PathStore};
//! # use serde_json::json;
//! let store = PathStore::new();
//! store.set("host", "example.org").unwrap();
//! store.set("port", 8080).unwrap();
//!
//! let sum = Func::new(["port"], |v| v[0].as_i64().unwrap_or(0) + 1);
//! assert_eq!(sum.evaluate(&store).unwrap(), 8081);
//!
//! let title = Func::format("Listening on {host}:{port}");
//! assert_eq!(title.dependencies(), ["host", "port"]);
//! assert_eq!(title.evaluate(&store).unwrap(), "Listening on example.org:8080");
//! ```

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::path::KeyPath;
use crate::store::PathStore;
use crate::value::{FromValue, display_value};

type Eval<T> = dyn Fn(&[Value]) -> Result<T>;

/// Ordered dependency keys plus a positional evaluator.
///
/// Cloning a `Func` shares the evaluator.
pub struct Func<T> {
    deps: Vec<String>,
    eval: Rc<Eval<T>>,
}

impl<T> Clone for Func<T> {
    fn clone(&self) -> Self {
        Self {
            deps: self.deps.clone(),
            eval: Rc::clone(&self.eval),
        }
    }
}

impl<T> fmt::Debug for Func<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Func").field("deps", &self.deps).finish()
    }
}

impl<T: 'static> Func<T> {
    /// An infallible function of the dependency values.
    pub fn new<I, S>(deps: I, f: impl Fn(&[Value]) -> T + 'static) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::try_new(deps, move |values| Ok(f(values)))
    }

    /// A fallible function of the dependency values.
    pub fn try_new<I, S>(deps: I, f: impl Fn(&[Value]) -> Result<T> + 'static) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            deps: deps.into_iter().map(Into::into).collect(),
            eval: Rc::new(f),
        }
    }

    /// A function of a single key.
    pub fn map(key: impl Into<String>, f: impl Fn(&Value) -> T + 'static) -> Self {
        Self::new([key.into()], move |values| f(&values[0]))
    }

    /// A function of two keys.
    pub fn map2(
        a: impl Into<String>,
        b: impl Into<String>,
        f: impl Fn(&Value, &Value) -> T + 'static,
    ) -> Self {
        Self::new([a.into(), b.into()], move |values| f(&values[0], &values[1]))
    }

    /// The declared dependency keys, in order. May contain duplicates.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.deps
    }

    /// Invoke the evaluator with one value per dependency, in declared order.
    pub fn call(&self, values: &[Value]) -> Result<T> {
        if values.len() != self.deps.len() {
            return Err(StoreError::mismatch(
                format!("{} arguments for {} dependencies", values.len(), self.deps.len()),
                "one value per dependency",
            ));
        }
        (self.eval)(values)
    }

    /// Snapshot the current value of every dependency from `store`, then call.
    ///
    /// Fails with `KeyNotFound` if any dependency is absent. No store borrow
    /// is held while the evaluator runs.
    pub fn evaluate(&self, store: &PathStore) -> Result<T> {
        let values = self
            .deps
            .iter()
            .map(|key| store.get(KeyPath::key(key.as_str())))
            .collect::<Result<Vec<_>>>()?;
        self.call(&values)
    }

    /// Post-process the result with `f`.
    pub fn then<U: 'static>(self, f: impl Fn(T) -> U + 'static) -> Func<U> {
        let eval = self.eval;
        Func {
            deps: self.deps,
            eval: Rc::new(move |values| eval(values).map(&f)),
        }
    }
}

impl<T: FromValue + 'static> Func<T> {
    /// Read the value at `path` and convert it to `T`.
    ///
    /// The dependency is the path's top-level key; deeper segments are
    /// resolved inside that key's value on each evaluation.
    pub fn bind(path: impl Into<KeyPath>) -> Self {
        let path = path.into();
        let Some(head) = path.head().map(str::to_owned) else {
            return Self::try_new(Vec::<String>::new(), |_| Err(StoreError::EmptyPath));
        };
        Self::try_new([head], move |values| {
            let value = descend(&values[0], &path)?;
            T::convert(value, &path.to_string())
        })
    }
}

impl Func<bool> {
    /// `true` while the value at `path` equals `expected`.
    pub fn equals(path: impl Into<KeyPath>, expected: impl Into<Value>) -> Self {
        let expected = expected.into();
        Func::<Value>::bind(path).then(move |value| value == expected)
    }
}

impl Func<String> {
    /// Single-pass `{name}` interpolation over store values.
    ///
    /// A token may be a dotted path; its top-level key becomes a dependency.
    /// Dependencies are the distinct keys in order of first appearance. An
    /// unclosed or empty brace is emitted as-is.
    pub fn format(template: &str) -> Self {
        let pieces = parse_template(template);
        let mut deps: Vec<String> = Vec::new();
        let heads = pieces.iter().filter_map(|piece| match piece {
            Piece::Token(path) => path.head(),
            Piece::Literal(_) => None,
        });
        for head in heads {
            if !deps.iter().any(|d| d == head) {
                deps.push(head.to_owned());
            }
        }
        let positions = deps.clone();
        Self::try_new(deps, move |values| {
            let mut out = String::new();
            for piece in &pieces {
                match piece {
                    Piece::Literal(text) => out.push_str(text),
                    Piece::Token(path) => {
                        let index = path
                            .head()
                            .and_then(|head| positions.iter().position(|d| d == head))
                            .ok_or(StoreError::EmptyPath)?;
                        out.push_str(&display_value(descend(&values[index], path)?));
                    }
                }
            }
            Ok(out)
        })
    }
}

/// Resolve the segments after the head of `path` inside `top`.
fn descend<'a>(top: &'a Value, path: &KeyPath) -> Result<&'a Value> {
    let mut current = top;
    for (depth, segment) in path.segments().iter().enumerate().skip(1) {
        current = current
            .as_object()
            .ok_or_else(|| StoreError::not_a_mapping(path, depth - 1))?
            .get(segment)
            .ok_or_else(|| StoreError::key_not_found(path, depth))?;
    }
    Ok(current)
}

enum Piece {
    Literal(String),
    Token(KeyPath),
}

fn parse_template(template: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars();

    while let Some(ch) = chars.next() {
        if ch != '{' {
            literal.push(ch);
            continue;
        }
        let mut token = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            token.push(c);
        }
        let token = token.trim();
        if closed && !token.is_empty() {
            if !literal.is_empty() {
                pieces.push(Piece::Literal(std::mem::take(&mut literal)));
            }
            pieces.push(Piece::Token(KeyPath::parse(token)));
        } else {
            literal.push('{');
            literal.push_str(token);
            if closed {
                literal.push('}');
            }
        }
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    pieces
}
