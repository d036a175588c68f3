#![forbid(unsafe_code)]

//! Bidirectional accessors used to derive sub-stores.
//!
//! A [`Lens<T, S>`] is a named `get`/`set` pair focusing a part `S` of a whole
//! `T`. Lenses must satisfy two laws for every `t` and every `s` in the lens'
//! domain:
//!
//! ```text
//! get(set(t, s)) == s        (set-then-get)
//! set(t, get(t)) == t        (get-then-set is a no-op)
//! ```
//!
//! The laws are not checked at runtime; violating them is a programmer error
//! (see the property tests in `fritz2-harness`).
//!
//! # Example
//!
//! ```
//! use fritz2_core::lens;
//! use fritz2_core::lens::Lens;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Person { name: String, age: u32 }
//!
//! let age: Lens<Person, u32> = lens!(Person, age);
//! let p = Person { name: "Heinz".into(), age: 18 };
//! assert_eq!(age.get(&p), 18);
//! assert_eq!(age.set(p, 99).age, 99);
//! ```

use std::fmt;
use std::rc::Rc;

/// Named pair of pure accessor functions.
pub struct Lens<T, S> {
    id: Rc<str>,
    getter: Rc<dyn Fn(&T) -> S>,
    setter: Rc<dyn Fn(T, S) -> T>,
}

impl<T, S> Clone for Lens<T, S> {
    fn clone(&self) -> Self {
        Self {
            id: Rc::clone(&self.id),
            getter: Rc::clone(&self.getter),
            setter: Rc::clone(&self.setter),
        }
    }
}

impl<T, S> fmt::Debug for Lens<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lens").field("id", &self.id).finish()
    }
}

impl<T: 'static, S: 'static> Lens<T, S> {
    /// Build a lens from an id and its two accessors.
    pub fn new(
        id: impl Into<Rc<str>>,
        get: impl Fn(&T) -> S + 'static,
        set: impl Fn(T, S) -> T + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            getter: Rc::new(get),
            setter: Rc::new(set),
        }
    }

    /// The lens id, used to name derived sub-stores (`parent.id`).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn get(&self, whole: &T) -> S {
        (self.getter)(whole)
    }

    #[must_use]
    pub fn set(&self, whole: T, part: S) -> T {
        (self.setter)(whole, part)
    }

    /// Apply `f` to the focused part.
    #[must_use]
    pub fn modify(&self, whole: T, f: impl FnOnce(S) -> S) -> T {
        let part = self.get(&whole);
        self.set(whole, f(part))
    }

    /// Compose with a lens focusing further into `S`. The composite id is
    /// `outer.inner`.
    #[must_use]
    pub fn then<U: 'static>(&self, inner: Lens<S, U>) -> Lens<T, U> {
        let outer_get = self.clone();
        let outer_set = self.clone();
        let inner_get = inner.clone();
        Lens::new(
            format!("{}.{}", self.id, inner.id),
            move |whole: &T| inner_get.get(&outer_get.get(whole)),
            move |whole: T, part: U| {
                let focused = outer_set.get(&whole);
                outer_set.set(whole, inner.set(focused, part))
            },
        )
    }
}

/// Free-function form of [`Lens::new`].
pub fn build_lens<T: 'static, S: 'static>(
    id: impl Into<Rc<str>>,
    get: impl Fn(&T) -> S + 'static,
    set: impl Fn(T, S) -> T + 'static,
) -> Lens<T, S> {
    Lens::new(id, get, set)
}

/// Lens onto the element of a list whose stable id equals `key`.
///
/// `get` yields `None` when no element carries the id. `set` with `Some`
/// replaces that element in place; `set` with `None` removes it. The laws hold
/// for replacement values carrying the same id.
pub fn element_by_id<T, K>(key: K, id: impl Fn(&T) -> K + 'static) -> Lens<Vec<T>, Option<T>>
where
    T: Clone + 'static,
    K: PartialEq + fmt::Debug + 'static,
{
    let name = format!("{key:?}");
    let id = Rc::new(id);
    let key = Rc::new(key);
    let get_id = Rc::clone(&id);
    let get_key = Rc::clone(&key);
    Lens::new(
        name,
        move |list: &Vec<T>| list.iter().find(|item| get_id(item) == *get_key).cloned(),
        move |mut list: Vec<T>, part: Option<T>| {
            let Some(pos) = list.iter().position(|item| id(item) == *key) else {
                return list;
            };
            match part {
                Some(item) => list[pos] = item,
                None => {
                    list.remove(pos);
                }
            }
            list
        },
    )
}

/// Lens onto the element at `index`.
///
/// `get` yields `None` past the end. `set` with `Some` replaces the element if
/// it exists; `set` with `None` leaves the list untouched (removing would
/// shift a different element under the lens).
pub fn element_at<T: Clone + 'static>(index: usize) -> Lens<Vec<T>, Option<T>> {
    Lens::new(
        index.to_string(),
        move |list: &Vec<T>| list.get(index).cloned(),
        move |mut list: Vec<T>, part: Option<T>| {
            if let (Some(item), Some(slot)) = (part, list.get_mut(index)) {
                *slot = item;
            }
            list
        },
    )
}

/// String view of a value: `get` formats, `set` parses.
///
/// A string that fails to parse keeps the previous value. The set-then-get
/// law holds for canonical strings (those `format` produces).
pub fn formatted<S, E>(
    parse: impl Fn(&str) -> Result<S, E> + 'static,
    format: impl Fn(&S) -> String + 'static,
) -> Lens<S, String>
where
    S: 'static,
    E: fmt::Display,
{
    Lens::new(
        "formatted",
        move |value: &S| format(value),
        move |value: S, text: String| match parse(&text) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::debug!(input = %text, error = %err, "formatted lens kept previous value");
                value
            }
        },
    )
}

/// Lens onto a struct field; the id is the field name.
///
/// ```ignore
/// let age: Lens<Person, u32> = lens!(Person, age);
/// ```
#[macro_export]
macro_rules! lens {
    ($whole:ty, $field:ident) => {
        $crate::lens::Lens::new(
            stringify!($field),
            |whole: &$whole| whole.$field.clone(),
            |mut whole: $whole, part| {
                whole.$field = part;
                whole
            },
        )
    };
}
