//! Spec traversal - discovers every value-or-ref field in a spec tree
//!
//! Spec types implement [`Walk`] by declaring their fields to a [`Walker`]
//! (usually through [`impl_walk!`](crate::impl_walk)). Containers
//! (`Option`, `Vec`, `Box`, maps) are walked by blanket implementations,
//! so the resolver never needs per-kind knowledge.

use crate::scalar::{ConversionError, Scalar, ScalarValue};
use crate::types::{FieldDefaults, RefField, Reference, ReferenceValue};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

/// A type whose value-or-ref fields can be enumerated
///
/// Implementations must forward to every field that is, or may contain, a
/// [`ReferenceValue`]. Fields that can never hold a reference may be
/// skipped.
pub trait Walk {
    /// Report every reference node under `self` to `walker`
    fn walk<'a>(&'a mut self, walker: &mut Walker<'a>);
}

/// One discovered value-or-ref node
///
/// Holds a mutable handle scoped to the single field it was found in,
/// so the resolver can replace the value in place.
pub struct RefSlot<'a> {
    path: String,
    defaults: FieldDefaults,
    field: &'a mut dyn RefField,
}

impl RefSlot<'_> {
    /// Location of the field inside the spec (`spec.subnets[1]`)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Defaults declared by the enclosing field
    pub fn defaults(&self) -> &FieldDefaults {
        &self.defaults
    }

    /// The reference, or `None` if the field is already a literal
    pub fn reference(&self) -> Option<&Reference> {
        self.field.reference()
    }

    /// Declared literal type of the field
    pub fn type_name(&self) -> &'static str {
        self.field.type_name()
    }

    /// Replace the field with a literal converted from `value`
    pub fn assign(&mut self, value: &ScalarValue) -> Result<(), ConversionError> {
        self.field.assign(value)
    }
}

impl std::fmt::Debug for RefSlot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefSlot")
            .field("path", &self.path)
            .field("type", &self.type_name())
            .field("reference", &self.reference())
            .finish()
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Field(String),
    Index(usize),
    Key(String),
}

/// Collects reference nodes while a spec tree is traversed
pub struct Walker<'a> {
    slots: Vec<RefSlot<'a>>,
    path: Vec<Segment>,
    defaults: FieldDefaults,
}

impl<'a> Walker<'a> {
    /// Create an empty walker rooted at the top of a spec
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            path: Vec::new(),
            defaults: FieldDefaults::default(),
        }
    }

    /// Visit a named field (a message field or a oneof branch)
    pub fn field<W: Walk + ?Sized>(&mut self, name: &str, value: &'a mut W) {
        self.field_with(name, value, FieldDefaults::default());
    }

    /// Visit a named field whose references carry defaults
    pub fn field_with<W: Walk + ?Sized>(
        &mut self,
        name: &str,
        value: &'a mut W,
        defaults: FieldDefaults,
    ) {
        self.enter(Segment::Field(name.to_string()), defaults, value);
    }

    /// Visit an element of a repeated field; field defaults carry over
    pub fn element<W: Walk + ?Sized>(&mut self, index: usize, value: &'a mut W) {
        let defaults = self.defaults;
        self.enter(Segment::Index(index), defaults, value);
    }

    /// Visit a value of a map field; field defaults carry over
    pub fn entry<W: Walk + ?Sized>(&mut self, key: &str, value: &'a mut W) {
        let defaults = self.defaults;
        self.enter(Segment::Key(key.to_string()), defaults, value);
    }

    /// Record a value-or-ref node at the current location
    pub fn visit(&mut self, field: &'a mut dyn RefField) {
        let path = self.render_path();
        log::trace!("Found {} field at {}", field.type_name(), path);
        self.slots.push(RefSlot {
            path,
            defaults: self.defaults,
            field,
        });
    }

    /// Stop walking and hand out the discovered nodes
    pub fn finish(self) -> RefSlots<'a> {
        RefSlots {
            inner: self.slots.into_iter(),
        }
    }

    fn enter<W: Walk + ?Sized>(&mut self, segment: Segment, defaults: FieldDefaults, value: &'a mut W) {
        let saved = std::mem::replace(&mut self.defaults, defaults);
        self.path.push(segment);
        value.walk(self);
        self.path.pop();
        self.defaults = saved;
    }

    fn render_path(&self) -> String {
        let mut out = String::new();
        for segment in &self.path {
            match segment {
                Segment::Field(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                Segment::Index(i) => {
                    let _ = write!(out, "[{i}]");
                }
                Segment::Key(k) => {
                    let _ = write!(out, "[{k:?}]");
                }
            }
        }
        out
    }
}

impl Default for Walker<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// The reference nodes of one spec, in traversal order
///
/// Finite and single-pass: walk the spec again for a fresh sequence.
#[derive(Debug)]
pub struct RefSlots<'a> {
    inner: std::vec::IntoIter<RefSlot<'a>>,
}

impl<'a> Iterator for RefSlots<'a> {
    type Item = RefSlot<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for RefSlots<'_> {}

/// Enumerate every value-or-ref node in `spec`
pub fn walk_refs<W: Walk + ?Sized>(spec: &mut W) -> RefSlots<'_> {
    let mut walker = Walker::new();
    spec.walk(&mut walker);
    walker.finish()
}

/// Paths of every node in `spec` that still holds a reference
pub fn unresolved_paths<W: Walk + ?Sized>(spec: &mut W) -> Vec<String> {
    walk_refs(spec)
        .filter(|slot| slot.reference().is_some())
        .map(|slot| slot.path)
        .collect()
}

impl<T: Scalar> Walk for ReferenceValue<T> {
    fn walk<'a>(&'a mut self, walker: &mut Walker<'a>) {
        walker.visit(self);
    }
}

impl<W: Walk> Walk for Option<W> {
    fn walk<'a>(&'a mut self, walker: &mut Walker<'a>) {
        if let Some(inner) = self {
            inner.walk(walker);
        }
    }
}

impl<W: Walk + ?Sized> Walk for Box<W> {
    fn walk<'a>(&'a mut self, walker: &mut Walker<'a>) {
        (**self).walk(walker);
    }
}

impl<W: Walk> Walk for Vec<W> {
    fn walk<'a>(&'a mut self, walker: &mut Walker<'a>) {
        for (i, item) in self.iter_mut().enumerate() {
            walker.element(i, item);
        }
    }
}

impl<W: Walk> Walk for BTreeMap<String, W> {
    fn walk<'a>(&'a mut self, walker: &mut Walker<'a>) {
        for (key, value) in self.iter_mut() {
            walker.entry(key, value);
        }
    }
}

impl<W: Walk, S> Walk for HashMap<String, W, S> {
    fn walk<'a>(&'a mut self, walker: &mut Walker<'a>) {
        // Sorted so traversal order does not depend on the hasher
        let mut entries: Vec<_> = self.iter_mut().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (key, value) in entries {
            walker.entry(key, value);
        }
    }
}

/// Implement [`Walk`] for a struct by listing its reference-bearing fields
///
/// ```ignore
/// impl_walk!(EksSpec {
///     subnet_ids => FieldDefaults::kind(ResourceKind::AwsVpc),
///     cluster_role_arn,
///     logging,
/// });
/// ```
#[macro_export]
macro_rules! impl_walk {
    (@defaults) => {
        $crate::FieldDefaults::default()
    };
    (@defaults $defaults:expr) => {
        $defaults
    };
    ($ty:ty { $($field:ident $(=> $defaults:expr)?),* $(,)? }) => {
        impl $crate::Walk for $ty {
            fn walk<'a>(&'a mut self, walker: &mut $crate::Walker<'a>) {
                $(
                    walker.field_with(
                        stringify!($field),
                        &mut self.$field,
                        $crate::impl_walk!(@defaults $($defaults)?),
                    );
                )*
            }
        }
    };
}
