//! Bind parameter descriptors.

use serde_json::Value;

/// The large-object or cursor kind registered for an output bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutBindKind {
    /// Character large object; decoded as UTF-8 text.
    Clob,
    /// Binary large object; returned verbatim.
    Blob,
    /// Server-side result-set handle fetched in row batches.
    Cursor,
}

/// One entry in a statement's bind list.
///
/// Procedure calls use positional binds in list order; raw-SQL statements use
/// [`Named`](BindValue::Named) binds exclusively.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    /// Positional input carrying serialized JSON text.
    Text(String),
    /// Explicit NULL placeholder, used to pad a fixed call arity.
    Null,
    /// Named input bind taken from a field of the input object.
    Named {
        /// Placeholder name as it appears in the statement text.
        name: String,
        /// The bound value.
        value: Value,
    },
    /// Output buffer registration (direction OUT).
    Out(OutBindKind),
}

impl BindValue {
    /// Whether this bind registers an output buffer.
    #[must_use]
    pub fn is_out(&self) -> bool {
        matches!(self, BindValue::Out(_))
    }
}
