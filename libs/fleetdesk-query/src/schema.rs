//! Schema types for type-safe query building.
//!
//! - `Schema` trait: maps field enums to column names
//! - `FieldRef`: typed column references with compile-time type checking
//! - `IntoQueryValue`: conversion of Rust values into filter operands

use crate::ast::{CompareOperator, Expr, Value};
use std::marker::PhantomData;

/// Schema trait defining field enums and their column names.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Copy, Clone, Eq, PartialEq)]
/// enum ClientField {
///     Id,
///     Name,
/// }
///
/// struct ClientSchema;
///
/// impl Schema for ClientSchema {
///     type Field = ClientField;
///
///     fn field_name(field: Self::Field) -> &'static str {
///         match field {
///             ClientField::Id => "id",
///             ClientField::Name => "name",
///         }
///     }
/// }
/// ```
pub trait Schema {
    type Field: Copy + Eq;

    fn field_name(field: Self::Field) -> &'static str;
}

/// Typed column reference bound to a schema and a Rust type.
///
/// Equality is based solely on the schema field; `T` only restricts which
/// operations are available.
pub struct FieldRef<S: Schema, T> {
    field: S::Field,
    _phantom: PhantomData<(S, T)>,
}

impl<S: Schema, T> FieldRef<S, T> {
    #[must_use]
    pub const fn new(field: S::Field) -> Self {
        Self {
            field,
            _phantom: PhantomData,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        S::field_name(self.field)
    }

    fn compare<V: IntoQueryValue>(self, op: CompareOperator, value: V) -> Expr {
        Expr::Compare(self.name().to_owned(), op, value.into_query_value())
    }

    /// `field = value`
    #[must_use]
    pub fn eq<V: IntoQueryValue>(self, value: V) -> Expr {
        self.compare(CompareOperator::Eq, value)
    }

    #[must_use]
    pub fn ne<V: IntoQueryValue>(self, value: V) -> Expr {
        self.compare(CompareOperator::Ne, value)
    }

    #[must_use]
    pub fn ge<V: IntoQueryValue>(self, value: V) -> Expr {
        self.compare(CompareOperator::Ge, value)
    }

    #[must_use]
    pub fn lt<V: IntoQueryValue>(self, value: V) -> Expr {
        self.compare(CompareOperator::Lt, value)
    }

    #[must_use]
    pub fn is_not_null(self) -> Expr {
        Expr::IsNotNull(self.name().to_owned())
    }
}

/// String-only operations.
impl<S: Schema> FieldRef<S, String> {
    /// Case-insensitive substring match.
    ///
    /// ```rust,ignore
    /// let filter = NAME.contains("office");
    /// ```
    #[must_use]
    pub fn contains(self, substring: &str) -> Expr {
        Expr::Contains(self.name().to_owned(), substring.to_owned())
    }
}

impl<S: Schema, T> Clone for FieldRef<S, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Schema, T> Copy for FieldRef<S, T> {}

impl<S: Schema, T> std::fmt::Debug for FieldRef<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRef")
            .field("field", &self.name())
            .finish()
    }
}

impl<S: Schema, T> PartialEq for FieldRef<S, T> {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field
    }
}

impl<S: Schema, T> Eq for FieldRef<S, T> {}

#[doc(hidden)]
pub trait AsFieldName {
    fn as_field_name(&self) -> &'static str;
}

impl<S: Schema, T> AsFieldName for FieldRef<S, T> {
    fn as_field_name(&self) -> &'static str {
        self.name()
    }
}

impl<T: AsFieldName + ?Sized> AsFieldName for &T {
    fn as_field_name(&self) -> &'static str {
        (*self).as_field_name()
    }
}

/// Conversion into filter operands.
pub trait IntoQueryValue {
    fn into_query_value(self) -> Value;
}

impl IntoQueryValue for bool {
    fn into_query_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoQueryValue for uuid::Uuid {
    fn into_query_value(self) -> Value {
        Value::Uuid(self)
    }
}

impl IntoQueryValue for String {
    fn into_query_value(self) -> Value {
        Value::String(self)
    }
}

impl IntoQueryValue for &str {
    fn into_query_value(self) -> Value {
        Value::String(self.to_owned())
    }
}

impl IntoQueryValue for i64 {
    fn into_query_value(self) -> Value {
        Value::Number(self)
    }
}

impl IntoQueryValue for i32 {
    fn into_query_value(self) -> Value {
        Value::Number(self.into())
    }
}

impl IntoQueryValue for chrono::DateTime<chrono::Utc> {
    fn into_query_value(self) -> Value {
        Value::DateTime(self)
    }
}

impl IntoQueryValue for chrono::NaiveDate {
    fn into_query_value(self) -> Value {
        Value::Date(self)
    }
}
