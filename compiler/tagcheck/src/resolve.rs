use tagcheck_unit::{Expr, ExprId, ExprKind, Field, Location, NamedType, Type, TypeId, Unit};

/// The fields of a struct type, together with the id of the struct type itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'u> {
    /// The id of the struct type.
    ///
    /// For named records, this is the id of the *underlying* struct type,
    /// not of the named type.
    pub id: TypeId,
    pub fields: &'u [Field],
}

/// A record type, classified after unwrapping at most one level of indirection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape<'u> {
    /// A record with a declared name, e.g. `type User struct { ... }`.
    Named {
        ty: &'u NamedType,
        record: Record<'u>,
    },
    /// An inline `struct { ... }`.
    Anonymous(Record<'u>),
}

impl<'u> RecordShape<'u> {
    pub fn record(&self) -> Record<'u> {
        match self {
            RecordShape::Named { record, .. } | RecordShape::Anonymous(record) => *record,
        }
    }

    /// The named type, if the record has one.
    pub fn named(&self) -> Option<&'u NamedType> {
        match self {
            RecordShape::Named { ty, .. } => Some(*ty),
            RecordShape::Anonymous(_) => None,
        }
    }
}

/// The record passed as argument to a serialization call,
/// together with the position a finding should point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedArgument<'u> {
    pub shape: RecordShape<'u>,
    /// The declaration of the named record, or the relevant site in the argument
    /// expression for anonymous records.
    pub position: &'u Location,
}

/// Classify `ty` as a record, looking through a single pointer.
///
/// Anything else (primitives, collections, interfaces, pointers to pointers)
/// returns `None`.
pub fn record_shape(unit: &Unit, ty: TypeId) -> Option<RecordShape<'_>> {
    let (id, ty) = match unit.ty(ty)? {
        Type::Pointer { pointee } => (*pointee, unit.ty(*pointee)?),
        other => (ty, other),
    };
    match ty {
        Type::Named(named) => match unit.ty(named.underlying)? {
            Type::Struct(s) => Some(RecordShape::Named {
                ty: named,
                record: Record {
                    id: named.underlying,
                    fields: &s.fields,
                },
            }),
            _ => None,
        },
        Type::Struct(s) => Some(RecordShape::Anonymous(Record {
            id,
            fields: &s.fields,
        })),
        _ => None,
    }
}

/// Determine the record type of a serialization argument and where a finding about it
/// should be reported.
pub fn resolve_argument(unit: &Unit, arg: ExprId) -> Option<ResolvedArgument<'_>> {
    let expr = unit.expr(arg)?;
    let Some(ty) = expr.ty else {
        tracing::trace!(at = %expr.at, "The argument has no known static type");
        return None;
    };
    let shape = record_shape(unit, ty)?;
    let position = match shape {
        RecordShape::Named { ty, .. } => &ty.declared_at,
        RecordShape::Anonymous(_) => anonymous_position(unit, expr)?,
    };
    Some(ResolvedArgument { shape, position })
}

/// Anonymous records have no declaration to point at: use the expression instead.
///
/// Two idioms are supported, with an optional `&`/`*` in front:
/// a variable (reported where it's declared) and a composite literal
/// (reported where it's constructed).
fn anonymous_position<'u>(unit: &'u Unit, expr: &'u Expr) -> Option<&'u Location> {
    let expr = match &expr.kind {
        ExprKind::Unary { operand, .. } => unit.expr(*operand)?,
        _ => expr,
    };
    match &expr.kind {
        ExprKind::Ident { declared_at, .. } => declared_at.as_ref(),
        ExprKind::CompositeLit => Some(&expr.at),
        ExprKind::Unary { .. } | ExprKind::Other => {
            tracing::trace!(
                at = %expr.at,
                "Unsupported expression shape for an anonymous record"
            );
            None
        }
    }
}
