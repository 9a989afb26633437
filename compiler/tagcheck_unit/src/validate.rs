use crate::{ExprId, ExprKind, Type, TypeId, Unit};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
/// The unit violates one of the structural invariants of the schema.
pub enum InvalidUnit {
    #[error("Type #{referrer} refers to type #{missing}, but the unit only defines {len} types")]
    DanglingType {
        referrer: u32,
        missing: u32,
        len: usize,
    },
    #[error(
        "Expression #{referrer} refers to type #{missing}, but the unit only defines {len} types"
    )]
    DanglingExprType {
        referrer: u32,
        missing: u32,
        len: usize,
    },
    #[error(
        "Expression #{referrer} refers to expression #{missing}, but the unit only defines {len} expressions"
    )]
    DanglingOperand {
        referrer: u32,
        missing: u32,
        len: usize,
    },
    #[error(
        "Call #{call} refers to expression #{missing}, but the unit only defines {len} expressions"
    )]
    DanglingArgument { call: usize, missing: u32, len: usize },
    #[error(
        "The underlying type of `{name}` (type #{named}) is another named type. Underlying types must be fully resolved"
    )]
    NamedUnderlyingType { named: u32, name: String },
}

impl Unit {
    /// Check that every id in the unit points at an existing entry and that
    /// named types are resolved down to their underlying type.
    pub fn validate(&self) -> Result<(), InvalidUnit> {
        let n_types = self.types.len();
        let n_exprs = self.exprs.len();
        let check_type = |referrer: usize, id: TypeId| {
            if id.index() >= n_types {
                Err(InvalidUnit::DanglingType {
                    referrer: referrer as u32,
                    missing: id.0,
                    len: n_types,
                })
            } else {
                Ok(())
            }
        };

        for (i, ty) in self.types.iter().enumerate() {
            match ty {
                Type::Named(named) => {
                    check_type(i, named.underlying)?;
                    if let Type::Named(_) = &self.types[named.underlying.index()] {
                        return Err(InvalidUnit::NamedUnderlyingType {
                            named: i as u32,
                            name: named.name.clone(),
                        });
                    }
                }
                Type::Struct(s) => {
                    for field in &s.fields {
                        check_type(i, field.ty)?;
                    }
                }
                Type::Pointer { pointee } => check_type(i, *pointee)?,
                Type::Slice { element } => check_type(i, *element)?,
                Type::Map { key, value } => {
                    check_type(i, *key)?;
                    check_type(i, *value)?;
                }
                Type::Basic { .. } | Type::Interface { .. } => {}
            }
        }

        for (i, expr) in self.exprs.iter().enumerate() {
            if let Some(ty) = expr.ty.filter(|ty| ty.index() >= n_types) {
                return Err(InvalidUnit::DanglingExprType {
                    referrer: i as u32,
                    missing: ty.0,
                    len: n_types,
                });
            }
            if let ExprKind::Unary { operand, .. } = &expr.kind {
                if operand.index() >= n_exprs {
                    return Err(InvalidUnit::DanglingOperand {
                        referrer: i as u32,
                        missing: operand.0,
                        len: n_exprs,
                    });
                }
            }
        }

        for (i, call) in self.calls.iter().enumerate() {
            if let Some(ExprId(missing)) = call.args.iter().find(|a| a.index() >= n_exprs) {
                return Err(InvalidUnit::DanglingArgument {
                    call: i,
                    missing: *missing,
                    len: n_exprs,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{ExprKind, Location, TypeId, UnitBuilder};

    fn at(line: u32) -> Location {
        Location::new("main.go", line, 1)
    }

    #[test]
    fn a_well_formed_unit_is_valid() {
        let mut b = UnitBuilder::new("example.com/app");
        let string = b.basic("string");
        let s = b.record([("Name", r#"json:"name""#, string)]);
        let user = b.named("User", at(3), s);
        let arg = b.expr(at(10), Some(user), ExprKind::CompositeLit);
        b.call(at(10), "encoding/json.Marshal", [arg]);
        assert_eq!(b.build().validate(), Ok(()));
    }

    #[test]
    fn dangling_field_types_are_rejected() {
        let mut b = UnitBuilder::new("example.com/app");
        b.record([("Name", "", TypeId(42))]);
        insta::assert_snapshot!(
            b.build().validate().unwrap_err(),
            @"Type #0 refers to type #42, but the unit only defines 1 types"
        );
    }

    #[test]
    fn named_types_must_not_point_at_other_named_types() {
        let mut b = UnitBuilder::new("example.com/app");
        let string = b.basic("string");
        let inner = b.named("Inner", at(1), string);
        b.named("Outer", at(2), inner);
        insta::assert_snapshot!(
            b.build().validate().unwrap_err(),
            @"The underlying type of `Outer` (type #2) is another named type. Underlying types must be fully resolved"
        );
    }

    #[test]
    fn forward_declarations_must_be_completed() {
        let mut b = UnitBuilder::new("example.com/app");
        b.declare("Node", at(1));
        insta::assert_snapshot!(
            b.build().validate().unwrap_err(),
            @"The underlying type of `Node` (type #0) is another named type. Underlying types must be fully resolved"
        );
    }
}
