use crate::{
    Call, Expr, ExprId, ExprKind, Field, Location, NamedType, SourceFile, StructType, Type,
    TypeId, UnaryOp, Unit,
};

/// Assemble a [`Unit`] programmatically.
///
/// Front-ends that link against this crate can use it instead of emitting JSON by hand.
/// Ids are handed out in insertion order.
///
/// Self-referential records require a forward declaration:
///
/// ```rust
/// use tagcheck_unit::{Location, UnitBuilder};
///
/// let mut b = UnitBuilder::new("example.com/tree");
/// let node = b.declare("Node", Location::new("tree.go", 3, 6));
/// let ptr = b.pointer(node);
/// let s = b.record([("Next", r#"json:"next""#, ptr)]);
/// b.define(node, s);
/// assert!(b.build().validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct UnitBuilder {
    unit: Unit,
}

impl UnitBuilder {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            unit: Unit {
                package: package.into(),
                files: Vec::new(),
                types: Vec::new(),
                exprs: Vec::new(),
                calls: Vec::new(),
            },
        }
    }

    /// Embed the contents of a source file.
    pub fn file(&mut self, path: impl Into<String>, contents: impl Into<String>) -> &mut Self {
        self.unit.files.push(SourceFile {
            path: path.into(),
            contents: Some(contents.into()),
        });
        self
    }

    pub fn ty(&mut self, ty: Type) -> TypeId {
        let id = TypeId(self.unit.types.len() as u32);
        self.unit.types.push(ty);
        id
    }

    pub fn basic(&mut self, name: &str) -> TypeId {
        self.ty(Type::Basic { name: name.into() })
    }

    pub fn pointer(&mut self, pointee: TypeId) -> TypeId {
        self.ty(Type::Pointer { pointee })
    }

    pub fn slice(&mut self, element: TypeId) -> TypeId {
        self.ty(Type::Slice { element })
    }

    pub fn map(&mut self, key: TypeId, value: TypeId) -> TypeId {
        self.ty(Type::Map { key, value })
    }

    pub fn interface(&mut self) -> TypeId {
        self.ty(Type::Interface {
            methods: Vec::new(),
        })
    }

    /// Add a struct type from `(name, tag, type)` triples.
    pub fn record<'a, I>(&mut self, fields: I) -> TypeId
    where
        I: IntoIterator<Item = (&'a str, &'a str, TypeId)>,
    {
        let fields = fields
            .into_iter()
            .map(|(name, tag, ty)| Field {
                name: name.into(),
                tag: tag.into(),
                ty,
            })
            .collect();
        self.ty(Type::Struct(StructType { fields }))
    }

    /// Add a named type whose underlying type is already known.
    pub fn named(&mut self, name: &str, declared_at: Location, underlying: TypeId) -> TypeId {
        self.ty(Type::Named(NamedType {
            name: name.into(),
            declared_at,
            underlying,
            methods: Vec::new(),
        }))
    }

    /// Reserve an id for a named type whose underlying type will be provided later,
    /// via [`Self::define`].
    ///
    /// Until it's defined, the named type points at itself and the unit won't validate.
    pub fn declare(&mut self, name: &str, declared_at: Location) -> TypeId {
        let id = TypeId(self.unit.types.len() as u32);
        self.named(name, declared_at, id)
    }

    /// Set the underlying type of a named type.
    ///
    /// # Panics
    ///
    /// Panics if `named` is not a named type.
    pub fn define(&mut self, named: TypeId, underlying: TypeId) -> &mut Self {
        match &mut self.unit.types[named.index()] {
            Type::Named(n) => n.underlying = underlying,
            other => panic!("Type #{} is not a named type: {other:?}", named.0),
        }
        self
    }

    /// Add methods to the method set of a named type.
    ///
    /// # Panics
    ///
    /// Panics if `named` is not a named type.
    pub fn methods<'a, I>(&mut self, named: TypeId, methods: I) -> &mut Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        match &mut self.unit.types[named.index()] {
            Type::Named(n) => n.methods.extend(methods.into_iter().map(String::from)),
            other => panic!("Type #{} is not a named type: {other:?}", named.0),
        }
        self
    }

    pub fn expr(&mut self, at: Location, ty: Option<TypeId>, kind: ExprKind) -> ExprId {
        let id = ExprId(self.unit.exprs.len() as u32);
        self.unit.exprs.push(Expr { at, ty, kind });
        id
    }

    /// A reference to a variable declared at `declared_at`.
    pub fn ident(
        &mut self,
        at: Location,
        ty: TypeId,
        name: &str,
        declared_at: Option<Location>,
    ) -> ExprId {
        self.expr(
            at,
            Some(ty),
            ExprKind::Ident {
                name: name.into(),
                declared_at,
            },
        )
    }

    /// `&operand`. The type of the expression is a fresh pointer to the operand's type.
    pub fn address_of(&mut self, at: Location, operand: ExprId) -> ExprId {
        let operand_ty = self.unit.exprs[operand.index()].ty;
        let ty = operand_ty.map(|t| self.pointer(t));
        self.expr(
            at,
            ty,
            ExprKind::Unary {
                op: UnaryOp::AddressOf,
                operand,
            },
        )
    }

    /// A call to a statically known function or method.
    pub fn call<I>(&mut self, at: Location, callee: &str, args: I) -> &mut Self
    where
        I: IntoIterator<Item = ExprId>,
    {
        self.unit.calls.push(Call {
            at,
            callee: Some(callee.into()),
            args: args.into_iter().collect(),
        });
        self
    }

    /// A call whose callee can't be determined statically.
    pub fn dynamic_call<I>(&mut self, at: Location, args: I) -> &mut Self
    where
        I: IntoIterator<Item = ExprId>,
    {
        self.unit.calls.push(Call {
            at,
            callee: None,
            args: args.into_iter().collect(),
        });
        self
    }

    pub fn build(self) -> Unit {
        self.unit
    }
}
