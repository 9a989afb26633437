//! The schema used by tagcheck to serialize and deserialize type-checked compilation units.
//!
//! A unit is produced by an external front-end (the type checker of the analysed language).
//! It captures exactly what the analysis needs: the static types reachable from serialization
//! calls, the shape of their argument expressions and the positions diagnostics point at.
//!
//! Types and expressions live in two flat arenas, indexed by [`TypeId`] and [`ExprId`].
//! Cross-references between entries are expressed with those ids, which makes
//! self-referential record types straightforward to encode.
use std::fmt;
use std::fmt::Formatter;

pub use builder::UnitBuilder;
pub use validate::InvalidUnit;

mod builder;
mod validate;

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
/// A type-checked compilation unit.
pub struct Unit {
    /// The import path of the package the unit belongs to.
    pub package: String,
    /// The source files of the unit.
    ///
    /// Only used to render code snippets alongside diagnostics.
    #[serde(default)]
    pub files: Vec<SourceFile>,
    /// All types referenced by the unit. [`TypeId`]s index into this vector.
    #[serde(default)]
    pub types: Vec<Type>,
    /// All expressions referenced by the unit. [`ExprId`]s index into this vector.
    #[serde(default)]
    pub exprs: Vec<Expr>,
    /// Every call expression in the unit, in source order.
    #[serde(default)]
    pub calls: Vec<Call>,
}

impl Unit {
    /// Retrieve a type by id.
    pub fn ty(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.index())
    }

    /// Retrieve an expression by id.
    pub fn expr(&self, id: ExprId) -> Option<&Expr> {
        self.exprs.get(id.index())
    }

    /// Retrieve the embedded contents of a source file, if the front-end included them.
    pub fn file_contents(&self, path: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.path == path)
            .and_then(|f| f.contents.as_deref())
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    /// The path of the file, as it appears in [`Location::file`].
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
}

#[derive(
    serde::Serialize,
    serde::Deserialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
)]
#[serde(transparent)]
/// The index of a [`Type`] in [`Unit::types`].
pub struct TypeId(pub u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(
    serde::Serialize,
    serde::Deserialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
)]
#[serde(transparent)]
/// The index of an [`Expr`] in [`Unit::exprs`].
pub struct ExprId(pub u32);

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// The static type of a value, as computed by the front-end.
pub enum Type {
    /// A type with a declared name, e.g. `type User struct { ... }`.
    Named(NamedType),
    /// A struct type, e.g. the underlying type of a named record or an inline `struct { ... }`.
    Struct(StructType),
    /// One level of indirection, e.g. `*User`.
    Pointer { pointee: TypeId },
    /// A primitive, e.g. `string` or `int`.
    Basic { name: String },
    Slice { element: TypeId },
    Map { key: TypeId, value: TypeId },
    Interface {
        #[serde(default)]
        methods: Vec<String>,
    },
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NamedType {
    /// The name of the type, as declared.
    pub name: String,
    /// Where the name was declared.
    pub declared_at: Location,
    /// The type the name stands for.
    ///
    /// It is never another named type.
    pub underlying: TypeId,
    /// The method set of the type, including methods declared on a pointer receiver.
    #[serde(default)]
    pub methods: Vec<String>,
}

impl NamedType {
    /// Returns `true` if any of the given methods is part of this type's method set.
    pub fn has_any_method<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names
            .iter()
            .any(|n| self.methods.iter().any(|m| m == n.as_ref()))
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct StructType {
    /// Fields, in declaration order.
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
/// A field of a struct type.
pub struct Field {
    /// The field name.
    ///
    /// Embedded fields are named after their type and are checked like any other field.
    pub name: String,
    /// The raw tag attached to the field, e.g. `json:"name" xml:"name"`.
    ///
    /// Empty if the field has no tag.
    #[serde(default)]
    pub tag: String,
    pub ty: TypeId,
}

impl Field {
    /// Returns `true` if the field can be accessed outside of the package that declares it.
    ///
    /// The rule is purely lexical: the name must start with an uppercase letter.
    pub fn is_exported(&self) -> bool {
        self.name.chars().next().is_some_and(char::is_uppercase)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
/// An expression, together with its static type.
pub struct Expr {
    /// Where the expression starts.
    pub at: Location,
    /// The static type of the expression, if the front-end could determine it.
    #[serde(default)]
    pub ty: Option<TypeId>,
    #[serde(flatten)]
    pub kind: ExprKind,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// The syntactic shape of an [`Expr`].
///
/// Only the shapes the analysis distinguishes are modelled;
/// everything else is [`ExprKind::Other`].
pub enum ExprKind {
    /// A reference to a variable, e.g. `x`.
    Ident {
        name: String,
        /// Where the variable was declared, if it was declared in this unit.
        #[serde(default)]
        declared_at: Option<Location>,
    },
    /// A unary operator applied to another expression, e.g. `&x`.
    Unary { op: UnaryOp, operand: ExprId },
    /// The literal construction of a value, e.g. `User{Name: "x"}`.
    CompositeLit,
    Other,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// `&x`
    AddressOf,
    /// `*x`
    Deref,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
/// A call expression.
pub struct Call {
    pub at: Location,
    /// The fully qualified name of the statically resolved callee,
    /// e.g. `encoding/json.Marshal` or `(*encoding/json.Encoder).Encode`.
    ///
    /// `None` if the callee can't be determined statically (e.g. a call through a function value).
    #[serde(default)]
    pub callee: Option<String>,
    /// The argument expressions, in order.
    #[serde(default)]
    pub args: Vec<ExprId>,
}

#[derive(
    Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
/// A set of coordinates to identify a precise spot in a source file.
pub struct Location {
    /// The path of the source file.
    pub file: String,
    /// The line number.
    ///
    /// Lines are 1-indexed (i.e. the first line is numbered as 1, not 0).
    pub line: u32,
    /// The column number.
    ///
    /// Columns are 1-indexed (i.e. the first column is numbered as 1, not 0).
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
