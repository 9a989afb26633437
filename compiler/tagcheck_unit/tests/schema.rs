use tagcheck_unit::{ExprKind, Location, Type, TypeId, UnaryOp, Unit};

// The shape a front-end is expected to emit.
const UNIT: &str = r#"{
    "package": "example.com/app",
    "files": [{ "path": "main.go" }],
    "types": [
        { "kind": "basic", "name": "string" },
        { "kind": "struct", "fields": [{ "name": "Name", "ty": 0 }] },
        {
            "kind": "named",
            "name": "User",
            "declared_at": { "file": "main.go", "line": 5, "column": 6 },
            "underlying": 1,
            "methods": ["MarshalJSON"]
        },
        { "kind": "pointer", "pointee": 2 }
    ],
    "exprs": [
        {
            "kind": "ident",
            "name": "u",
            "declared_at": { "file": "main.go", "line": 9, "column": 2 },
            "at": { "file": "main.go", "line": 10, "column": 18 },
            "ty": 2
        },
        {
            "kind": "unary",
            "op": "address_of",
            "operand": 0,
            "at": { "file": "main.go", "line": 10, "column": 17 },
            "ty": 3
        }
    ],
    "calls": [
        {
            "at": { "file": "main.go", "line": 10, "column": 2 },
            "callee": "encoding/json.Marshal",
            "args": [1]
        },
        { "at": { "file": "main.go", "line": 11, "column": 2 } }
    ]
}"#;

#[test]
fn a_front_end_document_deserializes() {
    let unit: Unit = serde_json::from_str(UNIT).unwrap();
    unit.validate().unwrap();

    assert_eq!(unit.package, "example.com/app");
    assert_eq!(unit.file_contents("main.go"), None);

    let Some(Type::Named(user)) = unit.ty(TypeId(2)) else {
        panic!("Type #2 should be a named type");
    };
    assert_eq!(user.name, "User");
    assert_eq!(user.declared_at, Location::new("main.go", 5, 6));
    assert!(user.has_any_method(&["UnmarshalJSON", "MarshalJSON"]));
    assert!(!user.has_any_method(&["MarshalXML"]));

    let Some(Type::Struct(record)) = unit.ty(user.underlying) else {
        panic!("The underlying type of `User` should be a struct");
    };
    // Missing tags deserialize as empty strings.
    assert_eq!(record.fields[0].tag, "");
    assert!(record.fields[0].is_exported());

    let arg = unit.expr(unit.calls[0].args[0]).unwrap();
    assert_eq!(
        arg.kind,
        ExprKind::Unary {
            op: UnaryOp::AddressOf,
            operand: tagcheck_unit::ExprId(0)
        }
    );
    assert_eq!(arg.ty, Some(TypeId(3)));

    // A call without a static callee or arguments is still a valid call.
    assert_eq!(unit.calls[1].callee, None);
    assert!(unit.calls[1].args.is_empty());
}

#[test]
fn out_of_range_lookups_return_none() {
    let unit: Unit = serde_json::from_str(UNIT).unwrap();
    assert!(unit.ty(TypeId(99)).is_none());
    assert!(unit.expr(tagcheck_unit::ExprId(99)).is_none());
}

#[test]
fn dangling_arguments_are_reported() {
    let mut unit: Unit = serde_json::from_str(UNIT).unwrap();
    unit.calls[0].args.push(tagcheck_unit::ExprId(7));
    insta::assert_snapshot!(
        unit.validate().unwrap_err(),
        @"Call #0 refers to expression #7, but the unit only defines 2 expressions"
    );
}

#[test]
fn embedded_fields_are_plain_fields_named_after_their_type() {
    let unit: Unit = serde_json::from_str(
        r#"{
            "package": "example.com/app",
            "types": [
                { "kind": "struct" },
                {
                    "kind": "named",
                    "name": "Base",
                    "declared_at": { "file": "main.go", "line": 3, "column": 6 },
                    "underlying": 0
                },
                { "kind": "struct", "fields": [{ "name": "Base", "ty": 1, "embedded": true }] }
            ]
        }"#,
    )
    .unwrap();
    unit.validate().unwrap();

    let Some(Type::Struct(record)) = unit.ty(TypeId(2)) else {
        panic!("Type #2 should be a struct");
    };
    assert_eq!(record.fields[0].name, "Base");
    assert!(record.fields[0].is_exported());
}
