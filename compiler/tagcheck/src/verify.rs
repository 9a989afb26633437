use fixedbitset::FixedBitSet;
use tagcheck_unit::{NamedType, TypeId, Unit};

use crate::resolve::{Record, record_shape};

/// The first exported field without the required tag, found while verifying a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Violation<'u> {
    /// The name of the untagged field.
    pub field: &'u str,
    /// The deepest named record, nested inside the verified one, that owns
    /// (directly or via anonymous records) the untagged field.
    ///
    /// `None` if the untagged field belongs to the verified record itself,
    /// or only to anonymous records nested inside it.
    pub escalated: Option<&'u NamedType>,
}

/// Check that every exported field of a record, and of every record nested inside it,
/// carries a tag for the given key.
pub struct TagVerifier<'u, 'r> {
    unit: &'u Unit,
    tag: &'r str,
    opt_out_methods: &'r [String],
    /// The struct types currently being verified, from the outermost to the innermost.
    on_path: FixedBitSet,
}

impl<'u, 'r> TagVerifier<'u, 'r> {
    pub fn new(unit: &'u Unit, tag: &'r str, opt_out_methods: &'r [String]) -> Self {
        Self {
            unit,
            tag,
            opt_out_methods,
            on_path: FixedBitSet::with_capacity(unit.types.len()),
        }
    }

    /// Returns `Ok(())` if the record is fully compliant.
    ///
    /// Verification stops at the first untagged exported field.
    pub fn verify(&mut self, record: Record<'u>) -> Result<(), Violation<'u>> {
        self.on_path.grow(record.id.index() + 1);
        self.on_path.insert(record.id.index());
        let outcome = self.verify_fields(record);
        self.on_path.set(record.id.index(), false);
        outcome
    }

    fn verify_fields(&mut self, record: Record<'u>) -> Result<(), Violation<'u>> {
        for field in record.fields {
            if !field.is_exported() {
                continue;
            }
            if !has_tag(&field.tag, self.tag) {
                return Err(Violation {
                    field: &field.name,
                    escalated: None,
                });
            }
            let Some(nested) = record_shape(self.unit, field.ty) else {
                continue;
            };
            if let Some(named) = nested.named() {
                if named.has_any_method(self.opt_out_methods) {
                    tracing::trace!(
                        record = %named.name,
                        "The nested record controls its own encoding, skipping it"
                    );
                    continue;
                }
            }
            let nested_record = nested.record();
            if self.is_on_path(nested_record.id) {
                tracing::trace!(
                    field = %field.name,
                    "The field refers back to a record that's already being verified"
                );
                continue;
            }
            if let Err(mut violation) = self.verify(nested_record) {
                if violation.escalated.is_none() {
                    violation.escalated = nested.named();
                }
                return Err(violation);
            }
        }
        Ok(())
    }

    fn is_on_path(&self, id: TypeId) -> bool {
        self.on_path.contains(id.index())
    }
}

/// Returns `true` if the raw struct tag contains an entry for `key`.
///
/// Tags are a space-separated list of `key:"value"` pairs.
/// The value is not inspected.
pub fn has_tag(raw: &str, key: &str) -> bool {
    raw.split(' ')
        .filter(|token| !token.is_empty())
        .any(|token| {
            token
                .strip_prefix(key)
                .is_some_and(|rest| rest.starts_with(':'))
        })
}

#[cfg(test)]
mod tests {
    use tagcheck_unit::{Location, TypeId, Unit, UnitBuilder};

    use super::{TagVerifier, has_tag};
    use crate::resolve::record_shape;

    fn at(line: u32) -> Location {
        Location::new("models.go", line, 6)
    }

    fn verify(unit: &Unit, ty: TypeId, opt_out: &[String]) -> Result<(), (String, Option<String>)> {
        let record = record_shape(unit, ty).unwrap().record();
        TagVerifier::new(unit, "json", opt_out)
            .verify(record)
            .map_err(|v| (v.field.to_owned(), v.escalated.map(|n| n.name.clone())))
    }

    #[test]
    fn tag_tokens_are_matched_on_their_key() {
        assert!(has_tag(r#"json:"name""#, "json"));
        assert!(has_tag(r#"xml:"n"  json:"name,omitempty""#, "json"));
        assert!(has_tag(r#"json:"-""#, "json"));
        assert!(!has_tag("", "json"));
        assert!(!has_tag(r#"xml:"name""#, "json"));
        assert!(!has_tag(r#"jsonschema:"x""#, "json"));
        assert!(!has_tag(r#"json"#, "json"));
    }

    #[test]
    fn only_spaces_separate_tag_tokens() {
        assert!(!has_tag("xml:\"n\"\tjson:\"name\"", "json"));
        assert!(has_tag("json:\"name\"\txml:\"n\"", "json"));
    }

    #[test]
    fn a_fully_tagged_record_is_compliant() {
        let mut b = UnitBuilder::new("app");
        let string = b.basic("string");
        let s = b.record([("Name", r#"json:"name""#, string)]);
        let user = b.named("User", at(1), s);
        let unit = b.build();
        assert_eq!(verify(&unit, user, &[]), Ok(()));
    }

    #[test]
    fn the_first_untagged_exported_field_is_reported() {
        let mut b = UnitBuilder::new("app");
        let string = b.basic("string");
        let s = b.record([
            ("Name", r#"json:"name""#, string),
            ("Email", "", string),
            ("Phone", "", string),
        ]);
        let user = b.named("User", at(1), s);
        let unit = b.build();
        assert_eq!(verify(&unit, user, &[]), Err(("Email".into(), None)));
    }

    #[test]
    fn unexported_fields_are_ignored() {
        let mut b = UnitBuilder::new("app");
        let string = b.basic("string");
        let s = b.record([("Name", r#"json:"name""#, string), ("password", "", string)]);
        let user = b.named("User", at(1), s);
        let unit = b.build();
        assert_eq!(verify(&unit, user, &[]), Ok(()));
    }

    #[test]
    fn compliant_nested_records_are_fine() {
        let mut b = UnitBuilder::new("app");
        let int = b.basic("int");
        let inner_s = b.record([("Value", r#"json:"value""#, int)]);
        let inner = b.named("Inner", at(1), inner_s);
        let inner_ptr = b.pointer(inner);
        let outer_s = b.record([
            ("Inner", r#"json:"inner""#, inner),
            ("MaybeInner", r#"json:"maybe_inner""#, inner_ptr),
        ]);
        let outer = b.named("Outer", at(5), outer_s);
        let unit = b.build();
        assert_eq!(verify(&unit, outer, &[]), Ok(()));
    }

    #[test]
    fn a_failing_nested_record_escalates_the_position() {
        let mut b = UnitBuilder::new("app");
        let int = b.basic("int");
        let inner_s = b.record([("Value", "", int)]);
        let inner = b.named("Inner", at(1), inner_s);
        let outer_s = b.record([("Inner", r#"json:"inner""#, inner)]);
        let outer = b.named("Outer", at(5), outer_s);
        let unit = b.build();
        assert_eq!(
            verify(&unit, outer, &[]),
            Err(("Value".into(), Some("Inner".into())))
        );
    }

    #[test]
    fn escalation_points_at_the_deepest_named_offender() {
        let mut b = UnitBuilder::new("app");
        let int = b.basic("int");
        let c_s = b.record([("Value", "", int)]);
        let c = b.named("C", at(1), c_s);
        let c_ptr = b.pointer(c);
        // An anonymous record in the middle doesn't change the outcome.
        let anon = b.record([("C", r#"json:"c""#, c_ptr)]);
        let b_s = b.record([("Anon", r#"json:"anon""#, anon)]);
        let b_named = b.named("B", at(5), b_s);
        let a_s = b.record([("B", r#"json:"b""#, b_named)]);
        let a = b.named("A", at(9), a_s);
        let unit = b.build();
        assert_eq!(
            verify(&unit, a, &[]),
            Err(("Value".into(), Some("C".into())))
        );
    }

    #[test]
    fn untagged_fields_of_anonymous_nested_records_escalate_to_the_nearest_named_one() {
        let mut b = UnitBuilder::new("app");
        let int = b.basic("int");
        let anon = b.record([("X", "", int)]);
        let inner_s = b.record([("Anon", r#"json:"anon""#, anon)]);
        let inner = b.named("Inner", at(1), inner_s);
        let outer_s = b.record([("Inner", r#"json:"inner""#, inner)]);
        let outer = b.named("Outer", at(5), outer_s);
        let unit = b.build();
        assert_eq!(
            verify(&unit, outer, &[]),
            Err(("X".into(), Some("Inner".into())))
        );
        // Verified on its own, nothing named sits between `Inner` and the field.
        assert_eq!(verify(&unit, inner, &[]), Err(("X".into(), None)));
    }

    #[test]
    fn an_untagged_field_holding_a_record_is_reported_on_the_outer_record() {
        let mut b = UnitBuilder::new("app");
        let int = b.basic("int");
        let inner_s = b.record([("Value", r#"json:"value""#, int)]);
        let inner = b.named("Inner", at(1), inner_s);
        let outer_s = b.record([("Inner", "", inner)]);
        let outer = b.named("Outer", at(5), outer_s);
        let unit = b.build();
        assert_eq!(verify(&unit, outer, &[]), Err(("Inner".into(), None)));
    }

    #[test]
    fn self_referential_records_terminate() {
        let mut b = UnitBuilder::new("app");
        let string = b.basic("string");
        let node = b.declare("Node", at(1));
        let node_ptr = b.pointer(node);
        let s = b.record([
            ("Value", r#"json:"value""#, string),
            ("Next", r#"json:"next""#, node_ptr),
        ]);
        b.define(node, s);
        let unit = b.build();
        assert_eq!(verify(&unit, node, &[]), Ok(()));
    }

    #[test]
    fn mutually_recursive_records_terminate() {
        let mut b = UnitBuilder::new("app");
        let string = b.basic("string");
        let a = b.declare("A", at(1));
        let bb = b.declare("B", at(5));
        let a_ptr = b.pointer(a);
        let b_ptr = b.pointer(bb);
        let a_s = b.record([("B", r#"json:"b""#, b_ptr)]);
        let b_s = b.record([
            ("A", r#"json:"a""#, a_ptr),
            ("Label", r#"json:"label""#, string),
        ]);
        b.define(a, a_s);
        b.define(bb, b_s);
        let unit = b.build();
        assert_eq!(verify(&unit, a, &[]), Ok(()));
    }

    #[test]
    fn recursive_edges_still_require_a_tag() {
        let mut b = UnitBuilder::new("app");
        let node = b.declare("Node", at(1));
        let node_ptr = b.pointer(node);
        let s = b.record([("Next", "", node_ptr)]);
        b.define(node, s);
        let unit = b.build();
        assert_eq!(verify(&unit, node, &[]), Err(("Next".into(), None)));
    }

    #[test]
    fn the_same_record_can_appear_on_sibling_paths() {
        let mut b = UnitBuilder::new("app");
        let int = b.basic("int");
        let money_s = b.record([("Cents", "", int)]);
        let money = b.named("Money", at(1), money_s);
        let order_s = b.record([
            ("Total", r#"json:"total""#, money),
            ("Tax", r#"json:"tax""#, money),
        ]);
        let order = b.named("Order", at(5), order_s);
        let unit = b.build();
        assert_eq!(
            verify(&unit, order, &[]),
            Err(("Cents".into(), Some("Money".into())))
        );
    }

    #[test]
    fn nested_records_with_custom_codecs_are_not_inspected() {
        let mut b = UnitBuilder::new("app");
        let int = b.basic("int");
        let ts_s = b.record([("Seconds", "", int)]);
        let ts = b.named("Timestamp", at(1), ts_s);
        b.methods(ts, ["MarshalJSON", "String"]);
        let event_s = b.record([("At", r#"json:"at""#, ts)]);
        let event = b.named("Event", at(5), event_s);
        let unit = b.build();

        let opt_out = vec!["MarshalJSON".to_owned()];
        assert_eq!(verify(&unit, event, &opt_out), Ok(()));
        assert_eq!(
            verify(&unit, event, &[]),
            Err(("Seconds".into(), Some("Timestamp".into())))
        );
    }
}
