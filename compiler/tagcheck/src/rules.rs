//! Which calls serialize a value, and which tag their serializer reads.
use indexmap::IndexMap;
use tagcheck_unit::{Call, ExprId};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// How a serialization function consumes its argument.
pub struct SerializationRule {
    /// The struct tag key the serializer reads, e.g. `json`.
    pub tag: String,
    /// The 0-based position of the argument that carries the value being (de)serialized.
    pub arg_pos: usize,
    /// Methods that take over (de)serialization for a type.
    ///
    /// A named type with any of these methods in its method set
    /// is not inspected: its fields are none of our business.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub opt_out_methods: Vec<String>,
}

/// A successful match between a call and a [`SerializationRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallMatch<'a> {
    /// The fully qualified name of the matched function.
    pub function: &'a str,
    pub tag: &'a str,
    /// The argument expression that must be inspected.
    pub arg: ExprId,
    pub opt_out_methods: &'a [String],
}

#[derive(Debug, Clone, Default)]
/// A lookup table from fully qualified function names to [`SerializationRule`]s.
///
/// Iteration follows insertion order.
pub struct RuleTable {
    rules: IndexMap<String, SerializationRule>,
}

struct Family {
    tag: &'static str,
    opt_out_methods: &'static [&'static str],
    functions: &'static [(&'static str, usize)],
}

const BUILTIN: &[Family] = &[
    Family {
        tag: "json",
        opt_out_methods: &["MarshalJSON", "UnmarshalJSON", "MarshalText", "UnmarshalText"],
        functions: &[
            ("encoding/json.Marshal", 0),
            ("encoding/json.MarshalIndent", 0),
            ("encoding/json.Unmarshal", 1),
            ("(*encoding/json.Encoder).Encode", 0),
            ("(*encoding/json.Decoder).Decode", 0),
        ],
    },
    Family {
        tag: "xml",
        opt_out_methods: &["MarshalXML", "UnmarshalXML", "MarshalText", "UnmarshalText"],
        functions: &[
            ("encoding/xml.Marshal", 0),
            ("encoding/xml.MarshalIndent", 0),
            ("encoding/xml.Unmarshal", 1),
            ("(*encoding/xml.Encoder).Encode", 0),
            ("(*encoding/xml.Encoder).EncodeElement", 0),
            ("(*encoding/xml.Decoder).Decode", 0),
            ("(*encoding/xml.Decoder).DecodeElement", 0),
        ],
    },
    Family {
        tag: "yaml",
        opt_out_methods: &["MarshalYAML", "UnmarshalYAML"],
        functions: &[
            ("gopkg.in/yaml.v3.Marshal", 0),
            ("gopkg.in/yaml.v3.Unmarshal", 1),
            ("(*gopkg.in/yaml.v3.Encoder).Encode", 0),
            ("(*gopkg.in/yaml.v3.Decoder).Decode", 0),
        ],
    },
    Family {
        tag: "toml",
        opt_out_methods: &["MarshalTOML", "UnmarshalTOML", "MarshalText", "UnmarshalText"],
        functions: &[
            ("github.com/BurntSushi/toml.Unmarshal", 1),
            ("github.com/BurntSushi/toml.Decode", 1),
            ("github.com/BurntSushi/toml.DecodeFile", 1),
            ("(*github.com/BurntSushi/toml.Encoder).Encode", 0),
            ("(*github.com/BurntSushi/toml.Decoder).Decode", 0),
        ],
    },
    Family {
        tag: "mapstructure",
        opt_out_methods: &[],
        functions: &[
            ("github.com/mitchellh/mapstructure.Decode", 1),
            ("github.com/mitchellh/mapstructure.DecodeMetadata", 1),
            ("github.com/mitchellh/mapstructure.WeakDecode", 1),
            ("github.com/mitchellh/mapstructure.WeakDecodeMetadata", 1),
        ],
    },
];

impl RuleTable {
    /// A table with no rules.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The rules for the serializers tagcheck knows about out of the box.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for family in BUILTIN {
            for (function, arg_pos) in family.functions {
                table.insert(
                    *function,
                    SerializationRule {
                        tag: family.tag.to_owned(),
                        arg_pos: *arg_pos,
                        opt_out_methods: family
                            .opt_out_methods
                            .iter()
                            .map(|m| (*m).to_owned())
                            .collect(),
                    },
                );
            }
        }
        table
    }

    /// Register a rule for `function`.
    ///
    /// If a rule was already registered for the same function, it's replaced and returned.
    pub fn insert(
        &mut self,
        function: impl Into<String>,
        rule: SerializationRule,
    ) -> Option<SerializationRule> {
        self.rules.insert(function.into(), rule)
    }

    pub fn get(&self, function: &str) -> Option<&SerializationRule> {
        self.rules.get(function)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SerializationRule)> {
        self.rules.iter().map(|(f, r)| (f.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Determine if `call` invokes a known serialization function and, if so,
    /// which argument must be inspected.
    ///
    /// It returns `None` if the callee can't be determined statically, if it's not
    /// in the table or if the call doesn't have enough arguments.
    pub fn match_call(&self, call: &Call) -> Option<CallMatch<'_>> {
        let callee = call.callee.as_deref()?;
        let (function, rule) = self.rules.get_key_value(callee)?;
        let Some(arg) = call.args.get(rule.arg_pos) else {
            tracing::trace!(
                function = %function,
                arg_pos = rule.arg_pos,
                n_args = call.args.len(),
                "The call has fewer arguments than expected, skipping it"
            );
            return None;
        };
        Some(CallMatch {
            function,
            tag: &rule.tag,
            arg: *arg,
            opt_out_methods: &rule.opt_out_methods,
        })
    }
}

#[cfg(test)]
mod tests {
    use tagcheck_unit::{Call, ExprId, Location};

    use super::{RuleTable, SerializationRule};

    fn call(callee: Option<&str>, n_args: u32) -> Call {
        Call {
            at: Location::new("main.go", 1, 1),
            callee: callee.map(String::from),
            args: (0..n_args).map(ExprId).collect(),
        }
    }

    #[test]
    fn json_functions_inspect_the_right_argument() {
        let table = RuleTable::builtin();
        for (function, expected) in [
            ("encoding/json.Marshal", 0),
            ("encoding/json.MarshalIndent", 0),
            ("(*encoding/json.Encoder).Encode", 0),
            ("(*encoding/json.Decoder).Decode", 0),
            ("encoding/json.Unmarshal", 1),
        ] {
            let m = table.match_call(&call(Some(function), 3)).unwrap();
            assert_eq!(m.tag, "json");
            assert_eq!(m.function, function);
            assert_eq!(m.arg, ExprId(expected), "{function}");
        }
    }

    #[test]
    fn unknown_and_dynamic_callees_do_not_match() {
        let table = RuleTable::builtin();
        assert!(table.match_call(&call(Some("fmt.Println"), 1)).is_none());
        assert!(table.match_call(&call(None, 1)).is_none());
    }

    #[test]
    fn calls_with_too_few_arguments_do_not_match() {
        let table = RuleTable::builtin();
        assert!(
            table
                .match_call(&call(Some("encoding/json.Unmarshal"), 1))
                .is_none()
        );
    }

    #[test]
    fn an_inserted_rule_replaces_the_builtin_one() {
        let mut table = RuleTable::builtin();
        let n_rules = table.len();
        let previous = table.insert(
            "encoding/json.Marshal",
            SerializationRule {
                tag: "custom".into(),
                arg_pos: 0,
                opt_out_methods: vec![],
            },
        );
        assert_eq!(previous.unwrap().tag, "json");
        assert_eq!(table.len(), n_rules);
        let m = table
            .match_call(&call(Some("encoding/json.Marshal"), 1))
            .unwrap();
        assert_eq!(m.tag, "custom");
        assert!(m.opt_out_methods.is_empty());
    }

    #[test]
    fn builtin_families_carry_their_opt_out_methods() {
        let table = RuleTable::builtin();
        let yaml = table.get("gopkg.in/yaml.v3.Unmarshal").unwrap();
        assert_eq!(yaml.tag, "yaml");
        assert_eq!(yaml.arg_pos, 1);
        assert_eq!(yaml.opt_out_methods, ["MarshalYAML", "UnmarshalYAML"]);
        assert!(
            table
                .get("github.com/mitchellh/mapstructure.Decode")
                .unwrap()
                .opt_out_methods
                .is_empty()
        );
        assert!(!RuleTable::empty().iter().any(|_| true));
    }
}
