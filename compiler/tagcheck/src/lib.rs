//! Detect records passed to serialization functions whose exported fields
//! are not annotated with the tag the serializer relies on.
//!
//! The analysis runs on [`Unit`](tagcheck_unit::Unit)s, type-checked compilation units
//! produced by an external front-end. For each call in the unit:
//!
//! 1. the [`RuleTable`] decides if the callee is a known serialization function and which
//!    argument holds the value being (de)serialized;
//! 2. [`resolve_argument`] determines the record type of that argument
//!    and where a finding about it should point;
//! 3. the [`TagVerifier`] checks that every exported field, including those of nested records,
//!    carries the expected tag;
//! 4. the [`ReportSink`] makes sure each offending record is reported only once.
pub use analyze::{analyze, analyze_units};
pub use config::{ConfigError, DEFAULT_CONFIG_FILE, FunctionConfig, TagcheckConfig};
pub use load::{LoadUnitError, load_unit, parse_unit};
pub use resolve::{Record, RecordShape, ResolvedArgument, record_shape, resolve_argument};
pub use rules::{CallMatch, RuleTable, SerializationRule};
pub use sink::{Finding, ReportSink};
pub use verify::{TagVerifier, Violation, has_tag};

mod analyze;
mod config;
pub mod diagnostic;
mod load;
mod resolve;
mod rules;
mod sink;
mod verify;
