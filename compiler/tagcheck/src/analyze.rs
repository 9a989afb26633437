use rayon::prelude::*;
use tagcheck_unit::{Call, Unit};

use crate::resolve::resolve_argument;
use crate::rules::RuleTable;
use crate::sink::{Finding, ReportSink};
use crate::verify::TagVerifier;

/// Check every serialization call in `unit`.
///
/// Findings are returned in the order of the calls that produced them.
/// A record reached by multiple calls is reported once.
#[tracing::instrument(
    name = "Analyze unit",
    skip_all,
    fields(package = %unit.package, n_calls = unit.calls.len())
)]
pub fn analyze(unit: &Unit, rules: &RuleTable) -> Vec<Finding> {
    let mut sink = ReportSink::new();
    for call in &unit.calls {
        check_call(unit, rules, call, &mut sink);
    }
    tracing::debug!(n_findings = sink.len(), "Analysis completed");
    sink.into_findings()
}

/// Check several independent units in parallel.
///
/// The output is aligned with the input: the i-th entry holds the findings for the i-th unit.
pub fn analyze_units(units: &[Unit], rules: &RuleTable) -> Vec<Vec<Finding>> {
    units.par_iter().map(|unit| analyze(unit, rules)).collect()
}

fn check_call(unit: &Unit, rules: &RuleTable, call: &Call, sink: &mut ReportSink) {
    let Some(m) = rules.match_call(call) else {
        return;
    };
    let Some(resolved) = resolve_argument(unit, m.arg) else {
        tracing::trace!(
            at = %call.at,
            function = %m.function,
            "The argument is not a record, or its position can't be determined"
        );
        return;
    };
    let named = resolved.shape.named();
    if let Some(named) = named {
        if named.has_any_method(m.opt_out_methods) {
            tracing::debug!(
                at = %call.at,
                record = %named.name,
                "The record controls its own encoding, skipping it"
            );
            return;
        }
    }

    let mut verifier = TagVerifier::new(unit, m.tag, m.opt_out_methods);
    let Err(violation) = verifier.verify(resolved.shape.record()) else {
        return;
    };
    let (position, record) = match violation.escalated {
        Some(nested) => (&nested.declared_at, Some(&nested.name)),
        None => (resolved.position, named.map(|n| &n.name)),
    };
    sink.maybe_report(Finding {
        position: position.clone(),
        tag: m.tag.to_owned(),
        record: record.cloned(),
        field: violation.field.to_owned(),
        call: call.at.clone(),
    });
}
