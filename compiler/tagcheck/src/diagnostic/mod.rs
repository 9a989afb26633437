//! A toolkit to turn findings into diagnostics for the user.
pub use self::miette::{SourceSpanExt, location_span};
pub use compiler_diagnostic::{AnnotatedSnippet, CompilerDiagnostic, CompilerDiagnosticBuilder};
pub use source_file::SourceCache;

use ::miette::NamedSource;
use tagcheck_unit::Location;

use crate::sink::Finding;

mod compiler_diagnostic;
mod miette;
mod source_file;

/// Build the diagnostic for a finding.
///
/// The primary snippet points at the offending record, a secondary one at the
/// serialization call that reached it. Snippets are omitted for files that can't be retrieved.
pub fn finding_diagnostic(finding: &Finding, sources: &mut SourceCache<'_>) -> CompilerDiagnostic {
    let record_label = match &finding.record {
        Some(name) => format!("`{name}` is declared here"),
        None => "The anonymous struct is defined here".to_owned(),
    };
    let mut primary = annotated(sources, &finding.position, record_label);
    let mut call = annotated(sources, &finding.call, "The value is serialized here".to_owned());
    if finding.call.file == finding.position.file {
        if let (Some(primary), Some(call)) = (primary.as_mut(), call.take()) {
            primary.labels.extend(call.labels);
        }
    }
    let (source, labels) = match primary {
        Some(s) => (Some(s.source_code), s.labels),
        None => (None, Vec::new()),
    };

    let record = match &finding.record {
        Some(name) => format!("`{name}`"),
        None => "the anonymous struct".to_owned(),
    };
    let help = format!(
        "Add a `{tag}` tag to `{field}`, as well as to every other exported field of {record} \
        (declared at {position}).",
        tag = finding.tag,
        field = finding.field,
        position = finding.position,
    );

    CompilerDiagnostic::builder(anyhow::anyhow!(finding.message()))
        .optional_source(source)
        .labels(labels.into_iter())
        .optional_additional_annotated_snippet(call)
        .help(help)
        .build()
}

fn annotated(
    sources: &mut SourceCache<'_>,
    location: &Location,
    label_msg: String,
) -> Option<AnnotatedSnippet> {
    let contents = sources.contents(&location.file)?;
    let span = location_span(contents, location);
    let source = NamedSource::new(&location.file, contents.to_owned());
    Some(AnnotatedSnippet::new(source, span.labeled(label_msg)))
}
