use miette::{LabeledSpan, SourceOffset, SourceSpan};
use tagcheck_unit::Location;

/// Helper methods to reduce boilerplate when working with [`miette::SourceSpan`]s.
pub trait SourceSpanExt {
    fn labeled(self, label_msg: String) -> LabeledSpan;
}

impl SourceSpanExt for SourceSpan {
    fn labeled(self, label_msg: String) -> LabeledSpan {
        LabeledSpan::new_with_span(Some(label_msg), self)
    }
}

/// Convert a [`Location`] into a span covering the identifier (or keyword) that starts there.
///
/// If there is no identifier at that location, the span covers a single character.
pub fn location_span(source: &str, location: &Location) -> SourceSpan {
    let start = SourceOffset::from_location(
        source,
        location.line as usize,
        location.column as usize,
    );
    let rest = source.get(start.offset()..).unwrap_or_default();
    let ident_len: usize = rest
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .map(char::len_utf8)
        .sum();
    let len = if ident_len > 0 {
        ident_len
    } else {
        rest.chars().next().map(char::len_utf8).unwrap_or(0)
    };
    SourceSpan::new(start, len)
}
