use ahash::HashSet;
use tagcheck_unit::Location;

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
/// A record whose exported fields are not all annotated with the tag
/// its serializer relies on.
pub struct Finding {
    /// Where the finding should be reported.
    pub position: Location,
    /// The tag key the serializer expects, e.g. `json`.
    pub tag: String,
    /// The name of the record at `position`. `None` for anonymous records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<String>,
    /// The first exported field found without the tag.
    pub field: String,
    /// The serialization call that led to the record.
    ///
    /// When several calls reach the same record, this is the first one.
    pub call: Location,
}

impl Finding {
    pub fn message(&self) -> String {
        format!(
            "exported fields should be annotated with the {:?} tag",
            self.tag
        )
    }
}

/// An accumulator for the findings of a single analysis run.
///
/// Findings that share the same position and tag are only reported once.
#[derive(Debug, Default)]
pub struct ReportSink {
    seen: HashSet<(Location, String)>,
    findings: Vec<Finding>,
}

impl ReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finding, unless an equivalent one was already reported.
    ///
    /// Returns `true` if the finding was recorded.
    pub fn maybe_report(&mut self, finding: Finding) -> bool {
        let key = (finding.position.clone(), finding.tag.clone());
        if !self.seen.insert(key) {
            tracing::trace!(
                position = %finding.position,
                tag = %finding.tag,
                "Skipping a duplicate finding"
            );
            return false;
        }
        self.findings.push(finding);
        true
    }

    /// The findings recorded so far, in reporting order.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}

#[cfg(test)]
mod tests {
    use tagcheck_unit::Location;

    use super::{Finding, ReportSink};

    fn finding(line: u32, tag: &str, call_line: u32) -> Finding {
        Finding {
            position: Location::new("models.go", line, 6),
            tag: tag.into(),
            record: Some("User".into()),
            field: "Name".into(),
            call: Location::new("main.go", call_line, 2),
        }
    }

    #[test]
    fn the_message_names_the_tag() {
        insta::assert_snapshot!(
            finding(3, "json", 10).message(),
            @r#"exported fields should be annotated with the "json" tag"#
        );
    }

    #[test]
    fn duplicates_are_dropped() {
        let mut sink = ReportSink::new();
        assert!(sink.maybe_report(finding(3, "json", 10)));
        // Same position and tag, reached from another call.
        assert!(!sink.maybe_report(finding(3, "json", 20)));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.findings()[0].call.line, 10);
    }

    #[test]
    fn the_tag_is_part_of_the_identity_of_a_finding() {
        let mut sink = ReportSink::new();
        assert!(sink.maybe_report(finding(3, "json", 10)));
        assert!(sink.maybe_report(finding(3, "xml", 11)));
        assert!(sink.maybe_report(finding(4, "json", 12)));
        assert_eq!(
            sink.into_findings()
                .iter()
                .map(|f| (f.position.line, f.tag.as_str()))
                .collect::<Vec<_>>(),
            [(3, "json"), (3, "xml"), (4, "json")]
        );
    }

    #[test]
    fn findings_serialize_to_json() {
        let mut f = finding(3, "json", 10);
        f.record = None;
        insta::assert_snapshot!(
            serde_json::to_string(&f).unwrap(),
            @r#"{"position":{"file":"models.go","line":3,"column":6},"tag":"json","field":"Name","call":{"file":"main.go","line":10,"column":2}}"#
        );
    }
}
