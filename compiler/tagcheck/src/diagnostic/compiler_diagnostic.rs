use std::fmt::Display;

use miette::{Diagnostic, LabeledSpan, NamedSource, Severity, SourceCode};

/// A builder for a [`CompilerDiagnostic`].
pub struct CompilerDiagnosticBuilder {
    severity: Severity,
    source_code: Option<NamedSource<String>>,
    labels: Option<Vec<LabeledSpan>>,
    help: Option<String>,
    error_source: anyhow::Error,
    additional_annotated_snippets: Option<Vec<AnnotatedSnippet>>,
}

impl CompilerDiagnosticBuilder {
    fn new(error: impl Into<anyhow::Error>) -> Self {
        Self {
            severity: Severity::Error,
            source_code: None,
            labels: None,
            help: None,
            error_source: error.into(),
            additional_annotated_snippets: None,
        }
    }

    /// Attach a source file to this diagnostic.
    pub fn source(mut self, source: impl Into<NamedSource<String>>) -> Self {
        self.source_code = Some(source.into());
        self
    }

    /// An optional version of [`CompilerDiagnosticBuilder::source`].
    pub fn optional_source(mut self, source: Option<impl Into<NamedSource<String>>>) -> Self {
        self.source_code = source.map(Into::into);
        self
    }

    /// Add labels to this diagnostic.
    /// If there are already labels, the new ones are appended.
    pub fn labels(mut self, new_labels: impl Iterator<Item = LabeledSpan>) -> Self {
        let mut labels = self.labels.unwrap_or_else(|| Vec::with_capacity(1));
        labels.extend(new_labels);
        self.labels = Some(labels);
        self
    }

    /// Record an additional annotated code snippet to be displayed with this diagnostic.
    ///
    /// This can be used to display a code snippet that doesn't live in the same source file
    /// as the main code snippet for this diagnostic.
    pub fn additional_annotated_snippet(mut self, annotated_snippet: AnnotatedSnippet) -> Self {
        self.additional_annotated_snippets
            .get_or_insert_with(|| Vec::with_capacity(1))
            .push(annotated_snippet);
        self
    }

    /// An optional version of [`Self::additional_annotated_snippet`].
    pub fn optional_additional_annotated_snippet(
        self,
        annotated_snippet: Option<AnnotatedSnippet>,
    ) -> Self {
        if let Some(s) = annotated_snippet {
            self.additional_annotated_snippet(s)
        } else {
            self
        }
    }

    /// Add an help message to this diagnostic to nudge the user in the right direction.
    ///
    /// Help messages are rendered at the very end of the diagnostic, after the error message
    /// and all code snippets.
    pub fn help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    /// Finalize the builder and return a [`CompilerDiagnostic`].
    pub fn build(self) -> CompilerDiagnostic {
        let Self {
            severity,
            source_code,
            labels,
            help,
            error_source,
            additional_annotated_snippets,
        } = self;
        // Snippets from other files are attached as related diagnostics with an empty message,
        // since a miette diagnostic can only carry one source.
        let related_errors = additional_annotated_snippets.map(|snippets| {
            snippets
                .into_iter()
                .map(|s| {
                    let mut d = CompilerDiagnosticBuilder::new(anyhow::anyhow!(""))
                        .source(s.source_code)
                        .labels(s.labels.into_iter())
                        .build();
                    d.severity = Severity::Advice;
                    d
                })
                .collect()
        });
        CompilerDiagnostic {
            source_code: source_code
                .unwrap_or_else(|| NamedSource::new(String::new(), String::new())),
            severity,
            labels,
            help,
            error_source,
            related_errors,
        }
    }
}

impl CompilerDiagnostic {
    /// Start building a diagnostic.
    /// You must specify the error that caused the diagnostic.
    ///
    /// You can optionally specify:
    ///
    /// - the source code the diagnostic refer to (see [`CompilerDiagnosticBuilder::source`]
    ///   and [`CompilerDiagnosticBuilder::optional_source`])
    /// - labels to highlight specific parts of the source code (see
    ///   [`CompilerDiagnosticBuilder::labels`]);
    /// - a help message (see [`CompilerDiagnosticBuilder::help`]);
    /// - snippets from other source files (see
    ///   [`CompilerDiagnosticBuilder::additional_annotated_snippet`]).
    pub fn builder(error: impl Into<anyhow::Error>) -> CompilerDiagnosticBuilder {
        CompilerDiagnosticBuilder::new(error)
    }
}

/// A source file annotated with one or more labels.
pub struct AnnotatedSnippet {
    pub source_code: NamedSource<String>,
    pub labels: Vec<LabeledSpan>,
}

impl AnnotatedSnippet {
    /// Build a new annotated snippet with a single label.
    pub fn new(source_code: impl Into<NamedSource<String>>, label: LabeledSpan) -> Self {
        Self {
            source_code: source_code.into(),
            labels: vec![label],
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{error_source}")]
/// A single error or warning reported by tagcheck to the user.
///
/// See [`CompilerDiagnostic::builder`] for how to create a diagnostic.
pub struct CompilerDiagnostic {
    source_code: NamedSource<String>,
    severity: Severity,
    labels: Option<Vec<LabeledSpan>>,
    help: Option<String>,
    #[source]
    error_source: anyhow::Error,
    related_errors: Option<Vec<CompilerDiagnostic>>,
}

impl miette::Diagnostic for CompilerDiagnostic {
    fn severity(&self) -> Option<Severity> {
        Some(self.severity)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.help
            .as_ref()
            .map(|s| Box::new(s) as Box<dyn Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.source_code)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        self.labels
            .clone()
            .map(|l| Box::new(l.into_iter()) as Box<dyn Iterator<Item = LabeledSpan> + '_>)
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        self.related_errors.as_ref().map(|errors| {
            Box::new(errors.iter().map(|e| e as &dyn Diagnostic))
                as Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>
        })
    }
}
