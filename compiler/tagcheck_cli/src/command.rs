use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use tagcheck::diagnostic::{SourceCache, finding_diagnostic};
use tagcheck::{FunctionConfig, RuleTable, TagcheckConfig, analyze_units, load_unit};

use crate::{Color, MessageFormat, print_report, report_error};

fn rule_table(config: Option<&Path>) -> Result<RuleTable, anyhow::Error> {
    let config = TagcheckConfig::load(config)?;
    Ok(config.rule_table()?)
}

#[tracing::instrument("Check units", skip_all, fields(n_units = units.len()))]
pub(crate) fn check(
    units: &[PathBuf],
    config: Option<&Path>,
    source_root: Option<&Path>,
    message_format: MessageFormat,
    color_profile: Color,
) -> Result<ExitCode, anyhow::Error> {
    let rules = rule_table(config)?;

    let mut failed_to_load = false;
    let mut loaded = Vec::with_capacity(units.len());
    for path in units {
        match load_unit(path) {
            Ok(unit) => loaded.push(unit),
            Err(e) => {
                failed_to_load = true;
                report_error(e.into(), color_profile);
            }
        }
    }

    let findings = analyze_units(&loaded, &rules);
    let n_findings: usize = findings.iter().map(Vec::len).sum();
    match message_format {
        MessageFormat::Human => {
            for (unit, findings) in loaded.iter().zip(&findings) {
                let mut sources = SourceCache::new(unit, source_root);
                for finding in findings {
                    let diagnostic = finding_diagnostic(finding, &mut sources);
                    print_report(&miette::Report::new(diagnostic), color_profile);
                }
            }
        }
        MessageFormat::Json => {
            let all: Vec<_> = findings.iter().flatten().collect();
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &all)
                .context("Failed to serialize findings as JSON")?;
            writeln!(stdout)?;
        }
    }
    tracing::info!(
        n_units = loaded.len(),
        n_findings,
        failed_to_load,
        "Check completed"
    );

    if failed_to_load || n_findings > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Print the rule table that `check` would use, as a configuration file.
pub(crate) fn rules(config: Option<&Path>) -> Result<ExitCode, anyhow::Error> {
    let rules = rule_table(config)?;
    let listing = TagcheckConfig {
        builtin_rules: false,
        functions: rules
            .iter()
            .map(|(name, rule)| FunctionConfig {
                name: name.to_owned(),
                tag: rule.tag.clone(),
                arg_pos: rule.arg_pos,
                opt_out_methods: rule.opt_out_methods.clone(),
            })
            .collect(),
    };
    let listing =
        toml::to_string_pretty(&listing).context("Failed to serialize the rule table as TOML")?;
    print!("{listing}");
    Ok(ExitCode::SUCCESS)
}
