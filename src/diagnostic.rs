/// Diagnostic reporting for the configured value order using ariadne
use crate::config::{lint_configuration, ConfigIssue};
use ariadne::{Color, Config, Label, Report, ReportKind, Source};

/// Report a single configuration issue, pointing into the raw configuration
pub fn report_config_issue(source_name: &str, source: &str, issue: &ConfigIssue) -> String {
    render_config_issue(source_name, source, issue, Config::default())
}

/// Report every issue in a configuration, in the order the entries appear
///
/// Returns an empty string for a configuration that reconciles as written.
pub fn report_configuration<S: AsRef<str>>(
    source_name: &str,
    source: &str,
    allowed: &[S],
) -> String {
    lint_configuration(source, allowed)
        .iter()
        .map(|issue| report_config_issue(source_name, source, issue))
        .collect()
}

/// Same as [`report_config_issue`] without ANSI colors, for logs and tests
pub fn report_config_issue_plain(source_name: &str, source: &str, issue: &ConfigIssue) -> String {
    render_config_issue(
        source_name,
        source,
        issue,
        Config::default().with_color(false),
    )
}

fn render_config_issue(
    source_name: &str,
    source: &str,
    issue: &ConfigIssue,
    config: Config,
) -> String {
    let mut output = Vec::new();

    let report = match issue {
        ConfigIssue::NotAllowed { value, span } => {
            Report::build(ReportKind::Warning, source_name, span.char_range(source).start)
                .with_config(config)
                .with_message(format!("Configured value '{}' is not allowed", value))
                .with_label(
                    Label::new((source_name, span.char_range(source)))
                        .with_message("the field does not allow this value")
                        .with_color(Color::Yellow),
                )
                .with_note("Values the field does not allow are left out of the list")
                .with_help(format!(
                    "Remove '{}' from the configuration or allow it for the field",
                    value
                ))
                .finish()
        }
        ConfigIssue::Duplicate { value, span, first } => {
            Report::build(ReportKind::Warning, source_name, span.char_range(source).start)
                .with_config(config)
                .with_message(format!("Duplicate configured value: '{}'", value))
                .with_label(
                    Label::new((source_name, span.char_range(source)))
                        .with_message("this entry has no effect")
                        .with_color(Color::Yellow),
                )
                .with_label(
                    Label::new((source_name, first.char_range(source)))
                        .with_message(format!("'{}' is first listed here", value))
                        .with_color(Color::Blue),
                )
                .with_help("Only the first position of a value is used")
                .finish()
        }
    };

    // Writing into a Vec cannot fail
    let _ = report.write((source_name, Source::from(source)), &mut output);

    String::from_utf8_lossy(&output).into_owned()
}
