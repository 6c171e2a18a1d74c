use std::ops::Range;

use ariadne::{Color, Fmt, Label, Report, ReportKind};
use chumsky::error::{Simple, SimpleReason};

/// Turns a parse error over stringified tokens into a printable report.
pub fn build_report(e: Simple<String, Range<usize>>) -> Report<Range<usize>> {
    let report = Report::build(ReportKind::Error, (), e.span().start);
    match e.reason() {
        SimpleReason::Unexpected => {
            let found = e.found().map(String::as_str).unwrap_or("end of the input");
            let expected = e
                .expected()
                .map(|t| t.as_ref().map(String::as_str).unwrap_or("end of the input"))
                .collect::<Vec<_>>()
                .join(", ");
            let expected = if expected.is_empty() {
                "something else"
            } else {
                &expected
            };
            report
                .with_message(format!("Unexpected {found}, expected {expected}"))
                .with_label(
                    Label::new(e.span())
                        .with_message(format!("Unexpected {}", found.fg(Color::Red)))
                        .with_color(Color::Red),
                )
        }
        SimpleReason::Unclosed { span, delimiter } => report
            .with_message(format!("Unclosed delimiter {}", delimiter.fg(Color::Yellow)))
            .with_label(
                Label::new(span.clone())
                    .with_message(format!(
                        "Unclosed delimiter {}",
                        delimiter.fg(Color::Yellow)
                    ))
                    .with_color(Color::Yellow),
            )
            .with_label(
                Label::new(e.span())
                    .with_message(format!(
                        "Must be closed before this {}",
                        e.found()
                            .map(String::as_str)
                            .unwrap_or("end of the input")
                            .fg(Color::Red)
                    ))
                    .with_color(Color::Red),
            ),
        SimpleReason::Custom(msg) => report.with_message(msg).with_label(
            Label::new(e.span())
                .with_message(format!("{}", msg.fg(Color::Red)))
                .with_color(Color::Red),
        ),
    }
    .finish()
}

#[cfg(test)]
mod test {
    use super::*;
    use ariadne::Source;
    use chumsky::Error as _;

    fn rendered(source: &str, e: Simple<String, Range<usize>>) -> String {
        let mut out = vec![];
        build_report(e)
            .write(Source::from(source), &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_unexpected_token() {
        let e = Simple::expected_input_found(
            3..4,
            vec![Some(")".to_string()), None],
            Some("x".to_string()),
        );
        let text = rendered("(f x", e);
        assert!(text.contains("Unexpected x, expected"), "{text}");
        assert!(text.contains("end of the input"), "{text}");
    }

    #[test]
    fn test_custom_message() {
        let e = Simple::custom(1..3, "99999999999 does not fit in a 32-bit word");
        let text = rendered("#99999999999", e);
        assert!(text.contains("does not fit in a 32-bit word"), "{text}");
    }
}
