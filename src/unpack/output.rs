//! Output truncation and error rendering for archiver processes.

use color_eyre::eyre::eyre;
use std::borrow::Cow;
use std::process::{ExitStatus, Output};

use crate::error::ArtifactError;

pub(super) const OUTPUT_CHAR_LIMIT: usize = 2_048;
pub(super) const TRUNCATION_SUFFIX: &str = "… [truncated]";

/// Builds an extraction error carrying the truncated process output.
pub(super) fn render_failure(context: &str, output: &Output) -> ArtifactError {
    let stdout = truncate_output(String::from_utf8_lossy(&output.stdout));
    let stderr = truncate_output(String::from_utf8_lossy(&output.stderr));
    ArtifactError::extraction(eyre!(
        "{context} ({})\nstdout: {stdout}\nstderr: {stderr}",
        output.status
    ))
}

/// Builds an extraction error for a process whose output went to the
/// caller's stderr.
pub(super) fn render_status(context: &str, status: ExitStatus) -> ArtifactError {
    ArtifactError::extraction(eyre!("{context} ({status})"))
}

pub(super) fn truncate_output(text: Cow<'_, str>) -> String {
    let mut out = String::with_capacity(OUTPUT_CHAR_LIMIT + TRUNCATION_SUFFIX.len());
    let mut chars = text.chars();
    for _ in 0..OUTPUT_CHAR_LIMIT {
        match chars.next() {
            Some(ch) => out.push(ch),
            None => return text.into_owned(),
        }
    }

    if chars.next().is_none() {
        return text.into_owned();
    }

    out.push_str(TRUNCATION_SUFFIX);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_output_is_untouched() {
        assert_eq!(truncate_output(Cow::Borrowed("Everything is Ok")), "Everything is Ok");
    }

    #[test]
    fn long_output_is_truncated_with_suffix() {
        let long = "x".repeat(OUTPUT_CHAR_LIMIT + 1);
        let truncated = truncate_output(Cow::Owned(long));
        assert!(truncated.ends_with(TRUNCATION_SUFFIX));
        assert_eq!(
            truncated.chars().count(),
            OUTPUT_CHAR_LIMIT + TRUNCATION_SUFFIX.chars().count()
        );
    }

    #[test]
    fn output_at_limit_is_untouched() {
        let exact = "y".repeat(OUTPUT_CHAR_LIMIT);
        assert_eq!(truncate_output(Cow::Owned(exact.clone())), exact);
    }
}
