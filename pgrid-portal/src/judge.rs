use retry::{delay, retry, OperationResult};

use crate::config::JudgeConfig;
use crate::model::{Submission, Verdict};
use crate::{Error, PortalError, Result};

/// Checks a submission locally, before anything is sent.
pub fn check_source(submission: &Submission, conf: &JudgeConfig) -> Result<()> {
    let source = submission.source();
    if source.trim().is_empty() {
        return Err(PortalError::SubmissionRejected("source is empty".into()).into());
    }
    if let Some(template) = submission.template() {
        if !template.is_filled_by(source) {
            return Err(PortalError::SubmissionRejected(
                "source does not keep the code around the blank of the template".into(),
            )
            .into());
        }
    }
    if let Some(word) = conf
        .forbidden()
        .iter()
        .find(|word| !word.is_empty() && source.contains(word.as_str()))
    {
        return Err(PortalError::SubmissionRejected(format!(
            "source contains forbidden {:?}",
            word
        ))
        .into());
    }
    Ok(())
}

/// Source as it is sent to the portal.
pub fn prepare_source(submission: &Submission, conf: &JudgeConfig) -> String {
    match (submission.template(), conf.attribution()) {
        (None, Some(attribution)) => format!("{}\n\n{}", attribution, submission.source()),
        _ => submission.source().to_owned(),
    }
}

enum PollError {
    Processing(Verdict),
    Failed(Error),
}

/// Calls `fetch` until it returns a terminal verdict.
///
/// Waits `poll_interval` between calls and gives up with `Timeout` after
/// `poll_limit` further calls. Errors from `fetch` end polling immediately.
pub fn poll_verdict(
    conf: &JudgeConfig,
    mut fetch: impl FnMut() -> Result<Verdict>,
) -> Result<Verdict> {
    let interval = conf.poll_interval().as_millis() as u64;
    let durations = delay::Fixed::from_millis(interval).take(conf.poll_limit());
    retry(durations, || match fetch() {
        Ok(verdict) if verdict.is_terminal() => OperationResult::Ok(verdict),
        Ok(verdict) => OperationResult::Retry(PollError::Processing(verdict)),
        Err(err) => OperationResult::Err(PollError::Failed(err)),
    })
    .map_err(|err| match err {
        retry::Error::Operation {
            error: PollError::Processing(verdict),
            tries,
            ..
        } => PortalError::Timeout(format!(
            "solution is still {} after {} polls",
            verdict.raw_status(),
            tries
        ))
        .into(),
        retry::Error::Operation {
            error: PollError::Failed(err),
            ..
        } => err,
        retry::Error::Internal(msg) => Error::msg(msg),
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use ntest::timeout;

    use super::*;

    use crate::model::{CodeTemplate, StatusKind};
    use crate::portal_error;

    fn rejection(submission: &Submission) -> Option<PortalError> {
        let err = check_source(submission, &JudgeConfig::default()).err()?;
        portal_error(&err).cloned()
    }

    #[test]
    fn test_check_source() {
        let ok = Submission::new("s1", "p1", "int main() { return 0; }", None);
        assert_eq!(rejection(&ok), None);

        let empty = Submission::new("s1", "p1", " \n\t", None);
        assert_eq!(
            rejection(&empty),
            Some(PortalError::SubmissionRejected("source is empty".into()))
        );

        let forbidden = Submission::new("s1", "p1", "int main() { system(\"ls\"); }", None);
        assert!(matches!(
            rejection(&forbidden),
            Some(PortalError::SubmissionRejected(msg)) if msg.contains("system(")
        ));
    }

    #[test]
    fn test_check_source_with_template() {
        let template = CodeTemplate::new("#include <cstdio>\nint main() {", "return 0;\n}");
        let filled = Submission::new(
            "s1",
            "p1",
            "#include <cstdio>\nint main() {\n  puts(\"hi\");\n  return 0;\n}\n",
            Some(template.clone()),
        );
        assert_eq!(rejection(&filled), None);

        let broken = Submission::new("s1", "p1", "int main() { puts(\"hi\"); }", Some(template));
        assert!(matches!(
            rejection(&broken),
            Some(PortalError::SubmissionRejected(_))
        ));
    }

    #[test]
    fn test_prepare_source() {
        let conf = JudgeConfig::default();
        let plain = Submission::new("s1", "p1", "int main() {}", None);
        assert_eq!(
            prepare_source(&plain, &conf),
            "// Submitted by pgrid\n\nint main() {}"
        );

        let template = CodeTemplate::new("int main() {", "}");
        let blank = Submission::new("s1", "p1", "int main() {}", Some(template));
        assert_eq!(prepare_source(&blank, &conf), "int main() {}");
    }

    #[test]
    #[timeout(1000)]
    fn test_poll_verdict_until_terminal() {
        let calls = Cell::new(0);
        let verdict = poll_verdict(&JudgeConfig::for_test(), || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Ok(Verdict::new("Processing", ""))
            } else {
                Ok(Verdict::new("Accepted", ""))
            }
        })
        .unwrap();
        assert_eq!(verdict.status(), StatusKind::Accepted);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    #[timeout(1000)]
    fn test_poll_verdict_gives_up() {
        let calls = Cell::new(0);
        let err = poll_verdict(&JudgeConfig::for_test(), || {
            calls.set(calls.get() + 1);
            Ok(Verdict::new("Processing", ""))
        })
        .unwrap_err();
        assert!(matches!(portal_error(&err), Some(PortalError::Timeout(_))));
        assert_eq!(calls.get(), 4);
    }

    #[test]
    #[timeout(1000)]
    fn test_poll_verdict_stops_on_error() {
        let calls = Cell::new(0);
        let err = poll_verdict(&JudgeConfig::for_test(), || {
            calls.set(calls.get() + 1);
            Err(PortalError::JudgeUnavailable("sol9".into()).into())
        })
        .unwrap_err();
        assert_eq!(
            portal_error(&err),
            Some(&PortalError::JudgeUnavailable("sol9".into()))
        );
        assert_eq!(calls.get(), 1);
    }
}
