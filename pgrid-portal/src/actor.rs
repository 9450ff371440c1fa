use std::collections::HashMap;
use std::io::Write as _;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context as _};
use rayon::prelude::*;
use reqwest::Url;

use crate::config::{JudgeConfig, SessionConfig};
use crate::fetch::Sender;
use crate::image::{guess_mime, inline_images, remote_images, to_data_uri};
use crate::judge::{check_source, poll_verdict, prepare_source};
use crate::model::{
    Course, CourseId, Credential, Judgement, Problem, ProblemDescription, ProblemSet,
    ProblemSetId, SolutionId, Submission, Verdict,
};
use crate::schema::{Schema, SchemaKind};
use crate::service::{Act, Expect, PageRequest, RawResponse, SessionStore, Transport};
use crate::{Console, PortalError, Result};

/// Client of one course on the portal.
///
/// Owns the session store and logs in lazily: a request answered with a login
/// page triggers one login and one more attempt of the same request.
pub struct PortalActor {
    transport: Box<dyn Transport>,
    session: Arc<SessionStore>,
    schema: Box<dyn Schema>,
    course_id: Option<CourseId>,
    credential: Option<Credential>,
    session_conf: SessionConfig,
    judge_conf: JudgeConfig,
    verdicts: Mutex<HashMap<SolutionId, Verdict>>,
    login_lock: Mutex<()>,
}

impl PortalActor {
    pub fn new(
        transport: Box<dyn Transport>,
        session: Arc<SessionStore>,
        schema: Box<dyn Schema>,
        session_conf: SessionConfig,
        judge_conf: JudgeConfig,
    ) -> Self {
        Self {
            transport,
            session,
            schema,
            course_id: None,
            credential: None,
            session_conf,
            judge_conf,
            verdicts: Mutex::new(HashMap::new()),
            login_lock: Mutex::new(()),
        }
    }

    /// Actor talking to the portal over https, with cookies kept on disk.
    pub fn open(
        schema: SchemaKind,
        session_conf: SessionConfig,
        judge_conf: JudgeConfig,
    ) -> Result<Self> {
        let client = session_conf.build_client()?;
        let session = SessionStore::open(session_conf.resolve_cookies_path()?)?;
        Ok(Self::new(
            Box::new(client),
            Arc::new(session),
            schema.build(),
            session_conf,
            judge_conf,
        ))
    }

    pub fn with_course(mut self, course_id: CourseId) -> Self {
        self.course_id = Some(course_id);
        self
    }

    pub fn with_credential(mut self, credential: Option<Credential>) -> Self {
        self.credential = credential;
        self
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn schema_kind(&self) -> SchemaKind {
        self.schema.kind()
    }

    fn sender(&self) -> Sender {
        Sender::new(self.transport.as_ref(), &self.session_conf)
    }

    fn course_id(&self) -> Result<&CourseId> {
        self.course_id
            .as_ref()
            .context("Course is not set (run `pgrid init` or pass --course)")
    }

    fn fixed_cookie(&self) -> Option<String> {
        let cookies = self.schema.fixed_cookies();
        if cookies.is_empty() {
            return None;
        }
        let pairs = cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>();
        Some(pairs.join("; "))
    }

    fn cookie_header(&self, url: &Url) -> Result<Option<String>> {
        let pairs = self
            .fixed_cookie()
            .into_iter()
            .chain(self.session.get_session(url)?)
            .collect::<Vec<_>>();
        Ok(if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        })
    }

    fn login_with(&self, cnsl: &mut Console) -> Result<bool> {
        let credential = self
            .credential
            .as_ref()
            .ok_or(PortalError::CredentialMissing)?;
        let _guard = self
            .login_lock
            .lock()
            .map_err(|_| anyhow!("Login lock is poisoned"))?;
        self.schema.authenticator().login(
            &self.sender(),
            &self.session,
            self.fixed_cookie(),
            credential,
            cnsl,
        )
    }

    fn is_access_denied(&self, req: &PageRequest, res: &RawResponse) -> bool {
        match req.expect() {
            Expect::Page => self.schema.is_access_denied(res),
            Expect::Binary => res.is_html(),
        }
    }

    /// Sends a request with the session, logging in again at most once.
    fn fetch(&self, req: &PageRequest, cnsl: &mut Console) -> Result<RawResponse> {
        let sender = self.sender();
        let mut logged_in = false;
        loop {
            let attempt = req
                .clone()
                .charset(self.schema.charset())
                .with_cookie(self.cookie_header(req.url())?);
            let res = sender.retry_send(&attempt, cnsl)?;
            if self.is_access_denied(&attempt, &res) {
                if logged_in {
                    return Err(PortalError::AuthenticationFailed(format!(
                        "still denied access to {} after logging in",
                        req.url()
                    ))
                    .into());
                }
                if !self.login_with(cnsl)? {
                    return Err(PortalError::AuthenticationFailed(
                        "portal rejected the credential".into(),
                    )
                    .into());
                }
                logged_in = true;
                continue;
            }
            let status = res.status();
            if !(status.is_success() || status.is_redirection()) {
                return Err(PortalError::TransportFailure(format!(
                    "{} answered {}",
                    req.url(),
                    status
                ))
                .into());
            }
            return Ok(res);
        }
    }

    fn course_page(&self, cnsl: &mut Console) -> Result<(Course, Vec<ProblemSet>)> {
        let course_id = self.course_id()?;
        let res = self.fetch(&self.schema.course_request(course_id)?, cnsl)?;
        self.schema
            .decode_course(course_id, &res)
            .context("Could not read the course page")
    }

    fn fetch_image(&self, url: &Url, cnsl: &mut Console) -> Result<String> {
        let res = self.fetch(&PageRequest::get(url.clone()).binary(), cnsl)?;
        let mime = res
            .content_type()
            .unwrap_or_else(|| guess_mime(url).to_owned());
        Ok(to_data_uri(&mime, res.bytes()))
    }

    /// Downloads every remote image of the statement in parallel and inlines it.
    fn inline_description(
        &self,
        desc: ProblemDescription,
        page: &Url,
        cnsl: &mut Console,
    ) -> Result<ProblemDescription> {
        let mut urls: Vec<Url> = Vec::new();
        for (_, html) in desc.html_sections().iter() {
            for (_, url) in remote_images(html, page) {
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
        }
        if urls.is_empty() {
            return Ok(desc);
        }

        writeln!(cnsl, "Downloading {} image(s)", urls.len())?;
        let conf = cnsl.conf().clone();
        let pb = cnsl.progress_bar(urls.len() as u64);
        let data_uris = urls
            .par_iter()
            .map(|url| -> Result<(Url, String)> {
                let mut sink = Console::sink(conf.clone());
                let data_uri = self
                    .fetch_image(url, &mut sink)
                    .with_context(|| format!("Could not download image : {}", url));
                pb.inc(1);
                Ok((url.clone(), data_uri?))
            })
            .collect::<Result<HashMap<Url, String>>>();
        pb.finish_and_clear();
        let data_uris = data_uris?;

        let inline = |html: &str| {
            let by_src = remote_images(html, page)
                .into_iter()
                .filter_map(|(src, url)| Some((src, data_uris.get(&url)?.clone())))
                .collect::<HashMap<_, _>>();
            inline_images(html, &by_src)
        };
        Ok(ProblemDescription::builder(desc.title().as_str())
            .description(inline(desc.description()))
            .about_input(inline(desc.about_input()))
            .about_output(inline(desc.about_output()))
            .hint(inline(desc.hint()))
            .samples(desc.sample_input().as_str(), desc.sample_output().as_str())
            .build())
    }

    fn cached_verdict(&self, solution_id: &SolutionId) -> Option<Verdict> {
        let verdicts = self.verdicts.lock().ok()?;
        verdicts.get(solution_id).cloned()
    }
}

impl Act for PortalActor {
    fn login(&self, cnsl: &mut Console) -> Result<bool> {
        self.login_with(cnsl)
    }

    fn course(&self, cnsl: &mut Console) -> Result<Course> {
        self.course_page(cnsl).map(|(course, _)| course)
    }

    fn problem_sets(&self, cnsl: &mut Console) -> Result<Vec<ProblemSet>> {
        self.course_page(cnsl).map(|(_, sets)| sets)
    }

    fn problems(&self, set_id: &ProblemSetId, cnsl: &mut Console) -> Result<Vec<Problem>> {
        let course_id = self.course_id()?;
        let res = self.fetch(&self.schema.problems_request(course_id, set_id)?, cnsl)?;
        let problems = self
            .schema
            .decode_problems(set_id, &res)
            .with_context(|| format!("Could not read the problems of set {}", set_id))?;

        let username = self.credential.as_ref().map(|cred| cred.username().as_str());
        let req = match username.and_then(|name| self.schema.statuses_request(name, set_id)) {
            Some(req) => req,
            None => return Ok(problems),
        };
        let statuses = match self
            .fetch(&req, cnsl)
            .and_then(|res| self.schema.decode_statuses(&res))
        {
            Ok(statuses) => statuses,
            Err(err) => {
                cnsl.warn(&format!("Could not fetch results : {:#}", err))?;
                HashMap::new()
            }
        };
        Ok(problems
            .into_iter()
            .map(|problem| match statuses.get(problem.id()) {
                Some(status) => problem.with_status(Some(*status)),
                None => problem,
            })
            .collect())
    }

    fn description(&self, problem: &Problem, cnsl: &mut Console) -> Result<ProblemDescription> {
        let res = self.fetch(&self.schema.description_request(problem)?, cnsl)?;
        let desc = self
            .schema
            .decode_description(&res)
            .with_context(|| format!("Could not read problem {}", problem.id()))?;
        self.inline_description(desc, res.url(), cnsl)
    }

    fn submit(&self, submission: &Submission, cnsl: &mut Console) -> Result<SolutionId> {
        check_source(submission, &self.judge_conf)?;
        let source = prepare_source(submission, &self.judge_conf);
        let req = self.schema.submit_request(
            submission.set_id(),
            submission.problem_id(),
            &source,
            self.judge_conf.language(),
        )?;
        let res = self.fetch(&req, cnsl)?;
        let solution_id = self.schema.decode_submit(&res)?;
        writeln!(cnsl, "Submitted as solution {}", solution_id)?;
        Ok(solution_id)
    }

    fn solution(&self, solution_id: &SolutionId, cnsl: &mut Console) -> Result<Verdict> {
        if let Some(verdict) = self.cached_verdict(solution_id) {
            return Ok(verdict);
        }
        let res = self.fetch(&self.schema.solution_request(solution_id)?, cnsl)?;
        let verdict = self.schema.decode_solution(solution_id, &res)?;
        if verdict.is_terminal() {
            if let Ok(mut verdicts) = self.verdicts.lock() {
                verdicts.insert(solution_id.clone(), verdict.clone());
            }
        }
        Ok(verdict)
    }

    fn wait_verdict(&self, solution_id: &SolutionId, cnsl: &mut Console) -> Result<Verdict> {
        poll_verdict(&self.judge_conf, || self.solution(solution_id, cnsl))
    }

    fn judge(&self, submission: &Submission, cnsl: &mut Console) -> Result<Judgement> {
        let solution_id = self.submit(submission, cnsl)?;
        let verdict = self.wait_verdict(&solution_id, cnsl)?;
        Ok(Judgement::new(
            solution_id,
            verdict,
            submission.set_id().clone(),
        ))
    }

    fn problem_url(&self, problem: &Problem) -> Result<Url> {
        self.schema.problem_page_url(problem)
    }
}

#[cfg(test)]
mod tests {
    use ntest::timeout;
    use reqwest::StatusCode;

    use super::*;

    use crate::console::ConsoleConfig;
    use crate::model::{Performance, StatusKind};
    use crate::portal_error;
    use crate::testing::FakeTransport;

    static COURSE_JSON: &str = r#"{"status":"OK","course":{"title":"Intro","problemlists":[
        {"id":"s1","title":"Week 1","assignment":{"openTime":1633046400000,"closeTime":1633651199000}}]}}"#;

    fn course_id() -> CourseId {
        CourseId::from("0123456789abcdef0123456789abcdef")
    }

    fn build(transport: &FakeTransport, credential: Option<Credential>) -> PortalActor {
        PortalActor::new(
            Box::new(transport.clone()),
            Arc::new(SessionStore::in_memory()),
            SchemaKind::Json.build(),
            SessionConfig::for_test(),
            JudgeConfig::for_test(),
        )
        .with_course(course_id())
        .with_credential(credential)
    }

    fn actor(transport: &FakeTransport) -> PortalActor {
        build(transport, Some(Credential::new("2000012345", "secret")))
    }

    fn with_login(transport: FakeTransport) -> FakeTransport {
        transport
            .json("iaaa.pku.edu.cn", r#"{"success":true,"token":"tok"}"#)
            .set_cookie(
                "/authcallback",
                StatusCode::FOUND,
                &["JSESSIONID=fresh; Path=/; HttpOnly; Secure"],
            )
    }

    fn cnsl() -> Console {
        Console::buf(ConsoleConfig::default())
    }

    #[test]
    fn test_fetch_logs_in_once_when_denied() -> anyhow::Result<()> {
        let transport = with_login(
            FakeTransport::new()
                .html("/course/", "<html><body>Please log in</body></html>")
                .json("/course/", COURSE_JSON),
        );
        let actor = actor(&transport);

        let course = actor.course(&mut cnsl())?;
        assert_eq!(course.title(), "Intro");
        assert_eq!(transport.count("iaaa.pku.edu.cn"), 1);
        assert_eq!(transport.count("/course/"), 2);
        let retried = transport.requests().pop().unwrap();
        assert_eq!(
            retried.cookie(),
            Some("PG_client=vscode_ext; JSESSIONID=fresh")
        );
        Ok(())
    }

    #[test]
    fn test_fetch_gives_up_after_one_login() -> anyhow::Result<()> {
        let transport = with_login(FakeTransport::new().respond_always(
            "/course/",
            StatusCode::OK,
            "application/json",
            r#"{"status":"NOT_LOGIN"}"#,
        ));
        let actor = actor(&transport);

        let err = actor.problem_sets(&mut cnsl()).unwrap_err();
        assert!(matches!(
            portal_error(&err),
            Some(PortalError::AuthenticationFailed(_))
        ));
        assert_eq!(transport.count("iaaa.pku.edu.cn"), 1);
        assert_eq!(transport.count("/course/"), 2);
        Ok(())
    }

    #[test]
    fn test_fetch_without_credential() -> anyhow::Result<()> {
        let transport = FakeTransport::new().html("/course/", "<html></html>");
        let actor = build(&transport, None);

        let err = actor.course(&mut cnsl()).unwrap_err();
        assert_eq!(portal_error(&err), Some(&PortalError::CredentialMissing));
        assert_eq!(transport.total(), 1);
        Ok(())
    }

    #[test]
    fn test_fetch_reports_failure_status() -> anyhow::Result<()> {
        let transport =
            FakeTransport::new().respond("/course/", StatusCode::FORBIDDEN, "application/json", "{}");
        let err = actor(&transport).course(&mut cnsl()).unwrap_err();
        assert!(matches!(
            portal_error(&err),
            Some(PortalError::TransportFailure(_))
        ));
        Ok(())
    }

    #[test]
    fn test_problem_sets() -> anyhow::Result<()> {
        let transport = FakeTransport::new().json("/course/", COURSE_JSON);
        let sets = actor(&transport).problem_sets(&mut cnsl())?;
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].title(), "Week 1");
        assert!(sets[0].open().is_some());
        Ok(())
    }

    #[test]
    fn test_problems_with_statuses() -> anyhow::Result<()> {
        let transport = FakeTransport::new()
            .json(
                "/probset/s1/?type=json",
                r#"{"status":"OK","problemlist":{"problems":[{"id":"p1","title":"A+B"},{"id":"p2","title":"Sort"}]}}"#,
            )
            .json(
                "/account/query.do",
                r#"{"status":"OK","results":[{"id":"p2","result":"Yes"}]}"#,
            );
        let problems = actor(&transport).problems(&ProblemSetId::from("s1"), &mut cnsl())?;
        assert_eq!(problems[0].status(), None);
        assert_eq!(problems[1].status(), Some(StatusKind::Accepted));
        assert_eq!(
            transport.requests()[1].form_value("username"),
            Some("2000012345")
        );
        Ok(())
    }

    #[test]
    fn test_problems_for_user_without_results() -> anyhow::Result<()> {
        let transport = with_login(
            FakeTransport::new()
                .json(
                    "/probset/s1/?type=json",
                    r#"{"status":"OK","problemlist":{"problems":[{"id":"p1","title":"A+B"}]}}"#,
                )
                .json("/account/query.do", r#"{"status":"ERROR"}"#),
        );
        let mut cnsl = cnsl();
        let problems = actor(&transport).problems(&ProblemSetId::from("s1"), &mut cnsl)?;
        assert_eq!(problems, vec![Problem::new("p1", "s1", 1, "A+B", None)]);
        assert_eq!(transport.count("iaaa.pku.edu.cn"), 0);
        assert_eq!(transport.count("/account/query.do"), 1);
        assert!(!cnsl.take_output()?.contains("WARN"));
        Ok(())
    }

    #[test]
    fn test_problems_without_results() -> anyhow::Result<()> {
        let transport = FakeTransport::new().json(
            "/probset/s1/?type=json",
            r#"{"status":"OK","problemlist":{"problems":[{"id":"p1","title":"A+B"}]}}"#,
        );
        let mut cnsl = cnsl();
        let problems = actor(&transport).problems(&ProblemSetId::from("s1"), &mut cnsl)?;
        assert_eq!(problems, vec![Problem::new("p1", "s1", 1, "A+B", None)]);
        assert!(cnsl.take_output()?.contains("WARN: Could not fetch results"));
        Ok(())
    }

    #[test]
    fn test_description_inlines_images() -> anyhow::Result<()> {
        let transport = with_login(
            FakeTransport::new()
                .json(
                    "/probset/s1/p1/?type=json",
                    r#"{"status":"OK","problem":{"title":"A+B",
                        "description":"<p><img src=\"fig.png\"></p>",
                        "aboutInput":"<img src=\"/img/in.gif\">","aboutOutput":"","hint":"<img src=\"fig.png\">",
                        "sampleInput":"1 2","sampleOutput":"3"}}"#,
                )
                .html("/probset/s1/p1/fig.png", "<html>login</html>")
                .image("/probset/s1/p1/fig.png", "image/png", b"\x89PNG")
                .image("/img/in.gif", "", b"GIF8"),
        );
        let actor = actor(&transport);
        let problem = Problem::new("p1", "s1", 1, "A+B", None);

        let desc = actor.description(&problem, &mut cnsl())?;
        assert_eq!(
            desc.description(),
            r#"<p><img src="data:image/png;base64,iVBORw=="></p>"#
        );
        assert_eq!(desc.hint(), r#"<img src="data:image/png;base64,iVBORw==">"#);
        assert_eq!(desc.about_input(), r#"<img src="data:image/gif;base64,R0lGOA==">"#);
        assert_eq!(desc.sample_output(), "3");
        assert_eq!(transport.count("fig.png"), 2);
        assert_eq!(transport.count("iaaa.pku.edu.cn"), 1);

        let page = Url::parse("https://programming.pku.edu.cn/probset/s1/p1/")?;
        let again = actor.inline_description(desc.clone(), &page, &mut cnsl())?;
        assert_eq!(again, desc);
        Ok(())
    }

    #[test]
    fn test_description_fails_with_image() -> anyhow::Result<()> {
        let transport = FakeTransport::new().json(
            "/probset/s1/p1/?type=json",
            r#"{"status":"OK","problem":{"title":"A+B","description":"<img src=\"gone.png\">"}}"#,
        );
        let problem = Problem::new("p1", "s1", 1, "A+B", None);
        assert!(actor(&transport).description(&problem, &mut cnsl()).is_err());
        Ok(())
    }

    #[test]
    fn test_submit_rejects_empty_source() -> anyhow::Result<()> {
        let transport = FakeTransport::new();
        let submission = Submission::new("s1", "p1", "\n", None);
        let err = actor(&transport)
            .submit(&submission, &mut cnsl())
            .unwrap_err();
        assert!(matches!(
            portal_error(&err),
            Some(PortalError::SubmissionRejected(_))
        ));
        assert_eq!(transport.total(), 0);
        Ok(())
    }

    #[test]
    fn test_terminal_verdict_is_cached() -> anyhow::Result<()> {
        let transport = FakeTransport::new().json(
            "/solution/sol9/status.do",
            r#"{"status":"OK","solution":{"result":"Wrong Answer","hint":""}}"#,
        );
        let actor = actor(&transport);
        let solution_id = SolutionId::from("sol9");

        let first = actor.solution(&solution_id, &mut cnsl())?;
        let second = actor.solution(&solution_id, &mut cnsl())?;
        assert_eq!(first, second);
        assert_eq!(first.status(), StatusKind::WrongAnswer);
        assert_eq!(transport.count("status.do"), 1);
        Ok(())
    }

    #[test]
    #[timeout(5000)]
    fn test_judge() {
        let transport = FakeTransport::new()
            .json(
                "/probset/s1/p1/submit.do",
                r#"{"status":"OK","solution":{"id":"sol9"}}"#,
            )
            .json(
                "/solution/sol9/status.do",
                r#"{"status":"OK","solution":{"result":"Processing","hint":""}}"#,
            )
            .json(
                "/solution/sol9/status.do",
                r#"{"status":"OK","solution":{"result":"Passed","hint":"Case 1: Time = 100ms, Memory = 200kB.\nCase 2: Time = 200ms, Memory = 300kB."}}"#,
            );
        let actor = actor(&transport);
        let submission = Submission::new("s1", "p1", "int main() { return 0; }", None);

        let judgement = actor.judge(&submission, &mut cnsl()).unwrap();
        assert_eq!(judgement.solution_id(), &SolutionId::from("sol9"));
        assert_eq!(judgement.verdict().status(), StatusKind::Accepted);
        assert_eq!(
            judgement.performance(),
            Performance::Measured {
                time_ms: 150,
                memory_kb: 250
            }
        );
        assert_eq!(judgement.performance().to_string(), "150ms/250kB");
        assert_eq!(judgement.refresh_set(), &ProblemSetId::from("s1"));

        let sent = transport.requests()[0].clone();
        assert_eq!(
            sent.form_value("sourceCode"),
            Some("// Submitted by pgrid\n\nint main() { return 0; }")
        );
        assert_eq!(sent.form_value("programLanguage"), Some("C++"));
        assert_eq!(transport.count("status.do"), 2);
    }

    #[test]
    fn test_problem_url() -> anyhow::Result<()> {
        let problem = Problem::new("p1", "s1", 1, "A+B", None);
        assert_eq!(
            actor(&FakeTransport::new()).problem_url(&problem)?.as_str(),
            "https://programming.pku.edu.cn/probset/s1/p1/"
        );
        Ok(())
    }
}
