use reqwest::header::LOCATION;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::auth::{Authenticate, FormAuth};
use crate::model::{
    Course, CourseId, Problem, ProblemDescription, ProblemId, ProblemSet, ProblemSetId,
    SolutionId, StatusKind, Verdict,
};
use crate::schema::{parse_local_time, portal_url, Schema, SchemaKind};
use crate::service::scrape::{fragment_to_text, normalize_spaces, Scrape as _};
use crate::service::{PageRequest, RawResponse};
use crate::{PortalError, Result};
use pgrid_util::{regex, select};

/// GBK encoded pages under `/programming/`, scraped with selectors.
///
/// The markup of these pages was never stable, so every field is looked up
/// through a list of selectors and the first match wins.
#[derive(Debug, Default, Clone)]
pub struct LegacySchema {
    auth: FormAuth,
}

fn first_match<'a>(html: &'a Html, selectors: &[&Selector]) -> Option<ElementRef<'a>> {
    selectors
        .iter()
        .find_map(|selector| html.find_first(selector))
}

fn trimmed_text(elem: ElementRef) -> String {
    normalize_spaces(&elem.inner_text()).trim().to_owned()
}

fn enclosing_row(elem: ElementRef) -> Option<ElementRef> {
    elem.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "tr")
}

fn shows_login_form(html: &Html) -> bool {
    html.find_first(select!("input[type=\"password\"]")).is_some()
}

impl LegacySchema {
    fn extract_set(link: ElementRef) -> Option<ProblemSet> {
        let href = link.value().attr("href")?;
        let id = regex!(r"problemsId=([^&#]+)").captures(href)?[1].to_owned();
        let title = trimmed_text(link);
        let row_text = enclosing_row(link)
            .map(|row| normalize_spaces(&row.inner_text()))
            .unwrap_or_default();
        let mut times = regex!(r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}(?::\d{2})?")
            .find_iter(&row_text)
            .filter_map(|m| parse_local_time(m.as_str()));
        let (open, close) = (times.next(), times.next());
        Some(ProblemSet::new(id, title, open, close))
    }

    fn extract_status(link: ElementRef) -> Option<StatusKind> {
        let row = enclosing_row(link)?;
        let raw = match row.find_first(select!("img[alt]")) {
            Some(img) => img.value().attr("alt").unwrap_or_default().to_owned(),
            None => row
                .select(select!("td"))
                .last()
                .map(trimmed_text)
                .unwrap_or_default(),
        };
        if raw.trim().is_empty() {
            None
        } else {
            Some(StatusKind::from_raw(&raw))
        }
    }

    fn section_html(html: &Html, selectors: &[&Selector]) -> String {
        first_match(html, selectors)
            .map(|elem| elem.inner_html().trim().to_owned())
            .unwrap_or_default()
    }
}

impl Schema for LegacySchema {
    fn kind(&self) -> SchemaKind {
        SchemaKind::LegacyHtml
    }

    fn authenticator(&self) -> &dyn Authenticate {
        &self.auth
    }

    fn charset(&self) -> &'static str {
        "gbk"
    }

    fn is_access_denied(&self, res: &RawResponse) -> bool {
        if res.status().is_redirection() {
            return res
                .headers()
                .get(LOCATION)
                .and_then(|loc| loc.to_str().ok())
                .map_or(false, |loc| loc.to_lowercase().contains("login"));
        }
        shows_login_form(&Html::parse_document(&res.text()))
    }

    fn course_request(&self, course_id: &CourseId) -> Result<PageRequest> {
        Ok(PageRequest::get(portal_url(&format!(
            "/programming/course/{}/show.do",
            course_id
        ))?))
    }

    fn decode_course(
        &self,
        course_id: &CourseId,
        res: &RawResponse,
    ) -> Result<(Course, Vec<ProblemSet>)> {
        let html = Html::parse_document(&res.text());
        let title = first_match(
            &html,
            &[
                select!("#courseName"),
                select!(".courseName"),
                select!("h1"),
                select!("h2"),
                select!("title"),
            ],
        )
        .map(trimmed_text)
        .filter(|title| !title.is_empty())
        .ok_or_else(|| PortalError::MalformedResponse("course page has no title".into()))?;
        let mut sets: Vec<ProblemSet> = Vec::new();
        for set in html
            .select(select!("a[href*=\"showProblemList.do\"]"))
            .filter_map(Self::extract_set)
        {
            if sets.iter().all(|known| known.id() != set.id()) {
                sets.push(set);
            }
        }
        Ok((Course::new(course_id.clone(), title), sets))
    }

    fn problems_request(
        &self,
        course_id: &CourseId,
        set_id: &ProblemSetId,
    ) -> Result<PageRequest> {
        let mut url = portal_url(&format!(
            "/programming/course/{}/showProblemList.do",
            course_id
        ))?;
        url.query_pairs_mut()
            .append_pair("problemsId", set_id.as_ref());
        Ok(PageRequest::get(url))
    }

    fn decode_problems(&self, set_id: &ProblemSetId, res: &RawResponse) -> Result<Vec<Problem>> {
        let html = Html::parse_document(&res.text());
        let mut problems: Vec<Problem> = Vec::new();
        for link in html.select(select!("a[href*=\"/problem/\"]")) {
            let href = link.value().attr("href").unwrap_or_default();
            let id = match regex!(r"/problem/([0-9a-f]{32})/show\.do").captures(href) {
                Some(caps) => ProblemId::from(&caps[1]),
                None => continue,
            };
            if problems.iter().any(|known| known.id() == &id) {
                continue;
            }
            let index = problems.len() + 1;
            let status = Self::extract_status(link);
            problems.push(Problem::new(id, set_id.clone(), index, trimmed_text(link), status));
        }
        if problems.is_empty() && html.find_first(select!("table")).is_none() {
            return Err(PortalError::MalformedResponse(format!(
                "no permission to view problem set {}",
                set_id
            ))
            .into());
        }
        Ok(problems)
    }

    fn description_request(&self, problem: &Problem) -> Result<PageRequest> {
        Ok(PageRequest::get(self.problem_page_url(problem)?))
    }

    fn decode_description(&self, res: &RawResponse) -> Result<ProblemDescription> {
        let html = Html::parse_document(&res.text());
        let title = first_match(
            &html,
            &[select!("#problemTitle"), select!(".problemTitle"), select!("h1")],
        )
        .map(trimmed_text)
        .unwrap_or_default();
        let description = Self::section_html(
            &html,
            &[select!("#problemDescription"), select!(".problemDescription")],
        );
        if title.is_empty() && description.is_empty() {
            return Err(
                PortalError::MalformedResponse("problem page has no statement".into()).into(),
            );
        }
        let sample_input = Self::section_html(&html, &[select!("#sampleInput"), select!(".sampleInput")]);
        let sample_output =
            Self::section_html(&html, &[select!("#sampleOutput"), select!(".sampleOutput")]);
        Ok(ProblemDescription::builder(title)
            .description(description)
            .about_input(Self::section_html(&html, &[select!("#aboutInput"), select!(".aboutInput")]))
            .about_output(Self::section_html(
                &html,
                &[select!("#aboutOutput"), select!(".aboutOutput")],
            ))
            .hint(Self::section_html(&html, &[select!("#problemHint"), select!(".hint")]))
            .samples(fragment_to_text(&sample_input), fragment_to_text(&sample_output))
            .build())
    }

    fn submit_request(
        &self,
        set_id: &ProblemSetId,
        problem_id: &ProblemId,
        source: &str,
        language: &str,
    ) -> Result<PageRequest> {
        let form = vec![
            ("problemId", problem_id.as_ref()),
            ("problemsId", set_id.as_ref()),
            ("sourceCode", source),
            ("programLanguage", language),
        ];
        Ok(PageRequest::post_form(
            portal_url("/programming/problem/submit.do")?,
            form,
        ))
    }

    fn decode_submit(&self, res: &RawResponse) -> Result<SolutionId> {
        let id_of = |href: &str| {
            regex!(r"solutionId=([0-9A-Za-z]+)")
                .captures(href)
                .map(|caps| SolutionId::from(&caps[1]))
        };
        if let Some(id) = res
            .headers()
            .get(LOCATION)
            .and_then(|loc| loc.to_str().ok())
            .and_then(id_of)
        {
            return Ok(id);
        }
        let html = Html::parse_document(&res.text());
        html.find_first(select!("a[href*=\"solutionId=\"]"))
            .and_then(|link| link.value().attr("href"))
            .and_then(id_of)
            .ok_or_else(|| {
                PortalError::MalformedResponse("submission reply has no solution".into()).into()
            })
    }

    fn solution_request(&self, solution_id: &SolutionId) -> Result<PageRequest> {
        let mut url = portal_url("/programming/problem/solution.do")?;
        url.query_pairs_mut()
            .append_pair("solutionId", solution_id.as_ref());
        Ok(PageRequest::get(url))
    }

    fn decode_solution(&self, solution_id: &SolutionId, res: &RawResponse) -> Result<Verdict> {
        let html = Html::parse_document(&res.text());
        let status = first_match(
            &html,
            &[select!("#result"), select!(".result"), select!(".solutionResult")],
        )
        .map(trimmed_text)
        .filter(|status| !status.is_empty())
        .ok_or_else(|| PortalError::JudgeUnavailable(solution_id.to_string()))?;
        let details = first_match(&html, &[select!("#hint pre"), select!("pre")])
            .map(|pre| normalize_spaces(&pre.text_with_breaks()))
            .unwrap_or_default();
        Ok(Verdict::new(status, details))
    }

    fn problem_page_url(&self, problem: &Problem) -> Result<Url> {
        let mut url = portal_url(&format!("/programming/problem/{}/show.do", problem.id()))?;
        url.query_pairs_mut()
            .append_pair("problemsId", problem.set_id().as_ref());
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use chrono::Utc;
    use reqwest::header::CONTENT_TYPE;
    use reqwest::StatusCode;

    use super::*;

    use crate::portal_error;

    static PROBLEM_A: &str = "00000000000000000000000000000001";
    static PROBLEM_B: &str = "00000000000000000000000000000002";

    fn page(path: &str, body: &str) -> RawResponse {
        RawResponse::new(StatusCode::OK, portal_url(path).unwrap())
            .header(CONTENT_TYPE, "text/html;charset=GBK")
            .body(body.to_owned())
    }

    fn course_id() -> CourseId {
        CourseId::from("0123456789abcdef0123456789abcdef")
    }

    #[test]
    fn test_is_access_denied() {
        let schema = LegacySchema::default();
        let login = page(
            "/programming/course/x/show.do",
            r#"<form action="login.do"><input type="password" name="password"></form>"#,
        );
        assert!(schema.is_access_denied(&login));
        assert!(!schema.is_access_denied(&page("/programming/course/x/show.do", "<h1>C</h1>")));

        let url = portal_url("/programming/problem/submit.do").unwrap();
        let to_login =
            RawResponse::new(StatusCode::FOUND, url.clone()).header(LOCATION, "/programming/login.do");
        assert!(schema.is_access_denied(&to_login));
        let to_solution = RawResponse::new(StatusCode::FOUND, url)
            .header(LOCATION, "/programming/problem/solution.do?solutionId=42");
        assert!(!schema.is_access_denied(&to_solution));
    }

    #[test]
    fn test_decode_course() -> anyhow::Result<()> {
        let res = page(
            "/programming/course/x/show.do",
            r#"<html><head><title>Programming Grid</title></head><body>
            <h2>Intro&nbsp;to Computing</h2>
            <table>
              <tr><td><a href="showProblemList.do?problemsId=aa11">Week 1</a></td>
                  <td>2021-10-01 08:00:00</td><td>2021-10-08 23:59:59</td></tr>
              <tr><td><a href="showProblemList.do?problemsId=bb22">Practice</a></td>
                  <td></td><td></td></tr>
              <tr><td><a href="showProblemList.do?problemsId=aa11&amp;x=1">Week 1</a></td></tr>
            </table></body></html>"#,
        );
        let (course, sets) = LegacySchema::default().decode_course(&course_id(), &res)?;
        assert_eq!(course.title(), "Intro to Computing");
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].id(), &ProblemSetId::from("aa11"));
        assert_eq!(sets[0].title(), "Week 1");
        assert_eq!(sets[0].open(), Some(Utc.ymd(2021, 10, 1).and_hms(0, 0, 0)));
        assert_eq!(sets[0].close(), Some(Utc.ymd(2021, 10, 8).and_hms(15, 59, 59)));
        assert_eq!(sets[1].open(), None);
        assert!(!sets[1].is_available());
        Ok(())
    }

    #[test]
    fn test_decode_problems() -> anyhow::Result<()> {
        let set_id = ProblemSetId::from("aa11");
        let body = format!(
            r#"<table>
              <tr><th>Title</th><th>Result</th></tr>
              <tr><td><a href="/programming/problem/{a}/show.do?problemsId=aa11">A+B</a></td>
                  <td><img src="yes.gif" alt="Yes"></td></tr>
              <tr><td><a href="/programming/problem/{b}/show.do?problemsId=aa11">Sort</a></td>
                  <td>Wrong Answer</td></tr>
              <tr><td><a href="/programming/problem/{a}/show.do?problemsId=aa11">again</a></td></tr>
            </table>"#,
            a = PROBLEM_A,
            b = PROBLEM_B
        );
        let res = page("/programming/course/x/showProblemList.do", &body);
        let problems = LegacySchema::default().decode_problems(&set_id, &res)?;
        assert_eq!(
            problems,
            vec![
                Problem::new(PROBLEM_A, "aa11", 1, "A+B", Some(StatusKind::Accepted)),
                Problem::new(PROBLEM_B, "aa11", 2, "Sort", Some(StatusKind::WrongAnswer)),
            ]
        );

        let res = page("/programming/course/x/showProblemList.do", "<p>No permission</p>");
        let err = LegacySchema::default()
            .decode_problems(&set_id, &res)
            .unwrap_err();
        assert!(matches!(
            portal_error(&err),
            Some(PortalError::MalformedResponse(_))
        ));
        Ok(())
    }

    #[test]
    fn test_decode_description() -> anyhow::Result<()> {
        let res = page(
            "/programming/problem/x/show.do",
            r#"<div id="problemTitle"> A+B </div>
            <div id="problemDescription"><p>Add <img src="/images/a.png"></p></div>
            <div id="aboutInput">two ints</div>
            <div id="aboutOutput">one int</div>
            <div id="sampleInput"><pre>1&nbsp;2</pre></div>
            <div id="sampleOutput"><pre>3<br>4</pre></div>"#,
        );
        let desc = LegacySchema::default().decode_description(&res)?;
        assert_eq!(desc.title(), "A+B");
        assert_eq!(desc.description(), r#"<p>Add <img src="/images/a.png"></p>"#);
        assert_eq!(desc.about_output(), "one int");
        assert_eq!(desc.hint(), "");
        assert_eq!(desc.sample_input(), "1 2");
        assert_eq!(desc.sample_output(), "3\n4");

        let res = page("/programming/problem/x/show.do", "<p>nothing</p>");
        assert!(LegacySchema::default().decode_description(&res).is_err());
        Ok(())
    }

    #[test]
    fn test_submit() -> anyhow::Result<()> {
        let schema = LegacySchema::default();
        let (set_id, problem_id) = (ProblemSetId::from("aa11"), ProblemId::from(PROBLEM_A));
        let req = schema.submit_request(&set_id, &problem_id, "int main() {}", "C++")?;
        assert_eq!(req.form_value("problemId"), Some(PROBLEM_A));
        assert_eq!(req.form_value("problemsId"), Some("aa11"));
        assert_eq!(req.form_value("programLanguage"), Some("C++"));

        let url = portal_url("/programming/problem/submit.do")?;
        let redirected = RawResponse::new(StatusCode::FOUND, url)
            .header(LOCATION, "/programming/problem/solution.do?solutionId=77");
        assert_eq!(schema.decode_submit(&redirected)?, SolutionId::from("77"));

        let linked = page(
            "/programming/problem/submit.do",
            r#"<a href="solution.do?solutionId=78">view</a>"#,
        );
        assert_eq!(schema.decode_submit(&linked)?, SolutionId::from("78"));
        assert!(schema
            .decode_submit(&page("/programming/problem/submit.do", "<p>error</p>"))
            .is_err());
        Ok(())
    }

    #[test]
    fn test_decode_solution() -> anyhow::Result<()> {
        let schema = LegacySchema::default();
        let solution_id = SolutionId::from("77");
        let res = page(
            "/programming/problem/solution.do",
            "<span id=\"result\">Accepted</span>\
             <div id=\"hint\"><pre>Case 1: Time = 100ms, Memory = 200kB.<br>\
             Case 2: Time = 200ms, Memory = 300kB.</pre></div>",
        );
        let verdict = schema.decode_solution(&solution_id, &res)?;
        assert_eq!(verdict.status(), StatusKind::Accepted);
        assert_eq!(verdict.performance().to_string(), "150ms/250kB");

        let res = page("/programming/problem/solution.do", "<p>none</p>");
        let err = schema.decode_solution(&solution_id, &res).unwrap_err();
        assert!(matches!(
            portal_error(&err),
            Some(PortalError::JudgeUnavailable(_))
        ));
        Ok(())
    }

    #[test]
    fn test_urls() -> anyhow::Result<()> {
        let schema = LegacySchema::default();
        let problem = Problem::new(PROBLEM_A, "aa11", 1, "A+B", None);
        assert_eq!(
            schema.problem_page_url(&problem)?.as_str(),
            format!(
                "https://programming.pku.edu.cn/programming/problem/{}/show.do?problemsId=aa11",
                PROBLEM_A
            )
        );
        assert_eq!(
            schema
                .problems_request(&course_id(), &ProblemSetId::from("aa11"))?
                .url()
                .as_str(),
            "https://programming.pku.edu.cn/programming/course/0123456789abcdef0123456789abcdef/showProblemList.do?problemsId=aa11"
        );
        Ok(())
    }
}
