//! Authenticated WebUntis session: login, logout and exam queries.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::NaiveDate;
use reqwest::{
    Client, StatusCode, Url,
    header::{self, HeaderMap},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Credentials, Error, Exam, Result, School, codec,
    http::{self, HttpClientBuilder},
};

const LOGIN_PATH: &str = "j_spring_security_check";
const EXAMS_PATH: &str = "api/exams";

const SESSION_COOKIE: &str = "JSESSIONID";
const SCHOOL_COOKIE: &str = "schoolname";

// Wire names of the integer-encoded exam fields
const EXAM_DATE_FIELD: &str = "examDate";
const START_TIME_FIELD: &str = "startTime";
const END_TIME_FIELD: &str = "endTime";

/// Observable authentication state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
}

/// How the exam list is located inside the response body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExamParsing {
    /// Require `{ "data": { "exams": [...] } }`.
    #[default]
    Strict,
    /// Take whatever lies between the first `[` and the last `]` of the body.
    Lenient,
}

#[derive(Clone)]
struct SessionCookies {
    session_id: String,
    school_id: String,
}

impl SessionCookies {
    fn header_value(&self) -> String {
        format!(
            "{SESSION_COOKIE}={}; {SCHOOL_COOKIE}={}",
            self.session_id, self.school_id
        )
    }
}

impl fmt::Debug for SessionCookies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionCookies(<redacted>)")
    }
}

#[derive(Debug)]
enum State {
    Unauthenticated,
    Authenticating,
    Authenticated(SessionCookies),
}

#[derive(Serialize)]
struct LoginForm<'a> {
    school: &'a str,
    j_username: &'a str,
    j_password: &'a str,
    token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireExam {
    #[serde(default)]
    exam_type: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    exam_date: Value,
    #[serde(default)]
    start_time: Value,
    #[serde(default)]
    end_time: Value,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// Session against one school for one user.
///
/// Methods take `&self`; the cookie pair lives behind a mutex that is never
/// held across an `.await`. Dropping an in-flight [`Session::login`] future
/// puts the session back into [`SessionState::Unauthenticated`], dropping a
/// [`Session::fetch_exams`] future changes nothing.
pub struct Session {
    client: Client,
    base_url: Url,
    school: School,
    credentials: Credentials,
    parsing: ExamParsing,
    state: Mutex<State>,
}

impl Session {
    pub fn new(school: School, credentials: Credentials) -> Result<Self> {
        let client = HttpClientBuilder::new().build()?;
        let base_url = Url::parse(&format!("https://{}/WebUntis/", school.server))
            .map_err(|e| Error::Config(format!("Invalid server '{}': {e}", school.server)))?;
        Ok(Self::with_client(client, base_url, school, credentials))
    }

    /// Uses an existing client and an explicit `.../WebUntis/` base URL.
    pub fn with_client(
        client: Client,
        base_url: Url,
        school: School,
        credentials: Credentials,
    ) -> Self {
        Self {
            client,
            base_url,
            school,
            credentials,
            parsing: ExamParsing::default(),
            state: Mutex::new(State::Unauthenticated),
        }
    }

    pub fn with_parsing(mut self, parsing: ExamParsing) -> Self {
        self.parsing = parsing;
        self
    }

    pub fn school(&self) -> &School {
        &self.school
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    pub fn state(&self) -> SessionState {
        match *self.lock_state() {
            State::Unauthenticated => SessionState::Unauthenticated,
            State::Authenticating => SessionState::Authenticating,
            State::Authenticated(_) => SessionState::Authenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Logs in unless already authenticated.
    ///
    /// Fails with [`Error::LoginInProgress`] if another login on this session
    /// has not finished yet.
    pub async fn login(&self) -> Result<()> {
        {
            let mut state = self.lock_state();
            match *state {
                State::Authenticated(_) => return Ok(()),
                State::Authenticating => return Err(Error::LoginInProgress),
                State::Unauthenticated => *state = State::Authenticating,
            }
        }

        let guard = LoginGuard {
            state: &self.state,
            finished: false,
        };
        let result = self.authenticate().await;
        guard.finish(result)
    }

    /// Forgets the session cookies.
    pub fn logout(&self) {
        let mut state = self.lock_state();
        if matches!(*state, State::Authenticated(_)) {
            tracing::info!("Logged out {}", self.credentials.username);
            *state = State::Unauthenticated;
        }
    }

    /// Fetches all exams between `from` and `to` (inclusive) in one request.
    pub async fn fetch_exams(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Exam>> {
        let cookie = self.cookie_header()?;
        let url = self.endpoint(EXAMS_PATH)?;

        tracing::info!(
            "Fetching exams for {} from {} to {}",
            self.school.login_name,
            codec::encode_date(from),
            codec::encode_date(to)
        );

        let response = self
            .client
            .get(url)
            .query(&[
                ("startDate", codec::query_date(from)),
                ("endDate", codec::query_date(to)),
            ])
            .header(header::ACCEPT, "application/json")
            .header(header::COOKIE, cookie)
            .send()
            .await
            .map_err(http::handle_error_req)?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            tracing::warn!(
                "Exam request rejected with HTTP {}, session expired",
                response.status()
            );
            self.logout();
            return Err(Error::SessionExpired);
        }

        let response = http::ensure_success("exams", response).await?;
        let body = response.text().await.map_err(http::handle_error_req)?;
        let exams = parse_exams(&body, self.parsing)?;

        tracing::info!("Fetched {} exams", exams.len());
        Ok(exams)
    }

    async fn authenticate(&self) -> Result<SessionCookies> {
        tracing::info!(
            "Logging in to school {} as {}",
            self.school.login_name,
            self.credentials.username
        );

        let response = self
            .client
            .post(self.endpoint(LOGIN_PATH)?)
            .header(header::ACCEPT, "application/json")
            .form(&LoginForm {
                school: &self.school.login_name,
                j_username: &self.credentials.username,
                j_password: &self.credentials.password,
                token: "",
            })
            .send()
            .await
            .map_err(http::handle_error_req)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Authentication(format!("HTTP {status}: {body}")));
        }

        let cookies = extract_cookies(response.headers())?;
        tracing::info!("Login successful for {}", self.credentials.username);
        Ok(cookies)
    }

    fn cookie_header(&self) -> Result<String> {
        match &*self.lock_state() {
            State::Authenticated(cookies) => Ok(cookies.header_value()),
            State::Unauthenticated | State::Authenticating => Err(Error::NotAuthenticated),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid endpoint '{path}': {e}")))
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url.as_str())
            .field("school", &self.school)
            .field("credentials", &self.credentials)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resets the session to unauthenticated unless the login ran to completion.
struct LoginGuard<'a> {
    state: &'a Mutex<State>,
    finished: bool,
}

impl LoginGuard<'_> {
    fn finish(mut self, result: Result<SessionCookies>) -> Result<()> {
        self.finished = true;
        let mut state = lock(self.state);
        match result {
            Ok(cookies) => {
                *state = State::Authenticated(cookies);
                Ok(())
            }
            Err(e) => {
                *state = State::Unauthenticated;
                Err(e)
            }
        }
    }
}

impl Drop for LoginGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *lock(self.state) = State::Unauthenticated;
        }
    }
}

fn extract_cookies(headers: &HeaderMap) -> Result<SessionCookies> {
    let mut session_id = None;
    let mut school_id = None;

    for value in headers.get_all(header::SET_COOKIE) {
        let Ok(cookie) = value.to_str() else {
            continue;
        };
        let Some((name, value)) = cookie
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
        else {
            continue;
        };

        let name = name.trim();
        let value = value.trim();
        if session_id.is_none() && name.starts_with(SESSION_COOKIE) {
            session_id = Some(value.to_string());
        } else if school_id.is_none() && name.starts_with(SCHOOL_COOKIE) {
            school_id = Some(value.trim_matches('"').to_string());
        }
    }

    match (session_id, school_id) {
        (Some(session_id), Some(school_id)) if !session_id.is_empty() && !school_id.is_empty() => {
            Ok(SessionCookies {
                session_id,
                school_id,
            })
        }
        _ => Err(Error::Authentication(format!(
            "{SESSION_COOKIE} or {SCHOOL_COOKIE} cookie missing from login response"
        ))),
    }
}

/// Decodes an exam response body. Any malformed entry fails the whole list.
pub fn parse_exams(body: &str, parsing: ExamParsing) -> Result<Vec<Exam>> {
    let items = match parsing {
        ExamParsing::Strict => {
            let mut root: Value = serde_json::from_str(body)?;
            let exams = root
                .get_mut("data")
                .ok_or_else(|| Error::wire("data", "missing from exams response"))?
                .get_mut("exams")
                .ok_or_else(|| Error::wire("data.exams", "missing from exams response"))?
                .take();
            match exams {
                Value::Array(items) => items,
                other => {
                    return Err(Error::wire(
                        "data.exams",
                        format!("expected an array, got {other}"),
                    ));
                }
            }
        }
        ExamParsing::Lenient => match (body.find('['), body.rfind(']')) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str::<Vec<Value>>(&body[start..=end])?
            }
            _ => return Err(Error::wire("exams", "no JSON array in response")),
        },
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| decode_exam(index, item))
        .collect()
}

fn decode_exam(index: usize, item: Value) -> Result<Exam> {
    let wire: WireExam = serde_json::from_value(item)
        .map_err(|e| Error::wire(format!("exams[{index}]"), e.to_string()))?;
    let field = |name: &str| format!("exams[{index}].{name}");

    Ok(Exam {
        exam_type: normalize(wire.exam_type),
        name: normalize(wire.name),
        date: codec::decode_date(&field(EXAM_DATE_FIELD), &wire.exam_date)?,
        start_time: codec::decode_time(&field(START_TIME_FIELD), &wire.start_time)?,
        end_time: codec::decode_time(&field(END_TIME_FIELD), &wire.end_time)?,
        subject: wire.subject.unwrap_or_default(),
        description: normalize(wire.text),
    })
}

fn normalize(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
