// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod catalog;
pub mod fetcher;

pub use catalog::*;
pub use fetcher::*;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::{COOKIE, SET_COOKIE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use vinylog_app::{
    DateRange, FieldKey, FieldValue, FilterBounds, ListQuery, Lookups, Record, RecordDraft,
    RecordId, RecordPage, StatsReport, StatusEntry, UserInfo, values,
};

pub const SESSION_COOKIE: &str = "vinylog_session";

/// Failure classification the UI cares about: could not reach the service
/// at all, or the service answered with a non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Transport(String),
    Status { code: u16, message: String },
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(detail) => write!(f, "cannot reach the inventory service ({detail})"),
            Self::Status { code, message } => write!(f, "server error ({code}): {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceKind {
    Buy,
    Sell,
}

impl PlaceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// Blocking client for the inventory service. Also the app's auth context:
/// it is constructed once in main, carries the opaque session cookie, and
/// exposes exactly `current_user`/`login`/`logout` to the layers above.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    http: HttpClient,
    session: Option<String>,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        Url::parse(&base_url).with_context(|| format!("invalid api.base_url {base_url:?}"))?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            http,
            session: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn with_session(mut self, cookie: &str) -> Self {
        self.set_session(cookie);
        self
    }

    pub fn set_session(&mut self, cookie: &str) {
        let cookie = cookie.trim();
        self.session = (!cookie.is_empty()).then(|| cookie.to_owned());
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Cheap reachability probe used by `--check`.
    pub fn ping(&self) -> Result<()> {
        self.list_statuses().map(|_| ())
    }

    pub fn list_records(&self, query: &ListQuery) -> Result<RecordPage> {
        let mut url = self.endpoint("/records")?;
        url.query_pairs_mut().extend_pairs(query.query_pairs());
        let response = self.send(self.http.get(url))?;
        response.json().context("decode record page")
    }

    pub fn get_record(&self, id: RecordId) -> Result<Record> {
        let url = self.endpoint(&format!("/records/{}", id.get()))?;
        let response = self.send(self.http.get(url))?;
        response.json().context("decode record")
    }

    pub fn create_record(&self, draft: &RecordDraft) -> Result<Record> {
        let url = self.endpoint("/records")?;
        let response = self.send(self.http.post(url).json(draft))?;
        response.json().context("decode created record")
    }

    pub fn update_record(&self, id: RecordId, draft: &RecordDraft) -> Result<Record> {
        let url = self.endpoint(&format!("/records/{}", id.get()))?;
        let response = self.send(self.http.put(url).json(draft))?;
        response.json().context("decode updated record")
    }

    /// Single-field partial update. The response is the full canonical
    /// record, including any server-derived changes.
    pub fn patch_field(&self, id: RecordId, key: FieldKey, value: &FieldValue) -> Result<Record> {
        if !key.is_editable() {
            bail!(
                "field {} is computed by the service and cannot be edited",
                key.wire_name()
            );
        }
        let mut body = serde_json::Map::new();
        body.insert(key.wire_name().to_owned(), field_value_json(value));
        let url = self.endpoint(&format!("/records/{}", id.get()))?;
        let response = self.send(self.http.patch(url).json(&body))?;
        response.json().context("decode patched record")
    }

    pub fn delete_record(&self, id: RecordId) -> Result<()> {
        let url = self.endpoint(&format!("/records/{}", id.get()))?;
        self.send(self.http.delete(url))?;
        Ok(())
    }

    pub fn stats(&self, range: &DateRange) -> Result<StatsReport> {
        let mut url = self.endpoint("/stats")?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(from) = range.from {
                pairs.append_pair("from", &values::format_date(Some(from)));
            }
            if let Some(to) = range.to {
                pairs.append_pair("to", &values::format_date(Some(to)));
            }
        }
        let response = self.send(self.http.get(url))?;
        response.json().context("decode stats report")
    }

    pub fn list_artists(&self) -> Result<Vec<String>> {
        let url = self.endpoint("/lookups/artists")?;
        let response = self.send(self.http.get(url))?;
        response.json().context("decode artist lookup")
    }

    pub fn list_places(&self, kind: PlaceKind) -> Result<Vec<String>> {
        let mut url = self.endpoint("/lookups/places")?;
        url.query_pairs_mut().append_pair("kind", kind.as_str());
        let response = self.send(self.http.get(url))?;
        response.json().context("decode place lookup")
    }

    pub fn list_statuses(&self) -> Result<Vec<StatusEntry>> {
        let url = self.endpoint("/lookups/statuses")?;
        let response = self.send(self.http.get(url))?;
        response.json().context("decode status catalog")
    }

    pub fn filter_bounds(&self) -> Result<FilterBounds> {
        let url = self.endpoint("/lookups/filter-bounds")?;
        let response = self.send(self.http.get(url))?;
        response.json().context("decode filter bounds")
    }

    /// Aggregate the lookup endpoints into one startup payload.
    pub fn load_lookups(&self) -> Result<Lookups> {
        Ok(Lookups {
            artists: self.list_artists()?,
            buy_places: self.list_places(PlaceKind::Buy)?,
            sell_places: self.list_places(PlaceKind::Sell)?,
            statuses: self.list_statuses()?,
            bounds: self.filter_bounds()?,
        })
    }

    /// `None` means signed out (the service answered 401); the cookie itself
    /// is never inspected.
    pub fn current_user(&self) -> Result<Option<UserInfo>> {
        let url = self.endpoint("/session/me")?;
        let response = self
            .with_cookie(self.http.get(url))
            .send()
            .map_err(|error| connection_error(error))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        let user = response.json().context("decode session user")?;
        Ok(Some(user))
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let url = self.endpoint("/session")?;
        let body = LoginRequest { username, password };
        let response = self.send(self.http.post(url).json(&body))?;

        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_session_cookie)
            .ok_or_else(|| anyhow!("login response carried no session cookie"))?;
        self.session = Some(cookie);
        Ok(())
    }

    pub fn logout(&mut self) -> Result<()> {
        let url = self.endpoint("/session")?;
        self.send(self.http.delete(url))?;
        self.session = None;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}{path}", self.base_url))
            .with_context(|| format!("build request URL for {path}"))
    }

    fn with_cookie(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.session {
            Some(cookie) => request.header(COOKIE, format!("{SESSION_COOKIE}={cookie}")),
            None => request,
        }
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .with_cookie(request)
            .send()
            .map_err(|error| connection_error(error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(response)
    }
}

fn field_value_json(value: &FieldValue) -> serde_json::Value {
    match value {
        FieldValue::Text(text) => serde_json::json!(text),
        FieldValue::Money(cents) => serde_json::json!(cents),
        FieldValue::Date(date) => match date {
            Some(date) => serde_json::json!(values::format_date(Some(*date))),
            None => serde_json::Value::Null,
        },
        FieldValue::Year(year) => serde_json::json!(year),
        FieldValue::Status(status) => serde_json::json!(status.as_str()),
        FieldValue::Support(support) => serde_json::json!(support.as_str()),
        FieldValue::Condition(condition) => serde_json::json!(condition.as_str()),
        FieldValue::Listing(listing) => serde_json::json!(listing.as_str()),
        FieldValue::Flag(flag) => serde_json::json!(flag),
    }
}

fn extract_session_cookie(header: &str) -> Option<String> {
    let (name, rest) = header.split_once('=')?;
    if name.trim() != SESSION_COOKIE {
        return None;
    }
    let value = rest.split(';').next()?.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

fn connection_error(error: reqwest::Error) -> anyhow::Error {
    anyhow::Error::new(ApiError::Transport(error.to_string()))
        .context("check api.base_url and that the service is up")
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    let message = extract_error_message(body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_owned());
    anyhow::Error::new(ApiError::Status {
        code: status.as_u16(),
        message,
    })
}

fn extract_error_message(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<MessageEnvelope>(body)
        && let Some(message) = parsed.message
        && !message.is_empty()
    {
        return Some(message);
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.is_empty()
    {
        return Some(error);
    }

    if !body.is_empty() && body.len() < 200 && !body.contains('{') {
        return Some(body.to_owned());
    }

    None
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageEnvelope {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
}
