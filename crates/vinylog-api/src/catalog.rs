// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use std::time::Duration;
use url::Url;
use vinylog_app::CatalogSuggestion;

/// Client for the external record-catalog search, used only to pre-fill
/// form fields. Callers must treat every failure as non-fatal: a miss just
/// skips pre-fill.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    base_url: String,
    token: String,
    http: HttpClient,
}

impl CatalogClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("catalog.base_url must not be empty");
        }
        if token.trim().is_empty() {
            bail!("catalog.token must not be empty");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build catalog HTTP client")?;

        Ok(Self {
            base_url,
            token: token.trim().to_owned(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn search(&self, artist: &str, title: &str) -> Result<Vec<CatalogSuggestion>> {
        let mut url = Url::parse(&format!("{}/database/search", self.base_url))
            .context("build catalog search URL")?;
        {
            let mut pairs = url.query_pairs_mut();
            if !artist.trim().is_empty() {
                pairs.append_pair("artist", artist.trim());
            }
            if !title.trim().is_empty() {
                pairs.append_pair("release_title", title.trim());
            }
            pairs.append_pair("per_page", "10");
        }

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .context("reach record catalog")?;

        let status = response.status();
        if !status.is_success() {
            bail!("catalog search failed ({})", status.as_u16());
        }

        let parsed: SearchResponse = response.json().context("decode catalog results")?;
        Ok(parsed
            .results
            .into_iter()
            .map(|result| result.into_suggestion(artist))
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    year: Option<YearField>,
    #[serde(default)]
    label: Vec<String>,
    #[serde(default)]
    catno: String,
    #[serde(default)]
    country: String,
}

/// The catalog serves year as either a number or a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum YearField {
    Number(i32),
    Text(String),
}

impl YearField {
    fn as_year(&self) -> Option<i32> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(value) => value.trim().parse().ok(),
        }
    }
}

impl SearchResult {
    fn into_suggestion(self, artist: &str) -> CatalogSuggestion {
        CatalogSuggestion {
            title: strip_artist_prefix(&self.title, artist),
            year: self.year.as_ref().and_then(YearField::as_year),
            label: self.label.into_iter().next().unwrap_or_default(),
            catalog_number: self.catno,
            country: self.country,
        }
    }
}

/// Catalog titles come back as "Artist - Title"; keep just the title when
/// the prefix matches the searched artist.
fn strip_artist_prefix(title: &str, artist: &str) -> String {
    if let Some((prefix, rest)) = title.split_once(" - ")
        && !artist.trim().is_empty()
        && prefix.trim().eq_ignore_ascii_case(artist.trim())
    {
        return rest.trim().to_owned();
    }
    title.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::{CatalogClient, SearchResult, YearField, strip_artist_prefix};
    use std::time::Duration;

    #[test]
    fn client_requires_base_url_and_token() {
        assert!(CatalogClient::new("", "tok", Duration::from_secs(1)).is_err());
        assert!(
            CatalogClient::new("https://api.example.com", " ", Duration::from_secs(1)).is_err()
        );
        assert!(
            CatalogClient::new("https://api.example.com/", "tok", Duration::from_secs(1)).is_ok()
        );
    }

    #[test]
    fn artist_prefix_is_stripped_case_insensitively() {
        assert_eq!(
            strip_artist_prefix("Miles Davis - Kind Of Blue", "miles davis"),
            "Kind Of Blue",
        );
        assert_eq!(
            strip_artist_prefix("Kind Of Blue", "Miles Davis"),
            "Kind Of Blue",
        );
        assert_eq!(
            strip_artist_prefix("Miles Davis - Kind Of Blue", ""),
            "Miles Davis - Kind Of Blue",
        );
    }

    #[test]
    fn year_field_accepts_numbers_and_strings() {
        let raw = r#"{"title":"X","year":"1959","label":["Columbia"],"catno":"CL 1355","country":"US"}"#;
        let result: SearchResult = serde_json::from_str(raw).expect("decode result");
        assert_eq!(result.year.as_ref().and_then(YearField::as_year), Some(1959));

        let raw = r#"{"title":"X","year":1959}"#;
        let result: SearchResult = serde_json::from_str(raw).expect("decode result");
        assert_eq!(result.year.as_ref().and_then(YearField::as_year), Some(1959));

        let suggestion = result.into_suggestion("");
        assert_eq!(suggestion.year, Some(1959));
        assert_eq!(suggestion.label, "");
    }
}
