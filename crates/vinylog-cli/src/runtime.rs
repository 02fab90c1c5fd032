// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use url::Url;
use vinylog_api::{CatalogClient, Client, Fetcher};
use vinylog_app::{
    CatalogSuggestion, DateRange, FieldKey, FieldValue, FilterSet, ListQuery, Lookups, PageView,
    Record, RecordFormInput, RecordId, StatsReport, UserInfo,
};

/// `AppRuntime` over the remote inventory service: the page cache sits in
/// front of the list endpoint, everything else calls straight through.
pub struct ApiRuntime {
    client: Client,
    fetcher: Fetcher,
    catalog: Option<CatalogClient>,
}

impl ApiRuntime {
    pub fn new(client: Client, catalog: Option<CatalogClient>) -> Self {
        Self {
            client,
            fetcher: Fetcher::new(),
            catalog,
        }
    }
}

impl vinylog_tui::AppRuntime for ApiRuntime {
    fn fetch_page(&mut self, query: &ListQuery) -> Result<PageView> {
        self.fetcher.fetch(&self.client, query)
    }

    fn fetch_record(&mut self, id: RecordId) -> Result<Record> {
        self.client.get_record(id)
    }

    fn patch_field(&mut self, id: RecordId, key: FieldKey, value: &FieldValue) -> Result<Record> {
        self.client.patch_field(id, key, value)
    }

    fn create_record(&mut self, form: &RecordFormInput) -> Result<Record> {
        self.client.create_record(&form.to_draft())
    }

    fn update_record(&mut self, id: RecordId, form: &RecordFormInput) -> Result<Record> {
        self.client.update_record(id, &form.to_draft())
    }

    fn delete_record(&mut self, id: RecordId) -> Result<()> {
        self.client.delete_record(id)
    }

    fn fetch_stats(&mut self, range: &DateRange) -> Result<StatsReport> {
        self.client.stats(range)
    }

    fn load_lookups(&mut self) -> Result<Lookups> {
        self.client.load_lookups()
    }

    fn current_user(&mut self) -> Result<Option<UserInfo>> {
        self.client.current_user()
    }

    fn catalog_search(&mut self, artist: &str, title: &str) -> Result<Vec<CatalogSuggestion>> {
        match &self.catalog {
            Some(catalog) => catalog.search(artist, title),
            None => bail!("catalog integration is disabled; set [catalog] in the config"),
        }
    }

    fn share_link(&self, filters: &FilterSet) -> Option<String> {
        let mut url = Url::parse(&format!("{}/records", self.client.base_url())).ok()?;
        url.query_pairs_mut()
            .extend_pairs(filters.to_query_pairs());
        Some(url.to_string())
    }
}
