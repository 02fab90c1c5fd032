// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::collections::HashMap;
use vinylog_app::{ListQuery, PageView, RecordPage};

use crate::Client;

/// Page cache keyed by the canonical list-query string. Because the key
/// covers the full parameter set, a superseded response can only ever land
/// under its own key and never clobbers a newer query's entry.
#[derive(Debug, Default)]
pub struct Fetcher {
    cache: HashMap<String, RecordPage>,
}

impl Fetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last successful response for this exact query, if any. Rendered
    /// while a refetch is pending so the table never flickers empty.
    pub fn cached(&self, query: &ListQuery) -> Option<PageView> {
        self.cache
            .get(&query.cache_key())
            .map(|page| page_view(page.clone(), false))
    }

    /// Issue the list query. On success the cache entry is replaced; on
    /// failure a cached page for the same key is returned marked stale, and
    /// only a miss surfaces the error.
    pub fn fetch(&mut self, client: &Client, query: &ListQuery) -> Result<PageView> {
        let key = query.cache_key();
        match client.list_records(query) {
            Ok(page) => {
                self.cache.insert(key, page.clone());
                Ok(page_view(page, false))
            }
            Err(error) => match self.cache.get(&key) {
                Some(page) => Ok(page_view(page.clone(), true)),
                None => Err(error),
            },
        }
    }

    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    pub fn entry_count(&self) -> usize {
        self.cache.len()
    }
}

fn page_view(page: RecordPage, stale: bool) -> PageView {
    PageView {
        rows: page.content,
        envelope: page.pagination,
        totals: page.totals,
        stale,
    }
}
