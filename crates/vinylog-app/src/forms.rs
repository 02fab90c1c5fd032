// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use time::Date;

use crate::model::{Condition, Record, RecordDraft, SellingStatus, Support};

/// Input of the record creation / full-edit form. Validation here is the
/// pre-submission schema check; the service re-validates authoritatively.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFormInput {
    pub artist: String,
    pub title: String,
    pub support: Support,
    pub label: String,
    pub catalog_number: String,
    pub country: String,
    pub year: Option<i32>,
    pub condition: Condition,
    pub buy_place: String,
    pub buy_date: Option<Date>,
    pub net_buy_price_cents: Option<i64>,
    pub buy_fees_cents: Option<i64>,
    pub selling_status: SellingStatus,
    pub sell_place: String,
    pub sell_date: Option<Date>,
    pub sell_price_cents: Option<i64>,
    pub sell_fees_cents: Option<i64>,
    pub commission_cents: Option<i64>,
    pub platform_fees_cents: Option<i64>,
    pub issues: String,
}

impl RecordFormInput {
    pub fn blank() -> Self {
        Self {
            artist: String::new(),
            title: String::new(),
            support: Support::Lp,
            label: String::new(),
            catalog_number: String::new(),
            country: String::new(),
            year: None,
            condition: Condition::Vg,
            buy_place: String::new(),
            buy_date: None,
            net_buy_price_cents: None,
            buy_fees_cents: None,
            selling_status: SellingStatus::NotForSale,
            sell_place: String::new(),
            sell_date: None,
            sell_price_cents: None,
            sell_fees_cents: None,
            commission_cents: None,
            platform_fees_cents: None,
            issues: String::new(),
        }
    }

    /// Seed the form from an existing record for a full edit.
    pub fn from_record(record: &Record) -> Self {
        Self {
            artist: record.artist.clone(),
            title: record.title.clone(),
            support: record.support,
            label: record.label.clone(),
            catalog_number: record.catalog_number.clone(),
            country: record.country.clone(),
            year: record.year,
            condition: record.condition,
            buy_place: record.buy_place.clone(),
            buy_date: record.buy_date,
            net_buy_price_cents: record.net_buy_price_cents,
            buy_fees_cents: record.buy_fees_cents,
            selling_status: record.selling_status,
            sell_place: record.sell_place.clone(),
            sell_date: record.sell_date,
            sell_price_cents: record.sell_price_cents,
            sell_fees_cents: record.sell_fees_cents,
            commission_cents: record.commission_cents,
            platform_fees_cents: record.platform_fees_cents,
            issues: record.issues.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.artist.trim().is_empty() {
            bail!("artist is required -- enter an artist and retry");
        }
        if self.title.trim().is_empty() {
            bail!("title is required -- enter a title and retry");
        }
        if let Some(year) = self.year
            && !(1000..=9999).contains(&year)
        {
            bail!("year must be a four-digit year");
        }
        for cents in [
            self.net_buy_price_cents,
            self.buy_fees_cents,
            self.sell_price_cents,
            self.sell_fees_cents,
            self.commission_cents,
            self.platform_fees_cents,
        ]
        .into_iter()
        .flatten()
        {
            if cents < 0 {
                bail!("money values cannot be negative");
            }
        }

        if let (Some(buy_date), Some(sell_date)) = (self.buy_date, self.sell_date)
            && sell_date < buy_date
        {
            bail!("selling date must be on/after purchase date");
        }

        if self.selling_status.forbids_sale_fields() {
            if self.sell_date.is_some() {
                bail!("selling date must be empty while the record is not for sale");
            }
            if self.sell_price_cents.is_some_and(|cents| cents > 0) {
                bail!("selling price must be empty while the record is not for sale");
            }
            if !self.sell_place.trim().is_empty() {
                bail!("selling place must be empty while the record is not for sale");
            }
        }

        if self.selling_status.is_sold() {
            if self.sell_date.is_none() {
                bail!("a sold record needs a selling date");
            }
            if self.sell_price_cents.is_none() {
                bail!("a sold record needs a selling price");
            }
            if self.sell_place.trim().is_empty() {
                bail!("a sold record needs a selling place");
            }
        }

        Ok(())
    }

    pub fn to_draft(&self) -> RecordDraft {
        RecordDraft {
            artist: self.artist.trim().to_owned(),
            title: self.title.trim().to_owned(),
            support: self.support,
            label: self.label.trim().to_owned(),
            catalog_number: self.catalog_number.trim().to_owned(),
            country: self.country.trim().to_owned(),
            year: self.year,
            condition: self.condition,
            buy_place: self.buy_place.trim().to_owned(),
            buy_date: self.buy_date,
            net_buy_price_cents: self.net_buy_price_cents,
            buy_fees_cents: self.buy_fees_cents,
            selling_status: self.selling_status,
            sell_place: self.sell_place.trim().to_owned(),
            sell_date: self.sell_date,
            sell_price_cents: self.sell_price_cents,
            sell_fees_cents: self.sell_fees_cents,
            commission_cents: self.commission_cents,
            platform_fees_cents: self.platform_fees_cents,
            issues: self.issues.trim().to_owned(),
        }
    }
}
