// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use std::collections::BTreeMap;
use time::Date;

use crate::ids::RecordId;
use crate::model::{Condition, ListingStatus, Record, SellingStatus, Support};
use crate::values::{self, ValueError, ValueResult};

/// Every record field addressable by the single-field update operation,
/// with its wire name. `Margin` is server-derived: mergeable, not editable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKey {
    Artist,
    Title,
    Support,
    Label,
    CatalogNumber,
    Country,
    Year,
    Condition,
    BuyPlace,
    BuyDate,
    NetBuyPrice,
    BuyFees,
    SellingStatus,
    SellPlace,
    SellDate,
    SellPrice,
    SellFees,
    Commission,
    PlatformFees,
    Margin,
    Paid,
    Shipped,
    Received,
    Scanned,
    DiscogsStatus,
    DiscogsPrice,
    EbayStatus,
    EbayPrice,
    Issues,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Money,
    Date,
    Year,
    Status,
    Support,
    Condition,
    Listing,
    Flag,
}

impl FieldKey {
    pub const ALL: [Self; 29] = [
        Self::Artist,
        Self::Title,
        Self::Support,
        Self::Label,
        Self::CatalogNumber,
        Self::Country,
        Self::Year,
        Self::Condition,
        Self::BuyPlace,
        Self::BuyDate,
        Self::NetBuyPrice,
        Self::BuyFees,
        Self::SellingStatus,
        Self::SellPlace,
        Self::SellDate,
        Self::SellPrice,
        Self::SellFees,
        Self::Commission,
        Self::PlatformFees,
        Self::Margin,
        Self::Paid,
        Self::Shipped,
        Self::Received,
        Self::Scanned,
        Self::DiscogsStatus,
        Self::DiscogsPrice,
        Self::EbayStatus,
        Self::EbayPrice,
        Self::Issues,
    ];

    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Title => "title",
            Self::Support => "support",
            Self::Label => "label",
            Self::CatalogNumber => "catalogNumber",
            Self::Country => "country",
            Self::Year => "year",
            Self::Condition => "condition",
            Self::BuyPlace => "buyPlace",
            Self::BuyDate => "buyDate",
            Self::NetBuyPrice => "netBuyPrice",
            Self::BuyFees => "buyFees",
            Self::SellingStatus => "sellingStatus",
            Self::SellPlace => "sellPlace",
            Self::SellDate => "sellDate",
            Self::SellPrice => "sellPrice",
            Self::SellFees => "sellFees",
            Self::Commission => "commission",
            Self::PlatformFees => "platformFees",
            Self::Margin => "margin",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Received => "received",
            Self::Scanned => "scanned",
            Self::DiscogsStatus => "discogsStatus",
            Self::DiscogsPrice => "discogsPrice",
            Self::EbayStatus => "ebayStatus",
            Self::EbayPrice => "ebayPrice",
            Self::Issues => "issues",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.wire_name() == value)
    }

    pub const fn kind(self) -> FieldKind {
        match self {
            Self::Artist
            | Self::Title
            | Self::Label
            | Self::CatalogNumber
            | Self::Country
            | Self::BuyPlace
            | Self::SellPlace
            | Self::Issues => FieldKind::Text,
            Self::NetBuyPrice
            | Self::BuyFees
            | Self::SellPrice
            | Self::SellFees
            | Self::Commission
            | Self::PlatformFees
            | Self::Margin
            | Self::DiscogsPrice
            | Self::EbayPrice => FieldKind::Money,
            Self::BuyDate | Self::SellDate => FieldKind::Date,
            Self::Year => FieldKind::Year,
            Self::SellingStatus => FieldKind::Status,
            Self::Support => FieldKind::Support,
            Self::Condition => FieldKind::Condition,
            Self::DiscogsStatus | Self::EbayStatus => FieldKind::Listing,
            Self::Paid | Self::Shipped | Self::Received | Self::Scanned => FieldKind::Flag,
        }
    }

    pub const fn is_editable(self) -> bool {
        !matches!(self, Self::Margin)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Money(Option<i64>),
    Date(Option<Date>),
    Year(Option<i32>),
    Status(SellingStatus),
    Support(Support),
    Condition(Condition),
    Listing(ListingStatus),
    Flag(bool),
}

impl FieldValue {
    /// Parse an editor draft into the typed value a field expects.
    pub fn parse_for_key(key: FieldKey, raw: &str) -> ValueResult<Self> {
        let trimmed = raw.trim();
        match key.kind() {
            FieldKind::Text => Ok(Self::Text(trimmed.to_owned())),
            FieldKind::Money => values::parse_optional_cents(trimmed).map(Self::Money),
            FieldKind::Date => values::parse_optional_date(trimmed).map(Self::Date),
            FieldKind::Year => values::parse_optional_year(trimmed).map(Self::Year),
            FieldKind::Status => SellingStatus::parse(trimmed)
                .map(Self::Status)
                .ok_or(ValueError::InvalidChoice),
            FieldKind::Support => Support::parse(trimmed)
                .map(Self::Support)
                .ok_or(ValueError::InvalidChoice),
            FieldKind::Condition => Condition::parse(trimmed)
                .map(Self::Condition)
                .ok_or(ValueError::InvalidChoice),
            FieldKind::Listing => ListingStatus::parse(trimmed)
                .map(Self::Listing)
                .ok_or(ValueError::InvalidChoice),
            FieldKind::Flag => match trimmed.to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Ok(Self::Flag(true)),
                "0" | "false" | "off" | "no" => Ok(Self::Flag(false)),
                _ => Err(ValueError::InvalidChoice),
            },
        }
    }

    /// Editor-facing rendering; parse_for_key of this string reproduces the
    /// value.
    pub fn display(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Money(cents) => values::format_plain_optional_cents(*cents),
            Self::Date(date) => values::format_date(*date),
            Self::Year(year) => year.map(|value| value.to_string()).unwrap_or_default(),
            Self::Status(status) => status.as_str().to_owned(),
            Self::Support(support) => support.as_str().to_owned(),
            Self::Condition(condition) => condition.as_str().to_owned(),
            Self::Listing(listing) => listing.as_str().to_owned(),
            Self::Flag(true) => "true".to_owned(),
            Self::Flag(false) => "false".to_owned(),
        }
    }
}

impl Record {
    pub fn field(&self, key: FieldKey) -> FieldValue {
        match key {
            FieldKey::Artist => FieldValue::Text(self.artist.clone()),
            FieldKey::Title => FieldValue::Text(self.title.clone()),
            FieldKey::Support => FieldValue::Support(self.support),
            FieldKey::Label => FieldValue::Text(self.label.clone()),
            FieldKey::CatalogNumber => FieldValue::Text(self.catalog_number.clone()),
            FieldKey::Country => FieldValue::Text(self.country.clone()),
            FieldKey::Year => FieldValue::Year(self.year),
            FieldKey::Condition => FieldValue::Condition(self.condition),
            FieldKey::BuyPlace => FieldValue::Text(self.buy_place.clone()),
            FieldKey::BuyDate => FieldValue::Date(self.buy_date),
            FieldKey::NetBuyPrice => FieldValue::Money(self.net_buy_price_cents),
            FieldKey::BuyFees => FieldValue::Money(self.buy_fees_cents),
            FieldKey::SellingStatus => FieldValue::Status(self.selling_status),
            FieldKey::SellPlace => FieldValue::Text(self.sell_place.clone()),
            FieldKey::SellDate => FieldValue::Date(self.sell_date),
            FieldKey::SellPrice => FieldValue::Money(self.sell_price_cents),
            FieldKey::SellFees => FieldValue::Money(self.sell_fees_cents),
            FieldKey::Commission => FieldValue::Money(self.commission_cents),
            FieldKey::PlatformFees => FieldValue::Money(self.platform_fees_cents),
            FieldKey::Margin => FieldValue::Money(self.margin_cents),
            FieldKey::Paid => FieldValue::Flag(self.paid),
            FieldKey::Shipped => FieldValue::Flag(self.shipped),
            FieldKey::Received => FieldValue::Flag(self.received),
            FieldKey::Scanned => FieldValue::Flag(self.scanned),
            FieldKey::DiscogsStatus => FieldValue::Listing(self.discogs_status),
            FieldKey::DiscogsPrice => FieldValue::Money(self.discogs_price_cents),
            FieldKey::EbayStatus => FieldValue::Listing(self.ebay_status),
            FieldKey::EbayPrice => FieldValue::Money(self.ebay_price_cents),
            FieldKey::Issues => FieldValue::Text(self.issues.clone()),
        }
    }

    pub fn set_field(&mut self, key: FieldKey, value: FieldValue) -> Result<()> {
        match (key, value) {
            (FieldKey::Artist, FieldValue::Text(value)) => self.artist = value,
            (FieldKey::Title, FieldValue::Text(value)) => self.title = value,
            (FieldKey::Support, FieldValue::Support(value)) => self.support = value,
            (FieldKey::Label, FieldValue::Text(value)) => self.label = value,
            (FieldKey::CatalogNumber, FieldValue::Text(value)) => self.catalog_number = value,
            (FieldKey::Country, FieldValue::Text(value)) => self.country = value,
            (FieldKey::Year, FieldValue::Year(value)) => self.year = value,
            (FieldKey::Condition, FieldValue::Condition(value)) => self.condition = value,
            (FieldKey::BuyPlace, FieldValue::Text(value)) => self.buy_place = value,
            (FieldKey::BuyDate, FieldValue::Date(value)) => self.buy_date = value,
            (FieldKey::NetBuyPrice, FieldValue::Money(value)) => self.net_buy_price_cents = value,
            (FieldKey::BuyFees, FieldValue::Money(value)) => self.buy_fees_cents = value,
            (FieldKey::SellingStatus, FieldValue::Status(value)) => self.selling_status = value,
            (FieldKey::SellPlace, FieldValue::Text(value)) => self.sell_place = value,
            (FieldKey::SellDate, FieldValue::Date(value)) => self.sell_date = value,
            (FieldKey::SellPrice, FieldValue::Money(value)) => self.sell_price_cents = value,
            (FieldKey::SellFees, FieldValue::Money(value)) => self.sell_fees_cents = value,
            (FieldKey::Commission, FieldValue::Money(value)) => self.commission_cents = value,
            (FieldKey::PlatformFees, FieldValue::Money(value)) => self.platform_fees_cents = value,
            (FieldKey::Margin, FieldValue::Money(value)) => self.margin_cents = value,
            (FieldKey::Paid, FieldValue::Flag(value)) => self.paid = value,
            (FieldKey::Shipped, FieldValue::Flag(value)) => self.shipped = value,
            (FieldKey::Received, FieldValue::Flag(value)) => self.received = value,
            (FieldKey::Scanned, FieldValue::Flag(value)) => self.scanned = value,
            (FieldKey::DiscogsStatus, FieldValue::Listing(value)) => self.discogs_status = value,
            (FieldKey::DiscogsPrice, FieldValue::Money(value)) => self.discogs_price_cents = value,
            (FieldKey::EbayStatus, FieldValue::Listing(value)) => self.ebay_status = value,
            (FieldKey::EbayPrice, FieldValue::Money(value)) => self.ebay_price_cents = value,
            (FieldKey::Issues, FieldValue::Text(value)) => self.issues = value,
            (key, value) => bail!(
                "field {} cannot hold a {:?} value",
                key.wire_name(),
                value
            ),
        }
        Ok(())
    }
}

/// Fields whose canonical value differs between two copies of a row. Used
/// after a single-field update to pick up server-derived changes alongside
/// the edited field.
pub fn changed_fields(base: &Record, canonical: &Record) -> Vec<(FieldKey, FieldValue)> {
    FieldKey::ALL
        .into_iter()
        .filter_map(|key| {
            let after = canonical.field(key);
            (after != base.field(key)).then_some((key, after))
        })
        .collect()
}

/// Client-only per-record partial state shadowing the last full fetch.
/// Display goes through `merge`; a fresh list fetch discards the overlay.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowOverlay {
    entries: BTreeMap<RecordId, BTreeMap<FieldKey, FieldValue>>,
}

impl RowOverlay {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Fold the canonical changes between `base` (the displayed row) and
    /// `canonical` (the server response) into the overlay.
    pub fn absorb(&mut self, base: &Record, canonical: &Record) {
        let entry = self.entries.entry(base.id).or_default();
        for (key, value) in changed_fields(base, canonical) {
            entry.insert(key, value);
        }
    }

    /// `merge(server_row, overlay) -> display_row`: the row as it should be
    /// rendered, with overlay fields applied on top of the fetched copy.
    pub fn merge(&self, server_row: &Record) -> Record {
        let mut display = server_row.clone();
        if let Some(fields) = self.entries.get(&server_row.id) {
            for (key, value) in fields {
                // set_field only fails on a kind mismatch, which absorb
                // cannot produce.
                let _ = display.set_field(*key, value.clone());
            }
        }
        display
    }

    pub fn drop_row(&mut self, id: RecordId) {
        self.entries.remove(&id);
    }

    /// Rebuild one row's entry from a fresh server copy, replacing whatever
    /// partial state was accumulated. Used by the post-failure
    /// reconciliation path.
    pub fn rebuild_row(&mut self, base: &Record, server: &Record) {
        self.entries.remove(&base.id);
        self.absorb(base, server);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldKey, FieldValue, RowOverlay, changed_fields};
    use crate::model::{SellingStatus, sample_record};
    use crate::values::ValueError;
    use time::{Date, Month};

    #[test]
    fn field_keys_round_trip_through_wire_names() {
        for key in FieldKey::ALL {
            assert_eq!(FieldKey::parse(key.wire_name()), Some(key));
        }
        assert_eq!(FieldKey::parse("margins"), None);
    }

    #[test]
    fn margin_is_the_only_read_only_field() {
        let editable = FieldKey::ALL
            .into_iter()
            .filter(|key| !key.is_editable())
            .collect::<Vec<_>>();
        assert_eq!(editable, vec![FieldKey::Margin]);
    }

    #[test]
    fn parse_for_key_respects_field_kinds() {
        assert_eq!(
            FieldValue::parse_for_key(FieldKey::NetBuyPrice, "10.50"),
            Ok(FieldValue::Money(Some(1_050))),
        );
        assert_eq!(
            FieldValue::parse_for_key(FieldKey::SellDate, ""),
            Ok(FieldValue::Date(None)),
        );
        assert_eq!(
            FieldValue::parse_for_key(FieldKey::SellingStatus, "sold"),
            Ok(FieldValue::Status(SellingStatus::Sold)),
        );
        assert_eq!(
            FieldValue::parse_for_key(FieldKey::Paid, "yes"),
            Ok(FieldValue::Flag(true)),
        );
        assert_eq!(
            FieldValue::parse_for_key(FieldKey::SellingStatus, "gifted"),
            Err(ValueError::InvalidChoice),
        );
    }

    #[test]
    fn display_round_trips_through_parse_for_key() {
        let record = sample_record(1, "Art Blakey", "Moanin'");
        for key in FieldKey::ALL {
            let value = record.field(key);
            assert_eq!(
                FieldValue::parse_for_key(key, &value.display()),
                Ok(value),
                "field {}",
                key.wire_name(),
            );
        }
    }

    #[test]
    fn set_field_rejects_kind_mismatches() {
        let mut record = sample_record(1, "Art Blakey", "Moanin'");
        let error = record
            .set_field(FieldKey::SellDate, FieldValue::Text("soon".to_owned()))
            .expect_err("mismatched kind should fail");
        assert!(error.to_string().contains("sellDate"));
    }

    #[test]
    fn changed_fields_picks_up_derived_changes() {
        let base = sample_record(2, "Hank Mobley", "Soul Station");
        let mut canonical = base.clone();
        canonical.sell_date =
            Some(Date::from_calendar_date(2026, Month::April, 1).expect("valid date"));
        canonical.selling_status = SellingStatus::Sold;
        canonical.margin_cents = Some(4_200);

        let changed = changed_fields(&base, &canonical);
        let keys = changed.iter().map(|(key, _)| *key).collect::<Vec<_>>();
        assert!(keys.contains(&FieldKey::SellDate));
        assert!(keys.contains(&FieldKey::SellingStatus));
        assert!(keys.contains(&FieldKey::Margin));
        assert_eq!(changed.len(), 3);
    }

    #[test]
    fn merge_applies_overlay_fields_on_top_of_the_server_row() {
        let base = sample_record(3, "Lee Morgan", "The Sidewinder");
        let mut canonical = base.clone();
        canonical.selling_status = SellingStatus::ForSale;
        canonical.sell_price_cents = Some(8_000);

        let mut overlay = RowOverlay::default();
        overlay.absorb(&base, &canonical);

        let display = overlay.merge(&base);
        assert_eq!(display.selling_status, SellingStatus::ForSale);
        assert_eq!(display.sell_price_cents, Some(8_000));
        assert_eq!(display.artist, base.artist);
    }

    #[test]
    fn merge_leaves_unknown_rows_untouched() {
        let row = sample_record(9, "Horace Silver", "Song for My Father");
        let overlay = RowOverlay::default();
        assert_eq!(overlay.merge(&row), row);
    }

    #[test]
    fn absorb_accumulates_across_successive_edits() {
        let base = sample_record(4, "Wayne Shorter", "Speak No Evil");
        let mut overlay = RowOverlay::default();

        let mut first = base.clone();
        first.sell_price_cents = Some(6_000);
        overlay.absorb(&base, &first);

        let mut second = first.clone();
        second.sell_place = "discogs".to_owned();
        overlay.absorb(&first, &second);

        let display = overlay.merge(&base);
        assert_eq!(display.sell_price_cents, Some(6_000));
        assert_eq!(display.sell_place, "discogs");
    }

    #[test]
    fn rebuild_row_replaces_partial_state_with_the_server_copy() {
        let base = sample_record(5, "Joe Henderson", "Page One");
        let mut overlay = RowOverlay::default();

        let mut optimistic = base.clone();
        optimistic.sell_price_cents = Some(9_999);
        overlay.absorb(&base, &optimistic);

        // Server says only the place changed; the price edit never landed.
        let mut server = base.clone();
        server.sell_place = "ebay".to_owned();
        overlay.rebuild_row(&base, &server);

        let display = overlay.merge(&base);
        assert_eq!(display.sell_price_cents, base.sell_price_cents);
        assert_eq!(display.sell_place, "ebay");
    }

    #[test]
    fn clear_discards_everything_on_refetch() {
        let base = sample_record(6, "Dexter Gordon", "Go");
        let mut changed = base.clone();
        changed.paid = true;

        let mut overlay = RowOverlay::default();
        overlay.absorb(&base, &changed);
        assert!(!overlay.is_empty());

        overlay.clear();
        assert!(overlay.is_empty());
        assert_eq!(overlay.merge(&base), base);
    }
}
