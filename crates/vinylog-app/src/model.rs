// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::ids::*;
use crate::pagination::PageEnvelope;

/// Serde adapter for wire dates (`YYYY-MM-DD`).
pub mod iso_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;
    use time::macros::format_description;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let rendered = date
            .format(&format_description!("[year]-[month]-[day]"))
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&rendered)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Date::parse(&raw, &format_description!("[year]-[month]-[day]"))
            .map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use time::Date;
        use time::macros::format_description;

        pub fn serialize<S: Serializer>(
            date: &Option<Date>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Date>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            match raw {
                None => Ok(None),
                Some(raw) if raw.is_empty() => Ok(None),
                Some(raw) => Date::parse(&raw, &format_description!("[year]-[month]-[day]"))
                    .map(Some)
                    .map_err(serde::de::Error::custom),
            }
        }
    }
}

/// Serde adapter for wire timestamps (RFC 3339).
pub mod rfc3339 {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;

    pub fn serialize<S: Serializer>(
        value: &OffsetDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let rendered = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&rendered)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<OffsetDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&raw, &Rfc3339).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellingStatus {
    NotForSale,
    ForSale,
    Sold,
}

impl SellingStatus {
    pub const ALL: [Self; 3] = [Self::NotForSale, Self::ForSale, Self::Sold];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotForSale => "not_for_sale",
            Self::ForSale => "for_sale",
            Self::Sold => "sold",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "not_for_sale" => Some(Self::NotForSale),
            "for_sale" => Some(Self::ForSale),
            "sold" => Some(Self::Sold),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NotForSale => "keep",
            Self::ForSale => "for sale",
            Self::Sold => "sold",
        }
    }

    pub const fn is_sold(self) -> bool {
        matches!(self, Self::Sold)
    }

    /// Statuses for which sale fields must stay empty.
    pub const fn forbids_sale_fields(self) -> bool {
        matches!(self, Self::NotForSale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Support {
    Lp,
    DoubleLp,
    Ep,
    Maxi,
    Single,
    Box,
}

impl Support {
    pub const ALL: [Self; 6] = [
        Self::Lp,
        Self::DoubleLp,
        Self::Ep,
        Self::Maxi,
        Self::Single,
        Self::Box,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lp => "lp",
            Self::DoubleLp => "double_lp",
            Self::Ep => "ep",
            Self::Maxi => "maxi",
            Self::Single => "single",
            Self::Box => "box",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "lp" => Some(Self::Lp),
            "double_lp" => Some(Self::DoubleLp),
            "ep" => Some(Self::Ep),
            "maxi" => Some(Self::Maxi),
            "single" => Some(Self::Single),
            "box" => Some(Self::Box),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Lp => "LP",
            Self::DoubleLp => "2LP",
            Self::Ep => "EP",
            Self::Maxi => "12\" maxi",
            Self::Single => "7\" single",
            Self::Box => "box set",
        }
    }
}

/// Goldmine-style grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Mint,
    NearMint,
    VgPlus,
    Vg,
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub const ALL: [Self; 7] = [
        Self::Mint,
        Self::NearMint,
        Self::VgPlus,
        Self::Vg,
        Self::Good,
        Self::Fair,
        Self::Poor,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mint => "mint",
            Self::NearMint => "near_mint",
            Self::VgPlus => "vg_plus",
            Self::Vg => "vg",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "mint" => Some(Self::Mint),
            "near_mint" => Some(Self::NearMint),
            "vg_plus" => Some(Self::VgPlus),
            "vg" => Some(Self::Vg),
            "good" => Some(Self::Good),
            "fair" => Some(Self::Fair),
            "poor" => Some(Self::Poor),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Mint => "M",
            Self::NearMint => "NM",
            Self::VgPlus => "VG+",
            Self::Vg => "VG",
            Self::Good => "G",
            Self::Fair => "F",
            Self::Poor => "P",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    NotListed,
    Drafted,
    Listed,
    Ended,
}

impl ListingStatus {
    pub const ALL: [Self; 4] = [Self::NotListed, Self::Drafted, Self::Listed, Self::Ended];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotListed => "not_listed",
            Self::Drafted => "drafted",
            Self::Listed => "listed",
            Self::Ended => "ended",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "not_listed" => Some(Self::NotListed),
            "drafted" => Some(Self::Drafted),
            "listed" => Some(Self::Listed),
            "ended" => Some(Self::Ended),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NotListed => "-",
            Self::Drafted => "draft",
            Self::Listed => "listed",
            Self::Ended => "ended",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Discogs,
    Ebay,
}

impl Platform {
    pub const ALL: [Self; 2] = [Self::Discogs, Self::Ebay];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Discogs => "discogs",
            Self::Ebay => "ebay",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    Artist,
    Title,
    BuyDate,
    SellDate,
    NetBuyPrice,
    SellPrice,
    Year,
    UpdatedAt,
}

impl SortKey {
    pub const ALL: [Self; 8] = [
        Self::Artist,
        Self::Title,
        Self::BuyDate,
        Self::SellDate,
        Self::NetBuyPrice,
        Self::SellPrice,
        Self::Year,
        Self::UpdatedAt,
    ];

    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Title => "title",
            Self::BuyDate => "buyDate",
            Self::SellDate => "sellDate",
            Self::NetBuyPrice => "netBuyPrice",
            Self::SellPrice => "sellPrice",
            Self::Year => "year",
            Self::UpdatedAt => "updatedAt",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.wire_name() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            key: SortKey::UpdatedAt,
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabKind {
    Inventory,
    Stats,
}

impl TabKind {
    pub const ALL: [Self; 2] = [Self::Inventory, Self::Stats];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::Stats => "stats",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormKind {
    Record,
    Filters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    Edit,
    Form(FormKind),
}

/// One inventory record as the service returns it. `margin` and the
/// timestamps are server-owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,
    pub artist: String,
    pub title: String,
    pub support: Support,
    pub label: String,
    pub catalog_number: String,
    pub country: String,
    pub year: Option<i32>,
    pub condition: Condition,
    pub buy_place: String,
    #[serde(default, with = "iso_date::option")]
    pub buy_date: Option<Date>,
    #[serde(rename = "netBuyPrice")]
    pub net_buy_price_cents: Option<i64>,
    #[serde(rename = "buyFees")]
    pub buy_fees_cents: Option<i64>,
    pub selling_status: SellingStatus,
    pub sell_place: String,
    #[serde(default, with = "iso_date::option")]
    pub sell_date: Option<Date>,
    #[serde(rename = "sellPrice")]
    pub sell_price_cents: Option<i64>,
    #[serde(rename = "sellFees")]
    pub sell_fees_cents: Option<i64>,
    #[serde(rename = "commission")]
    pub commission_cents: Option<i64>,
    #[serde(rename = "platformFees")]
    pub platform_fees_cents: Option<i64>,
    #[serde(rename = "margin")]
    pub margin_cents: Option<i64>,
    pub paid: bool,
    pub shipped: bool,
    pub received: bool,
    pub scanned: bool,
    pub discogs_status: ListingStatus,
    #[serde(rename = "discogsPrice")]
    pub discogs_price_cents: Option<i64>,
    pub ebay_status: ListingStatus,
    #[serde(rename = "ebayPrice")]
    pub ebay_price_cents: Option<i64>,
    pub issues: String,
    #[serde(with = "rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Creation/full-update payload. The server assigns id, margin, and
/// timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDraft {
    pub artist: String,
    pub title: String,
    pub support: Support,
    pub label: String,
    pub catalog_number: String,
    pub country: String,
    pub year: Option<i32>,
    pub condition: Condition,
    pub buy_place: String,
    #[serde(default, with = "iso_date::option")]
    pub buy_date: Option<Date>,
    #[serde(rename = "netBuyPrice")]
    pub net_buy_price_cents: Option<i64>,
    #[serde(rename = "buyFees")]
    pub buy_fees_cents: Option<i64>,
    pub selling_status: SellingStatus,
    pub sell_place: String,
    #[serde(default, with = "iso_date::option")]
    pub sell_date: Option<Date>,
    #[serde(rename = "sellPrice")]
    pub sell_price_cents: Option<i64>,
    #[serde(rename = "sellFees")]
    pub sell_fees_cents: Option<i64>,
    #[serde(rename = "commission")]
    pub commission_cents: Option<i64>,
    #[serde(rename = "platformFees")]
    pub platform_fees_cents: Option<i64>,
    pub issues: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTotals {
    #[serde(rename = "buyTotal")]
    pub buy_total_cents: i64,
    #[serde(rename = "sellTotal")]
    pub sell_total_cents: i64,
    #[serde(rename = "marginTotal")]
    pub margin_total_cents: i64,
}

/// One page of the list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPage {
    pub content: Vec<Record>,
    pub pagination: PageEnvelope,
    pub totals: ListTotals,
}

/// What the view renders: a fetched page, possibly `stale` when the last
/// refetch failed and cached data is being kept on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub rows: Vec<Record>,
    pub envelope: PageEnvelope,
    pub totals: ListTotals,
    pub stale: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyStat {
    /// `YYYY-MM`.
    pub month: String,
    #[serde(rename = "purchases")]
    pub purchases_cents: i64,
    #[serde(rename = "sales")]
    pub sales_cents: i64,
    #[serde(rename = "margin")]
    pub margin_cents: i64,
    pub bought: usize,
    pub sold: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsTotals {
    #[serde(rename = "purchases")]
    pub purchases_cents: i64,
    #[serde(rename = "sales")]
    pub sales_cents: i64,
    #[serde(rename = "margin")]
    pub margin_cents: i64,
    pub bought: usize,
    pub sold: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatsReport {
    pub months: Vec<MonthlyStat>,
    pub totals: StatsTotals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub from: Option<Date>,
    pub to: Option<Date>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub value: SellingStatus,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterBounds {
    #[serde(rename = "priceMin")]
    pub price_min_cents: Option<i64>,
    #[serde(rename = "priceMax")]
    pub price_max_cents: Option<i64>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
}

/// Auxiliary lookups assembled from the lookup endpoints; used to seed
/// suggestions in the filter and record forms.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Lookups {
    pub artists: Vec<String>,
    pub buy_places: Vec<String>,
    pub sell_places: Vec<String>,
    pub statuses: Vec<StatusEntry>,
    pub bounds: FilterBounds,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
}

/// A pre-fill suggestion from the external record catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSuggestion {
    pub title: String,
    pub year: Option<i32>,
    pub label: String,
    pub catalog_number: String,
    pub country: String,
}

/// Test fixture shared by the in-crate test modules.
#[cfg(test)]
pub fn sample_record(id: i64, artist: &str, title: &str) -> Record {
    use time::{Date, Month};

    Record {
        id: RecordId::new(id),
        artist: artist.to_owned(),
        title: title.to_owned(),
        support: Support::Lp,
        label: "Blue Note".to_owned(),
        catalog_number: "BLP 1577".to_owned(),
        country: "US".to_owned(),
        year: Some(1958),
        condition: Condition::VgPlus,
        buy_place: "record fair".to_owned(),
        buy_date: Some(Date::from_calendar_date(2025, Month::March, 2).expect("valid date")),
        net_buy_price_cents: Some(2_500),
        buy_fees_cents: Some(150),
        selling_status: SellingStatus::NotForSale,
        sell_place: String::new(),
        sell_date: None,
        sell_price_cents: None,
        sell_fees_cents: None,
        commission_cents: None,
        platform_fees_cents: None,
        margin_cents: None,
        paid: false,
        shipped: false,
        received: true,
        scanned: false,
        discogs_status: ListingStatus::NotListed,
        discogs_price_cents: None,
        ebay_status: ListingStatus::NotListed,
        ebay_price_cents: None,
        issues: String::new(),
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}
