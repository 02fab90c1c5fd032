// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use time::macros::format_description;
use time::{Date, Duration, Month, OffsetDateTime, Time};
use tiny_http::{Header, Method, Request, Response, Server};
use url::Url;
use vinylog_app::{
    Condition, FieldKey, FieldKind, FieldValue, FilterSet, ListingStatus, Record, RecordId,
    SellingStatus, SortDirection, SortKey, StatusEntry, Support, values,
};

pub const SESSION_COOKIE: &str = "vinylog_session";
pub const DEMO_SEED: u64 = 42;

const ARTISTS: [&str; 16] = [
    "Miles Davis",
    "John Coltrane",
    "Nina Simone",
    "Fela Kuti",
    "Alice Coltrane",
    "Can",
    "Serge Gainsbourg",
    "Stereolab",
    "Sun Ra",
    "Os Mutantes",
    "Françoise Hardy",
    "Herbie Hancock",
    "The Meters",
    "Ethiopians",
    "Mulatu Astatke",
    "Pharoah Sanders",
];

const TITLES: [&str; 18] = [
    "Blue Haze",
    "Night Passage",
    "Cold Sweat",
    "Paris Skyline",
    "Electric Bath",
    "Harvest Moon Dance",
    "Saturn Return",
    "Tape Echo",
    "Motorik Dreams",
    "Lagos Stopover",
    "Velvet Morning",
    "Modal Departures",
    "Riverside Session",
    "Analog Heart",
    "Stolen Moments",
    "Desert Shore",
    "Midnight Pressing",
    "Second Hand Sunrise",
];

const LABELS: [&str; 12] = [
    "Blue Note",
    "Impulse!",
    "Prestige",
    "Philips",
    "Barclay",
    "Atlantic",
    "Strata-East",
    "Vertigo",
    "Harvest",
    "CTI",
    "Riverside",
    "Polydor",
];

const COUNTRIES: [&str; 8] = ["US", "FR", "UK", "DE", "JP", "NL", "BR", "NG"];

const BUY_PLACES: [&str; 10] = [
    "record fair",
    "flea market",
    "estate sale",
    "Superfly Records",
    "Gibert Joseph",
    "discogs",
    "ebay",
    "garage sale",
    "Crocodisc",
    "charity shop",
];

const SELL_PLACES: [&str; 6] = [
    "discogs",
    "ebay",
    "record fair",
    "local shop",
    "private sale",
    "cdandlp",
];

const ISSUE_NOTES: [&str; 6] = [
    "light scuffs on side B",
    "corner ding, seam split repaired",
    "writing on back cover",
    "generic inner sleeve",
    "small sticker on label",
    "faint warp, plays fine",
];

const REFERENCE_YEAR: i32 = 2026;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Deterministic generator of plausible inventory records.
#[derive(Debug, Clone)]
pub struct RecordFaker {
    rng: DeterministicRng,
    next_id: i64,
}

impl RecordFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            next_id: 1,
        }
    }

    pub fn record(&mut self) -> Record {
        let id = self.next_id;
        self.next_id += 1;

        let artist = self.pick(&ARTISTS).to_owned();
        let title = self.pick(&TITLES).to_owned();
        let label = self.pick(&LABELS).to_owned();
        let year = 1958 + self.rng.int_n(40) as i32;
        let buy_date = self.date_between(
            date_at(REFERENCE_YEAR - 3, Month::January, 1),
            date_at(REFERENCE_YEAR, Month::June, 30),
        );
        let net_buy_price = 500 + self.int_range_i64(0, 14_500);
        let buy_fees = if self.rng.bool() {
            Some(self.int_range_i64(0, 900))
        } else {
            None
        };

        let mut record = Record {
            id: RecordId::new(id),
            artist,
            title,
            support: Support::ALL[self.rng.int_n(Support::ALL.len())],
            label: label.clone(),
            catalog_number: format!(
                "{}-{:04}",
                label
                    .chars()
                    .filter(char::is_ascii_alphabetic)
                    .take(3)
                    .collect::<String>()
                    .to_uppercase(),
                1000 + self.rng.int_n(9000),
            ),
            country: self.pick(&COUNTRIES).to_owned(),
            year: Some(year),
            condition: Condition::ALL[self.rng.int_n(Condition::ALL.len())],
            buy_place: self.pick(&BUY_PLACES).to_owned(),
            buy_date: Some(buy_date),
            net_buy_price_cents: Some(net_buy_price),
            buy_fees_cents: buy_fees,
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
            scanned: self.rng.bool(),
            discogs_status: ListingStatus::NotListed,
            discogs_price_cents: None,
            ebay_status: ListingStatus::NotListed,
            ebay_price_cents: None,
            issues: if self.rng.int_n(4) == 0 {
                self.pick(&ISSUE_NOTES).to_owned()
            } else {
                String::new()
            },
            created_at: midnight_utc(buy_date),
            updated_at: midnight_utc(buy_date),
        };

        match self.rng.int_n(4) {
            // half the collection stays put
            0 | 1 => {}
            2 => {
                record.selling_status = SellingStatus::ForSale;
                record.sell_place = self.pick(&SELL_PLACES).to_owned();
                let asking = net_buy_price + self.int_range_i64(500, 12_000);
                record.discogs_status = ListingStatus::Listed;
                record.discogs_price_cents = Some(asking);
                if self.rng.bool() {
                    record.ebay_status = ListingStatus::Drafted;
                    record.ebay_price_cents = Some(asking + 500);
                }
            }
            _ => {
                record.selling_status = SellingStatus::Sold;
                record.sell_place = self.pick(&SELL_PLACES).to_owned();
                record.sell_date = Some(self.date_between(
                    buy_date,
                    date_at(REFERENCE_YEAR, Month::July, 31),
                ));
                record.sell_price_cents = Some(net_buy_price + self.int_range_i64(200, 20_000));
                record.sell_fees_cents = Some(self.int_range_i64(0, 800));
                record.commission_cents = Some(self.int_range_i64(0, 1_200));
                record.platform_fees_cents = Some(self.int_range_i64(0, 600));
                record.paid = true;
                record.shipped = self.rng.bool();
            }
        }

        finalize_record(&mut record);
        record
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range_i64(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = (max - min) as u64;
        min + (self.rng.next_u64() % (span + 1)) as i64
    }

    fn date_between(&mut self, start: Date, end: Date) -> Date {
        if end <= start {
            return start;
        }
        let span = (end - start).whole_days() as u64;
        start + Duration::days((self.rng.next_u64() % (span + 1)) as i64)
    }
}

pub fn demo_records(count: usize) -> Vec<Record> {
    let mut faker = RecordFaker::new(DEMO_SEED);
    (0..count).map(|_| faker.record()).collect()
}

/// Fixed fixture for assertions that depend on exact values.
pub fn sample_record(id: i64, artist: &str, title: &str) -> Record {
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
        buy_date: Some(date_at(2025, Month::March, 2)),
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
        created_at: midnight_utc(date_at(2025, Month::March, 2)),
        updated_at: midnight_utc(date_at(2025, Month::March, 2)),
    }
}

/// The business rules the real service owns: a sale date on a for-sale
/// record flips it to sold, and margin exists only for sold records.
pub fn finalize_record(record: &mut Record) {
    if record.sell_date.is_some() && record.selling_status == SellingStatus::ForSale {
        record.selling_status = SellingStatus::Sold;
    }

    record.margin_cents = if record.selling_status.is_sold() {
        record.sell_price_cents.map(|sell| {
            sell - record.net_buy_price_cents.unwrap_or(0)
                - record.buy_fees_cents.unwrap_or(0)
                - record.sell_fees_cents.unwrap_or(0)
                - record.commission_cents.unwrap_or(0)
                - record.platform_fees_cents.unwrap_or(0)
        })
    } else {
        None
    };
}

/// Server-side counterpart of the client's pre-submission check.
pub fn validate_record(record: &Record) -> Option<String> {
    if let (Some(buy_date), Some(sell_date)) = (record.buy_date, record.sell_date)
        && sell_date < buy_date
    {
        return Some("selling date precedes purchase date".to_owned());
    }
    if record.artist.trim().is_empty() || record.title.trim().is_empty() {
        return Some("artist and title are required".to_owned());
    }
    None
}

pub fn record_matches(record: &Record, filters: &FilterSet) -> bool {
    if !text_matches(&record.artist, &filters.artist, filters.match_exact_artist) {
        return false;
    }
    if !text_matches(&record.title, &filters.title, filters.match_exact_title) {
        return false;
    }
    if !text_matches(&record.buy_place, &filters.buy_place, false) {
        return false;
    }
    if !text_matches(&record.sell_place, &filters.sell_place, false) {
        return false;
    }
    if let Some(support) = filters.support
        && record.support != support
    {
        return false;
    }
    if !filters.statuses.is_empty() && !filters.statuses.contains(&record.selling_status) {
        return false;
    }
    if !date_in_range(record.buy_date, filters.buy_date_min, filters.buy_date_max) {
        return false;
    }
    if !date_in_range(record.sell_date, filters.sell_date_min, filters.sell_date_max) {
        return false;
    }
    if !cents_in_range(
        record.net_buy_price_cents,
        filters.buy_price_min_cents,
        filters.buy_price_max_cents,
    ) {
        return false;
    }
    if !cents_in_range(
        record.sell_price_cents,
        filters.sell_price_min_cents,
        filters.sell_price_max_cents,
    ) {
        return false;
    }
    if let Some(min) = filters.year_min
        && record.year.is_none_or(|year| year < min)
    {
        return false;
    }
    if let Some(max) = filters.year_max
        && record.year.is_none_or(|year| year > max)
    {
        return false;
    }
    true
}

fn text_matches(value: &str, needle: &str, exact: bool) -> bool {
    if needle.is_empty() {
        return true;
    }
    let value = value.to_lowercase();
    let needle = needle.to_lowercase();
    if exact {
        value == needle
    } else {
        value.contains(&needle)
    }
}

fn date_in_range(value: Option<Date>, min: Option<Date>, max: Option<Date>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    let Some(value) = value else {
        return false;
    };
    if let Some(min) = min
        && value < min
    {
        return false;
    }
    if let Some(max) = max
        && value > max
    {
        return false;
    }
    true
}

fn cents_in_range(value: Option<i64>, min: Option<i64>, max: Option<i64>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    let Some(value) = value else {
        return false;
    };
    if let Some(min) = min
        && value < min
    {
        return false;
    }
    if let Some(max) = max
        && value > max
    {
        return false;
    }
    true
}

pub fn sort_records(records: &mut [Record], key: SortKey, direction: SortDirection) {
    records.sort_by(|left, right| {
        let ordering = match key {
            SortKey::Artist => left
                .artist
                .to_lowercase()
                .cmp(&right.artist.to_lowercase()),
            SortKey::Title => left.title.to_lowercase().cmp(&right.title.to_lowercase()),
            SortKey::BuyDate => left.buy_date.cmp(&right.buy_date),
            SortKey::SellDate => left.sell_date.cmp(&right.sell_date),
            SortKey::NetBuyPrice => left.net_buy_price_cents.cmp(&right.net_buy_price_cents),
            SortKey::SellPrice => left.sell_price_cents.cmp(&right.sell_price_cents),
            SortKey::Year => left.year.cmp(&right.year),
            SortKey::UpdatedAt => left.updated_at.cmp(&right.updated_at),
        };
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

pub fn month_key(date: Date) -> String {
    date.format(&format_description!("[year]-[month]"))
        .expect("month format is valid")
}

fn date_at(year: i32, month: Month, day: u8) -> Date {
    Date::from_calendar_date(year, month, day).expect("valid calendar date")
}

fn midnight_utc(date: Date) -> OffsetDateTime {
    OffsetDateTime::new_utc(date, Time::MIDNIGHT)
}

#[derive(Debug)]
struct ServerState {
    records: Vec<Record>,
    next_id: i64,
    accepted_cookie: Option<String>,
}

impl ServerState {
    fn new(records: Vec<Record>, accepted_cookie: Option<String>) -> Self {
        let next_id = records
            .iter()
            .map(|record| record.id.get())
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            records,
            next_id,
            accepted_cookie,
        }
    }

    fn find(&self, id: i64) -> Option<&Record> {
        self.records.iter().find(|record| record.id.get() == id)
    }

    fn find_mut(&mut self, id: i64) -> Option<&mut Record> {
        self.records.iter_mut().find(|record| record.id.get() == id)
    }

    fn list(&self, url: &Url) -> serde_json::Value {
        let filters = FilterSet::from_query_pairs(url.query_pairs());
        let mut page = 0usize;
        let mut size = vinylog_app::DEFAULT_PAGE_SIZE;
        let mut sort_key = SortKey::UpdatedAt;
        let mut sort_dir = SortDirection::Desc;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "page" => page = value.parse().unwrap_or(0),
                "size" => size = value.parse().unwrap_or(size).max(1),
                "sortBy" => sort_key = SortKey::parse(&value).unwrap_or(sort_key),
                "sortDir" => sort_dir = SortDirection::parse(&value).unwrap_or(sort_dir),
                _ => {}
            }
        }

        let mut matched = self
            .records
            .iter()
            .filter(|record| record_matches(record, &filters))
            .cloned()
            .collect::<Vec<_>>();
        sort_records(&mut matched, sort_key, sort_dir);

        let total_elements = matched.len();
        let total_pages = total_elements.div_ceil(size);
        let start = (page * size).min(total_elements);
        let end = (start + size).min(total_elements);
        let window = &matched[start..end];

        let buy_total: i64 = matched
            .iter()
            .map(|record| {
                record.net_buy_price_cents.unwrap_or(0) + record.buy_fees_cents.unwrap_or(0)
            })
            .sum();
        let sell_total: i64 = matched
            .iter()
            .filter(|record| record.selling_status.is_sold())
            .map(|record| record.sell_price_cents.unwrap_or(0))
            .sum();
        let margin_total: i64 = matched
            .iter()
            .filter_map(|record| record.margin_cents)
            .sum();

        serde_json::json!({
            "content": window,
            "pagination": {
                "page": page,
                "size": size,
                "totalPages": total_pages,
                "totalElements": total_elements,
                "first": page == 0,
                "last": page + 1 >= total_pages.max(1),
            },
            "totals": {
                "buyTotal": buy_total,
                "sellTotal": sell_total,
                "marginTotal": margin_total,
            },
        })
    }

    fn patch(&mut self, id: i64, body: &serde_json::Value) -> Result<Record, (u16, String)> {
        let Some(fields) = body.as_object() else {
            return Err((400, "patch body must be a JSON object".to_owned()));
        };

        let Some(record) = self.find_mut(id) else {
            return Err((404, format!("record {id} not found")));
        };

        let mut patched = record.clone();
        for (name, value) in fields {
            let Some(key) = FieldKey::parse(name) else {
                return Err((400, format!("unknown field {name}")));
            };
            if !key.is_editable() {
                return Err((422, format!("field {name} is read-only")));
            }
            let typed = json_to_field_value(key, value).map_err(|error| (400, error))?;
            patched
                .set_field(key, typed)
                .map_err(|error| (400, error.to_string()))?;
        }

        if let Some(message) = validate_record(&patched) {
            return Err((422, message));
        }

        finalize_record(&mut patched);
        patched.updated_at += Duration::seconds(1);
        *record = patched.clone();
        Ok(patched)
    }

    fn stats(&self, from: Option<Date>, to: Option<Date>) -> serde_json::Value {
        let in_range = |date: Date| {
            from.is_none_or(|from| date >= from) && to.is_none_or(|to| date <= to)
        };

        let mut months: Vec<(String, [i64; 3], [usize; 2])> = Vec::new();

        for record in &self.records {
            if let Some(buy_date) = record.buy_date
                && in_range(buy_date)
            {
                let index = month_bucket(&mut months, month_key(buy_date));
                months[index].1[0] += record.net_buy_price_cents.unwrap_or(0)
                    + record.buy_fees_cents.unwrap_or(0);
                months[index].2[0] += 1;
            }
            if record.selling_status.is_sold()
                && let Some(sell_date) = record.sell_date
                && in_range(sell_date)
            {
                let index = month_bucket(&mut months, month_key(sell_date));
                months[index].1[1] += record.sell_price_cents.unwrap_or(0);
                months[index].1[2] += record.margin_cents.unwrap_or(0);
                months[index].2[1] += 1;
            }
        }

        months.sort_by(|left, right| left.0.cmp(&right.0));

        let totals = months.iter().fold(([0i64; 3], [0usize; 2]), |mut acc, entry| {
            for (slot, value) in acc.0.iter_mut().zip(entry.1) {
                *slot += value;
            }
            for (slot, value) in acc.1.iter_mut().zip(entry.2) {
                *slot += value;
            }
            acc
        });

        serde_json::json!({
            "months": months
                .iter()
                .map(|(month, money, counts)| serde_json::json!({
                    "month": month,
                    "purchases": money[0],
                    "sales": money[1],
                    "margin": money[2],
                    "bought": counts[0],
                    "sold": counts[1],
                }))
                .collect::<Vec<_>>(),
            "totals": {
                "purchases": totals.0[0],
                "sales": totals.0[1],
                "margin": totals.0[2],
                "bought": totals.1[0],
                "sold": totals.1[1],
            },
        })
    }

    fn artists(&self) -> Vec<String> {
        let mut artists = self
            .records
            .iter()
            .map(|record| record.artist.clone())
            .collect::<Vec<_>>();
        artists.sort();
        artists.dedup();
        artists
    }

    fn places(&self, kind: &str) -> Vec<String> {
        let mut places = self
            .records
            .iter()
            .map(|record| {
                if kind == "sell" {
                    record.sell_place.clone()
                } else {
                    record.buy_place.clone()
                }
            })
            .filter(|place| !place.is_empty())
            .collect::<Vec<_>>();
        places.sort();
        places.dedup();
        places
    }

    fn bounds(&self) -> serde_json::Value {
        let prices = self
            .records
            .iter()
            .filter_map(|record| record.net_buy_price_cents)
            .collect::<Vec<_>>();
        let years = self
            .records
            .iter()
            .filter_map(|record| record.year)
            .collect::<Vec<_>>();
        serde_json::json!({
            "priceMin": prices.iter().min(),
            "priceMax": prices.iter().max(),
            "yearMin": years.iter().min(),
            "yearMax": years.iter().max(),
        })
    }
}

fn month_bucket(months: &mut Vec<(String, [i64; 3], [usize; 2])>, key: String) -> usize {
    if let Some(index) = months.iter().position(|(month, _, _)| *month == key) {
        index
    } else {
        months.push((key, [0; 3], [0; 2]));
        months.len() - 1
    }
}

fn json_to_field_value(key: FieldKey, value: &serde_json::Value) -> Result<FieldValue, String> {
    let type_error = || format!("field {} got an incompatible value", key.wire_name());
    match key.kind() {
        FieldKind::Text => value
            .as_str()
            .map(|text| FieldValue::Text(text.to_owned()))
            .ok_or_else(type_error),
        FieldKind::Money => match value {
            serde_json::Value::Null => Ok(FieldValue::Money(None)),
            serde_json::Value::Number(number) => number
                .as_i64()
                .map(|cents| FieldValue::Money(Some(cents)))
                .ok_or_else(type_error),
            _ => Err(type_error()),
        },
        FieldKind::Date => match value {
            serde_json::Value::Null => Ok(FieldValue::Date(None)),
            serde_json::Value::String(raw) => values::parse_optional_date(raw)
                .map(FieldValue::Date)
                .map_err(|error| error.to_string()),
            _ => Err(type_error()),
        },
        FieldKind::Year => match value {
            serde_json::Value::Null => Ok(FieldValue::Year(None)),
            serde_json::Value::Number(number) => number
                .as_i64()
                .map(|year| FieldValue::Year(Some(year as i32)))
                .ok_or_else(type_error),
            _ => Err(type_error()),
        },
        FieldKind::Status => value
            .as_str()
            .and_then(SellingStatus::parse)
            .map(FieldValue::Status)
            .ok_or_else(type_error),
        FieldKind::Support => value
            .as_str()
            .and_then(Support::parse)
            .map(FieldValue::Support)
            .ok_or_else(type_error),
        FieldKind::Condition => value
            .as_str()
            .and_then(Condition::parse)
            .map(FieldValue::Condition)
            .ok_or_else(type_error),
        FieldKind::Listing => value
            .as_str()
            .and_then(ListingStatus::parse)
            .map(FieldValue::Listing)
            .ok_or_else(type_error),
        FieldKind::Flag => value.as_bool().map(FieldValue::Flag).ok_or_else(type_error),
    }
}

/// In-process mock of the inventory service, serving the endpoints the
/// client consumes over an in-memory record set. Used by integration tests
/// and by `--demo`.
pub struct MockInventoryServer {
    base_url: String,
    server: Arc<Server>,
    state: Arc<Mutex<ServerState>>,
    handle: Option<JoinHandle<()>>,
}

impl MockInventoryServer {
    pub fn start(records: Vec<Record>) -> Result<Self> {
        Self::launch(records, None)
    }

    /// Require the given opaque cookie on `/session/me`; `POST /session`
    /// hands it out.
    pub fn start_with_session(records: Vec<Record>, cookie: &str) -> Result<Self> {
        Self::launch(records, Some(cookie.to_owned()))
    }

    fn launch(records: Vec<Record>, cookie: Option<String>) -> Result<Self> {
        let server = Arc::new(
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?,
        );
        let base_url = format!("http://{}", server.server_addr());
        let state = Arc::new(Mutex::new(ServerState::new(records, cookie)));

        let serve_loop = Arc::clone(&server);
        let serve_state = Arc::clone(&state);
        let handle = std::thread::spawn(move || {
            for request in serve_loop.incoming_requests() {
                handle_request(&serve_state, request);
            }
        });

        Ok(Self {
            base_url,
            server,
            state,
            handle: Some(handle),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Snapshot of the in-memory records, for assertions.
    pub fn records(&self) -> Vec<Record> {
        self.state.lock().map(|state| state.records.clone()).unwrap_or_default()
    }
}

impl Drop for MockInventoryServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn handle_request(state: &Arc<Mutex<ServerState>>, mut request: Request) {
    let Ok(mut state) = state.lock() else {
        respond_error(request, 500, "server state poisoned");
        return;
    };

    let Ok(url) = Url::parse(&format!("http://mock{}", request.url())) else {
        respond_error(request, 400, "bad request URL");
        return;
    };
    let path = url.path().to_owned();
    let segments = path
        .trim_matches('/')
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .collect::<Vec<_>>();
    let method = request.method().clone();

    let mut body = String::new();
    let _ = std::io::Read::read_to_string(request.as_reader(), &mut body);

    match (method, segments.as_slice()) {
        (Method::Get, [records]) if records == "records" => {
            respond_json(request, 200, &state.list(&url));
        }
        (Method::Post, [records]) if records == "records" => {
            match parse_record_body(&body, state.next_id) {
                Ok(mut record) => {
                    if let Some(message) = validate_record(&record) {
                        respond_error(request, 422, &message);
                        return;
                    }
                    finalize_record(&mut record);
                    state.next_id += 1;
                    state.records.push(record.clone());
                    respond_record(request, 201, &record);
                }
                Err(message) => respond_error(request, 400, &message),
            }
        }
        (Method::Get, [records, id]) if records == "records" => {
            match id.parse::<i64>().ok().and_then(|id| state.find(id).cloned()) {
                Some(record) => respond_record(request, 200, &record),
                None => respond_error(request, 404, "record not found"),
            }
        }
        (Method::Put, [records, id]) if records == "records" => {
            let Ok(id) = id.parse::<i64>() else {
                respond_error(request, 400, "bad record id");
                return;
            };
            match parse_record_body(&body, id) {
                Ok(mut record) => {
                    if state.find(id).is_none() {
                        respond_error(request, 404, "record not found");
                        return;
                    }
                    if let Some(message) = validate_record(&record) {
                        respond_error(request, 422, &message);
                        return;
                    }
                    finalize_record(&mut record);
                    if let Some(existing) = state.find_mut(id) {
                        record.created_at = existing.created_at;
                        record.updated_at = existing.updated_at + Duration::seconds(1);
                        *existing = record.clone();
                    }
                    respond_record(request, 200, &record);
                }
                Err(message) => respond_error(request, 400, &message),
            }
        }
        (Method::Patch, [records, id]) if records == "records" => {
            let Ok(id) = id.parse::<i64>() else {
                respond_error(request, 400, "bad record id");
                return;
            };
            let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&body) else {
                respond_error(request, 400, "patch body is not JSON");
                return;
            };
            match state.patch(id, &parsed) {
                Ok(record) => respond_record(request, 200, &record),
                Err((status, message)) => respond_error(request, status, &message),
            }
        }
        (Method::Delete, [records, id]) if records == "records" => {
            let Ok(id) = id.parse::<i64>() else {
                respond_error(request, 400, "bad record id");
                return;
            };
            let before = state.records.len();
            state.records.retain(|record| record.id.get() != id);
            if state.records.len() == before {
                respond_error(request, 404, "record not found");
            } else {
                let _ = request.respond(Response::empty(204));
            }
        }
        (Method::Get, [stats]) if stats == "stats" => {
            let mut from = None;
            let mut to = None;
            for (key, value) in url.query_pairs() {
                match key.as_ref() {
                    "from" => from = values::parse_optional_date(&value).ok().flatten(),
                    "to" => to = values::parse_optional_date(&value).ok().flatten(),
                    _ => {}
                }
            }
            respond_json(request, 200, &state.stats(from, to));
        }
        (Method::Get, [lookups, which]) if lookups == "lookups" => match which.as_str() {
            "artists" => respond_json(request, 200, &serde_json::json!(state.artists())),
            "places" => {
                let kind = url
                    .query_pairs()
                    .find(|(key, _)| key == "kind")
                    .map(|(_, value)| value.into_owned())
                    .unwrap_or_else(|| "buy".to_owned());
                respond_json(request, 200, &serde_json::json!(state.places(&kind)));
            }
            "statuses" => {
                let catalog = SellingStatus::ALL
                    .into_iter()
                    .map(|status| StatusEntry {
                        value: status,
                        label: status.label().to_owned(),
                    })
                    .collect::<Vec<_>>();
                respond_json(
                    request,
                    200,
                    &serde_json::to_value(catalog).unwrap_or_default(),
                );
            }
            "filter-bounds" => respond_json(request, 200, &state.bounds()),
            _ => respond_error(request, 404, "unknown lookup"),
        },
        (Method::Get, [session, me]) if session == "session" && me == "me" => {
            if let Some(expected) = &state.accepted_cookie {
                let presented = request
                    .headers()
                    .iter()
                    .find(|header| header.field.equiv("Cookie"))
                    .map(|header| header.value.as_str().to_owned());
                if presented.as_deref() != Some(&format!("{SESSION_COOKIE}={expected}")) {
                    respond_error(request, 401, "no session");
                    return;
                }
            }
            respond_json(
                request,
                200,
                &serde_json::json!({"id": 1, "username": "collector"}),
            );
        }
        (Method::Post, [session]) if session == "session" => {
            let cookie = state
                .accepted_cookie
                .clone()
                .unwrap_or_else(|| "demo-session".to_owned());
            let response = Response::from_string("{}")
                .with_status_code(200)
                .with_header(json_header())
                .with_header(
                    Header::from_bytes(
                        "Set-Cookie",
                        format!("{SESSION_COOKIE}={cookie}; Path=/; HttpOnly"),
                    )
                    .expect("valid set-cookie header"),
                );
            let _ = request.respond(response);
        }
        (Method::Delete, [session]) if session == "session" => {
            let _ = request.respond(Response::empty(204));
        }
        _ => respond_error(request, 404, "not found"),
    }
}

fn parse_record_body(body: &str, id: i64) -> Result<Record, String> {
    let draft: vinylog_app::RecordDraft =
        serde_json::from_str(body).map_err(|error| format!("bad record body: {error}"))?;
    let now = OffsetDateTime::new_utc(
        date_at(REFERENCE_YEAR, Month::August, 1),
        Time::MIDNIGHT,
    );
    Ok(Record {
        id: RecordId::new(id),
        artist: draft.artist,
        title: draft.title,
        support: draft.support,
        label: draft.label,
        catalog_number: draft.catalog_number,
        country: draft.country,
        year: draft.year,
        condition: draft.condition,
        buy_place: draft.buy_place,
        buy_date: draft.buy_date,
        net_buy_price_cents: draft.net_buy_price_cents,
        buy_fees_cents: draft.buy_fees_cents,
        selling_status: draft.selling_status,
        sell_place: draft.sell_place,
        sell_date: draft.sell_date,
        sell_price_cents: draft.sell_price_cents,
        sell_fees_cents: draft.sell_fees_cents,
        commission_cents: draft.commission_cents,
        platform_fees_cents: draft.platform_fees_cents,
        margin_cents: None,
        paid: false,
        shipped: false,
        received: false,
        scanned: false,
        discogs_status: ListingStatus::NotListed,
        discogs_price_cents: None,
        ebay_status: ListingStatus::NotListed,
        ebay_price_cents: None,
        issues: draft.issues,
        created_at: now,
        updated_at: now,
    })
}

fn json_header() -> Header {
    Header::from_bytes("Content-Type", "application/json").expect("valid content type header")
}

fn respond_json(request: Request, status: u16, value: &serde_json::Value) {
    let response = Response::from_string(value.to_string())
        .with_status_code(status)
        .with_header(json_header());
    let _ = request.respond(response);
}

fn respond_record(request: Request, status: u16, record: &Record) {
    match serde_json::to_value(record) {
        Ok(value) => respond_json(request, status, &value),
        Err(_) => respond_error(request, 500, "encode record"),
    }
}

fn respond_error(request: Request, status: u16, message: &str) {
    respond_json(request, status, &serde_json::json!({ "message": message }));
}
