// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::Date;

use crate::model::{SellingStatus, SortSpec, Support};
use crate::pagination::Pager;
use crate::values;

/// The optional predicates parameterizing the list query. All fields default
/// to "no constraint"; only non-default fields are serialized.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterSet {
    pub artist: String,
    pub match_exact_artist: bool,
    pub title: String,
    pub match_exact_title: bool,
    pub buy_place: String,
    pub sell_place: String,
    pub support: Option<Support>,
    pub statuses: Vec<SellingStatus>,
    pub buy_date_min: Option<Date>,
    pub buy_date_max: Option<Date>,
    pub sell_date_min: Option<Date>,
    pub sell_date_max: Option<Date>,
    pub buy_price_min_cents: Option<i64>,
    pub buy_price_max_cents: Option<i64>,
    pub sell_price_min_cents: Option<i64>,
    pub sell_price_max_cents: Option<i64>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
}

impl FilterSet {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Serialize the non-default fields as query pairs: repeated `status`
    /// keys for the multi-select, ISO dates, two-decimal prices, plain
    /// integer years, explicit "true"/"false" booleans.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        push_text(&mut pairs, "artist", &self.artist);
        push_flag(&mut pairs, "matchExactArtist", self.match_exact_artist);
        push_text(&mut pairs, "title", &self.title);
        push_flag(&mut pairs, "matchExactTitle", self.match_exact_title);
        push_text(&mut pairs, "buyPlace", &self.buy_place);
        push_text(&mut pairs, "sellPlace", &self.sell_place);
        if let Some(support) = self.support {
            pairs.push(("support".to_owned(), support.as_str().to_owned()));
        }
        for status in &self.statuses {
            pairs.push(("status".to_owned(), status.as_str().to_owned()));
        }
        push_date(&mut pairs, "buyDateMin", self.buy_date_min);
        push_date(&mut pairs, "buyDateMax", self.buy_date_max);
        push_date(&mut pairs, "sellDateMin", self.sell_date_min);
        push_date(&mut pairs, "sellDateMax", self.sell_date_max);
        push_price(&mut pairs, "buyPriceMin", self.buy_price_min_cents);
        push_price(&mut pairs, "buyPriceMax", self.buy_price_max_cents);
        push_price(&mut pairs, "sellPriceMin", self.sell_price_min_cents);
        push_price(&mut pairs, "sellPriceMax", self.sell_price_max_cents);
        push_year(&mut pairs, "yearMin", self.year_min);
        push_year(&mut pairs, "yearMax", self.year_max);
        pairs
    }

    /// Inverse of `to_query_pairs`. Unknown keys and unparseable values are
    /// ignored field-wise so a hand-edited link degrades gracefully.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filters = Self::default();
        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                "artist" => filters.artist = value.to_owned(),
                "matchExactArtist" => {
                    if let Some(flag) = parse_bool(value) {
                        filters.match_exact_artist = flag;
                    }
                }
                "title" => filters.title = value.to_owned(),
                "matchExactTitle" => {
                    if let Some(flag) = parse_bool(value) {
                        filters.match_exact_title = flag;
                    }
                }
                "buyPlace" => filters.buy_place = value.to_owned(),
                "sellPlace" => filters.sell_place = value.to_owned(),
                "support" => filters.support = Support::parse(value),
                "status" => {
                    if let Some(status) = SellingStatus::parse(value)
                        && !filters.statuses.contains(&status)
                    {
                        filters.statuses.push(status);
                    }
                }
                "buyDateMin" => filters.buy_date_min = parse_date(value),
                "buyDateMax" => filters.buy_date_max = parse_date(value),
                "sellDateMin" => filters.sell_date_min = parse_date(value),
                "sellDateMax" => filters.sell_date_max = parse_date(value),
                "buyPriceMin" => filters.buy_price_min_cents = parse_price(value),
                "buyPriceMax" => filters.buy_price_max_cents = parse_price(value),
                "sellPriceMin" => filters.sell_price_min_cents = parse_price(value),
                "sellPriceMax" => filters.sell_price_max_cents = parse_price(value),
                "yearMin" => filters.year_min = parse_year(value),
                "yearMax" => filters.year_max = parse_year(value),
                _ => {}
            }
        }
        filters
    }
}

/// Draft vs. applied filter snapshots. The draft is bound to the filter
/// form; the applied snapshot is what actually drives the current query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterState {
    pub draft: FilterSet,
    pub applied: FilterSet,
}

impl FilterState {
    /// Copy draft into applied and restart at the first page.
    pub fn apply(&mut self, pager: &mut Pager) {
        self.applied = self.draft.clone();
        pager.set_page(0);
    }

    /// Restore both snapshots to the fixed default.
    pub fn reset(&mut self, pager: &mut Pager) {
        self.draft = FilterSet::default();
        self.applied = FilterSet::default();
        pager.set_page(0);
    }

    /// Rehydrate both snapshots from a shared/bookmarked query string.
    pub fn hydrate<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let filters = FilterSet::from_query_pairs(pairs);
        self.draft = filters.clone();
        self.applied = filters;
    }
}

/// The full parameter set of one list query. Its canonical rendering is the
/// fetch cache key, so two queries share an entry iff every parameter
/// matches.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListQuery {
    pub filters: FilterSet,
    pub pager: Pager,
    pub sort: SortSpec,
}

impl ListQuery {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.filters.to_query_pairs();
        pairs.push(("page".to_owned(), self.pager.page.to_string()));
        pairs.push(("size".to_owned(), self.pager.size.to_string()));
        pairs.push(("sortBy".to_owned(), self.sort.key.wire_name().to_owned()));
        pairs.push((
            "sortDir".to_owned(),
            self.sort.direction.wire_name().to_owned(),
        ));
        pairs
    }

    pub fn cache_key(&self) -> String {
        self.query_pairs()
            .iter()
            .map(|(key, value)| format!("{key}={}", escape_key_component(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn escape_key_component(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('&', "%26")
        .replace('=', "%3D")
}

fn push_text(pairs: &mut Vec<(String, String)>, key: &str, value: &str) {
    if !value.is_empty() {
        pairs.push((key.to_owned(), value.to_owned()));
    }
}

fn push_flag(pairs: &mut Vec<(String, String)>, key: &str, value: bool) {
    if value {
        pairs.push((key.to_owned(), "true".to_owned()));
    }
}

fn push_date(pairs: &mut Vec<(String, String)>, key: &str, value: Option<Date>) {
    if value.is_some() {
        pairs.push((key.to_owned(), values::format_date(value)));
    }
}

fn push_price(pairs: &mut Vec<(String, String)>, key: &str, cents: Option<i64>) {
    if let Some(cents) = cents {
        pairs.push((key.to_owned(), values::format_plain_cents(cents)));
    }
}

fn push_year(pairs: &mut Vec<(String, String)>, key: &str, year: Option<i32>) {
    if let Some(year) = year {
        pairs.push((key.to_owned(), year.to_string()));
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_date(value: &str) -> Option<Date> {
    values::parse_optional_date(value).ok().flatten()
}

fn parse_price(value: &str) -> Option<i64> {
    values::parse_optional_cents(value).ok().flatten()
}

fn parse_year(value: &str) -> Option<i32> {
    values::parse_optional_year(value).ok().flatten()
}

#[cfg(test)]
mod tests {
    use super::{FilterSet, FilterState, ListQuery};
    use crate::model::{SellingStatus, SortDirection, SortKey, SortSpec, Support};
    use crate::pagination::Pager;
    use time::{Date, Month};

    fn busy_filters() -> FilterSet {
        FilterSet {
            artist: "Miles Davis".to_owned(),
            match_exact_artist: true,
            title: "Kind of".to_owned(),
            match_exact_title: false,
            buy_place: "record fair".to_owned(),
            sell_place: String::new(),
            support: Some(Support::Lp),
            statuses: vec![SellingStatus::ForSale, SellingStatus::Sold],
            buy_date_min: Some(
                Date::from_calendar_date(2024, Month::January, 1).expect("valid date"),
            ),
            buy_date_max: None,
            sell_date_min: None,
            sell_date_max: Some(
                Date::from_calendar_date(2026, Month::June, 30).expect("valid date"),
            ),
            buy_price_min_cents: Some(1_050),
            buy_price_max_cents: Some(10_000),
            sell_price_min_cents: None,
            sell_price_max_cents: None,
            year_min: Some(1955),
            year_max: Some(1975),
        }
    }

    #[test]
    fn query_pairs_round_trip_reproduces_the_filter_set() {
        let filters = busy_filters();
        let pairs = filters.to_query_pairs();
        let parsed = FilterSet::from_query_pairs(
            pairs.iter().map(|(key, value)| (key.as_str(), value.as_str())),
        );
        assert_eq!(parsed, filters);
    }

    #[test]
    fn default_fields_are_omitted_from_the_query() {
        let pairs = FilterSet::default().to_query_pairs();
        assert!(pairs.is_empty());

        let mut filters = FilterSet::default();
        filters.artist = "Nina Simone".to_owned();
        let pairs = filters.to_query_pairs();
        assert_eq!(
            pairs,
            vec![("artist".to_owned(), "Nina Simone".to_owned())],
        );
    }

    #[test]
    fn statuses_encode_as_repeated_keys() {
        let mut filters = FilterSet::default();
        filters.statuses = vec![SellingStatus::Sold, SellingStatus::ForSale];
        let pairs = filters.to_query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("status".to_owned(), "sold".to_owned()),
                ("status".to_owned(), "for_sale".to_owned()),
            ],
        );
    }

    #[test]
    fn price_bounds_serialize_as_two_decimal_strings() {
        let mut filters = FilterSet::default();
        filters.buy_price_min_cents = Some(1_050);
        let pairs = filters.to_query_pairs();
        assert_eq!(
            pairs,
            vec![("buyPriceMin".to_owned(), "10.50".to_owned())],
        );
    }

    #[test]
    fn boolean_coercion_is_explicit() {
        let filters = FilterSet::from_query_pairs([
            ("matchExactArtist", "true"),
            ("matchExactTitle", "1"),
            ("artist", "Alice Coltrane"),
        ]);
        assert!(filters.match_exact_artist);
        assert!(!filters.match_exact_title);
        assert_eq!(filters.artist, "Alice Coltrane");
    }

    #[test]
    fn unknown_keys_and_bad_values_are_ignored() {
        let filters = FilterSet::from_query_pairs([
            ("wat", "x"),
            ("yearMin", "vintage"),
            ("buyPriceMax", "-3"),
            ("status", "gifted"),
        ]);
        assert_eq!(filters, FilterSet::default());
    }

    #[test]
    fn apply_copies_draft_and_resets_page() {
        let mut state = FilterState::default();
        let mut pager = Pager::default();
        pager.set_page(7);

        state.draft.artist = "Miles Davis".to_owned();
        state.draft.match_exact_artist = true;
        state.apply(&mut pager);

        assert_eq!(state.applied, state.draft);
        assert_eq!(pager.page, 0);
    }

    #[test]
    fn reset_restores_the_fixed_default_and_clears_the_query() {
        let mut state = FilterState::default();
        let mut pager = Pager::default();

        state.draft.artist = "Miles Davis".to_owned();
        state.draft.match_exact_artist = true;
        state.apply(&mut pager);
        assert!(!state.applied.to_query_pairs().is_empty());

        state.reset(&mut pager);
        assert_eq!(state.draft, FilterSet::default());
        assert_eq!(state.applied, FilterSet::default());
        assert!(state.applied.to_query_pairs().is_empty());
    }

    #[test]
    fn hydrate_fills_both_snapshots() {
        let mut state = FilterState::default();
        state.hydrate([("artist", "Erykah Badu"), ("yearMin", "1997")]);
        assert_eq!(state.draft.artist, "Erykah Badu");
        assert_eq!(state.applied.year_min, Some(1997));
        assert_eq!(state.draft, state.applied);
    }

    #[test]
    fn cache_key_covers_every_parameter() {
        let mut query = ListQuery::default();
        query.filters.artist = "Fela Kuti".to_owned();
        query.sort = SortSpec {
            key: SortKey::Artist,
            direction: SortDirection::Asc,
        };
        let key = query.cache_key();
        assert!(key.contains("artist=Fela Kuti"));
        assert!(key.contains("page=0"));
        assert!(key.contains("size=25"));
        assert!(key.contains("sortBy=artist"));
        assert!(key.contains("sortDir=asc"));

        let mut other = query.clone();
        other.pager.set_page(1);
        assert_ne!(key, other.cache_key());
    }

    #[test]
    fn cache_key_escapes_separator_characters() {
        let mut query = ListQuery::default();
        query.filters.artist = "A&B=C".to_owned();
        assert!(query.cache_key().contains("artist=A%26B%3DC"));
    }
}
