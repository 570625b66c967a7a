//! Deterministic query templates used when the analyst path yields no rows.
//!
//! Each template is tried in order by the resolver; the first one producing at
//! least one row wins. Rows coming back from a template are re-ranked locally
//! with [`rank_rows`] so the documented ordering holds whatever the backend did.

use std::cmp::Ordering;

use serde_json::Value;

use crate::{
    config::TripConfig,
    types::resolution::{FallbackUsed, QuerySubject, Record},
};

/// Maximum rows kept from any template.
pub const FALLBACK_ROW_LIMIT: usize = 10;

const FLIGHTS_TABLE: &str = "FLIGHTS";
const HOTELS_TABLE: &str = "HOTELS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackTemplate {
    /// Direct flights on the requested pair
    Outbound,
    /// Outbound joined with the reverse pair, priced as a bundle
    RoundtripBundle,
    HotelsBasic,
}

struct SortKey {
    /// Candidate columns, first present one wins
    columns: &'static [&'static str],
    descending: bool,
}

const OUTBOUND_ORDER: &[SortKey] = &[
    SortKey {
        columns: &["PRICE"],
        descending: false,
    },
    SortKey {
        columns: &["DURATION_MINUTES", "DURATION"],
        descending: false,
    },
];

const BUNDLE_ORDER: &[SortKey] = &[
    SortKey {
        columns: &["TOTAL_PRICE"],
        descending: false,
    },
    SortKey {
        columns: &["TOTAL_DURATION_MINUTES"],
        descending: false,
    },
];

const HOTELS_ORDER: &[SortKey] = &[
    SortKey {
        columns: &["PRICE"],
        descending: false,
    },
    SortKey {
        columns: &["RATING"],
        descending: true,
    },
];

impl FallbackTemplate {
    /// Templates to try for a subject, in order.
    pub fn chain_for(subject: &QuerySubject) -> &'static [FallbackTemplate] {
        match subject {
            QuerySubject::Flights { .. } => {
                &[FallbackTemplate::Outbound, FallbackTemplate::RoundtripBundle]
            }
            QuerySubject::Hotels { .. } => &[FallbackTemplate::HotelsBasic],
            QuerySubject::Guide { .. } => &[],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FallbackTemplate::Outbound => "fallback_outbound_sql",
            FallbackTemplate::RoundtripBundle => "fallback_roundtrip_bundle_sql",
            FallbackTemplate::HotelsBasic => "fallback_hotels_basic_sql",
        }
    }

    pub fn fallback_used(&self) -> FallbackUsed {
        match self {
            FallbackTemplate::Outbound => FallbackUsed::Outbound,
            FallbackTemplate::RoundtripBundle => FallbackUsed::RoundtripBundle,
            FallbackTemplate::HotelsBasic => FallbackUsed::HotelsBasic,
        }
    }

    /// Render the statement for `subject`, or `None` when the template does
    /// not apply to that domain.
    pub fn render(&self, config: &TripConfig, subject: &QuerySubject) -> Option<String> {
        match (self, subject) {
            (FallbackTemplate::Outbound, QuerySubject::Flights { from, to }) => {
                Some(outbound_sql(config, from, to))
            }
            (FallbackTemplate::RoundtripBundle, QuerySubject::Flights { from, to }) => {
                Some(roundtrip_bundle_sql(config, from, to))
            }
            (FallbackTemplate::HotelsBasic, QuerySubject::Hotels { city }) => {
                Some(hotels_basic_sql(config, city))
            }
            _ => None,
        }
    }

    fn order(&self) -> &'static [SortKey] {
        match self {
            FallbackTemplate::Outbound => OUTBOUND_ORDER,
            FallbackTemplate::RoundtripBundle => BUNDLE_ORDER,
            FallbackTemplate::HotelsBasic => HOTELS_ORDER,
        }
    }
}

/// Escape a value for use inside a single-quoted SQL literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

fn duration_minutes(alias: &str) -> String {
    format!(
        "TRY_TO_NUMBER(SPLIT_PART({a}.DURATION, ':', 1)) * 60 + TRY_TO_NUMBER(SPLIT_PART({a}.DURATION, ':', 2))",
        a = alias
    )
}

fn outbound_sql(config: &TripConfig, from: &str, to: &str) -> String {
    format!(
        "SELECT f.*, {duration} AS DURATION_MINUTES \
         FROM {table} f \
         WHERE LOWER(f.SOURCE) = LOWER('{from}') AND LOWER(f.DESTINATION) = LOWER('{to}') \
         ORDER BY f.PRICE ASC, DURATION_MINUTES ASC \
         LIMIT {limit}",
        duration = duration_minutes("f"),
        table = config.qualified_table(FLIGHTS_TABLE),
        from = escape_literal(from),
        to = escape_literal(to),
        limit = FALLBACK_ROW_LIMIT,
    )
}

fn roundtrip_bundle_sql(config: &TripConfig, from: &str, to: &str) -> String {
    format!(
        "SELECT OBJECT_CONSTRUCT(o.*) AS OUTBOUND, OBJECT_CONSTRUCT(r.*) AS RETURN_FLIGHT, \
         o.PRICE + r.PRICE AS TOTAL_PRICE, \
         ({outbound}) + ({inbound}) AS TOTAL_DURATION_MINUTES \
         FROM {table} o JOIN {table} r \
         ON LOWER(r.SOURCE) = LOWER(o.DESTINATION) AND LOWER(r.DESTINATION) = LOWER(o.SOURCE) \
         WHERE LOWER(o.SOURCE) = LOWER('{from}') AND LOWER(o.DESTINATION) = LOWER('{to}') \
         ORDER BY TOTAL_PRICE ASC, TOTAL_DURATION_MINUTES ASC \
         LIMIT {limit}",
        outbound = duration_minutes("o"),
        inbound = duration_minutes("r"),
        table = config.qualified_table(FLIGHTS_TABLE),
        from = escape_literal(from),
        to = escape_literal(to),
        limit = FALLBACK_ROW_LIMIT,
    )
}

fn hotels_basic_sql(config: &TripConfig, city: &str) -> String {
    format!(
        "SELECT h.* FROM {table} h \
         WHERE LOWER(h.CITY) = LOWER('{city}') \
         ORDER BY h.PRICE ASC, h.RATING DESC \
         LIMIT {limit}",
        table = config.qualified_table(HOTELS_TABLE),
        city = escape_literal(city),
        limit = FALLBACK_ROW_LIMIT,
    )
}

/// Stable-sort rows by the template's ordering keys and cap them at
/// [`FALLBACK_ROW_LIMIT`]. Rows missing a key sort after those that have it.
pub fn rank_rows(template: FallbackTemplate, mut rows: Vec<Record>) -> Vec<Record> {
    let order = template.order();
    rows.sort_by(|a, b| {
        order
            .iter()
            .map(|key| compare_key(key, a, b))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    rows.truncate(FALLBACK_ROW_LIMIT);
    rows
}

fn compare_key(key: &SortKey, a: &Record, b: &Record) -> Ordering {
    match (sort_value(key, a), sort_value(key, b)) {
        (Some(x), Some(y)) if key.descending => y.total_cmp(&x),
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn sort_value(key: &SortKey, row: &Record) -> Option<f64> {
    key.columns
        .iter()
        .find_map(|column| lookup(row, column))
        .and_then(numeric)
}

fn lookup<'a>(row: &'a Record, column: &str) -> Option<&'a Value> {
    row.iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(column))
        .map(|(_, value)| value)
        .filter(|value| !value.is_null())
}

/// Numbers, numeric strings and `HH:MM` durations (as minutes).
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<f64>() {
                return Some(n);
            }
            let (hours, minutes) = s.split_once(':')?;
            let hours: f64 = hours.trim().parse().ok()?;
            let minutes: f64 = minutes.trim().parse().ok()?;
            Some(hours * 60.0 + minutes)
        }
        _ => None,
    }
}
