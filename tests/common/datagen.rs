//! Seeded test-data generator
//!
//! Entities get a `resolve_id`, a sequential `sray_entity_id` and a derived
//! `fs_entity_id`; 30% of them later drop the latter two. Securities carry
//! sequential `asset_id`s plus random ISIN and CUSIP values.

use chrono::{DateTime, Duration, TimeZone, Utc};
use idgraph::{Entity, EntityId, Identifier, Interval, Lookup, Security};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

const COMPANY_WORDS: &[&str] = &[
    "Acme", "Northwind", "Globex", "Initech", "Umbrella", "Hooli", "Vandelay", "Stark", "Wayne", "Tyrell",
];
const COMPANY_SUFFIXES: &[&str] = &["Holdings", "Group", "Ltd", "PLC", "Corp", "AG"];
const COUNTRIES: &[&str] = &["US", "GB", "DE", "FR", "JP", "CH", "CA", "NL"];
const SECURITY_NAMES: &[&str] = &["Ordinary", "Preferred", "Class A", "Class B", "Senior Note", "ADR"];

pub struct DataGen {
    rng: StdRng,
    now: DateTime<Utc>,
    entity_seq: u64,
    asset_seq: u64,
}

impl DataGen {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            now: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            entity_seq: 0,
            asset_seq: 0,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// A whole day in `(from, to]`, or `from + 1 day` when the range is empty
    fn day_after(&mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> DateTime<Utc> {
        let days = (to - from).num_days().max(1);
        from + Duration::days(self.rng.gen_range(1..=days))
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items.choose(&mut self.rng).copied().unwrap_or_default()
    }

    pub fn entities(&mut self, n: usize) -> Vec<Entity> {
        (0..n).map(|_| self.entity()).collect()
    }

    pub fn entity(&mut self) -> Entity {
        let earliest = self.now - Duration::days(3650);
        let from = self.day_after(earliest, self.now - Duration::days(400));

        let mut entity = Entity::new(EntityId::from_uuid(Uuid::from_u128(self.rng.gen())));

        let name_changes = self.rng.gen_range(0..=2);
        for (value, interval) in self.chain(name_changes, from, |g| {
            format!("{} {}", g.pick(COMPANY_WORDS), g.pick(COMPANY_SUFFIXES))
        }) {
            entity = entity.with_name(value, interval);
        }

        let country_changes = self.rng.gen_range(0..=1);
        for (value, interval) in self.chain(country_changes, from, |g| g.pick(COUNTRIES).to_string()) {
            entity = entity.with_country(value, interval);
        }

        self.entity_seq += 1;
        let sray = self.entity_seq.to_string();
        let initial = vec![
            Identifier::new("resolve_id", Uuid::from_u128(self.rng.gen()).to_string()),
            Identifier::new("sray_entity_id", sray.as_str()),
            Identifier::new("fs_entity_id", format!("{:0>6}-E", sray)),
        ];
        if self.rng.gen_bool(0.3) {
            let until = self.day_after(from, self.now);
            let kept = initial[..1].to_vec();
            entity = entity
                .with_identifiers(initial, Interval { start: from, end: Some(until) })
                .with_identifiers(kept, Interval::starting_at(until));
        } else {
            entity = entity.with_identifiers(initial, Interval::starting_at(from));
        }

        let count = self.rng.gen_range(0..=4);
        if count > 0 {
            let primary = self.rng.gen_range(0..count);
            let securities = (0..count)
                .map(|i| {
                    let mut security = Security::new(self.pick(SECURITY_NAMES));
                    security.is_primary = i == primary;
                    security.identifiers = self.security_identifiers();
                    security
                })
                .collect();
            entity = entity.with_securities(securities, Interval::starting_at(from));
        }

        entity
    }

    /// `changes + 1` consecutive values; all but the last are closed
    fn chain(
        &mut self,
        changes: usize,
        mut from: DateTime<Utc>,
        mut value: impl FnMut(&mut Self) -> String,
    ) -> Vec<(String, Interval)> {
        let mut out = Vec::with_capacity(changes + 1);
        for i in 0..=changes {
            let v = value(self);
            if i < changes {
                let until = self.day_after(from, self.now);
                out.push((v, Interval { start: from, end: Some(until) }));
                from = until;
            } else {
                out.push((v, Interval::starting_at(from)));
            }
        }
        out
    }

    fn security_identifiers(&mut self) -> Vec<Identifier> {
        let mut identifiers = Vec::new();
        if self.rng.gen_bool(0.8) {
            self.asset_seq += 1;
            identifiers.push(Identifier::new("asset_id", self.asset_seq.to_string()));
        }
        if self.rng.gen_bool(0.8) {
            let isin = format!("{}{:09}{}", self.pick(COUNTRIES), self.rng.gen_range(0..1_000_000_000u64), self.rng.gen_range(0..10));
            identifiers.push(Identifier::new("isin", isin));
        }
        if self.rng.gen_bool(0.8) {
            identifiers.push(Identifier::new("cusip", format!("{:09}", self.rng.gen_range(0..1_000_000_000u64))));
        }
        identifiers
    }

    /// `n` dated lookups by `sray_entity_id` or `asset_id`, values drawn
    /// from `1..=max_id`. Dates advance one to three days per lookup.
    pub fn lookups(&mut self, n: usize, max_id: u64, mut date: DateTime<Utc>) -> Vec<Lookup> {
        (0..n)
            .map(|_| {
                date += Duration::days(self.rng.gen_range(1..=3));
                let kind = if self.rng.gen_bool(0.5) { "sray_entity_id" } else { "asset_id" };
                let value = self.rng.gen_range(1..=max_id.max(1)).to_string();
                Lookup::new(Identifier::new(kind, value), date)
            })
            .collect()
    }

    /// Like `lookups`, without repeating an identifier
    pub fn unique_lookups(&mut self, n: usize, max_id: u64, date: DateTime<Utc>) -> Vec<Lookup> {
        let mut seen = std::collections::HashSet::new();
        self.lookups(n, max_id, date)
            .into_iter()
            .filter(|lookup| seen.insert(lookup.identifier.clone()))
            .collect()
    }
}
