use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sample catalog bundled with the crate.
pub const BUILTIN_CATALOG_JSON: &str = include_str!("../data/countries.json");

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    Africa,
    Americas,
    Asia,
    Europe,
    Oceania,
}

impl Region {
    pub const ALL: [Region; 5] = [
        Region::Africa,
        Region::Americas,
        Region::Asia,
        Region::Europe,
        Region::Oceania,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Africa => "Africa",
            Region::Americas => "Americas",
            Region::Asia => "Asia",
            Region::Europe => "Europe",
            Region::Oceania => "Oceania",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Region::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CatalogError::UnknownRegion(wanted.to_string()))
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountryKind {
    #[default]
    Sovereign,
    Territory,
    #[serde(alias = "de-facto")]
    DeFacto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    pub id: String,
    pub name: String,
    pub capital: String,
    pub region: Region,
    pub lat: f64,
    #[serde(alias = "lon")]
    pub lng: f64,
    pub flag: String,
    #[serde(default)]
    pub kind: CountryKind,
}

/// On-disk shapes: either one ordered list, or lists grouped by kind.
///
/// Grouped files override each record's `kind` with the group it sits in.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Flat(Vec<CountryRecord>),
    Grouped {
        countries: Vec<CountryRecord>,
        #[serde(default)]
        territories: Vec<CountryRecord>,
        #[serde(default)]
        de_facto: Vec<CountryRecord>,
    },
}

impl CatalogFile {
    fn into_records(self) -> Vec<CountryRecord> {
        match self {
            CatalogFile::Flat(records) => records,
            CatalogFile::Grouped {
                countries,
                territories,
                de_facto,
            } => {
                let tagged = |records: Vec<CountryRecord>, kind: CountryKind| {
                    records.into_iter().map(move |mut r| {
                        r.kind = kind;
                        r
                    })
                };
                tagged(countries, CountryKind::Sovereign)
                    .chain(tagged(territories, CountryKind::Territory))
                    .chain(tagged(de_facto, CountryKind::DeFacto))
                    .collect()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    Parse(String),
    Io(String),
    DuplicateId(String),
    EmptyId { position: usize },
    InvalidCoordinate { id: String },
    UnknownRegion(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Parse(msg) => write!(f, "catalog parse error: {msg}"),
            CatalogError::Io(msg) => write!(f, "catalog read error: {msg}"),
            CatalogError::DuplicateId(id) => write!(f, "duplicate country id: {id}"),
            CatalogError::EmptyId { position } => {
                write!(f, "record at position {position} has an empty id")
            }
            CatalogError::InvalidCoordinate { id } => {
                write!(f, "country {id} has an invalid coordinate")
            }
            CatalogError::UnknownRegion(name) => write!(f, "unknown region: {name}"),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Read-only, ordered country catalog.
///
/// Ordering contract:
/// - `records()` yields records in the order they were supplied; search relevance
///   and subset order both follow it.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<CountryRecord>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(records: Vec<CountryRecord>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            if record.id.trim().is_empty() {
                return Err(CatalogError::EmptyId { position });
            }
            if !record.lat.is_finite()
                || !record.lng.is_finite()
                || !(-90.0..=90.0).contains(&record.lat)
                || !(-180.0..=180.0).contains(&record.lng)
            {
                return Err(CatalogError::InvalidCoordinate {
                    id: record.id.clone(),
                });
            }
            if index.insert(record.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateId(record.id.clone()));
            }
        }
        Ok(Self { records, index })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let file = serde_json::from_str::<CatalogFile>(raw)
            .map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::new(file.into_records())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json_str(BUILTIN_CATALOG_JSON)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CountryRecord] {
        &self.records
    }

    pub fn record(&self, position: usize) -> Option<&CountryRecord> {
        self.records.get(position)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&CountryRecord> {
        self.position(id).and_then(|p| self.records.get(p))
    }

    pub fn subsets(&self) -> CatalogSubsets<'_> {
        let mut out = CatalogSubsets::default();
        for record in &self.records {
            match record.kind {
                CountryKind::Sovereign => out.sovereign.push(record),
                CountryKind::Territory => out.territories.push(record),
                CountryKind::DeFacto => out.de_facto.push(record),
            }
        }
        out
    }
}

/// Catalog records split by kind, each list in catalog order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CatalogSubsets<'a> {
    pub sovereign: Vec<&'a CountryRecord>,
    pub territories: Vec<&'a CountryRecord>,
    pub de_facto: Vec<&'a CountryRecord>,
}

impl<'a> CatalogSubsets<'a> {
    pub fn total(&self) -> usize {
        self.sovereign.len() + self.territories.len() + self.de_facto.len()
    }

    /// Sovereign states first, then territories, then de-facto states.
    pub fn iter(&self) -> impl Iterator<Item = &'a CountryRecord> + '_ {
        self.sovereign
            .iter()
            .chain(self.territories.iter())
            .chain(self.de_facto.iter())
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::{Catalog, CatalogError, CountryKind, CountryRecord, Region};
    use pretty_assertions::assert_eq;

    fn record(id: &str, region: Region, kind: CountryKind) -> CountryRecord {
        CountryRecord {
            id: id.to_string(),
            name: id.to_uppercase(),
            capital: format!("{id} city"),
            region,
            lat: 10.0,
            lng: 20.0,
            flag: String::new(),
            kind,
        }
    }

    #[test]
    fn builtin_catalog_loads_all_kinds() {
        let catalog = Catalog::builtin().unwrap();
        let subsets = catalog.subsets();
        assert!(!subsets.sovereign.is_empty());
        assert!(!subsets.territories.is_empty());
        assert!(!subsets.de_facto.is_empty());
        assert_eq!(subsets.total(), catalog.len());
        assert_eq!(catalog.get("xk").map(|r| r.kind), Some(CountryKind::DeFacto));
        assert_eq!(catalog.get("gi").map(|r| r.kind), Some(CountryKind::Territory));
    }

    #[test]
    fn flat_json_keeps_order_and_defaults_kind() {
        let raw = r#"[
            {"id":"b","name":"B","capital":"Bc","region":"Asia","lat":1.0,"lon":2.0,"flag":""},
            {"id":"a","name":"A","capital":"Ac","region":"Europe","lat":3.0,"lng":4.0,"flag":"","kind":"de-facto"}
        ]"#;
        let catalog = Catalog::from_json_str(raw).unwrap();
        let ids: Vec<&str> = catalog.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(catalog.records()[0].kind, CountryKind::Sovereign);
        assert_eq!(catalog.records()[0].lng, 2.0);
        assert_eq!(catalog.records()[1].kind, CountryKind::DeFacto);
        assert_eq!(catalog.position("a"), Some(1));
    }

    #[test]
    fn grouped_json_tags_kind_from_group() {
        let raw = r#"{
            "countries": [{"id":"fr","name":"France","capital":"Paris","region":"Europe","lat":48.8,"lng":2.3,"flag":"","kind":"territory"}],
            "territories": [{"id":"gi","name":"Gibraltar","capital":"Gibraltar","region":"Europe","lat":36.1,"lng":-5.3,"flag":""}]
        }"#;
        let catalog = Catalog::from_json_str(raw).unwrap();
        assert_eq!(catalog.get("fr").unwrap().kind, CountryKind::Sovereign);
        assert_eq!(catalog.get("gi").unwrap().kind, CountryKind::Territory);
        assert!(catalog.subsets().de_facto.is_empty());
    }

    #[test]
    fn rejects_duplicates_and_bad_coordinates() {
        let dup = vec![
            record("a", Region::Asia, CountryKind::Sovereign),
            record("a", Region::Europe, CountryKind::Territory),
        ];
        assert_eq!(
            Catalog::new(dup).unwrap_err(),
            CatalogError::DuplicateId("a".to_string())
        );

        let mut bad = record("z", Region::Asia, CountryKind::Sovereign);
        bad.lat = 91.0;
        assert_eq!(
            Catalog::new(vec![bad]).unwrap_err(),
            CatalogError::InvalidCoordinate {
                id: "z".to_string()
            }
        );

        let empty = record(" ", Region::Asia, CountryKind::Sovereign);
        assert_eq!(
            Catalog::new(vec![empty]).unwrap_err(),
            CatalogError::EmptyId { position: 0 }
        );
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = Catalog::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[test]
    fn subsets_preserve_catalog_order_within_kind() {
        let catalog = Catalog::new(vec![
            record("t1", Region::Oceania, CountryKind::Territory),
            record("s1", Region::Asia, CountryKind::Sovereign),
            record("t2", Region::Europe, CountryKind::Territory),
        ])
        .unwrap();
        let subsets = catalog.subsets();
        let territories: Vec<&str> = subsets.territories.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(territories, vec!["t1", "t2"]);
        let all: Vec<&str> = subsets.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(all, vec!["s1", "t1", "t2"]);
    }

    #[test]
    fn region_parses_case_insensitively() {
        assert_eq!("europe".parse::<Region>().unwrap(), Region::Europe);
        assert_eq!(" Americas ".parse::<Region>().unwrap(), Region::Americas);
        assert!(matches!(
            "Atlantis".parse::<Region>(),
            Err(CatalogError::UnknownRegion(_))
        ));
    }
}
