//! # Region list loading.
//!
//! The region file is a JSON array of records. Each record needs an identifier
//! and four bounding-box edges; edges may be JSON numbers or numeric strings.
//! Field names are matched case-insensitively so files produced by other tools
//! (`West`, `ID`, ...) load unchanged. The whole record is kept as the region's
//! pass-through metadata.
//!
//! ```text
//! [
//!   {"id": "nyc", "displayName": "New York", "west": -74, "south": 40, "east": "-73", "north": "41"},
//!   ...
//! ]
//! ```
//!
//! Any failure is a [`ConfigError`]: the runtime never starts on a partial list.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::region::{BoundingBox, Region};
use crate::error::ConfigError;

const ID_KEYS: &[&str] = &["id", "name"];
const DISPLAY_KEYS: &[&str] = &["displayname", "display_name", "name"];

/// Reads and validates the region list at `path`.
pub fn load_regions(path: &Path) -> Result<Vec<Region>, ConfigError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_regions(&bytes, path)
}

/// Parses a region list; `origin` is only used in error messages.
pub fn parse_regions(bytes: &[u8], origin: &Path) -> Result<Vec<Region>, ConfigError> {
    let records: Vec<Value> =
        serde_json::from_slice(bytes).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

    if records.is_empty() {
        return Err(ConfigError::NoRegions);
    }

    let mut seen = HashSet::with_capacity(records.len());
    let mut regions = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let region = parse_record(index, record)?;
        if !seen.insert(region.id.clone()) {
            return Err(ConfigError::InvalidRegion {
                index,
                reason: format!("duplicate id `{}`", region.id),
            });
        }
        regions.push(region);
    }
    Ok(regions)
}

fn parse_record(index: usize, record: Value) -> Result<Region, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidRegion { index, reason };

    let Value::Object(fields) = &record else {
        return Err(invalid("record is not an object".into()));
    };

    let id = ID_KEYS
        .iter()
        .find_map(|k| lookup(fields, k))
        .and_then(id_text)
        .ok_or_else(|| invalid("missing identifier".into()))?;

    let edge = |name: &'static str| -> Result<f64, ConfigError> {
        let v = lookup(fields, name).ok_or_else(|| invalid(format!("missing `{name}`")))?;
        coordinate(v).ok_or_else(|| invalid(format!("`{name}` is not a number: {v}")))
    };
    let bbox = BoundingBox::new(edge("west")?, edge("south")?, edge("east")?, edge("north")?)
        .map_err(invalid)?;

    let display_name = DISPLAY_KEYS
        .iter()
        .find_map(|k| lookup(fields, k))
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_else(|| id.clone());

    let raw = serde_json::to_vec(&record).map_err(|e| invalid(e.to_string()))?;

    Ok(Region::new(id, bbox)
        .with_display_name(display_name)
        .with_metadata(Arc::<[u8]>::from(raw)))
}

/// Case-insensitive field lookup.
fn lookup<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields
        .get(key)
        .or_else(|| fields.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v))
}

fn id_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coordinate(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(json: &str) -> Result<Vec<Region>, ConfigError> {
        parse_regions(json.as_bytes(), Path::new("regions.json"))
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let regions = parse(
            r#"[{"id":"nyc","displayName":"New York","west":-74,"south":"40","east":"-73.0","north":41}]"#,
        )
        .unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(&*regions[0].id, "nyc");
        assert_eq!(regions[0].display_name, "New York");
        assert_eq!(regions[0].bbox.filter(), "-74,40,-73,41");
    }

    #[test]
    fn matches_capitalised_fields() {
        let regions =
            parse(r#"[{"ID":7,"Name":"Boulder","West":-105.3,"South":39.9,"East":-105.1,"North":40.1}]"#)
                .unwrap();
        assert_eq!(&*regions[0].id, "7");
        assert_eq!(regions[0].display_name, "Boulder");
    }

    #[test]
    fn keeps_order_and_raw_record() {
        let regions = parse(
            r#"[
                {"id":"b","west":0,"south":0,"east":1,"north":1,"population":5},
                {"id":"a","west":2,"south":2,"east":3,"north":3}
            ]"#,
        )
        .unwrap();
        let ids: Vec<&str> = regions.iter().map(|r| &*r.id).collect();
        assert_eq!(ids, ["b", "a"]);

        let meta: Value = serde_json::from_slice(&regions[0].raw_metadata).unwrap();
        assert_eq!(meta["population"], 5);
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let regions = parse(r#"[{"id":"den","west":0,"south":0,"east":1,"north":1}]"#).unwrap();
        assert_eq!(regions[0].display_name, "den");
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(parse("not json"), Err(ConfigError::Parse { .. })));
        assert!(matches!(parse("[]"), Err(ConfigError::NoRegions)));
        assert!(matches!(
            parse(r#"[{"west":0,"south":0,"east":1,"north":1}]"#),
            Err(ConfigError::InvalidRegion { index: 0, .. })
        ));
        assert!(matches!(
            parse(r#"[{"id":"x","west":"abc","south":0,"east":1,"north":1}]"#),
            Err(ConfigError::InvalidRegion { .. })
        ));
        assert!(matches!(
            parse(r#"[{"id":"x","west":1,"south":0,"east":0,"north":1}]"#),
            Err(ConfigError::InvalidRegion { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = parse(
            r#"[{"id":"x","west":0,"south":0,"east":1,"north":1},
                {"id":"x","west":2,"south":2,"east":3,"north":3}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRegion { index: 1, .. }));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id":"nyc","west":-74,"south":40,"east":-73,"north":41}}]"#).unwrap();
        let regions = load_regions(file.path()).unwrap();
        assert_eq!(&*regions[0].id, "nyc");

        let missing = load_regions(Path::new("/nonexistent/regions.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
