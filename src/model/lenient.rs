//! Scalar decoding for hand-written topology and request files, where AS
//! numbers, coordinates and flags show up either as native JSON values or as
//! strings.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(text) => text.trim().to_string(),
            RawId::Number(number) => number.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFlag {
    Bool(bool),
    Number(i64),
    Text(String),
}

pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(RawId::deserialize(deserializer)?.into())
}

pub fn ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<RawId>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(String::from).collect())
}

pub fn opt_ids<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<RawId>>::deserialize(deserializer)?;
    Ok(raw.map(|items| items.into_iter().map(String::from).collect()))
}

pub fn coordinate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match RawNumber::deserialize(deserializer)? {
        RawNumber::Number(number) => number,
        RawNumber::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|err| D::Error::custom(format!("invalid coordinate {text:?}: {err}")))?,
    };
    if !value.is_finite() {
        return Err(D::Error::custom("coordinate must be finite"));
    }
    Ok(value)
}

fn parse_flag(raw: RawFlag) -> Result<bool, String> {
    match raw {
        RawFlag::Bool(flag) => Ok(flag),
        RawFlag::Number(0) => Ok(false),
        RawFlag::Number(1) => Ok(true),
        RawFlag::Number(other) => Err(format!("invalid flag value {other}")),
        RawFlag::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(format!("invalid flag value {text:?}")),
        },
    }
}

pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    parse_flag(RawFlag::deserialize(deserializer)?).map_err(D::Error::custom)
}

pub fn flags<'de, D>(deserializer: D) -> Result<Vec<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<RawFlag>::deserialize(deserializer)?
        .into_iter()
        .map(parse_flag)
        .collect::<Result<Vec<_>, _>>()
        .map_err(D::Error::custom)
}
