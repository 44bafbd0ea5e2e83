use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::model::request::RouteRequest;
use crate::model::topology::NodeRecord;

fn json_files_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("failed to list directory {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// A file holds either one record or an array of records. Decoding goes
/// through `Value` so a bad field reports its own error.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let records = if value.is_array() {
        Vec::<T>::deserialize(value)
    } else {
        T::deserialize(value).map(|record| vec![record])
    };
    records.with_context(|| format!("invalid record in {}", path.display()))
}

/// Reads records from a directory of `*.json` files (sorted by name) or from
/// one file holding a single record or an array of records.
fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if path.is_dir() {
        let mut out = Vec::new();
        for file in json_files_sorted(path)? {
            debug!("loading {}", file.display());
            out.extend(read_json::<T>(&file)?);
        }
        Ok(out)
    } else {
        read_json::<T>(path)
    }
}

pub fn load_topology_records(path: &Path) -> Result<Vec<NodeRecord>> {
    let records: Vec<NodeRecord> = load_records(path)
        .with_context(|| format!("failed to load topology from {}", path.display()))?;
    info!(nodes = records.len(), "loaded topology records");
    Ok(records)
}

pub fn load_requests(path: &Path) -> Result<Vec<RouteRequest>> {
    let requests: Vec<RouteRequest> = load_records(path)
        .with_context(|| format!("failed to load route requests from {}", path.display()))?;
    info!(requests = requests.len(), "loaded route requests");
    Ok(requests)
}

/// One comma-separated node list per line; line `i` belongs to request `i`.
/// Blank lines keep their position but carry no path.
pub fn load_reference_paths(path: &Path) -> Result<Vec<Option<Vec<String>>>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read reference paths {}", path.display()))?;
    Ok(raw
        .lines()
        .map(|line| {
            let ids: Vec<String> = line
                .split(',')
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect();
            (!ids.is_empty()).then_some(ids)
        })
        .collect())
}

/// Fills in reference paths for requests that do not carry one inline.
pub fn attach_reference_paths(requests: &mut [RouteRequest], paths: Vec<Option<Vec<String>>>) {
    for (request, path) in requests.iter_mut().zip(paths) {
        if request.reference_path.is_none() {
            request.reference_path = path;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let dir = std::env::temp_dir().join(format!(
            "proute-{tag}-{}-{nanos}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("scratch dir should be creatable");
        dir
    }

    #[test]
    fn loads_per_node_files_in_name_order() {
        let dir = scratch_dir("nodes");
        fs::write(
            dir.join("nio_2.json"),
            r#"{"as_number": "2", "geolocation": ["DE"], "lat": "50.1", "lon": "8.6", "connections": ["1"], "features": [false]}"#,
        )
        .expect("write fixture");
        fs::write(
            dir.join("nio_1.json"),
            r#"{"as_number": "1", "geolocation": ["NL"], "lat": "52.3", "lon": "4.9", "connections": ["2"], "features": [true]}"#,
        )
        .expect("write fixture");
        fs::write(dir.join("notes.txt"), "ignored").expect("write fixture");

        let records = load_topology_records(&dir).expect("records load");
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn loads_request_array_file() {
        let dir = scratch_dir("requests");
        let file = dir.join("requests.json");
        fs::write(
            &file,
            r#"[
                {"as_source": "1", "as_destination": "2"},
                {"as_source": "2", "as_destination": "1", "fallback_to_ebgp_if_no_path_found": "false"}
            ]"#,
        )
        .expect("write fixture");

        let requests = load_requests(&file).expect("requests load");
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].source, "2");
        assert!(!requests[1].fallback_on_failure);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn bad_request_field_reports_its_own_error() {
        let dir = scratch_dir("bad-flag");
        let file = dir.join("r.json");
        fs::write(
            &file,
            r#"{"as_source": "1", "as_destination": "2", "fallback_to_ebgp_if_no_path_found": "maybe"}"#,
        )
        .expect("write fixture");

        let err = load_requests(&file).expect_err("flag value is invalid");
        let message = format!("{err:#}");
        assert!(message.contains("invalid flag value"), "got {message}");
        assert!(message.contains("r.json"), "got {message}");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn bad_node_in_array_reports_its_own_error() {
        let dir = scratch_dir("bad-coordinate");
        let file = dir.join("nodes.json");
        fs::write(
            &file,
            r#"[{"as_number": "1", "lat": "north", "lon": "4.9", "connections": [], "features": []}]"#,
        )
        .expect("write fixture");

        let err = load_topology_records(&file).expect_err("coordinate is invalid");
        let message = format!("{err:#}");
        assert!(message.contains("invalid coordinate"), "got {message}");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn reference_paths_attach_by_position() {
        let dir = scratch_dir("reference");
        let file = dir.join("chosen_as_paths.csv");
        fs::write(&file, "1,3,2\n\n2,1\n").expect("write fixture");

        let paths = load_reference_paths(&file).expect("paths load");
        assert_eq!(paths.len(), 3);
        assert!(paths[1].is_none());

        let mut requests = vec![
            RouteRequest::new("1", "2"),
            RouteRequest::new("1", "2"),
            RouteRequest::new("2", "1"),
        ];
        requests[2].reference_path = Some(vec!["2".into(), "9".into(), "1".into()]);
        attach_reference_paths(&mut requests, paths);

        assert_eq!(
            requests[0].reference_path,
            Some(vec!["1".to_string(), "3".to_string(), "2".to_string()])
        );
        assert!(requests[1].reference_path.is_none());
        assert_eq!(requests[2].reference_path.as_ref().map(Vec::len), Some(3));

        fs::remove_dir_all(&dir).ok();
    }
}
