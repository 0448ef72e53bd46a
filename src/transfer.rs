use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::error::ImportError;
use crate::models::{Application, Contact};

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Parse an import file. Pure: nothing is replaced until the records are
/// handed to `Tracker::commit_import`.
pub fn parse_import_file(bytes: &[u8]) -> Result<Vec<Application>, ImportError> {
    let value: Value = serde_json::from_slice(bytes)?;
    parse_document(value)
}

/// Turn a parsed applications document into normalized records. Shared by
/// import and by loading the persisted collection.
pub fn parse_document(value: Value) -> Result<Vec<Application>, ImportError> {
    let items = match value {
        Value::Array(items) => items,
        other => return Err(ImportError::NotArray(json_kind(&other))),
    };

    let mut seen = HashSet::with_capacity(items.len());
    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let record =
            normalize_record(item).map_err(|source| ImportError::InvalidRecord { index, source })?;
        if !seen.insert(record.id.clone()) {
            return Err(ImportError::DuplicateId {
                index,
                id: record.id,
            });
        }
        records.push(record);
    }
    Ok(records)
}

/// Coerce the loosely-typed fields of one record before typing it. A missing
/// or non-array `contacts` becomes empty and unreadable contacts are dropped
/// from an array. A non-boolean `favorite` becomes false, and a missing id
/// gets a fresh one.
pub fn normalize_record(mut value: Value) -> Result<Application, serde_json::Error> {
    if let Value::Object(map) = &mut value {
        normalize_fields(map);
    }
    serde_json::from_value(value)
}

fn normalize_fields(map: &mut Map<String, Value>) {
    let contacts = match map.remove("contacts") {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter(|item| serde_json::from_value::<Contact>(item.clone()).is_ok())
            .collect(),
        _ => Vec::new(),
    };
    map.insert("contacts".to_string(), Value::Array(contacts));

    if !map.get("favorite").is_some_and(Value::is_boolean) {
        map.insert("favorite".to_string(), Value::Bool(false));
    }

    if matches!(map.get("id"), None | Some(Value::Null)) {
        map.insert("id".to_string(), Value::String(new_id()));
    }
}

/// The export document: the whole collection, pretty-printed with two-space
/// indentation.
pub fn export_document(applications: &[Application]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(applications)
}

pub fn export_filename(date: NaiveDate) -> String {
    format!("job-applications-{}.json", date.format("%Y-%m-%d"))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use serde_json::json;

    fn sample() -> Value {
        json!([
            {
                "id": "a1",
                "company": "Acme",
                "position": "Backend Engineer",
                "location": "Berlin",
                "status": "INTERVIEWING",
                "source": "LINKEDIN",
                "jobUrl": "https://acme.example/jobs/42",
                "appliedDate": "2024-01-10",
                "notes": "second round on Friday",
                "contacts": [{ "name": "Dana", "role": "Recruiter" }],
                "favorite": true
            },
            {
                "id": "b2",
                "company": "Globex",
                "position": "SRE",
                "location": "Remote",
                "status": "APPLIED",
                "source": "REFERRAL",
                "appliedDate": "2024-01-07",
                "notes": "",
                "contacts": [],
                "favorite": false
            }
        ])
    }

    #[test]
    fn parses_well_formed_document() {
        let bytes = serde_json::to_vec(&sample()).unwrap();
        let records = parse_import_file(&bytes).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "a1");
        assert_eq!(records[0].details.status, Status::Interviewing);
        assert_eq!(records[0].details.contacts[0].role.as_deref(), Some("Recruiter"));
        assert!(records[0].details.favorite);
    }

    #[test]
    fn export_import_export_is_identical() {
        let bytes = serde_json::to_vec(&sample()).unwrap();
        let first = export_document(&parse_import_file(&bytes).unwrap()).unwrap();
        let second = export_document(&parse_import_file(first.as_bytes()).unwrap()).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("[\n  {\n    \"id\": \"a1\""));
    }

    #[test]
    fn normalizing_normalized_records_changes_nothing() {
        let records = parse_document(sample()).unwrap();
        let again = parse_document(serde_json::to_value(&records).unwrap()).unwrap();
        assert_eq!(records, again);
    }

    #[test]
    fn coerces_contacts_and_favorite() {
        let doc = json!([
            { "id": "x", "company": "A", "position": "B", "location": "C",
              "appliedDate": "2024-02-01", "favorite": "yes" },
            { "id": "y", "company": "A", "position": "B", "location": "C",
              "appliedDate": "2024-02-01", "contacts": "nobody", "favorite": 1 },
            { "id": "z", "company": "A", "position": "B", "location": "C",
              "appliedDate": "2024-02-01", "contacts": [{ "role": "no name" }] }
        ]);
        let records = parse_document(doc).unwrap();
        for record in &records {
            assert!(record.details.contacts.is_empty());
            assert!(!record.details.favorite);
        }
        assert_eq!(records[0].details.notes, "");
        assert_eq!(records[0].details.status, Status::Applied);
        assert_eq!(records[0].details.source, "OTHER");
    }

    #[test]
    fn keeps_readable_contacts_when_one_is_bad() {
        let doc = json!([
            { "id": "m", "company": "A", "position": "B", "location": "C",
              "appliedDate": "2024-02-01",
              "contacts": [
                  { "name": "Dana", "role": "Recruiter" },
                  { "name": "Lee", "phone": 5551234 },
                  { "name": "Sam" }
              ] }
        ]);
        let records = parse_document(doc).unwrap();
        let names: Vec<&str> = records[0]
            .details
            .contacts
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, ["Dana", "Sam"]);
        assert_eq!(records[0].details.contacts[0].role.as_deref(), Some("Recruiter"));
    }

    #[test]
    fn assigns_id_when_missing() {
        let doc = json!([
            { "company": "A", "position": "B", "location": "C", "appliedDate": "2024-02-01" },
            { "company": "D", "position": "E", "location": "F", "appliedDate": "2024-02-02" }
        ]);
        let records = parse_document(doc).unwrap();
        assert!(!records[0].id.is_empty());
        assert_ne!(records[0].id, records[1].id);
    }

    #[test]
    fn rejects_invalid_json() {
        let err = parse_import_file(b"[{ \"id\": ").unwrap_err();
        assert!(matches!(err, ImportError::Json(_)));
    }

    #[test]
    fn rejects_non_array_document() {
        let err = parse_import_file(b"{\"applications\": []}").unwrap_err();
        assert!(matches!(err, ImportError::NotArray("an object")));
    }

    #[test]
    fn rejects_record_missing_required_field() {
        let doc = json!([{ "id": "a", "company": "A", "location": "C", "appliedDate": "2024-02-01" }]);
        let err = parse_document(doc).unwrap_err();
        assert!(matches!(err, ImportError::InvalidRecord { index: 0, .. }));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let doc = json!([
            { "id": "same", "company": "A", "position": "B", "location": "C", "appliedDate": "2024-02-01" },
            { "id": "same", "company": "D", "position": "E", "location": "F", "appliedDate": "2024-02-02" }
        ]);
        let err = parse_document(doc).unwrap_err();
        assert!(matches!(err, ImportError::DuplicateId { index: 1, .. }));
    }

    #[test]
    fn filename_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(export_filename(date), "job-applications-2024-03-05.json");
    }
}
