use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::{database::models::job, jobs::DispatchError};

/// Where a job's destinations come from, decoded from its stored payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    StaticList(Vec<String>),
    Filter(BTreeMap<String, String>),
}

/// Turns a job into the list of destinations it should be dispatched to.
#[async_trait]
pub trait RecipientResolver: Send + Sync {
    async fn resolve(&self, job: &job::Model) -> Result<Vec<String>, DispatchError>;
}

/// Resolves static lists directly and filters against a recipient cache.
///
/// The cache is either a JSON array of objects or a CSV file with a header row.
/// Each record's `email` field is the destination and every other field can be
/// matched by a filter. When the cache
/// file does not exist a small built-in sample set is used.
#[derive(Debug, Clone)]
pub struct CachedRecipientResolver {
    cache_path: PathBuf,
}

impl CachedRecipientResolver {
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
        }
    }

    async fn resolve_filter(
        &self,
        filter: &BTreeMap<String, String>,
    ) -> Result<Vec<String>, DispatchError> {
        let records = self.load_cache().await?;

        if filter.is_empty() {
            warn!("Recipient filter is empty; returning every cached recipient");
            return Ok(records.iter().filter_map(record_email).collect());
        }

        let matched: Vec<String> = records
            .iter()
            .filter(|record| matches_filter(record, filter))
            .filter_map(record_email)
            .collect();

        if matched.is_empty() {
            return Err(DispatchError::RecipientResolution(
                "no cached recipients matched the provided filter".to_string(),
            ));
        }

        debug!("Filter {:?} matched {} recipient(s)", filter, matched.len());
        Ok(matched)
    }

    async fn load_cache(&self) -> Result<Vec<Map<String, Value>>, DispatchError> {
        if !tokio::fs::try_exists(&self.cache_path)
            .await
            .unwrap_or(false)
        {
            info!(
                "Recipient cache {} not found; using sample recipients",
                self.cache_path.display()
            );
            return Ok(sample_recipients());
        }

        let format = CacheFormat::from_path(&self.cache_path).ok_or_else(|| {
            DispatchError::RecipientResolution(format!(
                "unsupported recipient cache format: {}",
                self.cache_path.display()
            ))
        })?;

        let contents = tokio::fs::read_to_string(&self.cache_path)
            .await
            .map_err(|e| {
                DispatchError::RecipientResolution(format!(
                    "failed to read recipient cache {}: {e}",
                    self.cache_path.display()
                ))
            })?;

        match format {
            CacheFormat::Json => parse_json_cache(&contents),
            CacheFormat::Csv => parse_csv_cache(&contents),
        }
    }
}

#[async_trait]
impl RecipientResolver for CachedRecipientResolver {
    async fn resolve(&self, job: &job::Model) -> Result<Vec<String>, DispatchError> {
        let recipients = job.recipients().map_err(|e| {
            DispatchError::RecipientResolution(format!("malformed recipient payload: {e}"))
        })?;

        match recipients {
            Recipients::StaticList(list) => {
                if list.is_empty() {
                    return Err(DispatchError::RecipientResolution(
                        "static list job does not define any recipients".to_string(),
                    ));
                }
                Ok(list)
            }
            Recipients::Filter(filter) => self.resolve_filter(&filter).await,
        }
    }
}

fn parse_json_cache(contents: &str) -> Result<Vec<Map<String, Value>>, DispatchError> {
    let value: Value = serde_json::from_str(contents).map_err(|e| {
        DispatchError::RecipientResolution(format!("recipient cache is not valid JSON: {e}"))
    })?;

    let Value::Array(items) = value else {
        return Err(DispatchError::RecipientResolution(
            "JSON recipient cache must be a list of objects".to_string(),
        ));
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheFormat {
    Json,
    Csv,
}

impl CacheFormat {
    fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;

        if extension.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else if extension.eq_ignore_ascii_case("csv") {
            Some(Self::Csv)
        } else {
            None
        }
    }
}

/// A header row followed by one recipient per row; every column is text.
fn parse_csv_cache(contents: &str) -> Result<Vec<Map<String, Value>>, DispatchError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());

    reader
        .deserialize::<BTreeMap<String, String>>()
        .map(|row| {
            row.map(|fields| {
                fields
                    .into_iter()
                    .map(|(field, value)| (field, Value::String(value)))
                    .collect()
            })
            .map_err(|e| {
                DispatchError::RecipientResolution(format!("recipient cache is not valid CSV: {e}"))
            })
        })
        .collect()
}

fn record_email(record: &Map<String, Value>) -> Option<String> {
    match record.get("email") {
        Some(Value::String(email)) if !email.is_empty() => Some(email.clone()),
        _ => None,
    }
}

/// Every filter key must be present on the record with an equal textual value.
fn matches_filter(record: &Map<String, Value>, filter: &BTreeMap<String, String>) -> bool {
    filter.iter().all(|(field, expected)| {
        record
            .get(field)
            .is_some_and(|value| value_as_text(value) == *expected)
    })
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn sample_recipients() -> Vec<Map<String, Value>> {
    [
        ("demo+marketing@example.com", "marketing"),
        ("demo+sales@example.com", "sales"),
        ("demo+eng@example.com", "engineering"),
    ]
    .into_iter()
    .map(|(email, department)| {
        let mut record = Map::new();
        record.insert("email".to_string(), Value::String(email.to_string()));
        record.insert(
            "department".to_string(),
            Value::String(department.to_string()),
        );
        record
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::database::models::{
        job_status::JobStatus, recipient_source::RecipientSource, schedule_kind::ScheduleKind,
    };

    fn job_with(source: RecipientSource, recipients: Option<Value>, filter: Option<Value>) -> job::Model {
        let now = Utc::now();
        job::Model {
            id: Uuid::new_v4(),
            name: "newsletter".to_string(),
            template_name: "welcome".to_string(),
            schedule_kind: ScheduleKind::Immediate,
            run_at: None,
            cron_expression: None,
            recipient_source: source,
            recipients,
            recipient_filter: filter,
            next_run_at: Some(now),
            status: JobStatus::Scheduled,
            retry_count: 0,
            max_retries: 3,
            last_error: None,
            cancelled: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn write_cache(contents: &str, file_name: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(file_name);
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn test_static_list_is_returned_as_is() {
        let resolver = CachedRecipientResolver::new("does-not-exist.json");
        let job = job_with(
            RecipientSource::StaticList,
            Some(json!(["a@example.com", "b@example.com"])),
            None,
        );

        assert_eq!(
            resolver.resolve(&job).await.unwrap(),
            vec!["a@example.com", "b@example.com"]
        );
    }

    #[tokio::test]
    async fn test_empty_static_list_fails() {
        let resolver = CachedRecipientResolver::new("does-not-exist.json");
        let job = job_with(RecipientSource::StaticList, Some(json!([])), None);

        assert!(matches!(
            resolver.resolve(&job).await,
            Err(DispatchError::RecipientResolution(_))
        ));
    }

    #[tokio::test]
    async fn test_filter_uses_sample_records_without_cache_file() {
        let resolver = CachedRecipientResolver::new("does-not-exist.json");
        let job = job_with(
            RecipientSource::Filter,
            None,
            Some(json!({"department": "sales"})),
        );

        assert_eq!(
            resolver.resolve(&job).await.unwrap(),
            vec!["demo+sales@example.com"]
        );
    }

    #[tokio::test]
    async fn test_filter_against_cache_file() {
        let (_dir, path) = write_cache(
            r#"[
                {"email": "ana@example.com", "plan": "pro", "seats": 3},
                {"email": "bo@example.com", "plan": "free", "seats": 1},
                {"email": "cy@example.com", "plan": "pro", "seats": 1},
                {"plan": "pro", "seats": 1}
            ]"#,
            "recipients.json",
        );
        let resolver = CachedRecipientResolver::new(path);

        let pro = job_with(RecipientSource::Filter, None, Some(json!({"plan": "pro"})));
        assert_eq!(
            resolver.resolve(&pro).await.unwrap(),
            vec!["ana@example.com", "cy@example.com"]
        );

        let single_seat_pro = job_with(
            RecipientSource::Filter,
            None,
            Some(json!({"plan": "pro", "seats": "1"})),
        );
        assert_eq!(
            resolver.resolve(&single_seat_pro).await.unwrap(),
            vec!["cy@example.com"]
        );
    }

    #[tokio::test]
    async fn test_filter_without_matches_fails() {
        let resolver = CachedRecipientResolver::new("does-not-exist.json");
        let job = job_with(
            RecipientSource::Filter,
            None,
            Some(json!({"department": "legal"})),
        );

        assert!(matches!(
            resolver.resolve(&job).await,
            Err(DispatchError::RecipientResolution(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_filter_returns_every_cached_recipient() {
        let resolver = CachedRecipientResolver::new("does-not-exist.json");
        let job = job_with(RecipientSource::Filter, None, Some(json!({})));

        assert_eq!(resolver.resolve(&job).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_filter_against_csv_cache_file() {
        let (_dir, path) = write_cache(
            "email,plan,seats\nana@example.com,pro,3\nbo@example.com, free ,1\ncy@example.com,pro,1\n,pro,1\n",
            "recipients.CSV",
        );
        let resolver = CachedRecipientResolver::new(path);

        let pro = job_with(RecipientSource::Filter, None, Some(json!({"plan": "pro"})));
        assert_eq!(
            resolver.resolve(&pro).await.unwrap(),
            vec!["ana@example.com", "cy@example.com"]
        );

        let free = job_with(RecipientSource::Filter, None, Some(json!({"plan": "free"})));
        assert_eq!(resolver.resolve(&free).await.unwrap(), vec!["bo@example.com"]);

        let everyone = job_with(RecipientSource::Filter, None, Some(json!({})));
        assert_eq!(resolver.resolve(&everyone).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_caches_fail() {
        let (_dir, object) = write_cache(r#"{"email": "x@example.com"}"#, "cache.json");
        let (_csv_dir, ragged) = write_cache("email,plan\nx@example.com,pro,extra\n", "cache.csv");
        let (_txt_dir, text) = write_cache("x@example.com\n", "cache.txt");
        let job = job_with(RecipientSource::Filter, None, Some(json!({})));

        for path in [object, ragged, text] {
            assert!(matches!(
                CachedRecipientResolver::new(path).resolve(&job).await,
                Err(DispatchError::RecipientResolution(_))
            ));
        }
    }
}
