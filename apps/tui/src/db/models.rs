use sqlx::FromRow;

/// A stored response row in the `cache_entry` table
#[derive(Debug, FromRow, Clone)]
pub struct CacheEntryRecord {
    pub cache_name: String,
    pub url: String,
    pub status: i64,
    pub status_text: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

/// Response payload as the offline layer hands it out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub status_text: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    pub fn service_unavailable(body: &str) -> Self {
        Self {
            status: 503,
            status_text: "Service Unavailable".to_string(),
            content_type: Some("text/plain".to_string()),
            body: body.as_bytes().to_vec(),
        }
    }

    pub const fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl From<CacheEntryRecord> for CachedResponse {
    fn from(record: CacheEntryRecord) -> Self {
        Self {
            status: u16::try_from(record.status).unwrap_or(500),
            status_text: record.status_text,
            content_type: record.content_type,
            body: record.body,
        }
    }
}
