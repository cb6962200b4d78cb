use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// Keyset cursor over (created_at, id); consumed with a strict tuple
// comparison so pages stay stable under concurrent inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

impl PageCursor {
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(format!("{}|{}", self.created_at.to_rfc3339(), self.id))
    }

    pub fn decode(raw: &str) -> Result<Self, String> {
        let bytes = URL_SAFE_NO_PAD
            .decode(raw)
            .map_err(|_| "invalid cursor encoding".to_string())?;
        let decoded =
            String::from_utf8(bytes).map_err(|_| "invalid cursor encoding".to_string())?;

        let (created_at, id) = decoded
            .split_once('|')
            .ok_or_else(|| "malformed cursor".to_string())?;

        let created_at = DateTime::parse_from_rfc3339(created_at)
            .map_err(|_| "malformed cursor timestamp".to_string())?
            .with_timezone(&Utc);
        let id = Uuid::parse_str(id).map_err(|_| "malformed cursor id".to_string())?;

        Ok(Self { created_at, id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let cursor = PageCursor {
            created_at: Utc::now(),
            id: Uuid::new_v4(),
        };

        let decoded = PageCursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn rejects_garbage() {
        assert!(PageCursor::decode("not base64 at all!!").is_err());

        let missing_separator = URL_SAFE_NO_PAD.encode("2024-01-01T00:00:00Z");
        assert!(PageCursor::decode(&missing_separator).is_err());

        let bad_id = URL_SAFE_NO_PAD.encode("2024-01-01T00:00:00Z|not-a-uuid");
        assert!(PageCursor::decode(&bad_id).is_err());
    }
}
