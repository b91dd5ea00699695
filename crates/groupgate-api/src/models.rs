//! Directory API wire models.

use groupgate_core::DirectoryRecord;
use serde::{Deserialize, Serialize};

/// Response body of a directory API search.
///
/// ```json
/// {"message": [{"dn": "...", "memberOf": ["CN=...,OU=...", "..."]}]}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEnvelope {
    /// Matching records; an empty list means nothing matched.
    pub message: Vec<DirectoryRecord>,
}

impl SearchEnvelope {
    /// Unwraps the records.
    #[must_use]
    pub fn into_records(self) -> Vec<DirectoryRecord> {
        self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_records_in_order() {
        let body = serde_json::json!({
            "message": [{
                "dn": "CN=John Doe,OU=People,DC=a,DC=com",
                "controls": [],
                "cn": "John Doe",
                "sAMAccountName": "jdoe",
                "mail": "jdoe@a.com",
                "memberOf": ["CN=b,OU=Groups,DC=a,DC=com", "CN=a,OU=Groups,DC=a,DC=com"]
            }]
        });

        let envelope: SearchEnvelope = serde_json::from_value(body).unwrap();
        let records = envelope.into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].account_name, "jdoe");
        assert_eq!(
            records[0].member_of,
            vec!["CN=b,OU=Groups,DC=a,DC=com", "CN=a,OU=Groups,DC=a,DC=com"]
        );
    }

    #[test]
    fn empty_message_is_valid() {
        let envelope: SearchEnvelope = serde_json::from_str(r#"{"message": []}"#).unwrap();
        assert!(envelope.message.is_empty());
    }

    #[test]
    fn missing_message_is_rejected() {
        assert!(serde_json::from_str::<SearchEnvelope>(r#"{"records": []}"#).is_err());
        assert!(serde_json::from_str::<SearchEnvelope>("[]").is_err());
    }
}
