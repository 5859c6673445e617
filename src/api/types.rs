//! Backend request and response shapes.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Business code the backend uses for success.
pub const API_SUCCESS_CODE: i64 = 200;

/// Response envelope shared by every backend route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope {
    /// Business code, [`API_SUCCESS_CODE`] on success.
    pub code: i64,
    /// Optional message, shown to the user on failure.
    #[serde(default)]
    pub message: Option<String>,
    /// Route-specific payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ApiEnvelope {
    /// Decode the payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the payload has the wrong shape.
    pub fn data<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.data.clone()).map_err(Error::from)
    }
}

/// One page of the memo list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MemoPage {
    /// Total memos owned by the user.
    #[serde(default)]
    pub total: u64,
}

/// Memo list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoQuery {
    /// 1-based page.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Optional search term.
    pub keyword: Option<String>,
}

impl Default for MemoQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            keyword: None,
        }
    }
}

impl MemoQuery {
    /// Query string pairs; an empty keyword is left out.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.to_string()), ("limit", self.limit.to_string())];
        if let Some(keyword) = self.keyword.as_deref().filter(|k| !k.is_empty()) {
            pairs.push(("keyword", keyword.to_string()));
        }
        pairs
    }
}

/// Credit balance payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BalancePayload {
    /// Current balance.
    #[serde(default)]
    pub balance: u64,
}

/// Credit top-up request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RechargeRequest {
    /// Credits to add.
    pub amount: u64,
    /// Purchase transaction backing the top-up.
    pub transaction_id: String,
    /// Origin, e.g. `purchase` or `gift`.
    pub source: String,
}

/// Credit spend request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeductRequest {
    /// Credits to spend.
    pub amount: u64,
    /// What the credits were spent on.
    pub reason: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_data() {
        let envelope: ApiEnvelope =
            serde_json::from_value(json!({"code": 200, "data": {"total": 7}})).unwrap();
        assert_eq!(envelope.message, None);
        assert_eq!(envelope.data::<MemoPage>().unwrap().total, 7);
        assert!(envelope.data::<Vec<u8>>().is_err());
    }

    #[test]
    fn test_memo_query_pairs() {
        let query = MemoQuery::default();
        assert_eq!(
            query.to_pairs(),
            vec![("page", "1".to_string()), ("limit", "10".to_string())]
        );

        let query = MemoQuery {
            keyword: Some("shopping list".to_string()),
            ..MemoQuery::default()
        };
        assert_eq!(query.to_pairs()[2], ("keyword", "shopping list".to_string()));

        let query = MemoQuery {
            keyword: Some(String::new()),
            ..MemoQuery::default()
        };
        assert_eq!(query.to_pairs().len(), 2);
    }

    #[test]
    fn test_recharge_field_names() {
        let request = RechargeRequest {
            amount: 6,
            transaction_id: "T1".to_string(),
            source: "purchase".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"amount": 6, "transactionId": "T1", "source": "purchase"})
        );
    }
}
