use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Client for the managed database's REST query surface.
///
/// Every operation is table-scoped: select with equality filters, ordering
/// and a row limit, insert of one or many rows, and filtered update/delete.
/// The caller supplies the project URL and one API key; `/rest/v1` is
/// appended here.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: Client,
    rest_url: String,
    api_key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SupabaseError {
    #[error("supabase request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("supabase error {code}: {message}")]
    Api { code: String, message: String },
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

fn parse_api_error(status: StatusCode, body: &str) -> SupabaseError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = if parsed.code.is_empty() {
        status.as_str().to_string()
    } else {
        parsed.code
    };
    let message = if parsed.message.is_empty() {
        if body.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        } else {
            body.to_string()
        }
    } else {
        parsed.message
    };
    SupabaseError::Api { code, message }
}

impl SupabaseClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: Client::new(),
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        }
    }

    pub fn table(&self, name: &str) -> TableRequest<'_> {
        TableRequest {
            client: self,
            table: name.to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    fn request(&self, method: Method, table: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }
}

/// One pending table operation. Filters apply to select, update and delete;
/// ordering and limit only affect select.
#[derive(Debug)]
pub struct TableRequest<'a> {
    client: &'a SupabaseClient,
    table: String,
    filters: Vec<(String, String)>,
    order: Option<String>,
    limit: Option<usize>,
}

impl TableRequest<'_> {
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order = Some(format!("{}.{}", column, direction));
        self
    }

    pub fn limit(mut self, count: usize) -> Self {
        self.limit = Some(count);
        self
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.filters.clone();
        if let Some(order) = &self.order {
            pairs.push(("order".to_string(), order.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }

    pub async fn select<T: DeserializeOwned>(self) -> Result<Vec<T>, SupabaseError> {
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        pairs.extend(self.query_pairs());

        let response = self
            .client
            .request(Method::GET, &self.table)
            .query(&pairs)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    pub async fn insert<T: Serialize, R: DeserializeOwned>(
        self,
        rows: &[T],
    ) -> Result<Vec<R>, SupabaseError> {
        let response = self
            .client
            .request(Method::POST, &self.table)
            .header("Prefer", "return=representation")
            .json(rows)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    pub async fn update<T: Serialize>(self, payload: &T) -> Result<(), SupabaseError> {
        let response = self
            .client
            .request(Method::PATCH, &self.table)
            .query(&self.query_pairs())
            .json(payload)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    pub async fn delete(self) -> Result<(), SupabaseError> {
        let response = self
            .client
            .request(Method::DELETE, &self.table)
            .query(&self.query_pairs())
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SupabaseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(parse_api_error(status, &body))
}
