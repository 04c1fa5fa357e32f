use chrono::Utc;
use reqwest::{Client, Url, header};
use serde::{Deserialize, Serialize};

use crate::{
    Error, Result, SchoolDescriptor,
    http::{self, HttpClientBuilder},
};

pub const SCHOOL_SEARCH_URL: &str = "https://mobile.webuntis.com/ms/schoolquery2";

#[derive(Serialize)]
struct RpcRequest<'a> {
    id: String,
    method: &'static str,
    params: [SearchParams<'a>; 1],
    jsonrpc: &'static str,
}

#[derive(Serialize)]
struct SearchParams<'a> {
    search: &'a str,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<SearchResult>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    schools: Option<Vec<SchoolDescriptor>>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: Option<i64>,
    message: Option<String>,
}

/// Stateless JSON-RPC lookup of schools by name, town or address.
pub struct SchoolSearch {
    client: Client,
    endpoint: Url,
}

impl SchoolSearch {
    pub fn new() -> Result<Self> {
        let endpoint = Url::parse(SCHOOL_SEARCH_URL)
            .map_err(|e| Error::Config(format!("Invalid school search URL: {e}")))?;
        Ok(Self::with_client(HttpClientBuilder::new().build()?, endpoint))
    }

    pub fn with_client(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SchoolDescriptor>> {
        tracing::info!("Searching schools matching '{}'", query);

        let request = RpcRequest {
            id: format!("wu_schulsuche-{}", Utc::now().timestamp_millis()),
            method: "searchSchool",
            params: [SearchParams { search: query }],
            jsonrpc: "2.0",
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(header::ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(http::handle_error_req)?;

        let response = http::ensure_success("school search", response).await?;
        let body = response.text().await.map_err(http::handle_error_req)?;
        let schools = parse_search_response(&body)?;

        tracing::info!("School search returned {} results", schools.len());
        Ok(schools)
    }
}

fn parse_search_response(body: &str) -> Result<Vec<SchoolDescriptor>> {
    let payload: RpcResponse = serde_json::from_str(body)?;

    if let Some(error) = payload.error {
        let message = error
            .message
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(Error::SchoolSearch(match error.code {
            Some(code) => format!("{message} (code {code})"),
            None => message,
        }));
    }

    payload
        .result
        .ok_or_else(|| Error::wire("result", "missing from search response"))?
        .schools
        .ok_or_else(|| Error::wire("result.schools", "missing from search response"))
}
