//! Implements the `Sheet` trait using the `sheets::Client` to interact with a Google sheet.

use crate::api::{Sheet, SheetRange, TokenProvider};
use crate::error::Res;
use crate::model::{RawCell, RawRow};
use anyhow::{anyhow, bail, Context};
use reqwest::Url;
use sheets::types::{DateTimeRenderOption, Dimension, ValueRenderOption};
use sheets::ClientError;
use tracing::trace;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Implements the `Sheet` trait against the Sheets v4 API. Reads go through the `sheets` client.
/// Appends use the REST endpoint directly so that numbers are sent as JSON numbers. It takes a
/// `TokenProvider`, on which it calls refresh to keep the token up-to-date.
pub(crate) struct GoogleSheet {
    spreadsheet_id: String,
    token_provider: TokenProvider,
    http: reqwest::Client,
}

impl GoogleSheet {
    pub(crate) fn new(spreadsheet_id: impl Into<String>, token_provider: TokenProvider) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            token_provider,
            http: reqwest::Client::new(),
        }
    }

    fn append_url(&self, tab: &str) -> Res<Url> {
        let mut url = Url::parse(SHEETS_API).context("Invalid Sheets API URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("The Sheets API URL cannot take path segments"))?
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&format!("{}:append", SheetRange::whole(tab).a1()));
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");
        Ok(url)
    }
}

#[async_trait::async_trait]
impl Sheet for GoogleSheet {
    async fn get(&mut self, range: &SheetRange) -> Res<Vec<RawRow>> {
        trace!("get for {range}");
        let client = create_sheets_client(&mut self.token_provider).await?;
        let response = client
            .spreadsheets()
            .values_get(
                &self.spreadsheet_id,
                &range.a1(),
                DateTimeRenderOption::FormattedString,
                Dimension::Rows,
                ValueRenderOption::FormattedValue,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to fetch {range}"))?;
        Ok(response
            .body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(text_cell).collect())
            .collect())
    }

    async fn append(&mut self, tab: &str, row: &RawRow) -> Res<()> {
        trace!("append to {tab}");
        let token = self.token_provider.token_with_refresh().await?;
        let url = self.append_url(tab)?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&serde_json::json!({
                "majorDimension": "ROWS",
                "values": [row],
            }))
            .send()
            .await
            .with_context(|| format!("Failed to send append request for {tab}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            bail!("Append to {tab} failed with status {status}: {body}");
        }
        Ok(())
    }
}

/// Formatted values always arrive as strings. An empty string is an empty cell.
fn text_cell(value: String) -> RawCell {
    if value.is_empty() {
        RawCell::Empty
    } else {
        RawCell::Text(value)
    }
}

/// Creates a new sheets client with a refreshed access token.
async fn create_sheets_client(token_provider: &mut TokenProvider) -> Res<sheets::Client> {
    let access_token = token_provider.token_with_refresh().await?;

    // The sheets crate wants OAuth client settings, but API calls only need the access token
    Ok(sheets::Client::new(
        String::new(),
        String::new(),
        String::new(),
        access_token,
        String::new(),
    ))
}

fn map_client_error(e: ClientError) -> anyhow::Error {
    let error_name = match &e {
        ClientError::EmptyRefreshToken => "EmptyRefreshToken".to_string(),
        ClientError::FromUtf8Error(inner) => format!("FromUtf8Error {inner}"),
        ClientError::UrlParserError(inner) => format!("UrlParserError {inner}"),
        ClientError::SerdeJsonError(inner) => format!("SerdeJsonError {inner}"),
        ClientError::ReqwestError(inner) => format!("ReqwestError {inner}"),
        ClientError::InvalidHeaderValue(inner) => format!("InvalidHeaderValue {inner}"),
        ClientError::ReqwestMiddleWareError(inner) => format!("ReqwestMiddleWareError {inner}"),
        ClientError::HttpError { .. } => "HttpError".to_string(),
        ClientError::Other(_) => "Other".to_string(),
    };
    anyhow::Error::new(e).context(error_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ServiceAccountKey;

    #[test]
    fn test_append_url_quotes_and_encodes_tab() {
        let provider = TokenProvider::new(ServiceAccountKey::new("a@b.c", "k"));
        let sheet = GoogleSheet::new("SHEET123", provider);
        let url = sheet.append_url("9월").unwrap();
        let s = url.as_str();
        assert!(s.starts_with("https://sheets.googleapis.com/v4/spreadsheets/SHEET123/values/"));
        assert!(s.contains("%279%EC%9B%94%27:append") || s.contains("'9%EC%9B%94':append"));
        assert!(s.ends_with("?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS"));
    }

    #[test]
    fn test_text_cell() {
        assert_eq!(text_cell(String::new()), RawCell::Empty);
        assert_eq!(text_cell("₩15,000".into()), RawCell::Text("₩15,000".into()));
    }
}
