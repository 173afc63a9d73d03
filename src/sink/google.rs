use std::cell::RefCell;
use std::time::Duration;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::blocking::{Client, Response};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::remote::{RemoteError, SheetsApi, Worksheet};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ERROR_BODY_LIMIT: usize = 300;

pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_ACCESS_TOKEN";
pub const CREDENTIALS_ENV: &str = "GOOGLE_CREDENTIALS";

/// How requests get authorized.
#[derive(Clone)]
pub enum Credentials {
    /// A bearer token issued elsewhere.
    AccessToken(String),
    /// A service-account key file's JSON, exchanged for a token on first use.
    ServiceAccountJson(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::AccessToken(_) => f.write_str("AccessToken(..)"),
            Credentials::ServiceAccountJson(_) => f.write_str("ServiceAccountJson(..)"),
        }
    }
}

impl Credentials {
    /// `None` when neither variable is set (or both are blank).
    pub fn from_env() -> Option<Credentials> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        var(ACCESS_TOKEN_ENV)
            .map(Credentials::AccessToken)
            .or_else(|| var(CREDENTIALS_ENV).map(Credentials::ServiceAccountJson))
    }
}

#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    title: String,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    frozen_row_count: u32,
}

impl From<SheetProperties> for Worksheet {
    fn from(p: SheetProperties) -> Self {
        Worksheet {
            sheet_id: p.sheet_id,
            title: p.title,
            frozen_rows: p.grid_properties.frozen_row_count,
        }
    }
}

/// Google Sheets REST v4 over a blocking client.
pub struct GoogleSheetsClient {
    client: Client,
    credentials: Credentials,
    token: RefCell<Option<String>>,
}

impl GoogleSheetsClient {
    pub fn new(credentials: Credentials, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(GoogleSheetsClient {
            client,
            credentials,
            token: RefCell::new(None),
        })
    }

    fn bearer(&self) -> Result<String, RemoteError> {
        if let Some(token) = self.token.borrow().as_ref() {
            return Ok(token.clone());
        }
        let token = match &self.credentials {
            Credentials::AccessToken(t) => t.trim().to_string(),
            Credentials::ServiceAccountJson(json) => self.exchange_service_account(json)?,
        };
        *self.token.borrow_mut() = Some(token.clone());
        Ok(token)
    }

    fn exchange_service_account(&self, json: &str) -> Result<String, RemoteError> {
        let key: ServiceAccountKey = serde_json::from_str(json)
            .map_err(|e| RemoteError::Auth(format!("invalid service account JSON: {}", e)))?;

        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &key.client_email,
            scope: SCOPE,
            aud: &key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| RemoteError::Auth(format!("invalid private key: {}", e)))?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| RemoteError::Auth(format!("cannot sign assertion: {}", e)))?;

        let response = self
            .client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_GRANT), ("assertion", assertion.as_str())])
            .send()?;
        let token: TokenResponse = ensure_success(response)
            .map_err(|e| RemoteError::Auth(e.to_string()))?
            .json()?;

        info!(account = %key.client_email, "service account token issued");
        Ok(token.access_token)
    }

    fn batch_update(&self, spreadsheet_id: &str, body: serde_json::Value) -> Result<serde_json::Value, RemoteError> {
        let url = format!("{}/{}:batchUpdate", SHEETS_API, spreadsheet_id);
        let response = self
            .client
            .post(url)
            .bearer_auth(self.bearer()?)
            .json(&body)
            .send()?;
        Ok(ensure_success(response)?.json()?)
    }
}

impl SheetsApi for GoogleSheetsClient {
    fn find_worksheet(&self, spreadsheet_id: &str, title: &str) -> Result<Option<Worksheet>, RemoteError> {
        let url = format!("{}/{}", SHEETS_API, spreadsheet_id);
        let response = self
            .client
            .get(url)
            .bearer_auth(self.bearer()?)
            .query(&[("fields", "sheets.properties(sheetId,title,gridProperties.frozenRowCount)")])
            .send()?;
        let meta: SpreadsheetMeta = ensure_success(response)?.json()?;
        debug!(sheets = meta.sheets.len(), "spreadsheet metadata loaded");

        Ok(meta
            .sheets
            .into_iter()
            .map(|s| s.properties)
            .find(|p| p.title == title)
            .map(Worksheet::from))
    }

    fn add_worksheet(&self, spreadsheet_id: &str, title: &str, rows: u32, cols: u32) -> Result<Worksheet, RemoteError> {
        let reply = self.batch_update(spreadsheet_id, add_sheet_body(title, rows, cols))?;
        let properties = reply
            .pointer("/replies/0/addSheet/properties")
            .cloned()
            .ok_or_else(|| RemoteError::Response("addSheet reply without properties".to_string()))?;
        let properties: SheetProperties =
            serde_json::from_value(properties).map_err(|e| RemoteError::Response(e.to_string()))?;
        Ok(properties.into())
    }

    fn append_row(&self, spreadsheet_id: &str, worksheet: &Worksheet, values: &[String]) -> Result<(), RemoteError> {
        let url = append_url(spreadsheet_id, &worksheet.title)?;
        let response = self
            .client
            .post(url)
            .bearer_auth(self.bearer()?)
            .query(APPEND_QUERY)
            .json(&append_body(values))
            .send()?;
        ensure_success(response)?;
        Ok(())
    }

    fn sort_desc_by_first_column(&self, spreadsheet_id: &str, worksheet: &Worksheet) -> Result<(), RemoteError> {
        self.batch_update(spreadsheet_id, sort_desc_body(worksheet))?;
        Ok(())
    }
}

/// Values are parsed as if typed by a user; new rows are inserted, never
/// written over existing cells.
const APPEND_QUERY: &[(&str, &str)] = &[
    ("valueInputOption", "USER_ENTERED"),
    ("insertDataOption", "INSERT_ROWS"),
];

fn add_sheet_body(title: &str, rows: u32, cols: u32) -> serde_json::Value {
    json!({
        "requests": [{
            "addSheet": {
                "properties": {
                    "title": title,
                    "gridProperties": { "rowCount": rows, "columnCount": cols }
                }
            }
        }]
    })
}

fn append_body(values: &[String]) -> serde_json::Value {
    json!({ "values": [values] })
}

/// Column A descending, leaving frozen header rows where they are.
fn sort_desc_body(worksheet: &Worksheet) -> serde_json::Value {
    json!({
        "requests": [{
            "sortRange": {
                "range": {
                    "sheetId": worksheet.sheet_id,
                    "startRowIndex": worksheet.frozen_rows
                },
                "sortSpecs": [{ "dimensionIndex": 0, "sortOrder": "DESCENDING" }]
            }
        }]
    })
}

/// `…/{id}/values/'{title}'!A1:append`, with the title quoted for A1 notation
/// and percent-encoded as a path segment.
fn append_url(spreadsheet_id: &str, title: &str) -> Result<Url, RemoteError> {
    let mut url = Url::parse(SHEETS_API).map_err(|e| RemoteError::Response(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| RemoteError::Response("base URL cannot take path segments".to_string()))?
        .push(spreadsheet_id)
        .push("values")
        .push(&format!("{}!A1:append", quote_sheet_title(title)));
    Ok(url)
}

fn quote_sheet_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn ensure_success(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body: String = response
        .text()
        .unwrap_or_default()
        .chars()
        .take(ERROR_BODY_LIMIT)
        .collect();
    Err(RemoteError::Api {
        status: status.as_u16(),
        body,
    })
}
