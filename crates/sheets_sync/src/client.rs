use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::{HEADERS, RowSink, SheetRow, SyncError};

const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

/// Where the rows go and how to authenticate.
#[derive(Clone, Debug, Default)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub worksheet: String,
    /// Service-account key as inline JSON. Takes precedence over the file.
    pub credentials_json: Option<String>,
    pub credentials_file: Option<PathBuf>,
}

impl SheetsConfig {
    /// Whether there is enough configuration to talk to the spreadsheet.
    pub fn is_complete(&self) -> bool {
        !self.spreadsheet_id.trim().is_empty()
            && (self
                .credentials_json
                .as_deref()
                .is_some_and(|json| !json.trim().is_empty())
                || self.credentials_file.is_some())
    }
}

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
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
    expires_in: i64,
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
struct Worksheet {
    title: String,
    sheet_id: i64,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Google Sheets v4 client authenticated with a service account.
pub struct GoogleSheetsClient {
    http: reqwest::Client,
    client_email: String,
    token_uri: String,
    key: EncodingKey,
    spreadsheet_id: String,
    worksheet: String,
    token: Mutex<Option<CachedToken>>,
    resolved: Mutex<Option<Worksheet>>,
}

impl GoogleSheetsClient {
    /// Load the service-account key from `config`. No network call is made.
    pub async fn from_config(config: &SheetsConfig) -> Result<Self, SyncError> {
        let raw = match (&config.credentials_json, &config.credentials_file) {
            (Some(json), _) if !json.trim().is_empty() => json.clone(),
            (_, Some(path)) => tokio::fs::read_to_string(path).await?,
            _ => {
                return Err(SyncError::Credentials(
                    "no service account credentials configured".to_string(),
                ));
            }
        };

        let account: ServiceAccountKey = serde_json::from_str(&raw).map_err(|err| {
            SyncError::Credentials(format!("invalid service account json: {err}"))
        })?;
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())?;

        Ok(Self {
            http: reqwest::Client::new(),
            client_email: account.client_email,
            token_uri: account
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            key,
            spreadsheet_id: config.spreadsheet_id.clone(),
            worksheet: config.worksheet.clone(),
            token: Mutex::new(None),
            resolved: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, SyncError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at > Utc::now() + Duration::seconds(60)
        {
            return Ok(token.value.clone());
        }

        let now = Utc::now();
        let claims = Claims {
            iss: &self.client_email,
            scope: SCOPE,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)?;

        let res = self
            .http
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;
        let token: TokenResponse = check(res).await?.json().await?;

        tracing::debug!("obtained spreadsheet access token");
        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        });
        Ok(value)
    }

    fn url(&self, suffix: &str) -> Result<Url, SyncError> {
        let mut url = Url::parse(SHEETS_BASE)
            .map_err(|err| SyncError::Credentials(format!("invalid api url: {err}")))?;
        url.path_segments_mut()
            .map_err(|()| SyncError::Credentials("invalid api url".to_string()))?
            .pop_if_empty()
            .push(&format!("{}{suffix}", self.spreadsheet_id));
        Ok(url)
    }

    fn values_url(&self, range: &str, suffix: &str) -> Result<Url, SyncError> {
        let mut url = self.url("")?;
        url.path_segments_mut()
            .map_err(|()| SyncError::Credentials("invalid api url".to_string()))?
            .push("values")
            .push(&format!("{range}{suffix}"));
        Ok(url)
    }

    /// The configured worksheet, or the first one when it does not exist.
    async fn worksheet(&self) -> Result<Worksheet, SyncError> {
        let mut resolved = self.resolved.lock().await;
        if let Some(sheet) = resolved.as_ref() {
            return Ok(sheet.clone());
        }

        let mut url = self.url("")?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties");
        let token = self.access_token().await?;
        let res = self.http.get(url).bearer_auth(token).send().await?;
        let body: Value = check(res).await?.json().await?;

        let sheets: Vec<Worksheet> = body["sheets"]
            .as_array()
            .map(|sheets| {
                sheets
                    .iter()
                    .filter_map(|sheet| {
                        let props = &sheet["properties"];
                        Some(Worksheet {
                            title: props["title"].as_str()?.to_string(),
                            sheet_id: props["sheetId"].as_i64()?,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let sheet = match sheets.iter().find(|s| s.title == self.worksheet) {
            Some(sheet) => sheet.clone(),
            None => {
                let first = sheets
                    .first()
                    .cloned()
                    .ok_or_else(|| SyncError::WorksheetNotFound(self.worksheet.clone()))?;
                tracing::warn!(
                    "worksheet '{}' not found, using '{}'",
                    self.worksheet,
                    first.title
                );
                first
            }
        };
        *resolved = Some(sheet.clone());
        Ok(sheet)
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<Value>>, SyncError> {
        let url = self.values_url(range, "")?;
        let token = self.access_token().await?;
        let res = self.http.get(url).bearer_auth(token).send().await?;
        let body: ValueRange = check(res).await?.json().await?;
        Ok(body.values)
    }
}

impl RowSink for GoogleSheetsClient {
    async fn prepare(&self) -> Result<(), SyncError> {
        let sheet = self.worksheet().await?;
        let first = self.get_values(&a1(&sheet.title, "A1:H1")).await?;
        let has_header = first
            .first()
            .and_then(|row| row.first())
            .and_then(Value::as_str)
            .is_some_and(|cell| !cell.is_empty());
        if has_header {
            return Ok(());
        }

        let mut url = self.values_url(&a1(&sheet.title, "A1:H1"), "")?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let token = self.access_token().await?;
        let res = self
            .http
            .put(url)
            .bearer_auth(token)
            .json(&json!({ "values": [HEADERS] }))
            .send()
            .await?;
        check(res).await?;
        tracing::info!("wrote header row to worksheet '{}'", sheet.title);
        Ok(())
    }

    async fn append(&self, row: &SheetRow) -> Result<(), SyncError> {
        let sheet = self.worksheet().await?;
        let mut url = self.values_url(&a1(&sheet.title, "A:H"), ":append")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let token = self.access_token().await?;
        let res = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "values": [row.cells] }))
            .send()
            .await?;
        check(res).await?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), SyncError> {
        let sheet = self.worksheet().await?;
        let ids = self.get_values(&a1(&sheet.title, "H:H")).await?;
        let Some(index) = find_row(&ids, id) else {
            tracing::warn!("row {id} not found in worksheet '{}'", sheet.title);
            return Ok(());
        };

        let url = self.url(":batchUpdate")?;
        let token = self.access_token().await?;
        let res = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&json!({
                "requests": [{
                    "deleteDimension": {
                        "range": {
                            "sheetId": sheet.sheet_id,
                            "dimension": "ROWS",
                            "startIndex": index,
                            "endIndex": index + 1,
                        }
                    }
                }]
            }))
            .send()
            .await?;
        check(res).await?;
        Ok(())
    }
}

fn a1(title: &str, range: &str) -> String {
    format!("'{}'!{range}", title.replace('\'', "''"))
}

/// Zero-based row index of `id` in a single-column value range. The header
/// row never matches since it holds `ID`.
fn find_row(column: &[Vec<Value>], id: &str) -> Option<usize> {
    column.iter().position(|row| {
        row.first()
            .and_then(Value::as_str)
            .is_some_and(|cell| cell == id)
    })
}

async fn check(res: Response) -> Result<Response, SyncError> {
    if res.status().is_success() {
        return Ok(res);
    }

    let status = res.status().as_u16();
    let message = res
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| "unknown error".to_string());
    Err(SyncError::Api { status, message })
}
