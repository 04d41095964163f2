use std::path::PathBuf;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use log::{debug, info};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

use crate::clients::{
    catalog::DestinationCatalog,
    entities::{MatchCandidate, PlaylistHandle},
    errors::{Error, Result},
};

const DEFAULT_API_BASE: &str = "https://api.tidal.com/v1";
const DEFAULT_AUTH_BASE: &str = "https://auth.tidal.com/v1/oauth2";
const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080";
const SCOPES: &str = "r_usr w_usr";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
struct TidalSession {
    access_token: String,
    refresh_token: Option<String>,
    user_id: Option<u64>,
    country_code: Option<String>,
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct UserResponse {
    id: u64,
    country_code: String,
}

#[derive(Deserialize, Debug)]
struct TidalArtist {
    name: String,
}

#[derive(Deserialize, Debug)]
struct TidalTrack {
    id: u64,
    title: String,
    #[serde(default)]
    artists: Vec<TidalArtist>,
}

#[derive(Deserialize, Debug, Default)]
struct TrackPage {
    #[serde(default)]
    items: Vec<TidalTrack>,
}

#[derive(Deserialize, Debug)]
struct SearchResponse {
    #[serde(default)]
    tracks: TrackPage,
}

#[derive(Serialize, Debug)]
struct NewPlaylist<'a> {
    title: &'a str,
    description: &'a str,
}

#[derive(Deserialize, Debug)]
struct CreatedPlaylist {
    uuid: String,
    title: String,
}

impl From<TidalTrack> for MatchCandidate {
    fn from(track: TidalTrack) -> MatchCandidate {
        MatchCandidate {
            id: track.id.to_string(),
            title: track.title,
            artists: track.artists.into_iter().map(|a| a.name).collect(),
        }
    }
}

fn parse_search_response(body: &str) -> Result<Vec<MatchCandidate>> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response
        .tracks
        .items
        .into_iter()
        .map(MatchCandidate::from)
        .collect())
}

// Keeps errors that are already classified, wraps transport and parsing failures
fn classify(err: Error, kind: fn(String) -> Error) -> Error {
    match err {
        Error::SearchError(_) | Error::CreateFailed(_) | Error::AppendError(_) => err,
        other => kind(other.to_string()),
    }
}

// First line of input, EOF or a blank line means the user gave up
async fn read_code<R: AsyncBufRead + Unpin>(mut reader: R) -> Result<String> {
    let mut code = String::new();
    reader.read_line(&mut code).await?;
    let code = code.trim();
    if code.is_empty() {
        return Err(Error::AuthorizationError(
            "no authorization code entered".into(),
        ));
    }
    Ok(code.to_string())
}

// PKCE (RFC 7636) with the S256 challenge method
fn code_verifier() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>())
}

fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

// Result of loading a cached Tidal session from local storage
enum CachedSessionResult {
    Cached(TidalSession),
    NotFound,
    Error(Error),
}

// Keeps the Tidal session between runs so the browser login is only needed once.
// NOTE: single user only, one session file per machine account.
struct SessionCache {
    path: PathBuf,
}

impl SessionCache {
    fn new(path: PathBuf) -> Self {
        SessionCache { path }
    }

    fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp")) // Fallback to /tmp if cache directory can't be determined
            .join(".rtransfer_tidal_session.json")
    }

    async fn store(&self, session: &TidalSession) -> Result<()> {
        let contents = serde_json::to_string(session)?;
        tokio::fs::write(&self.path, contents).await?;
        debug!("Stored Tidal session in cache in {:?}", self.path);
        Ok(())
    }

    async fn load(&self) -> CachedSessionResult {
        match tokio::fs::try_exists(&self.path).await {
            Ok(true) => match tokio::fs::read_to_string(&self.path).await {
                Ok(contents) => match serde_json::from_str(&contents) {
                    Ok(session) => {
                        debug!("Loaded Tidal session from cache");
                        CachedSessionResult::Cached(session)
                    }
                    Err(e) => {
                        debug!("Cached Tidal session is malformed: {e}");
                        CachedSessionResult::NotFound
                    }
                },
                Err(e) => {
                    debug!("Failed to load Tidal session from cache: {e}");
                    CachedSessionResult::Error(Error::from(e))
                }
            },
            Ok(false) => {
                debug!("No cached Tidal session found in {:?}", self.path);
                CachedSessionResult::NotFound
            }
            Err(e) => {
                debug!("Error checking for Tidal session cache: {e}");
                CachedSessionResult::Error(Error::from(e))
            }
        }
    }
}

pub struct TidalCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl TidalCredentials {
    pub fn from_env() -> Result<Self> {
        Ok(TidalCredentials {
            client_id: std::env::var("TIDAL_CLIENT_ID")?,
            client_secret: std::env::var("TIDAL_CLIENT_SECRET")?,
            redirect_uri: std::env::var("TIDAL_REDIRECT_URI")
                .unwrap_or_else(|_| DEFAULT_REDIRECT_URI.to_string()),
        })
    }
}

// Base URLs of the REST API and the OAuth2 server, overridable for local test servers
pub struct TidalEndpoints {
    pub api_base: String,
    pub auth_base: String,
}

impl Default for TidalEndpoints {
    fn default() -> Self {
        TidalEndpoints {
            api_base: DEFAULT_API_BASE.to_string(),
            auth_base: DEFAULT_AUTH_BASE.to_string(),
        }
    }
}

pub struct TidalClient {
    http: Client,
    credentials: TidalCredentials,
    endpoints: TidalEndpoints,
    cache: SessionCache,
    session: Mutex<Option<TidalSession>>,
}

impl TidalClient {
    pub fn new(
        http: Client,
        credentials: TidalCredentials,
        endpoints: TidalEndpoints,
        cache_path: PathBuf,
    ) -> Self {
        TidalClient {
            http,
            credentials,
            endpoints,
            cache: SessionCache::new(cache_path),
            session: Mutex::new(None),
        }
    }

    // Create a TidalClient from environment variables or raise a configuration error
    pub fn try_default() -> Result<Self> {
        let credentials = TidalCredentials::from_env().map_err(|e| {
            Error::ConfigurationError(format!(
                "Missing Tidal credentials (TIDAL_CLIENT_ID, TIDAL_CLIENT_SECRET): {e}"
            ))
        })?;
        Ok(TidalClient::new(
            Client::new(),
            credentials,
            TidalEndpoints::default(),
            SessionCache::default_path(),
        ))
    }

    // Reuse the cached session when it can still be refreshed, otherwise log in again.
    // The login prompt reads the authorization code from stdin.
    pub async fn authorize_client(&self) -> Result<()> {
        match self.cache.load().await {
            CachedSessionResult::Cached(session) => {
                *self.session.lock().await = Some(session);
                match self.refresh_access_token().await {
                    Ok(()) => {
                        self.ensure_user_info().await?;
                        info!("Loaded existing Tidal session");
                        return Ok(());
                    }
                    Err(e) => {
                        debug!("Cached Tidal session could not be refreshed: {e}, re-authenticating");
                    }
                }
            }
            CachedSessionResult::NotFound => {}
            CachedSessionResult::Error(err) => return Err(err),
        }
        self.login().await
    }

    async fn login(&self) -> Result<()> {
        let verifier = code_verifier();
        let challenge = code_challenge(&verifier);
        let url = Url::parse_with_params(
            &format!("{}/authorize", self.endpoints.auth_base),
            &[
                ("response_type", "code"),
                ("client_id", self.credentials.client_id.as_str()),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
                ("scope", SCOPES),
                ("code_challenge", challenge.as_str()),
                ("code_challenge_method", "S256"),
            ],
        )
        .map_err(|e| Error::ConfigurationError(e.to_string()))?;

        println!("Please visit this URL to authorize Tidal access:\n\n{url}\n");
        println!("Enter the authorization code from the redirect URL:");
        let code = read_code(BufReader::new(tokio::io::stdin())).await?;
        let code = code.as_str();

        let response = self
            .http
            .post(format!("{}/token", self.endpoints.auth_base))
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
                ("code_verifier", verifier.as_str()),
            ])
            .send()
            .await?;
        let token: TokenResponse = Self::token_response(response).await?;

        *self.session.lock().await = Some(TidalSession {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            user_id: None,
            country_code: None,
        });
        self.ensure_user_info().await?;
        info!("Successfully logged into Tidal");
        Ok(())
    }

    async fn token_response(response: Response) -> Result<TokenResponse> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::AuthorizationError(format!(
                "token request failed with {status}: {body}"
            )));
        }
        Ok(response.json().await?)
    }

    async fn refresh_access_token(&self) -> Result<()> {
        let refresh_token = self
            .session
            .lock()
            .await
            .as_ref()
            .and_then(|s| s.refresh_token.clone())
            .ok_or_else(|| Error::AuthorizationError("no refresh token available".into()))?;

        let response = self
            .http
            .post(format!("{}/token", self.endpoints.auth_base))
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await?;
        let token = Self::token_response(response).await?;

        let session = {
            let mut guard = self.session.lock().await;
            let session = guard
                .as_mut()
                .ok_or_else(|| Error::AuthorizationError("no Tidal session".into()))?;
            session.access_token = token.access_token;
            if token.refresh_token.is_some() {
                session.refresh_token = token.refresh_token;
            }
            session.clone()
        };
        debug!("Refreshed Tidal access token");
        self.cache.store(&session).await
    }

    // Playlist creation and search need the account id and its country
    async fn ensure_user_info(&self) -> Result<()> {
        let known = self
            .session
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| s.user_id.is_some() && s.country_code.is_some());
        if !known {
            let response = self
                .send(|http| http.get(format!("{}/users/me", self.endpoints.api_base)))
                .await?;
            if !response.status().is_success() {
                return Err(Error::AuthorizationError(format!(
                    "failed to fetch Tidal user info: {}",
                    response.status()
                )));
            }
            let user: UserResponse = response.json().await?;
            debug!("Authenticated on Tidal as user {}", user.id);
            if let Some(session) = self.session.lock().await.as_mut() {
                session.user_id = Some(user.id);
                session.country_code = Some(user.country_code);
            }
        }
        let session = self.session.lock().await.clone();
        match session {
            Some(session) => self.cache.store(&session).await,
            None => Err(Error::AuthorizationError("no Tidal session".into())),
        }
    }

    async fn session(&self) -> Result<TidalSession> {
        self.session
            .lock()
            .await
            .clone()
            .ok_or_else(|| Error::AuthorizationError("Tidal client is not authorized".into()))
    }

    // Sends an authenticated request, refreshing the token once on 401
    async fn send<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let token = self.session().await?.access_token;
        let response = build(&self.http).bearer_auth(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!("Tidal access token rejected, refreshing ...");
        self.refresh_access_token().await?;
        let token = self.session().await?.access_token;
        Ok(build(&self.http).bearer_auth(&token).send().await?)
    }

    async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<MatchCandidate>> {
        let country_code = self.session().await?.country_code.unwrap_or_default();
        let limit = limit.to_string();
        let response = self
            .send(|http| {
                http.get(format!("{}/search", self.endpoints.api_base)).query(&[
                    ("query", query),
                    ("type", "TRACKS"),
                    ("limit", limit.as_str()),
                    ("countryCode", country_code.as_str()),
                ])
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::SearchError(format!("'{query}' returned {status}")));
        }
        parse_search_response(&response.text().await?)
    }

    async fn create(&self, name: &str, description: &str) -> Result<PlaylistHandle> {
        let user_id = self
            .session()
            .await?
            .user_id
            .ok_or_else(|| Error::AuthorizationError("unknown Tidal user id".into()))?;
        let body = NewPlaylist {
            title: name,
            description,
        };
        let response = self
            .send(|http| {
                http.post(format!("{}/users/{user_id}/playlists", self.endpoints.api_base))
                    .json(&body)
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::CreateFailed(format!("{status}: {body}")));
        }
        let playlist: CreatedPlaylist = response.json().await?;
        Ok(PlaylistHandle {
            id: playlist.uuid,
            name: playlist.title,
        })
    }

    async fn append(&self, playlist: &PlaylistHandle, track_ids: &[String]) -> Result<()> {
        let ids = track_ids.join(",");
        let response = self
            .send(|http| {
                http.post(format!(
                    "{}/playlists/{}/tracks",
                    self.endpoints.api_base, playlist.id
                ))
                    .form(&[("trackIds", ids.as_str())])
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::AppendError(format!("{status}: {body}")));
        }
        Ok(())
    }
}

#[async_trait]
impl DestinationCatalog for TidalClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MatchCandidate>> {
        self.search_tracks(query, limit)
            .await
            .map_err(|e| classify(e, Error::SearchError))
    }

    async fn create_playlist(&self, name: &str, description: &str) -> Result<PlaylistHandle> {
        self.create(name, description)
            .await
            .map_err(|e| classify(e, Error::CreateFailed))
    }

    async fn append_tracks(&self, playlist: &PlaylistHandle, track_ids: &[String]) -> Result<()> {
        self.append(playlist, track_ids)
            .await
            .map_err(|e| classify(e, Error::AppendError))
    }
}
