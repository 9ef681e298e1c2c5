//! Bindings for the [Tenderly fork management API](https://docs.tenderly.co/simulations-and-forks)

use errors::TenderlyError;
use reqwest::{header, IntoUrl, Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use tracing::{error, trace};

pub mod errors;
pub mod fork;

pub use fork::{ChainConfig, ForkId, ForkRequest};

pub(crate) type Result<T> = std::result::Result<T, TenderlyError>;

/// Header carrying the project access key on every management request
pub const ACCESS_KEY_HEADER: &str = "X-Access-Key";

/// Management API endpoint used when none is configured
pub const DEFAULT_API_URL: &str = "https://api.tenderly.co/api/v1/";

/// The Tenderly management API client.
#[derive(Clone)]
pub struct Client {
    /// Client that executes HTTP requests
    client: reqwest::Client,
    /// Project access key, sent as `X-Access-Key`
    access_key: String,
    /// API endpoint like <https://api.tenderly.co/api/v1/>, always ends with `/`
    api_url: Url,
    /// Account (user or organization) slug
    user: String,
    /// Project slug
    project: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_url", &self.api_url.as_str())
            .field("user", &self.user)
            .field("project", &self.project)
            .field("access_key", &"<redacted>")
            .finish()
    }
}

impl Client {
    /// Creates a `ClientBuilder` to configure a `Client`.
    /// This is the same as `ClientBuilder::default()`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tenderly_api::Client;
    /// let client = Client::builder()
    ///     .with_user("me")
    ///     .with_project("project")
    ///     .with_access_key("<ACCESS KEY>")
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Create a new client against the public API endpoint
    pub fn new(
        user: impl Into<String>,
        project: impl Into<String>,
        access_key: impl Into<String>,
    ) -> Result<Self> {
        Client::builder().with_user(user).with_project(project).with_access_key(access_key).build()
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Return the URL of the project's fork collection
    pub fn forks_url(&self) -> Result<Url> {
        Ok(self.api_url.join(&format!("account/{}/project/{}/fork", self.user, self.project))?)
    }

    /// Return the URL of a single fork
    pub fn fork_url(&self, fork: &ForkId) -> Result<Url> {
        Ok(self
            .api_url
            .join(&format!("account/{}/project/{}/fork/{fork}", self.user, self.project))?)
    }

    /// Execute an authenticated POST request with a JSON body.
    async fn post_json<T: DeserializeOwned, B: Serialize>(&self, url: Url, body: &B) -> Result<T> {
        trace!(target: "tenderly", "POST {}", url);
        let response = self.request(Method::POST, url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        self.sanitize_response(status, &text)
    }

    /// Execute an authenticated DELETE request, discarding the response body on success.
    async fn delete(&self, url: Url) -> Result<()> {
        trace!(target: "tenderly", "DELETE {}", url);
        let response = self.request(Method::DELETE, url).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(())
        }
        let text = response.text().await?;
        Err(api_error(status, &text))
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header(ACCESS_KEY_HEADER, &self.access_key)
            .header(header::ACCEPT, "application/json")
    }

    /// Perform sanity checks on a response and deserialize its body.
    fn sanitize_response<T: DeserializeOwned>(&self, status: StatusCode, res: &str) -> Result<T> {
        if !status.is_success() {
            return Err(api_error(status, res))
        }
        serde_json::from_str(res).map_err(|err| {
            error!(target: "tenderly", ?res, "Failed to deserialize response: {}", err);
            TenderlyError::Serde(err)
        })
    }
}

/// Maps a non-success response to the matching error, using the API's error envelope when the
/// body carries one.
fn api_error(status: StatusCode, body: &str) -> TenderlyError {
    error!(target: "tenderly", %status, body, "Tenderly API request failed");
    let envelope = serde_json::from_str::<ErrorResponse>(body).ok().map(|res| res.error);
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        let message = envelope.map(|err| err.message).unwrap_or_else(|| status.to_string());
        return TenderlyError::Unauthorized(message)
    }
    match envelope {
        Some(err) => TenderlyError::Api { status, slug: err.slug, message: err.message },
        None => TenderlyError::BadStatusCode { status, body: body.to_string() },
    }
}

#[derive(Clone, Debug, Default)]
pub struct ClientBuilder {
    /// Client that executes HTTP requests
    client: Option<reqwest::Client>,
    /// Project access key
    access_key: Option<String>,
    /// API endpoint like <https://api.tenderly.co/api/v1/>
    api_url: Option<Url>,
    /// Account slug
    user: Option<String>,
    /// Project slug
    project: Option<String>,
}

// === impl ClientBuilder ===

impl ClientBuilder {
    /// Configures the management api url. A trailing `/` is appended when missing so that
    /// relative paths resolve below it.
    ///
    /// # Errors
    ///
    /// Fails if the `api_url` is not a valid `Url`
    pub fn with_api_url(mut self, api_url: impl IntoUrl) -> Result<Self> {
        let mut api_url = api_url.into_url()?;
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }
        self.api_url = Some(api_url);
        Ok(self)
    }

    /// Configures the `reqwest::Client`
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Configures the project access key
    pub fn with_access_key(mut self, access_key: impl Into<String>) -> Self {
        self.access_key = Some(access_key.into());
        self
    }

    /// Configures the account slug
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Configures the project slug
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Returns a Client that uses this ClientBuilder configuration.
    ///
    /// Falls back to [`DEFAULT_API_URL`] when no api url was configured.
    ///
    /// # Errors
    /// if required fields are missing:
    ///   - `access_key`
    ///   - `user`
    ///   - `project`
    pub fn build(self) -> Result<Client> {
        let ClientBuilder { client, access_key, api_url, user, project } = self;

        let api_url = match api_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_API_URL)?,
        };
        let client = Client {
            client: client.unwrap_or_default(),
            access_key: access_key
                .ok_or_else(|| TenderlyError::Builder("tenderly access key".to_string()))?,
            api_url,
            user: user.ok_or_else(|| TenderlyError::Builder("tenderly user".to_string()))?,
            project: project
                .ok_or_else(|| TenderlyError::Builder("tenderly project".to_string()))?,
        };
        Ok(client)
    }
}

/// Error envelope returned by the management API
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    #[serde(default)]
    slug: String,
    #[serde(default)]
    message: String,
}
