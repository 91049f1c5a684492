use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use log::{debug, error};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use url::Url;

use crate::multipart::{self, Boundary};
use crate::sounds::{SoundTable, Sounds, SoundsResponse};
use crate::{
    fill_defaults, server_url, AttachmentSource, ErrorReporter, Fields, Message, NotificationError,
};

const MESSAGES_PATH: &str = "/1/messages.json";
const SOUNDS_PATH: &str = "/1/sounds.json";
const REDACTED: &str = "<redacted>";

/// How often the sound table is refreshed when [`Options::update_sounds`] is set.
pub const SOUND_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Transport options.
#[derive(Clone, Debug, Default)]
pub struct HttpOptions {
    /// Forward requests through this proxy e.g. `http://127.0.0.1:3128`.
    /// The proxy's scheme decides between HTTP and HTTPS.
    pub proxy: Option<String>,
    /// Timeout of a whole request.
    pub timeout: Option<Duration>,
    /// Replaces the default `User-Agent`.
    pub user_agent: Option<String>,
}

/// Options of a [`Client`].
#[derive(Clone)]
pub struct Options {
    /// Your application's API token. <https://pushover.net/api#identifiers>
    pub token: String,
    /// The user / group key (not e-mail address) of your user (or you).
    /// <https://pushover.net/api#identifiers>
    pub user: String,
    /// Base URL of Pushover API.
    pub api_url: String,
    /// Transport options.
    pub http: HttpOptions,
    /// Log every request body, credentials redacted.
    pub debug: bool,
    /// Receives application and parse errors instead of the caller.
    pub on_error: Option<Arc<dyn ErrorReporter>>,
    /// Refresh the sound table now and every [`SOUND_REFRESH_INTERVAL`].
    ///
    /// Failed refreshes go to [`Options::on_error`]; without one they are logged
    /// and the latest stays readable through [`SoundTable::last_error`].
    pub update_sounds: bool,
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("token", &REDACTED)
            .field("user", &REDACTED)
            .field("api_url", &self.api_url)
            .field("http", &self.http)
            .field("debug", &self.debug)
            .field("on_error", &self.on_error)
            .field("update_sounds", &self.update_sounds)
            .finish()
    }
}

impl Options {
    /// Creates [`Options`] for Pushover API with everything else off.
    pub fn new<T>(token: T, user: T) -> Self
    where
        T: Into<String>,
    {
        Self {
            token: token.into(),
            user: user.into(),
            api_url: server_url(),
            http: HttpOptions::default(),
            debug: false,
            on_error: None,
            update_sounds: false,
        }
    }
}

/// Pushover API response. <https://pushover.net/api#response>
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Response {
    /// If POST request to API was valid, we will receive an HTTP 200 (OK) status, with a JSON object containing a status code of `1`.
    pub status: u8,
    /// The `request` parameter returned from all API calls is a randomly-generated unique token that we have associated with your request.
    #[serde(default)]
    pub request: String,
    /// Receipt of an emergency-priority message. <https://pushover.net/api/receipts>
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    /// ...and an `errors` array detailing which parameters were invalid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

/// Outcome of a request Pushover answered.
#[derive(Clone, Debug)]
pub struct Delivery {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
    /// Parsed body, `None` when it was not JSON and an [`ErrorReporter`] took the error.
    pub response: Option<Response>,
}

/// Pushover API client.
///
/// Cloning is cheap, clones share credentials, boundary and sound table.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    token: String,
    user: String,
    api_url: Url,
    proxy: Option<Url>,
    agent: ureq::Agent,
    boundary: Boundary,
    debug: bool,
    reporter: Option<Arc<dyn ErrorReporter>>,
    sounds: SoundTable,
    refresher: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_url", &self.inner.api_url.as_str())
            .field("proxy", &self.inner.proxy.as_ref().map(Url::as_str))
            .field("boundary", &self.inner.boundary)
            .field("debug", &self.inner.debug)
            .finish_non_exhaustive()
    }
}

fn runtime() -> Result<Handle, NotificationError> {
    Handle::try_current().map_err(|_e| NotificationError::NoRuntime)
}

fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn redacted(fields: &Fields) -> Fields {
    let mut redacted = fields.clone();
    for name in ["token", "user"] {
        if let Some(v) = redacted.get_mut(name) {
            *v = REDACTED.to_string();
        }
    }
    redacted
}

fn read(
    result: Result<ureq::Response, ureq::Error>,
) -> Result<(u16, String), NotificationError> {
    let response = match result {
        Ok(r) => r,
        // 4xx carries an errors list, still an answer
        Err(ureq::Error::Status(_, r)) => r,
        Err(e) => return Err(NotificationError::UReq(Box::new(e))),
    };
    let status = response.status();
    Ok((status, response.into_string()?))
}

impl Client {
    /// Creates a [`Client`].
    ///
    /// With [`Options::update_sounds`] the first refresh is scheduled right away
    /// on the current Tokio runtime, [`NotificationError::NoRuntime`] without one.
    ///
    /// ```rust
    /// # use pushover::{Client, Options};
    /// let client = Client::new(Options::new("token", "user")).unwrap();
    /// ```
    pub fn new(options: Options) -> Result<Self, NotificationError> {
        let Options {
            token,
            user,
            api_url,
            http,
            debug,
            on_error,
            update_sounds,
        } = options;

        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = http.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(ref user_agent) = http.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let proxy = http.proxy.as_deref().map(Url::parse).transpose()?;
        let handle = if update_sounds {
            Some(runtime()?)
        } else {
            None
        };

        let inner = Arc::new(Inner {
            token,
            user,
            api_url: Url::parse(&api_url)?,
            proxy,
            agent: builder.build(),
            boundary: Boundary::random(),
            debug,
            reporter: on_error,
            sounds: SoundTable::default(),
            refresher: Mutex::new(None),
        });

        if let Some(handle) = handle {
            debug!("refresh sounds every {SOUND_REFRESH_INTERVAL:?}");
            let task = handle.spawn(refresh_periodically(Arc::downgrade(&inner)));
            *inner
                .refresher
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(task);
        }

        Ok(Self { inner })
    }

    /// Boundary of every body this client sends.
    pub fn boundary(&self) -> &Boundary {
        &self.inner.boundary
    }

    /// Sound table of this client.
    pub fn sound_table(&self) -> &SoundTable {
        &self.inner.sounds
    }

    /// Current sounds.
    pub fn sounds(&self) -> Arc<Sounds> {
        self.inner.sounds.snapshot()
    }

    /// Form fields sent for `message`: credentials of this client unless the message
    /// overrides them, then every non-empty field.
    pub fn fields(&self, message: &Message) -> Fields {
        self.inner.fields(message)
    }

    /// Validates `message`, loads its attachment and encodes the request body.
    pub fn encode(&self, message: &Message) -> Result<Vec<u8>, NotificationError> {
        self.inner.prepare(message)
    }

    /// Send [`Message`] to Pushover.
    ///
    /// Attachment errors are returned before anything goes over the network.
    /// Transport errors come first, only answered requests are inspected for API errors.
    pub async fn send(&self, message: &Message) -> Result<Delivery, NotificationError> {
        let runtime = runtime()?;
        let body = self.inner.prepare(message)?;
        let inner = Arc::clone(&self.inner);
        runtime.spawn_blocking(move || inner.post(&body)).await?
    }

    /// Send [`Message`] to Pushover in the background, `handler` is called once with the outcome.
    ///
    /// Errors before any network activity, e.g. a missing attachment file,
    /// are returned here and `handler` is never called.
    pub fn dispatch<F>(
        &self,
        message: &Message,
        handler: F,
    ) -> Result<JoinHandle<()>, NotificationError>
    where
        F: FnOnce(Result<Delivery, NotificationError>) + Send + 'static,
    {
        let runtime = runtime()?;
        let body = self.inner.prepare(message)?;
        let inner = Arc::clone(&self.inner);
        let request = runtime.spawn_blocking(move || inner.post(&body));
        Ok(runtime.spawn(async move {
            let result = match request.await {
                Ok(r) => r,
                Err(e) => Err(NotificationError::Join(e)),
            };
            handler(result);
        }))
    }

    /// Fetches sounds once and replaces the table.
    /// On error the table is left as it is.
    pub async fn refresh_sounds(&self) -> Result<(), NotificationError> {
        refresh(&self.inner).await
    }
}

async fn refresh(inner: &Arc<Inner>) -> Result<(), NotificationError> {
    let runtime = runtime()?;
    let fetcher = Arc::clone(inner);
    let fetched = match runtime.spawn_blocking(move || fetcher.fetch_sounds()).await {
        Ok(r) => r,
        Err(e) => Err(NotificationError::Join(e)),
    };
    match fetched {
        Ok(sounds) => {
            debug!("refreshed {} sounds", sounds.len());
            inner.sounds.replace(sounds);
            Ok(())
        }
        Err(e) => {
            inner.sounds.fail(&e);
            Err(e)
        }
    }
}

async fn refresh_periodically(inner: Weak<Inner>) {
    let mut interval = tokio::time::interval(SOUND_REFRESH_INTERVAL);
    loop {
        interval.tick().await;
        let client = match inner.upgrade() {
            Some(client) => client,
            None => break,
        };
        if let Err(e) = refresh(&client).await {
            client.report(&e);
        }
    }
}

impl Inner {
    fn fields(&self, message: &Message) -> Fields {
        let credential = |given: &Option<String>, fallback: &String| {
            given
                .clone()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| fallback.clone())
        };
        let mut fields = fill_defaults(message);
        fields.insert("token".to_string(), credential(&message.token, &self.token));
        fields.insert("user".to_string(), credential(&message.user, &self.user));
        fields.retain(|_, v| !v.is_empty());
        fields
    }

    fn prepare(&self, message: &Message) -> Result<Vec<u8>, NotificationError> {
        message.validate()?;
        let fields = self.fields(message);
        let attachment = message
            .file
            .as_ref()
            .map(AttachmentSource::resolve)
            .transpose()?;

        if self.debug {
            let text = multipart::encode(&redacted(&fields), &self.boundary, None);
            debug!("{MESSAGES_PATH} {}", String::from_utf8_lossy(&text));
            if let Some(ref a) = attachment {
                let size = a.content().len();
                debug!("{MESSAGES_PATH} attachment {} ({size} bytes)", a.filename());
            }
        }

        Ok(multipart::encode(&fields, &self.boundary, attachment.as_deref()))
    }

    fn request(&self, method: &str, target: &Url) -> ureq::Request {
        match self.proxy {
            None => self.agent.request(method, target.as_str()),
            Some(ref proxy) => {
                let mut via = proxy.clone();
                via.set_path(target.path());
                via.set_query(target.query());
                self.agent
                    .request(method, via.as_str())
                    .set("Host", &authority(target))
            }
        }
    }

    fn post(&self, body: &[u8]) -> Result<Delivery, NotificationError> {
        let target = self.api_url.join(MESSAGES_PATH)?;
        let result = self
            .request("POST", &target)
            .set("Content-Type", &self.boundary.content_type())
            .set("Content-Length", &body.len().to_string())
            .send_bytes(body);
        let (status, body) = read(result)?;
        debug!("{MESSAGES_PATH} answered {status}");
        self.inspect(Delivery {
            status,
            body,
            response: None,
        })
    }

    /// Parses the body of `delivery`. Parse and API errors go to the reporter,
    /// or back to the caller together with `delivery` without one.
    fn inspect(&self, mut delivery: Delivery) -> Result<Delivery, NotificationError> {
        let problem = match serde_json::from_str::<Response>(&delivery.body) {
            Ok(r) => {
                let errors = r.errors.clone().filter(|e| !e.is_empty());
                delivery.response = Some(r);
                errors.map(NotificationError::Api)
            }
            Err(e) => Some(NotificationError::Deserialize(e)),
        };
        match (problem, &self.reporter) {
            (None, _) => Ok(delivery),
            (Some(e), Some(reporter)) => {
                reporter.report(&e);
                Ok(delivery)
            }
            (Some(e), None) => Err(NotificationError::Answered {
                delivery: Box::new(delivery),
                source: Box::new(e),
            }),
        }
    }

    fn fetch_sounds(&self) -> Result<Sounds, NotificationError> {
        let mut target = self.api_url.join(SOUNDS_PATH)?;
        target.query_pairs_mut().append_pair("token", &self.token);
        let (_, body) = read(self.request("GET", &target).call())?;
        let parsed: SoundsResponse = serde_json::from_str(&body)?;
        if let Some(errors) = parsed.errors.filter(|e| !e.is_empty()) {
            return Err(NotificationError::Api(errors));
        }
        let sounds = parsed
            .sounds
            .ok_or_else(|| <serde_json::Error as serde::de::Error>::missing_field("sounds"))?;
        Ok(sounds)
    }

    fn report(&self, e: &NotificationError) {
        match self.reporter {
            Some(ref reporter) => reporter.report(e),
            None => error!("failed to refresh sounds: {e}"),
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let refresher = self
            .refresher
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = refresher.take() {
            task.abort();
        }
    }
}
