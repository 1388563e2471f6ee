//! ARM long-running operations
//!
//! Mutating calls (`PUT`, `PATCH`, `DELETE`, `POST`) either complete in the
//! initial response or hand back something to poll. How to poll is decided
//! once, from the initial response, in this order:
//!
//! 1. `Azure-AsyncOperation` header - poll the status monitor
//! 2. `Location` header on `201`/`202` - poll until it stops answering `202`
//! 3. `properties.provisioningState` of the resource itself
//!
//! `Retry-After` on any of these responses overrides the poll interval.

use super::client::{ArmClient, ArmResponse, decode_body};
use crate::error::{CoreError, Result};
use crate::lro::{Operation, PollStatus, Submission};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

const ASYNC_OPERATION_HEADER: &str = "azure-asyncoperation";
const LOCATION_HEADER: &str = "location";

/// HTTP verb of a long-running ARM call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LroMethod {
    Put,
    Patch,
    Delete,
    Post,
}

impl LroMethod {
    fn http(self) -> Method {
        match self {
            LroMethod::Put => Method::PUT,
            LroMethod::Patch => Method::PATCH,
            LroMethod::Delete => Method::DELETE,
            LroMethod::Post => Method::POST,
        }
    }
}

impl fmt::Display for LroMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.http().as_str())
    }
}

#[derive(Debug, Clone)]
enum PollStrategy {
    AsyncOperation(Url),
    Location(Url),
    ProvisioningState,
}

/// A pending ARM operation
///
/// `T` is the final value: the resource for `PUT`/`PATCH`, `()` for
/// `DELETE`, and whatever the action returns for `POST`.
pub struct ArmOperation<T> {
    client: ArmClient,
    method: LroMethod,
    resource_url: Url,
    strategy: PollStrategy,
    location: Option<Url>,
    id: String,
    retry_after: Option<Duration>,
    final_body: Option<String>,
    _output: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for ArmOperation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArmOperation")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("resource_url", &self.resource_url.as_str())
            .field("strategy", &self.strategy)
            .field("retry_after", &self.retry_after)
            .finish()
    }
}

impl<T> ArmOperation<T> {
    fn new(
        client: ArmClient,
        method: LroMethod,
        resource_url: Url,
        strategy: PollStrategy,
        location: Option<Url>,
        retry_after: Option<Duration>,
    ) -> Self {
        let id = match &strategy {
            PollStrategy::AsyncOperation(url) | PollStrategy::Location(url) => {
                last_segment(url).unwrap_or_else(|| url.path().to_string())
            }
            PollStrategy::ProvisioningState => resource_url.path().to_string(),
        };
        Self {
            client,
            method,
            resource_url,
            strategy,
            location,
            id,
            retry_after,
            final_body: None,
            _output: PhantomData,
        }
    }

    /// URL being polled; `None` when polling the resource itself
    pub fn polling_url(&self) -> Option<&Url> {
        match &self.strategy {
            PollStrategy::AsyncOperation(url) | PollStrategy::Location(url) => Some(url),
            PollStrategy::ProvisioningState => None,
        }
    }

    /// True when the polling URL is a `Location` URL, not a status monitor
    pub fn uses_location(&self) -> bool {
        matches!(self.strategy, PollStrategy::Location(_))
    }

    /// URL of the resource the operation acts on
    pub fn resource_url(&self) -> &Url {
        &self.resource_url
    }

    pub fn method(&self) -> LroMethod {
        self.method
    }

    async fn poll_status_monitor(&mut self, url: Url) -> Result<PollStatus> {
        let response = self.client.send(Method::GET, url, None).await?;
        self.retry_after = response.retry_after();
        let monitor: StatusMonitor = response.json()?;
        trace!(operation = %self.id, status = %monitor.status, "Status monitor");

        let reason = monitor
            .error
            .as_ref()
            .map(ErrorInfo::describe)
            .unwrap_or_else(|| format!("status {}", monitor.status));
        let status = classify(&monitor.status, reason);

        if status == PollStatus::Succeeded
            && self.method == LroMethod::Post
            && self.location.is_none()
            && let Some(properties) = monitor.properties
        {
            self.final_body = Some(properties.to_string());
        }
        Ok(status)
    }

    async fn poll_location(&mut self, url: Url) -> Result<PollStatus> {
        match self.client.send(Method::GET, url, None).await {
            Ok(response) => {
                self.retry_after = response.retry_after();
                if response.status == StatusCode::ACCEPTED {
                    return Ok(PollStatus::in_progress("Accepted"));
                }
                if self.method == LroMethod::Post {
                    self.final_body = Some(response.body);
                }
                Ok(PollStatus::Succeeded)
            }
            // The operation itself failed; anything else means we lost track of it
            Err(CoreError::Api {
                status,
                code,
                message,
            }) if is_terminal_client_error(status) => {
                Ok(PollStatus::failed(format!("{code}: {message}")))
            }
            Err(e) => Err(e),
        }
    }

    async fn poll_resource(&mut self) -> Result<PollStatus> {
        let response = match self
            .client
            .send(Method::GET, self.resource_url.clone(), None)
            .await
        {
            Err(e) if self.method == LroMethod::Delete && e.is_not_found() => {
                return Ok(PollStatus::Succeeded);
            }
            other => other?,
        };
        self.retry_after = response.retry_after();
        let state = provisioning_state(&response)?;

        if self.method == LroMethod::Delete {
            // Still present: only a failed state ends the wait
            return Ok(match state.as_deref() {
                Some(s) if s.eq_ignore_ascii_case("failed") => {
                    PollStatus::failed("resource provisioning state is Failed")
                }
                Some(s) => PollStatus::in_progress(s),
                None => PollStatus::in_progress("Deleting"),
            });
        }

        let state = state.unwrap_or_else(|| "Succeeded".to_string());
        let status = classify(&state, format!("resource provisioning state is {state}"));
        if status == PollStatus::Succeeded {
            self.final_body = Some(response.body);
        }
        Ok(status)
    }
}

impl ArmOperation<Value> {
    /// Track an operation from its `Azure-AsyncOperation` URL
    ///
    /// The final value is the status monitor's `properties`, if any.
    pub fn monitor_async_operation(client: &ArmClient, url: &str) -> Result<Self> {
        let url = client.url(url, None)?;
        Ok(Self::new(
            client.clone(),
            LroMethod::Post,
            url.clone(),
            PollStrategy::AsyncOperation(url),
            None,
            None,
        ))
    }

    /// Track an operation from its `Location` URL
    ///
    /// The final value is the body of the last (non-`202`) response.
    pub fn monitor_location(client: &ArmClient, url: &str) -> Result<Self> {
        let url = client.url(url, None)?;
        Ok(Self::new(
            client.clone(),
            LroMethod::Post,
            url.clone(),
            PollStrategy::Location(url.clone()),
            Some(url),
            None,
        ))
    }

    /// Re-read `resource_url` once the operation succeeds
    ///
    /// Resuming a PUT or PATCH: its status monitor carries no resource body,
    /// so the final value comes from the resource itself.
    pub fn with_final_resource(mut self, resource_url: &str) -> Result<Self> {
        self.resource_url = self.client.url(resource_url, None)?;
        self.method = LroMethod::Put;
        Ok(self)
    }
}

#[async_trait]
impl<T> Operation for ArmOperation<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Output = T;

    fn id(&self) -> &str {
        &self.id
    }

    async fn poll(&mut self) -> Result<PollStatus> {
        match self.strategy.clone() {
            PollStrategy::AsyncOperation(url) => self.poll_status_monitor(url).await,
            PollStrategy::Location(url) => self.poll_location(url).await,
            PollStrategy::ProvisioningState => self.poll_resource().await,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    async fn result(self) -> Result<T> {
        match self.method {
            LroMethod::Delete => decode_body(""),
            LroMethod::Post => match (self.final_body, self.location) {
                (Some(body), _) => decode_body(&body),
                (None, Some(location)) => {
                    let response = self.client.send(Method::GET, location, None).await?;
                    response.json()
                }
                (None, None) => decode_body(""),
            },
            LroMethod::Put | LroMethod::Patch => match self.final_body {
                Some(body) if !body.trim().is_empty() => decode_body(&body),
                _ => {
                    debug!(operation = %self.id, "Fetching final resource state");
                    self.client
                        .send(Method::GET, self.resource_url, None)
                        .await?
                        .json()
                }
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusMonitor {
    #[serde(default)]
    status: String,
    #[serde(default)]
    error: Option<ErrorInfo>,
    #[serde(default)]
    properties: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorInfo {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl ErrorInfo {
    fn describe(&self) -> String {
        match (self.code.is_empty(), self.message.is_empty()) {
            (false, false) => format!("{}: {}", self.code, self.message),
            (false, true) => self.code.clone(),
            (true, false) => self.message.clone(),
            (true, true) => "no error details".to_string(),
        }
    }
}

/// Map an ARM status string to a poll outcome
fn classify(status: &str, failure_reason: String) -> PollStatus {
    match status.to_ascii_lowercase().as_str() {
        "succeeded" => PollStatus::Succeeded,
        "failed" => PollStatus::Failed {
            reason: failure_reason,
        },
        "canceled" | "cancelled" => PollStatus::Cancelled,
        "" => PollStatus::in_progress("Unknown"),
        _ => PollStatus::in_progress(status),
    }
}

/// 4xx answers from a status URL that report the operation's own failure
fn is_terminal_client_error(status: u16) -> bool {
    (400..500).contains(&status) && !matches!(status, 401 | 403 | 408 | 429)
}

fn provisioning_state(response: &ArmResponse) -> Result<Option<String>> {
    let body: Value = response.json()?;
    Ok(body
        .pointer("/properties/provisioningState")
        .and_then(Value::as_str)
        .map(str::to_string))
}

fn last_segment(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl ArmClient {
    async fn begin<T>(
        &self,
        method: LroMethod,
        path: &str,
        api_version: &str,
        body: Option<&Value>,
    ) -> Result<Submission<T, ArmOperation<T>>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let resource_url = self.url(path, Some(api_version))?;
        let response = self
            .send(method.http(), resource_url.clone(), body)
            .await?;
        let retry_after = response.retry_after();

        let header_url = |name: &str| {
            response
                .header(name)
                .and_then(|value| self.url(value, None).ok())
        };
        let async_operation = header_url(ASYNC_OPERATION_HEADER);
        let location = header_url(LOCATION_HEADER);

        let strategy = match (&async_operation, &location) {
            (Some(url), _) => Some(PollStrategy::AsyncOperation(url.clone())),
            (None, Some(url))
                if response.status == StatusCode::CREATED
                    || response.status == StatusCode::ACCEPTED =>
            {
                Some(PollStrategy::Location(url.clone()))
            }
            _ => None,
        };

        if let Some(strategy) = strategy {
            let operation =
                ArmOperation::new(self.clone(), method, resource_url, strategy, location, retry_after);
            debug!(
                method = %method,
                operation = %operation.id,
                status = response.status.as_u16(),
                "Operation accepted, polling required"
            );
            return Ok(Submission::Pending(operation));
        }

        match method {
            LroMethod::Put | LroMethod::Patch => {
                let state = provisioning_state(&response)?;
                match state.as_deref().map(str::to_ascii_lowercase).as_deref() {
                    None | Some("succeeded") => {
                        debug!(method = %method, path = %path, "Completed synchronously");
                        if response.body.trim().is_empty() {
                            let value = self.send(Method::GET, resource_url, None).await?.json()?;
                            Ok(Submission::Completed(value))
                        } else {
                            Ok(Submission::Completed(response.json()?))
                        }
                    }
                    Some("failed") => Err(CoreError::OperationFailed {
                        operation: resource_url.path().to_string(),
                        reason: "resource provisioning state is Failed".to_string(),
                    }),
                    Some("canceled") | Some("cancelled") => Err(CoreError::OperationCancelled {
                        operation: resource_url.path().to_string(),
                    }),
                    Some(_) => Ok(Submission::Pending(ArmOperation::new(
                        self.clone(),
                        method,
                        resource_url,
                        PollStrategy::ProvisioningState,
                        location,
                        retry_after,
                    ))),
                }
            }
            LroMethod::Delete if response.status == StatusCode::ACCEPTED => {
                Ok(Submission::Pending(ArmOperation::new(
                    self.clone(),
                    method,
                    resource_url,
                    PollStrategy::ProvisioningState,
                    location,
                    retry_after,
                )))
            }
            LroMethod::Delete => {
                debug!(path = %path, status = response.status.as_u16(), "Deleted synchronously");
                Ok(Submission::Completed(decode_body("")?))
            }
            LroMethod::Post => Ok(Submission::Completed(response.json()?)),
        }
    }

    /// `PUT` a resource definition
    pub async fn begin_create_or_update<B, T>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<Submission<T, ArmOperation<T>>>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned + Send + 'static,
    {
        let body = serde_json::to_value(body)?;
        self.begin(LroMethod::Put, path, api_version, Some(&body))
            .await
    }

    /// `PATCH` part of a resource definition
    pub async fn begin_update<B, T>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<Submission<T, ArmOperation<T>>>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned + Send + 'static,
    {
        let body = serde_json::to_value(body)?;
        self.begin(LroMethod::Patch, path, api_version, Some(&body))
            .await
    }

    /// `DELETE` a resource
    pub async fn begin_delete(
        &self,
        path: &str,
        api_version: &str,
    ) -> Result<Submission<(), ArmOperation<()>>> {
        self.begin(LroMethod::Delete, path, api_version, None).await
    }

    /// `POST` an action such as `.../restart` or `.../listKeys`
    pub async fn begin_action<T>(
        &self,
        path: &str,
        api_version: &str,
        body: Option<Value>,
    ) -> Result<Submission<T, ArmOperation<T>>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.begin(LroMethod::Post, path, api_version, body.as_ref())
            .await
    }
}
