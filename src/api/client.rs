use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::{
    Client, Method, RequestBuilder, Url,
    cookie::{CookieStore, Jar},
};
use serde::{
    Deserialize, Serialize,
    de::{DeserializeOwned, IgnoredAny},
};
use serde_json::Value;

use super::{Error, envelope};
use crate::{
    domain::{
        Credentials, Disaster, DisasterDraft, OfficialUpdate, Registration, Report, ReportDraft,
        ReportPatch, Resource, ResourceDraft, User, VerificationStatus,
    },
    session::AuthApi,
};

/// An HTTP client for the coordination backend.
///
/// Session cookies set by the backend are kept in an in-memory jar and sent
/// with every request. [`ApiClient::cookie_header`] exposes them so that a
/// caller can persist the session between processes.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    http: Client,
    jar: Arc<Jar>,
}

/// Parameters for a proximity search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NearbyQuery {
    /// Latitude of the search centre.
    pub latitude: f64,
    /// Longitude of the search centre.
    pub longitude: f64,
    /// Search radius in kilometres. The backend default applies if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

/// The outcome of an AI authenticity check on a report image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageAnalysis {
    /// Whether the image appears genuine.
    #[serde(alias = "is_authentic")]
    pub is_authentic: Option<bool>,
    /// Confidence in the verdict, in percent.
    pub confidence: Option<f64>,
    /// Free-text explanation.
    pub analysis: Option<String>,
    /// Suggested follow-up.
    pub recommendations: Option<String>,
}

/// A location extracted from a free-text description.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Geolocation {
    /// Human-readable place name.
    #[serde(alias = "location_name", alias = "location")]
    pub location_name: Option<String>,
    /// Latitude in decimal degrees.
    #[serde(alias = "lat")]
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees.
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: Option<f64>,
}

/// A value to store in the backend cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    /// Cache key.
    pub key: String,
    /// Arbitrary JSON value.
    pub value: Value,
    /// Lifetime in seconds. The backend default applies if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

#[derive(Serialize)]
struct ResourceUpdate<'a> {
    id: &'a str,
    #[serde(flatten)]
    draft: &'a ResourceDraft,
}

#[derive(Serialize)]
struct ImageCheck<'a> {
    image_url: &'a str,
}

#[derive(Serialize)]
struct Description<'a> {
    description: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Profile {
    Wrapped { user: User },
    Bare(User),
}

impl From<Profile> for User {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Wrapped { user } | Profile::Bare(user) => user,
        }
    }
}

impl ApiClient {
    /// Create a client for the backend rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        Self::with_cookies(base_url, None)
    }

    /// Create a client, restoring cookies previously returned by
    /// [`ApiClient::cookie_header`].
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute URL or the HTTP
    /// client cannot be built.
    pub fn with_cookies(base_url: &str, cookies: Option<&str>) -> Result<Self, Error> {
        let invalid = || format!("Invalid backend URL '{base_url}'");
        let base = Url::parse(base_url.trim().trim_end_matches('/'))
            .map_err(|e| Error::transport(invalid(), e))?;
        if base.cannot_be_a_base() {
            return Err(Error::transport(invalid(), "URL cannot carry a path"));
        }

        let jar = Arc::new(Jar::default());
        for cookie in cookies
            .into_iter()
            .flat_map(|header| header.split(';'))
            .map(str::trim)
            .filter(|cookie| !cookie.is_empty())
        {
            jar.add_cookie_str(cookie, &base);
        }

        let http = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|e| Error::transport("Failed to build HTTP client", e))?;

        Ok(Self { base, http, jar })
    }

    /// The backend root this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// The session cookies currently held, formatted as a `Cookie` header.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        self.jar
            .cookies(&self.base)
            .and_then(|header| header.to_str().ok().map(ToString::to_string))
    }

    // Disasters

    /// All disasters.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached or rejects the request.
    pub async fn disasters(&self) -> Result<Vec<Disaster>, Error> {
        self.get(&["disasters"], "Failed to fetch disasters").await
    }

    /// A single disaster.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached or has no such disaster.
    pub async fn disaster(&self, id: &str) -> Result<Disaster, Error> {
        self.get(&["disasters", id], "Failed to fetch disaster").await
    }

    /// Several disasters, fetched concurrently.
    ///
    /// Results are in the order of `ids`.
    ///
    /// # Errors
    ///
    /// Fails as a whole if any single fetch fails.
    pub async fn disasters_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<Disaster>, Error> {
        try_join_all(ids.iter().map(|id| self.disaster(id.as_ref()))).await
    }

    /// Create a disaster.
    ///
    /// # Errors
    ///
    /// Fails without a network call if the draft is invalid, and otherwise
    /// if the backend rejects it.
    pub async fn create_disaster(&self, draft: &DisasterDraft) -> Result<Disaster, Error> {
        let draft = draft.validated()?;
        self.send(Method::POST, &["disasters", "create"], &draft, "Failed to create disaster")
            .await
    }

    /// Replace a disaster's editable fields.
    ///
    /// # Errors
    ///
    /// Fails without a network call if the draft is invalid, and otherwise
    /// if the backend rejects it.
    pub async fn update_disaster(
        &self,
        id: &str,
        draft: &DisasterDraft,
    ) -> Result<Disaster, Error> {
        let draft = draft.validated()?;
        self.send(Method::PUT, &["disasters", id], &draft, "Failed to update disaster")
            .await
    }

    /// Delete a disaster.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached or rejects the request.
    pub async fn delete_disaster(&self, id: &str) -> Result<(), Error> {
        self.delete(&["disasters", id], "Failed to delete disaster").await
    }

    /// Official updates published about a disaster.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached or rejects the request.
    pub async fn official_updates(&self, disaster_id: &str) -> Result<Vec<OfficialUpdate>, Error> {
        self.get(
            &["disasters", disaster_id, "official-updates"],
            "Failed to fetch official updates",
        )
        .await
    }

    // Reports

    /// All reports.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached or rejects the request.
    pub async fn reports(&self) -> Result<Vec<Report>, Error> {
        self.get(&["reports"], "Failed to fetch reports").await
    }

    /// A single report.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached or has no such report.
    pub async fn report(&self, id: &str) -> Result<Report, Error> {
        self.get(&["reports", id], "Failed to fetch report").await
    }

    /// Submit a report.
    ///
    /// # Errors
    ///
    /// Fails without a network call if the draft is invalid, and otherwise
    /// if the backend rejects it.
    pub async fn create_report(&self, draft: &ReportDraft) -> Result<Report, Error> {
        let draft = draft.validated()?;
        self.send(Method::POST, &["reports", "create"], &draft, "Failed to create report")
            .await
    }

    /// Apply a partial update to a report.
    ///
    /// # Errors
    ///
    /// Fails without a network call if the patch is empty or invalid, and
    /// otherwise if the backend rejects it.
    pub async fn update_report(&self, id: &str, patch: &ReportPatch) -> Result<Report, Error> {
        let patch = patch.validated()?;
        self.send(Method::PUT, &["reports", id], &patch, "Failed to update report")
            .await
    }

    /// Record a review outcome for a pending report.
    ///
    /// # Errors
    ///
    /// Fails without a network call if the report has already been reviewed,
    /// and otherwise if the backend rejects the update.
    pub async fn verify_report(
        &self,
        report: &Report,
        status: VerificationStatus,
    ) -> Result<Report, Error> {
        let patch = ReportPatch::verification(report, status)?;
        self.update_report(&report.id, &patch).await
    }

    /// Delete a report.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached or rejects the request.
    pub async fn delete_report(&self, id: &str) -> Result<(), Error> {
        self.delete(&["reports", id], "Failed to delete report").await
    }

    // Resources

    /// All resources.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached or rejects the request.
    pub async fn resources(&self) -> Result<Vec<Resource>, Error> {
        self.get(&["resources"], "Failed to fetch resources").await
    }

    /// A single resource.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached or has no such resource.
    pub async fn resource(&self, id: &str) -> Result<Resource, Error> {
        self.get(&["resources", id], "Failed to fetch resource").await
    }

    /// Resources attached to a disaster.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached or rejects the request.
    pub async fn resources_for_disaster(&self, disaster_id: &str) -> Result<Vec<Resource>, Error> {
        self.get(
            &["resources", "disaster", disaster_id],
            "Failed to fetch disaster resources",
        )
        .await
    }

    /// Resources near a point.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached or rejects the request.
    pub async fn nearby_resources(&self, query: &NearbyQuery) -> Result<Vec<Resource>, Error> {
        let request = self
            .request(Method::GET, &["resources", "nearby"])
            .query(query);
        Ok(self
            .call(request, "Failed to fetch nearby resources")
            .await?
            .data)
    }

    /// Create a resource.
    ///
    /// # Errors
    ///
    /// Fails without a network call if the draft is invalid, and otherwise
    /// if the backend rejects it.
    pub async fn create_resource(&self, draft: &ResourceDraft) -> Result<Resource, Error> {
        let draft = draft.validated()?;
        self.send(Method::POST, &["resources", "create"], &draft, "Failed to create resource")
            .await
    }

    /// Replace a resource's editable fields.
    ///
    /// The id travels in the body.
    ///
    /// # Errors
    ///
    /// Fails without a network call if the draft is invalid, and otherwise
    /// if the backend rejects it.
    pub async fn update_resource(
        &self,
        id: &str,
        draft: &ResourceDraft,
    ) -> Result<Resource, Error> {
        let draft = draft.validated()?;
        let body = ResourceUpdate { id, draft: &draft };
        self.send(Method::PUT, &["resources", "update"], &body, "Failed to update resource")
            .await
    }

    /// Delete a resource.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached or rejects the request.
    pub async fn delete_resource(&self, id: &str) -> Result<(), Error> {
        self.delete(&["resources", "delete", id], "Failed to delete resource")
            .await
    }

    // AI assistance

    /// Ask the backend to assess the authenticity of a report image.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached or rejects the request.
    pub async fn verify_image(
        &self,
        report_id: &str,
        image_url: &str,
    ) -> Result<ImageAnalysis, Error> {
        self.send(
            Method::POST,
            &["ai", "verify-image", report_id],
            &ImageCheck { image_url },
            "Failed to verify image",
        )
        .await
    }

    /// Extract a location from a free-text description.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached or rejects the request.
    pub async fn geolocate(&self, description: &str) -> Result<Geolocation, Error> {
        self.send(
            Method::POST,
            &["ai", "geolocation"],
            &Description { description },
            "Failed to get geolocation",
        )
        .await
    }

    // Cache

    /// Read a cache entry.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached or has no such entry.
    pub async fn cache_entry(&self, key: &str) -> Result<Value, Error> {
        self.get(&["cache", key], "Failed to fetch cache").await
    }

    /// Store a cache entry, returning the backend's acknowledgement.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached or rejects the request.
    pub async fn set_cache(&self, entry: &CacheEntry) -> Result<Option<String>, Error> {
        let request = self.request(Method::POST, &["cache"]).json(entry);
        let envelope = self.call::<IgnoredAny>(request, "Failed to set cache").await?;
        Ok(envelope.message)
    }

    /// Remove a cache entry.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached or rejects the request.
    pub async fn delete_cache(&self, key: &str) -> Result<(), Error> {
        self.delete(&["cache", key], "Failed to delete cache").await
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        tracing::debug!(%method, %url, "sending request");
        self.http.request(method, url)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> Result<envelope::Envelope<T>, Error> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(operation, e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(operation, e))?;
        tracing::debug!(status = status.as_u16(), bytes = body.len(), "received response");

        if !status.is_success() {
            let message =
                envelope::error_message(&body).unwrap_or_else(|| operation.to_string());
            return Err(Error::Status {
                status: status.as_u16(),
                message,
            });
        }

        envelope::decode(&body, operation)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        operation: &str,
    ) -> Result<T, Error> {
        let request = self.request(Method::GET, segments);
        Ok(self.call(request, operation).await?.data)
    }

    async fn send<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
        operation: &str,
    ) -> Result<T, Error>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(method, segments).json(body);
        Ok(self.call(request, operation).await?.data)
    }

    async fn delete(&self, segments: &[&str], operation: &str) -> Result<(), Error> {
        let request = self.request(Method::DELETE, segments);
        self.call::<IgnoredAny>(request, operation).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<(), Error> {
        let credentials = credentials.validated()?;
        let request = self
            .request(Method::POST, &["users", "login"])
            .json(&credentials);
        self.call::<IgnoredAny>(request, "Login failed").await?;
        Ok(())
    }

    async fn register(&self, registration: &Registration) -> Result<(), Error> {
        let registration = registration.validated()?;
        let request = self
            .request(Method::POST, &["users", "register"])
            .json(&registration);
        self.call::<IgnoredAny>(request, "Registration failed").await?;
        Ok(())
    }

    async fn logout(&self) -> Result<(), Error> {
        let request = self.request(Method::POST, &["users", "logout"]);
        self.call::<IgnoredAny>(request, "Logout failed").await?;
        Ok(())
    }

    async fn profile(&self) -> Result<User, Error> {
        let profile: Profile = self.get(&["users", "profile"], "Failed to fetch profile").await?;
        Ok(profile.into())
    }
}
