//! Application locations and the guard in front of them.
//!
//! Every screen of the application has a [`Route`]. Routes that change data
//! require a logged-in user; [`check`] turns a denied navigation into a
//! [`Redirect`] to the login screen that remembers where the user was going.

use std::{fmt, str::FromStr};

use url::form_urlencoded;

use crate::session::Session;

/// A location in the application.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/`
    Home,
    /// `/about`
    About,
    /// `/auth`
    Auth,
    /// `/auth/login`
    Login,
    /// `/auth/signup`
    Signup,
    /// `/disasters`
    Disasters,
    /// `/disasters/create`
    CreateDisaster,
    /// `/disasters/{id}`
    Disaster(String),
    /// `/disasters/{id}/edit`
    EditDisaster(String),
    /// `/disasters/{id}/delete`
    DeleteDisaster(String),
    /// `/disasters/{id}/resources`
    DisasterResources(String),
    /// `/disasters/{id}/resources/create`
    CreateDisasterResource(String),
    /// `/disasters/{id}/official-updates`
    OfficialUpdates(String),
    /// `/resources`
    Resources,
    /// `/resources/create`
    CreateResource,
    /// `/resources/nearby`
    NearbyResources,
    /// `/resources/{id}`
    Resource(String),
    /// `/resources/{id}/edit`
    EditResource(String),
    /// `/resources/{id}/delete`
    DeleteResource(String),
    /// `/reports`
    Reports,
    /// `/reports/create`
    CreateReport,
    /// `/reports/verification`
    ReportVerification,
    /// `/reports/priority-alerts`
    PriorityAlerts,
    /// `/reports/{id}`
    Report(String),
    /// `/reports/{id}/edit`
    EditReport(String),
    /// `/reports/{id}/delete`
    DeleteReport(String),
    /// `/cache`
    Cache,
}

impl Route {
    /// Whether entering the route needs a logged-in user.
    ///
    /// This holds for every route that creates, edits or deletes data, for
    /// report verification, and for the cache.
    #[must_use]
    pub const fn requires_auth(&self) -> bool {
        matches!(
            self,
            Self::CreateDisaster
                | Self::EditDisaster(_)
                | Self::DeleteDisaster(_)
                | Self::CreateDisasterResource(_)
                | Self::CreateResource
                | Self::EditResource(_)
                | Self::DeleteResource(_)
                | Self::CreateReport
                | Self::EditReport(_)
                | Self::DeleteReport(_)
                | Self::ReportVerification
                | Self::Cache
        )
    }
}

/// Error returned for a path that names no route.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no route matches '{0}'")]
pub struct UnknownRoute(String);

impl FromStr for Route {
    type Err = UnknownRoute;

    /// Parse an application path.
    ///
    /// Any query string or fragment is ignored, as are empty segments.
    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let bare = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = bare.split('/').filter(|s| !s.is_empty()).collect();

        let route = match segments.as_slice() {
            [] => Self::Home,
            ["about"] => Self::About,
            ["auth"] => Self::Auth,
            ["auth", "login"] => Self::Login,
            ["auth", "signup"] => Self::Signup,

            ["disasters"] => Self::Disasters,
            ["disasters", "create"] => Self::CreateDisaster,
            ["disasters", d] => Self::Disaster((*d).to_string()),
            ["disasters", d, "edit"] => Self::EditDisaster((*d).to_string()),
            ["disasters", d, "delete"] => Self::DeleteDisaster((*d).to_string()),
            ["disasters", d, "resources"] => Self::DisasterResources((*d).to_string()),
            ["disasters", d, "resources", "create"] => {
                Self::CreateDisasterResource((*d).to_string())
            }
            ["disasters", d, "official-updates"] => Self::OfficialUpdates((*d).to_string()),

            ["resources"] => Self::Resources,
            ["resources", "create"] => Self::CreateResource,
            ["resources", "nearby"] => Self::NearbyResources,
            ["resources", r] => Self::Resource((*r).to_string()),
            ["resources", r, "edit"] => Self::EditResource((*r).to_string()),
            ["resources", r, "delete"] => Self::DeleteResource((*r).to_string()),

            ["reports"] => Self::Reports,
            ["reports", "create"] => Self::CreateReport,
            ["reports", "verification"] => Self::ReportVerification,
            ["reports", "priority-alerts"] => Self::PriorityAlerts,
            ["reports", r] => Self::Report((*r).to_string()),
            ["reports", r, "edit"] => Self::EditReport((*r).to_string()),
            ["reports", r, "delete"] => Self::DeleteReport((*r).to_string()),

            ["cache"] => Self::Cache,

            _ => return Err(UnknownRoute(path.to_string())),
        };
        Ok(route)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => f.write_str("/"),
            Self::About => f.write_str("/about"),
            Self::Auth => f.write_str("/auth"),
            Self::Login => f.write_str("/auth/login"),
            Self::Signup => f.write_str("/auth/signup"),
            Self::Disasters => f.write_str("/disasters"),
            Self::CreateDisaster => f.write_str("/disasters/create"),
            Self::Disaster(id) => write!(f, "/disasters/{id}"),
            Self::EditDisaster(id) => write!(f, "/disasters/{id}/edit"),
            Self::DeleteDisaster(id) => write!(f, "/disasters/{id}/delete"),
            Self::DisasterResources(id) => write!(f, "/disasters/{id}/resources"),
            Self::CreateDisasterResource(id) => write!(f, "/disasters/{id}/resources/create"),
            Self::OfficialUpdates(id) => write!(f, "/disasters/{id}/official-updates"),
            Self::Resources => f.write_str("/resources"),
            Self::CreateResource => f.write_str("/resources/create"),
            Self::NearbyResources => f.write_str("/resources/nearby"),
            Self::Resource(id) => write!(f, "/resources/{id}"),
            Self::EditResource(id) => write!(f, "/resources/{id}/edit"),
            Self::DeleteResource(id) => write!(f, "/resources/{id}/delete"),
            Self::Reports => f.write_str("/reports"),
            Self::CreateReport => f.write_str("/reports/create"),
            Self::ReportVerification => f.write_str("/reports/verification"),
            Self::PriorityAlerts => f.write_str("/reports/priority-alerts"),
            Self::Report(id) => write!(f, "/reports/{id}"),
            Self::EditReport(id) => write!(f, "/reports/{id}/edit"),
            Self::DeleteReport(id) => write!(f, "/reports/{id}/delete"),
            Self::Cache => f.write_str("/cache"),
        }
    }
}

/// The result of guarding a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// The route may be entered.
    Granted,
    /// The user must log in first.
    Redirect(Redirect),
}

/// A detour to the login screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    from: Route,
}

impl Redirect {
    /// Where the user is sent.
    #[must_use]
    pub const fn to(&self) -> Route {
        Route::Auth
    }

    /// The route that was originally requested.
    #[must_use]
    pub const fn origin(&self) -> &Route {
        &self.from
    }

    /// The redirect target with the original route attached as a
    /// form-encoded `from` parameter, e.g. `/auth?from=%2Fdisasters%2Fcreate`.
    #[must_use]
    pub fn location(&self) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("from", &self.from.to_string())
            .finish();
        format!("{}?{query}", self.to())
    }

    /// Recover a redirect from a location produced by [`Redirect::location`].
    ///
    /// Returns `None` if the location is not the login screen or carries no
    /// recognisable `from` route.
    #[must_use]
    pub fn from_location(location: &str) -> Option<Self> {
        let (path, query) = location.split_once('?')?;
        if path.parse::<Route>().ok()? != Route::Auth {
            return None;
        }
        let query = query.split('#').next().unwrap_or_default();
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| *key == "from")
            .and_then(|(_, from)| from.parse().ok())
            .map(|from| Self { from })
    }

    /// Return to the original route once the session allows it.
    ///
    /// # Errors
    ///
    /// Gives the redirect back if the session still may not enter the
    /// original route.
    pub fn resume(self, session: &Session) -> Result<Route, Self> {
        if can_enter(&self.from, session) {
            Ok(self.from)
        } else {
            Err(self)
        }
    }
}

/// Whether `session` may enter `route`.
#[must_use]
pub const fn can_enter(route: &Route, session: &Session) -> bool {
    !route.requires_auth() || session.is_authenticated()
}

/// Guard a navigation to `route`.
#[must_use]
pub fn check(route: Route, session: &Session) -> Access {
    if can_enter(&route, session) {
        Access::Granted
    } else {
        tracing::debug!(%route, "navigation requires login");
        Access::Redirect(Redirect { from: route })
    }
}
