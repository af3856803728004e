pub const APP_TITLE: &str = "Media Migrator";
pub const SESSION_COOKIE: &str = "migrator_session";

pub const ROUTE_INDEX: &str = "/";
pub const ROUTE_CONNECT: &str = "/connect";
pub const ROUTE_MIGRATE: &str = "/migrate";
pub const ROUTE_CANCEL: &str = "/cancel";
pub const ROUTE_RELOAD: &str = "/reload";
pub const ROUTE_SIGN_OUT: &str = "/sign-out";
pub const ROUTE_VIEW_JSON: &str = "/api/view";
pub const ROUTE_HEALTH: &str = "/health";

// Form field names; the handler form structs use the same identifiers.
pub const FIELD_APP_ID: &str = "app_id";
pub const FIELD_APP_SECRET: &str = "app_secret";
pub const FIELD_SOURCE: &str = "source";
pub const FIELD_DESTINATION: &str = "destination";

/// Reload interval while background work is in flight.
pub const REFRESH_SECS: u32 = 2;
