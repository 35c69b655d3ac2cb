//! Well-known role name constants carried in access-token claims.

pub const ROLE_ADMIN: &str = "admin";
/// Machine principal used by the external scheduler (cron / webhooks).
pub const ROLE_SERVICE: &str = "service";
