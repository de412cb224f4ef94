use crate::models::HealthRes;

/// Health check used by the REST API and by `patchctl`.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Static method to check health without creating an instance
    ///
    /// # Returns
    /// A `HealthRes` indicating the service is healthy.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Patchlist manager is alive".into(),
        }
    }
}
