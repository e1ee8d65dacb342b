use crate::config::PlatformOptions;
use crate::entity::EntityRegistry;
use crate::error::AppError;

/// Provider that turns a `[[sensor]]` block into entities
pub trait PlatformProvider: Send + Sync {
    /// Value of the `platform` key this provider answers to
    fn name(&self) -> &str;

    /// Validate `options` and add the resulting entities to `registry`.
    ///
    /// Must not perform network I/O; entities fetch on their first update.
    fn setup(&self, options: &PlatformOptions, registry: &mut EntityRegistry) -> Result<(), AppError>;
}
