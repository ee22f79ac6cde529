use crate::host::HostError;

/// Error type for the initialization sequence.
///
/// Only resource loading is fatal; injection failures are reported, not raised.
#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    #[error("Failed to load resource '{path}': {source}")]
    Resource {
        path: String,
        #[source]
        source: HostError,
    },
}
