use crate::error::HostError;
use crate::overlay::OverlayHost;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Id of the attachment container shared by every overlay that does not ask for another one.
pub const DEFAULT_CONTAINER_ID: &str = "portals";

/// Attachment containers of one document, keyed by container id.
///
/// A container is created the first time its id is asked for and then handed out to every
/// later caller. Entries are never removed: a container lives as long as its document.
#[derive(Debug)]
pub struct PortalRegistry<E> {
    containers: Mutex<HashMap<String, E>>,
}

impl<E> Default for PortalRegistry<E> {
    fn default() -> Self {
        PortalRegistry {
            containers: Mutex::new(HashMap::new()),
        }
    }
}

impl<E: Clone> PortalRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the container for `id`, running `create` only if none is registered yet
    ///
    /// The registry stays locked while `create` runs, so concurrent callers never create the
    /// same container twice. A failed `create` registers nothing.
    ///
    /// # Arguments
    /// * `id` - Container id, e.g. [`DEFAULT_CONTAINER_ID`]
    /// * `create` - Builds the container on first use
    ///
    /// # Returns
    /// * `Result<E, HostError>` - The registered container, or the error from `create`
    ///
    /// # Examples
    /// ```
    /// use tracker::portal::PortalRegistry;
    ///
    /// let registry = PortalRegistry::new();
    /// assert_eq!(registry.get_or_create("portals", || Ok(1)).unwrap(), 1);
    /// assert_eq!(registry.get_or_create("portals", || Ok(2)).unwrap(), 1);
    /// assert_eq!(registry.get("portals"), Some(1));
    /// ```
    pub fn get_or_create<F>(&self, id: &str, create: F) -> Result<E, HostError>
    where
        F: FnOnce() -> Result<E, HostError>,
    {
        let mut containers = self
            .containers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = containers.get(id) {
            return Ok(existing.clone());
        }

        let container = create()?;
        containers.insert(id.to_string(), container.clone());
        Ok(container)
    }

    /// The container registered for `id`, without creating one
    pub fn get(&self, id: &str) -> Option<E> {
        self.containers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Number of containers created so far
    pub fn len(&self) -> usize {
        self.containers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolve the attachment point for `id`, creating it under the document body on first use.
///
/// Returns `Ok(None)` when the host has no live document.
pub fn attachment_point<H: OverlayHost>(
    host: &H,
    id: &str,
) -> Result<Option<H::Element>, HostError> {
    let Some(body) = host.body() else {
        return Ok(None);
    };

    host.portals()
        .get_or_create(id, || match host.find_by_id(id) {
            Some(existing) => Ok(existing),
            None => {
                log::debug!("Creating portal container #{}", id);
                host.create_portal_container(&body, id)
            }
        })
        .map(Some)
}
