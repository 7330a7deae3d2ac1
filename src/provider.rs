//! Provider traits for dependency injection
//!
//! These define what can be stored in the container.

use std::any::Any;
use std::sync::Arc;

/// Type-erased service as stored and returned by the container
pub type AnyService = Arc<dyn Any + Send + Sync>;

/// Marker trait for types that can be stored in the container.
///
/// This is automatically implemented for all types that are `Send + Sync + 'static`.
/// You never need to implement this manually.
pub trait Injectable: Send + Sync + 'static {
    /// Returns the type name for debugging
    #[inline]
    fn type_name_of() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }
}

// Blanket implementation - everything that's Send + Sync + 'static is Injectable
impl<T: Send + Sync + 'static> Injectable for T {}

/// Erase a value into an [`AnyService`]
#[inline]
pub fn erase<T: Injectable>(value: T) -> AnyService {
    Arc::new(value) as AnyService
}

/// Erase an existing `Arc` without re-allocating
#[inline]
pub fn erase_arc<T: Injectable>(value: Arc<T>) -> AnyService {
    value as AnyService
}
