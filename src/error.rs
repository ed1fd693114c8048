use thiserror::Error;

/// Errors reported by the map containers and their cursors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum MapError {
    /// The key is not stored in the map.
    #[error("key not found")]
    NotFound,

    /// Removal was requested from a map without elements.
    #[error("container is empty")]
    EmptyContainer,

    /// A cursor was moved past the end or before the first element.
    #[error("iterator out of range")]
    IteratorOutOfRange,

    /// Memory for a new node could not be reserved.
    #[error("node allocation failed")]
    AllocationFailure,
}

/// Result type used throughout the crate.
pub type Result<T, E = MapError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::MapError;

    #[test]
    fn test_display() {
        assert_eq!(MapError::NotFound.to_string(), "key not found");
        assert_eq!(MapError::EmptyContainer.to_string(), "container is empty");
        assert_eq!(
            MapError::IteratorOutOfRange.to_string(),
            "iterator out of range"
        );
        assert_eq!(
            MapError::AllocationFailure.to_string(),
            "node allocation failed"
        );
    }

    #[test]
    fn test_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(MapError::NotFound);
        assert!(err.source().is_none());
    }
}
