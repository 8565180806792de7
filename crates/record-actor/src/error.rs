//! # Framework Errors
//!
//! Errors raised by the store itself, independent of any record type. Record-specific
//! failures travel boxed inside [`FrameworkError::EntityError`] and can be recovered with
//! [`FrameworkError::into_entity_error`].

/// Errors that can occur within the record actor framework.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Record already exists: {0}")]
    AlreadyExists(String),
    #[error("Entity error: {0}")]
    EntityError(Box<dyn std::error::Error + Send + Sync>),
}

impl FrameworkError {
    /// Recovers the typed record error carried by `EntityError`.
    ///
    /// Any other variant, or an entity error of a different type, is handed back unchanged.
    pub fn into_entity_error<E>(self) -> Result<E, FrameworkError>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match self {
            FrameworkError::EntityError(inner) => match inner.downcast::<E>() {
                Ok(typed) => Ok(*typed),
                Err(other) => Err(FrameworkError::EntityError(other)),
            },
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error, PartialEq)]
    #[error("claim rejected")]
    struct ClaimRejected;

    #[test]
    fn test_entity_error_downcasts_to_original_type() {
        let err = FrameworkError::EntityError(Box::new(ClaimRejected));
        assert_eq!(err.into_entity_error::<ClaimRejected>().unwrap(), ClaimRejected);
    }

    #[test]
    fn test_other_variants_are_returned_untouched() {
        let err = FrameworkError::NotFound("order_7".into());
        match err.into_entity_error::<ClaimRejected>() {
            Err(FrameworkError::NotFound(id)) => assert_eq!(id, "order_7"),
            other => panic!("unexpected: {:?}", other),
        }

        let foreign = FrameworkError::EntityError(Box::new(std::io::Error::other("disk")));
        assert!(matches!(
            foreign.into_entity_error::<ClaimRejected>(),
            Err(FrameworkError::EntityError(_))
        ));
    }
}
