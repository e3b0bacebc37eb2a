//! Errors raised by the host document model.

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Hierarchy request error: {0}")]
    HierarchyRequest(String),

    #[error("Operation requires an element node, found {0}")]
    NotAnElement(String),

    #[error("Element <{element_name}> is not a canvas")]
    NotACanvas { element_name: String },

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Failed to encode canvas pixels: {0}")]
    ImageEncoding(String),
}

/// Result type for document model operations
pub type DomResult<T> = Result<T, DomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomError::NotACanvas { element_name: "div".to_string() };
        assert_eq!(err.to_string(), "Element <div> is not a canvas");

        let err = DomError::InvalidSelector("div >".to_string());
        assert_eq!(err.to_string(), "Invalid selector: div >");
    }
}
