//! Section module - a line-range sub-document within a larger text

use crate::CategoryId;
use std::fmt;

/// Errors raised by section invariants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionError {
    /// Line range violates `1 <= start_line <= end_line`
    InvalidRange {
        /// Reported start line
        start_line: usize,
        /// Reported end line
        end_line: usize,
    },

    /// The category was already assigned once
    CategoryAlreadyAssigned(CategoryId),
}

impl fmt::Display for SectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionError::InvalidRange { start_line, end_line } => {
                write!(f, "invalid line range {}..{}", start_line, end_line)
            }
            SectionError::CategoryAlreadyAssigned(category) => {
                write!(f, "category already assigned: {}", category)
            }
        }
    }
}

impl std::error::Error for SectionError {}

/// A contiguous sub-document identified within an extracted text blob
///
/// Everything except `category` is fixed at construction. The category is
/// bound exactly once, by categorization.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    content: String,
    start_line: usize,
    end_line: usize,
    description: Option<String>,
    category: Option<CategoryId>,
}

impl Section {
    /// Create a new uncategorized section
    ///
    /// # Errors
    ///
    /// Returns [`SectionError::InvalidRange`] unless `1 <= start_line <= end_line`.
    pub fn new(
        content: impl Into<String>,
        start_line: usize,
        end_line: usize,
    ) -> Result<Self, SectionError> {
        if start_line == 0 || end_line < start_line {
            return Err(SectionError::InvalidRange { start_line, end_line });
        }
        Ok(Self {
            content: content.into(),
            start_line,
            end_line,
            description: None,
            category: None,
        })
    }

    /// Section covering lines `1..=line_count` (at least one line)
    pub fn spanning(content: impl Into<String>, line_count: usize) -> Self {
        Self {
            content: content.into(),
            start_line: 1,
            end_line: line_count.max(1),
            description: None,
            category: None,
        }
    }

    /// Attach a human-readable description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Raw section text, sliced from the original line array
    pub fn content(&self) -> &str {
        &self.content
    }

    /// First line (1-based, inclusive)
    pub fn start_line(&self) -> usize {
        self.start_line
    }

    /// Last line (1-based, inclusive)
    pub fn end_line(&self) -> usize {
        self.end_line
    }

    /// Short description supplied by segmentation, if any
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Assigned category, if categorization has run
    pub fn category(&self) -> Option<&CategoryId> {
        self.category.as_ref()
    }

    /// Bind the section's category
    ///
    /// # Errors
    ///
    /// Returns [`SectionError::CategoryAlreadyAssigned`] on a second call.
    pub fn assign_category(&mut self, category: CategoryId) -> Result<(), SectionError> {
        if let Some(existing) = &self.category {
            return Err(SectionError::CategoryAlreadyAssigned(existing.clone()));
        }
        self.category = Some(category);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_creation() {
        let section = Section::new("hello", 1, 3).unwrap().with_description("letter");
        assert_eq!(section.content(), "hello");
        assert_eq!(section.start_line(), 1);
        assert_eq!(section.end_line(), 3);
        assert_eq!(section.description(), Some("letter"));
        assert!(section.category().is_none());
    }

    #[test]
    fn test_single_line_section() {
        assert!(Section::new("x", 4, 4).is_ok());
    }

    #[test]
    fn test_invalid_ranges() {
        assert_eq!(
            Section::new("x", 0, 2),
            Err(SectionError::InvalidRange { start_line: 0, end_line: 2 })
        );
        assert!(Section::new("x", 5, 4).is_err());
    }

    #[test]
    fn test_category_assigned_once() {
        let mut section = Section::new("x", 1, 1).unwrap();
        section.assign_category(CategoryId::new("company_formation")).unwrap();

        let second = section.assign_category(CategoryId::new("business_activities"));
        assert!(matches!(second, Err(SectionError::CategoryAlreadyAssigned(_))));
        assert_eq!(section.category().map(CategoryId::as_str), Some("company_formation"));
    }

    #[test]
    fn test_spanning_section() {
        let section = Section::spanning("a\nb", 2);
        assert_eq!((section.start_line(), section.end_line()), (1, 2));

        let empty = Section::spanning("", 0);
        assert_eq!(empty.end_line(), 1);
    }
}
