//! Category identifiers for the closed document taxonomy

use std::borrow::Borrow;
use std::fmt;

/// Well-known category: company registration, licenses, certificates
pub const COMPANY_FORMATION: &str = "company_formation";

/// Well-known category: invoices, contracts, agreements
pub const BUSINESS_ACTIVITIES: &str = "business_activities";

/// Well-known category: compliance checks and verifications
pub const COMPLIANCE_CHECKS: &str = "compliance_checks";

/// Well-known category: financial statements and balance sheets
pub const FINANCIAL_DOCUMENTS: &str = "financial_documents";

/// Well-known category: ownership and control structure
pub const OWNERSHIP_CONTROL: &str = "ownership_control";

/// Identifier of one taxonomy category
///
/// The set of valid identifiers is owned by the schema registry. A
/// `CategoryId` on its own is just a normalized name; membership in the
/// taxonomy is always checked against the registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CategoryId(String);

impl CategoryId {
    /// Create a category id, normalizing surrounding whitespace and case
    ///
    /// # Examples
    ///
    /// ```
    /// use dossier_domain::CategoryId;
    ///
    /// let id = CategoryId::new("  Company_Formation ");
    /// assert_eq!(id.as_str(), "company_formation");
    /// ```
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_lowercase())
    }

    /// Get the category name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the id and return the owned name
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CategoryId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CategoryId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_category_normalization() {
        assert_eq!(CategoryId::new("Financial_Documents").as_str(), FINANCIAL_DOCUMENTS);
        assert_eq!(CategoryId::new("\tcompliance_checks\n").as_str(), COMPLIANCE_CHECKS);
    }

    #[test]
    fn test_lookup_by_str() {
        let set: BTreeSet<CategoryId> = [CategoryId::new(COMPANY_FORMATION)].into_iter().collect();
        assert!(set.contains(COMPANY_FORMATION));
        assert!(!set.contains(OWNERSHIP_CONTROL));
    }

    #[test]
    fn test_display() {
        assert_eq!(CategoryId::from("business_activities").to_string(), BUSINESS_ACTIVITIES);
    }
}
