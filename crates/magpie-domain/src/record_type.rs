//! Record types - the canonical schema.org vocabulary for extracted pages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical vocabulary type assigned to a page's structured attributes.
///
/// The catalog is small and fixed; each variant carries a natural-language
/// description whose embedding serves as the classification prototype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// A purchasable product
    Product,
    /// Credit cards, loans, accounts
    FinancialProduct,
    /// A service offered by an organization
    Service,
    /// A deal or promotion
    Offer,
    /// A customer review
    Review,
    /// Aggregated ratings and review counts
    AggregateRating,
    /// Company or organization information
    Organization,
    /// Generic web page content
    WebPage,
    /// Insurance products and policies
    InsuranceAgency,
}

impl RecordType {
    /// Every known record type, in catalog order.
    pub const ALL: [RecordType; 9] = [
        RecordType::Product,
        RecordType::FinancialProduct,
        RecordType::Service,
        RecordType::Offer,
        RecordType::Review,
        RecordType::AggregateRating,
        RecordType::Organization,
        RecordType::WebPage,
        RecordType::InsuranceAgency,
    ];

    /// Natural-language description embedded once at classifier startup
    /// as this type's nearest-prototype anchor.
    pub fn description(&self) -> &'static str {
        match self {
            RecordType::Product => {
                "A product available for purchase with name, price, brand, description"
            }
            RecordType::FinancialProduct => {
                "Financial products like credit cards, loans, accounts with fees, interest rates"
            }
            RecordType::Service => "Services offered by organizations with pricing and terms",
            RecordType::Offer => "Offers, deals, promotions with prices and conditions",
            RecordType::Review => "Customer reviews and ratings",
            RecordType::AggregateRating => "Aggregated ratings and review counts",
            RecordType::Organization => "Company or organization information",
            RecordType::WebPage => "Web page content and metadata",
            RecordType::InsuranceAgency => "Insurance products and policies",
        }
    }

    /// Canonical schema.org type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Product => "Product",
            RecordType::FinancialProduct => "FinancialProduct",
            RecordType::Service => "Service",
            RecordType::Offer => "Offer",
            RecordType::Review => "Review",
            RecordType::AggregateRating => "AggregateRating",
            RecordType::Organization => "Organization",
            RecordType::WebPage => "WebPage",
            RecordType::InsuranceAgency => "InsuranceAgency",
        }
    }

    /// Parse a schema.org type name.
    pub fn parse(s: &str) -> Option<RecordType> {
        RecordType::ALL.into_iter().find(|rt| rt.as_str() == s)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
