//! Industry labels - the coarse domain vocabulary for classification.

use crate::record_type::RecordType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse domain label attached to every page at classification time.
///
/// The variant order matters: classification iterates [`Industry::CLASSIFIED`]
/// in declaration order and breaks similarity ties in favor of the earlier
/// label. `General` is never scored directly - it is the default that wins
/// when no classified industry beats a zero similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Industry {
    /// Retail banking: cards, loans, accounts
    Banking,
    /// Online retail: products, carts, shipping
    Ecommerce,
    /// Insurance: policies, premiums, claims
    Insurance,
    /// Everything else
    General,
}

impl Industry {
    /// Industries that carry a keyword bag and compete during classification,
    /// in tie-break order. `General` is deliberately absent.
    pub const CLASSIFIED: [Industry; 3] =
        [Industry::Banking, Industry::Ecommerce, Industry::Insurance];

    /// Keyword bag whose embedding acts as this industry's prototype.
    ///
    /// Returns an empty slice for `General`, which has no prototype.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Industry::Banking => &[
                "credit card",
                "loan",
                "account",
                "interest rate",
                "bank",
                "deposit",
                "withdrawal",
            ],
            Industry::Ecommerce => &[
                "product", "price", "buy", "cart", "shipping", "delivery", "review", "rating",
            ],
            Industry::Insurance => &[
                "insurance", "policy", "premium", "coverage", "claim", "motor", "health",
            ],
            Industry::General => &[],
        }
    }

    /// Record types registered for this industry, in tie-break order.
    /// Every industry registers a subset; `General`'s doubles as the
    /// fallback vocabulary.
    pub fn record_types(&self) -> &'static [RecordType] {
        match self {
            Industry::Banking => &[
                RecordType::Product,
                RecordType::FinancialProduct,
                RecordType::Service,
                RecordType::Offer,
            ],
            Industry::Ecommerce => &[
                RecordType::Product,
                RecordType::Offer,
                RecordType::Review,
                RecordType::AggregateRating,
            ],
            Industry::Insurance => &[
                RecordType::Service,
                RecordType::Product,
                RecordType::Offer,
                RecordType::InsuranceAgency,
            ],
            Industry::General => &[
                RecordType::Product,
                RecordType::Service,
                RecordType::Organization,
                RecordType::WebPage,
            ],
        }
    }

    /// Canonical lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Industry::Banking => "banking",
            Industry::Ecommerce => "ecommerce",
            Industry::Insurance => "insurance",
            Industry::General => "general",
        }
    }

    /// Parse a label; unknown labels are rejected rather than coerced.
    pub fn parse(s: &str) -> Option<Industry> {
        match s {
            "banking" => Some(Industry::Banking),
            "ecommerce" => Some(Industry::Ecommerce),
            "insurance" => Some(Industry::Insurance),
            "general" => Some(Industry::General),
            _ => None,
        }
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
