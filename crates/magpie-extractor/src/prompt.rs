//! LLM prompt engineering for structured-data extraction

use magpie_domain::RecordType;
use magpie_llm::ChatMessage;

/// System instruction sent with every extraction request
pub const SYSTEM_INSTRUCTIONS: &str = "You are a data extraction expert that extracts structured \
data according to a canonical record-type vocabulary. Always return valid JSON only.";

/// Builds prompts for the LLM to extract record attributes
pub struct PromptBuilder {
    excerpt: String,
    record_type: RecordType,
}

impl PromptBuilder {
    /// Create a prompt builder over a bounded document excerpt.
    ///
    /// The excerpt is cut at `max_excerpt_chars` on a char boundary; page
    /// bodies can be arbitrarily long but extraction only needs the head.
    pub fn new(text: &str, record_type: RecordType, max_excerpt_chars: usize) -> Self {
        Self {
            excerpt: char_prefix(text, max_excerpt_chars).to_string(),
            record_type,
        }
    }

    /// Build the full message sequence for one extraction call.
    pub fn build(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(SYSTEM_INSTRUCTIONS),
            ChatMessage::user(self.user_prompt()),
        ]
    }

    fn user_prompt(&self) -> String {
        let type_name = self.record_type.as_str();
        format!(
            "Extract structured data from the following web content and normalize it \
according to the {type_name} record type.\n\n\
Content:\n{excerpt}\n\n\
Extract and return a JSON object with the following structure based on {type_name}:\n\
- Include all relevant properties for {type_name}\n\
- Normalize field names to match the canonical vocabulary conventions\n\
- Extract prices, ratings, dates, and other structured data\n\
- Return only valid JSON, no markdown formatting\n\n\
{type_name} properties to consider:\n\
- name, description, brand, price, priceCurrency\n\
{hints}\n\n\
Return JSON only:",
            excerpt = self.excerpt,
            hints = field_hints(self.record_type),
        )
    }
}

/// Canonical field hints per record type. Types without a dedicated hint
/// line fall back to the common properties above.
fn field_hints(record_type: RecordType) -> &'static str {
    match record_type {
        RecordType::FinancialProduct => {
            "- For FinancialProduct: annualFee, interestRate, rewards, benefits"
        }
        RecordType::Product => "- For Product: aggregateRating, reviewCount, availability, offers",
        RecordType::Service => "- For Service: serviceType, areaServed, provider",
        RecordType::Offer => {
            "- For Offer: price, priceCurrency, availability, validFrom, validThrough"
        }
        _ => "- Include any other structured properties present in the content",
    }
}

/// Longest prefix of `text` holding at most `max_chars` chars, cut on a char
/// boundary.
fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
