//! Related-industries table
//!
//! Experience in a related industry earns partial industry credit. The table
//! is a product decision and is kept verbatim; it is not symmetric.

const RELATED_INDUSTRIES: &[(&str, &[&str])] = &[
    ("real_estate", &["property_management", "construction", "mortgage", "finance", "insurance"]),
    ("healthcare", &["medical", "dental", "pharmaceutical", "wellness", "insurance"]),
    ("medical", &["healthcare", "dental", "pharmaceutical", "wellness"]),
    ("finance", &["banking", "accounting", "insurance", "investment", "real_estate"]),
    ("accounting", &["finance", "banking", "bookkeeping", "tax"]),
    ("technology", &["saas", "software", "it_services", "telecommunications", "startups"]),
    ("saas", &["technology", "software", "startups", "it_services"]),
    ("ecommerce", &["retail", "marketing", "logistics", "consumer_goods"]),
    ("retail", &["ecommerce", "consumer_goods", "hospitality"]),
    ("legal", &["compliance", "insurance", "real_estate", "government"]),
    ("marketing", &["advertising", "media", "public_relations", "ecommerce"]),
    ("education", &["training", "publishing", "nonprofit", "coaching"]),
    ("hospitality", &["travel", "events", "food_and_beverage", "retail"]),
    ("consulting", &["coaching", "finance", "technology", "marketing"]),
    ("nonprofit", &["education", "government", "healthcare"]),
];

/// Industries considered related to a normalized target industry
///
/// ```
/// use staffline_match_engine::scoring::industries::related_industries;
///
/// assert!(related_industries("real_estate").contains(&"mortgage"));
/// assert!(related_industries("space_mining").is_empty());
/// ```
pub fn related_industries(target: &str) -> &'static [&'static str] {
    RELATED_INDUSTRIES
        .iter()
        .find(|(industry, _)| *industry == target)
        .map(|(_, related)| *related)
        .unwrap_or(&[])
}

/// Whether `candidate` appears in the related list for `target`
pub fn is_related(target: &str, candidate: &str) -> bool {
    related_industries(target).contains(&candidate)
}
