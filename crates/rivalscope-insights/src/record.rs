//! Typed accessors over loosely-structured competitor records.

use rivalscope_core::MarketAllowList;
use rivalscope_store::Document;
use serde::Serialize;

use crate::market::resolve_market;

pub const RATING_EXCELLENT: &str = "EXCELLENT";
pub const RATING_GOOD: &str = "GOOD";
pub const ACTIVITY_VERY_ACTIVE: &str = "VERY ACTIVE";

pub const CONTENT_RATING: &str = "content_marketing.overall_rating";
pub const CONTENT_ACTIVITY: &str = "content_marketing.activity_level";
pub const CONTENT_FREQUENCY: &str = "content_marketing.update_frequency";
pub const SOCIAL_PRESENCE: &str = "social_media.overall_presence";

/// Display-name attributes, in precedence order.
pub const NAME_FIELDS: [&str; 2] = ["company_name", "name"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    /// Content marketing rated excellent.
    SeoStar,
    /// Social presence rated excellent.
    SocialStar,
}

pub struct Competitor<'a> {
    doc: &'a Document,
}

impl<'a> Competitor<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self { doc }
    }

    pub fn display_name(&self) -> Option<&'a str> {
        NAME_FIELDS
            .iter()
            .find_map(|f| self.doc.get_str(f))
            .filter(|s| !s.trim().is_empty())
    }

    pub fn website(&self) -> Option<&'a str> {
        self.doc.get_str("website").filter(|s| !s.is_empty())
    }

    pub fn business_model(&self) -> Option<&'a str> {
        self.doc.get_str("business_model").filter(|s| !s.is_empty())
    }

    pub fn category(&self) -> Option<&'a str> {
        self.doc.get_str("category").filter(|s| !s.is_empty())
    }

    pub fn market(&self, allow: &MarketAllowList) -> Option<String> {
        resolve_market(self.doc, allow)
    }

    pub fn content_rating(&self) -> Option<&'a str> {
        self.doc.get_str(CONTENT_RATING)
    }

    pub fn activity_level(&self) -> Option<&'a str> {
        self.doc.get_str(CONTENT_ACTIVITY)
    }

    pub fn social_presence(&self) -> Option<&'a str> {
        self.doc.get_str(SOCIAL_PRESENCE)
    }

    pub fn badges(&self) -> Vec<Badge> {
        let mut out = Vec::new();
        if self.content_rating() == Some(RATING_EXCELLENT) {
            out.push(Badge::SeoStar);
        }
        if self.social_presence() == Some(RATING_EXCELLENT) {
            out.push(Badge::SocialStar);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: serde_json::Value) -> Document {
        Document::new(v.as_object().cloned().unwrap())
    }

    #[test]
    fn test_display_name_fallback() {
        let d = doc(json!({"name": "Acme"}));
        assert_eq!(Competitor::new(&d).display_name(), Some("Acme"));

        let d = doc(json!({"company_name": "Acme Oy", "name": "acme"}));
        assert_eq!(Competitor::new(&d).display_name(), Some("Acme Oy"));

        let d = doc(json!({"company_name": 12}));
        assert_eq!(Competitor::new(&d).display_name(), None);
    }

    #[test]
    fn test_badges() {
        let d = doc(json!({
            "content_marketing": {"overall_rating": "EXCELLENT"},
            "social_media": {"overall_presence": "GOOD"}
        }));
        assert_eq!(Competitor::new(&d).badges(), vec![Badge::SeoStar]);
        assert!(Competitor::new(&doc(json!({}))).badges().is_empty());
    }
}
