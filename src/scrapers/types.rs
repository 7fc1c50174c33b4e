use serde::{Deserialize, Serialize};

/// How an attribute value is compared against a [`NodeSignature`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AttrMatch {
    Prefix,
    Exact,
}

/// Tag name plus one attribute used to recognise a structural anchor in markup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeSignature {
    pub tag: String,
    pub attribute: String,
    pub value: String,
    pub mode: AttrMatch,
}

impl NodeSignature {
    /// Signature matching any `tag` whose `attribute` starts with `prefix`
    pub fn prefix(tag: &str, attribute: &str, prefix: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attribute: attribute.to_string(),
            value: prefix.to_string(),
            mode: AttrMatch::Prefix,
        }
    }

    /// Signature matching any `tag` whose `attribute` equals `value`
    pub fn exact(tag: &str, attribute: &str, value: &str) -> Self {
        Self {
            mode: AttrMatch::Exact,
            ..Self::prefix(tag, attribute, value)
        }
    }

    pub fn accepts(&self, value: &str) -> bool {
        match self.mode {
            AttrMatch::Prefix => value.starts_with(&self.value),
            AttrMatch::Exact => value == self.value,
        }
    }
}

/// Fixed markup signatures of the auction site.
///
/// The site is built with utility CSS classes, so most anchors are matched
/// on the leading part of their `class` attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteLayout {
    /// Path appended to the base URL, followed by the page number
    pub listing_path: String,
    /// Container that only exists while a page still has results
    pub results_grid: NodeSignature,
    /// `href` prefix of anchors that point at detail pages
    pub detail_href_prefix: String,
    pub pricing_section: NodeSignature,
    /// Element inside the pricing section that holds the asking price
    pub price_value: NodeSignature,
    pub about_section: NodeSignature,
    /// Bold value cells inside the about section, in fixed order
    pub bold_label: NodeSignature,
    pub description: NodeSignature,
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self {
            listing_path: "/auction?page=".to_string(),
            results_grid: NodeSignature::prefix(
                "div",
                "class",
                "grid grid-cols-1 gap-4 md:grid-cols-2 lg:grid-cols-2 xl:grid-cols-3 xl:gap-8",
            ),
            detail_href_prefix: "/auto/".to_string(),
            pricing_section: NodeSignature::prefix("div", "class", "ds-vehicle-card-pricings"),
            price_value: NodeSignature::prefix("div", "class", "text-high-dark text-xl"),
            about_section: NodeSignature::prefix("section", "class", "vehicle-about"),
            bold_label: NodeSignature::exact("div", "class", "font-bold"),
            description: NodeSignature::prefix("div", "class", "[&_p]:text-body"),
        }
    }
}

impl SiteLayout {
    /// Absolute URL of listing page `page` (1-based)
    pub fn listing_url(&self, base_url: &str, page: u32) -> String {
        format!("{}{}{}", base_url.trim_end_matches('/'), self.listing_path, page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_url_joins_without_double_slash() {
        let layout = SiteLayout::default();
        assert_eq!(
            layout.listing_url("https://cars.example.com/", 3),
            "https://cars.example.com/auction?page=3"
        );
    }

    #[test]
    fn exact_signature_rejects_longer_values() {
        let sig = NodeSignature::exact("div", "class", "font-bold");
        assert!(sig.accepts("font-bold"));
        assert!(!sig.accepts("font-bold text-lg"));
        assert!(NodeSignature::prefix("div", "class", "font-bold").accepts("font-bold text-lg"));
    }
}
