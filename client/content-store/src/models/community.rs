use crate::services::feed::FeedScope;
use serde::{Deserialize, Serialize};

/// The place a user has picked as their community.
///
/// Resolves to one canonical label used to scope posts. Changing the
/// selection never rewrites existing posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommunitySelection {
    /// Coarse picker variant
    Area {
        #[serde(rename = "communityId")]
        community_id: String,
        #[serde(rename = "areaId")]
        area_id: String,
    },
    Place {
        #[serde(default)]
        country: String,
        #[serde(default)]
        region: String,
        #[serde(default)]
        city: String,
    },
}

impl CommunitySelection {
    pub fn place(
        country: impl Into<String>,
        region: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        CommunitySelection::Place {
            country: country.into(),
            region: region.into(),
            city: city.into(),
        }
    }

    pub fn area(community_id: impl Into<String>, area_id: impl Into<String>) -> Self {
        CommunitySelection::Area {
            community_id: community_id.into(),
            area_id: area_id.into(),
        }
    }

    /// Canonical community label: non-empty parts, most specific first,
    /// joined with `", "`.
    ///
    /// ```
    /// use content_store::models::CommunitySelection;
    ///
    /// let denver = CommunitySelection::place("United States", "Colorado", "Denver");
    /// assert_eq!(denver.label(), "Denver, Colorado, United States");
    ///
    /// let no_region = CommunitySelection::place("Ghana", "", "Accra");
    /// assert_eq!(no_region.label(), "Accra, Ghana");
    /// ```
    pub fn label(&self) -> String {
        let parts: Vec<&str> = match self {
            CommunitySelection::Place {
                country,
                region,
                city,
            } => vec![city, region, country],
            CommunitySelection::Area {
                community_id,
                area_id,
            } => vec![area_id, community_id],
        }
        .into_iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

        parts.join(", ")
    }

    pub fn is_empty(&self) -> bool {
        self.label().is_empty()
    }
}

impl Default for CommunitySelection {
    fn default() -> Self {
        CommunitySelection::place("", "", "")
    }
}

/// Cached identity details shown in the composer and header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSettings {
    #[serde(default)]
    pub default_scope: FeedScope,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_label() {
        let selection = CommunitySelection::area("denver-metro", "capitol-hill");
        assert_eq!(selection.label(), "capitol-hill, denver-metro");
    }

    #[test]
    fn test_empty_selection() {
        assert!(CommunitySelection::default().is_empty());
        assert_eq!(CommunitySelection::place(" ", "", "").label(), "");
    }

    #[test]
    fn test_untagged_decoding_picks_variant() {
        let place: CommunitySelection =
            serde_json::from_str(r#"{"country":"United States","region":"Colorado","city":"Denver"}"#)
                .unwrap();
        assert_eq!(place.label(), "Denver, Colorado, United States");

        let area: CommunitySelection =
            serde_json::from_str(r#"{"communityId":"denver-metro","areaId":"lodo"}"#).unwrap();
        assert_eq!(area, CommunitySelection::area("denver-metro", "lodo"));
    }

    #[test]
    fn test_feed_settings_default_local() {
        assert_eq!(FeedSettings::default().default_scope, FeedScope::Local);
    }
}
