use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Lifecycle state shared by campaigns, ad groups and keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityState {
    Enabled,
    Paused,
    Archived,
    #[serde(other)]
    Unknown,
}

impl EntityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityState::Enabled => "enabled",
            EntityState::Paused => "paused",
            EntityState::Archived => "archived",
            EntityState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EntityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchType {
    Exact,
    Phrase,
    Broad,
    NegativePhrase,
    NegativeExact,
    #[serde(other)]
    Other,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Phrase => "phrase",
            MatchType::Broad => "broad",
            MatchType::NegativePhrase => "negativePhrase",
            MatchType::NegativeExact => "negativeExact",
            MatchType::Other => "other",
        }
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, MatchType::NegativePhrase | MatchType::NegativeExact)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    #[serde(with = "entity_id")]
    pub campaign_id: String,
    #[serde(default)]
    pub name: String,
    pub state: EntityState,
    #[serde(default)]
    pub daily_budget: f64,
    #[serde(default)]
    pub targeting_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdGroup {
    #[serde(with = "entity_id")]
    pub ad_group_id: String,
    #[serde(with = "entity_id")]
    pub campaign_id: String,
    #[serde(default)]
    pub name: String,
    pub state: EntityState,
    #[serde(default)]
    pub default_bid: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyword {
    #[serde(with = "entity_id")]
    pub keyword_id: String,
    #[serde(with = "entity_id")]
    pub ad_group_id: String,
    #[serde(with = "entity_id")]
    pub campaign_id: String,
    #[serde(default)]
    pub keyword_text: String,
    pub match_type: MatchType,
    pub state: EntityState,
    #[serde(default)]
    pub bid: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegativeKeyword {
    #[serde(with = "entity_id")]
    pub keyword_id: String,
    #[serde(with = "entity_id")]
    pub campaign_id: String,
    #[serde(default, with = "optional_entity_id")]
    pub ad_group_id: Option<String>,
    #[serde(default)]
    pub keyword_text: String,
    pub match_type: MatchType,
    pub state: EntityState,
}

/// Filter for keyword listing; an empty filter lists the whole profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordFilter {
    pub campaign_id: Option<String>,
    pub ad_group_id: Option<String>,
}

impl KeywordFilter {
    pub fn is_empty(&self) -> bool {
        self.campaign_id.is_none() && self.ad_group_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordUpdate {
    #[serde(serialize_with = "entity_id::serialize")]
    pub keyword_id: String,
    pub bid: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<EntityState>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewKeyword {
    #[serde(serialize_with = "entity_id::serialize")]
    pub campaign_id: String,
    #[serde(serialize_with = "entity_id::serialize")]
    pub ad_group_id: String,
    pub keyword_text: String,
    pub match_type: MatchType,
    pub state: EntityState,
    pub bid: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNegativeKeyword {
    #[serde(serialize_with = "entity_id::serialize")]
    pub campaign_id: String,
    pub keyword_text: String,
    pub match_type: MatchType,
    pub state: EntityState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<EntityState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_budget: Option<f64>,
}

impl CampaignUpdate {
    pub fn state(state: EntityState) -> Self {
        Self {
            state: Some(state),
            daily_budget: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCampaign {
    pub name: String,
    pub campaign_type: String,
    pub targeting_type: String,
    pub state: EntityState,
    pub daily_budget: f64,
    /// YYYYMMDD
    pub start_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAdGroup {
    #[serde(serialize_with = "entity_id::serialize")]
    pub campaign_id: String,
    pub name: String,
    pub state: EntityState,
    pub default_bid: f64,
}

/// Per-item result returned by every mutation endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResult {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default, with = "optional_entity_id")]
    pub keyword_id: Option<String>,
    #[serde(default, with = "optional_entity_id")]
    pub campaign_id: Option<String>,
    #[serde(default, with = "optional_entity_id")]
    pub ad_group_id: Option<String>,
}

impl MutationResult {
    pub fn is_success(&self) -> bool {
        self.code == "SUCCESS"
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Unsigned(u64),
    Signed(i64),
    Text(String),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Unsigned(n) => n.to_string(),
            RawId::Signed(n) => n.to_string(),
            RawId::Text(s) => s,
        }
    }
}

/// Entity ids arrive as JSON numbers but are handled as strings; numeric ids go
/// back out as numbers.
pub(crate) mod entity_id {
    use super::*;

    pub fn serialize<S: Serializer>(id: &str, serializer: S) -> Result<S::Ok, S::Error> {
        match id.parse::<u64>() {
            Ok(n) => serializer.serialize_u64(n),
            Err(_) => serializer.serialize_str(id),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        RawId::deserialize(deserializer).map(String::from)
    }
}

pub(crate) mod optional_entity_id {
    use super::*;

    pub fn serialize<S: Serializer>(id: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => entity_id::serialize(id, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
    }
}
