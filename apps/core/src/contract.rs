use serde::{Deserialize, Serialize};

use crate::model::{FuzzyInfo, ItemState, RankedItem};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    #[default]
    Regular,
}

/// One result line as the host consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryItem {
    pub identifier: String,
    pub text: String,
    pub subtext: String,
    pub icon: String,
    pub provider: String,
    pub score: i32,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub state: Vec<ItemState>,
    #[serde(rename = "fuzzyinfo", skip_serializing_if = "Option::is_none", default)]
    pub fuzzy_info: Option<FuzzyInfo>,
}

impl QueryItem {
    pub fn from_ranked(provider: &str, item: RankedItem) -> Self {
        Self {
            identifier: item.identifier,
            text: item.text,
            subtext: item.subtext,
            icon: item.icon,
            provider: provider.to_string(),
            score: item.score,
            item_type: ItemType::Regular,
            state: item.state,
            fuzzy_info: item.fuzzy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub qid: u32,
    pub iid: u32,
    pub items: Vec<QueryItem>,
}

impl QueryResponse {
    pub fn new(qid: u32, iid: u32, provider: &str, items: Vec<RankedItem>) -> Self {
        Self {
            qid,
            iid,
            items: items
                .into_iter()
                .map(|item| QueryItem::from_ranked(provider, item))
                .collect(),
        }
    }
}
