use std::borrow::Cow;

use serde::{Deserialize, Serialize};

pub const PIN_BASE_SCORE: i32 = 1_000_000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchText {
    pub name: String,
    pub parent: String,
    pub generic_name: String,
    pub keywords: Vec<String>,
    pub comment: String,
}

impl SearchText {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Searchable fields in priority order; index 0 is always the name.
    pub fn fields(&self, only_title: bool) -> Vec<Cow<'_, str>> {
        if only_title {
            return vec![Cow::Borrowed(self.name.as_str())];
        }

        vec![
            Cow::Borrowed(self.name.as_str()),
            Cow::Borrowed(self.parent.as_str()),
            Cow::Borrowed(self.generic_name.as_str()),
            self.joined_keywords(),
            Cow::Borrowed(self.comment.as_str()),
        ]
    }

    fn joined_keywords(&self) -> Cow<'_, str> {
        match self.keywords.as_slice() {
            [] => Cow::Borrowed(""),
            [only] => Cow::Borrowed(only.as_str()),
            many => Cow::Owned(many.join(",")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Visibility {
    pub hidden: bool,
    pub no_display: bool,
    pub only_show_in: Vec<String>,
    pub not_show_in: Vec<String>,
}

impl Visibility {
    pub fn excludes(&self, desktop: Option<&str>) -> bool {
        if self.hidden || self.no_display {
            return true;
        }

        let desktop = desktop.unwrap_or_default();
        if !self.not_show_in.is_empty() && self.not_show_in.iter().any(|d| d == desktop) {
            return true;
        }

        !self.only_show_in.is_empty() && !self.only_show_in.iter().any(|d| d == desktop)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub action: String,
    pub text: SearchText,
    pub icon: String,
}

impl Action {
    pub fn new(action: &str, name: &str, icon: &str) -> Self {
        Self {
            action: action.to_string(),
            text: SearchText::named(name),
            icon: icon.to_string(),
        }
    }

    pub fn identifier(&self, parent: &str) -> String {
        format!("{parent}:{}", self.action)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEntry {
    pub identifier: String,
    pub text: SearchText,
    pub subtext: String,
    pub icon: String,
    pub visibility: Visibility,
    pub actions: Vec<Action>,
}

impl CandidateEntry {
    pub fn new(identifier: &str, name: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            text: SearchText::named(name),
            subtext: String::new(),
            icon: String::new(),
            visibility: Visibility::default(),
            actions: Vec::new(),
        }
    }

    pub fn with_subtext(mut self, subtext: &str) -> Self {
        self.subtext = subtext.to_string();
        self
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = icon.to_string();
        self
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.text.keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn name(&self) -> &str {
        &self.text.name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinList(Vec<String>);

impl PinList {
    pub fn new(identifiers: Vec<String>) -> Self {
        Self(identifiers)
    }

    pub fn position(&self, identifier: &str) -> Option<usize> {
        self.0.iter().position(|pin| pin == identifier)
    }

    pub fn pinned_score(&self, identifier: &str) -> Option<i32> {
        self.position(identifier)
            .map(|index| PIN_BASE_SCORE - index as i32)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<&str>> for PinList {
    fn from(value: Vec<&str>) -> Self {
        Self(value.into_iter().map(str::to_string).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    History,
    Pinned,
    Unpinned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchField {
    Text,
    Subtext,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuzzyInfo {
    pub field: MatchField,
    pub start: i32,
    pub positions: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedItem {
    pub identifier: String,
    pub text: String,
    pub subtext: String,
    pub icon: String,
    pub score: i32,
    pub state: Vec<ItemState>,
    pub fuzzy: Option<FuzzyInfo>,
}

impl RankedItem {
    pub fn has_state(&self, state: ItemState) -> bool {
        self.state.contains(&state)
    }
}
