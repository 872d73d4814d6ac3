use std::collections::HashMap;

use tracing::warn;

use crate::config::ProviderConfig;
use crate::fuzzy;
use crate::history::UsageHistory;
use crate::model::{
    Action, CandidateEntry, FuzzyInfo, ItemState, MatchField, PinList, RankedItem, SearchText,
};

pub const ALIAS_SCORE: i32 = 1_000_000;

const FIELD_PENALTY_STEP: i32 = 5;
const MAX_FIELD_PENALTY: i32 = 50;

pub struct RankContext<'a> {
    pub policy: &'a ProviderConfig,
    pub pins: &'a PinList,
    pub aliases: &'a HashMap<String, String>,
    pub desktop: Option<&'a str>,
    pub history: Option<&'a dyn UsageHistory>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch {
    pub field_index: usize,
    pub text: String,
    pub score: i32,
    pub positions: Vec<i32>,
    pub start: i32,
}

impl FieldMatch {
    fn fuzzy_info(&self) -> FuzzyInfo {
        FuzzyInfo {
            field: if self.field_index == 0 {
                MatchField::Text
            } else {
                MatchField::Subtext
            },
            start: self.start,
            positions: self.positions.clone(),
        }
    }
}

/// Best-scoring field of `text` after the field-priority and start-offset
/// penalties. Fields are tried in declaration order and the first one with
/// the top raw score wins.
pub fn score_fields(
    query: &str,
    text: &SearchText,
    exact: bool,
    policy: &ProviderConfig,
) -> Option<FieldMatch> {
    best_field(&fuzzy::Pattern::new(query), text, exact, policy)
}

fn best_field(
    pattern: &fuzzy::Pattern,
    text: &SearchText,
    exact: bool,
    policy: &ProviderConfig,
) -> Option<FieldMatch> {
    let fields = text.fields(policy.only_search_title);
    let mut best: Option<(usize, fuzzy::FuzzyMatch)> = None;

    for (index, field) in fields.iter().enumerate() {
        let Some(hit) = pattern.score(field, exact) else {
            continue;
        };
        if best.as_ref().map_or(true, |(_, current)| hit.score > current.score) {
            best = Some((index, hit));
        }
    }

    let (field_index, hit) = best?;
    let penalty = (field_index as i32 * FIELD_PENALTY_STEP).min(MAX_FIELD_PENALTY);
    let score = (hit.score - penalty - hit.start).max(policy.score_floor);

    Some(FieldMatch {
        field_index,
        text: fields[field_index].to_string(),
        score,
        positions: hit.positions,
        start: hit.start,
    })
}

/// Scores `candidates` and their actions against `query`, returning the
/// included items ordered by descending score. Equal scores keep the order
/// in which the candidates were supplied.
pub fn rank<'c, I>(query: &str, candidates: I, exact: bool, ctx: &RankContext<'_>) -> Vec<RankedItem>
where
    I: IntoIterator<Item = &'c CandidateEntry>,
{
    let alias = ctx.aliases.get(query).map(String::as_str);
    let pattern = fuzzy::Pattern::new(query);
    let mut items = Vec::new();

    for entry in candidates {
        if entry.visibility.excludes(ctx.desktop) {
            continue;
        }

        if alias == Some(entry.identifier.as_str()) {
            items.push(RankedItem {
                identifier: entry.identifier.clone(),
                text: entry.text.name.clone(),
                subtext: entry.subtext.clone(),
                icon: entry.icon.clone(),
                score: ALIAS_SCORE,
                state: Vec::new(),
                fuzzy: None,
            });
            continue;
        }

        if let Some(item) = rank_entry(query, &pattern, entry, exact, ctx) {
            items.push(item);
        }

        for action in &entry.actions {
            if let Some(item) = rank_action(query, &pattern, entry, action, alias, exact, ctx) {
                items.push(item);
            }
        }
    }

    items.sort_by(|a, b| b.score.cmp(&a.score));
    items
}

fn rank_entry(
    query: &str,
    pattern: &fuzzy::Pattern,
    entry: &CandidateEntry,
    exact: bool,
    ctx: &RankContext<'_>,
) -> Option<RankedItem> {
    let policy = ctx.policy;
    let mut subtext = None;
    let mut fuzzy_info = None;
    let mut score = 0;

    if !query.is_empty() {
        let found = best_field(pattern, &entry.text, exact, policy)?;
        fuzzy_info = Some(found.fuzzy_info());
        score = found.score;
        if found.field_index != 0 {
            subtext = Some(found.text);
        }
    }

    let (score, usage, pinned) = blend(query, &entry.identifier, score, ctx);

    let show_primary = usage != 0
        || !policy.show_actions
        || policy.show_generic
        || entry.actions.is_empty()
        || query.is_empty();
    if !show_primary || !passes_threshold(query, score, policy) {
        return None;
    }

    Some(RankedItem {
        identifier: entry.identifier.clone(),
        text: entry.text.name.clone(),
        subtext: subtext.unwrap_or_else(|| entry.subtext.clone()),
        icon: entry.icon.clone(),
        score,
        state: states(usage, pinned),
        fuzzy: fuzzy_info,
    })
}

fn rank_action(
    query: &str,
    pattern: &fuzzy::Pattern,
    entry: &CandidateEntry,
    action: &Action,
    alias: Option<&str>,
    exact: bool,
    ctx: &RankContext<'_>,
) -> Option<RankedItem> {
    let policy = ctx.policy;
    let identifier = action.identifier(&entry.identifier);

    if alias == Some(identifier.as_str()) {
        return Some(RankedItem {
            identifier,
            text: action.text.name.clone(),
            subtext: entry.text.name.clone(),
            icon: action.icon.clone(),
            score: ALIAS_SCORE,
            state: Vec::new(),
            fuzzy: None,
        });
    }

    let mut subtext = None;
    let mut fuzzy_info = None;
    let mut score = 0;

    if !query.is_empty() {
        // A positive action_min_score switches to whole-name scoring; the
        // inclusion cut-off stays min_score.
        if policy.action_min_score > 0 {
            let hit = pattern.score(&action.text.name, exact)?;
            score = hit.score;
            fuzzy_info = Some(FuzzyInfo {
                field: MatchField::Text,
                start: hit.start,
                positions: hit.positions,
            });
        } else {
            let found = best_field(pattern, &action.text, exact, policy)?;
            fuzzy_info = Some(found.fuzzy_info());
            score = found.score;
            if found.field_index != 0 {
                subtext = Some(found.text);
            }
        }
    }

    let (score, usage, pinned) = blend(query, &identifier, score, ctx);

    let show_action = (query.is_empty() && policy.show_actions_without_query)
        || (!query.is_empty() && policy.show_actions)
        || usage != 0;
    if !show_action || !passes_threshold(query, score, policy) {
        return None;
    }

    Some(RankedItem {
        identifier,
        text: action.text.name.clone(),
        subtext: subtext.unwrap_or_else(|| entry.text.name.clone()),
        icon: action.icon.clone(),
        score,
        state: states(usage, pinned),
        fuzzy: fuzzy_info,
    })
}

// Adds the usage contribution, then applies the pin override for empty
// queries. Returns (score, usage, pinned).
fn blend(query: &str, identifier: &str, score: i32, ctx: &RankContext<'_>) -> (i32, i32, bool) {
    let policy = ctx.policy;
    let mut score = score;
    let mut usage = 0;

    let wants_history =
        score > policy.min_score || (query.is_empty() && policy.history_when_empty);
    if policy.history && wants_history {
        if let Some(history) = ctx.history {
            usage = match history.calc_usage_score(query, identifier) {
                Ok(value) => value,
                Err(error) => {
                    warn!(identifier, %error, "usage score lookup failed");
                    0
                }
            };
            score += usage;
        }
    }

    if query.is_empty() {
        if let Some(pinned) = ctx.pins.pinned_score(identifier) {
            return (pinned, pinned, true);
        }
    }

    (score, usage, false)
}

fn passes_threshold(query: &str, score: i32, policy: &ProviderConfig) -> bool {
    query.is_empty() || score >= policy.min_score
}

fn states(usage: i32, pinned: bool) -> Vec<ItemState> {
    let mut state = Vec::with_capacity(2);
    if usage != 0 {
        state.push(ItemState::History);
    }
    state.push(if pinned {
        ItemState::Pinned
    } else {
        ItemState::Unpinned
    });
    state
}

#[cfg(test)]
mod tests {
    use super::score_fields;
    use crate::config::ProviderConfig;
    use crate::model::SearchText;

    fn firefox() -> SearchText {
        SearchText {
            name: "Firefox".into(),
            parent: String::new(),
            generic_name: "Web Browser".into(),
            keywords: vec!["browser".into(), "web".into()],
            comment: "Browse the World Wide Web".into(),
        }
    }

    #[test]
    fn name_match_has_no_field_penalty() {
        let policy = ProviderConfig::default();
        let found = score_fields("fir", &firefox(), false, &policy).unwrap();
        assert_eq!(found.field_index, 0);
        assert_eq!(found.score, 100);
        assert_eq!(found.start, 0);
    }

    #[test]
    fn secondary_field_is_penalised() {
        let policy = ProviderConfig::default();
        let found = score_fields("web", &firefox(), false, &policy).unwrap();
        // "Web Browser" is a prefix hit on generic name (index 2).
        assert_eq!(found.field_index, 2);
        assert_eq!(found.text, "Web Browser");
        assert_eq!(found.score, 90);
    }

    #[test]
    fn equal_raw_scores_keep_declaration_order() {
        let policy = ProviderConfig::default();
        let text = SearchText {
            name: "Zed".into(),
            generic_name: "Editor".into(),
            comment: "Editor".into(),
            ..Default::default()
        };
        let found = score_fields("edit", &text, false, &policy).unwrap();
        assert_eq!(found.field_index, 2);
    }

    #[test]
    fn score_never_drops_below_floor() {
        let policy = ProviderConfig {
            score_floor: 10,
            ..Default::default()
        };
        let text = SearchText::named("an extremely long application name ending in zq");
        let found = score_fields("zq", &text, false, &policy).unwrap();
        assert_eq!(found.score, 10);
    }

    #[test]
    fn only_title_ignores_other_fields() {
        let policy = ProviderConfig {
            only_search_title: true,
            ..Default::default()
        };
        assert!(score_fields("browser", &firefox(), false, &policy).is_none());
    }
}
