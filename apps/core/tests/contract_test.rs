use quarry_core::contract::{ItemType, QueryItem, QueryResponse};
use quarry_core::model::{FuzzyInfo, ItemState, MatchField, RankedItem};

fn ranked() -> RankedItem {
    RankedItem {
        identifier: "firefox.desktop".to_string(),
        text: "Firefox".to_string(),
        subtext: "Web Browser".to_string(),
        icon: "firefox".to_string(),
        score: 110,
        state: vec![ItemState::History, ItemState::Unpinned],
        fuzzy: Some(FuzzyInfo {
            field: MatchField::Text,
            start: 0,
            positions: vec![0, 1, 2],
        }),
    }
}

#[test]
fn serializes_item_for_host() {
    let item = QueryItem::from_ranked("desktopapplications", ranked());
    assert_eq!(item.item_type, ItemType::Regular);

    let value = serde_json::to_value(&item).unwrap();
    assert_eq!(value["provider"], "desktopapplications");
    assert_eq!(value["type"], "regular");
    assert_eq!(value["score"], 110);
    assert_eq!(value["state"], serde_json::json!(["history", "unpinned"]));
    assert_eq!(value["fuzzyinfo"]["field"], "text");
    assert_eq!(value["fuzzyinfo"]["positions"], serde_json::json!([0, 1, 2]));
}

#[test]
fn omits_fuzzy_info_when_absent() {
    let mut plain = ranked();
    plain.fuzzy = None;
    let encoded = serde_json::to_string(&QueryItem::from_ranked("files", plain)).unwrap();
    assert!(!encoded.contains("fuzzyinfo"));

    let decoded: QueryItem = serde_json::from_str(&encoded).unwrap();
    assert!(decoded.fuzzy_info.is_none());
}

#[test]
fn response_tags_every_item_with_provider() {
    let response = QueryResponse::new(1, 2, "websearch", vec![ranked(), ranked()]);
    assert_eq!((response.qid, response.iid), (1, 2));
    assert!(response.items.iter().all(|item| item.provider == "websearch"));
}
