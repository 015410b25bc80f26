use tims_insight::failover::{
  configured_or_default, normalize_configured_model, CandidateList,
  FALLBACK_MODEL,
};

fn names(list: &[&str]) -> Vec<String>
{   list.iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_configured_model_validation()
{   assert_eq!(
      normalize_configured_model("gemini-2.0-pro").as_deref()
    , Some("models/gemini-2.0-pro")
    );
    assert_eq!(
      normalize_configured_model(" models/Gemini-1.5-flash-8b ").as_deref()
    , Some("models/Gemini-1.5-flash-8b")
    );
    assert_eq!(normalize_configured_model("gpt-4o"), None);
    assert_eq!(normalize_configured_model("models/gemini-pro?x=1"), None);
    assert_eq!(normalize_configured_model("tunedModels/gemini-x"), None);
}

#[test]
fn test_malformed_model_uses_default()
{   assert_eq!(configured_or_default("not a model"), FALLBACK_MODEL);
}

#[test]
fn test_primary_list_collapses_on_fallback()
{   assert_eq!(
      CandidateList::primary(FALLBACK_MODEL.to_string()).models
    , vec![FALLBACK_MODEL.to_string()]
    );
    let list = CandidateList::primary("models/gemini-2.0-pro".to_string());
    assert_eq!(list.len(), 2);
    assert_eq!(list.first(), Some("models/gemini-2.0-pro"));
}

#[test]
fn test_discovered_is_capped_and_skips_tried()
{   let listed = names(&[
      "models/gemini-2.0-pro"
    , "models/embedding-001"
    , "models/gemini-1.5-flash"
    , "models/gemini-2.5-flash"
    , "models/gemini-1.5-pro"
    , "models/gemini-exp"
    , "models/gemini-late"
    ]);
    let tried = names(&["models/gemini-2.0-pro", "models/gemini-2.5-flash"]);

    let discovered = CandidateList::discovered(&listed, &tried, 3);
    assert_eq!(
      discovered.models
    , names(&[
        "models/gemini-1.5-flash"
      , "models/gemini-1.5-pro"
      , "models/gemini-exp"
      ])
    );
    assert!(CandidateList::discovered(&[], &tried, 3).is_empty());
}
