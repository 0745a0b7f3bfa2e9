// Deep search and preview lookup over sessions loaded from a real store layout.

use faustus_core::{load_session_preview, SessionRepository, StorePaths, DEFAULT_PREVIEW_MESSAGES};
use faustus_search::{
    filter_sessions, locate_preview_match, search_all_sessions, search_preview, SessionScope,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn store() -> (TempDir, SessionRepository) {
    let tmp = TempDir::new().unwrap();
    let paths = StorePaths::new(tmp.path().join(".claude"));
    let project = paths.projects_dir().join("-work-app");
    std::fs::create_dir_all(&project).unwrap();

    std::fs::write(
        project.join("alpha.jsonl"),
        [
            r#"{"type":"user","cwd":"/work/app","gitBranch":"main","message":{"role":"user","content":"Why does the borrow checker reject this closure?"}}"#,
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"The closure captures a mutable reference."},{"type":"tool_use","name":"Read","input":{"file_path":"/work/app/src/main.rs"}}]}}"#,
        ]
        .join("\n"),
    )
    .unwrap();
    std::fs::write(
        project.join("beta.jsonl"),
        [
            r#"{"type":"user","cwd":"/work/app","gitBranch":"docs","message":{"role":"user","content":"Write the README"}}"#,
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Here is a README draft."}]}}"#,
        ]
        .join("\n"),
    )
    .unwrap();

    let repo = SessionRepository::new(paths);
    (tmp, repo)
}

#[test]
fn query_in_one_user_message_yields_one_result() {
    let (_tmp, repo) = store();
    let sessions = repo.load_all().unwrap();
    assert_eq!(sessions.len(), 2);

    let results = search_all_sessions(&sessions, "BORROW CHECKER");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].session_id, "alpha");
    assert_eq!(results[0].message_index, 0);
    assert_eq!(results[0].project_name, "work/app");
    assert!(!results[0].in_trash);
}

#[test]
fn deep_search_hit_maps_to_preview_message() {
    let (_tmp, repo) = store();
    let sessions = repo.load_all().unwrap();

    let results = search_all_sessions(&sessions, "closure");
    assert_eq!(results.len(), 2);

    let alpha = sessions.iter().find(|s| s.session_id == "alpha").unwrap();
    let preview = load_session_preview(Some(alpha), DEFAULT_PREVIEW_MESSAGES);
    assert_eq!(search_preview(&preview, "closure"), vec![0, 1]);
    assert_eq!(locate_preview_match(&preview, "closure", &results[1]), Some(1));
}

#[test]
fn shallow_filter_uses_scanned_metadata() {
    let (_tmp, repo) = store();
    let sessions = repo.load_all().unwrap();

    let docs: Vec<&str> = filter_sessions(&sessions, "docs", SessionScope::Active)
        .into_iter()
        .map(|s| s.session_id.as_str())
        .collect();
    assert_eq!(docs, vec!["beta"]);
    assert!(filter_sessions(&sessions, "", SessionScope::Trash).is_empty());
}
