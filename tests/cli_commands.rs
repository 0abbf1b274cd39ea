//! Command execution against a state backed by temporary storage.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tempfile::TempDir;

use forum_publisher::cli::{execute, Cli};
use forum_publisher::error::AppError;
use forum_publisher::platform::FsPlatformBridge;
use forum_publisher::publish::HttpPublishService;
use forum_publisher::state::AppState;
use forum_publisher::storage::FileStore;

struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Fresh state over the same files, like a new process would see
    fn state(&self) -> AppState {
        let store = Arc::new(FileStore::new(self.dir.path().join("state")));
        let platform = Arc::new(FsPlatformBridge::new(
            self.dir.path().join("images"),
            self.dir.path().join("publisher_config.json"),
        ));
        let service = Arc::new(HttpPublishService::new(Duration::from_secs(5)).unwrap());
        AppState::load(store, platform, service)
    }

    async fn run(&self, args: &[&str]) -> Result<String, AppError> {
        let cli = Cli::try_parse_from(std::iter::once("forum-publisher").chain(args.iter().copied()))
            .unwrap();
        let mut state = self.state();
        execute(cli.command, &mut state).await
    }
}

#[tokio::test]
async fn test_fields_survive_between_runs() {
    let env = TestEnv::new();

    env.run(&["set", "game_name", "Lost Solace"]).await.unwrap();
    env.run(&["set", "overview", "A hero.\\nA quest."]).await.unwrap();
    env.run(&["instruction", "save", "zip", "Download.\\nExtract."])
        .await
        .unwrap();
    env.run(&["instruction", "apply", "zip"]).await.unwrap();

    let preview = env.run(&["preview"]).await.unwrap();
    assert!(preview.contains("Lost Solace"));
    assert!(preview.contains("A hero.\n> A quest."));
    assert!(preview.contains("**Instructions d'installation :**\n* Download.\n* Extract."));
    assert!(!preview.contains("[instruction]"));
    assert!(preview.contains("-- empty fields:"));
}

#[tokio::test]
async fn test_title_and_tags_are_normalized() {
    let env = TestEnv::new();

    assert_eq!(
        env.run(&["title", "  Lost Solace  "]).await.unwrap(),
        "Title: Lost Solace"
    );
    assert_eq!(
        env.run(&["tags", " rpg , fr,, "]).await.unwrap(),
        "Tags: rpg,fr"
    );
    assert_eq!(env.state().post_tags(), "rpg,fr");
}

#[tokio::test]
async fn test_select_marks_current_template() {
    let env = TestEnv::new();

    env.run(&["select", "1"]).await.unwrap();
    let listing = env.run(&["templates"]).await.unwrap();

    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with(' '));
    assert!(lines[1].starts_with('*'));

    let err = env.run(&["select", "5"]).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_unknown_field_is_rejected() {
    let env = TestEnv::new();

    let err = env.run(&["set", "nope", "x"]).await.unwrap_err();

    assert_eq!(err.code(), "NOT_FOUND");
    assert!(err.report().starts_with("error[NOT_FOUND]"));
}

#[tokio::test]
async fn test_config_masks_key() {
    let env = TestEnv::new();

    assert_eq!(
        env.run(&["config"]).await.unwrap(),
        "url: (not set)\nkey: (not set)"
    );

    env.run(&["config", "--url", " https://publisher.example/api ", "--key", "secret"])
        .await
        .unwrap();
    env.run(&["config", "--url", "https://publisher.example/v2"])
        .await
        .unwrap();

    let shown = env.run(&["config"]).await.unwrap();
    assert_eq!(shown, "url: https://publisher.example/v2\nkey: (set)");
    assert!(!shown.contains("secret"));
}

#[tokio::test]
async fn test_publish_without_endpoint_fails_validation() {
    let env = TestEnv::new();
    env.run(&["title", "Lost Solace"]).await.unwrap();

    let err = env.run(&["publish"]).await.unwrap_err();

    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert_eq!(env.run(&["history"]).await.unwrap(), "No published posts");
}

#[tokio::test]
async fn test_images_keep_one_main() {
    let env = TestEnv::new();
    let sources = TempDir::new().unwrap();
    for name in ["cover.png", "shot.jpg"] {
        let path = sources.path().join(name);
        std::fs::write(&path, name).unwrap();
        env.run(&["image", "add", path.to_str().unwrap()])
            .await
            .unwrap();
    }

    env.run(&["image", "main", "1"]).await.unwrap();
    let listing = env.run(&["image", "list"]).await.unwrap();

    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("   0  cover.png "));
    assert!(lines[0].ends_with(" 9 B"));
    assert!(lines[1].starts_with("*  1  shot.jpg "));
    assert!(lines[1].ends_with(" 8 B"));

    assert_eq!(env.run(&["image", "remove", "1"]).await.unwrap(), "Removed shot.jpg");
    assert!(env
        .run(&["image", "list"])
        .await
        .unwrap()
        .starts_with("*  0  cover.png "));
}

#[tokio::test]
async fn test_non_image_is_refused() {
    let env = TestEnv::new();
    let sources = TempDir::new().unwrap();
    let notes = sources.path().join("notes.txt");
    std::fs::write(&notes, "todo").unwrap();

    let err = env
        .run(&["image", "add", notes.to_str().unwrap()])
        .await
        .unwrap_err();

    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert_eq!(env.run(&["image", "list"]).await.unwrap(), "");
}

#[tokio::test]
async fn test_prune_keeps_attached_images() {
    let env = TestEnv::new();
    let sources = TempDir::new().unwrap();
    let cover = sources.path().join("cover.png");
    std::fs::write(&cover, "cover").unwrap();
    env.run(&["image", "add", cover.to_str().unwrap()])
        .await
        .unwrap();
    std::fs::write(env.dir.path().join("images").join("image_1_old.png"), "old").unwrap();

    assert_eq!(
        env.run(&["image", "prune"]).await.unwrap(),
        "Deleted 1 unused image file(s)"
    );
    assert!(!env.dir.path().join("images").join("image_1_old.png").exists());
    assert_eq!(env.state().uploaded_images().len(), 1);
}

#[tokio::test]
async fn test_template_add_edit_delete() {
    let env = TestEnv::new();
    let body = env.dir.path().join("body.md");
    std::fs::write(&body, "## [game_name]\n[game_version]").unwrap();

    let added = env
        .run(&["template", "add", "Short", "--kind", "partner", "--body", "[game_name]"])
        .await
        .unwrap();
    assert_eq!(added, "Added template 2: short");

    env.run(&["template", "edit", "2", "--file", body.to_str().unwrap()])
        .await
        .unwrap();
    env.run(&["select", "2"]).await.unwrap();
    env.run(&["set", "game_name", "Lost Solace"]).await.unwrap();
    assert!(env
        .run(&["preview"])
        .await
        .unwrap()
        .starts_with("## Lost Solace\n[game_version]"));

    let listing = env.run(&["templates"]).await.unwrap();
    assert!(listing.lines().nth(2).unwrap().contains("partner"));

    env.run(&["template", "delete", "2"]).await.unwrap();
    assert_eq!(env.state().templates().count(), 2);
    assert_eq!(env.state().current_template_index(), 0);

    let missing = env.dir.path().join("missing.md");
    let err = env
        .run(&["template", "add", "Other", "--file", missing.to_str().unwrap()])
        .await
        .unwrap_err();
    assert_eq!(err.code(), "IO_ERROR");
}

#[tokio::test]
async fn test_variable_add_rename_delete() {
    let env = TestEnv::new();

    env.run(&["variable", "add", "engine", "Moteur", "--option", "RenPy", "--option", "Unity"])
        .await
        .unwrap();
    env.run(&["set", "engine", "RenPy"]).await.unwrap();
    assert!(env
        .run(&["variable", "list"])
        .await
        .unwrap()
        .lines()
        .any(|l| l.starts_with("engine") && l.contains("choice: RenPy|Unity") && l.ends_with("(custom)")));

    env.run(&["variable", "edit", "engine", "--rename", "game_engine"])
        .await
        .unwrap();
    let state = env.state();
    assert!(!state.registry().contains("engine"));
    assert_eq!(state.bindings().get("game_engine"), "RenPy");

    let err = env.run(&["variable", "delete", "game_name"]).await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    env.run(&["variable", "delete", "game_engine"]).await.unwrap();
    assert!(!env.state().registry().contains("game_engine"));
    assert!(!env.state().bindings().contains("game_engine"));
}

#[tokio::test]
async fn test_saved_tags_and_translators() {
    let env = TestEnv::new();

    env.run(&["tag", "add", "RPG", "--id", "123", "--kind", "my"])
        .await
        .unwrap();
    env.run(&["tag", "add", "VN"]).await.unwrap();
    assert_eq!(
        env.run(&["tag", "list"]).await.unwrap(),
        " 0  RPG (123) [my]\n 1  VN"
    );
    assert_eq!(env.run(&["tag", "delete", "0"]).await.unwrap(), "Tag RPG deleted");
    assert_eq!(
        env.run(&["tag", "delete", "5"]).await.unwrap_err().code(),
        "NOT_FOUND"
    );

    env.run(&["translator", "add", " Lyra "]).await.unwrap();
    let err = env.run(&["translator", "add", "Lyra"]).await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert_eq!(env.run(&["translator", "list"]).await.unwrap(), " 0  Lyra");
    env.run(&["translator", "delete", "0"]).await.unwrap();
    assert_eq!(env.run(&["translator", "list"]).await.unwrap(), "");
}

#[tokio::test]
async fn test_edit_unknown_post_fails() {
    let env = TestEnv::new();

    let err = env.run(&["edit", "post_missing"]).await.unwrap_err();

    assert_eq!(err.code(), "NOT_FOUND");
}
