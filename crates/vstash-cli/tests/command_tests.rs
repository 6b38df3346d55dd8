//! Whole-command runs against temp staging and remote files

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use vstash_backend::{LocalRemote, ParameterType};
use vstash_cli::{cli, App, Config, Console};
use vstash_pipeline::RunContext;

struct Env {
    _dir: TempDir,
    config: Config,
}

impl Env {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::in_dir(dir.path());
        Self { _dir: dir, config }
    }

    fn seed(&self, seed: impl FnOnce(&LocalRemote)) {
        let remote = LocalRemote::open(&self.config.remote_file).unwrap();
        seed(&remote);
        remote.save().unwrap();
    }

    fn remote(&self) -> LocalRemote {
        LocalRemote::open(&self.config.remote_file).unwrap()
    }

    fn open(&self) -> App {
        App::open(self.config.clone(), RunContext::background()).unwrap()
    }

    /// One process-like invocation: fresh app, captured output
    async fn run(&self, args: &[&str]) -> (anyhow::Result<()>, String, String) {
        run_in(&self.open(), args).await
    }
}

async fn run_in(app: &App, args: &[&str]) -> (anyhow::Result<()>, String, String) {
    let matches = cli::command()
        .try_get_matches_from(std::iter::once("vstash").chain(args.iter().copied()))
        .unwrap();
    let mut console = Console::new(Vec::new(), Vec::new());
    let result = app.dispatch(&matches, &mut console).await;
    let (out, err) = console.into_inner();
    (result, String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
}

#[tokio::test]
async fn add_status_diff_push() {
    let env = Env::new();

    let (result, out, _) = env
        .run(&["param", "add", "/app/url", "v1", "--tag", "env=dev", "--description", "db url"])
        .await;
    result.unwrap();
    assert_eq!(out, "Staged create: param /app/url\n");

    let (result, out, _) = env.run(&["stage", "status"]).await;
    result.unwrap();
    assert_eq!(out, "create  param /app/url\n");

    let (result, out, _) = env.run(&["stage", "status", "/app/url"]).await;
    result.unwrap();
    assert!(out.contains("description: db url"));
    assert!(out.contains("tag: env=dev"));

    let (result, out, _) = env.run(&["stage", "diff"]).await;
    result.unwrap();
    assert!(out.contains("/app/url (not found)"));
    assert!(out.contains("+v1\n"));

    let (result, out, _) = env.run(&["stage", "push"]).await;
    result.unwrap();
    assert_eq!(out, "Pushed create: param /app/url\n");
    assert!(!env.config.stage_file.exists());

    let snapshot = env.remote().snapshot();
    let parameter = &snapshot.parameters["/app/url"];
    assert_eq!(parameter.revisions.len(), 1);
    assert_eq!(parameter.revisions[0].value, "v1");
    assert_eq!(parameter.tags.get("env").map(String::as_str), Some("dev"));
    assert_eq!(parameter.description.as_deref(), Some("db url"));

    let (result, out, _) = env.run(&["stage", "status"]).await;
    result.unwrap();
    assert_eq!(out, "No changes staged.\n");
}

#[tokio::test]
async fn push_single_named_entry() {
    let env = Env::new();
    env.seed(|remote| {
        remote.parameters().put("/a", ParameterType::String, "v1");
    });

    env.run(&["param", "update", "/a", "v2"]).await.0.unwrap();
    env.run(&["param", "update", "/b", "x"]).await.0.unwrap();

    let (result, out, _) = env.run(&["stage", "push", "/a"]).await;
    result.unwrap();
    assert_eq!(out, "Pushed update: param /a\n");

    let (result, out, _) = env.run(&["stage", "status"]).await;
    result.unwrap();
    assert_eq!(out, "update  param /b\n");
    assert_eq!(env.remote().snapshot().parameters["/a"].revisions.len(), 2);
}

#[tokio::test]
async fn overlapping_invocations_keep_both_pushes() {
    let env = Env::new();
    env.seed(|remote| {
        remote.parameters().put("/a", ParameterType::String, "a1");
        remote.parameters().put("/b", ParameterType::String, "b1");
    });
    env.run(&["param", "update", "/a", "a2"]).await.0.unwrap();
    env.run(&["param", "update", "/b", "b2"]).await.0.unwrap();

    // both open before either pushes
    let first = env.open();
    let second = env.open();

    let (result, out, _) = run_in(&first, &["stage", "push", "/a"]).await;
    result.unwrap();
    assert_eq!(out, "Pushed update: param /a\n");
    let (result, out, _) = run_in(&second, &["stage", "push", "/b"]).await;
    result.unwrap();
    assert_eq!(out, "Pushed update: param /b\n");

    let snapshot = env.remote().snapshot();
    let latest = |name: &str| snapshot.parameters[name].revisions.last().unwrap().value.clone();
    assert_eq!(latest("/a"), "a2");
    assert_eq!(latest("/b"), "b2");
    assert!(!env.config.stage_file.exists());
    assert!(!env.config.remote_file.with_extension("json.tmp").exists());
}

#[tokio::test]
async fn identical_staged_value_is_unstaged_on_diff() {
    let env = Env::new();
    env.seed(|remote| {
        remote.parameters().put("/a", ParameterType::String, "v1");
    });
    env.run(&["param", "update", "/a", "v1"]).await.0.unwrap();

    let (result, out, err) = env.run(&["stage", "diff"]).await;
    result.unwrap();
    assert_eq!(out, "");
    assert_eq!(
        err,
        "warning: unstaged param /a: staged value is identical to the remote\n"
    );
    assert!(!env.config.stage_file.exists());
}

#[tokio::test]
async fn named_diff_reports_identical_without_unstaging() {
    let env = Env::new();
    env.seed(|remote| {
        remote.parameters().put("/a", ParameterType::String, "v1");
    });
    env.run(&["param", "update", "/a", "v1"]).await.0.unwrap();

    let (result, out, _) = env.run(&["stage", "diff", "/a"]).await;
    result.unwrap();
    assert_eq!(out, "param /a: identical to the remote\n");
    assert!(env.config.stage_file.exists());
}

#[tokio::test]
async fn reset_of_unstaged_name_is_a_warning() {
    let env = Env::new();
    let (result, out, err) = env.run(&["stage", "reset", "/nope", "--param"]).await;
    result.unwrap();
    assert_eq!(out, "");
    assert_eq!(err, "warning: param /nope is not staged\n");
}

#[tokio::test]
async fn reset_all_counts_entries() {
    let env = Env::new();
    env.run(&["param", "add", "/a", "1"]).await.0.unwrap();
    env.run(&["secret", "add", "db", "pw"]).await.0.unwrap();

    let (result, out, _) = env.run(&["stage", "reset", "--secret"]).await;
    result.unwrap();
    assert_eq!(out, "Unstaged 1 change(s)\n");

    let (result, out, _) = env.run(&["stage", "reset"]).await;
    result.unwrap();
    assert_eq!(out, "Unstaged 1 change(s)\n");
    assert!(!env.config.stage_file.exists());
}

#[tokio::test]
async fn name_staged_in_both_namespaces_needs_scope() {
    let env = Env::new();
    env.run(&["param", "add", "shared", "1"]).await.0.unwrap();
    env.run(&["secret", "add", "shared", "2"]).await.0.unwrap();

    let (result, _, _) = env.run(&["stage", "status", "shared"]).await;
    assert!(result.unwrap_err().to_string().contains("--param or --secret"));

    let (result, out, _) = env.run(&["stage", "status", "shared", "--secret"]).await;
    result.unwrap();
    assert_eq!(out, "create  secret shared\n");
}

#[tokio::test]
async fn conflicting_tags_warn_and_last_wins() {
    let env = Env::new();
    let (result, _, err) = env
        .run(&["param", "add", "/a", "v", "--tag", "env=dev", "--untag", "env", "--tag", "env=prod"])
        .await;
    result.unwrap();
    assert_eq!(err.lines().count(), 2);
    assert!(err.starts_with("warning: tag 'env'"));

    let (_, out, _) = env.run(&["stage", "status", "/a"]).await;
    assert!(out.contains("tag: env=prod"));
    assert!(!out.contains("untag"));
}

#[tokio::test]
async fn malformed_tag_is_an_error() {
    let env = Env::new();
    let (result, _, _) = env.run(&["param", "add", "/a", "v", "--tag", "novalue"]).await;
    assert!(result.unwrap_err().to_string().contains("KEY=VALUE"));
    assert!(!env.config.stage_file.exists());
}

#[tokio::test]
async fn param_delete_options_are_ignored_with_warning() {
    let env = Env::new();
    let (result, out, err) = env.run(&["param", "delete", "/a", "--force"]).await;
    result.unwrap();
    assert_eq!(out, "Staged delete: param /a\n");
    assert!(err.contains("only apply to secrets"));
}

#[tokio::test]
async fn show_and_log_history() {
    let env = Env::new();
    env.seed(|remote| {
        remote.parameters().put("/a", ParameterType::String, "v1");
        remote.parameters().put("/a", ParameterType::String, "{\"b\":1,\"a\":2}");
    });

    let (result, out, _) = env.run(&["param", "show", "/a~1"]).await;
    result.unwrap();
    assert!(out.starts_with("Version: #1\n"));
    assert!(out.ends_with("\nv1\n"));

    let (result, out, _) = env.run(&["param", "show", "/a", "--json"]).await;
    result.unwrap();
    assert!(out.contains("{\n  \"a\": 2,\n  \"b\": 1\n}\n"));

    let (result, out, _) = env.run(&["param", "log", "/a"]).await;
    result.unwrap();
    let headers: Vec<_> = out.lines().filter(|l| l.starts_with('#')).collect();
    assert_eq!(headers.len(), 2);
    assert!(headers[0].starts_with("#2  "));
    assert!(headers[1].starts_with("#1  "));
    assert!(out.contains("    v1\n"));

    let (result, out, _) = env.run(&["param", "log", "/a", "-n", "1"]).await;
    result.unwrap();
    assert_eq!(out.lines().filter(|l| l.starts_with('#')).count(), 1);
}

#[tokio::test]
async fn show_not_json_warns_and_prints_raw() {
    let env = Env::new();
    env.seed(|remote| {
        remote.parameters().put("/a", ParameterType::String, "plain");
    });

    let (result, out, err) = env.run(&["param", "show", "/a", "--json"]).await;
    result.unwrap();
    assert!(out.ends_with("\nplain\n"));
    assert!(err.contains("/a is not valid JSON"));
}

#[tokio::test]
async fn show_missing_resource_fails() {
    let env = Env::new();
    let (result, _, _) = env.run(&["param", "show", "/missing"]).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn secret_labels_and_version_diff() {
    let env = Env::new();
    env.seed(|remote| {
        remote.secrets().put("db", "old");
        remote.secrets().put("db", "new");
    });

    let (result, out, _) = env.run(&["secret", "show", "db:previous"]).await;
    result.unwrap();
    assert!(out.contains("Labels:  previous\n"));
    assert!(out.ends_with("\nold\n"));

    let (result, out, _) = env.run(&["secret", "diff", "db~1"]).await;
    result.unwrap();
    assert!(out.contains("-old\n+new\n"));
}

#[tokio::test]
async fn identical_versions_warn_with_hint() {
    let env = Env::new();
    env.seed(|remote| {
        remote.parameters().put("/a", ParameterType::String, "v1");
    });

    let (result, out, err) = env.run(&["param", "diff", "/a#1", "/a"]).await;
    result.unwrap();
    assert_eq!(out, "");
    assert!(err.contains("/a~1"));
}

#[tokio::test]
async fn secret_force_delete_round() {
    let env = Env::new();
    env.seed(|remote| {
        remote.secrets().put("db", "pw");
    });

    env.run(&["secret", "delete", "db", "--force"]).await.0.unwrap();
    let (result, out, _) = env.run(&["stage", "push", "db"]).await;
    result.unwrap();
    assert_eq!(out, "Pushed delete: secret db\n");
    assert!(!env.remote().snapshot().secrets.contains_key("db"));
}
