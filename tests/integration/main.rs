//! Integration tests for shellcache
//!
//! Every test isolates config and state in a temp directory and only talks
//! to an unroutable origin, so nothing here needs network access.

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    const OFFLINE_SHELL: &str = r#"
[worker]
origin = "http://127.0.0.1:1"
assets = []

[network]
timeout_secs = 2
"#;

    const UNREACHABLE_SHELL: &str = r#"
[worker]
origin = "http://127.0.0.1:1"
assets = ["/", "/index.html"]

[network]
timeout_secs = 2
"#;

    fn shellcache() -> Command {
        let mut cmd = cargo_bin_cmd!("shellcache");
        cmd.env_remove("SHELLCACHE_CONFIG")
            .env_remove("SHELLCACHE_STATE_DIR");
        cmd
    }

    /// Command bound to a temp config file and state dir
    fn isolated(dir: &Path) -> Command {
        let mut cmd = shellcache();
        cmd.arg("--config")
            .arg(dir.join("config.toml"))
            .arg("--state-dir")
            .arg(dir.join("state"));
        cmd
    }

    fn with_config(content: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), content).unwrap();
        dir
    }

    #[test]
    fn help_displays() {
        shellcache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("offline application shell cache"));
    }

    #[test]
    fn version_displays() {
        shellcache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("shellcache"));
    }

    #[test]
    fn config_path() {
        let dir = TempDir::new().unwrap();
        isolated(dir.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let dir = TempDir::new().unwrap();
        isolated(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("speechsync-cache-v1"))
            .stdout(predicate::str::contains("/icons/icon-512x512.png"));
    }

    #[test]
    fn config_init_then_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        isolated(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));
        assert!(dir.path().join("config.toml").exists());

        isolated(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn invalid_config_rejected() {
        let dir = with_config("[worker]\nbucket_name = \"../escape\"\n");
        isolated(dir.path())
            .arg("status")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn fetch_without_active_generation() {
        let dir = with_config(OFFLINE_SHELL);
        isolated(dir.path())
            .args(["fetch", "/index.html"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No active generation"))
            .stderr(predicate::str::contains("shellcache update"));
    }

    #[test]
    fn activate_without_waiting_generation() {
        let dir = with_config(OFFLINE_SHELL);
        isolated(dir.path())
            .arg("activate")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No waiting generation"));
    }

    #[test]
    fn install_fails_when_origin_unreachable() {
        let dir = with_config(UNREACHABLE_SHELL);
        isolated(dir.path())
            .arg("install")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Caching failed"));

        // Nothing committed
        isolated(dir.path())
            .args(["buckets", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache buckets"));

        isolated(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("redundant"));
    }

    #[test]
    fn empty_shell_lifecycle() {
        let dir = with_config(OFFLINE_SHELL);

        isolated(dir.path())
            .arg("install")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cached 0 assets"));

        isolated(dir.path())
            .arg("activate")
            .assert()
            .success()
            .stdout(predicate::str::contains("Generation active"));

        isolated(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("speechsync-cache-v1"))
            .stdout(predicate::str::contains("active"));

        // Miss falls through to the unreachable network
        isolated(dir.path())
            .args(["fetch", "/index.html"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Network request"));
    }

    #[test]
    fn update_installs_and_activates() {
        let dir = with_config(OFFLINE_SHELL);
        isolated(dir.path())
            .arg("update")
            .assert()
            .success()
            .stdout(predicate::str::contains("Generation active"));

        isolated(dir.path())
            .args(["buckets", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("speechsync-cache-v1"));
    }

    #[test]
    fn activation_clears_stale_bucket() {
        let dir = with_config(OFFLINE_SHELL);
        std::fs::create_dir_all(dir.path().join("state/buckets/speechsync-cache-v0")).unwrap();

        isolated(dir.path())
            .arg("update")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cleared old cache speechsync-cache-v0"));

        assert!(!dir.path().join("state/buckets/speechsync-cache-v0").exists());
        assert!(dir.path().join("state/buckets/speechsync-cache-v1").exists());

        let audit = std::fs::read_to_string(dir.path().join("state/audit.log")).unwrap();
        assert!(audit.contains("bucket.deleted"));
        assert!(audit.contains("activate.completed"));
    }

    #[test]
    fn bucket_delete_needs_confirmation() {
        let dir = with_config(OFFLINE_SHELL);
        std::fs::create_dir_all(dir.path().join("state/buckets/scratch")).unwrap();

        isolated(dir.path())
            .args(["buckets", "delete", "scratch"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cancelled"));
        assert!(dir.path().join("state/buckets/scratch").exists());

        isolated(dir.path())
            .args(["buckets", "delete", "scratch", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Deleted bucket scratch"));
        assert!(!dir.path().join("state/buckets/scratch").exists());
    }

    #[test]
    fn bucket_show_missing() {
        let dir = with_config(OFFLINE_SHELL);
        isolated(dir.path())
            .args(["buckets", "show", "nope"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cache bucket not found"));
    }

    #[test]
    fn fetch_rejects_unknown_method() {
        shellcache()
            .args(["fetch", "/", "-X", "BREW"])
            .assert()
            .failure();
    }
}
