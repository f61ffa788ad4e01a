#![allow(dead_code)]
use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestEnv {
    _dir: TempDir,
    pub data: PathBuf,
    pub cfg: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = dir.path().join("config");
        std::fs::create_dir_all(&cfg).expect("cfg dir");
        let data = dir.path().join("gifs.json");
        Self {
            _dir: dir,
            data,
            cfg,
        }
    }

    pub fn bin(&self) -> Command {
        let mut cmd = Command::cargo_bin("gifwat").unwrap();
        cmd.env("XDG_CONFIG_HOME", &self.cfg);
        cmd.env("XDG_STATE_HOME", self.cfg.join("state"));
        cmd.env_remove("RUST_LOG");
        cmd.arg("--data").arg(&self.data);
        cmd
    }

    /// Adds a gif and returns its id.
    pub fn add(&self, url: &str, tags: &[&str]) -> String {
        let out = self
            .bin()
            .arg("add")
            .arg(url)
            .args(tags)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let line = String::from_utf8(out).unwrap();
        line.trim()
            .strip_prefix("added ")
            .expect("added <id>")
            .to_string()
    }

    pub fn list_json(&self, query: Option<&str>) -> Vec<serde_json::Value> {
        let mut cmd = self.bin();
        cmd.args(["list", "--json"]);
        if let Some(q) = query {
            cmd.args(["--query", q]);
        }
        let out = cmd.assert().success().get_output().stdout.clone();
        let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
        v.as_array().unwrap().clone()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

pub fn urls(items: &[serde_json::Value]) -> Vec<String> {
    items
        .iter()
        .map(|g| g["url"].as_str().unwrap().to_string())
        .collect()
}
