use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Fresh database in a temp directory. Output is JSON because stdout is not a TTY.
struct Workspace {
    dir: TempDir,
    db: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let db = dir.path().join("growthlog.db");
        let ws = Self { dir, db };
        ws.ok(&["init"]);
        ws
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_growthlog"));
        cmd.env_remove("GL_TEST_DB")
            .env_remove("RUST_LOG")
            .arg("--db")
            .arg(&self.db)
            .args(["--actor", "tester"])
            .current_dir(self.dir.path());
        cmd
    }

    fn ok(&self, args: &[&str]) -> serde_json::Value {
        let output = self.cmd().args(args).output().expect("run growthlog");
        assert!(
            output.status.success(),
            "{args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        if output.stdout.is_empty() {
            return serde_json::Value::Null;
        }
        serde_json::from_slice(&output.stdout).expect("json stdout")
    }

    fn fail(&self, args: &[&str]) -> (i32, serde_json::Value) {
        let output = self.cmd().args(args).output().expect("run growthlog");
        assert!(!output.status.success(), "{args:?} unexpectedly succeeded");
        let error = serde_json::from_slice(&output.stderr).expect("json stderr");
        (output.status.code().expect("exit code"), error)
    }

    fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, bytes).expect("write fixture");
        path
    }

    fn path_arg(path: &Path) -> &str {
        path.to_str().expect("utf-8 temp path")
    }
}

#[test]
fn record_add_and_list_workflow() {
    let ws = Workspace::new();
    let child = ws.ok(&["child", "add", "小明", "--birth-date", "2020-05-20"]);
    assert_eq!(child["name"], "小明");

    let first = ws.ok(&["record", "add", "--height", "100.5", "--weight", "15.6", "--date", "2024-03-15 10:05"]);
    assert_eq!(first["action"], "added");

    let second = ws.ok(&["record", "add", "--height", "101", "--date", "2024/3/15 10:55"]);
    assert_eq!(second["action"], "replaced");
    assert_eq!(second["id"], first["id"]);

    let list = ws.ok(&["record", "list"]);
    assert_eq!(list["count"], 1);
    assert_eq!(list["records"][0]["height"], 101.0);
    assert!(list["records"][0]["weight"].is_null());
}

#[test]
fn record_add_rejects_out_of_range_height() {
    let ws = Workspace::new();
    ws.ok(&["child", "add", "小明", "--birth-date", "2020-05-20"]);

    let (code, error) = ws.fail(&["record", "add", "--height", "250.01"]);
    assert_eq!(code, 4);
    assert_eq!(error["error"]["code"], "INVALID_ARGUMENT");
}

#[test]
fn csv_import_gbk_file_creates_named_child() {
    let ws = Workspace::new();
    let text = "儿童姓名：小红\n日期,身高(cm),体重(kg)\n2024/3/15 10:05,100.5,15.6\n20240316,101,\n";
    let (bytes, _, _) = encoding_rs::GB18030.encode(text);
    let file = ws.write("legacy.csv", &bytes);

    let report = ws.ok(&["csv", "import", Workspace::path_arg(&file)]);
    assert_eq!(report["child_name"], "小红");
    assert_eq!(report["child_created"], true);
    assert_eq!(report["added"], 2);

    let show = ws.ok(&["child", "show", "小红"]);
    assert_eq!(show["birthDate"], "2024-03-15");
    assert_eq!(show["records"], 2);
}

#[test]
fn csv_import_rejects_whole_batch() {
    let ws = Workspace::new();
    let file = ws.write(
        "bad.csv",
        "日期,身高(cm),体重(kg)\n2024-03-15,100,15\n2024-13-45,101,15\n2024-03-17,0,15\n".as_bytes(),
    );

    let (code, error) = ws.fail(&["csv", "import", Workspace::path_arg(&file)]);
    assert_eq!(code, 4);
    assert_eq!(error["error"]["code"], "IMPORT_REJECTED");
    let details = &error["error"]["details"]["errors"];
    assert_eq!(details["date"][0]["line"], 3);
    assert_eq!(details["height"][0]["line"], 4);

    let status = ws.ok(&["status"]);
    assert_eq!(status["counts"]["records"], 0);
}

#[test]
fn csv_import_without_file_is_a_silent_no_op() {
    let ws = Workspace::new();
    let output = ws.cmd().args(["csv", "import"]).output().expect("run growthlog");

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert_eq!(ws.ok(&["status"])["counts"]["children"], 0);
}

#[test]
fn csv_export_round_trips_into_another_database() {
    let ws = Workspace::new();
    ws.ok(&["child", "add", "小明", "--birth-date", "2020-05-20"]);
    ws.ok(&["record", "add", "--height", "100.5", "--weight", "15.6", "--date", "2024-03-15 10:05:30"]);
    ws.ok(&["record", "add", "--height", "102.3", "--date", "2024-04-01 08:00"]);

    let out = ws.dir.path().join("out");
    let exported = ws.ok(&["csv", "export", "--crlf", "--out", Workspace::path_arg(&out)]);
    let path = PathBuf::from(exported["path"].as_str().expect("path"));
    let bytes = std::fs::read(&path).expect("exported file");
    assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]));
    assert!(path.file_name().unwrap().to_str().unwrap().starts_with("小明_生长记录_"));

    let other = Workspace::new();
    other.ok(&["csv", "import", Workspace::path_arg(&path)]);
    let original = ws.ok(&["record", "list"]);
    let imported = other.ok(&["record", "list"]);
    for key in ["date", "height", "weight"] {
        for i in 0..2 {
            assert_eq!(original["records"][i][key], imported["records"][i][key], "{key} #{i}");
        }
    }
}

#[test]
fn csv_export_refuses_empty_child() {
    let ws = Workspace::new();
    ws.ok(&["child", "add", "小明", "--birth-date", "2020-05-20"]);

    let (code, error) = ws.fail(&["csv", "export"]);
    assert_eq!(code, 3);
    assert_eq!(error["error"]["code"], "NOTHING_TO_EXPORT");
}

#[test]
fn sync_code_moves_child_between_devices() {
    let phone = Workspace::new();
    phone.ok(&["child", "add", "小明", "--birth-date", "2020-05-20"]);
    phone.ok(&["record", "add", "--height", "100.5", "--date", "2024-03-15 10:55"]);
    phone.ok(&["record", "add", "--height", "101", "--date", "2024-03-16 09:00"]);
    let code = phone.ok(&["sync", "export"])["code"]
        .as_str()
        .expect("code")
        .to_string();

    let tablet = Workspace::new();
    tablet.ok(&["child", "add", "小明", "--birth-date", "2020-05-20"]);
    tablet.ok(&["record", "add", "--height", "100", "--date", "2024-03-15 10:05"]);

    let report = tablet.ok(&["sync", "import", &code]);
    assert_eq!(report["child"], "unchanged");
    assert_eq!(report["records"]["added"], 1);
    assert_eq!(report["records"]["skipped"], 1);

    let list = tablet.ok(&["record", "list"]);
    assert_eq!(list["count"], 2);
    assert_eq!(list["records"][1]["height"], 100.0);
}

#[test]
fn sync_import_rejects_unknown_version() {
    use base64::Engine;
    let ws = Workspace::new();
    let json = r#"{"version":"2.0","timestamp":"2024-03-16T08:00:00.000Z","child":{"name":"小明","birthDate":"2020-05-20"},"records":[]}"#;
    let code = base64::engine::general_purpose::STANDARD.encode(json);

    let (exit, error) = ws.fail(&["sync", "import", &code]);
    assert_eq!(exit, 6);
    assert_eq!(error["error"]["category"], "format");
    assert_eq!(ws.ok(&["status"])["counts"]["children"], 0);
}

#[test]
fn commands_require_init() {
    let dir = TempDir::new().expect("tempdir");
    let output = Command::new(env!("CARGO_BIN_EXE_growthlog"))
        .arg("--db")
        .arg(dir.path().join("missing.db"))
        .args(["child", "list"])
        .output()
        .expect("run growthlog");

    assert_eq!(output.status.code(), Some(2));
}
