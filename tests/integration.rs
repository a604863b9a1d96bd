use std::path::Path;
use std::process::{Command, Output};
use std::time::{Duration, SystemTime};

/// Build a small project: templates reference static assets, one marked
/// reference points at a file that does not exist.
fn mk_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    std::fs::create_dir_all(root.join("static/js")).unwrap();
    std::fs::create_dir_all(root.join("static/css")).unwrap();
    std::fs::create_dir_all(root.join("templates")).unwrap();

    std::fs::write(root.join("static/js/app.js"), "console.log('app');").unwrap();
    std::fs::write(root.join("static/css/style.css"), "body { margin: 0; }").unwrap();

    std::fs::write(
        root.join("templates/index.html"),
        "\
<html>
<script src=\"/static/js/app.js\"></script>
<link href=\"/static/css/style.css\">
<img src=\"data:image/png;base64,iVBORw0KGgo=\">
</html>
",
    )
    .unwrap();

    std::fs::write(
        root.join("cachebust.toml"),
        "static_dirs = [\"static\"]\ncode_dirs = [\"templates\"]\n",
    )
    .unwrap();

    dir
}

fn cachebust(root: &Path, args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cachebust"));
    cmd.arg(args[0]).arg(root);
    for arg in &args[1..] {
        cmd.arg(arg);
    }
    cmd.output().unwrap()
}

fn read_index(root: &Path) -> String {
    std::fs::read_to_string(root.join("templates/index.html")).unwrap()
}

#[test]
fn rewrite_busts_plain_references() {
    let dir = mk_project();
    let out = cachebust(dir.path(), &["rewrite"]);
    assert!(out.status.success(), "rewrite failed: {}", String::from_utf8_lossy(&out.stderr));

    let content = read_index(dir.path());
    assert!(content.contains("/static/js/app.js?_cb_="), "no token added:\n{content}");
    assert!(content.contains("/static/css/style.css?_cb_="));
    // Data URI untouched.
    assert!(content.contains("data:image/png;base64,iVBORw0KGgo="));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("2 busted"), "unexpected report:\n{stdout}");
}

#[test]
fn second_run_is_idempotent() {
    let dir = mk_project();
    assert!(cachebust(dir.path(), &["rewrite"]).status.success());
    let first = read_index(dir.path());

    let out = cachebust(dir.path(), &["rewrite"]);
    assert!(out.status.success());
    assert_eq!(read_index(dir.path()), first, "second rewrite modified files");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("0 busted"), "second run reported changes:\n{stdout}");

    let out = cachebust(dir.path(), &["update"]);
    assert!(out.status.success());
    assert_eq!(read_index(dir.path()), first, "update after rewrite modified files");
}

#[test]
fn update_refreshes_token_after_content_change() {
    let dir = mk_project();
    let app_js = dir.path().join("static/js/app.js");
    let set_mtime = |secs: u64| {
        let file = std::fs::File::options().write(true).open(&app_js).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs)).unwrap();
    };

    set_mtime(1_000_000);
    assert!(cachebust(dir.path(), &["rewrite"]).status.success());
    let before = read_index(dir.path());

    // Content changed but mtime reset: the fingerprint fast path leaves the
    // reference alone, by design.
    std::fs::write(&app_js, "console.log('changed');").unwrap();
    set_mtime(1_000_000);
    assert!(cachebust(dir.path(), &["update"]).status.success());
    assert_eq!(read_index(dir.path()), before, "fast path should have skipped");

    // --force bypasses the fingerprint probe and re-hashes content.
    let out = cachebust(dir.path(), &["update", "--force"]);
    assert!(out.status.success());
    let after = read_index(dir.path());
    assert_ne!(before, after, "token not refreshed");
    // The untouched stylesheet keeps its token.
    let style_token = |content: &str| {
        content
            .lines()
            .find(|l| l.contains("style.css"))
            .map(str::to_string)
            .unwrap()
    };
    assert_eq!(style_token(&before), style_token(&after));
}

#[test]
fn update_ignores_plain_references() {
    let dir = mk_project();
    let out = cachebust(dir.path(), &["update"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("0 busted"));
    assert!(read_index(dir.path()).contains("src=\"/static/js/app.js\""));
}

#[test]
fn no_act_reports_without_writing() {
    let dir = mk_project();
    let before = read_index(dir.path());
    let out = cachebust(dir.path(), &["rewrite", "--no-act"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("2 busted"));
    assert_eq!(read_index(dir.path()), before, "--no-act wrote files");
}

#[test]
fn filename_flag_embeds_token_in_filename() {
    let dir = mk_project();
    let out = cachebust(dir.path(), &["rewrite", "--filename"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let content = read_index(dir.path());
    assert!(content.contains("/static/js/app_cb_"), "no filename token:\n{content}");
    assert!(!content.contains("?_cb_="));
}

#[test]
fn missing_static_file_is_reported_not_fatal() {
    let dir = mk_project();
    let index = dir.path().join("templates/index.html");
    let mut content = read_index(dir.path());
    content.push_str("<script src=\"/static/js/gone.js?_cb_=abcd1234\"></script>\n");
    std::fs::write(&index, content).unwrap();

    let out = cachebust(dir.path(), &["update"]);
    assert!(out.status.success(), "missing reference should not be fatal");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("missing!"), "missing not reported:\n{stdout}");
    assert!(stdout.contains("1 missing"));
}

#[test]
fn json_report_is_machine_readable() {
    let dir = mk_project();
    let out = cachebust(dir.path(), &["rewrite", "--json"]);
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let files = value["files"].as_array().unwrap();
    assert!(files.iter().any(|f| f["path"].as_str().unwrap().contains("index.html")));
}

#[test]
fn init_writes_discovered_directories() {
    let dir = mk_project();
    std::fs::remove_file(dir.path().join("cachebust.toml")).unwrap();

    let out = cachebust(dir.path(), &["init"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let config = std::fs::read_to_string(dir.path().join("cachebust.toml")).unwrap();
    assert!(config.contains("static_dirs"), "missing static_dirs:\n{config}");
    assert!(config.contains("templates"), "code dir not discovered:\n{config}");
}

#[test]
fn missing_config_is_fatal_with_hint() {
    let dir = tempfile::tempdir().unwrap();
    let out = cachebust(dir.path(), &["update"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Config Not Found"), "no hint:\n{stderr}");
}

#[test]
fn invalid_token_length_is_fatal() {
    let dir = mk_project();
    std::fs::write(
        dir.path().join("cachebust.toml"),
        "static_dirs = [\"static\"]\ncode_dirs = [\"templates\"]\nhash_length = 0\n",
    )
    .unwrap();
    let out = cachebust(dir.path(), &["update"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Invalid Config"));
}

#[test]
fn unknown_hash_function_falls_back_with_note() {
    let dir = mk_project();
    std::fs::write(
        dir.path().join("cachebust.toml"),
        "static_dirs = [\"static\"]\ncode_dirs = [\"templates\"]\nhash_function = \"crc64\"\n",
    )
    .unwrap();
    let out = cachebust(dir.path(), &["rewrite"]);
    assert!(out.status.success(), "fallback should not be fatal");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("using xxh3"), "no fallback note:\n{stdout}");
    assert!(read_index(dir.path()).contains("?_cb_="));
}

#[test]
fn scan_lists_directories() {
    let dir = mk_project();
    let out = cachebust(dir.path(), &["scan"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("templates"));
    assert!(stdout.contains("static/js"));
}

#[test]
fn multibust_token_spans_variants() {
    let dir = mk_project();
    let root = dir.path();
    std::fs::write(root.join("static/js/i18n_en.js"), "en").unwrap();
    std::fs::write(root.join("static/js/i18n_de.js"), "de").unwrap();
    std::fs::write(
        root.join("templates/langs.html"),
        "<script src=\"/static/js/i18n_${lang}.js\"></script>\n",
    )
    .unwrap();
    std::fs::write(
        root.join("cachebust.toml"),
        "\
static_dirs = [\"static\"]
code_dirs = [\"templates\"]

[multibust]
\"${lang}\" = [\"en\", \"de\"]
",
    )
    .unwrap();

    assert!(cachebust(root, &["rewrite"]).status.success());
    let langs = std::fs::read_to_string(root.join("templates/langs.html")).unwrap();
    assert!(langs.contains("i18n_${lang}.js?_cb_="), "marker path not busted:\n{langs}");
    let before = langs;

    // Changing one variant refreshes the combined token.
    let de = root.join("static/js/i18n_de.js");
    std::fs::write(&de, "deutsch").unwrap();
    let file = std::fs::File::options().write(true).open(&de).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(2_000_000)).unwrap();

    assert!(cachebust(root, &["update"]).status.success());
    let after = std::fs::read_to_string(root.join("templates/langs.html")).unwrap();
    assert_ne!(before, after, "variant change did not refresh the token");
}
