use predicates::prelude::*;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::from(Command::new(env!("CARGO_BIN_EXE_ldoc")));
    cmd.current_dir(dir);
    cmd
}

fn write(dir: &TempDir, name: &str, content: &str) {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn json_output(assert: assert_cmd::assert::Assert) -> serde_json::Value {
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    serde_json::from_str(&stdout).unwrap()
}

const LIST_LUA: &str = "\
--- List utilities.
-- Helpers for array-like tables.
-- @module list

local M = {}

--- Append a value.
-- @param t the list
-- @param v the value
-- @see len
function M.push(t, v) end

--- Number of elements.
-- @param t the list
-- @treturn number the length
function M.len(t) end

--- Shared scratch space.
local function scratch() end

return M
";

#[test]
fn json_to_stdout() {
    let dir = TempDir::new().unwrap();
    write(&dir, "list.lua", LIST_LUA);

    let assert = cmd(dir.path()).args(["-p", "demo", "list.lua"]).assert().success();
    let value = json_output(assert);

    assert_eq!(value["project"], "demo");
    let list = &value["modules"]["list"];
    assert_eq!(list["summary"], "List utilities.");
    let functions = &list["sections"][0];
    assert_eq!(functions["title"], "Functions");
    assert_eq!(functions["items"][0]["name"], "push");
    assert_eq!(functions["items"][0]["params"][1]["description"], "the value");
    assert_eq!(functions["items"][0]["see"][0]["target"]["href"], "list.html#len");
    assert_eq!(functions["items"][1]["returns"][0]["type"], "number");
    assert_eq!(list["sections"].as_array().unwrap().len(), 1);
}

#[test]
fn all_flag_shows_local_functions() {
    let dir = TempDir::new().unwrap();
    write(&dir, "list.lua", LIST_LUA);

    let assert = cmd(dir.path()).args(["--all", "list.lua"]).assert().success();
    let value = json_output(assert);
    let sections = &value["modules"]["list"]["sections"];
    assert_eq!(sections[1]["title"], "Local Functions");
    assert_eq!(sections[1]["items"][0]["name"], "scratch");
}

#[test]
fn same_module_across_files_is_merged() {
    let dir = TempDir::new().unwrap();
    let a = "--- Shared module.\n-- @module shared\n\n--- From a.\nfunction a() end\n";
    let b = "--- More of it.\n-- @module shared\n\n--- From b.\nfunction b() end\n";
    write(&dir, "src/a.lua", a);
    write(&dir, "src/b.lua", b);

    let assert = cmd(dir.path()).arg("src").assert().success();
    let value = json_output(assert);
    let modules = value["modules"].as_object().unwrap();
    assert_eq!(modules.len(), 1);
    let shared = &value["modules"]["shared"];
    assert_eq!(shared["summary"], "Shared module.");
    assert_eq!(shared["sections"][0]["items"].as_array().unwrap().len(), 2);
    assert_eq!(shared["files"].as_array().unwrap().len(), 2);
}

#[test]
fn module_names_follow_package_layout() {
    let dir = TempDir::new().unwrap();
    let http = "--- HTTP client.\n\n--- Fetch a URL.\nfunction get(url) end\n";
    let init = "--- Networking.\n\n--- Resolve a host.\nfunction resolve(host) end\n";
    write(&dir, "lib/net/http.lua", http);
    write(&dir, "lib/net/init.lua", init);

    for args in [["-b", "lib", "lib"], ["-b", "./lib", "lib"], ["-b", "lib", "./lib"]] {
        let value = json_output(cmd(dir.path()).args(args).assert().success());
        assert_eq!(value["modules"]["net.http"]["summary"], "HTTP client.", "{args:?}");
    }

    let assert = cmd(dir.path()).args(["-b", "lib", "lib"]).assert().success();
    let value = json_output(assert);
    assert_eq!(value["modules"]["net"]["summary"], "Networking.");
}

#[test]
fn non_doc_first_comment_fails_with_location() {
    let dir = TempDir::new().unwrap();
    write(&dir, "bad.lua", "local x = 1\n-- plain comment\n");

    cmd(dir.path())
        .arg("bad.lua")
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad.lua:2"));
}

#[test]
fn unresolved_reference_is_a_warning() {
    let dir = TempDir::new().unwrap();
    let src = "--- M.\n-- @module m\n\n--- F.\n-- @see missing_name\nfunction f() end\n";
    write(&dir, "m.lua", src);

    let assert = cmd(dir.path())
        .arg("m.lua")
        .assert()
        .success()
        .stderr(predicate::str::contains("unresolved reference"));
    let value = json_output(assert);
    let see = &value["modules"]["m"]["sections"][0]["items"][0]["see"][0];
    assert_eq!(see["text"], "missing_name");
    assert!(see["target"].is_null());
}

#[test]
fn invalid_format_fails() {
    let dir = TempDir::new().unwrap();
    write(&dir, "list.lua", LIST_LUA);

    cmd(dir.path())
        .args(["-f", "html", "list.lua"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown format"));
}

#[test]
fn config_file_registers_types_and_writes_output() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "ldoc.toml",
        "project = \"events\"\n\n\
         [[types]]\nid = \"event\"\ntitle = \"Events\"\nchild_title = \"Payload\"\n",
    );
    let src = "--- Event bus.\n-- @module bus\n\n\
               --- Emitted on close.\n-- @event closed\n-- @field reason why\n";
    write(&dir, "bus.lua", src);

    cmd(dir.path())
        .args(["-o", "out.json", "bus.lua"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let out = std::fs::read_to_string(dir.path().join("out.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["project"], "events");
    let section = &value["modules"]["bus"]["sections"][0];
    assert_eq!(section["title"], "Events");
    assert_eq!(section["child_title"], "Payload");
    assert_eq!(section["items"][0]["fields"][0]["name"], "reason");
}

#[test]
fn unknown_class_is_fatal() {
    let dir = TempDir::new().unwrap();
    write(&dir, "m.lua", "--- M.\n-- @module m\n\n--- Odd.\n-- @class widget\n-- @name w\n");

    cmd(dir.path())
        .arg("m.lua")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown section 'widget'"));
}

#[test]
fn c_sources_are_documented() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "vec.c",
        "\
/** Vector math.
 * @module vec
 */

/** Dot product.
 * @param a left
 * @param b right
 */
double vec_dot(const double *a, const double *b) {
  return 0;
}
",
    );

    let assert = cmd(dir.path()).arg("vec.c").assert().success();
    let value = json_output(assert);
    let dot = &value["modules"]["vec"]["sections"][0]["items"][0];
    assert_eq!(dot["name"], "vec_dot");
    assert_eq!(dot["params"][1]["name"], "b");
}

#[test]
fn missing_input_is_an_error() {
    let dir = TempDir::new().unwrap();
    cmd(dir.path())
        .arg("nothing-*.lua")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no input files"));
}
