// Shared build script helper that turns a crate README into its rustdoc front page.
// Include this in build.rs files with: include!("../build_common.rs");
//
// Required imports in the including file:
//   use std::env;
//   use std::fs;
//   use std::path::Path;

/// Copy a crate's README.md into `OUT_DIR/README_GENERATED.md` with links rewritten
/// for rustdoc.
///
/// Rewrites:
/// 1. `](src/foo.rs)` module links become `](foo)` so rustdoc resolves them
/// 2. `](../../README.md` becomes the workspace repository URL
///
/// A crate without a README gets an empty front page so the `include_str!`
/// in `lib.rs` always resolves.
fn process_readme_for_rustdoc(crate_dir: &str) {
    println!("cargo:rerun-if-changed=README.md");
    println!("cargo:rerun-if-changed=../../Cargo.toml");

    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("README_GENERATED.md");

    let readme_path = Path::new(crate_dir).join("README.md");
    let content = fs::read_to_string(&readme_path).unwrap_or_default();

    let mut rustdoc_content = content.replace("](src/", "](").replace(".rs)", ")");

    if let Some(url) = workspace_repository_url(crate_dir) {
        rustdoc_content = rustdoc_content.replace("](../../README.md", &format!("]({url}"));
    }

    fs::write(dest_path, rustdoc_content).unwrap();
}

/// Read `repository = "..."` from the workspace Cargo.toml two levels up.
fn workspace_repository_url(crate_dir: &str) -> Option<String> {
    let workspace_toml = Path::new(crate_dir).parent()?.parent()?.join("Cargo.toml");
    let content = fs::read_to_string(workspace_toml).ok()?;

    content.lines().map(str::trim).find_map(|line| {
        if !line.starts_with("repository") || !line.contains('=') {
            return None;
        }
        let start = line.find('"')?;
        let end = line.rfind('"')?;
        (start < end).then(|| line[start + 1..end].to_string())
    })
}
