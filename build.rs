use std::{
    env,
    time::{SystemTime, UNIX_EPOCH},
};

const BUILD_ID_ENV: &str = "DNA_ANALYZER_BUILD_ID";

/// CI can pin the build id (e.g. a commit hash); release builds otherwise get
/// a timestamp and debug builds are just "dev".
fn build_id() -> String {
    if let Ok(id) = env::var(BUILD_ID_ENV) {
        let id = id.trim();
        if !id.is_empty() {
            return id.to_string();
        }
    }
    if env::var("PROFILE").as_deref() == Ok("debug") {
        return "dev".to_string();
    }
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        .to_string()
}

fn main() {
    println!("cargo:rerun-if-env-changed={BUILD_ID_ENV}");
    println!("cargo:rerun-if-changed=build.rs");
    let version = env::var("CARGO_PKG_VERSION").unwrap_or_default();
    println!(
        "cargo:rustc-env=DNA_ANALYZER_DISPLAY_VERSION={version}+{}",
        build_id()
    );
}
