use lazy_static::lazy_static;
use std::collections::HashMap;

pub mod analysis_state;
pub mod api;
pub mod app;
pub mod canvas;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod particles;
pub mod render_layers;
pub mod storage;
pub mod toast;
pub mod view_state;
pub mod visualization;
pub mod workflows;

lazy_static! {
    // Display names for the service's algorithm identifiers
    pub static ref ALGORITHM_NAMES: HashMap<&'static str, &'static str> = HashMap::from([
        ("naive-local", "NAIVE"),
        ("kmp", "KMP"),
        ("boyer-moore", "BOYER-MOORE"),
        ("rabin-karp", "RABIN-KARP"),
    ]);
}

pub fn display_version() -> &'static str {
    option_env!("DNA_ANALYZER_DISPLAY_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}
