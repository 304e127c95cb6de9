/// Crate version reported by the CLI. Overridable at build time via `APP_VERSION`.
pub const VERSION: &str = match option_env!("APP_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
