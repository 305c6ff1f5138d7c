/// Config file path from the first command-line argument
pub fn config_path(default: &str) -> String {
    std::env::args().nth(1).unwrap_or_else(|| default.to_string())
}
