//! Version command

/// Version string printed by `depcache version`
pub fn version_line() -> String {
    format!("depcache {}", env!("CARGO_PKG_VERSION"))
}

/// Execute the version command
pub fn execute() {
    println!("{}", version_line());
}
