fn main() {
    let version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let mut long_version = version.clone();

    // Best-effort: embed git commit hash for `regqa --version` and audit trails.
    if let Ok(out) = std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
    {
        if out.status.success() {
            let hash = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if !hash.is_empty() {
                long_version = format!("{version} ({hash})");
            }
        }
    }
    println!("cargo:rustc-env=REGQA_LONG_VERSION={long_version}");
    println!("cargo:rerun-if-changed=build.rs");
}
