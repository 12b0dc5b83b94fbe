// Build script to stamp the binary version from git tags
//
// A tagged build reports the tag ("v0.2.0" -> "0.2.0"); anything else reports the
// crate version with the abbreviated commit appended.

use std::process::Command;

fn main() {
    let version = git_version().unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=CSRDASH_VERSION={}", version);
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/tags");
}

fn git_version() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let described = String::from_utf8(output.stdout).ok()?;
    let described = described.trim();
    match described.strip_prefix('v') {
        Some(tagged) => Some(tagged.split('-').next().unwrap_or(tagged).to_string()),
        None => Some(format!("{}-{}", env!("CARGO_PKG_VERSION"), described)),
    }
}
