fn main() {
    match git_revision_hash() {
        Some(rev) => println!("cargo:rustc-env=BUILD_GIT_HASH={rev}"),
        None => println!("cargo:rustc-env=BUILD_GIT_HASH=unknown"),
    }
    println!("cargo:rerun-if-changed=.git/HEAD");
}

// short revision of the checkout, None outside a git tree
fn git_revision_hash() -> Option<String> {
    let output = std::process::Command::new("git")
        .args(["rev-parse", "--short=10", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let rev = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if rev.is_empty() { None } else { Some(rev) }
}
