use std::process::Command;

/// Short commit id of the checkout, if this is a git checkout at all.
fn commit_id() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let id = String::from_utf8(output.stdout).ok()?;
    Some(id.trim().to_owned()).filter(|id| !id.is_empty())
}

fn main() {
    let id = commit_id().unwrap_or_else(|| String::from("unknown"));
    println!("cargo:rustc-env=GIT_SHA={id}");
    println!("cargo:rerun-if-changed=../../.git/HEAD");
}
