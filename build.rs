use std::process::Command;

/// Runs git in the crate directory, returning trimmed stdout on success.
fn git_output(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/heads");

    // Builds from a source tarball have no repository to ask.
    let version_suffix = match git_output(&["rev-parse", "--short=8", "HEAD"]) {
        Some(hash) => {
            let dirty = git_output(&["status", "--porcelain"]).is_some_and(|s| !s.is_empty());
            if dirty { format!("{}-dirty", hash) } else { hash }
        }
        None => "unknown".to_string(),
    };

    println!("cargo::rustc-env=GIT_HASH={}", version_suffix);
}
