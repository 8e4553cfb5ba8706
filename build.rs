use std::process::Command;

fn main() {
    // Deployment platforms usually inject the commit SHA; fall back to git
    // for local builds.
    let git_hash = std::env::var("SOURCE_COMMIT").unwrap_or_else(|_| {
        let output = Command::new("git").args(["rev-parse", "HEAD"]).output();
        match output {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            }
            _ => "unknown".to_string(),
        }
    });

    println!("cargo:rustc-env=GIT_COMMIT_HASH={git_hash}");

    // Rebuild if the Git commit changes (only works when .git is available)
    if std::path::Path::new(".git/HEAD").exists() {
        println!("cargo:rerun-if-changed=.git/HEAD");
        println!("cargo:rerun-if-changed=.git/refs/heads");
    }
}
