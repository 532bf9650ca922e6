use std::process::Command;

fn gen_version() {
    if let Ok(output) = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
    {
        if output.status.success() {
            let git_short_hash = String::from_utf8_lossy(&output.stdout);
            println!("cargo:rustc-env=GIT_SHORT_HASH={}", git_short_hash.trim());
        }
    }
}

fn main() {
    gen_version();
}
