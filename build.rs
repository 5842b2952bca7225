fn main() {
    println!("cargo:rerun-if-env-changed=GLYPHFALL_BUILD");
    println!("cargo:rerun-if-env-changed=GITHUB_SHA");

    let build_id = match std::env::var("GLYPHFALL_BUILD") {
        Ok(v) if !v.trim().is_empty() => v,
        _ => target_id(),
    };
    println!("cargo:rustc-env=GLYPHFALL_BUILD={}", build_id);

    let sha = git_short_sha()
        .or_else(|| short_hex(&std::env::var("GITHUB_SHA").unwrap_or_default()))
        .unwrap_or_default();
    println!("cargo:rustc-env=GLYPHFALL_GIT_SHA={}", sha);
}

fn short_hex(v: &str) -> Option<String> {
    let v = v.trim();
    if v.is_empty() {
        return None;
    }
    let short = &v[..v.len().min(7)];
    if short.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(short.to_ascii_lowercase())
    } else {
        None
    }
}

fn git_short_sha() -> Option<String> {
    let out = std::process::Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    short_hex(&String::from_utf8(out.stdout).ok()?)
}

fn target_id() -> String {
    let os = match std::env::var("CARGO_CFG_TARGET_OS").as_deref() {
        Ok("macos") => "darwin".to_string(),
        Ok(other) => other.to_string(),
        Err(_) => "unknown".to_string(),
    };
    let arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_else(|_| "unknown".to_string());
    format!("{os}-{arch}")
}
