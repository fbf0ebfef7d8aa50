use std::env;
use std::process::Command;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Release pipelines export `PAPERVIEW_VERSION`; local builds ask git.
fn describe() -> String {
    env::var("PAPERVIEW_VERSION")
        .ok()
        .filter(|pinned| !pinned.trim().is_empty())
        .or_else(|| {
            Command::new("git")
                .args(["describe", "--tags", "--dirty", "--always"])
                .output()
                .ok()
                .filter(|out| out.status.success())
                .and_then(|out| String::from_utf8(out.stdout).ok())
                .map(|stdout| stdout.trim().to_owned())
                .filter(|described| !described.is_empty())
        })
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_owned())
}

fn stamp() -> String {
    let now = OffsetDateTime::now_utc().replace_nanosecond(0);
    now.ok()
        .and_then(|now| now.format(&Rfc3339).ok())
        .unwrap_or_else(|| String::from("unknown"))
}

fn main() {
    println!("cargo:rerun-if-env-changed=PAPERVIEW_VERSION");
    for (key, value) in [
        ("PAPERVIEW_VERSION", describe()),
        ("PAPERVIEW_BUILD_TIME", stamp()),
    ] {
        println!("cargo:rustc-env={key}={value}");
    }
}
