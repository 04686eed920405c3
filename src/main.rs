//! Demo runner. Packs the library for the browser into `static/pkg`, then
//! serves `static/` until interrupted. `RIPPLES_PORT` overrides the port.

use std::env;
use std::process::{self, Command};

const DEFAULT_PORT: &str = "8000";

fn pack() -> Result<(), String> {
    let status = Command::new("wasm-pack")
        .args(["build", "--release", "--target", "web", "--out-dir", "static/pkg"])
        .status()
        .map_err(|err| format!("cannot run wasm-pack: {err}"))?;
    if !status.success() {
        return Err(format!("wasm-pack exited with {status}"));
    }
    Ok(())
}

fn serve(port: &str) -> Result<(), String> {
    println!("ripples demo on http://127.0.0.1:{port}/");
    let status = Command::new("python3")
        .args(["-m", "http.server", port, "--directory", "static"])
        .status()
        .map_err(|err| format!("cannot run python3: {err}"))?;
    if !status.success() {
        return Err(format!("http.server exited with {status}"));
    }
    Ok(())
}

fn main() {
    let port = env::var("RIPPLES_PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
    if let Err(err) = pack().and_then(|()| serve(&port)) {
        eprintln!("{err}");
        process::exit(1);
    }
}
