//! Entry point for the paneldeck TUI. Parses args, resolves a registry
//! profile, and runs the App.

use std::env;
use std::io::{self, Write};
use std::time::Duration;

use paneldeck::alerts::DEFAULT_ALERT_URLS;
use paneldeck::app::App;
use paneldeck::registry::DEFAULT_REGISTRY;
use paneldeck::store::{ProfileEntry, ProfileRequest, ResolveProfile, Store};

const DEFAULT_REFRESH_MS: u64 = 15_000;
const DEMO_PORT: u16 = 3210;

struct ParsedArgs {
    url: Option<String>,
    profile: Option<String>,
    refresh_ms: Option<u64>,
    alerts: Option<String>,
    save: bool,
    demo: bool,
    dry_run: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "paneldeck".into());
    let usage = || {
        format!(
            "Usage: {prog} [--profile NAME|-P NAME] [--refresh MS|-r MS] [--alerts WS_URL[,WS_URL...]] [--save] [--demo] [--dry-run] [http://HOST:PORT]"
        )
    };
    let mut url: Option<String> = None;
    let mut profile: Option<String> = None;
    let mut refresh_ms: Option<u64> = None;
    let mut alerts: Option<String> = None;
    let mut save = false;
    let mut demo = false;
    let mut dry_run = false;

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(usage()),
            "--profile" | "-P" => {
                profile = it.next();
            }
            "--refresh" | "-r" => {
                refresh_ms = it.next().and_then(|v| v.parse().ok());
            }
            "--alerts" => {
                alerts = it.next();
            }
            "--save" => {
                save = true;
            }
            "--demo" => {
                demo = true;
            }
            "--dry-run" => {
                dry_run = true;
            }
            _ if arg.starts_with("--profile=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        profile = Some(v.to_string());
                    }
                }
            }
            _ if arg.starts_with("--refresh=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    refresh_ms = v.parse().ok();
                }
            }
            _ if arg.starts_with("--alerts=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        alerts = Some(v.to_string());
                    }
                }
            }
            _ => {
                if url.is_none() {
                    url = Some(arg);
                } else {
                    return Err(format!("Unexpected argument. {}", usage()));
                }
            }
        }
    }
    Ok(ParsedArgs {
        url,
        profile,
        refresh_ms,
        alerts,
        save,
        demo,
        dry_run,
    })
}

fn alert_urls(flag: Option<&str>) -> Vec<String> {
    match flag {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        None => DEFAULT_ALERT_URLS.iter().map(|s| s.to_string()).collect(),
    }
}

fn init_logging() {
    // Keep the alternate screen clean unless logging was asked for.
    if let Ok(filter) = env::var("PANELDECK_LOG") {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
            .with_writer(std::io::stderr)
            .try_init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    // Demo mode short-circuit: bring up the bundled registry and point at it.
    if parsed.demo || matches!(parsed.profile.as_deref(), Some("demo")) {
        return run_demo_mode(parsed.refresh_ms).await;
    }

    let store = Store::new();
    let profiles_file = store.load_profiles();
    let req = ProfileRequest {
        profile_name: parsed.profile.clone(),
        url: parsed.url.clone(),
        refresh_ms: parsed.refresh_ms,
    };
    let resolved = req.resolve(&profiles_file);

    let mut profiles_mut = profiles_file.clone();
    let (url, refresh_ms): (String, Option<u64>) = match resolved {
        ResolveProfile::Direct(u, r) => {
            if let Some(name) = parsed.profile.as_ref() {
                let entry = ProfileEntry {
                    url: u.clone(),
                    refresh_ms: r,
                };
                match profiles_mut.profiles.get(name) {
                    None => {
                        // New profile: save immediately.
                        profiles_mut.profiles.insert(name.clone(), entry);
                        let _ = store.save_profiles(&profiles_mut);
                    }
                    Some(existing) => {
                        let changed = existing.url != u || existing.refresh_ms != r;
                        if changed {
                            let overwrite = if parsed.save {
                                true
                            } else if parsed.dry_run {
                                false
                            } else {
                                prompt_yes_no(&format!(
                                    "Overwrite existing profile '{name}'? [y/N]: "
                                ))
                            };
                            if overwrite {
                                profiles_mut.profiles.insert(name.clone(), entry);
                                let _ = store.save_profiles(&profiles_mut);
                            }
                        }
                    }
                }
            }
            (u, r)
        }
        ResolveProfile::Loaded(u, r) => (u, r),
        ResolveProfile::PromptSelect(mut names) => {
            if !names.iter().any(|n| n == "demo") {
                names.push("demo".into());
            }
            eprintln!("Select profile:");
            for (i, n) in names.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, n);
            }
            eprint!("Enter number (or blank to abort): ");
            let _ = io::stderr().flush();
            let mut line = String::new();
            if io::stdin().read_line(&mut line).is_err() {
                return Ok(());
            }
            let Ok(idx) = line.trim().parse::<usize>() else {
                return Ok(());
            };
            if idx < 1 || idx > names.len() {
                return Ok(());
            }
            let name = &names[idx - 1];
            if name == "demo" {
                return run_demo_mode(parsed.refresh_ms).await;
            }
            match profiles_mut.profiles.get(name) {
                Some(entry) => (entry.url.clone(), entry.refresh_ms),
                None => return Ok(()),
            }
        }
        ResolveProfile::PromptCreate(name) => {
            eprintln!("Profile '{name}' does not exist yet.");
            let url = prompt_string("Enter registry URL (http://HOST:PORT): ")?;
            if url.trim().is_empty() {
                return Ok(());
            }
            let refresh = prompt_string("Refresh interval in ms (blank for default): ")?;
            let refresh_ms = refresh.trim().parse::<u64>().ok();
            profiles_mut.profiles.insert(
                name.clone(),
                ProfileEntry {
                    url: url.trim().to_string(),
                    refresh_ms,
                },
            );
            let _ = store.save_profiles(&profiles_mut);
            (url.trim().to_string(), refresh_ms)
        }
        ResolveProfile::None => (DEFAULT_REGISTRY.to_string(), parsed.refresh_ms),
    };

    let refresh = Duration::from_millis(refresh_ms.unwrap_or(DEFAULT_REFRESH_MS));
    if parsed.dry_run {
        println!("registry: {url}");
        println!("refresh: {}ms", refresh.as_millis());
        return Ok(());
    }

    let mut app = App::new(&url, alert_urls(parsed.alerts.as_deref()), refresh, store);
    app.run().await
}

fn prompt_yes_no(prompt: &str) -> bool {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_ok() {
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    } else {
        false
    }
}

fn prompt_string(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}

// --- Demo Mode ---

async fn run_demo_mode(refresh_ms: Option<u64>) -> anyhow::Result<()> {
    let port = DEMO_PORT;
    let url = format!("http://127.0.0.1:{port}");
    let alerts = vec![format!("ws://127.0.0.1:{port}/ws/alerts")];
    let child = spawn_demo_registry(port)?;
    let refresh = Duration::from_millis(refresh_ms.unwrap_or(DEFAULT_REFRESH_MS));
    let mut app = App::new(&url, alerts, refresh, Store::new());
    tokio::select! {
        res = app.run() => { drop(child); res }
        _ = tokio::signal::ctrl_c() => {
            drop(child);
            Ok(())
        }
    }
}

struct DemoGuard(std::sync::Arc<std::sync::Mutex<Option<std::process::Child>>>);
impl Drop for DemoGuard {
    fn drop(&mut self) {
        if let Some(mut ch) = self.0.lock().unwrap().take() {
            let _ = ch.kill();
        }
    }
}

fn spawn_demo_registry(port: u16) -> anyhow::Result<DemoGuard> {
    let candidate = find_registry_executable();
    let mut cmd = std::process::Command::new(candidate);
    cmd.arg("--port").arg(port.to_string());
    let child = cmd.spawn()?;
    // Give the registry a brief moment to start.
    std::thread::sleep(std::time::Duration::from_millis(300));
    Ok(DemoGuard(std::sync::Arc::new(std::sync::Mutex::new(Some(
        child,
    )))))
}

fn find_registry_executable() -> std::path::PathBuf {
    if let Some(exe) = std::env::current_exe().ok() {
        if let Some(parent) = exe.parent() {
            #[cfg(windows)]
            let name = "paneldeck_registry.exe";
            #[cfg(not(windows))]
            let name = "paneldeck_registry";
            let candidate = parent.join(name);
            if candidate.exists() {
                return candidate;
            }
        }
    }
    // Fall back to PATH.
    std::path::PathBuf::from("paneldeck_registry")
}
