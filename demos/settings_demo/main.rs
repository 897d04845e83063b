//! # configval demo application
//!
//! A sample CLI that loads its settings from four layers: compiled defaults,
//! `DEMO_*` environment variables, a YAML/JSON/TOML file, and command-line
//! flags. It prints the resolved configuration and exits.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example settings_demo
//! cargo run --example settings_demo -- --listen tcp6:[::1]:8443 --timeout 1m30s
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature               | How to exercise it                                                        |
//! |-----------------------|---------------------------------------------------------------------------|
//! | Compiled defaults     | `cargo run --example settings_demo`                                       |
//! | Env var override      | `DEMO_WORKERS=16 cargo run --example settings_demo`                       |
//! | Config file           | `DEMO_CONFIG=demo.yaml cargo run --example settings_demo`                 |
//! | Flag override         | `cargo run --example settings_demo -- --upstream https://api.example.com` |
//! | Indirect secret       | `DEMO_SECRET=s3 cargo run --example settings_demo -- --token '$DEMO_SECRET'` |
//! | Validation errors     | `cargo run --example settings_demo -- --listen udp:1.2.3.4:53`            |
//! | Serialized view       | `cargo run --example settings_demo -- --dump`                             |

mod config;

use std::path::PathBuf;

use clap::Parser;

use configval::{Duration, IndirectString, TcpAddr, UnixAddr, Url, file};

use config::DemoConfig;

/// configval demo: resolve settings from defaults, env, file and flags.
#[derive(Parser, Debug)]
#[command(name = "settings-demo")]
struct Cli {
    /// Config file (.yaml, .yml, .json or .toml). Defaults to $DEMO_CONFIG, then demo.yaml.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    workers: Option<u64>,

    #[arg(long)]
    verbose: bool,

    /// TCP listener, e.g. tcp:0.0.0.0:3000.
    #[arg(long)]
    listen: Option<TcpAddr>,

    /// Control socket, e.g. unix:/run/demo.sock.
    #[arg(long)]
    control: Option<UnixAddr>,

    #[arg(long)]
    upstream: Option<Url>,

    /// Go-style duration, e.g. 250ms or 1m30s.
    #[arg(long)]
    timeout: Option<Duration>,

    /// Literal, $VAR or file path.
    #[arg(long)]
    token: Option<IndirectString>,

    /// Print the config as it would be written back to a file.
    #[arg(long)]
    dump: bool,
}

fn fail(what: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("{what}:\n{err}");
    std::process::exit(1);
}

fn config_path(cli: &Cli) -> PathBuf {
    if let Some(path) = &cli.config {
        return path.clone();
    }
    let mut path = String::from("demo.yaml");
    configval::env::string_var(&mut path, "DEMO_CONFIG")
        .unwrap_or_else(|e| fail("Invalid DEMO_CONFIG", e));
    PathBuf::from(path)
}

fn apply_flags(config: &mut DemoConfig, cli: Cli) {
    if let Some(name) = cli.name {
        config.name = name;
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if cli.verbose {
        config.verbose = true;
    }
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    if let Some(control) = cli.control {
        config.control = control;
    }
    if let Some(upstream) = cli.upstream {
        config.upstream = upstream;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout = timeout;
    }
    if let Some(token) = cli.token {
        config.token = token;
    }
}

fn print_config(config: &DemoConfig) {
    let token = if config.token.as_str().is_empty() {
        "(none)"
    } else {
        "(set)"
    };
    let tls = config.tls.context();
    let entries = [
        ("name", config.name.clone()),
        ("workers", config.workers.to_string()),
        ("verbose", config.verbose.to_string()),
        ("listen", config.listen.to_string()),
        ("control", config.control.to_string()),
        ("upstream", config.upstream.to_string()),
        ("timeout", config.timeout.to_string()),
        ("token", format!("{token} from {:?}", config.token.source())),
        ("tls.clientAuth", tls.client_auth().to_string()),
        ("tls.certificates", tls.certificates().len().to_string()),
    ];
    let width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (key, value) in &entries {
        println!("{key:<width$}  {value}");
    }
}

fn main() {
    let cli = Cli::parse();

    let mut config = DemoConfig::defaults().unwrap_or_else(|e| fail("Invalid defaults", e));
    config
        .apply_env()
        .unwrap_or_else(|e| fail("Invalid environment", e));

    let path = config_path(&cli);
    file::load_auto(&mut config, &path, cli.config.is_some())
        .unwrap_or_else(|e| fail("Failed to load config", e));

    let dump = cli.dump;
    apply_flags(&mut config, cli);

    if dump {
        match serde_yaml::to_string(&config) {
            Ok(yaml) => print!("{yaml}"),
            Err(e) => fail("Failed to serialize config", e),
        }
    } else {
        print_config(&config);
    }
}
