//! Configuration struct for the settings demo.
//!
//! Every field is a `configval` type, so the same text form works in the YAML
//! file, in the environment, and on the command line.
//!
//! | Env var               | File key   | Flag           |
//! |-----------------------|------------|----------------|
//! | `DEMO_CONFIG`         |            | `--config`     |
//! | `DEMO_NAME`           | `name`     | `--name`       |
//! | `DEMO_WORKERS`        | `workers`  | `--workers`    |
//! | `DEMO_VERBOSE`        | `verbose`  | `--verbose`    |
//! | `DEMO_LISTEN`         | `listen`   | `--listen`     |
//! | `DEMO_CONTROL`        | `control`  | `--control`    |
//! | `DEMO_UPSTREAM`       | `upstream` | `--upstream`   |
//! | `DEMO_TIMEOUT`        | `timeout`  | `--timeout`    |
//! | `DEMO_TOKEN`          | `token`    | `--token`      |
//! | `DEMO_TLS`            | `tls`      |                |

use serde::{Deserialize, Serialize};

use configval::{
    Duration, EnvLoader, ErrorPolicy, IndirectString, Settable, TcpAddr, Tls, UnixAddr, Url,
};

#[derive(Serialize, Deserialize, Debug)]
pub struct DemoConfig {
    /// Application name shown in the banner.
    pub name: String,

    /// Number of worker threads.
    pub workers: u64,

    pub verbose: bool,

    /// Public listener.
    pub listen: TcpAddr,

    /// Local control socket.
    pub control: UnixAddr,

    pub upstream: Url,

    /// Upstream request timeout.
    pub timeout: Duration,

    /// API token, usually `$VAR` or a file path so the secret stays out of the file.
    pub token: IndirectString,

    pub tls: Tls,
}

impl DemoConfig {
    /// Compiled defaults.
    pub fn defaults() -> Result<Self, configval::ConfigError> {
        let mut listen = TcpAddr::default();
        listen.set("tcp:127.0.0.1:3000")?;
        let mut upstream = Url::default();
        upstream.set("http://localhost:8080/")?;

        Ok(DemoConfig {
            name: "settings-demo".into(),
            workers: 4,
            verbose: false,
            listen,
            control: UnixAddr::default(),
            upstream,
            timeout: Duration::from_secs(5),
            token: IndirectString::default(),
            tls: Tls::default(),
        })
    }

    /// Overlay `DEMO_*` environment variables.
    pub fn apply_env(&mut self) -> Result<(), configval::ConfigError> {
        let mut env = EnvLoader::new(ErrorPolicy::ContinueOnError);
        env.string(&mut self.name, "DEMO_NAME")
            .uint64(&mut self.workers, "DEMO_WORKERS")
            .bool(&mut self.verbose, "DEMO_VERBOSE")
            .var(&mut self.listen, "DEMO_LISTEN")
            .var(&mut self.control, "DEMO_CONTROL")
            .var(&mut self.upstream, "DEMO_UPSTREAM")
            .duration(&mut self.timeout, "DEMO_TIMEOUT")
            .var(&mut self.token, "DEMO_TOKEN")
            .var(&mut self.tls, "DEMO_TLS");
        env.finish()
    }
}
