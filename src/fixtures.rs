#[cfg(test)]
pub mod test {
    use std::path::{Path, PathBuf};

    use serde::{Deserialize, Serialize};

    use crate::addr::{Addr, TcpAddr, UdpAddr, UnixAddr};
    use crate::duration::Duration;
    use crate::string::IndirectString;
    use crate::tls::Tls;
    use crate::url::Url;

    /// Path to a PEM fixture under `testdata/`.
    pub fn testdata(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name)
    }

    /// A config struct holding one of every value type.
    #[derive(Serialize, Deserialize, Debug, Default)]
    pub struct ExampleConfig {
        pub str1: IndirectString,
        pub num1: u64,
        pub url: Url,
        pub dur: Duration,
        pub addr: Addr,
        pub uaddr: UnixAddr,
        pub taddr: TcpAddr,
        pub udaddr: UdpAddr,
        pub tls: Tls,
    }

    #[test]
    fn default_example_round_trips() {
        let config = ExampleConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let again: ExampleConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(again.taddr, config.taddr);
        assert_eq!(again.uaddr, config.uaddr);
        assert_eq!(again.tls.config(), config.tls.config());
    }

    #[test]
    fn testdata_exists() {
        assert!(testdata("root_ca.pem").is_file());
    }
}
