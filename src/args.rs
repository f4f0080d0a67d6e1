use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use anyhow::Result;
use clap::{ArgMatches, value_t, values_t};
use regex::Regex;
use crate::agent::Config;
use crate::capture;
use crate::store::{self, Retention};

pub fn config(args: &ArgMatches) -> Result<Config> {
    let interval  = secs(args, "interval")?;
    let retention = secs(args, "retention")?;

    let retention = Retention {
        interfaces:  opt_secs(args, "retention-interfaces")?.unwrap_or(retention),
        connections: opt_secs(args, "retention-connections")?.unwrap_or(retention),
        packets:     opt_secs(args, "retention-packets")?.unwrap_or(retention),
    };

    let capture = values_t!(args, "capture", String)?.join("|");
    let exclude = args.values_of("exclude").map(|vs| {
        vs.map(String::from).collect::<Vec<_>>().join("|")
    }).unwrap_or_else(|| "^(any|lo)$".to_string());

    let listen = opt::<SocketAddr>(args.value_of("listen"))?;

    Ok(Config {
        interval: interval,
        ttl:      secs(args, "ttl")?,
        listen:   listen,
        store:    store::Config {
            retention: retention,
            capacity:  value_t!(args, "capacity", usize)?,
            limit:     value_t!(args, "limit", usize)?,
        },
        capture:  capture::Config {
            capture:     Regex::new(&capture)?,
            exclude:     Regex::new(&exclude)?,
            interval:    interval,
            buffer_size: value_t!(args, "buffer", i32)?,
            snaplen:     value_t!(args, "snaplen", i32)?,
            promisc:     !args.is_present("no-promisc"),
            persist:     args.is_present("packets"),
        },
    })
}

pub fn opt<T: FromStr>(arg: Option<&str>) -> Result<Option<T>> {
    Ok(arg.map(|s| T::from_str(s).map_err(|_| {
        let msg  = format!("invalid argument value '{}'", s);
        let kind = clap::ErrorKind::InvalidValue;
        clap::Error::with_description(&msg, kind)
    })).transpose()?)
}

fn secs(args: &ArgMatches, name: &str) -> Result<Duration> {
    Ok(Duration::from_secs(value_t!(args, name, u64)?))
}

fn opt_secs(args: &ArgMatches, name: &str) -> Result<Option<Duration>> {
    Ok(opt::<u64>(args.value_of(name))?.map(Duration::from_secs))
}

#[cfg(test)]
mod test {
    use std::time::Duration;
    use anyhow::Result;
    use clap::{App, load_yaml};
    use super::config;

    #[test]
    fn defaults() -> Result<()> {
        let yaml = load_yaml!("args.yml");
        let args = App::from_yaml(&yaml).get_matches_from_safe(vec!["monet"])?;
        let cfg  = config(&args)?;

        assert_eq!(cfg.interval, Duration::from_secs(1));
        assert_eq!(cfg.ttl,      Duration::from_secs(60));
        assert_eq!(cfg.store.retention.packets, Duration::from_secs(86400));
        assert_eq!(cfg.store.limit, 1000);
        assert!(cfg.capture.capture.is_match("eth0"));
        assert!(cfg.capture.exclude.is_match("lo"));
        assert!(!cfg.capture.exclude.is_match("eth0"));
        assert!(cfg.capture.promisc);
        assert!(!cfg.capture.persist);

        Ok(())
    }

    #[test]
    fn overrides() -> Result<()> {
        let yaml = load_yaml!("args.yml");
        let args = App::from_yaml(&yaml).get_matches_from_safe(vec![
            "monet", "-i", "5", "--retention-connections", "30",
            "-c", "eth.*", "-c", "wlan0", "-x", "eth9", "--packets",
        ])?;
        let cfg  = config(&args)?;

        assert_eq!(cfg.interval, Duration::from_secs(5));
        assert_eq!(cfg.capture.interval, Duration::from_secs(5));
        assert_eq!(cfg.store.retention.connections, Duration::from_secs(30));
        assert_eq!(cfg.store.retention.interfaces,  Duration::from_secs(86400));
        assert!(cfg.capture.capture.is_match("wlan0"));
        assert!(cfg.capture.exclude.is_match("eth9"));
        assert!(!cfg.capture.exclude.is_match("lo"));
        assert!(cfg.capture.persist);

        Ok(())
    }

    #[test]
    fn invalid_listen_address() -> Result<()> {
        let yaml = load_yaml!("args.yml");
        let args = App::from_yaml(&yaml).get_matches_from_safe(vec!["monet", "-l", "nowhere"])?;
        assert!(config(&args).is_err());
        Ok(())
    }
}
