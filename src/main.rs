use anyhow::Result;
use clap::{App, load_yaml};
use env_logger::Builder;
use jemallocator::Jemalloc;
use log::{debug, info};
use log::LevelFilter::*;
use signal_hook::consts::signal::{SIGINT, SIGTERM, SIGUSR1};
use signal_hook::iterator::Signals;
use monet::agent::Agent;
use monet::args::config;

#[global_allocator]
static ALLOC: Jemalloc = Jemalloc;

fn main() -> Result<()> {
    let yaml = load_yaml!("args.yml");
    let ver  = env!("CARGO_PKG_VERSION");
    let args = App::from_yaml(&yaml).version(ver).get_matches();

    let (module, level) = match args.occurrences_of("verbose") {
        0 => (Some(module_path!()), Info),
        1 => (Some(module_path!()), Debug),
        2 => (Some(module_path!()), Trace),
        _ => (None,                 Trace),
    };
    Builder::from_default_env().filter(module, level).init();

    info!("initializing monet {}", ver);

    let config = config(&args)?;
    debug!("{:#?}", config);

    let mut signals = Signals::new(&[SIGINT, SIGTERM, SIGUSR1])?;
    let agent = Agent::start(config)?;

    for signal in signals.forever() {
        match signal {
            SIGUSR1 => dump(&agent),
            _       => break,
        }
    }

    info!("shutting down");

    agent.stop()
}

fn dump(agent: &Agent) {
    let mut usage = agent.attribution().into_iter().collect::<Vec<_>>();
    usage.sort_by_key(|(pid, _)| *pid);

    debug!("attribution state: {} processes, {} port pairs", usage.len(), agent.correlated());
    for (pid, u) in usage {
        debug!("  {}: up {} down {}", pid, u.upload_bytes, u.download_bytes);
    }
}
