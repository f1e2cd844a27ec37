mod bindings;
mod presenter;

use crate::bindings::TerminalHost;
use remote_view_runtime::HostConfig;
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = HostConfig::from_env();
    let result = remote_view_runtime::run(TerminalHost::new(), config, |view| {
        eprint!("{}", presenter::markup(view));
        eprintln!("----");
    });

    if let Err(err) = result {
        eprintln!("view_host fatal error: {err}");
        process::exit(1);
    }
}
