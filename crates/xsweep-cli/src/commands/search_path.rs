use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use xsweep_exp::SWEEPER_SECTION;

use super::config::search_path;

#[derive(Args, Debug)]
pub struct SearchPathArgs {
    /// Extra config directories, searched before the bundled configs.
    #[arg(long = "config-dir", value_name = "DIR")]
    pub config_dirs: Vec<PathBuf>,
}

pub fn run(args: &SearchPathArgs) -> Result<(), Box<dyn Error>> {
    let search_path = search_path(&args.config_dirs);
    for entry in search_path.entries() {
        let options = search_path.entry_options(entry, SWEEPER_SECTION)?;
        println!(
            "{}\t{}\t{}: {}",
            entry.provider,
            entry.path,
            SWEEPER_SECTION,
            options.into_iter().collect::<Vec<_>>().join(", ")
        );
    }
    Ok(())
}
