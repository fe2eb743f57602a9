// Copyright (c) 2024 The rust-gpio-sysfs Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Toggle or inspect a single line: `gpioctl dirin|dirout|get|set|clear <line>`
//!
//! `set` and `clear` refer to the logical level, so an active-low line is driven low by
//! `set`.  A line that was not exported before is un-exported again on exit.

use gpio_sysfs::{Level, Line, Sysfs};
use log::{error, LevelFilter};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use structopt::StructOpt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    DirIn,
    DirOut,
    Get,
    Set,
    Clear,
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dirin" => Ok(Action::DirIn),
            "dirout" => Ok(Action::DirOut),
            "get" => Ok(Action::Get),
            "set" => Ok(Action::Set),
            "clear" => Ok(Action::Clear),
            other => Err(format!(
                "unknown action {other:?}, expected dirin|dirout|get|set|clear"
            )),
        }
    }
}

#[derive(Debug, StructOpt)]
struct Cli {
    /// One of dirin, dirout, get, set, clear
    action: Action,
    /// The GPIO line number
    line: u32,
    /// The GPIO class directory
    #[structopt(long, env = "GPIO_SYSFS_ROOT", default_value = "/sys/class/gpio")]
    root: PathBuf,
    /// Log more (-v info, -vv debug, -vvv trace)
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn run(line: &mut Line<'_, Sysfs>, action: Action) -> gpio_sysfs::Result<()> {
    line.full_open()?;
    let active_low = line.get_active_low()?;

    match action {
        Action::DirIn => line.set_direction_input()?,
        Action::DirOut => line.set_direction_output(Level::Low)?,
        Action::Get => {
            let level = line.get_value()?;
            let high = level.is_high() != active_low;
            println!(
                "Pin {} is {}",
                line.line(),
                if high { "HIGH" } else { "LOW" }
            );
        }
        Action::Set => line.set_value(Level::new(!active_low))?,
        Action::Clear => line.set_value(Level::new(active_low))?,
    }

    Ok(())
}

/// Fold the outcome of the action and of releasing the line into one result.
///
/// The action's error wins; a release failure on top of it is logged.
fn finish(
    action: gpio_sysfs::Result<()>,
    released: gpio_sysfs::Result<()>,
) -> gpio_sysfs::Result<()> {
    match (action, released) {
        (Err(e), Err(release)) => {
            error!("{release}");
            Err(e)
        }
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn do_main(args: Cli) -> anyhow::Result<()> {
    let sysfs = Sysfs::with_root(&args.root);
    println!("Using gpio pin {}.", args.line);

    let mut line = Line::request(&sysfs, args.line, "gpioctl")?;
    let result = run(&mut line, args.action);

    // Release even if the action failed; only an export made above is undone
    let released = line.release();
    finish(result, released)?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Cli::from_args();
    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    match do_main(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
