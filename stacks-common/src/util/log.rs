// Copyright (C) 2013-2020 Blockstack PBC, a public benefit corporation
// Copyright (C) 2020 Stacks Open Internet Foundation
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use std::env;
use std::sync::Mutex;

use slog::{Drain, Logger};

lazy_static! {
    pub static ref LOGGER: Logger = make_logger();
}

/// Is the given environment flag set to "1"?  Both the current `STACKS_LOG_*` and the legacy
/// `BLOCKSTACK_*` names are honored.
fn env_flag(name: &str, legacy: &str) -> bool {
    env::var(name) == Ok("1".into()) || env::var(legacy) == Ok("1".into())
}

fn make_json_logger() -> Logger {
    let drain = Mutex::new(slog_json::Json::default(std::io::stderr())).map(slog::Fuse);
    let filtered_drain = slog::LevelFilter::new(drain, get_loglevel()).fuse();
    slog::Logger::root(filtered_drain, o!())
}

fn make_term_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let filtered_drain = slog::LevelFilter::new(drain, get_loglevel()).fuse();
    slog::Logger::root(filtered_drain, o!())
}

fn make_logger() -> Logger {
    if env_flag("STACKS_LOG_JSON", "BLOCKSTACK_LOG_JSON") {
        make_json_logger()
    } else {
        make_term_logger()
    }
}

pub fn get_loglevel() -> slog::Level {
    if env_flag("STACKS_LOG_TRACE", "BLOCKSTACK_TRACE") {
        slog::Level::Trace
    } else if env_flag("STACKS_LOG_DEBUG", "BLOCKSTACK_DEBUG") {
        slog::Level::Debug
    } else {
        slog::Level::Info
    }
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => ({
        slog::slog_trace!($crate::util::log::LOGGER, $($arg)*)
    })
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => ({
        slog::slog_error!($crate::util::log::LOGGER, $($arg)*)
    })
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => ({
        slog::slog_warn!($crate::util::log::LOGGER, $($arg)*)
    })
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => ({
        slog::slog_info!($crate::util::log::LOGGER, $($arg)*)
    })
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => ({
        slog::slog_debug!($crate::util::log::LOGGER, $($arg)*)
    })
}

#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => ({
        slog::slog_crit!($crate::util::log::LOGGER, $($arg)*)
    })
}
