//
// Copyright (c) The RipSim Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use ripsim_rip::instance::{InstanceCfg, Output, TimersCfg};
use ripsim_rip::route::{Metric, RouterId};

// Maximum number of simulated routers.
pub const MAX_ROUTERS: usize = 8;

// Valid port range for input and output ports.
const PORT_MIN: u16 = 1024;
const PORT_MAX: u16 = 49151;

// Valid link metric range.
const METRIC_MIN: u32 = 1;
const METRIC_MAX: u32 = 16;

// Topology file errors. Every variant names the offending file.
#[derive(Debug)]
pub enum ConfigError {
    Read(String, std::io::Error),
    BadHeader(String),
    BadStanza(String),
    BadNumber(String, String),
    PortOutOfRange(String, u16),
    MetricOutOfRange(String, u32),
    DuplicateRouterId(String, RouterId),
    DuplicatePort(String, u16),
    TooManyRouters(String, usize),
}

// ===== global functions =====

pub(crate) fn load(path: &Path) -> Result<Vec<InstanceCfg>, ConfigError> {
    let file = path.display().to_string();
    let data =
        fs::read_to_string(path).map_err(|error| ConfigError::Read(file.clone(), error))?;
    parse(&file, &data)
}

fn parse(file: &str, data: &str) -> Result<Vec<InstanceCfg>, ConfigError> {
    let mut lines = data.lines();

    if lines.next().map(str::trim) != Some("[ROUTERS]") {
        return Err(ConfigError::BadHeader(file.to_owned()));
    }

    // Each stanza is exactly three lines, followed by one blank line (the
    // blank line is optional after the last stanza).
    let lines: Vec<&str> = lines.collect();
    let mut configs = vec![];
    let mut seen_ids = BTreeSet::new();
    let mut seen_ports = BTreeSet::new();

    for stanza in lines.chunks(4) {
        let (id_line, inputs_line, outputs_line) = match stanza {
            [id, inputs, outputs] => (*id, *inputs, *outputs),
            [id, inputs, outputs, blank] if blank.trim().is_empty() => {
                (*id, *inputs, *outputs)
            }
            _ => return Err(ConfigError::BadStanza(file.to_owned())),
        };

        let id = parse_id(file, id_line)?;
        let inputs = parse_inputs(file, inputs_line, &mut seen_ports)?;
        let outputs = parse_outputs(file, outputs_line)?;

        if !seen_ids.insert(id) {
            return Err(ConfigError::DuplicateRouterId(file.to_owned(), id));
        }

        configs.push(InstanceCfg {
            id,
            inputs,
            outputs,
            timers: TimersCfg::default(),
        });
    }

    if configs.len() > MAX_ROUTERS {
        return Err(ConfigError::TooManyRouters(
            file.to_owned(),
            configs.len(),
        ));
    }

    Ok(configs)
}

fn parse_id(file: &str, line: &str) -> Result<RouterId, ConfigError> {
    let value = line
        .strip_prefix("id:")
        .ok_or_else(|| ConfigError::BadStanza(file.to_owned()))?
        .trim();
    let id = parse_number(file, value)?;
    if id == 0 {
        return Err(ConfigError::BadNumber(file.to_owned(), value.to_owned()));
    }
    Ok(id)
}

fn parse_inputs(
    file: &str,
    line: &str,
    seen_ports: &mut BTreeSet<u16>,
) -> Result<Vec<u16>, ConfigError> {
    let value = line
        .strip_prefix("inputs:")
        .ok_or_else(|| ConfigError::BadStanza(file.to_owned()))?;

    let mut inputs = vec![];
    for port in value.split(',') {
        let port: u16 = parse_number(file, port.trim())?;
        if port < PORT_MIN || port > PORT_MAX {
            return Err(ConfigError::PortOutOfRange(file.to_owned(), port));
        }
        // Input ports are bind addresses, distinct across the whole file.
        if !seen_ports.insert(port) {
            return Err(ConfigError::DuplicatePort(file.to_owned(), port));
        }
        inputs.push(port);
    }
    Ok(inputs)
}

fn parse_outputs(
    file: &str,
    line: &str,
) -> Result<BTreeMap<RouterId, Output>, ConfigError> {
    let value = line
        .strip_prefix("outputs:")
        .ok_or_else(|| ConfigError::BadStanza(file.to_owned()))?;

    let mut outputs = BTreeMap::new();
    for triple in value.split(',') {
        // {id}:{port}:{metric}
        let mut fields = triple.trim().split(':');
        let (Some(id), Some(port), Some(metric), None) = (
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
        ) else {
            return Err(ConfigError::BadStanza(file.to_owned()));
        };

        let id: RouterId = parse_number(file, id)?;
        let port: u16 = parse_number(file, port)?;
        let metric: u32 = parse_number(file, metric)?;

        if port < PORT_MIN || port > PORT_MAX {
            return Err(ConfigError::PortOutOfRange(file.to_owned(), port));
        }
        if metric < METRIC_MIN || metric > METRIC_MAX {
            return Err(ConfigError::MetricOutOfRange(file.to_owned(), metric));
        }

        let metric = Metric::new(metric)
            .map_err(|_| ConfigError::MetricOutOfRange(file.to_owned(), metric))?;
        outputs.insert(id, Output::new(port, metric));
    }
    Ok(outputs)
}

fn parse_number<T: std::str::FromStr>(
    file: &str,
    value: &str,
) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::BadNumber(file.to_owned(), value.to_owned()))
}

// ===== impl ConfigError =====

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read(file, error) => {
                write!(f, "{}: failed to read: {}", file, error)
            }
            ConfigError::BadHeader(file) => {
                write!(f, "{}: expected [ROUTERS] header", file)
            }
            ConfigError::BadStanza(file) => {
                write!(f, "{}: malformed router stanza", file)
            }
            ConfigError::BadNumber(file, value) => {
                write!(f, "{}: invalid number: {:?}", file, value)
            }
            ConfigError::PortOutOfRange(file, port) => {
                write!(f, "{}: port out of range: {}", file, port)
            }
            ConfigError::MetricOutOfRange(file, metric) => {
                write!(f, "{}: metric out of range: {}", file, metric)
            }
            ConfigError::DuplicateRouterId(file, id) => {
                write!(f, "{}: duplicate router id: {}", file, id)
            }
            ConfigError::DuplicatePort(file, port) => {
                write!(f, "{}: duplicate input port: {}", file, port)
            }
            ConfigError::TooManyRouters(file, count) => {
                write!(
                    f,
                    "{}: too many routers defined: {} (maximum: {})",
                    file, count, MAX_ROUTERS
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read(_, error) => Some(error),
            _ => None,
        }
    }
}

// ===== tests =====
