// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    runtime::{
        fail::Fail,
        network::config::TcpConfig,
    },
    tcp::SeqNumber,
};
use ::std::{
    fs,
    ops::Index,
    str::FromStr,
};
use ::yaml_rust::{
    Yaml,
    YamlLoader,
};

//======================================================================================================================
// Constants
//======================================================================================================================

// Connection options. Each may also be given as an environment variable named after the upper-cased key.
mod tcp_config {
    pub const SECTION_NAME: &str = "tcp";
    pub const SEND_CAPACITY: &str = "send_capacity";
    pub const RECV_CAPACITY: &str = "recv_capacity";
    pub const RT_TIMEOUT: &str = "rt_timeout";
    pub const MAX_RETX_ATTEMPTS: &str = "max_retx_attempts";
    pub const MAX_PAYLOAD_SIZE: &str = "max_payload_size";
    pub const FIXED_ISN: &str = "fixed_isn";
}

//======================================================================================================================
// Structures
//======================================================================================================================

/// Connection configuration, as loaded from a YAML document.
///
/// ```yaml
/// tcp:
///   recv_capacity: 64000
///   rt_timeout: 1000
///   fixed_isn: 100
/// ```
#[derive(Clone, Debug)]
pub struct Config(pub Yaml);

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl Config {
    /// Reads a configuration file into a [Config] object.
    pub fn new(config_path: &str) -> Result<Self, Fail> {
        let config_s: String = fs::read_to_string(config_path)?;
        config_s.parse()
    }

    /// Builds the [TcpConfig] described by this configuration. Options that are absent keep their defaults.
    pub fn tcp_config(&self) -> Result<TcpConfig, Fail> {
        let fixed_isn: Option<SeqNumber> = self.get_int_option::<u32>(tcp_config::FIXED_ISN)?.map(SeqNumber::from);
        Ok(TcpConfig::new(
            self.send_capacity()?,
            self.recv_capacity()?,
            self.rt_timeout()?,
            self.max_retx_attempts()?,
            self.max_payload_size()?,
            fixed_isn,
        ))
    }

    pub fn send_capacity(&self) -> Result<Option<usize>, Fail> {
        self.get_nonzero_option(tcp_config::SEND_CAPACITY)
    }

    pub fn recv_capacity(&self) -> Result<Option<usize>, Fail> {
        self.get_nonzero_option(tcp_config::RECV_CAPACITY)
    }

    /// Initial retransmission timeout, in milliseconds.
    pub fn rt_timeout(&self) -> Result<Option<u16>, Fail> {
        self.get_nonzero_option(tcp_config::RT_TIMEOUT)
    }

    pub fn max_retx_attempts(&self) -> Result<Option<u32>, Fail> {
        self.get_int_option(tcp_config::MAX_RETX_ATTEMPTS)
    }

    pub fn max_payload_size(&self) -> Result<Option<usize>, Fail> {
        self.get_nonzero_option(tcp_config::MAX_PAYLOAD_SIZE)
    }

    //==================================================================================================================
    // Static Functions
    //==================================================================================================================

    fn get_tcp_section(&self) -> Result<Option<&Yaml>, Fail> {
        let section: &Yaml = self.0.index(tcp_config::SECTION_NAME);
        match section {
            Yaml::BadValue => Ok(None),
            Yaml::Hash(_) => Ok(Some(section)),
            _ => {
                let message: String = format!("parameter \"{}\" has unexpected type", tcp_config::SECTION_NAME);
                Err(Fail::new(libc::EINVAL, message.as_str()))
            },
        }
    }

    /// Reads an integer option, with the environment taking precedence over the document.
    fn get_int_option<T: FromStr + TryFrom<i64>>(&self, index: &str) -> Result<Option<T>, Fail> {
        if let Some(value) = Self::get_typed_env_option(index)? {
            return Ok(Some(value));
        }

        let section: &Yaml = match self.get_tcp_section()? {
            Some(section) => section,
            None => return Ok(None),
        };
        let val: i64 = match section.index(index) {
            Yaml::BadValue => return Ok(None),
            option => match option.as_i64() {
                Some(val) => val,
                None => {
                    let message: String = format!("parameter {} has unexpected type", index);
                    return Err(Fail::new(libc::EINVAL, message.as_str()));
                },
            },
        };
        match T::try_from(val) {
            Ok(val) => Ok(Some(val)),
            _ => {
                let message: String = format!("parameter \"{}\" is out of range", index);
                Err(Fail::new(libc::ERANGE, message.as_str()))
            },
        }
    }

    /// Same as `Self::get_int_option`, but zero is rejected.
    fn get_nonzero_option<T: FromStr + TryFrom<i64> + Default + PartialEq>(
        &self,
        index: &str,
    ) -> Result<Option<T>, Fail> {
        match self.get_int_option::<T>(index)? {
            Some(value) if value == T::default() => {
                let message: String = format!("parameter {} must be positive", index);
                Err(Fail::new(libc::EINVAL, message.as_str()))
            },
            value => Ok(value),
        }
    }

    /// Get value where the environment value overrides the config file if it exists.
    fn get_typed_env_option<T: FromStr>(index: &str) -> Result<Option<T>, Fail> {
        if let Ok(var) = ::std::env::var(index.to_uppercase()) {
            if let Ok(value) = var.as_str().parse() {
                return Ok(Some(value));
            } else {
                let message: String = format!("parameter {} has unexpected type", index);
                return Err(Fail::new(libc::EINVAL, message.as_str()));
            }
        }
        Ok(None)
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl FromStr for Config {
    type Err = Fail;

    fn from_str(config_s: &str) -> Result<Self, Self::Err> {
        let config: Vec<Yaml> = match YamlLoader::load_from_str(config_s) {
            Ok(config) => config,
            Err(e) => {
                let message: String = format!("malformed configuration: {}", e);
                return Err(Fail::new(libc::EINVAL, message.as_str()));
            },
        };
        let config_obj: &Yaml = match &config[..] {
            [c] => c,
            _ => return Err(Fail::new(libc::EINVAL, "Wrong number of config objects")),
        };

        debug!("from_str(): loaded configuration {:?}", config_obj);
        Ok(Self(config_obj.clone()))
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
