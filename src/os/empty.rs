use std::collections::HashMap;
use crate::error::{Error, Result};
use super::{Counters, Socket};

pub fn counters() -> Result<HashMap<String, Counters>> {
    Err(Error::Sampling("interface counters unsupported".to_owned()))
}

pub fn connections() -> Result<Vec<Socket>> {
    Err(Error::Sampling("connection table unsupported".to_owned()))
}
