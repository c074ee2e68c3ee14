#![allow(dead_code)]

pub mod fixtures;
pub mod yachtcrm_env;
