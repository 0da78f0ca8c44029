#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod alert;
pub mod error;
pub mod service;
pub mod ws;

pub use service::{
    Collaborators, EngineConfig, EngineStatus, LifecycleController, ServiceConfig, StartError,
};

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;
