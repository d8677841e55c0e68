//! Command execution context
//!
//! Loads the config once, applies CLI/env overrides and builds the services a
//! command needs.

use std::sync::Arc;

use log::debug;

use folio::config::Config;
use folio::enrich::ProfileAssembler;
use folio::error::Result;
use folio::github::{AcquisitionCascade, CancellationToken};
use folio::store::CacheAsideStore;

use crate::cli::{GlobalOptions, OutputFormat};

pub struct CommandContext {
    pub config: Config,
    pub format: OutputFormat,
    no_cache: bool,
}

impl CommandContext {
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let mut config = Config::load_at(opts.config_ref())?;
        config.apply(opts.overrides())?;
        debug!(
            "storage={:?} cache={:?}/{} api={}",
            config.storage.backend, config.cache.backend, config.cache.enabled, config.api_base_url
        );

        Ok(Self {
            config,
            format: opts.format,
            no_cache: opts.no_cache,
        })
    }

    pub fn store(&self) -> Result<Arc<CacheAsideStore>> {
        Ok(Arc::new(self.config.build_store(self.no_cache)?))
    }

    pub fn cascade(&self) -> Result<Arc<AcquisitionCascade>> {
        Ok(Arc::new(self.config.build_cascade()?))
    }

    pub fn assembler(&self) -> Result<ProfileAssembler> {
        Ok(ProfileAssembler::new(self.store()?, self.cascade()?))
    }
}

/// Token that fires on Ctrl-C
pub fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let handle = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted, cancelling outstanding requests");
            handle.cancel();
        }
    });
    token
}
