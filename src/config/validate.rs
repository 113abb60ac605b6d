// src/config/validate.rs

use crate::config::model::{PipelineFile, RawPipelineFile};
use crate::errors::{ProcpipeError, Result};

impl TryFrom<RawPipelineFile> for PipelineFile {
    type Error = crate::errors::ProcpipeError;

    fn try_from(raw: RawPipelineFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let mut stages = raw.stage.into_iter();
        match stages.next() {
            Some(source) => Ok(PipelineFile::new_unchecked(raw.config, source, stages.collect())),
            None => Err(no_stages()),
        }
    }
}

fn validate_raw_config(cfg: &RawPipelineFile) -> Result<()> {
    ensure_has_stages(cfg)?;
    validate_global_config(cfg)?;
    validate_stages(cfg)?;
    Ok(())
}

fn ensure_has_stages(cfg: &RawPipelineFile) -> Result<()> {
    if cfg.stage.is_empty() {
        return Err(no_stages());
    }
    Ok(())
}

fn no_stages() -> ProcpipeError {
    ProcpipeError::ConfigError("pipeline must contain at least one [[stage]] section".to_string())
}

fn validate_global_config(cfg: &RawPipelineFile) -> Result<()> {
    if cfg.config.env_program.as_os_str().is_empty() {
        return Err(ProcpipeError::ConfigError(
            "[config].env_program must not be empty".to_string(),
        ));
    }

    if let Some(path) = &cfg.config.watchdog_path {
        if path.as_os_str().is_empty() {
            return Err(ProcpipeError::ConfigError(
                "[config].watchdog_path must not be empty when set".to_string(),
            ));
        }
    }

    let token = &cfg.config.unbuffered_token;
    if !token.is_empty() && !token.contains('=') {
        return Err(ProcpipeError::ConfigError(format!(
            "[config].unbuffered_token must be a KEY=VALUE assignment or empty, got '{token}'"
        )));
    }

    Ok(())
}

fn validate_stages(cfg: &RawPipelineFile) -> Result<()> {
    for (idx, stage) in cfg.stage.iter().enumerate() {
        if stage.cmd.trim().is_empty() {
            return Err(ProcpipeError::ConfigError(format!(
                "stage {idx} has an empty `cmd`"
            )));
        }

        for key in stage.env.keys() {
            if key.is_empty() || key.contains('=') {
                return Err(ProcpipeError::ConfigError(format!(
                    "stage {idx} ('{}') has invalid env key '{}'",
                    stage.cmd, key
                )));
            }
        }
    }
    Ok(())
}
