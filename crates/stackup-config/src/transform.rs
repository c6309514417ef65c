//! Config transformation pipeline
//!
//! Every config artifact goes through the same sequence exactly once per
//! install run: `load_source` resolves the logical name to an on-disk
//! template, `adjust` applies the named adjustment routine, and
//! `substitute_params` fills `%NAME%` placeholders from the parameter map.
//! Configs in the self-managing set skip generic substitution entirely;
//! their adjustment routine embeds every value they need.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::{ConfigError, Result};

/// A named adjustment routine
pub type AdjustFn = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Transforms source templates into final config artifacts
pub struct Transformer {
    template_dir: PathBuf,
    sample_sources: HashMap<String, String>,
    adjustments: HashMap<String, AdjustFn>,
    self_managed: HashSet<String>,
}

impl Transformer {
    /// Create a transformer reading templates from the given directory
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            sample_sources: HashMap::new(),
            adjustments: HashMap::new(),
            self_managed: HashSet::new(),
        }
    }

    /// Remap a config name to a differently-named committed sample file
    pub fn map_sample_source(&mut self, config: &str, sample: &str) {
        self.sample_sources
            .insert(config.to_string(), sample.to_string());
    }

    /// Register the adjustment routine for a config name
    pub fn register_adjustment<F>(&mut self, config: &str, adjust: F)
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        self.adjustments.insert(config.to_string(), Box::new(adjust));
    }

    /// Exempt a config from generic placeholder substitution
    pub fn mark_self_managed(&mut self, config: &str) {
        self.self_managed.insert(config.to_string());
    }

    /// Resolve a config's template and read it
    pub fn load_source(&self, config: &str) -> Result<(PathBuf, String)> {
        let file = self
            .sample_sources
            .get(config)
            .map(String::as_str)
            .unwrap_or(config);
        let path = self.template_dir.join(file);
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Ok((path, contents))
    }

    /// Apply the config's adjustment routine, or pass through unchanged
    pub fn adjust(&self, config: &str, contents: &str) -> Result<String> {
        match self.adjustments.get(config) {
            Some(adjust) => {
                debug!(config, "applying adjustment routine");
                adjust(contents)
            }
            None => Ok(contents.to_string()),
        }
    }

    /// Fill placeholders from the parameter map.
    ///
    /// Self-managing configs pass through untouched. For everything else an
    /// unresolved placeholder is fatal: a partially-substituted config must
    /// never reach disk.
    pub fn substitute_params(
        &self,
        config: &str,
        contents: &str,
        params: &HashMap<String, String>,
    ) -> Result<String> {
        if self.self_managed.contains(config) {
            return Ok(contents.to_string());
        }
        substitute_placeholders(contents, params, config)
    }

    /// Run the full pipeline for one config: load, adjust, substitute
    pub fn render(
        &self,
        config: &str,
        params: &HashMap<String, String>,
    ) -> Result<(PathBuf, String)> {
        let (path, raw) = self.load_source(config)?;
        let adjusted = self.adjust(config, &raw)?;
        let substituted = self.substitute_params(config, &adjusted, params)?;
        Ok((path, substituted))
    }

    /// The directory templates are read from
    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }
}

/// Replace every `%NAME%` placeholder with its value from the map.
///
/// Unresolved placeholders are collected and reported together.
pub fn substitute_placeholders(
    input: &str,
    params: &HashMap<String, String>,
    context: &str,
) -> Result<String> {
    let re = Regex::new(r"%([A-Za-z0-9_.]+)%").unwrap();
    let mut result = input.to_string();
    let mut missing = Vec::new();

    for cap in re.captures_iter(input) {
        let full_match = &cap[0];
        let name = &cap[1];
        match params.get(name) {
            Some(value) => {
                result = result.replace(full_match, value);
            }
            None => missing.push(name.to_string()),
        }
    }

    if !missing.is_empty() {
        missing.sort();
        missing.dedup();
        return Err(ConfigError::UnresolvedPlaceholder {
            placeholders: missing.join(", "),
            config: context.to_string(),
        });
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IniDocument;
    use std::fs;

    fn params() -> HashMap<String, String> {
        HashMap::from([
            ("SERVICE_HOST".to_string(), "10.0.0.1".to_string()),
            ("SERVICE_PORT".to_string(), "8080".to_string()),
        ])
    }

    #[test]
    fn substitutes_all_occurrences() {
        let out =
            substitute_placeholders("%SERVICE_HOST%:%SERVICE_PORT% on %SERVICE_HOST%", &params(), "t")
                .unwrap();
        assert_eq!(out, "10.0.0.1:8080 on 10.0.0.1");
    }

    #[test]
    fn unresolved_placeholder_is_fatal() {
        let err = substitute_placeholders("%MISSING% and %ALSO_MISSING%", &params(), "api.conf")
            .unwrap_err();
        match err {
            ConfigError::UnresolvedPlaceholder {
                placeholders,
                config,
            } => {
                assert_eq!(placeholders, "ALSO_MISSING, MISSING");
                assert_eq!(config, "api.conf");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn render_runs_load_adjust_substitute_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("api.conf.sample"),
            "[server]\nbind_host = %SERVICE_HOST%\n",
        )
        .unwrap();

        let mut transformer = Transformer::new(dir.path());
        transformer.map_sample_source("api.conf", "api.conf.sample");
        transformer.register_adjustment("api.conf", |contents| {
            let mut doc = IniDocument::parse(contents);
            doc.set("server", "workers", 4);
            Ok(doc.to_string())
        });

        let (path, rendered) = transformer.render("api.conf", &params()).unwrap();
        assert!(path.ends_with("api.conf.sample"));
        let doc = IniDocument::parse(&rendered);
        assert_eq!(doc.get("server", "bind_host"), Some("10.0.0.1"));
        assert_eq!(doc.get("server", "workers"), Some("4"));
    }

    #[test]
    fn self_managed_configs_skip_substitution() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("root.conf"), "token = %NOT_A_PARAM%\n").unwrap();

        let mut transformer = Transformer::new(dir.path());
        transformer.mark_self_managed("root.conf");

        let (_, rendered) = transformer.render("root.conf", &params()).unwrap();
        assert_eq!(rendered, "token = %NOT_A_PARAM%\n");
    }

    #[test]
    fn unmapped_config_loads_by_its_own_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("plain.conf"), "host = %SERVICE_HOST%\n").unwrap();

        let transformer = Transformer::new(dir.path());
        let (path, rendered) = transformer.render("plain.conf", &params()).unwrap();
        assert!(path.ends_with("plain.conf"));
        assert_eq!(rendered, "host = 10.0.0.1\n");
    }

    #[test]
    fn rerunning_pipeline_on_rendered_output_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("api.conf"),
            "[server]\nbind_host = %SERVICE_HOST%\n",
        )
        .unwrap();

        let mut transformer = Transformer::new(dir.path());
        transformer.register_adjustment("api.conf", |contents| {
            let mut doc = IniDocument::parse(contents);
            doc.set("server", "workers", 4);
            Ok(doc.to_string())
        });

        let (_, first) = transformer.render("api.conf", &params()).unwrap();
        // Re-running adjust + substitute over already-transformed output
        // reproduces it byte for byte
        let adjusted = transformer.adjust("api.conf", &first).unwrap();
        let second = transformer
            .substitute_params("api.conf", &adjusted, &params())
            .unwrap();
        assert_eq!(first, second);
    }
}
