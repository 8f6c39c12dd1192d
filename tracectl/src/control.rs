// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tracing runtime control.

use ordermap::OrderMap;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, Registry, filter::LevelFilter, prelude::*, reload};

use crate::{targets::TRACING_TARGETS, trace_target};

trace_target!("tracectl", LevelFilter::INFO, &[]);

/// Errors in a tracing configuration string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraceConfigError {
    /// An item of the configuration is not of the form `tag=level`.
    #[error("invalid tracing config item '{0}': it should be tag=level")]
    Syntax(String),
    /// The level of an item is not one of off, error, warn, info, debug, trace.
    #[error("invalid tracing level '{0}'")]
    Level(String),
}

/// The configuration of a single tracing target.
#[derive(Debug, Clone)]
pub struct TargetCfg {
    pub(crate) target: &'static str,
    pub(crate) name: &'static str,
    pub(crate) level: LevelFilter,
    pub(crate) tags: Vec<&'static str>,
}

impl TargetCfg {
    fn new(
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
    ) -> Self {
        // a target is always reachable by its name
        let mut tags = tags.to_vec();
        if !tags.contains(&name) {
            tags.push(name);
        }
        Self {
            target,
            name,
            level,
            tags,
        }
    }

    /// The configured level of this target.
    #[must_use]
    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// The target (module path or custom target) events are filtered on.
    #[must_use]
    pub fn target(&self) -> &'static str {
        self.target
    }
}

#[derive(Debug)]
struct TargetCfgDb {
    level: LevelFilter,
    targets: OrderMap<&'static str, TargetCfg>,
    tags: OrderMap<&'static str, HashSet<&'static str>>,
}

impl TargetCfgDb {
    fn new(level: LevelFilter) -> Self {
        let mut db = Self {
            level,
            targets: OrderMap::new(),
            tags: OrderMap::new(),
        };
        for target in TRACING_TARGETS {
            db.register(target.target, target.name, target.level, target.tags);
        }
        db
    }

    fn register(
        &mut self,
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
    ) {
        let config = TargetCfg::new(target, name, level, tags);
        for tag in &config.tags {
            self.tags.entry(*tag).or_default().insert(target);
        }
        if let Some(existing) = self.targets.insert(target, config) {
            warn!("target {} has been multiply defined", existing.target);
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::new(self.level.to_string());
        for target in self.targets.values() {
            match format!("{}={}", target.target, target.level).parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(err) => error!("bad directive for target {}: {err}", target.target),
            }
        }
        filter
    }

    fn as_config_string(&self) -> String {
        let mut out = format!("default={}", self.level);
        for target in self.targets.values() {
            out += format!(",{}={}", target.name, target.level).as_str();
        }
        out
    }

    fn tag_targets_mut(&mut self, tag: &str) -> impl Iterator<Item = &mut TargetCfg> {
        let members = self.tags.get(tag).cloned().unwrap_or_default();
        self.targets
            .values_mut()
            .filter(move |target| members.contains(target.target))
    }
}

/// Handle on the process-wide tracing subscriber.
#[derive(Debug)]
pub struct TracingControl {
    db: Mutex<TargetCfgDb>,
    reload_filter: reload::Handle<EnvFilter, Registry>,
}

static TRACING_CTL: OnceLock<TracingControl> = OnceLock::new();

/// Get a reference to the process-wide [`TracingControl`], initializing it if needed.
pub fn get_trace_ctl() -> &'static TracingControl {
    TRACING_CTL.get_or_init(TracingControl::new)
}

impl TracingControl {
    fn new() -> Self {
        let db = TargetCfgDb::new(LevelFilter::INFO);
        let (filter, reload_filter) = reload::Layer::new(db.env_filter());

        // stdout belongs to the caller's protocol
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_line_number(true)
            .with_target(true)
            .with_thread_names(true)
            .with_level(true);

        if let Err(err) = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
        {
            // e.g. a test harness got there first
            debug!("tracing subscriber not installed: {err}");
        }

        Self {
            db: Mutex::new(db),
            reload_filter,
        }
    }

    fn db(&self) -> MutexGuard<'_, TargetCfgDb> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reload(&self, filter: EnvFilter) {
        if let Err(e) = self.reload_filter.reload(filter) {
            error!("failed to reload tracing filter: {e}");
        }
    }

    /// Install the subscriber (if not already done).
    pub fn init() {
        get_trace_ctl();
    }

    /// Set the level of every target carrying `tag`.
    pub fn set_tag_level(&self, tag: &str, level: LevelFilter) {
        let mut db = self.db();
        let mut changed = 0;
        for target in db.tag_targets_mut(tag) {
            if target.level != level {
                target.level = level;
                changed += 1;
            }
        }
        if changed > 0 {
            self.reload(db.env_filter());
        }
        debug!("log level for tag '{tag}' set to {level}, targets changed: {changed}");
    }

    /// Set the level of every known target.
    pub fn set_level_all(&self, level: LevelFilter) {
        let mut db = self.db();
        for target in db.targets.values_mut() {
            target.level = level;
        }
        self.reload(db.env_filter());
    }

    /// Set the level applying to events whose target was never declared.
    pub fn set_default_level(&self, level: LevelFilter) {
        let mut db = self.db();
        if db.level != level {
            db.level = level;
            self.reload(db.env_filter());
            info!("default log level set to {level}");
        }
    }

    /// The level applying to events whose target was never declared.
    pub fn get_default_level(&self) -> LevelFilter {
        self.db().level
    }

    /// Look up the configuration of `target`.
    pub fn get_target(&self, target: &str) -> Option<TargetCfg> {
        self.db().targets.get(target).cloned()
    }

    /// A configuration string reproducing the current levels.
    pub fn as_config_string(&self) -> String {
        self.db().as_config_string()
    }

    /// Parse a string made of comma-separated tag=level, where level=off,error,warn,info,debug,trace
    fn parse_tracing_config(
        input: &str,
    ) -> Result<OrderMap<String, LevelFilter>, TraceConfigError> {
        let mut result = OrderMap::new();
        for item in input.split(',') {
            let item = item.trim();
            let Some((tag, level)) = item.split_once('=') else {
                return Err(TraceConfigError::Syntax(item.to_string()));
            };
            let level = LevelFilter::from_str(level.trim())
                .map_err(|_| TraceConfigError::Level(level.trim().to_string()))?;
            result.insert(tag.trim().to_string(), level);
        }
        Ok(result)
    }

    /// Apply a configuration string such as `default=warn,all=info,netlink=debug`.
    ///
    /// `default` sets the default level and `all` sets every declared target; any other key is a
    /// tag and is applied last, so it overrides both.
    ///
    /// # Errors
    ///
    /// Returns a [`TraceConfigError`] (and changes nothing) if the string does not parse.
    pub fn setup_from_string(&self, input: &str) -> Result<(), TraceConfigError> {
        let config = Self::parse_tracing_config(input)?;
        if let Some(level) = config.get("default") {
            self.set_default_level(*level);
        }
        if let Some(level) = config.get("all") {
            self.set_level_all(*level);
        }
        for (tag, level) in &config {
            if tag != "default" && tag != "all" {
                self.set_tag_level(tag, *level);
            }
        }
        Ok(())
    }

    #[cfg(test)]
    fn register(
        &self,
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
    ) {
        let mut db = self.db();
        db.register(target, name, level, tags);
        self.reload(db.env_filter());
    }
}
