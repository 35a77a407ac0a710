use figment::providers::{Env, Format, Toml};
pub use figment::Figment;
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub unbound: UnboundPolicy,
    pub builtins: BuiltinPolicy,
    pub trace: TraceConfig,
}

/// What the machine does when an identifier is bound neither in the
/// environment chain nor in the built-in table.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnboundPolicy {
    /// Push a placeholder `Error` symbol carrying the name.
    #[default]
    Permissive,
    Strict,
}

/// What a built-in does with an argument of the wrong kind.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinPolicy {
    /// Return a default value (`0`, `''`, or the argument itself).
    #[default]
    Permissive,
    Strict,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceConfig {
    // environment keys arrive lowercased
    #[serde(alias = "maxframes")]
    pub max_frames: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig {
            max_frames: 100_000,
        }
    }
}

impl Config {
    pub fn strict() -> Config {
        Config {
            unbound: UnboundPolicy::Strict,
            builtins: BuiltinPolicy::Strict,
            ..Config::default()
        }
    }
}

pub fn load_base_config() -> Figment {
    let mut figment = Figment::new().merge(Toml::file(".rpalrc.toml"));
    if let Some(home_dir) = home::home_dir() {
        figment = figment.merge(Toml::file(home_dir.join(".rpalrc.toml")));
    }
    figment
}

/// `RPAL_*` variables, with `__` separating nested keys
/// (`RPAL_TRACE__MAXFRAMES=500`). `RPAL_STRICT` is a command-line switch.
pub fn env_overrides() -> Env {
    Env::prefixed("RPAL_").ignore(&["strict"]).split("__")
}

pub fn load_config() -> Figment {
    load_base_config().merge(env_overrides())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn isolate_home(jail: &mut Jail) {
        let home = jail.directory().join("home");
        jail.set_env("HOME", home.display());
    }

    #[test]
    fn missing_files_give_defaults() {
        Jail::expect_with(|jail| {
            isolate_home(jail);
            let config: Config = load_base_config().extract()?;
            assert_eq!(config, Config::default());
            assert_eq!(config.trace.max_frames, 100_000);
            Ok(())
        });
    }

    #[test]
    fn reads_policies_from_the_working_directory() {
        Jail::expect_with(|jail| {
            isolate_home(jail);
            jail.create_file(
                ".rpalrc.toml",
                r#"
                unbound = "strict"

                [trace]
                maxFrames = 50
                "#,
            )?;
            let config: Config = load_base_config().extract()?;
            assert_eq!(config.unbound, UnboundPolicy::Strict);
            assert_eq!(config.builtins, BuiltinPolicy::Permissive);
            assert_eq!(config.trace.max_frames, 50);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_files_including_nested_keys() {
        Jail::expect_with(|jail| {
            isolate_home(jail);
            jail.create_file(
                ".rpalrc.toml",
                r#"
                unbound = "strict"

                [trace]
                maxFrames = 50
                "#,
            )?;
            jail.set_env("RPAL_BUILTINS", "strict");
            jail.set_env("RPAL_TRACE__MAXFRAMES", "25");
            jail.set_env("RPAL_STRICT", "true");
            let config: Config = load_config().extract()?;
            assert_eq!(config.unbound, UnboundPolicy::Strict);
            assert_eq!(config.builtins, BuiltinPolicy::Strict);
            assert_eq!(config.trace.max_frames, 25);
            Ok(())
        });
    }

    #[test]
    fn rejects_unknown_policies() {
        Jail::expect_with(|jail| {
            isolate_home(jail);
            jail.create_file(".rpalrc.toml", r#"builtins = "lenient""#)?;
            assert!(load_base_config().extract::<Config>().is_err());
            Ok(())
        });
    }
}
