use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use etcetera::{choose_app_strategy, AppStrategy, AppStrategyArgs};
use serde_derive::Deserialize;
use yup_supervisor::{catalog::AFFIRMATIVE, LineClassifier, PromptRule, SupervisorConfig};

pub const PROJECT_CONFIG_FILE: &str = "yup.toml";

const DEFAULT_DEBUG_FILES_ARGS: &[&str] = &["--debug-files"];

/// One configuration file, user-level or project-level, as written on disk.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub tool: ToolTable,
    pub build: BuildTable,
    pub confirm: ConfirmTable,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolTable {
    /// Executable name looked up on `PATH`, or a path to it.
    pub name: Option<String>,
    /// Where else to look when the tool is not on `PATH`.
    pub search_dirs: Vec<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BuildTable {
    /// Passed after the subcommand on every build.
    pub args: Option<Vec<String>>,
    pub include_debug_files: Option<bool>,
    /// What `include_debug_files` contributes to the argument list.
    pub debug_files_args: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfirmTable {
    pub auto_confirm: Option<bool>,
    pub force_brute_force: Option<bool>,
    /// Zero turns partial-line prompt detection off.
    pub prompt_idle_ms: Option<u64>,
    pub drain_grace_ms: Option<u64>,
    pub prompts: Vec<PromptEntry>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PromptEntry {
    pub pattern: String,
    #[serde(default = "default_response")]
    pub response: String,
}

fn default_response() -> String {
    AFFIRMATIVE.to_owned()
}

/// Settings after layering the project file over the user file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub tool_name: Option<String>,
    pub search_dirs: Vec<PathBuf>,
    pub build_args: Vec<String>,
    pub include_debug_files: bool,
    pub debug_files_args: Vec<String>,
    pub auto_confirm: bool,
    pub force_brute_force: bool,
    pub prompt_idle: Option<Duration>,
    pub drain_grace: Duration,
    pub prompts: Vec<PromptEntry>,
}

impl Config {
    /// Project values win over user values. Search directories and extra prompts from both
    /// files are kept, project entries first.
    pub fn layered(user: ConfigFile, project: ConfigFile) -> Self {
        let prompt_idle = match project.confirm.prompt_idle_ms.or(user.confirm.prompt_idle_ms) {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => Some(SupervisorConfig::DEFAULT_PROMPT_IDLE),
        };
        let drain_grace = project
            .confirm
            .drain_grace_ms
            .or(user.confirm.drain_grace_ms)
            .map(Duration::from_millis)
            .unwrap_or(SupervisorConfig::DEFAULT_DRAIN_GRACE);

        Self {
            tool_name: project.tool.name.or(user.tool.name),
            search_dirs: [project.tool.search_dirs, user.tool.search_dirs].concat(),
            build_args: project.build.args.or(user.build.args).unwrap_or_default(),
            include_debug_files: project
                .build
                .include_debug_files
                .or(user.build.include_debug_files)
                .unwrap_or(false),
            debug_files_args: project
                .build
                .debug_files_args
                .or(user.build.debug_files_args)
                .unwrap_or_else(|| {
                    DEFAULT_DEBUG_FILES_ARGS
                        .iter()
                        .map(|s| s.to_string())
                        .collect()
                }),
            auto_confirm: project
                .confirm
                .auto_confirm
                .or(user.confirm.auto_confirm)
                .unwrap_or(false),
            force_brute_force: project
                .confirm
                .force_brute_force
                .or(user.confirm.force_brute_force)
                .unwrap_or(false),
            prompt_idle,
            drain_grace,
            prompts: [project.confirm.prompts, user.confirm.prompts].concat(),
        }
    }

    /// The built-in classifier extended with the configured prompts.
    pub fn classifier(&self) -> anyhow::Result<LineClassifier> {
        let rules = self
            .prompts
            .iter()
            .map(|p| PromptRule::new(&p.pattern, p.response.clone()))
            .collect::<Result<Vec<_>, _>>()
            .context("invalid entry in [[confirm.prompts]]")?;
        Ok(LineClassifier::with_extra_rules(rules))
    }
}

pub fn user_config_path() -> anyhow::Result<PathBuf> {
    let strategy = choose_app_strategy(AppStrategyArgs {
        top_level_domain: "dev".to_string(),
        author: "yup".to_string(),
        app_name: "yup".to_string(),
    })?;
    Ok(strategy.config_dir().join("config.toml"))
}

pub fn read_config_file(path: &Path) -> anyhow::Result<ConfigFile> {
    let toml_str = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = toml::from_str(&toml_str)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// Reads the user file, if any, and the project file: `explicit` if given, which must exist,
/// otherwise `yup.toml` in `working_dir`, if present.
pub fn load(explicit: Option<&Path>, working_dir: &Path) -> anyhow::Result<Config> {
    let user = match user_config_path() {
        Ok(path) if path.is_file() => read_config_file(&path)?,
        Ok(_) => ConfigFile::default(),
        Err(error) => {
            tracing::debug!(%error, "no user config directory");
            ConfigFile::default()
        }
    };

    let project = match explicit {
        Some(path) => read_config_file(path)?,
        None => {
            let path = working_dir.join(PROJECT_CONFIG_FILE);
            if path.is_file() {
                read_config_file(&path)?
            } else {
                ConfigFile::default()
            }
        }
    };

    Ok(Config::layered(user, project))
}

#[cfg(test)]
mod test {
    use std::{path::PathBuf, time::Duration};

    use indoc::indoc;
    use tempfile::TempDir;

    use super::{load, read_config_file, Config, ConfigFile, PromptEntry};

    fn parse(toml_str: &str) -> ConfigFile {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn full_file() {
        let file = parse(indoc! {r#"
            [tool]
            name = "engine"
            search_dirs = ["/opt/engine/bin"]

            [build]
            args = ["--headless"]
            include_debug_files = true
            debug_files_args = ["--pdb"]

            [confirm]
            auto_confirm = true
            prompt_idle_ms = 100
            drain_grace_ms = 500

            [[confirm.prompts]]
            pattern = "overwrite existing export"

            [[confirm.prompts]]
            pattern = "enter 'ok' to go on"
            response = "ok"
        "#});

        let config = Config::layered(ConfigFile::default(), file);
        assert_eq!(config.tool_name.as_deref(), Some("engine"));
        assert_eq!(config.search_dirs, [PathBuf::from("/opt/engine/bin")]);
        assert_eq!(config.build_args, ["--headless"]);
        assert!(config.include_debug_files);
        assert_eq!(config.debug_files_args, ["--pdb"]);
        assert!(config.auto_confirm);
        assert!(!config.force_brute_force);
        assert_eq!(config.prompt_idle, Some(Duration::from_millis(100)));
        assert_eq!(config.drain_grace, Duration::from_millis(500));
        assert_eq!(
            config.prompts,
            [
                PromptEntry {
                    pattern: "overwrite existing export".to_owned(),
                    response: "y".to_owned()
                },
                PromptEntry {
                    pattern: "enter 'ok' to go on".to_owned(),
                    response: "ok".to_owned()
                },
            ]
        );
    }

    #[test]
    fn defaults_when_nothing_is_configured() {
        let config = Config::layered(ConfigFile::default(), ConfigFile::default());
        assert_eq!(config.tool_name, None);
        assert!(config.build_args.is_empty());
        assert!(!config.include_debug_files);
        assert_eq!(config.debug_files_args, ["--debug-files"]);
        assert!(!config.auto_confirm);
        assert_eq!(config.prompt_idle, Some(Duration::from_millis(250)));
        assert_eq!(config.drain_grace, Duration::from_secs(2));
    }

    #[test]
    fn project_overrides_user() {
        let user = parse(indoc! {r#"
            [tool]
            name = "engine"
            search_dirs = ["/home/me/engines"]

            [build]
            args = ["--verbose"]

            [confirm]
            auto_confirm = true
            force_brute_force = true
        "#});
        let project = parse(indoc! {r#"
            [tool]
            search_dirs = ["vendor/engine"]

            [confirm]
            force_brute_force = false
            prompt_idle_ms = 0
        "#});

        let config = Config::layered(user, project);
        assert_eq!(config.tool_name.as_deref(), Some("engine"));
        assert_eq!(
            config.search_dirs,
            [
                PathBuf::from("vendor/engine"),
                PathBuf::from("/home/me/engines")
            ]
        );
        assert_eq!(config.build_args, ["--verbose"]);
        assert!(config.auto_confirm);
        assert!(!config.force_brute_force);
        assert_eq!(config.prompt_idle, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: Result<ConfigFile, _> = toml::from_str("[confirm]\nauto_confrim = true\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn invalid_prompt_pattern_names_the_pattern() {
        let project = parse(indoc! {r#"
            [[confirm.prompts]]
            pattern = "unbalanced ("
        "#});
        let config = Config::layered(ConfigFile::default(), project);

        let err = config.classifier().unwrap_err();
        let report = format!("{err:#}");
        assert!(report.contains("unbalanced ("), "{report}");
    }

    #[test]
    fn configured_prompts_extend_the_classifier() {
        let project = parse(indoc! {r#"
            [[confirm.prompts]]
            pattern = "enter 'ok' to go on"
            response = "ok"
        "#});
        let classifier = Config::layered(ConfigFile::default(), project)
            .classifier()
            .unwrap();

        let verdict = classifier.classify("Enter 'ok' to go on:");
        assert_eq!(verdict.general, Some("ok"));
        assert_eq!(classifier.classify("Proceed?").general, Some("y"));
    }

    #[test]
    fn project_file_is_found_in_working_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("yup.toml"),
            "[tool]\nname = \"from-project\"\n",
        )
        .unwrap();

        let config = load(None, dir.path()).unwrap();
        assert_eq!(config.tool_name.as_deref(), Some("from-project"));
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");

        let err = load(Some(&missing), dir.path()).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("yup.toml");
        std::fs::write(&path, "[tool\n").unwrap();

        let err = read_config_file(&path).unwrap_err();
        assert!(err.to_string().contains("yup.toml"));
    }
}
