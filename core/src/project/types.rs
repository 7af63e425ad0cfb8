use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

pub const AWS_PROFILE_VAR: &str = "AWS_PROFILE";

/// A deployable stack inside a project.
///
/// In the project file a stack is either a bare name or an object with a
/// `name` and optional `env` / `aws_profile`; both decode to this type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StackDefinition {
    pub name: String,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_profile: Option<String>,
}

impl StackDefinition {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Environment overrides to scope around a runner call for this stack.
    ///
    /// `aws_profile` (stack first, then the owning project) becomes
    /// `AWS_PROFILE` unless `env` already sets it.
    pub fn effective_env(&self, project_profile: Option<&str>) -> BTreeMap<String, String> {
        let mut env = self.env.clone();
        let profile = self.aws_profile.as_deref().or(project_profile);
        if let Some(profile) = profile.filter(|p| !p.trim().is_empty()) {
            env.entry(AWS_PROFILE_VAR.to_string())
                .or_insert_with(|| profile.to_string());
        }
        env
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StackEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        env: BTreeMap<String, String>,
        #[serde(default)]
        aws_profile: Option<String>,
    },
}

impl<'de> Deserialize<'de> for StackDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entry = StackEntry::deserialize(deserializer).map_err(|_| {
            D::Error::custom(
                "stacks must be a list of names or a list of objects with `name` and optional `env`",
            )
        })?;
        Ok(match entry {
            StackEntry::Name(name) => StackDefinition::named(name),
            StackEntry::Detailed {
                name,
                env,
                aws_profile,
            } => StackDefinition {
                name,
                env,
                aws_profile,
            },
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,

    #[serde(default)]
    pub stacks: Vec<StackDefinition>,

    #[serde(default, rename = "dependsOn")]
    pub depends_on: Vec<String>,

    /// Working directory override, relative to the source root unless absolute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_profile: Option<String>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_stacks<I, S>(mut self, stacks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stacks
            .extend(stacks.into_iter().map(StackDefinition::named));
        self
    }

    pub fn with_stack(mut self, stack: StackDefinition) -> Self {
        self.stacks.push(stack);
        self
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn stack(&self, name: &str) -> Option<&StackDefinition> {
        self.stacks.iter().find(|s| s.name == name)
    }

    pub fn declares_stack(&self, name: &str) -> bool {
        self.stack(name).is_some()
    }

    pub fn work_dir(&self, root: &Path) -> PathBuf {
        match self.dir.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(dir) => root.join(dir),
            None => root.join(&self.name),
        }
    }
}

/// Top-level shape of the project file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectsFile {
    #[serde(default)]
    pub projects: Vec<Project>,
}

/// Where project directories live for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectSource {
    Local {
        path: PathBuf,
    },
    Git {
        url: String,
        branch: String,
        /// Sub-directory inside the checkout that holds the projects.
        subdir: PathBuf,
    },
}

impl ProjectSource {
    pub fn from_flags(path: Option<&str>, git_url: Option<&str>, git_branch: &str) -> Self {
        let path = PathBuf::from(path.unwrap_or_default());
        match git_url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => Self::Git {
                url: url.to_string(),
                branch: git_branch.to_string(),
                subdir: path,
            },
            None => Self::Local { path },
        }
    }

    pub fn is_git(&self) -> bool {
        matches!(self, Self::Git { .. })
    }
}
