//! Target platforms, their default shells and package managers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating system a job runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
    Macos,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Windows, Platform::Linux, Platform::Macos];

    /// Parse a `runs-on` runner label such as `ubuntu-latest` or `macos-14`
    pub fn from_runner_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        let family = label.split('-').next().unwrap_or_default();

        match family {
            "windows" => Some(Platform::Windows),
            "ubuntu" | "linux" => Some(Platform::Linux),
            "macos" | "osx" => Some(Platform::Macos),
            _ => None,
        }
    }

    /// Platform of the machine this process runs on
    pub fn host() -> Option<Self> {
        if cfg!(target_os = "windows") {
            Some(Platform::Windows)
        } else if cfg!(target_os = "linux") {
            Some(Platform::Linux)
        } else if cfg!(target_os = "macos") {
            Some(Platform::Macos)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Macos => "macos",
        }
    }

    /// Shell used for `run` steps that don't pick one
    pub fn default_shell(&self) -> Shell {
        match self {
            Platform::Windows => Shell::Pwsh,
            Platform::Linux | Platform::Macos => Shell::Bash,
        }
    }

    /// Package manager used for dependency-installation steps
    pub fn package_manager(&self) -> PackageManager {
        match self {
            Platform::Windows => PackageManager::Chocolatey,
            Platform::Linux => PackageManager::Apt,
            Platform::Macos => PackageManager::Homebrew,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A program and its arguments, not yet bound to an environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Shell that interprets a `run` step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shell {
    Bash,
    Sh,
    Pwsh,
    Powershell,
    Cmd,
}

impl Shell {
    /// Build the command line that runs `script` in this shell
    pub fn command_line(&self, script: &str) -> CommandLine {
        let (program, flags): (&str, &[&str]) = match self {
            Shell::Bash => ("bash", &["--noprofile", "--norc", "-eo", "pipefail", "-c"]),
            Shell::Sh => ("sh", &["-e", "-c"]),
            Shell::Pwsh => ("pwsh", &["-NoLogo", "-NoProfile", "-NonInteractive", "-Command"]),
            Shell::Powershell => (
                "powershell",
                &["-NoLogo", "-NoProfile", "-NonInteractive", "-Command"],
            ),
            Shell::Cmd => ("cmd", &["/D", "/C"]),
        };

        let script = match self {
            Shell::Pwsh | Shell::Powershell => powershell_script(script),
            Shell::Bash | Shell::Sh | Shell::Cmd => script.to_string(),
        };

        let mut args: Vec<String> = flags.iter().map(|f| f.to_string()).collect();
        args.push(script);
        CommandLine::new(program, args)
    }

    /// Whether the shell runs every line of a multi-line script
    pub fn runs_multiline(&self) -> bool {
        !matches!(self, Shell::Cmd)
    }
}

/// Stop at the first failing statement or native command and exit with
/// the last native exit code instead of PowerShell's own 0/1.
fn powershell_script(script: &str) -> String {
    format!(
        "$ErrorActionPreference = 'stop'\n\
         $PSNativeCommandUseErrorActionPreference = $true\n\
         trap {{ if ($LASTEXITCODE) {{ exit $LASTEXITCODE }}; exit 1 }}\n\
         {}\n\
         if ((Test-Path -LiteralPath variable:\\LASTEXITCODE)) {{ exit $LASTEXITCODE }}",
        script.trim_end()
    )
}

/// System package manager of a platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Apt,
    Homebrew,
    Chocolatey,
}

impl PackageManager {
    /// Build the install command for `packages`
    ///
    /// `version` pins every package to the same version using the manager's
    /// own syntax. `elevate` prefixes `sudo` where the manager needs root.
    pub fn install_command(
        &self,
        packages: &[String],
        version: Option<&str>,
        extra_args: &[String],
        elevate: bool,
    ) -> CommandLine {
        match self {
            PackageManager::Apt => {
                let mut args = vec![
                    "install".to_string(),
                    "-y".to_string(),
                    "--no-install-recommends".to_string(),
                ];
                args.extend(packages.iter().map(|p| match version {
                    Some(v) => format!("{}={}", p, v),
                    None => p.clone(),
                }));
                args.extend(extra_args.iter().cloned());

                if elevate {
                    let mut sudo_args = vec!["apt-get".to_string()];
                    sudo_args.extend(args);
                    CommandLine::new("sudo", sudo_args)
                } else {
                    CommandLine::new("apt-get", args)
                }
            }
            PackageManager::Homebrew => {
                let mut args = vec!["install".to_string()];
                args.extend(packages.iter().map(|p| match version {
                    Some(v) => format!("{}@{}", p, v),
                    None => p.clone(),
                }));
                args.extend(extra_args.iter().cloned());
                CommandLine::new("brew", args)
            }
            PackageManager::Chocolatey => {
                let mut args = vec!["install".to_string()];
                args.extend(packages.iter().cloned());
                args.push("-y".to_string());
                if let Some(v) = version {
                    args.push("--version".to_string());
                    args.push(v.to_string());
                }
                args.extend(extra_args.iter().cloned());
                CommandLine::new("choco", args)
            }
        }
    }
}
