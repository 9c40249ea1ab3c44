//! Build backend and repair tool selection.

use std::fmt;

/// Tool that embeds shared-library dependencies into a wheel.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RepairTool {
    /// `delocate-wheel` (macOS): copies dylibs into `<pkg>/.dylibs` and rewrites install names.
    Delocate,
    /// `auditwheel repair` (Linux): grafts shared objects into `<pkg>.libs` and patches RPATHs.
    Auditwheel,
}

impl RepairTool {
    /// The repair tool native to the host platform.
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::Delocate
        } else {
            Self::Auditwheel
        }
    }

    /// Name of the PyPI package that provides the tool.
    pub fn package(&self) -> &'static str {
        match self {
            Self::Delocate => "delocate",
            Self::Auditwheel => "auditwheel",
        }
    }

    /// Directory suffix the tool uses for embedded libraries inside the wheel.
    pub fn library_dir_suffix(&self) -> &'static str {
        match self {
            Self::Delocate => ".dylibs",
            Self::Auditwheel => ".libs",
        }
    }
}

impl Default for RepairTool {
    fn default() -> Self {
        Self::platform_default()
    }
}

impl fmt::Display for RepairTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.package())
    }
}

/// How the wheel is built from the project tree.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BuildBackend {
    /// `python setup.py bdist_wheel -d <dist>`
    #[default]
    SetupPy,
    /// `python -m pip wheel --no-deps -w <dist> <project>`
    Pip,
}
